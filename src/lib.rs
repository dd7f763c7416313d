//! Backend for a browser-extension copilot: takes a task plus a snapshot of
//! the current page and answers with an understanding, browser actions and
//! a result text, either through a three-role model pipeline or by keyword
//! matching alone.

pub mod agents;
pub mod brain;
pub mod config;
pub mod dom;
pub mod error;
pub mod extract;
pub mod face;
pub mod fallback;
pub mod pipeline;
pub mod policy;
pub mod prompts;
pub mod reasoning;
pub mod session;
pub mod types;

pub use config::{Backend, ServerConfig};
pub use error::{ModelError, PipelineError};
pub use face::{AppState, router};
pub use types::{Action, PageSnapshot, TaskResult};
