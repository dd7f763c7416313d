use crate::types::PageSnapshot;

/// Tags treated as headlines. Matched exactly.
pub const HEADLINE_TAGS: [&str; 2] = ["h2", "h3"];
/// At most this many headlines are reported.
pub const MAX_HEADLINES: usize = 5;
/// A headline must be strictly longer than this after trimming.
pub const MIN_HEADLINE_CHARS: usize = 10;
/// Length of the text excerpt in a page summary.
pub const SUMMARY_CHARS: usize = 200;

pub const NO_HEADLINES: &str = "No headlines found on this page.";

/// First `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Headline texts in page order, trimmed, capped at [`MAX_HEADLINES`].
pub fn headlines(page: &PageSnapshot) -> Vec<&str> {
    page.interactive_elements
        .iter()
        .filter(|el| {
            el.tag
                .as_deref()
                .is_some_and(|tag| HEADLINE_TAGS.contains(&tag))
        })
        .filter_map(|el| el.text.as_deref())
        .map(str::trim)
        .filter(|text| text.chars().count() > MIN_HEADLINE_CHARS)
        .take(MAX_HEADLINES)
        .collect()
}

/// `"Top Headlines:\n1. ...\n2. ..."`
pub fn format_headlines(items: &[&str]) -> String {
    let mut formatted = String::from("Top Headlines:");
    for (i, headline) in items.iter().enumerate() {
        formatted.push_str(&format!("\n{}. {}", i + 1, headline));
    }
    formatted
}

/// Formatted headlines, or [`NO_HEADLINES`] when nothing qualifies.
pub fn extract_headlines(page: &PageSnapshot) -> String {
    let found = headlines(page);
    if found.is_empty() {
        NO_HEADLINES.to_string()
    } else {
        format_headlines(&found)
    }
}

pub fn extract_summary(page: &PageSnapshot) -> String {
    let excerpt = if page.text.chars().count() >= SUMMARY_CHARS {
        format!("{}...", truncate_chars(&page.text, SUMMARY_CHARS))
    } else {
        page.text.clone()
    };
    format!("This page is about: {}\n\nSummary: {}", page.title, excerpt)
}
