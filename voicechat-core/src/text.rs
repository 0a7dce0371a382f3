use regex::Regex;
use std::sync::OnceLock;

fn reasoning_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<thinking>.*?</thinking>|<think>.*?</think>|<reasoning>.*?</reasoning>")
            .expect("valid reasoning regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Returns the trimmed input if it contains anything worth submitting.
pub fn submittable_input(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Strips `<think>`, `<thinking>` and `<reasoning>` blocks some models emit
/// ahead of the answer.
pub fn strip_reasoning_blocks(text: &str) -> String {
    let out = reasoning_block_re().replace_all(text, "");
    out.trim().to_string()
}

/// Short single-line rendering of user text for logs.
pub fn preview_text(text: &str) -> String {
    const MAX_CHARS: usize = 48;

    let flat = whitespace_re().replace_all(text.trim(), " ");
    if flat.chars().count() <= MAX_CHARS {
        return flat.into_owned();
    }
    let mut out: String = flat.chars().take(MAX_CHARS).collect();
    out.push('…');
    out
}
