// src/util/text.rs

/// Shorten text to its first non-empty line, at most `max_chars` characters.
///
/// A trailing `...` marks text that was cut.
///
/// # Examples
///
/// ```
/// use notegrid::util::text::summarize;
///
/// assert_eq!(summarize("Buy milk\nand eggs", 20), "Buy milk...");
/// assert_eq!(summarize("short", 20), "short");
/// ```
pub fn summarize(text: &str, max_chars: usize) -> String {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = lines.next().unwrap_or("");
    let more_lines = lines.next().is_some();

    if first.chars().count() > max_chars {
        let cut: String = first.chars().take(max_chars.saturating_sub(3)).collect();
        return format!("{}...", cut.trim_end());
    }
    if more_lines {
        return format!("{}...", first);
    }
    first.to_string()
}
