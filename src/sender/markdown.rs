use crate::feeds::prelude::NewsItem;

/// Prefix for items the feed flags as important
pub const ALERT_MARKER: &str = "🚨 ";

/// Escape the characters Telegram's legacy Markdown treats as markup
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '_' | '[' | ']' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render a news item as a bold one-line message
pub fn format_message(item: &NewsItem) -> String {
    let prefix = if item.is_important() { ALERT_MARKER } else { "" };
    format!("{prefix}*{}*", escape_markdown(&item.clean_title()))
}
