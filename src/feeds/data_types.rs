use serde::{Deserialize, Serialize};

/// Identifier of a feed item. The feed hands out either numbers or strings,
/// and the two are never considered equal (`1` is not `"1"`). Numbers keep
/// their JSON form, so ids past `i64::MAX` or written as `1e3` still work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NewsId {
    Number(serde_json::Number),
    Text(String),
}

impl NewsId {
    pub fn number(n: i64) -> Self {
        NewsId::Number(n.into())
    }

    /// Blank ids (`0`, `""`) can't be deduplicated and are never notified
    pub fn is_blank(&self) -> bool {
        match self {
            NewsId::Number(n) => n.as_f64().is_some_and(|v| v == 0.0),
            NewsId::Text(s) => s.is_empty(),
        }
    }
}

impl std::fmt::Display for NewsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NewsId::Number(n) => write!(f, "{n}"),
            NewsId::Text(s) => f.write_str(s),
        }
    }
}

/// A flash news entry as returned by the feed API
#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    pub id: Option<NewsId>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub level: Option<serde_json::Value>,
}

impl NewsItem {
    /// Title if present and non-empty, otherwise the content
    pub fn display_text(&self) -> &str {
        [&self.title, &self.content]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    /// Only a numeric level above zero marks an item as important
    pub fn is_important(&self) -> bool {
        self.level
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .is_some_and(|level| level > 0.0)
    }

    /// Display text on a single line, trimmed
    pub fn clean_title(&self) -> String {
        self.display_text().replace('\n', " ").trim().to_string()
    }
}
