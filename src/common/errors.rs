/// Errors raised while fetching the feed, talking to Telegram or touching the
/// sent-ids file. Callers in the polling loop log them; only configuration
/// errors reach `main`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("telegram rejected the message ({status}): {body}")]
    Telegram { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, Error>;
