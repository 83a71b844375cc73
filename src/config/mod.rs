use serde::Deserialize;

use crate::{
    common::{Error, Result},
    sender::{ConsoleSender, Sender, TelegramSender},
};

const DEFAULT_FEED_URL: &str =
    "https://news.futunn.com/news-site-api/main/get-flash-list?pageSize=30";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_SENT_IDS_FILE: &str = "./futunn_sent_news_ids.json";
const DEFAULT_MIN_INTERVAL_MS: u64 = 10_000;
const DEFAULT_MAX_INTERVAL_MS: u64 = 30_000;

pub const ENV_BOT_TOKEN: &str = "TG_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TG_CHAT_ID";
pub const ENV_TELEGRAM_API_URL: &str = "TG_API_URL";
pub const ENV_FEED_URL: &str = "FUTUNN_API_URL";
pub const ENV_SENT_IDS_FILE: &str = "SENT_KEYS_FILE";
pub const ENV_MIN_INTERVAL_MS: &str = "MIN_INTERVAL_MS";
pub const ENV_MAX_INTERVAL_MS: &str = "MAX_INTERVAL_MS";

/// Optional settings read from a JSON config file. Anything left out falls
/// back to the built-in defaults.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FileConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub telegram_api_url: Option<String>,
    pub feed_url: Option<String>,
    pub sent_ids_file: Option<String>,
    pub min_interval_ms: Option<u64>,
    pub max_interval_ms: Option<u64>,
}

impl FileConfig {
    pub fn from_file(file_name: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(file_name)
            .map_err(|e| Error::Config(format!("cannot read {file_name}: {e}")))?;
        Self::from_str(&contents)
    }

    pub fn from_str(contents: &str) -> Result<Self> {
        let config: FileConfig = serde_json::from_str(contents)?;
        Ok(config)
    }
}

/// Runtime settings, resolved once at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub telegram_api_url: String,
    pub feed_url: String,
    pub sent_ids_file: String,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            sent_ids_file: DEFAULT_SENT_IDS_FILE.to_string(),
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional config file, then the process environment
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let file = config_file.map(FileConfig::from_file).transpose()?;
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Layer `file` and the variables returned by `env` over the defaults
    pub fn resolve(file: Option<FileConfig>, env: impl Fn(&str) -> Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = AppConfig::default();

        let text = |key: &str, from_file: Option<String>, default: String| {
            env(key).or(from_file).unwrap_or(default)
        };
        // Unparsable or zero intervals fall back, the same as an unset variable
        let interval = |key: &str, from_file: Option<u64>, default: u64| {
            env(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .or(from_file.filter(|v| *v > 0))
                .unwrap_or(default)
        };

        let mut config = Self {
            bot_token: text(ENV_BOT_TOKEN, file.bot_token, defaults.bot_token),
            chat_id: text(ENV_CHAT_ID, file.chat_id, defaults.chat_id),
            telegram_api_url: text(
                ENV_TELEGRAM_API_URL,
                file.telegram_api_url,
                defaults.telegram_api_url,
            ),
            feed_url: text(ENV_FEED_URL, file.feed_url, defaults.feed_url),
            sent_ids_file: text(ENV_SENT_IDS_FILE, file.sent_ids_file, defaults.sent_ids_file),
            min_interval_ms: interval(
                ENV_MIN_INTERVAL_MS,
                file.min_interval_ms,
                defaults.min_interval_ms,
            ),
            max_interval_ms: interval(
                ENV_MAX_INTERVAL_MS,
                file.max_interval_ms,
                defaults.max_interval_ms,
            ),
        };

        if config.min_interval_ms > config.max_interval_ms {
            tracing::warn!(
                "{ENV_MIN_INTERVAL_MS} ({}) is above {ENV_MAX_INTERVAL_MS} ({}), swapping them",
                config.min_interval_ms,
                config.max_interval_ms
            );
            std::mem::swap(&mut config.min_interval_ms, &mut config.max_interval_ms);
        }

        config
    }

    pub fn has_credentials(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    /// Pick the sender: the console for dry runs, Telegram otherwise. Without
    /// credentials, or with an unusable Telegram API URL, the sender only
    /// reports that it can't send.
    pub fn get_sender(&self, dry_run: bool) -> Sender {
        if dry_run {
            return Sender::Console(ConsoleSender {});
        }
        if !self.has_credentials() {
            return Sender::Unconfigured;
        }
        match TelegramSender::new(self) {
            Ok(sender) => Sender::Telegram(sender),
            Err(e) => {
                tracing::error!("Cannot set up Telegram sender, messages will not be sent: {e}");
                Sender::Unconfigured
            }
        }
    }
}
