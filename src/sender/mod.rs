use std::time::Duration;

use serde::Serialize;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::{
    common::{Error, Result},
    config::AppConfig,
    feeds::prelude::NewsItem,
};

mod markdown;

pub use markdown::format_message;

#[derive(Clone)]
pub enum Sender {
    Console(ConsoleSender),
    Telegram(TelegramSender),
    /// Bot token or chat id missing; every send fails without a request
    Unconfigured,
}

impl Sender {
    pub async fn send_message(&self, text: &str) -> Result<()> {
        match self {
            Sender::Console(sender) => sender.send_message(text).await,
            Sender::Telegram(sender) => sender.send_message(text).await,
            Sender::Unconfigured => Err(Error::Config(
                "Telegram credentials are missing, message not sent".to_string(),
            )),
        }
    }
}

pub trait MessageSender {
    async fn send_message(&self, text: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct ConsoleSender {}

#[derive(Clone)]
pub struct TelegramSender {
    client: reqwest::Client,
    endpoint: Url,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

impl TelegramSender {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}/bot{}/sendMessage",
            config.telegram_api_url.trim_end_matches('/'),
            config.bot_token
        ))?;

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            endpoint,
            chat_id: config.chat_id.clone(),
        })
    }
}

impl MessageSender for TelegramSender {
    async fn send_message(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Telegram {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl MessageSender for ConsoleSender {
    async fn send_message(&self, text: &str) -> Result<()> {
        tracing::info!("[dry-run] {text}");
        Ok(())
    }
}

/// Fire-and-forget delivery of news items. Sends run as background tasks;
/// their outcome is only logged.
pub struct Notifier {
    sender: Sender,
    tasks: TaskTracker,
}

impl Notifier {
    #[must_use]
    pub fn new(sender: Sender) -> Self {
        Self {
            sender,
            tasks: TaskTracker::new(),
        }
    }

    /// Format the item and start sending it without waiting for the result
    pub fn dispatch(&self, item: &NewsItem) {
        let text = format_message(item);
        let title = item.clean_title();
        let sender = self.sender.clone();

        self.tasks.spawn(async move {
            match sender.send_message(&text).await {
                Ok(()) => tracing::debug!("Sent: {title}"),
                Err(e) => tracing::error!("Telegram push failed ({title}): {e}"),
            }
        });
    }

    /// Wait up to `grace` for in-flight sends. Returns false if some were
    /// still running when the time ran out.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        self.tasks.close();
        let finished = tokio::time::timeout(grace, self.tasks.wait())
            .await
            .is_ok();
        self.tasks.reopen();
        finished
    }
}
