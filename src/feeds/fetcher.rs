use std::time::Duration;

use url::Url;

use crate::{
    common::{epoch_millis, Result},
    config::AppConfig,
};

use super::data_types::NewsItem;

/// Request timeout for a single feed poll
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct FeedFetcher {
    client: reqwest::Client,
    feed_url: String,
}

impl FeedFetcher {
    /// Create a fetcher for the feed URL in the config. The URL is only
    /// checked when polling, so a bad one fails each cycle instead of startup.
    pub fn new(config: &AppConfig) -> Result<FeedFetcher> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            feed_url: config.feed_url.clone(),
        })
    }

    /// Feed URL with the `_t` cache buster appended to whatever query it
    /// already carries
    fn request_url(&self, timestamp: i64) -> Result<Url> {
        let mut url = Url::parse(&self.feed_url)?;
        url.query_pairs_mut()
            .append_pair("_t", &timestamp.to_string());
        Ok(url)
    }

    /// Fetch the current flash list, oldest entry first. Entries that don't
    /// look like news items are dropped; a response without the news list
    /// yields an empty batch.
    pub async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let body = self
            .client
            .get(self.request_url(epoch_millis())?)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        Ok(extract_news(&body))
    }
}

/// Pull `data.data.news` out of a feed response and reverse it
pub fn extract_news(body: &serde_json::Value) -> Vec<NewsItem> {
    let Some(entries) = body
        .pointer("/data/data/news")
        .and_then(serde_json::Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .rev()
        .filter_map(|entry| match serde_json::from_value::<NewsItem>(entry.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping malformed news entry: {e}");
                None
            }
        })
        .collect()
}
