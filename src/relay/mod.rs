use std::path::Path;

use crate::{
    common::Result,
    config::AppConfig,
    feeds::prelude::{FeedFetcher, NewsId},
    sender::Notifier,
    storage::{FileStorage, Storage},
};

/// One poll of the feed: fetch, skip what was already sent, push the rest
pub trait Cycle {
    async fn run_cycle(&mut self) -> Result<Vec<NewsId>>;
}

/// Moves new flash news from the feed to the chat
pub struct Relay {
    fetcher: FeedFetcher,
    notifier: Notifier,
    storage: Storage,
}

impl Relay {
    pub fn new(config: &AppConfig, dry_run: bool) -> Result<Self> {
        if !dry_run && !config.has_credentials() {
            tracing::warn!(
                "TG_BOT_TOKEN or TG_CHAT_ID is not set, news will be detected but not sent"
            );
        }

        let storage = Storage::from_path(Path::new(&config.sent_ids_file));
        tracing::info!(
            "Loaded {} sent ids from {}",
            storage.len(),
            config.sent_ids_file
        );

        Ok(Self::from_parts(
            FeedFetcher::new(config)?,
            Notifier::new(config.get_sender(dry_run)),
            storage,
        ))
    }

    #[must_use]
    pub fn from_parts(fetcher: FeedFetcher, notifier: Notifier, storage: Storage) -> Self {
        Self {
            fetcher,
            notifier,
            storage,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

impl Cycle for Relay {
    /// Dispatch every unseen item, oldest first, and persist the ids. An id
    /// counts as sent as soon as its message is dispatched, whether or not
    /// the delivery succeeds. Returns the new ids in dispatch order.
    async fn run_cycle(&mut self) -> Result<Vec<NewsId>> {
        tracing::info!("Polling the flash news feed");

        let news = self.fetcher.fetch().await?;
        let mut new_ids = Vec::new();

        for item in &news {
            let Some(id) = item.id.as_ref().filter(|id| !id.is_blank()) else {
                continue;
            };
            if self.storage.contains(id) {
                continue;
            }

            self.notifier.dispatch(item);
            self.storage.insert_items(std::slice::from_ref(id));
            new_ids.push(id.clone());
        }

        if !new_ids.is_empty() {
            self.storage.dump();
            tracing::info!("Found {} new items and pushed them", new_ids.len());
        }

        Ok(new_ids)
    }
}

#[cfg(test)]
mod test {
    use super::{Cycle, Relay};
    use crate::{
        config::AppConfig,
        feeds::prelude::{FeedFetcher, NewsId},
        sender::Notifier,
        storage::{FileStorage, Storage},
    };
    use httpmock::prelude::*;
    use std::{path::Path, time::Duration};
    use tokio::test;

    const FEED_BODY: &str = r#"{"data": {"data": {"news": [
        {"id": 1, "title": "A"},
        {"id": 2, "title": "B"}
    ]}}}"#;

    fn relay_for(config: &AppConfig, storage: Storage) -> Relay {
        Relay::from_parts(
            FeedFetcher::new(config).unwrap(),
            Notifier::new(config.get_sender(false)),
            storage,
        )
    }

    fn config_for(server: &MockServer, sent_ids_file: &Path) -> AppConfig {
        AppConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "8013".to_string(),
            telegram_api_url: server.base_url(),
            feed_url: server.url("/flash?pageSize=30"),
            sent_ids_file: sent_ids_file.to_string_lossy().to_string(),
            ..AppConfig::default()
        }
    }

    fn stored_ids(path: &Path) -> Vec<NewsId> {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    async fn test_new_items_are_sent_oldest_first() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        let feed_mock = server.mock(|when, then| {
            when.method(GET).path("/flash");
            then.status(200)
                .header("content-type", "application/json")
                .body(FEED_BODY);
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(200).body(r#"{"ok": true}"#);
        });

        let config = config_for(&server, &path);
        let mut relay = relay_for(&config, Storage::from_path(&path));
        let new_ids = relay.run_cycle().await.unwrap();

        assert_eq!(new_ids, vec![NewsId::number(2), NewsId::number(1)]);
        assert!(relay.notifier().wait_idle(Duration::from_secs(5)).await);
        feed_mock.assert();
        send_mock.assert_hits(2);
        assert_eq!(stored_ids(&path), vec![NewsId::number(2), NewsId::number(1)]);
    }

    #[test]
    async fn test_known_ids_are_not_sent_again() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        std::fs::write(&path, "[1]").unwrap();

        server.mock(|when, then| {
            when.method(GET).path("/flash");
            then.status(200).body(FEED_BODY);
        });
        let send_b = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .json_body_partial(r#"{"text": "*B*"}"#);
            then.status(200).body(r#"{"ok": true}"#);
        });

        let config = config_for(&server, &path);
        let mut relay = relay_for(&config, Storage::from_path(&path));

        let first = relay.run_cycle().await.unwrap();
        assert_eq!(first, vec![NewsId::number(2)]);

        let second = relay.run_cycle().await.unwrap();
        assert!(second.is_empty());

        assert!(relay.notifier().wait_idle(Duration::from_secs(5)).await);
        send_b.assert_hits(1);
        assert_eq!(stored_ids(&path), vec![NewsId::number(1), NewsId::number(2)]);
    }

    #[test]
    async fn test_unparsable_feed_url_fails_each_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        let config = AppConfig {
            feed_url: "news.futunn.com/flash".to_string(),
            sent_ids_file: path.to_string_lossy().to_string(),
            ..AppConfig::default()
        };

        let mut relay = Relay::new(&config, true).expect("startup must survive a bad feed URL");
        assert!(relay.run_cycle().await.is_err());
        assert!(relay.run_cycle().await.is_err());
        assert!(!path.exists());
    }

    #[test]
    async fn test_failed_fetch_leaves_file_alone() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        server.mock(|when, then| {
            when.method(GET).path("/flash");
            then.status(500).body("oops");
        });

        let config = config_for(&server, &path);
        let mut relay = relay_for(&config, Storage::from_path(&path));

        assert!(relay.run_cycle().await.is_err());
        assert!(!path.exists());
    }

    #[test]
    async fn test_failed_send_still_records_id() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        server.mock(|when, then| {
            when.method(GET).path("/flash");
            then.status(200).body(FEED_BODY);
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(403).body(r#"{"ok": false, "description": "Forbidden"}"#);
        });

        let config = config_for(&server, &path);
        let mut relay = relay_for(&config, Storage::from_path(&path));
        relay.run_cycle().await.unwrap();

        assert!(relay.notifier().wait_idle(Duration::from_secs(5)).await);
        send_mock.assert_hits(2);
        assert_eq!(stored_ids(&path).len(), 2);
        assert!(relay.run_cycle().await.unwrap().is_empty());
    }

    #[test]
    async fn test_missing_credentials_records_without_sending() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        server.mock(|when, then| {
            when.method(GET).path("/flash");
            then.status(200).body(FEED_BODY);
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let config = AppConfig {
            bot_token: String::new(),
            ..config_for(&server, &path)
        };
        let mut relay = relay_for(&config, Storage::from_path(&path));
        let new_ids = relay.run_cycle().await.unwrap();

        assert!(relay.notifier().wait_idle(Duration::from_secs(5)).await);
        assert_eq!(new_ids.len(), 2);
        send_mock.assert_hits(0);
        assert_eq!(stored_ids(&path), vec![NewsId::number(2), NewsId::number(1)]);
    }

    #[test]
    async fn test_blank_and_repeated_ids() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        server.mock(|when, then| {
            when.method(GET).path("/flash");
            then.status(200).body(
                r#"{"data": {"data": {"news": [
                    {"id": 0, "title": "zero"},
                    {"title": "no id"},
                    {"id": "", "title": "empty"},
                    {"id": "n-9", "title": "once"},
                    {"id": "n-9", "title": "twice"}
                ]}}}"#,
            );
        });
        let send_mock = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(200).body(r#"{"ok": true}"#);
        });

        let config = config_for(&server, &path);
        let mut relay = relay_for(&config, Storage::from_path(&path));
        let new_ids = relay.run_cycle().await.unwrap();

        assert!(relay.notifier().wait_idle(Duration::from_secs(5)).await);
        assert_eq!(new_ids, vec![NewsId::Text("n-9".to_string())]);
        send_mock.assert_hits(1);
    }
}
