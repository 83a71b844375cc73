use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{common::Result, feeds::prelude::NewsId};

/// Number of ids kept in the sent-ids file
pub const MAX_STORED_IDS: usize = 5000;

pub trait FileStorage {
    fn from_path(path: &Path) -> Self;
    fn contains(&self, id: &NewsId) -> bool;
    fn insert_items(&mut self, ids: &[NewsId]);
    fn dump(&mut self);
}

/// Ids of news items that were already sent, oldest first. The file only
/// keeps the most recent `MAX_STORED_IDS`, but every id seen since startup
/// stays in the membership set.
pub struct Storage {
    path: PathBuf,
    ids: Vec<NewsId>,
    seen: HashSet<NewsId>,
}

impl Storage {
    /// Entries that aren't a number or a string are skipped one by one, so a
    /// single odd value doesn't cost the whole list
    fn read_file(path: &Path) -> Result<Vec<NewsId>> {
        let contents = std::fs::read_to_string(path)?;
        let values: Vec<serde_json::Value> = serde_json::from_str(&contents)?;
        let ids = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<NewsId>(value) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Skipping unreadable id in {}: {e}", path.display());
                    None
                }
            })
            .collect();
        Ok(ids)
    }

    fn write_file(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.ids)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Drop the oldest ids so that at most `MAX_STORED_IDS` remain
    fn truncate(&mut self) {
        if self.ids.len() > MAX_STORED_IDS {
            let excess = self.ids.len() - MAX_STORED_IDS;
            self.ids.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FileStorage for Storage {
    /// Load the ids stored at `path`. A missing, unreadable or corrupt file
    /// gives an empty storage.
    fn from_path(path: &Path) -> Self {
        let ids = match Self::read_file(path) {
            Ok(ids) => ids,
            Err(crate::common::Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No sent ids file at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Cannot read sent ids file {}: {e}", path.display());
                Vec::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            seen: ids.iter().cloned().collect(),
            ids,
        }
    }

    fn contains(&self, id: &NewsId) -> bool {
        self.seen.contains(id)
    }

    fn insert_items(&mut self, ids: &[NewsId]) {
        for id in ids {
            self.seen.insert(id.clone());
            self.ids.push(id.clone());
        }
    }

    /// Write the most recent ids to the file. Failures are logged only.
    fn dump(&mut self) {
        self.truncate();
        if let Err(e) = self.write_file() {
            tracing::error!("Cannot write sent ids file {}: {e}", self.path.display());
        }
    }
}
