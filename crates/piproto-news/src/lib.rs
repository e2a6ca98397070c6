//! piproto-news
//!
//! Read-only announcement feed. Built once at startup, either from the
//! built-in announcements or from a JSON array on disk, and never mutated
//! afterwards.

pub mod builtin;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use builtin::BUILTIN_ITEMS;

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("cannot read news file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed news file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct NewsFeed {
    items: Vec<NewsItem>,
}

impl NewsFeed {
    /// The built-in announcements, all stamped with `published_at`.
    pub fn builtin(published_at: DateTime<Utc>) -> Self {
        let items = BUILTIN_ITEMS
            .iter()
            .map(|(id, title, content)| NewsItem {
                id: (*id).to_string(),
                title: (*title).to_string(),
                content: (*content).to_string(),
                published_at,
            })
            .collect();
        Self { items }
    }

    /// Load a JSON array of items from `path`.
    pub fn load(path: &Path) -> Result<Self, NewsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| NewsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let items: Vec<NewsItem> = serde_json::from_str(&raw).map_err(|source| NewsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), count = items.len(), "news feed loaded");
        Ok(Self { items })
    }

    pub fn items(&self) -> &[NewsItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "piproto_news_test_{}_{}.json",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn builtin_has_five_items_in_order() {
        let now = Utc::now();
        let feed = NewsFeed::builtin(now);
        assert_eq!(feed.len(), 5);
        let ids: Vec<_> = feed.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert!(feed.items().iter().all(|i| i.published_at == now));
        assert!(feed.items()[0].title.contains("Version 2.0"));
    }

    #[test]
    fn load_reads_json_array() {
        let path = temp_file(
            "ok",
            r#"[{"id":"a","title":"T","content":"C","published_at":"2025-10-01T00:00:00Z"}]"#,
        );
        let feed = NewsFeed::load(&path).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.items()[0].id, "a");
        assert_eq!(feed.items()[0].published_at.timestamp(), 1_759_276_800);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_reports_bad_files() {
        let missing = std::env::temp_dir().join("piproto_news_test_does_not_exist.json");
        assert!(matches!(NewsFeed::load(&missing), Err(NewsError::Read { .. })));

        let path = temp_file("bad", "{ not json");
        assert!(matches!(NewsFeed::load(&path), Err(NewsError::Parse { .. })));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn builtin_serialises_with_snake_case_timestamp() {
        let feed = NewsFeed::builtin(Utc::now());
        let json = serde_json::to_value(feed.items()).unwrap();
        assert!(json[0].get("published_at").is_some());
    }
}
