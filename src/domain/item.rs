use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// A normalized feed entry, as emitted by every bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub uri: Url,
    pub uid: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub categories: BTreeSet<String>,
    pub content: Option<String>,
    pub enclosures: Vec<Url>,
}

impl Item {
    /// Create an item whose uid is derived from its uri alone.
    pub fn new(title: impl Into<String>, uri: Url) -> Self {
        let uid = Self::generate_uid(&[uri.as_str()]);
        Self {
            title: title.into(),
            uri,
            uid,
            timestamp: None,
            author: None,
            categories: BTreeSet::new(),
            content: None,
            enclosures: Vec::new(),
        }
    }

    /// Generate a deterministic uid from the parts that identify one
    /// version of an entity (uri, update date, chapter count, ...).
    pub fn generate_uid(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Replace the uid with one derived from the uri plus version parts.
    pub fn with_version(mut self, parts: &[&str]) -> Self {
        let mut all = Vec::with_capacity(parts.len() + 1);
        all.push(self.uri.as_str());
        all.extend_from_slice(parts);
        self.uid = Self::generate_uid(&all);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.is_empty());
        self
    }

    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = content;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.is_empty() {
            self.categories.insert(category);
        }
        self
    }

    pub fn with_enclosure(mut self, enclosure: Url) -> Self {
        self.enclosures.push(enclosure);
        self
    }
}
