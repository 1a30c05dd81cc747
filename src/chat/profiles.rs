//! Opportunistic per-author profile cache.
//!
//! Each author seen in the feed is looked up once per session. Lookups run
//! as detached tasks and report back through the session channel; if the
//! session is gone by then, the result is discarded.

#[cfg(test)]
#[path = "profiles_test.rs"]
mod profiles_test;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::feed::FeedEvent;
use crate::model::Profile;
use crate::model::profile::display_label;
use crate::store::{DocumentStore, StoreError};

/// Collection holding `profiles/{uid}`.
pub const PROFILES: &str = "profiles";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEntry {
    /// Lookup issued, no answer yet.
    Pending,
    Loaded(Profile),
    /// No profile document, or it could not be read.
    Missing,
}

#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: HashMap<String, ProfileEntry>,
}

impl ProfileCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every unseen author as pending and return them for fetching.
    pub fn claim_missing<'a>(&mut self, authors: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut claimed = Vec::new();
        for author in authors {
            if author.is_empty() || self.entries.contains_key(author) {
                continue;
            }
            self.entries.insert(author.to_string(), ProfileEntry::Pending);
            claimed.push(author.to_string());
        }
        claimed
    }

    pub fn resolve(&mut self, uid: &str, profile: Option<Profile>) {
        let entry = profile.map_or(ProfileEntry::Missing, ProfileEntry::Loaded);
        self.entries.insert(uid.to_string(), entry);
    }

    #[must_use]
    pub fn entry(&self, uid: &str) -> Option<&ProfileEntry> {
        self.entries.get(uid)
    }

    #[must_use]
    pub fn get(&self, uid: &str) -> Option<&Profile> {
        match self.entries.get(uid) {
            Some(ProfileEntry::Loaded(profile)) => Some(profile),
            _ => None,
        }
    }

    /// Display label for an author: profile name, email local part, raw id.
    #[must_use]
    pub fn label(&self, author: &str, email: Option<&str>) -> String {
        display_label(author, email, self.get(author))
    }
}

/// Read `profiles/{uid}`.
///
/// # Errors
///
/// Store failures and malformed profile documents.
pub async fn fetch_profile(store: &dyn DocumentStore, uid: &str) -> Result<Option<Profile>, StoreError> {
    match store.get(PROFILES, uid).await? {
        Some(doc) => Profile::from_document(&doc).map(Some),
        None => Ok(None),
    }
}

/// Look up `uid` in the background and report a [`FeedEvent::Profile`].
pub fn spawn_profile_fetch(store: Arc<dyn DocumentStore>, uid: String, tx: mpsc::Sender<FeedEvent>) {
    tokio::spawn(async move {
        let profile = match fetch_profile(store.as_ref(), &uid).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(%uid, error = %e, "profile lookup failed");
                None
            }
        };
        if tx.send(FeedEvent::Profile { uid, profile }).await.is_err() {
            debug!("session closed before profile arrived");
        }
    });
}
