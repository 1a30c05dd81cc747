//! Per-user profile documents (`profiles/{uid}`).

use serde::{Deserialize, Serialize};

use crate::store::{Document, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip)]
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Inline-encoded avatar image.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub favorite_emoji: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub favorite_quote: Option<String>,
}

impl Profile {
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] when fields have the wrong types.
    pub fn from_document(doc: &Document) -> Result<Self, StoreError> {
        let mut profile: Self = super::decode(doc)?;
        profile.uid.clone_from(&doc.id);
        Ok(profile)
    }

    /// Non-blank display name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Label shown for an author: profile name, then email local part, then id.
#[must_use]
pub fn display_label(author: &str, email: Option<&str>, profile: Option<&Profile>) -> String {
    if let Some(name) = profile.and_then(Profile::name) {
        return name.to_string();
    }
    if let Some(local) = email.and_then(|e| e.split('@').next()).filter(|l| !l.is_empty()) {
        return local.to_string();
    }
    author.to_string()
}
