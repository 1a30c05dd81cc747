//! Theme variants and their style tokens.
//!
//! DESIGN
//! ======
//! A theme is a tag ([`ThemeVariant`]) resolved through a static table to a
//! [`StyleTokens`] record. [`ThemeContext`] is an explicit value handed to
//! whatever renders; selecting a variant is its only mutation.
//!
//! PERSISTENCE
//! ===========
//! The choice is saved to `userSettings/{uid}.theme` and mirrored into local
//! preferences. Loading prefers the store, then local preferences, then the
//! default, so the last choice shows even when offline.

#[cfg(test)]
#[path = "theme_test.rs"]
mod theme_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::prefs::LocalPrefs;
use crate::store::{DocumentStore, Fields, StoreError};

/// Collection holding per-user settings documents.
pub const USER_SETTINGS: &str = "userSettings";
/// Local preference key mirroring the selected theme.
pub const THEME_PREF_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    #[default]
    Classic,
    Midnight,
    Rose,
    Ocean,
    Lavender,
}

impl ThemeVariant {
    pub const ALL: [Self; 5] = [Self::Classic, Self::Midnight, Self::Rose, Self::Ocean, Self::Lavender];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Midnight => "midnight",
            Self::Rose => "rose",
            Self::Ocean => "ocean",
            Self::Lavender => "lavender",
        }
    }

    #[must_use]
    pub fn tokens(self) -> &'static StyleTokens {
        &THEME_TABLE[self as usize]
    }
}

impl fmt::Display for ThemeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemeVariant {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

/// Colors a renderer needs, as CSS color strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTokens {
    pub background: &'static str,
    pub surface: &'static str,
    pub primary: &'static str,
    pub accent: &'static str,
    pub text: &'static str,
    pub muted_text: &'static str,
    pub bubble_own: &'static str,
    pub bubble_other: &'static str,
    pub dark: bool,
}

/// Indexed by `ThemeVariant as usize`.
static THEME_TABLE: [StyleTokens; 5] = [
    StyleTokens {
        background: "#faf7f2",
        surface: "#ffffff",
        primary: "#8b5e3c",
        accent: "#d4a373",
        text: "#2d2a26",
        muted_text: "#7a746c",
        bubble_own: "#e9dccb",
        bubble_other: "#ffffff",
        dark: false,
    },
    StyleTokens {
        background: "#0f1424",
        surface: "#1a2138",
        primary: "#7c8cff",
        accent: "#f5c26b",
        text: "#e6e9f5",
        muted_text: "#8a93b2",
        bubble_own: "#2e3a66",
        bubble_other: "#222a45",
        dark: true,
    },
    StyleTokens {
        background: "#fff5f7",
        surface: "#ffffff",
        primary: "#d6336c",
        accent: "#f783ac",
        text: "#3b1f2b",
        muted_text: "#9c6b7d",
        bubble_own: "#ffd6e3",
        bubble_other: "#ffffff",
        dark: false,
    },
    StyleTokens {
        background: "#f0f8fb",
        surface: "#ffffff",
        primary: "#1c7ed6",
        accent: "#3bc9db",
        text: "#0b2a3a",
        muted_text: "#5f7f90",
        bubble_own: "#d0ebff",
        bubble_other: "#ffffff",
        dark: false,
    },
    StyleTokens {
        background: "#f7f4fd",
        surface: "#ffffff",
        primary: "#7950f2",
        accent: "#b197fc",
        text: "#2b2340",
        muted_text: "#80789a",
        bubble_own: "#e5dbff",
        bubble_other: "#ffffff",
        dark: false,
    },
];

/// The active theme, passed explicitly to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemeContext {
    variant: ThemeVariant,
}

impl ThemeContext {
    #[must_use]
    pub fn new(variant: ThemeVariant) -> Self {
        Self { variant }
    }

    #[must_use]
    pub fn variant(&self) -> ThemeVariant {
        self.variant
    }

    #[must_use]
    pub fn tokens(&self) -> &'static StyleTokens {
        self.variant.tokens()
    }

    pub fn select(&mut self, variant: ThemeVariant) {
        self.variant = variant;
    }

    /// Resolve the user's theme: store, then local preferences, then default.
    pub async fn load(store: &dyn DocumentStore, uid: &str, prefs: &LocalPrefs) -> Self {
        match load_stored(store, uid).await {
            Ok(Some(variant)) => return Self::new(variant),
            Ok(None) => {}
            Err(e) => warn!(%uid, error = %e, "theme setting unavailable; using local preference"),
        }
        let local = prefs.get(THEME_PREF_KEY).and_then(|raw| raw.parse().ok());
        Self::new(local.unwrap_or_default())
    }

    /// Select `variant` and persist it locally and to the store.
    ///
    /// The selection and the local mirror stick even when the store write
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the store error from saving `userSettings/{uid}`.
    pub async fn choose(
        &mut self,
        variant: ThemeVariant,
        store: &dyn DocumentStore,
        uid: &str,
        prefs: &mut LocalPrefs,
    ) -> Result<(), StoreError> {
        self.select(variant);
        prefs.set(THEME_PREF_KEY, variant.as_str());
        save_stored(store, uid, variant).await
    }
}

async fn load_stored(store: &dyn DocumentStore, uid: &str) -> Result<Option<ThemeVariant>, StoreError> {
    let Some(doc) = store.get(USER_SETTINGS, uid).await? else {
        return Ok(None);
    };
    let raw = doc.fields.get("theme").and_then(Value::as_str);
    let variant = raw.and_then(|r| match r.parse::<ThemeVariant>() {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(%uid, error = %e, "ignoring stored theme");
            None
        }
    });
    Ok(variant)
}

async fn save_stored(store: &dyn DocumentStore, uid: &str, variant: ThemeVariant) -> Result<(), StoreError> {
    // Merge so other settings on the document survive.
    let mut fields: Fields = store.get(USER_SETTINGS, uid).await?.map(|d| d.fields).unwrap_or_default();
    fields.insert("theme".into(), Value::from(variant.as_str()));
    store.set(USER_SETTINGS, uid, fields).await
}
