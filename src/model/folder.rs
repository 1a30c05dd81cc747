//! Folder documents (`folders_<collection>`).

use serde::{Deserialize, Serialize};

use crate::store::{Document, Fields, StoreError};

/// A user-defined grouping label. Content records point at it via `folderId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Folder {
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] when required fields are missing.
    pub fn from_document(doc: &Document) -> Result<Self, StoreError> {
        let mut folder: Self = super::decode(doc)?;
        folder.id.clone_from(&doc.id);
        Ok(folder)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if serialization fails.
    pub fn to_fields(&self) -> Result<Fields, StoreError> {
        super::encode(self)
    }
}
