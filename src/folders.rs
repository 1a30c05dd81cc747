//! Folders shared by the content collections.
//!
//! Each content collection (`letters`, `gallery`, `movies`, `music`) has a
//! sibling `folders_<collection>` collection. Records join a folder through
//! their `folderId` field.
//!
//! Deleting a folder never deletes its members: the folder document is
//! removed and every member's `folderId` is set to null in one atomic batch.

#[cfg(test)]
#[path = "folders_test.rs"]
mod folders_test;

use serde_json::Value;
use tracing::{info, warn};

use crate::model::{Folder, now_ms};
use crate::store::{Direction, Document, DocumentStore, Fields, Query, StoreError, Write};

/// Field on content records pointing at their folder.
pub const FOLDER_ID_FIELD: &str = "folderId";

#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    /// Folder names must not be blank.
    #[error("folder name is empty")]
    EmptyName,

    /// The folder does not exist in this collection.
    #[error("unknown folder: {0}")]
    UnknownFolder(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A content collection that supports folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Letters,
    Gallery,
    Movies,
    Music,
}

impl ContentKind {
    pub const ALL: [Self; 4] = [Self::Letters, Self::Gallery, Self::Movies, Self::Music];

    /// Collection holding the content records.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Letters => "letters",
            Self::Gallery => "gallery",
            Self::Movies => "movies",
            Self::Music => "music",
        }
    }

    /// Collection holding this kind's folders.
    #[must_use]
    pub fn folders_collection(self) -> &'static str {
        match self {
            Self::Letters => "folders_letters",
            Self::Gallery => "folders_gallery",
            Self::Movies => "folders_movies",
            Self::Music => "folders_music",
        }
    }
}

fn clean_name(name: &str) -> Result<String, FolderError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FolderError::EmptyName);
    }
    Ok(name.to_string())
}

async fn require_folder(store: &dyn DocumentStore, kind: ContentKind, folder_id: &str) -> Result<Folder, FolderError> {
    let doc = store
        .get(kind.folders_collection(), folder_id)
        .await?
        .ok_or_else(|| FolderError::UnknownFolder(folder_id.to_string()))?;
    Ok(Folder::from_document(&doc)?)
}

/// Create a folder owned by `author`.
///
/// # Errors
///
/// [`FolderError::EmptyName`] or the store error.
pub async fn create_folder(
    store: &dyn DocumentStore,
    kind: ContentKind,
    author: &str,
    name: &str,
) -> Result<Folder, FolderError> {
    let now = now_ms();
    let mut folder = Folder {
        id: String::new(),
        name: clean_name(name)?,
        author: author.to_string(),
        created_at: now,
        updated_at: now,
    };
    folder.id = store.add(kind.folders_collection(), folder.to_fields()?).await?;
    info!(collection = kind.collection(), id = %folder.id, "folder created");
    Ok(folder)
}

/// # Errors
///
/// [`FolderError::EmptyName`], [`FolderError::UnknownFolder`] or the store
/// error.
pub async fn rename_folder(
    store: &dyn DocumentStore,
    kind: ContentKind,
    folder_id: &str,
    name: &str,
) -> Result<(), FolderError> {
    let name = clean_name(name)?;
    require_folder(store, kind, folder_id).await?;
    let mut fields = Fields::new();
    fields.insert("name".into(), Value::from(name));
    fields.insert("updatedAt".into(), Value::from(now_ms()));
    store.update(kind.folders_collection(), folder_id, fields).await?;
    Ok(())
}

/// Folders owned by `owner`, sorted by name. Unreadable folder documents are
/// skipped.
///
/// # Errors
///
/// The store error.
pub async fn list_folders(store: &dyn DocumentStore, kind: ContentKind, owner: &str) -> Result<Vec<Folder>, FolderError> {
    let query = Query::collection(kind.folders_collection())
        .where_eq("author", owner)
        .order_by("name", Direction::Ascending);
    let docs = store.query(&query).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match Folder::from_document(doc) {
            Ok(folder) => Some(folder),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping malformed folder");
                None
            }
        })
        .collect())
}

/// Put a content record in a folder, or take it out with `None`.
///
/// # Errors
///
/// [`FolderError::UnknownFolder`] for a missing target folder, or the store
/// error (`NotFound` for a missing record).
pub async fn move_to_folder(
    store: &dyn DocumentStore,
    kind: ContentKind,
    record_id: &str,
    folder_id: Option<&str>,
) -> Result<(), FolderError> {
    if let Some(id) = folder_id {
        require_folder(store, kind, id).await?;
    }
    let mut fields = Fields::new();
    fields.insert(FOLDER_ID_FIELD.into(), folder_id.map_or(Value::Null, Value::from));
    store.update(kind.collection(), record_id, fields).await?;
    Ok(())
}

/// Content records currently in a folder.
///
/// # Errors
///
/// The store error.
pub async fn list_members(
    store: &dyn DocumentStore,
    kind: ContentKind,
    folder_id: &str,
) -> Result<Vec<Document>, FolderError> {
    let query = Query::collection(kind.collection()).where_eq(FOLDER_ID_FIELD, folder_id);
    Ok(store.query(&query).await?)
}

/// Delete a folder and detach its members atomically. Returns how many
/// members were detached.
///
/// # Errors
///
/// [`FolderError::UnknownFolder`] or the store error; on error nothing
/// changed.
pub async fn delete_folder(store: &dyn DocumentStore, kind: ContentKind, folder_id: &str) -> Result<usize, FolderError> {
    require_folder(store, kind, folder_id).await?;
    let members = list_members(store, kind, folder_id).await?;

    let mut writes = Vec::with_capacity(members.len() + 1);
    writes.push(Write::Delete { collection: kind.folders_collection().to_string(), id: folder_id.to_string() });
    for member in &members {
        let mut fields = Fields::new();
        fields.insert(FOLDER_ID_FIELD.into(), Value::Null);
        writes.push(Write::Update { collection: kind.collection().to_string(), id: member.id.clone(), fields });
    }
    store.commit(writes).await?;
    info!(collection = kind.collection(), id = %folder_id, detached = members.len(), "folder deleted");
    Ok(members.len())
}
