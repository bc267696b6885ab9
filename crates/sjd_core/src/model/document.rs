//! Case document model: folders holding uploaded files and notes.
//!
//! # Invariants
//! - Folder names are unique per owner, case-insensitively.
//! - Files and notes live and die with their folder.
//! - Files are metadata only; `stored_path` is opaque to the core.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

pub type FolderId = i64;
pub type CaseFileId = i64;
pub type NoteId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub owner_id: UserId,
    pub name: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Metadata of one uploaded case file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFile {
    pub id: CaseFileId,
    pub folder_id: FolderId,
    /// Name the file was uploaded with.
    pub original_name: String,
    /// Location chosen by the upload layer.
    pub stored_path: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    /// Epoch milliseconds.
    pub uploaded_at: i64,
}

/// Upload metadata to attach to a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCaseFile {
    pub original_name: String,
    pub stored_path: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub folder_id: FolderId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}
