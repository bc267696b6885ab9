//! Case document use-case service.
//!
//! # Responsibility
//! - Validate folder names, file metadata and note content.
//! - Enforce that only the folder owner renames or deletes a folder.
//!
//! # Invariants
//! - Folder names are trimmed, non-blank and at most
//!   [`MAX_FOLDER_NAME_CHARS`] characters.
//! - Note content is stored as given but must not be blank.

use crate::model::document::{CaseFile, CaseFileId, Folder, FolderId, NewCaseFile, Note, NoteId};
use crate::model::user::UserId;
use crate::repo::document_repo::DocumentRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_FOLDER_NAME_CHARS: usize = 120;

/// Errors from case document use-cases.
#[derive(Debug)]
pub enum DocumentServiceError {
    /// Folder name is blank or too long.
    InvalidFolderName(String),
    /// File metadata is incomplete or has a negative size.
    InvalidFile(String),
    /// Note content is blank after trim.
    EmptyNote,
    FolderNotFound(FolderId),
    FileNotFound(CaseFileId),
    NoteNotFound(NoteId),
    /// Caller does not own the folder.
    NotOwner {
        folder_id: FolderId,
        user_id: UserId,
    },
    /// Owner already has a folder with that name.
    FolderNameTaken(String),
    Repo(RepoError),
}

impl Display for DocumentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFolderName(message) => write!(f, "invalid folder name: {message}"),
            Self::InvalidFile(message) => write!(f, "invalid file metadata: {message}"),
            Self::EmptyNote => write!(f, "note content must not be blank"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::FileNotFound(id) => write!(f, "case file not found: {id}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::NotOwner { folder_id, user_id } => {
                write!(f, "user {user_id} does not own folder {folder_id}")
            }
            Self::FolderNameTaken(name) => write!(f, "folder name already in use: {name}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DocumentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DocumentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "folder",
                id,
            } => Self::FolderNotFound(id),
            RepoError::NotFound {
                entity: "case file",
                id,
            } => Self::FileNotFound(id),
            RepoError::NotFound { entity: "note", id } => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Case document service facade.
pub struct DocumentService<R: DocumentRepository> {
    repo: R,
}

impl<R: DocumentRepository> DocumentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_folder(
        &self,
        owner_id: UserId,
        name: &str,
    ) -> Result<Folder, DocumentServiceError> {
        let name = normalize_folder_name(name)?;
        let folder = match self.repo.create_folder(owner_id, &name) {
            Ok(folder) => folder,
            Err(RepoError::Conflict(_)) => return Err(DocumentServiceError::FolderNameTaken(name)),
            Err(err) => return Err(err.into()),
        };
        info!(
            "event=folder_create module=service status=ok folder_id={} owner_id={}",
            folder.id, owner_id
        );
        Ok(folder)
    }

    pub fn list_folders(&self, owner_id: UserId) -> Result<Vec<Folder>, DocumentServiceError> {
        self.repo.list_folders(owner_id).map_err(Into::into)
    }

    /// Renames a folder owned by `user_id`.
    pub fn rename_folder(
        &self,
        user_id: UserId,
        folder_id: FolderId,
        name: &str,
    ) -> Result<Folder, DocumentServiceError> {
        self.owned_folder(user_id, folder_id)?;
        let name = normalize_folder_name(name)?;
        match self.repo.rename_folder(folder_id, &name) {
            Ok(()) => {}
            Err(RepoError::Conflict(_)) => return Err(DocumentServiceError::FolderNameTaken(name)),
            Err(err) => return Err(err.into()),
        }
        self.repo
            .get_folder(folder_id)?
            .ok_or(DocumentServiceError::FolderNotFound(folder_id))
    }

    /// Deletes a folder owned by `user_id` together with its files and notes.
    pub fn delete_folder(
        &self,
        user_id: UserId,
        folder_id: FolderId,
    ) -> Result<(), DocumentServiceError> {
        self.owned_folder(user_id, folder_id)?;
        self.repo.delete_folder(folder_id)?;
        info!(
            "event=folder_delete module=service status=ok folder_id={folder_id} owner_id={user_id}"
        );
        Ok(())
    }

    pub fn attach_file(
        &self,
        folder_id: FolderId,
        file: NewCaseFile,
    ) -> Result<CaseFile, DocumentServiceError> {
        let file = normalize_file(file)?;
        self.repo.attach_file(folder_id, &file).map_err(Into::into)
    }

    pub fn list_files(&self, folder_id: FolderId) -> Result<Vec<CaseFile>, DocumentServiceError> {
        self.ensure_folder(folder_id)?;
        self.repo.list_files(folder_id).map_err(Into::into)
    }

    pub fn delete_file(&self, file_id: CaseFileId) -> Result<(), DocumentServiceError> {
        self.repo.delete_file(file_id).map_err(Into::into)
    }

    pub fn add_note(
        &self,
        folder_id: FolderId,
        author_id: UserId,
        content: &str,
    ) -> Result<Note, DocumentServiceError> {
        ensure_note_content(content)?;
        self.ensure_folder(folder_id)?;
        self.repo
            .add_note(folder_id, author_id, content)
            .map_err(Into::into)
    }

    pub fn update_note(&self, note_id: NoteId, content: &str) -> Result<Note, DocumentServiceError> {
        ensure_note_content(content)?;
        self.repo.update_note(note_id, content).map_err(Into::into)
    }

    pub fn list_notes(&self, folder_id: FolderId) -> Result<Vec<Note>, DocumentServiceError> {
        self.ensure_folder(folder_id)?;
        self.repo.list_notes(folder_id).map_err(Into::into)
    }

    pub fn delete_note(&self, note_id: NoteId) -> Result<(), DocumentServiceError> {
        self.repo.delete_note(note_id).map_err(Into::into)
    }

    fn ensure_folder(&self, folder_id: FolderId) -> Result<Folder, DocumentServiceError> {
        self.repo
            .get_folder(folder_id)?
            .ok_or(DocumentServiceError::FolderNotFound(folder_id))
    }

    fn owned_folder(
        &self,
        user_id: UserId,
        folder_id: FolderId,
    ) -> Result<Folder, DocumentServiceError> {
        let folder = self.ensure_folder(folder_id)?;
        if folder.owner_id != user_id {
            return Err(DocumentServiceError::NotOwner { folder_id, user_id });
        }
        Ok(folder)
    }
}

fn normalize_folder_name(name: &str) -> Result<String, DocumentServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DocumentServiceError::InvalidFolderName(
            "name must not be blank".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_FOLDER_NAME_CHARS {
        return Err(DocumentServiceError::InvalidFolderName(format!(
            "name must have at most {MAX_FOLDER_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_file(file: NewCaseFile) -> Result<NewCaseFile, DocumentServiceError> {
    let original_name = file.original_name.trim().to_string();
    if original_name.is_empty() {
        return Err(DocumentServiceError::InvalidFile(
            "original name must not be blank".to_string(),
        ));
    }
    if file.stored_path.trim().is_empty() {
        return Err(DocumentServiceError::InvalidFile(
            "stored path must not be blank".to_string(),
        ));
    }
    if file.size_bytes < 0 {
        return Err(DocumentServiceError::InvalidFile(format!(
            "size must not be negative, got {}",
            file.size_bytes
        )));
    }
    Ok(NewCaseFile {
        original_name,
        stored_path: file.stored_path,
        mime_type: file
            .mime_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        size_bytes: file.size_bytes,
    })
}

fn ensure_note_content(content: &str) -> Result<(), DocumentServiceError> {
    if content.trim().is_empty() {
        return Err(DocumentServiceError::EmptyNote);
    }
    Ok(())
}
