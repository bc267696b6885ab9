//! Case document repository: folders, file metadata and notes.
//!
//! # Responsibility
//! - Persist per-owner folders and the files/notes filed under them.
//! - Keep SQL details and ordering behavior inside the repository boundary.
//!
//! # Invariants
//! - Folder listing is ordered by `name COLLATE NOCASE ASC, id ASC`.
//! - File and note listings are ordered newest first, ties by id.
//! - Deleting a folder removes its files and notes (FK cascade).

use crate::db::is_constraint_violation;
use crate::model::document::{
    CaseFile, CaseFileId, Folder, FolderId, NewCaseFile, Note, NoteId,
};
use crate::model::user::UserId;
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const FOLDER_SELECT_SQL: &str = "SELECT id, owner_id, name, created_at, updated_at FROM folders";
const FILE_SELECT_SQL: &str = "SELECT
    id,
    folder_id,
    original_name,
    stored_path,
    mime_type,
    size_bytes,
    uploaded_at
FROM case_files";
const NOTE_SELECT_SQL: &str =
    "SELECT id, folder_id, author_id, content, created_at, updated_at FROM notes";

/// Repository interface for folder/file/note operations.
pub trait DocumentRepository {
    /// Creates one folder; a duplicate name for the owner is `Conflict`.
    fn create_folder(&self, owner_id: UserId, name: &str) -> RepoResult<Folder>;
    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>>;
    fn list_folders(&self, owner_id: UserId) -> RepoResult<Vec<Folder>>;
    fn rename_folder(&self, id: FolderId, name: &str) -> RepoResult<()>;
    /// Deletes one folder with all of its files and notes.
    fn delete_folder(&self, id: FolderId) -> RepoResult<()>;

    fn attach_file(&self, folder_id: FolderId, file: &NewCaseFile) -> RepoResult<CaseFile>;
    fn list_files(&self, folder_id: FolderId) -> RepoResult<Vec<CaseFile>>;
    fn delete_file(&self, id: CaseFileId) -> RepoResult<()>;

    fn add_note(&self, folder_id: FolderId, author_id: UserId, content: &str) -> RepoResult<Note>;
    fn update_note(&self, id: NoteId, content: &str) -> RepoResult<Note>;
    fn list_notes(&self, folder_id: FolderId) -> RepoResult<Vec<Note>>;
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_folder(&self, owner_id: UserId, name: &str) -> RepoResult<Folder> {
        let inserted = self.conn.execute(
            "INSERT INTO folders (owner_id, name) VALUES (?1, ?2);",
            params![owner_id, name],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(folder_conflict(self.conn, owner_id, name, err));
            }
            Err(err) => return Err(err.into()),
        }

        let id = self.conn.last_insert_rowid();
        self.get_folder(id)?
            .ok_or(RepoError::NotFound { entity: "folder", id })
    }

    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FOLDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(row)?));
        }
        Ok(None)
    }

    fn list_folders(&self, owner_id: UserId) -> RepoResult<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FOLDER_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([owner_id])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(row)?);
        }
        Ok(folders)
    }

    fn rename_folder(&self, id: FolderId, name: &str) -> RepoResult<()> {
        let updated = self.conn.execute(
            "UPDATE folders
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, name],
        );
        match updated {
            Ok(0) => Err(RepoError::NotFound { entity: "folder", id }),
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => Err(RepoError::Conflict(format!(
                "folder name `{name}` is already in use"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_folder(&self, id: FolderId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM folders WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "folder", id });
        }
        Ok(())
    }

    fn attach_file(&self, folder_id: FolderId, file: &NewCaseFile) -> RepoResult<CaseFile> {
        let inserted = self.conn.execute(
            "INSERT INTO case_files (
                folder_id,
                original_name,
                stored_path,
                mime_type,
                size_bytes
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                folder_id,
                file.original_name.as_str(),
                file.stored_path.as_str(),
                file.mime_type.as_deref(),
                file.size_bytes,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(RepoError::NotFound {
                    entity: "folder",
                    id: folder_id,
                });
            }
            Err(err) => return Err(err.into()),
        }

        let id = self.conn.last_insert_rowid();
        let mut stmt = self
            .conn
            .prepare(&format!("{FILE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return parse_file_row(row);
        }
        Err(RepoError::NotFound { entity: "case file", id })
    }

    fn list_files(&self, folder_id: FolderId) -> RepoResult<Vec<CaseFile>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FILE_SELECT_SQL}
             WHERE folder_id = ?1
             ORDER BY uploaded_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([folder_id])?;
        let mut files = Vec::new();
        while let Some(row) = rows.next()? {
            files.push(parse_file_row(row)?);
        }
        Ok(files)
    }

    fn delete_file(&self, id: CaseFileId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM case_files WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "case file", id });
        }
        Ok(())
    }

    fn add_note(&self, folder_id: FolderId, author_id: UserId, content: &str) -> RepoResult<Note> {
        let inserted = self.conn.execute(
            "INSERT INTO notes (folder_id, author_id, content) VALUES (?1, ?2, ?3);",
            params![folder_id, author_id, content],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(RepoError::InvalidData(format!(
                    "note references unknown folder {folder_id} or author {author_id}"
                )));
            }
            Err(err) => return Err(err.into()),
        }
        load_note(self.conn, self.conn.last_insert_rowid())
    }

    fn update_note(&self, id: NoteId, content: &str) -> RepoResult<Note> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET content = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, content],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "note", id });
        }
        load_note(self.conn, id)
    }

    fn list_notes(&self, folder_id: FolderId) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE folder_id = ?1
             ORDER BY updated_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([folder_id])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "note", id });
        }
        Ok(())
    }
}

fn folder_conflict(
    conn: &Connection,
    owner_id: UserId,
    name: &str,
    err: rusqlite::Error,
) -> RepoError {
    let owner_exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            [owner_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|exists| exists == 1);

    match owner_exists {
        Ok(true) => RepoError::Conflict(format!("folder name `{name}` is already in use")),
        Ok(false) => RepoError::NotFound {
            entity: "user",
            id: owner_id,
        },
        Err(_) => err.into(),
    }
}

fn load_note(conn: &Connection, id: NoteId) -> RepoResult<Note> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_note_row(row);
    }
    Err(RepoError::NotFound { entity: "note", id })
}

fn parse_folder_row(row: &Row<'_>) -> RepoResult<Folder> {
    Ok(Folder {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_file_row(row: &Row<'_>) -> RepoResult<CaseFile> {
    let size_bytes: i64 = row.get("size_bytes")?;
    if size_bytes < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative size `{size_bytes}` in case_files.size_bytes"
        )));
    }
    Ok(CaseFile {
        id: row.get("id")?,
        folder_id: row.get("folder_id")?,
        original_name: row.get("original_name")?,
        stored_path: row.get("stored_path")?,
        mime_type: row.get("mime_type")?,
        size_bytes,
        uploaded_at: row.get("uploaded_at")?,
    })
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    Ok(Note {
        id: row.get("id")?,
        folder_id: row.get("folder_id")?,
        author_id: row.get("author_id")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
