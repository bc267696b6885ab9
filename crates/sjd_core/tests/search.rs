use rusqlite::Connection;
use sjd_core::db::open_db_in_memory;
use sjd_core::model::document::FolderId;
use sjd_core::model::user::{Role, UserId};
use sjd_core::repo::document_repo::{DocumentRepository, SqliteDocumentRepository};
use sjd_core::search::directory::{search_users, UserSearchQuery};
use sjd_core::search::fts::{search_notes, NoteSearchQuery};
use sjd_core::search::SearchError;

fn seed_user(conn: &Connection, name: &str, email: &str, cpf: &str, role: Role) -> UserId {
    conn.execute(
        "INSERT INTO users (email, cpf, full_name, password_hash, role)
         VALUES (?1, ?2, ?3, 'x', ?4);",
        [email, cpf, name, role.as_str()],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn seed_directory(conn: &Connection) {
    seed_user(conn, "Ana Lima", "ana@tj.example", "11122233344", Role::Judge);
    seed_user(conn, "Bruno Anacleto", "bruno@adv.example", "55566677788", Role::LegalEntity);
    seed_user(conn, "Carla Dias", "carla@mail.example", "99988877766", Role::Citizen);
    seed_user(conn, "100% Legal", "percent@mail.example", "12312312312", Role::Citizen);
}

fn names(conn: &Connection, query: &UserSearchQuery) -> Vec<String> {
    search_users(conn, query)
        .unwrap()
        .into_iter()
        .map(|user| user.full_name)
        .collect()
}

#[test]
fn user_search_matches_name_email_and_cpf_digits() {
    let conn = open_db_in_memory().unwrap();
    seed_directory(&conn);

    assert_eq!(
        names(&conn, &UserSearchQuery::new("ana")),
        vec!["Ana Lima", "Bruno Anacleto"]
    );
    assert_eq!(
        names(&conn, &UserSearchQuery::new("mail.example")),
        vec!["100% Legal", "Carla Dias"]
    );
    assert_eq!(
        names(&conn, &UserSearchQuery::new("555.666")),
        vec!["Bruno Anacleto"]
    );
}

#[test]
fn mixed_name_and_digit_text_does_not_match_by_cpf() {
    let conn = open_db_in_memory().unwrap();
    seed_directory(&conn);
    seed_user(&conn, "Sala 1 Cartório", "sala1@tj.example", "00000000000", Role::PublicServant);

    assert!(names(&conn, &UserSearchQuery::new("Ana 1")).is_empty());
    assert_eq!(
        names(&conn, &UserSearchQuery::new("Sala 1")),
        vec!["Sala 1 Cartório"]
    );
    assert_eq!(
        names(&conn, &UserSearchQuery::new("1")),
        vec!["100% Legal", "Ana Lima", "Sala 1 Cartório"]
    );
}

#[test]
fn user_search_filters_by_role_and_escapes_wildcards() {
    let conn = open_db_in_memory().unwrap();
    seed_directory(&conn);

    let judges = UserSearchQuery {
        role: Some(Role::Judge),
        ..UserSearchQuery::new("ana")
    };
    assert_eq!(names(&conn, &judges), vec!["Ana Lima"]);

    assert_eq!(names(&conn, &UserSearchQuery::new("%")), vec!["100% Legal"]);
    assert!(names(&conn, &UserSearchQuery::new("   ")).is_empty());
}

#[test]
fn user_search_limit_is_applied_and_clamped() {
    let conn = open_db_in_memory().unwrap();
    for index in 0..120 {
        seed_user(
            &conn,
            &format!("Servidor {index:03}"),
            &format!("s{index}@tj.example"),
            "00000000000",
            Role::PublicServant,
        );
    }

    let two = UserSearchQuery {
        limit: 2,
        ..UserSearchQuery::new("servidor")
    };
    assert_eq!(
        names(&conn, &two),
        vec!["Servidor 000", "Servidor 001"]
    );

    let huge = UserSearchQuery {
        limit: 1_000,
        ..UserSearchQuery::new("servidor")
    };
    assert_eq!(search_users(&conn, &huge).unwrap().len(), 100);
    assert_eq!(
        search_users(&conn, &UserSearchQuery::new("servidor"))
            .unwrap()
            .len(),
        20
    );
}

fn seed_notes(conn: &Connection) -> (FolderId, FolderId) {
    let author = seed_user(conn, "Ana Lima", "ana@tj.example", "11122233344", Role::Judge);
    let repo = SqliteDocumentRepository::try_new(conn).unwrap();
    let first = repo.create_folder(author, "Processo 1").unwrap().id;
    let second = repo.create_folder(author, "Processo 2").unwrap().id;
    repo.add_note(first, author, "prazo para recurso encerra sexta")
        .unwrap();
    repo.add_note(first, author, "testemunha confirmada").unwrap();
    repo.add_note(second, author, "recurso protocolado").unwrap();
    (first, second)
}

#[test]
fn note_search_finds_terms_and_filters_by_folder() {
    let conn = open_db_in_memory().unwrap();
    let (first, second) = seed_notes(&conn);

    let hits = search_notes(&conn, &NoteSearchQuery::new("recurso")).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| hit.snippet.contains("[recurso]")));

    let in_second = NoteSearchQuery {
        folder_id: Some(second),
        ..NoteSearchQuery::new("recurso")
    };
    let hits = search_notes(&conn, &in_second).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].folder_id, second);

    let both_terms = search_notes(&conn, &NoteSearchQuery::new("prazo recurso")).unwrap();
    assert_eq!(both_terms.len(), 1);
    assert_eq!(both_terms[0].folder_id, first);
}

#[test]
fn note_search_follows_edits_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let (first, _) = seed_notes(&conn);
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let note = repo.list_notes(first).unwrap().into_iter().find(|note| {
        note.content.contains("testemunha")
    });
    let note = note.unwrap();

    repo.update_note(note.id, "perito nomeado").unwrap();
    assert!(search_notes(&conn, &NoteSearchQuery::new("testemunha"))
        .unwrap()
        .is_empty());
    assert_eq!(
        search_notes(&conn, &NoteSearchQuery::new("perito"))
            .unwrap()
            .len(),
        1
    );

    repo.delete_folder(first).unwrap();
    assert!(search_notes(&conn, &NoteSearchQuery::new("perito"))
        .unwrap()
        .is_empty());
}

#[test]
fn quoted_terms_tolerate_syntax_but_raw_queries_can_fail() {
    let conn = open_db_in_memory().unwrap();
    seed_notes(&conn);

    let hits = search_notes(&conn, &NoteSearchQuery::new("\"recurso")).unwrap();
    assert_eq!(hits.len(), 2);

    let raw = NoteSearchQuery {
        raw_fts_syntax: true,
        ..NoteSearchQuery::new("\"recurso")
    };
    assert!(matches!(
        search_notes(&conn, &raw),
        Err(SearchError::InvalidQuery { .. })
    ));

    let raw_or = NoteSearchQuery {
        raw_fts_syntax: true,
        ..NoteSearchQuery::new("testemunha OR protocolado")
    };
    assert_eq!(search_notes(&conn, &raw_or).unwrap().len(), 2);
}
