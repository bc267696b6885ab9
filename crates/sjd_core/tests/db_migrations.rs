use sjd_core::db::migrations::latest_version;
use sjd_core::db::{open_db, open_db_in_memory, ConnectionPool, DbError, PoolConfig, PoolError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "users",
        "hearings",
        "hearing_participants",
        "folders",
        "case_files",
        "notes",
        "notes_fts",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sjd.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "hearings");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    let pool_err = ConnectionPool::open(&path, PoolConfig::default())
        .err()
        .expect("pool must refuse a newer schema");
    assert!(matches!(
        pool_err,
        PoolError::Db(DbError::UnsupportedSchemaVersion { .. })
    ));
}

#[test]
fn every_pooled_connection_enforces_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::open(
        dir.path().join("fk.db"),
        PoolConfig {
            size: 3,
            ..PoolConfig::default()
        },
    )
    .unwrap();

    let held = [
        pool.acquire().unwrap(),
        pool.acquire().unwrap(),
        pool.acquire().unwrap(),
    ];
    for conn in &held {
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
        assert_eq!(schema_version(conn), latest_version());
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
