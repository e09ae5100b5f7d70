use std::path::PathBuf;

use sqlite_rowmap::prelude::*;
use tempfile::TempDir;

fn scratch_db(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(name);
    (dir, path)
}

fn people_db() -> Result<Connection, RowmapError> {
    let mut conn = Connection::open_in_memory()?;
    conn.exec(
        "CREATE TABLE people (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER,
            score REAL,
            photo BLOB
        );",
    )?;
    Ok(conn)
}

#[test]
fn insert_then_select_by_row_id() -> Result<(), RowmapError> {
    let (_dir, path) = scratch_db("test.db");
    let mut conn = Connection::open_path(&path)?;
    conn.exec("CREATE TABLE t(id INTEGER PRIMARY KEY, name TEXT)")?;

    let insert = QueryBuilder::insert("t")?.filter("name", "alice")?.build();
    let outcome = conn.execute_update(&insert)?;
    assert_eq!(outcome, UpdateOutcome::Inserted { row_id: 1 });
    assert_eq!(conn.last_insert_row_id(), Some(1));

    let select = QueryBuilder::select("t")?.filter("id", 1)?.build();
    let rows = conn.execute_query(&select)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column_names(), ["id", "name"]);
    assert_eq!(rows[0].get("id"), Some(&RowValues::Int(1)));
    assert_eq!(rows[0].get("name"), Some(&RowValues::Text("alice".into())));
    Ok(())
}

#[test]
fn round_trip_preserves_every_storage_class() -> Result<(), RowmapError> {
    let mut conn = people_db()?;
    let insert = QueryBuilder::insert("people")?
        .value("name", "bob")?
        .value("age", Option::<i64>::None)?
        .value("score", 91.25)?
        .value("photo", vec![0_u8, 1, 2, 255])?
        .build();
    let row_id = conn
        .execute_update(&insert)?
        .row_id()
        .expect("insert reports a row id");

    let select = QueryBuilder::select("people")?
        .columns(["name", "age", "score", "photo"])?
        .filter("id", row_id)?
        .build();
    let rows = conn.execute_query(&select)?;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.get("name"), Some(&RowValues::Text("bob".into())));
    assert_eq!(row.get("age"), Some(&RowValues::Null));
    assert_eq!(row.get("score"), Some(&RowValues::Float(91.25)));
    assert_eq!(row.get("photo"), Some(&RowValues::Blob(vec![0, 1, 2, 255])));
    Ok(())
}

#[test]
fn update_and_delete_report_affected_rows() -> Result<(), RowmapError> {
    let mut conn = people_db()?;
    for (name, age) in [("a", 20_i64), ("b", 30), ("c", 30)] {
        let insert = QueryBuilder::insert("people")?
            .value("name", name)?
            .value("age", age)?
            .build();
        conn.execute_update(&insert)?;
    }
    assert_eq!(conn.last_insert_row_id(), Some(3));

    let update = QueryBuilder::update("people")?
        .value("score", 1.0)?
        .filter("age", 30)?
        .build();
    assert_eq!(conn.execute_update(&update)?, UpdateOutcome::Affected { rows: 2 });
    // updates leave the last inserted id alone
    assert_eq!(conn.last_insert_row_id(), Some(3));

    let delete = QueryBuilder::delete("people")?
        .filter_in("name", ["a", "c", "zzz"])?
        .build();
    assert_eq!(conn.execute_update(&delete)?.rows_affected(), Some(2));

    let remaining = conn.execute_query(&QueryBuilder::select("people")?.column("name")?.build())?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].get("name"), Some(&RowValues::Text("b".into())));
    Ok(())
}

#[test]
fn select_returns_driver_order_and_empty_vec_when_nothing_matches() -> Result<(), RowmapError> {
    let mut conn = people_db()?;
    for name in ["x", "y", "z"] {
        conn.execute_update(&QueryBuilder::insert("people")?.value("name", name)?.build())?;
    }

    let all = conn.execute_query(&QueryBuilder::select("people")?.column("name")?.build())?;
    let names: Vec<&str> = all
        .iter()
        .filter_map(|row| row.get("name").and_then(RowValues::as_text))
        .collect();
    assert_eq!(names, ["x", "y", "z"]);

    let none = conn.execute_query(
        &QueryBuilder::select("people")?
            .filter("name", "nobody")?
            .build(),
    )?;
    assert!(none.is_empty());
    Ok(())
}

#[test]
fn hostile_values_are_bound_not_interpolated() -> Result<(), RowmapError> {
    let mut conn = people_db()?;
    let hostile = "'); DROP TABLE people; --";
    conn.execute_update(&QueryBuilder::insert("people")?.value("name", hostile)?.build())?;

    let rows = conn.execute_query(&QueryBuilder::select("people")?.filter("name", hostile)?.build())?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name").and_then(RowValues::as_text), Some(hostile));
    Ok(())
}

#[test]
fn wrong_kind_is_rejected_before_the_driver() -> Result<(), RowmapError> {
    let mut conn = people_db()?;
    let select = QueryBuilder::select("people")?.build();
    assert!(matches!(
        conn.execute_update(&select),
        Err(RowmapError::InvalidArgument(_))
    ));
    let delete = QueryBuilder::delete("people")?.build();
    assert!(matches!(
        conn.execute_query(&delete),
        Err(RowmapError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn driver_errors_carry_code_and_message() -> Result<(), RowmapError> {
    let mut conn = people_db()?;

    let err = conn.exec("CREATE TABLE").unwrap_err();
    match &err {
        RowmapError::Driver { code, message, .. } => {
            assert_eq!(*code & 0xff, rusqlite::ffi::SQLITE_ERROR);
            assert!(!message.is_empty());
        }
        other => panic!("expected driver error, got {other:?}"),
    }

    let missing_column = QueryBuilder::insert("people")?.value("nope", 1)?.build();
    assert!(matches!(
        conn.execute_update(&missing_column),
        Err(RowmapError::Driver { .. })
    ));

    // NOT NULL on name
    let err = conn
        .execute_update(&QueryBuilder::insert("people")?.value("age", 3)?.build())
        .unwrap_err();
    assert_eq!(
        err.driver_code().map(|code| code & 0xff),
        Some(rusqlite::ffi::SQLITE_CONSTRAINT)
    );
    Ok(())
}

#[test]
fn exec_runs_every_statement_in_a_batch() -> Result<(), RowmapError> {
    let mut conn = Connection::open_in_memory()?;
    conn.exec(
        "CREATE TABLE a (id INTEGER PRIMARY KEY);
         -- comment between statements
         CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER);
         INSERT INTO a (id) VALUES (7);
         INSERT INTO b (a_id) VALUES (7);",
    )?;
    let rows = conn.execute_raw_query("SELECT a.id AS a_id, b.id AS b_id FROM a JOIN b ON b.a_id = a.id")?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("a_id"), Some(&RowValues::Int(7)));
    assert_eq!(rows[0].get("b_id"), Some(&RowValues::Int(1)));
    Ok(())
}

#[test]
fn closed_connection_fails_fast_and_close_is_idempotent() -> Result<(), RowmapError> {
    let (_dir, path) = scratch_db("lifecycle.db");
    let mut conn = Connection::with_path(&path);
    assert!(!conn.is_open());

    let err = conn.exec("SELECT 1").unwrap_err();
    assert!(matches!(err, RowmapError::NotConnected(_)));
    assert!(err.is_invalid_state());
    assert!(matches!(
        conn.execute_query(&QueryBuilder::select("t")?.build()),
        Err(RowmapError::NotConnected(_))
    ));
    assert!(matches!(conn.begin_transaction(), Err(RowmapError::NotConnected(_))));

    conn.open()?;
    assert!(matches!(conn.open(), Err(RowmapError::InvalidState(_))));
    conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")?;
    conn.close();
    conn.close();
    assert!(!conn.is_open());

    // reopen and find the schema still there
    conn.open()?;
    let rows = conn.execute_query(&QueryBuilder::select("t")?.build())?;
    assert!(rows.is_empty());
    Ok(())
}

#[test]
fn unreachable_path_is_an_io_error() {
    let (_dir, base) = scratch_db("unused.db");
    let path = base.with_file_name("no_such_dir").join("x.db");
    let err = Connection::open_path(&path).unwrap_err();
    assert!(matches!(err, RowmapError::Io { .. }), "got {err:?}");
}

#[test]
fn missing_file_without_create_is_an_io_error() {
    let (_dir, path) = scratch_db("absent.db");
    let err = ConnectionOptions::builder(&path)
        .create_if_missing(false)
        .open()
        .unwrap_err();
    assert!(matches!(err, RowmapError::Io { .. }), "got {err:?}");
    assert!(!path.exists());
}

#[test]
fn wal_option_switches_journal_mode() -> Result<(), RowmapError> {
    let (_dir, path) = scratch_db("wal.db");
    let mut conn = ConnectionOptions::builder(&path).wal(true).open()?;
    let rows = conn.execute_raw_query("PRAGMA journal_mode")?;
    assert_eq!(
        rows[0].get_by_index(0).and_then(RowValues::as_text),
        Some("wal")
    );
    Ok(())
}

#[test]
fn rows_convert_to_json() -> Result<(), RowmapError> {
    let mut conn = people_db()?;
    conn.execute_update(
        &QueryBuilder::insert("people")?
            .value("name", "json")?
            .value("age", 5)?
            .build(),
    )?;
    let rows = conn.execute_query(
        &QueryBuilder::select("people")?
            .columns(["id", "name", "age"])?
            .build(),
    )?;
    assert_eq!(
        rows[0].to_json(),
        serde_json::json!({"id": 1, "name": "json", "age": 5})
    );
    Ok(())
}

#[test]
fn failure_mid_select_returns_only_the_error() -> Result<(), RowmapError> {
    let mut conn = people_db()?;
    for name in ["a", "b", "c"] {
        conn.execute_update(&QueryBuilder::insert("people")?.value("name", name)?.build())?;
    }

    // row 1 steps fine, row 2 overflows inside abs()
    let result = conn.execute_raw_query(
        "SELECT CASE WHEN id = 2 THEN abs(-9223372036854775808) ELSE id END AS v \
         FROM people ORDER BY id",
    );
    match result {
        Err(RowmapError::Driver { message, .. }) => {
            assert!(message.contains("overflow"), "{message}");
        }
        other => panic!("expected a driver error and no rows, got {other:?}"),
    }

    // the connection is still usable afterwards
    assert_eq!(conn.execute_raw_query("SELECT id FROM people")?.len(), 3);
    Ok(())
}

#[test]
fn keyword_named_columns_round_trip() -> Result<(), RowmapError> {
    let mut conn = Connection::open_in_memory()?;
    conn.exec(r#"CREATE TABLE "group" (id INTEGER PRIMARY KEY, "order" INTEGER, "key" TEXT)"#)?;

    let insert = QueryBuilder::insert("group")?
        .value("order", 1)?
        .value("key", "k1")?
        .build();
    assert_eq!(conn.execute_update(&insert)?.row_id(), Some(1));

    let update = QueryBuilder::update("group")?
        .value("order", 2)?
        .filter("key", "k1")?
        .build();
    assert_eq!(conn.execute_update(&update)?.rows_affected(), Some(1));

    let select = QueryBuilder::select("group")?
        .columns(["order", "key"])?
        .filter("order", 2)?
        .build();
    let rows = conn.execute_query(&select)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column_names(), ["order", "key"]);
    assert_eq!(rows[0].get("key"), Some(&RowValues::Text("k1".into())));
    Ok(())
}
