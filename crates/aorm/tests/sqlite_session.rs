//! End-to-end session tests against in-memory SQLite.

use std::sync::{Arc, Barrier};
use std::thread;

use aorm::{
    DatabaseErrorKind, Entity, Error, Executor, MappingErrorKind, MetadataRegistry, Session, Settings,
    SqliteConnection, UpsertKind, generate_create_ddl,
};

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Record {
    #[aorm(id, auto_increment, column = "_id")]
    id: i64,
    created: i64,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
#[aorm(table = "note")]
struct Note {
    #[aorm(extends)]
    record: Record,
    #[aorm(not_null, unique)]
    title: String,
    body: Option<String>,
    #[aorm(default = "0")]
    pinned: bool,
    #[aorm(skip)]
    dirty: bool,
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
#[aorm(table = "setting")]
struct Setting {
    #[aorm(id)]
    name: String,
    value: Option<String>,
}

fn note(title: &str) -> Note {
    Note {
        record: Record { id: 0, created: 1_700_000_000 },
        title: title.to_string(),
        ..Default::default()
    }
}

fn session_with(settings: Settings) -> Session<SqliteConnection> {
    let session = Session::new(SqliteConnection::open_memory().unwrap(), Arc::new(settings));
    session.create_table::<Note>().unwrap();
    session
}

fn session() -> Session<SqliteConnection> {
    session_with(Settings::new())
}

fn db_kind(err: &Error) -> Option<DatabaseErrorKind> {
    match err {
        Error::Database(e) => Some(e.kind),
        _ => None,
    }
}

#[test]
fn create_table_ddl_lists_inherited_columns_first() {
    let registry = MetadataRegistry::new(Arc::new(Settings::new()));
    let sql = generate_create_ddl::<Note>(&registry).unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE note(\n\
         _id INTEGER PRIMARY KEY AUTOINCREMENT, \n\
         created INTEGER, \n\
         title TEXT NOT NULL UNIQUE, \n\
         body TEXT, \n\
         pinned INTEGER DEFAULT 0)\n"
    );
}

fn table_count(session: &Session<SqliteConnection>) -> i64 {
    let row = session
        .executor()
        .query_one("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table'", &[])
        .unwrap()
        .unwrap();
    row.get_named("n").unwrap()
}

#[test]
fn create_then_drop_restores_the_schema() {
    let session = Session::new(SqliteConnection::open_memory().unwrap(), Arc::new(Settings::new()));
    let before = table_count(&session);

    session.create_table::<Note>().unwrap();
    assert!(table_count(&session) > before);

    session.drop_table::<Note>().unwrap();
    // AUTOINCREMENT leaves sqlite_sequence behind; only `note` must be gone.
    let remaining = session
        .executor()
        .query("SELECT name FROM sqlite_master WHERE name = 'note'", &[])
        .unwrap();
    assert!(remaining.is_empty());
}

#[test]
fn insert_find_update_delete_round_trip() {
    let session = session();

    let mut first = note("first");
    let id = session.insert(&mut first).unwrap();
    assert_eq!(id, 1);
    assert_eq!(first.record.id, 1);

    let loaded = session.find_by_key::<Note>(id).unwrap().unwrap();
    assert_eq!(loaded, first);

    first.body = Some("edited".into());
    first.pinned = true;
    assert_eq!(session.update(&first).unwrap(), 1);
    let loaded = session.find_by_key::<Note>(id).unwrap().unwrap();
    assert_eq!(loaded.body.as_deref(), Some("edited"));
    assert!(loaded.pinned);

    assert_eq!(session.delete(&first).unwrap(), 1);
    assert!(session.find_by_key::<Note>(id).unwrap().is_none());
    assert_eq!(session.count::<Note>().unwrap(), 0);
}

#[test]
fn skipped_fields_are_not_stored() {
    let session = session();
    let mut n = note("skip");
    n.dirty = true;
    session.insert(&mut n).unwrap();

    let loaded = session.find_by_key::<Note>(n.record.id).unwrap().unwrap();
    assert!(!loaded.dirty);
}

#[test]
fn find_all_and_count() {
    let session = session();
    for title in ["a", "b", "c"] {
        session.insert(&mut note(title)).unwrap();
    }
    let all = session.find_all::<Note>().unwrap();
    let titles: Vec<_> = all.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b", "c"]);
    assert_eq!(session.count::<Note>().unwrap(), 3);

    assert_eq!(session.delete_by_key::<Note>(2_i64).unwrap(), 1);
    assert_eq!(session.delete_by_key::<Note>(2_i64).unwrap(), 0);
    assert_eq!(session.count::<Note>().unwrap(), 2);
}

#[test]
fn fast_upsert_uses_the_key_sentinel() {
    let session = session();

    let mut n = note("fast");
    let outcome = session.insert_or_update(&mut n).unwrap();
    assert_eq!(outcome.kind, UpsertKind::Insert);
    assert_eq!(outcome.row_id, Some(1));
    assert_eq!(n.record.id, 1);

    n.body = Some("second".into());
    let outcome = session.insert_or_update(&mut n).unwrap();
    assert_eq!(outcome.kind, UpsertKind::Update);
    assert_eq!(outcome.rows_affected, 1);

    // A set key for a missing row is a silent no-op update in fast mode.
    let mut ghost = note("ghost");
    ghost.record.id = 99;
    let outcome = session.insert_or_update(&mut ghost).unwrap();
    assert_eq!(outcome.kind, UpsertKind::Update);
    assert_eq!(outcome.rows_affected, 0);
    assert_eq!(session.count::<Note>().unwrap(), 1);
}

#[test]
fn exact_upsert_checks_for_the_row() {
    let settings = Settings::new();
    settings.set_exact_insert_or_update(true);
    let session = session_with(settings);

    let mut ghost = note("ghost");
    ghost.record.id = 99;
    let outcome = session.insert_or_update(&mut ghost).unwrap();
    assert_eq!(outcome.kind, UpsertKind::Insert);
    assert_eq!(outcome.row_id, Some(99));

    ghost.body = Some("now present".into());
    let outcome = session.insert_or_update(&mut ghost).unwrap();
    assert_eq!(outcome.kind, UpsertKind::Update);
    assert_eq!(session.count::<Note>().unwrap(), 1);
}

#[test]
fn exact_upsert_with_unset_key_inserts() {
    let settings = Settings::new();
    settings.set_exact_insert_or_update(true);
    let session = session_with(settings);

    let mut n = note("new");
    let outcome = session.insert_or_update(&mut n).unwrap();
    assert_eq!(outcome.kind, UpsertKind::Insert);
    assert_eq!(n.record.id, 1);
}

#[test]
fn upsert_mode_can_change_between_calls() {
    let session = session();
    let mut ghost = note("ghost");
    ghost.record.id = 5;

    assert_eq!(
        session.insert_or_update(&mut ghost).unwrap().kind,
        UpsertKind::Update
    );
    session.settings().set_exact_insert_or_update(true);
    assert_eq!(
        session.insert_or_update(&mut ghost).unwrap().kind,
        UpsertKind::Insert
    );
}

#[test]
fn text_primary_key() {
    let session = Session::new(SqliteConnection::open_memory().unwrap(), Arc::new(Settings::new()));
    session.create_table::<Setting>().unwrap();

    let mut theme = Setting {
        name: "theme".into(),
        value: Some("dark".into()),
    };
    session.insert(&mut theme).unwrap();
    assert_eq!(theme.name, "theme");

    let loaded = session.find_by_key::<Setting>("theme").unwrap().unwrap();
    assert_eq!(loaded, theme);

    // A non-empty text key is a set key, so fast mode updates.
    theme.value = None;
    let outcome = session.insert_or_update(&mut theme).unwrap();
    assert_eq!(outcome.kind, UpsertKind::Update);
    let loaded = session.find_by_key::<Setting>("theme").unwrap().unwrap();
    assert_eq!(loaded.value, None);
}

#[test]
fn extend_off_drops_inherited_columns() {
    let settings = Settings::new();
    settings.set_support_extend(false);
    let registry = MetadataRegistry::new(Arc::new(settings));
    let sql = generate_create_ddl::<Note>(&registry).unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE note(\ntitle TEXT NOT NULL UNIQUE, \nbody TEXT, \npinned INTEGER DEFAULT 0)\n"
    );

    let session = Session::with_registry(SqliteConnection::open_memory().unwrap(), Arc::new(registry));
    session.create_table::<Note>().unwrap();
    let mut n = note("plain");
    session.insert(&mut n).unwrap();

    // Inherited fields come back with their defaults.
    let all = session.find_all::<Note>().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].record, Record::default());
    assert_eq!(all[0].title, "plain");

    // Without a key column, key-based operations are mapping errors.
    let err = session.find_by_key::<Note>(1_i64).unwrap_err();
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::MissingPrimaryKey));
}

#[test]
fn unmarked_entity_is_rejected() {
    let session = session();
    let err = session.create_table::<Record>().unwrap_err();
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::NotATable));
    let err = session.insert(&mut Record::default()).unwrap_err();
    assert!(err.is_mapping_error());
}

#[test]
fn keyword_column_is_a_mapping_error_before_any_sql() {
    #[derive(Entity, Debug, Default)]
    #[aorm(table = "purchase")]
    struct Purchase {
        #[aorm(id)]
        id: i64,
        order: i32,
    }

    let session = Session::new(SqliteConnection::open_memory().unwrap(), Arc::new(Settings::new()));
    let err = session.table::<Purchase>().unwrap_err();
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::InvalidIdentifier));
    assert!(err.to_string().contains("order"));

    let err = session.create_table::<Purchase>().unwrap_err();
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::InvalidIdentifier));
    assert!(session.registry().is_empty());
}

#[test]
fn narrow_integer_key_is_written_as_given() {
    #[derive(Entity, Debug, Default, PartialEq)]
    #[aorm(table = "small")]
    struct Small {
        #[aorm(id)]
        id: i32,
        label: String,
    }

    let session = Session::new(SqliteConnection::open_memory().unwrap(), Arc::new(Settings::new()));
    session.create_table::<Small>().unwrap();
    session
        .executor()
        .execute_raw("INSERT INTO small (id, label) VALUES (3000000000, 'big')")
        .unwrap();

    // The key is not left to the database, so the oversized rowid never has
    // to fit in the field.
    let mut first = Small { id: 0, label: "zero".into() };
    session.insert(&mut first).unwrap();
    assert_eq!(first.id, 0);
    assert_eq!(session.count::<Small>().unwrap(), 2);
    assert_eq!(session.find_by_key::<Small>(0_i32).unwrap(), Some(first));

    // A failed insert leaves no extra row behind.
    let err = session.insert(&mut Small { id: 0, label: "again".into() }).unwrap_err();
    assert_eq!(db_kind(&err), Some(DatabaseErrorKind::Constraint));
    assert_eq!(session.count::<Small>().unwrap(), 2);
}

#[test]
fn autoincrement_on_narrow_key_is_rejected() {
    #[derive(Entity, Debug, Default)]
    #[aorm(table = "counter")]
    struct Counter {
        #[aorm(id, auto_increment)]
        id: i32,
        hits: i64,
    }

    let session = Session::new(SqliteConnection::open_memory().unwrap(), Arc::new(Settings::new()));
    let err = session.create_table::<Counter>().unwrap_err();
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::Contradiction));
}

#[test]
fn database_errors_propagate_unchanged() {
    let session = session();
    session.insert(&mut note("same")).unwrap();

    let err = session.insert(&mut note("same")).unwrap_err();
    assert_eq!(db_kind(&err), Some(DatabaseErrorKind::Constraint));
    assert!(err.sql().unwrap().starts_with("INSERT INTO note"));

    // Creating the same table twice is reported by the database.
    let err = session.create_table::<Note>().unwrap_err();
    assert!(db_kind(&err).is_some());
}

#[test]
fn drop_table_is_idempotent() {
    let session = session();
    session.drop_table::<Note>().unwrap();
    session.drop_table::<Note>().unwrap();

    let err = session.count::<Note>().unwrap_err();
    assert_eq!(db_kind(&err), Some(DatabaseErrorKind::NotFound));

    session.create_table::<Note>().unwrap();
    assert_eq!(session.count::<Note>().unwrap(), 0);
}

#[test]
fn concurrent_sessions_share_one_descriptor() {
    const THREADS: usize = 8;
    let session = Arc::new(Session::new(
        SqliteConnection::open_memory().unwrap(),
        Arc::new(Settings::new()),
    ));
    session
        .executor()
        .execute_raw(
            "CREATE TABLE note(_id INTEGER PRIMARY KEY AUTOINCREMENT, created INTEGER, \
             title TEXT NOT NULL UNIQUE, body TEXT, pinned INTEGER DEFAULT 0)",
        )
        .unwrap();
    assert!(session.registry().is_empty());

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut n = note(&format!("note-{}", i));
                session.insert(&mut n).unwrap();
                session.table::<Note>().unwrap()
            })
        })
        .collect();
    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(session.registry().len(), 1);
    assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
    assert_eq!(session.count::<Note>().unwrap(), THREADS as i64);
}
