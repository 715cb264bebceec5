use chrono::Utc;
use notebot_core::{NoteOrigin, NoteStore, SqliteNoteRepository};
use rusqlite::Connection;

fn memory_store() -> NoteStore<SqliteNoteRepository> {
    NoteStore::new(SqliteNoteRepository::in_memory().unwrap())
}

#[test]
fn add_then_get_round_trips_text_and_timestamp() {
    let store = memory_store();
    let before = Utc::now();

    assert!(store.add_note(42, "Buy milk"));

    let notes = store.get_notes(42);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].user_id, 42);
    assert_eq!(notes[0].text, "Buy milk");
    assert!(notes[0].created_at <= Utc::now());
    assert!(notes[0].created_at >= before - chrono::Duration::seconds(1));
}

#[test]
fn notes_are_isolated_per_user() {
    let store = memory_store();
    assert!(store.add_note(1, "mine"));
    assert!(store.add_note(2, "theirs"));

    let texts: Vec<String> = store.get_notes(1).into_iter().map(|n| n.text).collect();
    assert_eq!(texts, vec!["mine".to_string()]);
    assert!(store.search_notes(1, "theirs").is_empty());
    assert!(store.get_notes(3).is_empty());
}

#[test]
fn notes_are_listed_newest_first() {
    let store = memory_store();
    for text in ["first", "second", "third"] {
        assert!(store.add_note(7, text));
    }

    let texts: Vec<String> = store.get_notes(7).into_iter().map(|n| n.text).collect();
    assert_eq!(texts, vec!["third", "second", "first"]);
}

#[test]
fn search_is_case_insensitive_substring() {
    let store = memory_store();
    assert!(store.add_note(5, "Buy MILK today"));
    assert!(store.add_note(5, "Call grandma"));

    let hits = store.search_notes(5, "milk");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "Buy MILK today");
    assert!(store.search_notes(5, "bread").is_empty());
}

#[test]
fn empty_query_matches_every_note() {
    let store = memory_store();
    assert!(store.add_note(5, "one"));
    assert!(store.add_note(5, "two"));

    assert_eq!(store.search_notes(5, "").len(), 2);
}

#[test]
fn recent_notes_honors_limit() {
    let store = memory_store();
    for idx in 0..5 {
        assert!(store.add_note(9, &format!("note {idx}")));
    }

    let recent = store.recent_notes(9, 3);
    let texts: Vec<&str> = recent.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, vec!["note 4", "note 3", "note 2"]);
    assert!(store.recent_notes(9, 0).is_empty());
}

#[test]
fn origin_is_persisted() {
    let store = memory_store();
    let origin = NoteOrigin {
        chat_id: Some(-100),
        username: Some("alice".to_string()),
    };
    assert!(store.add_note_with_origin(3, "from a group", origin.clone()));

    assert_eq!(store.get_notes(3)[0].origin, origin);
}

#[test]
fn empty_text_is_rejected() {
    let store = memory_store();
    assert!(!store.add_note(3, "   "));
    assert!(store.get_notes(3).is_empty());
}

#[test]
fn backend_failure_is_absorbed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");
    let store = NoteStore::new(SqliteNoteRepository::open(&path).unwrap());
    assert!(store.add_note(1, "before"));

    let other = Connection::open(&path).unwrap();
    other.execute_batch("DROP TABLE notes;").unwrap();
    drop(other);

    assert!(!store.add_note(1, "after"));
    assert!(store.get_notes(1).is_empty());
    assert!(store.search_notes(1, "").is_empty());
    assert!(store.recent_notes(1, 10).is_empty());
}
