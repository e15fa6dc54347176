use std::sync::{Arc, Mutex};

use chousei_users::{UserError, UserStore};
use rusqlite::Connection;

fn store() -> UserStore {
    let conn = Connection::open_in_memory().unwrap();
    UserStore::new(Arc::new(Mutex::new(conn))).unwrap()
}

#[test]
fn upsert_inserts_then_refreshes_username() {
    let users = store();

    let created = users.upsert("1001", "alice").unwrap();
    assert_eq!(created.username, "alice");

    users.upsert("1001", "alice-renamed").unwrap();
    let loaded = users.get("1001").unwrap().unwrap();
    assert_eq!(loaded.username, "alice-renamed");
}

#[test]
fn repeated_login_is_idempotent() {
    let users = store();
    users.upsert("7", "bob").unwrap();
    users.upsert("7", "bob").unwrap();
    assert_eq!(users.require("7").unwrap().username, "bob");
}

#[test]
fn missing_user_is_none_or_not_found() {
    let users = store();
    assert!(users.get("404").unwrap().is_none());
    assert!(matches!(users.require("404"), Err(UserError::NotFound(_))));
}

#[test]
fn blank_identity_is_rejected() {
    let users = store();
    assert!(matches!(
        users.upsert("  ", "carol"),
        Err(UserError::InvalidIdentity(_))
    ));
    assert!(matches!(
        users.upsert("12", ""),
        Err(UserError::InvalidIdentity(_))
    ));
}
