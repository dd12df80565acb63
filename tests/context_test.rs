mod helpers;

use helpers::sqlite_stores;
use jotter::context::{compact, render_for_prompt, ContextLog, CONTEXT_ITEM_ID, EMPTY_PLACEHOLDER};
use jotter::store::{Backend, HybridStore, PropertyValue};

#[test]
fn tombstone_keeps_later_indices_until_next_session() {
    let (_, log) = sqlite_stores();
    assert_eq!(log.append("a").unwrap(), 0);
    assert_eq!(log.append("b").unwrap(), 1);

    assert_eq!(log.delete(0).unwrap().as_deref(), Some("a"));
    let lines = log.lines().unwrap();
    assert_eq!(render_for_prompt(&lines), "1-- b");

    // Next session: the blank line is compacted away and "b" moves to 0.
    assert_eq!(log.prepare_session().unwrap(), "0-- b");
    assert_eq!(log.lines().unwrap(), vec!["b".to_string()]);
}

#[test]
fn replace_reports_old_and_new() {
    let (_, log) = sqlite_stores();
    log.append("Lives in Lisbon").unwrap();
    let replaced = log.replace(0, "Lives in Porto").unwrap().unwrap();
    assert_eq!(replaced.old, "Lives in Lisbon");
    assert_eq!(replaced.new, "Lives in Porto");
    assert!(log.replace(1, "nope").unwrap().is_none());
}

#[test]
fn log_is_one_item_beside_the_items() {
    let backend = helpers::sqlite_backend();
    let items = HybridStore::new(backend.clone(), "items");
    let log = ContextLog::new(HybridStore::new(backend.clone(), "global_context"));
    log.append("one").unwrap();
    log.append("two").unwrap();

    assert_eq!(backend.count("global_context").unwrap(), 1);
    let stored = HybridStore::new(backend, "global_context")
        .get(CONTEXT_ITEM_ID)
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, "one\ntwo");
    assert_eq!(stored.properties["item_type"], PropertyValue::from("global_context"));
    assert!(items.query(None, None, 10).unwrap().is_empty());
}

#[test]
fn empty_session_renders_placeholder() {
    let (_, log) = sqlite_stores();
    assert_eq!(log.prepare_session().unwrap(), EMPTY_PLACEHOLDER);
    assert_eq!(compact(""), "");
}
