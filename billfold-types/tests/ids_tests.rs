use billfold_types::RecordId;
use std::collections::HashSet;
use std::str::FromStr;

// ── RecordId ──────────────────────────────────────────────────────

#[test]
fn record_id_new_is_unique() {
    let a = RecordId::new();
    let b = RecordId::new();
    assert_ne!(a, b);
}

#[test]
fn record_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = RecordId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn record_id_display_and_parse() {
    let id = RecordId::new();
    let s = id.to_string();
    let parsed = RecordId::parse(&s).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn record_id_from_str() {
    let id = RecordId::new();
    let parsed = RecordId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn record_id_parse_invalid() {
    assert!(RecordId::parse("not-a-uuid").is_err());
}

#[test]
fn record_id_hashable() {
    let mut set = HashSet::new();
    let id = RecordId::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn record_id_serde_is_transparent() {
    let id = RecordId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));

    let back: RecordId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn record_id_v7_is_time_ordered() {
    let a = RecordId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let b = RecordId::new();
    assert!(a.as_uuid() < b.as_uuid());
}
