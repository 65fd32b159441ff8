use billfold_types::{SyncOperation, SyncPriority};

// ── SyncOperation ─────────────────────────────────────────────────

#[test]
fn operation_serde_uses_lowercase_tags() {
    assert_eq!(
        serde_json::to_string(&SyncOperation::Create).unwrap(),
        "\"create\""
    );
    assert_eq!(
        serde_json::to_string(&SyncOperation::Delete).unwrap(),
        "\"delete\""
    );

    let op: SyncOperation = serde_json::from_str("\"update\"").unwrap();
    assert_eq!(op, SyncOperation::Update);
}

#[test]
fn operation_display() {
    assert_eq!(SyncOperation::Create.to_string(), "create");
    assert_eq!(SyncOperation::Update.to_string(), "update");
    assert_eq!(SyncOperation::Delete.to_string(), "delete");
}

// ── SyncPriority ──────────────────────────────────────────────────

#[test]
fn priority_ordering_is_ordinal() {
    assert!(SyncPriority::Low < SyncPriority::Normal);
    assert!(SyncPriority::Normal < SyncPriority::High);
    assert!(SyncPriority::High < SyncPriority::Urgent);
}

#[test]
fn priority_default_is_normal() {
    assert_eq!(SyncPriority::default(), SyncPriority::Normal);
}

#[test]
fn priority_max_picks_urgent() {
    let highest = [SyncPriority::Low, SyncPriority::Urgent, SyncPriority::Normal]
        .into_iter()
        .max()
        .unwrap();
    assert_eq!(highest, SyncPriority::Urgent);
}

#[test]
fn priority_serde_roundtrip() {
    let json = serde_json::to_string(&SyncPriority::Urgent).unwrap();
    assert_eq!(json, "\"urgent\"");

    let back: SyncPriority = serde_json::from_str(&json).unwrap();
    assert_eq!(back, SyncPriority::Urgent);
}
