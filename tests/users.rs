//! User rules: email and external-id uniqueness, identity bookkeeping and
//! delete protection.

use deskmock::{Deletion, EngineConfig, Fixtures, MockEngine, MockError, Request, ResourceKind};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn engine() -> MockEngine {
    MockEngine::new(EngineConfig::default()).unwrap()
}

fn attrs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn identities_of(engine: &MockEngine, user_id: u64) -> Vec<deskmock::Record> {
    engine
        .store()
        .all(ResourceKind::Identities)
        .into_iter()
        .filter(|i| i.get_u64("user_id") == Some(user_id))
        .collect()
}

// =============================================================================
// Email uniqueness
// =============================================================================

#[test]
fn test_duplicate_email_is_rejected_ignoring_case() {
    let engine = engine();
    engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();

    let err = engine
        .create(ResourceKind::Users, Fixtures::user("Other Ann", "ANN@example.com"))
        .unwrap_err();

    let MockError::ValidationFailed(errors) = err else {
        panic!("expected ValidationFailed, got {err:?}");
    };
    let messages = errors.get("email").unwrap();
    assert!(messages[0].contains("ANN@example.com"));
    assert!(messages[0].contains("already being used"));
}

#[test]
fn test_email_of_current_user_is_taken() {
    let engine = engine();
    let err = engine
        .create(ResourceKind::Users, Fixtures::user("Clone", "agent@example.com"))
        .unwrap_err();
    assert_eq!(err.status(), 422);
}

#[test]
fn test_rejected_create_leaves_store_unchanged() {
    let engine = engine();
    engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();
    let users = engine.store().all(ResourceKind::Users).len();
    let identities = engine.store().all(ResourceKind::Identities).len();

    assert!(engine
        .create(ResourceKind::Users, Fixtures::user("Dup", "ann@example.com"))
        .is_err());

    assert_eq!(engine.store().all(ResourceKind::Users).len(), users);
    assert_eq!(engine.store().all(ResourceKind::Identities).len(), identities);
}

#[test]
fn test_dispatch_reports_record_invalid_body() {
    let engine = engine();
    let request = Request::create(
        ResourceKind::Users,
        json!({"user": {"name": "Ann", "email": "ann@example.com"}}),
    );
    assert_eq!(engine.handle(request.clone()).status, 201);

    let response = engine.handle(request);
    assert_eq!(response.status, 422);
    assert_eq!(response.body["error"], "RecordInvalid");
    let description = response.body["details"]["email"][0]["description"].as_str().unwrap();
    assert_eq!(description, "Email: ann@example.com is already being used by another user");
}

// =============================================================================
// External id uniqueness
// =============================================================================

#[test]
fn test_null_external_ids_never_collide() {
    let engine = engine();
    for n in 0..3 {
        engine
            .create(
                ResourceKind::Users,
                attrs(json!({"name": format!("u{n}"), "external_id": null})),
            )
            .unwrap();
    }
}

#[test]
fn test_duplicate_external_id_is_rejected() {
    let engine = engine();
    engine
        .create(ResourceKind::Users, attrs(json!({"name": "a", "external_id": "ext-1"})))
        .unwrap();

    let err = engine
        .create(ResourceKind::Users, attrs(json!({"name": "b", "external_id": "ext-1"})))
        .unwrap_err();
    assert!(err.to_string().contains("External has already been taken"));
}

#[test]
fn test_update_may_keep_own_external_id() {
    let engine = engine();
    let user = engine
        .create(ResourceKind::Users, attrs(json!({"name": "a", "external_id": "ext-1"})))
        .unwrap();

    let updated = engine
        .update(
            ResourceKind::Users,
            user.id().unwrap(),
            attrs(json!({"external_id": "ext-1", "name": "renamed"})),
        )
        .unwrap();
    assert_eq!(updated.get_str("name"), Some("renamed"));
}

// =============================================================================
// Identities derived from users
// =============================================================================

#[test]
fn test_create_user_adds_primary_identity() {
    let engine = engine();
    let user = engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();

    let identities = identities_of(&engine, user.id().unwrap());
    assert_eq!(identities.len(), 1);
    assert_eq!(identities[0].get_str("value"), Some("ann@example.com"));
    assert_eq!(identities[0].get_bool("primary"), Some(true));
}

#[test]
fn test_changing_email_adds_secondary_identity() {
    let engine = engine();
    let user = engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();
    let id = user.id().unwrap();

    let updated = engine
        .update(ResourceKind::Users, id, attrs(json!({"email": "ann@work.example"})))
        .unwrap();

    assert_eq!(updated.get_str("email"), Some("ann@example.com"));
    let identities = identities_of(&engine, id);
    assert_eq!(identities.len(), 2);
    assert_eq!(identities.iter().filter(|i| i.get_bool("primary") == Some(true)).count(), 1);
}

// =============================================================================
// Delete protection
// =============================================================================

#[test]
fn test_requester_cannot_be_deleted() {
    let engine = engine();
    let user = engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();
    let id = user.id().unwrap();
    engine
        .create(ResourceKind::Tickets, Fixtures::ticket("Help", id))
        .unwrap();

    assert!(!engine.destroy(ResourceKind::Users, id).unwrap());
    assert!(engine.find(ResourceKind::Users, id).is_some());

    let response = engine.handle(Request::delete(ResourceKind::Users, id));
    assert_eq!(response.status, 422);
}

#[test]
fn test_collaborator_cannot_be_deleted() {
    let engine = engine();
    let requester = engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();
    let cc = engine
        .create(ResourceKind::Users, Fixtures::user("Cy", "cy@example.com"))
        .unwrap();
    let mut ticket = Fixtures::ticket("Help", requester.id().unwrap());
    ticket.insert("collaborator_ids".to_string(), json!([cc.id()]));
    engine.create(ResourceKind::Tickets, ticket).unwrap();

    let outcome = engine.delete(ResourceKind::Users, cc.id().unwrap()).unwrap();
    assert!(matches!(outcome, Deletion::Rejected(reason) if reason.contains("ticket")));
}

#[test]
fn test_unreferenced_user_delete_cascades_identities() {
    let engine = engine();
    let user = engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();
    let id = user.id().unwrap();

    assert!(engine.destroy(ResourceKind::Users, id).unwrap());
    assert!(identities_of(&engine, id).is_empty());
    assert!(matches!(
        engine.get(ResourceKind::Users, id),
        Err(MockError::NotFound { id: missing, .. }) if missing == id
    ));
}

proptest! {
    #[test]
    fn prop_emails_stay_unique(emails in proptest::collection::vec("[a-c]{1,2}@[xy]\\.test", 1..12)) {
        let engine = engine();
        for (n, email) in emails.iter().enumerate() {
            let _ = engine.create(ResourceKind::Users, Fixtures::user(&format!("u{n}"), email));
        }

        let mut seen = std::collections::HashSet::new();
        for user in engine.store().all(ResourceKind::Users) {
            prop_assert!(seen.insert(user.field_string("email").to_lowercase()));
        }
    }
}
