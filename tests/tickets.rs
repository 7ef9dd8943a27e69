//! Tickets: derived records, references and cascades.

use deskmock::{EngineConfig, Fixtures, MockEngine, PageRequest, Record, Request, ResourceKind};
use serde_json::{json, Map, Value};

fn engine() -> MockEngine {
    MockEngine::new(EngineConfig::default()).unwrap()
}

fn attrs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn children(engine: &MockEngine, kind: ResourceKind, ticket_id: u64) -> Vec<Record> {
    let mut scope = Map::new();
    scope.insert("ticket_id".to_string(), json!(ticket_id));
    engine.list(kind, scope, PageRequest::first(100)).unwrap().items
}

fn requester(engine: &MockEngine) -> u64 {
    engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap()
        .id()
        .unwrap()
}

#[test]
fn test_create_ticket_seeds_comment_audit_and_metric() {
    let engine = engine();
    let user_id = requester(&engine);
    let ticket = engine
        .create(ResourceKind::Tickets, Fixtures::ticket("Broken", user_id))
        .unwrap();
    let id = ticket.id().unwrap();

    assert_eq!(ticket.get_str("status"), Some("new"));
    assert_eq!(ticket.get_u64("submitter_id"), Some(user_id));

    let comments = children(&engine, ResourceKind::TicketComments, id);
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].get_str("body"), Some("Broken (details)"));
    assert_eq!(comments[0].get_u64("author_id"), Some(user_id));

    assert_eq!(children(&engine, ResourceKind::TicketAudits, id).len(), 1);
    assert_eq!(children(&engine, ResourceKind::TicketMetrics, id).len(), 1);
}

#[test]
fn test_ticket_defaults_requester_to_current_user() {
    let engine = engine();
    let ticket = engine
        .create(ResourceKind::Tickets, attrs(json!({"comment": {"body": "It broke"}})))
        .unwrap();

    let me = engine.current_user().unwrap();
    assert_eq!(ticket.get_u64("requester_id"), me.id());
    assert_eq!(ticket.get_str("description"), Some("It broke"));
}

#[test]
fn test_ticket_without_description_is_invalid() {
    let engine = engine();
    let err = engine
        .create(ResourceKind::Tickets, attrs(json!({"subject": "empty"})))
        .unwrap_err();
    assert!(err.to_string().contains("Description: cannot be blank"));
}

#[test]
fn test_dangling_assignee_is_invalid() {
    let engine = engine();
    let user_id = requester(&engine);
    let err = engine
        .create(
            ResourceKind::Tickets,
            Fixtures::assigned_ticket("x", user_id, 999_999, "low"),
        )
        .unwrap_err();
    assert!(err.to_string().contains("Assignee: is invalid"));
}

#[test]
fn test_update_with_comment_appends_comment_and_audit() {
    let engine = engine();
    let user_id = requester(&engine);
    let id = engine
        .create(ResourceKind::Tickets, Fixtures::ticket("Broken", user_id))
        .unwrap()
        .id()
        .unwrap();

    let response = engine
        .dispatch(Request::update(
            ResourceKind::Tickets,
            id,
            json!({"ticket": {"status": "open", "comment": {"body": "Looking", "public": false}}}),
        ))
        .unwrap();
    assert_eq!(response.body["ticket"]["status"], "open");
    assert!(response.body["ticket"].get("comment").is_none());

    let comments = children(&engine, ResourceKind::TicketComments, id);
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[1].get_str("body"), Some("Looking"));
    assert_eq!(comments[1].get_bool("public"), Some(false));
    assert_eq!(children(&engine, ResourceKind::TicketAudits, id).len(), 2);
}

#[test]
fn test_comments_of_missing_ticket_are_not_found() {
    let engine = engine();
    let response = engine.handle(
        Request::list(ResourceKind::TicketComments).with_scope("ticket_id", 31337),
    );
    assert_eq!(response.status, 404);
}

#[test]
fn test_delete_ticket_cascades_derived_records() {
    let engine = engine();
    let user_id = requester(&engine);
    let id = engine
        .create(ResourceKind::Tickets, Fixtures::ticket("Broken", user_id))
        .unwrap()
        .id()
        .unwrap();

    assert!(engine.destroy(ResourceKind::Tickets, id).unwrap());
    for kind in [ResourceKind::TicketComments, ResourceKind::TicketAudits, ResourceKind::TicketMetrics] {
        assert!(engine.store().all(kind).iter().all(|r| r.get_u64("ticket_id") != Some(id)));
    }

    // The requester is free to go once the ticket is gone.
    assert!(engine.destroy(ResourceKind::Users, user_id).unwrap());
}

#[test]
fn test_delete_group_clears_ticket_reference() {
    let engine = engine();
    let user_id = requester(&engine);
    let group = engine.create(ResourceKind::Groups, Fixtures::group("Tier 1")).unwrap();
    let mut attributes = Fixtures::ticket("Routed", user_id);
    attributes.insert("group_id".to_string(), json!(group.id()));
    let ticket = engine.create(ResourceKind::Tickets, attributes).unwrap();

    engine.destroy(ResourceKind::Groups, group.id().unwrap()).unwrap();

    let ticket = engine.get(ResourceKind::Tickets, ticket.id().unwrap()).unwrap();
    assert_eq!(ticket.get("group_id"), Some(&Value::Null));
}

#[test]
fn test_ticket_inherits_requester_organization() {
    let engine = engine();
    let org = engine
        .create(ResourceKind::Organizations, Fixtures::organization("Acme"))
        .unwrap();
    let agent = engine
        .create(
            ResourceKind::Users,
            Fixtures::agent("Ann", "ann@acme.test", org.id().unwrap()),
        )
        .unwrap();

    let ticket = engine
        .create(ResourceKind::Tickets, Fixtures::ticket("Hi", agent.id().unwrap()))
        .unwrap();
    assert_eq!(ticket.get_u64("organization_id"), org.id());
}

#[test]
fn test_delete_submitter_clears_ticket_and_comment_references() {
    let engine = engine();
    let requester_id = requester(&engine);
    let submitter_id = engine
        .create(ResourceKind::Users, Fixtures::user("Sam", "sam@example.com"))
        .unwrap()
        .id()
        .unwrap();
    let mut attributes = Fixtures::ticket("On behalf", requester_id);
    attributes.insert("submitter_id".to_string(), json!(submitter_id));
    let id = engine.create(ResourceKind::Tickets, attributes).unwrap().id().unwrap();
    engine
        .update(
            ResourceKind::Tickets,
            id,
            attrs(json!({"comment": {"body": "Following up", "author_id": submitter_id}})),
        )
        .unwrap();

    assert!(engine.destroy(ResourceKind::Users, submitter_id).unwrap());

    let ticket = engine.get(ResourceKind::Tickets, id).unwrap();
    assert_eq!(ticket.get("submitter_id"), Some(&Value::Null));
    assert!(children(&engine, ResourceKind::TicketComments, id)
        .iter()
        .all(|c| c.get_u64("author_id") != Some(submitter_id)));

    // Unrelated changes still validate.
    let ticket = engine
        .update(ResourceKind::Tickets, id, attrs(json!({"status": "open"})))
        .unwrap();
    assert_eq!(ticket.get_str("status"), Some("open"));
}
