//! Ticket defaults and the comment/audit/metric records derived from them.

use serde_json::{json, Map, Value};

use super::{Context, FollowUp};
use crate::kind::ResourceKind;
use crate::record::{value_to_string, Record};
use crate::store::StoreState;

pub(super) fn apply_defaults(state: &StoreState, ctx: &Context<'_>, ticket: &mut Record) {
    // Tickets may be opened with `comment: {body}` instead of a description.
    if let Some(comment) = ticket.remove("comment") {
        let body = comment_body(&comment);
        if ticket.is_blank("description") && !body.is_empty() {
            ticket.insert("description", body);
        }
    }

    ticket.insert_default("status", "new");
    ticket.insert_default("collaborator_ids", Value::Array(Vec::new()));
    ticket.insert_default("tags", Value::Array(Vec::new()));
    if let Some(user_id) = ctx.current_user_id {
        ticket.insert_default("requester_id", user_id);
    }
    if let Some(requester) = ticket.get("requester_id").cloned() {
        ticket.insert_default("submitter_id", requester);
    }

    let organization = ticket
        .get_u64("requester_id")
        .and_then(|id| state.find(ResourceKind::Users, id))
        .and_then(|user| user.get("organization_id"))
        .filter(|org| !org.is_null())
        .cloned();
    if let Some(organization) = organization {
        ticket.insert_default("organization_id", organization);
    }
}

fn comment_body(comment: &Value) -> String {
    match comment {
        Value::Object(map) => map.get("body").map(value_to_string).unwrap_or_default(),
        other => value_to_string(other),
    }
}

/// Seed the opening comment, the creation audit and the metric record.
pub(super) fn after_create(state: &mut StoreState, ctx: &Context<'_>, ticket_id: u64) {
    let Some(ticket) = state.get(ResourceKind::Tickets, ticket_id) else {
        return;
    };
    let author = ticket.get("requester_id").cloned().unwrap_or(Value::Null);
    let body = ticket.field_string("description");

    let mut comment = Record::new();
    comment.insert("ticket_id", ticket_id);
    comment.insert("type", "Comment");
    comment.insert("author_id", author.clone());
    comment.insert("body", body.clone());
    comment.insert("public", true);
    ctx.insert(state, ResourceKind::TicketComments, comment);

    let mut audit = Record::new();
    audit.insert("ticket_id", ticket_id);
    audit.insert("author_id", author);
    audit.insert(
        "events",
        json!([
            {"type": "Comment", "body": body, "public": true},
            {"type": "Create", "field_name": "status", "value": ticket.field_string("status")},
        ]),
    );
    ctx.insert(state, ResourceKind::TicketAudits, audit);

    let mut metric = Record::new();
    metric.insert("ticket_id", ticket_id);
    metric.insert("reopens", 0);
    metric.insert("replies", 0);
    metric.insert("solved_at", Value::Null);
    ctx.insert(state, ResourceKind::TicketMetrics, metric);
}

/// A `comment` in an update is not a ticket field; it becomes a new
/// comment once the update commits.
pub(super) fn prepare_update(
    ctx: &Context<'_>,
    existing: &Record,
    changes: &mut Map<String, Value>,
) -> FollowUp {
    let Some(comment) = changes.remove("comment") else {
        return FollowUp::None;
    };
    let (Some(ticket_id), body) = (existing.id(), comment_body(&comment)) else {
        return FollowUp::None;
    };
    if body.trim().is_empty() {
        return FollowUp::None;
    }

    let mut record = Record::new();
    record.insert("ticket_id", ticket_id);
    record.insert("type", "Comment");
    record.insert("body", body);
    record.insert(
        "public",
        comment.get("public").and_then(Value::as_bool).unwrap_or(true),
    );
    let author = comment
        .get("author_id")
        .cloned()
        .or_else(|| ctx.current_user_id.map(Value::from))
        .unwrap_or(Value::Null);
    record.insert("author_id", author);

    FollowUp::AddComment {
        ticket_id,
        comment: record,
    }
}

pub(super) fn add_comment(state: &mut StoreState, ctx: &Context<'_>, ticket_id: u64, comment: Record) {
    let mut audit = Record::new();
    audit.insert("ticket_id", ticket_id);
    audit.insert("author_id", comment.get("author_id").cloned().unwrap_or(Value::Null));
    audit.insert(
        "events",
        json!([{
            "type": "Comment",
            "body": comment.field_string("body"),
            "public": comment.get_bool("public").unwrap_or(true),
        }]),
    );

    ctx.insert(state, ResourceKind::TicketComments, comment);
    ctx.insert(state, ResourceKind::TicketAudits, audit);
}

/// First ticket naming `user_id` as requester or collaborator.
pub(super) fn referencing_ticket(state: &StoreState, user_id: u64) -> Option<u64> {
    state
        .iter(ResourceKind::Tickets)
        .find(|ticket| {
            ticket.get_u64("requester_id") == Some(user_id)
                || ticket.id_list("collaborator_ids").contains(&user_id)
        })
        .and_then(Record::id)
}
