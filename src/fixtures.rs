//! Test data fixtures.
//!
//! Factory functions returning attribute maps ready for
//! [`MockEngine::create`], plus a small seeded scenario used by the mock
//! server and the CLI.

use serde_json::{json, Map, Value};

use crate::engine::MockEngine;
use crate::error::Result;
use crate::kind::ResourceKind;
use crate::record::Record;

/// Collection of fixture factories for test data.
pub struct Fixtures;

fn attributes(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Fixtures {
    // =========================================================================
    // People
    // =========================================================================

    /// An end user with a name and email.
    pub fn user(name: &str, email: &str) -> Map<String, Value> {
        attributes(json!({"name": name, "email": email}))
    }

    /// An agent belonging to an organization.
    pub fn agent(name: &str, email: &str, organization_id: u64) -> Map<String, Value> {
        attributes(json!({
            "name": name,
            "email": email,
            "role": "agent",
            "organization_id": organization_id,
        }))
    }

    pub fn organization(name: &str) -> Map<String, Value> {
        attributes(json!({"name": name}))
    }

    pub fn membership(user_id: u64, organization_id: u64) -> Map<String, Value> {
        attributes(json!({"user_id": user_id, "organization_id": organization_id}))
    }

    /// An additional email identity for `user_id`.
    pub fn identity(user_id: u64, email: &str) -> Map<String, Value> {
        attributes(json!({"user_id": user_id, "type": "email", "value": email}))
    }

    pub fn group(name: &str) -> Map<String, Value> {
        attributes(json!({"name": name}))
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    /// A ticket opened by `requester_id`.
    pub fn ticket(subject: &str, requester_id: u64) -> Map<String, Value> {
        attributes(json!({
            "subject": subject,
            "description": format!("{subject} (details)"),
            "requester_id": requester_id,
        }))
    }

    /// A ticket with a priority and an assignee.
    pub fn assigned_ticket(subject: &str, requester_id: u64, assignee_id: u64, priority: &str) -> Map<String, Value> {
        let mut ticket = Self::ticket(subject, requester_id);
        ticket.insert("assignee_id".to_string(), json!(assignee_id));
        ticket.insert("priority".to_string(), json!(priority));
        ticket
    }

    /// A view over tickets whose `field` is `value`.
    pub fn view(title: &str, field: &str, value: &str) -> Map<String, Value> {
        attributes(json!({
            "title": title,
            "conditions": {"all": [{"field": field, "operator": "is", "value": value}], "any": []},
        }))
    }

    pub fn ticket_field(title: &str, field_type: &str) -> Map<String, Value> {
        attributes(json!({"title": title, "type": field_type}))
    }

    pub fn user_field(key: &str, title: &str) -> Map<String, Value> {
        attributes(json!({"key": key, "title": title, "type": "text"}))
    }

    // =========================================================================
    // Community and help center
    // =========================================================================

    pub fn forum(name: &str) -> Map<String, Value> {
        attributes(json!({"name": name}))
    }

    pub fn topic(forum_id: u64, title: &str) -> Map<String, Value> {
        attributes(json!({"forum_id": forum_id, "title": title, "body": title}))
    }

    pub fn help_center_category(name: &str) -> Map<String, Value> {
        attributes(json!({"name": name}))
    }

    pub fn section(category_id: u64, name: &str) -> Map<String, Value> {
        attributes(json!({"category_id": category_id, "name": name}))
    }

    pub fn article(section_id: u64, title: &str) -> Map<String, Value> {
        attributes(json!({"section_id": section_id, "title": title, "body": title}))
    }

    /// A translation of an article, section or category.
    pub fn translation(source_type: &str, source_id: u64, locale: &str, title: &str) -> Map<String, Value> {
        attributes(json!({
            "source_type": source_type,
            "source_id": source_id,
            "locale": locale,
            "title": title,
        }))
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// Populate `engine` with a small helpdesk: one organization with two
    /// members, a support group, two tickets and a view over open tickets.
    ///
    /// # Errors
    ///
    /// Fails if the engine already holds conflicting records (e.g. the same
    /// organization name).
    pub fn default_scenario(engine: &MockEngine) -> Result<DefaultScenario> {
        let organization = engine.create(ResourceKind::Organizations, Self::organization("Acme"))?;
        let org_id = organization.id().unwrap_or_default();

        let agent = engine.create(ResourceKind::Users, Self::agent("Ann Agent", "ann@acme.test", org_id))?;
        let customer = engine.create(ResourceKind::Users, Self::user("Carl Customer", "carl@acme.test"))?;
        let agent_id = agent.id().unwrap_or_default();
        let customer_id = customer.id().unwrap_or_default();

        engine.create(ResourceKind::Memberships, Self::membership(agent_id, org_id))?;
        engine.create(ResourceKind::Memberships, Self::membership(customer_id, org_id))?;
        let group = engine.create(ResourceKind::Groups, Self::group("Support"))?;

        let tickets = vec![
            engine.create(
                ResourceKind::Tickets,
                Self::assigned_ticket("Printer on fire", customer_id, agent_id, "urgent"),
            )?,
            engine.create(ResourceKind::Tickets, Self::ticket("Password reset", customer_id))?,
        ];
        let view = engine.create(ResourceKind::Views, Self::view("New tickets", "status", "new"))?;

        tracing::debug!(tickets = tickets.len(), "seeded default scenario");
        Ok(DefaultScenario {
            organization,
            users: vec![agent, customer],
            group,
            tickets,
            view,
        })
    }
}

/// Records created by [`Fixtures::default_scenario`].
#[derive(Debug, Clone)]
pub struct DefaultScenario {
    pub organization: Record,
    pub users: Vec<Record>,
    pub group: Record,
    pub tickets: Vec<Record>,
    pub view: Record,
}
