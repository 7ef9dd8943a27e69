//! Constraint engine.
//!
//! Every create, update and delete goes through this module while the caller
//! holds the store's write lock. Violations are detected before anything is
//! written, so a failed mutation leaves the store untouched. Post-commit
//! hooks (derived records, invariant repair, cascades) are infallible.

mod cascade;
mod identities;
pub(crate) mod rules;
mod tickets;
mod users;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{MockError, Result, ValidationErrors};
use crate::kind::ResourceKind;
use crate::record::Record;
use crate::store::StoreState;

/// Fields owned by the engine; caller-supplied values are discarded.
const ENGINE_FIELDS: &[&str] = &["id", "url", "created_at", "updated_at"];

/// Outcome of a delete that found its target.
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion {
    /// The record was removed; carries the final snapshot.
    Deleted(Record),
    /// A referential constraint blocked the delete; nothing changed.
    Rejected(String),
}

impl Deletion {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}

/// Per-mutation context: configuration, acting user and a single timestamp.
pub(crate) struct Context<'a> {
    config: &'a EngineConfig,
    current_user_id: Option<u64>,
    now: String,
}

impl<'a> Context<'a> {
    pub(crate) fn new(config: &'a EngineConfig, current_user_id: Option<u64>) -> Self {
        Self {
            config,
            current_user_id,
            now: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    fn record_url(&self, kind: ResourceKind, id: u64) -> String {
        format!("{}{}/{id}.json", self.config.base_url(), kind.path())
    }

    fn touch(&self, record: &mut Record) {
        record.insert("updated_at", self.now.clone());
    }

    /// Store an engine-generated record without validation.
    fn insert(&self, state: &mut StoreState, kind: ResourceKind, mut record: Record) -> u64 {
        let id = state.next_id();
        self.stamp(kind, id, &mut record);
        state.put(kind, record);
        id
    }

    fn stamp(&self, kind: ResourceKind, id: u64, record: &mut Record) {
        record.insert("id", id);
        record.insert("url", self.record_url(kind, id));
        record.insert("created_at", self.now.clone());
        record.insert("updated_at", self.now.clone());
    }
}

/// Work deferred until after an update commits.
#[derive(Debug)]
enum FollowUp {
    None,
    AddIdentity { user_id: u64, email: String, primary: bool },
    MakePrimary { identity_id: u64 },
    AddComment { ticket_id: u64, comment: Record },
}

fn sanitize(mut attributes: Map<String, Value>) -> Map<String, Value> {
    for field in ENGINE_FIELDS {
        attributes.remove(*field);
    }
    attributes
}

fn apply_defaults(state: &StoreState, ctx: &Context<'_>, kind: ResourceKind, record: &mut Record) {
    match kind {
        ResourceKind::Users => {
            record.insert_default("role", "end-user");
            record.insert_default("active", true);
            record.insert_default("verified", false);
        }
        ResourceKind::Identities => identities::apply_defaults(state, record),
        ResourceKind::Tickets => tickets::apply_defaults(state, ctx, record),
        ResourceKind::TicketComments => {
            record.insert_default("public", true);
            if let Some(user_id) = ctx.current_user_id {
                record.insert_default("author_id", user_id);
            }
        }
        ResourceKind::TicketMetrics => {
            record.insert_default("reopens", 0);
            record.insert_default("replies", 0);
        }
        ResourceKind::Memberships => record.insert_default("default", false),
        ResourceKind::Views => record.insert_default("active", true),
        ResourceKind::HelpCenterCategories
        | ResourceKind::HelpCenterSections
        | ResourceKind::HelpCenterArticles => record.insert_default("locale", "en-us"),
        ResourceKind::HelpCenterTranslations => record.insert_default("draft", false),
        _ => {}
    }
}

fn validate(state: &StoreState, kind: ResourceKind, record: &Record, errors: &mut ValidationErrors) {
    rules::validate(state, kind, record, errors);
    match kind {
        ResourceKind::Users => users::validate_email(state, record, errors),
        ResourceKind::Identities => identities::validate_value(state, record, errors),
        _ => {}
    }
}

fn fail(kind: ResourceKind, errors: ValidationErrors) -> MockError {
    warn!(%kind, %errors, "validation failed");
    MockError::ValidationFailed(errors)
}

/// Validate and commit a new record.
pub(crate) fn create(
    state: &mut StoreState,
    ctx: &Context<'_>,
    kind: ResourceKind,
    attributes: Map<String, Value>,
) -> Result<Record> {
    let mut record = Record::from(sanitize(attributes));
    // Allocated before validation: a rejected create still burns its id.
    let id = state.next_id();
    ctx.stamp(kind, id, &mut record);
    apply_defaults(state, ctx, kind, &mut record);

    rules::check_parents(state, kind, &record)?;

    let mut errors = ValidationErrors::new();
    validate(state, kind, &record, &mut errors);
    if !errors.is_empty() {
        return Err(fail(kind, errors));
    }

    state.put(kind, record);

    match kind {
        ResourceKind::Users => users::after_create(state, ctx, id),
        ResourceKind::Identities => identities::after_create(state, ctx, id),
        ResourceKind::Tickets => tickets::after_create(state, ctx, id),
        _ => {}
    }

    debug!(%kind, id, "record created");
    state.get(kind, id).ok_or(MockError::NotFound { kind, id })
}

/// Merge `changes` into an existing record, validate and commit.
pub(crate) fn update(
    state: &mut StoreState,
    ctx: &Context<'_>,
    kind: ResourceKind,
    id: u64,
    changes: Map<String, Value>,
) -> Result<Record> {
    let existing = state.get(kind, id).ok_or(MockError::NotFound { kind, id })?;
    let mut changes = sanitize(changes);
    let mut errors = ValidationErrors::new();

    let follow_up = match kind {
        ResourceKind::Users => users::prepare_update(state, &existing, &mut changes, &mut errors),
        ResourceKind::Identities => identities::prepare_update(&existing, &mut changes, &mut errors),
        ResourceKind::Tickets => tickets::prepare_update(ctx, &existing, &mut changes),
        _ => FollowUp::None,
    };

    let mut merged = existing;
    merged.merge(&changes);
    ctx.touch(&mut merged);

    rules::check_parents(state, kind, &merged)?;
    validate(state, kind, &merged, &mut errors);
    if !errors.is_empty() {
        return Err(fail(kind, errors));
    }

    state.put(kind, merged);

    match follow_up {
        FollowUp::None => {}
        FollowUp::AddIdentity { user_id, email, primary } => {
            users::add_email_identity(state, ctx, user_id, &email, primary);
        }
        FollowUp::MakePrimary { identity_id } => identities::make_primary(state, ctx, identity_id),
        FollowUp::AddComment { ticket_id, comment } => tickets::add_comment(state, ctx, ticket_id, comment),
    }

    debug!(%kind, id, "record updated");
    state.get(kind, id).ok_or(MockError::NotFound { kind, id })
}

/// Delete a record unless a referential constraint blocks it.
pub(crate) fn delete(
    state: &mut StoreState,
    ctx: &Context<'_>,
    kind: ResourceKind,
    id: u64,
) -> Result<Deletion> {
    let record = state.get(kind, id).ok_or(MockError::NotFound { kind, id })?;

    let blocker = match kind {
        ResourceKind::Users => tickets::referencing_ticket(state, id)
            .map(|ticket| format!("user {id} is referenced by ticket {ticket}")),
        ResourceKind::Identities => identities::delete_blocker(state, &record),
        _ => None,
    };

    if let Some(reason) = blocker {
        warn!(%kind, id, %reason, "delete rejected");
        return Ok(Deletion::Rejected(reason));
    }

    state.remove(kind, id);

    if kind == ResourceKind::Identities {
        identities::after_delete(state, ctx, &record);
    }
    cascade::apply(state, ctx, kind, id);

    debug!(%kind, id, "record deleted");
    Ok(Deletion::Deleted(record))
}
