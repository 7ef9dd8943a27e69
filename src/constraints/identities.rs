//! Identity rules: one primary identity per user.

use serde_json::{Map, Value};

use super::{Context, FollowUp};
use crate::error::ValidationErrors;
use crate::kind::ResourceKind;
use crate::record::Record;
use crate::store::StoreState;

fn identity_ids_of(state: &StoreState, user_id: Option<u64>) -> Vec<u64> {
    state
        .iter(ResourceKind::Identities)
        .filter(|i| i.get_u64("user_id") == user_id)
        .filter_map(Record::id)
        .collect()
}

/// The first identity of a user is primary; later ones are not unless the
/// caller asks for it.
pub(super) fn apply_defaults(state: &StoreState, identity: &mut Record) {
    identity.insert_default("type", "email");
    identity.insert_default("verified", false);

    let first = identity_ids_of(state, identity.get_u64("user_id")).is_empty();
    let requested = identity.get_bool("primary").unwrap_or(false);
    identity.insert("primary", first || requested);
}

pub(super) fn validate_value(state: &StoreState, identity: &Record, errors: &mut ValidationErrors) {
    if identity.is_blank("value") {
        return;
    }

    let own_id = identity.id();
    let user_id = identity.get_u64("user_id");
    let value = identity.field_string("value").to_lowercase();
    let kind = identity.field_string("type");

    let clash = state.iter(ResourceKind::Identities).find(|other| {
        other.id() != own_id
            && other.field_string("type") == kind
            && other.field_string("value").to_lowercase() == value
    });

    let taken_by_user = kind == "email"
        && state.iter(ResourceKind::Users).any(|user| {
            user.id() != user_id && user.field_string("email").to_lowercase() == value
        });

    match clash {
        Some(other) if other.get_u64("user_id") == user_id => {
            errors.add("value", "Value has already been taken");
        }
        Some(_) => errors.add(
            "value",
            format!("Value: {} is already being used by another user", identity.field_string("value")),
        ),
        None if taken_by_user => errors.add(
            "value",
            format!("Value: {} is already being used by another user", identity.field_string("value")),
        ),
        None => {}
    }
}

pub(super) fn after_create(state: &mut StoreState, ctx: &Context<'_>, identity_id: u64) {
    let primary = state
        .find(ResourceKind::Identities, identity_id)
        .and_then(|i| i.get_bool("primary"))
        .unwrap_or(false);

    if primary {
        make_primary(state, ctx, identity_id);
    }
}

/// Identities never move between users. Promoting is deferred until after
/// commit; demoting the primary directly is refused.
pub(super) fn prepare_update(
    existing: &Record,
    changes: &mut Map<String, Value>,
    errors: &mut ValidationErrors,
) -> FollowUp {
    changes.remove("user_id");

    let Some(identity_id) = existing.id() else {
        return FollowUp::None;
    };
    let is_primary = existing.get_bool("primary").unwrap_or(false);

    match changes.remove("primary") {
        Some(Value::Bool(true)) => FollowUp::MakePrimary { identity_id },
        Some(Value::Bool(false)) if is_primary => {
            errors.add(
                "primary",
                "Primary: cannot be removed, make another identity primary instead",
            );
            FollowUp::None
        }
        // Re-sync the user's email when the primary address changes.
        _ if is_primary && changes.contains_key("value") => FollowUp::MakePrimary { identity_id },
        _ => FollowUp::None,
    }
}

/// Mark `identity_id` primary, demote its siblings and point the user's
/// email at it.
pub(super) fn make_primary(state: &mut StoreState, ctx: &Context<'_>, identity_id: u64) {
    let Some(identity) = state.get(ResourceKind::Identities, identity_id) else {
        return;
    };
    let user_id = identity.get_u64("user_id");

    for sibling in identity_ids_of(state, user_id) {
        let Some(record) = state.get_mut(ResourceKind::Identities, sibling) else {
            continue;
        };
        let primary = sibling == identity_id;
        if record.get_bool("primary") != Some(primary) {
            record.insert("primary", primary);
            ctx.touch(record);
        }
    }

    if identity.field_string("type") != "email" {
        return;
    }
    if let Some(user) = user_id.and_then(|id| state.get_mut(ResourceKind::Users, id)) {
        if user.get("email") != identity.get("value") {
            user.insert("email", identity.field_string("value"));
            ctx.touch(user);
        }
    }
}

/// A user must keep at least one identity.
pub(super) fn delete_blocker(state: &StoreState, identity: &Record) -> Option<String> {
    let user_id = identity.get_u64("user_id");
    let remaining = identity_ids_of(state, user_id).len();
    (remaining <= 1).then(|| {
        format!(
            "identity {} is the last identity of user {}",
            identity.id().unwrap_or_default(),
            user_id.unwrap_or_default()
        )
    })
}

/// Promote the first remaining identity when the primary one is removed.
pub(super) fn after_delete(state: &mut StoreState, ctx: &Context<'_>, removed: &Record) {
    if !removed.get_bool("primary").unwrap_or(false) {
        return;
    }

    let successor = identity_ids_of(state, removed.get_u64("user_id")).into_iter().next();
    if let Some(successor) = successor {
        make_primary(state, ctx, successor);
    }
}
