//! User email rules and identity bookkeeping.

use serde_json::{Map, Value};

use super::{Context, FollowUp};
use crate::error::ValidationErrors;
use crate::kind::ResourceKind;
use crate::record::Record;
use crate::store::StoreState;

/// Returns true if another user already owns `email`, either as their
/// address or as one of their identities. Comparison ignores case.
pub(super) fn email_taken(state: &StoreState, user_id: Option<u64>, email: &str) -> bool {
    let email = email.to_lowercase();

    let by_user = state.iter(ResourceKind::Users).any(|user| {
        user.id() != user_id && user.field_string("email").to_lowercase() == email
    });

    by_user
        || state.iter(ResourceKind::Identities).any(|identity| {
            identity.get_u64("user_id") != user_id
                && identity.field_string("type") == "email"
                && identity.field_string("value").to_lowercase() == email
        })
}

fn check_email(state: &StoreState, user_id: Option<u64>, email: &str, errors: &mut ValidationErrors) {
    if !email.contains('@') {
        errors.add("email", format!("Email: {email} is not properly formatted"));
    } else if email_taken(state, user_id, email) {
        errors.add("email", format!("Email: {email} is already being used by another user"));
    }
}

pub(super) fn validate_email(state: &StoreState, user: &Record, errors: &mut ValidationErrors) {
    if user.is_blank("email") {
        return;
    }
    check_email(state, user.id(), &user.field_string("email"), errors);
}

/// Give a freshly created user its primary email identity.
pub(super) fn after_create(state: &mut StoreState, ctx: &Context<'_>, user_id: u64) {
    let email = state
        .find(ResourceKind::Users, user_id)
        .filter(|user| !user.is_blank("email"))
        .map(|user| user.field_string("email"));

    if let Some(email) = email {
        add_email_identity(state, ctx, user_id, &email, true);
    }
}

/// Changing a user's email adds a secondary identity instead of replacing
/// the address; the user's `email` keeps following the primary identity.
/// A user without identities takes the new email as primary.
pub(super) fn prepare_update(
    state: &StoreState,
    existing: &Record,
    changes: &mut Map<String, Value>,
    errors: &mut ValidationErrors,
) -> FollowUp {
    let Some(user_id) = existing.id() else {
        return FollowUp::None;
    };

    let email = match changes.remove("email") {
        Some(Value::String(email)) if !email.trim().is_empty() => email,
        _ => return FollowUp::None,
    };

    if existing.field_string("email").eq_ignore_ascii_case(&email) {
        return FollowUp::None;
    }

    check_email(state, Some(user_id), &email, errors);

    let identities: Vec<&Record> = state
        .iter(ResourceKind::Identities)
        .filter(|i| i.get_u64("user_id") == Some(user_id))
        .collect();

    if identities.is_empty() {
        changes.insert("email".to_string(), Value::String(email.clone()));
        return FollowUp::AddIdentity {
            user_id,
            email,
            primary: true,
        };
    }

    let known = identities
        .iter()
        .any(|i| i.field_string("value").eq_ignore_ascii_case(&email));
    if known {
        FollowUp::None
    } else {
        FollowUp::AddIdentity {
            user_id,
            email,
            primary: false,
        }
    }
}

pub(super) fn add_email_identity(
    state: &mut StoreState,
    ctx: &Context<'_>,
    user_id: u64,
    email: &str,
    primary: bool,
) {
    let mut identity = Record::new();
    identity.insert("user_id", user_id);
    identity.insert("type", "email");
    identity.insert("value", email);
    identity.insert("verified", false);
    identity.insert("primary", primary);

    ctx.insert(state, ResourceKind::Identities, identity);
}
