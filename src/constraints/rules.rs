//! Declarative per-kind validation rules.

use crate::error::{MockError, Result, ValidationErrors};
use crate::kind::ResourceKind;
use crate::query::Conditions;
use crate::record::{value_as_u64, Record};
use crate::store::StoreState;

/// A single constraint on a record of some kind.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Rule {
    /// Field must be present and non-blank.
    Required(&'static str),
    /// Non-null values must be unique (case-sensitive).
    Unique(&'static str),
    /// Non-null values must be unique ignoring case.
    UniqueIgnoreCase(&'static str),
    /// The combination of fields must be unique. Reported on the last field.
    UniqueTogether(&'static [&'static str]),
    /// Nested-collection parent; a missing parent is a 404.
    Parent(&'static str, ResourceKind),
    /// Optional reference; a dangling id is a validation error.
    Reference(&'static str, ResourceKind),
    /// List of references; every id must exist.
    References(&'static str, ResourceKind),
}

use ResourceKind as K;
use Rule::*;

/// Rules enforced on create and update for each kind.
pub(crate) fn rules(kind: ResourceKind) -> &'static [Rule] {
    match kind {
        K::Users => &[
            Required("name"),
            Unique("external_id"),
            Reference("organization_id", K::Organizations),
        ],
        K::Organizations => &[Required("name"), UniqueIgnoreCase("name"), Unique("external_id")],
        K::Identities => &[Parent("user_id", K::Users), Required("value")],
        K::Tickets => &[
            Required("description"),
            Unique("external_id"),
            Reference("requester_id", K::Users),
            Reference("submitter_id", K::Users),
            Reference("assignee_id", K::Users),
            References("collaborator_ids", K::Users),
            Reference("organization_id", K::Organizations),
            Reference("group_id", K::Groups),
        ],
        K::TicketComments => &[
            Parent("ticket_id", K::Tickets),
            Required("body"),
            Reference("author_id", K::Users),
        ],
        K::TicketAudits => &[Parent("ticket_id", K::Tickets)],
        K::TicketMetrics => &[Parent("ticket_id", K::Tickets), Unique("ticket_id")],
        K::TicketFields => &[Required("type"), Required("title")],
        K::UserFields => &[Required("key"), Required("title"), Unique("key")],
        K::Groups => &[Required("name")],
        K::Memberships => &[
            Reference("user_id", K::Users),
            Reference("organization_id", K::Organizations),
            Required("user_id"),
            Required("organization_id"),
            UniqueTogether(&["organization_id", "user_id"]),
        ],
        K::Forums => &[Required("name"), Reference("category_id", K::Categories)],
        K::Topics => &[Parent("forum_id", K::Forums), Required("title")],
        K::TopicComments => &[Parent("topic_id", K::Topics), Required("body")],
        K::Categories => &[Required("name")],
        K::Views => &[Required("title")],
        K::HelpCenterCategories => &[Required("name")],
        K::HelpCenterSections => &[Parent("category_id", K::HelpCenterCategories), Required("name")],
        K::HelpCenterArticles => &[Parent("section_id", K::HelpCenterSections), Required("title")],
        K::HelpCenterTranslations => &[
            Required("source_type"),
            Required("locale"),
            Required("title"),
            UniqueTogether(&["source_type", "source_id", "locale"]),
        ],
    }
}

/// Kind that `field` of a `kind` record points at, if any.
pub(crate) fn target_kind(kind: ResourceKind, field: &str) -> Option<ResourceKind> {
    rules(kind).iter().find_map(|rule| match *rule {
        Parent(f, target) | Reference(f, target) if f == field => Some(target),
        _ => None,
    })
}

/// Fail with `NotFound` if a nested parent does not exist.
pub(crate) fn check_parents(state: &StoreState, kind: ResourceKind, record: &Record) -> Result<()> {
    for rule in rules(kind) {
        if let Parent(field, parent) = *rule {
            let id = record.get_u64(field).unwrap_or(0);
            if !state.contains(parent, id) {
                return Err(MockError::NotFound { kind: parent, id });
            }
        }
    }

    if kind == K::HelpCenterTranslations {
        if let Some(source) = record
            .get_str("source_type")
            .and_then(ResourceKind::from_translation_source_type)
        {
            let id = record.get_u64("source_id").unwrap_or(0);
            if !state.contains(source, id) {
                return Err(MockError::NotFound { kind: source, id });
            }
        }
    }

    Ok(())
}

/// Run every rule for `kind`, collecting violations into `errors`.
///
/// The record's own id is excluded from uniqueness comparisons.
pub(crate) fn validate(
    state: &StoreState,
    kind: ResourceKind,
    record: &Record,
    errors: &mut ValidationErrors,
) {
    let own_id = record.id();
    let others = || state.iter(kind).filter(move |r| r.id() != own_id);

    for rule in rules(kind) {
        match *rule {
            Required(field) => {
                if record.is_blank(field) {
                    errors.add(field, format!("{}: cannot be blank", humanize(field)));
                }
            }
            Unique(field) => {
                if record.is_blank(field) {
                    continue;
                }
                let value = record.field_string(field);
                if others().any(|r| !r.is_blank(field) && r.field_string(field) == value) {
                    errors.add(field, format!("{} has already been taken", humanize(field)));
                }
            }
            UniqueIgnoreCase(field) => {
                if record.is_blank(field) {
                    continue;
                }
                let value = record.field_string(field).to_lowercase();
                if others().any(|r| r.field_string(field).to_lowercase() == value) {
                    errors.add(field, format!("{} has already been taken", humanize(field)));
                }
            }
            UniqueTogether(fields) => {
                if fields.iter().any(|f| record.is_blank(f)) {
                    continue;
                }
                let key: Vec<String> = fields.iter().map(|f| record.field_string(f)).collect();
                let taken = others().any(|r| {
                    fields
                        .iter()
                        .zip(&key)
                        .all(|(f, expected)| r.field_string(f) == *expected)
                });
                if let (true, Some(field)) = (taken, fields.last()) {
                    errors.add(*field, format!("{} has already been taken", humanize(field)));
                }
            }
            Reference(field, target) => {
                if record.is_blank(field) {
                    continue;
                }
                let exists = record.get_u64(field).is_some_and(|id| state.contains(target, id));
                if !exists {
                    errors.add(field, format!("{}: is invalid", humanize(field)));
                }
            }
            References(field, target) => {
                let Some(items) = record.get(field).and_then(|v| v.as_array()) else {
                    continue;
                };
                let all_exist = items
                    .iter()
                    .all(|v| value_as_u64(v).is_some_and(|id| state.contains(target, id)));
                if !all_exist {
                    errors.add(field, format!("{}: is invalid", humanize(field)));
                }
            }
            Parent(..) => {}
        }
    }

    match kind {
        K::Views => {
            if let Err(message) = Conditions::from_record(record) {
                errors.add("conditions", format!("Conditions: {message}"));
            }
        }
        K::HelpCenterTranslations => {
            let source_type = record.field_string("source_type");
            if !source_type.is_empty() && ResourceKind::from_translation_source_type(&source_type).is_none() {
                errors.add("source_type", "Source type: is invalid");
            }
        }
        _ => {}
    }
}

/// Human-readable field name: `external_id` becomes `External`.
pub(crate) fn humanize(field: &str) -> String {
    let base = field.strip_suffix("_id").unwrap_or(field).replace('_', " ");
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
