//! Dependent-record cleanup after a delete.

use serde_json::Value;

use super::Context;
use crate::kind::ResourceKind;
use crate::record::Record;
use crate::store::StoreState;

use ResourceKind as K;

/// `(parent, foreign key, child)`: children are deleted with their parent.
const OWNED: &[(ResourceKind, &str, ResourceKind)] = &[
    (K::Users, "user_id", K::Identities),
    (K::Users, "user_id", K::Memberships),
    (K::Organizations, "organization_id", K::Memberships),
    (K::Tickets, "ticket_id", K::TicketComments),
    (K::Tickets, "ticket_id", K::TicketAudits),
    (K::Tickets, "ticket_id", K::TicketMetrics),
    (K::Forums, "forum_id", K::Topics),
    (K::Topics, "topic_id", K::TopicComments),
    (K::HelpCenterCategories, "category_id", K::HelpCenterSections),
    (K::HelpCenterSections, "section_id", K::HelpCenterArticles),
];

/// `(parent, foreign key, child)`: the child's reference is cleared.
const NULLIFIED: &[(ResourceKind, &str, ResourceKind)] = &[
    (K::Organizations, "organization_id", K::Users),
    (K::Organizations, "organization_id", K::Tickets),
    (K::Groups, "group_id", K::Tickets),
    (K::Users, "assignee_id", K::Tickets),
    (K::Users, "submitter_id", K::Tickets),
    (K::Users, "author_id", K::TicketComments),
    (K::Users, "author_id", K::TicketAudits),
    (K::Categories, "category_id", K::Forums),
];

fn referencing(state: &StoreState, kind: ResourceKind, field: &str, id: u64) -> Vec<u64> {
    state
        .iter(kind)
        .filter(|r| r.get_u64(field) == Some(id))
        .filter_map(Record::id)
        .collect()
}

/// Remove or detach everything that pointed at `(kind, id)`.
pub(super) fn apply(state: &mut StoreState, ctx: &Context<'_>, kind: ResourceKind, id: u64) {
    for &(parent, field, child) in OWNED {
        if parent != kind {
            continue;
        }
        for child_id in referencing(state, child, field, id) {
            state.remove(child, child_id);
            apply(state, ctx, child, child_id);
        }
    }

    for &(parent, field, child) in NULLIFIED {
        if parent != kind {
            continue;
        }
        for child_id in referencing(state, child, field, id) {
            if let Some(record) = state.get_mut(child, child_id) {
                record.insert(field, Value::Null);
                ctx.touch(record);
            }
        }
    }

    if let Some(source_type) = kind.translation_source_type() {
        let translations: Vec<u64> = state
            .iter(K::HelpCenterTranslations)
            .filter(|t| t.get_str("source_type") == Some(source_type) && t.get_u64("source_id") == Some(id))
            .filter_map(Record::id)
            .collect();
        for translation in translations {
            state.remove(K::HelpCenterTranslations, translation);
        }
    }
}
