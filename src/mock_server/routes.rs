//! REST path resolution.
//!
//! Maps a path relative to the API base (`users/3/identities/9.json`) onto
//! a resource kind, a parent scope and a target within the collection.

use serde_json::{json, Map, Value};

use crate::kind::ResourceKind;

use ResourceKind as K;

/// What a path addresses inside its collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The collection itself: list or create.
    Collection,
    /// `.../search.json`.
    Search,
    /// A single record by id.
    Member(u64),
    /// A translation addressed by locale.
    Locale(String),
    /// `users/{id}/identities/{id}/make_primary`.
    MakePrimary(u64),
}

/// A resolved path.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub kind: ResourceKind,
    pub scope: Map<String, Value>,
    pub target: Target,
}

impl Route {
    fn new(kind: ResourceKind, target: Target) -> Self {
        Self {
            kind,
            scope: Map::new(),
            target,
        }
    }

    fn scoped(mut self, field: &str, value: Value) -> Self {
        self.scope.insert(field.to_string(), value);
        self
    }
}

/// Child collection reachable under a parent record, with the scope field
/// that ties them together.
fn nested(parent: ResourceKind, child: &str) -> Option<(ResourceKind, &'static str)> {
    let resolved = match (parent, child) {
        (K::Users, "identities") => (K::Identities, "user_id"),
        (K::Users, "organization_memberships") => (K::Memberships, "user_id"),
        (K::Organizations, "organization_memberships") => (K::Memberships, "organization_id"),
        (K::Organizations, "users") => (K::Users, "organization_id"),
        (K::Organizations, "tickets") => (K::Tickets, "organization_id"),
        (K::Groups, "tickets") => (K::Tickets, "group_id"),
        (K::Tickets, "comments") => (K::TicketComments, "ticket_id"),
        (K::Tickets, "audits") => (K::TicketAudits, "ticket_id"),
        (K::Tickets, "metrics") => (K::TicketMetrics, "ticket_id"),
        (K::Forums, "topics") => (K::Topics, "forum_id"),
        (K::Topics, "comments") => (K::TopicComments, "topic_id"),
        (K::Views, "tickets") => (K::Tickets, "view_id"),
        (K::HelpCenterCategories, "sections") => (K::HelpCenterSections, "category_id"),
        (K::HelpCenterSections, "articles") => (K::HelpCenterArticles, "section_id"),
        _ => return None,
    };
    Some(resolved)
}

/// Resolve a decoded path relative to the API base.
pub fn resolve(path: &str) -> Option<Route> {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".json").unwrap_or(path);
    let (prefix, rest) = match path.strip_prefix("help_center/") {
        Some(rest) => ("help_center/", rest),
        None => ("", path),
    };
    let kind_of = |segment: &str| ResourceKind::from_path(&format!("{prefix}{segment}"));
    let id_of = |segment: &str| segment.parse::<u64>().ok();

    let segments: Vec<&str> = rest.split('/').collect();
    match segments.as_slice() {
        ["search"] if prefix.is_empty() => Some(Route::new(K::Tickets, Target::Search)),
        [collection] => Some(Route::new(kind_of(collection)?, Target::Collection)),
        [collection, "search"] => Some(Route::new(kind_of(collection)?, Target::Search)),
        [collection, id] => Some(Route::new(kind_of(collection)?, Target::Member(id_of(id)?))),
        [parent, parent_id, child] => {
            child_route(kind_of(parent)?, id_of(parent_id)?, child, Target::Collection)
        }
        [parent, parent_id, "tickets", filter] => {
            let user_id = id_of(parent_id)?;
            if kind_of(parent)? != K::Users {
                return None;
            }
            let field = match *filter {
                "requested" => "requester_id",
                "ccd" => "collaborator_id",
                "assigned" => "assignee_id",
                _ => return None,
            };
            Some(Route::new(K::Tickets, Target::Collection).scoped(field, json!(user_id)))
        }
        [parent, parent_id, "translations", locale] => child_route(
            kind_of(parent)?,
            id_of(parent_id)?,
            "translations",
            Target::Locale((*locale).to_string()),
        ),
        [parent, parent_id, child, id] => {
            child_route(kind_of(parent)?, id_of(parent_id)?, child, Target::Member(id_of(id)?))
        }
        [parent, parent_id, "identities", id, "make_primary"] => child_route(
            kind_of(parent)?,
            id_of(parent_id)?,
            "identities",
            Target::MakePrimary(id_of(id)?),
        ),
        _ => None,
    }
}

fn child_route(parent: ResourceKind, parent_id: u64, child: &str, target: Target) -> Option<Route> {
    if child == "translations" {
        let source_type = parent.translation_source_type()?;
        return Some(
            Route::new(K::HelpCenterTranslations, target)
                .scoped("source_type", json!(source_type))
                .scoped("source_id", json!(parent_id)),
        );
    }

    let (kind, field) = nested(parent, child)?;
    Some(Route::new(kind, target).scoped(field, json!(parent_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_collections_and_members() {
        assert_eq!(resolve("users.json"), Some(Route::new(K::Users, Target::Collection)));
        assert_eq!(resolve("tickets/7.json"), Some(Route::new(K::Tickets, Target::Member(7))));
        assert_eq!(
            resolve("help_center/articles/search.json"),
            Some(Route::new(K::HelpCenterArticles, Target::Search))
        );
        assert_eq!(resolve("widgets.json"), None);
        assert_eq!(resolve("users/abc.json"), None);
    }

    #[test]
    fn test_resolve_nested() {
        let route = resolve("users/3/identities/9/make_primary.json").unwrap();
        assert_eq!(route.kind, K::Identities);
        assert_eq!(route.target, Target::MakePrimary(9));
        assert_eq!(route.scope["user_id"], json!(3));

        let route = resolve("users/3/tickets/ccd.json").unwrap();
        assert_eq!(route.scope["collaborator_id"], json!(3));

        let route = resolve("views/2/tickets.json").unwrap();
        assert_eq!(route.kind, K::Tickets);
        assert_eq!(route.scope["view_id"], json!(2));
    }

    #[test]
    fn test_resolve_translations() {
        let route = resolve("help_center/articles/5/translations/fr.json").unwrap();
        assert_eq!(route.kind, K::HelpCenterTranslations);
        assert_eq!(route.target, Target::Locale("fr".to_string()));
        assert_eq!(route.scope["source_type"], json!("Article"));
        assert_eq!(route.scope["source_id"], json!(5));

        assert!(resolve("tickets/5/translations.json").is_none());
    }
}
