//! Resource kinds served by the mock engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MockError;

/// The enumerated set of resource collections.
///
/// Each kind owns its own keyed collection in the store. Kinds serialize as
/// their collection root (`"users"`, `"help_center_articles"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Users,
    Organizations,
    Identities,
    Tickets,
    TicketComments,
    TicketAudits,
    TicketMetrics,
    TicketFields,
    UserFields,
    Groups,
    Memberships,
    Forums,
    Topics,
    TopicComments,
    Categories,
    Views,
    HelpCenterArticles,
    HelpCenterCategories,
    HelpCenterSections,
    HelpCenterTranslations,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [ResourceKind; 20] = [
        Self::Users,
        Self::Organizations,
        Self::Identities,
        Self::Tickets,
        Self::TicketComments,
        Self::TicketAudits,
        Self::TicketMetrics,
        Self::TicketFields,
        Self::UserFields,
        Self::Groups,
        Self::Memberships,
        Self::Forums,
        Self::Topics,
        Self::TopicComments,
        Self::Categories,
        Self::Views,
        Self::HelpCenterArticles,
        Self::HelpCenterCategories,
        Self::HelpCenterSections,
        Self::HelpCenterTranslations,
    ];

    /// Key wrapping a single record in a response body (e.g. `"user"`).
    pub fn model_root(self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Organizations => "organization",
            Self::Identities => "identity",
            Self::Tickets => "ticket",
            Self::TicketComments => "comment",
            Self::TicketAudits => "audit",
            Self::TicketMetrics => "ticket_metric",
            Self::TicketFields => "ticket_field",
            Self::UserFields => "user_field",
            Self::Groups => "group",
            Self::Memberships => "organization_membership",
            Self::Forums => "forum",
            Self::Topics => "topic",
            Self::TopicComments => "topic_comment",
            Self::Categories => "category",
            Self::Views => "view",
            Self::HelpCenterArticles => "article",
            Self::HelpCenterCategories => "category",
            Self::HelpCenterSections => "section",
            Self::HelpCenterTranslations => "translation",
        }
    }

    /// Key wrapping a list of records in a response body (e.g. `"users"`).
    pub fn collection_root(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Organizations => "organizations",
            Self::Identities => "identities",
            Self::Tickets => "tickets",
            Self::TicketComments => "comments",
            Self::TicketAudits => "audits",
            Self::TicketMetrics => "ticket_metrics",
            Self::TicketFields => "ticket_fields",
            Self::UserFields => "user_fields",
            Self::Groups => "groups",
            Self::Memberships => "organization_memberships",
            Self::Forums => "forums",
            Self::Topics => "topics",
            Self::TopicComments => "topic_comments",
            Self::Categories => "categories",
            Self::Views => "views",
            Self::HelpCenterArticles => "articles",
            Self::HelpCenterCategories => "categories",
            Self::HelpCenterSections => "sections",
            Self::HelpCenterTranslations => "translations",
        }
    }

    /// URL path of the collection, relative to the API base.
    pub fn path(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Organizations => "organizations",
            Self::Identities => "identities",
            Self::Tickets => "tickets",
            Self::TicketComments => "ticket_comments",
            Self::TicketAudits => "ticket_audits",
            Self::TicketMetrics => "ticket_metrics",
            Self::TicketFields => "ticket_fields",
            Self::UserFields => "user_fields",
            Self::Groups => "groups",
            Self::Memberships => "organization_memberships",
            Self::Forums => "forums",
            Self::Topics => "topics",
            Self::TopicComments => "topic_comments",
            Self::Categories => "categories",
            Self::Views => "views",
            Self::HelpCenterArticles => "help_center/articles",
            Self::HelpCenterCategories => "help_center/categories",
            Self::HelpCenterSections => "help_center/sections",
            Self::HelpCenterTranslations => "help_center/translations",
        }
    }

    /// Resolve a collection path (as produced by [`ResourceKind::path`]).
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_matches('/');
        Self::ALL.into_iter().find(|k| k.path() == path)
    }

    /// Name used by `type:` search tokens (`type:user`, `type:ticket`).
    pub fn from_search_type(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "user" => Some(Self::Users),
            "organization" => Some(Self::Organizations),
            "ticket" => Some(Self::Tickets),
            "group" => Some(Self::Groups),
            "topic" => Some(Self::Topics),
            "article" => Some(Self::HelpCenterArticles),
            _ => None,
        }
    }

    /// Source-type name a help-center translation uses for this kind.
    pub fn translation_source_type(self) -> Option<&'static str> {
        match self {
            Self::HelpCenterArticles => Some("Article"),
            Self::HelpCenterSections => Some("Section"),
            Self::HelpCenterCategories => Some("Category"),
            _ => None,
        }
    }

    /// Inverse of [`ResourceKind::translation_source_type`].
    pub fn from_translation_source_type(source_type: &str) -> Option<Self> {
        match source_type {
            "Article" => Some(Self::HelpCenterArticles),
            "Section" => Some(Self::HelpCenterSections),
            "Category" => Some(Self::HelpCenterCategories),
            _ => None,
        }
    }

    /// Snake-case name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Organizations => "organizations",
            Self::Identities => "identities",
            Self::Tickets => "tickets",
            Self::TicketComments => "ticket_comments",
            Self::TicketAudits => "ticket_audits",
            Self::TicketMetrics => "ticket_metrics",
            Self::TicketFields => "ticket_fields",
            Self::UserFields => "user_fields",
            Self::Groups => "groups",
            Self::Memberships => "memberships",
            Self::Forums => "forums",
            Self::Topics => "topics",
            Self::TopicComments => "topic_comments",
            Self::Categories => "categories",
            Self::Views => "views",
            Self::HelpCenterArticles => "help_center_articles",
            Self::HelpCenterCategories => "help_center_categories",
            Self::HelpCenterSections => "help_center_sections",
            Self::HelpCenterTranslations => "help_center_translations",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_root())
    }
}

impl FromStr for ResourceKind {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized || k.path() == normalized)
            .ok_or_else(|| MockError::InvalidRequest(format!("unknown resource kind '{s}'")))
    }
}
