//! Stateful in-memory emulation of a helpdesk ticketing API.
//!
//! Client code under test talks to a [`MockEngine`] instead of the real
//! service. The engine keeps typed collections of records (users, tickets,
//! organizations, identities and so on), enforces the service's uniqueness
//! and referential rules, derives the records the service would derive, and
//! answers paginated list and search requests.
//!
//! # Quick Start
//!
//! ```
//! use deskmock::{MockEngine, PageRequest, ResourceKind, SearchQuery};
//! use serde_json::json;
//!
//! # fn main() -> deskmock::Result<()> {
//! let engine = MockEngine::new(Default::default())?;
//!
//! let attributes = json!({"name": "Michelle", "email": "michelle@example.com"});
//! let user = engine.create(ResourceKind::Users, attributes.as_object().cloned().unwrap_or_default())?;
//!
//! // Creating a user also creates its primary email identity.
//! let query = SearchQuery::new().text("michelle");
//! let found = engine.search(ResourceKind::Users, &query, Default::default(), PageRequest::first(10))?;
//! assert_eq!(found.items[0].id(), user.id());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`store`] holds the records and allocates ids.
//! - The constraint engine validates every mutation and applies hooks and
//!   cascades inside the same write lock.
//! - [`query`] evaluates search strings and view conditions.
//! - [`pagination`] slices results and issues continuation tokens.
//! - [`engine`] routes abstract [`Request`]s to all of the above.
//!
//! # Configuration
//!
//! [`EngineConfig::from_env`] reads:
//!
//! - `DESKMOCK_URL` (optional) - base URL, defaults to `https://mock.zendesk.com/api/v2`
//! - `DESKMOCK_USERNAME` (optional) - email of the bootstrap current user
//! - `DESKMOCK_PAGE_SIZE` (optional) - default page size

pub mod cli;
mod config;
mod constraints;
pub mod engine;
mod error;
mod fixtures;
mod kind;
pub mod output;
pub mod pagination;
pub mod query;
mod record;
pub mod store;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use config::EngineConfig;
pub use constraints::Deletion;
pub use engine::{MockEngine, Operation, Request, Response};
pub use error::{MockError, Result, ValidationErrors};
pub use fixtures::{DefaultScenario, Fixtures};
pub use kind::ResourceKind;
pub use pagination::{ContinuationToken, Entries, Page, PageRequest, Pages, DEFAULT_PAGE_SIZE};
pub use query::{Condition, Conditions, Operator, SearchQuery};
pub use record::{value_as_u64, value_to_string, Record};
