//! Query and filter evaluation.
//!
//! Two query forms are supported: saved-view condition sets (see
//! [`Conditions`]) and field/free-text search (see [`SearchQuery`]). Both
//! operate on record snapshots and never touch the store directly, except
//! for organization-name resolution during search.

mod search;
mod view;

pub use search::SearchQuery;
pub use view::{Condition, Conditions, Operator};
