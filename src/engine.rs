//! Dispatch façade.
//!
//! [`MockEngine`] is the only entry point collaborators use. It turns a
//! [`Request`] into constraint-engine mutations or store queries and wraps
//! the outcome in a [`Response`] shaped like the real API's.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::EngineConfig;
use crate::constraints::{self, rules, Context, Deletion};
use crate::error::{record_invalid_body, MockError, Result, ValidationErrors};
use crate::kind::ResourceKind;
use crate::pagination::{self, ContinuationToken, Entries, Page, PageRequest, Pages};
use crate::query::{Conditions, SearchQuery};
use crate::record::{value_as_u64, value_to_string, Record};
use crate::store::{EntityStore, StoreState};

/// Root key of search result lists.
const SEARCH_ROOT: &str = "results";

/// Scope keys that filter a listing but are not record attributes.
const SCOPE_FILTERS: &[&str] = &["view_id", "collaborator_id"];

/// Operation requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Get,
    List,
    Search,
    Page,
}

/// An abstract API request.
///
/// `params` carries the record attributes (either flat or wrapped in the
/// kind's model root, e.g. `{"user": {...}}`), ids and paging values.
/// `scope` holds parent ids for nested collections (`{"user_id": 3}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub kind: ResourceKind,
    pub operation: Operation,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub scope: Map<String, Value>,
}

impl Request {
    pub fn new(kind: ResourceKind, operation: Operation) -> Self {
        Self {
            kind,
            operation,
            params: Map::new(),
            scope: Map::new(),
        }
    }

    /// Create a record with the given attributes.
    pub fn create(kind: ResourceKind, attributes: Value) -> Self {
        Self::new(kind, Operation::Create).with_params(attributes)
    }

    /// Merge `changes` into record `id`.
    pub fn update(kind: ResourceKind, id: u64, changes: Value) -> Self {
        Self::new(kind, Operation::Update)
            .with_params(changes)
            .with_param("id", id)
    }

    pub fn delete(kind: ResourceKind, id: u64) -> Self {
        Self::new(kind, Operation::Delete).with_param("id", id)
    }

    pub fn get(kind: ResourceKind, id: u64) -> Self {
        Self::new(kind, Operation::Get).with_param("id", id)
    }

    pub fn list(kind: ResourceKind) -> Self {
        Self::new(kind, Operation::List)
    }

    /// Search `kind` with a query string such as `name:*ann* type:user`.
    pub fn search(kind: ResourceKind, query: &str) -> Self {
        Self::new(kind, Operation::Search).with_param("query", query)
    }

    /// Resume from a continuation token.
    pub fn page(kind: ResourceKind, token: String) -> Self {
        Self::new(kind, Operation::Page).with_param("url", token)
    }

    /// Add one parameter.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Merge an object of parameters; non-objects are ignored.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        if let Value::Object(map) = params {
            self.params.extend(map);
        }
        self
    }

    /// Add a parent scope entry.
    #[must_use]
    pub fn with_scope(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.scope.insert(key.to_string(), value.into());
        self
    }

    /// Page size for list and search requests.
    #[must_use]
    pub fn per_page(self, per_page: usize) -> Self {
        self.with_param("per_page", per_page)
    }
}

/// Response envelope: JSON body plus HTTP status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn record(status: u16, kind: ResourceKind, record: Record) -> Self {
        let mut body = Map::new();
        body.insert(kind.model_root().to_string(), record.into_value());
        Self {
            status,
            body: Value::Object(body),
        }
    }

    fn page(root: &str, page: Page<Record>) -> Self {
        let items: Vec<Value> = page.items.into_iter().map(Record::into_value).collect();
        let mut body = Map::new();
        body.insert(root.to_string(), Value::Array(items));
        body.insert("count".to_string(), json!(page.count));
        body.insert("next_page".to_string(), json!(page.next_page));
        body.insert("previous_page".to_string(), json!(page.previous_page));
        Self {
            status: 200,
            body: Value::Object(body),
        }
    }

    /// Envelope for a failed request.
    pub fn from_error(err: &MockError) -> Self {
        Self {
            status: err.status(),
            body: err.to_body(),
        }
    }

    fn delete_rejected(reason: String) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add("base", reason);
        Self {
            status: 422,
            body: record_invalid_body(&errors),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The single record under `kind`'s model root, if present.
    pub fn single(&self, kind: ResourceKind) -> Option<Record> {
        self.body
            .get(kind.model_root())
            .cloned()
            .and_then(|v| Record::try_from(v).ok())
    }

    /// Records listed under `root` (`"users"`, `"results"`, ...).
    pub fn list(&self, root: &str) -> Vec<Record> {
        self.body
            .get(root)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .cloned()
                    .filter_map(|v| Record::try_from(v).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Snapshot of the bootstrap current user, restored after resets.
#[derive(Debug)]
struct Bootstrap {
    user: Record,
    identities: Vec<Record>,
    /// Set by `reset`; cleared once the snapshot is restored.
    pending: bool,
}

/// Stateful in-memory stand-in for the ticketing API.
///
/// # Example
///
/// ```
/// use deskmock::{MockEngine, Request, ResourceKind};
/// use serde_json::json;
///
/// # fn main() -> deskmock::Result<()> {
/// let engine = MockEngine::new(Default::default())?;
/// let response = engine.dispatch(Request::create(
///     ResourceKind::Users,
///     json!({"user": {"name": "Ann", "email": "ann@example.com"}}),
/// ))?;
/// assert_eq!(response.status, 201);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockEngine {
    config: EngineConfig,
    store: EntityStore,
    bootstrap: Mutex<Option<Bootstrap>>,
}

impl MockEngine {
    /// Create an engine and seed the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured username is not a valid email.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let engine = Self {
            config,
            store: EntityStore::new(),
            bootstrap: Mutex::new(None),
        };
        engine.seed()?;
        Ok(engine)
    }

    /// Create an engine configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds malformed values.
    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env()?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    fn seed(&self) -> Result<()> {
        let mut attributes = Map::new();
        attributes.insert("email".to_string(), json!(self.config.username()));
        attributes.insert("name".to_string(), json!("Mock Agent"));
        attributes.insert("role".to_string(), json!("admin"));
        attributes.insert("verified".to_string(), json!(true));

        let ctx = Context::new(&self.config, None);
        let bootstrap = self.store.write(|state| -> Result<Bootstrap> {
            let user = constraints::create(state, &ctx, ResourceKind::Users, attributes)?;
            let identities = state
                .iter(ResourceKind::Identities)
                .filter(|i| i.get_u64("user_id") == user.id())
                .cloned()
                .collect();
            Ok(Bootstrap {
                user,
                identities,
                pending: false,
            })
        })?;

        tracing::debug!(user_id = ?bootstrap.user.id(), "seeded current user");
        *self.bootstrap.lock() = Some(bootstrap);
        Ok(())
    }

    fn current_user_id(&self) -> Option<u64> {
        self.bootstrap.lock().as_ref().and_then(|b| b.user.id())
    }

    /// Put the current user back after a reset.
    fn ensure_seeded(&self) {
        let mut guard = self.bootstrap.lock();
        let Some(bootstrap) = guard.as_mut().filter(|b| b.pending) else {
            return;
        };
        bootstrap.pending = false;

        self.store.write(|state| {
            state.put(ResourceKind::Users, bootstrap.user.clone());
            for identity in &bootstrap.identities {
                state.put(ResourceKind::Identities, identity.clone());
            }
        });
        tracing::debug!(user_id = ?bootstrap.user.id(), "re-seeded current user");
    }

    fn context(&self) -> Context<'_> {
        let current = self
            .current_user_id()
            .filter(|id| self.store.read(|state| state.contains(ResourceKind::Users, *id)));
        Context::new(&self.config, current)
    }

    /// The bootstrap current user, re-seeded after a reset.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] once the current user has been deleted.
    pub fn current_user(&self) -> Result<Record> {
        self.ensure_seeded();
        let id = self.current_user_id().unwrap_or_default();
        self.get(ResourceKind::Users, id)
    }

    /// Drop all records. The current user returns on next access.
    pub fn reset(&self) {
        let mut guard = self.bootstrap.lock();
        self.store.reset();
        if let Some(bootstrap) = guard.as_mut() {
            bootstrap.pending = true;
        }
        drop(guard);
        tracing::info!("mock data reset");
    }

    /// Validate and store a new record.
    ///
    /// # Errors
    ///
    /// [`MockError::ValidationFailed`] on constraint violations,
    /// [`MockError::NotFound`] if a nested parent is missing.
    #[tracing::instrument(skip(self, attributes))]
    pub fn create(&self, kind: ResourceKind, attributes: Map<String, Value>) -> Result<Record> {
        self.ensure_seeded();
        let ctx = self.context();
        self.store
            .write(|state| constraints::create(state, &ctx, kind, attributes))
    }

    /// Merge changes into an existing record.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if the record is absent,
    /// [`MockError::ValidationFailed`] on constraint violations.
    #[tracing::instrument(skip(self, changes))]
    pub fn update(&self, kind: ResourceKind, id: u64, changes: Map<String, Value>) -> Result<Record> {
        self.ensure_seeded();
        let ctx = self.context();
        self.store
            .write(|state| constraints::update(state, &ctx, kind, id, changes))
    }

    /// Delete a record, reporting whether a constraint blocked it.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if the record is absent.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, kind: ResourceKind, id: u64) -> Result<Deletion> {
        self.ensure_seeded();
        let ctx = self.context();
        self.store
            .write(|state| constraints::delete(state, &ctx, kind, id))
    }

    /// Delete a record; `Ok(false)` if a referential constraint blocked it.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if the record is absent.
    pub fn destroy(&self, kind: ResourceKind, id: u64) -> Result<bool> {
        self.delete(kind, id).map(|d| d.is_deleted())
    }

    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if the record is absent.
    pub fn get(&self, kind: ResourceKind, id: u64) -> Result<Record> {
        self.find(kind, id).ok_or(MockError::NotFound { kind, id })
    }

    /// Fetch a record by id, `None` if absent.
    pub fn find(&self, kind: ResourceKind, id: u64) -> Option<Record> {
        self.ensure_seeded();
        self.store.get(kind, id)
    }

    /// One page of a (possibly scoped) collection.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if a scope parent is missing.
    pub fn list(&self, kind: ResourceKind, scope: Map<String, Value>, page: PageRequest) -> Result<Page<Record>> {
        self.run(ContinuationToken {
            kind,
            search: false,
            scope,
            params: Map::new(),
            page,
        })
    }

    /// One page of search results.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if a scope parent is missing.
    pub fn search(
        &self,
        kind: ResourceKind,
        query: &SearchQuery,
        scope: Map<String, Value>,
        page: PageRequest,
    ) -> Result<Page<Record>> {
        self.run(ContinuationToken {
            kind: query.kind().unwrap_or(kind),
            search: true,
            scope,
            params: query.to_params(),
            page,
        })
    }

    /// Tickets matching a saved view.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if the view does not exist.
    pub fn view_tickets(&self, view_id: u64, page: PageRequest) -> Result<Page<Record>> {
        let mut scope = Map::new();
        scope.insert("view_id".to_string(), json!(view_id));
        self.list(ResourceKind::Tickets, scope, page)
    }

    /// Resume iteration from a continuation token.
    ///
    /// # Errors
    ///
    /// [`MockError::InvalidToken`] if the token was not issued by this engine.
    pub fn page(&self, token: &str) -> Result<Page<Record>> {
        self.run(ContinuationToken::decode(token, &self.config.api_url()?)?)
    }

    /// Lazily walk every page of a list or search request.
    pub fn pages(&self, request: Request) -> Pages<'_> {
        Pages::new(self, request)
    }

    /// Lazily walk every record of a list or search request.
    pub fn entries(&self, request: Request) -> Entries<'_> {
        Entries::new(self.pages(request))
    }

    /// Run a list, search or page request.
    pub(crate) fn fetch_page(&self, request: &Request) -> Result<Page<Record>> {
        self.run(self.token_for(request)?)
    }

    fn token_for(&self, request: &Request) -> Result<ContinuationToken> {
        let mut params = request.params.clone();
        let page = PageRequest::from_params(&params, self.config.page_size())?;
        params.remove("page");
        params.remove("per_page");

        match request.operation {
            Operation::List => Ok(ContinuationToken {
                kind: request.kind,
                search: false,
                scope: request.scope.clone(),
                params: Map::new(),
                page,
            }),
            Operation::Search => Ok(ContinuationToken {
                kind: SearchQuery::from_params(&params).kind().unwrap_or(request.kind),
                search: true,
                scope: request.scope.clone(),
                params,
                page,
            }),
            Operation::Page => {
                let url = params
                    .get("url")
                    .and_then(Value::as_str)
                    .ok_or_else(|| MockError::InvalidRequest("page request without url".to_string()))?;
                ContinuationToken::decode(url, &self.config.api_url()?)
            }
            other => Err(MockError::InvalidRequest(format!(
                "{other:?} does not return pages"
            ))),
        }
    }

    fn run(&self, token: ContinuationToken) -> Result<Page<Record>> {
        self.ensure_seeded();

        let slice = self.store.read(|state| -> Result<_> {
            let mut records = scoped(state, token.kind, &token.scope)?;
            if token.search {
                records = SearchQuery::from_params(&token.params).filter(state, records);
            }
            Ok(pagination::slice(records, token.page))
        })?;

        let base = self.config.api_url()?;
        let link = |page: Option<PageRequest>| -> Result<Option<String>> {
            page.map(|page| ContinuationToken { page, ..token.clone() }.encode(&base))
                .transpose()
        };

        Ok(Page {
            next_page: link(slice.next)?,
            previous_page: link(slice.previous)?,
            items: slice.items,
            count: slice.count,
        })
    }

    /// Execute a request, mapping failures to `Err`.
    ///
    /// # Errors
    ///
    /// Returns the typed failure; use [`MockEngine::handle`] to get an error
    /// envelope instead.
    #[tracing::instrument(skip(self, request), fields(kind = %request.kind, operation = ?request.operation))]
    pub fn dispatch(&self, request: Request) -> Result<Response> {
        let kind = request.kind;
        match request.operation {
            Operation::Create => {
                let mut attributes = model_params(kind, &request.params);
                for (key, value) in &request.scope {
                    if SCOPE_FILTERS.contains(&key.as_str()) {
                        continue;
                    }
                    attributes.entry(key.clone()).or_insert_with(|| value.clone());
                }
                let record = self.create(kind, attributes)?;
                Ok(Response::record(201, kind, record))
            }
            Operation::Update => {
                let id = self.resolve_id(&request)?;
                let mut changes = model_params(kind, &request.params);
                changes.remove("id");
                let record = self.update(kind, id, changes)?;
                Ok(Response::record(200, kind, record))
            }
            Operation::Delete => {
                let id = self.resolve_id(&request)?;
                match self.delete(kind, id)? {
                    Deletion::Deleted(record) => Ok(Response::record(200, kind, record)),
                    Deletion::Rejected(reason) => Ok(Response::delete_rejected(reason)),
                }
            }
            Operation::Get => {
                let id = self.resolve_id(&request)?;
                Ok(Response::record(200, kind, self.get(kind, id)?))
            }
            Operation::List | Operation::Search | Operation::Page => {
                let token = self.token_for(&request)?;
                let root = if token.search {
                    SEARCH_ROOT
                } else {
                    token.kind.collection_root()
                };
                let page = self.run(token)?;
                Ok(Response::page(root, page))
            }
        }
    }

    /// Execute a request, turning failures into error envelopes.
    pub fn handle(&self, request: Request) -> Response {
        self.dispatch(request)
            .unwrap_or_else(|err| Response::from_error(&err))
    }

    /// Id addressed by a single-record request.
    ///
    /// Translations may also be addressed by `(source_type, source_id, locale)`.
    /// When a scope is given the record must belong to it.
    fn resolve_id(&self, request: &Request) -> Result<u64> {
        let kind = request.kind;
        let attributes = model_params(kind, &request.params);
        let lookup = |key: &str| attributes.get(key).or_else(|| request.scope.get(key));

        self.ensure_seeded();
        self.store.read(|state| {
            let id = match lookup("id").and_then(value_as_u64) {
                Some(id) => id,
                None if kind == ResourceKind::HelpCenterTranslations => {
                    let key: Vec<String> = ["source_type", "source_id", "locale"]
                        .into_iter()
                        .map(|f| lookup(f).map(value_to_string).unwrap_or_default())
                        .collect();
                    state
                        .iter(kind)
                        .find(|t| {
                            t.field_string("source_type") == key[0]
                                && t.field_string("source_id") == key[1]
                                && t.field_string("locale") == key[2]
                        })
                        .and_then(Record::id)
                        .ok_or(MockError::NotFound { kind, id: 0 })?
                }
                None => {
                    return Err(MockError::InvalidRequest(format!(
                        "{kind} request without id"
                    )))
                }
            };

            let record = state.find(kind, id).ok_or(MockError::NotFound { kind, id })?;
            let in_scope = request
                .scope
                .iter()
                .all(|(field, value)| record.field_string(field) == value_to_string(value));
            if in_scope {
                Ok(id)
            } else {
                Err(MockError::NotFound { kind, id })
            }
        })
    }
}

/// Attributes of a single-record request: `params[model_root]` when it is
/// an object, the flat params otherwise.
fn model_params(kind: ResourceKind, params: &Map<String, Value>) -> Map<String, Value> {
    match params.get(kind.model_root()) {
        Some(Value::Object(inner)) => {
            let mut attributes = inner.clone();
            if let Some(id) = params.get("id") {
                attributes.entry("id".to_string()).or_insert_with(|| id.clone());
            }
            attributes
        }
        _ => params.clone(),
    }
}

/// Candidate records of `kind` restricted to `scope`.
///
/// `view_id` applies the view's conditions, `collaborator_id` matches ticket
/// collaborators, every other key is an equality filter whose parent record
/// must exist.
fn scoped(state: &StoreState, kind: ResourceKind, scope: &Map<String, Value>) -> Result<Vec<Record>> {
    let mut records = state.all(kind);
    let id_of = |key: &str, value: &Value| {
        value_as_u64(value)
            .ok_or_else(|| MockError::InvalidRequest(format!("scope {key} must be an id, got {value}")))
    };

    for (key, value) in scope {
        match key.as_str() {
            "view_id" => {
                let id = id_of(key, value)?;
                let view = state
                    .find(ResourceKind::Views, id)
                    .ok_or(MockError::NotFound { kind: ResourceKind::Views, id })?;
                let conditions = Conditions::from_record(view).map_err(MockError::InvalidRequest)?;
                records = conditions.filter(records);
            }
            "collaborator_id" => {
                let id = id_of(key, value)?;
                if !state.contains(ResourceKind::Users, id) {
                    return Err(MockError::NotFound { kind: ResourceKind::Users, id });
                }
                records.retain(|r| r.id_list("collaborator_ids").contains(&id));
            }
            field => {
                let parent = if kind == ResourceKind::HelpCenterTranslations && field == "source_id" {
                    scope
                        .get("source_type")
                        .and_then(Value::as_str)
                        .and_then(ResourceKind::from_translation_source_type)
                } else {
                    rules::target_kind(kind, field)
                };
                if let Some(parent) = parent {
                    let id = id_of(key, value)?;
                    if !state.contains(parent, id) {
                        return Err(MockError::NotFound { kind: parent, id });
                    }
                }
                let expected = value_to_string(value);
                records.retain(|r| r.field_string(field) == expected);
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MockEngine {
        MockEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_new_engine_seeds_current_user() {
        let engine = engine();
        let user = engine.current_user().unwrap();
        assert_eq!(user.get_str("email"), Some("agent@example.com"));
        assert_eq!(user.get_str("name"), Some("Mock Agent"));
    }

    #[test]
    fn test_reset_reseeds_lazily() {
        let engine = engine();
        let user = engine.current_user().unwrap();
        engine.reset();

        assert!(engine.store().get(ResourceKind::Users, user.id().unwrap()).is_none());
        assert_eq!(engine.current_user().unwrap(), user);
    }

    #[test]
    fn test_deleted_current_user_stays_deleted() {
        let engine = engine();
        let id = engine.current_user().unwrap().id().unwrap();

        assert!(engine.destroy(ResourceKind::Users, id).unwrap());
        assert!(engine.find(ResourceKind::Users, id).is_none());
        assert_eq!(engine.current_user().unwrap_err().status(), 404);
        assert!(engine
            .store()
            .all(ResourceKind::Identities)
            .iter()
            .all(|i| i.get_u64("user_id") != Some(id)));

        // Tickets no longer default their requester to the deleted user.
        let mut attributes = Map::new();
        attributes.insert("description".to_string(), json!("No one asked"));
        let ticket = engine.create(ResourceKind::Tickets, attributes).unwrap();
        assert_eq!(ticket.get_u64("requester_id"), None);

        engine.reset();
        assert_eq!(engine.current_user().unwrap().id(), Some(id));
    }

    #[test]
    fn test_model_params_unwraps_root() {
        let params = json!({"user": {"name": "a"}, "id": 4});
        let attrs = model_params(ResourceKind::Users, params.as_object().unwrap());
        assert_eq!(attrs.get("name"), Some(&json!("a")));
        assert_eq!(attrs.get("id"), Some(&json!(4)));
    }

    #[test]
    fn test_page_operation_rejects_missing_url() {
        let err = engine()
            .dispatch(Request::new(ResourceKind::Users, Operation::Page))
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_handle_wraps_errors() {
        let response = engine().handle(Request::get(ResourceKind::Users, 999));
        assert_eq!(response.status, 404);
        assert_eq!(response.body["error"], "RecordNotFound");
    }
}
