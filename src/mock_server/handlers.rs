//! Request handler: translates HTTP calls into engine requests.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use super::routes::{self, Target};
use crate::engine::{MockEngine, Operation, Request};
use crate::error::{MockError, Result};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MockEngine>,
    /// Path of the API base, e.g. `/api/v2/`.
    pub base_path: String,
}

/// Catch-all handler for every API route.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let outcome = build_request(&state.base_path, &method, &uri, &body)
        .and_then(|request| state.engine.dispatch(request));

    let (status, body) = match outcome {
        Ok(response) => (response.status, response.body),
        Err(err) => {
            tracing::debug!(%method, %uri, error = %err, "request failed");
            (err.status(), err.to_body())
        }
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

/// GET /health
pub async fn health_check() -> &'static str {
    "ok"
}

fn build_request(base_path: &str, method: &Method, uri: &Uri, body: &[u8]) -> Result<Request> {
    let unknown = || MockError::InvalidRequest(format!("no route for {method} {}", uri.path()));

    let relative = uri.path().strip_prefix(base_path).ok_or_else(unknown)?;
    let decoded = urlencoding::decode(relative).map_err(|_| unknown())?;
    let mut route = routes::resolve(&decoded).ok_or_else(unknown)?;

    let (mut params, scope) = query_params(uri.query().unwrap_or_default());
    if !body.is_empty() {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(map) => params.extend(map),
            Value::Null => {}
            _ => return Err(MockError::InvalidRequest("request body must be an object".to_string())),
        }
    }

    let operation = match (&route.target, method.as_str()) {
        (Target::Collection, "GET") => Operation::List,
        (Target::Collection, "POST") => Operation::Create,
        (Target::Search, "GET") => Operation::Search,
        (Target::Member(_) | Target::Locale(_), "GET") => Operation::Get,
        (Target::Member(_) | Target::Locale(_) | Target::MakePrimary(_), "PUT" | "PATCH") => {
            Operation::Update
        }
        (Target::Member(_) | Target::Locale(_), "DELETE") => Operation::Delete,
        _ => return Err(unknown()),
    };

    match &route.target {
        Target::Member(id) => {
            params.insert("id".to_string(), json!(id));
        }
        Target::Locale(locale) => {
            route.scope.insert("locale".to_string(), json!(locale));
        }
        Target::MakePrimary(id) => {
            params = Map::new();
            params.insert("id".to_string(), json!(id));
            params.insert("primary".to_string(), json!(true));
        }
        Target::Collection | Target::Search => {}
    }

    let mut request = Request::new(route.kind, operation);
    request.params = params;
    request.scope = route.scope;
    request.scope.extend(scope);
    Ok(request)
}

/// Split a query string into plain parameters and `scope[field]` entries.
fn query_params(query: &str) -> (Map<String, Value>, Map<String, Value>) {
    let mut params = Map::new();
    let mut scope = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match key.strip_prefix("scope[").and_then(|k| k.strip_suffix(']')) {
            Some(field) => scope.insert(field.to_string(), value),
            None => params.insert(key.into_owned(), value),
        };
    }
    (params, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ResourceKind;

    #[test]
    fn test_build_request_member_update() {
        let uri: Uri = "/api/v2/users/4.json".parse().unwrap();
        let request = build_request("/api/v2/", &Method::PUT, &uri, br#"{"user":{"name":"B"}}"#).unwrap();

        assert_eq!(request.kind, ResourceKind::Users);
        assert_eq!(request.operation, Operation::Update);
        assert_eq!(request.params["id"], json!(4));
        assert_eq!(request.params["user"]["name"], json!("B"));
    }

    #[test]
    fn test_build_request_reads_scope_from_query() {
        let uri: Uri = "/api/v2/identities.json?page=2&scope%5Buser_id%5D=3".parse().unwrap();
        let request = build_request("/api/v2/", &Method::GET, &uri, b"").unwrap();

        assert_eq!(request.operation, Operation::List);
        assert_eq!(request.params["page"], json!("2"));
        assert_eq!(request.scope["user_id"], json!("3"));
    }

    #[test]
    fn test_build_request_rejects_unknown_routes() {
        let uri: Uri = "/api/v2/widgets.json".parse().unwrap();
        let err = build_request("/api/v2/", &Method::GET, &uri, b"").unwrap_err();
        assert_eq!(err.status(), 400);

        let uri: Uri = "/api/v2/users/search.json".parse().unwrap();
        assert!(build_request("/api/v2/", &Method::DELETE, &uri, b"").is_err());
    }
}
