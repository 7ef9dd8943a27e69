//! Search: wildcards, free text, organization names and `type:` routing.

use deskmock::{EngineConfig, Fixtures, MockEngine, PageRequest, Record, Request, ResourceKind, SearchQuery};
use serde_json::Map;

struct World {
    engine: MockEngine,
    michelle_acme: u64,
    michelle_globex: u64,
}

fn world() -> World {
    let engine = MockEngine::new(EngineConfig::default()).unwrap();
    let acme = engine
        .create(ResourceKind::Organizations, Fixtures::organization("Acme Widgets"))
        .unwrap()
        .id()
        .unwrap();
    let globex = engine
        .create(ResourceKind::Organizations, Fixtures::organization("Globex"))
        .unwrap()
        .id()
        .unwrap();

    let michelle_acme = engine
        .create(ResourceKind::Users, Fixtures::agent("Michelle Obama", "mo@acme.test", acme))
        .unwrap()
        .id()
        .unwrap();
    let michelle_globex = engine
        .create(ResourceKind::Users, Fixtures::agent("MICHELLE Pfeiffer", "mp@globex.test", globex))
        .unwrap()
        .id()
        .unwrap();
    engine
        .create(ResourceKind::Users, Fixtures::agent("Frank", "frank@acme.test", acme))
        .unwrap();

    World {
        engine,
        michelle_acme,
        michelle_globex,
    }
}

fn search(engine: &MockEngine, query: &SearchQuery) -> Vec<u64> {
    engine
        .search(ResourceKind::Users, query, Map::new(), PageRequest::first(100))
        .unwrap()
        .items
        .iter()
        .filter_map(Record::id)
        .collect()
}

#[test]
fn test_wildcard_text_matches_case_insensitively() {
    let world = world();
    let found = search(&world.engine, &SearchQuery::new().text("*michelle*"));
    assert_eq!(found, vec![world.michelle_acme, world.michelle_globex]);
}

#[test]
fn test_text_and_organization_must_both_match() {
    let world = world();
    let query = SearchQuery::new()
        .text("*michelle*")
        .field("organization", "Acme Widgets");
    assert_eq!(search(&world.engine, &query), vec![world.michelle_acme]);
}

#[test]
fn test_truncated_organization_name_still_matches() {
    let world = world();
    let query = SearchQuery::new().text("*michelle*").field("organization", "acme wid");
    assert_eq!(search(&world.engine, &query), vec![world.michelle_acme]);
}

#[test]
fn test_field_wildcard() {
    let world = world();
    let query = SearchQuery::parse("email:*globex*");
    assert_eq!(search(&world.engine, &query), vec![world.michelle_globex]);
}

#[test]
fn test_type_token_selects_kind_through_dispatch() {
    let world = world();
    let response = world
        .engine
        .dispatch(Request::search(ResourceKind::Tickets, "type:organization glob"))
        .unwrap();

    let results = response.list("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].get_str("name"), Some("Globex"));
    assert_eq!(response.body["count"], 1);
}

#[test]
fn test_search_without_matches_is_empty_page() {
    let world = world();
    let page = world
        .engine
        .search(
            ResourceKind::Users,
            &SearchQuery::new().text("nobody-by-that-name"),
            Map::new(),
            PageRequest::first(10),
        )
        .unwrap();
    assert!(page.is_empty());
    assert_eq!(page.count, 0);
    assert!(page.next_page.is_none());
}
