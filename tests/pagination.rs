//! Pagination: counts, continuation tokens and lazy traversal.

use deskmock::{EngineConfig, Fixtures, MockEngine, PageRequest, Record, Request, ResourceKind};
use proptest::prelude::*;
use serde_json::Map;

fn engine_with_groups(n: usize) -> (MockEngine, Vec<u64>) {
    let engine = MockEngine::new(EngineConfig::default()).unwrap();
    let ids = (0..n)
        .map(|i| {
            engine
                .create(ResourceKind::Groups, Fixtures::group(&format!("group {i}")))
                .unwrap()
                .id()
                .unwrap()
        })
        .collect();
    (engine, ids)
}

#[test]
fn test_first_page_links_forward_only() {
    let (engine, ids) = engine_with_groups(5);
    let page = engine
        .list(ResourceKind::Groups, Map::new(), PageRequest::first(2))
        .unwrap();

    assert_eq!(page.count, 5);
    assert_eq!(page.items.iter().filter_map(Record::id).collect::<Vec<_>>(), ids[..2]);
    assert!(page.previous_page.is_none());
    let next = page.next_page.unwrap();
    assert!(next.starts_with("https://mock.zendesk.com/api/v2/groups.json?page=2&per_page=2"));
}

#[test]
fn test_token_resumes_with_same_scope() {
    let engine = MockEngine::new(EngineConfig::default()).unwrap();
    let user = engine
        .create(ResourceKind::Users, Fixtures::user("Ann", "ann@example.com"))
        .unwrap();
    let user_id = user.id().unwrap();
    for n in 0..4 {
        engine
            .create(
                ResourceKind::Identities,
                Fixtures::identity(user_id, &format!("ann{n}@example.com")),
            )
            .unwrap();
    }

    let first = engine
        .dispatch(
            Request::list(ResourceKind::Identities)
                .with_scope("user_id", user_id)
                .per_page(3),
        )
        .unwrap();
    assert_eq!(first.body["count"], 5);
    let token = first.body["next_page"].as_str().unwrap().to_string();
    assert!(token.contains("scope%5Buser_id%5D="));

    let second = engine.page(&token).unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second.count, 5);
    assert!(second.next_page.is_none());
    assert!(second.items.iter().all(|i| i.get_u64("user_id") == Some(user_id)));
}

#[test]
fn test_foreign_token_is_rejected() {
    let (engine, _) = engine_with_groups(1);
    let err = engine.page("https://elsewhere.example/api/v2/groups.json?page=2").unwrap_err();
    assert_eq!(err.status(), 400);
}

#[test]
fn test_pages_reflect_mutations_between_fetches() {
    let (engine, _) = engine_with_groups(4);
    let mut pages = engine.pages(Request::list(ResourceKind::Groups).per_page(2));

    let first = pages.next().unwrap().unwrap();
    assert_eq!(first.count, 4);

    engine
        .create(ResourceKind::Groups, Fixtures::group("late arrival"))
        .unwrap();

    let second = pages.next().unwrap().unwrap();
    assert_eq!(second.count, 5);
    let third = pages.next().unwrap().unwrap();
    assert_eq!(third.items[0].get_str("name"), Some("late arrival"));
    assert!(pages.next().is_none());
    assert!(pages.next().is_none());
}

#[test]
fn test_entries_walk_search_results() {
    let (engine, ids) = engine_with_groups(7);
    let found: Vec<u64> = engine
        .entries(Request::search(ResourceKind::Groups, "group").per_page(3))
        .map(|r| r.unwrap().id().unwrap())
        .collect();
    assert_eq!(found, ids);
}

#[test]
fn test_invalid_page_parameter() {
    let (engine, _) = engine_with_groups(1);
    let response = engine.handle(Request::list(ResourceKind::Groups).with_param("page", "first"));
    assert_eq!(response.status, 400);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pages_concatenate_to_whole_collection(n in 0usize..40, per_page in 1usize..12) {
        let (engine, ids) = engine_with_groups(n);

        let mut seen = Vec::new();
        for page in engine.pages(Request::list(ResourceKind::Groups).per_page(per_page)) {
            let page = page.unwrap();
            prop_assert_eq!(page.count, n);
            prop_assert!(page.len() <= per_page);
            seen.extend(page.items.iter().filter_map(Record::id));
        }

        prop_assert_eq!(seen, ids);
    }
}
