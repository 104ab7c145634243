mod helpers;

use helpers::{insert_memory, request, test_db, StubEmbedder};
use hypha::error::Error;
use hypha::memory::store::{
    create_memory, delete_memory, get_memory, list_memories, update_memory, ListFilter,
    MemoryUpdate,
};
use hypha::memory::store::CreateMemoryRequest;

#[test]
fn create_get_round_trip_preserves_content() {
    let mut conn = test_db();
    let embedder = StubEmbedder::new();

    let created = insert_memory(
        &mut conn,
        &embedder,
        &CreateMemoryRequest {
            importance: Some(9),
            tags: vec!["golang".into(), "concurrency".into()],
            domain: Some("programming".into()),
            ..request("Go routines enable concurrent programming")
        },
    );

    let fetched = get_memory(&conn, &created.id).unwrap();
    assert_eq!(fetched.content, created.content);
    assert_eq!(fetched.importance, 9);
    assert_eq!(fetched.tags, vec!["golang", "concurrency"]);
}

#[test]
fn importance_is_validated_across_the_range() {
    let mut conn = test_db();
    let embedder = StubEmbedder::new();

    for i in 1..=10 {
        create_memory(
            &mut conn,
            &embedder,
            &CreateMemoryRequest {
                importance: Some(i),
                ..request(&format!("valid importance {i}"))
            },
        )
        .unwrap();
    }

    for bad in [0, 11] {
        let err = create_memory(
            &mut conn,
            &embedder,
            &CreateMemoryRequest {
                importance: Some(bad),
                ..request("rejected")
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "importance {bad}");
    }
}

#[test]
fn timestamps_are_server_assigned_rfc3339() {
    let mut conn = test_db();
    let created = insert_memory(&mut conn, &StubEmbedder::new(), &request("timed fact"));

    let parsed = chrono::DateTime::parse_from_rfc3339(&created.created_at).unwrap();
    let age = chrono::Utc::now().signed_duration_since(parsed);
    assert!(age.num_seconds() < 60, "created_at should be now-ish");
    assert_eq!(created.created_at, created.updated_at);
}

#[test]
fn update_bumps_updated_at_only() {
    let mut conn = test_db();
    let embedder = StubEmbedder::new();
    let created = insert_memory(&mut conn, &embedder, &request("original"));

    std::thread::sleep(std::time::Duration::from_millis(2));
    let updated = update_memory(
        &mut conn,
        &embedder,
        &created.id,
        &MemoryUpdate {
            importance: Some(10),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[test]
fn deleted_memory_is_gone() {
    let mut conn = test_db();
    let embedder = StubEmbedder::new();
    let created = insert_memory(&mut conn, &embedder, &request("short lived"));

    delete_memory(&mut conn, &created.id).unwrap();

    let err = get_memory(&conn, &created.id).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(list_memories(&conn, &ListFilter::default()).unwrap().is_empty());
}

#[test]
fn list_respects_filters_and_pagination() {
    let mut conn = test_db();
    let embedder = StubEmbedder::new();

    for i in 0..4 {
        insert_memory(
            &mut conn,
            &embedder,
            &CreateMemoryRequest {
                domain: Some("programming".into()),
                ..request(&format!("code fact {i}"))
            },
        );
    }
    insert_memory(
        &mut conn,
        &embedder,
        &CreateMemoryRequest {
            domain: Some("cooking".into()),
            session_id: "kitchen".into(),
            ..request("bread fact")
        },
    );

    let programming = list_memories(
        &conn,
        &ListFilter {
            domain: Some("programming".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(programming.len(), 4);

    let page = list_memories(
        &conn,
        &ListFilter {
            domain: Some("programming".into()),
            limit: 2,
            offset: 2,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].content, "code fact 1"); // newest first, offset past 3 and 2

    let kitchen = list_memories(
        &conn,
        &ListFilter {
            session_id: Some("kitchen".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(kitchen.len(), 1);
}

#[test]
fn domain_is_auto_created_once() {
    let mut conn = test_db();
    let embedder = StubEmbedder::new();
    for i in 0..3 {
        insert_memory(
            &mut conn,
            &embedder,
            &CreateMemoryRequest {
                domain: Some("research".into()),
                ..request(&format!("paper note {i}"))
            },
        );
    }

    let domains = hypha::memory::taxonomy::list_domains(&conn).unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].name, "research");
}
