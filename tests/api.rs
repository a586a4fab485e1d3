//! The HTTP boundary, driven through the actix service with an in-memory store.

use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use kieru::crypto;
use kieru::models::note::{CreatedId, FetchedNote, NewNote};
use kieru::store::{MemoryStore, NoteStore};
use kieru::{handlers, NoteExchange, StoreError};

fn exchange(store: Arc<dyn NoteStore>) -> web::Data<NoteExchange> {
    web::Data::new(NoteExchange::new(store))
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(exchange($store))
                .configure(handlers::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn index_is_up() {
    let app = app!(Arc::new(MemoryStore::new()));
    let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn create_then_fetch_once() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store.clone());

    let sealed = crypto::seal("hello", "k1");
    let req = test::TestRequest::post()
        .uri("/api/notes")
        .set_json(NewNote::from_sealed(&sealed))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let CreatedId { id } = test::read_body_json(res).await;
    assert_eq!(id.len(), 21);
    assert_eq!(store.len(), 1);

    let req = test::TestRequest::get().uri(&format!("/api/notes/{id}")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: FetchedNote = test::read_body_json(res).await;
    assert!(store.is_empty());

    let opened = crypto::open(&fetched.into_sealed().unwrap(), "k1").unwrap();
    assert_eq!(opened, "hello");

    let req = test::TestRequest::get().uri(&format!("/api/notes/{id}")).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body, json!({ "error": "Note not found or already deleted" }));
}

#[actix_web::test]
async fn unknown_and_consumed_ids_look_the_same() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store.clone());

    let sealed = crypto::seal("x", "k");
    let req = test::TestRequest::post()
        .uri("/api/notes")
        .set_json(NewNote::from_sealed(&sealed))
        .to_request();
    let CreatedId { id } = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::get().uri(&format!("/api/notes/{id}")).to_request();
    test::call_service(&app, req).await;

    let consumed = test::TestRequest::get().uri(&format!("/api/notes/{id}")).to_request();
    let consumed = test::call_and_read_body(&app, consumed).await;
    let unknown = test::TestRequest::get()
        .uri("/api/notes/AAAAAAAAAAAAAAAAAAAAA")
        .to_request();
    let unknown = test::call_and_read_body(&app, unknown).await;
    assert_eq!(consumed, unknown);
}

#[actix_web::test]
async fn missing_fields_are_rejected_without_storing() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store.clone());

    let req = test::TestRequest::post()
        .uri("/api/notes")
        .set_json(json!({ "encryptedContent": "", "iv": "00112233445566778899aabbccddeeff" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(
        body["fields"],
        json!([
            { "field": "encryptedContent", "problem": "missing" },
            { "field": "salt", "problem": "missing" },
        ])
    );
    assert!(store.is_empty());
}

#[actix_web::test]
async fn malformed_fields_are_rejected() {
    let app = app!(Arc::new(MemoryStore::new()));

    let req = test::TestRequest::post()
        .uri("/api/notes")
        .set_json(json!({
            "encryptedContent": "bm90IGEgYmxvY2s=",
            "iv": "nothex",
            "salt": "0011",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(
        body["fields"],
        json!([
            { "field": "encryptedContent", "problem": "wrongLength" },
            { "field": "iv", "problem": "malformed" },
            { "field": "salt", "problem": "wrongLength" },
        ])
    );
}

struct BrokenStore;

impl NoteStore for BrokenStore {
    fn create(&self, _: &kieru::models::note::NoteRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn fetch_and_delete(
        &self,
        _: &str,
        _: std::time::SystemTime,
    ) -> Result<Option<kieru::models::note::NoteRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn expire_older_than(&self, _: std::time::SystemTime) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[actix_web::test]
async fn store_outage_is_a_server_failure() {
    let app = app!(Arc::new(BrokenStore));

    let sealed = crypto::seal("x", "k");
    let req = test::TestRequest::post()
        .uri("/api/notes")
        .set_json(NewNote::from_sealed(&sealed))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(res).await;
    assert!(!body.to_string().contains("connection refused"));

    let req = test::TestRequest::get()
        .uri("/api/notes/AAAAAAAAAAAAAAAAAAAAA")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn unrepresentable_lifetime_is_a_server_fault() {
    let store = Arc::new(MemoryStore::new());
    let note_store: Arc<dyn NoteStore> = store.clone();
    let exchange = web::Data::new(NoteExchange::with_ttl(
        note_store,
        std::time::Duration::from_secs(u64::MAX),
    ));
    let app = test::init_service(
        App::new()
            .app_data(exchange)
            .configure(handlers::configure),
    )
    .await;

    let sealed = crypto::seal("x", "k");
    let req = test::TestRequest::post()
        .uri("/api/notes")
        .set_json(NewNote::from_sealed(&sealed))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(store.is_empty());
}
