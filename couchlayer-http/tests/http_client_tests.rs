use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use couchlayer_core::client::{CouchClient, ViewOptions};
use couchlayer_core::config::{ConnectionConfig, Credentials};
use couchlayer_core::error::CouchError;
use couchlayer_http::HttpCouchClient;

async fn client_for(server: &MockServer) -> HttpCouchClient {
    HttpCouchClient::from_uri(&format!("{}/library", server.uri())).unwrap()
}

// ── writes ──────────────────────────────────────────────────────

#[tokio::test]
async fn put_returns_a_receipt_with_created_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/library/book-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "id": "book-1", "rev": "1-abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let receipt = client
        .put("book-1", &json!({ "title": "Dune" }))
        .await
        .unwrap();

    assert_eq!(receipt.id, "book-1");
    assert_eq!(receipt.rev, "1-abc");
    assert_eq!(receipt.status, 201);
}

#[tokio::test]
async fn put_conflict_maps_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/library/book-1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "conflict", "reason": "Document update conflict."
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .put("book-1", &json!({ "title": "Dune" }))
        .await
        .unwrap_err();
    assert!(matches!(err, CouchError::Conflict(id) if id == "book-1"));
}

#[tokio::test]
async fn put_into_an_absent_database_maps_to_database_missing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/library/book-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found", "reason": "no_db_file"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .put("book-1", &json!({ "title": "Dune" }))
        .await
        .unwrap_err();
    assert!(matches!(err, CouchError::DatabaseMissing(db) if db == "library"));
}

#[tokio::test]
async fn remove_sends_the_revision_as_a_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/library/book-1"))
        .and(query_param("rev", "1-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "id": "book-1", "rev": "2-dead"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let receipt = client.remove("book-1", "1-abc").await.unwrap();
    assert_eq!(receipt.rev, "2-dead");
}

// ── reads ───────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_document_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/library/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found", "reason": "missing"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get("ghost").await.unwrap_err();
    assert!(matches!(err, CouchError::NotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn head_parses_the_quoted_etag() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/library/book-1"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"1-abc\""))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let meta = client.head("book-1").await.unwrap();
    assert_eq!(meta.rev.as_deref(), Some("1-abc"));
    assert_eq!(meta.status, 200);
}

#[tokio::test]
async fn head_of_a_missing_document_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/library/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let meta = client.head("ghost").await.unwrap();
    assert_eq!(meta.rev, None);
    assert_eq!(meta.status, 404);
}

#[tokio::test]
async fn get_many_posts_the_key_set_with_docs_included() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/library/_all_docs"))
        .and(query_param("include_docs", "true"))
        .and(body_json(json!({ "keys": ["book-1", "book-2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                { "id": "book-1", "key": "book-1",
                  "value": { "rev": "1-a" },
                  "doc": { "_id": "book-1", "_rev": "1-a", "title": "Dune" } },
                { "key": "book-2", "error": "not_found" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client
        .get_many(&["book-1".to_string(), "book-2".to_string()])
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].doc.as_ref().unwrap()["title"], json!("Dune"));
    assert!(result.rows[1].doc.is_none());
}

// ── views ───────────────────────────────────────────────────────

#[tokio::test]
async fn view_targets_the_design_path_with_a_json_encoded_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/library/_design/Book/_view/byAuthor"))
        .and(query_param("key", "\"author-1\""))
        .and(query_param("include_docs", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 1,
            "offset": 0,
            "rows": [
                { "id": "book-1", "key": "author-1", "value": null,
                  "doc": { "_id": "book-1", "_rev": "1-a", "resource": "Book" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let options = ViewOptions::new().key("author-1").include_docs(true);
    let result = client.view("Book/byAuthor", &options).await.unwrap();

    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].id.as_deref(), Some("book-1"));
}

// ── merge ───────────────────────────────────────────────────────

#[tokio::test]
async fn merge_is_a_read_modify_write_against_the_current_revision() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/library/book-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "book-1", "_rev": "1-a", "title": "Dune", "year": 1965
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/library/book-1"))
        .and(body_json(json!({
            "_id": "book-1", "_rev": "1-a", "title": "Dune", "year": 1966
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ok": true, "id": "book-1", "rev": "2-b"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let merged = client
        .merge("book-1", &json!({ "year": 1966 }))
        .await
        .unwrap();

    assert_eq!(merged["year"], json!(1966));
    assert_eq!(merged["title"], json!("Dune"));
    assert_eq!(merged["_rev"], json!("2-b"));
}

// ── database lifecycle ──────────────────────────────────────────

#[tokio::test]
async fn create_database_puts_the_database_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/library"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.create_database().await.unwrap();
}

#[tokio::test]
async fn create_database_tolerates_an_existing_database() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/library"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "error": "file_exists", "reason": "The database could not be created."
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.create_database().await.unwrap();
}

// ── auth ────────────────────────────────────────────────────────

#[tokio::test]
async fn credentials_are_sent_as_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/library/book-1"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "book-1", "_rev": "1-a"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let rest = uri.strip_prefix("http://").unwrap();
    let (host, port) = rest.split_once(':').unwrap();
    let config = ConnectionConfig {
        host: host.to_string(),
        port: port.parse().unwrap(),
        database: "library".to_string(),
        auth: Some(Credentials {
            username: "feather".to_string(),
            password: "quill".to_string(),
        }),
    };

    let client = HttpCouchClient::new(config).unwrap();
    client.get("book-1").await.unwrap();
}
