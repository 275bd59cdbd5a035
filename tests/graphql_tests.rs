//! GraphQL API tests
//!
//! Documents are executed against the real schema backed by an in-memory
//! store, both directly and through the axum router.

use std::sync::Arc;
use std::time::Duration;

use async_graphql::{Request, Value};
use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode, header};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

use catalog::app::{AppState, build_app};
use catalog::config::Config;
use catalog::db::{Database, EntityStore};
use catalog::graphql::{CatalogSchema, build_schema, verify_operations};
use catalog::services::{Actor, AuthService, BroadcastEmitter, CatalogService};

struct TestApp {
    config: Arc<Config>,
    schema: CatalogSchema,
    auth: Arc<AuthService>,
}

async fn setup() -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("graphql-test-secret".to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        _ => None,
    })
    .unwrap();

    let store: Arc<dyn EntityStore> = Arc::new(Database::connect_in_memory().await.unwrap());
    let events = Arc::new(BroadcastEmitter::new(config.event_channel_capacity));
    let catalog = Arc::new(CatalogService::new(
        store.clone(),
        events.clone(),
        config.catalog(),
    ));
    let auth = Arc::new(AuthService::new(store, config.auth()));
    let schema = build_schema(catalog, auth.clone(), events);

    TestApp {
        config: Arc::new(config),
        schema,
        auth,
    }
}

/// Register a user and return their actor and token
async fn sign_in(app: &TestApp) -> (Actor, String) {
    let created = app
        .schema
        .execute(
            r#"mutation { createUser(username: "mluukkai", password: "salainen", favoriteGenre: "scifi") { id username } }"#,
        )
        .await;
    assert!(created.errors.is_empty(), "{:?}", created.errors);

    let login = app
        .schema
        .execute(r#"mutation { login(username: "mluukkai", password: "salainen") { value } }"#)
        .await;
    assert!(login.errors.is_empty(), "{:?}", login.errors);
    let data = login.data.into_json().unwrap();
    let token = data["login"]["value"].as_str().unwrap().to_string();

    let actor = app.auth.resolve_actor(&token).await.unwrap();
    (actor, token)
}

fn error_code(response: &async_graphql::Response) -> Option<Value> {
    response
        .errors
        .first()
        .and_then(|e| e.extensions.as_ref())
        .and_then(|ext| ext.get("code").cloned())
}

const ADD_DUNE: &str = r#"
    mutation {
      addBook(title: "Dune", published: 1965, author: "Frank Herbert", genres: ["scifi"]) {
        title
        authorName
        author { name bookCount }
      }
    }
"#;

#[tokio::test]
async fn schema_declares_every_operation() {
    let app = setup().await;
    verify_operations(&app.schema).await.unwrap();
}

#[tokio::test]
async fn add_book_without_token_is_unauthenticated() {
    let app = setup().await;

    let response = app.schema.execute(ADD_DUNE).await;
    assert_eq!(error_code(&response), Some(Value::from("UNAUTHENTICATED")));

    let count = app.schema.execute("{ bookCount authorsCount }").await;
    assert_eq!(
        count.data.into_json().unwrap(),
        json!({ "bookCount": 0, "authorsCount": 0 })
    );
}

#[tokio::test]
async fn login_token_authorizes_add_book() {
    let app = setup().await;
    let (actor, _) = sign_in(&app).await;

    let response = app
        .schema
        .execute(Request::new(ADD_DUNE).data(actor.clone()))
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({
            "addBook": {
                "title": "Dune",
                "authorName": "Frank Herbert",
                "author": [{ "name": "Frank Herbert", "bookCount": 1 }]
            }
        })
    );

    let me = app
        .schema
        .execute(Request::new("{ me { username favoriteGenre } }").data(actor))
        .await;
    assert_eq!(
        me.data.into_json().unwrap(),
        json!({ "me": { "username": "mluukkai", "favoriteGenre": "scifi" } })
    );
}

#[tokio::test]
async fn bad_login_is_user_input_error() {
    let app = setup().await;
    sign_in(&app).await;

    let response = app
        .schema
        .execute(r#"mutation { login(username: "mluukkai", password: "wrong-one") { value } }"#)
        .await;
    assert_eq!(error_code(&response), Some(Value::from("BAD_USER_INPUT")));
    assert_eq!(response.errors[0].message, "Invalid username or password");
}

#[tokio::test]
async fn edit_author_sets_born_and_misses_return_null() {
    let app = setup().await;
    let (actor, _) = sign_in(&app).await;
    app.schema
        .execute(Request::new(ADD_DUNE).data(actor.clone()))
        .await;

    let edited = app
        .schema
        .execute(
            Request::new(r#"mutation { editAuthor(name: "Frank Herbert", born: 1920) { name born } }"#)
                .data(actor.clone()),
        )
        .await;
    assert_eq!(
        edited.data.into_json().unwrap(),
        json!({ "editAuthor": { "name": "Frank Herbert", "born": 1920 } })
    );

    let missing = app
        .schema
        .execute(
            Request::new(r#"mutation { editAuthor(name: "Nobody Known", born: 1900) { name } }"#)
                .data(actor),
        )
        .await;
    assert!(missing.errors.is_empty());
    assert_eq!(missing.data.into_json().unwrap(), json!({ "editAuthor": null }));
}

#[tokio::test]
async fn edit_author_requires_born() {
    let app = setup().await;
    let (actor, _) = sign_in(&app).await;
    app.schema
        .execute(Request::new(ADD_DUNE).data(actor.clone()))
        .await;

    let cleared = app
        .schema
        .execute(
            Request::new(r#"mutation { editAuthor(name: "Frank Herbert", born: null) { born } }"#)
                .data(actor),
        )
        .await;
    assert!(!cleared.errors.is_empty());

    let author = app.schema.execute("{ authors(limit: 1) { author { born } } }").await;
    assert_eq!(
        author.data.into_json().unwrap(),
        json!({ "authors": { "author": [{ "born": null }] } })
    );
}

#[tokio::test]
async fn nested_relations_resolve_for_many_authors() {
    let app = setup().await;
    let (actor, _) = sign_in(&app).await;
    for (title, author) in [
        ("Dune", "Frank Herbert"),
        ("Foundation", "Isaac Asimov"),
        ("Dune Messiah", "Frank Herbert"),
        ("I, Robot", "Isaac Asimov"),
        ("Hyperion", "Dan Simmons"),
        ("Children of Dune", "Frank Herbert"),
    ] {
        let doc = format!(
            r#"mutation {{ addBook(title: "{title}", published: 1970, author: "{author}", genres: ["scifi"]) {{ title }} }}"#
        );
        let response = app.schema.execute(Request::new(doc).data(actor.clone())).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
    }

    let response = app
        .schema
        .execute("{ authors(limit: 10) { author { name bookCount books { title author { name } } } } }")
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({
            "authors": {
                "author": [
                    {
                        "name": "Frank Herbert",
                        "bookCount": 3,
                        "books": [
                            { "title": "Dune", "author": [{ "name": "Frank Herbert" }] },
                            { "title": "Dune Messiah", "author": [{ "name": "Frank Herbert" }] },
                            { "title": "Children of Dune", "author": [{ "name": "Frank Herbert" }] }
                        ]
                    },
                    {
                        "name": "Isaac Asimov",
                        "bookCount": 2,
                        "books": [
                            { "title": "Foundation", "author": [{ "name": "Isaac Asimov" }] },
                            { "title": "I, Robot", "author": [{ "name": "Isaac Asimov" }] }
                        ]
                    },
                    {
                        "name": "Dan Simmons",
                        "bookCount": 1,
                        "books": [
                            { "title": "Hyperion", "author": [{ "name": "Dan Simmons" }] }
                        ]
                    }
                ]
            }
        })
    );
}

#[tokio::test]
async fn authors_cursor_pages_and_bad_cursor() {
    let app = setup().await;
    let (actor, _) = sign_in(&app).await;
    for (title, author) in [
        ("Dune", "Frank Herbert"),
        ("Foundation", "Isaac Asimov"),
        ("Hyperion", "Dan Simmons"),
    ] {
        let doc = format!(
            r#"mutation {{ addBook(title: "{title}", published: 1970, author: "{author}", genres: ["scifi"]) {{ title }} }}"#
        );
        let response = app.schema.execute(Request::new(doc).data(actor.clone())).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
    }

    let first = app
        .schema
        .execute("{ authors(limit: 2) { cursor hasMorePages author { name } } }")
        .await
        .data
        .into_json()
        .unwrap();
    assert_eq!(
        first["authors"]["author"],
        json!([{ "name": "Frank Herbert" }, { "name": "Isaac Asimov" }])
    );
    assert_eq!(first["authors"]["hasMorePages"], json!(true));

    let cursor = first["authors"]["cursor"].as_str().unwrap();
    let second = app
        .schema
        .execute(format!(
            r#"{{ authors(cursor: "{cursor}", limit: 2) {{ hasMorePages author {{ name }} }} }}"#
        ))
        .await
        .data
        .into_json()
        .unwrap();
    assert_eq!(
        second,
        json!({ "authors": { "hasMorePages": false, "author": [{ "name": "Dan Simmons" }] } })
    );

    let bad = app
        .schema
        .execute(r#"{ authors(cursor: "MjAyNC0wMS0wMQ", limit: 2) { hasMorePages } }"#)
        .await;
    assert_eq!(error_code(&bad), Some(Value::from("MALFORMED_CURSOR")));
}

#[tokio::test]
async fn books_search_without_filters_is_null() {
    let app = setup().await;
    let (actor, _) = sign_in(&app).await;
    app.schema
        .execute(Request::new(ADD_DUNE).data(actor))
        .await;

    let none = app.schema.execute("{ booksSearch { book { title } } }").await;
    assert_eq!(none.data.into_json().unwrap(), json!({ "booksSearch": null }));

    let found = app
        .schema
        .execute(r#"{ booksSearch(genre: "scifi") { hasMorePages book { title genres } } }"#)
        .await;
    assert_eq!(
        found.data.into_json().unwrap(),
        json!({
            "booksSearch": {
                "hasMorePages": false,
                "book": [{ "title": "Dune", "genres": ["scifi"] }]
            }
        })
    );
}

#[tokio::test]
async fn book_added_subscription_receives_new_books() {
    let app = setup().await;
    let (actor, _) = sign_in(&app).await;

    let mut stream = app
        .schema
        .execute_stream("subscription { bookAdded { title authorName } }");

    let add = async {
        // Let the subscription register before publishing
        tokio::time::sleep(Duration::from_millis(50)).await;
        app.schema
            .execute(Request::new(ADD_DUNE).data(actor))
            .await
    };

    let (event, added) = tokio::time::timeout(Duration::from_secs(5), async {
        futures::join!(stream.next(), add)
    })
    .await
    .expect("subscription timed out");

    assert!(added.errors.is_empty(), "{:?}", added.errors);
    let event = event.expect("stream ended");
    assert_eq!(
        event.data.into_json().unwrap(),
        json!({ "bookAdded": { "title": "Dune", "authorName": "Frank Herbert" } })
    );
}

#[tokio::test]
async fn http_bearer_token_resolves_actor() {
    let app = setup().await;
    let (_, token) = sign_in(&app).await;

    let router = build_app(AppState {
        config: app.config.clone(),
        schema: app.schema.clone(),
        auth: app.auth.clone(),
    })
    .unwrap();

    let body = json!({ "query": ADD_DUNE }).to_string();

    let anonymous = router
        .clone()
        .oneshot(
            HttpRequest::post("/graphql")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(anonymous.into_body(), usize::MAX)
        .await
        .unwrap();
    let anonymous: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(anonymous["errors"][0]["extensions"]["code"], json!("UNAUTHENTICATED"));

    let authorized = router
        .oneshot(
            HttpRequest::post("/graphql")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(authorized.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(authorized.into_body(), usize::MAX)
        .await
        .unwrap();
    let authorized: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(authorized["data"]["addBook"]["title"], json!("Dune"));
}
