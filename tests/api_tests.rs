use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};
use blog_portal::{
    models::{NewComment, NewPost},
    repository::{CommentRepository, HttpRepository, PostRepository, RepositoryError},
    storage::{MemoryTokenStore, TokenStoreState},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Requests seen by the mock API: method, path, Authorization header, body.
type Seen = Arc<Mutex<Vec<(String, String, Option<String>, Value)>>>;

#[derive(Clone)]
struct MockApi {
    seen: Seen,
    known_post: Uuid,
}

fn record(api: &MockApi, method: &str, path: String, headers: &HeaderMap, body: Value) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    api.seen
        .lock()
        .unwrap()
        .push((method.to_string(), path, auth, body));
}

fn post_json(id: Uuid, approved: Value) -> Value {
    json!({
        "PostId": id,
        "Title": "Hello",
        "Content": "World",
        "Url": "",
        "Author": "Ana",
        "CreatedAt": "2024-03-01T10:15:30",
        "UserId": "u1",
        "isApproved": approved
    })
}

async fn list_posts(State(api): State<MockApi>, headers: HeaderMap) -> Json<Value> {
    record(&api, "GET", "/api/Post".into(), &headers, Value::Null);
    Json(json!([post_json(api.known_post, json!(1))]))
}

async fn list_unapproved(State(api): State<MockApi>, headers: HeaderMap) -> Json<Value> {
    record(&api, "GET", "/api/Post/unapproved".into(), &headers, Value::Null);
    Json(json!([post_json(Uuid::new_v4(), json!(0))]))
}

async fn create_post(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&api, "POST", "/api/Post".into(), &headers, body.clone());
    let mut created = post_json(Uuid::new_v4(), body["isApproved"].clone());
    created["Title"] = body["Title"].clone();
    created["UserId"] = body["UserId"].clone();
    Json(created)
}

async fn get_post(State(api): State<MockApi>, Path(id): Path<Uuid>) -> impl IntoResponse {
    if id == api.known_post {
        Json(post_json(id, json!(true))).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn update_post(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> StatusCode {
    record(&api, "PUT", format!("/api/Post/{id}"), &headers, body);
    StatusCode::NO_CONTENT
}

async fn delete_post(State(api): State<MockApi>, headers: HeaderMap, Path(id): Path<Uuid>) -> StatusCode {
    record(&api, "DELETE", format!("/api/Post/{id}"), &headers, Value::Null);
    StatusCode::OK
}

async fn approve_post(State(api): State<MockApi>, headers: HeaderMap, Path(id): Path<Uuid>) -> StatusCode {
    record(&api, "PUT", format!("/api/Post/approve/{id}"), &headers, Value::Null);
    StatusCode::OK
}

async fn create_comment(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&api, "POST", "/api/Comment".into(), &headers, body.clone());
    Json(json!({
        "CommentId": Uuid::new_v4(),
        "PostId": body["PostId"],
        "UserId": body["UserId"],
        "Content": body["Content"],
        "CreatedAt": "2024-03-01T10:15:30"
    }))
}

async fn comments_for_post(Path(post_id): Path<Uuid>) -> Json<Value> {
    Json(json!([{
        "CommentId": Uuid::new_v4(),
        "PostId": post_id,
        "UserId": "u2",
        "Content": "Nice",
        "CreatedAt": "2024-03-01T10:15:30"
    }]))
}

async fn delete_comment() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

struct TestApp {
    address: String,
    api: MockApi,
}

async fn spawn_app() -> TestApp {
    let api = MockApi {
        seen: Arc::default(),
        known_post: Uuid::new_v4(),
    };

    let router = Router::new()
        .route("/api/Post", get(list_posts).post(create_post))
        .route("/api/Post/unapproved", get(list_unapproved))
        .route("/api/Post/approve/{id}", put(approve_post))
        .route(
            "/api/Post/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/Comment", post(create_comment))
        .route("/api/Comment/post/{post_id}", get(comments_for_post))
        .route("/api/Comment/{id}", axum::routing::delete(delete_comment))
        .with_state(api.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}/", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, api }
}

fn repository(app: &TestApp, token: Option<&str>) -> HttpRepository {
    let tokens = match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    };
    HttpRepository::new(&app.address, Arc::new(tokens) as TokenStoreState)
}

fn seen(app: &TestApp) -> Vec<(String, String, Option<String>, Value)> {
    app.api.seen.lock().unwrap().clone()
}

#[tokio::test]
async fn test_create_post_sends_owner_and_approval_flag() {
    let app = spawn_app().await;
    let repo = repository(&app, Some("tok-123"));

    let post = PostRepository::create(
        &repo,
        NewPost {
            title: "Fresh".to_string(),
            content: "Body".to_string(),
            url: String::new(),
            author: "Ana".to_string(),
            category_id: None,
        },
        "u9",
        false,
    )
    .await
    .unwrap();

    assert_eq!(post.title, "Fresh");
    assert_eq!(post.author_user_id, "u9");
    assert!(!post.approved);

    let requests = seen(&app);
    let (method, path, auth, body) = &requests[0];
    assert_eq!(method, "POST");
    assert_eq!(path, "/api/Post");
    assert_eq!(auth.as_deref(), Some("Bearer tok-123"));
    assert_eq!(body["UserId"], json!("u9"));
    assert_eq!(body["isApproved"], json!(false));
}

#[tokio::test]
async fn test_list_merges_unapproved_when_asked() {
    let app = spawn_app().await;
    let repo = repository(&app, None);

    let approved = PostRepository::list(&repo, true).await.unwrap();
    assert_eq!(approved.len(), 1);
    assert!(approved[0].approved);

    let all = PostRepository::list(&repo, false).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|p| !p.approved).count(), 1);

    assert!(seen(&app).iter().all(|(_, _, auth, _)| auth.is_none()));
}

#[tokio::test]
async fn test_get_maps_404_to_none() {
    let app = spawn_app().await;
    let repo = repository(&app, None);

    let found = PostRepository::get(&repo, app.api.known_post).await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(app.api.known_post));

    let missing = PostRepository::get(&repo, Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_approve_update_and_delete_hit_their_endpoints() {
    let app = spawn_app().await;
    let repo = repository(&app, Some("tok"));
    let id = app.api.known_post;

    PostRepository::set_approved(&repo, id).await.unwrap();

    let mut post = PostRepository::get(&repo, id).await.unwrap().unwrap();
    post.title = "Edited".to_string();
    // The mock answers 204, so the sent post comes back.
    let updated = PostRepository::update(&repo, &post).await.unwrap();
    assert_eq!(updated.title, "Edited");

    PostRepository::delete(&repo, id).await.unwrap();

    let paths: Vec<(String, String)> = seen(&app)
        .into_iter()
        .map(|(method, path, _, _)| (method, path))
        .collect();
    assert_eq!(
        paths,
        vec![
            ("PUT".to_string(), format!("/api/Post/approve/{id}")),
            ("PUT".to_string(), format!("/api/Post/{id}")),
            ("DELETE".to_string(), format!("/api/Post/{id}")),
        ]
    );
}

#[tokio::test]
async fn test_comment_endpoints() {
    let app = spawn_app().await;
    let repo = repository(&app, Some("tok"));
    let post_id = Uuid::new_v4();

    let comment = CommentRepository::create(
        &repo,
        NewComment {
            post_id,
            content: "Hi".to_string(),
        },
        "u3",
    )
    .await
    .unwrap();
    assert_eq!(comment.post_id, post_id);
    assert_eq!(comment.author_user_id, "u3");

    let listed = CommentRepository::list_by_post(&repo, post_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].post_id, post_id);

    let failed = CommentRepository::delete(&repo, comment.id).await;
    assert!(matches!(
        failed,
        Err(RepositoryError::Status { status: 500, ref message }) if message == "boom"
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let repo = HttpRepository::new(
        format!("http://127.0.0.1:{port}"),
        Arc::new(MemoryTokenStore::new()) as TokenStoreState,
    );
    let result = PostRepository::list(&repo, true).await;
    assert!(matches!(result, Err(RepositoryError::Transport(_))));
}
