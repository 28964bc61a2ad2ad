use super::handlers::{comments, health, likes, sse};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const ALLOWED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PATCH, Method::DELETE];

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    let cors = if allowed_origins == "*" {
        CorsLayer::new()
            .allow_methods(ALLOWED_METHODS)
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
            CorsLayer::new()
                .allow_methods(ALLOWED_METHODS)
                .allow_origin(Any)
                .allow_headers(Any)
        } else {
            tracing::info!("CORS enabled for origins: {:?}", origins);
            CorsLayer::new()
                .allow_methods(ALLOWED_METHODS)
                .allow_origin(origins)
                .allow_headers(Any)
        }
    };

    Router::new()
        .route(
            "/api/posts/:post_id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/posts/:post_id/comments/stream", get(sse::stream_comments))
        .route(
            "/api/comments/:comment_id",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/api/comments/:comment_id/like", post(likes::toggle_like))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, Fixture};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use futures::StreamExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(fx: &Fixture) -> Router {
        let state = AppState {
            comments: fx.service.clone(),
            registry: fx.registry.clone(),
            keep_alive: Duration::from_secs(15),
        };
        build_router(state, "*")
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Parses one `data: <json>\n\n` frame.
    fn sse_frame(chunk: &[u8]) -> Value {
        let text = std::str::from_utf8(chunk).unwrap();
        let data = text
            .trim_end()
            .strip_prefix("data: ")
            .unwrap_or_else(|| panic!("not a data frame: {text:?}"));
        serde_json::from_str(data).unwrap()
    }

    #[tokio::test]
    async fn comment_crud_over_http() {
        let fx = fixture();
        let app = app(&fx);

        let resp = send(
            &app,
            Method::POST,
            "/api/posts/p1/comments",
            Some(json!({ "authorId": "42", "content": "hello" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json_body(resp).await;
        assert_eq!(created["content"], "hello");
        assert_eq!(created["likeCount"], 0);
        let id = created["id"].as_str().unwrap().to_string();

        let resp = send(
            &app,
            Method::POST,
            "/api/posts/p1/comments",
            Some(json!({ "authorId": "7", "content": "reply", "parentId": id })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send(&app, Method::GET, "/api/posts/p1/comments", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let threads = json_body(resp).await;
        assert_eq!(threads[0]["id"], id.as_str());
        assert_eq!(threads[0]["replies"][0]["content"], "reply");

        let resp = send(
            &app,
            Method::PATCH,
            &format!("/api/comments/{id}"),
            Some(json!({ "content": "edited" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["content"], "edited");

        let resp = send(&app, Method::DELETE, &format!("/api/comments/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["deleted"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn like_toggle_over_http() {
        let fx = fixture();
        let app = app(&fx);
        let c = fx
            .service
            .create(crate::testing::post_p1(), crate::testing::user("42"), "hi".into(), None)
            .await
            .unwrap();
        let uri = format!("/api/comments/{}/like", c.id);

        let resp = send(&app, Method::POST, &uri, Some(json!({ "userId": "7" }))).await;
        assert_eq!(json_body(resp).await, json!({ "liked": true, "likeCount": 1 }));
        let resp = send(&app, Method::POST, &uri, Some(json!({ "userId": "7" }))).await;
        assert_eq!(json_body(resp).await, json!({ "liked": false, "likeCount": 0 }));
    }

    #[tokio::test]
    async fn client_errors() {
        let fx = fixture();
        let app = app(&fx);

        let resp = send(&app, Method::GET, "/api/posts/missing/comments", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(json_body(resp).await["error"].is_string());

        let resp = send(
            &app,
            Method::POST,
            "/api/posts/p1/comments",
            Some(json!({ "authorId": "42", "content": "x", "parentId": "ghost" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(
            &app,
            Method::PATCH,
            "/api/comments/ghost",
            Some(json!({ "content": "x" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&app, Method::GET, "/api/posts/missing/comments/stream", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_failure_is_a_server_error() {
        let fx = fixture();
        let app = app(&fx);
        fx.store.fail_writes(true);

        let resp = send(
            &app,
            Method::POST,
            "/api/posts/p1/comments",
            Some(json!({ "authorId": "42", "content": "hello" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn stream_delivers_snapshot_then_events() {
        let fx = fixture();
        let app = app(&fx);

        let resp = send(&app, Method::GET, "/api/posts/p1/comments/stream", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );
        assert_eq!(fx.registry.subscriber_count(&crate::testing::post_p1()), 1);

        let mut body = resp.into_body().into_data_stream();
        let initial = sse_frame(&body.next().await.unwrap().unwrap());
        assert_eq!(initial, json!({ "type": "initial", "postId": "p1", "comments": [] }));

        let c = fx
            .service
            .create(crate::testing::post_p1(), crate::testing::user("42"), "hello".into(), None)
            .await
            .unwrap();
        let created = sse_frame(&body.next().await.unwrap().unwrap());
        assert_eq!(created["type"], "created");
        assert_eq!(created["comment"]["id"], c.id.as_str());
        assert_eq!(created["comment"]["content"], "hello");
        assert!(created["comment"]["parentId"].is_null());

        fx.service.delete(c.id.clone()).await.unwrap();
        let deleted = sse_frame(&body.next().await.unwrap().unwrap());
        assert_eq!(deleted["type"], "deleted");
        assert_eq!(deleted["commentId"], c.id.as_str());

        // client goes away
        drop(body);
        assert_eq!(fx.registry.subscriber_count(&crate::testing::post_p1()), 0);
    }

    #[tokio::test]
    async fn health_reports_subscribers() {
        let fx = fixture();
        let app = app(&fx);
        let _session = fx.service.open_stream(crate::testing::post_p1()).await.unwrap();

        let resp = send(&app, Method::GET, "/health", None).await;
        assert_eq!(
            json_body(resp).await,
            json!({ "status": "ok", "topics": 1, "subscribers": 1 })
        );
    }
}
