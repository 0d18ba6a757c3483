use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::tasks;

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::submit_task))
        .route("/api/tasks/{task_id}", get(tasks::get_task))
        .route("/api/stats", get(tasks::get_stats))
        .route("/api/health", get(tasks::health))
        .route("/api/logs", get(super::sse_logs_endpoint))
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(state.api_port))
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::util::ServiceExt;

    use crate::core::engine::tests::{
        ChannelScript, MemoryStatusStore, ScriptedRunner, harness,
    };

    fn test_state() -> AppState {
        let h = harness(
            MemoryStatusStore::new(),
            ScriptedRunner::succeed("all done"),
            ChannelScript::Deliver,
            ChannelScript::Deliver,
        );
        let (log_tx, _) = tokio::sync::broadcast::channel(16);
        AppState {
            engine: h.engine,
            log_tx,
            api_port: 17890,
        }
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let body = match body {
            Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
            None => Body::empty(),
        };

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    #[tokio::test]
    async fn submit_task_returns_accepted_with_id() {
        let app = build_api_router(test_state());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({
                "prompt": "Create a readme",
                "agent_id": "agent-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["success"], true);
        assert!(json["task_id"].as_str().unwrap().starts_with("task-"));
    }

    #[tokio::test]
    async fn submit_task_rejects_blank_prompt() {
        let app = build_api_router(test_state());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({
                "prompt": "   ",
                "agent_id": "agent-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("prompt"));
    }

    #[tokio::test]
    async fn submit_task_rejects_bad_checkpoint_pattern() {
        let app = build_api_router(test_state());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({
                "prompt": "do things",
                "agent_id": "agent-1",
                "interaction_mode": "checkpoint",
                "checkpoint_pattern": "[unbalanced"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("pattern"));
    }

    #[tokio::test]
    async fn get_unknown_task_returns_404() {
        let app = build_api_router(test_state());
        let (status, json) =
            json_request(app, Method::GET, "/api/tasks/task-nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn stats_and_health_respond() {
        let state = test_state();
        let app = build_api_router(state.clone());
        let (status, json) = json_request(app, Method::GET, "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["stats"]["submitted"], 0);

        let app = build_api_router(state);
        let (status, json) = json_request(app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let app = build_api_router(test_state());
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn list_tasks_shows_submitted_task() {
        let state = test_state();
        let app = build_api_router(state.clone());
        let (_, submit_json) = json_request(
            app,
            Method::POST,
            "/api/tasks",
            Some(serde_json::json!({
                "prompt": "List something",
                "agent_id": "agent-1"
            })),
        )
        .await;
        let task_id = submit_json["task_id"].as_str().unwrap().to_string();

        // The task resolves quickly; poll until it shows up as active or
        // completed (there is a brief handoff between the two lists).
        let mut mentioned = false;
        for _ in 0..100 {
            let app = build_api_router(state.clone());
            let (status, json) = json_request(app, Method::GET, "/api/tasks", None).await;
            assert_eq!(status, StatusCode::OK);
            mentioned = json["active"]
                .as_array()
                .unwrap()
                .iter()
                .chain(json["completed"].as_array().unwrap().iter())
                .any(|t| t["task_id"] == task_id.as_str());
            if mentioned {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(mentioned);
    }
}
