use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_check, list_shops, method_not_allowed, record_event, shop_counters, stats, AppState,
};
use crate::alerts::{AlertDispatcher, AlertSink, ChannelSink, Notifier, NotifyTarget};
use crate::counters::{CounterRegistry, ThresholdEngine, DEFAULT_SHOPS};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Known shop identifiers
    pub shops: Vec<String>,
    /// Optional webhook receiving every alert
    pub webhook_url: Option<String>,
    /// Capacity of the alert queue feeding the dispatcher
    pub alert_queue_capacity: usize,
}

impl ServerConfig {
    /// Notification targets for the alert dispatcher
    pub fn notify_targets(&self) -> Vec<NotifyTarget> {
        let mut targets = vec![NotifyTarget::Log];
        if let Some(url) = &self.webhook_url {
            targets.push(NotifyTarget::webhook(url.clone()));
        }
        targets
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            shops: DEFAULT_SHOPS.iter().map(|s| s.to_string()).collect(),
            webhook_url: None,
            alert_queue_capacity: 1024,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Event intake
        .route("/", post(record_event).fallback(method_not_allowed))
        // Health check
        .route("/health", get(health_check))
        // Counters
        .route("/shops", get(list_shops))
        .route("/shops/:shop", get(shop_counters))
        // Stats
        .route("/stats", get(stats))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Alerts flow engine -> queue -> dispatcher -> notification targets
    let (sink, alerts) = ChannelSink::new(config.alert_queue_capacity);
    let mut dispatcher = AlertDispatcher::new(Notifier::with_targets(config.notify_targets()));
    let dispatcher_handle = dispatcher.start(alerts);

    let registry = CounterRegistry::new(&config.shops);
    if registry.is_empty() {
        tracing::warn!("No shops configured, every event will be rejected");
    }

    let sink: Arc<dyn AlertSink> = Arc::new(sink);
    let engine = Arc::new(ThresholdEngine::new(registry, sink));
    let state = Arc::new(AppState { engine });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting shopwatch server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatcher.stop().await;
    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "Alert dispatcher task failed");
    }

    tracing::info!(
        delivered = dispatcher.delivered(),
        failed = dispatcher.failed(),
        "shopwatch server stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::LogSink;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let engine = Arc::new(ThresholdEngine::new(
            CounterRegistry::with_default_shops(),
            Arc::new(LogSink),
        ));
        build_router(Arc::new(AppState { engine }))
    }

    fn create_channel_app() -> (Router, Arc<ThresholdEngine>, mpsc::Receiver<crate::alerts::AlertEvent>) {
        let (sink, rx) = ChannelSink::new(16);
        let engine = Arc::new(ThresholdEngine::new(
            CounterRegistry::with_default_shops(),
            Arc::new(sink),
        ));
        let app = build_router(Arc::new(AppState {
            engine: Arc::clone(&engine),
        }));
        (app, engine, rx)
    }

    fn post_form(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let app = create_test_app();

        for method in ["GET", "PUT", "DELETE"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body_json(response).await["error"], "method not allowed");
        }
    }

    #[tokio::test]
    async fn test_invalid_code() {
        let app = create_test_app();

        for body in ["shop=conad&code=abc", "shop=pharmacy&code=abc", "shop=conad"] {
            let response = app.clone().oneshot(post_form(body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"], "invalid code");
        }
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_shop_not_found() {
        let app = create_test_app();

        let response = app.oneshot(post_form("shop=pharmacy&code=1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "shop not found");
    }

    #[tokio::test]
    async fn test_unmapped_code_accepted() {
        let (app, engine, mut rx) = create_channel_app();

        let response = app.oneshot(post_form("shop=tigre&code=99")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["accepted"], true);
        assert!(body["alert"].is_null());
        assert_eq!(engine.registry().snapshot("tigre").unwrap().counts, [0; 4]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_threshold_alert() {
        let (app, engine, mut rx) = create_channel_app();

        for _ in 0..4 {
            let response = app
                .clone()
                .oneshot(post_form("shop=gros&code=3"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(body_json(response).await["alert"].is_null());
        }
        assert_eq!(engine.registry().snapshot("gros").unwrap().counts, [0, 0, 4, 0]);

        let response = app.oneshot(post_form("shop=gros&code=3")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["alert"]["shop"], "gros");
        assert_eq!(body["alert"]["code"], 3);
        assert_eq!(body["alert"]["category"], 2);

        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.shop, "gros");
        assert_eq!(alert.code, 3);
        assert_eq!(engine.registry().snapshot("gros").unwrap().counts, [0; 4]);
    }

    fn post_with_query(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_fields_from_query_string() {
        let (app, engine, _rx) = create_channel_app();

        let response = app
            .clone()
            .oneshot(post_with_query("/?shop=conad&code=1", None, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post_with_query(
                "/?shop=conad&code=6",
                Some("application/x-www-form-urlencoded"),
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(engine.registry().snapshot("conad").unwrap().counts, [1, 0, 0, 1]);
    }

    #[tokio::test]
    async fn test_body_fields_win_over_query_string() {
        let (app, engine, _rx) = create_channel_app();

        let response = app
            .clone()
            .oneshot(post_with_query(
                "/?shop=conad&code=1",
                Some("application/x-www-form-urlencoded"),
                "code=2",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(engine.registry().snapshot("conad").unwrap().counts, [0, 1, 0, 0]);

        // An empty body value still wins, as with a form reader
        let response = app
            .oneshot(post_with_query(
                "/?shop=conad&code=1",
                Some("application/x-www-form-urlencoded"),
                "code=",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(engine.registry().snapshot("conad").unwrap().counts, [0, 1, 0, 0]);
    }

    #[tokio::test]
    async fn test_multipart_body_ignored() {
        let (app, engine, _rx) = create_channel_app();
        let body = "--XYZ\r\nContent-Disposition: form-data; name=\"code\"\r\n\r\n2\r\n--XYZ--\r\n";

        let response = app
            .clone()
            .oneshot(post_with_query(
                "/?shop=tigre&code=3",
                Some("multipart/form-data; boundary=XYZ"),
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(engine.registry().snapshot("tigre").unwrap().counts, [0, 0, 1, 0]);

        let response = app
            .oneshot(post_with_query(
                "/",
                Some("multipart/form-data; boundary=XYZ"),
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_shop_counters() {
        let (app, engine, _rx) = create_channel_app();
        engine.record_event("conad", 1).unwrap();
        engine.record_event("conad", 6).unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/shops/conad")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shop"], "conad");
        assert_eq!(body["counts"], serde_json::json!([1, 0, 0, 1]));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/shops/pharmacy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::builder().uri("/shops").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["threshold"], 5);
        assert_eq!(body["shops"].as_array().unwrap().len(), 3);
        assert_eq!(body["shops"][0]["shop"], "conad");
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, _engine, _rx) = create_channel_app();

        app.clone()
            .oneshot(post_form("shop=conad&code=1"))
            .await
            .unwrap();
        app.clone()
            .oneshot(post_form("shop=nowhere&code=1"))
            .await
            .unwrap();

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["shops"], 3);
        assert_eq!(body["events_received"], 2);
        assert_eq!(body["events_rejected"], 1);
        assert_eq!(body["alerts_emitted"], 0);
    }

    #[test]
    fn test_notify_targets() {
        let mut config = ServerConfig::default();
        assert_eq!(config.notify_targets().len(), 1);

        config.webhook_url = Some("http://localhost:9000/alerts".to_string());
        let targets = config.notify_targets();
        assert_eq!(targets.len(), 2);
        assert!(matches!(targets[1], NotifyTarget::Webhook { .. }));
    }
}
