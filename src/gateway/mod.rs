pub mod error;
pub mod handlers;
pub mod openapi;
pub mod state;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::{Next, from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use utoipa::OpenApi;

use crate::auth::auth_middleware;
use crate::config::ServerConfig;
use handlers::annotations;
pub use state::AppState;

const CORS_HEADERS: [(header::HeaderName, &str); 4] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_EXPOSE_HEADERS, "Location"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, PUT, DELETE"),
    (header::ACCESS_CONTROL_MAX_AGE, "86400"),
];

/// Answers preflights before auth runs and tags successful responses with
/// CORS headers. Error responses carry none.
async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    if response.status().as_u16() < 300 {
        let headers = response.headers_mut();
        for (name, value) in CORS_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    response
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

/// Build the application router, nested under `mountpoint` unless it is
/// empty or `/`.
pub fn router(state: Arc<AppState>, mountpoint: &str) -> Router {
    // Annotation routes (auth required)
    let annotation_routes = Router::new()
        .route(
            "/annotations",
            get(annotations::index).post(annotations::create),
        )
        .route(
            "/annotations/{id}",
            get(annotations::read)
                .put(annotations::update)
                .delete(annotations::delete),
        )
        .route("/search", get(annotations::search))
        .route_layer(from_fn_with_state(state.auth.clone(), auth_middleware));

    let routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(annotation_routes);

    // [SECURITY] Token endpoint - only compiled with the 'test-consumer' feature.
    // Production builds MUST be compiled with `--no-default-features` to exclude this.
    #[cfg(feature = "test-consumer")]
    let routes = if state.test_consumer.is_some() {
        routes.route("/auth/token", get(handlers::consumer::issue_token))
    } else {
        routes
    };

    let routes = routes.with_state(state);

    let mountpoint = mountpoint.trim_matches('/');
    let app = if mountpoint.is_empty() {
        routes
    } else {
        Router::new().nest(&format!("/{}", mountpoint), routes)
    };

    app.layer(from_fn(cors_middleware))
}

/// Bind and serve until the server fails.
pub async fn run_server(server: &ServerConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let auth_on = state.auth.enabled;
    let app = router(state, &server.mountpoint);

    let addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            server.port
        )
    })?;

    tracing::info!(%addr, mountpoint = %server.mountpoint, auth_on, "annotator store listening");
    if !auth_on {
        tracing::warn!("authentication disabled: requests act for any asserted x-annotator-user-id");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

