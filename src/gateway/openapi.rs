//! OpenAPI documentation
//!
//! Served as JSON at `/api-docs/openapi.json` (under the mountpoint).

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::HealthResponse;

/// Consumer-token header scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "consumer_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-annotator-auth-token",
                    r#"Consumer token auth. Send all four headers:

- x-annotator-consumer-key: consumer key
- x-annotator-user-id: user the request acts for
- x-annotator-auth-token-issue-time: YYYY-MM-DDTHH:MM:SS (UTC)
- x-annotator-auth-token: hex(sha256(secret + user_id + issue_time))"#,
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Annotator Store API",
        version = "0.1.0",
        description = "Annotation storage with consumer-token authentication and per-annotation permissions.",
        license(
            name = "MIT"
        )
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::annotations::index,
        crate::gateway::handlers::annotations::create,
        crate::gateway::handlers::annotations::read,
        crate::gateway::handlers::annotations::update,
        crate::gateway::handlers::annotations::delete,
        crate::gateway::handlers::annotations::search,
    ),
    components(
        schemas(
            HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Annotations", description = "Annotation CRUD and search (auth required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
