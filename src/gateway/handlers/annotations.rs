//! Annotation CRUD and search handlers.
//!
//! Every handler runs behind the auth middleware and acts for the
//! [`RequestUser`] it injected. Existence is checked before permission, so
//! a missing record is 404 for everyone.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Map, Value};

use super::super::error::{
    ApiError, ApiResult, NOT_CREATED_MESSAGE, NOT_FOUND_MESSAGE, NOT_UPDATED_MESSAGE,
};
use super::super::state::AppState;
use crate::annotation::{
    Action, Annotation, SearchQuery, SearchResult, authorise, from_wire_object, readable,
    run_search, to_wire,
};
use crate::auth::RequestUser;

/// Non-empty JSON object body, or nothing.
fn object_body(body: &Bytes) -> Option<Map<String, Value>> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(obj)) if !obj.is_empty() => Some(obj),
        _ => None,
    }
}

/// Load a record and check `action` on it.
async fn load_authorised(
    state: &AppState,
    id: i64,
    action: Action,
    user: &RequestUser,
    not_found: &'static str,
) -> ApiResult<Annotation> {
    let annotation = state
        .annotations
        .get(id)
        .await?
        .ok_or(ApiError::NotFound(not_found))?;

    if !authorise(&annotation, action, user.user_id()) {
        tracing::info!(
            annotation_id = id,
            action = %action,
            user = user.user_id().unwrap_or("-"),
            "permission denied"
        );
        return Err(ApiError::forbidden());
    }
    Ok(annotation)
}

/// List readable annotations
///
/// GET /annotations
#[utoipa::path(
    get,
    path = "/annotations",
    responses(
        (status = 200, description = "Every annotation the caller may read", content_type = "application/json"),
        (status = 401, description = "Authentication failed")
    ),
    security(("consumer_token" = [])),
    tag = "Annotations"
)]
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<RequestUser>,
) -> ApiResult<Json<Vec<Value>>> {
    let all = state.annotations.list().await?;
    let rows = readable(all, user.user_id())
        .iter()
        .map(|a| Value::Object(to_wire(a)))
        .collect();
    Ok(Json(rows))
}

/// Create an annotation
///
/// POST /annotations
///
/// The owner is the requesting user; any client `id` or `user` is ignored.
#[utoipa::path(
    post,
    path = "/annotations",
    request_body(content = Object, content_type = "application/json", description = "Annotation wire object"),
    responses(
        (status = 200, description = "Created annotation", content_type = "application/json"),
        (status = 400, description = "Empty, non-object or malformed body"),
        (status = 401, description = "Authentication failed")
    ),
    security(("consumer_token" = [])),
    tag = "Annotations"
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<RequestUser>,
    body: Bytes,
) -> ApiResult<Json<Map<String, Value>>> {
    let obj = object_body(&body).ok_or_else(|| ApiError::BadRequest(NOT_CREATED_MESSAGE.into()))?;
    let patch = from_wire_object(&obj)?;

    let mut annotation = patch.into_annotation();
    annotation.id = None;
    annotation.user = user.user_id().map(str::to_string);

    let created = state.annotations.create(annotation).await?;
    tracing::info!(annotation_id = ?created.id, user = created.user.as_deref().unwrap_or("-"), "annotation created");
    Ok(Json(to_wire(&created)))
}

/// Read one annotation
///
/// GET /annotations/{id}
#[utoipa::path(
    get,
    path = "/annotations/{id}",
    params(
        ("id" = i64, Path, description = "Annotation id")
    ),
    responses(
        (status = 200, description = "The annotation", content_type = "application/json"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Caller may not read it"),
        (status = 404, description = "No such annotation")
    ),
    security(("consumer_token" = [])),
    tag = "Annotations"
)]
pub async fn read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<RequestUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Map<String, Value>>> {
    let annotation = load_authorised(&state, id, Action::Read, &user, NOT_FOUND_MESSAGE).await?;
    Ok(Json(to_wire(&annotation)))
}

/// Update an annotation
///
/// PUT /annotations/{id}
///
/// Supplied fields overwrite stored ones; ranges are replaced wholesale and
/// extras merged key by key. `id` and `user` never change.
#[utoipa::path(
    put,
    path = "/annotations/{id}",
    params(
        ("id" = i64, Path, description = "Annotation id")
    ),
    request_body(content = Object, content_type = "application/json", description = "Fields to overwrite"),
    responses(
        (status = 200, description = "Updated annotation", content_type = "application/json"),
        (status = 400, description = "Empty, non-object or malformed body"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Caller may not update it"),
        (status = 404, description = "No such annotation")
    ),
    security(("consumer_token" = [])),
    tag = "Annotations"
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<RequestUser>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Map<String, Value>>> {
    let mut annotation = load_authorised(
        &state,
        id,
        Action::Update,
        &user,
        "Annotation not found. No update performed.",
    )
    .await?;

    let obj = object_body(&body).ok_or_else(|| ApiError::BadRequest(NOT_UPDATED_MESSAGE.into()))?;
    from_wire_object(&obj)?.apply(&mut annotation);

    let updated = state.annotations.update(annotation).await?;
    tracing::info!(annotation_id = id, user = user.user_id().unwrap_or("-"), "annotation updated");
    Ok(Json(to_wire(&updated)))
}

/// Delete an annotation
///
/// DELETE /annotations/{id}
#[utoipa::path(
    delete,
    path = "/annotations/{id}",
    params(
        ("id" = i64, Path, description = "Annotation id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Caller may not delete it"),
        (status = 404, description = "No such annotation")
    ),
    security(("consumer_token" = [])),
    tag = "Annotations"
)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<RequestUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    const NOT_FOUND: &str = "Annotation not found. No delete performed.";

    load_authorised(&state, id, Action::Delete, &user, NOT_FOUND).await?;
    if !state.annotations.delete(id).await? {
        // Raced with another delete
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    tracing::info!(annotation_id = id, user = user.user_id().unwrap_or("-"), "annotation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Search annotations
///
/// GET /search?text=Foo&all_fields=1&offset=0&limit=20
///
/// Every parameter other than `all_fields`, `offset` and `limit` is an
/// equality filter. `total` counts only records the caller may read.
#[utoipa::path(
    get,
    path = "/search",
    params(
        ("all_fields" = Option<String>, Query, description = "Return full objects when non-empty"),
        ("offset" = Option<usize>, Query, description = "Rows to skip (default 0)"),
        ("limit" = Option<i64>, Query, description = "Maximum rows (default 100, negative for no limit)")
    ),
    responses(
        (status = 200, description = "{ total, rows }", content_type = "application/json"),
        (status = 400, description = "Invalid offset or limit"),
        (status = 401, description = "Authentication failed")
    ),
    security(("consumer_token" = [])),
    tag = "Annotations"
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<RequestUser>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<SearchResult>> {
    let query = SearchQuery::from_params(params)?;
    let candidates = state.annotations.find(&query.filters).await?;
    let result = run_search(candidates, &query, user.user_id());
    tracing::debug!(filters = query.filters.len(), total = result.total, "search");
    Ok(Json(result))
}
