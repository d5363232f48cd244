/// Chore endpoints
///
/// # Endpoints
///
/// - `GET /chores` - List chores (`q`/`search` filters by name)
/// - `POST /chores` - Create a chore
/// - `GET /chores/:id` - Fetch one chore
/// - `PUT /chores/:id` - Update name and/or frequency
/// - `DELETE /chores/:id` - Delete a chore without assignments

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{EntityId, JsonOrForm, QueryParams},
    format::{Formatted, Payload, ResponseFormat},
    routes::SearchParams,
};
use axum::{extract::State, http::StatusCode};
use chores_shared::{
    auth::middleware::AuthContext,
    models::chore::{Chore, ChoreFilter, CreateChore},
};
use serde_json::{Map, Value};
use tracing::debug;

pub async fn list_chores(
    State(state): State<AppState>,
    format: ResponseFormat,
    QueryParams(params): QueryParams<SearchParams>,
) -> ApiResult<Formatted> {
    let filter = ChoreFilter {
        search: params.term(),
    };
    let chores = Chore::list(&state.db, &filter).await?;

    Ok(Formatted::ok(format, Payload::collection("chores", &chores)?))
}

pub async fn get_chore(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    format: ResponseFormat,
) -> ApiResult<Formatted> {
    let chore = Chore::get(&state.db, id).await?;

    Ok(Formatted::ok(format, Payload::record("chore", &chore)?))
}

/// Creates a chore; both `chore_name` and `frequency` are required
pub async fn create_chore(
    State(state): State<AppState>,
    auth: AuthContext,
    format: ResponseFormat,
    JsonOrForm(body): JsonOrForm<Map<String, Value>>,
) -> ApiResult<Formatted> {
    let data = CreateChore::from_fields(&body)?;
    let chore = Chore::create(&state.db, data).await?;
    debug!(username = %auth.username, chore_id = chore.chore_id, "Chore created by user");

    Ok(Formatted::created(format, Payload::record("chore", &chore)?))
}

pub async fn update_chore(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    format: ResponseFormat,
    JsonOrForm(body): JsonOrForm<Map<String, Value>>,
) -> ApiResult<Formatted> {
    let chore = Chore::update(&state.db, id, &body).await?;

    Ok(Formatted::ok(format, Payload::record("chore", &chore)?))
}

pub async fn delete_chore(
    State(state): State<AppState>,
    auth: AuthContext,
    EntityId(id): EntityId,
) -> ApiResult<StatusCode> {
    Chore::delete(&state.db, id).await?;
    debug!(username = %auth.username, chore_id = id, "Chore deleted by user");

    Ok(StatusCode::NO_CONTENT)
}
