/// Member endpoints
///
/// # Endpoints
///
/// - `GET /members` - List members (`q`/`search` filters by name)
/// - `POST /members` - Create a member
/// - `GET /members/:id` - Fetch one member
/// - `PUT /members/:id` - Rename a member
/// - `DELETE /members/:id` - Delete a member without assignments

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
    models::member::{CreateMember, Member, MemberFilter},
};
use serde_json::{Map, Value};
use tracing::debug;

pub async fn list_members(
    State(state): State<AppState>,
    format: ResponseFormat,
    QueryParams(params): QueryParams<SearchParams>,
) -> ApiResult<Formatted> {
    let filter = MemberFilter {
        search: params.term(),
    };
    let members = Member::list(&state.db, &filter).await?;

    Ok(Formatted::ok(format, Payload::collection("members", &members)?))
}

pub async fn get_member(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    format: ResponseFormat,
) -> ApiResult<Formatted> {
    let member = Member::get(&state.db, id).await?;

    Ok(Formatted::ok(format, Payload::record("member", &member)?))
}

/// Creates a member; `201` with the stored record
///
/// # Errors
///
/// - `400 Bad Request`: Missing or blank name
/// - `409 Conflict`: Name already taken
pub async fn create_member(
    State(state): State<AppState>,
    auth: AuthContext,
    format: ResponseFormat,
    JsonOrForm(body): JsonOrForm<Map<String, Value>>,
) -> ApiResult<Formatted> {
    let data = CreateMember::from_fields(&body)?;
    let member = Member::create(&state.db, data).await?;
    debug!(username = %auth.username, member_id = member.member_id, "Member created by user");

    Ok(Formatted::created(format, Payload::record("member", &member)?))
}

pub async fn update_member(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    format: ResponseFormat,
    JsonOrForm(body): JsonOrForm<Map<String, Value>>,
) -> ApiResult<Formatted> {
    let member = Member::update(&state.db, id, &body).await?;

    Ok(Formatted::ok(format, Payload::record("member", &member)?))
}

/// Deletes a member; `409` while assignments still reference it
pub async fn delete_member(
    State(state): State<AppState>,
    auth: AuthContext,
    EntityId(id): EntityId,
) -> ApiResult<StatusCode> {
    Member::delete(&state.db, id).await?;
    debug!(username = %auth.username, member_id = id, "Member deleted by user");

    Ok(StatusCode::NO_CONTENT)
}
