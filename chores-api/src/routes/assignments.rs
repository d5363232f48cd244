/// Assignment endpoints
///
/// # Endpoints
///
/// - `GET /assignments` - List assignments with optional filters
/// - `POST /assignments` - Assign a member to a chore on a date
/// - `GET /assignments/:id` - Fetch one assignment
/// - `PUT /assignments/:id` - Partial update (any subset of the fields)
/// - `DELETE /assignments/:id` - Delete an assignment
///
/// # List filters
///
/// `member_id`, `chore_id`, `date_from` and `date_to` (inclusive,
/// `YYYY-MM-DD`), `completed` (`true`/`false`/`1`/`0`), and `q`/`search`
/// matching the member or chore name. Blank values are ignored; malformed
/// ones answer 400.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{EntityId, JsonOrForm, QueryParams},
    format::{Formatted, Payload, ResponseFormat},
};
use axum::{extract::State, http::StatusCode};
use chores_shared::{
    auth::middleware::AuthContext,
    models::{
        assignment::{Assignment, AssignmentFilter, CreateAssignment},
        fields::{parse_bool, parse_date},
    },
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Raw list filters; parsed by [`AssignmentParams::into_filter`]
#[derive(Debug, Default, Deserialize)]
pub struct AssignmentParams {
    pub member_id: Option<String>,
    pub chore_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub completed: Option<String>,
    pub q: Option<String>,
    pub search: Option<String>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AssignmentParams {
    pub fn into_filter(self) -> ApiResult<AssignmentFilter> {
        let id = |field: &str, raw: &Option<String>| -> ApiResult<Option<i64>> {
            present(raw)
                .map(|v| {
                    v.parse::<i64>().map_err(|_| {
                        ApiError::BadRequest(format!("{} must be an integer", field))
                    })
                })
                .transpose()
        };

        let member_id = id("member_id", &self.member_id)?;
        let chore_id = id("chore_id", &self.chore_id)?;

        let date_from = present(&self.date_from)
            .map(|v| parse_date("date_from", v))
            .transpose()?;
        let date_to = present(&self.date_to)
            .map(|v| parse_date("date_to", v))
            .transpose()?;

        let completed = present(&self.completed)
            .map(|v| {
                parse_bool(v).ok_or_else(|| {
                    ApiError::BadRequest("completed must be a boolean".to_string())
                })
            })
            .transpose()?;

        let search = present(&self.q)
            .or_else(|| present(&self.search))
            .map(String::from);

        Ok(AssignmentFilter {
            member_id,
            chore_id,
            date_from,
            date_to,
            completed,
            search,
        })
    }
}

pub async fn list_assignments(
    State(state): State<AppState>,
    format: ResponseFormat,
    QueryParams(params): QueryParams<AssignmentParams>,
) -> ApiResult<Formatted> {
    let filter = params.into_filter()?;
    let assignments = Assignment::list(&state.db, &filter).await?;

    Ok(Formatted::ok(
        format,
        Payload::collection("assignments", &assignments)?,
    ))
}

pub async fn get_assignment(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    format: ResponseFormat,
) -> ApiResult<Formatted> {
    let assignment = Assignment::get(&state.db, id).await?;

    Ok(Formatted::ok(format, Payload::record("assignment", &assignment)?))
}

/// Creates an assignment
///
/// # Errors
///
/// - `400 Bad Request`: Missing field or `assigned_date` not `YYYY-MM-DD`
/// - `404 Not Found`: "member not found" / "chore not found"
pub async fn create_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    format: ResponseFormat,
    JsonOrForm(body): JsonOrForm<Map<String, Value>>,
) -> ApiResult<Formatted> {
    let data = CreateAssignment::from_fields(&body)?;
    let assignment = Assignment::create(&state.db, data).await?;
    debug!(
        username = %auth.username,
        assignment_id = assignment.assignment_id,
        "Assignment created by user"
    );

    Ok(Formatted::created(
        format,
        Payload::record("assignment", &assignment)?,
    ))
}

/// Applies only the supplied fields; an empty body returns the record as is
pub async fn update_assignment(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    format: ResponseFormat,
    JsonOrForm(body): JsonOrForm<Map<String, Value>>,
) -> ApiResult<Formatted> {
    let assignment = Assignment::update(&state.db, id, &body).await?;

    Ok(Formatted::ok(format, Payload::record("assignment", &assignment)?))
}

pub async fn delete_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    EntityId(id): EntityId,
) -> ApiResult<StatusCode> {
    Assignment::delete(&state.db, id).await?;
    debug!(username = %auth.username, assignment_id = id, "Assignment deleted by user");

    Ok(StatusCode::NO_CONTENT)
}
