/// Chore search endpoint
///
/// # Endpoints
///
/// - `GET /api/search?q=<term>`
/// - `POST /api/search` with `{ "q": "<term>" }` (JSON or form)
///
/// Matches chore names case-insensitively. No match is an empty `results`
/// list, not an error.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{JsonOrForm, QueryParams},
    format::{Formatted, Payload, ResponseFormat},
    routes::SearchParams,
};
use axum::extract::State;
use chores_shared::models::chore::{Chore, ChoreFilter};

async fn run_search(state: &AppState, format: ResponseFormat, term: Option<String>) -> ApiResult<Formatted> {
    let term = term.ok_or_else(|| ApiError::BadRequest("q required".to_string()))?;

    let results = Chore::list(&state.db, &ChoreFilter::search(term)).await?;

    Ok(Formatted::ok(format, Payload::collection("results", &results)?))
}

pub async fn search_get(
    State(state): State<AppState>,
    format: ResponseFormat,
    QueryParams(params): QueryParams<SearchParams>,
) -> ApiResult<Formatted> {
    run_search(&state, format, params.term()).await
}

/// Reads `q` from the body, falling back to the query string
pub async fn search_post(
    State(state): State<AppState>,
    format: ResponseFormat,
    QueryParams(query): QueryParams<SearchParams>,
    JsonOrForm(body): JsonOrForm<SearchParams>,
) -> ApiResult<Formatted> {
    run_search(&state, format, body.term().or_else(|| query.term())).await
}
