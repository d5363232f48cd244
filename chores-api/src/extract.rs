/// Request extraction with JSON error payloads
///
/// Clients post either JSON objects or HTML-style urlencoded forms. Both
/// decode into the same field map; form values arrive as strings and are
/// coerced by the field specs (`"3"` for an id, `"on"` for a flag).
///
/// Path ids and query strings get their own extractors so that malformed
/// input is rejected with the API's error body instead of axum's plain-text
/// rejections.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts},
    Form,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Body extractor accepting `application/json` or
/// `application/x-www-form-urlencoded`
///
/// Without a type parameter it yields the raw field map. An empty body is an
/// empty map; anything that is not an object or a form is rejected with 400.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T = Map<String, Value>>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            })
            .unwrap_or(false);

        let fields = if is_form {
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(format!("Invalid form body: {}", e.body_text())))?;

            form.into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect::<Map<String, Value>>()
        } else {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            parse_json_object(&bytes)?
        };

        Ok(JsonOrForm(serde_json::from_value(Value::Object(fields))?))
    }
}

/// Numeric entity id from the last path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityId(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        raw.trim()
            .parse::<i64>()
            .map(EntityId)
            .map_err(|_| ApiError::BadRequest("id must be an integer".to_string()))
    }
}

/// Query string extractor rejecting with 400 and a JSON body
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::try_from_uri(&parts.uri)
            .map(|Query(params)| QueryParams(params))
            .map_err(|e| ApiError::BadRequest(format!("Invalid query string: {}", e.body_text())))
    }
}

fn parse_json_object(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}
