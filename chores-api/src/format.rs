/// Response formatting: JSON by default, XML on request
///
/// The format is negotiated per request by the [`ResponseFormat`] extractor:
///
/// 1. `?format=xml` or `?format=json` wins when present
/// 2. otherwise an `Accept` header naming `application/xml` or `text/xml`
///    selects XML
/// 3. otherwise JSON
///
/// Handlers wrap their result in a [`Payload`] (one record or a named
/// collection) and return it as [`Formatted`].
///
/// # XML shape
///
/// ```text
/// <?xml version="1.0" encoding="UTF-8"?>
/// <members>
///   <item><member_id>1</member_id><name>Bob</name></item>
/// </members>
/// ```
///
/// A single record is rendered as a one-item list under the record's root
/// name. Scalars are stringified (booleans as `true`/`false`, dates as
/// ISO-8601) and `null` becomes an empty element.

use std::collections::BTreeMap;
use std::io::Cursor;

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Element wrapping each record in XML output
const ITEM: &str = "item";

/// Negotiated response encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

#[derive(Debug, Deserialize)]
struct FormatParams {
    format: Option<String>,
}

impl ResponseFormat {
    /// Picks the format from the `format` query value and the `Accept` header
    pub fn negotiate(format: Option<&str>, accept: Option<&str>) -> ApiResult<Self> {
        if let Some(requested) = format.map(str::trim).filter(|f| !f.is_empty()) {
            return match requested.to_ascii_lowercase().as_str() {
                "json" => Ok(ResponseFormat::Json),
                "xml" => Ok(ResponseFormat::Xml),
                _ => Err(ApiError::BadRequest(
                    "format must be json or xml".to_string(),
                )),
            };
        }

        let wants_xml = accept
            .map(|accept| {
                let accept = accept.to_ascii_lowercase();
                accept.contains("application/xml") || accept.contains("text/xml")
            })
            .unwrap_or(false);

        Ok(if wants_xml {
            ResponseFormat::Xml
        } else {
            ResponseFormat::Json
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<FormatParams>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::BadRequest(format!("Invalid query string: {}", e)))?;

        let accept = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());

        ResponseFormat::negotiate(params.format.as_deref(), accept)
    }
}

/// Error type for XML encoding and decoding
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Document does not have the root/item/field shape
    #[error("Unexpected XML structure: {0}")]
    Structure(String),
}

/// A response body before encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// One record; JSON renders it as-is
    Record { root: &'static str, value: Value },

    /// Named list of records; JSON renders `{name: [...]}`
    Collection { name: &'static str, items: Vec<Value> },
}

impl Payload {
    pub fn record<T: Serialize>(root: &'static str, value: &T) -> ApiResult<Self> {
        Ok(Payload::Record {
            root,
            value: to_value(value)?,
        })
    }

    pub fn collection<T: Serialize>(name: &'static str, items: &[T]) -> ApiResult<Self> {
        let items = items.iter().map(to_value).collect::<ApiResult<Vec<_>>>()?;
        Ok(Payload::Collection { name, items })
    }

    pub fn to_json(&self) -> Value {
        match self {
            Payload::Record { value, .. } => value.clone(),
            Payload::Collection { name, items } => {
                let mut body = Map::new();
                body.insert(name.to_string(), Value::Array(items.clone()));
                Value::Object(body)
            }
        }
    }

    pub fn to_xml(&self) -> Result<String, FormatError> {
        let (root, items) = match self {
            Payload::Record { root, value } => (*root, std::slice::from_ref(value)),
            Payload::Collection { name, items } => (*name, items.as_slice()),
        };

        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new(root)))?;

        for item in items {
            writer.write_event(Event::Start(BytesStart::new(ITEM)))?;
            match item {
                Value::Object(fields) => {
                    for (field, value) in fields {
                        write_field(&mut writer, field, value)?;
                    }
                }
                other => {
                    if let Some(text) = scalar_text(other) {
                        writer.write_event(Event::Text(BytesText::new(&text)))?;
                    }
                }
            }
            writer.write_event(Event::End(BytesEnd::new(ITEM)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(root)))?;

        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }
}

fn to_value<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))
}

/// Textual form of a field value; `None` for null
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

fn write_field(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    field: &str,
    value: &Value,
) -> Result<(), FormatError> {
    match scalar_text(value) {
        Some(text) => {
            writer.write_event(Event::Start(BytesStart::new(field)))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(field)))?;
        }
        None => writer.write_event(Event::Empty(BytesStart::new(field)))?,
    }
    Ok(())
}

/// Decodes the XML produced by [`Payload::to_xml`]
///
/// Returns the root element name and, per item, its fields as strings.
pub fn parse_xml_items(xml: &str) -> Result<(String, Vec<BTreeMap<String, String>>), FormatError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut root: Option<String> = None;
    let mut items = Vec::new();
    let mut current: Option<BTreeMap<String, String>> = None;
    let mut field: Option<String> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                depth += 1;
                match depth {
                    1 => root = Some(name),
                    2 => current = Some(BTreeMap::new()),
                    3 => {
                        if let Some(fields) = current.as_mut() {
                            fields.insert(name.clone(), String::new());
                        }
                        field = Some(name);
                    }
                    _ => {
                        return Err(FormatError::Structure(format!(
                            "element <{}> nested too deeply",
                            name
                        )))
                    }
                }
            }
            Event::Empty(element) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                match depth {
                    0 => root = Some(name),
                    1 => items.push(BTreeMap::new()),
                    2 => {
                        if let Some(fields) = current.as_mut() {
                            fields.insert(name, String::new());
                        }
                    }
                    _ => {
                        return Err(FormatError::Structure(format!(
                            "element <{}> nested too deeply",
                            name
                        )))
                    }
                }
            }
            Event::Text(text) => {
                if let (Some(name), Some(fields)) = (field.as_ref(), current.as_mut()) {
                    fields.insert(name.clone(), text.unescape()?.into_owned());
                }
            }
            Event::End(_) => {
                match depth {
                    3 => field = None,
                    2 => {
                        if let Some(fields) = current.take() {
                            items.push(fields);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let root = root.ok_or_else(|| FormatError::Structure("missing root element".to_string()))?;
    Ok((root, items))
}

/// An encoded response: status, negotiated format and payload
#[derive(Debug)]
pub struct Formatted {
    status: StatusCode,
    format: ResponseFormat,
    payload: Payload,
}

impl Formatted {
    /// 200 OK
    pub fn ok(format: ResponseFormat, payload: Payload) -> Self {
        Self {
            status: StatusCode::OK,
            format,
            payload,
        }
    }

    /// 201 Created
    pub fn created(format: ResponseFormat, payload: Payload) -> Self {
        Self {
            status: StatusCode::CREATED,
            format,
            payload,
        }
    }
}

impl IntoResponse for Formatted {
    fn into_response(self) -> Response {
        match self.format {
            ResponseFormat::Json => (self.status, Json(self.payload.to_json())).into_response(),
            ResponseFormat::Xml => match self.payload.to_xml() {
                Ok(body) => {
                    (self.status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
                }
                Err(e) => ApiError::InternalError(format!("XML rendering failed: {}", e))
                    .into_response(),
            },
        }
    }
}
