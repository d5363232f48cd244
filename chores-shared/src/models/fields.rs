/// Field specs and the partial-update builder
///
/// Each entity declares its writable fields once as a table of [`FieldSpec`]s
/// (request field name, column name, value kind). Request bodies are parsed
/// against that table into a [`FieldSet`], which is used both to validate
/// create requests and to emit a single parameterized `UPDATE` containing
/// only the supplied columns.
///
/// Column and table names only ever come from `'static` specs; request data
/// is always bound as a parameter.
///
/// # Example
///
/// ```
/// use chores_shared::models::fields::{FieldKind, FieldSet, FieldSpec};
/// use serde_json::json;
///
/// const SPECS: &[FieldSpec] = &[
///     FieldSpec::new("assigned_date", "assigned_date", FieldKind::Date),
///     FieldSpec::new("is_completed", "is_completed", FieldKind::Boolean),
/// ];
///
/// let body = json!({ "is_completed": true, "unrelated": 1 });
/// let fields = FieldSet::parse(SPECS, body.as_object().unwrap()).unwrap();
///
/// assert_eq!(fields.names(), vec!["is_completed"]);
/// ```

use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};

use super::error::{RepoError, RepoResult};

/// Value kind of a writable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-blank text, trimmed
    Text,

    /// 64-bit integer, from a JSON number or a numeric string
    Integer,

    /// Calendar date in `YYYY-MM-DD` form
    Date,

    /// Boolean, stored as 0/1
    Boolean,
}

/// Maps a request field onto a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name in request bodies
    pub field: &'static str,

    /// Column name in the table
    pub column: &'static str,

    /// How to parse and validate the value
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(field: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { field, column, kind }
    }
}

/// A validated field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    Boolean(bool),
}

impl FieldKind {
    /// Parses and validates a raw request value for `field`
    pub fn parse(self, field: &str, value: &Value) -> RepoResult<FieldValue> {
        match self {
            FieldKind::Text => match value {
                Value::String(s) if !s.trim().is_empty() => Ok(FieldValue::Text(s.trim().to_string())),
                Value::String(_) => Err(invalid(format!("{} must not be blank", field))),
                _ => Err(invalid(format!("{} must be a string", field))),
            },
            FieldKind::Integer => {
                let parsed = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                parsed
                    .map(FieldValue::Integer)
                    .ok_or_else(|| invalid(format!("{} must be an integer", field)))
            }
            FieldKind::Date => match value {
                Value::String(s) => parse_date(field, s).map(FieldValue::Date),
                _ => Err(invalid(format!("{} must be a date in YYYY-MM-DD format", field))),
            },
            FieldKind::Boolean => {
                let parsed = match value {
                    Value::Bool(b) => Some(*b),
                    Value::Number(n) => match n.as_i64() {
                        Some(0) => Some(false),
                        Some(1) => Some(true),
                        _ => None,
                    },
                    Value::String(s) => parse_bool(s),
                    _ => None,
                };
                parsed
                    .map(FieldValue::Boolean)
                    .ok_or_else(|| invalid(format!("{} must be a boolean", field)))
            }
        }
    }
}

fn invalid(message: String) -> RepoError {
    RepoError::Validation(message)
}

/// Parses a strict `YYYY-MM-DD` calendar date
pub fn parse_date(field: &str, raw: &str) -> RepoResult<NaiveDate> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    let well_formed = bytes.len() == 10 && bytes[4] == b'-' && bytes[7] == b'-';

    well_formed
        .then(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .flatten()
        .ok_or_else(|| invalid(format!("{} must be a date in YYYY-MM-DD format", field)))
}

/// Parses the textual boolean spellings accepted from query strings and forms
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// The recognized, validated subset of a request body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    values: Vec<(FieldSpec, FieldValue)>,
}

impl FieldSet {
    /// Parses `input` against `specs`
    ///
    /// Keys without a spec are ignored. The first invalid value fails the
    /// whole set.
    pub fn parse(specs: &[FieldSpec], input: &Map<String, Value>) -> RepoResult<Self> {
        let mut values = Vec::new();

        for spec in specs {
            if let Some(raw) = input.get(spec.field) {
                if raw.is_null() {
                    return Err(invalid(format!("{} must not be null", spec.field)));
                }
                values.push((*spec, spec.kind.parse(spec.field, raw)?));
            }
        }

        Ok(Self { values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Request field names present in the set, in spec order
    pub fn names(&self) -> Vec<&'static str> {
        self.values.iter().map(|(spec, _)| spec.field).collect()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(spec, _)| spec.field == field)
            .map(|(_, value)| value)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.get(field) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.get(field) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        match self.get(field) {
            Some(FieldValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Fails with a validation error naming every listed field that is absent
    pub fn require(&self, fields: &[&str]) -> RepoResult<()> {
        let missing: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|field| self.get(field).is_none())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(invalid(format!("{} required", missing.join(", "))))
        }
    }

    /// Builds `UPDATE <table> SET c = ?, ... WHERE <key> = ? RETURNING <returning>`
    ///
    /// Must not be called on an empty set; callers short-circuit empty updates.
    pub fn into_update_query<'args>(
        self,
        table: &str,
        key_column: &str,
        id: i64,
        returning: &str,
    ) -> QueryBuilder<'args, Sqlite> {
        debug_assert!(!self.values.is_empty(), "empty partial update");

        let mut query = QueryBuilder::new(format!("UPDATE {} SET ", table));

        for (index, (spec, value)) in self.values.into_iter().enumerate() {
            if index > 0 {
                query.push(", ");
            }
            query.push(spec.column).push(" = ");
            match value {
                FieldValue::Text(v) => query.push_bind(v),
                FieldValue::Integer(v) => query.push_bind(v),
                FieldValue::Date(v) => query.push_bind(v),
                FieldValue::Boolean(v) => query.push_bind(v),
            };
        }

        query
            .push(" WHERE ")
            .push(key_column)
            .push(" = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(returning);

        query
    }
}
