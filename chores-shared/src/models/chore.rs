/// Chore model and repository operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE chores (
///     chore_id INTEGER PRIMARY KEY AUTOINCREMENT,
///     chore_name TEXT NOT NULL UNIQUE,
///     frequency TEXT NOT NULL
/// );
/// ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::error::{is_foreign_key_violation, is_unique_violation, RepoError, RepoResult};
use super::fields::{FieldKind, FieldSet, FieldSpec};
use super::search_term;
use crate::db::pool::DbPool;

const COLUMNS: &str = "chore_id, chore_name, frequency";

/// A recurring task with a free-text frequency label ("Daily", "Weekly", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chore {
    pub chore_id: i64,

    /// Unique across chores
    pub chore_name: String,

    pub frequency: String,
}

/// Input for creating a chore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChore {
    pub chore_name: String,
    pub frequency: String,
}

/// Filter for [`Chore::list`]
#[derive(Debug, Clone, Default)]
pub struct ChoreFilter {
    /// Case-insensitive substring of the chore name
    pub search: Option<String>,
}

impl ChoreFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
        }
    }
}

impl CreateChore {
    /// Validates a request body into a create input
    pub fn from_fields(input: &Map<String, Value>) -> RepoResult<Self> {
        let fields = FieldSet::parse(Chore::FIELDS, input)?;
        fields.require(&["chore_name", "frequency"])?;

        Ok(Self {
            chore_name: fields.text("chore_name").unwrap_or_default().to_string(),
            frequency: fields.text("frequency").unwrap_or_default().to_string(),
        })
    }
}

fn map_write_error(e: sqlx::Error) -> RepoError {
    if is_unique_violation(&e) {
        RepoError::Duplicate("chore already exists".to_string())
    } else {
        RepoError::Database(e)
    }
}

impl Chore {
    /// Writable fields
    pub const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("chore_name", "chore_name", FieldKind::Text),
        FieldSpec::new("frequency", "frequency", FieldKind::Text),
    ];

    /// Lists chores ordered by id
    ///
    /// A search that matches nothing yields an empty list.
    pub async fn list(pool: &DbPool, filter: &ChoreFilter) -> RepoResult<Vec<Self>> {
        let chores = match search_term(filter.search.as_deref()) {
            Some(pattern) => {
                sqlx::query_as::<_, Chore>(
                    r#"
                    SELECT chore_id, chore_name, frequency
                    FROM chores
                    WHERE LOWER(chore_name) LIKE ? ESCAPE '\'
                    ORDER BY chore_id
                    "#,
                )
                .bind(pattern)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Chore>(
                    "SELECT chore_id, chore_name, frequency FROM chores ORDER BY chore_id",
                )
                .fetch_all(pool)
                .await?
            }
        };

        Ok(chores)
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Chore>(
            "SELECT chore_id, chore_name, frequency FROM chores WHERE chore_id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fetches a chore or fails with `NotFound`
    pub async fn get(pool: &DbPool, id: i64) -> RepoResult<Self> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| RepoError::NotFound("chore not found".to_string()))
    }

    /// Inserts a chore; a taken name fails with `Duplicate`
    pub async fn create(pool: &DbPool, data: CreateChore) -> RepoResult<Self> {
        let chore_name = data.chore_name.trim();
        let frequency = data.frequency.trim();
        if chore_name.is_empty() || frequency.is_empty() {
            return Err(RepoError::Validation(
                "chore_name and frequency required".to_string(),
            ));
        }

        let chore = sqlx::query_as::<_, Chore>(
            r#"
            INSERT INTO chores (chore_name, frequency)
            VALUES (?, ?)
            RETURNING chore_id, chore_name, frequency
            "#,
        )
        .bind(chore_name)
        .bind(frequency)
        .fetch_one(pool)
        .await
        .map_err(map_write_error)?;

        info!(chore_id = chore.chore_id, "Chore created");
        Ok(chore)
    }

    /// Applies the supplied subset of `input` to a chore
    pub async fn update(pool: &DbPool, id: i64, input: &Map<String, Value>) -> RepoResult<Self> {
        let fields = FieldSet::parse(Self::FIELDS, input)?;
        if fields.is_empty() {
            debug!(chore_id = id, "Empty chore update");
            return Self::get(pool, id).await;
        }

        let mut query = fields.into_update_query("chores", "chore_id", id, COLUMNS);
        let updated = query
            .build_query_as::<Chore>()
            .fetch_optional(pool)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| RepoError::NotFound("chore not found".to_string()))?;

        info!(chore_id = id, "Chore updated");
        Ok(updated)
    }

    /// Deletes a chore
    ///
    /// Fails with `Conflict` while assignments still reference the chore.
    pub async fn delete(pool: &DbPool, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM chores WHERE chore_id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    RepoError::Conflict("chore has assignments".to_string())
                } else {
                    RepoError::Database(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound("chore not found".to_string()));
        }

        info!(chore_id = id, "Chore deleted");
        Ok(())
    }

    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chores")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
