/// Member model and repository operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE members (
///     member_id INTEGER PRIMARY KEY AUTOINCREMENT,
///     name TEXT NOT NULL UNIQUE
/// );
/// ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::error::{is_foreign_key_violation, is_unique_violation, RepoError, RepoResult};
use super::fields::{FieldKind, FieldSet, FieldSpec};
use super::search_term;
use crate::db::pool::DbPool;

const COLUMNS: &str = "member_id, name";

/// A household participant who can be assigned chores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub member_id: i64,

    /// Display name, unique across members
    pub name: String,
}

/// Input for creating a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMember {
    pub name: String,
}

/// Filter for [`Member::list`]
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    /// Case-insensitive substring of the name
    pub search: Option<String>,
}

impl MemberFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
        }
    }
}

impl CreateMember {
    /// Validates a request body into a create input
    pub fn from_fields(input: &Map<String, Value>) -> RepoResult<Self> {
        let fields = FieldSet::parse(Member::FIELDS, input)?;
        fields.require(&["name"])?;

        Ok(Self {
            name: fields.text("name").unwrap_or_default().to_string(),
        })
    }
}

impl Member {
    /// Writable fields
    pub const FIELDS: &'static [FieldSpec] = &[FieldSpec::new("name", "name", FieldKind::Text)];

    /// Lists members ordered by id
    pub async fn list(pool: &DbPool, filter: &MemberFilter) -> RepoResult<Vec<Self>> {
        let members = match search_term(filter.search.as_deref()) {
            Some(pattern) => {
                sqlx::query_as::<_, Member>(
                    "SELECT member_id, name FROM members WHERE LOWER(name) LIKE ? ESCAPE '\\' ORDER BY member_id",
                )
                .bind(pattern)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Member>("SELECT member_id, name FROM members ORDER BY member_id")
                    .fetch_all(pool)
                    .await?
            }
        };

        Ok(members)
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>("SELECT member_id, name FROM members WHERE member_id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetches a member or fails with `NotFound`
    pub async fn get(pool: &DbPool, id: i64) -> RepoResult<Self> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| RepoError::NotFound("member not found".to_string()))
    }

    /// Inserts a member
    ///
    /// A name that already exists fails with `Duplicate`; the unique index
    /// decides, so concurrent creates cannot both win.
    pub async fn create(pool: &DbPool, data: CreateMember) -> RepoResult<Self> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(RepoError::Validation("name required".to_string()));
        }

        let member = sqlx::query_as::<_, Member>(
            "INSERT INTO members (name) VALUES (?) RETURNING member_id, name",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Duplicate("member already exists".to_string())
            } else {
                RepoError::Database(e)
            }
        })?;

        info!(member_id = member.member_id, "Member created");
        Ok(member)
    }

    /// Applies the supplied subset of `input` to a member
    pub async fn update(pool: &DbPool, id: i64, input: &Map<String, Value>) -> RepoResult<Self> {
        let fields = FieldSet::parse(Self::FIELDS, input)?;
        if fields.is_empty() {
            debug!(member_id = id, "Empty member update");
            return Self::get(pool, id).await;
        }

        let mut query = fields.into_update_query("members", "member_id", id, COLUMNS);
        let updated = query
            .build_query_as::<Member>()
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepoError::Duplicate("member already exists".to_string())
                } else {
                    RepoError::Database(e)
                }
            })?
            .ok_or_else(|| RepoError::NotFound("member not found".to_string()))?;

        info!(member_id = id, "Member updated");
        Ok(updated)
    }

    /// Deletes a member
    ///
    /// Fails with `Conflict` while assignments still reference the member.
    pub async fn delete(pool: &DbPool, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM members WHERE member_id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    RepoError::Conflict("member has chore assignments".to_string())
                } else {
                    RepoError::Database(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound("member not found".to_string()));
        }

        info!(member_id = id, "Member deleted");
        Ok(())
    }

    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
