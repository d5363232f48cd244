/// Chore assignment model and repository operations
///
/// An assignment binds one member to one chore on a calendar date and carries
/// a completion flag. Both references are checked when they are written; the
/// store's foreign keys back the check up if a referenced row disappears in
/// between.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE chore_assignments (
///     assignment_id INTEGER PRIMARY KEY AUTOINCREMENT,
///     member_id INTEGER NOT NULL REFERENCES members (member_id) ON DELETE RESTRICT,
///     chore_id INTEGER NOT NULL REFERENCES chores (chore_id) ON DELETE RESTRICT,
///     assigned_date DATE NOT NULL,
///     is_completed BOOLEAN NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1))
/// );
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, info};

use super::error::{is_foreign_key_violation, RepoError, RepoResult};
use super::fields::{FieldKind, FieldSet, FieldSpec};
use super::search_term;
use crate::db::pool::DbPool;

const COLUMNS: &str = "assignment_id, member_id, chore_id, assigned_date, is_completed";

/// A member's chore on a given date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assignment {
    pub assignment_id: i64,
    pub member_id: i64,
    pub chore_id: i64,

    /// Serialized as `YYYY-MM-DD`
    pub assigned_date: NaiveDate,

    /// Stored as 0/1
    pub is_completed: bool,
}

/// Input for creating an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAssignment {
    pub member_id: i64,
    pub chore_id: i64,
    pub assigned_date: NaiveDate,
    pub is_completed: bool,
}

impl CreateAssignment {
    /// Validates a request body into a create input
    ///
    /// `member_id`, `chore_id` and `assigned_date` are required;
    /// `is_completed` defaults to false.
    pub fn from_fields(input: &Map<String, Value>) -> RepoResult<Self> {
        let fields = FieldSet::parse(Assignment::FIELDS, input)?;
        fields.require(&["member_id", "chore_id", "assigned_date"])?;

        match (
            fields.integer("member_id"),
            fields.integer("chore_id"),
            fields.date("assigned_date"),
        ) {
            (Some(member_id), Some(chore_id), Some(assigned_date)) => Ok(Self {
                member_id,
                chore_id,
                assigned_date,
                is_completed: fields.boolean("is_completed").unwrap_or(false),
            }),
            _ => Err(RepoError::Validation("missing fields".to_string())),
        }
    }
}

/// Filter for [`Assignment::list`]; every set field narrows the result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentFilter {
    pub member_id: Option<i64>,
    pub chore_id: Option<i64>,

    /// Inclusive lower bound on `assigned_date`
    pub date_from: Option<NaiveDate>,

    /// Inclusive upper bound on `assigned_date`
    pub date_to: Option<NaiveDate>,

    pub completed: Option<bool>,

    /// Case-insensitive substring of the member name or the chore name
    pub search: Option<String>,
}

async fn member_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM members WHERE member_id = ?)")
        .bind(id)
        .fetch_one(conn)
        .await
}

async fn chore_exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM chores WHERE chore_id = ?)")
        .bind(id)
        .fetch_one(conn)
        .await
}

/// Checks whichever references are supplied, member first
async fn check_references(
    conn: &mut SqliteConnection,
    member_id: Option<i64>,
    chore_id: Option<i64>,
) -> RepoResult<()> {
    if let Some(id) = member_id {
        if !member_exists(&mut *conn, id).await? {
            return Err(RepoError::NotFound("member not found".to_string()));
        }
    }
    if let Some(id) = chore_id {
        if !chore_exists(&mut *conn, id).await? {
            return Err(RepoError::NotFound("chore not found".to_string()));
        }
    }
    Ok(())
}

fn map_write_error(e: sqlx::Error) -> RepoError {
    if is_foreign_key_violation(&e) {
        RepoError::NotFound("member or chore not found".to_string())
    } else {
        RepoError::Database(e)
    }
}

impl Assignment {
    /// Writable fields
    pub const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("member_id", "member_id", FieldKind::Integer),
        FieldSpec::new("chore_id", "chore_id", FieldKind::Integer),
        FieldSpec::new("assigned_date", "assigned_date", FieldKind::Date),
        FieldSpec::new("is_completed", "is_completed", FieldKind::Boolean),
    ];

    /// Lists assignments matching `filter`, ordered by date then id
    pub async fn list(pool: &DbPool, filter: &AssignmentFilter) -> RepoResult<Vec<Self>> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM chore_assignments WHERE 1 = 1", COLUMNS));

        if let Some(member_id) = filter.member_id {
            query.push(" AND member_id = ").push_bind(member_id);
        }
        if let Some(chore_id) = filter.chore_id {
            query.push(" AND chore_id = ").push_bind(chore_id);
        }
        if let Some(from) = filter.date_from {
            query.push(" AND assigned_date >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            query.push(" AND assigned_date <= ").push_bind(to);
        }
        if let Some(completed) = filter.completed {
            query.push(" AND is_completed = ").push_bind(completed);
        }
        if let Some(pattern) = search_term(filter.search.as_deref()) {
            query
                .push(" AND (member_id IN (SELECT member_id FROM members WHERE LOWER(name) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\') OR chore_id IN (SELECT chore_id FROM chores WHERE LOWER(chore_name) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\'))");
        }
        query.push(" ORDER BY assigned_date, assignment_id");

        let assignments = query.build_query_as::<Assignment>().fetch_all(pool).await?;
        Ok(assignments)
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {} FROM chore_assignments WHERE assignment_id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fetches an assignment or fails with `NotFound`
    pub async fn get(pool: &DbPool, id: i64) -> RepoResult<Self> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| RepoError::NotFound("assignment not found".to_string()))
    }

    /// Inserts an assignment after checking both references
    ///
    /// Fails with `NotFound` ("member not found" / "chore not found") without
    /// inserting anything when a reference does not resolve.
    pub async fn create(pool: &DbPool, data: CreateAssignment) -> RepoResult<Self> {
        let mut conn = pool.acquire().await?;

        check_references(&mut conn, Some(data.member_id), Some(data.chore_id)).await?;

        let assignment = sqlx::query_as::<_, Assignment>(&format!(
            r#"
            INSERT INTO chore_assignments (member_id, chore_id, assigned_date, is_completed)
            VALUES (?, ?, ?, ?)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(data.member_id)
        .bind(data.chore_id)
        .bind(data.assigned_date)
        .bind(data.is_completed)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_write_error)?;

        info!(
            assignment_id = assignment.assignment_id,
            member_id = assignment.member_id,
            chore_id = assignment.chore_id,
            "Assignment created"
        );
        Ok(assignment)
    }

    /// Applies the supplied subset of `input` to an assignment
    ///
    /// Fields that are not supplied keep their values. Supplied references
    /// are checked like on create; a supplied date is re-validated.
    pub async fn update(pool: &DbPool, id: i64, input: &Map<String, Value>) -> RepoResult<Self> {
        let fields = FieldSet::parse(Self::FIELDS, input)?;
        if fields.is_empty() {
            debug!(assignment_id = id, "Empty assignment update");
            return Self::get(pool, id).await;
        }

        let mut conn = pool.acquire().await?;

        check_references(&mut conn, fields.integer("member_id"), fields.integer("chore_id")).await?;

        let changed = fields.names();
        let mut query = fields.into_update_query("chore_assignments", "assignment_id", id, COLUMNS);
        let updated = query
            .build_query_as::<Assignment>()
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| RepoError::NotFound("assignment not found".to_string()))?;

        info!(assignment_id = id, fields = ?changed, "Assignment updated");
        Ok(updated)
    }

    /// Deletes an assignment
    pub async fn delete(pool: &DbPool, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM chore_assignments WHERE assignment_id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound("assignment not found".to_string()));
        }

        info!(assignment_id = id, "Assignment deleted");
        Ok(())
    }

    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chore_assignments")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
