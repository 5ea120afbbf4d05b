use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{Any, Executor, Row, Transaction, ValueRef};

use super::{format_timestamp, parse_timestamp, Database};
use crate::domain::entities::{Assignment, AssignmentState, LineItem, User};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{AssignmentRepository, AssignmentUnitOfWork};

const ASSIGNMENT_COLUMNS: &str = "id, user_id, line_item_id, state, attempts_count, updated_at";
const LINE_ITEM_COLUMNS: &str =
    "id, uri, slug, label, max_attempts, start_at, end_at, lti_instance_id";

fn assignment_from_row(row: &AnyRow) -> DomainResult<Assignment> {
    let state: String = row.try_get("state")?;
    let attempts_count: i64 = row.try_get("attempts_count")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Assignment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        line_item_id: row.try_get("line_item_id")?,
        state: state.parse::<AssignmentState>()?,
        attempts_count: u32::try_from(attempts_count).map_err(|_| {
            DomainError::Internal(format!("Invalid attempts count {}", attempts_count))
        })?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

// `Any` rows refuse to decode NULL into `Option<String>`.
fn nullable_text(row: &AnyRow, column: &str) -> DomainResult<Option<String>> {
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    Ok(Some(row.try_get(column)?))
}

fn line_item_from_row(row: &AnyRow) -> DomainResult<LineItem> {
    let max_attempts: i64 = row.try_get("max_attempts")?;
    let start_at = nullable_text(row, "start_at")?;
    let end_at = nullable_text(row, "end_at")?;

    Ok(LineItem {
        id: row.try_get("id")?,
        uri: row.try_get("uri")?,
        slug: row.try_get("slug")?,
        label: row.try_get("label")?,
        max_attempts: u32::try_from(max_attempts).map_err(|_| {
            DomainError::Internal(format!("Invalid max attempts {}", max_attempts))
        })?,
        start_at: start_at
            .map(|value| parse_timestamp("start_at", &value))
            .transpose()?,
        end_at: end_at
            .map(|value| parse_timestamp("end_at", &value))
            .transpose()?,
        lti_instance_id: row.try_get("lti_instance_id")?,
    })
}

fn user_from_row(row: &AnyRow) -> DomainResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        group_id: nullable_text(row, "group_id")?,
    })
}

async fn upsert_assignment<'e, E>(executor: E, assignment: &Assignment) -> DomainResult<()>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query(
        "INSERT INTO assignments (id, user_id, line_item_id, state, attempts_count, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             state = excluded.state,
             attempts_count = excluded.attempts_count,
             updated_at = excluded.updated_at",
    )
    .bind(&assignment.id)
    .bind(&assignment.user_id)
    .bind(&assignment.line_item_id)
    .bind(assignment.state.as_str())
    .bind(i64::from(assignment.attempts_count))
    .bind(format_timestamp(&assignment.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl AssignmentRepository for Database {
    async fn find_assignment(&self, id: &str) -> DomainResult<Option<Assignment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM assignments WHERE id = ?",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn find_line_item(&self, id: &str) -> DomainResult<Option<LineItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM line_items WHERE id = ?",
            LINE_ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(line_item_from_row).transpose()
    }

    async fn find_user(&self, id: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, group_id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn save_assignment(&self, assignment: &Assignment) -> DomainResult<()> {
        upsert_assignment(&self.pool, assignment).await?;
        tracing::debug!(
            "Assignment saved: id={}, state={}, attempts={}",
            assignment.id,
            assignment.state,
            assignment.attempts_count
        );
        Ok(())
    }

    async fn compare_and_save(
        &self,
        expected: &Assignment,
        assignment: &Assignment,
    ) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE assignments SET state = ?, attempts_count = ?, updated_at = ?
             WHERE id = ? AND state = ? AND attempts_count = ?",
        )
        .bind(assignment.state.as_str())
        .bind(i64::from(assignment.attempts_count))
        .bind(format_timestamp(&assignment.updated_at))
        .bind(&expected.id)
        .bind(expected.state.as_str())
        .bind(i64::from(expected.attempts_count))
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        if !applied {
            tracing::warn!(
                "Assignment {} changed concurrently, expected state={} attempts={}",
                expected.id,
                expected.state,
                expected.attempts_count
            );
        }
        Ok(applied)
    }

    async fn begin(&self) -> DomainResult<Box<dyn AssignmentUnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqlUnitOfWork { tx }))
    }
}

impl Database {
    pub async fn insert_user(&self, user: &User) -> DomainResult<()> {
        sqlx::query("INSERT INTO users (id, username, group_id) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.group_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("User created: id={}, username={}", user.id, user.username);
        Ok(())
    }

    pub async fn insert_line_item(&self, line_item: &LineItem) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO line_items
                 (id, uri, slug, label, max_attempts, start_at, end_at, lti_instance_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&line_item.id)
        .bind(&line_item.uri)
        .bind(&line_item.slug)
        .bind(&line_item.label)
        .bind(i64::from(line_item.max_attempts))
        .bind(line_item.start_at.as_ref().map(format_timestamp))
        .bind(line_item.end_at.as_ref().map(format_timestamp))
        .bind(&line_item.lti_instance_id)
        .execute(&self.pool)
        .await?;

        tracing::info!("Line item created: id={}, slug={}", line_item.id, line_item.slug);
        Ok(())
    }
}

/// Unit of work over one database transaction.
///
/// Dropping it without `commit` rolls the transaction back.
pub struct SqlUnitOfWork {
    tx: Transaction<'static, Any>,
}

#[async_trait]
impl AssignmentUnitOfWork for SqlUnitOfWork {
    async fn find_user_by_username(&mut self, username: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, group_id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_line_item_by_slug(&mut self, slug: &str) -> DomainResult<Option<LineItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM line_items WHERE slug = ?",
            LINE_ITEM_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(line_item_from_row).transpose()
    }

    async fn find_user_assignments(&mut self, user_id: &str) -> DomainResult<Vec<Assignment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM assignments WHERE user_id = ? ORDER BY updated_at, id",
            ASSIGNMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(assignment_from_row).collect()
    }

    async fn persist(&mut self, assignment: &Assignment) -> DomainResult<()> {
        upsert_assignment(&mut *self.tx, assignment).await
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
