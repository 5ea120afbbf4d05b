use async_trait::async_trait;
use sqlx::Row;

use super::Database;
use crate::domain::entities::LtiInstance;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::LtiInstanceRepository;

#[async_trait]
impl LtiInstanceRepository for Database {
    async fn list_instances(&self) -> DomainResult<Vec<LtiInstance>> {
        let rows = sqlx::query(
            "SELECT id, label, link, lti_key, lti_secret, position
             FROM lti_instances
             ORDER BY position, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut instances = Vec::with_capacity(rows.len());
        for row in rows {
            instances.push(LtiInstance {
                id: row.try_get("id")?,
                label: row.try_get("label")?,
                link: row.try_get("link")?,
                key: row.try_get("lti_key")?,
                secret: row.try_get("lti_secret")?,
                position: row.try_get("position")?,
            });
        }

        Ok(instances)
    }

    async fn create_instance(&self, instance: &LtiInstance) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO lti_instances (id, label, link, lti_key, lti_secret, position)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&instance.id)
        .bind(&instance.label)
        .bind(&instance.link)
        .bind(&instance.key)
        .bind(&instance.secret)
        .bind(instance.position)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "LTI instance created: id={}, label={}",
            instance.id,
            instance.label
        );
        Ok(())
    }

    async fn delete_instance(&self, id: &str) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM lti_instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!(
                "LTI instance with id '{}' not found",
                id
            )));
        }

        tracing::info!("LTI instance deleted: id={}", id);
        Ok(())
    }
}
