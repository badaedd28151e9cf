use crate::error::Result;
use crate::middleware::request_meta::RequestMeta;
use crate::models::audit_log::AuditLog;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// One audited change, together with the client it came from.
pub struct AuditEntry<'a> {
    pub user_id: Option<Uuid>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Uuid,
    pub changes: Option<JsonValue>,
}

#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(&self, meta: &RequestMeta, entry: AuditEntry<'_>) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, changes, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, action, entity_type, entity_id, changes, ip_address, user_agent, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.changes)
        .bind(meta.ip_address)
        .bind(meta.user_agent.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Like `log`, but a failed write is only reported as a warning.
    pub async fn record(&self, meta: &RequestMeta, entry: AuditEntry<'_>) {
        let (action, entity_id) = (entry.action.to_string(), entry.entity_id);
        if let Err(e) = self.log(meta, entry).await {
            tracing::warn!(error = ?e, %action, %entity_id, "Failed to write audit log");
        }
    }

    pub async fn list_for_entity(&self, entity_type: &str, entity_id: Uuid) -> Result<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, changes, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
