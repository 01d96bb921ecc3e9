//! Audit trail repository.
//!
//! Append-only entries recording every mutation, written inside the
//! mutation's transaction.

use agora_core::entities::AuditEntry;
use agora_core::enums::{AuditAction, EntityType};
use agora_core::ids::PREFIX_AUDIT;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::AgoraService;

/// Filter criteria for audit queries.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

const SELECT_COLS: &str = "id, entity_type, entity_id, action, detail, created_at";

fn row_to_audit(row: &libsql::Row) -> Result<AuditEntry, DatabaseError> {
    Ok(AuditEntry {
        id: row.get::<String>(0)?,
        entity_type: parse_enum(&row.get::<String>(1)?)?,
        entity_id: row.get::<String>(2)?,
        action: parse_enum(&row.get::<String>(3)?)?,
        detail: parse_optional_json(get_opt_string(row, 4)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl AgoraService {
    /// Append an audit entry on `conn` (normally the open transaction).
    pub(crate) async fn append_audit(
        &self,
        conn: &libsql::Connection,
        entity_type: EntityType,
        entity_id: &str,
        action: AuditAction,
        detail: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry, DatabaseError> {
        let entry = AuditEntry {
            id: self.db().generate_id(PREFIX_AUDIT).await?,
            entity_type,
            entity_id: entity_id.to_string(),
            action,
            detail,
            created_at: at,
        };
        conn.execute(
            &format!("INSERT INTO audit_trail ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            libsql::params![
                entry.id.as_str(),
                entry.entity_type.as_str(),
                entry.entity_id.as_str(),
                entry.action.as_str(),
                entry.detail.as_ref().map(ToString::to_string),
                format_datetime(entry.created_at)
            ],
        )
        .await?;
        Ok(entry)
    }

    /// Query audit entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError> {
        let _gate = self.read_gate().await;
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(et) = filter.entity_type {
            params.push(libsql::Value::Text(et.as_str().to_string()));
            conditions.push(format!("entity_type = ?{}", params.len()));
        }
        if let Some(ref eid) = filter.entity_id {
            params.push(libsql::Value::Text(eid.clone()));
            conditions.push(format!("entity_id = ?{}", params.len()));
        }
        if let Some(action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM audit_trail {where_clause}
             ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_audit(&row)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use crate::repos::audit::AuditFilter;
    use crate::test_support::helpers::{seed_instance, test_service, voter};
    use agora_core::enums::{AuditAction, EntityType};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn mutations_leave_audit_entries() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        let bob = voter(&svc, "bob", &city.id).await;
        let d = svc
            .create_delegation(&alice.id, &bob.id, &city.id)
            .await
            .unwrap();

        let entries = svc
            .query_audit(&AuditFilter {
                entity_id: Some(d.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, EntityType::Delegation);
        assert_eq!(entries[0].action, AuditAction::Created);
        assert_eq!(entries[0].detail.as_ref().unwrap()["agent_id"], bob.id.as_str());
    }

    #[tokio::test]
    async fn filter_by_type_and_action() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        voter(&svc, "alice", &city.id).await;
        voter(&svc, "bob", &city.id).await;

        let users = svc
            .query_audit(&AuditFilter {
                entity_type: Some(EntityType::User),
                action: Some(AuditAction::Created),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(users.len(), 2);

        let limited = svc
            .query_audit(&AuditFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }
}
