use serde_json::Value;
use uuid::Uuid;

use crate::{error::AppResult, remote::{AuditEntry, RemoteStore}};

pub async fn log_audit(
    store: &dyn RemoteStore,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    store
        .record_audit(AuditEntry {
            user_id,
            action: action.to_string(),
            resource: resource.map(str::to_string),
            metadata,
        })
        .await?;

    Ok(())
}
