use sea_orm::{ActiveValue::NotSet, EntityTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::OrmConn,
    entity::{AuditLogs, audit_logs},
    error::AppResult,
};

/// Writes that leave a trail in `audit_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Checkout,
    OrderStatusUpdate,
    OrderItemStatusUpdate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Checkout => "checkout",
            AuditAction::OrderStatusUpdate => "order_status_update",
            AuditAction::OrderItemStatusUpdate => "order_item_status_update",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::Checkout | AuditAction::OrderStatusUpdate => "orders",
            AuditAction::OrderItemStatusUpdate => "order_items",
        }
    }
}

/// Row for `audit_logs`; `created_at` is left to the column default.
pub fn entry(
    id: Uuid,
    user_id: Uuid,
    action: AuditAction,
    metadata: Value,
) -> audit_logs::ActiveModel {
    audit_logs::ActiveModel {
        id: Set(id),
        user_id: Set(Some(user_id)),
        action: Set(action.as_str().to_string()),
        resource: Set(Some(action.resource().to_string())),
        metadata: Set(Some(metadata)),
        created_at: NotSet,
    }
}

pub async fn insert_entry(
    conn: &OrmConn,
    user_id: Uuid,
    action: AuditAction,
    metadata: Value,
) -> AppResult<Uuid> {
    let id = Uuid::new_v4();
    AuditLogs::insert(entry(id, user_id, action, metadata))
        .exec_without_returning(conn)
        .await?;
    Ok(id)
}

/// Best effort: a failed audit write is logged and never fails the caller.
pub async fn record(conn: &OrmConn, user_id: Uuid, action: AuditAction, metadata: Value) {
    match insert_entry(conn, user_id, action, metadata).await {
        Ok(id) => tracing::debug!(%id, action = action.as_str(), "audit entry written"),
        Err(err) => tracing::warn!(error = %err, action = action.as_str(), "audit log failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_updates_are_filed_under_their_table() {
        assert_eq!(AuditAction::Checkout.resource(), "orders");
        assert_eq!(AuditAction::OrderStatusUpdate.resource(), "orders");
        assert_eq!(AuditAction::OrderItemStatusUpdate.resource(), "order_items");
        assert_eq!(AuditAction::OrderItemStatusUpdate.as_str(), "order_item_status_update");
    }

    #[test]
    fn entry_fills_action_resource_and_metadata() {
        let (id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        let metadata = serde_json::json!({ "order_id": Uuid::nil(), "status": "Shipped" });
        let model = entry(id, user_id, AuditAction::OrderItemStatusUpdate, metadata.clone());

        assert_eq!(model.id, Set(id));
        assert_eq!(model.user_id, Set(Some(user_id)));
        assert_eq!(model.action, Set("order_item_status_update".to_string()));
        assert_eq!(model.resource, Set(Some("order_items".to_string())));
        assert_eq!(model.metadata, Set(Some(metadata)));
        assert_eq!(model.created_at, NotSet);
    }
}
