use std::{
    collections::HashSet,
    fmt,
    future::Future,
    str::FromStr,
    sync::{Mutex, PoisonError},
};

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    cart::{CartLine, count_items},
    payment::PaymentMethod,
    pricing::PricingResult,
};
use crate::error::{AppError, AppResult};

/// Status written on every new order header and item.
pub const INITIAL_STATUS: &str = "Pending";
/// Status written on a header by the `MarkOrphan` compensation.
pub const ORPHANED_STATUS: &str = "Orphaned";

/// Lifecycle of one checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    Submitting,
    OrderCreated,
    ItemsWritten,
    ItemsWriteFailed,
    Completed,
}

impl CheckoutState {
    fn can_transition_to(self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Submitting, Idle)
                | (Submitting, OrderCreated)
                | (OrderCreated, ItemsWritten)
                | (OrderCreated, ItemsWriteFailed)
                | (ItemsWritten, Completed)
        )
    }
}

/// What to do when the header insert succeeded but the item batch failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FanoutFailurePolicy {
    /// Keep the header with no items, report the failure and carry on.
    #[default]
    Continue,
    /// Flag the header as orphaned and fail the attempt.
    MarkOrphan,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fanout failure policy {0:?}, expected \"continue\" or \"mark_orphan\"")]
pub struct UnknownFanoutPolicy(pub String);

impl FromStr for FanoutFailurePolicy {
    type Err = UnknownFanoutPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FanoutFailurePolicy::Continue),
            "mark_orphan" => Ok(FanoutFailurePolicy::MarkOrphan),
            _ => Err(UnknownFanoutPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub total_amount: i64,
    pub item_count: i32,
    pub summary_title: String,
    pub summary_image: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub shipping_fee: i64,
    pub buyer_name: String,
    pub buyer_address: String,
    pub payment_method: PaymentMethod,
    pub status: String,
}

/// Write side of order persistence. The header and the item batch are two
/// separate writes with no shared transaction.
pub trait OrderStore: Send + Sync {
    fn insert_order(&self, order: NewOrder) -> impl Future<Output = AppResult<()>> + Send;

    fn insert_items(&self, items: Vec<NewOrderItem>) -> impl Future<Output = AppResult<()>> + Send;

    fn mark_orphaned(&self, order_id: Uuid) -> impl Future<Output = AppResult<()>> + Send;
}

/// In-flight checkout flags, one per buyer session. Advisory only: it does not
/// stop a retried request from creating a second order.
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    in_flight: Mutex<HashSet<Uuid>>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another submission for the buyer is running.
    pub fn try_begin(&self, buyer_id: Uuid) -> Option<SubmissionTicket<'_>> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(buyer_id);
        if !inserted {
            return None;
        }
        Some(SubmissionTicket {
            guard: self,
            buyer_id,
        })
    }

    pub fn is_in_flight(&self, buyer_id: Uuid) -> bool {
        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.contains(&buyer_id)
    }
}

/// Clears the buyer's in-flight flag when dropped.
pub struct SubmissionTicket<'a> {
    guard: &'a SubmissionGuard,
    buyer_id: Uuid,
}

impl fmt::Debug for SubmissionTicket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionTicket")
            .field("buyer_id", &self.buyer_id)
            .finish()
    }
}

impl Drop for SubmissionTicket<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .guard
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight.remove(&self.buyer_id);
    }
}

/// State of one attempt; every transition is logged.
#[derive(Debug)]
pub struct CheckoutAttempt {
    buyer_id: Uuid,
    state: CheckoutState,
    history: Vec<CheckoutState>,
}

impl CheckoutAttempt {
    pub fn new(buyer_id: Uuid) -> Self {
        Self {
            buyer_id,
            state: CheckoutState::Idle,
            history: vec![CheckoutState::Idle],
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn history(&self) -> &[CheckoutState] {
        &self.history
    }

    pub fn advance(&mut self, next: CheckoutState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal checkout transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(buyer_id = %self.buyer_id, from = ?self.state, to = ?next, "checkout transition");
        self.state = next;
        self.history.push(next);
    }
}

#[derive(Debug, Clone)]
pub struct FanoutRequest<'a> {
    pub buyer_id: Uuid,
    pub buyer_name: &'a str,
    pub buyer_address: &'a str,
    pub payment_method: PaymentMethod,
    pub lines: &'a [CartLine],
    pub pricing: PricingResult,
}

#[derive(Debug)]
pub struct WrittenOrder {
    pub order_id: Uuid,
    pub total_amount: i64,
    pub item_count: i32,
    pub items_written: usize,
    /// Lines without a seller: counted in the header, never written as items.
    pub lines_without_seller: usize,
    /// Set when the item batch failed under `FanoutFailurePolicy::Continue`.
    pub fanout_error: Option<AppError>,
}

/// Writes one order header and its per-seller item rows.
pub struct OrderFanoutWriter<'a, S> {
    store: &'a S,
    policy: FanoutFailurePolicy,
}

impl<'a, S: OrderStore> OrderFanoutWriter<'a, S> {
    pub fn new(store: &'a S, policy: FanoutFailurePolicy) -> Self {
        Self { store, policy }
    }

    /// Expects the attempt in `Submitting`. Leaves it in `Idle` when the header
    /// insert fails, otherwise in `ItemsWritten` or `ItemsWriteFailed`.
    pub async fn write(
        &self,
        attempt: &mut CheckoutAttempt,
        request: &FanoutRequest<'_>,
    ) -> AppResult<WrittenOrder> {
        let Some(first) = request.lines.first() else {
            attempt.advance(CheckoutState::Idle);
            return Err(AppError::Validation("cart is empty".into()));
        };

        let order_id = Uuid::new_v4();
        let item_count = count_items(request.lines);
        let header = NewOrder {
            id: order_id,
            buyer_id: request.buyer_id,
            total_amount: request.pricing.total,
            item_count,
            summary_title: first.title.clone(),
            summary_image: first.image_ref.clone(),
            payment_method: request.payment_method,
            status: INITIAL_STATUS.to_string(),
        };

        if let Err(err) = self.store.insert_order(header).await {
            tracing::warn!(buyer_id = %request.buyer_id, error = ?err, "order header insert failed");
            attempt.advance(CheckoutState::Idle);
            return Err(AppError::HeaderPersist(Box::new(err)));
        }
        attempt.advance(CheckoutState::OrderCreated);
        tracing::info!(%order_id, total = request.pricing.total, item_count, "order header created");

        let items = fan_out(order_id, request);
        let items_written = items.len();
        let lines_without_seller = request.lines.len() - items_written;
        if lines_without_seller > 0 {
            tracing::warn!(%order_id, lines_without_seller, "cart lines without a seller were not written as order items");
        }

        let insert_result = if items.is_empty() {
            Ok(())
        } else {
            self.store.insert_items(items).await
        };

        let fanout_error = match insert_result {
            Ok(()) => {
                attempt.advance(CheckoutState::ItemsWritten);
                None
            }
            Err(err) => {
                attempt.advance(CheckoutState::ItemsWriteFailed);
                tracing::error!(%order_id, error = ?err, policy = ?self.policy, "order item fan-out failed, header has no items");
                match self.policy {
                    FanoutFailurePolicy::Continue => Some(err),
                    FanoutFailurePolicy::MarkOrphan => {
                        if let Err(mark_err) = self.store.mark_orphaned(order_id).await {
                            tracing::error!(%order_id, error = ?mark_err, "could not flag orphaned order header");
                        }
                        return Err(AppError::FanoutPersist {
                            order_id,
                            source: Box::new(err),
                        });
                    }
                }
            }
        };

        Ok(WrittenOrder {
            order_id,
            total_amount: request.pricing.total,
            item_count,
            items_written: if fanout_error.is_some() { 0 } else { items_written },
            lines_without_seller,
            fanout_error,
        })
    }
}

fn fan_out(order_id: Uuid, request: &FanoutRequest<'_>) -> Vec<NewOrderItem> {
    request
        .lines
        .iter()
        .filter_map(|line| {
            let seller_id = line.seller_id?;
            Some(NewOrderItem {
                order_id,
                seller_id,
                product_id: line.product_id,
                title: line.title.clone(),
                image: line.image_ref.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                shipping_fee: 0,
                buyer_name: request.buyer_name.to_string(),
                buyer_address: request.buyer_address.to_string(),
                payment_method: request.payment_method,
                status: INITIAL_STATUS.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_second_submission_until_ticket_drops() {
        let guard = SubmissionGuard::new();
        let buyer = Uuid::new_v4();

        let ticket = guard.try_begin(buyer);
        assert!(ticket.is_some());
        assert!(guard.try_begin(buyer).is_none());
        assert!(guard.try_begin(Uuid::new_v4()).is_some());

        drop(ticket);
        assert!(!guard.is_in_flight(buyer));
        assert!(guard.try_begin(buyer).is_some());
    }

    #[test]
    fn only_documented_transitions_are_allowed() {
        use CheckoutState::*;
        assert!(Idle.can_transition_to(Submitting));
        assert!(OrderCreated.can_transition_to(ItemsWriteFailed));
        assert!(!Idle.can_transition_to(OrderCreated));
        assert!(!OrderCreated.can_transition_to(Idle));
        assert!(!Completed.can_transition_to(Submitting));
        assert!(!ItemsWriteFailed.can_transition_to(Completed));
    }

    #[test]
    fn fan_out_drops_lines_without_seller() {
        let seller = Uuid::new_v4();
        let lines = vec![
            CartLine {
                product_id: Uuid::new_v4(),
                seller_id: Some(seller),
                title: "Bed frame".into(),
                unit_price: 1500,
                quantity: 1,
                image_ref: None,
            },
            CartLine {
                product_id: Uuid::new_v4(),
                seller_id: None,
                title: "Lamp".into(),
                unit_price: 300,
                quantity: 2,
                image_ref: None,
            },
        ];
        let request = FanoutRequest {
            buyer_id: Uuid::new_v4(),
            buyer_name: "Ana",
            buyer_address: "12 Mabini St",
            payment_method: PaymentMethod::Cod,
            lines: &lines,
            pricing: PricingResult::default(),
        };

        let items = fan_out(Uuid::new_v4(), &request);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].seller_id, seller);
        assert_eq!(items[0].shipping_fee, 0);
        assert_eq!(items[0].buyer_address, "12 Mabini St");
        assert_eq!(items[0].status, INITIAL_STATUS);
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!("continue".parse(), Ok(FanoutFailurePolicy::Continue));
        assert_eq!("MARK_ORPHAN".parse(), Ok(FanoutFailurePolicy::MarkOrphan));
        assert_eq!(
            "rollback".parse::<FanoutFailurePolicy>(),
            Err(UnknownFanoutPolicy("rollback".into()))
        );
    }
}
