use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    cart::CartStore,
    fanout::{
        CheckoutAttempt, CheckoutState, FanoutFailurePolicy, FanoutRequest, OrderFanoutWriter,
        OrderStore, SubmissionGuard,
    },
    payment::{PaymentBranchController, PaymentGateway, PaymentMethod, PaymentOutcome, RedirectOpener},
    pricing::{self, PricingResult},
    vouchers::{Voucher, eligible_vouchers},
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub voucher_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutOutcome {
    pub order_id: Uuid,
    pub state: CheckoutState,
    /// Every state the attempt passed through, starting at `Idle`.
    pub transitions: Vec<CheckoutState>,
    pub pricing: PricingResult,
    pub payment: PaymentOutcome,
    pub items_written: usize,
    /// Set when the order header was saved but its items were not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Cart → price → order header + items → payment branch, for one buyer session.
pub struct CheckoutPipeline<'a, S, G, O> {
    pub carts: &'a dyn CartStore,
    pub submissions: &'a SubmissionGuard,
    pub store: &'a S,
    pub gateway: &'a G,
    pub opener: &'a O,
    pub fanout_policy: FanoutFailurePolicy,
}

impl<S, G, O> CheckoutPipeline<'_, S, G, O>
where
    S: OrderStore,
    G: PaymentGateway,
    O: RedirectOpener,
{
    /// `active_vouchers` is the current list of active voucher promotions; a
    /// selected voucher must be eligible for the cart at `now`.
    pub async fn submit(
        &self,
        input: CheckoutInput,
        active_vouchers: Vec<Voucher>,
        now: DateTime<Utc>,
    ) -> AppResult<CheckoutOutcome> {
        let Some(_ticket) = self.submissions.try_begin(input.buyer_id) else {
            return Err(AppError::Conflict(
                "a checkout is already in progress for this session".into(),
            ));
        };

        let mut attempt = CheckoutAttempt::new(input.buyer_id);
        attempt.advance(CheckoutState::Submitting);

        let cart = self.carts.load(input.buyer_id);
        if let Err(err) = validate(&input, cart.is_empty()) {
            attempt.advance(CheckoutState::Idle);
            return Err(err);
        }

        let voucher = match input.voucher_id {
            None => None,
            Some(voucher_id) => {
                let eligible = eligible_vouchers(active_vouchers, now, cart.seller_id());
                match eligible.into_iter().find(|voucher| voucher.id == voucher_id) {
                    Some(voucher) => Some(voucher),
                    None => {
                        attempt.advance(CheckoutState::Idle);
                        return Err(AppError::Validation(
                            "selected voucher is not available for this cart".into(),
                        ));
                    }
                }
            }
        };
        let pricing = pricing::price(cart.lines(), voucher.as_ref());

        let request = FanoutRequest {
            buyer_id: input.buyer_id,
            buyer_name: input.buyer_name.trim(),
            buyer_address: input.address.trim(),
            payment_method: input.payment_method,
            lines: cart.lines(),
            pricing,
        };
        let written = OrderFanoutWriter::new(self.store, self.fanout_policy)
            .write(&mut attempt, &request)
            .await?;
        let warning = written.fanout_error.as_ref().map(ToString::to_string);

        let payment = PaymentBranchController::new(self.gateway, self.opener, self.carts)
            .settle(input.buyer_id, &written, input.payment_method)
            .await?;
        // A failed fan-out stays in ItemsWriteFailed for reconciliation tooling.
        if attempt.state() == CheckoutState::ItemsWritten {
            attempt.advance(CheckoutState::Completed);
        }

        Ok(CheckoutOutcome {
            order_id: written.order_id,
            state: attempt.state(),
            transitions: attempt.history().to_vec(),
            pricing,
            payment,
            items_written: written.items_written,
            warning,
        })
    }
}

fn validate(input: &CheckoutInput, cart_is_empty: bool) -> AppResult<()> {
    if cart_is_empty {
        return Err(AppError::Validation("cart is empty".into()));
    }
    if input.address.trim().is_empty() {
        return Err(AppError::Validation("a delivery address is required".into()));
    }
    if input.buyer_name.trim().is_empty() {
        return Err(AppError::Validation("buyer name is required".into()));
    }
    Ok(())
}
