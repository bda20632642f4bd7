//! Checkout kernel: pricing, voucher eligibility, order fan-out, payment
//! branching, status normalization and live order tracking.
//!
//! Everything here talks to storage and the payment gateway through the
//! [`fanout::OrderStore`], [`tracker::OrderReader`], [`payment::PaymentGateway`]
//! and [`payment::RedirectOpener`] traits; the SeaORM-backed implementations
//! live in [`crate::store`].

pub mod cart;
pub mod fanout;
pub mod payment;
pub mod pipeline;
pub mod pricing;
pub mod status;
pub mod tracker;
pub mod vouchers;

pub use cart::{Cart, CartLine, CartStore, InMemoryCartStore, MAX_LINE_QUANTITY};
pub use fanout::{CheckoutState, FanoutFailurePolicy, OrderStore, SubmissionGuard};
pub use payment::{PaymentGateway, PaymentMethod, PaymentOutcome, RedirectOpener};
pub use pipeline::{CheckoutInput, CheckoutOutcome, CheckoutPipeline};
pub use pricing::PricingResult;
pub use tracker::{OrderReader, OrderTracker, TrackedOrder};
pub use vouchers::{DiscountType, Voucher};
