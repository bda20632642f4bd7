use std::{fmt, future::Future, str::FromStr, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{cart::CartStore, fanout::WrittenOrder};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Online => "online",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(PaymentMethod::Cod),
            "online" => Ok(PaymentMethod::Online),
            other => Err(AppError::Validation(format!(
                "unsupported payment method {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,
    #[error("payment gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment gateway rejected the request with status {0}")]
    Rejected(u16),
    #[error("payment gateway returned no checkout url")]
    MissingUrl,
}

/// External payment gateway: one checkout session per online order.
pub trait PaymentGateway: Send + Sync {
    fn create_session(
        &self,
        order_id: Uuid,
    ) -> impl Future<Output = Result<CheckoutSession, GatewayError>> + Send;
}

#[derive(Debug, Serialize)]
struct SessionRequest {
    order_id: Uuid,
}

/// Posts `{order_id}` to the configured endpoint and expects `{checkout_url}` back.
/// No retries.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

impl PaymentGateway for HttpPaymentGateway {
    async fn create_session(&self, order_id: Uuid) -> Result<CheckoutSession, GatewayError> {
        let endpoint = self.endpoint.as_deref().ok_or(GatewayError::NotConfigured)?;
        let response = self
            .client
            .post(endpoint)
            .json(&SessionRequest { order_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Rejected(status.as_u16()));
        }

        let session: CheckoutSession = response.json().await?;
        if session.checkout_url.trim().is_empty() {
            return Err(GatewayError::MissingUrl);
        }
        Ok(session)
    }
}

#[derive(Debug, Error)]
#[error("could not open redirect url: {0}")]
pub struct RedirectError(pub String);

/// Hands the gateway URL over to the buyer.
pub trait RedirectOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), RedirectError>;
}

/// The URL is returned to the client in the checkout response, so opening it
/// here means checking it is something a browser can follow.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientRedirect;

impl RedirectOpener for ClientRedirect {
    fn open(&self, url: &str) -> Result<(), RedirectError> {
        let parsed = Url::parse(url).map_err(|err| RedirectError(err.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(RedirectError(format!("unsupported scheme {scheme}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Cash on delivery: the order is placed, settlement happens outside the system.
    Placed { order_id: Uuid, total_amount: i64 },
    /// Online: the buyer continues at the gateway. Confirmation arrives later
    /// through the gateway webhook, not through this pipeline.
    RedirectToGateway {
        order_id: Uuid,
        total_amount: i64,
        checkout_url: String,
        redirect_opened: bool,
    },
}

/// Branches a freshly written order on its payment method.
pub struct PaymentBranchController<'a, G, O> {
    gateway: &'a G,
    opener: &'a O,
    carts: &'a dyn CartStore,
}

impl<'a, G: PaymentGateway, O: RedirectOpener> PaymentBranchController<'a, G, O> {
    pub fn new(gateway: &'a G, opener: &'a O, carts: &'a dyn CartStore) -> Self {
        Self {
            gateway,
            opener,
            carts,
        }
    }

    /// The cart is cleared on COD and on a successful gateway session. A gateway
    /// failure keeps the cart and surfaces an error suggesting COD.
    pub async fn settle(
        &self,
        buyer_id: Uuid,
        order: &WrittenOrder,
        method: PaymentMethod,
    ) -> AppResult<PaymentOutcome> {
        match method {
            PaymentMethod::Cod => {
                self.carts.clear(buyer_id);
                tracing::info!(order_id = %order.order_id, "cash on delivery order placed");
                Ok(PaymentOutcome::Placed {
                    order_id: order.order_id,
                    total_amount: order.total_amount,
                })
            }
            PaymentMethod::Online => {
                let session = match self.gateway.create_session(order.order_id).await {
                    Ok(session) => session,
                    Err(err) => {
                        tracing::warn!(order_id = %order.order_id, error = %err, "payment gateway session failed");
                        return Err(AppError::GatewaySession(err.to_string()));
                    }
                };
                self.carts.clear(buyer_id);

                let redirect_opened = match self.opener.open(&session.checkout_url) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(order_id = %order.order_id, error = %err, "ignoring redirect failure");
                        false
                    }
                };

                Ok(PaymentOutcome::RedirectToGateway {
                    order_id: order.order_id,
                    total_amount: order.total_amount,
                    checkout_url: session.checkout_url,
                    redirect_opened,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_redirect_accepts_web_urls_only() {
        assert!(ClientRedirect.open("https://pay.example.com/s/abc").is_ok());
        assert!(ClientRedirect.open("javascript:alert(1)").is_err());
        assert!(ClientRedirect.open("not a url").is_err());
    }

    #[test]
    fn payment_method_parses() {
        assert_eq!("COD".parse::<PaymentMethod>().ok(), Some(PaymentMethod::Cod));
        assert_eq!(
            "online".parse::<PaymentMethod>().ok(),
            Some(PaymentMethod::Online)
        );
        assert!(matches!(
            "gcash".parse::<PaymentMethod>(),
            Err(AppError::Validation(_))
        ));
    }
}
