// Domain types shared by both DPS connectors

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

/// Payment type configured for a checkout attempt.
///
/// `AuthComplete` authorises a small amount up front (to verify the card or
/// avoid holding card data) and settles the real amount later; `Purchase`
/// takes the money immediately.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum TransactionType {
    #[serde(rename = "Auth-Complete")]
    #[strum(serialize = "Auth-Complete")]
    AuthComplete,
    Purchase,
}

impl TransactionType {
    /// Parses the config spelling of a payment type.
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        value
            .parse()
            .map_err(|_| ConfigurationError::InvalidTransactionType {
                value: value.to_string(),
            })
    }
}

/// Stage of the Auth-Complete cycle. Meaningless for Purchase-type
/// transactions, which never leave their one-shot flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Stage {
    Auth,
    Complete,
}

/// Wire-level txnType sent to DPS. `Complete` only ever appears on the
/// PXPost wire for the settlement leg of an Auth-Complete cycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum GatewayTxnType {
    Auth,
    Complete,
    Purchase,
}

/// Internal classification of a gateway outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PaymentStatus {
    Accepted,
    Declined,
    Error,
}

impl PaymentStatus {
    /// Classifies a DPS status code: 0 accepted, 1 declined, everything else
    /// (including out-of-range codes) an error.
    pub fn from_status_code(code: u8) -> Self {
        match code {
            0 => Self::Accepted,
            1 => Self::Declined,
            _ => Self::Error,
        }
    }
}

/// The transaction being paid for. Queried, never mutated.
pub trait Transaction: Send + Sync {
    fn total(&self) -> Decimal;
    fn currency_code(&self) -> String;
}

/// Source of the currency the checkout is currently operating in.
pub trait CurrencyProvider: Send + Sync {
    fn active_currency_code(&self) -> String;
}

/// Fire-and-forget notifications emitted at payment milestones. Never used
/// for control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    SessionIssued { session_id: String },
    TransactionChecked { status: PaymentStatus },
    SettlementAttempted { succeeded: bool },
}

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PaymentEvent);
}

/// Publisher that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: PaymentEvent) {}
}

/// Publisher that records events on the current tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: PaymentEvent) {
        tracing::info!(event = ?event, "payment event");
    }
}

/// Immutable record of a completed gateway call. Constructed once from a
/// parsed reply and never mutated; owned by the caller that persists or
/// displays it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResponse {
    pub(crate) status: PaymentStatus,
    pub(crate) currency_code: Option<String>,
    pub(crate) message: String,
    pub(crate) amount: Option<String>,
    pub(crate) client_ip: Option<String>,
    pub(crate) transaction_type: Option<GatewayTxnType>,
    pub(crate) merchant_reference: Option<String>,
    pub(crate) transaction_reference: Option<String>,
    pub(crate) auth_code: Option<String>,
    pub(crate) xml_response: String,
    pub(crate) billing_id: Option<String>,
    pub(crate) help_text: Option<String>,
    pub(crate) response_code: Option<String>,
    pub(crate) settlement_date: Option<String>,
    pub(crate) parent_reference: Option<String>,
}

impl PaymentResponse {
    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn currency_code(&self) -> Option<&str> {
        self.currency_code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    pub fn transaction_type(&self) -> Option<GatewayTxnType> {
        self.transaction_type
    }

    pub fn merchant_reference(&self) -> Option<&str> {
        self.merchant_reference.as_deref()
    }

    /// The DPS transaction reference (DpsTxnRef), used to complete an
    /// Auth-Complete cycle.
    pub fn transaction_reference(&self) -> Option<&str> {
        self.transaction_reference.as_deref()
    }

    pub fn auth_code(&self) -> Option<&str> {
        self.auth_code.as_deref()
    }

    /// Raw response body as received from the gateway.
    pub fn xml_response(&self) -> &str {
        &self.xml_response
    }

    pub fn billing_id(&self) -> Option<&str> {
        self.billing_id.as_deref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }

    pub fn response_code(&self) -> Option<&str> {
        self.response_code.as_deref()
    }

    pub fn settlement_date(&self) -> Option<&str> {
        self.settlement_date.as_deref()
    }

    pub fn parent_reference(&self) -> Option<&str> {
        self.parent_reference.as_deref()
    }

    /// Associates the response with the payment record it belongs to.
    /// Consuming, so the record stays immutable once handed out.
    pub fn with_parent_reference(mut self, parent_reference: impl Into<String>) -> Self {
        self.parent_reference = Some(parent_reference.into());
        self
    }
}
