use std::fmt;

pub type CustomResult<T, E> = error_stack::Result<T, E>;

/// Errors raised before any network call is made. A configuration error is
/// never partially applied: the stored configuration is untouched whenever
/// one of these is produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("missing required config key `{key}`")]
    MissingKey { key: String },
    #[error("`{key}` is not an allowed config key for this payment handler")]
    UnknownKey { key: String },
    #[error("{value} is not a valid 'Type' for this payment handler")]
    InvalidTransactionType { value: String },
    #[error("{key} needs to be an absolute url")]
    InvalidUrl { key: String },
    #[error("the currency {code} is not supported by DPS")]
    UnsupportedCurrency { code: String },
    #[error("Auth and Complete are the only supported stages for the Auth-Complete cycle")]
    UnsupportedStage,
}

/// Errors raised after a network round trip to the processor. Reports carry a
/// [`GatewayDiagnostics`] attachment with the outgoing request and the raw
/// response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to send request to the gateway: {reason}")]
    RequestNotSent { reason: String },
    #[error("gateway request timed out")]
    Timeout,
    #[error("failed to read the gateway response body")]
    ResponseReadFailed,
    #[error("failed to deserialize the gateway response")]
    ResponseDeserializationFailed,
    #[error("gateway response did not contain a transaction result")]
    MissingTransactionResult,
    #[error("gateway declined to issue a transaction session")]
    SessionNotIssued,
}

/// Umbrella error for gateway operations, which can fail either side of the
/// wire: configuration problems surface before money moves, gateway problems
/// only after a round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Diagnostic payload attached to gateway error reports: the outgoing request
/// (with credentials masked), the raw response body, and the parsed response
/// when one was obtained.
#[derive(Debug, Clone)]
pub struct GatewayDiagnostics {
    pub request: String,
    pub raw_response: String,
    pub parsed_response: Option<String>,
}

impl fmt::Display for GatewayDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request: {}, raw response: {}",
            self.request, self.raw_response
        )?;
        if let Some(parsed) = &self.parsed_response {
            write!(f, ", parsed response: {parsed}")?;
        }
        Ok(())
    }
}

/// Lifts a narrowly-typed error report into the [`PaymentError`] umbrella
/// while keeping the attached frames.
pub(crate) trait IntoPaymentError<T> {
    fn into_payment_error(self) -> CustomResult<T, PaymentError>;
}

impl<T> IntoPaymentError<T> for CustomResult<T, ConfigurationError> {
    fn into_payment_error(self) -> CustomResult<T, PaymentError> {
        self.map_err(|report| {
            let context = report.current_context().clone();
            report.change_context(PaymentError::Configuration(context))
        })
    }
}

impl<T> IntoPaymentError<T> for CustomResult<T, GatewayError> {
    fn into_payment_error(self) -> CustomResult<T, PaymentError> {
        self.map_err(|report| {
            let context = report.current_context().clone();
            report.change_context(PaymentError::Gateway(context))
        })
    }
}
