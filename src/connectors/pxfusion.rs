//! PXFusion connector: the hosted DPS checkout flow.
//!
//! The merchant asks DPS for a transaction session (`GetTransactionId`),
//! redirects the shopper to the hosted payment page with that session, and on
//! return queries the outcome (`GetTransaction`). For an Auth-Complete cycle
//! the settlement leg is delegated to a [`PxPost`] service, since PXFusion
//! itself has no Complete operation.

pub mod constants;
pub mod transformers;

use std::collections::HashMap;
use std::sync::Arc;

use error_stack::{report, Report};
use rust_decimal::Decimal;
use url::Url;

use crate::config::{is_absolute_url, AdditionalConfig, PaymentConfig};
use crate::errors::{
    ConfigurationError, CustomResult, GatewayDiagnostics, GatewayError, IntoPaymentError,
    PaymentError,
};
use crate::services::{call_gateway, Method, RequestBuilder, RequestContent};
use crate::status::StatusTranslator;
use crate::types::{
    CurrencyProvider, EventPublisher, GatewayTxnType, PaymentEvent, PaymentResponse,
    PaymentStatus, Stage, Transaction, TransactionType,
};
use crate::utils::XmlExt;
use crate::{currency, utils};

use self::constants::{
    ALLOWED_ADDITIONAL_CONFIG, CONFIG_SCHEMA, CONFIG_TYPE, CONFIG_WSDL, DEFAULT_ENDPOINT,
    IDENTIFIER, SOAP_ACTION_GET_TRANSACTION, SOAP_ACTION_GET_TRANSACTION_ID,
};
use self::transformers::{
    FusionCheckContext, GetTransactionEnvelope, GetTransactionIdEnvelope, GetTransactionIdRequest,
    GetTransactionRequest,
};
use super::pxpost::constants::ADDITIONAL_DPS_TXN_REF;
use super::pxpost::PxPost;

/// Outcome of a settlement attempt. Delegation failures are reported as a
/// value rather than an error so a failed settlement can be retried without
/// tearing down the checkout.
#[derive(Debug)]
pub enum CompleteOutcome {
    /// The settlement leg reached the gateway; the response says whether the
    /// money actually moved.
    Settled(PaymentResponse),
    /// No settlement was submitted (no delegate configured, or the delegate
    /// failed before a response was obtained).
    Failed,
}

pub struct PxFusion {
    config: PaymentConfig,
    additional_config: AdditionalConfig,
    status_translator: StatusTranslator,
    stage: Stage,
    auth_amount: Decimal,
    wsdl: String,
    base_return_url: Url,
    transaction: Arc<dyn Transaction>,
    currency: Arc<dyn CurrencyProvider>,
    events: Arc<dyn EventPublisher>,
    px_post: Option<PxPost>,
    client: reqwest::Client,
    testing_mode: bool,
}

impl PxFusion {
    pub fn new(
        transaction: Arc<dyn Transaction>,
        currency: Arc<dyn CurrencyProvider>,
        events: Arc<dyn EventPublisher>,
        base_return_url: Url,
    ) -> Self {
        Self {
            config: PaymentConfig::new(CONFIG_SCHEMA),
            additional_config: AdditionalConfig::new(ALLOWED_ADDITIONAL_CONFIG),
            status_translator: StatusTranslator::default(),
            stage: Stage::Auth,
            auth_amount: Decimal::ONE,
            wsdl: DEFAULT_ENDPOINT.to_string(),
            base_return_url,
            transaction,
            currency,
            events,
            px_post: None,
            client: reqwest::Client::new(),
            testing_mode: false,
        }
    }

    /// Attaches the PXPost service used for the settlement leg of an
    /// Auth-Complete cycle.
    pub fn with_px_post(mut self, px_post: PxPost) -> Self {
        self.px_post = Some(px_post);
        self
    }

    pub fn px_post(&self) -> Option<&PxPost> {
        self.px_post.as_ref()
    }

    pub fn set_config(&mut self, config: HashMap<String, String>) -> Vec<ConfigurationError> {
        self.config.set_config(config)
    }

    pub fn get_config(&self) -> &HashMap<String, String> {
        self.config.get_config()
    }

    pub(crate) fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Changes the configured payment type, revalidating the stored
    /// configuration with the usual all-or-nothing contract.
    pub fn set_type(&mut self, transaction_type: TransactionType) -> Vec<ConfigurationError> {
        self.config
            .set_value(CONFIG_TYPE, transaction_type.to_string())
    }

    pub fn transaction_type(&self) -> Option<TransactionType> {
        self.config
            .get(CONFIG_TYPE)
            .and_then(|value| TransactionType::parse(value).ok())
    }

    /// Moves the Auth-Complete cycle to `stage`. Only meaningful for
    /// Auth-Complete payments; Purchase payments have no stages.
    pub fn set_stage(&mut self, stage: Stage) -> Result<(), ConfigurationError> {
        if self.transaction_type() != Some(TransactionType::AuthComplete) {
            return Err(ConfigurationError::UnsupportedStage);
        }
        self.stage = stage;
        Ok(())
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Wire-level txnType for the next session: an Auth-Complete payment in
    /// its Auth stage authorises; everything else purchases.
    pub fn txn_type(&self) -> GatewayTxnType {
        if self.transaction_type() == Some(TransactionType::AuthComplete)
            && self.stage == Stage::Auth
        {
            GatewayTxnType::Auth
        } else {
            GatewayTxnType::Purchase
        }
    }

    /// Replaces the tranDetail passthrough fields with the allow-listed
    /// subset of `entries` and returns the retained set.
    pub fn set_additional_config<K, V, I>(
        &mut self,
        entries: I,
    ) -> &std::collections::BTreeMap<String, String>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.additional_config.set(entries)
    }

    /// Sets one passthrough field; returns false when the key is dropped.
    pub fn set_additional_config_by_key(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        self.additional_config.set_by_key(key, value)
    }

    pub fn additional_config(&self) -> &std::collections::BTreeMap<String, String> {
        self.additional_config.entries()
    }

    pub fn status_translator(&self) -> &StatusTranslator {
        &self.status_translator
    }

    pub fn status_translator_mut(&mut self) -> &mut StatusTranslator {
        &mut self.status_translator
    }

    /// Amount placed on the authorisation leg instead of the transaction
    /// total. Kept small on purpose; the real amount settles later.
    pub fn set_auth_amount(&mut self, amount: Decimal) {
        self.auth_amount = amount;
    }

    pub fn auth_amount(&self) -> Decimal {
        self.auth_amount
    }

    pub fn set_wsdl(&mut self, wsdl: &str) -> Result<(), ConfigurationError> {
        if !is_absolute_url(wsdl) {
            return Err(ConfigurationError::InvalidUrl {
                key: CONFIG_WSDL.to_string(),
            });
        }
        self.wsdl = wsdl.to_string();
        Ok(())
    }

    /// SOAP endpoint for this service. A configured Wsdl wins over the
    /// default gateway address.
    pub fn wsdl(&self) -> &str {
        self.config.get(CONFIG_WSDL).unwrap_or(&self.wsdl)
    }

    /// When set, full request/response exchanges are written to the debug log.
    pub fn set_testing_mode(&mut self, testing_mode: bool) {
        self.testing_mode = testing_mode;
    }

    /// Amount for the next session, formatted for the wire: the auth amount
    /// on an authorisation leg, the transaction total otherwise.
    pub fn amount(&self) -> String {
        let amount = match self.txn_type() {
            GatewayTxnType::Auth => self.auth_amount,
            _ => self.transaction.total(),
        };
        currency::format_amount(amount, &self.currency.active_currency_code())
    }

    /// Active currency code, validated against the DPS supported set.
    pub fn currency_code(&self) -> Result<String, ConfigurationError> {
        let code = self.currency.active_currency_code();
        currency::validate(&code)?;
        Ok(code)
    }

    /// URL the hosted payment page sends the shopper back to. The path names
    /// the configured payment type so the return handler knows which flow to
    /// resume.
    pub fn return_url(&self) -> CustomResult<Url, ConfigurationError> {
        let transaction_type =
            TransactionType::parse(self.config.require(CONFIG_TYPE).map_err(Report::new)?)
                .map_err(Report::new)?;
        let branch = match transaction_type {
            TransactionType::AuthComplete => "check/auth",
            TransactionType::Purchase => "check/purchase",
        };
        self.base_return_url
            .join(&format!("{IDENTIFIER}/{branch}"))
            .map_err(|_| {
                report!(ConfigurationError::InvalidUrl {
                    key: "ReturnUrl".to_string(),
                })
            })
    }

    /// Asks DPS for a transaction session. The returned session id is what
    /// the hosted payment page is opened with.
    pub async fn get_transaction_id(&self) -> CustomResult<String, PaymentError> {
        let request = GetTransactionIdRequest::try_from(self).into_payment_error()?;
        let diagnostic_request = request.diagnostic_string();

        let raw = self
            .soap_call(request.to_soap_xml(), SOAP_ACTION_GET_TRANSACTION_ID)
            .await
            .into_payment_error()?;

        if self.testing_mode {
            tracing::debug!(
                request = %diagnostic_request,
                response = %raw,
                "pxfusion GetTransactionId exchange"
            );
        }

        let parsed: GetTransactionIdEnvelope = utils::strip_soap_prefixes(&raw)
            .parse_xml()
            .map_err(|error| {
                report!(GatewayError::ResponseDeserializationFailed)
                    .attach_printable(error.to_string())
                    .attach_printable(GatewayDiagnostics {
                        request: diagnostic_request.clone(),
                        raw_response: raw.clone(),
                        parsed_response: None,
                    })
            })
            .into_payment_error()?;

        let result = parsed
            .body
            .get_transaction_id_response
            .get_transaction_id_result
            .ok_or_else(|| {
                report!(GatewayError::MissingTransactionResult).attach_printable(
                    GatewayDiagnostics {
                        request: diagnostic_request.clone(),
                        raw_response: raw.clone(),
                        parsed_response: None,
                    },
                )
            })
            .into_payment_error()?;

        let parsed_response = format!("{result:?}");
        if result.success {
            if let Some(session_id) = result.session_id {
                self.events.publish(PaymentEvent::SessionIssued {
                    session_id: session_id.clone(),
                });
                return Ok(session_id);
            }
        }

        Err(report!(GatewayError::SessionNotIssued).attach_printable(GatewayDiagnostics {
            request: diagnostic_request,
            raw_response: raw,
            parsed_response: Some(parsed_response),
        }))
        .into_payment_error()
    }

    /// Queries the outcome of a session after the shopper returns from the
    /// hosted payment page.
    pub async fn check_transaction(
        &self,
        transaction_id: &str,
    ) -> CustomResult<PaymentResponse, PaymentError> {
        let request = GetTransactionRequest::new(self, transaction_id)
            .map_err(Report::new)
            .into_payment_error()?;
        let diagnostic_request = request.diagnostic_string();

        let raw = self
            .soap_call(request.to_soap_xml(), SOAP_ACTION_GET_TRANSACTION)
            .await
            .into_payment_error()?;

        if self.testing_mode {
            tracing::debug!(
                request = %diagnostic_request,
                response = %raw,
                "pxfusion GetTransaction exchange"
            );
        }

        let parsed: GetTransactionEnvelope = utils::strip_soap_prefixes(&raw)
            .parse_xml()
            .map_err(|error| {
                report!(GatewayError::ResponseDeserializationFailed)
                    .attach_printable(error.to_string())
                    .attach_printable(GatewayDiagnostics {
                        request: diagnostic_request.clone(),
                        raw_response: raw.clone(),
                        parsed_response: None,
                    })
            })
            .into_payment_error()?;

        let result = parsed
            .body
            .get_transaction_response
            .get_transaction_result
            .ok_or_else(|| {
                report!(GatewayError::MissingTransactionResult).attach_printable(
                    GatewayDiagnostics {
                        request: diagnostic_request.clone(),
                        raw_response: raw.clone(),
                        parsed_response: None,
                    },
                )
            })
            .into_payment_error()?;

        let response = PaymentResponse::from(FusionCheckContext {
            result: &result,
            translator: &self.status_translator,
            raw_response: &raw,
        });
        self.events.publish(PaymentEvent::TransactionChecked {
            status: response.status(),
        });
        Ok(response)
    }

    /// Settles an authorised Auth-Complete cycle by delegating the Complete
    /// leg to the attached PXPost service.
    ///
    /// `dps_txn_ref` is the DPS transaction reference returned for the
    /// authorisation. Delegation failures come back as
    /// [`CompleteOutcome::Failed`], not as an error.
    pub async fn complete_transaction(
        &mut self,
        dps_txn_ref: &str,
    ) -> CustomResult<CompleteOutcome, PaymentError> {
        self.set_stage(Stage::Complete)
            .map_err(Report::new)
            .into_payment_error()?;

        let Some(px_post) = self.px_post.as_mut() else {
            tracing::warn!("settlement requested with no PXPost service attached");
            self.events
                .publish(PaymentEvent::SettlementAttempted { succeeded: false });
            return Ok(CompleteOutcome::Failed);
        };

        px_post.set_txn_type(GatewayTxnType::Complete);
        px_post.set_additional_config_by_key(ADDITIONAL_DPS_TXN_REF, dps_txn_ref);

        match px_post.process_complete().await {
            Ok(response) => {
                let succeeded = response.status() == PaymentStatus::Accepted;
                self.events
                    .publish(PaymentEvent::SettlementAttempted { succeeded });
                Ok(CompleteOutcome::Settled(response))
            }
            Err(error) => {
                tracing::warn!(error = ?error, "settlement leg failed");
                self.events
                    .publish(PaymentEvent::SettlementAttempted { succeeded: false });
                Ok(CompleteOutcome::Failed)
            }
        }
    }

    async fn soap_call(
        &self,
        envelope: String,
        soap_action: &str,
    ) -> CustomResult<String, GatewayError> {
        let request = RequestBuilder::new()
            .method(Method::Post)
            .url(self.wsdl())
            .header("SOAPAction", &format!("\"{soap_action}\""))
            .set_body(RequestContent::Xml(envelope))
            .build();

        let response = call_gateway(&self.client, request).await?;
        Ok(response.body_text())
    }
}

impl std::fmt::Debug for PxFusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PxFusion")
            .field("config", &self.config)
            .field("additional_config", &self.additional_config)
            .field("stage", &self.stage)
            .field("auth_amount", &self.auth_amount)
            .field("wsdl", &self.wsdl)
            .field("base_return_url", &self.base_return_url)
            .field("px_post", &self.px_post)
            .field("testing_mode", &self.testing_mode)
            .finish()
    }
}
