//! PXPost connector: direct XML POST submissions against the DPS gateway.
//!
//! Each call to [`PxPost::process`] submits one transaction leg as a `<Txn>`
//! document and parses the reply into a [`PaymentResponse`]. The Complete leg
//! of an Auth-Complete cycle goes through [`PxPost::process_complete`], which
//! insists on a DpsTxnRef so a settlement can never be submitted without the
//! authorisation it settles.

pub mod constants;
pub mod transformers;

use std::collections::HashMap;
use std::sync::Arc;

use error_stack::report;

use crate::config::{is_absolute_url, AdditionalConfig, PaymentConfig};
use crate::errors::{
    ConfigurationError, CustomResult, GatewayDiagnostics, GatewayError, IntoPaymentError,
    PaymentError,
};
use crate::services::{call_gateway, Method, RequestBuilder, RequestContent};
use crate::status::StatusTranslator;
use crate::types::{CurrencyProvider, GatewayTxnType, PaymentResponse, Transaction};
use crate::{currency, utils::XmlExt};

use self::constants::{
    ADDITIONAL_DPS_TXN_REF, ALLOWED_ADDITIONAL_CONFIG, CONFIG_POST_URL, CONFIG_SCHEMA,
    DEFAULT_ENDPOINT,
};
use self::transformers::{PostResponseContext, PxPostRequest, PxPostResponse};

pub struct PxPost {
    config: PaymentConfig,
    additional_config: AdditionalConfig,
    status_translator: StatusTranslator,
    txn_type: GatewayTxnType,
    post_url: String,
    parent_reference: Option<String>,
    transaction: Arc<dyn Transaction>,
    currency: Arc<dyn CurrencyProvider>,
    client: reqwest::Client,
    testing_mode: bool,
}

impl PxPost {
    pub fn new(transaction: Arc<dyn Transaction>, currency: Arc<dyn CurrencyProvider>) -> Self {
        Self {
            config: PaymentConfig::new(CONFIG_SCHEMA),
            additional_config: AdditionalConfig::new(ALLOWED_ADDITIONAL_CONFIG),
            status_translator: StatusTranslator::default(),
            txn_type: GatewayTxnType::Purchase,
            post_url: DEFAULT_ENDPOINT.to_string(),
            parent_reference: None,
            transaction,
            currency,
            client: reqwest::Client::new(),
            testing_mode: false,
        }
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

    /// Replaces the passthrough fields with the allow-listed subset of
    /// `entries` and returns the retained set.
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

    pub fn set_txn_type(&mut self, txn_type: GatewayTxnType) {
        self.txn_type = txn_type;
    }

    pub fn txn_type(&self) -> GatewayTxnType {
        self.txn_type
    }

    pub fn set_post_url(&mut self, url: &str) -> Result<(), ConfigurationError> {
        if !is_absolute_url(url) {
            return Err(ConfigurationError::InvalidUrl {
                key: CONFIG_POST_URL.to_string(),
            });
        }
        self.post_url = url.to_string();
        Ok(())
    }

    /// Endpoint the `<Txn>` document is POSTed to. A configured PostUrl wins
    /// over the default gateway address.
    pub fn post_url(&self) -> &str {
        self.config.get(CONFIG_POST_URL).unwrap_or(&self.post_url)
    }

    /// Response built from the gateway reply will carry this reference, so the
    /// caller can associate it with its payment record.
    pub fn set_parent_reference(&mut self, parent_reference: impl Into<String>) {
        self.parent_reference = Some(parent_reference.into());
    }

    pub fn status_translator(&self) -> &StatusTranslator {
        &self.status_translator
    }

    pub fn status_translator_mut(&mut self) -> &mut StatusTranslator {
        &mut self.status_translator
    }

    /// When set, full request/response exchanges are written to the debug log.
    pub fn set_testing_mode(&mut self, testing_mode: bool) {
        self.testing_mode = testing_mode;
    }

    /// Amount for the current leg, formatted for the wire in the active
    /// currency.
    pub fn amount(&self) -> String {
        currency::format_amount(
            self.transaction.total(),
            &self.currency.active_currency_code(),
        )
    }

    /// Active currency code, validated against the DPS supported set.
    pub fn currency_code(&self) -> Result<String, ConfigurationError> {
        let code = self.currency.active_currency_code();
        currency::validate(&code)?;
        Ok(code)
    }

    /// Submits the configured transaction leg.
    pub async fn process(&self) -> CustomResult<PaymentResponse, PaymentError> {
        self.submit(self.txn_type).await
    }

    /// Submits the settlement leg of an Auth-Complete cycle. The DpsTxnRef of
    /// the authorisation must have been placed in the additional config.
    pub async fn process_complete(&self) -> CustomResult<PaymentResponse, PaymentError> {
        if self.additional_config.get(ADDITIONAL_DPS_TXN_REF).is_none() {
            return Err(report!(ConfigurationError::MissingKey {
                key: ADDITIONAL_DPS_TXN_REF.to_string(),
            }))
            .into_payment_error();
        }
        self.submit(GatewayTxnType::Complete).await
    }

    async fn submit(
        &self,
        txn_type: GatewayTxnType,
    ) -> CustomResult<PaymentResponse, PaymentError> {
        let request = PxPostRequest::build(self, txn_type).into_payment_error()?;
        let diagnostic_request = request.diagnostic_string();

        let http_request = RequestBuilder::new()
            .method(Method::Post)
            .url(self.post_url())
            .set_body(RequestContent::Xml(request.to_xml()))
            .build();

        let response = call_gateway(&self.client, http_request)
            .await
            .into_payment_error()?;
        let raw = response.body_text();

        if self.testing_mode {
            tracing::debug!(
                request = %diagnostic_request,
                response = %raw,
                "pxpost exchange"
            );
        }

        let reply: PxPostResponse = raw
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

        let txn = reply
            .transaction
            .as_ref()
            .ok_or_else(|| {
                report!(GatewayError::MissingTransactionResult).attach_printable(
                    GatewayDiagnostics {
                        request: diagnostic_request.clone(),
                        raw_response: raw.clone(),
                        parsed_response: Some(format!("{reply:?}")),
                    },
                )
            })
            .into_payment_error()?;

        let mut payment_response = PaymentResponse::from(PostResponseContext {
            reply: &reply,
            txn,
            translator: &self.status_translator,
            raw_response: &raw,
        });
        if let Some(parent_reference) = &self.parent_reference {
            payment_response = payment_response.with_parent_reference(parent_reference);
        }
        Ok(payment_response)
    }
}

impl std::fmt::Debug for PxPost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PxPost")
            .field("config", &self.config)
            .field("additional_config", &self.additional_config)
            .field("txn_type", &self.txn_type)
            .field("post_url", &self.post_url)
            .field("parent_reference", &self.parent_reference)
            .field("testing_mode", &self.testing_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::types::PaymentStatus;

    struct MockTransaction {
        total: Decimal,
    }

    impl Transaction for MockTransaction {
        fn total(&self) -> Decimal {
            self.total
        }

        fn currency_code(&self) -> String {
            "NZD".to_string()
        }
    }

    struct MockCurrency(&'static str);

    impl CurrencyProvider for MockCurrency {
        fn active_currency_code(&self) -> String {
            self.0.to_string()
        }
    }

    fn service() -> PxPost {
        let mut service = PxPost::new(
            Arc::new(MockTransaction { total: dec!(10) }),
            Arc::new(MockCurrency("NZD")),
        );
        let errors = service.set_config(HashMap::from([
            ("Username".to_string(), "TestPost".to_string()),
            ("Password".to_string(), "Test".to_string()),
        ]));
        assert!(errors.is_empty());
        service
    }

    const APPROVED: &str = r#"<Txn><Transaction success="1" reco="00" responsetext="APPROVED"><Authorized>1</Authorized><Amount>10.00</Amount><CurrencyName>NZD</CurrencyName><TxnType>Purchase</TxnType><AuthCode>015921</AuthCode><DpsTxnRef>0000000103f8dc41</DpsTxnRef></Transaction><ReCo>00</ReCo><ResponseText>APPROVED</ResponseText><HelpText>Transaction Approved</HelpText><Success>1</Success></Txn>"#;

    #[test]
    fn empty_config_reports_both_missing_keys() {
        let mut service = PxPost::new(
            Arc::new(MockTransaction { total: dec!(10) }),
            Arc::new(MockCurrency("NZD")),
        );
        let errors = service.set_config(HashMap::new());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn post_url_must_be_absolute() {
        let mut service = service();
        assert!(service.set_post_url("/pxpost.aspx").is_err());
        assert!(service.set_post_url("https://uat.paymentexpress.com/pxpost.aspx").is_ok());
        assert_eq!(service.post_url(), "https://uat.paymentexpress.com/pxpost.aspx");
    }

    #[test]
    fn unsupported_currency_is_rejected_before_any_network_call() {
        let mut service = PxPost::new(
            Arc::new(MockTransaction { total: dec!(10) }),
            Arc::new(MockCurrency("XYZ")),
        );
        service.set_config(HashMap::from([
            ("Username".to_string(), "TestPost".to_string()),
            ("Password".to_string(), "Test".to_string()),
        ]));
        let err = service.currency_code().unwrap_err();
        assert_eq!(err.to_string(), "the currency XYZ is not supported by DPS");
    }

    #[tokio::test]
    async fn purchase_round_trip_maps_the_approved_reply() {
        let mut mock_server = mockito::Server::new_async().await;
        let mock = mock_server
            .mock("POST", "/")
            .match_header("content-type", "text/xml; charset=utf-8")
            .with_body(APPROVED)
            .create_async()
            .await;

        let mut service = service();
        service.set_post_url(&mock_server.url()).unwrap();
        service.set_parent_reference("payment-55");

        let response = service.process().await.unwrap();
        mock.assert_async().await;

        assert_eq!(response.status(), PaymentStatus::Accepted);
        assert_eq!(response.message(), "Approved");
        assert_eq!(response.transaction_reference(), Some("0000000103f8dc41"));
        assert_eq!(response.parent_reference(), Some("payment-55"));
        assert_eq!(response.xml_response(), APPROVED);
    }

    #[tokio::test]
    async fn reply_without_a_transaction_element_is_a_gateway_error() {
        let mut mock_server = mockito::Server::new_async().await;
        let _mock = mock_server
            .mock("POST", "/")
            .with_body("<Txn><Success>0</Success></Txn>")
            .create_async()
            .await;

        let mut service = service();
        service.set_post_url(&mock_server.url()).unwrap();

        let error = service.process().await.unwrap_err();
        assert_eq!(
            error.current_context(),
            &PaymentError::Gateway(GatewayError::MissingTransactionResult)
        );
        // The diagnostics frame carries the exchange, password masked.
        let rendered = format!("{error:?}");
        assert!(rendered.contains("raw response"));
        assert!(!rendered.contains("<PostPassword>Test</PostPassword>"));
    }

    #[tokio::test]
    async fn complete_without_a_dps_txn_ref_never_reaches_the_wire() {
        let service = service();
        let error = service.process_complete().await.unwrap_err();
        assert_eq!(
            error.current_context(),
            &PaymentError::Configuration(ConfigurationError::MissingKey {
                key: "DpsTxnRef".to_string()
            })
        );
    }

    #[tokio::test]
    async fn complete_submits_a_complete_txn_type() {
        let mut mock_server = mockito::Server::new_async().await;
        let mock = mock_server
            .mock("POST", "/")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex("<TxnType>Complete</TxnType>".to_string()),
                mockito::Matcher::Regex("<DpsTxnRef>0000000103f8dc41</DpsTxnRef>".to_string()),
            ]))
            .with_body(APPROVED.replace("Purchase", "Complete"))
            .create_async()
            .await;

        let mut service = service();
        service.set_post_url(&mock_server.url()).unwrap();
        assert!(service.set_additional_config_by_key("DpsTxnRef", "0000000103f8dc41"));

        let response = service.process_complete().await.unwrap();
        mock.assert_async().await;

        assert_eq!(response.status(), PaymentStatus::Accepted);
        assert_eq!(response.transaction_type(), Some(GatewayTxnType::Complete));
    }

    #[test]
    fn built_request_carries_the_stored_passthrough_fields() {
        let mut service = service();
        service.set_additional_config([
            ("MerchantReference", "Order-77"),
            ("TxnData1", "Hello"),
            ("DpsTxnRef", "0000000103f8dc41"),
        ]);

        let request =
            transformers::PxPostRequest::build(&service, GatewayTxnType::Purchase).unwrap();
        assert_eq!(request.merchant_reference.as_deref(), Some("Order-77"));
        assert_eq!(request.txn_data1.as_deref(), Some("Hello"));

        let xml = request.to_xml();
        assert!(xml.contains("<MerchantReference>Order-77</MerchantReference>"));
        assert!(xml.contains("<TxnData1>Hello</TxnData1>"));
        assert!(xml.contains("<DpsTxnRef>0000000103f8dc41</DpsTxnRef>"));
    }

    #[test]
    fn additional_config_drops_keys_outside_the_allow_list() {
        let mut service = service();
        let retained = service
            .set_additional_config([("TxnData1", "Hello"), ("CardNumber", "4111111111111111")]);
        assert_eq!(retained.len(), 1);
        assert!(retained.contains_key("TxnData1"));
    }

    #[test]
    fn debug_output_never_prints_the_password() {
        let service = service();
        let rendered = format!("{service:?}");
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("\"Password\": \"Test\""));
    }
}
