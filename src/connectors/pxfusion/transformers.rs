//! Wire types for the PXFusion SOAP calls and their conversion into the
//! internal [`PaymentResponse`].

use std::collections::BTreeMap;

use error_stack::Report;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::constants::{CONFIG_PASSWORD, CONFIG_USERNAME, SOAP_NAMESPACE};
use super::PxFusion;
use crate::errors::ConfigurationError;
use crate::status::StatusTranslator;
use crate::types::{GatewayTxnType, PaymentResponse};
use crate::utils::escape_xml_text;

const MASKED: &str = "****";

/// Fixed tranDetail fields; the allow-listed extras are spliced in after
/// serialization since their keys are dynamic.
#[derive(Debug, Serialize)]
#[serde(rename = "tranDetail")]
struct TranDetailXml<'a> {
    #[serde(rename = "txnType")]
    txn_type: String,
    currency: &'a str,
    amount: &'a str,
    #[serde(rename = "returnUrl")]
    return_url: &'a str,
}

/// Outgoing `GetTransactionId` call.
#[derive(Debug)]
pub struct GetTransactionIdRequest {
    pub username: Secret<String>,
    pub password: Secret<String>,
    pub txn_type: GatewayTxnType,
    pub currency: String,
    pub amount: String,
    pub return_url: String,
    pub extra: BTreeMap<String, String>,
}

impl TryFrom<&PxFusion> for GetTransactionIdRequest {
    type Error = Report<ConfigurationError>;

    fn try_from(service: &PxFusion) -> Result<Self, Self::Error> {
        let username = service.config().require(CONFIG_USERNAME).map_err(Report::new)?;
        let password = service.config().require(CONFIG_PASSWORD).map_err(Report::new)?;

        Ok(Self {
            username: Secret::new(username.to_string()),
            password: Secret::new(password.to_string()),
            txn_type: service.txn_type(),
            currency: service.currency_code().map_err(Report::new)?,
            amount: service.amount(),
            return_url: service.return_url()?.to_string(),
            extra: service.additional_config().clone(),
        })
    }
}

impl GetTransactionIdRequest {
    pub fn to_soap_xml(&self) -> String {
        self.render(true)
    }

    /// Same envelope with the password masked, for error diagnostics.
    pub fn diagnostic_string(&self) -> String {
        self.render(false)
    }

    fn render(&self, expose_password: bool) -> String {
        let tran_detail = TranDetailXml {
            txn_type: self.txn_type.to_string(),
            currency: &self.currency,
            amount: &self.amount,
            return_url: &self.return_url,
        };
        let mut tran_detail = quick_xml::se::to_string(&tran_detail)
            .unwrap_or_else(|_| String::from("<tranDetail/>"));
        if !self.extra.is_empty() {
            let extras: String = self
                .extra
                .iter()
                .map(|(key, value)| format!("<{key}>{}</{key}>", escape_xml_text(value)))
                .collect();
            tran_detail = tran_detail.replace("</tranDetail>", &format!("{extras}</tranDetail>"));
        }

        let password = if expose_password {
            escape_xml_text(self.password.expose_secret())
        } else {
            MASKED.to_string()
        };

        format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><GetTransactionId xmlns="{SOAP_NAMESPACE}"><username>{username}</username><password>{password}</password>{tran_detail}</GetTransactionId></soap:Body></soap:Envelope>"#,
            username = escape_xml_text(self.username.expose_secret()),
        )
    }
}

/// Outgoing `GetTransaction` status query.
#[derive(Debug)]
pub struct GetTransactionRequest {
    pub username: Secret<String>,
    pub password: Secret<String>,
    pub transaction_id: String,
}

impl GetTransactionRequest {
    pub(super) fn new(service: &PxFusion, transaction_id: &str) -> Result<Self, ConfigurationError> {
        Ok(Self {
            username: Secret::new(service.config().require(CONFIG_USERNAME)?.to_string()),
            password: Secret::new(service.config().require(CONFIG_PASSWORD)?.to_string()),
            transaction_id: transaction_id.to_string(),
        })
    }

    pub fn to_soap_xml(&self) -> String {
        self.render(true)
    }

    pub fn diagnostic_string(&self) -> String {
        self.render(false)
    }

    fn render(&self, expose_password: bool) -> String {
        let password = if expose_password {
            escape_xml_text(self.password.expose_secret())
        } else {
            MASKED.to_string()
        };
        format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><GetTransaction xmlns="{SOAP_NAMESPACE}"><username>{username}</username><password>{password}</password><transactionId>{transaction_id}</transactionId></GetTransaction></soap:Body></soap:Envelope>"#,
            username = escape_xml_text(self.username.expose_secret()),
            transaction_id = escape_xml_text(&self.transaction_id),
        )
    }
}

// Response structs assume namespace prefixes were stripped before parsing.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetTransactionIdEnvelope {
    pub body: GetTransactionIdBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetTransactionIdBody {
    pub get_transaction_id_response: GetTransactionIdResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetTransactionIdResponse {
    pub get_transaction_id_result: Option<GetTransactionIdResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionIdResult {
    pub session_id: Option<String>,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetTransactionEnvelope {
    pub body: GetTransactionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetTransactionBody {
    pub get_transaction_response: GetTransactionResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetTransactionResponse {
    pub get_transaction_result: Option<TransactionResult>,
}

/// Result payload of a `GetTransaction` query, passed through field-for-field
/// into the [`PaymentResponse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub status: u8,
    pub amount: Option<String>,
    pub auth_code: Option<String>,
    pub billing_id: Option<String>,
    pub card_holder_name: Option<String>,
    pub card_name: Option<String>,
    pub client_info: Option<String>,
    pub currency_id: Option<String>,
    pub currency_name: Option<String>,
    pub dps_billing_id: Option<String>,
    pub dps_txn_ref: Option<String>,
    pub merchant_reference: Option<String>,
    pub response_text: Option<String>,
    pub txn_data1: Option<String>,
    pub txn_data2: Option<String>,
    pub txn_data3: Option<String>,
    pub txn_ref: Option<String>,
    pub txn_type: Option<String>,
}

pub(crate) struct FusionCheckContext<'a> {
    pub result: &'a TransactionResult,
    pub translator: &'a StatusTranslator,
    pub raw_response: &'a str,
}

impl From<FusionCheckContext<'_>> for PaymentResponse {
    fn from(context: FusionCheckContext<'_>) -> Self {
        let result = context.result;
        let (status, table_message) = context.translator.translate(result.status);
        let message = table_message
            .map(str::to_string)
            .or_else(|| result.response_text.clone())
            .unwrap_or_default();

        Self {
            status,
            currency_code: result.currency_name.clone().or_else(|| result.currency_id.clone()),
            message,
            amount: result.amount.clone(),
            client_ip: result.client_info.clone(),
            transaction_type: result
                .txn_type
                .as_deref()
                .and_then(|txn_type| txn_type.parse().ok()),
            merchant_reference: result.merchant_reference.clone(),
            transaction_reference: result.dps_txn_ref.clone().or_else(|| result.txn_ref.clone()),
            auth_code: result.auth_code.clone(),
            xml_response: context.raw_response.to_string(),
            billing_id: result.billing_id.clone().or_else(|| result.dps_billing_id.clone()),
            help_text: None,
            response_code: Some(result.status.to_string()),
            settlement_date: None,
            parent_reference: None,
        }
    }
}
