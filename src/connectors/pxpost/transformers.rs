//! Wire types for the PXPost XML POST and their conversion into the internal
//! [`PaymentResponse`].

use error_stack::Report;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::constants::{CONFIG_PASSWORD, CONFIG_USERNAME};
use super::PxPost;
use crate::errors::ConfigurationError;
use crate::status::StatusTranslator;
use crate::types::{GatewayTxnType, PaymentResponse};

const MASKED: &str = "****";

#[derive(Debug, Serialize)]
#[serde(rename = "Txn")]
struct TxnXml<'a> {
    #[serde(rename = "PostUsername")]
    post_username: &'a str,
    #[serde(rename = "PostPassword")]
    post_password: &'a str,
    #[serde(rename = "TxnType")]
    txn_type: String,
    #[serde(rename = "Amount")]
    amount: &'a str,
    #[serde(rename = "InputCurrency")]
    input_currency: &'a str,
    #[serde(rename = "MerchantReference", skip_serializing_if = "Option::is_none")]
    merchant_reference: Option<&'a str>,
    #[serde(rename = "TxnId", skip_serializing_if = "Option::is_none")]
    txn_id: Option<&'a str>,
    #[serde(rename = "DpsTxnRef", skip_serializing_if = "Option::is_none")]
    dps_txn_ref: Option<&'a str>,
    #[serde(rename = "BillingId", skip_serializing_if = "Option::is_none")]
    billing_id: Option<&'a str>,
    #[serde(rename = "DpsBillingId", skip_serializing_if = "Option::is_none")]
    dps_billing_id: Option<&'a str>,
    #[serde(rename = "EnableAddBillCard", skip_serializing_if = "Option::is_none")]
    enable_add_bill_card: Option<&'a str>,
    #[serde(rename = "TxnData1", skip_serializing_if = "Option::is_none")]
    txn_data1: Option<&'a str>,
    #[serde(rename = "TxnData2", skip_serializing_if = "Option::is_none")]
    txn_data2: Option<&'a str>,
    #[serde(rename = "TxnData3", skip_serializing_if = "Option::is_none")]
    txn_data3: Option<&'a str>,
}

/// Outgoing PXPost submission, one `<Txn>` document per leg.
#[derive(Debug)]
pub struct PxPostRequest {
    pub username: Secret<String>,
    pub password: Secret<String>,
    pub txn_type: GatewayTxnType,
    pub amount: String,
    pub currency: String,
    pub merchant_reference: Option<String>,
    pub txn_id: Option<String>,
    pub dps_txn_ref: Option<String>,
    pub billing_id: Option<String>,
    pub dps_billing_id: Option<String>,
    pub enable_add_bill_card: Option<String>,
    pub txn_data1: Option<String>,
    pub txn_data2: Option<String>,
    pub txn_data3: Option<String>,
}

impl PxPostRequest {
    pub(super) fn build(
        service: &PxPost,
        txn_type: GatewayTxnType,
    ) -> Result<Self, Report<ConfigurationError>> {
        let username = service.config().require(CONFIG_USERNAME).map_err(Report::new)?;
        let password = service.config().require(CONFIG_PASSWORD).map_err(Report::new)?;
        let extra = |key: &str| service.additional_config().get(key).cloned();

        Ok(Self {
            username: Secret::new(username.to_string()),
            password: Secret::new(password.to_string()),
            txn_type,
            amount: service.amount(),
            currency: service.currency_code().map_err(Report::new)?,
            merchant_reference: extra("MerchantReference"),
            txn_id: extra("TxnId"),
            dps_txn_ref: extra("DpsTxnRef"),
            billing_id: extra("BillingId"),
            dps_billing_id: extra("DpsBillingId"),
            enable_add_bill_card: extra("EnableAddBillCard"),
            txn_data1: extra("TxnData1"),
            txn_data2: extra("TxnData2"),
            txn_data3: extra("TxnData3"),
        })
    }

    pub fn to_xml(&self) -> String {
        self.render(true)
    }

    /// Same document with the password masked, for error diagnostics.
    pub fn diagnostic_string(&self) -> String {
        self.render(false)
    }

    fn render(&self, expose_password: bool) -> String {
        let password = if expose_password {
            self.password.expose_secret().as_str()
        } else {
            MASKED
        };
        let txn = TxnXml {
            post_username: self.username.expose_secret(),
            post_password: password,
            txn_type: self.txn_type.to_string(),
            amount: &self.amount,
            input_currency: &self.currency,
            merchant_reference: self.merchant_reference.as_deref(),
            txn_id: self.txn_id.as_deref(),
            dps_txn_ref: self.dps_txn_ref.as_deref(),
            billing_id: self.billing_id.as_deref(),
            dps_billing_id: self.dps_billing_id.as_deref(),
            enable_add_bill_card: self.enable_add_bill_card.as_deref(),
            txn_data1: self.txn_data1.as_deref(),
            txn_data2: self.txn_data2.as_deref(),
            txn_data3: self.txn_data3.as_deref(),
        };
        quick_xml::se::to_string(&txn).unwrap_or_else(|_| String::from("<Txn/>"))
    }
}

/// PXPost reply document. DPS mirrors several fields at both the root and the
/// inner `Transaction` element; the assembly below prefers the inner copy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PxPostResponse {
    pub transaction: Option<PxPostTransaction>,
    pub re_co: Option<String>,
    pub response_text: Option<String>,
    pub help_text: Option<String>,
    pub success: Option<String>,
    pub dps_txn_ref: Option<String>,
    pub txn_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PxPostTransaction {
    #[serde(rename = "@success")]
    pub success_attr: Option<String>,
    #[serde(rename = "@reco")]
    pub reco_attr: Option<String>,
    #[serde(rename = "@responsetext")]
    pub response_text_attr: Option<String>,
    pub authorized: Option<String>,
    pub re_co: Option<String>,
    pub amount: Option<String>,
    pub currency_name: Option<String>,
    pub txn_type: Option<String>,
    pub card_name: Option<String>,
    pub card_holder_name: Option<String>,
    pub auth_code: Option<String>,
    pub dps_txn_ref: Option<String>,
    pub billing_id: Option<String>,
    pub dps_billing_id: Option<String>,
    pub merchant_reference: Option<String>,
    pub settlement_date: Option<String>,
    pub client_info: Option<String>,
    pub txn_data1: Option<String>,
    pub txn_data2: Option<String>,
    pub txn_data3: Option<String>,
}

impl PxPostResponse {
    /// Whether the gateway reported the leg as successful. The flag lives on
    /// the Transaction element's attribute, with a root-level mirror.
    pub fn succeeded(&self) -> bool {
        let flag = self
            .transaction
            .as_ref()
            .and_then(|txn| txn.success_attr.as_deref())
            .or(self.success.as_deref());
        flag == Some("1")
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

pub(crate) struct PostResponseContext<'a> {
    pub reply: &'a PxPostResponse,
    pub txn: &'a PxPostTransaction,
    pub translator: &'a StatusTranslator,
    pub raw_response: &'a str,
}

impl From<PostResponseContext<'_>> for PaymentResponse {
    fn from(context: PostResponseContext<'_>) -> Self {
        let reply = context.reply;
        let txn = context.txn;

        // PXPost has no numeric status element; the success flag folds onto
        // the shared approved/declined codes.
        let code: u8 = if reply.succeeded() { 0 } else { 1 };
        let (status, table_message) = context.translator.translate(code);
        let message = table_message
            .map(str::to_string)
            .or_else(|| non_empty(&reply.response_text))
            .or_else(|| non_empty(&txn.response_text_attr))
            .unwrap_or_default();

        Self {
            status,
            currency_code: non_empty(&txn.currency_name),
            message,
            amount: non_empty(&txn.amount),
            client_ip: non_empty(&txn.client_info),
            transaction_type: txn
                .txn_type
                .as_deref()
                .and_then(|txn_type| txn_type.parse().ok()),
            merchant_reference: non_empty(&txn.merchant_reference),
            transaction_reference: non_empty(&txn.dps_txn_ref)
                .or_else(|| non_empty(&reply.dps_txn_ref)),
            auth_code: non_empty(&txn.auth_code),
            xml_response: context.raw_response.to_string(),
            billing_id: non_empty(&txn.billing_id).or_else(|| non_empty(&txn.dps_billing_id)),
            help_text: non_empty(&reply.help_text),
            response_code: non_empty(&txn.reco_attr)
                .or_else(|| non_empty(&txn.re_co))
                .or_else(|| non_empty(&reply.re_co)),
            settlement_date: non_empty(&txn.settlement_date),
            parent_reference: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentStatus;
    use crate::utils::XmlExt;

    fn request() -> PxPostRequest {
        PxPostRequest {
            username: Secret::new("TestPost".to_string()),
            password: Secret::new("p0stpass".to_string()),
            txn_type: GatewayTxnType::Purchase,
            amount: "10.00".to_string(),
            currency: "NZD".to_string(),
            merchant_reference: Some("Order-77".to_string()),
            txn_id: None,
            dps_txn_ref: None,
            billing_id: None,
            dps_billing_id: None,
            enable_add_bill_card: None,
            txn_data1: None,
            txn_data2: None,
            txn_data3: None,
        }
    }

    const APPROVED: &str = r#"<Txn><Transaction success="1" reco="00" responsetext="APPROVED"><Authorized>1</Authorized><ReCo>00</ReCo><Amount>10.00</Amount><CurrencyName>NZD</CurrencyName><TxnType>Purchase</TxnType><CardName>Visa</CardName><AuthCode>015921</AuthCode><DpsTxnRef>0000000103f8dc41</DpsTxnRef><BillingId></BillingId><MerchantReference>Order-77</MerchantReference><SettlementDate>20260829</SettlementDate></Transaction><ReCo>00</ReCo><ResponseText>APPROVED</ResponseText><HelpText>Transaction Approved</HelpText><Success>1</Success><DpsTxnRef>0000000103f8dc41</DpsTxnRef></Txn>"#;

    #[test]
    fn txn_document_has_fixed_fields_and_skips_unset_options() {
        let xml = request().to_xml();
        assert!(xml.contains("<PostUsername>TestPost</PostUsername>"));
        assert!(xml.contains("<PostPassword>p0stpass</PostPassword>"));
        assert!(xml.contains("<TxnType>Purchase</TxnType>"));
        assert!(xml.contains("<Amount>10.00</Amount>"));
        assert!(xml.contains("<InputCurrency>NZD</InputCurrency>"));
        assert!(xml.contains("<MerchantReference>Order-77</MerchantReference>"));
        assert!(!xml.contains("DpsTxnRef"));
        assert!(!xml.contains("TxnData1"));
    }

    #[test]
    fn complete_leg_carries_the_dps_txn_ref() {
        let mut complete = request();
        complete.txn_type = GatewayTxnType::Complete;
        complete.dps_txn_ref = Some("0000000103f8dc41".to_string());
        let xml = complete.to_xml();
        assert!(xml.contains("<TxnType>Complete</TxnType>"));
        assert!(xml.contains("<DpsTxnRef>0000000103f8dc41</DpsTxnRef>"));
    }

    #[test]
    fn diagnostic_document_masks_the_password() {
        let diagnostic = request().diagnostic_string();
        assert!(diagnostic.contains("<PostPassword>****</PostPassword>"));
        assert!(!diagnostic.contains("p0stpass"));
    }

    #[test]
    fn approved_reply_maps_to_an_accepted_response() {
        let reply: PxPostResponse = APPROVED.parse_xml().unwrap();
        assert!(reply.succeeded());
        let txn = reply.transaction.clone().unwrap();

        let translator = StatusTranslator::default();
        let response = PaymentResponse::from(PostResponseContext {
            reply: &reply,
            txn: &txn,
            translator: &translator,
            raw_response: APPROVED,
        });

        assert_eq!(response.status(), PaymentStatus::Accepted);
        assert_eq!(response.message(), "Approved");
        assert_eq!(response.response_code(), Some("00"));
        assert_eq!(response.auth_code(), Some("015921"));
        assert_eq!(response.transaction_reference(), Some("0000000103f8dc41"));
        assert_eq!(response.settlement_date(), Some("20260829"));
        assert_eq!(response.help_text(), Some("Transaction Approved"));
        // The empty BillingId element does not survive as an empty string.
        assert_eq!(response.billing_id(), None);
        assert_eq!(response.xml_response(), APPROVED);
    }

    #[test]
    fn declined_reply_maps_to_a_declined_response() {
        let raw = r#"<Txn><Transaction success="0" reco="05" responsetext="DO NOT HONOUR"><Authorized>0</Authorized><Amount>10.00</Amount><CurrencyName>NZD</CurrencyName><TxnType>Purchase</TxnType><DpsTxnRef>0000000103f8dd00</DpsTxnRef></Transaction><ReCo>05</ReCo><ResponseText>DO NOT HONOUR</ResponseText><Success>0</Success></Txn>"#;
        let reply: PxPostResponse = raw.parse_xml().unwrap();
        assert!(!reply.succeeded());
        let txn = reply.transaction.clone().unwrap();

        let translator = StatusTranslator::default();
        let response = PaymentResponse::from(PostResponseContext {
            reply: &reply,
            txn: &txn,
            translator: &translator,
            raw_response: raw,
        });

        assert_eq!(response.status(), PaymentStatus::Declined);
        assert_eq!(response.message(), "Declined");
        assert_eq!(response.response_code(), Some("05"));
    }
}
