//! Config keys and wire constants for the PXFusion flow.

use crate::config::ConfigSchema;

/// Identifier used when composing the checkout return URL.
pub const IDENTIFIER: &str = "dps_fusion";

pub const CONFIG_TYPE: &str = "Type";
pub const CONFIG_USERNAME: &str = "Username";
pub const CONFIG_PASSWORD: &str = "Password";
pub const CONFIG_WSDL: &str = "Wsdl";

pub const CONFIG_SCHEMA: ConfigSchema = ConfigSchema {
    required: &[CONFIG_TYPE, CONFIG_USERNAME, CONFIG_PASSWORD],
    allowed: &[CONFIG_TYPE, CONFIG_USERNAME, CONFIG_PASSWORD, CONFIG_WSDL],
    url_keys: &[CONFIG_WSDL],
    type_key: Some(CONFIG_TYPE),
};

/// Extra tranDetail fields DPS accepts on GetTransactionId. Anything else is
/// silently dropped.
pub const ALLOWED_ADDITIONAL_CONFIG: &[&str] = &[
    "enableAddBillCard",
    "avsAction",
    "avsPostCode",
    "avsStreetAddress",
    "billingId",
    "dateStart",
    "enableAvsData",
    "enablePaxInfo",
    "merchantReference",
    "paxDateDepart",
    "paxName",
    "paxOrigin",
    "paxTicketNumber",
    "paxTravelAgentInfo",
    "timeout",
    "txnData1",
    "txnData2",
    "txnData3",
];

pub const DEFAULT_ENDPOINT: &str = "https://sec.paymentexpress.com/pxf/pxf.svc";

pub const SOAP_NAMESPACE: &str = "http://paymentexpress.com";
pub const SOAP_ACTION_GET_TRANSACTION_ID: &str = "http://paymentexpress.com/GetTransactionId";
pub const SOAP_ACTION_GET_TRANSACTION: &str = "http://paymentexpress.com/GetTransaction";
