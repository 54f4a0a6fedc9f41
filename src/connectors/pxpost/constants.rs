//! Config keys and wire constants for the PXPost flow.

use crate::config::ConfigSchema;

pub const CONFIG_USERNAME: &str = "Username";
pub const CONFIG_PASSWORD: &str = "Password";
pub const CONFIG_POST_URL: &str = "PostUrl";

pub const CONFIG_SCHEMA: ConfigSchema = ConfigSchema {
    required: &[CONFIG_USERNAME, CONFIG_PASSWORD],
    allowed: &[CONFIG_USERNAME, CONFIG_PASSWORD, CONFIG_POST_URL],
    url_keys: &[CONFIG_POST_URL],
    type_key: None,
};

/// Optional Txn elements DPS accepts on a PXPost submission. Anything else is
/// silently dropped.
pub const ALLOWED_ADDITIONAL_CONFIG: &[&str] = &[
    "BillingId",
    "DpsBillingId",
    "DpsTxnRef",
    "EnableAddBillCard",
    "MerchantReference",
    "TxnData1",
    "TxnData2",
    "TxnData3",
    "TxnId",
];

/// DpsTxnRef key, required before a Complete leg can be submitted.
pub const ADDITIONAL_DPS_TXN_REF: &str = "DpsTxnRef";

pub const DEFAULT_ENDPOINT: &str = "https://sec.paymentexpress.com/pxpost.aspx";
