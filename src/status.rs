//! The single status-code translation table shared by both DPS connectors.

use std::collections::BTreeMap;

use crate::types::PaymentStatus;

/// Fixed default message table. This is an external contract: the codes and
/// their meanings must be preserved exactly.
const DEFAULT_MESSAGES: [(u8, &str); 7] = [
    (0, "Approved"),
    (1, "Declined"),
    (2, "Declined due to temporary error, please retry"),
    (
        3,
        "There was an error with your transaction, please contact the site admin",
    ),
    (
        4,
        "Transaction result cannot be determined at this time (re-run GetTransaction)",
    ),
    (
        5,
        "Transaction did not proceed due to being attempted after timeout timestamp or having \
         been cancelled by a CancelTransaction call",
    ),
    (
        6,
        "No transaction found (SessionId query failed to return a transaction record - \
         transaction not yet attempted)",
    ),
];

/// Maps DPS numeric status codes to a bounded set of human-readable messages
/// and the internal Accepted/Declined/Error classification.
///
/// The message table can be replaced or patched at runtime (localization,
/// per-site wording) without touching the classification, which is fixed.
#[derive(Debug, Clone)]
pub struct StatusTranslator {
    messages: BTreeMap<u8, String>,
}

impl Default for StatusTranslator {
    fn default() -> Self {
        Self {
            messages: DEFAULT_MESSAGES
                .iter()
                .map(|(code, message)| (*code, (*message).to_string()))
                .collect(),
        }
    }
}

impl StatusTranslator {
    pub fn classify(&self, code: u8) -> PaymentStatus {
        PaymentStatus::from_status_code(code)
    }

    pub fn message(&self, code: u8) -> Option<&str> {
        self.messages.get(&code).map(String::as_str)
    }

    /// Classification plus message in one step. Codes without a table entry
    /// classify as Error and yield no message.
    pub fn translate(&self, code: u8) -> (PaymentStatus, Option<&str>) {
        (self.classify(code), self.message(code))
    }

    /// Replaces the entire message table.
    pub fn set_messages(&mut self, messages: BTreeMap<u8, String>) {
        self.messages = messages;
    }

    /// Patches a single entry.
    pub fn set_message(&mut self, code: u8, message: impl Into<String>) {
        self.messages.insert(code, message.into());
    }

    pub fn messages(&self) -> &BTreeMap<u8, String> {
        &self.messages
    }
}
