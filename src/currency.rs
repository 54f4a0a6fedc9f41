//! Currency support and amount formatting rules for the DPS wire.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::ConfigurationError;

/// Currencies DPS accepts.
pub const SUPPORTED_CURRENCIES: [&str; 22] = [
    "CAD", "CHF", "DKK", "EUR", "FRF", "GBP", "HKD", "JPY", "NZD", "SGD", "THB", "USD", "ZAR",
    "AUD", "WST", "VUV", "TOP", "SBD", "PGK", "MYR", "KWD", "FJD",
];

/// Currencies whose smallest unit has no fractional subdivision on this wire.
pub const CURRENCIES_WITHOUT_CENTS: [&str; 1] = ["JPY"];

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

pub fn is_zero_decimal(code: &str) -> bool {
    CURRENCIES_WITHOUT_CENTS.contains(&code)
}

/// Fails with a [`ConfigurationError`] naming the code when it is outside the
/// supported set.
pub fn validate(code: &str) -> Result<(), ConfigurationError> {
    if is_supported(code) {
        Ok(())
    } else {
        Err(ConfigurationError::UnsupportedCurrency {
            code: code.to_string(),
        })
    }
}

/// Formats an amount for the wire: zero-decimal currencies emit the integer
/// amount with no fractional part, everything else fixed two decimal places.
pub fn format_amount(amount: Decimal, currency_code: &str) -> String {
    if is_zero_decimal(currency_code) {
        amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string()
    } else {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{rounded:.2}")
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn two_decimal_currencies_format_with_exactly_two_digits() {
        assert_eq!(format_amount(dec!(10), "NZD"), "10.00");
        assert_eq!(format_amount(dec!(1), "USD"), "1.00");
        assert_eq!(format_amount(dec!(19.995), "GBP"), "20.00");
    }

    #[test]
    fn zero_decimal_currencies_format_without_a_decimal_point() {
        assert_eq!(format_amount(dec!(1000), "JPY"), "1000");
        assert_eq!(format_amount(dec!(1000.4), "JPY"), "1000");
        assert!(!format_amount(dec!(1000.00), "JPY").contains('.'));
    }

    #[test]
    fn unsupported_currency_is_named_in_the_error() {
        let err = validate("XYZ").unwrap_err();
        assert_eq!(err.to_string(), "the currency XYZ is not supported by DPS");
        assert!(validate("NZD").is_ok());
    }

    #[test]
    fn supported_set_matches_the_dps_contract() {
        assert_eq!(SUPPORTED_CURRENCIES.len(), 22);
        for code in ["USD", "GBP", "EUR", "AUD", "NZD", "JPY"] {
            assert!(is_supported(code));
        }
        assert!(is_zero_decimal("JPY"));
        assert!(!is_zero_decimal("NZD"));
    }
}
