// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Exact conversion between display amounts and raw on-ledger units.
//!
//! Assets carry `decimals` in `0..=19`. A display amount must spell out
//! exactly that many fractional digits: `"5.00"` is a valid amount of a
//! 2-decimal asset, `"5"` and `"5.0"` are not. Nothing is rounded.

/// Micro-units per display unit of the native currency.
pub const MICRO_UNITS_PER_UNIT: u64 = 1_000_000;

/// Largest supported number of decimal places.
pub const MAX_DECIMALS: u8 = 19;

/// Errors produced while converting amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount `{0}` is not a plain decimal number")]
    Malformed(String),

    #[error("amount must have exactly {expected} fractional digits, got {found}")]
    DecimalMismatch { expected: u8, found: usize },

    #[error("amount exceeds the representable range")]
    Overflow,

    #[error("decimals must be at most {MAX_DECIMALS}, got {0}")]
    UnsupportedDecimals(u8),
}

fn pow10(decimals: u8) -> Result<u64, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    Ok(10u64.pow(u32::from(decimals)))
}

/// Convert a display amount into raw units (`amount * 10^decimals`).
///
/// # Errors
/// - [`AmountError::DecimalMismatch`] when the fractional digit count is not
///   exactly `decimals`
/// - [`AmountError::Malformed`] for signs, exponents or stray characters
/// - [`AmountError::Overflow`] when the result does not fit in a `u64`
pub fn to_raw_units(amount: &str, decimals: u8) -> Result<u64, AmountError> {
    let scale = pow10(decimals)?;
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (amount, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
        return Err(AmountError::Malformed(amount.to_string()));
    }
    // "5." has a separator but no digits behind it.
    if amount.contains('.') && frac.is_empty() {
        return Err(AmountError::Malformed(amount.to_string()));
    }

    if frac.len() != usize::from(decimals) {
        return Err(AmountError::DecimalMismatch {
            expected: decimals,
            found: frac.len(),
        });
    }

    let whole: u64 = whole.parse().map_err(|_| AmountError::Overflow)?;
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| AmountError::Overflow)?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or(AmountError::Overflow)
}

/// Render raw units as a display amount with exactly `decimals` fractional
/// digits. Inverse of [`to_raw_units`].
pub fn to_display_units(raw: u64, decimals: u8) -> String {
    if decimals == 0 || decimals > MAX_DECIMALS {
        return raw.to_string();
    }
    let scale = 10u64.pow(u32::from(decimals));
    format!(
        "{}.{:0>width$}",
        raw / scale,
        raw % scale,
        width = usize::from(decimals)
    )
}

/// Scale a whole-unit supply into raw units (`total * 10^decimals`).
pub fn scale_supply(total: u64, decimals: u8) -> Result<u64, AmountError> {
    total
        .checked_mul(pow10(decimals)?)
        .ok_or(AmountError::Overflow)
}

/// Format a native micro-unit balance in display units, trimming trailing
/// zeros (`1_500_000` → `"1.5"`).
pub fn format_micro_units(micro: u64) -> String {
    let whole = micro / MICRO_UNITS_PER_UNIT;
    let remainder = micro % MICRO_UNITS_PER_UNIT;
    if remainder == 0 {
        return whole.to_string();
    }
    let frac = format!("{remainder:06}");
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_exact_fraction() {
        assert_eq!(to_raw_units("5.00", 2), Ok(500));
        assert_eq!(to_raw_units("0.01", 2), Ok(1));
        assert_eq!(to_raw_units("12", 0), Ok(12));
        assert_eq!(to_raw_units("1.500000", 6), Ok(1_500_000));
    }

    #[test]
    fn rejects_fewer_or_more_digits() {
        assert_eq!(
            to_raw_units("5", 2),
            Err(AmountError::DecimalMismatch {
                expected: 2,
                found: 0
            })
        );
        assert_eq!(
            to_raw_units("5.001", 2),
            Err(AmountError::DecimalMismatch {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            to_raw_units("5.0", 0),
            Err(AmountError::DecimalMismatch {
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(to_raw_units("", 2), Err(AmountError::Empty));
        assert!(matches!(to_raw_units("-1.00", 2), Err(AmountError::Malformed(_))));
        assert!(matches!(to_raw_units("1e3", 0), Err(AmountError::Malformed(_))));
        assert!(matches!(to_raw_units(".50", 2), Err(AmountError::Malformed(_))));
        assert!(matches!(to_raw_units("5.", 0), Err(AmountError::Malformed(_))));
        assert!(matches!(to_raw_units("1.2.3", 1), Err(AmountError::Malformed(_))));
    }

    #[test]
    fn detects_overflow() {
        assert_eq!(
            to_raw_units("18446744073709551615.0", 1),
            Err(AmountError::Overflow)
        );
        assert_eq!(to_raw_units("1", 20), Err(AmountError::UnsupportedDecimals(20)));
    }

    #[test]
    fn display_round_trips_for_matching_digits() {
        for (amount, decimals) in [
            ("5.00", 2u8),
            ("0.000001", 6),
            ("7", 0),
            ("123.4567890123456789", 16),
            ("1.0000000000000000000", 19),
        ] {
            let raw = to_raw_units(amount, decimals).unwrap();
            assert_eq!(to_display_units(raw, decimals), amount);
        }
    }

    #[test]
    fn scales_supply() {
        assert_eq!(scale_supply(1_000, 2), Ok(100_000));
        assert_eq!(scale_supply(u64::MAX, 1), Err(AmountError::Overflow));
    }

    #[test]
    fn formats_micro_units() {
        assert_eq!(format_micro_units(0), "0");
        assert_eq!(format_micro_units(2_000_000), "2");
        assert_eq!(format_micro_units(1_500_000), "1.5");
        assert_eq!(format_micro_units(1), "0.000001");
    }
}
