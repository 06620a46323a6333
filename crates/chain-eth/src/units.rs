//! Decimal string <-> base-unit conversion for 6/8/18-decimal assets.
//!
//! All arithmetic is done on the digit string and `U256`; floating point is
//! never involved.

use alloy_primitives::U256;

use crate::error::EthError;

/// 1 Gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// 1 ether in wei.
pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// Largest decimals value accepted (10^77 is the first power of ten past U256).
pub const MAX_DECIMALS: u8 = 76;

/// Parses a human amount such as `"1.5"` into base units (`amount * 10^decimals`).
///
/// Excess fractional digits are rounded half-up on the first dropped digit.
/// Negative values, exponents, empty strings and overflow are rejected.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, EthError> {
    if decimals > MAX_DECIMALS {
        return Err(EthError::InvalidAmount(format!(
            "decimals {decimals} exceeds {MAX_DECIMALS}"
        )));
    }

    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(EthError::InvalidAmount("amount must not be negative".into()));
    }
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(EthError::InvalidAmount(format!("'{amount}' is not a number")));
    }
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !digits(int_part) || !digits(frac_part) {
        return Err(EthError::InvalidAmount(format!("'{amount}' is not a number")));
    }

    let decimals = usize::from(decimals);
    let (kept, round_up) = if frac_part.len() > decimals {
        let round_up = frac_part.as_bytes()[decimals] >= b'5';
        (&frac_part[..decimals], round_up)
    } else {
        (frac_part, false)
    };

    let mut digits = String::with_capacity(int_part.len() + decimals);
    digits.push_str(int_part);
    digits.push_str(kept);
    for _ in kept.len()..decimals {
        digits.push('0');
    }

    let digits = digits.trim_start_matches('0');
    let mut value = if digits.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(digits, 10)
            .map_err(|e| EthError::InvalidAmount(format!("'{amount}': {e}")))?
    };

    if round_up {
        value = value
            .checked_add(U256::from(1u8))
            .ok_or_else(|| EthError::InvalidAmount(format!("'{amount}' overflows uint256")))?;
    }

    Ok(value)
}

/// Formats base units as a decimal string with trailing fractional zeros
/// removed (`1500000` at 6 decimals is `"1.5"`).
pub fn format_units(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    let decimals = usize::from(decimals);

    if decimals == 0 {
        return raw;
    }

    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - raw.len() + 1), raw)
    } else {
        raw
    };

    let split = padded.len() - decimals;
    let (int_part, frac_part) = padded.split_at(split);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Parses a Gwei amount string into wei.
pub fn parse_gwei(amount: &str) -> Result<u128, EthError> {
    let wei = parse_units(amount, 9)?;
    u128::try_from(wei).map_err(|_| EthError::InvalidAmount(format!("'{amount}' gwei overflows")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_ether() {
        assert_eq!(parse_units("1", 18).unwrap(), U256::from(ETHER));
        assert_eq!(parse_units("1.5", 18).unwrap(), U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(parse_units("0.000000000000000001", 18).unwrap(), U256::from(1u8));
        assert_eq!(parse_units(".5", 1).unwrap(), U256::from(5u8));
        assert_eq!(parse_units("7.", 2).unwrap(), U256::from(700u16));
    }

    #[test]
    fn parses_six_and_eight_decimals() {
        assert_eq!(parse_units("12.34", 6).unwrap(), U256::from(12_340_000u64));
        assert_eq!(parse_units("0.00000001", 8).unwrap(), U256::from(1u8));
    }

    #[test]
    fn excess_digits_round_half_up() {
        assert_eq!(parse_units("1.2345675", 6).unwrap(), U256::from(1_234_568u64));
        assert_eq!(parse_units("1.2345674", 6).unwrap(), U256::from(1_234_567u64));
        assert_eq!(parse_units("0.0000005", 6).unwrap(), U256::from(1u8));
        assert_eq!(parse_units("0.0000004999", 6).unwrap(), U256::ZERO);
    }

    #[test]
    fn decimal_sum_is_exact() {
        // 0.1 + 0.2 style inputs never pick up binary float error.
        let a = parse_units("0.1", 18).unwrap();
        let b = parse_units("0.2", 18).unwrap();
        assert_eq!(a + b, parse_units("0.3", 18).unwrap());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_units("-1", 18).is_err());
        assert!(parse_units("", 18).is_err());
        assert!(parse_units(".", 18).is_err());
        assert!(parse_units("1e18", 18).is_err());
        assert!(parse_units("1.2.3", 18).is_err());
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("1", 77).is_err());
    }

    #[test]
    fn rejects_uint256_overflow() {
        let too_big = "9".repeat(80);
        assert!(parse_units(&too_big, 0).is_err());
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_units(U256::from(ETHER), 18), "1");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1u8), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(format_units(U256::from(42u8), 0), "42");
    }

    #[test]
    fn parse_then_format_preserves_value() {
        for s in ["0.5", "123.456", "1000000", "0.000001"] {
            assert_eq!(format_units(parse_units(s, 18).unwrap(), 18), s);
        }
    }

    #[test]
    fn gwei_helper() {
        assert_eq!(parse_gwei("1.5").unwrap(), 1_500_000_000);
        assert_eq!(parse_gwei("20").unwrap(), 20 * GWEI);
    }
}
