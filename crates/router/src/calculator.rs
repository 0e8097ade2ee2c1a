//! Route Calculator
//!
//! Integer-only helpers for slippage minimums and display prices.

use hopswap_core::{Amount, Slippage};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

const BPS_DENOM: u32 = 10_000;

/// Apply slippage tolerance to an amount, rounding down.
///
/// Formula: min = amount * (10000 - bps) / 10000
///
/// Never exceeds `amount`, whatever the slippage.
pub fn apply_slippage(amount: Amount, slippage: Slippage) -> Amount {
    let keep = BPS_DENOM - slippage.clamped_bps();
    let result = BigUint::from(amount) * BigUint::from(keep) / BigUint::from(BPS_DENOM);
    result.to_u128().unwrap_or(0).min(amount)
}

/// Price of one `base` token in `quote` tokens, as a decimal string.
///
/// Formula: price = (quote_amount / 10^quote_decimals) / (base_amount / 10^base_decimals)
///
/// Truncated to `precision` fractional digits, trailing zeros trimmed.
/// Returns `None` when either amount is zero.
pub fn format_price(
    base_amount: Amount,
    base_decimals: u8,
    quote_amount: Amount,
    quote_decimals: u8,
    precision: u32,
) -> Option<String> {
    if base_amount == 0 || quote_amount == 0 {
        return None;
    }

    let ten = BigUint::from(10u32);
    let numerator = BigUint::from(quote_amount)
        * ten.pow(u32::from(base_decimals))
        * ten.pow(precision);
    let denominator = BigUint::from(base_amount) * ten.pow(u32::from(quote_decimals));
    let scaled = numerator / denominator;

    let scale = ten.pow(precision);
    let whole = &scaled / &scale;
    let fraction = &scaled % &scale;

    if precision == 0 || fraction.is_zero() {
        return Some(whole.to_string());
    }

    let digits = format!("{:0>width$}", fraction.to_string(), width = precision as usize);
    Some(format!("{}.{}", whole, digits.trim_end_matches('0')))
}

/// Forward (left priced in right) and reverse (right priced in left) prices
pub fn route_prices(
    spend_amount: Amount,
    spend_decimals: u8,
    receive_amount: Amount,
    receive_decimals: u8,
    precision: u32,
) -> (Option<String>, Option<String>) {
    (
        format_price(
            spend_amount,
            spend_decimals,
            receive_amount,
            receive_decimals,
            precision,
        ),
        format_price(
            receive_amount,
            receive_decimals,
            spend_amount,
            spend_decimals,
            precision,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_slippage_rounds_down() {
        assert_eq!(apply_slippage(980, Slippage::from_bps(50)), 975);
        assert_eq!(apply_slippage(10_000, Slippage::from_bps(100)), 9_900);
        assert_eq!(apply_slippage(1, Slippage::from_bps(1)), 0);
    }

    #[test]
    fn test_apply_slippage_never_exceeds_amount() {
        for bps in [0, 1, 50, 500, 10_000, 50_000] {
            for amount in [0u128, 1, 999, u128::MAX / 3] {
                assert!(apply_slippage(amount, Slippage::from_bps(bps)) <= amount);
            }
        }
        assert_eq!(apply_slippage(940, Slippage::from_bps(0)), 940);
        assert_eq!(apply_slippage(940, Slippage::from_bps(20_000)), 0);
    }

    #[test]
    fn test_apply_slippage_large_amounts() {
        let amount = u128::MAX;
        let min = apply_slippage(amount, Slippage::from_bps(50));
        assert!(min < amount);
        assert!(min > amount / 100 * 99);
    }

    #[test]
    fn test_format_price_same_decimals() {
        assert_eq!(format_price(1_000, 0, 940, 0, 8), Some("0.94".to_string()));
        assert_eq!(format_price(940, 0, 1_000, 0, 4), Some("1.0638".to_string()));
        assert_eq!(format_price(500, 0, 1_000, 0, 8), Some("2".to_string()));
    }

    #[test]
    fn test_format_price_mixed_decimals() {
        // 1.5 of a 9-decimal token for 3 of a 6-decimal token = 2 per unit
        assert_eq!(
            format_price(1_500_000_000, 9, 3_000_000, 6, 8),
            Some("2".to_string())
        );
        assert_eq!(
            format_price(3_000_000, 6, 1_500_000_000, 9, 8),
            Some("0.5".to_string())
        );
    }

    #[test]
    fn test_format_price_zero_amount() {
        assert_eq!(format_price(0, 9, 100, 9, 8), None);
        assert_eq!(format_price(100, 9, 0, 9, 8), None);
    }

    #[test]
    fn test_route_prices_are_inverse() {
        let (forward, reverse) = route_prices(1_000, 0, 500, 0, 6);
        assert_eq!(forward.as_deref(), Some("0.5"));
        assert_eq!(reverse.as_deref(), Some("2"));
    }
}
