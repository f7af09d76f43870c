// Proportional sell allocation
//
// When a counterparty sells part of the keys they hold of the watched subject,
// the local holder sells the same fraction of the keys it holds of the
// counterparty.

use crate::error::{CoreError, CoreResult};

/// Number of keys the local holder should sell after a counterparty sale.
///
/// * `local_holding` - keys of the counterparty the local holder owns
/// * `counterparty_remaining` - keys the counterparty still holds after the sale
/// * `counterparty_sold` - keys the counterparty just sold
///
/// The result is always within `0..=local_holding`:
/// - nothing was sold, or nothing is held: `0`
/// - the counterparty exited completely: the whole local holding
/// - otherwise the sold fraction of the local holding, rounded up, but never
///   the whole position (one key is kept)
pub fn compute_sell_amount(
    local_holding: u64,
    counterparty_remaining: u64,
    counterparty_sold: u64,
) -> u64 {
    if counterparty_sold == 0 || local_holding == 0 {
        return 0;
    }

    // Full exit: mirror it, the keep-one rule below does not apply
    if counterparty_remaining == 0 {
        return local_holding;
    }

    let prior_holding = counterparty_remaining as u128 + counterparty_sold as u128;
    let fraction = counterparty_sold as f64 / prior_holding as f64;
    let proportional = (fraction * local_holding as f64).ceil();

    // Float rounding can push the product past the holding at large values
    let to_sell = (proportional.min(local_holding as f64) as u64).min(local_holding);

    if to_sell == local_holding {
        return to_sell - 1;
    }

    to_sell
}

/// Same as [`compute_sell_amount`] for callers holding signed values, e.g. raw
/// user input. Negative quantities are rejected instead of clamped.
pub fn checked_sell_amount(
    local_holding: i128,
    counterparty_remaining: i128,
    counterparty_sold: i128,
) -> CoreResult<u64> {
    let local_holding = to_quantity("local holding", local_holding)?;
    let counterparty_remaining = to_quantity("counterparty remaining", counterparty_remaining)?;
    let counterparty_sold = to_quantity("counterparty sold", counterparty_sold)?;

    Ok(compute_sell_amount(
        local_holding,
        counterparty_remaining,
        counterparty_sold,
    ))
}

/// Parse a whole, non-negative key quantity.
pub fn parse_quantity(raw: &str) -> CoreResult<u64> {
    let trimmed = raw.trim();

    if let Ok(value) = trimmed.parse::<i128>() {
        return to_quantity("quantity", value);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Err(CoreError::InvalidInput(format!(
            "quantity must be a whole number of keys, got {}",
            trimmed
        ))),
        _ => Err(CoreError::InvalidInput(format!(
            "quantity is not a number: {:?}",
            trimmed
        ))),
    }
}

fn to_quantity(name: &str, value: i128) -> CoreResult<u64> {
    if value < 0 {
        return Err(CoreError::InvalidInput(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    u64::try_from(value)
        .map_err(|_| CoreError::InvalidInput(format!("{} is too large: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scenarios() {
        // (i_own, trader_holds, trader_sold, expected)
        let cases = [
            (0, 0, 1, 0),    // nothing owned
            (1, 1, 1, 0),    // trader still holds one, keep the last key
            (1, 0, 1, 1),    // trader sold the last one, sell everything
            (10, 0, 2, 10),  // trader sold the last ones, sell everything
            (1, 1, 0, 0),    // nothing sold
            (2, 2, 2, 1),    // 50% of 2 -> 1
            (2, 2, 1, 1),    // 1/3 of 2 = 0.66 -> 1
            (12, 1, 4, 10),  // 4/5 of 12 = 9.6 -> 10
            (5, 1, 11, 4),   // proportionally everything, trader still holds 1
            (5, 2, 10, 4),   // proportionally everything, trader still holds 2
            (5, 4, 8, 4),    // 8/12 of 5 = 3.33 -> 4
        ];

        for (local, remaining, sold, expected) in cases {
            assert_eq!(
                compute_sell_amount(local, remaining, sold),
                expected,
                "local={} remaining={} sold={}",
                local,
                remaining,
                sold
            );
        }
    }

    #[test]
    fn ceiling_applies_to_the_float_product() {
        // 7/100 * 100 evaluates to 7.000000000000001 in f64, so the ceiling is 8
        assert_eq!(compute_sell_amount(100, 93, 7), 8);
        // 1/10 * 10 is exactly 1.0
        assert_eq!(compute_sell_amount(10, 9, 1), 1);
    }

    #[test]
    fn full_exit_skips_keep_one_guard() {
        assert_eq!(compute_sell_amount(1, 0, 5), 1);
        assert_eq!(compute_sell_amount(7, 0, 1), 7);
    }

    #[test]
    fn large_values_do_not_overflow() {
        assert_eq!(compute_sell_amount(u64::MAX, 0, u64::MAX), u64::MAX);
        assert_eq!(compute_sell_amount(u64::MAX, u64::MAX, u64::MAX), u64::MAX / 2 + 1);
        assert_eq!(compute_sell_amount(u64::MAX, 1, u64::MAX), u64::MAX - 1);
    }

    #[test]
    fn checked_rejects_negative_inputs() {
        assert!(matches!(checked_sell_amount(-1, 1, 1), Err(CoreError::InvalidInput(_))));
        assert!(matches!(checked_sell_amount(1, -1, 1), Err(CoreError::InvalidInput(_))));
        assert!(matches!(checked_sell_amount(1, 1, -1), Err(CoreError::InvalidInput(_))));
        assert_eq!(checked_sell_amount(12, 1, 4).unwrap(), 10);
    }

    #[test]
    fn checked_rejects_out_of_range() {
        let too_big = u64::MAX as i128 + 1;
        assert!(matches!(checked_sell_amount(too_big, 1, 1), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn parse_quantity_accepts_whole_numbers() {
        assert_eq!(parse_quantity("0").unwrap(), 0);
        assert_eq!(parse_quantity(" 42 ").unwrap(), 42);
    }

    #[test]
    fn parse_quantity_rejects_fractions_and_negatives() {
        let err = parse_quantity("1.5").unwrap_err();
        assert!(err.to_string().contains("whole number"));

        let err = parse_quantity("-3").unwrap_err();
        assert!(err.to_string().contains("non-negative"));

        assert!(matches!(parse_quantity("abc"), Err(CoreError::InvalidInput(_))));
        assert!(matches!(parse_quantity(""), Err(CoreError::InvalidInput(_))));
    }

    proptest! {
        #[test]
        fn nothing_held_sells_nothing(remaining in 0u64..10_000, sold in 0u64..10_000) {
            prop_assert_eq!(compute_sell_amount(0, remaining, sold), 0);
        }

        #[test]
        fn nothing_sold_sells_nothing(local in 0u64..10_000, remaining in 0u64..10_000) {
            prop_assert_eq!(compute_sell_amount(local, remaining, 0), 0);
        }

        #[test]
        fn full_exit_sells_everything(local in 1u64..10_000, sold in 1u64..10_000) {
            prop_assert_eq!(compute_sell_amount(local, 0, sold), local);
        }

        #[test]
        fn result_is_bounded(local in 0u64..10_000, remaining in 0u64..10_000, sold in 0u64..10_000) {
            let result = compute_sell_amount(local, remaining, sold);
            prop_assert!(result <= local);
        }

        #[test]
        fn partial_exit_keeps_a_key(local in 1u64..10_000, remaining in 1u64..10_000, sold in 0u64..10_000) {
            prop_assert!(compute_sell_amount(local, remaining, sold) < local);
        }

        #[test]
        fn monotonic_in_sold(local in 0u64..10_000, remaining in 0u64..10_000, sold in 0u64..10_000, extra in 0u64..10_000) {
            let smaller = compute_sell_amount(local, remaining, sold);
            let larger = compute_sell_amount(local, remaining, sold + extra);
            prop_assert!(smaller <= larger);
        }
    }
}
