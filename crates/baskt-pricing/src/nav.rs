//! Basket NAV recurrence.
//!
//! Each leg moves the NAV in proportion to its price change since the
//! baseline, signed by direction and scaled by weight:
//!
//! ```text
//! contribution_i = (current_i - baseline_i) * sign_i * weight_i * nav / baseline_i
//! new_nav        = max(0, nav + sum(contribution_i) / WEIGHT_PRECISION)
//! ```
//!
//! Valuation fails safe: any arithmetic failure returns the input NAV
//! unchanged instead of an error, so a bad leg cannot halt valuation.

use baskt_core::{Leg, WEIGHT_PRECISION};
use rust_decimal::Decimal;
use tracing::warn;

/// Compute the new NAV of a basket from two snapshots of its legs.
///
/// `baseline` and `current` must list the same assets in the same order.
/// Returns `current_nav` unmodified when they do not, or when any step fails
/// (zero baseline price, overflow).
pub fn compute_basket_nav(baseline: &[Leg], current: &[Leg], current_nav: Decimal) -> Decimal {
    match try_compute(baseline, current, current_nav) {
        Some(nav) => nav,
        None => {
            warn!(
                current_nav = %current_nav,
                legs = baseline.len(),
                "NAV computation failed, keeping previous NAV"
            );
            current_nav
        }
    }
}

fn try_compute(baseline: &[Leg], current: &[Leg], current_nav: Decimal) -> Option<Decimal> {
    if baseline.len() != current.len() {
        return None;
    }

    let mut total = Decimal::ZERO;
    for (base, cur) in baseline.iter().zip(current) {
        if base.asset_id != cur.asset_id {
            return None;
        }
        let base_price = base.baseline_price.inner();
        let delta = cur.baseline_price.inner().checked_sub(base_price)?;
        let contribution = delta
            .checked_mul(base.direction.sign())?
            .checked_mul(base.weight)?
            .checked_mul(current_nav)?
            .checked_div(base_price)?;
        total = total.checked_add(contribution)?;
    }

    let nav = current_nav.checked_add(total.checked_div(WEIGHT_PRECISION)?)?;
    Some(nav.max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use baskt_core::LegDirection;
    use rust_decimal_macros::dec;

    fn leg(asset: &str, weight: Decimal, direction: LegDirection, price: Decimal) -> Leg {
        Leg::new(asset, weight, direction, price)
    }

    #[test]
    fn test_single_long_leg_scales_with_price() {
        let baseline = [leg("BTC", dec!(10000), LegDirection::Long, dec!(100))];
        let current = [leg("BTC", dec!(10000), LegDirection::Long, dec!(110))];
        assert_eq!(compute_basket_nav(&baseline, &current, dec!(1000)), dec!(1100));
    }

    #[test]
    fn test_short_leg_floors_at_zero() {
        let baseline = [leg("BTC", dec!(10000), LegDirection::Short, dec!(100))];
        let current = [leg("BTC", dec!(10000), LegDirection::Short, dec!(10000))];
        assert_eq!(compute_basket_nav(&baseline, &current, dec!(1000)), Decimal::ZERO);
    }

    #[test]
    fn test_opposite_legs_cancel() {
        let baseline = [
            leg("BTC", dec!(5000), LegDirection::Long, dec!(200)),
            leg("ETH", dec!(5000), LegDirection::Short, dec!(50)),
        ];
        let current = [
            leg("BTC", dec!(5000), LegDirection::Long, dec!(220)),
            leg("ETH", dec!(5000), LegDirection::Short, dec!(55)),
        ];
        assert_eq!(compute_basket_nav(&baseline, &current, dec!(1000)), dec!(1000));
    }

    #[test]
    fn test_zero_baseline_returns_input_nav() {
        let baseline = [
            leg("BTC", dec!(5000), LegDirection::Long, dec!(100)),
            leg("ETH", dec!(5000), LegDirection::Long, dec!(0)),
        ];
        let current = [
            leg("BTC", dec!(5000), LegDirection::Long, dec!(150)),
            leg("ETH", dec!(5000), LegDirection::Long, dec!(10)),
        ];
        assert_eq!(compute_basket_nav(&baseline, &current, dec!(1234.5)), dec!(1234.5));
    }

    #[test]
    fn test_mismatched_assets_return_input_nav() {
        let baseline = [leg("BTC", dec!(10000), LegDirection::Long, dec!(100))];
        let current = [leg("SOL", dec!(10000), LegDirection::Long, dec!(120))];
        assert_eq!(compute_basket_nav(&baseline, &current, dec!(500)), dec!(500));
        assert_eq!(compute_basket_nav(&baseline, &[], dec!(500)), dec!(500));
    }

    #[test]
    fn test_partial_weight_leg() {
        // 25% weight, +20% move -> +5% NAV
        let baseline = [leg("BTC", dec!(2500), LegDirection::Long, dec!(100))];
        let current = [leg("BTC", dec!(2500), LegDirection::Long, dec!(120))];
        assert_eq!(compute_basket_nav(&baseline, &current, dec!(1000)), dec!(1050));
    }
}
