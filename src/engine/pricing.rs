use rust_decimal::Decimal;

use crate::model::*;

pub const WEEKLY_TIER_NIGHTS: u32 = 7;
pub const MONTHLY_TIER_NIGHTS: u32 = 30;

/// Tiers are exclusive; the monthly tier wins once both thresholds are met.
pub fn discount_tier(nights: u32) -> DiscountType {
    if nights >= MONTHLY_TIER_NIGHTS {
        DiscountType::Monthly
    } else if nights >= WEEKLY_TIER_NIGHTS {
        DiscountType::Weekly
    } else {
        DiscountType::None
    }
}

/// Price a stay. Discount percentages are clamped to 0..=100 and the discount
/// is rounded to cents, so the total never drops below zero.
pub fn quote(rates: &RoomRates, stay: &DateSpan) -> PriceQuote {
    let nights = u32::try_from(stay.days().max(0)).unwrap_or(u32::MAX);
    let base_price = rates.price_per_night * Decimal::from(nights);
    let discount_type = discount_tier(nights);
    let pct = match discount_type {
        DiscountType::Monthly => rates.monthly_discount_pct,
        DiscountType::Weekly => rates.weekly_discount_pct,
        DiscountType::None => Decimal::ZERO,
    }
    .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

    let discount = (base_price * pct / Decimal::ONE_HUNDRED).round_dp(2);
    PriceQuote {
        nights,
        base_price,
        discount,
        discount_type,
        total_price: (base_price - discount).max(Decimal::ZERO),
    }
}
