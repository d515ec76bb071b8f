/// Credit packs, in kobo
///
/// Standard packs get a bonus; any other amount converts at 1 credit per
/// 1,000 kobo (₦10), rounding down.

/// (amount in kobo, credits granted)
pub const CREDIT_TIERS: [(i64, i32); 3] = [
    (200_000, 300), // ₦2,000
    (100_000, 120), // ₦1,000
    (50_000, 50),   // ₦500
];

/// Kobo per credit outside the standard packs
pub const KOBO_PER_CREDIT: i64 = 1_000;

pub fn credits_for_amount(amount_kobo: i64) -> i32 {
    CREDIT_TIERS
        .iter()
        .find(|(kobo, _)| *kobo == amount_kobo)
        .map(|(_, credits)| *credits)
        .unwrap_or_else(|| (amount_kobo.max(0) / KOBO_PER_CREDIT).min(i32::MAX as i64) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_packs() {
        assert_eq!(credits_for_amount(200_000), 300);
        assert_eq!(credits_for_amount(100_000), 120);
        assert_eq!(credits_for_amount(50_000), 50);
    }

    #[test]
    fn test_linear_fallback() {
        assert_eq!(credits_for_amount(75_000), 75);
        assert_eq!(credits_for_amount(1_999), 1);
        assert_eq!(credits_for_amount(999), 0);
    }

    #[test]
    fn test_negative_amount_grants_nothing() {
        assert_eq!(credits_for_amount(-50_000), 0);
    }
}
