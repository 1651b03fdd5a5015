//! Job revenue and discount calculation.
//!
//! Revenue is always derived from scratch: the sum of one charge per assigned
//! device, then the job discount. Nothing is adjusted incrementally, so
//! recomputing on an unchanged device set is idempotent.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::enums::DiscountType;
use crate::errors::CoreError;

/// Largest flat rate or custom price accepted for a single device.
#[must_use]
pub fn max_amount() -> Decimal {
    Decimal::from(1_000_000_000_000_i64)
}

/// Reject negative amounts and amounts above [`max_amount`].
///
/// # Errors
///
/// Returns `CoreError::Validation` naming `label`.
pub fn check_amount(label: &str, value: Decimal) -> Result<Decimal, CoreError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CoreError::Validation(format!(
            "{label} must not be negative, got {value}"
        )));
    }
    if value > max_amount() {
        return Err(CoreError::Validation(format!(
            "{label} must be at most {}, got {value}",
            max_amount()
        )));
    }
    Ok(value)
}

fn overflow(what: &str) -> CoreError {
    CoreError::Validation(format!("{what} is out of range"))
}

/// A validated job discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    value: Decimal,
    kind: DiscountType,
}

impl Discount {
    /// Build a discount, rejecting negative values and percentages above 100.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for out-of-range values.
    pub fn new(value: Decimal, kind: DiscountType) -> Result<Self, CoreError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::Validation(format!(
                "discount must not be negative, got {value}"
            )));
        }
        if kind == DiscountType::Percent && value > Decimal::ONE_HUNDRED {
            return Err(CoreError::Validation(format!(
                "percent discount must be at most 100, got {value}"
            )));
        }
        Ok(Self { value, kind })
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            value: Decimal::ZERO,
            kind: DiscountType::Percent,
        }
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.value
    }

    #[must_use]
    pub const fn kind(&self) -> DiscountType {
        self.kind
    }

    /// Apply to a revenue total. The result is floored at zero and rounded to
    /// cents.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the arithmetic overflows.
    pub fn apply(&self, revenue: Decimal) -> Result<Decimal, CoreError> {
        let discounted = match self.kind {
            DiscountType::Percent => (Decimal::ONE_HUNDRED - self.value)
                .checked_div(Decimal::ONE_HUNDRED)
                .and_then(|factor| revenue.checked_mul(factor)),
            DiscountType::Amount => revenue.checked_sub(self.value),
        }
        .ok_or_else(|| overflow("discounted revenue"))?;
        Ok(discounted
            .max(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// One assigned device as seen by the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub device_id: String,
    /// Product flat rate; zero when the device has no product.
    pub flat_rate: Decimal,
    pub custom_price: Option<Decimal>,
}

/// One charged device in a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueLine {
    pub device_id: String,
    pub flat_rate: Decimal,
    pub custom_price: Option<Decimal>,
    pub charged: Decimal,
}

/// Result of recomputing a job's revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    pub lines: Vec<RevenueLine>,
    pub revenue: Decimal,
    pub discount: Discount,
    pub final_revenue: Decimal,
}

/// The amount charged for one device: the custom price when set and positive,
/// otherwise the product's flat rate.
#[must_use]
pub fn line_price(flat_rate: Decimal, custom_price: Option<Decimal>) -> Decimal {
    match custom_price {
        Some(price) if price > Decimal::ZERO => price,
        _ => flat_rate,
    }
}

/// Recompute `revenue` and `final_revenue` from the full device set.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the total overflows.
pub fn calculate(inputs: &[LineInput], discount: Discount) -> Result<RevenueBreakdown, CoreError> {
    let lines: Vec<RevenueLine> = inputs
        .iter()
        .map(|input| RevenueLine {
            device_id: input.device_id.clone(),
            flat_rate: input.flat_rate,
            custom_price: input.custom_price,
            charged: line_price(input.flat_rate, input.custom_price),
        })
        .collect();
    let revenue = lines
        .iter()
        .try_fold(Decimal::ZERO, |total, l| total.checked_add(l.charged))
        .ok_or_else(|| overflow("job revenue"))?;
    Ok(RevenueBreakdown {
        final_revenue: discount.apply(revenue)?,
        revenue,
        discount,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn line(id: &str, rate: i64, custom: Option<i64>) -> LineInput {
        LineInput {
            device_id: id.into(),
            flat_rate: Decimal::from(rate),
            custom_price: custom.map(Decimal::from),
        }
    }

    #[test]
    fn custom_price_overrides_flat_rate_only_when_positive() {
        assert_eq!(line_price(Decimal::from(100), Some(Decimal::from(50))), Decimal::from(50));
        assert_eq!(line_price(Decimal::from(100), Some(Decimal::ZERO)), Decimal::from(100));
        assert_eq!(line_price(Decimal::from(100), Some(Decimal::from(-5))), Decimal::from(100));
        assert_eq!(line_price(Decimal::from(100), None), Decimal::from(100));
    }

    #[test]
    fn percent_discount() {
        let discount = Discount::new(Decimal::from(10), DiscountType::Percent).unwrap();
        let breakdown =
            calculate(&[line("dev-1", 100, None), line("dev-2", 0, Some(50))], discount).unwrap();
        assert_eq!(breakdown.revenue, Decimal::from(150));
        assert_eq!(breakdown.final_revenue, Decimal::new(13500, 2));
        assert_eq!(breakdown.final_revenue, breakdown.revenue * Decimal::new(9, 1));
    }

    #[test]
    fn amount_discount_is_floored_at_zero() {
        let discount = Discount::new(Decimal::from(500), DiscountType::Amount).unwrap();
        let breakdown = calculate(&[line("dev-1", 100, None)], discount).unwrap();
        assert_eq!(breakdown.revenue, Decimal::from(100));
        assert_eq!(breakdown.final_revenue, Decimal::ZERO);
    }

    #[test]
    fn amount_discount_subtracts() {
        let discount = Discount::new(Decimal::from(25), DiscountType::Amount).unwrap();
        let breakdown = calculate(&[line("dev-1", 100, None)], discount).unwrap();
        assert_eq!(breakdown.final_revenue, Decimal::from(75));
    }

    #[test]
    fn recalculation_is_idempotent() {
        let discount = Discount::new(Decimal::new(125, 1), DiscountType::Percent).unwrap();
        let inputs = [line("dev-1", 80, None), line("dev-2", 45, Some(60))];
        let first = calculate(&inputs, discount).unwrap();
        let second = calculate(&inputs, discount).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_job_has_zero_revenue() {
        let breakdown = calculate(&[], Discount::none()).unwrap();
        assert_eq!(breakdown.revenue, Decimal::ZERO);
        assert_eq!(breakdown.final_revenue, Decimal::ZERO);
        assert!(breakdown.lines.is_empty());
    }

    #[test]
    fn rejects_out_of_range_discounts() {
        assert!(Discount::new(Decimal::from(-1), DiscountType::Amount).is_err());
        assert!(Discount::new(Decimal::from(101), DiscountType::Percent).is_err());
        assert!(Discount::new(Decimal::from(101), DiscountType::Amount).is_ok());
        assert!(Discount::new(Decimal::ONE_HUNDRED, DiscountType::Percent).is_ok());
    }

    #[test]
    fn overflowing_total_is_an_error() {
        let huge = LineInput {
            device_id: "dev-1".into(),
            flat_rate: Decimal::MAX,
            custom_price: None,
        };
        let err = calculate(&[huge.clone(), huge], Discount::none()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn largest_single_amount_is_accepted() {
        assert_eq!(check_amount("flat rate", max_amount()).unwrap(), max_amount());
        assert!(check_amount("flat rate", max_amount() + Decimal::ONE).is_err());
        assert!(check_amount("custom price", Decimal::from(-1)).is_err());
        assert_eq!(check_amount("custom price", Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn full_percent_discount_is_free() {
        let discount = Discount::new(Decimal::ONE_HUNDRED, DiscountType::Percent).unwrap();
        let breakdown = calculate(&[line("dev-1", 100, None)], discount).unwrap();
        assert_eq!(breakdown.final_revenue, Decimal::ZERO);
    }
}
