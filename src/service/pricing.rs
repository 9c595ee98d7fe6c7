//! Pricing derivation for a quote.
//!
//! Every derived field of [`Pricing`] is overwritten from its inputs; nothing
//! a caller writes into `subtotal`, `total_*`, `final_total` or the per-line
//! amounts survives a recalculation.

use crate::model::quote::{DiscountRule, Pricing};

/// Recompute line totals and aggregates in place.
pub fn recalculate(pricing: &mut Pricing) {
    for labor in pricing.labor_costs.iter_mut() {
        labor.total_amount = labor.hours * labor.hourly_rate;
    }
    for material in pricing.materials.iter_mut() {
        material.total_price = material.quantity * material.unit_price;
    }

    let labor_total: f64 = pricing.labor_costs.iter().map(|l| l.total_amount).sum();
    let materials_total: f64 = pricing.materials.iter().map(|m| m.total_price).sum();
    let fees_total: f64 = pricing.additional_fees.iter().map(|f| f.amount).sum();
    pricing.subtotal = pricing.base_price.amount + labor_total + materials_total + fees_total;

    let subtotal = pricing.subtotal;
    for discount in pricing.discounts.iter_mut() {
        discount.amount = match discount.rule {
            DiscountRule::Percentage { value } => subtotal * value / 100.0,
            DiscountRule::Fixed { value } => value,
        };
    }
    pricing.total_discounts = pricing.discounts.iter().map(|d| d.amount).sum();

    let taxable = pricing.subtotal - pricing.total_discounts;
    for tax in pricing.taxes.iter_mut() {
        tax.amount = taxable * tax.rate / 100.0;
    }
    pricing.total_taxes = pricing.taxes.iter().map(|t| t.amount).sum();

    pricing.final_total = taxable + pricing.total_taxes;
}

/// Cost of materials plus labor, as last derived.
pub fn direct_costs(pricing: &Pricing) -> f64 {
    let materials: f64 = pricing.materials.iter().map(|m| m.total_price).sum();
    let labor: f64 = pricing.labor_costs.iter().map(|l| l.total_amount).sum();
    materials + labor
}

/// Margin over direct costs as a percentage of the final total; 0 when the
/// final total is 0.
pub fn profit_margin(pricing: &Pricing) -> f64 {
    if pricing.final_total == 0.0 {
        return 0.0;
    }
    (pricing.final_total - direct_costs(pricing)) / pricing.final_total * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::quote::{AdditionalFee, BasePrice, Discount, LaborCost, Material, Tax};

    const EPS: f64 = 0.01;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < EPS, "expected {expected}, got {actual}");
    }

    fn worked_example() -> Pricing {
        Pricing {
            base_price: BasePrice { amount: 100.0, description: None },
            labor_costs: vec![LaborCost {
                description: "Install".to_string(),
                hours: 2.0,
                hourly_rate: 20.0,
                total_amount: 0.0,
            }],
            materials: vec![Material {
                name: "Pipe".to_string(),
                quantity: 3.0,
                unit_price: 10.0,
                unit: None,
                total_price: 0.0,
            }],
            additional_fees: vec![AdditionalFee { name: "Trip".to_string(), amount: 5.0, description: None }],
            discounts: vec![Discount {
                rule: DiscountRule::Percentage { value: 10.0 },
                description: None,
                amount: 0.0,
            }],
            taxes: vec![Tax { name: "Sales".to_string(), rate: 8.0, amount: 0.0 }],
            ..Pricing::default()
        }
    }

    #[test]
    fn test_worked_example() {
        let mut pricing = worked_example();
        recalculate(&mut pricing);

        assert_close(pricing.labor_costs[0].total_amount, 40.0);
        assert_close(pricing.materials[0].total_price, 30.0);
        assert_close(pricing.subtotal, 175.0);
        assert_close(pricing.discounts[0].amount, 17.5);
        assert_close(pricing.total_discounts, 17.5);
        assert_close(pricing.taxes[0].amount, 12.6);
        assert_close(pricing.total_taxes, 12.6);
        assert_close(pricing.final_total, 170.1);
    }

    #[test]
    fn test_caller_supplied_totals_are_overwritten() {
        let mut pricing = worked_example();
        pricing.subtotal = 1.0;
        pricing.final_total = 99999.0;
        pricing.labor_costs[0].total_amount = 500.0;
        pricing.discounts[0].amount = 3.0;
        recalculate(&mut pricing);

        assert_close(pricing.subtotal, 175.0);
        assert_close(pricing.labor_costs[0].total_amount, 40.0);
        assert_close(pricing.discounts[0].amount, 17.5);
        assert_close(pricing.final_total, 170.1);
    }

    #[test]
    fn test_fixed_discount_and_multiple_taxes() {
        let mut pricing = Pricing {
            base_price: BasePrice { amount: 200.0, description: None },
            discounts: vec![
                Discount { rule: DiscountRule::Fixed { value: 20.0 }, description: None, amount: 0.0 },
                Discount { rule: DiscountRule::Percentage { value: 5.0 }, description: None, amount: 0.0 },
            ],
            taxes: vec![
                Tax { name: "State".to_string(), rate: 5.0, amount: 0.0 },
                Tax { name: "City".to_string(), rate: 2.5, amount: 0.0 },
            ],
            ..Pricing::default()
        };
        recalculate(&mut pricing);

        // 20 fixed + 5% of 200
        assert_close(pricing.total_discounts, 30.0);
        // 7.5% of 170
        assert_close(pricing.taxes[0].amount, 8.5);
        assert_close(pricing.taxes[1].amount, 4.25);
        assert_close(pricing.total_taxes, 12.75);
        assert_close(pricing.final_total, 182.75);
    }

    #[test]
    fn test_base_price_only() {
        let mut pricing = Pricing {
            base_price: BasePrice { amount: 80.0, description: None },
            ..Pricing::default()
        };
        recalculate(&mut pricing);
        assert_close(pricing.subtotal, 80.0);
        assert_close(pricing.final_total, 80.0);
        assert_eq!(pricing.total_discounts, 0.0);
        assert_eq!(pricing.total_taxes, 0.0);
    }

    #[test]
    fn test_profit_margin() {
        let mut pricing = worked_example();
        recalculate(&mut pricing);
        // (170.1 - 70) / 170.1 * 100
        assert_close(profit_margin(&pricing), 58.8477);
    }

    #[test]
    fn test_profit_margin_zero_total() {
        let mut pricing = Pricing::default();
        recalculate(&mut pricing);
        assert_eq!(pricing.final_total, 0.0);
        assert_eq!(profit_margin(&pricing), 0.0);
    }
}
