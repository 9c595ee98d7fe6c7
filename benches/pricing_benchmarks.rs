#![feature(test)]
extern crate test;

use test::Bencher;

use quote_engine::model::quote::{
    AdditionalFee, BasePrice, Discount, DiscountRule, LaborCost, Material, Pricing, Tax,
};
use quote_engine::service::pricing::{profit_margin, recalculate};

fn pricing_with_lines(lines: usize) -> Pricing {
    Pricing {
        base_price: BasePrice { amount: 150.0, description: None },
        labor_costs: (0..lines)
            .map(|i| LaborCost {
                description: format!("Labor {i}"),
                hours: 1.5,
                hourly_rate: 45.0,
                total_amount: 0.0,
            })
            .collect(),
        materials: (0..lines)
            .map(|i| Material {
                name: format!("Part {i}"),
                quantity: 2.0,
                unit_price: 12.5,
                unit: Some("pcs".to_string()),
                total_price: 0.0,
            })
            .collect(),
        additional_fees: vec![AdditionalFee { name: "Trip".to_string(), amount: 25.0, description: None }],
        discounts: vec![
            Discount { rule: DiscountRule::Percentage { value: 10.0 }, description: None, amount: 0.0 },
            Discount { rule: DiscountRule::Fixed { value: 5.0 }, description: None, amount: 0.0 },
        ],
        taxes: vec![
            Tax { name: "State".to_string(), rate: 6.25, amount: 0.0 },
            Tax { name: "City".to_string(), rate: 1.75, amount: 0.0 },
        ],
        ..Pricing::default()
    }
}

/// Benchmark: Recalculate a typical quote (a handful of lines)
#[bench]
fn bench_recalculate_small(b: &mut Bencher) {
    let mut pricing = pricing_with_lines(3);
    b.iter(|| {
        recalculate(&mut pricing);
        test::black_box(pricing.final_total)
    });
}

/// Benchmark: Recalculate a large itemized quote
#[bench]
fn bench_recalculate_large(b: &mut Bencher) {
    let mut pricing = pricing_with_lines(200);
    b.iter(|| {
        recalculate(&mut pricing);
        test::black_box(pricing.final_total)
    });
}

/// Benchmark: Derive profit margin from already computed totals
#[bench]
fn bench_profit_margin(b: &mut Bencher) {
    let mut pricing = pricing_with_lines(50);
    recalculate(&mut pricing);
    b.iter(|| profit_margin(test::black_box(&pricing)));
}
