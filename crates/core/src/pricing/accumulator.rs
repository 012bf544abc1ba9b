use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::selection::{PricingMode, RadioGroupRule, SelectionId, SelectionItem};
use crate::pricing::gating::excluded_targets;
use crate::pricing::numeric::{saturating_product, saturating_sum};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub item_id: SelectionId,
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub guest_count: u32,
    pub total: Decimal,
    pub steps: Vec<PricingTraceStep>,
}

pub trait PriceAccumulator {
    fn price(&self, items: &[SelectionItem], guest_count: u32, rules: &[RadioGroupRule])
        -> PricingResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPriceAccumulator;

impl PriceAccumulator for DeterministicPriceAccumulator {
    fn price(
        &self,
        items: &[SelectionItem],
        guest_count: u32,
        rules: &[RadioGroupRule],
    ) -> PricingResult {
        price_with_trace(items, guest_count, rules)
    }
}

/// Amount an item adds when it is priced. Not rounded; clamps at `Decimal::MAX`.
pub fn line_contribution(item: &SelectionItem, guest_count: u32) -> Decimal {
    let quantity = Decimal::from(item.pricing_quantity());
    match item.pricing_mode {
        PricingMode::PerPerson => {
            saturating_product(&[item.unit_price, Decimal::from(guest_count), quantity])
        }
        PricingMode::PerPiece | PricingMode::Flat => saturating_product(&[item.unit_price, quantity]),
    }
}

/// Checked, eligible, and not a target of an inactive trigger.
pub fn is_priced(item: &SelectionItem, excluded: &BTreeSet<SelectionId>) -> bool {
    item.checked && item.eligible && !excluded.contains(&item.id)
}

pub fn compute_total(items: &[SelectionItem], guest_count: u32, rules: &[RadioGroupRule]) -> Decimal {
    let excluded = excluded_targets(items, rules);
    saturating_sum(
        items
            .iter()
            .filter(|item| is_priced(item, &excluded))
            .map(|item| line_contribution(item, guest_count)),
    )
}

pub fn price_with_trace(
    items: &[SelectionItem],
    guest_count: u32,
    rules: &[RadioGroupRule],
) -> PricingResult {
    let excluded = excluded_targets(items, rules);
    let steps: Vec<PricingTraceStep> = items
        .iter()
        .filter(|item| is_priced(item, &excluded))
        .map(|item| PricingTraceStep {
            item_id: item.id.clone(),
            stage: trace_stage(item.pricing_mode).to_string(),
            detail: trace_detail(item, guest_count),
            amount: line_contribution(item, guest_count),
        })
        .collect();

    let total = saturating_sum(steps.iter().map(|step| step.amount));
    PricingResult { guest_count, total, steps }
}

fn trace_stage(mode: PricingMode) -> &'static str {
    match mode {
        PricingMode::PerPerson => "per_person",
        PricingMode::PerPiece => "per_piece",
        PricingMode::Flat => "flat",
    }
}

fn trace_detail(item: &SelectionItem, guest_count: u32) -> String {
    match item.pricing_mode {
        PricingMode::PerPerson => format!(
            "{} x {guest_count} guests x {}",
            item.unit_price,
            item.pricing_quantity()
        ),
        PricingMode::PerPiece if item.pricing_quantity() > item.quantity => format!(
            "{} x max({}, floor {})",
            item.unit_price,
            item.quantity,
            item.pricing_quantity()
        ),
        PricingMode::PerPiece | PricingMode::Flat => {
            format!("{} x {}", item.unit_price, item.pricing_quantity())
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{compute_total, line_contribution, price_with_trace};
    use crate::domain::selection::{
        InputKind, PricingMode, RadioGroupRule, SelectionId, SelectionItem,
    };

    fn item(id: &str, mode: PricingMode, unit_price: Decimal, quantity: u32) -> SelectionItem {
        SelectionItem {
            id: SelectionId(id.to_owned()),
            group: "Getränke".to_owned(),
            name: id.to_owned(),
            price_text: String::new(),
            pricing_mode: mode,
            unit_price,
            min_quantity: None,
            min_guests: None,
            checked: true,
            eligible: true,
            quantity,
            input_kind: InputKind::Checkbox,
            input_name: None,
            radio_role: None,
        }
    }

    #[test]
    fn per_person_package_scales_with_guests() {
        let drinks = item("drinks", PricingMode::PerPerson, Decimal::new(12, 0), 1);
        assert_eq!(compute_total(&[drinks.clone()], 80, &[]), Decimal::new(960, 0));

        let mut unchecked = drinks;
        unchecked.checked = false;
        assert_eq!(compute_total(&[unchecked], 80, &[]), Decimal::ZERO);
    }

    #[test]
    fn starter_floor_raises_pricing_quantity() {
        let mut canape = item("canape", PricingMode::PerPiece, Decimal::new(3, 0), 5);
        canape.min_quantity = Some(20);
        assert_eq!(line_contribution(&canape, 80), Decimal::new(60, 0));
        assert_eq!(canape.quantity, 5, "displayed quantity is untouched");

        canape.quantity = 30;
        assert_eq!(line_contribution(&canape, 80), Decimal::new(90, 0));
    }

    #[test]
    fn combo_items_use_their_own_quantity_independent_of_guests() {
        let cake = item("cake", PricingMode::Flat, Decimal::new(4550, 2), 3);
        assert_eq!(compute_total(&[cake.clone()], 10, &[]), Decimal::new(13650, 2));
        assert_eq!(compute_total(&[cake], 200, &[]), Decimal::new(13650, 2));
    }

    #[test]
    fn ineligible_items_do_not_contribute() {
        let mut band = item("band", PricingMode::Flat, Decimal::new(900, 0), 1);
        band.eligible = false;
        assert_eq!(compute_total(&[band], 120, &[]), Decimal::ZERO);
    }

    #[test]
    fn target_prices_only_while_trigger_checked() {
        let mut trigger = item("ceremony-yes", PricingMode::Flat, Decimal::ZERO, 1);
        trigger.checked = false;
        let target = item("ceremony-deco", PricingMode::Flat, Decimal::new(250, 0), 1);
        let rules = vec![RadioGroupRule {
            key: "1".to_owned(),
            triggers: vec![trigger.id.clone()],
            targets: vec![target.id.clone()],
        }];

        let mut items = vec![trigger, target];
        assert_eq!(compute_total(&items, 50, &rules), Decimal::ZERO);

        items[0].checked = true;
        assert_eq!(compute_total(&items, 50, &rules), Decimal::new(250, 0));
    }

    #[test]
    fn accumulation_keeps_full_precision_until_display() {
        let items: Vec<_> = (0..3)
            .map(|index| {
                item(&format!("a{index}"), PricingMode::Flat, Decimal::new(3335, 3), 1)
            })
            .collect();
        assert_eq!(compute_total(&items, 1, &[]), Decimal::new(10005, 3));
    }

    #[test]
    fn trace_lists_each_priced_line_and_sums_to_total() {
        let mut canape = item("canape", PricingMode::PerPiece, Decimal::new(3, 0), 5);
        canape.min_quantity = Some(20);
        let drinks = item("drinks", PricingMode::PerPerson, Decimal::new(12, 0), 1);

        let result = price_with_trace(&[canape, drinks], 80, &[]);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].stage, "per_piece");
        assert!(result.steps[0].detail.contains("floor 20"));
        assert_eq!(result.total, Decimal::new(1020, 0));
    }

    #[test]
    fn saturated_inputs_clamp_the_total_instead_of_panicking() {
        let package = item("package", PricingMode::PerPerson, Decimal::new(5_000_000_000, 0), u32::MAX);
        let flat = item("band", PricingMode::Flat, Decimal::new(900, 0), 1);

        assert_eq!(line_contribution(&package, u32::MAX), Decimal::MAX);
        assert_eq!(compute_total(&[package.clone(), flat.clone()], u32::MAX, &[]), Decimal::MAX);

        let result = price_with_trace(&[package, flat], u32::MAX, &[]);
        assert_eq!(result.total, Decimal::MAX);
        assert_eq!(result.steps[1].amount, Decimal::new(900, 0));
    }
}
