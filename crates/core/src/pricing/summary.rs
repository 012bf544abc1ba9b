//! Summary model: grouped, ordered line items mirroring the current selection.
//!
//! The model only remembers presentation order. Content is reconciled against
//! the freshly read selections on every recompute, so an unchecked item can
//! never survive as a stale entry.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::config::PricingConfig;
use crate::domain::estimate::{EstimateGroups, LineKind, SummaryGroup, SummaryLineItem};
use crate::domain::selection::{InputKind, PricingMode, SelectionId, SelectionItem};
use crate::pricing::accumulator::PricingResult;
use crate::pricing::numeric::saturating_sum;

#[derive(Clone, Debug, PartialEq)]
struct SummaryEntry {
    line: SummaryLineItem,
    /// Radio input name; entries sharing it are mutually exclusive.
    exclusive_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
struct GroupEntries {
    name: String,
    entries: Vec<SummaryEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TotalLine {
    pub label: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryModel {
    groups: Vec<GroupEntries>,
    total_line: Option<TotalLine>,
}

impl SummaryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a line, or updates its price in place when `(group, name)` exists.
    ///
    /// A new radio line first removes the lines sharing its exclusivity key.
    pub fn add_item(&mut self, line: SummaryLineItem, exclusive_key: Option<String>) {
        let group_index = match self.groups.iter().position(|group| group.name == line.group) {
            Some(index) => index,
            None => {
                self.groups.push(GroupEntries { name: line.group.clone(), entries: Vec::new() });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[group_index];

        if let Some(entry) = group.entries.iter_mut().find(|entry| entry.line.name == line.name) {
            entry.line = line;
            entry.exclusive_key = exclusive_key;
            return;
        }

        if let Some(key) = exclusive_key.as_deref() {
            group.entries.retain(|entry| entry.exclusive_key.as_deref() != Some(key));
        }
        group.entries.push(SummaryEntry { line, exclusive_key });
    }

    /// Removes a line; a group left without lines is removed with it.
    pub fn remove_item(&mut self, group: &str, name: &str) {
        let Some(group_index) = self.groups.iter().position(|entries| entries.name == group) else {
            return;
        };

        self.groups[group_index].entries.retain(|entry| entry.line.name != name);
        if self.groups[group_index].entries.is_empty() {
            self.groups.remove(group_index);
        }
    }

    pub fn set_guest_count(&mut self, guest_count: u32, settings: &PricingConfig) {
        self.add_item(
            SummaryLineItem::guest_count(
                &settings.guest_group_label,
                &settings.guest_item_label,
                guest_count,
            ),
            None,
        );
    }

    /// Replaces the trailing total line.
    pub fn refresh_total(&mut self, amount: Decimal, settings: &PricingConfig) {
        self.total_line = Some(TotalLine { label: settings.total_label.clone(), amount });
    }

    /// Brings the model in line with the current selections.
    ///
    /// Line amounts are taken from the pricing trace, so they always add up to
    /// `pricing.total` whichever accumulator produced it.
    pub fn reconcile(
        &mut self,
        items: &[SelectionItem],
        excluded: &BTreeSet<SelectionId>,
        pricing: &PricingResult,
        settings: &PricingConfig,
    ) -> EstimateGroups {
        self.set_guest_count(pricing.guest_count, settings);

        let mut amounts: BTreeMap<&SelectionId, Decimal> = BTreeMap::new();
        for step in &pricing.steps {
            let amount = amounts.entry(&step.item_id).or_insert(Decimal::ZERO);
            *amount = saturating_sum([*amount, step.amount]);
        }

        let wanted: Vec<(SummaryLineItem, Option<String>)> = items
            .iter()
            .filter(|item| item.checked && item.eligible)
            .map(|item| (line_for(item, excluded, &amounts), exclusive_key(item)))
            .collect();

        let stale: Vec<(String, String)> = self
            .groups
            .iter()
            .flat_map(|group| group.entries.iter())
            .filter(|entry| {
                let is_guest_line = entry.line.kind == LineKind::GuestCount
                    && entry.line.group == settings.guest_group_label
                    && entry.line.name == settings.guest_item_label;
                !is_guest_line
                    && !wanted.iter().any(|(line, _)| {
                        line.group == entry.line.group && line.name == entry.line.name
                    })
            })
            .map(|entry| (entry.line.group.clone(), entry.line.name.clone()))
            .collect();
        for (group, name) in stale {
            self.remove_item(&group, &name);
        }

        for (line, key) in wanted {
            self.add_item(line, key);
        }

        self.refresh_total(pricing.total, settings);
        self.groups()
    }

    pub fn groups(&self) -> EstimateGroups {
        EstimateGroups(
            self.groups
                .iter()
                .map(|group| SummaryGroup {
                    name: group.name.clone(),
                    items: group.entries.iter().map(|entry| entry.line.clone()).collect(),
                })
                .collect(),
        )
    }

    /// Always the last element of the rendered summary.
    pub fn total_line(&self) -> Option<&TotalLine> {
        self.total_line.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn exclusive_key(item: &SelectionItem) -> Option<String> {
    match item.input_kind {
        InputKind::Radio => item.input_name.clone(),
        InputKind::Checkbox => None,
    }
}

fn line_for(
    item: &SelectionItem,
    excluded: &BTreeSet<SelectionId>,
    amounts: &BTreeMap<&SelectionId, Decimal>,
) -> SummaryLineItem {
    let contributes = !excluded.contains(&item.id);
    SummaryLineItem {
        group: item.group.clone(),
        name: item.name.clone(),
        price_text: item.price_text.clone(),
        numeric_price: if contributes {
            amounts.get(&item.id).copied().unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        },
        price_per_unit: item.unit_price,
        is_per_person: item.pricing_mode == PricingMode::PerPerson,
        is_per_piece: item.pricing_mode == PricingMode::PerPiece,
        quantity: item.pricing_quantity(),
        kind: LineKind::Selection,
        contributes,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rust_decimal::Decimal;

    use super::SummaryModel;
    use crate::config::PricingConfig;
    use crate::domain::estimate::{LineKind, SummaryLineItem};
    use crate::domain::selection::{InputKind, PricingMode, SelectionId, SelectionItem};
    use crate::pricing::accumulator::{price_with_trace, PricingResult, PricingTraceStep};

    fn line(group: &str, name: &str, price: &str) -> SummaryLineItem {
        SummaryLineItem {
            group: group.to_owned(),
            name: name.to_owned(),
            price_text: price.to_owned(),
            numeric_price: Decimal::ZERO,
            price_per_unit: Decimal::ZERO,
            is_per_person: false,
            is_per_piece: false,
            quantity: 1,
            kind: LineKind::Selection,
            contributes: true,
        }
    }

    fn radio(id: &str, checked: bool) -> SelectionItem {
        SelectionItem {
            id: SelectionId(id.to_owned()),
            group: "Getränke".to_owned(),
            name: id.to_owned(),
            price_text: "12,00 €".to_owned(),
            pricing_mode: PricingMode::PerPerson,
            unit_price: Decimal::new(12, 0),
            min_quantity: None,
            min_guests: None,
            checked,
            eligible: true,
            quantity: 1,
            input_kind: InputKind::Radio,
            input_name: Some("drink".to_owned()),
            radio_role: None,
        }
    }

    fn unpriced(guest_count: u32) -> PricingResult {
        PricingResult { guest_count, ..PricingResult::default() }
    }

    fn names(model: &SummaryModel, group: &str) -> Vec<String> {
        model
            .groups()
            .get(group)
            .map(|group| group.items.iter().map(|item| item.name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn updating_existing_line_preserves_position() {
        let mut model = SummaryModel::new();
        model.add_item(line("Extras", "Deko", "50 €"), None);
        model.add_item(line("Extras", "Fotobox", "300 €"), None);
        model.add_item(line("Extras", "Deko", "75 €"), None);

        let groups = model.groups();
        let extras = groups.get("Extras").expect("extras group");
        assert_eq!(extras.items[0].name, "Deko");
        assert_eq!(extras.items[0].price_text, "75 €");
        assert_eq!(extras.items.len(), 2);
    }

    #[test]
    fn removing_last_line_drops_the_group() {
        let mut model = SummaryModel::new();
        model.add_item(line("Extras", "Deko", "50 €"), None);
        model.remove_item("Extras", "Deko");
        model.remove_item("Unbekannt", "Nichts");

        assert!(model.is_empty());
    }

    #[test]
    fn new_radio_option_replaces_previous_one() {
        let settings = PricingConfig::default();
        let excluded = BTreeSet::new();
        let mut model = SummaryModel::new();

        let mut items = vec![radio("Softdrinks", true), radio("Weinpaket", false)];
        model.reconcile(&items, &excluded, &price_with_trace(&items, 80, &[]), &settings);
        assert_eq!(names(&model, "Getränke"), vec!["Softdrinks"]);

        items[0].checked = false;
        items[1].checked = true;
        model.reconcile(&items, &excluded, &price_with_trace(&items, 80, &[]), &settings);
        assert_eq!(names(&model, "Getränke"), vec!["Weinpaket"]);
    }

    #[test]
    fn exclusive_insert_clears_prior_radio_entries_directly() {
        let mut model = SummaryModel::new();
        model.add_item(line("Getränke", "Softdrinks", "12 €"), Some("drink".to_owned()));
        model.add_item(line("Getränke", "Sekt", "5 €"), None);
        model.add_item(line("Getränke", "Weinpaket", "18 €"), Some("drink".to_owned()));

        assert_eq!(names(&model, "Getränke"), vec!["Sekt", "Weinpaket"]);
    }

    #[test]
    fn guest_line_is_always_present_and_updated() {
        let settings = PricingConfig::default();
        let mut model = SummaryModel::new();

        model.reconcile(&[], &BTreeSet::new(), &unpriced(40), &settings);
        model.reconcile(&[], &BTreeSet::new(), &unpriced(85), &settings);

        let groups = model.groups();
        let guests = groups.get("Gäste").expect("guest group");
        assert_eq!(guests.items.len(), 1);
        assert_eq!(guests.items[0].name, "Anzahl der Gäste");
        assert_eq!(guests.items[0].price_text, "85");
        assert_eq!(guests.items[0].kind, LineKind::GuestCount);
    }

    #[test]
    fn total_line_tracks_latest_amount() {
        let settings = PricingConfig::default();
        let mut model = SummaryModel::new();

        let checked = [radio("Softdrinks", true)];
        let unchecked = [radio("Softdrinks", false)];
        model.reconcile(&checked, &BTreeSet::new(), &price_with_trace(&checked, 80, &[]), &settings);
        model.reconcile(&unchecked, &BTreeSet::new(), &price_with_trace(&unchecked, 80, &[]), &settings);

        let total = model.total_line().expect("total line");
        assert_eq!(total.label, "Gesamtpreis");
        assert_eq!(total.amount, Decimal::ZERO);
        assert!(model.groups().get("Getränke").is_none());
    }

    #[test]
    fn excluded_target_is_listed_but_prices_as_zero() {
        let settings = PricingConfig::default();
        let target = radio("Trauung im Garten", true);
        let excluded = BTreeSet::from([target.id.clone()]);
        let mut model = SummaryModel::new();

        let groups = model.reconcile(&[target], &excluded, &unpriced(80), &settings);
        let line = &groups.get("Getränke").expect("group").items[0];
        assert!(!line.contributes);
        assert_eq!(line.numeric_price, Decimal::ZERO);
    }

    #[test]
    fn line_amounts_follow_the_pricing_trace() {
        let settings = PricingConfig::default();
        let items = [radio("Softdrinks", true)];
        let pricing = PricingResult {
            guest_count: 80,
            total: Decimal::new(480, 0),
            steps: vec![PricingTraceStep {
                item_id: SelectionId("Softdrinks".to_owned()),
                stage: "discounted".to_owned(),
                detail: "half price".to_owned(),
                amount: Decimal::new(480, 0),
            }],
        };
        let mut model = SummaryModel::new();

        let groups = model.reconcile(&items, &BTreeSet::new(), &pricing, &settings);
        assert_eq!(groups.get("Getränke").expect("group").items[0].numeric_price, Decimal::new(480, 0));
        assert_eq!(model.total_line().expect("total").amount, Decimal::new(480, 0));
    }
}
