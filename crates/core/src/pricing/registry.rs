//! Selection registry: resolves priceable widgets from their markup attributes.
//!
//! The registry is purely attribute driven. It is rebuilt from a fresh widget
//! listing on every recompute because third-party form widgets add and remove
//! inputs at runtime.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;
use crate::domain::selection::{
    InputKind, PricingMode, RadioGroupRule, RadioRole, SelectionId, SelectionItem,
};
use crate::pricing::numeric::{format_amount, parse_integer, positive_or, price_or_zero};

pub mod attr {
    pub const DATA_TYPE: &str = "data-type";
    pub const DATA_GROUP: &str = "data-group";
    pub const DATA_PRICE: &str = "data-price";
    pub const DATA_PRICE_GROUP: &str = "data-price-group";
    pub const DATA_PRICING: &str = "data-pricing";
    pub const DATA_MIN_QUANTITY: &str = "data-min-quantity";
    pub const MIN_GUESTS: &str = "min-guests";
    pub const RADIO_GROUP: &str = "radio-group";
    pub const SUMMARY_GROUP: &str = "summary-group";
    pub const TOGGLE_RESET: &str = "toggle-reset";
    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";

    pub const PRICING_ATTRIBUTES: [&str; 8] = [
        DATA_TYPE,
        DATA_GROUP,
        DATA_PRICE,
        DATA_PRICE_GROUP,
        MIN_GUESTS,
        RADIO_GROUP,
        SUMMARY_GROUP,
        TOGGLE_RESET,
    ];
}

const PER_PERSON_TYPES: [&str; 4] = ["beverages", "food", "extras", "reception"];
const RECEPTION_INPUT_NAME: &str = "Empfangspauschale";
const STARTER_TYPE: &str = "starter";
const COMBO_GROUP: &str = "combo";
const FALLBACK_GROUP: &str = "Sonstiges";

/// A checkbox or radio as the page reports it, before any interpretation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWidget {
    pub id: String,
    #[serde(default)]
    pub input_kind: InputKind,
    #[serde(default)]
    pub checked: bool,
    /// Whether the widget is currently rendered inactive.
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub label_name: Option<String>,
    #[serde(default)]
    pub label_price: Option<String>,
    /// Raw value of the widget's quantity field, if it has one.
    #[serde(default)]
    pub quantity_input: Option<String>,
}

impl RawWidget {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str).filter(|value| !value.trim().is_empty())
    }

    fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    fn is_priceable(&self) -> bool {
        attr::PRICING_ATTRIBUTES.iter().any(|key| self.has_attribute(key))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registry {
    pub items: Vec<SelectionItem>,
    pub rules: Vec<RadioGroupRule>,
    /// Reset controls keyed by the input name of the group they reset.
    pub reset_controls: BTreeMap<String, SelectionId>,
}

impl Registry {
    pub fn item(&self, id: &SelectionId) -> Option<&SelectionItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}

pub fn list_selections(widgets: &[RawWidget], settings: &PricingConfig) -> Registry {
    let mut registry = Registry::default();
    let mut rules: BTreeMap<String, RadioGroupRule> = BTreeMap::new();

    for widget in widgets.iter().filter(|widget| widget.is_priceable()) {
        let id = SelectionId(widget.id.clone());

        if widget.has_attribute(attr::TOGGLE_RESET) {
            if let Some(name) = widget.attribute(attr::NAME) {
                registry.reset_controls.insert(name.to_owned(), id.clone());
            }
            if widget.label_name.is_none() {
                continue;
            }
        }

        let item = resolve_item(widget, settings);
        if let Some(role) = &item.radio_role {
            let rule = rules
                .entry(role.key().to_owned())
                .or_insert_with(|| RadioGroupRule { key: role.key().to_owned(), ..Default::default() });
            match role {
                RadioRole::Trigger(_) => rule.triggers.push(id),
                RadioRole::Target(_) => rule.targets.push(id),
            }
        }
        registry.items.push(item);
    }

    qualify_duplicate_names(&mut registry.items);
    registry.rules = rules.into_values().collect();
    registry
}

/// Summary lines are keyed by `(group, name)`, so a repeated label within a
/// group is suffixed with the widget id to keep every priced item listed.
fn qualify_duplicate_names(items: &mut [SelectionItem]) {
    let mut seen = BTreeSet::new();
    for item in items.iter_mut() {
        if !seen.insert((item.group.clone(), item.name.clone())) {
            item.name = format!("{} ({})", item.name, item.id.0);
            seen.insert((item.group.clone(), item.name.clone()));
        }
    }
}

fn resolve_item(widget: &RawWidget, settings: &PricingConfig) -> SelectionItem {
    let radio_role = widget.attribute(attr::RADIO_GROUP).and_then(RadioRole::parse);
    let is_starter = widget.attribute(attr::DATA_TYPE) == Some(STARTER_TYPE)
        || widget.has_attribute(attr::DATA_PRICE_GROUP);
    let pricing_mode = resolve_pricing_mode(widget, is_starter);

    let raw_price = widget
        .attribute(attr::DATA_PRICE)
        .or_else(|| widget.attribute(attr::DATA_PRICE_GROUP))
        .or_else(|| match radio_role.as_ref() {
            Some(RadioRole::Target(_)) => widget.attribute(attr::VALUE),
            _ => None,
        });
    let unit_price = price_or_zero(raw_price);

    let quantity_input = widget.quantity_input.as_deref();
    let quantity = match pricing_mode {
        PricingMode::PerPiece => quantity_input
            .and_then(parse_integer)
            .map(|value| u32::try_from(value.max(0)).unwrap_or(u32::MAX))
            .unwrap_or(0),
        PricingMode::PerPerson | PricingMode::Flat => positive_or(quantity_input, 1),
    };

    let min_quantity = widget
        .attribute(attr::DATA_MIN_QUANTITY)
        .and_then(parse_integer)
        .and_then(|value| u32::try_from(value).ok())
        .or_else(|| is_starter.then_some(settings.starter_min_quantity))
        .filter(|_| pricing_mode == PricingMode::PerPiece);

    let min_guests = widget
        .attribute(attr::MIN_GUESTS)
        .and_then(parse_integer)
        .filter(|value| *value > 0)
        .and_then(|value| u32::try_from(value).ok());

    let price_text = widget
        .label_price
        .clone()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| default_price_text(unit_price, pricing_mode, settings));

    SelectionItem {
        id: SelectionId(widget.id.clone()),
        group: resolve_group(widget),
        name: widget
            .label_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| widget.id.clone()),
        price_text,
        pricing_mode,
        unit_price,
        min_quantity,
        min_guests,
        checked: widget.checked,
        eligible: !widget.disabled,
        quantity,
        input_kind: widget.input_kind,
        input_name: widget.attribute(attr::NAME).map(str::to_owned),
        radio_role,
    }
}

fn resolve_pricing_mode(widget: &RawWidget, is_starter: bool) -> PricingMode {
    if let Some(mode) = widget.attribute(attr::DATA_PRICING).and_then(PricingMode::parse) {
        return mode;
    }

    let data_type = widget.attribute(attr::DATA_TYPE).unwrap_or_default();
    if PER_PERSON_TYPES.contains(&data_type)
        || widget.attribute(attr::NAME) == Some(RECEPTION_INPUT_NAME)
    {
        return PricingMode::PerPerson;
    }
    if is_starter {
        return PricingMode::PerPiece;
    }
    PricingMode::Flat
}

fn resolve_group(widget: &RawWidget) -> String {
    widget
        .attribute(attr::SUMMARY_GROUP)
        .or_else(|| widget.attribute(attr::DATA_GROUP).filter(|group| *group != COMBO_GROUP))
        .or_else(|| widget.attribute(attr::NAME))
        .or_else(|| widget.attribute(attr::DATA_TYPE))
        .unwrap_or(FALLBACK_GROUP)
        .trim()
        .to_owned()
}

fn default_price_text(unit_price: Decimal, mode: PricingMode, settings: &PricingConfig) -> String {
    let amount = format!("{} {}", format_amount(unit_price), settings.currency_symbol);
    match mode {
        PricingMode::PerPerson => format!("{amount} p.P."),
        PricingMode::PerPiece => format!("{amount} / Stk."),
        PricingMode::Flat => amount,
    }
}
