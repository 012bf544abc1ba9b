use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionId(pub String);

impl SelectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Unit price is multiplied by the guest count.
    PerPerson,
    /// Unit price is multiplied by an ordered quantity, raised to the item's floor.
    PerPiece,
    /// Unit price is multiplied by the item's own quantity control.
    Flat,
}

impl PricingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-person" | "person" => Some(Self::PerPerson),
            "per-piece" | "piece" => Some(Self::PerPiece),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Checkbox,
    Radio,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioRole {
    Trigger(String),
    Target(String),
}

impl RadioRole {
    /// Parses `trigger-<key>` / `target-<key>` markup values.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(key) = value.strip_prefix("trigger-") {
            return (!key.is_empty()).then(|| Self::Trigger(key.to_owned()));
        }
        if let Some(key) = value.strip_prefix("target-") {
            return (!key.is_empty()).then(|| Self::Target(key.to_owned()));
        }
        None
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Trigger(key) | Self::Target(key) => key,
        }
    }
}

/// One priceable widget with its metadata resolved from markup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionItem {
    pub id: SelectionId,
    pub group: String,
    pub name: String,
    pub price_text: String,
    pub pricing_mode: PricingMode,
    pub unit_price: Decimal,
    pub min_quantity: Option<u32>,
    pub min_guests: Option<u32>,
    pub checked: bool,
    pub eligible: bool,
    pub quantity: u32,
    pub input_kind: InputKind,
    pub input_name: Option<String>,
    pub radio_role: Option<RadioRole>,
}

impl SelectionItem {
    pub fn is_gated(&self) -> bool {
        self.min_guests.is_some()
    }

    pub fn eligible_for(&self, guest_count: u32) -> bool {
        self.min_guests.map_or(true, |min_guests| guest_count >= min_guests)
    }

    /// Quantity used for pricing; the floor never touches the displayed value.
    pub fn pricing_quantity(&self) -> u32 {
        match self.pricing_mode {
            PricingMode::PerPiece => self.quantity.max(self.min_quantity.unwrap_or(0)),
            PricingMode::PerPerson | PricingMode::Flat => self.quantity,
        }
    }
}

/// A trigger group whose checked state decides whether the target group is priced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioGroupRule {
    pub key: String,
    pub triggers: Vec<SelectionId>,
    pub targets: Vec<SelectionId>,
}

impl RadioGroupRule {
    pub fn trigger_active(&self, items: &[SelectionItem]) -> bool {
        items.iter().any(|item| item.checked && self.triggers.contains(&item.id))
    }
}
