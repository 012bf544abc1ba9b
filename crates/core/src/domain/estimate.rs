//! Estimate document handed from the calculator page to the estimate formatter.
//!
//! The JSON shape is a contract with the formatter: `groups` is an object keyed by
//! group name whose key order follows the summary, and every line exposes
//! `name`, `priceText`, `pricePerUnit`, `isPerPerson`, `isPerPiece`, `quantity`
//! and `total`.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::pricing::numeric::{saturating_product, saturating_sum};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    #[default]
    Selection,
    /// Synthetic line carrying the guest count; its `total` is the count itself.
    GuestCount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryLineItem {
    #[serde(default)]
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub price_text: String,
    #[serde(rename = "total", default, with = "rust_decimal::serde::float")]
    pub numeric_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price_per_unit: Decimal,
    #[serde(default)]
    pub is_per_person: bool,
    #[serde(default)]
    pub is_per_piece: bool,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub kind: LineKind,
    #[serde(default = "default_contributes")]
    pub contributes: bool,
}

fn default_quantity() -> u32 {
    1
}

fn default_contributes() -> bool {
    true
}

impl SummaryLineItem {
    pub fn guest_count(group: &str, name: &str, guests: u32) -> Self {
        Self {
            group: group.to_owned(),
            name: name.to_owned(),
            price_text: guests.to_string(),
            numeric_price: Decimal::from(guests),
            price_per_unit: Decimal::ZERO,
            is_per_person: false,
            is_per_piece: false,
            quantity: 1,
            kind: LineKind::GuestCount,
            contributes: false,
        }
    }

    /// Documents from older pages carry no `kind`; their guest line is
    /// recognized as an unpriced line whose name mentions the guests.
    pub fn is_guest_count(&self) -> bool {
        self.kind == LineKind::GuestCount
            || (!self.is_per_person
                && !self.is_per_piece
                && self.price_per_unit.is_zero()
                && self.name.contains("Gäste"))
    }

    /// Re-derives the line amount from the per-unit fields.
    ///
    /// Mirrors the accumulator: per-person lines scale with `guests`, per-piece and
    /// flat lines with the serialized pricing quantity. Lines without a unit price
    /// fall back to the precomputed `total`.
    pub fn derived_total(&self, guests: u32) -> Decimal {
        if self.is_guest_count() || !self.contributes {
            return Decimal::ZERO;
        }

        let quantity = Decimal::from(self.quantity);
        if self.is_per_person {
            return saturating_product(&[self.price_per_unit, Decimal::from(guests), quantity]);
        }
        if self.is_per_piece || self.price_per_unit > Decimal::ZERO {
            return saturating_product(&[self.price_per_unit, quantity]);
        }
        self.numeric_price
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryGroup {
    pub name: String,
    pub items: Vec<SummaryLineItem>,
}

/// Groups in summary order. Serialized as a JSON object whose key order is kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EstimateGroups(pub Vec<SummaryGroup>);

impl EstimateGroups {
    pub fn iter(&self) -> impl Iterator<Item = &SummaryGroup> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SummaryGroup> {
        self.0.iter().find(|group| group.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Serialize for EstimateGroups {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in &self.0 {
            map.serialize_entry(&group.name, &group.items)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EstimateGroups {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = EstimateGroups;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object of group name to line items")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut groups = Vec::new();
                while let Some((name, items)) =
                    access.next_entry::<String, Option<Vec<SummaryLineItem>>>()?
                {
                    let mut items = items.unwrap_or_default();
                    if items.is_empty() {
                        continue;
                    }
                    for item in &mut items {
                        if item.group.is_empty() {
                            item.group = name.clone();
                        }
                    }
                    groups.push(SummaryGroup { name, items });
                }
                Ok(EstimateGroups(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateDocument {
    #[serde(default)]
    pub guests: u32,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub groups: EstimateGroups,
}

impl EstimateDocument {
    pub fn lines(&self) -> impl Iterator<Item = &SummaryLineItem> {
        self.groups.iter().flat_map(|group| group.items.iter())
    }

    /// Recomputes the total from the line items alone.
    pub fn recompute_total(&self) -> Decimal {
        saturating_sum(self.lines().map(|line| line.derived_total(self.guests)))
    }
}
