use rust_decimal::Decimal;
use tracing::warn;

use crate::config::PricingConfig;
use crate::domain::estimate::{EstimateDocument, EstimateGroups};
use crate::pricing::numeric::format_amount;
use crate::pricing::summary::SummaryModel;

/// Hidden form field holding the text rendering.
pub const SUMMARY_TEXT_FIELD: &str = "Angebot";
/// Hidden form field holding the JSON document.
pub const ESTIMATE_JSON_FIELD: &str = "estimate-data-json";

#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEstimate {
    pub document: EstimateDocument,
    pub text: String,
    pub json: String,
    pub total_display: String,
}

pub fn serialize(
    summary: &SummaryModel,
    guest_count: u32,
    total: Decimal,
    settings: &PricingConfig,
) -> SerializedEstimate {
    let document = EstimateDocument { guests: guest_count, total, groups: summary.groups() };
    let text = render_text(&document.groups, &settings.total_label, total);
    let json = serde_json::to_string(&document).unwrap_or_else(|error| {
        warn!(
            event_name = "pricing.serialization.json_failed",
            error = %error,
            "estimate document could not be serialized; writing empty object"
        );
        "{}".to_string()
    });

    SerializedEstimate { document, text, json, total_display: format_amount(total) }
}

/// Group headers followed by `name: price` lines, closed by the total line.
pub fn render_text(groups: &EstimateGroups, total_label: &str, total: Decimal) -> String {
    let mut lines = Vec::new();
    for group in groups.iter() {
        lines.push(group.name.clone());
        for item in &group.items {
            lines.push(format!("{}: {}", item.name, item.price_text));
        }
    }
    lines.push(format!("{total_label}: {}", format_amount(total)));
    lines.join("\n")
}
