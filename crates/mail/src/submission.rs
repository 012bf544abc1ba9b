//! Parsing of submitted estimate forms.
//!
//! Form builders rename fields freely (umlauts get slugged, labels get
//! translated), so every customer field is looked up through a list of aliases.

use estimator_core::config::PricingConfig;
use estimator_core::domain::estimate::EstimateDocument;
use estimator_core::errors::DomainError;
use estimator_core::pricing::numeric::{parse_decimal, positive_or};
use estimator_core::pricing::serialization::SUMMARY_TEXT_FIELD;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const NAME_FIELDS: [&str; 2] = ["Name", "name"];
pub const EMAIL_FIELDS: [&str; 2] = ["Email", "email"];
pub const PHONE_FIELDS: [&str; 3] = ["Telefonnumer", "phone", "Telefon"];
pub const DATE_FIELDS: [&str; 5] = [
    "Wunschtermin-für-Hochzeit",
    "Wunschtermin-f-r-Hochzeit",
    "Wunschtermin-fuer-Hochzeit",
    "date",
    "Date",
];
pub const GUEST_FIELDS: [&str; 4] = ["Gäste", "guests", "number-of-guests", "G-ste"];
pub const ESTIMATE_JSON_FIELDS: [&str; 2] = ["estimate-data-json", "estimate_data_json"];
pub const TOTAL_FIELDS: [&str; 2] = ["total", "data-text-total"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub desired_date: String,
    pub guests: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub customer: CustomerInfo,
    /// Structured estimate, when the form carried a parseable one.
    pub estimate: Option<EstimateDocument>,
    /// Plain-text summary used when no structured estimate is available.
    pub summary_text: String,
    pub total: Decimal,
}

/// Parses a submitted form body.
///
/// The only hard requirement is an email address; everything else degrades to
/// empty strings or the configured default guest count.
pub fn parse_submission(
    fields: &Map<String, Value>,
    settings: &PricingConfig,
) -> Result<Submission, DomainError> {
    let mut customer = CustomerInfo {
        name: first_field(fields, &NAME_FIELDS).unwrap_or_default(),
        email: first_field(fields, &EMAIL_FIELDS).unwrap_or_default(),
        phone: first_field(fields, &PHONE_FIELDS).unwrap_or_default(),
        desired_date: first_field(fields, &DATE_FIELDS).unwrap_or_default(),
        guests: positive_or(
            first_field(fields, &GUEST_FIELDS).as_deref(),
            settings.default_guest_count,
        ),
    };

    if customer.email.trim().is_empty() {
        return Err(DomainError::InvalidSubmission("email is required".to_owned()));
    }

    let estimate = parse_estimate(fields);
    if let Some(document) = &estimate {
        if document.guests > 0 {
            customer.guests = document.guests;
        }
    }

    let total = estimate
        .as_ref()
        .map(|document| document.total)
        .filter(|total| *total > Decimal::ZERO)
        .or_else(|| {
            first_field(fields, &TOTAL_FIELDS)
                .as_deref()
                .and_then(parse_decimal)
                .filter(|total| *total >= Decimal::ZERO)
        })
        .unwrap_or(Decimal::ZERO);

    debug!(
        event_name = "mail.submission.parsed",
        has_estimate = estimate.is_some(),
        guests = customer.guests,
        total = %total,
        "estimate submission parsed"
    );

    Ok(Submission {
        customer,
        estimate,
        summary_text: field(fields, SUMMARY_TEXT_FIELD).unwrap_or_default(),
        total,
    })
}

fn parse_estimate(fields: &Map<String, Value>) -> Option<EstimateDocument> {
    let (key, raw) = ESTIMATE_JSON_FIELDS
        .iter()
        .find_map(|key| fields.get(*key).filter(|value| !is_blank(value)).map(|value| (*key, value)))?;

    let parsed = match raw {
        Value::String(json) => serde_json::from_str::<EstimateDocument>(json),
        other => serde_json::from_value::<EstimateDocument>(other.clone()),
    };

    match parsed {
        Ok(document) => Some(document),
        Err(error) => {
            warn!(
                event_name = "mail.submission.json_unparseable",
                field = key,
                error = %error,
                "structured estimate could not be parsed; falling back to summary text"
            );
            None
        }
    }
}

fn first_field(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| field(fields, alias))
}

fn field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_owned()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(value) => value.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use estimator_core::config::PricingConfig;
    use estimator_core::errors::DomainError;
    use rust_decimal::Decimal;
    use serde_json::{json, Map, Value};

    use super::parse_submission;

    fn form(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("form fixture must be an object"),
        }
    }

    #[test]
    fn resolves_field_aliases() {
        let fields = form(json!({
            "name": "Anna Huber",
            "Email": "anna@example.com",
            "Telefon": "0821 1234",
            "Wunschtermin-f-r-Hochzeit": "2027-06-12",
            "G-ste": "85",
        }));

        let submission = parse_submission(&fields, &PricingConfig::default()).expect("submission");
        assert_eq!(submission.customer.name, "Anna Huber");
        assert_eq!(submission.customer.email, "anna@example.com");
        assert_eq!(submission.customer.phone, "0821 1234");
        assert_eq!(submission.customer.desired_date, "2027-06-12");
        assert_eq!(submission.customer.guests, 85);
        assert!(submission.estimate.is_none());
    }

    #[test]
    fn missing_email_is_rejected() {
        let fields = form(json!({ "Name": "Anna", "Email": "  " }));

        let error = parse_submission(&fields, &PricingConfig::default()).expect_err("must fail");
        assert_eq!(error, DomainError::InvalidSubmission("email is required".to_owned()));
    }

    #[test]
    fn structured_estimate_overrides_guests_and_total() {
        let estimate = json!({
            "guests": 80,
            "total": 960.0,
            "groups": {
                "Getränke": [{
                    "name": "Softdrinks",
                    "priceText": "12,00 € p.P.",
                    "pricePerUnit": 12.0,
                    "isPerPerson": true,
                    "isPerPiece": false,
                    "quantity": 1,
                    "total": 960.0
                }]
            }
        });
        let fields = form(json!({
            "email": "anna@example.com",
            "Gäste": "40",
            "total": "12",
            "estimate-data-json": estimate.to_string(),
        }));

        let submission = parse_submission(&fields, &PricingConfig::default()).expect("submission");
        assert_eq!(submission.customer.guests, 80);
        assert_eq!(submission.total, Decimal::new(960, 0));
        let document = submission.estimate.expect("estimate");
        assert_eq!(document.groups.get("Getränke").expect("group").items[0].name, "Softdrinks");
    }

    #[test]
    fn unparseable_json_falls_back_to_text_and_form_total() {
        let fields = form(json!({
            "email": "anna@example.com",
            "estimate_data_json": "{not json",
            "Angebot": "Getränke\nSoftdrinks: 12,00 €\nGesamtpreis: 120.00",
            "data-text-total": "120.00",
        }));

        let submission = parse_submission(&fields, &PricingConfig::default()).expect("submission");
        assert!(submission.estimate.is_none());
        assert_eq!(submission.total, Decimal::new(12000, 2));
        assert_eq!(submission.customer.guests, 10);
        assert!(submission.summary_text.starts_with("Getränke"));
    }

    #[test]
    fn garbage_guest_and_total_fields_use_defaults() {
        let fields = form(json!({
            "email": "anna@example.com",
            "guests": "viele",
            "total": "n/a",
        }));

        let submission = parse_submission(&fields, &PricingConfig::default()).expect("submission");
        assert_eq!(submission.customer.guests, 10);
        assert_eq!(submission.total, Decimal::ZERO);
    }
}
