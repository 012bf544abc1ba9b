//! HTML estimate rendering and email envelope composition.
//!
//! Dispatch through a transactional mail API is left to the caller; this module
//! only produces fully rendered envelopes.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use estimator_core::config::{MailConfig, PricingConfig};
use estimator_core::domain::estimate::{EstimateDocument, SummaryLineItem};
use estimator_core::errors::ApplicationError;
use estimator_core::pricing::numeric::{format_amount, parse_decimal};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use crate::submission::Submission;

pub const EMAIL_TEMPLATE: &str = "estimate/email.html";
const NOT_PROVIDED: &str = "Nicht angegeben";

/// Register custom Tera filters used by the estimate template.
///
/// - `money`: rounds half away from zero to 2 decimals, e.g. `total | money`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::Number(number) => {
            number.as_f64().and_then(Decimal::from_f64).unwrap_or(Decimal::ZERO)
        }
        tera::Value::String(raw) => parse_decimal(raw).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    };
    Ok(tera::Value::String(format_amount(amount)))
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("no recipient address for {0} email")]
    MissingRecipient(Recipient),
}

impl From<RenderError> for ApplicationError {
    fn from(value: RenderError) -> Self {
        Self::Rendering(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Customer,
    Owner,
}

impl Recipient {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmailEnvelope {
    pub recipient: Recipient,
    pub from: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub name: String,
    pub quantity: String,
    pub price_text: String,
    /// Line amount; `None` renders as a dash.
    pub amount: Option<Decimal>,
    pub emphasized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableGroup {
    pub name: String,
    pub rows: Vec<TableRow>,
}

#[derive(Serialize)]
struct CustomerView<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    desired_date: &'a str,
    guests: u32,
}

#[derive(Serialize)]
struct VenueView<'a> {
    name: &'a str,
    address: &'a str,
    contact: &'a str,
}

pub struct EstimateFormatter {
    tera: Tera,
    mail: MailConfig,
    pricing: PricingConfig,
}

impl EstimateFormatter {
    pub fn new(mail: MailConfig, pricing: PricingConfig) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template(
            EMAIL_TEMPLATE,
            include_str!("../../../templates/estimate/email.html.tera"),
        )
        .map_err(|error| RenderError::Template(error.to_string()))?;

        Ok(Self { tera, mail, pricing })
    }

    pub fn render_html(
        &self,
        submission: &Submission,
        generated_at: DateTime<Utc>,
    ) -> Result<String, RenderError> {
        let customer = &submission.customer;
        let groups = submission
            .estimate
            .as_ref()
            .map(|document| table_groups(document, customer.guests))
            .unwrap_or_default();
        let fallback_lines: Vec<&str> = if submission.estimate.is_none() {
            submission.summary_text.lines().collect()
        } else {
            Vec::new()
        };

        let mut context = Context::new();
        context.insert(
            "customer",
            &CustomerView {
                name: or_placeholder(&customer.name),
                email: or_placeholder(&customer.email),
                phone: or_placeholder(&customer.phone),
                desired_date: or_placeholder(&customer.desired_date),
                guests: customer.guests,
            },
        );
        context.insert("groups", &groups);
        context.insert("fallback_lines", &fallback_lines);
        context.insert("total", &submission.total);
        context.insert("total_label", &self.pricing.total_label);
        context.insert("currency", &self.pricing.currency_symbol);
        context.insert(
            "venue",
            &VenueView {
                name: &self.mail.venue_name,
                address: &self.mail.venue_address,
                contact: &self.mail.venue_contact,
            },
        );
        context.insert("generated_at", &generated_at.format("%d.%m.%Y %H:%M UTC").to_string());

        self.tera
            .render(EMAIL_TEMPLATE, &context)
            .map_err(|error| RenderError::Template(error.to_string()))
    }

    pub fn compose(
        &self,
        submission: &Submission,
        recipient: Recipient,
        generated_at: DateTime<Utc>,
    ) -> Result<EmailEnvelope, RenderError> {
        let customer = &submission.customer;
        let (to, reply_to, subject) = match recipient {
            Recipient::Customer => (
                customer.email.clone(),
                None,
                format!(
                    "Ihr Hochzeits-Angebot / Your Wedding Estimate - {}",
                    non_empty(&customer.name).unwrap_or("Hochzeit")
                ),
            ),
            Recipient::Owner => (
                self.mail.owner_email.clone(),
                Some(customer.email.clone()),
                format!(
                    "Neue Hochzeitsanfrage von {}",
                    non_empty(&customer.name).unwrap_or("Unbekannt")
                ),
            ),
        };
        if to.trim().is_empty() {
            return Err(RenderError::MissingRecipient(recipient));
        }

        let html = self.render_html(submission, generated_at)?;
        info!(
            event_name = "mail.envelope.composed",
            recipient = recipient.as_str(),
            has_estimate = submission.estimate.is_some(),
            "estimate email composed"
        );

        Ok(EmailEnvelope {
            recipient,
            from: self.mail.from_email.clone(),
            to,
            reply_to,
            subject,
            html,
        })
    }

    /// Customer copy first, then the owner notification.
    pub fn compose_emails(
        &self,
        submission: &Submission,
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<EmailEnvelope>, RenderError> {
        [Recipient::Customer, Recipient::Owner]
            .into_iter()
            .map(|recipient| self.compose(submission, recipient, generated_at))
            .collect()
    }
}

/// Builds the priced table from a structured estimate. Empty groups are skipped.
pub fn table_groups(document: &EstimateDocument, guests: u32) -> Vec<TableGroup> {
    document
        .groups
        .iter()
        .filter(|group| !group.items.is_empty())
        .map(|group| TableGroup {
            name: group.name.clone(),
            rows: group.items.iter().map(|line| table_row(line, guests)).collect(),
        })
        .collect()
}

fn table_row(line: &SummaryLineItem, guests: u32) -> TableRow {
    let price_text =
        if line.price_text.trim().is_empty() { "-".to_owned() } else { line.price_text.clone() };

    if line.is_guest_count() {
        return TableRow {
            name: line.name.clone(),
            quantity: line.numeric_price.trunc().normalize().to_string(),
            price_text,
            amount: None,
            emphasized: false,
        };
    }

    let amount = line.derived_total(guests);
    let quantity = if line.is_per_person { guests } else { line.quantity };
    TableRow {
        name: line.name.clone(),
        quantity: quantity.to_string(),
        price_text,
        amount: (amount > Decimal::ZERO).then_some(amount),
        emphasized: amount > Decimal::ZERO,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

fn or_placeholder(value: &str) -> &str {
    non_empty(value).unwrap_or(NOT_PROVIDED)
}
