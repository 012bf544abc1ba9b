use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::ValueEnum;
use estimator_core::config::{AppConfig, LoadOptions};
use estimator_core::errors::ApplicationError;
use estimator_mail::{parse_submission, EmailEnvelope, EstimateFormatter, Recipient};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::commands::CommandResult;

const COMMAND: &str = "render";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RecipientArg {
    Customer,
    Owner,
}

impl From<RecipientArg> for Recipient {
    fn from(value: RecipientArg) -> Self {
        match value {
            RecipientArg::Customer => Self::Customer,
            RecipientArg::Owner => Self::Owner,
        }
    }
}

/// Without `--json` the HTML of one envelope is printed (the customer copy
/// unless another recipient is chosen). With `--json` every selected envelope
/// is emitted in the command payload.
pub fn run(
    options: &LoadOptions,
    submission_path: &Path,
    recipient: Option<RecipientArg>,
    json_output: bool,
    correlation_id: &str,
) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2),
    };

    let fields = match load_form(submission_path) {
        Ok(fields) => fields,
        Err(error) => return CommandResult::failure(COMMAND, "input", format!("{error:#}"), 2),
    };

    let envelopes = match compose(&config, &fields, recipient, json_output) {
        Ok(envelopes) => envelopes,
        Err(error) => {
            let interface = error.into_interface(correlation_id);
            warn!(
                event_name = "cli.render.failed",
                correlation_id,
                error = %interface,
                "estimate could not be rendered"
            );
            let error_class = match interface {
                estimator_core::InterfaceError::BadRequest { .. } => "invalid_submission",
                estimator_core::InterfaceError::Internal { .. } => "rendering",
            };
            return CommandResult::failure(
                COMMAND,
                error_class,
                format!("{} ({interface})", interface.user_message()),
                2,
            );
        }
    };

    if !json_output {
        return match envelopes.into_iter().next() {
            Some(envelope) => CommandResult::raw(envelope.html),
            None => CommandResult::failure(COMMAND, "rendering", "no envelope was composed", 1),
        };
    }

    let count = envelopes.len();
    CommandResult::success_with_data(
        COMMAND,
        format!("composed {count} estimate email(s)"),
        Some(json!({ "correlation_id": correlation_id, "envelopes": envelopes })),
    )
}

fn load_form(path: &Path) -> Result<Map<String, Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read submission `{}`", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("submission `{}` is not valid JSON", path.display()))?;
    match value {
        Value::Object(fields) => Ok(fields),
        _ => bail!("submission `{}` must be a JSON object of form fields", path.display()),
    }
}

fn compose(
    config: &AppConfig,
    fields: &Map<String, Value>,
    recipient: Option<RecipientArg>,
    json_output: bool,
) -> Result<Vec<EmailEnvelope>, ApplicationError> {
    let submission = parse_submission(fields, &config.pricing)?;
    let formatter = EstimateFormatter::new(config.mail.clone(), config.pricing.clone())?;
    let generated_at = Utc::now();

    let envelopes = match (recipient, json_output) {
        (Some(recipient), _) => vec![formatter.compose(&submission, recipient.into(), generated_at)?],
        (None, true) => formatter.compose_emails(&submission, generated_at)?,
        (None, false) => vec![formatter.compose(&submission, Recipient::Customer, generated_at)?],
    };
    Ok(envelopes)
}
