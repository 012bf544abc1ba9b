use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use estimator_cli::commands::price::OutputFormat;
use estimator_cli::commands::render::RecipientArg;
use estimator_cli::commands::{config, price, render};
use estimator_core::config::LoadOptions;
use serde_json::{json, Value};
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
  "guest_input": "40",
  "widgets": [
    {
      "id": "drink-soft",
      "input_kind": "radio",
      "checked": true,
      "attributes": { "name": "drink", "data-type": "beverages", "data-price": "12", "summary-group": "Getränke" },
      "label_name": "Softdrinks",
      "label_price": "12,00 € p.P."
    },
    {
      "id": "canape",
      "checked": true,
      "attributes": { "data-type": "starter", "data-price-group": "3", "summary-group": "Häppchen" },
      "label_name": "Canapés",
      "quantity_input": "5"
    }
  ]
}"#;

#[test]
fn price_reports_total_and_estimate_document() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let snapshot = write_file(&dir, "page.json", SNAPSHOT);

        let result = price::run(&LoadOptions::default(), &snapshot, OutputFormat::Json, Some(80));
        assert_eq!(result.exit_code, 0, "expected successful pricing run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "price");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["guests"], 80);
        assert_eq!(payload["data"]["total"], "1020.00");
        assert_eq!(payload["data"]["estimate"]["groups"]["Getränke"][0]["name"], "Softdrinks");
        assert_eq!(payload["data"]["estimate"]["groups"]["Gäste"][0]["total"], 80.0);
    });
}

#[test]
fn price_text_format_prints_summary_block() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let snapshot = write_file(&dir, "page.json", SNAPSHOT);

        let result = price::run(&LoadOptions::default(), &snapshot, OutputFormat::Text, None);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("Gäste\nAnzahl der Gäste: 40"));
        assert_eq!(last_line(&result.output), "Gesamtpreis: 540.00");
    });
}

#[test]
fn price_uses_configured_default_when_guest_input_is_missing() {
    with_env(&[("ESTIMATOR_PRICING_DEFAULT_GUEST_COUNT", "25")], || {
        let dir = TempDir::new().expect("tempdir");
        let snapshot = write_file(
            &dir,
            "page.json",
            r#"{ "widgets": [ { "id": "sekt", "checked": true, "attributes": { "data-type": "reception", "data-price": "4" } } ] }"#,
        );

        let result = price::run(&LoadOptions::default(), &snapshot, OutputFormat::Json, None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["guests"], 25);
        assert_eq!(payload["data"]["total"], "100.00");
    });
}

#[test]
fn price_rejects_unreadable_snapshot() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let snapshot = write_file(&dir, "page.json", "not json");

        let result = price::run(&LoadOptions::default(), &snapshot, OutputFormat::Json, None);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "input");
    });
}

#[test]
fn price_returns_config_failure_for_invalid_env() {
    with_env(&[("ESTIMATOR_PRICING_DEFAULT_GUEST_COUNT", "many")], || {
        let dir = TempDir::new().expect("tempdir");
        let snapshot = write_file(&dir, "page.json", SNAPSHOT);

        let result = price::run(&LoadOptions::default(), &snapshot, OutputFormat::Json, None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn render_composes_both_envelopes_as_json() {
    with_env(&[("OWNER_EMAIL", "owner@example.org")], || {
        let dir = TempDir::new().expect("tempdir");
        let submission = write_file(&dir, "form.json", &submission_form().to_string());

        let result = render::run(&LoadOptions::default(), &submission, None, true, "req-1");
        assert_eq!(result.exit_code, 0, "expected envelopes: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "render");
        let envelopes = payload["data"]["envelopes"].as_array().expect("envelopes");
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0]["recipient"], "customer");
        assert_eq!(envelopes[0]["to"], "anna@example.com");
        assert_eq!(envelopes[1]["to"], "owner@example.org");
        assert_eq!(envelopes[1]["reply_to"], "anna@example.com");
        assert_eq!(envelopes[1]["subject"], "Neue Hochzeitsanfrage von Anna Huber");
    });
}

#[test]
fn render_prints_html_for_selected_recipient() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let submission = write_file(&dir, "form.json", &submission_form().to_string());

        let result =
            render::run(&LoadOptions::default(), &submission, Some(RecipientArg::Owner), false, "req-2");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("<!DOCTYPE html>"));
        assert!(result.output.contains("Gesamtpreis: 960.00 €"));
    });
}

#[test]
fn render_without_email_is_an_invalid_submission() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let submission = write_file(&dir, "form.json", r#"{ "Name": "Anna Huber" }"#);

        let result = render::run(&LoadOptions::default(), &submission, None, true, "req-3");
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_submission");
        assert!(payload["message"].as_str().unwrap_or_default().contains("email is required"));
    });
}

#[test]
fn config_reports_sources_for_env_file_and_default() {
    with_env(&[("ESTIMATOR_LOG_LEVEL", "debug")], || {
        let dir = TempDir::new().expect("tempdir");
        let path = write_file(
            &dir,
            "estimator.toml",
            "[pricing]\ndefault_guest_count = 50\n\n[mail]\nowner_email = \"events@example.org\"\n",
        );
        let options = LoadOptions { config_path: Some(path.clone()), require_file: true, ..LoadOptions::default() };

        let output = config::run(&options);
        assert!(output.contains(&format!(
            "- pricing.default_guest_count = 50 (source: file ({}))",
            path.display()
        )));
        assert!(output.contains("- logging.level = debug (source: env (ESTIMATOR_LOG_LEVEL))"));
        assert!(output.contains("- pricing.starter_min_quantity = 20 (source: default)"));
    });
}

fn submission_form() -> Value {
    let estimate = json!({
        "guests": 80,
        "total": 960.0,
        "groups": {
            "Getränke": [{
                "name": "Softdrinks",
                "priceText": "12,00 € p.P.",
                "pricePerUnit": 12.0,
                "isPerPerson": true,
                "quantity": 1,
                "total": 960.0
            }]
        }
    });
    json!({
        "Name": "Anna Huber",
        "Email": "anna@example.com",
        "estimate-data-json": estimate.to_string(),
    })
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("fixture should be writable");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ESTIMATOR_PRICING_DEFAULT_GUEST_COUNT",
        "ESTIMATOR_PRICING_STARTER_MIN_QUANTITY",
        "ESTIMATOR_PRICING_CURRENCY_SYMBOL",
        "ESTIMATOR_MAIL_FROM_EMAIL",
        "ESTIMATOR_MAIL_OWNER_EMAIL",
        "FROM_EMAIL",
        "OWNER_EMAIL",
        "ESTIMATOR_LOGGING_LEVEL",
        "ESTIMATOR_LOGGING_FORMAT",
        "ESTIMATOR_LOG_LEVEL",
        "ESTIMATOR_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
