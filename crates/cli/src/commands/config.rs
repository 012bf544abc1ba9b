use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use estimator_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let default_guest_count = config.pricing.default_guest_count.to_string();
    let starter_min_quantity = config.pricing.starter_min_quantity.to_string();
    let log_format = format!("{:?}", config.logging.format).to_ascii_lowercase();

    let fields = [
        Field {
            key_path: "pricing.default_guest_count",
            env_keys: &["ESTIMATOR_PRICING_DEFAULT_GUEST_COUNT"],
            value: &default_guest_count,
        },
        Field {
            key_path: "pricing.starter_min_quantity",
            env_keys: &["ESTIMATOR_PRICING_STARTER_MIN_QUANTITY"],
            value: &starter_min_quantity,
        },
        Field {
            key_path: "pricing.currency_symbol",
            env_keys: &["ESTIMATOR_PRICING_CURRENCY_SYMBOL"],
            value: &config.pricing.currency_symbol,
        },
        Field { key_path: "pricing.guest_group_label", env_keys: &[], value: &config.pricing.guest_group_label },
        Field { key_path: "pricing.guest_item_label", env_keys: &[], value: &config.pricing.guest_item_label },
        Field { key_path: "pricing.total_label", env_keys: &[], value: &config.pricing.total_label },
        Field {
            key_path: "mail.from_email",
            env_keys: &["ESTIMATOR_MAIL_FROM_EMAIL", "FROM_EMAIL"],
            value: &config.mail.from_email,
        },
        Field {
            key_path: "mail.owner_email",
            env_keys: &["ESTIMATOR_MAIL_OWNER_EMAIL", "OWNER_EMAIL"],
            value: &config.mail.owner_email,
        },
        Field { key_path: "mail.venue_name", env_keys: &[], value: &config.mail.venue_name },
        Field { key_path: "mail.venue_address", env_keys: &[], value: &config.mail.venue_address },
        Field { key_path: "mail.venue_contact", env_keys: &[], value: &config.mail.venue_contact },
        Field {
            key_path: "logging.level",
            env_keys: &["ESTIMATOR_LOGGING_LEVEL", "ESTIMATOR_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["ESTIMATOR_LOGGING_FORMAT", "ESTIMATOR_LOG_FORMAT"],
            value: &log_format,
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        render_line(
            field.key_path,
            field.value,
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        )
    }));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("estimator.toml"), PathBuf::from("config/estimator.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
