use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub default_guest_count: u32,
    pub starter_min_quantity: u32,
    pub currency_symbol: String,
    pub guest_group_label: String,
    pub guest_item_label: String,
    pub total_label: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailConfig {
    pub from_email: String,
    pub owner_email: String,
    pub venue_name: String,
    pub venue_address: String,
    pub venue_contact: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub default_guest_count: Option<u32>,
    pub log_level: Option<String>,
    pub from_email: Option<String>,
    pub owner_email: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_guest_count: 10,
            starter_min_quantity: 20,
            currency_symbol: "€".to_string(),
            guest_group_label: "Gäste".to_string(),
            guest_item_label: "Anzahl der Gäste".to_string(),
            total_label: "Gesamtpreis".to_string(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_email: "noreply@koenigswirt-th.de".to_string(),
            owner_email: "info@koenigswirt-th.de".to_string(),
            venue_name: "Königswirt im Trachtenheim".to_string(),
            venue_address: "Donauwörther Str. 46, 86343 Königsbrunn".to_string(),
            venue_contact: "Tel: 08-231-86000 | E-Mail: info@koenigswirt-th.de".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("estimator.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(default_guest_count) = pricing.default_guest_count {
                self.pricing.default_guest_count = default_guest_count;
            }
            if let Some(starter_min_quantity) = pricing.starter_min_quantity {
                self.pricing.starter_min_quantity = starter_min_quantity;
            }
            if let Some(currency_symbol) = pricing.currency_symbol {
                self.pricing.currency_symbol = currency_symbol;
            }
            if let Some(guest_group_label) = pricing.guest_group_label {
                self.pricing.guest_group_label = guest_group_label;
            }
            if let Some(guest_item_label) = pricing.guest_item_label {
                self.pricing.guest_item_label = guest_item_label;
            }
            if let Some(total_label) = pricing.total_label {
                self.pricing.total_label = total_label;
            }
        }

        if let Some(mail) = patch.mail {
            if let Some(from_email) = mail.from_email {
                self.mail.from_email = from_email;
            }
            if let Some(owner_email) = mail.owner_email {
                self.mail.owner_email = owner_email;
            }
            if let Some(venue_name) = mail.venue_name {
                self.mail.venue_name = venue_name;
            }
            if let Some(venue_address) = mail.venue_address {
                self.mail.venue_address = venue_address;
            }
            if let Some(venue_contact) = mail.venue_contact {
                self.mail.venue_contact = venue_contact;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ESTIMATOR_PRICING_DEFAULT_GUEST_COUNT") {
            self.pricing.default_guest_count =
                parse_u32("ESTIMATOR_PRICING_DEFAULT_GUEST_COUNT", &value)?;
        }
        if let Some(value) = read_env("ESTIMATOR_PRICING_STARTER_MIN_QUANTITY") {
            self.pricing.starter_min_quantity =
                parse_u32("ESTIMATOR_PRICING_STARTER_MIN_QUANTITY", &value)?;
        }
        if let Some(value) = read_env("ESTIMATOR_PRICING_CURRENCY_SYMBOL") {
            self.pricing.currency_symbol = value;
        }

        let from_email = read_env("ESTIMATOR_MAIL_FROM_EMAIL").or_else(|| read_env("FROM_EMAIL"));
        if let Some(value) = from_email {
            self.mail.from_email = value;
        }
        let owner_email =
            read_env("ESTIMATOR_MAIL_OWNER_EMAIL").or_else(|| read_env("OWNER_EMAIL"));
        if let Some(value) = owner_email {
            self.mail.owner_email = value;
        }

        let log_level =
            read_env("ESTIMATOR_LOGGING_LEVEL").or_else(|| read_env("ESTIMATOR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ESTIMATOR_LOGGING_FORMAT").or_else(|| read_env("ESTIMATOR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(default_guest_count) = overrides.default_guest_count {
            self.pricing.default_guest_count = default_guest_count;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(from_email) = overrides.from_email {
            self.mail.from_email = from_email;
        }
        if let Some(owner_email) = overrides.owner_email {
            self.mail.owner_email = owner_email;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_mail(&self.mail)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("estimator.toml"), PathBuf::from("config/estimator.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.default_guest_count == 0 {
        return Err(ConfigError::Validation(
            "pricing.default_guest_count must be greater than zero".to_string(),
        ));
    }

    let labels = [
        ("pricing.currency_symbol", &pricing.currency_symbol),
        ("pricing.guest_group_label", &pricing.guest_group_label),
        ("pricing.guest_item_label", &pricing.guest_item_label),
        ("pricing.total_label", &pricing.total_label),
    ];
    for (key, value) in labels {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }

    Ok(())
}

fn validate_mail(mail: &MailConfig) -> Result<(), ConfigError> {
    for (key, value) in [("mail.from_email", &mail.from_email), ("mail.owner_email", &mail.owner_email)]
    {
        let value = value.trim();
        let valid = value
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !valid {
            return Err(ConfigError::Validation(format!(
                "{key} must be an email address (got `{value}`)"
            )));
        }
    }

    if mail.venue_name.trim().is_empty() {
        return Err(ConfigError::Validation("mail.venue_name must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    mail: Option<MailPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    default_guest_count: Option<u32>,
    starter_min_quantity: Option<u32>,
    currency_symbol: Option<String>,
    guest_group_label: Option<String>,
    guest_item_label: Option<String>,
    total_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MailPatch {
    from_email: Option<String>,
    owner_email: Option<String>,
    venue_name: Option<String>,
    venue_address: Option<String>,
    venue_contact: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
