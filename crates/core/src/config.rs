use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::finance::DeductionRates;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub render: RenderConfig,
    pub finance: FinanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Backends in the order they are attempted for every document.
    pub backends: Vec<BackendKind>,
    pub timeout_secs: u64,
    /// Output at or below this size counts as a failed attempt.
    pub min_output_bytes: usize,
    /// Documents rendered at the same time.
    pub concurrency: usize,
    pub chromium_path: Option<PathBuf>,
    pub wkhtmltopdf_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinanceConfig {
    pub rates: DeductionRates,
    pub display_precision: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Headless Chromium printing the HTML rendition.
    Chromium,
    /// wkhtmltopdf printing the HTML rendition.
    Wkhtmltopdf,
    /// In-process PDF layout walking the document directly.
    PrintPdf,
    /// The HTML rendition itself.
    Html,
    /// Plain-text rendition; the last resort.
    Text,
}

impl BackendKind {
    pub fn id(self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Wkhtmltopdf => "wkhtmltopdf",
            Self::PrintPdf => "printpdf",
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
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
    pub backends: Option<Vec<BackendKind>>,
    pub timeout_secs: Option<u64>,
    pub min_output_bytes: Option<usize>,
    pub concurrency: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig {
                backends: vec![
                    BackendKind::Chromium,
                    BackendKind::Wkhtmltopdf,
                    BackendKind::PrintPdf,
                    BackendKind::Text,
                ],
                timeout_secs: 30,
                min_output_bytes: 512,
                concurrency: 2,
                chromium_path: None,
                wkhtmltopdf_path: None,
            },
            finance: FinanceConfig { rates: DeductionRates::default(), display_precision: 2 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "wkhtmltopdf" => Ok(Self::Wkhtmltopdf),
            "printpdf" => Ok(Self::PrintPdf),
            "html" => Ok(Self::Html),
            "text" => Ok(Self::Text),
            other => Err(ConfigError::Validation(format!(
                "unsupported render backend `{other}` (expected chromium|wkhtmltopdf|printpdf|html|text)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
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

/// Parses a comma-separated backend list such as `chromium,printpdf,text`.
pub fn parse_backend_list(value: &str) -> Result<Vec<BackendKind>, ConfigError> {
    value.split(',').filter(|part| !part.trim().is_empty()).map(str::parse).collect()
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("billpack.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(render) = patch.render {
            if let Some(backends) = render.backends {
                self.render.backends = backends;
            }
            if let Some(timeout_secs) = render.timeout_secs {
                self.render.timeout_secs = timeout_secs;
            }
            if let Some(min_output_bytes) = render.min_output_bytes {
                self.render.min_output_bytes = min_output_bytes;
            }
            if let Some(concurrency) = render.concurrency {
                self.render.concurrency = concurrency;
            }
            if let Some(chromium_path) = render.chromium_path {
                self.render.chromium_path = Some(chromium_path);
            }
            if let Some(wkhtmltopdf_path) = render.wkhtmltopdf_path {
                self.render.wkhtmltopdf_path = Some(wkhtmltopdf_path);
            }
        }

        if let Some(finance) = patch.finance {
            if let Some(sd_percent) = finance.sd_percent {
                self.finance.rates.sd_percent = sd_percent;
            }
            if let Some(it_percent) = finance.it_percent {
                self.finance.rates.it_percent = it_percent;
            }
            if let Some(gst_percent) = finance.gst_percent {
                self.finance.rates.gst_percent = gst_percent;
            }
            if let Some(lc_percent) = finance.lc_percent {
                self.finance.rates.lc_percent = lc_percent;
            }
            if let Some(display_precision) = finance.display_precision {
                self.finance.display_precision = display_precision;
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
        if let Some(value) = read_env("BILLPACK_RENDER_BACKENDS") {
            self.render.backends = parse_backend_list(&value)?;
        }
        if let Some(value) = read_env("BILLPACK_RENDER_TIMEOUT_SECS") {
            self.render.timeout_secs = parse_number("BILLPACK_RENDER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BILLPACK_RENDER_MIN_OUTPUT_BYTES") {
            self.render.min_output_bytes =
                parse_number("BILLPACK_RENDER_MIN_OUTPUT_BYTES", &value)?;
        }
        if let Some(value) = read_env("BILLPACK_RENDER_CONCURRENCY") {
            self.render.concurrency = parse_number("BILLPACK_RENDER_CONCURRENCY", &value)?;
        }
        if let Some(value) = read_env("BILLPACK_CHROMIUM_PATH") {
            self.render.chromium_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("BILLPACK_WKHTMLTOPDF_PATH") {
            self.render.wkhtmltopdf_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("BILLPACK_FINANCE_SD_PERCENT") {
            self.finance.rates.sd_percent = parse_number("BILLPACK_FINANCE_SD_PERCENT", &value)?;
        }
        if let Some(value) = read_env("BILLPACK_FINANCE_IT_PERCENT") {
            self.finance.rates.it_percent = parse_number("BILLPACK_FINANCE_IT_PERCENT", &value)?;
        }
        if let Some(value) = read_env("BILLPACK_FINANCE_GST_PERCENT") {
            self.finance.rates.gst_percent =
                parse_number("BILLPACK_FINANCE_GST_PERCENT", &value)?;
        }
        if let Some(value) = read_env("BILLPACK_FINANCE_LC_PERCENT") {
            self.finance.rates.lc_percent = parse_number("BILLPACK_FINANCE_LC_PERCENT", &value)?;
        }

        let log_level =
            read_env("BILLPACK_LOGGING_LEVEL").or_else(|| read_env("BILLPACK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BILLPACK_LOGGING_FORMAT").or_else(|| read_env("BILLPACK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backends) = overrides.backends {
            self.render.backends = backends;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.render.timeout_secs = timeout_secs;
        }
        if let Some(min_output_bytes) = overrides.min_output_bytes {
            self.render.min_output_bytes = min_output_bytes;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.render.concurrency = concurrency;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_render(&self.render)?;
        validate_finance(&self.finance)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Config file that [`AppConfig::load`] would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("billpack.toml"), PathBuf::from("config/billpack.toml")]
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

fn validate_render(render: &RenderConfig) -> Result<(), ConfigError> {
    if render.backends.is_empty() {
        return Err(ConfigError::Validation(
            "render.backends must name at least one backend".to_string(),
        ));
    }

    for (index, backend) in render.backends.iter().enumerate() {
        if render.backends[..index].contains(backend) {
            return Err(ConfigError::Validation(format!(
                "render.backends lists `{backend}` more than once"
            )));
        }
    }

    if render.timeout_secs == 0 || render.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "render.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if render.min_output_bytes == 0 {
        return Err(ConfigError::Validation(
            "render.min_output_bytes must be greater than zero".to_string(),
        ));
    }

    if render.concurrency == 0 || render.concurrency > 64 {
        return Err(ConfigError::Validation(
            "render.concurrency must be in range 1..=64".to_string(),
        ));
    }

    Ok(())
}

fn validate_finance(finance: &FinanceConfig) -> Result<(), ConfigError> {
    let rates = &finance.rates;
    let named = [
        ("finance.sd_percent", rates.sd_percent),
        ("finance.it_percent", rates.it_percent),
        ("finance.gst_percent", rates.gst_percent),
        ("finance.lc_percent", rates.lc_percent),
    ];
    for (key, value) in named {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Validation(format!("{key} must be in range 0..=100")));
        }
    }

    if finance.display_precision > 6 {
        return Err(ConfigError::Validation(
            "finance.display_precision must be in range 0..=6".to_string(),
        ));
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

/// Value of an override variable; unset and blank are treated alike.
pub fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    render: Option<RenderPatch>,
    finance: Option<FinancePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderPatch {
    backends: Option<Vec<BackendKind>>,
    timeout_secs: Option<u64>,
    min_output_bytes: Option<usize>,
    concurrency: Option<usize>,
    chromium_path: Option<PathBuf>,
    wkhtmltopdf_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FinancePatch {
    sd_percent: Option<Decimal>,
    it_percent: Option<Decimal>,
    gst_percent: Option<Decimal>,
    lc_percent: Option<Decimal>,
    display_precision: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
