use std::fs;
use std::path::{Path, PathBuf};

use billpack_core::config::{read_env, resolve_config_path, AppConfig};
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: fn(&AppConfig) -> String,
}

const FIELDS: &[Field] = &[
    Field {
        key: "render.backends",
        env_keys: &["BILLPACK_RENDER_BACKENDS"],
        value: |config| {
            config.render.backends.iter().map(|kind| kind.id()).collect::<Vec<_>>().join(",")
        },
    },
    Field {
        key: "render.timeout_secs",
        env_keys: &["BILLPACK_RENDER_TIMEOUT_SECS"],
        value: |config| config.render.timeout_secs.to_string(),
    },
    Field {
        key: "render.min_output_bytes",
        env_keys: &["BILLPACK_RENDER_MIN_OUTPUT_BYTES"],
        value: |config| config.render.min_output_bytes.to_string(),
    },
    Field {
        key: "render.concurrency",
        env_keys: &["BILLPACK_RENDER_CONCURRENCY"],
        value: |config| config.render.concurrency.to_string(),
    },
    Field {
        key: "render.chromium_path",
        env_keys: &["BILLPACK_CHROMIUM_PATH"],
        value: |config| display_path(config.render.chromium_path.as_deref()),
    },
    Field {
        key: "render.wkhtmltopdf_path",
        env_keys: &["BILLPACK_WKHTMLTOPDF_PATH"],
        value: |config| display_path(config.render.wkhtmltopdf_path.as_deref()),
    },
    Field {
        key: "finance.sd_percent",
        env_keys: &["BILLPACK_FINANCE_SD_PERCENT"],
        value: |config| config.finance.rates.sd_percent.to_string(),
    },
    Field {
        key: "finance.it_percent",
        env_keys: &["BILLPACK_FINANCE_IT_PERCENT"],
        value: |config| config.finance.rates.it_percent.to_string(),
    },
    Field {
        key: "finance.gst_percent",
        env_keys: &["BILLPACK_FINANCE_GST_PERCENT"],
        value: |config| config.finance.rates.gst_percent.to_string(),
    },
    Field {
        key: "finance.lc_percent",
        env_keys: &["BILLPACK_FINANCE_LC_PERCENT"],
        value: |config| config.finance.rates.lc_percent.to_string(),
    },
    Field {
        key: "finance.display_precision",
        env_keys: &[],
        value: |config| config.finance.display_precision.to_string(),
    },
    Field {
        key: "logging.level",
        env_keys: &["BILLPACK_LOGGING_LEVEL", "BILLPACK_LOG_LEVEL"],
        value: |config| config.logging.level.clone(),
    },
    Field {
        key: "logging.format",
        env_keys: &["BILLPACK_LOGGING_FORMAT", "BILLPACK_LOG_FORMAT"],
        value: |config| format!("{:?}", config.logging.format).to_ascii_lowercase(),
    },
];

/// Effective configuration, one line per field. Sources are attributed
/// from the environment and the config file; values set by command-line
/// flags show the source they would otherwise have had.
pub fn run(config: &AppConfig, explicit_path: Option<&Path>) -> String {
    let config_file_path = resolve_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(FIELDS.iter().map(|field| {
        let source = field_source(field, config_file_doc.as_ref(), config_file_path.as_ref());
        format!("- {} = {} (source: {source})", field.key, (field.value)(config))
    }));
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&PathBuf>,
) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| read_env(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
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

fn display_path(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "<discover>".to_string())
}
