use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-preview",
    version,
    about = "Build, store and fill dynamic forms with derived fields"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Saved forms file (default: forms.json)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Append session events to this JSONL file
    #[arg(long, global = true)]
    pub trace: Option<String>,

    /// Path to config file (default: form-preview.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List saved forms
    Forms,

    /// Render a saved form with its default values
    Show {
        /// Name of the saved form
        #[arg(long)]
        form: String,
    },

    /// Import a form definition (JSON or YAML) and save it
    Import {
        /// Form or field-list file
        #[arg(long)]
        file: String,

        /// Save under this name instead of the one in the file
        #[arg(long)]
        name: Option<String>,
    },

    /// Fill a saved form and optionally submit it
    Preview {
        /// Name of the saved form
        #[arg(long)]
        form: String,

        /// Set a field value: id=value (repeatable, applied in order)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Check a checkbox option or pick a select/radio option: id=option
        #[arg(long = "check")]
        check: Vec<String>,

        /// Validate and submit after applying the edits
        #[arg(long, default_value_t = false)]
        submit: bool,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-preview.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceConfig {
    pub path: Option<String>,
}

fn default_store_path() -> String {
    "forms.json".to_string()
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-preview.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "ignoring malformed config file");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Resolved settings (CLI > config file > defaults)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store_path: String,
    pub trace_path: Option<String>,
}

pub fn resolve_settings(cli: &Cli, config: &AppConfig) -> Settings {
    Settings {
        store_path: cli.store.clone().unwrap_or_else(|| config.store.path.clone()),
        trace_path: cli.trace.clone().or_else(|| config.trace.path.clone()),
    }
}

/// Default log filter for a verbosity count. `RUST_LOG` overrides it.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
