pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use billpack_core::config::{parse_backend_list, AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use clap::{Args, Parser, Subcommand};

use crate::commands::{CommandResult, EXIT_CONFIG};

#[derive(Debug, Parser)]
#[command(
    name = "billpack",
    about = "Billpack operator CLI",
    long_about = "Generate the final-bill document packet from a bill-of-quantities workbook, and inspect configuration and renderer readiness.",
    after_help = "Examples:\n  billpack generate bill.xlsx --out out/\n  billpack summary bill.xlsx\n  billpack doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to read instead of billpack.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level: trace|debug|info|warn|error")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: compact|pretty|json")]
    log_format: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Render every document in the packet and write it to the output directory")]
    Generate {
        #[arg(help = "Bill-of-quantities workbook (.xlsx)")]
        input: PathBuf,
        #[arg(long, default_value = "out", help = "Directory the documents are written to")]
        out: PathBuf,
        #[command(flatten)]
        render: RenderArgs,
    },
    #[command(about = "Print the financial summary and deviation totals without rendering")]
    Summary {
        #[arg(help = "Bill-of-quantities workbook (.xlsx)")]
        input: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and check which render backends can run on this host")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Default, Args)]
struct RenderArgs {
    #[arg(long, help = "Comma-separated backend chain, e.g. chromium,printpdf,text")]
    backends: Option<String>,
    #[arg(long, help = "Per-attempt render timeout in seconds")]
    timeout_secs: Option<u64>,
    #[arg(long, help = "Documents rendered at the same time")]
    concurrency: Option<usize>,
}

impl Cli {
    fn load_options(&self) -> Result<LoadOptions, String> {
        let mut overrides = ConfigOverrides {
            log_level: self.log_level.clone(),
            log_format: self
                .log_format
                .as_deref()
                .map(str::parse::<LogFormat>)
                .transpose()
                .map_err(|error| error.to_string())?,
            ..ConfigOverrides::default()
        };
        if let Command::Generate { render, .. } = &self.command {
            overrides.backends = render
                .backends
                .as_deref()
                .map(parse_backend_list)
                .transpose()
                .map_err(|error| error.to_string())?;
            overrides.timeout_secs = render.timeout_secs;
            overrides.concurrency = render.concurrency;
        }

        Ok(LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides,
        })
    }

    fn command_name(&self) -> &'static str {
        match self.command {
            Command::Generate { .. } => "generate",
            Command::Summary { .. } => "summary",
            Command::Config => "config",
            Command::Doctor { .. } => "doctor",
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let options = match cli.load_options() {
        Ok(options) => options,
        Err(message) => {
            return finish(CommandResult::failure(
                cli.command_name(),
                "config_validation",
                message,
                EXIT_CONFIG,
            ));
        }
    };

    let command_name = cli.command_name();
    let config_path = cli.config.clone();
    let result = match (cli.command, AppConfig::load(options)) {
        (Command::Doctor { json }, loaded) => CommandResult {
            exit_code: 0,
            output: commands::doctor::run(loaded.map_err(|error| error.to_string()), json),
        },
        (_, Err(error)) => CommandResult::failure(
            command_name,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        ),
        (Command::Generate { input, out, .. }, Ok(config)) => {
            logging::init_logging(&config);
            commands::generate::run(&config, &input, &out)
        }
        (Command::Summary { input }, Ok(config)) => {
            logging::init_logging(&config);
            commands::summary::run(&config, &input)
        }
        (Command::Config, Ok(config)) => CommandResult {
            exit_code: 0,
            output: commands::config::run(&config, config_path.as_deref()),
        },
    };

    finish(result)
}

fn finish(result: CommandResult) -> ExitCode {
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
