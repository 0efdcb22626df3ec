//! swaggest CLI - run the x-test fixtures of a Swagger document against a live API

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use swaggest_core::report::generate_schema;
use swaggest_core::{Config, SuiteReport, TestPlan, Variables, to_http_file};
use swaggest_runner::{SuiteRunner, load_document};

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "SWAGGEST_LOG";

const CONFIG_FILE: &str = ".swaggest.toml";

/// Exit code for configuration, document and synthesis errors.
const TOOL_ERROR: i32 = 3;

#[derive(Parser)]
#[command(name = "swaggest")]
#[command(about = "Run the x-test fixtures of a Swagger document against a live API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize, execute and validate every x-test case
    Run {
        #[command(flatten)]
        target: Target,

        /// Dump every case result to JSONL files
        #[arg(long)]
        dump: bool,

        /// Directory for dump files (default: .swaggest/dumps)
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },

    /// Show the synthesized test plan without sending requests
    Plan {
        #[command(flatten)]
        target: Target,

        /// Also write the plan as a .http file
        #[arg(long)]
        http: Option<PathBuf>,
    },

    /// Initialize config file
    Init,

    /// Check config and document
    Doctor {
        /// Config file (default: .swaggest.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Export JSON Schema of the suite report
    Schema,
}

/// Where the suite comes from and what it talks to.
#[derive(Args)]
struct Target {
    /// Config file (default: .swaggest.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Swagger document, overriding the config
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Host (and port) to test, overriding config and document
    #[arg(long)]
    host: Option<String>,

    /// Fixture variable, NAME=VALUE (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,
}

impl Target {
    fn runner(&self) -> Result<(Config, SuiteRunner)> {
        let cfg = load_config(self.config.as_deref())?;
        let variables: Variables = self
            .vars
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        let runner = SuiteRunner::from_config(&cfg)
            .with_spec(self.spec.clone())
            .with_host(self.host.clone())
            .with_variables(variables);
        Ok((cfg, runner))
    }
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("Warning: failed to initialise logging: {e}");
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty variable name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let cfg = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    tracing::debug!(config = ?path, spec = %cfg.spec.display(), "config loaded");
    Ok(cfg)
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            target,
            dump,
            dump_dir,
        } => {
            let (cfg, runner) = target.runner()?;
            let plan = runner.plan()?;

            if plan.is_empty() {
                eprintln!(
                    "Error: no x-test cases found in {}",
                    runner.spec_path().display()
                );
                return Ok(3);
            }

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  spec:    {}", runner.spec_path().display());
                if let Some(host) = target.host.as_ref().or(cfg.host.as_ref()) {
                    eprintln!("  host:    {host}");
                }
                if !cfg.headers.is_empty() {
                    eprintln!("  headers: {} configured", cfg.headers.len());
                }
                eprintln!("  cases:   {}", plan.len());
                eprintln!();
            }

            let report = runner.execute(&plan)?;
            print_report(&report, cli.output)?;

            // Dump all case results if requested (CLI flag or config)
            if dump || cfg.dump {
                let dump_path = dump_dir
                    .or_else(|| cfg.dump_dir.clone())
                    .unwrap_or_else(|| PathBuf::from(".swaggest/dumps"));

                match swaggest_core::dump::write_dump(&report.cases, &dump_path, true) {
                    Ok(index) => {
                        if cli.output != OutputFormat::Silent {
                            eprintln!(
                                "Dump: {} cases → {} ({})",
                                index.total,
                                dump_path.display(),
                                index
                                    .operations
                                    .iter()
                                    .map(|e| e.file.as_str())
                                    .collect::<Vec<_>>()
                                    .join(", "),
                            );
                        }
                    }
                    Err(e) => {
                        eprintln!("Warning: failed to write dump: {e}");
                    }
                }
            }

            Ok(report.exit_code())
        }

        Commands::Plan { target, http } => {
            let (_, runner) = target.runner()?;
            let plan = runner.plan()?;
            print_plan(&plan, cli.output)?;

            if let Some(path) = http {
                std::fs::write(&path, to_http_file(&plan))?;
                if cli.output != OutputFormat::Silent {
                    eprintln!("HTTP file: {}", path.display());
                }
            }

            Ok(if plan.is_empty() { 3 } else { 0 })
        }

        Commands::Init => {
            if Path::new(CONFIG_FILE).exists() {
                eprintln!("{CONFIG_FILE} already exists");
                return Ok(1);
            }

            std::fs::write(CONFIG_FILE, Config::example())?;
            println!("Created {CONFIG_FILE}");
            println!("\nEdit the file to configure:");
            println!("  - spec: path to your Swagger document");
            println!("  - host: server to test");
            println!("  - variables: values for \"$name\" fixture literals");
            println!("  - headers: auth tokens, API keys");
            Ok(0)
        }

        Commands::Doctor { config } => Ok(doctor(config.as_deref())),

        Commands::Schema => {
            println!("{}", generate_schema()?);
            Ok(0)
        }
    }
}

/// Check config, document and synthesis; 3 on the first tool error.
fn doctor(config: Option<&Path>) -> i32 {
    println!("swaggest doctor");
    println!("===============\n");

    let cfg = match load_config(config) {
        Ok(cfg) => {
            println!("[OK] Config");
            cfg
        }
        Err(e) => {
            println!("[NG] Config: {e:#}");
            return TOOL_ERROR;
        }
    };

    if !cfg.spec.exists() {
        println!("[NG] Document ({}) not found", cfg.spec.display());
        return TOOL_ERROR;
    }
    let document = match load_document(&cfg.spec) {
        Ok(document) => {
            println!("[OK] Document ({})", cfg.spec.display());
            document
        }
        Err(e) => {
            println!("[NG] Document: {e}");
            return TOOL_ERROR;
        }
    };

    match SuiteRunner::from_config(&cfg).plan_document(&document) {
        Ok(plan) => {
            println!(
                "[{}] {} cases over {}/{} routes",
                if plan.is_empty() { "--" } else { "OK" },
                plan.len(),
                plan.routes_tested,
                plan.total_routes
            );
            let fallbacks = plan.cases().filter(|c| c.case.status_fallback).count();
            let unused = plan.cases().filter(|c| !c.case.unused.is_empty()).count();
            if fallbacks > 0 {
                println!("[--] {fallbacks} cases without a single response status");
            }
            if unused > 0 {
                println!("[--] {unused} cases with unused fixture parameters");
            }
        }
        Err(e) => {
            println!("[NG] Synthesis: {e}");
            return TOOL_ERROR;
        }
    }

    println!("\nReady to test!");
    0
}

fn print_report(report: &SuiteReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Terminal => {
            println!("{}", report.to_terminal());
            println!("  Exit code: {}", report.exit_code());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Silent => {}
    }
    Ok(())
}

fn print_plan(plan: &TestPlan, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Terminal => println!("{}", plan.to_terminal()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
        OutputFormat::Silent => {}
    }
    Ok(())
}
