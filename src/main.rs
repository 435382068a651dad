use clap::{Parser, Subcommand};
use md_manual::pipeline::{self, BuildRequest};
use md_manual::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Inputs shared by `build` and `check`.
#[derive(clap::Args)]
struct RenderArgs {
    /// Template file, e.g. templates/product_1.0.0.md
    template: PathBuf,

    /// Variables file (key: value lines); searched for when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Version to render at; overrides `version` in the variables file
    #[arg(long, value_name = "X.Y.Z")]
    set_version: Option<String>,
}

impl RenderArgs {
    fn request(self, output: Option<PathBuf>) -> BuildRequest {
        BuildRequest {
            template: self.template,
            variables: self.config,
            output,
            version: self.set_version,
        }
    }
}

#[derive(Parser)]
#[command(name = "md-manual", version)]
#[command(about = "Render versioned Markdown manuals and gather their images")]
#[command(long_about = "\
Render versioned Markdown manuals and gather their images

A template carries its version in its filename and uses {{.key}} placeholders
filled from a variables file of key: value lines:

  templates/product_1.0.0.md       # Template, version 1.0.0
  config.yaml                      # product: Console
                                   # version: 1.1.0
  images/login.png                 # Referenced as ![Login](./images/login.png)

'md-manual build templates/product_1.0.0.md' writes:

  output/product_1.1.0.md          # Placeholders filled, 1.0.0 → 1.1.0
  output/product_1.1.0.assets/     # Every local image, by base name
      login.png

Run 'md-manual gen-config' to generate a documented md-manual.toml.")]
struct Cli {
    /// Tool settings file (optional)
    #[arg(long, default_value = config::SETTINGS_FILE, global = true)]
    settings: PathBuf,

    /// Log pipeline steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template and copy its images next to the output
    Build {
        #[command(flatten)]
        args: RenderArgs,

        /// Output file; defaults to <output.dir>/<name from version>
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a template, its variables, and its images without writing
    Check {
        #[command(flatten)]
        args: RenderArgs,
    },
    /// List image references in a template and where they resolve
    Scan {
        template: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock md-manual.toml with all options documented
    GenConfig,
}

fn main() {
    let cli = Cli::parse();

    // --verbose enables DEBUG, otherwise RUST_LOG or WARN
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build {
            args,
            output: output_path,
        } => {
            let settings = config::load_config(&cli.settings)?;
            let report = pipeline::build(&args.request(output_path), &settings)?;
            output::print_build_output(&report);
        }
        Command::Check { args } => {
            let settings = config::load_config(&cli.settings)?;
            let report = pipeline::check(&args.request(None), &settings)?;
            output::print_check_output(&report);
            if !report.is_clean() {
                return Err(format!(
                    "check failed for {}",
                    report.template.display()
                )
                .into());
            }
        }
        Command::Scan { template, json } => {
            let settings = config::load_config(&cli.settings)?;
            let references = pipeline::scan_template(&template, &settings)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&references)?);
            } else {
                output::print_scan_output(&references);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
