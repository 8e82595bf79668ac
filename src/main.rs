use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use version_bump_check::check::{
    CRATES_IO_URL, Client, DEFAULT_PACKAGE, Registry, check_not_published,
};
use version_bump_check::version::{CargoMetadata, Fixed, VersionProvider};

const SUBCOMMAND: &str = "assert-version-bump";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One `error:` line when the version is taken, nothing otherwise
    Text,
    /// One JSON object describing the outcome
    Json,
}

#[derive(Parser)]
#[command(
    name = "assert-version-bump",
    about = "Fail if the current package version is already published on crates.io",
    after_help = "Exit status: 0 if the version is not yet published, 1 if the registry \
                  already has it (any status other than 404), 2 if the check could not \
                  complete (version lookup or network failure)."
)]
struct Cli {
    /// Package whose version is checked
    #[arg(short, long, env = "VERSION_BUMP_PACKAGE", default_value = DEFAULT_PACKAGE)]
    package: String,

    /// Base URL of a registry serving the crates.io API
    #[arg(long, env = "VERSION_BUMP_REGISTRY", default_value = CRATES_IO_URL)]
    registry_url: String,

    /// Path to Cargo.toml used to read the package version
    #[arg(long, value_name = "PATH")]
    manifest_path: Option<PathBuf>,

    /// Check this version instead of reading it from cargo metadata
    #[arg(long, value_name = "VERSION")]
    version_override: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Print the resolved version and exit without querying the registry
    #[arg(long)]
    print_version: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

fn main() -> ExitCode {
    // cargo passes the subcommand name as first arg when invoked as `cargo assert-version-bump`
    let args: Vec<String> = std::env::args().collect();
    let args = if args.len() > 1 && args[1] == SUBCOMMAND {
        [&args[..1], &args[2..]].concat()
    } else {
        args
    };

    let cli = Cli::parse_from(args);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let provider: Box<dyn VersionProvider> = match cli.version_override {
        Some(version) => Box::new(Fixed(version)),
        None => Box::new(CargoMetadata::new(cli.manifest_path, &cli.package)),
    };

    if cli.print_version {
        return match provider.version() {
            Ok(version) => {
                println!("{version}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(2)
            }
        };
    }

    let registry = match Registry::new(&cli.registry_url) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let client = Client::with_timeout(Duration::from_secs(cli.timeout));

    match check_not_published(&client, &registry, &cli.package, provider.as_ref()) {
        Ok(report) => {
            match cli.format {
                Format::Json => match serde_json::to_string(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("error: serializing report: {e}");
                        return ExitCode::from(2);
                    }
                },
                Format::Text if report.is_published() => println!("error: {report}"),
                Format::Text => {}
            }
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
