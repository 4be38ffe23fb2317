use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rpi_source::board::{BoardOverrides, SystemProbe};
use rpi_source::config::{
    Config, Endpoints, DEFAULT_DEST, DEFAULT_REPO_URI, HELP_URL, MODULES_ROOT, REPO_URI_ENV,
};
use rpi_source::fetch::HttpFetcher;
use rpi_source::workflow::{self, RunOutcome};
use rpi_source::{preflight, self_update};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Download and prepare the kernel source matching the running Raspberry Pi kernel"
)]
struct Cli {
    /// Destination directory for the kernel source.
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_DEST)]
    dest: PathBuf,
    /// Don't run `make modules_prepare`.
    #[arg(long)]
    nomake: bool,
    /// Firmware repository used with rpi-update installs.
    #[arg(long, value_name = "URI", env = REPO_URI_ENV, default_value = DEFAULT_REPO_URI)]
    uri: String,
    /// Delete the downloaded tarball after unpacking.
    #[arg(long)]
    delete: bool,
    /// Log what would be done without changing anything.
    #[arg(long)]
    dry_run: bool,
    /// Show commands and URLs.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only show warnings and errors.
    #[arg(short, long)]
    quiet: bool,
    /// Use the default config instead of /proc/config.gz.
    #[arg(long)]
    default_config: bool,
    /// Processor type override (0=BCM2835, 1=BCM2836, 2=BCM2837, 3=BCM2711, 4=BCM2712).
    #[arg(long, value_name = "N")]
    processor: Option<u32>,
    /// Architecture override (32 or 64).
    #[arg(long, value_name = "BITS")]
    architecture: Option<u32>,
    /// Skip the free disk space check.
    #[arg(long)]
    skip_space: bool,
    /// Skip the check for a newer rpi-source.
    #[arg(long)]
    skip_update: bool,
    /// Record the current upstream rpi-source revision and exit.
    #[arg(long)]
    tag_update: bool,
    /// Only download and unpack the kernel source.
    #[arg(long)]
    download_only: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            dest: self.dest,
            skip_make: self.nomake,
            repo_uri: self.uri,
            delete_archive: self.delete,
            dry_run: self.dry_run,
            default_config: self.default_config,
            overrides: BoardOverrides {
                processor: self.processor,
                architecture: self.architecture,
            },
            skip_space_check: self.skip_space,
            skip_update_check: self.skip_update,
            tag_update: self.tag_update,
            download_only: self.download_only,
            update_tag_path: dirs::home_dir().map(|home| Config::update_tag_path_in(&home)),
            modules_root: PathBuf::from(MODULES_ROOT),
            endpoints: Endpoints::default(),
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.log_level());

    match run(cli.into_config()) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\nHelp: {}", HELP_URL);
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn run(config: Config) -> Result<ExitCode> {
    config.validate()?;
    let fetcher = HttpFetcher::new()?;

    if config.tag_update {
        self_update::tag_update(&config, &fetcher)?;
        return Ok(ExitCode::SUCCESS);
    }

    preflight::check_host(&config)?;
    if !config.skip_update_check {
        self_update::check_for_update(&config, &fetcher);
    }

    let probe = SystemProbe::new(config.dry_run);
    let outcome = workflow::run(&config, &probe, &fetcher)?;
    match &outcome {
        RunOutcome::Prepared { source_dir } => {
            info!("Kernel source is ready in {}", source_dir.display());
        }
        RunOutcome::Downloaded { source_dir } => {
            info!("Kernel source unpacked in {}", source_dir.display());
        }
        RunOutcome::AlreadyInstalled { source_dir } => {
            error!(
                "Kernel source is already installed in {}; remove it to start over",
                source_dir.display()
            );
        }
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}
