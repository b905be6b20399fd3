mod cli;

use rommate::config;
use rommate::conversion::{self, ConversionRun};
use rommate::playlist::{self, PlaylistReport};
use rommate::processor;
use rommate::scanner::{FixedSelection, FormatInventory, FormatPrompt, FormatSelection};
use rommate::state::{self, AppEvent, RecoveryAction, RunOutcome};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, FormatArg};
use std::io::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise derive a filter from --verbose
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "rommate=trace,rommate_parser=debug,rommate_common=debug".to_string()
        } else {
            "rommate=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Playlist { directory, format } => {
            run_playlist(&directory, format, cli.config.as_deref())
        }
        Commands::Convert {
            directory,
            delete_originals,
        } => run_convert(&directory, delete_originals, cli.config.as_deref()),
        Commands::Process {
            directory,
            delete_originals,
        } => run_process(&directory, delete_originals, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("rommate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Asks on the terminal which format family to group.
struct StdinPrompt;

impl FormatPrompt for StdinPrompt {
    fn choose(&self, _inventory: &FormatInventory) -> FormatSelection {
        loop {
            print!("Directory holds both CHD archives and original images. Group [c]hd, [o]riginal, or [a]bort? ");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return FormatSelection::Abort;
            }
            match line.trim().to_lowercase().as_str() {
                "c" | "chd" => return FormatSelection::Archive,
                "o" | "original" => return FormatSelection::Original,
                "a" | "abort" | "q" | "" => return FormatSelection::Abort,
                _ => println!("Please answer c, o or a."),
            }
        }
    }
}

fn run_playlist(
    directory: &Path,
    format: Option<FormatArg>,
    config_path: Option<&Path>,
) -> Result<()> {
    let cfg = config::load_config_or_default(config_path)?;

    let fixed;
    let stdin;
    let prompt: &dyn FormatPrompt = match format {
        Some(FormatArg::Chd) => {
            fixed = FixedSelection(FormatSelection::Archive);
            &fixed
        }
        Some(FormatArg::Original) => {
            fixed = FixedSelection(FormatSelection::Original);
            &fixed
        }
        None => {
            stdin = StdinPrompt;
            &stdin
        }
    };

    let (tx, mut rx) = state::event_channel();
    let report = playlist::create_playlists(directory, &cfg.playlist.extension, prompt, Some(&tx))?;
    drop(tx);

    while let Ok(event) = rx.try_recv() {
        render_event(&event);
    }

    report_playlists(&report, directory);
    Ok(())
}

fn report_playlists(report: &PlaylistReport, directory: &Path) {
    if report.created == 0 && report.skipped == 0 && report.rejected == 0 {
        println!("No multi-disc titles found in {}", directory.display());
    } else {
        println!(
            "{} playlist(s) created, {} skipped, {} group(s) rejected",
            report.created, report.skipped, report.rejected
        );
    }
}

fn run_convert(directory: &Path, delete_originals: bool, config_path: Option<&Path>) -> Result<()> {
    let mut cfg = config::load_config_or_default(config_path)?;
    cfg.conversion.delete_originals |= delete_originals;

    let outcome = execute_conversion(directory, cfg.clone())?;

    // When chdman is missing and the platform can install it, offer to do
    // so and retry once.
    if outcome == RunOutcome::ToolUnavailable {
        if let Some(command) = pending_install_command(&cfg)? {
            if offer_install(&command)? {
                let retried = execute_conversion(directory, cfg)?;
                report_outcome(&retried);
                return finish_status(&retried);
            }
        }
        anyhow::bail!("chdman is not available; nothing was converted");
    }

    report_outcome(&outcome);
    finish_status(&outcome)
}

fn run_process(directory: &Path, delete_originals: bool, config_path: Option<&Path>) -> Result<()> {
    let mut cfg = config::load_config_or_default(config_path)?;
    cfg.conversion.delete_originals |= delete_originals;

    let (mut outcome, mut report) = execute_process(directory, cfg.clone())?;

    if outcome == RunOutcome::ToolUnavailable {
        match pending_install_command(&cfg)? {
            Some(command) if offer_install(&command)? => {
                (outcome, report) = execute_process(directory, cfg)?;
            }
            _ => anyhow::bail!("chdman is not available; nothing was converted"),
        }
    }

    // Playlists for what did convert were already written; the exit status
    // still reflects any conversion failures.
    report_outcome(&outcome);
    report_playlists(&report, directory);
    finish_status(&outcome)
}

/// Run one conversion pass on a blocking thread.
fn execute_conversion(directory: &Path, cfg: config::Config) -> Result<RunOutcome> {
    let dir = directory.to_path_buf();
    run_with_events(move |stop, tx| {
        let run = ConversionRun::new(cfg, stop, tx);
        run.execute(&dir)
    })
}

/// Run the combined convert-then-playlist pass on a blocking thread.
fn execute_process(
    directory: &Path,
    cfg: config::Config,
) -> Result<(RunOutcome, PlaylistReport)> {
    let dir = directory.to_path_buf();
    run_with_events(move |stop, tx| processor::process_directory(&dir, &cfg, stop, tx))
}

/// Drive a blocking worker, rendering its events as they arrive and wiring
/// Ctrl-C to the stop signal. Drains until the worker drops its sender, so
/// events emitted after the conversion run (the playlist pass) still render.
fn run_with_events<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(Arc<AtomicBool>, tokio::sync::broadcast::Sender<AppEvent>) -> rommate_common::Result<T>
        + Send
        + 'static,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (tx, mut rx) = state::event_channel();
        let stop = Arc::new(AtomicBool::new(false));

        let ctrlc_stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nStop requested, finishing current file...");
                ctrlc_stop.store(true, Ordering::SeqCst);
            }
        });

        let worker = tokio::task::spawn_blocking(move || work(stop, tx));

        loop {
            match rx.recv().await {
                Ok(event) => render_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Dropped {n} progress events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }

        worker.await?.map_err(anyhow::Error::from)
    })
}

/// The install command to offer after a failed run, if any.
fn pending_install_command(cfg: &config::Config) -> Result<Option<String>> {
    // Re-derive the recovery action; the run only reported it as an event.
    let err = match conversion::tool::locate(&cfg.tools) {
        None => conversion::ToolError::NotFound,
        Some(path) => {
            match conversion::tool::verify(
                &path,
                std::time::Duration::from_secs(cfg.tools.probe_timeout_secs),
            ) {
                Ok(()) => return Ok(None),
                Err(e) => e,
            }
        }
    };
    match err.recovery_action(&cfg.tools) {
        RecoveryAction::InstallPackage { command } => Ok(Some(command)),
        RecoveryAction::PlaceInBundleDir { expected } => {
            println!(
                "Place a chdman build at {} and run again.",
                expected.display()
            );
            Ok(None)
        }
    }
}

fn offer_install(command: &str) -> Result<bool> {
    print!("chdman is not installed. Run `{command}` now? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    if !matches!(line.trim().to_lowercase().as_str(), "y" | "yes") {
        return Ok(false);
    }

    println!("Running `{command}`...");
    let ok = conversion::tool::run_install(command)?;
    if !ok {
        anyhow::bail!("install command failed");
    }
    Ok(true)
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let cfg = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    match conversion::ChdTool::resolve(&cfg.tools) {
        Ok(tool) => {
            println!("✓ chdman - {}", tool.path.display());
            println!("\nAll required tools are available!");
        }
        Err(err) => {
            println!("✗ chdman: {err}");
            match err.recovery_action(&cfg.tools) {
                RecoveryAction::InstallPackage { command } => {
                    println!("  Install with: {command}");
                }
                RecoveryAction::PlaceInBundleDir { expected } => {
                    println!("  Or place a build at {}", expected.display());
                }
            }
            anyhow::bail!("chdman is not available");
        }
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let cfg = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Playlist extension: {}", cfg.playlist.extension);
            println!("  Delete originals: {}", cfg.conversion.delete_originals);
            println!(
                "  chdman path: {}",
                cfg.tools
                    .chdman_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(auto-detect)".to_string())
            );
            println!("  Bundle directory: {}", cfg.tools.bundled_dir.display());
            println!("  Probe timeout: {}s", cfg.tools.probe_timeout_secs);
        }
        None => {
            println!("No config file specified, using defaults");
            let cfg = config::Config::default();
            println!("Default config:");
            println!("  Playlist extension: {}", cfg.playlist.extension);
            println!("  Bundle directory: {}", cfg.tools.bundled_dir.display());
        }
    }

    Ok(())
}

fn report_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed { summary } => {
            println!(
                "Done: {} converted, {} skipped, {} failed",
                summary.succeeded, summary.skipped, summary.failed
            );
        }
        RunOutcome::Cancelled { summary } => {
            println!(
                "Cancelled: {} converted, {} skipped, {} failed before the stop",
                summary.succeeded, summary.skipped, summary.failed
            );
        }
        RunOutcome::NothingToConvert => {
            println!("No convertible disc images found");
        }
        RunOutcome::ToolUnavailable => {}
    }
}

fn finish_status(outcome: &RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::Completed { summary } if !summary.is_success() => {
            anyhow::bail!("{} conversion(s) failed", summary.failed)
        }
        RunOutcome::ToolUnavailable => anyhow::bail!("chdman is not available"),
        _ => Ok(()),
    }
}

fn render_event(event: &AppEvent) {
    match event {
        AppEvent::StageChanged { .. } | AppEvent::TaskHeartbeat { .. } => {}
        AppEvent::ToolResolved { path } => {
            println!("Using chdman at {}", path.display());
        }
        AppEvent::ToolUnavailable { reason, recovery } => {
            println!("Converter unavailable: {reason}");
            match recovery {
                RecoveryAction::InstallPackage { command } => {
                    println!("  It can be installed with `{command}`");
                }
                RecoveryAction::PlaceInBundleDir { expected } => {
                    println!("  Place a chdman build at {}", expected.display());
                }
            }
        }
        AppEvent::ScanStarted { directory } => {
            println!("Scanning {}", directory.display());
        }
        AppEvent::TasksDiscovered { total } => {
            println!("{total} source image(s) found");
        }
        AppEvent::TaskStarted {
            index,
            total,
            file_name,
            ..
        } => {
            println!("[{index}/{total}] Converting {file_name}");
        }
        AppEvent::TaskFinished {
            file_name,
            status,
            error,
            ..
        } => match error {
            Some(error) => println!("  {file_name}: {status:?}: {error}"),
            None => println!("  {file_name}: {status:?}"),
        },
        AppEvent::SourceDeleted { file_name } => {
            println!("  Deleted {file_name}");
        }
        AppEvent::GroupRejected { title, extensions } => {
            println!("Rejected '{title}': mixed extensions {extensions:?}");
        }
        AppEvent::PlaylistCreated { path, discs } => {
            println!("Created {} ({discs} discs)", path.display());
        }
        AppEvent::PlaylistSkipped { path } => {
            println!("{} already exists, skipped", path.display());
        }
        AppEvent::RunFinished { .. } => {}
    }
}
