use clap::Parser;
use pickup_kiosk::audio::output::CpalSink;
use pickup_kiosk::audio::AudioSink;
use pickup_kiosk::config::KioskConfig;
use pickup_kiosk::import::collect_dir;
use pickup_kiosk::kernel::key::SemanticKey;
use pickup_kiosk::kernel::player::CuePlayer;
use pickup_kiosk::kernel::registry::{AudioRegistry, ImportReport};
use pickup_kiosk::kernel::sequencer::CueSequencer;
use pickup_kiosk::kernel::store::AssetStore;
use pickup_kiosk::kernel::telemetry::recorder::TelemetryRecorder;
use pickup_kiosk::outputs::mock_audio::RecordingSink;
use pickup_kiosk::workflow::Workflow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Counter kiosk console: drives the audio cues from typed operator actions.
#[derive(Debug, Parser)]
#[command(name = "pickup-kiosk", version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, env = "PICKUP_KIOSK_CONFIG")]
    config: Option<PathBuf>,

    /// Import every cue file under this directory before starting
    #[arg(long, value_name = "DIR")]
    import: Option<PathBuf>,

    /// Log cues instead of opening an audio device
    #[arg(long)]
    dry_run: bool,
}

const HELP: &str = "commands: scan | phone <4 digits> | issue | accept | return | run <sequence> \
| import <dir> | list | preview <key> | status | quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = KioskConfig::load(args.config.as_deref())?;
    tracing::info!("Pickup kiosk booting, data dir {}", config.data_dir.display());

    let telemetry = Arc::new(TelemetryRecorder::new());
    let registry = Arc::new(AudioRegistry::init(
        AssetStore::new(&config.data_dir),
        Arc::clone(&telemetry),
    ));

    if let Some(dir) = &args.import {
        import_from(&registry, dir);
    }

    let sink: Arc<dyn AudioSink> = if args.dry_run {
        Arc::new(RecordingSink::new())
    } else {
        match CpalSink::open(config.output_device.as_deref(), config.volume) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                tracing::warn!("Audio output unavailable, cues will only be logged: {}", e);
                Arc::new(RecordingSink::new())
            }
        }
    };

    let player = CuePlayer::new(Arc::clone(&registry), sink, Arc::clone(&telemetry));
    let sequencer = Arc::new(CueSequencer::new(
        player,
        config.sequence_book()?,
        Arc::clone(&telemetry),
    ));
    let mut workflow = Workflow::new(Arc::clone(&sequencer));

    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    println!("{}", HELP);
    loop {
        let line = tokio::select! {
            line = line_rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else { continue };
        let arg = parts.next();

        match (command, arg) {
            ("scan", _) => {
                workflow.scan();
            }
            ("phone", Some(digits)) => {
                if let Err(e) = workflow.phone_search(digits) {
                    println!("{}", e);
                }
            }
            ("issue", _) => {
                workflow.issue_complete();
            }
            ("accept", _) => {
                workflow.accept();
            }
            ("return", _) => {
                workflow.return_item();
            }
            ("run", Some(name)) => {
                if let Err(e) = workflow.run_named(name) {
                    println!("{}", e);
                }
            }
            ("import", Some(dir)) => import_from(&registry, Path::new(dir)),
            ("list", _) => {
                for (role, bound) in workflow.list_mappings() {
                    println!("  {:<8} {}", role, if bound { "bound" } else { "-" });
                }
                println!("  cells    {} bound", workflow.cell_coverage());
            }
            ("preview", Some(key)) => match key.parse::<SemanticKey>() {
                Ok(key) => {
                    let name = key.to_string();
                    let result = sequencer.player().play_blocking(key).await;
                    println!("{}: {}", name, result);
                }
                Err(e) => println!("{}", e),
            },
            ("status", _) => {
                let snap = telemetry.snapshot();
                println!(
                    "cell {:?} | cues: {} started, {} missing, {} failed | sequences: {} completed",
                    workflow.current_cell(),
                    snap.cue_stats.started,
                    snap.cue_stats.missing,
                    snap.cue_stats.failed,
                    snap.sequence_stats.completed
                );
            }
            ("quit", _) | ("exit", _) => break,
            _ => println!("{}", HELP),
        }
    }

    registry.teardown();
    tracing::info!("Pickup kiosk stopped");
    Ok(())
}

fn import_from(registry: &AudioRegistry, dir: &Path) {
    match collect_dir(dir) {
        Ok(files) => print_report(&registry.import_batch(files)),
        Err(e) => println!("import failed: {}", e),
    }
}

fn print_report(report: &ImportReport) {
    println!(
        "imported: {} registered ({} overwritten, {} ad hoc), {} skipped",
        report.registered, report.overwritten, report.ad_hoc, report.skipped
    );
    for skipped in &report.skipped_files {
        println!("  skipped {}: {:?}", skipped.file_name, skipped.reason);
    }
    if let Some(e) = &report.persist_error {
        println!("  warning: mapping not saved: {}", e);
    }
}
