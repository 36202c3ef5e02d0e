use pickup_kiosk::kernel::event::{PlayResult, SequenceState, SkipReason};
use pickup_kiosk::kernel::key::{FixedRole, SemanticKey};
use pickup_kiosk::kernel::player::CuePlayer;
use pickup_kiosk::kernel::registry::{AudioRegistry, ImportFile};
use pickup_kiosk::kernel::sequence::{
    Bindings, CueSequence, CueStep, CueTarget, SequenceBook, Trigger,
};
use pickup_kiosk::kernel::sequencer::CueSequencer;
use pickup_kiosk::kernel::store::AssetStore;
use pickup_kiosk::kernel::telemetry::event::TelemetryEvent;
use pickup_kiosk::kernel::telemetry::recorder::TelemetryRecorder;
use pickup_kiosk::outputs::mock_audio::RecordingSink;
use pickup_kiosk::audio::{AudioSink, SinkError};
use pickup_kiosk::kernel::registry::AudioAsset;
use pickup_kiosk::KioskError;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

struct Rig {
    _dir: TempDir,
    registry: Arc<AudioRegistry>,
    sink: Arc<RecordingSink>,
    telemetry: Arc<TelemetryRecorder>,
    sequencer: CueSequencer,
}

fn rig_with_book(book: SequenceBook) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let telemetry = Arc::new(TelemetryRecorder::new());
    let registry = Arc::new(AudioRegistry::init(
        AssetStore::new(dir.path()),
        Arc::clone(&telemetry),
    ));
    let sink = Arc::new(RecordingSink::new());
    let player = CuePlayer::new(Arc::clone(&registry), sink.clone(), Arc::clone(&telemetry));
    let sequencer = CueSequencer::new(player, book, Arc::clone(&telemetry));
    Rig {
        _dir: dir,
        registry,
        sink,
        telemetry,
        sequencer,
    }
}

fn rig() -> Rig {
    rig_with_book(SequenceBook::builtin())
}

fn import(rig: &Rig, names: &[&str]) {
    rig.registry
        .import_batch(names.iter().map(|n| ImportFile::new(*n, b"audio".to_vec())));
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn test_scan_schedules_three_attempts_without_assets() {
    let rig = rig();

    let handle = rig.sequencer.trigger(Trigger::OnScan, &Bindings::with_cell(77));
    let report = handle.finished().await.unwrap();

    assert_eq!(report.trigger, "onScan");
    let keys: Vec<_> = report.steps.iter().map(|s| s.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            Some(SemanticKey::Cell(77)),
            Some(SemanticKey::Fixed(FixedRole::Scan)),
            Some(SemanticKey::Fixed(FixedRole::Check)),
        ]
    );
    let offsets: Vec<_> = report.steps.iter().map(|s| s.fired_at).collect();
    assert_eq!(offsets, vec![ms(0), ms(1500), ms(4000)]);
    assert!(report
        .steps
        .iter()
        .all(|s| s.result == PlayResult::Skipped(SkipReason::NoAssetBound)));
    assert!(rig.sink.started().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scan_plays_bound_cues_at_absolute_offsets() {
    let rig = rig();
    import(&rig, &["77.mp3", "scan.mp3", "check.mp3"]);

    let t0 = Instant::now();
    let report = rig
        .sequencer
        .trigger(Trigger::OnScan, &Bindings::with_cell(77))
        .finished()
        .await
        .unwrap();

    assert!(report.steps.iter().all(|s| s.result.is_started()));
    let played: Vec<_> = rig
        .sink
        .started()
        .into_iter()
        .map(|c| (c.key.to_string(), c.at - t0))
        .collect();
    assert_eq!(
        played,
        vec![
            ("cell_77".to_string(), ms(0)),
            ("scan".to_string(), ms(1500)),
            ("check".to_string(), ms(4000)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_returns_before_any_step_fires() {
    let rig = rig();
    import(&rig, &["search.mp3", "12.mp3"]);

    let handle = rig.sequencer.trigger(Trigger::OnPhoneSearch, &Bindings::with_cell(12));
    assert_eq!(handle.state(), SequenceState::Pending);
    assert!(rig.sink.started().is_empty());

    let report = handle.finished().await.unwrap();
    assert_eq!(report.steps.len(), 2);
    assert_eq!(rig.sink.started_keys(), vec![
        SemanticKey::Fixed(FixedRole::Search),
        SemanticKey::Cell(12),
    ]);

    let states: Vec<_> = rig
        .telemetry
        .events()
        .into_iter()
        .filter_map(|e| match e {
            TelemetryEvent::SequenceLifecycle { state, .. } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![SequenceState::Running, SequenceState::Completed]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_step_does_not_halt_sequence() {
    let rig = rig();
    import(&rig, &["5.mp3", "scan.mp3", "check.mp3"]);
    rig.sink.fail_on(SemanticKey::Fixed(FixedRole::Scan));

    let report = rig
        .sequencer
        .trigger(Trigger::OnScan, &Bindings::with_cell(5))
        .finished()
        .await
        .unwrap();

    assert_eq!(report.steps[0].result, PlayResult::Started);
    assert!(matches!(report.steps[1].result, PlayResult::Failed(_)));
    assert_eq!(report.steps[2].result, PlayResult::Started);
    assert_eq!(rig.telemetry.snapshot().cue_stats.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_cell_binding_skips_only_that_step() {
    let rig = rig();
    import(&rig, &["scan.mp3", "check.mp3"]);

    let report = rig
        .sequencer
        .trigger(Trigger::OnScan, &Bindings::new())
        .finished()
        .await
        .unwrap();

    assert_eq!(report.steps[0].key, None);
    assert_eq!(
        report.steps[0].result,
        PlayResult::Skipped(SkipReason::UnresolvedPlaceholder)
    );
    assert!(report.steps[1].result.is_started());
    assert!(report.steps[2].result.is_started());
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_cell_binding_is_unresolved() {
    let rig = rig();
    let bindings = Bindings::new().bind("currentCell", 900);

    let report = rig
        .sequencer
        .trigger(Trigger::OnPhoneSearch, &bindings)
        .finished()
        .await
        .unwrap();

    assert_eq!(
        report.steps[1].result,
        PlayResult::Skipped(SkipReason::UnresolvedPlaceholder)
    );
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_sequences_both_play() {
    let rig = rig();
    import(&rig, &["1.mp3", "2.mp3", "scan.mp3", "check.mp3"]);

    let first = rig.sequencer.trigger(Trigger::OnScan, &Bindings::with_cell(1));
    tokio::time::sleep(ms(1000)).await;
    let second = rig.sequencer.trigger(Trigger::OnScan, &Bindings::with_cell(2));

    first.finished().await.unwrap();
    second.finished().await.unwrap();

    let keys: Vec<_> = rig.sink.started_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["cell_1", "cell_2", "scan", "scan", "check", "check"]);
}

#[tokio::test(start_paused = true)]
async fn test_every_trigger_is_graceful_with_empty_registry() {
    let rig = rig();

    for trigger in Trigger::ALL {
        let report = rig
            .sequencer
            .trigger(trigger, &Bindings::with_cell(100))
            .finished()
            .await
            .unwrap();
        assert!(report
            .steps
            .iter()
            .all(|s| s.result == PlayResult::Skipped(SkipReason::NoAssetBound)));
    }

    let snap = rig.telemetry.snapshot();
    assert_eq!(snap.cue_stats.attempts, 8);
    assert_eq!(snap.cue_stats.missing, 8);
    assert_eq!(snap.sequence_stats.completed, 5);
}

#[tokio::test(start_paused = true)]
async fn test_single_cue_triggers_play_their_role() {
    let rig = rig();
    import(&rig, &["rate.mp3", "accept.mp3", "return.mp3"]);

    for trigger in [Trigger::OnIssueComplete, Trigger::OnAccept, Trigger::OnReturn] {
        rig.sequencer
            .trigger(trigger, &Bindings::new())
            .finished()
            .await
            .unwrap();
    }

    assert_eq!(
        rig.sink.started_keys(),
        vec![
            SemanticKey::Fixed(FixedRole::Rate),
            SemanticKey::Fixed(FixedRole::Accept),
            SemanticKey::Fixed(FixedRole::Return),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_authored_sequence_reaches_ad_hoc_key() {
    let mut book = SequenceBook::builtin();
    book.author(CueSequence {
        name: "onGreeting".to_string(),
        steps: vec![
            CueStep::new(CueTarget::Key(SemanticKey::AdHoc("welcome".to_string())), 0),
            CueStep::new(CueTarget::CurrentCell, 500),
        ],
    })
    .unwrap();
    let rig = rig_with_book(book);
    import(&rig, &["welcome.mp3", "9.mp3"]);

    let report = rig
        .sequencer
        .run_named("onGreeting", &Bindings::with_cell(9))
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.steps[1].fired_at, ms(500));
    assert_eq!(
        rig.sink.started_keys(),
        vec![SemanticKey::AdHoc("welcome".to_string()), SemanticKey::Cell(9)]
    );
}

#[tokio::test]
async fn test_unknown_sequence_name_is_an_error() {
    let rig = rig();
    let result = rig.sequencer.run_named("onDance", &Bindings::new());
    assert!(matches!(result, Err(KioskError::UnknownTrigger(name)) if name == "onDance"));
}

#[test]
fn test_authored_sequence_cannot_shadow_builtin() {
    let mut book = SequenceBook::builtin();
    let result = book.author(CueSequence {
        name: "onScan".to_string(),
        steps: vec![],
    });
    assert!(result.is_err());
    assert_eq!(book.get("onScan"), Some(&Trigger::OnScan.sequence()));
}

#[test]
fn test_builtin_sequence_table() {
    let scan = Trigger::OnScan.sequence();
    assert_eq!(
        scan.steps,
        vec![
            CueStep::new(CueTarget::CurrentCell, 0),
            CueStep::new(CueTarget::Key(FixedRole::Scan.into()), 1500),
            CueStep::new(CueTarget::Key(FixedRole::Check.into()), 4000),
        ]
    );
    let phone = Trigger::OnPhoneSearch.sequence();
    assert_eq!(
        phone.steps,
        vec![
            CueStep::new(CueTarget::Key(FixedRole::Search.into()), 0),
            CueStep::new(CueTarget::CurrentCell, 1500),
        ]
    );
    assert_eq!("onReturn".parse::<Trigger>().unwrap(), Trigger::OnReturn);
    assert!(Trigger::OnScan.needs_cell());
    assert!(!Trigger::OnAccept.needs_cell());
}

/// Sink whose cell cues take a while to start, like a long decode.
struct SlowCellSink;

impl AudioSink for SlowCellSink {
    fn start(&self, asset: &AudioAsset) -> Result<(), SinkError> {
        if matches!(asset.key, SemanticKey::Cell(_)) {
            std::thread::sleep(ms(500));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_slow_sink_start_does_not_delay_later_steps() {
    let dir = tempfile::tempdir().unwrap();
    let telemetry = Arc::new(TelemetryRecorder::new());
    let registry = Arc::new(AudioRegistry::init(
        AssetStore::new(dir.path()),
        Arc::clone(&telemetry),
    ));
    registry.import_batch(vec![
        ImportFile::new("77.mp3", b"c".to_vec()),
        ImportFile::new("scan.mp3", b"s".to_vec()),
    ]);
    let player = CuePlayer::new(registry, Arc::new(SlowCellSink), Arc::clone(&telemetry));
    let sequencer = CueSequencer::new(player, SequenceBook::builtin(), telemetry);

    let sequence = CueSequence {
        name: "onQuickScan".to_string(),
        steps: vec![
            CueStep::new(CueTarget::CurrentCell, 0),
            CueStep::new(CueTarget::Key(FixedRole::Scan.into()), 150),
        ],
    };
    let report = sequencer
        .run(&sequence, &Bindings::with_cell(77))
        .finished()
        .await
        .unwrap();

    assert!(report.steps.iter().all(|s| s.result.is_started()));
    assert!(report.steps[0].fired_at < ms(100));
    let scan_at = report.steps[1].fired_at;
    assert!(
        scan_at >= ms(150) && scan_at < ms(450),
        "scan fired at {:?}",
        scan_at
    );
}
