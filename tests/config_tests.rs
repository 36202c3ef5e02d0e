use pickup_kiosk::config::KioskConfig;
use pickup_kiosk::import::collect_dir;
use pickup_kiosk::kernel::key::SemanticKey;
use pickup_kiosk::kernel::sequence::{CueStep, CueTarget, Trigger};
use std::time::Duration;

#[test]
fn test_empty_config_uses_defaults() {
    let config = KioskConfig::from_toml_str("").unwrap();
    assert_eq!(config.volume, 1.0);
    assert!(config.output_device.is_none());
    assert!(config.sequences.is_empty());
    assert!(config.data_dir.ends_with("pickup-kiosk") || config.data_dir.ends_with("pickup-kiosk-data"));

    let book = config.sequence_book().unwrap();
    for trigger in Trigger::ALL {
        assert_eq!(book.get(trigger.name()), Some(&trigger.sequence()));
    }
}

#[test]
fn test_authored_sequence_is_parsed() {
    let config = KioskConfig::from_toml_str(
        r#"
        data_dir = "/var/lib/kiosk"
        output_device = "USB Speaker"
        volume = 0.8

        [[sequence]]
        name = "onGreeting"
        steps = [
            { key = "welcome" },
            { key = "cell_<currentCell>", delay_ms = 1200 },
            { key = "scan", delay_ms = 3000 },
        ]
        "#,
    )
    .unwrap();

    assert_eq!(config.data_dir, std::path::PathBuf::from("/var/lib/kiosk"));
    assert_eq!(config.output_device.as_deref(), Some("USB Speaker"));

    let book = config.sequence_book().unwrap();
    let greeting = book.get("onGreeting").unwrap();
    assert_eq!(
        greeting.steps,
        vec![
            CueStep::new(CueTarget::Key(SemanticKey::AdHoc("welcome".to_string())), 0),
            CueStep::new(CueTarget::CurrentCell, 1200),
            CueStep::new(CueTarget::Key("scan".parse().unwrap()), 3000),
        ]
    );
    assert_eq!(greeting.steps[1].delay, Duration::from_millis(1200));
    assert!(book.names().any(|n| n == "onScan"));
}

#[test]
fn test_volume_is_clamped() {
    assert_eq!(KioskConfig::from_toml_str("volume = 3.5").unwrap().volume, 1.0);
    assert_eq!(KioskConfig::from_toml_str("volume = -1.0").unwrap().volume, 0.0);
}

#[test]
fn test_shadowing_builtin_is_rejected() {
    let config = KioskConfig::from_toml_str(
        r#"
        [[sequence]]
        name = "onAccept"
        steps = [{ key = "scan" }]
        "#,
    )
    .unwrap();
    assert!(config.sequence_book().is_err());
}

#[test]
fn test_out_of_range_cell_step_is_rejected() {
    let config = KioskConfig::from_toml_str(
        r#"
        [[sequence]]
        name = "onFar"
        steps = [{ key = "cell_900" }]
        "#,
    )
    .unwrap();
    assert!(config.sequence_book().is_err());
}

#[test]
fn test_malformed_toml_is_an_error() {
    assert!(KioskConfig::from_toml_str("volume = ").is_err());
    assert!(KioskConfig::from_toml_str("volume = \"loud\"").is_err());
}

#[test]
fn test_explicit_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    assert!(KioskConfig::load(Some(&dir.path().join("missing.toml"))).is_err());

    let path = dir.path().join("kiosk.toml");
    std::fs::write(&path, "volume = 0.25\n").unwrap();
    assert_eq!(KioskConfig::load(Some(&path)).unwrap().volume, 0.25);
}

#[test]
fn test_collect_dir_reads_nested_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("cells")).unwrap();
    std::fs::write(dir.path().join("scan.mp3"), b"s").unwrap();
    std::fs::write(dir.path().join("cells").join("12.wav"), b"12").unwrap();

    let files = collect_dir(dir.path()).unwrap();
    let mut names: Vec<_> = files.iter().map(|f| f.file_name.replace('\\', "/")).collect();
    names.sort();
    assert_eq!(names, vec!["cells/12.wav", "scan.mp3"]);

    assert!(collect_dir(&dir.path().join("scan.mp3")).is_err());
}
