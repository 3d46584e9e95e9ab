//! Integration tests for harness loading

use hwproof_config::*;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../harness")
        .join(name)
}

#[test]
fn test_sby_and_toml_forms_agree() {
    let sby = HarnessConfig::load(fixture("TransparentLatch.sby")).unwrap();
    let toml = HarnessConfig::load(fixture("TransparentLatch.toml")).unwrap();
    assert_eq!(sby, toml);
}

#[test]
fn test_transparent_latch_harness() {
    let config = HarnessConfig::load(fixture("TransparentLatch.sby")).unwrap();

    let bmc = &config.tasks["bmc"];
    assert_eq!(bmc.mode, Mode::Bmc);
    assert_eq!(bmc.depth(), 10);
    assert!(bmc.options.multiclock);

    let cover = &config.tasks["cover"];
    assert_eq!(cover.mode, Mode::Cover);
    assert_eq!(cover.depth(), 10);

    assert_eq!(config.engine.to_string(), "smtbmc z3");
    let steps: Vec<String> = config.script.iter().map(ToString::to_string).collect();
    assert_eq!(
        steps,
        vec![
            "read_rtlil TransparentLatch.il",
            "techmap -map dlatch2dff top/t:$dlatch/w:clk",
            "prep -top top",
        ]
    );
}

#[test]
fn test_missing_file() {
    let err = HarnessConfig::load(fixture("Missing.sby")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_written_harness_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.sby");
    std::fs::write(
        &path,
        "[tasks]\nquick\n[options]\nmode cover\ndepth 3\ntimeout 5\n[engines]\nabc pdr\n",
    )
    .unwrap();

    let config = HarnessConfig::load(&path).unwrap();
    assert_eq!(config.engine, EngineSpec::new("abc", "pdr"));
    assert_eq!(
        config.tasks["quick"].options.timeout,
        Some(std::time::Duration::from_secs(5))
    );
    assert!(config.script.is_empty());
}
