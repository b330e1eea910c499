use gridwatch::config::Config;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.regions = vec!["AZPS".to_string(), "SRP".to_string(), "WALC".to_string()];
    cfg.polling.interval_secs = 60;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.regions.len(), 3);
    assert_eq!(loaded.polling.interval_secs, 60);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn partial_yaml_keeps_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"eia:\n  state_id: NM\nweb:\n  port: 9100\n").unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.eia.state_id, "NM");
    assert_eq!(cfg.web.port, 9100);
    assert_eq!(cfg.polling.live_cache_ttl_secs, 300);
    assert_eq!(cfg.timezone, "America/Phoenix");
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    cfg.eia.request_timeout_secs = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.polling.historical_cache_ttl_secs = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.eia.fallback_residential_rate = f64::NAN;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.network.probe_host.clear();
    assert!(cfg.validate().is_err());
    cfg.network.probe_enabled = false;
    assert!(cfg.validate().is_ok());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    assert!(format!("{}", err).contains("Serialization error"));
}
