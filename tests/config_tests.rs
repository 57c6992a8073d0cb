use std::path::PathBuf;
use std::time::Duration;

use mail_frame::config::{Configuration, DEFAULT_CONTROL_SOCKET_PATH, DEFAULT_QUERY};
use mail_frame::controller::SlideshowOptions;
use mail_frame::render::Bounds;

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.query, DEFAULT_QUERY);
    assert_eq!(cfg.seconds_per_image, 60);
    assert!(cfg.auto_refresh_on_wraparound);
    assert_eq!(cfg.empty_refresh_interval, Duration::from_secs(300));
    assert_eq!(cfg.display.bounds(), Bounds::new(1920, 1080));
    assert_eq!(
        cfg.control_socket_path,
        PathBuf::from(DEFAULT_CONTROL_SOCKET_PATH)
    );
    cfg.validated().unwrap();
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
spool-path: "/var/lib/mail-frame/spool"
cache-path: "/var/cache/mail-frame"
query: "label:family"
seconds-per-image: 15
auto-refresh-on-wraparound: false
empty-refresh-interval: 90s
display:
  width: 800
  height: 480
  output-path: "/run/mail-frame/frame.png"
control-socket-path: "/tmp/frame.sock"
"#;
    let cfg = serde_yaml::from_str::<Configuration>(yaml)
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.spool_path, PathBuf::from("/var/lib/mail-frame/spool"));
    assert_eq!(cfg.cache_path, PathBuf::from("/var/cache/mail-frame"));
    assert_eq!(cfg.empty_refresh_interval, Duration::from_secs(90));
    assert_eq!(cfg.display.bounds(), Bounds::new(800, 480));
    assert_eq!(cfg.time_per_image(), Duration::from_secs(15));

    let options = SlideshowOptions::from(&cfg);
    assert_eq!(options.query, "label:family");
    assert!(!options.auto_refresh_on_wraparound);
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
seconds-per-image: 10
transition: fade
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn zero_interval_is_invalid() {
    let cfg: Configuration = serde_yaml::from_str("seconds-per-image: 0").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("seconds-per-image"));
}

#[test]
fn blank_query_is_invalid() {
    let cfg: Configuration = serde_yaml::from_str("query: '   '").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn zero_sized_display_is_invalid() {
    let yaml = r#"
display:
  width: 0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "query: \"label:kiosk\"\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.query, "label:kiosk");
    assert!(Configuration::from_yaml_file(dir.path().join("missing.yaml")).is_err());
}
