use crate::support::CleanEnv;
use heartflow::config::Config;
use heartflow::llm::ProviderRegistry;
use std::fs;
use tempfile::TempDir;

#[test]
fn first_run_writes_a_disabled_default_config() {
    let _env = CleanEnv::acquire();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");

    let config = Config::load_or_init_at(&path).unwrap();

    assert!(path.exists());
    assert!(!config.enabled);
    assert_eq!(config.debounce.quiet_secs, 6);
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[judge]"));
    assert!(written.contains("reply_threshold"));
}

#[test]
fn partial_file_keeps_defaults_for_missing_keys() {
    let _env = CleanEnv::acquire();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    fs::write(
        &path,
        r#"
enabled = true

[judge]
provider = "local"
max_retries = 1

[whitelist]
enabled = true
chats = ["g1"]

[providers.local]
base_url = "http://127.0.0.1:8080/v1"
model = "qwen2.5-0.5b"
"#,
    )
    .unwrap();

    let config = Config::load_or_init_at(&path).unwrap();

    assert!(config.enabled);
    assert_eq!(config.judge.max_retries, 1);
    assert!((config.judge.reply_threshold - 0.6).abs() < f64::EPSILON);
    assert!(config.chat_allowed("g1"));
    assert!(!config.chat_allowed("g2"));

    let registry = ProviderRegistry::from_config(&config);
    assert_eq!(registry.ids(), vec!["local"]);
}

#[test]
fn invalid_threshold_is_rejected() {
    let _env = CleanEnv::acquire();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    fs::write(&path, "[judge]\nreply_threshold = 1.5\n").unwrap();

    let err = Config::load_or_init_at(&path).unwrap_err();

    assert!(format!("{err:#}").contains("threshold"));
}

#[test]
fn threshold_override_applies_only_while_set() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    fs::write(&path, "[judge]\nreply_threshold = 0.6\n").unwrap();

    {
        let _env = CleanEnv::acquire().set("HEARTFLOW_REPLY_THRESHOLD", "0.45");
        let config = Config::load_or_init_at(&path).unwrap();
        assert!((config.judge.reply_threshold - 0.45).abs() < f64::EPSILON);
    }

    let _env = CleanEnv::acquire();
    let config = Config::load_or_init_at(&path).unwrap();
    assert!((config.judge.reply_threshold - 0.6).abs() < f64::EPSILON);
    assert!(config.judge.provider.is_none());
}
