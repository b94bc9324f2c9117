use chat_message_wc::config::{AppConfig, OutputMode};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

const BIN: &str = "chat-message-wc";

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("CHAT_SERVER__PORT");
        env::remove_var("CHAT_SERVER__HOST");
        env::remove_var("CHAT_DEV_TOOLBAR__ENABLED");
        env::remove_var("CHAT_PROFILE");
        env::remove_var("CHAT_HOST");
        env::remove_var("PORT");
        env::remove_var("CONFIG_FILE");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args([BIN]).expect("defaults should load");

    assert_eq!(config.server.port, 1420);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.build.output, OutputMode::Static);
    assert_eq!(config.build.assets, "assets");
    assert_eq!(config.assets_dir(), PathBuf::from("dist").join("assets"));
    assert!(!config.dev_toolbar.enabled);
}

#[test]
#[serial]
fn test_loopback_profile() {
    clear_env_vars();

    let config = AppConfig::load_from_args([BIN, "--profile", "loopback"]).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.bind_address(), "127.0.0.1:1420");
}

#[test]
#[serial]
fn test_profile_from_env() {
    clear_env_vars();
    unsafe {
        env::set_var("CHAT_PROFILE", "loopback");
    }

    let config = AppConfig::load_from_args([BIN]).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");

    clear_env_vars();
}

#[test]
#[serial]
fn test_host_flag_beats_profile() {
    clear_env_vars();

    let config =
        AppConfig::load_from_args([BIN, "--profile", "loopback", "--host", "192.168.1.5"]).unwrap();
    assert_eq!(config.server.host, "192.168.1.5");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("CHAT_SERVER__PORT", "9090");
        env::set_var("CHAT_DEV_TOOLBAR__ENABLED", "true");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert!(config.dev_toolbar.enabled);

    clear_env_vars();
}

#[test]
#[serial]
fn test_port_flag_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("CHAT_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args([BIN, "--port", "4321"]).unwrap();
    assert_eq!(config.server.port, 4321);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    write!(
        file,
        "server:\n  port: 7070\nbuild:\n  out_dir: public\n  assets: _astro\n"
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = AppConfig::load_from_args([BIN, "--config", path.as_str()])
        .expect("Failed to load config from file");

    assert_eq!(config.server.port, 7070);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.assets_dir(), PathBuf::from("public").join("_astro"));
}

#[test]
#[serial]
fn test_missing_config_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args([BIN, "--config", "/definitely/not/here.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_invalid_output_mode_is_an_error() {
    clear_env_vars();

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(file, "build:\n  output: hybrid\n").unwrap();

    let path = file.path().to_str().unwrap().to_string();
    assert!(AppConfig::load_from_args([BIN, "--config", path.as_str()]).is_err());
}
