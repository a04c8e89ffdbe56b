use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use streamchat::Config;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config pointing at `base_url/chat` with no loading delay
#[allow(dead_code)]
pub fn config_for(base_url: &str, timeout_ms: u64) -> Config {
    let mut config = Config::default();
    config.endpoint.url = format!("{}/chat", base_url);
    config.endpoint.timeout_ms = timeout_ms;
    config.widget.loading_delay_ms = 0;
    config
}
