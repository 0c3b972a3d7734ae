use super::*;

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("chat_client_settings_{suffix}.toml"));
    fs::write(&path, contents).expect("write settings");
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(Path::new("/nonexistent/client.toml"), no_env);
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.typing_idle_window(), Duration::from_secs(2));
}

#[test]
fn file_values_are_overridden_by_env() {
    let path = temp_settings_file(
        "server_url = \"https://chat.example.com/\"\ntyping_idle_ms = \"1500\"\nmessage_page_size = \"50\"\n",
    );
    let env_vars: HashMap<&str, &str> = [("APP__MESSAGE_PAGE_SIZE", "10")].into_iter().collect();

    let settings = load_settings_from(&path, |name| env_vars.get(name).map(|v| v.to_string()));
    assert_eq!(settings.server_url, "https://chat.example.com/");
    assert_eq!(settings.typing_idle_ms, 1500);
    assert_eq!(settings.message_page_size, 10);
    assert_eq!(settings.presence_poll_secs, 30);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn malformed_numbers_are_ignored() {
    let settings = load_settings_from(Path::new("/nonexistent/client.toml"), |name| {
        (name == "APP__PRESENCE_POLL_SECS").then(|| "soon".to_string())
    });
    assert_eq!(settings.presence_poll_secs, 30);
}

#[test]
fn ws_url_follows_http_scheme() {
    let mut settings = ClientSettings::default();
    assert_eq!(settings.ws_url().expect("ws url"), "ws://127.0.0.1:8443/ws");

    settings.server_url = "https://chat.example.com/".into();
    assert_eq!(settings.ws_url().expect("ws url"), "wss://chat.example.com/ws");

    settings.server_url = "ftp://chat.example.com".into();
    assert!(settings.ws_url().is_err());
}
