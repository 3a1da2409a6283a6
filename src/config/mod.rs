use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Settings that may be kept in a YAML file; CLI flags take precedence.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub target_ip: Option<String>,
    pub target_port: Option<u16>,
    pub delay: Option<f64>,
    pub skip_final_delay: Option<bool>,
    pub timeout: Option<u64>,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
    pub user: Option<String>,
    #[serde(alias = "user_list")]
    pub user_wordlist: Option<String>,
    #[serde(alias = "password_list")]
    pub password_wordlist: Option<String>,
    #[serde(alias = "output_dir")]
    pub out_file_path: Option<String>,
    pub file_name: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn parse_config(contents: &str) -> Result<ConfigFile, String> {
    serde_yaml::from_str::<ConfigFile>(contents).map_err(|e| e.to_string())
}

pub fn load_config(path: &PathBuf) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}
