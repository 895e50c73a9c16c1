// Configuration loading, validation, and default generation
use serde::Deserialize;
use std::fs;

use tracing::{error, info, warn};

use crate::features::Credentials;
use crate::handler::MIN_BUFFER_SIZE;

pub const DEFAULT_PATH: &str = "slimhttp.toml";
const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub server: Srv,
    pub http: Http,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Srv {
    pub listen_addr: String,
    pub logging: bool,
    pub log_level: String,
}

/// Per-request handler settings, resolved once at startup.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Http {
    pub buffer_size: usize,
    pub request_timeout_ms: u64,
    pub enable_cors: bool,
    pub store_get_parameters: bool,
    pub store_post_parameters: bool,
    /// `<base64 user:pass>[:realm]`; empty disables authentication.
    pub authentication: String,
    pub user: String,
    pub password: String,
    pub realm: String,
}

impl Default for Srv {
    fn default() -> Self {
        Srv {
            listen_addr: DEFAULT_LISTEN.to_string(),
            logging: true,
            log_level: "info".to_string(),
        }
    }
}

impl Default for Http {
    fn default() -> Self {
        Http {
            buffer_size: 1024,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            enable_cors: false,
            store_get_parameters: true,
            store_post_parameters: true,
            authentication: String::new(),
            user: String::new(),
            password: String::new(),
            realm: String::new(),
        }
    }
}

impl Srv {
    pub fn validate(&mut self) -> bool {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            error!("listen_addr '{}' is not a valid address (expected ip:port)", self.listen_addr);
            return false;
        }
        true
    }
}

impl Http {
    /// Clamps out-of-range values. Never fails.
    pub fn validate(&mut self) {
        if self.buffer_size < MIN_BUFFER_SIZE {
            warn!("buffer_size too small ({}), using {MIN_BUFFER_SIZE}", self.buffer_size);
            self.buffer_size = MIN_BUFFER_SIZE;
        }
        if self.request_timeout_ms == 0 {
            warn!("request_timeout_ms is 0, using {DEFAULT_TIMEOUT_MS}");
            self.request_timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        if self.authentication.is_empty() && self.user.is_empty() != self.password.is_empty() {
            warn!("only one of user/password is set, authentication stays disabled");
        }
        if !self.authentication.is_empty() && !self.user.is_empty() {
            warn!("both authentication and user are set, using authentication");
        }
    }

    /// The configured credential spec, if any. A raw `authentication`
    /// spec wins over a plain user/password pair.
    pub fn credentials(&self) -> Option<Credentials> {
        if !self.authentication.is_empty() {
            return Credentials::parse(&self.authentication);
        }
        if self.user.is_empty() || self.password.is_empty() {
            return None;
        }
        let realm = Some(self.realm.as_str()).filter(|r| !r.is_empty());
        Some(Credentials::from_user_password(&self.user, &self.password, realm))
    }
}

impl Config {
    /// Applies every section's corrections; an unusable listen address is
    /// replaced by the default.
    pub fn validate(&mut self) {
        if !self.server.validate() {
            warn!("listen_addr invalid, using {DEFAULT_LISTEN}");
            self.server.listen_addr = DEFAULT_LISTEN.to_string();
        }
        self.http.validate();
    }
}

fn atomic_write(path: &str, content: &str) -> std::io::Result<()> {
    let tmp = format!("{path}.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(String),
    Generated(String),
    /// Defaults in use; the string says why.
    Defaults(String),
}

/// Loads the file named by `--config` (default `slimhttp.toml`).
pub fn load_config() -> (Config, Source) {
    load_from(&path())
}

/// Reads `p`, generating it from defaults when missing. Nothing is logged
/// here since the subscriber depends on the result; callers report the
/// [`Source`] and run [`Config::validate`] once logging is up.
pub fn load_from(p: &str) -> (Config, Source) {
    match fs::read_to_string(p) {
        Ok(txt) => match toml::from_str(&txt) {
            Ok(c) => (c, Source::File(p.to_string())),
            Err(e) => (Config::default(), Source::Defaults(format!("parse error in {p}: {e}"))),
        },
        Err(_) => {
            let cfg = Config::default();
            let content = generate_config(&cfg);
            match atomic_write(p, &content) {
                Ok(()) => (cfg, Source::Generated(p.to_string())),
                Err(e) => (cfg, Source::Defaults(format!("no config at '{p}' and cannot create it: {e}"))),
            }
        }
    }
}

impl Source {
    pub fn report(&self) {
        match self {
            Source::File(p) => info!("Loaded {p}"),
            Source::Generated(p) => info!("Generated {p}"),
            Source::Defaults(why) => warn!("{why}; using defaults"),
        }
    }
}

pub fn generate_config(cfg: &Config) -> String {
    let mut doc = toml::Table::new();

    let mut srv = toml::Table::new();
    srv.insert("listen_addr".into(), toml::Value::String(cfg.server.listen_addr.clone()));
    srv.insert("logging".into(), toml::Value::Boolean(cfg.server.logging));
    srv.insert("log_level".into(), toml::Value::String(cfg.server.log_level.clone()));
    doc.insert("server".into(), toml::Value::Table(srv));

    let mut http = toml::Table::new();
    http.insert("buffer_size".into(), toml::Value::Integer(cfg.http.buffer_size as i64));
    http.insert("request_timeout_ms".into(), toml::Value::Integer(cfg.http.request_timeout_ms as i64));
    http.insert("enable_cors".into(), toml::Value::Boolean(cfg.http.enable_cors));
    http.insert("store_get_parameters".into(), toml::Value::Boolean(cfg.http.store_get_parameters));
    http.insert("store_post_parameters".into(), toml::Value::Boolean(cfg.http.store_post_parameters));
    http.insert("authentication".into(), toml::Value::String(cfg.http.authentication.clone()));
    http.insert("user".into(), toml::Value::String(cfg.http.user.clone()));
    http.insert("password".into(), toml::Value::String(cfg.http.password.clone()));
    http.insert("realm".into(), toml::Value::String(cfg.http.realm.clone()));
    doc.insert("http".into(), toml::Value::Table(http));

    match toml::to_string_pretty(&doc) {
        Ok(s) => s,
        Err(e) => {
            error!("Config serialization failed: {e}");
            String::new()
        }
    }
}

fn path() -> String {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| DEFAULT_PATH.to_string())
}
