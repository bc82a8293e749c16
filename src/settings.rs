use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    #[serde(default = "default_listen")]
    pub listen: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Store {
    pub backend: Backend,
    #[serde(default)]
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

/// Administrator created at startup when no account with this email exists.
#[derive(Debug, Clone, Deserialize)]
pub struct Admin {
    pub email: String,
    pub password: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qr {
    #[serde(default = "default_qr_size")]
    pub size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub store: Store,
    pub postgres: Option<Postgres>,
    pub session: Session,
    pub admin: Option<Admin>,
    pub qr: Qr,
}

/// Thirty days.
pub const MAX_SESSION_TTL_MINUTES: i64 = 43_200;

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_ttl_minutes() -> i64 {
    480
}

fn default_display_name() -> String {
    "Administrator".to_string()
}

fn default_qr_size() -> u32 {
    256
}

impl Default for Session {
    fn default() -> Self {
        Session {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl Default for Qr {
    fn default() -> Self {
        Qr {
            size: default_qr_size(),
        }
    }
}

impl Settings {
    /// Reads `path` and overlays `FUELPAY__SECTION__KEY` environment
    /// variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.listen", default_listen())?
            .set_default("session.ttl_minutes", default_ttl_minutes())?
            .set_default("qr.size", default_qr_size())?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("FUELPAY").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ttl = self.session.ttl_minutes;
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&ttl) {
            return Err(ConfigError::Message(format!(
                "session.ttl_minutes must be between 1 and {}, got {}",
                MAX_SESSION_TTL_MINUTES, ttl
            )));
        }

        Ok(())
    }

    /// Settings for an in-memory deployment with nothing else configured.
    pub fn in_memory() -> Self {
        Settings {
            server: Server {
                listen: default_listen(),
            },
            store: Store {
                backend: Backend::Memory,
                seed_demo_data: false,
            },
            postgres: None,
            session: Session::default(),
            admin: None,
            qr: Qr::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_toml_with_defaults() {
        let dir = std::env::temp_dir().join(format!("fuelpay-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fuelpay.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[store]
backend = "memory"
seed_demo_data = true

[admin]
email = "admin@fuelpay.com"
password = "admin123"
"#
        )
        .unwrap();

        let settings = Settings::load(path.to_str().unwrap()).unwrap();

        assert_eq!(settings.store.backend, Backend::Memory);
        assert!(settings.store.seed_demo_data);
        assert_eq!(settings.server.listen, "0.0.0.0:8080");
        assert_eq!(settings.session.ttl_minutes, 480);
        assert_eq!(settings.qr.size, 256);
        assert_eq!(settings.admin.unwrap().display_name, "Administrator");
        assert!(settings.postgres.is_none());
    }

    fn write_config(name: &str, body: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("fuelpay-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn rejects_out_of_range_session_ttl() {
        for ttl in ["0", "-5", "9223372036854775807"] {
            let path = write_config(
                &format!("ttl{}.toml", ttl),
                &format!("[store]\nbackend = \"memory\"\n\n[session]\nttl_minutes = {}\n", ttl),
            );

            let result = Settings::load(path.to_str().unwrap());
            assert!(result.is_err(), "ttl {} was accepted", ttl);
        }

        let path = write_config(
            "ttl-max.toml",
            &format!(
                "[store]\nbackend = \"memory\"\n\n[session]\nttl_minutes = {}\n",
                MAX_SESSION_TTL_MINUTES
            ),
        );
        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.session.ttl_minutes, MAX_SESSION_TTL_MINUTES);
    }
}
