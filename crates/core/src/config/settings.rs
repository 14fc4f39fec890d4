use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerting::infrastructure::email_alert_sink::EmailConfig;
use crate::monitoring::poll_scheduler::PollPolicy;
use crate::shared::constants::{
    CONFIG_DIR_NAME, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_HTTP_TIMEOUT, DEFAULT_POLL_INTERVAL,
    DEFAULT_SMTP_PORT, DEFAULT_SMTP_SERVER, DEFAULT_TICK_INTERVAL, SETTINGS_FILE_NAME,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// User-tunable monitoring settings, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum match confidence (0-1) that raises an alert.
    pub confidence_threshold: f64,
    pub poll_interval_secs: u64,
    pub tick_interval_ms: u64,
    pub http_timeout_secs: u64,
    /// Directory of reference face images, one file per person.
    pub gallery_dir: PathBuf,
    /// Where manual captures are written.
    pub capture_dir: PathBuf,
    /// Optional JSON-lines log of every detection.
    pub detection_log: Option<PathBuf>,
    /// Alerts are POSTed here when set.
    pub webhook_url: Option<String>,
    /// Mail alerts over SMTP with STARTTLS. With neither email nor a webhook,
    /// alerts only go to the log.
    pub email_enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
}


fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

impl Default for Settings {
    fn default() -> Self {
        let root = data_root();
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
            gallery_dir: root.join("references"),
            capture_dir: root.join("captures"),
            detection_log: None,
            webhook_url: None,
            email_enabled: false,
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            sender_email: String::new(),
            sender_password: String::new(),
            recipient_email: String::new(),
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let settings: Self = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(SettingsError::Invalid(format!(
                "confidence_threshold must be within 0..=1, got {}",
                self.confidence_threshold
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "tick_interval_ms must be at least 1".into(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "http_timeout_secs must be at least 1".into(),
            ));
        }
        if self.email_enabled {
            self.validate_email()?;
        }
        Ok(())
    }

    fn validate_email(&self) -> Result<(), SettingsError> {
        if self.smtp_server.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "smtp_server is required when email is enabled".into(),
            ));
        }
        if self.smtp_port == 0 {
            return Err(SettingsError::Invalid("smtp_port must be 1-65535".into()));
        }
        for (field, value) in [
            ("sender_email", &self.sender_email),
            ("recipient_email", &self.recipient_email),
        ] {
            if value.trim().parse::<lettre::Address>().is_err() {
                return Err(SettingsError::Invalid(format!(
                    "{field} is not a valid email address: '{value}'"
                )));
            }
        }
        Ok(())
    }

    /// SMTP settings for the email sink, if email alerts are enabled.
    pub fn email_config(&self) -> Option<EmailConfig> {
        self.email_enabled.then(|| EmailConfig {
            smtp_server: self.smtp_server.trim().to_string(),
            smtp_port: self.smtp_port,
            sender: self.sender_email.trim().to_string(),
            password: self.sender_password.clone(),
            recipient: self.recipient_email.trim().to_string(),
            timeout: self.http_timeout(),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            confidence_threshold: self.confidence_threshold,
            poll_interval: self.poll_interval(),
        }
    }
}
