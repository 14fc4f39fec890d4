use std::time::Duration;

/// How long a liveness probe result may be served from the status cache.
pub const STATUS_TTL: Duration = Duration::from_secs(30);

/// Minimum gap between two alerts for the same subject at the same source.
pub const NOTIFICATION_COOLDOWN: Duration = Duration::from_secs(60);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Cadence of the monitor loop's timer. Polling itself is gated by the poll interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

pub const RECENT_DETECTIONS_CAPACITY: usize = 50;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const CONFIG_DIR_NAME: &str = "CamWatch";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SOURCES_FILE_NAME: &str = "cameras.json";
