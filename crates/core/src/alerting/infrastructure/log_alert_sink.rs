use crate::alerting::domain::alert_sink::AlertSink;

/// Writes alerts to the `log` facade at warn level.
///
/// The fallback sink when no external channel is configured.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error>> {
        log::warn!("ALERT: {message}");
        Ok(())
    }
}
