use crate::alerting::domain::alert_sink::AlertSink;

/// Delivers each alert to every configured channel.
///
/// A failing channel does not stop delivery to the others; the call fails if
/// any channel failed.
pub struct FanoutAlertSink {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl FanoutAlertSink {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AlertSink for FanoutAlertSink {
    fn notify(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error>> {
        let failures: Vec<String> = self
            .sinks
            .iter_mut()
            .filter_map(|sink| sink.notify(message).err().map(|e| e.to_string()))
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; ").into())
        }
    }
}
