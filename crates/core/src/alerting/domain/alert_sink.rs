/// Delivers a human-readable alert to some external channel.
///
/// Implementations bound their own delivery time. Errors are reported to the
/// caller, who logs them; they never stop monitoring.
pub trait AlertSink: Send {
    fn notify(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error>>;
}
