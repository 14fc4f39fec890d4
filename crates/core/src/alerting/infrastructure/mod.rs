pub mod email_alert_sink;
pub mod fanout_alert_sink;
pub mod log_alert_sink;
pub mod webhook_alert_sink;
