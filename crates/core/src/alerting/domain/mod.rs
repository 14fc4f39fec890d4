pub mod alert_sink;
pub mod notification_debouncer;
