pub mod cycle_report;
pub mod detection_recorder;
pub mod error;
pub mod infrastructure;
pub mod monitoring_session;
pub mod orchestrator;
pub mod poll_scheduler;
pub mod status_cache;
