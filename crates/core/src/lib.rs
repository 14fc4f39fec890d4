pub mod alerting;
pub mod capture;
pub mod config;
pub mod monitoring;
pub mod recognition;
pub mod shared;
