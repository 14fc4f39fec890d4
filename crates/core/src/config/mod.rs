pub mod settings;
pub mod source_registry;
