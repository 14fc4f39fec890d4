pub mod frame_source;
pub mod frame_store;
