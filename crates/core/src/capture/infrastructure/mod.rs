pub mod capture_error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_stream_source;
pub mod http_snapshot_source;
pub mod image_file_source;
pub mod image_file_store;
pub mod routing_frame_source;
