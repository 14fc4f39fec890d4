use thiserror::Error;

use crate::shared::source::SourceDescriptor;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no frame source handles descriptor '{0}'")]
    Unsupported(SourceDescriptor),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read stream from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}
