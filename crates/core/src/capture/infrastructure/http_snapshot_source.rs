use std::io::Read;
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::capture_error::CaptureError;
use crate::shared::frame::Frame;
use crate::shared::source::SourceDescriptor;

/// Upper bound on bytes read while looking for one JPEG in an MJPEG stream.
const MAX_STREAM_BYTES: usize = 8 * 1024 * 1024;

const READ_CHUNK: usize = 16 * 1024;
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Captures stills from IP cameras over HTTP.
///
/// Handles both single-image snapshot endpoints and `multipart/x-mixed-replace`
/// MJPEG streams; for the latter only the first complete JPEG is read and the
/// connection is dropped. Every request is bounded by the client timeout.
pub struct HttpSnapshotSource {
    client: reqwest::blocking::Client,
}

impl HttpSnapshotSource {
    pub fn new(timeout: Duration) -> Result<Self, CaptureError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CaptureError::Http {
                url: String::new(),
                source: e,
            })?;
        Ok(Self { client })
    }

    fn url(descriptor: &SourceDescriptor) -> Result<&str, CaptureError> {
        match descriptor {
            SourceDescriptor::Stream(url) if descriptor.is_http() => Ok(url.as_str()),
            _ => Err(CaptureError::Unsupported(descriptor.clone())),
        }
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, CaptureError> {
        let response = self.client.get(url).send().map_err(|e| CaptureError::Http {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl FrameSource for HttpSnapshotSource {
    fn probe(&mut self, descriptor: &SourceDescriptor) -> Result<bool, Box<dyn std::error::Error>> {
        let url = Self::url(descriptor)?;
        match self.get(url) {
            Ok(_) => Ok(true),
            Err(CaptureError::Status { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn capture(
        &mut self,
        descriptor: &SourceDescriptor,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let url = Self::url(descriptor)?;
        let mut response = self.get(url)?;
        let is_multipart = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().starts_with("multipart/"))
            .unwrap_or(false);

        let jpeg = if is_multipart {
            read_first_jpeg(&mut response, MAX_STREAM_BYTES).map_err(|e| CaptureError::Read {
                url: url.to_string(),
                source: e,
            })?
        } else {
            let mut body = Vec::new();
            response
                .read_to_end(&mut body)
                .map_err(|e| CaptureError::Read {
                    url: url.to_string(),
                    source: e,
                })?;
            Some(body)
        };

        let Some(bytes) = jpeg else {
            return Ok(None);
        };
        let img = image::load_from_memory(&bytes).map_err(CaptureError::Decode)?;
        Ok(Some(Frame::from_rgb_image(img.to_rgb8())))
    }
}

/// Reads from `reader` until one complete JPEG (SOI..EOI) has been seen.
///
/// Marker segments are skipped by their length fields, so an EOI inside an
/// embedded EXIF thumbnail does not end the frame early. Returns `None` if the
/// stream ends or `max_bytes` is exceeded first.
pub fn read_first_jpeg<R: Read>(reader: &mut R, max_bytes: usize) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut start: Option<usize> = None;
    let mut cursor = JpegCursor::Marker(JPEG_SOI.len());
    let mut scanned = 0usize;

    while buf.len() < max_bytes {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);

        let s = match start {
            Some(s) => s,
            None => {
                // Back up one byte so a marker split across reads is still found.
                let from = scanned.saturating_sub(1);
                scanned = buf.len();
                match find_marker(&buf[from..], JPEG_SOI) {
                    Some(i) => {
                        start = Some(from + i);
                        from + i
                    }
                    None => continue,
                }
            }
        };

        match walk_segments(&buf[s..], cursor)? {
            Walk::Complete(len) => return Ok(Some(buf[s..s + len].to_vec())),
            Walk::Incomplete(resume) => cursor = resume,
        }
    }
    Ok(None)
}

/// Where to resume walking a partially received JPEG, relative to its SOI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JpegCursor {
    /// Next byte should begin a marker.
    Marker(usize),
    /// Inside entropy-coded scan data.
    Entropy(usize),
}

enum Walk {
    Complete(usize),
    Incomplete(JpegCursor),
}

fn walk_segments(data: &[u8], mut cursor: JpegCursor) -> std::io::Result<Walk> {
    loop {
        match cursor {
            JpegCursor::Marker(pos) => {
                let (Some(&lead), Some(&marker)) = (data.get(pos), data.get(pos + 1)) else {
                    return Ok(Walk::Incomplete(cursor));
                };
                if lead != 0xFF {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("expected JPEG marker at offset {pos}"),
                    ));
                }
                match marker {
                    // Fill byte before the real marker.
                    0xFF => cursor = JpegCursor::Marker(pos + 1),
                    0xD9 => return Ok(Walk::Complete(pos + JPEG_EOI.len())),
                    // Standalone markers carry no length.
                    0x01 | 0xD0..=0xD7 => cursor = JpegCursor::Marker(pos + 2),
                    _ => {
                        let (Some(&hi), Some(&lo)) = (data.get(pos + 2), data.get(pos + 3)) else {
                            return Ok(Walk::Incomplete(cursor));
                        };
                        let len = u16::from_be_bytes([hi, lo]) as usize;
                        if len < 2 {
                            return Err(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                format!("JPEG segment length {len} at offset {pos}"),
                            ));
                        }
                        let next = pos + 2 + len;
                        cursor = if marker == 0xDA {
                            JpegCursor::Entropy(next)
                        } else {
                            JpegCursor::Marker(next)
                        };
                    }
                }
            }
            JpegCursor::Entropy(pos) => {
                let Some(rest) = data.get(pos..) else {
                    return Ok(Walk::Incomplete(cursor));
                };
                let Some(i) = rest.iter().position(|&b| b == 0xFF) else {
                    return Ok(Walk::Incomplete(JpegCursor::Entropy(data.len())));
                };
                let at = pos + i;
                let Some(&next) = data.get(at + 1) else {
                    return Ok(Walk::Incomplete(JpegCursor::Entropy(at)));
                };
                cursor = match next {
                    // Stuffed zero and restart markers stay inside the scan.
                    0x00 | 0xD0..=0xD7 => JpegCursor::Entropy(at + 2),
                    0xFF => JpegCursor::Entropy(at + 1),
                    _ => JpegCursor::Marker(at),
                };
            }
        }
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields at most `step` bytes per read to exercise split markers.
    struct Trickle {
        inner: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.step);
            self.inner.read(&mut buf[..n])
        }
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    fn multipart(parts: &[&[u8]]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
            body.extend_from_slice(part);
            body.extend_from_slice(b"\r\n");
        }
        body
    }

    #[test]
    fn test_reads_first_jpeg_from_multipart() {
        let jpeg = jpeg_bytes();
        let body = multipart(&[&jpeg, &jpeg]);

        let found = read_first_jpeg(&mut Cursor::new(body), MAX_STREAM_BYTES)
            .unwrap()
            .unwrap();

        assert_eq!(found, jpeg);
        assert!(image::load_from_memory(&found).is_ok());
    }

    #[test]
    fn test_markers_split_across_reads() {
        let jpeg = jpeg_bytes();
        let mut reader = Trickle {
            inner: Cursor::new(multipart(&[&jpeg])),
            step: 1,
        };

        let found = read_first_jpeg(&mut reader, MAX_STREAM_BYTES).unwrap().unwrap();

        assert_eq!(found, jpeg);
    }

    /// Splices an EXIF-style APP1 segment holding a complete thumbnail
    /// right after the outer frame's SOI.
    fn with_embedded_thumbnail(outer: &[u8], thumbnail: &[u8]) -> Vec<u8> {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(thumbnail);
        let len = u16::try_from(payload.len() + 2).unwrap();

        let mut out = outer[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&outer[2..]);
        out
    }

    #[test]
    fn test_embedded_thumbnail_does_not_end_frame() {
        let thumbnail = jpeg_bytes();
        let outer = {
            let img = image::RgbImage::from_fn(32, 24, |x, y| image::Rgb([x as u8 * 8, y as u8 * 10, 90]));
            let mut out = Cursor::new(Vec::new());
            image::DynamicImage::ImageRgb8(img)
                .write_to(&mut out, image::ImageFormat::Jpeg)
                .unwrap();
            out.into_inner()
        };
        let jpeg = with_embedded_thumbnail(&outer, &thumbnail);
        let body = multipart(&[&jpeg, &thumbnail]);

        let found = read_first_jpeg(&mut Cursor::new(body), MAX_STREAM_BYTES)
            .unwrap()
            .unwrap();

        assert_eq!(found.len(), jpeg.len());
        assert_eq!(found, jpeg);
    }

    #[test]
    fn test_embedded_thumbnail_split_across_reads() {
        let thumbnail = jpeg_bytes();
        let jpeg = with_embedded_thumbnail(&jpeg_bytes(), &thumbnail);
        let mut reader = Trickle {
            inner: Cursor::new(multipart(&[&jpeg])),
            step: 7,
        };

        let found = read_first_jpeg(&mut reader, MAX_STREAM_BYTES).unwrap().unwrap();

        assert_eq!(found, jpeg);
    }

    #[test]
    fn test_garbage_after_soi_is_rejected() {
        let body = [b"--frame\r\n\r\n".as_slice(), &[0xFF, 0xD8, 0x12, 0x34, 0x56]].concat();
        let err = read_first_jpeg(&mut Cursor::new(body), MAX_STREAM_BYTES).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_stream_returns_none() {
        let jpeg = jpeg_bytes();
        let truncated = multipart(&[&jpeg[..jpeg.len() - 4]]);
        let found = read_first_jpeg(&mut Cursor::new(truncated), MAX_STREAM_BYTES).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_gives_up_after_max_bytes() {
        let noise = vec![0u8; 64 * 1024];
        let found = read_first_jpeg(&mut Cursor::new(noise), 1024).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_rejects_non_http_descriptors() {
        let mut source = HttpSnapshotSource::new(Duration::from_secs(1)).unwrap();
        assert!(source.probe(&SourceDescriptor::Device(0)).is_err());
        assert!(source
            .capture(&SourceDescriptor::Stream("rtsp://cam/live".into()))
            .is_err());
    }
}
