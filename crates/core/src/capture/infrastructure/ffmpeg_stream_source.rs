use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::source::SourceDescriptor;

/// Grabs single frames from RTSP/HTTP streams and V4L2 devices via ffmpeg-next.
///
/// Each call opens a fresh input, decodes the first video frame, converts it
/// to RGB24 and closes the connection again. The socket timeout is passed to
/// libavformat so a dead camera cannot hang the caller.
pub struct FfmpegStreamSource {
    timeout: Duration,
}

// Safety: no ffmpeg state outlives a single call.
unsafe impl Send for FfmpegStreamSource {}

impl FfmpegStreamSource {
    pub fn new(timeout: Duration) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();
        Ok(Self { timeout })
    }

    fn open(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
        let location = match descriptor {
            SourceDescriptor::Device(index) => format!("/dev/video{index}"),
            SourceDescriptor::Stream(url) => url.clone(),
        };
        let micros = self.timeout.as_micros().to_string();
        let mut options = ffmpeg_next::Dictionary::new();
        options.set("rw_timeout", &micros);
        if location.starts_with("rtsp://") {
            options.set("rtsp_transport", "tcp");
        }
        Ok(ffmpeg_next::format::input_with_dictionary(&location, options)?)
    }
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

fn decode_first_frame(
    ictx: &mut ffmpeg_next::format::context::Input,
) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or("No video stream found")?;
    let video_stream_index = stream.index();
    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let mut decoder = codec_ctx.decoder().video()?;

    let width = decoder.width();
    let height = decoder.height();
    let mut scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        width,
        height,
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )?;

    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
    for (stream, packet) in ictx.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&decoded, &mut rgb_frame)?;
            let pixels = extract_rgb_pixels(&rgb_frame, width, height);
            return Ok(Some(Frame::new(pixels, width, height)));
        }
    }
    Ok(None)
}

impl FrameSource for FfmpegStreamSource {
    fn probe(&mut self, descriptor: &SourceDescriptor) -> Result<bool, Box<dyn std::error::Error>> {
        let ictx = self.open(descriptor)?;
        Ok(ictx.streams().best(ffmpeg_next::media::Type::Video).is_some())
    }

    fn capture(
        &mut self,
        descriptor: &SourceDescriptor,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut ictx = self.open(descriptor)?;
        decode_first_frame(&mut ictx)
    }
}
