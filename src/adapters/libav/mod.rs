// LibAV adapter - Media collaborators on top of ffmpeg-next

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec::{self, decoder, encoder};
use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame;
use ffmpeg_next::{ffi, media, Dictionary, Packet, Rational};

use crate::domain::model::*;
use crate::error::{BackendError, CodecOpenError};
use crate::ports::*;

/// ffmpeg-next implementation of every media port
pub struct LibavBackend;

impl LibavBackend {
    /// Initialize libav; safe to call more than once
    pub fn new() -> Result<Self, BackendError> {
        ffmpeg::init().map_err(|e| backend_error("Failed to initialize FFmpeg", e))?;
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
        Ok(Self)
    }

    /// Versions of the linked libav libraries
    pub fn version_info() -> String {
        format!(
            "libavformat {} / libavcodec {} / libswscale {}",
            unpack_version(format::version()),
            unpack_version(codec::version()),
            unpack_version(ffmpeg::software::scaling::version()),
        )
    }
}

fn unpack_version(v: u32) -> String {
    format!("{}.{}.{}", v >> 16, (v >> 8) & 0xff, v & 0xff)
}

fn backend_error(context: &str, err: ffmpeg::Error) -> BackendError {
    BackendError::with_code(format!("{}: {}", context, err), i32::from(err))
}

fn is_eagain(err: &ffmpeg::Error) -> bool {
    matches!(err, ffmpeg::Error::Other { errno } if *errno == ffmpeg::util::error::EAGAIN)
}

/// Stream timebases can be unset (0/0) in some containers
fn timebase_from(rational: Rational) -> Timebase {
    Timebase::new(rational.numerator(), rational.denominator()).unwrap_or_else(|_| Timebase::av_time_base())
}

fn rational_from(timebase: Timebase) -> Rational {
    Rational::new(timebase.num, timebase.den)
}

fn pixel_name(pixel: Pixel) -> Option<PixelFormat> {
    pixel.descriptor().map(|d| PixelFormat::new(d.name()))
}

fn parse_pixel(format: &PixelFormat) -> Result<Pixel, BackendError> {
    format
        .as_str()
        .parse::<Pixel>()
        .map_err(|_| BackendError::new(format!("Unknown pixel format: {}", format)))
}

/// Parameters of one stream; the kind comes from the medium even when the
/// codec context could not be created
fn stream_params(medium: media::Type, decoder: Result<decoder::Decoder, ffmpeg::Error>) -> StreamParams {
    match medium {
        media::Type::Video => {
            let video = decoder.and_then(|d| d.video()).ok();
            StreamParams::Video(VideoParams {
                width: video.as_ref().map_or(0, |v| v.width()),
                height: video.as_ref().map_or(0, |v| v.height()),
                pixel_format: video.as_ref().and_then(|v| pixel_name(v.format())),
            })
        }
        media::Type::Audio => {
            let audio = decoder.and_then(|d| d.audio()).ok();
            StreamParams::Audio(AudioParams {
                sample_rate: audio.as_ref().map_or(0, |a| a.rate()),
                channels: audio.as_ref().map_or(0, |a| a.channels() as u32),
            })
        }
        _ => StreamParams::Other,
    }
}

fn describe_stream(stream: &format::stream::Stream) -> StreamDescriptor {
    let parameters = stream.parameters();
    let codec_id = parameters.id();
    let medium = parameters.medium();
    let decoder = codec::context::Context::from_parameters(parameters).map(|ctx| ctx.decoder());

    StreamDescriptor {
        index: stream.index(),
        codec: codec_id.name().to_string(),
        time_base: timebase_from(stream.time_base()),
        params: stream_params(medium, decoder),
    }
}

/// Opened input container
pub struct LibavInput {
    ctx: format::context::Input,
    info: MediaInfo,
}

impl Demuxer for LibavInput {
    type Packet = Packet;

    fn media_info(&self) -> &MediaInfo {
        &self.info
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, BackendError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.ctx) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(backend_error("Failed to read packet", e)),
        }
    }
}

/// Output container; the file handle is opened separately from the context
pub struct LibavOutput {
    ctx: format::context::Output,
    path: CString,
    io_open: bool,
}

impl Muxer for LibavOutput {
    type Packet = Packet;

    fn requires_global_header(&self) -> bool {
        self.ctx
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER)
    }

    fn open_io(&mut self) -> Result<(), BackendError> {
        if self.io_open || self.ctx.format().flags().contains(format::Flags::NO_FILE) {
            return Ok(());
        }

        // SAFETY: ctx is a live output context without an attached pb
        let ret = unsafe {
            ffi::avio_open(
                &mut (*self.ctx.as_mut_ptr()).pb,
                self.path.as_ptr(),
                ffi::AVIO_FLAG_WRITE as i32,
            )
        };
        if ret < 0 {
            return Err(backend_error("Failed to open output file", ffmpeg::Error::from(ret)));
        }
        self.io_open = true;
        Ok(())
    }

    fn write_header(&mut self) -> Result<(), BackendError> {
        self.ctx
            .write_header()
            .map_err(|e| backend_error("Failed to write header", e))
    }

    fn stream_time_base(&self, index: usize) -> Option<Timebase> {
        self.ctx
            .stream(index)
            .map(|stream| timebase_from(stream.time_base()))
    }

    fn write_interleaved(&mut self, packet: &mut Packet) -> Result<(), BackendError> {
        packet
            .write_interleaved(&mut self.ctx)
            .map_err(|e| backend_error("Failed to write packet", e))
    }

    fn write_trailer(&mut self) -> Result<(), BackendError> {
        self.ctx
            .write_trailer()
            .map_err(|e| backend_error("Failed to write trailer", e))
    }

    fn close_io(&mut self) {
        if self.io_open {
            // SAFETY: pb was opened by avio_open above; avio_closep nulls it
            unsafe {
                ffi::avio_closep(&mut (*self.ctx.as_mut_ptr()).pb);
            }
            self.io_open = false;
        }
    }
}

pub struct LibavDecoder {
    inner: decoder::Video,
    codec: String,
}

impl VideoDecoder for LibavDecoder {
    type Packet = Packet;
    type Frame = frame::Video;

    fn codec_name(&self) -> &str {
        &self.codec
    }

    fn output_params(&self) -> VideoParams {
        VideoParams {
            width: self.inner.width(),
            height: self.inner.height(),
            pixel_format: pixel_name(self.inner.format()),
        }
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<SendStatus, BackendError> {
        match self.inner.send_packet(packet) {
            Ok(()) => Ok(SendStatus::Accepted),
            Err(e) if is_eagain(&e) => Ok(SendStatus::OutputPending),
            Err(e) => Err(backend_error("Failed to send packet to decoder", e)),
        }
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        match self.inner.send_eof() {
            Ok(()) | Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(backend_error("Failed to flush decoder", e)),
        }
    }

    fn receive_frame(&mut self) -> Result<CodecOutput<frame::Video>, BackendError> {
        let mut decoded = frame::Video::empty();
        match self.inner.receive_frame(&mut decoded) {
            Ok(()) => Ok(CodecOutput::Ready(decoded)),
            Err(ffmpeg::Error::Eof) => Ok(CodecOutput::EndOfStream),
            Err(e) if is_eagain(&e) => Ok(CodecOutput::NeedsMoreInput),
            Err(e) => Err(backend_error("Failed to decode frame", e)),
        }
    }
}

pub struct LibavEncoder {
    inner: encoder::Video,
    codec: codec::Codec,
    time_base: Timebase,
}

impl VideoEncoder for LibavEncoder {
    type Packet = Packet;
    type Frame = frame::Video;

    fn name(&self) -> &str {
        self.codec.name()
    }

    fn time_base(&self) -> Timebase {
        self.time_base
    }

    fn send_frame(&mut self, frame: &frame::Video) -> Result<SendStatus, BackendError> {
        match self.inner.send_frame(frame) {
            Ok(()) => Ok(SendStatus::Accepted),
            Err(e) if is_eagain(&e) => Ok(SendStatus::OutputPending),
            Err(e) => Err(backend_error("Failed to send frame to encoder", e)),
        }
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        match self.inner.send_eof() {
            Ok(()) | Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(backend_error("Failed to flush encoder", e)),
        }
    }

    fn receive_packet(&mut self) -> Result<CodecOutput<Packet>, BackendError> {
        let mut packet = Packet::empty();
        match self.inner.receive_packet(&mut packet) {
            Ok(()) => Ok(CodecOutput::Ready(packet)),
            Err(ffmpeg::Error::Eof) => Ok(CodecOutput::EndOfStream),
            Err(e) if is_eagain(&e) => Ok(CodecOutput::NeedsMoreInput),
            Err(e) => Err(backend_error("Failed to receive packet from encoder", e)),
        }
    }
}

pub struct LibavScaler {
    ctx: scaling::Context,
}

impl FrameScaler for LibavScaler {
    type Frame = frame::Video;

    fn scale(&mut self, source: &frame::Video, target: &mut frame::Video) -> Result<(), BackendError> {
        let input = self.ctx.input();
        if input.format != source.format()
            || input.width != source.width()
            || input.height != source.height()
        {
            let output = self.ctx.output();
            let (format, width, height) = (output.format, output.width, output.height);
            self.ctx.cached(
                source.format(),
                source.width(),
                source.height(),
                format,
                width,
                height,
                scaling::Flags::BICUBIC,
            );
            // SAFETY: only the pointer value is inspected
            if unsafe { self.ctx.as_ptr().is_null() } {
                return Err(BackendError::new(format!(
                    "Failed to rebuild scaler for {}x{} {:?}",
                    source.width(),
                    source.height(),
                    source.format()
                )));
            }
        }

        // SAFETY: target is an allocated frame; the encoder may still reference its buffers
        let ret = unsafe { ffi::av_frame_make_writable(target.as_mut_ptr()) };
        if ret < 0 {
            return Err(backend_error("Frame buffer not writable", ffmpeg::Error::from(ret)));
        }

        self.ctx
            .run(source, target)
            .map_err(|e| backend_error("Failed to scale frame", e))
    }
}

impl MediaPacket for Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }

    fn set_stream_index(&mut self, index: usize) {
        self.set_stream(index);
    }

    fn pts(&self) -> Option<i64> {
        Packet::pts(self)
    }

    fn dts(&self) -> Option<i64> {
        Packet::dts(self)
    }

    fn rescale_ts(&mut self, from: Timebase, to: Timebase) {
        Packet::rescale_ts(self, rational_from(from), rational_from(to));
    }

    fn clear_position(&mut self) {
        self.set_position(-1);
    }

    fn size(&self) -> usize {
        Packet::size(self)
    }
}

impl VideoFrame for frame::Video {
    fn width(&self) -> u32 {
        frame::Video::width(self)
    }

    fn height(&self) -> u32 {
        frame::Video::height(self)
    }

    fn pixel_format(&self) -> PixelFormat {
        pixel_name(self.format()).unwrap_or_else(|| PixelFormat::new("none"))
    }

    fn pts(&self) -> Option<i64> {
        frame::Frame::pts(self)
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        frame::Frame::set_pts(self, pts);
    }
}

impl MediaBackend for LibavBackend {
    type Packet = Packet;
    type Frame = frame::Video;
    type Input = LibavInput;
    type Output = LibavOutput;
    type Decoder = LibavDecoder;
    type Encoder = LibavEncoder;
    type Scaler = LibavScaler;

    fn open_input(&self, path: &Path) -> Result<LibavInput, BackendError> {
        let ctx = format::input(&path).map_err(|e| backend_error("Failed to open input", e))?;

        let duration = ctx.duration();
        let info = MediaInfo {
            path: path.display().to_string(),
            container: ctx.format().name().to_string(),
            duration_seconds: (duration > 0)
                .then(|| duration as f64 / f64::from(ffi::AV_TIME_BASE)),
            streams: ctx.streams().map(|s| describe_stream(&s)).collect(),
        };

        Ok(LibavInput { ctx, info })
    }

    fn open_decoder(
        &self,
        input: &LibavInput,
        stream: &StreamDescriptor,
        low_delay: bool,
    ) -> Result<LibavDecoder, CodecOpenError> {
        let source = input.ctx.stream(stream.index).ok_or_else(|| {
            CodecOpenError::Open(BackendError::new(format!(
                "Input stream {} not found",
                stream.index
            )))
        })?;

        let mut ctx = codec::context::Context::from_parameters(source.parameters())
            .map_err(|e| CodecOpenError::Open(backend_error("Failed to create decoder context", e)))?;
        if low_delay {
            ctx.set_flags(codec::Flags::LOW_DELAY);
        }

        let codec = decoder::find(source.parameters().id())
            .ok_or_else(|| CodecOpenError::Unavailable(stream.codec.clone()))?;
        let inner = ctx
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|e| CodecOpenError::Open(backend_error("Failed to open decoder", e)))?;

        Ok(LibavDecoder {
            inner,
            codec: stream.codec.clone(),
        })
    }

    fn create_output(&self, path: &Path) -> Result<LibavOutput, BackendError> {
        let c_path = CString::new(path.to_string_lossy().as_bytes())
            .map_err(|_| BackendError::new("Output path contains a NUL byte"))?;

        let mut raw = ptr::null_mut();
        // SAFETY: on success raw points to a fresh context that Output::wrap takes ownership of
        let ret = unsafe {
            ffi::avformat_alloc_output_context2(&mut raw, ptr::null(), ptr::null(), c_path.as_ptr())
        };
        if ret < 0 || raw.is_null() {
            return Err(backend_error(
                "Failed to allocate output context",
                ffmpeg::Error::from(ret.min(-1)),
            ));
        }

        Ok(LibavOutput {
            ctx: unsafe { format::context::Output::wrap(raw) },
            path: c_path,
            io_open: false,
        })
    }

    fn open_encoder(&self, profile: &Profile, global_header: bool) -> Result<LibavEncoder, CodecOpenError> {
        let codec = encoder::find_by_name(&profile.encoder)
            .ok_or_else(|| CodecOpenError::Unavailable(profile.encoder.clone()))?;
        let pixel = parse_pixel(&profile.pixel_format).map_err(CodecOpenError::Open)?;
        let time_base = profile.time_base();

        let mut setup = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| CodecOpenError::Open(backend_error("Failed to create encoder context", e)))?;
        setup.set_width(profile.width);
        setup.set_height(profile.height);
        setup.set_format(pixel);
        setup.set_time_base(rational_from(time_base));
        setup.set_frame_rate(Some(Rational::new(profile.frame_rate as i32, 1)));
        setup.set_bit_rate(profile.bit_rate as usize);
        setup.set_gop(profile.gop_size);
        setup.set_max_b_frames(profile.max_b_frames as usize);
        if global_header {
            setup.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut options = Dictionary::new();
        for (key, value) in profile.encoder_options() {
            options.set(&key, &value);
        }

        let inner = setup
            .open_as_with(codec, options)
            .map_err(|e| CodecOpenError::Open(backend_error("Failed to open encoder", e)))?;

        Ok(LibavEncoder {
            inner,
            codec,
            time_base,
        })
    }

    fn add_video_stream(&self, output: &mut LibavOutput, encoder: &LibavEncoder) -> Result<usize, BackendError> {
        let mut stream = output
            .ctx
            .add_stream(encoder.codec)
            .map_err(|e| backend_error("Failed to add video stream", e))?;
        stream.set_time_base(rational_from(encoder.time_base));
        stream.set_parameters(&encoder.inner);
        Ok(stream.index())
    }

    fn add_passthrough_stream(
        &self,
        output: &mut LibavOutput,
        input: &LibavInput,
        stream: &StreamDescriptor,
    ) -> Result<usize, BackendError> {
        let source = input
            .ctx
            .stream(stream.index)
            .ok_or_else(|| BackendError::new(format!("Input stream {} not found", stream.index)))?;

        let mut target = output
            .ctx
            .add_stream(encoder::find(codec::Id::None))
            .map_err(|e| backend_error("Failed to add passthrough stream", e))?;
        target.set_parameters(source.parameters());
        target.set_time_base(source.time_base());
        // SAFETY: codecpar was just populated by set_parameters; the input
        // container's codec tag may be invalid in the output container
        unsafe {
            (*(*target.as_mut_ptr()).codecpar).codec_tag = 0;
        }
        Ok(target.index())
    }

    fn create_scaler(&self, source: &VideoParams, profile: &Profile) -> Result<LibavScaler, BackendError> {
        let target = parse_pixel(&profile.pixel_format)?;
        let source_format = match &source.pixel_format {
            Some(format) => parse_pixel(format)?,
            // rebuilt from the first decoded frame
            None => target,
        };

        let ctx = scaling::Context::get(
            source_format,
            source.width.max(1),
            source.height.max(1),
            target,
            profile.width,
            profile.height,
            scaling::Flags::BICUBIC,
        )
        .map_err(|e| backend_error("Failed to create scaler", e))?;

        Ok(LibavScaler { ctx })
    }

    fn alloc_frame(&self, profile: &Profile) -> Result<frame::Video, BackendError> {
        let pixel = parse_pixel(&profile.pixel_format)?;
        let mut target = frame::Video::new(pixel, profile.width, profile.height);
        // SAFETY: reading the first plane pointer of a frame we own
        let allocated = unsafe { !(*target.as_mut_ptr()).data[0].is_null() };
        if !allocated {
            return Err(BackendError::new(format!(
                "Could not allocate {}x{} {} frame",
                profile.width, profile.height, profile.pixel_format
            )));
        }
        Ok(target)
    }
}
