//! Pipeline controller: setup, packet dispatch, flush sequence, teardown

use std::path::Path;
use std::time::Instant;

use crate::domain::errors::DomainError;
use crate::domain::model::{MediaInfo, Profile, Stats};
use crate::domain::rules::ProfileRules;
use crate::engine::decode::DecodeStage;
use crate::engine::encode::EncodeStage;
use crate::engine::passthrough::AudioPassthrough;
use crate::engine::progress::{ProgressCallback, ProgressInfo, ProgressPhase};
use crate::engine::resources::Resources;
use crate::engine::transform::TransformStage;
use crate::engine::EngineConfig;
use crate::error::{BackendError, MediaStreamRole, TranscodeError, TranscodeResult};
use crate::output::{MuxWriter, StreamRoute};
use crate::ports::{
    Demuxer, LogEvent, LogLevel, LogPort, MediaBackend, MediaPacket, SendStatus, VideoDecoder,
    VideoEncoder,
};
use crate::streams::{StreamClassifier, StreamSelection};

/// Runs one input through decode → transform → encode → mux, audio alongside
pub struct Transcoder<'a, B: MediaBackend> {
    backend: &'a B,
    log: &'a dyn LogPort,
    progress: Option<&'a dyn ProgressCallback>,
    config: EngineConfig,
}

/// Borrowed view of a fully set up run
struct Pipeline<'s, B: MediaBackend> {
    input: &'s mut B::Input,
    decode: &'s mut DecodeStage<B::Decoder>,
    sink: VideoSink<'s, B>,
    audio: Option<AudioPassthrough>,
    selection: StreamSelection,
    info: MediaInfo,
    position_seconds: f64,
}

/// Everything downstream of the decoder
struct VideoSink<'s, B: MediaBackend> {
    transform: &'s mut TransformStage<B::Scaler>,
    encode: &'s mut EncodeStage<B::Encoder>,
    writer: &'s mut MuxWriter<B::Output>,
    route: StreamRoute,
}

impl<'a, B: MediaBackend> Transcoder<'a, B> {
    pub fn new(backend: &'a B, log: &'a dyn LogPort) -> Self {
        Self {
            backend,
            log,
            progress: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Transcode `input` into `output` with `profile`.
    ///
    /// Success means the trailer was written. On any error the partially
    /// written output must be treated as invalid.
    pub fn run(&self, input: &Path, output: &Path, profile: &Profile) -> TranscodeResult<Stats> {
        ProfileRules::validate(profile).map_err(|e| match e {
            DomainError::InvalidProfile(msg) => TranscodeError::InvalidProfile(msg),
            other => TranscodeError::InvalidProfile(other.to_string()),
        })?;

        let started = Instant::now();
        self.log.log_event(
            &LogEvent::new(LogLevel::Info, "Starting transcode")
                .with("input", input.display())
                .with("output", output.display())
                .with("profile", profile),
        );

        let mut stats = Stats::default();
        let mut resources = Resources::<B>::new();
        let result = self
            .setup(&mut resources, input, output, profile)
            .and_then(|mut pipeline| self.execute(&mut pipeline, &mut stats, started));
        resources.release();
        self.log.debug("Released pipeline resources");

        match &result {
            Ok(()) => {
                self.log.log_event(
                    &LogEvent::new(LogLevel::Info, "Transcode completed")
                        .with("frames", stats.frame_count)
                        .with("video_packets", stats.video_packet_count)
                        .with("audio_packets", stats.audio_packet_count)
                        .with("flushed_packets", stats.flush_count)
                        .with("elapsed_ms", started.elapsed().as_millis()),
                );
                if let Some(progress) = self.progress {
                    progress.on_complete(&stats);
                }
            }
            Err(TranscodeError::Cancelled { packets }) => {
                self.log.log_event(
                    &LogEvent::new(LogLevel::Warn, "Transcode cancelled")
                        .with("packets", packets),
                );
                if let Some(progress) = self.progress {
                    progress.on_cancel();
                }
            }
            Err(e) => {
                self.log.log_event(
                    &LogEvent::new(LogLevel::Error, "Transcode failed")
                        .with("kind", e.kind().code())
                        .with("error", e),
                );
                if let Some(progress) = self.progress {
                    progress.on_error(e);
                }
            }
        }

        result.map(|()| stats)
    }

    fn setup<'s>(
        &self,
        resources: &'s mut Resources<B>,
        input_path: &Path,
        output_path: &Path,
        profile: &Profile,
    ) -> TranscodeResult<Pipeline<'s, B>> {
        let input = resources.input.insert(
            self.backend
                .open_input(input_path)
                .map_err(|source| TranscodeError::InputOpen {
                    path: input_path.display().to_string(),
                    source,
                })?,
        );
        let info = input.media_info().clone();
        self.log.log_event(
            &LogEvent::new(LogLevel::Debug, "Opened input")
                .with("container", &info.container)
                .with("streams", info.total_streams()),
        );

        let classifier = if self.config.audio_enabled {
            StreamClassifier::new()
        } else {
            StreamClassifier::without_audio()
        };
        let selection = classifier.classify(&info)?;
        self.log_selection(&selection);

        let decode = resources.decode.insert(DecodeStage::open(
            self.backend,
            &*input,
            &selection.video,
            self.config.low_delay,
        )?);
        let source_params = decode.decoder().output_params();
        self.log.log_event(
            &LogEvent::new(LogLevel::Debug, "Opened decoder")
                .with("codec", decode.decoder().codec_name())
                .with("width", source_params.width)
                .with("height", source_params.height),
        );

        let output_setup = |source: BackendError| TranscodeError::OutputSetup {
            path: output_path.display().to_string(),
            source,
        };
        let output = self
            .backend
            .create_output(output_path)
            .map_err(output_setup)?;
        let writer = resources.writer.insert(MuxWriter::new(output, output_path));

        let global_header = writer.requires_global_header();
        let encode = resources
            .encode
            .insert(EncodeStage::open(self.backend, profile, global_header)?);
        self.log.log_event(
            &LogEvent::new(LogLevel::Debug, "Opened encoder")
                .with("encoder", encode.encoder().name())
                .with("time_base", encode.time_base())
                .with("global_header", global_header),
        );

        let video_index = self
            .backend
            .add_video_stream(writer.output_mut(), encode.encoder())
            .map_err(output_setup)?;
        let audio_index = match &selection.audio {
            Some(stream) => Some(
                self.backend
                    .add_passthrough_stream(writer.output_mut(), &*input, stream)
                    .map_err(output_setup)?,
            ),
            None => None,
        };

        let transform = resources.transform.insert(TransformStage::open(
            self.backend,
            &source_params,
            profile,
        )?);

        writer.open()?;
        self.log.debug("Wrote output header");

        let route = StreamRoute::new(
            video_index,
            encode.time_base(),
            writer.stream_time_base(video_index)?,
        );
        let audio = match (&selection.audio, audio_index) {
            (Some(stream), Some(index)) => Some(AudioPassthrough::new(
                stream.index,
                StreamRoute::new(index, stream.time_base, writer.stream_time_base(index)?),
            )),
            _ => None,
        };

        if let Some(progress) = self.progress {
            progress.on_start(&info);
        }

        Ok(Pipeline {
            input,
            decode,
            sink: VideoSink {
                transform,
                encode,
                writer,
                route,
            },
            audio,
            selection,
            info,
            position_seconds: 0.0,
        })
    }

    fn log_selection(&self, selection: &StreamSelection) {
        self.log.log_event(
            &LogEvent::new(LogLevel::Info, "Selected video stream").with("stream", &selection.video),
        );
        match &selection.audio {
            Some(stream) => self.log.log_event(
                &LogEvent::new(LogLevel::Info, "Selected audio stream for passthrough")
                    .with("stream", stream),
            ),
            None => self.log.info("No audio stream selected, passthrough disabled"),
        }
        for index in &selection.ignored {
            self.log
                .log_event(&LogEvent::new(LogLevel::Debug, "Ignoring stream").with("index", index));
        }
    }

    fn execute(
        &self,
        pipeline: &mut Pipeline<'_, B>,
        stats: &mut Stats,
        started: Instant,
    ) -> TranscodeResult<()> {
        let mut packets_read: u64 = 0;

        loop {
            if self.progress.map_or(false, |p| p.should_cancel()) {
                return Err(TranscodeError::Cancelled {
                    packets: packets_read,
                });
            }

            let mut packet = match pipeline.input.read_packet().map_err(TranscodeError::Demux)? {
                Some(packet) => packet,
                None => break,
            };
            packets_read += 1;

            match pipeline.selection.route(packet.stream_index()) {
                Some(MediaStreamRole::Video) => {
                    stats.video_packet_count += 1;
                    if let Some(pts) = packet.pts() {
                        let seconds = pipeline.selection.video.time_base.pts_to_seconds(pts);
                        pipeline.position_seconds = pipeline.position_seconds.max(seconds);
                    }
                    Self::decode_packet(pipeline, &packet, stats)?;
                }
                Some(MediaStreamRole::Audio) => {
                    if let Some(audio) = &pipeline.audio {
                        audio.forward(&mut packet);
                        pipeline
                            .sink
                            .writer
                            .write(&mut packet, MediaStreamRole::Audio)?;
                        stats.audio_packet_count += 1;
                    }
                }
                None => stats.ignored_packets += 1,
            }

            if self.config.progress_interval > 0 && packets_read % self.config.progress_interval == 0 {
                self.report(pipeline, stats, ProgressPhase::Transcoding, started);
            }
        }

        self.log.log_event(
            &LogEvent::new(LogLevel::Debug, "Input exhausted, flushing")
                .with("packets", packets_read)
                .with("frames", stats.frame_count),
        );
        self.report(pipeline, stats, ProgressPhase::Flushing, started);
        self.flush(pipeline, stats)?;

        self.report(pipeline, stats, ProgressPhase::Finalizing, started);
        pipeline.sink.writer.finish()?;
        self.log.debug("Wrote output trailer");
        Ok(())
    }

    /// Submit one video packet, draining and resubmitting while the decoder has output pending
    fn decode_packet(
        pipeline: &mut Pipeline<'_, B>,
        packet: &B::Packet,
        stats: &mut Stats,
    ) -> TranscodeResult<()> {
        loop {
            let status = pipeline.decode.submit(packet)?;
            let mut drained = 0;
            for frame in pipeline.decode.drain() {
                let frame = frame?;
                drained += 1;
                stats.decoded_frames += 1;
                pipeline.sink.push_frame(&frame, stats)?;
            }

            match status {
                SendStatus::Accepted => return Ok(()),
                SendStatus::OutputPending if drained > 0 => continue,
                SendStatus::OutputPending => {
                    return Err(TranscodeError::Decode(BackendError::new(
                        "decoder refused input without producing output",
                    )))
                }
            }
        }
    }

    /// End-of-input flush: decoder, then encoder. Trailer is written by the caller.
    fn flush(&self, pipeline: &mut Pipeline<'_, B>, stats: &mut Stats) -> TranscodeResult<()> {
        match Self::flush_decoder(pipeline, stats) {
            Ok(recovered) => self.log.log_event(
                &LogEvent::new(LogLevel::Debug, "Decoder flushed").with("frames", recovered),
            ),
            Err(TranscodeError::Decode(source)) => {
                stats.flush_decode_error = true;
                self.log.log_event(
                    &LogEvent::new(LogLevel::Warn, "Decode error during flush, continuing with encoder flush")
                        .with("error", &source),
                );
            }
            Err(other) => return Err(other),
        }

        pipeline.sink.encode.flush()?;
        let flushed = pipeline.sink.write_encoded(stats)?;
        stats.flush_count += flushed;
        self.log.log_event(
            &LogEvent::new(LogLevel::Debug, "Encoder flushed").with("packets", flushed),
        );
        Ok(())
    }

    fn flush_decoder(pipeline: &mut Pipeline<'_, B>, stats: &mut Stats) -> TranscodeResult<u64> {
        pipeline.decode.flush()?;
        let mut recovered = 0;
        for frame in pipeline.decode.drain() {
            let frame = frame?;
            recovered += 1;
            stats.decoded_frames += 1;
            pipeline.sink.push_frame(&frame, stats)?;
        }
        Ok(recovered)
    }

    fn report(&self, pipeline: &Pipeline<'_, B>, stats: &Stats, phase: ProgressPhase, started: Instant) {
        if let Some(progress) = self.progress {
            progress.on_progress(&ProgressInfo {
                phase,
                position_seconds: pipeline.position_seconds,
                duration_seconds: pipeline.info.duration_seconds,
                elapsed: started.elapsed(),
                stats: stats.clone(),
            });
        }
    }
}

impl<B: MediaBackend> VideoSink<'_, B> {
    /// Transform one decoded frame, encode it and write whatever the encoder emits
    fn push_frame(&mut self, frame: &B::Frame, stats: &mut Stats) -> TranscodeResult<()> {
        let target = self.transform.convert(frame)?;
        loop {
            let status = self.encode.submit(target)?;
            let written = Self::drain_encoder(self.encode, self.writer, &self.route, stats)?;

            match status {
                SendStatus::Accepted => break,
                SendStatus::OutputPending if written > 0 => continue,
                SendStatus::OutputPending => {
                    return Err(TranscodeError::Encode(BackendError::new(
                        "encoder refused input without producing output",
                    )))
                }
            }
        }
        stats.frame_count = self.encode.frame_count();
        Ok(())
    }

    fn write_encoded(&mut self, stats: &mut Stats) -> TranscodeResult<u64> {
        Self::drain_encoder(self.encode, self.writer, &self.route, stats)
    }

    fn drain_encoder(
        encode: &mut EncodeStage<B::Encoder>,
        writer: &mut MuxWriter<B::Output>,
        route: &StreamRoute,
        stats: &mut Stats,
    ) -> TranscodeResult<u64> {
        let mut written = 0;
        for packet in encode.drain() {
            let mut packet = packet?;
            route.apply(&mut packet);
            writer.write(&mut packet, MediaStreamRole::Video)?;
            written += 1;
        }
        stats.video_packets_written += written;
        Ok(written)
    }
}

