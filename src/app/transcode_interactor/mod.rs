// Transcode interactor - Orchestrates the transcode use case

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::{EngineConfig, ProgressCallback, Transcoder};
use crate::error::BackendError;
use crate::ports::*;
use crate::utils::Utils;

/// Builds a media backend on the worker thread that runs the pipeline
pub type BackendFactory<B> = Arc<dyn Fn() -> Result<B, BackendError> + Send + Sync>;

/// Interactor for the transcode use case
pub struct TranscodeInteractor<B: MediaBackend + 'static> {
    backend: BackendFactory<B>,
    fs_port: Arc<dyn FsPort>,
    config_port: Arc<dyn ConfigPort>,
    log_port: Arc<dyn LogPort>,
    engine: EngineConfig,
}

impl<B: MediaBackend + 'static> TranscodeInteractor<B> {
    /// Create new transcode interactor with injected ports
    pub fn new(
        backend: BackendFactory<B>,
        fs_port: Arc<dyn FsPort>,
        config_port: Arc<dyn ConfigPort>,
        log_port: Arc<dyn LogPort>,
    ) -> Self {
        Self {
            backend,
            fs_port,
            config_port,
            log_port,
            engine: EngineConfig::default(),
        }
    }

    /// Baseline engine settings; `no_audio` requests still switch audio off
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Validate the request, resolve the profile and run the pipeline
    pub async fn execute(
        &self,
        request: TranscodeRequest,
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> Result<TranscodeResponse, DomainError> {
        self.log_port.log_event(
            &LogEvent::new(LogLevel::Info, "Starting transcode")
                .with("input", request.input.display()),
        );

        if !self.fs_port.file_exists(&request.input).await? {
            return Err(DomainError::FileNotFound(request.input.display().to_string()));
        }

        let output = match &request.output {
            Some(output) => output.clone(),
            None => OutputPathRules::default_output(&request.input)?,
        };
        OutputPathRules::validate(&request.input, &output)?;

        if self.fs_port.file_exists(&output).await? && !request.overwrite {
            return Err(DomainError::OutputExists(format!(
                "{} (use --overwrite to replace it)",
                output.display()
            )));
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs_port.create_directory(parent).await?;
        }

        let mut profile = self
            .config_port
            .load_profile(request.config_file.as_deref())
            .await?;
        request.overrides.apply(&mut profile);
        ProfileRules::validate(&profile)?;
        self.log_port.log_event(
            &LogEvent::new(LogLevel::Debug, "Resolved encode profile").with("profile", &profile),
        );

        let mut engine = self.engine.clone();
        if request.no_audio {
            engine.audio_enabled = false;
        }

        let started_at = Utc::now();
        let stats = {
            let factory = Arc::clone(&self.backend);
            let log = Arc::clone(&self.log_port);
            let input = request.input.clone();
            let output = output.clone();
            let profile = profile.clone();

            tokio::task::spawn_blocking(move || -> Result<Stats, DomainError> {
                let backend = factory().map_err(|e| {
                    DomainError::InternalError(format!("Media backend unavailable: {}", e))
                })?;
                let mut transcoder = Transcoder::new(&backend, log.as_ref()).with_config(engine);
                if let Some(progress) = &progress {
                    transcoder = transcoder.with_progress(progress.as_ref());
                }
                Ok(transcoder.run(&input, &output, &profile)?)
            })
            .await
            .map_err(|e| DomainError::InternalError(format!("Transcode worker failed: {}", e)))??
        };
        let finished_at = Utc::now();

        let output_size = self.fs_port.get_file_size(&output).await.ok();
        self.log_port.log_event(
            &LogEvent::new(LogLevel::Info, "Transcode finished")
                .with("output", output.display())
                .with("frames", stats.frame_count)
                .with("audio_packets", stats.audio_packet_count),
        );

        Ok(TranscodeResponse {
            input: request.input,
            output,
            profile,
            stats,
            started_at,
            finished_at,
            elapsed_seconds: (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
            output_size,
        })
    }
}

/// Command-line profile overrides; unset fields keep the configured value
#[derive(Debug, Clone, Default)]
pub struct ProfileOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bit_rate: Option<u64>,
    pub frame_rate: Option<u32>,
    pub gop_size: Option<u32>,
    pub encoder: Option<String>,
    pub preset: Option<String>,
}

impl ProfileOverrides {
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(width) = self.width {
            profile.width = width;
        }
        if let Some(height) = self.height {
            profile.height = height;
        }
        if let Some(bit_rate) = self.bit_rate {
            profile.bit_rate = bit_rate;
        }
        if let Some(frame_rate) = self.frame_rate {
            profile.frame_rate = frame_rate;
        }
        if let Some(gop_size) = self.gop_size {
            profile.gop_size = gop_size;
        }
        if let Some(encoder) = &self.encoder {
            profile.encoder = encoder.clone();
        }
        if let Some(preset) = &self.preset {
            profile.preset = Some(preset.clone());
        }
    }
}

/// Request for one transcode
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    /// Defaults to `<stem>_transcoded.<ext>` next to the input
    pub output: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub overrides: ProfileOverrides,
    pub no_audio: bool,
    pub overwrite: bool,
}

impl TranscodeRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            config_file: None,
            overrides: ProfileOverrides::default(),
            no_audio: false,
            overwrite: false,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Outcome of a successful transcode
#[derive(Debug, Clone, Serialize)]
pub struct TranscodeResponse {
    pub input: PathBuf,
    pub output: PathBuf,
    pub profile: Profile,
    pub stats: Stats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub output_size: Option<u64>,
}

impl TranscodeResponse {
    /// Human readable summary for the terminal
    pub fn summary(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Transcoded {} -> {}\n", self.input.display(), self.output.display()));
        output.push_str(&format!("  Profile: {}\n", self.profile));
        output.push_str(&format!(
            "  Video: {} frames ({} packets in, {} written, {} from flush)\n",
            self.stats.frame_count,
            self.stats.video_packet_count,
            self.stats.video_packets_written,
            self.stats.flush_count
        ));
        output.push_str(&format!("  Audio: {} packets passed through\n", self.stats.audio_packet_count));
        if self.stats.ignored_packets > 0 {
            output.push_str(&format!("  Ignored: {} packets\n", self.stats.ignored_packets));
        }
        if self.stats.flush_decode_error {
            output.push_str("  Warning: decoder flush stopped on an error\n");
        }
        if let Some(size) = self.output_size {
            output.push_str(&format!("  Size: {}\n", Utils::format_file_size(size)));
        }
        output.push_str(&format!(
            "  Time: {}",
            Utils::format_duration(std::time::Duration::from_secs_f64(self.elapsed_seconds.max(0.0)))
        ));
        output
    }
}
