// Domain rules - Business logic and policies

use std::path::Path;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Business rules for encode profiles
pub struct ProfileRules;

impl ProfileRules {
    /// Reject profiles the encoder could never open
    pub fn validate(profile: &Profile) -> Result<(), DomainError> {
        if profile.width == 0 || profile.height == 0 {
            return Err(DomainError::InvalidProfile(format!(
                "Target dimensions must be non-zero, got {}x{}",
                profile.width, profile.height
            )));
        }

        if profile.pixel_format.is_chroma_subsampled_420()
            && (profile.width % 2 != 0 || profile.height % 2 != 0)
        {
            return Err(DomainError::InvalidProfile(format!(
                "{} requires even dimensions, got {}x{}",
                profile.pixel_format, profile.width, profile.height
            )));
        }

        if profile.bit_rate == 0 {
            return Err(DomainError::InvalidProfile(
                "Bitrate must be positive".to_string(),
            ));
        }

        if profile.frame_rate == 0 {
            return Err(DomainError::InvalidProfile(
                "Frame rate must be positive".to_string(),
            ));
        }

        if profile.gop_size == 0 {
            return Err(DomainError::InvalidProfile(
                "GOP size must be positive".to_string(),
            ));
        }

        if profile.max_b_frames >= profile.gop_size {
            return Err(DomainError::InvalidProfile(format!(
                "B-frame count ({}) must be smaller than the GOP size ({})",
                profile.max_b_frames, profile.gop_size
            )));
        }

        if profile.encoder.trim().is_empty() {
            return Err(DomainError::InvalidProfile(
                "Encoder name cannot be empty".to_string(),
            ));
        }

        if profile.pixel_format.as_str().is_empty() {
            return Err(DomainError::InvalidProfile(
                "Pixel format cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Business rules for input/output paths
pub struct OutputPathRules;

impl OutputPathRules {
    /// The muxer picks the container from the extension, so one is required
    pub fn validate(input: &Path, output: &Path) -> Result<(), DomainError> {
        if output.as_os_str().is_empty() {
            return Err(DomainError::BadArgs("Output path cannot be empty".to_string()));
        }

        if output.extension().is_none() {
            return Err(DomainError::BadArgs(format!(
                "Output path has no extension to infer the container from: {}",
                output.display()
            )));
        }

        if input == output {
            return Err(DomainError::BadArgs(
                "Output path must differ from the input path".to_string(),
            ));
        }

        Ok(())
    }

    /// Default output name: `<stem>_transcoded.<ext>` next to the input
    pub fn default_output(input: &Path) -> Result<std::path::PathBuf, DomainError> {
        let stem = input
            .file_stem()
            .ok_or_else(|| DomainError::BadArgs("Invalid input file path".to_string()))?
            .to_string_lossy();
        let extension = input
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());

        Ok(input.with_file_name(format!("{}_transcoded.{}", stem, extension)))
    }
}
