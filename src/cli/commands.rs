//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::LibavBackend;
use crate::app::{AppContainer, InspectRequest, TranscodeRequest};
use crate::cli::args::{InspectArgs, TranscodeArgs};
use crate::domain::errors::DomainError;
use crate::engine::progress::{ConsoleProgressCallback, JsonProgressCallback};
use crate::engine::{ProgressCallback, ProgressTracker};

/// Execute the transcode command
pub async fn transcode<C: AppContainer<LibavBackend>>(args: TranscodeArgs, container: &C) -> Result<()> {
    info!("Starting transcode of {}", args.input.display());

    let request = TranscodeRequest {
        input: args.input.clone(),
        output: args.output.clone(),
        config_file: args.config.clone(),
        overrides: args.overrides(),
        no_audio: args.no_audio,
        overwrite: args.overwrite,
    };

    let tracker = ProgressTracker::new();
    if args.json {
        tracker.add_callback(Arc::new(JsonProgressCallback));
    } else if !args.no_progress {
        tracker.add_callback(Arc::new(ConsoleProgressCallback));
    }

    let cancel = tracker.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let progress: Arc<dyn ProgressCallback> = Arc::new(tracker);
    let result = container
        .transcode_interactor()
        .execute(request, Some(progress))
        .await;
    ctrl_c.abort();

    match result {
        Ok(response) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response).context("Failed to serialize report")?
                );
            } else {
                println!("{}", response.summary());
            }
            Ok(())
        }
        Err(err) => {
            if args.json {
                println!("{}", error_json(&err));
            }
            Err(err).context("Transcode failed")
        }
    }
}

/// Execute the inspect command
pub async fn inspect<C: AppContainer<LibavBackend>>(args: InspectArgs, container: &C) -> Result<()> {
    debug!("Inspecting {}", args.input.display());

    let request = InspectRequest {
        input: args.input,
        audio_enabled: !args.no_audio,
    };
    let report = container
        .inspect_interactor()
        .execute(request)
        .await
        .context("Failed to inspect input file")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

/// Print program and library versions
pub fn version() -> Result<()> {
    println!("transmux {}", env!("CARGO_PKG_VERSION"));
    LibavBackend::new().context("Failed to initialize media libraries")?;
    println!("{}", LibavBackend::version_info());
    Ok(())
}

fn error_json(err: &DomainError) -> serde_json::Value {
    match err {
        DomainError::Transcode(inner) => serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "kind": inner.kind(),
            "category": inner.kind().category(),
        }),
        _ => serde_json::json!({
            "success": false,
            "error": err.to_string(),
        }),
    }
}
