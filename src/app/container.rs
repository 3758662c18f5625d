use std::sync::Arc;

use crate::adapters::{FsLocalAdapter, LibavBackend, TomlConfigAdapter, TracingLogAdapter};
use crate::app::{BackendFactory, InspectInteractor, TranscodeInteractor};
use crate::ports::{ConfigPort, FsPort, LogPort, MediaBackend};

pub trait AppContainer<B: MediaBackend + 'static>: Send + Sync {
    fn transcode_interactor(&self) -> Arc<TranscodeInteractor<B>>;
    fn inspect_interactor(&self) -> Arc<InspectInteractor<B>>;
}

pub struct DefaultAppContainer {
    transcode_interactor: Arc<TranscodeInteractor<LibavBackend>>,
    inspect_interactor: Arc<InspectInteractor<LibavBackend>>,
}

impl DefaultAppContainer {
    pub fn new() -> Self {
        let backend: BackendFactory<LibavBackend> = Arc::new(LibavBackend::new);
        let fs_port = Arc::new(FsLocalAdapter::new());
        let config_port = Arc::new(TomlConfigAdapter::new());
        let log_port = Arc::new(TracingLogAdapter::new());

        let transcode_interactor = Arc::new(TranscodeInteractor::new(
            Arc::clone(&backend),
            Arc::clone(&fs_port) as Arc<dyn FsPort>,
            Arc::clone(&config_port) as Arc<dyn ConfigPort>,
            Arc::clone(&log_port) as Arc<dyn LogPort>,
        ));

        let inspect_interactor = Arc::new(InspectInteractor::new(
            backend,
            Arc::clone(&fs_port) as Arc<dyn FsPort>,
            Arc::clone(&log_port) as Arc<dyn LogPort>,
        ));

        Self {
            transcode_interactor,
            inspect_interactor,
        }
    }
}

impl Default for DefaultAppContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContainer<LibavBackend> for DefaultAppContainer {
    fn transcode_interactor(&self) -> Arc<TranscodeInteractor<LibavBackend>> {
        Arc::clone(&self.transcode_interactor)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor<LibavBackend>> {
        Arc::clone(&self.inspect_interactor)
    }
}
