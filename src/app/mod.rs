// Application layer - Use case interactors

pub mod container;
pub mod inspect_interactor;
pub mod transcode_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use inspect_interactor::{InspectInteractor, InspectReport, InspectRequest};
pub use transcode_interactor::{
    BackendFactory, ProfileOverrides, TranscodeInteractor, TranscodeRequest, TranscodeResponse,
};
