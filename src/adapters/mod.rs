// Adapters - External system implementations

pub mod fs_local;
pub mod libav;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use fs_local::FsLocalAdapter;
pub use libav::LibavBackend;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::TracingLogAdapter;
