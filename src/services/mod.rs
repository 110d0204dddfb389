pub mod encoding;
pub mod log_dirs;
pub mod process;
pub mod time_source;
pub mod tracing_setup;
