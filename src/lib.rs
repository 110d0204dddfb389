// Console bridge library - exposes the bridge and its building blocks for the binary and tests

pub mod app;
pub mod config;
pub mod config_io;
pub mod host;
pub mod model;
pub mod services;
