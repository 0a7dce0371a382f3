pub mod config_store;
pub mod defaults;
pub mod files;
pub mod generator;
pub mod secrets;
pub mod session_builder;
pub mod transcript_file;
