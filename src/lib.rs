pub use taskflow_cli::cli;
pub use taskflow_cli::commands;
pub use taskflow_cli::config;
pub use taskflow_cli::render;
pub use taskflow_cli::AppConfig;

pub use taskflow_core as core;
pub use taskflow_core::capture;
pub use taskflow_core::model;
pub use taskflow_core::services;
pub use taskflow_core::store;
