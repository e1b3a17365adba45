pub mod cli;
pub mod commands;
pub mod config;
pub mod render;

pub use taskflow_core as core;
pub use taskflow_core::capture;
pub use taskflow_core::model;
pub use taskflow_core::services;
pub use taskflow_core::store;

pub use taskflow_core::AppConfig;
