//! Atelier Core Library
//!
//! Shared foundation for the Atelier asset pipeline: configuration, the
//! unified `AppError` type, domain models, the access gate seam, and
//! telemetry initialization.

pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use gate::AccessGate;
