pub mod service;

pub use service::{IngestItem, IngestService, RegisterItem};
