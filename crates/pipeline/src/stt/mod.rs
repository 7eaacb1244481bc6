//! Speech-to-text backends

mod http_backend;

pub use http_backend::{WhisperHttpConfig, WhisperHttpStt};
