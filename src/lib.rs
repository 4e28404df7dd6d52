pub mod config;
pub mod detect;
pub mod error;
pub mod models;
pub mod service;

pub use error::{Result, SpotterError};
pub use service::{ActiveModelInfo, DetectService, ServiceStatus};
