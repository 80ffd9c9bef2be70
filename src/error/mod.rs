mod app;
mod config;
mod report;
mod transport;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use report::ReportError;
pub use transport::{PayloadError, TransportError};
pub use validation::ValidationError;
