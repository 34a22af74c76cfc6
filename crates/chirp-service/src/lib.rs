pub mod chirps;
pub mod error;
pub mod follows;
pub mod monitor;
pub mod service;
pub mod session;
pub mod users;

pub use error::{Result, ServiceError};
pub use service::{ChirpService, MonitorReplay, Subscription};
pub use session::Session;
