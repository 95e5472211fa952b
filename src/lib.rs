pub mod adapters;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod ports;
pub mod services;

pub use config::*;
pub use errors::*;
pub use events::*;
pub use models::*;
pub use services::*;
