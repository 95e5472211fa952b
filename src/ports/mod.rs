pub mod agent_directory;
pub mod clock;
pub mod execution_log;
pub mod macro_store;
pub mod notifier;
pub mod tasks;
pub mod ticket_lock;
pub mod ticket_store;
pub mod time_service;

pub use agent_directory::*;
pub use clock::*;
pub use execution_log::*;
pub use macro_store::*;
pub use notifier::*;
pub use tasks::*;
pub use ticket_lock::*;
pub use ticket_store::*;
pub use time_service::*;
