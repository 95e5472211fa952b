pub mod category;
pub mod macros;
pub mod reply;
pub mod sla;
pub mod ticket;

pub use category::*;
pub use macros::*;
pub use reply::*;
pub use sla::*;
pub use ticket::*;
