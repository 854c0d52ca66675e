pub mod event_bus;
pub mod frame;
pub mod observable;

pub use event_bus::*;
pub use frame::*;
pub use observable::*;
