pub mod config;
pub mod event_bus;
pub mod session;
pub mod view;

pub use config::*;
pub use event_bus::*;
pub use session::*;
pub use view::*;
