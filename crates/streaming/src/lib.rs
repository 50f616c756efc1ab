pub mod fetch;
pub mod loader;
pub mod request;

pub use fetch::*;
pub use loader::*;
pub use request::*;
