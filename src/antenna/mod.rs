pub mod registry;

pub mod role;
pub use role::*;

pub mod serial;
pub use serial::*;
