//! HTTP and WebSocket surface over a [`crate::table::Table`].
//!
//! - `POST /card` and `POST /device/boot` for readers
//! - `GET /ws` for viewers
//! - `/admin/...` for the operator console
pub mod handlers;

pub mod request;
pub use request::*;

pub mod response;
pub use response::*;

pub mod server;
pub use server::*;

pub mod viewer;
pub use viewer::*;
