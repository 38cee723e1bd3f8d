//! WebSocket bridge to the presentation client

pub mod handler;
pub mod protocol;
