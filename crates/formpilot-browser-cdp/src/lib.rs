//! # Formpilot CDP Browser Backend
//!
//! Implements the [`formpilot_protocols::PageHandle`] trait against a
//! Chrome instance exposing the DevTools protocol. The client speaks the
//! flat-session wire format: one WebSocket to the browser target, with
//! per-page commands routed by `sessionId`.

mod client;
mod page;
mod protocol;
mod script;

pub use client::CdpClient;
pub use page::CdpPage;
