//! # Market server
//! This module hosts the HTTP surface of the marketplace negotiation engine. It is responsible for:
//! * Resolving the authenticated caller from the headers injected by the upstream gateway.
//! * Translating HTTP requests into engine API calls and engine errors into status codes.
//! * Wiring the best-effort integrations (communication threads, notifications) into the engine's event hooks.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
