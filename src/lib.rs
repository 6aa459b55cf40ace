//! Textkeeper: numbered text blobs over HTTP.
//!
//! A request reaches the document store through the [`persistence::Gateway`],
//! which owns the one connection and keeps reconnecting in the background.

pub mod app;
pub mod config;
pub mod errors;
pub mod persistence;
pub mod routes;
pub mod services;
pub mod state;
