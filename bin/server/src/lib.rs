//! parley relay server.
//!
//! Exposes the tool protocol over HTTP, receives WhatsApp webhooks, and
//! persists conversations in SQLite.

pub mod app;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod error;
