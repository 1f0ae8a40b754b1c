//! Helpers shared by integration tests.

pub mod status_server;
