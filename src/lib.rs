//! Home shadow library.
//!
//! Mirrors the realtime tree of a connected house into local observable
//! state, sends actuator commands back to it, keeps the shared event log
//! and runs the PIN access gate. Account flows and the backend service
//! traits live alongside.

pub mod account;
pub mod config;
pub mod error;
pub mod role;
pub mod sensors;
pub mod services;
pub mod shadow;
pub mod simulation;
pub mod tree;

pub use error::{Result, ShadowError};
