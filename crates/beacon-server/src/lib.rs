//! # beacon-server
//!
//! HTTP server library for the BLE beacon position estimator.
//!
//! This library provides the API handlers and state management; the
//! `beacon-server` binary wires them to a listener and the tracking loop.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
