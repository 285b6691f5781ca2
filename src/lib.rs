//! Client-side task submission and retrieval pipeline for a personal task tracker.
//!
//! Business logic lives in [domain], remote backends are reached through the adapters in
//! [persistence], and [screens] hold the transient UI state that drives both.

pub mod app;
pub mod app_env;
pub mod config;
pub mod domain;
pub mod external_connections;
pub mod logging;
pub mod persistence;
pub mod routes;
pub mod screens;
