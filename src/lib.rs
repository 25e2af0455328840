//! # llm-fireworks
//!
//! Registers the models served by Fireworks AI with an LLM host.
//!
//! The model catalog is downloaded from the Fireworks API and cached on disk
//! for an hour. When the API is unreachable, the last downloaded catalog is
//! used instead, whatever its age.

pub mod app;
pub mod cache;
pub mod config;
pub mod keys;
pub mod models;
pub mod paths;
