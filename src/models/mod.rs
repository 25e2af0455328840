//! Model discovery and registration.

mod catalog;
mod chat;
mod register;

pub use catalog::{CatalogEntry, CatalogError, parse_catalog, supports_image_input};
pub use chat::{FireworksAsyncChat, FireworksChat, FireworksModel, ModelOptions};
pub use register::{RegisterError, RegisterOutcome, Registration, register_models};
