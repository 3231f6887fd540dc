//! # API crate — REST access to the Circles backend
//!
//! Everything the frontends need to talk HTTP to the backend lives here: the
//! data model mirrored from API responses, client configuration, the error
//! type, and [`ApiClient`] with its resource groups.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Plain records: users, circles, messages, direct messages, friend requests, call sessions |
//! | [`config`] | `circles.toml` / `CIRCLES_*` layered configuration |
//! | [`resources`] | Endpoint wrappers grouped by resource (`auth`, `users`, `circles`, ...) |
//!
//! Records are a pass-through mirror of server state. The client enforces no
//! invariants on them beyond their types; they are created from responses or
//! socket payloads and held by whichever view asked for them.

mod client;
pub mod config;
mod error;
pub mod models;
pub mod resources;

#[cfg(test)]
mod test_support;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use models::*;
