//! Access configuration for the Nomad secrets engine.
//!
//! The engine keeps the address and credentials it uses to reach a Nomad
//! cluster as one JSON entry at [`CONFIG_ACCESS_KEY`] in whatever
//! [`Backend`](hcs_backend::Backend) it is mounted on.

pub mod access;
pub mod error;

pub use access::{AccessConfig, AccessConfigStore, AccessConfigUpdate, AccessConfigView, CONFIG_ACCESS_KEY};
pub use error::{NomadError, NomadResult};
