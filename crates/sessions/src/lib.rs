//! Identity and session registry.
//!
//! An identity is created on first successful login and lives until the
//! process exits. Disconnecting only drops its live [`Connection`]; the
//! `(id, secret)` pair handed to the client stays valid for reconnects.

pub mod codes;
pub mod connection;
pub mod error;
pub mod identity;
pub mod registry;

pub use {
    codes::CodeBook,
    connection::Connection,
    error::RegistryError,
    identity::{Identity, generate_secret},
    registry::SessionRegistry,
};
