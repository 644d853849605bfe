//! Routing tables, identifiers and the ports the registry talks through.

pub mod cut;
pub mod identity;
pub mod ports;
pub mod registry;
pub mod state;
