//! Application layer orchestrating the registry.
//!
//! This module defines the `Diamond` engine, the single entry point for cuts,
//! dispatched calls, inspection and ownership. It stages every mutation on a
//! copy of the live state and commits only complete, persisted results.

pub mod catalog;
pub mod diamond;
