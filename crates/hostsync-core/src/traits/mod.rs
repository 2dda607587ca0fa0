//! Trait definitions for the hostsync system
//!
//! The remote record store is the only pluggable seam: everything on the
//! local side of a cycle is a pure function of the source file and the
//! configuration.

pub mod record_store;

pub use record_store::RecordStore;
