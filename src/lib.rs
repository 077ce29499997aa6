//! Patchbay
//!
//! Core library for a cable-patched audio graph: a logical rack of modules,
//! the runtime that keeps it in sync with live audio units, and JSON patch
//! persistence.

pub mod dsp;
pub mod engine;
pub mod graph;
pub mod persistence;
pub mod runtime;
