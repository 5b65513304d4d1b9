//! Pluggable-component registry for the Swell pipeline.
//!
//! Components register through an explicit manifest (name, kind,
//! description, latency target, dependencies, handler) and are invoked
//! through one uniform contract: an `action` string plus keyword
//! parameters in, an [`swell_core::Envelope`] out. A fallback
//! text-scanning discoverer can enrich the manifest with metadata
//! extracted from a directory of source units.
//!
//! # Main types
//!
//! - [`Component`] — The single-entry-point async trait every component implements.
//! - [`ComponentRegistry`] — Registration, invocation, statistics, health.
//! - [`ComponentDiscoverer`] — Static-inspection fallback over a source directory.

/// Component trait, metadata, and running statistics.
pub mod component;
/// Fallback static-inspection discoverer.
pub mod discover;
/// The registry itself.
pub mod registry;

pub use component::{Component, ComponentKind, ComponentMetadata, ComponentStats};
pub use discover::ComponentDiscoverer;
pub use registry::{ComponentHealth, ComponentRegistry, ComponentSpec, RegistryStatus};
