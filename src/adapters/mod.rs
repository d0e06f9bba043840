//! Adapter framework
//!
//! Adapters turn provider payloads into the market data schema.
//!
//! # Building blocks
//!
//! - **Mappings**: [`ModelMapping`] lists interpreted by [`apply_mapping`]
//! - **Transforms**: reusable value conversions (numbers, timestamps, sides)
//! - **Adapter trait**: capability methods defaulting to "unsupported"
//! - **Registry**: explicit name to factory map built by the application

mod base;
mod mapping;
mod registry;
pub mod transforms;

pub use base::{Adapter, AdapterBase, ClientOwnership, OhlcvQuery};
pub use mapping::{apply_mapping, map_fields, ModelMapping, TransformFn};
pub use registry::{AdapterFactory, AdapterRegistry};
