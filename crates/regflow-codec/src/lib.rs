/*!
 * RegFlow Codec
 *
 * This crate provides the register codec layer for the RegFlow telemetry
 * system, including sparse register maps, declarative parameter codecs, and
 * the YAML schema loader that builds them.
 */

#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]

// Re-export core types
pub use regflow_core::prelude;

// Re-export types from regflow_core for convenience
pub use regflow_core::types::{Address, Value, ValueMap};

pub mod address_map;
pub mod error;
pub mod params;
pub mod schema;
pub mod words;

// Re-export main types for convenience
pub use address_map::{AddressMap, AddressMapU16, Registers};
pub use error::{Error, Result};
pub use params::{
    CType, Param, ParamBits, ParamBoolArray, ParamCType, ParamCTypeScale, ParamCTypeScaleModulus,
    ParamDict, ParamEnumBoolArray, ParamLookup, ParamMask, ParamMaskBool, ParamMaskScale,
    ParamOffset, ParamStatic, ParamText, Parameter,
};
pub use schema::{
    build_from_device_config, parse_data_types, parse_data_types_by_source,
    resolve_static_data_types,
};
pub use words::{ByteOrder, WordOrder};

/// RegFlow codec crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the codec layer
pub fn init() -> Result<()> {
    tracing::info!("RegFlow Codec {} initialized", VERSION);
    Ok(())
}
