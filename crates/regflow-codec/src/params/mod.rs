/*!
 * Declarative parameter codecs.
 *
 * Each parameter describes where one field lives in the register address
 * space and how its raw words map to a structured value. Decode degrades
 * to an empty map on anything unreadable; encode reports errors to the
 * caller.
 */
use std::collections::HashSet;

use regflow_core::types::{Value, ValueMap};

use crate::address_map::Registers;
use crate::error::Result;

pub mod arrays;
pub mod bitfield;
pub mod ctype;
pub mod lookup;
pub mod plain;
pub mod text;

pub use arrays::{ParamBoolArray, ParamEnumBoolArray};
pub use bitfield::{ParamBits, ParamMask, ParamMaskBool, ParamMaskScale, ParamOffset};
pub use ctype::{CType, ParamCType, ParamCTypeScale, ParamCTypeScaleModulus};
pub use lookup::{ParamDict, ParamLookup};
pub use plain::{Param, ParamStatic};
pub use text::ParamText;

/// Check a parameter's block marker against the caller's
///
/// Blocks match on strict equality, including both sides being absent.
pub(crate) fn same_block(own: Option<&Value>, requested: Option<&Value>) -> bool {
    own == requested
}

/// Any parameter codec, dispatched by variant
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// Scaled value in a single register
    Plain(Param),
    /// Fixed value with no register backing
    Static(ParamStatic),
    /// Bit list across a list of registers
    BoolArray(ParamBoolArray),
    /// Enumerated flags across a list of registers
    EnumBoolArray(ParamEnumBoolArray),
    /// Fixed width text in a register run
    Text(ParamText),
    /// Value translation over already decoded data
    Dict(ParamDict),
    /// Named bit flags in one register
    Bits(ParamBits),
    /// Masked field in one register
    Mask(ParamMask),
    /// Masked field with a constant offset
    Offset(ParamOffset),
    /// Masked field reported as a boolean
    MaskBool(ParamMaskBool),
    /// Masked field with a decode scale
    MaskScale(ParamMaskScale),
    /// Masked field translated through an enumeration table
    Lookup(ParamLookup),
    /// C primitive in a register run
    CType(ParamCType),
    /// Scaled C primitive
    CTypeScale(ParamCTypeScale),
    /// Scaled C primitive wrapping around a modulus
    CTypeScaleModulus(ParamCTypeScaleModulus),
}

impl Parameter {
    /// Decode this parameter out of a register map
    ///
    /// Decoding never fails; anything unreadable produces an empty map.
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        match self {
            Parameter::Plain(p) => p.decode(registers, block),
            Parameter::Static(p) => p.decode(block),
            Parameter::BoolArray(p) => p.decode(registers, block),
            Parameter::EnumBoolArray(p) => p.decode(registers, block),
            Parameter::Text(p) => p.decode(registers, block),
            Parameter::Dict(_) => ValueMap::new(),
            Parameter::Bits(p) => p.decode(registers, block),
            Parameter::Mask(p) => p.decode(registers, block),
            Parameter::Offset(p) => p.decode(registers, block),
            Parameter::MaskBool(p) => p.decode(registers, block),
            Parameter::MaskScale(p) => p.decode(registers, block),
            Parameter::Lookup(p) => p.decode(registers, block),
            Parameter::CType(p) => p.decode(registers, block),
            Parameter::CTypeScale(p) => p.decode(registers, block),
            Parameter::CTypeScaleModulus(p) => p.decode(registers, block),
        }
    }

    /// Encode this parameter's value from `data` into a register map
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        match self {
            Parameter::Plain(p) => p.encode(data, registers),
            Parameter::Static(p) => p.encode(data, registers),
            Parameter::BoolArray(p) => p.encode(data, registers),
            Parameter::EnumBoolArray(p) => p.encode(data, registers),
            Parameter::Text(p) => p.encode(data, registers),
            Parameter::Dict(p) => p.encode(data, registers),
            Parameter::Bits(p) => p.encode(data, registers),
            Parameter::Mask(p) => p.encode(data, registers),
            Parameter::Offset(p) => p.encode(data, registers),
            Parameter::MaskBool(p) => p.encode(data, registers),
            Parameter::MaskScale(p) => p.encode(data, registers),
            Parameter::Lookup(p) => p.encode(data, registers),
            Parameter::CType(p) => p.encode(data, registers),
            Parameter::CTypeScale(p) => p.encode(data, registers),
            Parameter::CTypeScaleModulus(p) => p.encode(data, registers),
        }
    }

    /// Translate already decoded data
    ///
    /// Only dictionary parameters operate on decoded data; every other
    /// variant produces an empty map.
    pub fn decode_value(&self, data: &ValueMap) -> ValueMap {
        match self {
            Parameter::Dict(p) => p.decode_value(data),
            _ => ValueMap::new(),
        }
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        match self {
            Parameter::Plain(p) => p.keys(),
            Parameter::Static(p) => p.keys(),
            Parameter::BoolArray(p) => p.keys(),
            Parameter::EnumBoolArray(p) => p.keys(),
            Parameter::Text(p) => p.keys(),
            Parameter::Dict(p) => p.keys(),
            Parameter::Bits(p) => p.keys(),
            Parameter::Mask(p) => p.keys(),
            Parameter::Offset(p) => p.keys(),
            Parameter::MaskBool(p) => p.keys(),
            Parameter::MaskScale(p) => p.keys(),
            Parameter::Lookup(p) => p.keys(),
            Parameter::CType(p) => p.keys(),
            Parameter::CTypeScale(p) => p.keys(),
            Parameter::CTypeScaleModulus(p) => p.keys(),
        }
    }

    /// The schema tag naming this parameter's variant
    pub fn type_name(&self) -> &'static str {
        match self {
            Parameter::Plain(_) => "Param",
            Parameter::Static(_) => "ParamStatic",
            Parameter::BoolArray(_) => "ParamBoolArray",
            Parameter::EnumBoolArray(_) => "ParamEnumBoolArray",
            Parameter::Text(_) => "ParamText",
            Parameter::Dict(_) => "ParamDict",
            Parameter::Bits(_) => "ParamBits",
            Parameter::Mask(_) => "ParamMask",
            Parameter::Offset(_) => "ParamOffset",
            Parameter::MaskBool(_) => "ParamMaskBool",
            Parameter::MaskScale(_) => "ParamMaskScale",
            Parameter::Lookup(_) => "ParamLookup",
            Parameter::CType(_) => "ParamCType",
            Parameter::CTypeScale(_) => "ParamCTypeScale",
            Parameter::CTypeScaleModulus(_) => "ParamCTypeScaleModulus",
        }
    }

    /// The read block this parameter belongs to, if any
    pub fn block(&self) -> Option<&Value> {
        match self {
            Parameter::Plain(p) => p.block.as_ref(),
            Parameter::Static(p) => p.block.as_ref(),
            Parameter::BoolArray(p) => p.block.as_ref(),
            Parameter::EnumBoolArray(p) => p.block.as_ref(),
            Parameter::Text(p) => p.block.as_ref(),
            Parameter::Dict(_) => None,
            Parameter::Bits(p) => p.block.as_ref(),
            Parameter::Mask(p) => p.block.as_ref(),
            Parameter::Offset(p) => p.mask.block.as_ref(),
            Parameter::MaskBool(p) => p.mask.block.as_ref(),
            Parameter::MaskScale(p) => p.mask.block.as_ref(),
            Parameter::Lookup(p) => p.block.as_ref(),
            Parameter::CType(p) => p.block.as_ref(),
            Parameter::CTypeScale(p) => p.ctype.block.as_ref(),
            Parameter::CTypeScaleModulus(p) => p.scale.ctype.block.as_ref(),
        }
    }
}

impl From<Param> for Parameter {
    fn from(p: Param) -> Self {
        Parameter::Plain(p)
    }
}

impl From<ParamStatic> for Parameter {
    fn from(p: ParamStatic) -> Self {
        Parameter::Static(p)
    }
}

impl From<ParamBoolArray> for Parameter {
    fn from(p: ParamBoolArray) -> Self {
        Parameter::BoolArray(p)
    }
}

impl From<ParamEnumBoolArray> for Parameter {
    fn from(p: ParamEnumBoolArray) -> Self {
        Parameter::EnumBoolArray(p)
    }
}

impl From<ParamText> for Parameter {
    fn from(p: ParamText) -> Self {
        Parameter::Text(p)
    }
}

impl From<ParamDict> for Parameter {
    fn from(p: ParamDict) -> Self {
        Parameter::Dict(p)
    }
}

impl From<ParamBits> for Parameter {
    fn from(p: ParamBits) -> Self {
        Parameter::Bits(p)
    }
}

impl From<ParamMask> for Parameter {
    fn from(p: ParamMask) -> Self {
        Parameter::Mask(p)
    }
}

impl From<ParamOffset> for Parameter {
    fn from(p: ParamOffset) -> Self {
        Parameter::Offset(p)
    }
}

impl From<ParamMaskBool> for Parameter {
    fn from(p: ParamMaskBool) -> Self {
        Parameter::MaskBool(p)
    }
}

impl From<ParamMaskScale> for Parameter {
    fn from(p: ParamMaskScale) -> Self {
        Parameter::MaskScale(p)
    }
}

impl From<ParamLookup> for Parameter {
    fn from(p: ParamLookup) -> Self {
        Parameter::Lookup(p)
    }
}

impl From<ParamCType> for Parameter {
    fn from(p: ParamCType) -> Self {
        Parameter::CType(p)
    }
}

impl From<ParamCTypeScale> for Parameter {
    fn from(p: ParamCTypeScale) -> Self {
        Parameter::CTypeScale(p)
    }
}

impl From<ParamCTypeScaleModulus> for Parameter {
    fn from(p: ParamCTypeScaleModulus) -> Self {
        Parameter::CTypeScaleModulus(p)
    }
}
