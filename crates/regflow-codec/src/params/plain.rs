/*!
 * Single register parameters.
 */
use std::collections::HashSet;

use regflow_core::types::{Address, Value, ValueMap};
use regflow_core::utils::round_sig_figs;

use crate::address_map::Registers;
use crate::error::{Error, Result};
use crate::params::same_block;

/// A numeric parameter held in one register
///
/// The raw register value is optionally scaled and rounded on decode, and
/// the inverse is applied on encode.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Register address
    pub address: Address,
    /// Field name in decoded data
    pub idx: String,
    /// Multiplier applied to the raw register value on decode
    pub scale: f64,
    /// Significant figures kept after scaling, if any
    pub significant_figures: Option<u32>,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl Param {
    /// Create a new parameter with a scale of one
    pub fn new<S: Into<String>>(address: Address, idx: S) -> Self {
        Self {
            address,
            idx: idx.into(),
            scale: 1.0,
            significant_figures: None,
            block: None,
        }
    }

    /// Set the decode scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the significant figures kept after scaling
    pub fn with_significant_figures(mut self, figures: u32) -> Self {
        self.significant_figures = Some(figures);
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    fn apply_scale(&self, raw: i64) -> Value {
        if self.scale == 1.0 && self.significant_figures.is_none() {
            return Value::Integer(raw);
        }
        let mut value = raw as f64 * self.scale;
        if let Some(figures) = self.significant_figures {
            value = round_sig_figs(value, figures);
        }
        Value::Float(value)
    }

    /// Decode this parameter out of a register map
    ///
    /// Returns an empty map when the address is unpopulated or the block
    /// does not match.
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Ok(raw) = registers.get(self.address) else {
            return ValueMap::new();
        };
        ValueMap::from([(self.idx.clone(), self.apply_scale(raw))])
    }

    /// Encode this parameter's value from `data` into a register map
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.idx)
            .ok_or_else(|| Error::missing_value(&self.idx))?;
        let raw = (value.try_float()? / self.scale).round() as i64;
        if !(0..=0xFFFF).contains(&raw) {
            return Err(Error::RegisterOverflow {
                address: self.address,
                value: raw,
            });
        }
        registers.set(self.address, raw)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        HashSet::from([self.idx.clone()])
    }
}

/// A parameter with a fixed value and no register backing
///
/// Useful for stamping constants such as model identifiers into decoded
/// data alongside real readings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamStatic {
    /// The fixed value to report
    pub value: Value,
    /// Field name in decoded data
    pub idx: String,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamStatic {
    /// Create a new static parameter
    pub fn new<V: Into<Value>, S: Into<String>>(value: V, idx: S) -> Self {
        Self {
            value: value.into(),
            idx: idx.into(),
            block: None,
        }
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    /// Report the fixed value
    pub fn decode(&self, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        ValueMap::from([(self.idx.clone(), self.value.clone())])
    }

    /// Static parameters never write registers
    pub fn encode<R: Registers>(&self, _data: &ValueMap, _registers: &mut R) -> Result<()> {
        Ok(())
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        HashSet::from([self.idx.clone()])
    }
}
