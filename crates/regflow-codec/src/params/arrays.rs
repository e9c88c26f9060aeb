/*!
 * Parameters spanning a list of registers.
 */
use std::collections::{HashMap, HashSet};

use regflow_core::types::{Address, Value, ValueMap};

use crate::address_map::Registers;
use crate::error::{Error, Result};
use crate::params::same_block;

/// A run of registers decoded to a flat list of bits
///
/// Bits are taken least significant first within each word, words in
/// address list order, truncated to `length` bits overall.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBoolArray {
    /// Register addresses backing the bit list
    pub address: Vec<Address>,
    /// Field name in decoded data
    pub idx: String,
    /// Number of bits reported
    pub length: usize,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamBoolArray {
    /// Create a new bit list parameter
    pub fn new<S: Into<String>>(address: Vec<Address>, idx: S, length: usize) -> Self {
        Self {
            address,
            idx: idx.into(),
            length,
            block: None,
        }
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    /// Decode the backing registers to a list of zero or one values
    ///
    /// Every backing address must be populated, otherwise nothing is
    /// decoded.
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        let mut words = Vec::with_capacity(self.address.len());
        for &address in &self.address {
            let Ok(raw) = registers.get(address) else {
                return ValueMap::new();
            };
            words.push(raw);
        }
        let mut bits = Vec::with_capacity(self.address.len() * 16);
        for word in words {
            for bit in 0..16 {
                bits.push(Value::Integer((word >> bit) & 1));
            }
        }
        bits.truncate(self.length);
        ValueMap::from([(self.idx.clone(), Value::Array(bits))])
    }

    /// Write this parameter's values directly to the backing addresses
    ///
    /// Each array element is written to the address at the same position;
    /// null elements leave their address untouched. This is a raw word
    /// write, not the inverse of [`ParamBoolArray::decode`].
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.idx)
            .ok_or_else(|| Error::missing_value(&self.idx))?;
        let values = value.try_array()?;
        if values.len() > self.address.len() {
            return Err(Error::LengthMismatch {
                expected: self.address.len(),
                given: values.len(),
            });
        }
        for (&address, value) in self.address.iter().zip(values) {
            if value.is_null() {
                continue;
            }
            registers.set(address, value.try_integer()?)?;
        }
        Ok(())
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        HashSet::from([self.idx.clone()])
    }
}

/// A run of registers decoded to named flags through an enumeration table
///
/// Each populated register holds one code; a code present in the table
/// raises that flag. Every flag in the table is reported, defaulting to
/// false.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEnumBoolArray {
    /// Register addresses holding the codes
    pub address: Vec<Address>,
    /// Flag names by code
    pub table: HashMap<i64, String>,
    /// Code that terminates the walk early, if any
    pub terminator: Option<i64>,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamEnumBoolArray {
    /// Create a new enumerated flag parameter
    pub fn new(address: Vec<Address>, table: HashMap<i64, String>) -> Self {
        Self {
            address,
            table,
            terminator: None,
            block: None,
        }
    }

    /// Set the code that terminates the walk early
    pub fn with_terminator(mut self, terminator: i64) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    /// Decode the codes to flags
    ///
    /// The walk stops at the first unpopulated address or at the
    /// terminator code. Codes outside the table are skipped.
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        let mut data: ValueMap = self
            .table
            .values()
            .map(|label| (label.clone(), Value::Bool(false)))
            .collect();
        for &address in &self.address {
            let Ok(raw) = registers.get(address) else {
                break;
            };
            if Some(raw) == self.terminator {
                break;
            }
            if let Some(label) = self.table.get(&raw) {
                data.insert(label.clone(), Value::Bool(true));
            }
        }
        data
    }

    /// Encoding enumerated flags back to codes is not supported
    pub fn encode<R: Registers>(&self, _data: &ValueMap, _registers: &mut R) -> Result<()> {
        Err(Error::Unimplemented("ParamEnumBoolArray"))
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        self.table.values().cloned().collect()
    }
}
