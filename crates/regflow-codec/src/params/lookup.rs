/*!
 * Table driven translation parameters.
 */
use std::collections::{HashMap, HashSet};

use tracing::debug;

use regflow_core::types::{Address, Value, ValueMap};

use crate::address_map::Registers;
use crate::error::{Error, Result};
use crate::params::bitfield::write_masked;
use crate::params::same_block;

/// A masked field translated through an enumeration table
///
/// Decode reports the label for the current field value; a field value
/// outside the table decodes to nothing rather than failing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamLookup {
    /// Register address
    pub address: Address,
    /// Field name in decoded data
    pub idx: String,
    /// Labels by field value
    pub table: HashMap<i64, String>,
    /// Field values by label, derived from `table`
    ///
    /// When two field values share a label, the highest value wins the
    /// reverse direction.
    pub table_reversed: HashMap<String, i64>,
    /// Mask selecting the field's bits
    pub mask: u16,
    /// Right shift applied after masking
    pub rshift: u32,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamLookup {
    /// Create a new lookup parameter covering the whole register
    pub fn new<S: Into<String>>(address: Address, idx: S, table: HashMap<i64, String>) -> Self {
        let mut codes: Vec<i64> = table.keys().copied().collect();
        codes.sort_unstable();
        let table_reversed = codes
            .iter()
            .map(|code| (table[code].clone(), *code))
            .collect();
        Self {
            address,
            idx: idx.into(),
            table,
            table_reversed,
            mask: 0xFFFF,
            rshift: 0,
            block: None,
        }
    }

    /// Set the mask selecting the field's bits
    pub fn with_mask(mut self, mask: u16) -> Self {
        self.mask = mask;
        self
    }

    /// Set the right shift applied after masking
    pub fn with_rshift(mut self, rshift: u32) -> Self {
        self.rshift = rshift;
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    /// Decode the field and translate it to its label
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Ok(raw) = registers.get(self.address) else {
            return ValueMap::new();
        };
        let field = (raw & self.mask as i64) >> self.rshift;
        match self.table.get(&field) {
            Some(label) => ValueMap::from([(self.idx.clone(), Value::String(label.clone()))]),
            None => ValueMap::new(),
        }
    }

    /// Translate this parameter's label back and encode it under the mask
    ///
    /// A label outside the table, or a value that is not a string, leaves
    /// the registers untouched.
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.idx)
            .ok_or_else(|| Error::missing_value(&self.idx))?;
        let Some(label) = value.as_str() else {
            debug!(idx = %self.idx, kind = value.kind(), "lookup encode needs a string label, skipping");
            return Ok(());
        };
        let Some(&field) = self.table_reversed.get(label) else {
            debug!(idx = %self.idx, label, "label not present in lookup table, skipping");
            return Ok(());
        };
        write_masked(registers, self.address, self.mask, self.rshift, field)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        HashSet::from([self.idx.clone()])
    }
}

/// A value translation applied to already decoded data
///
/// Reads the `key` field out of a decoded map and reports it under `idx`,
/// translated through the table when a matching entry exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDict {
    /// Field name in decoded data
    pub idx: String,
    /// Field name to read from the source data
    pub key: String,
    /// Replacement values by stringified source value
    pub table: HashMap<String, Value>,
}

fn key_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl ParamDict {
    /// Create a new dictionary translation reading its own field name
    pub fn new<S: Into<String>>(idx: S, table: HashMap<String, Value>) -> Self {
        let idx = idx.into();
        Self {
            key: idx.clone(),
            idx,
            table,
        }
    }

    /// Set a different source field name to read
    pub fn with_key<S: Into<String>>(mut self, key: S) -> Self {
        self.key = key.into();
        self
    }

    /// Translate the source field out of already decoded data
    ///
    /// A source value with no table entry passes through unchanged; a
    /// missing source field decodes to nothing.
    pub fn decode_value(&self, data: &ValueMap) -> ValueMap {
        let Some(raw) = data.get(&self.key) else {
            return ValueMap::new();
        };
        let translated = key_form(raw)
            .and_then(|key| self.table.get(&key))
            .cloned()
            .unwrap_or_else(|| raw.clone());
        ValueMap::from([(self.idx.clone(), translated)])
    }

    /// Dictionary translations have no register backing
    pub fn encode<R: Registers>(&self, _data: &ValueMap, _registers: &mut R) -> Result<()> {
        Ok(())
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        HashSet::from([self.idx.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_map::AddressMap;

    fn state_table() -> HashMap<i64, String> {
        HashMap::from([
            (0, "stopped".to_string()),
            (1, "running".to_string()),
            (2, "fault".to_string()),
        ])
    }

    #[test]
    fn test_lookup_decode() {
        let mut registers = AddressMap::new();
        registers.set(20, 1).unwrap();
        let param = ParamLookup::new(20, "state", state_table());
        let data = param.decode(&registers, None);
        assert_eq!(data["state"], Value::from("running"));
    }

    #[test]
    fn test_lookup_decode_unknown_code() {
        let mut registers = AddressMap::new();
        registers.set(20, 9).unwrap();
        let param = ParamLookup::new(20, "state", state_table());
        assert!(param.decode(&registers, None).is_empty());
    }

    #[test]
    fn test_lookup_decode_masked() {
        let mut registers = AddressMap::new();
        registers.set(20, 0x0210).unwrap();
        let param = ParamLookup::new(20, "state", state_table())
            .with_mask(0x00F0)
            .with_rshift(4);
        let data = param.decode(&registers, None);
        assert_eq!(data["state"], Value::from("running"));
    }

    #[test]
    fn test_lookup_encode() {
        let mut registers = AddressMap::new();
        let param = ParamLookup::new(20, "state", state_table());
        let data = ValueMap::from([("state".to_string(), Value::from("fault"))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(20).unwrap(), 2);
    }

    #[test]
    fn test_lookup_encode_unknown_label_is_noop() {
        let mut registers = AddressMap::new();
        let param = ParamLookup::new(20, "state", state_table());
        let data = ValueMap::from([("state".to_string(), Value::from("exploded"))]);
        param.encode(&data, &mut registers).unwrap();
        assert!(registers.is_empty());

        let data = ValueMap::from([("state".to_string(), Value::Integer(1))]);
        param.encode(&data, &mut registers).unwrap();
        assert!(registers.is_empty());
    }

    #[test]
    fn test_lookup_encode_missing_value() {
        let mut registers = AddressMap::new();
        let param = ParamLookup::new(20, "state", state_table());
        assert!(matches!(
            param.encode(&ValueMap::new(), &mut registers),
            Err(Error::MissingValue(_))
        ));
    }

    #[test]
    fn test_lookup_reverse_prefers_highest_code() {
        let table = HashMap::from([
            (1, "ok".to_string()),
            (3, "ok".to_string()),
            (2, "warn".to_string()),
        ]);
        let param = ParamLookup::new(20, "status", table);
        assert_eq!(param.table_reversed["ok"], 3);
        assert_eq!(param.table_reversed["warn"], 2);
    }

    #[test]
    fn test_dict_translates() {
        let table = HashMap::from([
            ("1".to_string(), Value::from("auto")),
            ("2".to_string(), Value::from("manual")),
        ]);
        let param = ParamDict::new("mode", table);

        let data = ValueMap::from([("mode".to_string(), Value::Integer(2))]);
        assert_eq!(param.decode_value(&data)["mode"], Value::from("manual"));

        // No table entry passes the raw value through.
        let data = ValueMap::from([("mode".to_string(), Value::Integer(5))]);
        assert_eq!(param.decode_value(&data)["mode"], Value::Integer(5));

        assert!(param.decode_value(&ValueMap::new()).is_empty());
    }

    #[test]
    fn test_dict_with_separate_key() {
        let table = HashMap::from([("true".to_string(), Value::from("enabled"))]);
        let param = ParamDict::new("door", table).with_key("door_raw");
        let data = ValueMap::from([("door_raw".to_string(), Value::Bool(true))]);
        assert_eq!(param.decode_value(&data)["door"], Value::from("enabled"));
    }
}
