/*!
 * Bit masked register parameters.
 *
 * These codecs address a field inside a register rather than the whole
 * register. Encoding is read-modify-write so that neighbouring fields in
 * the same register are preserved.
 */
use std::collections::{HashMap, HashSet};

use regflow_core::types::{Address, Value, ValueMap};
use regflow_core::utils::round_sig_figs;

use crate::address_map::Registers;
use crate::error::{Error, Result};
use crate::params::same_block;

/// Write a field value under a mask, preserving the other bits
///
/// The value is shifted into place and must fit under the mask. An
/// unpopulated register reads as zero for the read-modify-write.
pub(crate) fn write_masked<R: Registers>(
    registers: &mut R,
    address: Address,
    mask: u16,
    rshift: u32,
    value: i64,
) -> Result<()> {
    let shifted = value << rshift;
    if shifted & !(mask as i64) != 0 {
        return Err(Error::MaskOverflow {
            value: shifted,
            mask,
        });
    }
    let current = registers.get(address).unwrap_or(0);
    registers.set(address, (current & !(mask as i64)) | shifted)
}

/// A register holding independent single bit flags
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBits {
    /// Register address
    pub address: Address,
    /// Bit position within the register, by field name
    pub bitmask: HashMap<String, u32>,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamBits {
    /// Create a new bit flag parameter
    pub fn new(address: Address, bitmask: HashMap<String, u32>) -> Self {
        Self {
            address,
            bitmask,
            block: None,
        }
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    /// Decode every flag to a boolean
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Ok(raw) = registers.get(self.address) else {
            return ValueMap::new();
        };
        self.bitmask
            .iter()
            .map(|(name, &bit)| (name.clone(), Value::Bool((raw >> bit) & 1 == 1)))
            .collect()
    }

    /// Encode the flags present in `data`, leaving the others untouched
    ///
    /// The register is not written at all when `data` holds none of the
    /// flags.
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let mut word = registers.get(self.address).unwrap_or(0);
        let mut touched = false;
        for (name, &bit) in &self.bitmask {
            let Some(value) = data.get(name) else {
                continue;
            };
            if value.try_bool()? {
                word |= 1 << bit;
            } else {
                word &= !(1 << bit);
            }
            touched = true;
        }
        if touched {
            registers.set(self.address, word)?;
        }
        Ok(())
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        self.bitmask.keys().cloned().collect()
    }
}

/// A numeric field held under a bit mask within one register
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMask {
    /// Register address
    pub address: Address,
    /// Field name in decoded data
    pub idx: String,
    /// Mask selecting the field's bits
    pub mask: u16,
    /// Right shift applied after masking
    pub rshift: u32,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamMask {
    /// Create a new masked parameter covering the whole register
    pub fn new<S: Into<String>>(address: Address, idx: S) -> Self {
        Self {
            address,
            idx: idx.into(),
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

    fn field<R: Registers>(&self, registers: &R) -> Option<i64> {
        let raw = registers.get(self.address).ok()?;
        Some((raw & self.mask as i64) >> self.rshift)
    }

    /// Decode the masked field to an integer
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Some(field) = self.field(registers) else {
            return ValueMap::new();
        };
        ValueMap::from([(self.idx.clone(), Value::Integer(field))])
    }

    /// Encode this parameter's value under its mask
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.idx)
            .ok_or_else(|| Error::missing_value(&self.idx))?;
        write_masked(registers, self.address, self.mask, self.rshift, value.try_integer()?)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        HashSet::from([self.idx.clone()])
    }
}

/// A masked field reported with a fixed offset added
#[derive(Debug, Clone, PartialEq)]
pub struct ParamOffset {
    /// The masked field this parameter wraps
    pub mask: ParamMask,
    /// Offset added on decode and removed on encode
    pub offset: i64,
}

impl ParamOffset {
    /// Create a new offset parameter covering the whole register
    pub fn new<S: Into<String>>(address: Address, idx: S, offset: i64) -> Self {
        Self {
            mask: ParamMask::new(address, idx),
            offset,
        }
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.mask = self.mask.with_block(block);
        self
    }

    /// Decode the field and add the offset
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        let mut data = self.mask.decode(registers, block);
        if let Some(Value::Integer(value)) = data.get_mut(&self.mask.idx) {
            *value += self.offset;
        }
        data
    }

    /// Remove the offset and encode the field
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.mask.idx)
            .ok_or_else(|| Error::missing_value(&self.mask.idx))?;
        let raw = value.try_integer()? - self.offset;
        write_masked(registers, self.mask.address, self.mask.mask, self.mask.rshift, raw)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        self.mask.keys()
    }
}

/// A masked field reported as a boolean
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMaskBool {
    /// The masked field this parameter wraps
    pub mask: ParamMask,
}

impl ParamMaskBool {
    /// Create a new boolean parameter over the masked bits
    pub fn new<S: Into<String>>(address: Address, idx: S, mask: u16) -> Self {
        Self {
            mask: ParamMask::new(address, idx).with_mask(mask),
        }
    }

    /// Set the right shift applied after masking
    pub fn with_rshift(mut self, rshift: u32) -> Self {
        self.mask = self.mask.with_rshift(rshift);
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.mask = self.mask.with_block(block);
        self
    }

    /// Decode the field, reporting true when any masked bit is set
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.mask.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Some(field) = self.mask.field(registers) else {
            return ValueMap::new();
        };
        ValueMap::from([(self.mask.idx.clone(), Value::Bool(field != 0))])
    }

    /// Encode the field under the mask
    ///
    /// Booleans become zero or one; integers pass through to the masked
    /// write unchanged.
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.mask.idx)
            .ok_or_else(|| Error::missing_value(&self.mask.idx))?;
        let raw = match value {
            Value::Bool(b) => *b as i64,
            other => other.try_integer()?,
        };
        write_masked(registers, self.mask.address, self.mask.mask, self.mask.rshift, raw)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        self.mask.keys()
    }
}

/// A masked field with a decode scale
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMaskScale {
    /// The masked field this parameter wraps
    pub mask: ParamMask,
    /// Multiplier applied to the field on decode
    pub scale: f64,
    /// Significant figures kept after scaling, if any
    pub significant_figures: Option<u32>,
}

impl ParamMaskScale {
    /// Create a new scaled parameter covering the whole register
    pub fn new<S: Into<String>>(address: Address, idx: S) -> Self {
        Self {
            mask: ParamMask::new(address, idx),
            scale: 1.0,
            significant_figures: None,
        }
    }

    /// Set the mask selecting the field's bits
    pub fn with_mask(mut self, mask: u16) -> Self {
        self.mask = self.mask.with_mask(mask);
        self
    }

    /// Set the right shift applied after masking
    pub fn with_rshift(mut self, rshift: u32) -> Self {
        self.mask = self.mask.with_rshift(rshift);
        self
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
        self.mask = self.mask.with_block(block);
        self
    }

    /// Decode the masked field and scale it
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.mask.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Some(field) = self.mask.field(registers) else {
            return ValueMap::new();
        };
        let value = if self.scale == 1.0 && self.significant_figures.is_none() {
            Value::Integer(field)
        } else {
            let mut scaled = field as f64 * self.scale;
            if let Some(figures) = self.significant_figures {
                scaled = round_sig_figs(scaled, figures);
            }
            Value::Float(scaled)
        };
        ValueMap::from([(self.mask.idx.clone(), value)])
    }

    /// Unscale this parameter's value and encode it under the mask
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.mask.idx)
            .ok_or_else(|| Error::missing_value(&self.mask.idx))?;
        let raw = (value.try_float()? / self.scale).round() as i64;
        write_masked(registers, self.mask.address, self.mask.mask, self.mask.rshift, raw)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        self.mask.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_map::AddressMap;

    #[test]
    fn test_mask_decode() {
        let mut registers = AddressMap::new();
        registers.set(5, 0x1230).unwrap();
        let param = ParamMask::new(5, "temp").with_mask(0x0FF0).with_rshift(4);
        let data = param.decode(&registers, None);
        assert_eq!(data["temp"], Value::Integer(35));
    }

    #[test]
    fn test_mask_encode() {
        let mut registers = AddressMap::new();
        let param = ParamMask::new(5, "temp").with_mask(0x0FF0).with_rshift(4);
        let data = ValueMap::from([("temp".to_string(), Value::Integer(35))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(5).unwrap(), 0x0230);
    }

    #[test]
    fn test_mask_encode_preserves_other_bits() {
        let mut registers = AddressMap::new();
        registers.set(5, 0xABCD).unwrap();
        let param = ParamMask::new(5, "temp").with_mask(0x0FF0).with_rshift(4);
        let data = ValueMap::from([("temp".to_string(), Value::Integer(35))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(5).unwrap(), 0xA23D);
    }

    #[test]
    fn test_mask_encode_overflow() {
        let mut registers = AddressMap::new();
        let param = ParamMask::new(5, "temp").with_mask(0x0FF0).with_rshift(4);
        let data = ValueMap::from([("temp".to_string(), Value::Integer(0x100))]);
        assert!(matches!(
            param.encode(&data, &mut registers),
            Err(Error::MaskOverflow { .. })
        ));
        assert!(!registers.contains(5));
    }

    #[test]
    fn test_bits_decode() {
        let mut registers = AddressMap::new();
        registers.set(10, 0b10).unwrap();
        let param = ParamBits::new(
            10,
            HashMap::from([("a".to_string(), 0), ("b".to_string(), 1)]),
        );
        let data = param.decode(&registers, None);
        assert_eq!(data["a"], Value::Bool(false));
        assert_eq!(data["b"], Value::Bool(true));
    }

    #[test]
    fn test_bits_encode() {
        let mut registers = AddressMap::new();
        let param = ParamBits::new(
            10,
            HashMap::from([("a".to_string(), 0), ("b".to_string(), 1)]),
        );
        let data = ValueMap::from([
            ("a".to_string(), Value::Bool(true)),
            ("b".to_string(), Value::Bool(false)),
        ]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(10).unwrap(), 1);
    }

    #[test]
    fn test_bits_encode_partial() {
        let mut registers = AddressMap::new();
        registers.set(10, 0b11).unwrap();
        let param = ParamBits::new(
            10,
            HashMap::from([("a".to_string(), 0), ("b".to_string(), 1)]),
        );
        let data = ValueMap::from([("a".to_string(), Value::Bool(false))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(10).unwrap(), 0b10);
    }

    #[test]
    fn test_bits_encode_untouched_register() {
        let mut registers = AddressMap::new();
        let param = ParamBits::new(10, HashMap::from([("a".to_string(), 0)]));
        param.encode(&ValueMap::new(), &mut registers).unwrap();
        assert!(!registers.contains(10));
    }

    #[test]
    fn test_offset_roundtrip() {
        let mut registers = AddressMap::new();
        registers.set(3, 100).unwrap();
        let param = ParamOffset::new(3, "setpoint", -40);
        let data = param.decode(&registers, None);
        assert_eq!(data["setpoint"], Value::Integer(60));

        let mut staged = AddressMap::new();
        param.encode(&data, &mut staged).unwrap();
        assert_eq!(staged.get(3).unwrap(), 100);
    }

    #[test]
    fn test_mask_bool() {
        let mut registers = AddressMap::new();
        registers.set(2, 0x0004).unwrap();
        let param = ParamMaskBool::new(2, "running", 0x0004);
        let data = param.decode(&registers, None);
        assert_eq!(data["running"], Value::Bool(true));

        registers.set(2, 0x0008).unwrap();
        let data = param.decode(&registers, None);
        assert_eq!(data["running"], Value::Bool(false));
    }

    #[test]
    fn test_mask_bool_encode() {
        let mut registers = AddressMap::new();
        registers.set(2, 0xFFFF).unwrap();
        let param = ParamMaskBool::new(2, "running", 0x0004).with_rshift(2);
        let data = ValueMap::from([("running".to_string(), Value::Bool(false))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(2).unwrap(), 0xFFFB);

        let data = ValueMap::from([("running".to_string(), Value::Bool(true))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(2).unwrap(), 0xFFFF);

        let data = ValueMap::from([("running".to_string(), Value::Integer(7))]);
        assert!(matches!(
            param.encode(&data, &mut registers),
            Err(Error::MaskOverflow { .. })
        ));
    }

    #[test]
    fn test_mask_scale() {
        let mut registers = AddressMap::new();
        registers.set(9, 0x0230).unwrap();
        let param = ParamMaskScale::new(9, "current")
            .with_mask(0x0FF0)
            .with_rshift(4)
            .with_scale(0.5);
        let data = param.decode(&registers, None);
        assert_eq!(data["current"], Value::Float(17.5));

        let mut staged = AddressMap::new();
        param.encode(&data, &mut staged).unwrap();
        assert_eq!(staged.get(9).unwrap(), 0x0230);
    }

    #[test]
    fn test_mask_scale_unscaled_stays_integer() {
        let mut registers = AddressMap::new();
        registers.set(9, 42).unwrap();
        let param = ParamMaskScale::new(9, "count");
        assert_eq!(param.decode(&registers, None)["count"], Value::Integer(42));
    }

    #[test]
    fn test_mask_block_gating() {
        let mut registers = AddressMap::new();
        registers.set(5, 1).unwrap();
        let param = ParamMask::new(5, "x").with_block(2);
        assert!(param.decode(&registers, None).is_empty());
        assert!(!param.decode(&registers, Some(&Value::Integer(2))).is_empty());
    }
}
