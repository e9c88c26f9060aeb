/*!
 * C primitive parameters spanning one or more registers.
 *
 * Values travel as their C binary representation packed into a run of 16
 * bit words. Words transmit most significant byte first; `byte_order`
 * selects how the reassembled byte run is interpreted and `word_order`
 * whether the run is reversed, which between them cover the four register
 * layouts seen in the field.
 */
use std::collections::HashSet;
use std::str::FromStr;

use tracing::warn;

use regflow_core::types::{Address, Value, ValueMap};
use regflow_core::utils::round_sig_figs;

use crate::address_map::Registers;
use crate::error::{Error, Result};
use crate::params::same_block;
use crate::words::{bytes_to_words, words_to_bytes, ByteOrder, WordOrder};

/// A C primitive data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CType {
    /// Signed 8 bit integer
    Char,
    /// Unsigned 8 bit integer
    UChar,
    /// Signed 16 bit integer
    Short,
    /// Unsigned 16 bit integer
    UShort,
    /// Signed 32 bit integer
    Int,
    /// Unsigned 32 bit integer
    UInt,
    /// Signed 32 bit integer
    Long,
    /// Unsigned 32 bit integer
    ULong,
    /// Signed 64 bit integer
    LongLong,
    /// Unsigned 64 bit integer
    ULongLong,
    /// 32 bit floating point
    Float,
    /// 64 bit floating point
    Double,
}

impl CType {
    /// The size of this type in bytes
    pub fn size(&self) -> usize {
        match self {
            CType::Char | CType::UChar => 1,
            CType::Short | CType::UShort => 2,
            CType::Int | CType::UInt | CType::Long | CType::ULong | CType::Float => 4,
            CType::LongLong | CType::ULongLong | CType::Double => 8,
        }
    }

    /// The number of 16 bit registers this type occupies
    pub fn words(&self) -> usize {
        (self.size() + 1) / 2
    }

    /// Whether this type is floating point
    pub fn is_float(&self) -> bool {
        matches!(self, CType::Float | CType::Double)
    }

    fn unpack(&self, bytes: &[u8], order: ByteOrder) -> Option<Value> {
        Some(match self {
            CType::Char => {
                let arr: [u8; 1] = bytes.try_into().ok()?;
                Value::Integer(arr[0] as i8 as i64)
            }
            CType::UChar => {
                let arr: [u8; 1] = bytes.try_into().ok()?;
                Value::Integer(arr[0] as i64)
            }
            CType::Short => {
                let arr: [u8; 2] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => i16::from_be_bytes(arr),
                    ByteOrder::Little => i16::from_le_bytes(arr),
                };
                Value::Integer(v as i64)
            }
            CType::UShort => {
                let arr: [u8; 2] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => u16::from_be_bytes(arr),
                    ByteOrder::Little => u16::from_le_bytes(arr),
                };
                Value::Integer(v as i64)
            }
            CType::Int | CType::Long => {
                let arr: [u8; 4] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => i32::from_be_bytes(arr),
                    ByteOrder::Little => i32::from_le_bytes(arr),
                };
                Value::Integer(v as i64)
            }
            CType::UInt | CType::ULong => {
                let arr: [u8; 4] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => u32::from_be_bytes(arr),
                    ByteOrder::Little => u32::from_le_bytes(arr),
                };
                Value::Integer(v as i64)
            }
            CType::LongLong => {
                let arr: [u8; 8] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => i64::from_be_bytes(arr),
                    ByteOrder::Little => i64::from_le_bytes(arr),
                };
                Value::Integer(v)
            }
            CType::ULongLong => {
                let arr: [u8; 8] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => u64::from_be_bytes(arr),
                    ByteOrder::Little => u64::from_le_bytes(arr),
                };
                match i64::try_from(v) {
                    Ok(v) => Value::Integer(v),
                    Err(_) => Value::Float(v as f64),
                }
            }
            CType::Float => {
                let arr: [u8; 4] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => f32::from_be_bytes(arr),
                    ByteOrder::Little => f32::from_le_bytes(arr),
                };
                Value::Float(v as f64)
            }
            CType::Double => {
                let arr: [u8; 8] = bytes.try_into().ok()?;
                let v = match order {
                    ByteOrder::Big => f64::from_be_bytes(arr),
                    ByteOrder::Little => f64::from_le_bytes(arr),
                };
                Value::Float(v)
            }
        })
    }

    fn pack(&self, value: &Value, order: ByteOrder) -> Result<Vec<u8>> {
        fn out_of_range(value: i64, kind: &str) -> Error {
            Error::pack(format!("value {} out of range for {}", value, kind))
        }

        Ok(match self {
            CType::Char => {
                let v = value.try_integer()?;
                let v = i8::try_from(v).map_err(|_| out_of_range(v, "char"))?;
                vec![v as u8]
            }
            CType::UChar => {
                let v = value.try_integer()?;
                let v = u8::try_from(v).map_err(|_| out_of_range(v, "uchar"))?;
                vec![v]
            }
            CType::Short => {
                let v = value.try_integer()?;
                let v = i16::try_from(v).map_err(|_| out_of_range(v, "short"))?;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
            CType::UShort => {
                let v = value.try_integer()?;
                let v = u16::try_from(v).map_err(|_| out_of_range(v, "ushort"))?;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
            CType::Int | CType::Long => {
                let v = value.try_integer()?;
                let v = i32::try_from(v).map_err(|_| out_of_range(v, "int"))?;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
            CType::UInt | CType::ULong => {
                let v = value.try_integer()?;
                let v = u32::try_from(v).map_err(|_| out_of_range(v, "uint"))?;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
            CType::LongLong => {
                let v = value.try_integer()?;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
            CType::ULongLong => {
                let v = value.try_integer()?;
                let v = u64::try_from(v).map_err(|_| out_of_range(v, "ulonglong"))?;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
            CType::Float => {
                let v = value.try_float()?;
                if v.is_finite() && (v < f32::MIN as f64 || v > f32::MAX as f64) {
                    return Err(Error::pack(format!("value {} out of range for float", v)));
                }
                let v = v as f32;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
            CType::Double => {
                let v = value.try_float()?;
                match order {
                    ByteOrder::Big => v.to_be_bytes().to_vec(),
                    ByteOrder::Little => v.to_le_bytes().to_vec(),
                }
            }
        })
    }
}

impl FromStr for CType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "char" => Ok(CType::Char),
            "uchar" => Ok(CType::UChar),
            "short" => Ok(CType::Short),
            "ushort" => Ok(CType::UShort),
            "int" => Ok(CType::Int),
            "uint" => Ok(CType::UInt),
            "long" => Ok(CType::Long),
            "ulong" => Ok(CType::ULong),
            "longlong" => Ok(CType::LongLong),
            "ulonglong" => Ok(CType::ULongLong),
            "float" => Ok(CType::Float),
            "double" => Ok(CType::Double),
            _ => Err(Error::schema(format!("Unknown data type: {}", s))),
        }
    }
}

/// A C primitive held in a run of registers
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCType {
    /// First register address of the run
    pub address: Address,
    /// Field name in decoded data
    pub idx: String,
    /// The primitive type held in the run
    pub data_type: CType,
    /// Interpretation order of the reassembled byte run
    pub byte_order: ByteOrder,
    /// Order of the words across the run
    pub word_order: WordOrder,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamCType {
    /// Create a new C primitive parameter with big endian layout
    pub fn new<S: Into<String>>(address: Address, idx: S, data_type: CType) -> Self {
        Self {
            address,
            idx: idx.into(),
            data_type,
            byte_order: ByteOrder::Big,
            word_order: WordOrder::Big,
            block: None,
        }
    }

    /// Set the interpretation order of the byte run
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Set the order of the words across the run
    pub fn with_word_order(mut self, word_order: WordOrder) -> Self {
        self.word_order = word_order;
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    fn read_value<R: Registers>(&self, registers: &R) -> Option<Value> {
        let mut words = Vec::with_capacity(self.data_type.words());
        for offset in 0..self.data_type.words() {
            let raw = registers.get(self.address + offset as Address).ok()?;
            words.push(raw as u16);
        }
        if self.word_order == WordOrder::Little {
            words.reverse();
        }
        // Wire words carry their most significant byte first.
        let mut bytes = words_to_bytes(&words, ByteOrder::Big);
        let size = self.data_type.size();
        let bytes = match self.byte_order {
            ByteOrder::Big => bytes.split_off(bytes.len() - size),
            ByteOrder::Little => {
                bytes.truncate(size);
                bytes
            }
        };
        self.data_type.unpack(&bytes, self.byte_order)
    }

    /// Decode the register run to the primitive's value
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        match self.read_value(registers) {
            Some(value) => ValueMap::from([(self.idx.clone(), value)]),
            None => ValueMap::new(),
        }
    }

    /// Encode this parameter's value into the register run
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.idx)
            .ok_or_else(|| Error::missing_value(&self.idx))?;
        self.encode_value(value, registers)
    }

    /// Pack a value and write it into the register run
    ///
    /// A value the type cannot represent is logged and skipped rather than
    /// failing the whole write image.
    pub(crate) fn encode_value<R: Registers>(&self, value: &Value, registers: &mut R) -> Result<()> {
        let bytes = match self.data_type.pack(value, self.byte_order) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(idx = %self.idx, error = %e, "failed to pack value, skipping write");
                return Ok(());
            }
        };
        let total = self.data_type.words() * 2;
        let mut padded = Vec::with_capacity(total);
        match self.byte_order {
            ByteOrder::Big => {
                padded.resize(total - bytes.len(), 0);
                padded.extend_from_slice(&bytes);
            }
            ByteOrder::Little => {
                padded.extend_from_slice(&bytes);
                padded.resize(total, 0);
            }
        }
        let mut words = bytes_to_words(&padded, ByteOrder::Big);
        if self.word_order == WordOrder::Little {
            words.reverse();
        }
        for (offset, word) in words.iter().enumerate() {
            registers.set(self.address + offset as Address, *word as i64)?;
        }
        Ok(())
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        HashSet::from([self.idx.clone()])
    }
}

/// A C primitive with a decode scale
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCTypeScale {
    /// The primitive parameter this wraps
    pub ctype: ParamCType,
    /// Multiplier applied to the raw value on decode
    pub scale: f64,
    /// Significant figures kept after scaling, if any
    pub significant_figures: Option<u32>,
}

impl ParamCTypeScale {
    /// Create a new scaled C primitive parameter
    pub fn new<S: Into<String>>(address: Address, idx: S, data_type: CType) -> Self {
        Self {
            ctype: ParamCType::new(address, idx, data_type),
            scale: 1.0,
            significant_figures: None,
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

    /// Set the interpretation order of the byte run
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.ctype = self.ctype.with_byte_order(byte_order);
        self
    }

    /// Set the order of the words across the run
    pub fn with_word_order(mut self, word_order: WordOrder) -> Self {
        self.ctype = self.ctype.with_word_order(word_order);
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.ctype = self.ctype.with_block(block);
        self
    }

    fn apply_scale(&self, raw: &Value) -> Value {
        if self.scale == 1.0 && self.significant_figures.is_none() {
            if let Value::Integer(_) = raw {
                return raw.clone();
            }
        }
        let Some(value) = raw.as_float() else {
            return raw.clone();
        };
        let mut value = value * self.scale;
        if let Some(figures) = self.significant_figures {
            value = round_sig_figs(value, figures);
        }
        Value::Float(value)
    }

    /// Decode the register run and scale the value
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.ctype.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Some(raw) = self.ctype.read_value(registers) else {
            return ValueMap::new();
        };
        ValueMap::from([(self.ctype.idx.clone(), self.apply_scale(&raw))])
    }

    /// Unscale this parameter's value and encode it into the register run
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.ctype.idx)
            .ok_or_else(|| Error::missing_value(&self.ctype.idx))?;
        let unscaled = value.try_float()? / self.scale;
        let raw = if self.ctype.data_type.is_float() {
            Value::Float(unscaled)
        } else {
            Value::Integer(unscaled.round() as i64)
        };
        self.ctype.encode_value(&raw, registers)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        self.ctype.keys()
    }
}

/// A scaled C primitive that wraps around a modulus
///
/// Some devices fold a signed quantity into an unsigned register range and
/// flag the fold by exceeding the modulus. Decode undoes the fold before
/// scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCTypeScaleModulus {
    /// The scaled parameter this wraps
    pub scale: ParamCTypeScale,
    /// Modulus the raw value wraps around
    pub modulus: i64,
    /// Whether a wrapped value decodes as negative
    pub invert_on_overflow: bool,
}

impl ParamCTypeScaleModulus {
    /// Create a new modulus parameter
    pub fn new<S: Into<String>>(address: Address, idx: S, data_type: CType, modulus: i64) -> Self {
        Self {
            scale: ParamCTypeScale::new(address, idx, data_type),
            modulus,
            invert_on_overflow: false,
        }
    }

    /// Set whether a wrapped value decodes as negative
    pub fn with_invert_on_overflow(mut self, invert: bool) -> Self {
        self.invert_on_overflow = invert;
        self
    }

    /// Set the decode scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = self.scale.with_scale(scale);
        self
    }

    /// Set the significant figures kept after scaling
    pub fn with_significant_figures(mut self, figures: u32) -> Self {
        self.scale = self.scale.with_significant_figures(figures);
        self
    }

    /// Set the interpretation order of the byte run
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.scale = self.scale.with_byte_order(byte_order);
        self
    }

    /// Set the order of the words across the run
    pub fn with_word_order(mut self, word_order: WordOrder) -> Self {
        self.scale = self.scale.with_word_order(word_order);
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.scale = self.scale.with_block(block);
        self
    }

    /// Decode the register run, unfold the modulus and scale the value
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.scale.ctype.block.as_ref(), block) {
            return ValueMap::new();
        }
        let Some(raw) = self.scale.ctype.read_value(registers) else {
            return ValueMap::new();
        };
        // A zero modulus leaves the raw value as is.
        let value = match raw {
            Value::Integer(raw) if self.modulus != 0 => {
                let mut wrapped = raw.rem_euclid(self.modulus);
                if wrapped != raw && self.invert_on_overflow {
                    wrapped = -wrapped;
                }
                self.scale.apply_scale(&Value::Integer(wrapped))
            }
            Value::Float(raw) if self.modulus != 0 => {
                let mut wrapped = raw.rem_euclid(self.modulus as f64);
                if wrapped != raw && self.invert_on_overflow {
                    wrapped = -wrapped;
                }
                self.scale.apply_scale(&Value::Float(wrapped))
            }
            other => self.scale.apply_scale(&other),
        };
        ValueMap::from([(self.scale.ctype.idx.clone(), value)])
    }

    /// Unscale this parameter's value, fold it and encode it
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.scale.ctype.idx)
            .ok_or_else(|| Error::missing_value(&self.scale.ctype.idx))?;
        let unscaled = (value.try_float()? / self.scale.scale).round() as i64;
        let folded = if self.modulus != 0 {
            unscaled.rem_euclid(self.modulus)
        } else {
            unscaled
        };
        self.scale.ctype.encode_value(&Value::Integer(folded), registers)
    }

    /// The field names this parameter produces
    pub fn keys(&self) -> HashSet<String> {
        self.scale.keys()
    }
}
