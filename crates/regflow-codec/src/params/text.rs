/*!
 * Fixed width text parameters.
 *
 * Text occupies a contiguous run of registers, two bytes per word. Encode
 * and decode are symmetric: the same swap settings that reorder bytes and
 * words on the way in restore them on the way out.
 */
use std::collections::HashSet;

use regflow_core::types::{Address, Value, ValueMap};

use crate::address_map::Registers;
use crate::error::{Error, Result};
use crate::params::same_block;
use crate::words::{bytes_to_words, swap_word_pairs, words_to_bytes, ByteOrder};

/// A string held in a contiguous run of registers
#[derive(Debug, Clone, PartialEq)]
pub struct ParamText {
    /// First register address of the run
    pub address: Address,
    /// Field name in decoded data
    pub idx: String,
    /// Length of the run in words
    pub length: usize,
    /// Whether bytes within each word are swapped on the wire
    pub swap_bytes: bool,
    /// Whether adjacent words are swapped on the wire
    pub swap_words: bool,
    /// Fill byte trimmed on decode and appended on encode
    pub padding: u8,
    /// Additional characters trimmed from both ends after decoding, if any
    pub strip: Option<String>,
    /// Read block this parameter belongs to, if any
    pub block: Option<Value>,
}

impl ParamText {
    /// Create a new text parameter with null padding and no swapping
    pub fn new<S: Into<String>>(address: Address, idx: S, length: usize) -> Self {
        Self {
            address,
            idx: idx.into(),
            length,
            swap_bytes: false,
            swap_words: false,
            padding: 0,
            strip: None,
            block: None,
        }
    }

    /// Set whether bytes within each word are swapped on the wire
    pub fn with_swap_bytes(mut self, swap_bytes: bool) -> Self {
        self.swap_bytes = swap_bytes;
        self
    }

    /// Set whether adjacent words are swapped on the wire
    pub fn with_swap_words(mut self, swap_words: bool) -> Self {
        self.swap_words = swap_words;
        self
    }

    /// Set the fill byte
    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = padding;
        self
    }

    /// Set additional characters to trim from both ends after decoding
    pub fn with_strip<S: Into<String>>(mut self, strip: S) -> Self {
        self.strip = Some(strip.into());
        self
    }

    /// Set the read block this parameter belongs to
    pub fn with_block<V: Into<Value>>(mut self, block: V) -> Self {
        self.block = Some(block.into());
        self
    }

    fn byte_order(&self) -> ByteOrder {
        if self.swap_bytes {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Decode the register run to a string
    ///
    /// The fill byte and null bytes are trimmed from both ends and bytes
    /// that do not form valid UTF-8 are dropped. Returns an empty map when
    /// any word of the run is unpopulated or the block does not match.
    pub fn decode<R: Registers>(&self, registers: &R, block: Option<&Value>) -> ValueMap {
        if !same_block(self.block.as_ref(), block) {
            return ValueMap::new();
        }
        let mut words = Vec::with_capacity(self.length);
        for offset in 0..self.length {
            let Ok(raw) = registers.get(self.address + offset as Address) else {
                return ValueMap::new();
            };
            words.push(raw as u16);
        }
        if self.swap_words {
            swap_word_pairs(&mut words);
        }
        let bytes = words_to_bytes(&words, self.byte_order());

        let is_fill = |byte: &u8| *byte == self.padding || *byte == 0;
        let trimmed = match bytes.iter().position(|byte| !is_fill(byte)) {
            Some(start) => {
                let end = bytes.iter().rposition(|byte| !is_fill(byte)).unwrap_or(start);
                &bytes[start..=end]
            }
            None => &bytes[..0],
        };

        let mut text: String = String::from_utf8_lossy(trimmed)
            .chars()
            .filter(|&c| c != char::REPLACEMENT_CHARACTER)
            .collect();
        if let Some(strip) = &self.strip {
            text = text.trim_matches(|c| strip.contains(c)).to_string();
        }
        ValueMap::from([(self.idx.clone(), Value::String(text))])
    }

    /// Encode this parameter's string into the register run
    ///
    /// The string is padded with the fill byte up to the full run and
    /// packed with the same swap settings the decode direction undoes.
    /// Fails when the string does not fit the declared run.
    pub fn encode<R: Registers>(&self, data: &ValueMap, registers: &mut R) -> Result<()> {
        let value = data
            .get(&self.idx)
            .ok_or_else(|| Error::missing_value(&self.idx))?;
        let text = value.try_str()?;

        let max = self.length * 2;
        if text.len() > max {
            return Err(Error::TextOverflow {
                len: text.len(),
                max,
            });
        }
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(max, self.padding);

        let mut words = bytes_to_words(&bytes, self.byte_order());
        if self.swap_words {
            swap_word_pairs(&mut words);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_map::AddressMap;

    fn roundtrip(param: &ParamText, text: &str) -> String {
        let mut registers = AddressMap::new();
        let data = ValueMap::from([(param.idx.clone(), Value::from(text))]);
        param.encode(&data, &mut registers).unwrap();
        let decoded = param.decode(&registers, None);
        match &decoded[&param.idx] {
            Value::String(s) => s.clone(),
            other => panic!("expected a string, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_trims_fill() {
        let mut registers = AddressMap::new();
        registers.save_block(0, &[0x4142, 0x4344, 0, 0]).unwrap();
        let param = ParamText::new(0, "name", 4);
        let data = param.decode(&registers, None);
        assert_eq!(data["name"], Value::from("ABCD"));
    }

    #[test]
    fn test_decode_missing_word() {
        let mut registers = AddressMap::new();
        registers.set(0, 0x4142).unwrap();
        let param = ParamText::new(0, "name", 2);
        assert!(param.decode(&registers, None).is_empty());
    }

    #[test]
    fn test_roundtrip_even_length() {
        let param = ParamText::new(10, "name", 4);
        assert_eq!(roundtrip(&param, "ABCDEFGH"), "ABCDEFGH");
        assert_eq!(roundtrip(&param, "AB"), "AB");
        assert_eq!(roundtrip(&param, ""), "");
    }

    #[test]
    fn test_roundtrip_odd_byte_count() {
        let param = ParamText::new(10, "name", 4);
        assert_eq!(roundtrip(&param, "ABCDE"), "ABCDE");
        assert_eq!(roundtrip(&param, "A"), "A");
    }

    #[test]
    fn test_roundtrip_swap_bytes() {
        let param = ParamText::new(10, "name", 3).with_swap_bytes(true);
        assert_eq!(roundtrip(&param, "ABCDEF"), "ABCDEF");
        assert_eq!(roundtrip(&param, "ABC"), "ABC");
    }

    #[test]
    fn test_roundtrip_swap_words_odd_run() {
        let param = ParamText::new(10, "name", 3).with_swap_words(true);
        assert_eq!(roundtrip(&param, "ABCDEF"), "ABCDEF");
        assert_eq!(roundtrip(&param, "ABCDE"), "ABCDE");
    }

    #[test]
    fn test_roundtrip_swap_both() {
        let param = ParamText::new(10, "name", 4)
            .with_swap_bytes(true)
            .with_swap_words(true);
        assert_eq!(roundtrip(&param, "ABCDEFG"), "ABCDEFG");
    }

    #[test]
    fn test_swap_bytes_wire_layout() {
        let mut registers = AddressMap::new();
        let param = ParamText::new(0, "name", 1).with_swap_bytes(true);
        let data = ValueMap::from([("name".to_string(), Value::from("AB"))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(0).unwrap(), 0x4241);
    }

    #[test]
    fn test_encode_overflow() {
        let mut registers = AddressMap::new();
        let param = ParamText::new(0, "name", 2);
        let data = ValueMap::from([("name".to_string(), Value::from("ABCDE"))]);
        assert!(matches!(
            param.encode(&data, &mut registers),
            Err(Error::TextOverflow { len: 5, max: 4 })
        ));
    }

    #[test]
    fn test_space_padding() {
        let param = ParamText::new(0, "name", 4).with_padding(b' ');
        assert_eq!(roundtrip(&param, "HI"), "HI");

        let mut registers = AddressMap::new();
        let data = ValueMap::from([("name".to_string(), Value::from("HI"))]);
        param.encode(&data, &mut registers).unwrap();
        assert_eq!(registers.get(1).unwrap(), 0x2020);
    }

    #[test]
    fn test_strip_characters() {
        let mut registers = AddressMap::new();
        registers.save_block(0, &[0x2A41, 0x422A]).unwrap();
        let param = ParamText::new(0, "name", 2).with_strip("*");
        let data = param.decode(&registers, None);
        assert_eq!(data["name"], Value::from("AB"));
    }

    #[test]
    fn test_invalid_utf8_dropped() {
        let mut registers = AddressMap::new();
        registers.set(0, 0xFF41).unwrap();
        let param = ParamText::new(0, "name", 1);
        let data = param.decode(&registers, None);
        assert_eq!(data["name"], Value::from("A"));
    }

    #[test]
    fn test_block_gating() {
        let mut registers = AddressMap::new();
        registers.set(0, 0x4141).unwrap();
        let param = ParamText::new(0, "name", 1).with_block("ident");
        assert!(param.decode(&registers, None).is_empty());
        assert!(!param.decode(&registers, Some(&Value::from("ident"))).is_empty());
    }
}
