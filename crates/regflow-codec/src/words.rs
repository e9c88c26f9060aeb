/*!
 * Byte and word ordering helpers for 16 bit register runs.
 *
 * Multi-register values travel as runs of 16 bit words. Devices disagree on
 * the byte order inside each word and on the word order across the run, so
 * both are modelled explicitly and applied by the parameter codecs.
 */
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Byte order within a single 16 bit word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Most significant byte first
    Big,
    /// Least significant byte first
    Little,
}

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::Big
    }
}

impl FromStr for ByteOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" => Ok(ByteOrder::Big),
            "little" => Ok(ByteOrder::Little),
            _ => Err(Error::schema(format!("Unknown byte order: {}", s))),
        }
    }
}

/// Word order across a run of 16 bit words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordOrder {
    /// Most significant word first
    Big,
    /// Least significant word first
    Little,
}

impl Default for WordOrder {
    fn default() -> Self {
        WordOrder::Big
    }
}

impl FromStr for WordOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" => Ok(WordOrder::Big),
            "little" => Ok(WordOrder::Little),
            _ => Err(Error::schema(format!("Unknown word order: {}", s))),
        }
    }
}

/// Flatten a run of words into bytes using the given byte order
pub fn words_to_bytes(words: &[u16], order: ByteOrder) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        let pair = match order {
            ByteOrder::Big => word.to_be_bytes(),
            ByteOrder::Little => word.to_le_bytes(),
        };
        bytes.extend_from_slice(&pair);
    }
    bytes
}

/// Group bytes into a run of words using the given byte order
///
/// A trailing odd byte is paired with a zero byte.
pub fn bytes_to_words(bytes: &[u8], order: ByteOrder) -> Vec<u16> {
    let mut words = Vec::with_capacity((bytes.len() + 1) / 2);
    for chunk in bytes.chunks(2) {
        let pair = [chunk[0], *chunk.get(1).unwrap_or(&0)];
        let word = match order {
            ByteOrder::Big => u16::from_be_bytes(pair),
            ByteOrder::Little => u16::from_le_bytes(pair),
        };
        words.push(word);
    }
    words
}

/// Exchange adjacent word pairs in place
///
/// A trailing word with no partner is left untouched. Applying the swap
/// twice restores the original order.
pub fn swap_word_pairs(words: &mut [u16]) {
    for pair in words.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}
