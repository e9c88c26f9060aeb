/*!
 * Error types for the RegFlow codec crate.
 */
use regflow_core::types::Address;
use thiserror::Error;

/// Error type for RegFlow codec operations
#[derive(Error, Debug)]
pub enum Error {
    /// An address was read that holds no value
    #[error("Address {0} is not populated")]
    MissingAddress(Address),

    /// A value was written that does not fit in a 16 bit register
    #[error("Value {value} does not fit register {address} (expected 0..=65535)")]
    RegisterOverflow {
        /// The register address being written
        address: Address,
        /// The value that was out of range
        value: i64,
    },

    /// A value was written that does not fit under a bit mask
    #[error("Value {value} does not fit mask {mask:#06x}")]
    MaskOverflow {
        /// The value after shifting
        value: i64,
        /// The mask it had to fit under
        mask: u16,
    },

    /// Two register maps populate the same addresses
    #[error("Addresses {addresses:?} are populated in both maps")]
    MergeConflict {
        /// The addresses populated on both sides
        addresses: Vec<Address>,
    },

    /// An update referenced addresses the target map does not hold
    #[error("Addresses {addresses:?} are not present in the target map")]
    UnknownAddresses {
        /// The addresses missing from the target
        addresses: Vec<Address>,
    },

    /// A string was encoded that exceeds its register run
    #[error("Text of {len} bytes exceeds capacity of {max}")]
    TextOverflow {
        /// The encoded byte length
        len: usize,
        /// The capacity of the register run in bytes
        max: usize,
    },

    /// A slice had a different length than the operation required
    #[error("Length mismatch: expected {expected}, given {given}")]
    LengthMismatch {
        /// The length the operation required
        expected: usize,
        /// The length that was supplied
        given: usize,
    },

    /// The data to encode held no entry for a parameter
    #[error("Missing value for parameter {0}")]
    MissingValue(String),

    /// The operation is not supported for this parameter kind
    #[error("Operation not supported for {0}")]
    Unimplemented(&'static str),

    /// A value could not be packed into its binary representation
    #[error("Pack error: {0}")]
    Pack(String),

    /// A parameter schema could not be interpreted
    #[error("Schema error: {0}")]
    Schema(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] regflow_core::error::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for RegFlow codec operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new missing value error
    pub fn missing_value<S: AsRef<str>>(idx: S) -> Self {
        Error::MissingValue(idx.as_ref().to_string())
    }

    /// Create a new pack error
    pub fn pack<S: AsRef<str>>(msg: S) -> Self {
        Error::Pack(msg.as_ref().to_string())
    }

    /// Create a new schema error
    pub fn schema<S: AsRef<str>>(msg: S) -> Self {
        Error::Schema(msg.as_ref().to_string())
    }
}
