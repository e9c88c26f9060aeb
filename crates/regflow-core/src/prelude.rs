/*!
 * Prelude module for RegFlow Core.
 *
 * This module re-exports commonly used types and functions from the RegFlow Core crate
 * to make them easier to import.
 */

// Re-export error types
pub use crate::error::{Error, Result};

// Re-export core types
pub use crate::types::{Address, Value, ValueMap};

// Re-export utility functions
pub use crate::utils::round_sig_figs;

// Re-export logging macros
pub use tracing::{trace, debug, info, warn, error};

// Re-export core initialization
pub use crate::init;
