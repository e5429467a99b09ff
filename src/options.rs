//! Expression-Layer Options.
//!
//! The core reads three options: commutative-operand sorting, the rewrite
//! level gating constructor-time rewriting, and the store-as-lambda
//! encoding of array writes. Options are plain fields; the by-name surface
//! exists for textual front ends.

use thiserror::Error;

/// Highest supported rewrite level.
pub const MAX_REWRITE_LEVEL: u64 = 3;

/// Error raised by the by-name option surface.
///
/// These are the only recoverable errors in the crate; everything else is
/// a contract violation and panics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    /// The option name is not recognized.
    #[error("unknown option `{0}`")]
    Unknown(String),
    /// The value is outside the option's range.
    #[error("value {value} out of range for option `{name}`")]
    OutOfRange {
        /// Option name as given.
        name: String,
        /// Rejected value.
        value: u64,
    },
}

/// Options read by the expression core.
#[derive(Debug, Clone)]
pub struct Options {
    /// Keep commutative binary operands in ascending id order.
    pub sort_exp: bool,
    /// Rewriter strength at construction time; 0 disables rewriting.
    pub rewrite_level: u8,
    /// Encode every array write as a lambda instead of an update node.
    pub fun_store_lambdas: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sort_exp: true,
            rewrite_level: 1,
            fun_store_lambdas: false,
        }
    }
}

impl Options {
    /// Set an option by name.
    pub fn set(&mut self, name: &str, value: u64) -> Result<(), OptionError> {
        match name {
            "sort-exp" => {
                if value > 1 {
                    return Err(OptionError::OutOfRange {
                        name: name.to_string(),
                        value,
                    });
                }
                self.sort_exp = value != 0;
            }
            "rewrite-level" => {
                if value > MAX_REWRITE_LEVEL {
                    return Err(OptionError::OutOfRange {
                        name: name.to_string(),
                        value,
                    });
                }
                self.rewrite_level = value as u8;
            }
            "fun-store-lambdas" => {
                if value > 1 {
                    return Err(OptionError::OutOfRange {
                        name: name.to_string(),
                        value,
                    });
                }
                self.fun_store_lambdas = value != 0;
            }
            _ => return Err(OptionError::Unknown(name.to_string())),
        }
        Ok(())
    }

    /// Read an option by name.
    pub fn get(&self, name: &str) -> Result<u64, OptionError> {
        match name {
            "sort-exp" => Ok(u64::from(self.sort_exp)),
            "rewrite-level" => Ok(u64::from(self.rewrite_level)),
            "fun-store-lambdas" => Ok(u64::from(self.fun_store_lambdas)),
            _ => Err(OptionError::Unknown(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert!(opts.sort_exp);
        assert_eq!(opts.rewrite_level, 1);
        assert!(!opts.fun_store_lambdas);
    }

    #[test]
    fn test_by_name_round_trip() {
        let mut opts = Options::default();
        opts.set("rewrite-level", 0).unwrap();
        assert_eq!(opts.get("rewrite-level"), Ok(0));
        opts.set("fun-store-lambdas", 1).unwrap();
        assert_eq!(opts.get("fun-store-lambdas"), Ok(1));
    }

    #[test]
    fn test_errors() {
        let mut opts = Options::default();
        assert!(matches!(
            opts.set("no-such-option", 1),
            Err(OptionError::Unknown(_))
        ));
        assert!(matches!(
            opts.set("rewrite-level", 9),
            Err(OptionError::OutOfRange { .. })
        ));
    }
}
