use thiserror::Error;

/// Errors produced while reading a packet back out of its byte form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// A read ran past the end of the packet
    #[error("Unexpected end of packet: needed {needed} byte(s), only {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// A boolean was encoded with a byte other than 0 or 1
    #[error("Invalid boolean byte: {value}")]
    InvalidBool { value: u8 },

    /// A string payload did not hold valid UTF-8
    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,

    /// A variable-length integer did not terminate within 32 bits
    #[error("Variable-length integer overflows 32 bits")]
    VarIntOverflow,

    /// An enum discriminant byte did not map to any known variant
    #[error("Invalid {type_name} discriminant: {value}")]
    InvalidDiscriminant { type_name: &'static str, value: u8 },

    /// A field decoded cleanly but holds a value its type cannot take
    #[error("Invalid {type_name} value: {value}")]
    InvalidValue { type_name: &'static str, value: u64 },
}
