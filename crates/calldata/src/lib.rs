//! Canonical flat call-data encoding.
//!
//! A call's data field is a flat, `@`-separated rendering of the function
//! name and its arguments: `function@hex(arg1)@hex(arg2)…`. The function name
//! is plain text; every argument is hex-encoded, and an empty argument
//! encodes as an empty segment. `transfer@0a@` therefore calls `transfer`
//! with the arguments `[0x0a]` and `[]`.
//!
//! The parser and builder here are exact inverses:
//! `parse_call_data(builder.into_bytes())` yields the original function name
//! and raw arguments.

use thiserror::Error;

/// Separator between the function name and each argument.
pub const SEPARATOR: char = '@';

/// Errors produced while decoding a call's data field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallDataError {
    /// The data field was empty.
    #[error("call data is empty")]
    Empty,
    /// Nothing precedes the first separator.
    #[error("call data has no function name")]
    MissingFunctionName,
    /// The data field is not valid UTF-8.
    #[error("call data is not valid UTF-8")]
    InvalidUtf8,
    /// An argument segment is not valid hex.
    #[error("argument {index} is not valid hex")]
    InvalidArgumentHex {
        /// Zero-based index of the offending argument.
        index: usize,
    },
}

/// A decoded data field: function name plus raw argument bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCallData {
    /// Function to invoke.
    pub function: String,
    /// Decoded arguments in order.
    pub arguments: Vec<Vec<u8>>,
}

/// Decode a data field into its function name and raw arguments.
pub fn parse_call_data(data: &[u8]) -> Result<ParsedCallData, CallDataError> {
    if data.is_empty() {
        return Err(CallDataError::Empty);
    }
    let text = std::str::from_utf8(data).map_err(|_| CallDataError::InvalidUtf8)?;

    let mut segments = text.split(SEPARATOR);
    let function = segments.next().unwrap_or_default();
    if function.is_empty() {
        return Err(CallDataError::MissingFunctionName);
    }

    let mut arguments = Vec::new();
    for (index, segment) in segments.enumerate() {
        let argument =
            hex::decode(segment).map_err(|_| CallDataError::InvalidArgumentHex { index })?;
        arguments.push(argument);
    }

    Ok(ParsedCallData {
        function: function.to_owned(),
        arguments,
    })
}

/// Builder for the canonical flat encoding.
///
/// ```
/// use shardvm_calldata::{parse_call_data, CallDataBuilder};
///
/// let data = CallDataBuilder::new("transfer").arg(&[0x0a]).into_bytes();
/// assert_eq!(data, b"transfer@0a");
///
/// let parsed = parse_call_data(&data).unwrap();
/// assert_eq!(parsed.function, "transfer");
/// assert_eq!(parsed.arguments, vec![vec![0x0a]]);
/// ```
#[derive(Debug, Clone)]
pub struct CallDataBuilder {
    encoded: String,
}

impl CallDataBuilder {
    /// Start encoding a call to the given function.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            encoded: function.into(),
        }
    }

    /// Append a raw-byte argument.
    pub fn arg(mut self, argument: &[u8]) -> Self {
        self.encoded.push(SEPARATOR);
        self.encoded.push_str(&hex::encode(argument));
        self
    }

    /// Append an integer argument in minimal big-endian form.
    pub fn arg_u64(self, argument: u64) -> Self {
        let bytes = argument.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        self.arg(&bytes[first..])
    }

    /// Finish encoding.
    pub fn into_bytes(self) -> Vec<u8> {
        self.encoded.into_bytes()
    }
}
