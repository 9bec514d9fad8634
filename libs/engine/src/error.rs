//! Error types for the calcmark engine
//!
//! Every variant is recoverable at the region level: the document pass
//! annotates the failing region and moves on.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{message} (at offset {offset})")]
    Tokenize { message: String, offset: usize },

    #[error("{message}")]
    Parse {
        message: String,
        start: usize,
        end: usize,
    },

    #[error("undefined symbol '{name}'{}", .reason.as_ref().map(|r| format!(" ({})", r)).unwrap_or_default())]
    UndefinedSymbol {
        name: String,
        reason: Option<String>,
        at: Option<usize>,
    },

    #[error("incompatible units [{left}] and [{right}]")]
    DimensionMismatch {
        left: String,
        right: String,
        at: Option<usize>,
    },

    #[error("unknown unit '{name}'")]
    UnknownUnit { name: String, at: Option<usize> },

    #[error("cannot convert [{from}] to [{to}]")]
    Conversion {
        from: String,
        to: String,
        at: Option<usize>,
    },

    #[error("division by zero")]
    DivisionByZero { at: Option<usize> },

    #[error("circular definition: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("'{name}' collides with unit {unit}")]
    ReservedNameCollision { name: String, unit: String },

    #[error("evaluation exceeded {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    #[error("'{name}' is unusable: {reason}")]
    Upstream { name: String, reason: String },

    #[error("{0}")]
    InvalidExponent(String),

    #[error("{0}")]
    UnitAttachment(String),

    #[error("{function}: {message}")]
    FunctionArgument { function: String, message: String },

    #[error("{0}")]
    InvalidCall(String),

    #[error("result is not a finite number")]
    NonFinite,

    #[error("{0}")]
    UnitDefinition(String),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, start: usize, end: usize) -> Self {
        Error::Parse {
            message: message.into(),
            start,
            end,
        }
    }

    pub(crate) fn undefined(name: impl Into<String>, reason: Option<String>) -> Self {
        Error::UndefinedSymbol {
            name: name.into(),
            reason,
            at: None,
        }
    }

    /// Records where evaluation failed. The innermost position wins, and
    /// errors without a position slot are returned unchanged.
    pub(crate) fn at(mut self, offset: usize) -> Self {
        match &mut self {
            Error::UndefinedSymbol { at, .. }
            | Error::DimensionMismatch { at, .. }
            | Error::UnknownUnit { at, .. }
            | Error::Conversion { at, .. }
            | Error::DivisionByZero { at } => {
                at.get_or_insert(offset);
            }
            _ => {}
        }
        self
    }

    /// Stable name used in region markers and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Tokenize { .. } => "TokenizeError",
            Error::Parse { .. } => "ParseError",
            Error::UndefinedSymbol { .. } => "UndefinedSymbol",
            Error::DimensionMismatch { .. } => "DimensionMismatch",
            Error::UnknownUnit { .. } => "UnknownUnit",
            Error::Conversion { .. } => "ConversionError",
            Error::DivisionByZero { .. } => "DivisionByZero",
            Error::Cycle { .. } => "CycleError",
            Error::ReservedNameCollision { .. } => "ReservedNameCollision",
            Error::Timeout { .. } => "Timeout",
            Error::Upstream { .. } => "UpstreamError",
            Error::InvalidExponent(_) => "InvalidExponent",
            Error::UnitAttachment(_) => "UnitAttachmentError",
            Error::FunctionArgument { .. } => "FunctionArgumentError",
            Error::InvalidCall(_) => "InvalidCall",
            Error::NonFinite => "NonFiniteResult",
            Error::UnitDefinition(_) => "UnitDefinitionError",
        }
    }

    /// Byte offset of the problem within the text that was tokenized,
    /// parsed or evaluated.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Tokenize { offset, .. } => Some(*offset),
            Error::Parse { start, .. } => Some(*start),
            Error::UndefinedSymbol { at, .. }
            | Error::DimensionMismatch { at, .. }
            | Error::UnknownUnit { at, .. }
            | Error::Conversion { at, .. }
            | Error::DivisionByZero { at } => *at,
            _ => None,
        }
    }

    /// Moves source positions by `by` bytes, for errors raised on a substring.
    pub fn shifted(self, by: usize) -> Self {
        match self {
            Error::Tokenize { message, offset } => Error::Tokenize {
                message,
                offset: offset + by,
            },
            Error::Parse {
                message,
                start,
                end,
            } => Error::Parse {
                message,
                start: start + by,
                end: end + by,
            },
            mut other => {
                if let Error::UndefinedSymbol { at, .. }
                | Error::DimensionMismatch { at, .. }
                | Error::UnknownUnit { at, .. }
                | Error::Conversion { at, .. }
                | Error::DivisionByZero { at } = &mut other
                {
                    *at = at.map(|offset| offset + by);
                }
                other
            }
        }
    }

    /// Maps a unit-library failure raised while converting to `target`.
    pub(crate) fn conversion(err: calcmark_units::Error, target: &str) -> Self {
        match err {
            calcmark_units::Error::Incompatible { from, .. } => Error::Conversion {
                from,
                to: target.to_string(),
                at: None,
            },
            other => other.into(),
        }
    }
}

impl From<calcmark_units::Error> for Error {
    fn from(err: calcmark_units::Error) -> Self {
        use calcmark_units::Error as U;
        match err {
            U::UnknownUnit(name) => Error::UnknownUnit { name, at: None },
            U::Incompatible { from, to } => Error::DimensionMismatch {
                left: from,
                right: to,
                at: None,
            },
            U::InvalidExponent { unit, exponent } => Error::InvalidExponent(format!(
                "cannot raise [{}] to the power {}",
                unit, exponent
            )),
            U::ExponentOverflow { .. } => Error::InvalidExponent(err.to_string()),
            U::ReservedName { name, unit } => Error::ReservedNameCollision { name, unit },
            U::DuplicateUnit { .. } | U::InvalidName(_) => Error::UnitDefinition(err.to_string()),
            U::Empty | U::Syntax { .. } => Error::UnitAttachment(err.to_string()),
            U::Overflow => Error::NonFinite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_symbol_message_includes_reason() {
        let err = Error::undefined("V", Some("definition rejected".into()));
        assert_eq!(err.to_string(), "undefined symbol 'V' (definition rejected)");
        assert_eq!(err.kind(), "UndefinedSymbol");
    }

    #[test]
    fn shifted_moves_parse_spans() {
        let err = Error::parse("unexpected token", 2, 4).shifted(10);
        assert_eq!(err.offset(), Some(12));
    }

    #[test]
    fn evaluation_errors_carry_positions() {
        let err = Error::undefined("V", None).at(7);
        assert_eq!(err.offset(), Some(7));
        assert_eq!(err.clone().at(2).offset(), Some(7));
        assert_eq!(err.shifted(3).offset(), Some(10));

        assert_eq!(Error::DivisionByZero { at: None }.shifted(3).offset(), None);
        assert_eq!(Error::NonFinite.at(4).offset(), None);
    }

    #[test]
    fn unit_errors_map_to_taxonomy() {
        let err: Error = calcmark_units::Error::UnknownUnit("furlong".into()).into();
        assert_eq!(err.kind(), "UnknownUnit");
        let err = Error::conversion(
            calcmark_units::Error::Incompatible {
                from: "kg".into(),
                to: "m".into(),
            },
            "m",
        );
        assert_eq!(err.kind(), "ConversionError");
    }
}
