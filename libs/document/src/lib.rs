//! Calcmark document processing
//!
//! Finds the math regions of a Markdown-like document, evaluates the
//! statements they contain in document order, and writes results back:
//!
//! - `name := expr` defines a value or formula
//! - `expr ==` and `name := expr ==` append the computed quantity
//! - `name === definition` declares a custom unit
//! - `expr =>` is handed to an optional symbolic backend
//!
//! [`process`] and [`strip_computed`] are idempotent: processing a
//! stripped document reproduces the processed one byte for byte.

#![forbid(unsafe_code)]

pub mod options;
pub mod processor;
pub mod render;
pub mod span;
pub mod strip;

pub use options::ProcessOptions;
pub use processor::{process, Diagnostic, Processed, Processor};
pub use render::{format_magnitude, render_error, render_quantity};
pub use span::{find_regions, substitute, LineIndex, RegionKind, Span};
pub use strip::strip_computed;
