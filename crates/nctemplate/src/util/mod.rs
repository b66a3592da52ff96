//! Utility modules for template text handling.

pub mod placeholder;

pub use placeholder::{
    field_names, format_value, interpolate, scan, Field, FormatError, FormatSpec,
    InterpolationError, ScanError, Token,
};
