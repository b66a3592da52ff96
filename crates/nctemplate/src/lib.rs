//! nctemplate: netCDF data objects from declarative templates.
//!
//! A template declares the global attributes, dimensions and variables of a
//! data object, with placeholders for values supplied later. This crate
//! validates templates, discovers what each one needs, and builds typed,
//! shape-correct data objects from them.
//!
//! # Overview
//!
//! - **Validation**: structural and type checks over the YAML document,
//!   reporting every violation at once
//! - **Discovery**: substitution keys (`{key}` in text, `$key` for numbers)
//!   and the dimensions whose lengths the caller must supply
//! - **Building**: dimension lengths and substitution values in, a fully
//!   resolved [`DataObject`] out
//!
//! # Quick Start
//!
//! ```rust
//! use nctemplate::{DimensionLengths, Substitution, Substitutions, TemplateRegistry};
//!
//! let mut registry = TemplateRegistry::new();
//! registry
//!     .load_str(
//!         "profile.yaml",
//!         r#"
//! data_object_type: profile
//! global_attributes:
//!   - title: {data_type: str, value: "{site} profile"}
//! variables:
//!   - level:
//!       - data_type: int32
//!       - dimensions: [level]
//!       - units: {data_type: str, value: "1"}
//!       - long_name: {data_type: str, value: level}
//! "#,
//!     )
//!     .unwrap();
//!
//! let mut dimensions = DimensionLengths::new();
//! dimensions.insert("level".to_string(), 5);
//! let mut substitutions = Substitutions::new();
//! substitutions.insert("site".to_string(), Substitution::from("Alpha"));
//!
//! let object = registry
//!     .build("profile", &dimensions, &substitutions, false)
//!     .unwrap();
//! assert_eq!(object.dimension("level"), Some(5));
//! assert_eq!(
//!     object.global_attribute("title").and_then(|a| a.value.as_text()),
//!     Some("Alpha profile")
//! );
//! assert_eq!(object.variable("level").unwrap().values.len(), 5);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Values, templates, data objects and the builder
//! - [`validate`]: Structural validation of template documents
//! - [`discover`]: Substitution and dimension discovery
//! - [`registry`]: Template loading and lookup
//! - [`codec`]: Data object interchange (JSON)
//! - [`util`]: Placeholder scanning and interpolation
//! - [`error`]: Error types

pub mod codec;
pub mod discover;
pub mod error;
pub mod model;
pub mod registry;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{decode_data_object, encode_data_object, DataObjectReader, DataObjectWriter};
pub use error::{CodecError, CreationError, LoadError, Stage, Subject, TemplateError, Warning};
pub use model::{
    build_data_object, Attribute, AttributeSpec, AttributeValue, DataObject, DataObjectBuilder,
    DataType, DimensionLengths, Number, NumericType, Requirements, ScalarValue, Substitution,
    SubstitutionRequirement, Substitutions, Template, ValueArray, Variable, VariableSpec,
};
pub use registry::TemplateRegistry;
pub use validate::{validate_document, ValidatedTemplate};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
