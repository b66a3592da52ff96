//! Data model types for templates and data objects.
//!
//! This module contains:
//! - Values (data types, template scalars, substitution values, typed arrays)
//! - Templates (validated attribute and variable declarations)
//! - Data objects (fully resolved global attributes, dimensions, variables)
//! - Builders (data object construction from a template)

pub mod builder;
pub mod data_object;
mod nonfinite;
pub mod template;
pub mod value;

pub use builder::{build_data_object, DataObjectBuilder, DimensionLengths, Substitutions};
pub use data_object::{Attribute, AttributeValue, DataObject, Variable};
pub use template::{
    AttributeSpec, Requirements, SubstitutionRequirement, Template, VariableSpec, FILL_VALUE,
    MISSING_VALUE, PLACEHOLDER_MARKER,
};
pub use value::{
    DataType, Family, Number, NumericList, NumericType, ScalarValue, Substitution, ValueArray,
};
