//! Template records produced by validation and requirement discovery.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::Warning;
use crate::model::{DataType, NumericList, NumericType, ScalarValue};

/// Marker that introduces a whole-value substitution reference (`$key`).
pub const PLACEHOLDER_MARKER: char = '$';

/// Attribute that pre-fills variable values and may be mirrored as `_FillValue`.
pub const MISSING_VALUE: &str = "missing_value";

/// The netCDF fill value attribute.
pub const FILL_VALUE: &str = "_FillValue";

/// Attributes every variable must declare.
pub const REQUIRED_VARIABLE_ATTRIBUTES: [&str; 1] = ["units"];

/// A variable must declare at least one of these.
pub const NAME_ATTRIBUTES: [&str; 2] = ["standard_name", "long_name"];

/// A global or variable attribute as declared in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub data_type: DataType,
    pub value: ScalarValue,
}

/// A variable as declared in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub data_type: NumericType,
    /// Zero or one dimension names.
    pub dimensions: Vec<String>,
    /// Explicit values, only for dimension variables and zero-dimensional variables.
    pub values: Option<NumericList>,
    /// Attributes in document order.
    pub attributes: Vec<(String, AttributeSpec)>,
}

impl VariableSpec {
    /// True if the variable's single dimension is named after itself.
    pub fn is_dimension_variable(&self) -> bool {
        matches!(self.dimensions.as_slice(), [d] if *d == self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// A substitution key and the data type of its first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRequirement {
    pub key: String,
    pub data_type: DataType,
}

/// What a caller must supply to build a data object from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements<'a> {
    pub substitutions: &'a [SubstitutionRequirement],
    pub dimensions: &'a [String],
}

impl fmt::Display for Requirements<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "substitutions: ")?;
        if self.substitutions.is_empty() {
            write!(f, "none")?;
        }
        for (i, req) in self.substitutions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} ({})", req.key, req.data_type)?;
        }
        write!(f, "; dimensions: ")?;
        if self.dimensions.is_empty() {
            write!(f, "none")?;
        }
        write!(f, "{}", self.dimensions.join(", "))
    }
}

/// A validated template together with its discovered requirements.
///
/// Templates are only created by a successful validation and discovery pass
/// and are immutable afterwards.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) data_object_type: String,
    pub(crate) source_name: String,
    pub(crate) global_attributes: Vec<(String, AttributeSpec)>,
    pub(crate) variables: Vec<VariableSpec>,
    pub(crate) substitution_requirements: Vec<SubstitutionRequirement>,
    pub(crate) dimension_names: Vec<String>,
    pub(crate) unspecified_dimensions: Vec<String>,
    pub(crate) specified_dimension_lengths: FxHashMap<String, usize>,
    pub(crate) warnings: Vec<Warning>,
}

impl Template {
    /// The unique key for this template.
    pub fn data_object_type(&self) -> &str {
        &self.data_object_type
    }

    /// Where the template came from (usually a file base name).
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn global_attributes(&self) -> &[(String, AttributeSpec)] {
        &self.global_attributes
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Distinct substitution keys in first-encounter order.
    pub fn substitution_requirements(&self) -> &[SubstitutionRequirement] {
        &self.substitution_requirements
    }

    /// Every dimension referenced by a variable, in first-encounter order.
    pub fn dimension_names(&self) -> &[String] {
        &self.dimension_names
    }

    /// Dimensions whose lengths must be supplied at build time.
    pub fn unspecified_dimensions(&self) -> &[String] {
        &self.unspecified_dimensions
    }

    /// Length of a dimension fixed by its dimension variable's values.
    pub fn specified_dimension_length(&self, name: &str) -> Option<usize> {
        self.specified_dimension_lengths.get(name).copied()
    }

    pub fn requirements(&self) -> Requirements<'_> {
        Requirements {
            substitutions: &self.substitution_requirements,
            dimensions: &self.unspecified_dimensions,
        }
    }

    /// Non-fatal findings from discovery.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, dimensions: &[&str]) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            data_type: NumericType::Int32,
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            values: None,
            attributes: vec![(
                "units".to_string(),
                AttributeSpec {
                    data_type: DataType::Str,
                    value: ScalarValue::Str("1".to_string()),
                },
            )],
        }
    }

    #[test]
    fn test_dimension_variable() {
        assert!(variable("level", &["level"]).is_dimension_variable());
        assert!(!variable("temperature", &["level"]).is_dimension_variable());
        assert!(!variable("level", &[]).is_dimension_variable());
    }

    #[test]
    fn test_attribute_lookup() {
        let v = variable("level", &["level"]);
        assert!(v.declares("units"));
        assert!(!v.declares(MISSING_VALUE));
        assert_eq!(
            v.attribute("units").map(|a| a.data_type),
            Some(DataType::Str)
        );
    }

    #[test]
    fn test_requirements_display() {
        let subs = vec![
            SubstitutionRequirement {
                key: "site".to_string(),
                data_type: DataType::Str,
            },
            SubstitutionRequirement {
                key: "m".to_string(),
                data_type: DataType::Int32,
            },
        ];
        let dims = vec!["level".to_string()];
        let req = Requirements {
            substitutions: &subs,
            dimensions: &dims,
        };
        assert_eq!(
            req.to_string(),
            "substitutions: site (str), m (int32); dimensions: level"
        );

        let empty = Requirements {
            substitutions: &[],
            dimensions: &[],
        };
        assert_eq!(empty.to_string(), "substitutions: none; dimensions: none");
    }
}
