//! Data object construction from a template.
//!
//! Building checks the caller's dimension lengths and substitution values
//! against the template's requirements, then resolves every attribute and
//! variable. All problems are collected before failing; no partial data
//! object is ever returned.
//!
//! # Example
//!
//! ```rust
//! use nctemplate::{DataObjectBuilder, TemplateRegistry};
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
//! let template = registry.lookup("profile").unwrap();
//! let object = DataObjectBuilder::new(template)
//!     .dimension("level", 5)
//!     .substitution("site", "Alpha")
//!     .build()
//!     .unwrap();
//! assert_eq!(object.dimension("level"), Some(5));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::error::CreationError;
use crate::model::data_object::{Attribute, AttributeValue, DataObject, Variable};
use crate::model::template::{AttributeSpec, Template, VariableSpec, FILL_VALUE, MISSING_VALUE};
use crate::model::value::{Number, ScalarValue, Substitution, ValueArray};
use crate::util::placeholder::{self, InterpolationError, Token};

/// Caller-supplied lengths for unspecified dimensions.
pub type DimensionLengths = HashMap<String, usize>;

/// Caller-supplied values for substitution keys.
pub type Substitutions = HashMap<String, Substitution>;

/// Builds a data object from a template.
///
/// Lengths for dimensions the template already specifies are ignored, as are
/// entries for unknown dimensions and keys. With `add_fill_value`, every
/// variable with a `missing_value` and no declared `_FillValue` gets a
/// `_FillValue` mirroring it.
pub fn build_data_object(
    template: &Template,
    dimension_lengths: &DimensionLengths,
    substitutions: &Substitutions,
    add_fill_value: bool,
) -> Result<DataObject, CreationError> {
    let mut problems = Problems::default();
    let mut object = DataObject::new();
    let mut supplied = BTreeSet::new();

    for name in template.dimension_names() {
        let length = match template.specified_dimension_length(name) {
            Some(length) => Some(length),
            None => match dimension_lengths.get(name) {
                None => {
                    problems.missing_dimensions.insert(name.clone());
                    None
                }
                Some(0) => {
                    problems.invalid_dimensions.insert(name.clone());
                    None
                }
                Some(&length) => {
                    supplied.insert(name.clone());
                    Some(length)
                }
            },
        };
        if let Some(length) = length {
            object.insert_dimension(name.clone(), length);
        }
    }

    for (name, spec) in template.global_attributes() {
        if let Some(attribute) = resolve_attribute(spec, substitutions, &mut problems) {
            object.insert_global_attribute(name.clone(), attribute);
        }
    }

    for spec in template.variables() {
        let variable = build_variable(
            spec,
            &object.dimensions,
            &supplied,
            substitutions,
            add_fill_value,
            &mut problems,
        );
        if let Some(variable) = variable {
            object.insert_variable(spec.name.clone(), variable);
        }
    }

    if let Some(error) = problems.into_error() {
        return Err(error);
    }

    debug!(
        data_object_type = template.data_object_type(),
        dimensions = object.names_of_dimensions.len(),
        variables = object.names_of_variables.len(),
        "built data object"
    );
    Ok(object)
}

#[derive(Debug, Default)]
struct Problems {
    missing_dimensions: BTreeSet<String>,
    invalid_dimensions: BTreeSet<String>,
    missing_substitutions: BTreeSet<String>,
    invalid_substitutions: BTreeSet<String>,
}

impl Problems {
    fn into_error(self) -> Option<CreationError> {
        CreationError::incomplete(
            self.missing_dimensions,
            self.invalid_dimensions,
            self.missing_substitutions,
            self.invalid_substitutions,
        )
    }
}

/// Resolves one attribute, recording unusable substitutions.
fn resolve_attribute(
    spec: &AttributeSpec,
    substitutions: &Substitutions,
    problems: &mut Problems,
) -> Option<Attribute> {
    let value = match (&spec.value, spec.data_type.numeric()) {
        (ScalarValue::Str(text), _) => {
            let text = text.trim_end();
            // Text was scanned during discovery.
            let tokens = placeholder::scan(text).unwrap_or_else(|_| vec![Token::literal(text)]);
            match placeholder::interpolate(&tokens, |key| substitutions.get(key)) {
                Ok(text) => AttributeValue::Text(text),
                Err(errors) => {
                    for error in errors {
                        match error {
                            InterpolationError::Missing { key } => {
                                problems.missing_substitutions.insert(key)
                            }
                            InterpolationError::Format { key, .. } => {
                                problems.invalid_substitutions.insert(key)
                            }
                        };
                    }
                    return None;
                }
            }
        }
        (ScalarValue::PlaceholderRef(key), Some(t)) => {
            let Some(value) = substitutions.get(key) else {
                problems.missing_substitutions.insert(key.clone());
                return None;
            };
            match value.to_number(t) {
                Some(n) => AttributeValue::Number(n),
                None => {
                    problems.invalid_substitutions.insert(key.clone());
                    return None;
                }
            }
        }
        (ScalarValue::Int(v), Some(t)) => AttributeValue::Number(Number::from_i64(*v, t)),
        (ScalarValue::Float(v), Some(t)) => AttributeValue::Number(Number::from_f64(*v, t)),
        (ScalarValue::IntList(values), Some(t)) => {
            AttributeValue::Array(ValueArray::from_ints(t, values))
        }
        (ScalarValue::FloatList(values), Some(t)) => {
            AttributeValue::Array(ValueArray::from_floats(t, values))
        }
        // Validation only pairs `str` with text.
        (_, None) => return None,
    };
    Some(Attribute {
        data_type: spec.data_type,
        value,
    })
}

/// Resolves a variable's attributes, allocates its values and fills them.
///
/// A shape too large to allocate marks the variable's caller-supplied
/// dimensions invalid.
fn build_variable(
    spec: &VariableSpec,
    dimensions: &BTreeMap<String, usize>,
    supplied: &BTreeSet<String>,
    substitutions: &Substitutions,
    add_fill_value: bool,
    problems: &mut Problems,
) -> Option<Variable> {
    let mut complete = true;

    // Every attribute resolves before any fill happens.
    let mut attributes = Vec::with_capacity(spec.attributes.len() + 1);
    for (name, attribute) in &spec.attributes {
        match resolve_attribute(attribute, substitutions, problems) {
            Some(resolved) => attributes.push((name.clone(), resolved)),
            None => complete = false,
        }
    }

    let mut shape = Vec::with_capacity(spec.dimensions.len().max(1));
    for dimension in &spec.dimensions {
        match dimensions.get(dimension) {
            Some(&length) => shape.push(length),
            None => complete = false,
        }
    }
    if !complete {
        return None;
    }
    if shape.is_empty() {
        shape.push(1);
    }
    if !spec.data_type.fits_shape(&shape) {
        problems.invalid_dimensions.extend(
            spec.dimensions
                .iter()
                .filter(|name| supplied.contains(*name))
                .cloned(),
        );
        return None;
    }

    if add_fill_value && !spec.declares(FILL_VALUE) {
        if let Some(index) = attributes.iter().position(|(n, _)| n == MISSING_VALUE) {
            let mirrored = attributes[index].1.clone();
            attributes.insert(index + 1, (FILL_VALUE.to_string(), mirrored));
        }
    }

    let fill_value = |name: &str| {
        attributes
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, a)| a.value.as_number())
    };
    let mut values = ValueArray::zeros(spec.data_type, &shape);
    if let Some(list) = &spec.values {
        values.assign_list(list);
    } else if let Some(n) = fill_value(MISSING_VALUE) {
        values.fill(n);
    } else if let Some(n) = fill_value(FILL_VALUE) {
        values.fill(n);
    }

    let mut variable = Variable::new(spec.data_type, spec.dimensions.clone(), values);
    for (name, attribute) in attributes {
        variable.insert_attribute(name, attribute);
    }
    Some(variable)
}

// =============================================================================
// FLUENT BUILDER
// =============================================================================

/// Fluent construction of a data object from one template.
///
/// The builder can be reused; each [`build`](Self::build) starts from the
/// template afresh.
#[derive(Debug, Clone)]
pub struct DataObjectBuilder<'t> {
    template: &'t Template,
    dimension_lengths: DimensionLengths,
    substitutions: Substitutions,
    add_fill_value: bool,
}

impl<'t> DataObjectBuilder<'t> {
    pub fn new(template: &'t Template) -> Self {
        Self {
            template,
            dimension_lengths: DimensionLengths::new(),
            substitutions: Substitutions::new(),
            add_fill_value: false,
        }
    }

    /// Sets the length of an unspecified dimension.
    pub fn dimension(mut self, name: impl Into<String>, length: usize) -> Self {
        self.dimension_lengths.insert(name.into(), length);
        self
    }

    /// Sets several dimension lengths at once.
    pub fn dimensions<K: Into<String>>(
        mut self,
        lengths: impl IntoIterator<Item = (K, usize)>,
    ) -> Self {
        self.dimension_lengths
            .extend(lengths.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Sets the value of a substitution key.
    pub fn substitution(mut self, key: impl Into<String>, value: impl Into<Substitution>) -> Self {
        self.substitutions.insert(key.into(), value.into());
        self
    }

    /// Sets several substitution values at once.
    pub fn substitutions<K: Into<String>, V: Into<Substitution>>(
        mut self,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.substitutions
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Mirrors `missing_value` as `_FillValue` where none is declared.
    pub fn add_fill_value(mut self, add: bool) -> Self {
        self.add_fill_value = add;
        self
    }

    pub fn build(&self) -> Result<DataObject, CreationError> {
        build_data_object(
            self.template,
            &self.dimension_lengths,
            &self.substitutions,
            self.add_fill_value,
        )
    }
}
