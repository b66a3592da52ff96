//! Structural validation of template documents.
//!
//! A template document is the generic YAML tree produced by the document
//! layer. Validation walks it once and reports every violation it finds;
//! nothing is rejected on the first error. Checks that depend on knowing
//! which variables are dimension variables happen later, in
//! [`discover`](crate::discover).

use rustc_hash::FxHashSet;
use serde_yaml::{Mapping, Number as YamlNumber, Value};

use crate::error::{Collector, Stage, Subject, TemplateError};
use crate::model::template::{NAME_ATTRIBUTES, REQUIRED_VARIABLE_ATTRIBUTES};
use crate::model::{
    AttributeSpec, DataType, Family, NumericList, NumericType, ScalarValue, VariableSpec,
    FILL_VALUE, MISSING_VALUE, PLACEHOLDER_MARKER,
};
use crate::registry::TemplateRegistry;

/// A structurally valid template whose requirements are not yet known.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTemplate {
    pub data_object_type: String,
    pub global_attributes: Vec<(String, AttributeSpec)>,
    pub variables: Vec<VariableSpec>,
}

/// Validates a template document.
///
/// The data object type must not already be registered in `registry`.
/// Returns every structural error found, in document order.
pub fn validate_document(
    document: &Value,
    registry: &TemplateRegistry,
) -> Result<ValidatedTemplate, Vec<TemplateError>> {
    let mut errors = Collector::new(Stage::Structure);

    let Some(top) = document.as_mapping() else {
        errors.report(
            Subject::Document,
            "does not consist of a mapping at the top level",
        );
        return Err(errors.into_errors());
    };

    let data_object_type = check_data_object_type(top, registry, &mut errors);

    let global_attributes = match top.get("global_attributes") {
        None => {
            errors.report(Subject::Document, "has no 'global_attributes' entry");
            Vec::new()
        }
        Some(Value::Sequence(entries)) => check_global_attributes(entries, &mut errors),
        Some(_) => {
            errors.report(Subject::Document, "'global_attributes' is not given as a list");
            Vec::new()
        }
    };

    let variables = match top.get("variables") {
        None => {
            errors.report(Subject::Document, "has no 'variables' entry");
            Vec::new()
        }
        Some(Value::Sequence(entries)) => check_variables(entries, &mut errors),
        Some(_) => {
            errors.report(Subject::Document, "'variables' is not given as a list");
            Vec::new()
        }
    };

    match data_object_type {
        Some(data_object_type) if errors.is_empty() => Ok(ValidatedTemplate {
            data_object_type,
            global_attributes,
            variables,
        }),
        _ => Err(errors.into_errors()),
    }
}

fn check_data_object_type(
    top: &Mapping,
    registry: &TemplateRegistry,
    errors: &mut Collector,
) -> Option<String> {
    match top.get("data_object_type") {
        None => {
            errors.report(Subject::Document, "has no 'data_object_type' entry");
            None
        }
        Some(Value::String(key)) if key.is_empty() => {
            errors.report(Subject::Document, "'data_object_type' is empty");
            None
        }
        Some(Value::String(key)) => {
            if registry.contains(key) {
                errors.report(
                    Subject::Document,
                    format!(
                        "a template has already been loaded for data object type '{}'",
                        key
                    ),
                );
            }
            Some(key.clone())
        }
        Some(_) => {
            errors.report(Subject::Document, "'data_object_type' is not a string");
            None
        }
    }
}

// =============================================================================
// ENTRIES
// =============================================================================

/// Splits a single-key mapping into its string key and value.
fn single_entry(entry: &Value) -> Option<(&str, &Value)> {
    let map = entry.as_mapping()?;
    if map.len() != 1 {
        return None;
    }
    let (key, value) = map.iter().next()?;
    Some((key.as_str()?, value))
}

fn describe_key(key: &Value) -> String {
    match key.as_str() {
        Some(name) => format!("'{}'", name),
        None => format!("{:?}", key),
    }
}

fn permitted_names() -> String {
    DataType::ALL
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_global_attributes(
    entries: &[Value],
    errors: &mut Collector,
) -> Vec<(String, AttributeSpec)> {
    let mut seen = FxHashSet::default();
    let mut attributes = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some((name, value)) = single_entry(entry) else {
            errors.report(
                Subject::GlobalAttributeEntry(index),
                "is not a mapping with exactly 1 key (its name)",
            );
            continue;
        };
        let subject = Subject::GlobalAttribute(name.to_string());
        if !seen.insert(name) {
            errors.report(subject, "has been defined more than once");
            continue;
        }
        if let Some(spec) = check_attribute(value, &subject, errors) {
            attributes.push((name.to_string(), spec));
        }
    }
    attributes
}

fn check_variables(entries: &[Value], errors: &mut Collector) -> Vec<VariableSpec> {
    let mut seen = FxHashSet::default();
    let mut variables = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some((name, body)) = single_entry(entry) else {
            errors.report(
                Subject::VariableEntry(index),
                "is not a mapping with exactly 1 key (its name)",
            );
            continue;
        };
        if !seen.insert(name) {
            errors.report(
                Subject::Variable(name.to_string()),
                "has been defined more than once",
            );
            continue;
        }
        if let Some(variable) = check_variable(name, body, errors) {
            variables.push(variable);
        }
    }
    variables
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// Checks one `{data_type, value}` attribute mapping.
fn check_attribute(
    value: &Value,
    subject: &Subject,
    errors: &mut Collector,
) -> Option<AttributeSpec> {
    let before = errors.len();

    let Some(map) = value.as_mapping() else {
        errors.report(
            subject.clone(),
            "is not a mapping with 'data_type' and 'value' entries",
        );
        return None;
    };

    let data_type = match map.get("data_type") {
        None => {
            errors.report(subject.clone(), "has no data_type");
            None
        }
        Some(Value::String(name)) => {
            let data_type = DataType::from_name(name);
            if data_type.is_none() {
                errors.report(
                    subject.clone(),
                    format!(
                        "data type '{}' is not one of {}",
                        name,
                        permitted_names()
                    ),
                );
            }
            data_type
        }
        Some(_) => {
            errors.report(subject.clone(), "data_type is not a string");
            None
        }
    };

    let extra: Vec<String> = map
        .keys()
        .filter(|k| !matches!(k.as_str(), Some("data_type") | Some("value")))
        .map(describe_key)
        .collect();
    if !extra.is_empty() {
        errors.report(
            subject.clone(),
            format!("has unexpected entries: {}", extra.join(", ")),
        );
    }

    let raw = map.get("value");
    if raw.is_none() {
        errors.report(subject.clone(), "has no value");
    }

    let (Some(data_type), Some(raw)) = (data_type, raw) else {
        return None;
    };
    let value = match check_value(raw, data_type) {
        Ok(value) => value,
        Err(message) => {
            errors.report(subject.clone(), message);
            return None;
        }
    };

    if errors.len() > before {
        return None;
    }
    Some(AttributeSpec { data_type, value })
}

fn check_value(raw: &Value, data_type: DataType) -> Result<ScalarValue, String> {
    let numeric = data_type.numeric();
    match (raw, numeric) {
        (Value::String(text), None) => Ok(ScalarValue::Str(text.clone())),
        (Value::String(text), Some(_)) => match text.strip_prefix(PLACEHOLDER_MARKER) {
            Some(key) if !key.is_empty() => Ok(ScalarValue::PlaceholderRef(key.to_string())),
            Some(_) => Err(format!(
                "placeholder reference '{}' has no key",
                text
            )),
            None => Err(format!(
                "string value '{}' is not consistent with data type {}; \
                 only a placeholder reference ({}key) is allowed",
                text, data_type, PLACEHOLDER_MARKER
            )),
        },
        (Value::Number(n), Some(t)) => Ok(match check_number(n, t)? {
            Literal::Int(v) => ScalarValue::Int(v),
            Literal::Float(v) => ScalarValue::Float(v),
        }),
        (Value::Sequence(items), Some(t)) => check_numeric_list(items, t).map(ScalarValue::from),
        (Value::Number(_) | Value::Sequence(_), None) => {
            Err("value is not consistent with data type str".to_string())
        }
        (Value::Mapping(_), _) => {
            Err("value has been given as a mapping; it should contain a value".to_string())
        }
        _ => Err("value is an invalid data type".to_string()),
    }
}

enum Literal {
    Int(i64),
    Float(f64),
}

/// Checks a numeric literal against a numeric type's family and range.
fn check_number(n: &YamlNumber, t: NumericType) -> Result<Literal, String> {
    if n.is_f64() {
        return match (t.family(), n.as_f64()) {
            (Family::Floating, Some(v)) => Ok(Literal::Float(v)),
            _ => Err(format!(
                "value {} is not consistent with data type {}",
                n, t
            )),
        };
    }
    let Some(v) = n.as_i64() else {
        return Err(format!("value {} is out of range for data type {}", n, t));
    };
    match t.family() {
        Family::Floating => Err(format!(
            "value {} is not consistent with data type {}",
            n, t
        )),
        Family::Integer if !t.accepts_integer(v) => {
            Err(format!("value {} is out of range for data type {}", v, t))
        }
        Family::Integer => Ok(Literal::Int(v)),
    }
}

/// Checks a non-empty list of literals of one numeric family.
fn check_numeric_list(items: &[Value], t: NumericType) -> Result<NumericList, String> {
    if items.is_empty() {
        return Err("list of values is empty".to_string());
    }
    let mut ints = Vec::new();
    let mut floats = Vec::new();
    for item in items {
        let Value::Number(n) = item else {
            return Err("values are not all of a numerical type".to_string());
        };
        match check_number(n, t)? {
            Literal::Int(v) => ints.push(v),
            Literal::Float(v) => floats.push(v),
        }
    }
    Ok(match t.family() {
        Family::Integer => NumericList::Int(ints),
        Family::Floating => NumericList::Float(floats),
    })
}

// =============================================================================
// VARIABLES
// =============================================================================

fn check_variable(name: &str, body: &Value, errors: &mut Collector) -> Option<VariableSpec> {
    let before = errors.len();
    let subject = Subject::Variable(name.to_string());

    let Some(entries) = body.as_sequence() else {
        errors.report(subject, "is not defined as a list");
        return None;
    };

    let mut seen = FxHashSet::default();
    let mut data_type = None;
    let mut dimensions = None;
    let mut raw_values = None;
    let mut attributes = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some((key, value)) = single_entry(entry) else {
            errors.report(
                Subject::VariableProperty {
                    variable: name.to_string(),
                    index,
                },
                "is not a mapping with exactly 1 key (its name)",
            );
            continue;
        };
        let attribute_subject = Subject::VariableAttribute {
            variable: name.to_string(),
            attribute: key.to_string(),
        };
        if !seen.insert(key) {
            errors.report(attribute_subject, "has been defined more than once");
            continue;
        }
        match key {
            "data_type" => match check_variable_data_type(value) {
                Ok(t) => data_type = Some(t),
                Err(message) => errors.report(subject.clone(), message),
            },
            "dimensions" => match check_dimensions(value) {
                Ok(d) => dimensions = Some(d),
                Err(message) => errors.report(subject.clone(), message),
            },
            "values" => raw_values = Some(value),
            _ => {
                if let Some(spec) = check_attribute(value, &attribute_subject, errors) {
                    attributes.push((key.to_string(), spec));
                }
            }
        }
    }

    for feature in ["data_type", "dimensions"] {
        if !seen.contains(feature) {
            errors.report(subject.clone(), format!("has no '{}' entry", feature));
        }
    }
    for required in REQUIRED_VARIABLE_ATTRIBUTES {
        if !seen.contains(required) {
            errors.report(
                subject.clone(),
                format!("required attribute '{}' has not been defined", required),
            );
        }
    }
    if !NAME_ATTRIBUTES.iter().any(|a| seen.contains(a)) {
        errors.report(
            subject.clone(),
            format!(
                "required attribute '{}' or '{}' has not been defined",
                NAME_ATTRIBUTES[0], NAME_ATTRIBUTES[1]
            ),
        );
    }

    let values = match (raw_values, data_type) {
        (Some(Value::Sequence(items)), Some(t)) => match check_numeric_list(items, t) {
            Ok(list) => Some(list),
            Err(message) => {
                errors.report(subject.clone(), format!("values: {}", message));
                None
            }
        },
        (Some(Value::Sequence(_)), None) | (None, _) => None,
        (Some(_), _) => {
            errors.report(subject.clone(), "values have not been given as a list");
            None
        }
    };

    if let (Some(list), Some(dims)) = (&values, &dimensions) {
        match dims.as_slice() {
            [] if list.len() != 1 => {
                errors.report(subject.clone(), "dimensionless variable may have only 1 value")
            }
            [] => {}
            [d] if d == name => {}
            _ => errors.report(
                subject.clone(),
                "cannot specify values since it is neither a dimension variable \
                 nor a variable with no dimensions",
            ),
        }
    }

    if let Some(t) = data_type {
        for fill in [MISSING_VALUE, FILL_VALUE] {
            let Some((_, spec)) = attributes.iter().find(|(n, _)| n == fill) else {
                continue;
            };
            let fill_subject = Subject::VariableAttribute {
                variable: name.to_string(),
                attribute: fill.to_string(),
            };
            if spec.data_type != DataType::from(t) {
                errors.report(
                    fill_subject.clone(),
                    format!(
                        "data type {} is inconsistent with the variable's data type {}",
                        spec.data_type, t
                    ),
                );
            }
            if matches!(spec.value, ScalarValue::IntList(_) | ScalarValue::FloatList(_)) {
                errors.report(fill_subject, "must be a single value");
            }
        }
    }

    if errors.len() > before {
        return None;
    }
    let (Some(data_type), Some(dimensions)) = (data_type, dimensions) else {
        return None;
    };
    Some(VariableSpec {
        name: name.to_string(),
        data_type,
        dimensions,
        values,
        attributes,
    })
}

fn check_variable_data_type(value: &Value) -> Result<NumericType, String> {
    let Some(name) = value.as_str() else {
        return Err("data type is not given as a string".to_string());
    };
    match DataType::from_name(name) {
        None => Err(format!(
            "data type '{}' is not one of {}",
            name,
            permitted_names()
        )),
        Some(t) => t
            .numeric()
            .ok_or_else(|| format!("data type '{}' cannot hold variable values", name)),
    }
}

fn check_dimensions(value: &Value) -> Result<Vec<String>, String> {
    let Some(items) = value.as_sequence() else {
        return Err("dimensions are not given as a list".to_string());
    };
    let mut dimensions = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(d) => dimensions.push(d.to_string()),
            None => return Err("a dimension name is not a string".to_string()),
        }
    }
    if dimensions.len() > 1 {
        return Err("has more than 1 dimension".to_string());
    }
    Ok(dimensions)
}
