//! Requirement discovery for structurally valid templates.
//!
//! Discovery scans a [`ValidatedTemplate`] in document order (global
//! attributes, then variables, then each variable's attributes) and records:
//! - the distinct substitution keys and their data types
//! - the dimensions referenced by variables, and which of them have lengths
//!   fixed by a dimension variable's values
//!
//! It also rejects templates whose dimensions lack a dimension variable and
//! placeholder text that cannot be scanned.

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::{Collector, Stage, Subject, TemplateError, Warning};
use crate::model::{
    AttributeSpec, DataType, ScalarValue, SubstitutionRequirement, Template, PLACEHOLDER_MARKER,
};
use crate::util::placeholder;
use crate::validate::ValidatedTemplate;

/// Discovers the requirements of a validated template.
pub fn discover(
    template: ValidatedTemplate,
    source_name: &str,
) -> Result<Template, Vec<TemplateError>> {
    let mut errors = Collector::new(Stage::Discovery);
    let mut scan = Scan::default();

    for (name, spec) in &template.global_attributes {
        scan.attribute(spec, Subject::GlobalAttribute(name.clone()), &mut errors);
    }
    for variable in &template.variables {
        for (name, spec) in &variable.attributes {
            let subject = Subject::VariableAttribute {
                variable: variable.name.clone(),
                attribute: name.clone(),
            };
            scan.attribute(spec, subject, &mut errors);
        }
    }

    for variable in &template.variables {
        if variable.values.is_some()
            && !(variable.dimensions.is_empty() || variable.is_dimension_variable())
        {
            errors.report(
                Subject::Variable(variable.name.clone()),
                "cannot specify values since it is neither a dimension variable \
                 nor a variable with no dimensions",
            );
        }
    }

    let mut dimension_names: Vec<String> = Vec::new();
    for dimension in template.variables.iter().flat_map(|v| &v.dimensions) {
        if !dimension_names.contains(dimension) {
            dimension_names.push(dimension.clone());
        }
    }

    let mut specified_dimension_lengths = FxHashMap::default();
    let mut unspecified_dimensions = Vec::new();
    for dimension in &dimension_names {
        let dimension_variable = template
            .variables
            .iter()
            .find(|v| v.name == *dimension && v.is_dimension_variable());
        match dimension_variable {
            None => errors.report(
                Subject::Dimension(dimension.clone()),
                "no dimension variable has been defined for this dimension",
            ),
            Some(v) => match &v.values {
                Some(values) => {
                    specified_dimension_lengths.insert(dimension.clone(), values.len());
                }
                None => unspecified_dimensions.push(dimension.clone()),
            },
        }
    }

    if !errors.is_empty() {
        return Err(errors.into_errors());
    }

    for warning in &scan.warnings {
        warn!(
            data_object_type = %template.data_object_type,
            source = source_name,
            "{}",
            warning
        );
    }

    Ok(Template {
        data_object_type: template.data_object_type,
        source_name: source_name.to_string(),
        global_attributes: template.global_attributes,
        variables: template.variables,
        substitution_requirements: scan.requirements,
        dimension_names,
        unspecified_dimensions,
        specified_dimension_lengths,
        warnings: scan.warnings,
    })
}

#[derive(Default)]
struct Scan {
    requirements: Vec<SubstitutionRequirement>,
    warnings: Vec<Warning>,
}

impl Scan {
    fn attribute(&mut self, spec: &AttributeSpec, subject: Subject, errors: &mut Collector) {
        match &spec.value {
            ScalarValue::Str(text) => {
                if text.contains(PLACEHOLDER_MARKER) {
                    self.warnings.push(Warning {
                        subject: subject.clone(),
                        message: format!(
                            "'{}' has no substitution meaning in str text",
                            PLACEHOLDER_MARKER
                        ),
                    });
                }
                match placeholder::scan(text) {
                    Ok(tokens) => {
                        for key in placeholder::field_names(&tokens) {
                            self.require(key, DataType::Str);
                        }
                    }
                    Err(e) => errors.report(subject, e.to_string()),
                }
            }
            ScalarValue::PlaceholderRef(key) => self.require(key, spec.data_type),
            ScalarValue::Int(_)
            | ScalarValue::Float(_)
            | ScalarValue::IntList(_)
            | ScalarValue::FloatList(_) => {}
        }
    }

    /// Records a key on first encounter.
    fn require(&mut self, key: &str, data_type: DataType) {
        if !self.requirements.iter().any(|r| r.key == key) {
            self.requirements.push(SubstitutionRequirement {
                key: key.to_string(),
                data_type,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NumericList, NumericType, VariableSpec};
    use crate::registry::TemplateRegistry;
    use crate::validate::validate_document;

    fn discover_str(text: &str) -> Result<Template, Vec<TemplateError>> {
        let document: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
        let validated = validate_document(&document, &TemplateRegistry::new()).unwrap();
        discover(validated, "test.yaml")
    }

    fn text_attribute(value: &str) -> (String, AttributeSpec) {
        (
            "units".to_string(),
            AttributeSpec {
                data_type: DataType::Str,
                value: ScalarValue::Str(value.to_string()),
            },
        )
    }

    #[test]
    fn test_requirements_in_first_encounter_order() {
        let template = discover_str(
            r#"
data_object_type: station
global_attributes:
  - title: {data_type: str, value: "{site} at {elevation}"}
  - station_id: {data_type: int32, value: "$id"}
  - summary: {data_type: str, value: "{site} again"}
variables:
  - time:
      - data_type: float64
      - dimensions: [time]
      - units: {data_type: str, value: "days since {epoch}"}
      - standard_name: {data_type: str, value: time}
  - temperature:
      - data_type: float32
      - dimensions: [time]
      - units: {data_type: str, value: K}
      - long_name: {data_type: str, value: "temperature at {site}"}
      - missing_value: {data_type: float32, value: "$missing"}
"#,
        )
        .unwrap();

        let keys: Vec<(&str, DataType)> = template
            .substitution_requirements()
            .iter()
            .map(|r| (r.key.as_str(), r.data_type))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("site", DataType::Str),
                ("elevation", DataType::Str),
                ("id", DataType::Int32),
                ("epoch", DataType::Str),
                ("missing", DataType::Float32),
            ]
        );
        assert_eq!(template.dimension_names(), &["time".to_string()]);
        assert_eq!(template.unspecified_dimensions(), &["time".to_string()]);
        assert!(template.warnings().is_empty());
        assert_eq!(template.source_name(), "test.yaml");
    }

    #[test]
    fn test_specified_dimension_lengths() {
        let template = discover_str(
            r#"
data_object_type: grid
global_attributes: []
variables:
  - altitude:
      - data_type: float32
      - dimensions: [altitude]
      - values: [0.5, 1.5, 2.5]
      - units: {data_type: str, value: km}
      - standard_name: {data_type: str, value: altitude}
  - time:
      - data_type: int32
      - dimensions: [time]
      - units: {data_type: str, value: s}
      - standard_name: {data_type: str, value: time}
  - scale:
      - data_type: float64
      - dimensions: []
      - values: [2.0]
      - units: {data_type: str, value: "1"}
      - long_name: {data_type: str, value: scale}
"#,
        )
        .unwrap();

        assert_eq!(
            template.dimension_names(),
            &["altitude".to_string(), "time".to_string()]
        );
        assert_eq!(template.unspecified_dimensions(), &["time".to_string()]);
        assert_eq!(template.specified_dimension_length("altitude"), Some(3));
        assert_eq!(template.specified_dimension_length("time"), None);
        assert_eq!(
            template.requirements().to_string(),
            "substitutions: none; dimensions: time"
        );
    }

    #[test]
    fn test_dimension_without_variable_is_rejected() {
        let errors = discover_str(
            r#"
data_object_type: broken
global_attributes: []
variables:
  - temperature:
      - data_type: float32
      - dimensions: [time]
      - units: {data_type: str, value: K}
      - long_name: {data_type: str, value: temperature}
"#,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "[discovery] dimension 'time': no dimension variable has been defined for this dimension"
        );
    }

    #[test]
    fn test_placeholder_syntax_errors_are_reported() {
        let errors = discover_str(
            r#"
data_object_type: broken
global_attributes:
  - title: {data_type: str, value: "{site profile"}
  - summary: {data_type: str, value: "{a.b}"}
variables: []
"#,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].stage, Stage::Discovery);
        assert_eq!(errors[0].subject, Subject::GlobalAttribute("title".to_string()));
        assert_eq!(errors[1].subject, Subject::GlobalAttribute("summary".to_string()));
    }

    #[test]
    fn test_marker_in_text_is_a_warning() {
        let template = discover_str(
            r#"
data_object_type: prose
global_attributes:
  - comment: {data_type: str, value: "costs $5 per {unit}"}
variables: []
"#,
        )
        .unwrap();
        assert_eq!(template.warnings().len(), 1);
        assert_eq!(
            template.warnings()[0].subject,
            Subject::GlobalAttribute("comment".to_string())
        );
        assert_eq!(template.substitution_requirements()[0].key, "unit");
    }

    #[test]
    fn test_values_recheck_on_non_dimension_variable() {
        let validated = ValidatedTemplate {
            data_object_type: "handmade".to_string(),
            global_attributes: Vec::new(),
            variables: vec![
                VariableSpec {
                    name: "time".to_string(),
                    data_type: NumericType::Int32,
                    dimensions: vec!["time".to_string()],
                    values: None,
                    attributes: vec![text_attribute("s")],
                },
                VariableSpec {
                    name: "temperature".to_string(),
                    data_type: NumericType::Float32,
                    dimensions: vec!["time".to_string()],
                    values: Some(NumericList::Float(vec![1.0])),
                    attributes: vec![text_attribute("K")],
                },
            ],
        };
        let errors = discover(validated, "handmade").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].subject,
            Subject::Variable("temperature".to_string())
        );
    }
}
