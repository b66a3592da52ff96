//! Error types for template loading, data object creation and interchange.
//!
//! Template and creation errors accumulate: a failing call reports every
//! problem found in one pass rather than the first.

use std::collections::BTreeSet;
use std::fmt;
use std::io;

use thiserror::Error;

/// Phase of template loading that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Structural and type conformity of the document.
    Structure,
    /// Substitution and dimension discovery.
    Discovery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Structure => f.write_str("structure"),
            Stage::Discovery => f.write_str("discovery"),
        }
    }
}

/// Location within a template that an error or warning refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Document,
    /// A global attribute entry whose name could not be read.
    GlobalAttributeEntry(usize),
    GlobalAttribute(String),
    /// A variable entry whose name could not be read.
    VariableEntry(usize),
    Variable(String),
    /// A variable entry whose feature or attribute name could not be read.
    VariableProperty { variable: String, index: usize },
    VariableAttribute { variable: String, attribute: String },
    Dimension(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Document => write!(f, "template"),
            Subject::GlobalAttributeEntry(index) => write!(f, "global attribute {}", index),
            Subject::GlobalAttribute(name) => write!(f, "global attribute '{}'", name),
            Subject::VariableEntry(index) => write!(f, "variable {}", index),
            Subject::Variable(name) => write!(f, "variable '{}'", name),
            Subject::VariableProperty { variable, index } => {
                write!(f, "variable '{}' entry {}", variable, index)
            }
            Subject::VariableAttribute {
                variable,
                attribute,
            } => write!(f, "variable '{}' attribute '{}'", variable, attribute),
            Subject::Dimension(name) => write!(f, "dimension '{}'", name),
        }
    }
}

/// A single template violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{stage}] {subject}: {message}")]
pub struct TemplateError {
    pub stage: Stage,
    pub subject: Subject,
    pub message: String,
}

/// A non-fatal template finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub subject: Subject,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Accumulates template errors for one stage.
#[derive(Debug)]
pub(crate) struct Collector {
    stage: Stage,
    errors: Vec<TemplateError>,
}

impl Collector {
    pub(crate) fn new(stage: Stage) -> Self {
        Self {
            stage,
            errors: Vec::new(),
        }
    }

    pub(crate) fn report(&mut self, subject: Subject, message: impl Into<String>) {
        self.errors.push(TemplateError {
            stage: self.stage,
            subject,
            message: message.into(),
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_errors(self) -> Vec<TemplateError> {
        self.errors
    }
}

/// Error while loading a template into a registry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read template {source_name}: {error}")]
    Io {
        source_name: String,
        #[source]
        error: io::Error,
    },

    #[error("template {source_name} fails YAML parsing: {error}")]
    Parse {
        source_name: String,
        #[source]
        error: serde_yaml::Error,
    },

    #[error("template {source_name} has {} error(s):\n{}", .errors.len(), join_lines(.errors))]
    Invalid {
        source_name: String,
        errors: Vec<TemplateError>,
    },

    #[error("a template has already been loaded for data object type '{data_object_type}'")]
    AlreadyRegistered { data_object_type: String },
}

impl LoadError {
    /// Template errors carried by this error, if any.
    pub fn template_errors(&self) -> &[TemplateError] {
        match self {
            LoadError::Invalid { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn join_lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Error while building a data object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreationError {
    #[error("there is no template for data object type '{data_object_type}'")]
    UnknownDataObjectType { data_object_type: String },

    #[error(
        "{}",
        describe_incomplete(
            .missing_dimensions,
            .invalid_dimensions,
            .missing_substitutions,
            .invalid_substitutions
        )
    )]
    Incomplete {
        /// Unspecified dimensions absent from the caller's lengths.
        missing_dimensions: BTreeSet<String>,
        /// Unspecified dimensions given a length of zero, or one too large
        /// to allocate.
        invalid_dimensions: BTreeSet<String>,
        /// Substitution keys absent from the caller's values.
        missing_substitutions: BTreeSet<String>,
        /// Substitution keys whose values cannot be cast or formatted.
        invalid_substitutions: BTreeSet<String>,
    },
}

fn describe_incomplete(
    missing_dimensions: &BTreeSet<String>,
    invalid_dimensions: &BTreeSet<String>,
    missing_substitutions: &BTreeSet<String>,
    invalid_substitutions: &BTreeSet<String>,
) -> String {
    let mut parts = Vec::new();
    if !missing_dimensions.is_empty() {
        parts.push(format!(
            "lengths of dimensions not specified: {}",
            join_names(missing_dimensions)
        ));
    }
    if !invalid_dimensions.is_empty() {
        parts.push(format!(
            "lengths of dimensions are zero or too large: {}",
            join_names(invalid_dimensions)
        ));
    }
    if !missing_substitutions.is_empty() {
        parts.push(format!(
            "substitutions not specified: {}",
            join_names(missing_substitutions)
        ));
    }
    if !invalid_substitutions.is_empty() {
        parts.push(format!(
            "substitutions with unusable values: {}",
            join_names(invalid_substitutions)
        ));
    }
    format!("cannot create data object; {}", parts.join("; "))
}

impl CreationError {
    /// Creates an `Incomplete` error from the four problem sets, or None if all are empty.
    pub(crate) fn incomplete(
        missing_dimensions: BTreeSet<String>,
        invalid_dimensions: BTreeSet<String>,
        missing_substitutions: BTreeSet<String>,
        invalid_substitutions: BTreeSet<String>,
    ) -> Option<CreationError> {
        if missing_dimensions.is_empty()
            && invalid_dimensions.is_empty()
            && missing_substitutions.is_empty()
            && invalid_substitutions.is_empty()
        {
            return None;
        }
        Some(CreationError::Incomplete {
            missing_dimensions,
            invalid_dimensions,
            missing_substitutions,
            invalid_substitutions,
        })
    }
}

/// Error while reading or writing a data object.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = TemplateError {
            stage: Stage::Structure,
            subject: Subject::VariableAttribute {
                variable: "level".to_string(),
                attribute: "units".to_string(),
            },
            message: "no value has been defined".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "[structure] variable 'level' attribute 'units': no value has been defined"
        );
    }

    #[test]
    fn test_collector() {
        let mut c = Collector::new(Stage::Discovery);
        assert!(c.is_empty());
        c.report(Subject::Dimension("time".to_string()), "no variable");
        c.report(Subject::Document, "second");
        assert_eq!(c.len(), 2);
        let errors = c.into_errors();
        assert_eq!(errors[0].stage, Stage::Discovery);
        assert_eq!(errors[1].subject, Subject::Document);
    }

    #[test]
    fn test_incomplete_display() {
        let set = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<BTreeSet<_>>();
        let err = CreationError::incomplete(
            set(&["time", "level"]),
            set(&[]),
            set(&["site"]),
            set(&[]),
        );
        let Some(err) = err else {
            panic!("expected an error");
        };
        assert_eq!(
            err.to_string(),
            "cannot create data object; lengths of dimensions not specified: level, time; \
             substitutions not specified: site"
        );
        assert!(CreationError::incomplete(set(&[]), set(&[]), set(&[]), set(&[])).is_none());
    }
}
