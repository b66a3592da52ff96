//! Registry of loaded templates, keyed by data object type.
//!
//! Loading runs validation and discovery; a template that fails either is
//! reported in full and leaves the registry unchanged. Each data object type
//! can be loaded once.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::discover::discover;
use crate::error::{CreationError, LoadError};
use crate::model::{
    DataObject, DataObjectBuilder, DimensionLengths, Requirements, Substitutions, Template,
};
use crate::validate::validate_document;

/// Holds validated templates in registration order.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: FxHashMap<String, Template>,
    order: Vec<String>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a template file; its base name becomes the source name.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<String, LoadError> {
        let path = path.as_ref();
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let text = fs::read_to_string(path).map_err(|error| LoadError::Io {
            source_name: source_name.clone(),
            error,
        })?;
        self.load_str(&source_name, &text)
    }

    /// Parses and loads template text.
    pub fn load_str(&mut self, source_name: &str, text: &str) -> Result<String, LoadError> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|error| LoadError::Parse {
                source_name: source_name.to_string(),
                error,
            })?;
        self.load_document(source_name, &document)
    }

    /// Validates, discovers and registers an already parsed template document.
    ///
    /// Returns the data object type of the new template.
    pub fn load_document(
        &mut self,
        source_name: &str,
        document: &serde_yaml::Value,
    ) -> Result<String, LoadError> {
        debug!(source = source_name, "loading template");

        let invalid = |errors| LoadError::Invalid {
            source_name: source_name.to_string(),
            errors,
        };
        let validated = validate_document(document, self).map_err(invalid)?;
        let template = discover(validated, source_name).map_err(invalid)?;
        self.register(template)
    }

    /// Adds a template. Fails if its data object type is already present.
    pub fn register(&mut self, template: Template) -> Result<String, LoadError> {
        let key = template.data_object_type().to_string();
        if self.templates.contains_key(&key) {
            return Err(LoadError::AlreadyRegistered {
                data_object_type: key,
            });
        }

        info!(
            data_object_type = %key,
            source = template.source_name(),
            substitutions = template.substitution_requirements().len(),
            unspecified_dimensions = template.unspecified_dimensions().len(),
            "registered template"
        );
        self.order.push(key.clone());
        self.templates.insert(key.clone(), template);
        Ok(key)
    }

    pub fn contains(&self, data_object_type: &str) -> bool {
        self.templates.contains_key(data_object_type)
    }

    pub fn lookup(&self, data_object_type: &str) -> Option<&Template> {
        self.templates.get(data_object_type)
    }

    /// (data object type, source name) pairs in registration order.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.order
            .iter()
            .filter_map(|key| self.templates.get(key))
            .map(|t| (t.data_object_type(), t.source_name()))
            .collect()
    }

    /// What a caller must supply to build the given data object type.
    pub fn requirements(&self, data_object_type: &str) -> Option<Requirements<'_>> {
        self.lookup(data_object_type).map(Template::requirements)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Starts a builder for the given data object type.
    pub fn builder(&self, data_object_type: &str) -> Result<DataObjectBuilder<'_>, CreationError> {
        self.lookup(data_object_type)
            .map(DataObjectBuilder::new)
            .ok_or_else(|| CreationError::UnknownDataObjectType {
                data_object_type: data_object_type.to_string(),
            })
    }

    /// Builds a data object from a registered template.
    pub fn build(
        &self,
        data_object_type: &str,
        dimension_lengths: &DimensionLengths,
        substitutions: &Substitutions,
        add_fill_value: bool,
    ) -> Result<DataObject, CreationError> {
        self.builder(data_object_type)?
            .dimensions(dimension_lengths.iter().map(|(k, v)| (k.clone(), *v)))
            .substitutions(substitutions.iter().map(|(k, v)| (k.clone(), v.clone())))
            .add_fill_value(add_fill_value)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Stage, Subject};
    use crate::model::{AttributeValue, Number, NumericType, Substitution, ValueArray};

    const PROFILE: &str = r#"
data_object_type: profile
global_attributes:
  - title: {data_type: str, value: "{site} profile"}
variables:
  - level:
      - data_type: int32
      - dimensions: [level]
      - units: {data_type: str, value: "1"}
      - long_name: {data_type: str, value: level}
"#;

    const SOUNDING: &str = r#"
data_object_type: sounding
global_attributes: []
variables:
  - altitude:
      - data_type: float32
      - dimensions: [altitude]
      - values: [0.0, 0.5]
      - units: {data_type: str, value: km}
      - standard_name: {data_type: str, value: altitude}
"#;

    #[test]
    fn test_profile_scenario() {
        let mut registry = TemplateRegistry::new();
        let key = registry.load_str("profile.yaml", PROFILE).unwrap();
        assert_eq!(key, "profile");

        let mut dims = DimensionLengths::new();
        dims.insert("level".to_string(), 5);
        let mut subs = Substitutions::new();
        subs.insert("site".to_string(), Substitution::from("Alpha"));

        let object = registry.build("profile", &dims, &subs, false).unwrap();
        assert_eq!(object.dimension("level"), Some(5));
        assert_eq!(
            object
                .global_attribute("title")
                .and_then(|a| a.value.as_text()),
            Some("Alpha profile")
        );
        let level = object.variable("level").unwrap();
        assert_eq!(level.values, ValueArray::zeros(NumericType::Int32, &[5]));
        assert_eq!(level.values.numbers(), vec![Number::Int32(0); 5]);
        assert_eq!(
            level.attribute("units").map(|a| &a.value),
            Some(&AttributeValue::Text("1".to_string()))
        );
    }

    #[test]
    fn test_duplicate_data_object_type() {
        let mut registry = TemplateRegistry::new();
        registry.load_str("profile.yaml", PROFILE).unwrap();

        let err = registry.load_str("profile-copy.yaml", PROFILE).unwrap_err();
        let errors = err.template_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].stage, Stage::Structure);
        assert_eq!(errors[0].subject, Subject::Document);
        assert!(errors[0].message.contains("'profile'"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list(), vec![("profile", "profile.yaml")]);
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let mut registry = TemplateRegistry::new();
        registry.load_str("profile.yaml", PROFILE).unwrap();
        let template = registry.lookup("profile").unwrap().clone();

        let err = registry.register(template).unwrap_err();
        assert!(matches!(
            err,
            LoadError::AlreadyRegistered { ref data_object_type } if data_object_type == "profile"
        ));
    }

    #[test]
    fn test_list_in_registration_order() {
        let mut registry = TemplateRegistry::new();
        assert!(registry.is_empty());
        registry.load_str("sounding.yaml", SOUNDING).unwrap();
        registry.load_str("profile.yaml", PROFILE).unwrap();

        assert_eq!(
            registry.list(),
            vec![("sounding", "sounding.yaml"), ("profile", "profile.yaml")]
        );
        assert!(registry.contains("sounding"));
        assert!(registry.lookup("missing").is_none());
        assert_eq!(
            registry.requirements("profile").map(|r| r.to_string()),
            Some("substitutions: site (str); dimensions: level".to_string())
        );
        assert_eq!(
            registry.requirements("sounding").map(|r| r.to_string()),
            Some("substitutions: none; dimensions: none".to_string())
        );
    }

    #[test]
    fn test_invalid_template_leaves_no_residue() {
        let mut registry = TemplateRegistry::new();
        let err = registry
            .load_str(
                "bad.yaml",
                "data_object_type: bad\nglobal_attributes: []\nvariables: 3\n",
            )
            .unwrap_err();
        assert!(matches!(err, LoadError::Invalid { .. }));
        assert!(registry.is_empty());

        let err = registry.load_str("bad.yaml", "a: [1, 2").unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_load_file_uses_base_name() {
        let dir = std::env::temp_dir().join(format!("nctemplate-registry-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sounding.yaml");
        std::fs::write(&path, SOUNDING).unwrap();

        let mut registry = TemplateRegistry::new();
        assert_eq!(registry.load_file(&path).unwrap(), "sounding");
        assert_eq!(registry.list(), vec![("sounding", "sounding.yaml")]);

        let err = registry.load_file(dir.join("absent.yaml")).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Io { ref source_name, .. } if source_name == "absent.yaml"
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_build_unknown_type() {
        let registry = TemplateRegistry::new();
        let err = registry
            .build("nothing", &DimensionLengths::new(), &Substitutions::new(), false)
            .unwrap_err();
        assert_eq!(
            err,
            CreationError::UnknownDataObjectType {
                data_object_type: "nothing".to_string()
            }
        );
    }
}
