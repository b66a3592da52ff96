//! Fully resolved data objects.
//!
//! The layout follows the interchange shape used by the file collaborators:
//! an ordered list of names next to a name-keyed map for global attributes,
//! dimensions, variables and each variable's attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{DataType, Number, NumericType, ValueArray};

/// A resolved attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(Number),
    Array(ValueArray),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ValueArray> {
        match self {
            AttributeValue::Array(a) => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub data_type: DataType,
    pub value: AttributeValue,
}

/// A variable with its dense values array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub data_type: NumericType,
    pub dimensions: Vec<String>,
    pub values: ValueArray,
    pub names_of_attributes: Vec<String>,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Variable {
    /// Creates a variable with no attributes.
    pub fn new(data_type: NumericType, dimensions: Vec<String>, values: ValueArray) -> Self {
        Self {
            data_type,
            dimensions,
            values,
            names_of_attributes: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Appends an attribute, replacing the value of an existing one in place.
    pub fn insert_attribute(&mut self, name: impl Into<String>, attribute: Attribute) {
        let name = name.into();
        if !self.attributes.contains_key(&name) {
            self.names_of_attributes.push(name.clone());
        }
        self.attributes.insert(name, attribute);
    }

    /// Attributes in declaration order.
    pub fn attributes_in_order(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.names_of_attributes
            .iter()
            .filter_map(|name| self.attributes.get(name).map(|a| (name.as_str(), a)))
    }
}

/// A fully populated data object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataObject {
    pub names_of_global_attributes: Vec<String>,
    pub global_attributes: BTreeMap<String, Attribute>,
    pub names_of_dimensions: Vec<String>,
    pub dimensions: BTreeMap<String, usize>,
    pub names_of_variables: Vec<String>,
    pub variables: BTreeMap<String, Variable>,
}

impl DataObject {
    /// Creates an empty data object.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global_attribute(&self, name: &str) -> Option<&Attribute> {
        self.global_attributes.get(name)
    }

    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).copied()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn insert_global_attribute(&mut self, name: impl Into<String>, attribute: Attribute) {
        let name = name.into();
        if !self.global_attributes.contains_key(&name) {
            self.names_of_global_attributes.push(name.clone());
        }
        self.global_attributes.insert(name, attribute);
    }

    pub fn insert_dimension(&mut self, name: impl Into<String>, length: usize) {
        let name = name.into();
        if !self.dimensions.contains_key(&name) {
            self.names_of_dimensions.push(name.clone());
        }
        self.dimensions.insert(name, length);
    }

    pub fn insert_variable(&mut self, name: impl Into<String>, variable: Variable) {
        let name = name.into();
        if !self.variables.contains_key(&name) {
            self.names_of_variables.push(name.clone());
        }
        self.variables.insert(name, variable);
    }

    /// Global attributes in declaration order.
    pub fn global_attributes_in_order(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.names_of_global_attributes
            .iter()
            .filter_map(|name| self.global_attributes.get(name).map(|a| (name.as_str(), a)))
    }

    /// Dimensions in declaration order.
    pub fn dimensions_in_order(&self) -> impl Iterator<Item = (&str, usize)> {
        self.names_of_dimensions
            .iter()
            .filter_map(|name| self.dimensions.get(name).map(|len| (name.as_str(), *len)))
    }

    /// Variables in declaration order.
    pub fn variables_in_order(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.names_of_variables
            .iter()
            .filter_map(|name| self.variables.get(name).map(|v| (name.as_str(), v)))
    }
}
