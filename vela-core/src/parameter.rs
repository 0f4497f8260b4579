//! Parameter - Externally supplied template inputs
//!
//! A parameter declares a typed input the deployment engine substitutes at
//! deployment time. Immutable once declared; referenced by name.

use serde_json::json;

use crate::value::Value;

/// Parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Number,
}

impl ParameterType {
    fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "String",
            ParameterType::Number => "Number",
        }
    }
}

/// Parameter specification
#[derive(Debug, Clone)]
pub struct Parameter {
    param_type: ParameterType,
    description: Option<String>,
    default: Option<Value>,
    allowed_values: Option<Vec<String>>,
    allowed_pattern: Option<String>,
}

impl Parameter {
    pub fn new(param_type: ParameterType) -> Self {
        Self {
            param_type,
            description: None,
            default: None,
            allowed_values: None,
            allowed_pattern: None,
        }
    }

    /// A parameter of type String
    pub fn string() -> Self {
        Self::new(ParameterType::String)
    }

    /// A parameter of type Number
    pub fn number() -> Self {
        Self::new(ParameterType::Number)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restrict the parameter to an enumerated set of values
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict the parameter to values matching a regular expression.
    /// The pattern is compiled when the parameter is declared; a malformed
    /// pattern rejects the declaration.
    pub fn with_allowed_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed_pattern = Some(pattern.into());
        self
    }

    pub fn param_type(&self) -> ParameterType {
        self.param_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn allowed_pattern(&self) -> Option<&str> {
        self.allowed_pattern.as_deref()
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        out.insert("Type".to_string(), json!(self.param_type.as_str()));
        if let Some(default) = &self.default {
            out.insert("Default".to_string(), default.to_json());
        }
        if let Some(values) = &self.allowed_values {
            out.insert("AllowedValues".to_string(), json!(values));
        }
        if let Some(pattern) = &self.allowed_pattern {
            out.insert("AllowedPattern".to_string(), json!(pattern));
        }
        if let Some(description) = &self.description {
            out.insert("Description".to_string(), json!(description));
        }
        serde_json::Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_parameter_serialization() {
        let p = Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_default("NONE")
            .with_description("Container name");

        assert_eq!(
            p.to_json(),
            json!({
                "Type": "String",
                "Default": "NONE",
                "AllowedPattern": "^.+$",
                "Description": "Container name"
            })
        );
    }

    #[test]
    fn number_parameter_keeps_typed_default() {
        let p = Parameter::number().with_default(80);
        assert_eq!(p.to_json(), json!({ "Type": "Number", "Default": 80 }));
    }

    #[test]
    fn allowed_values_serialization() {
        let p = Parameter::string().with_allowed_values(["PROD", "UAT", "OTHER"]);
        assert_eq!(
            p.to_json(),
            json!({ "Type": "String", "AllowedValues": ["PROD", "UAT", "OTHER"] })
        );
    }

    #[test]
    fn minimal_parameter_omits_empty_fields() {
        let p = Parameter::string();
        assert_eq!(p.to_json(), json!({ "Type": "String" }));
    }
}
