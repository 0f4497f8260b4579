//! Resource - Typed descriptors for template resources
//!
//! A descriptor carries a CloudFormation type name, a property map,
//! dependency references by logical name, and an optional guarding
//! condition. Descriptors are inert records; the typed builders in the
//! provider crate lower into this form.

use serde_json::json;

use crate::value::{Reference, Value};

/// A resource descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    resource_type: String,
    properties: Value,
    depends_on: Vec<String>,
    condition: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            condition: None,
        }
    }

    /// Add an explicit dependency on another resource by logical name
    pub fn depends_on(mut self, logical_name: impl Into<String>) -> Self {
        self.depends_on.push(logical_name.into());
        self
    }

    /// Guard the whole resource behind a named condition
    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> &Value {
        &self.properties
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Collect every cross-reference made by the property values.
    /// The guarding condition and explicit dependencies are validated
    /// separately by the template.
    pub fn references(&self) -> Vec<Reference> {
        self.properties.references()
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        out.insert("Type".to_string(), json!(self.resource_type));
        if let Some(condition) = &self.condition {
            out.insert("Condition".to_string(), json!(condition));
        }
        // A single dependency serializes as a bare string, several as a list
        match self.depends_on.as_slice() {
            [] => {}
            [single] => {
                out.insert("DependsOn".to_string(), json!(single));
            }
            many => {
                out.insert("DependsOn".to_string(), json!(many));
            }
        }
        out.insert("Properties".to_string(), self.properties.to_json());
        serde_json::Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_descriptor_serialization() {
        let d = ResourceDescriptor::new(
            "AWS::Logs::LogGroup",
            Value::object([("LogGroupName", Value::reference("AWS::StackName"))]),
        );
        assert_eq!(
            d.to_json(),
            json!({
                "Type": "AWS::Logs::LogGroup",
                "Properties": { "LogGroupName": { "Ref": "AWS::StackName" } }
            })
        );
    }

    #[test]
    fn single_dependency_serializes_as_string() {
        let d = ResourceDescriptor::new("AWS::ECS::TaskDefinition", Value::object::<&str, _>([]))
            .depends_on("LogGroup");
        assert_eq!(d.to_json()["DependsOn"], json!("LogGroup"));
    }

    #[test]
    fn several_dependencies_serialize_as_list() {
        let d = ResourceDescriptor::new("AWS::ECS::Service", Value::object::<&str, _>([]))
            .depends_on("ServiceRole")
            .depends_on("TargetGroup1");
        assert_eq!(d.to_json()["DependsOn"], json!(["ServiceRole", "TargetGroup1"]));
    }

    #[test]
    fn guard_condition_serialization() {
        let d = ResourceDescriptor::new("AWS::EC2::SecurityGroupIngress", Value::object::<&str, _>([]))
            .when("CertificateArnCondition");
        assert_eq!(d.to_json()["Condition"], json!("CertificateArnCondition"));
    }

    #[test]
    fn references_come_from_property_values() {
        let d = ResourceDescriptor::new(
            "AWS::ECS::Service",
            Value::object([
                ("Role", Value::reference("ServiceRole")),
                ("TaskRoleArn", Value::get_att("TaskRole", "Arn")),
            ]),
        );

        let refs = d.references();
        assert!(refs.contains(&Reference::Logical("ServiceRole".to_string())));
        assert!(refs.contains(&Reference::Attribute("TaskRole".to_string())));
    }
}
