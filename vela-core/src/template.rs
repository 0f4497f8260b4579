//! Template - The document root and assembler
//!
//! A Template accumulates parameters, conditions, metadata and resource
//! descriptors during a single construction pass, then serializes once.
//! Logical names are the only identity; every cross-reference must name an
//! already-declared entity (declaration before use). A failed `add_*` call
//! leaves the document unchanged.

use std::collections::BTreeMap;

use regex::Regex;

use crate::condition::ConditionExpr;
use crate::error::TemplateError;
use crate::parameter::Parameter;
use crate::resource::ResourceDescriptor;
use crate::value::{self, Reference, Value};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Handle to a declared parameter, usable in `Ref`-style lookups
#[derive(Debug, Clone)]
pub struct ParameterHandle {
    name: String,
}

impl ParameterHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A `Ref` to this parameter
    pub fn reference(&self) -> Value {
        Value::Ref(self.name.clone())
    }
}

/// Handle to a declared condition
#[derive(Debug, Clone)]
pub struct ConditionHandle {
    name: String,
}

impl ConditionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handle to a declared resource, usable for `Ref` and `Fn::GetAtt` lookups
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    name: String,
}

impl ResourceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A `Ref` to this resource
    pub fn reference(&self) -> Value {
        Value::Ref(self.name.clone())
    }

    /// A `Fn::GetAtt` lookup on this resource
    pub fn attribute(&self, attribute: impl Into<String>) -> Value {
        Value::GetAtt(self.name.clone(), attribute.into())
    }
}

/// The document root
#[derive(Debug, Clone, Default)]
pub struct Template {
    description: Option<String>,
    parameters: Vec<(String, Parameter)>,
    conditions: Vec<(String, ConditionExpr)>,
    metadata: BTreeMap<String, Value>,
    resources: Vec<(String, ResourceDescriptor)>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Declare a parameter. Rejects duplicate names and malformed specs.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        parameter: Parameter,
    ) -> Result<ParameterHandle, TemplateError> {
        let name = name.into();
        validate_logical_name(&name)?;
        if self.has_parameter(&name) {
            return Err(TemplateError::DuplicateParameter(name));
        }
        if self.has_resource(&name) {
            return Err(TemplateError::DuplicateLogicalName(name));
        }
        if let Some(pattern) = parameter.allowed_pattern()
            && let Err(e) = Regex::new(pattern)
        {
            return Err(TemplateError::InvalidAllowedPattern {
                name,
                reason: e.to_string(),
            });
        }

        self.parameters.push((name.clone(), parameter));
        Ok(ParameterHandle { name })
    }

    /// Declare a named condition. Rejects duplicates; every reference the
    /// expression makes must already be declared.
    pub fn add_condition(
        &mut self,
        name: impl Into<String>,
        expr: ConditionExpr,
    ) -> Result<ConditionHandle, TemplateError> {
        let name = name.into();
        validate_logical_name(&name)?;
        if self.has_condition(&name) {
            return Err(TemplateError::DuplicateCondition(name));
        }
        self.check_references(&name, &expr.references())?;

        self.conditions.push((name.clone(), expr));
        Ok(ConditionHandle { name })
    }

    /// Merge a top-level metadata key (UI grouping hints and the like)
    pub fn add_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Declare a resource. Rejects duplicate logical names; every
    /// reference, dependency, and guard must already be declared.
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        descriptor: impl Into<ResourceDescriptor>,
    ) -> Result<ResourceHandle, TemplateError> {
        let name = name.into();
        let descriptor = descriptor.into();
        validate_logical_name(&name)?;
        if self.has_resource(&name) || self.has_parameter(&name) {
            return Err(TemplateError::DuplicateLogicalName(name));
        }
        if let Some(condition) = descriptor.condition()
            && !self.has_condition(condition)
        {
            return Err(TemplateError::UnknownCondition {
                referrer: name,
                condition: condition.to_string(),
            });
        }
        for dependency in descriptor.dependencies() {
            if !self.has_resource(dependency) {
                return Err(TemplateError::UnresolvedReference {
                    referrer: name,
                    target: dependency.clone(),
                });
            }
        }
        self.check_references(&name, &descriptor.references())?;

        self.resources.push((name.clone(), descriptor));
        Ok(ResourceHandle { name })
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.parameters.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &ConditionExpr)> {
        self.conditions.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &ResourceDescriptor)> {
        self.resources.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Serialize the document. Deterministic for a given construction
    /// sequence; empty sections are omitted.
    pub fn to_json(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        root.insert(
            "AWSTemplateFormatVersion".to_string(),
            serde_json::Value::String(TEMPLATE_FORMAT_VERSION.to_string()),
        );
        if let Some(description) = &self.description {
            root.insert(
                "Description".to_string(),
                serde_json::Value::String(description.clone()),
            );
        }
        if !self.metadata.is_empty() {
            let metadata: serde_json::Map<String, serde_json::Value> = self
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            root.insert("Metadata".to_string(), serde_json::Value::Object(metadata));
        }
        if !self.parameters.is_empty() {
            let parameters: serde_json::Map<String, serde_json::Value> = self
                .parameters
                .iter()
                .map(|(n, p)| (n.clone(), p.to_json()))
                .collect();
            root.insert(
                "Parameters".to_string(),
                serde_json::Value::Object(parameters),
            );
        }
        if !self.conditions.is_empty() {
            let conditions: serde_json::Map<String, serde_json::Value> = self
                .conditions
                .iter()
                .map(|(n, c)| (n.clone(), c.to_json()))
                .collect();
            root.insert(
                "Conditions".to_string(),
                serde_json::Value::Object(conditions),
            );
        }
        if !self.resources.is_empty() {
            let resources: serde_json::Map<String, serde_json::Value> = self
                .resources
                .iter()
                .map(|(n, r)| (n.clone(), r.to_json()))
                .collect();
            root.insert(
                "Resources".to_string(),
                serde_json::Value::Object(resources),
            );
        }
        serde_json::Value::Object(root)
    }

    fn has_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|(n, _)| n == name)
    }

    fn has_condition(&self, name: &str) -> bool {
        self.conditions.iter().any(|(n, _)| n == name)
    }

    fn has_resource(&self, name: &str) -> bool {
        self.resources.iter().any(|(n, _)| n == name)
    }

    /// True if `name` may be the target of a `Ref` or `Fn::Sub` variable
    fn is_referable(&self, name: &str) -> bool {
        self.has_parameter(name) || self.has_resource(name) || value::is_pseudo_parameter(name)
    }

    fn check_references(
        &self,
        referrer: &str,
        references: &[Reference],
    ) -> Result<(), TemplateError> {
        for reference in references {
            match reference {
                Reference::Logical(target) | Reference::SubVariable(target) => {
                    if !self.is_referable(target) {
                        return Err(TemplateError::UnresolvedReference {
                            referrer: referrer.to_string(),
                            target: target.clone(),
                        });
                    }
                }
                Reference::Attribute(target) => {
                    if !self.has_resource(target) {
                        return Err(TemplateError::UnresolvedReference {
                            referrer: referrer.to_string(),
                            target: target.clone(),
                        });
                    }
                }
                Reference::Condition(condition) => {
                    if !self.has_condition(condition) {
                        return Err(TemplateError::UnknownCondition {
                            referrer: referrer.to_string(),
                            condition: condition.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_logical_name(name: &str) -> Result<(), TemplateError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TemplateError::InvalidLogicalName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log_group() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "AWS::Logs::LogGroup",
            Value::object([("LogGroupName", Value::reference("AWS::StackName"))]),
        )
    }

    #[test]
    fn duplicate_parameter_rejected_and_state_unchanged() {
        let mut t = Template::new();
        t.add_parameter("ContainerPort", Parameter::number().with_default(80))
            .unwrap();

        let err = t
            .add_parameter("ContainerPort", Parameter::number().with_default(8080))
            .unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateParameter(name) if name == "ContainerPort"));

        // The original declaration is untouched
        let (_, parameter) = t.parameters().next().unwrap();
        assert_eq!(parameter.default_value(), Some(&Value::Int(80)));
        assert_eq!(t.parameters().count(), 1);
    }

    #[test]
    fn duplicate_resource_rejected_and_state_unchanged() {
        let mut t = Template::new();
        t.add_resource("LogGroup", log_group()).unwrap();

        let err = t.add_resource("LogGroup", log_group()).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateLogicalName(name) if name == "LogGroup"));
        assert_eq!(t.resources().count(), 1);
    }

    #[test]
    fn parameter_and_resource_share_the_ref_namespace() {
        let mut t = Template::new();
        t.add_parameter("LogGroup", Parameter::string()).unwrap();

        let err = t.add_resource("LogGroup", log_group()).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateLogicalName(_)));
    }

    #[test]
    fn invalid_logical_name_rejected() {
        let mut t = Template::new();
        let err = t.add_parameter("Container-Name", Parameter::string()).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidLogicalName(_)));

        let err = t.add_resource("", log_group()).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidLogicalName(_)));
    }

    #[test]
    fn malformed_allowed_pattern_rejected() {
        let mut t = Template::new();
        let err = t
            .add_parameter("Ecr", Parameter::string().with_allowed_pattern("^(unclosed"))
            .unwrap_err();
        assert!(matches!(err, TemplateError::InvalidAllowedPattern { name, .. } if name == "Ecr"));
        assert_eq!(t.parameters().count(), 0);
    }

    #[test]
    fn unresolved_ref_rejected() {
        let mut t = Template::new();
        let descriptor = ResourceDescriptor::new(
            "AWS::ECS::Service",
            Value::object([("TaskDefinition", Value::reference("TaskDefinition"))]),
        );

        let err = t.add_resource("Service", descriptor).unwrap_err();
        assert!(
            matches!(err, TemplateError::UnresolvedReference { referrer, target }
                if referrer == "Service" && target == "TaskDefinition")
        );
        assert_eq!(t.resources().count(), 0);
    }

    #[test]
    fn unresolved_sub_variable_rejected() {
        let mut t = Template::new();
        let descriptor = ResourceDescriptor::new(
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            Value::object([(
                "VpcId",
                Value::import_value(Value::sub("${NetworkStack}-Vpc")),
            )]),
        );

        let err = t.add_resource("TargetGroup1", descriptor).unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { target, .. }
            if target == "NetworkStack"));
    }

    #[test]
    fn pseudo_parameters_need_no_declaration() {
        let mut t = Template::new();
        assert!(t.add_resource("LogGroup", log_group()).is_ok());
    }

    #[test]
    fn unknown_guard_condition_rejected() {
        let mut t = Template::new();
        let err = t
            .add_resource("LogGroup", log_group().when("CertificateArnCondition"))
            .unwrap_err();
        assert!(matches!(err, TemplateError::UnknownCondition { condition, .. }
            if condition == "CertificateArnCondition"));
    }

    #[test]
    fn unknown_dependency_rejected() {
        let mut t = Template::new();
        let err = t
            .add_resource("LogGroup", log_group().depends_on("ServiceRole"))
            .unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { target, .. }
            if target == "ServiceRole"));
    }

    #[test]
    fn condition_references_are_validated() {
        let mut t = Template::new();
        let err = t
            .add_condition(
                "ServicePathCondition",
                ConditionExpr::not(ConditionExpr::equals(Value::reference("ServicePath"), "NONE")),
            )
            .unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { target, .. }
            if target == "ServicePath"));

        t.add_parameter("ServicePath", Parameter::string().with_default("NONE"))
            .unwrap();
        assert!(
            t.add_condition(
                "ServicePathCondition",
                ConditionExpr::not(ConditionExpr::equals(Value::reference("ServicePath"), "NONE")),
            )
            .is_ok()
        );
    }

    #[test]
    fn duplicate_condition_rejected() {
        let mut t = Template::new();
        let expr = ConditionExpr::equals("PROD", "PROD");
        t.add_condition("IsProd", expr.clone()).unwrap();

        let err = t.add_condition("IsProd", expr).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateCondition(name) if name == "IsProd"));
        assert_eq!(t.conditions().count(), 1);
    }

    #[test]
    fn guarded_resource_serialization() {
        let mut t = Template::new();
        t.add_parameter("CertificateArn", Parameter::string().with_default("NONE"))
            .unwrap();
        t.add_condition(
            "CertificateArnCondition",
            ConditionExpr::not(ConditionExpr::equals(
                Value::reference("CertificateArn"),
                "NONE",
            )),
        )
        .unwrap();
        t.add_resource("LogGroup", log_group().when("CertificateArnCondition"))
            .unwrap();

        let json = t.to_json();
        assert_eq!(
            json["Resources"]["LogGroup"]["Condition"],
            json!("CertificateArnCondition")
        );
    }

    #[test]
    fn serialization_is_deterministic() {
        let build = || {
            let mut t = Template::new();
            t.add_description("ecs-apache service");
            t.add_parameter("ContainerName", Parameter::string().with_default("NONE"))
                .unwrap();
            t.add_parameter("ContainerPort", Parameter::number().with_default(80))
                .unwrap();
            t.add_metadata(
                "AWS::CloudFormation::Interface",
                Value::object([("ParameterGroups", Value::List(vec![]))]),
            );
            t.add_resource("LogGroup", log_group()).unwrap();
            t
        };

        let first = serde_json::to_string(&build().to_json()).unwrap();
        let second = serde_json::to_string(&build().to_json()).unwrap();
        assert_eq!(first, second);

        // and re-serializing the same document is also byte-identical
        let t = build();
        assert_eq!(
            serde_json::to_string(&t.to_json()).unwrap(),
            serde_json::to_string(&t.to_json()).unwrap()
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let t = Template::new();
        let json = t.to_json();
        assert_eq!(json["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert!(json.get("Parameters").is_none());
        assert!(json.get("Conditions").is_none());
        assert!(json.get("Metadata").is_none());
        assert!(json.get("Resources").is_none());
        assert!(json.get("Description").is_none());
    }

    #[test]
    fn handles_produce_lookups() {
        let mut t = Template::new();
        let port = t
            .add_parameter("ContainerPort", Parameter::number().with_default(80))
            .unwrap();
        let group = t.add_resource("LogGroup", log_group()).unwrap();

        assert_eq!(port.reference(), Value::Ref("ContainerPort".to_string()));
        assert_eq!(group.reference(), Value::Ref("LogGroup".to_string()));
        assert_eq!(
            group.attribute("Arn"),
            Value::GetAtt("LogGroup".to_string(), "Arn".to_string())
        );
    }
}
