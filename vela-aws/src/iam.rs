//! IAM resource types and policy document builders

use vela_core::resource::ResourceDescriptor;
use vela_core::value::Value;

/// Policy language version every document is pinned to
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementEffect {
    Allow,
    Deny,
}

impl StatementEffect {
    fn as_str(&self) -> &'static str {
        match self {
            StatementEffect::Allow => "Allow",
            StatementEffect::Deny => "Deny",
        }
    }
}

/// A policy statement
#[derive(Debug, Clone)]
pub struct Statement {
    effect: StatementEffect,
    principal: Option<(String, Value)>,
    actions: Vec<String>,
    resources: Vec<Value>,
}

impl Statement {
    pub fn allow() -> Self {
        Self {
            effect: StatementEffect::Allow,
            principal: None,
            actions: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn deny() -> Self {
        Self {
            effect: StatementEffect::Deny,
            ..Self::allow()
        }
    }

    /// Restrict the statement to a service principal
    /// (e.g. "ecs-tasks.amazonaws.com")
    pub fn service_principal(mut self, service: impl Into<Value>) -> Self {
        self.principal = Some(("Service".to_string(), service.into()));
        self
    }

    /// Add a service-qualified action, e.g. `action("sts", "AssumeRole")`
    /// becomes "sts:AssumeRole"
    pub fn action(mut self, service: &str, verb: &str) -> Self {
        self.actions.push(format!("{service}:{verb}"));
        self
    }

    /// Scope the statement to a resource ARN (or "*")
    pub fn on_resource(mut self, resource: impl Into<Value>) -> Self {
        self.resources.push(resource.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut entries = vec![("Effect", Value::from(self.effect.as_str()))];
        if let Some((kind, principal)) = &self.principal {
            entries.push((
                "Principal",
                Value::object([(kind.clone(), principal.clone())]),
            ));
        }
        entries.push((
            "Action",
            Value::List(self.actions.iter().map(|a| a.as_str().into()).collect()),
        ));
        if !self.resources.is_empty() {
            entries.push(("Resource", Value::List(self.resources.clone())));
        }
        Value::object(entries)
    }
}

/// A policy document: a version header and a list of statements
#[derive(Debug, Clone, Default)]
pub struct PolicyDocument {
    statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn to_value(&self) -> Value {
        Value::object([
            ("Version", POLICY_VERSION.into()),
            (
                "Statement",
                Value::List(self.statements.iter().map(Statement::to_value).collect()),
            ),
        ])
    }
}

/// An inline policy attached to a role
#[derive(Debug, Clone)]
pub struct Policy {
    policy_name: Value,
    document: PolicyDocument,
}

impl Policy {
    pub fn new(policy_name: impl Into<Value>, document: PolicyDocument) -> Self {
        Self {
            policy_name: policy_name.into(),
            document,
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("PolicyName", self.policy_name.clone()),
            ("PolicyDocument", self.document.to_value()),
        ])
    }
}

/// An IAM role
///
/// Based on CloudFormation AWS::IAM::Role.
/// See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-iam-role.html
#[derive(Debug, Clone)]
pub struct Role {
    assume_role_policy_document: PolicyDocument,
    path: Option<String>,
    policies: Vec<Policy>,
}

impl Role {
    pub fn new(assume_role_policy_document: PolicyDocument) -> Self {
        Self {
            assume_role_policy_document,
            path: None,
            policies: Vec::new(),
        }
    }

    /// Convenience for the common trust policy: allow `service` to assume
    /// this role
    pub fn assumed_by_service(service: impl Into<Value>) -> Self {
        Self::new(
            PolicyDocument::new().statement(
                Statement::allow()
                    .service_principal(service)
                    .action("sts", "AssumeRole"),
            ),
        )
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }
}

impl From<Role> for ResourceDescriptor {
    fn from(role: Role) -> Self {
        let mut properties = vec![(
            "AssumeRolePolicyDocument",
            role.assume_role_policy_document.to_value(),
        )];
        if let Some(path) = role.path {
            properties.push(("Path", path.into()));
        }
        if !role.policies.is_empty() {
            properties.push((
                "Policies",
                Value::List(role.policies.iter().map(Policy::to_value).collect()),
            ));
        }
        ResourceDescriptor::new("AWS::IAM::Role", Value::object(properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statement_serialization() {
        let statement = Statement::allow()
            .action("logs", "CreateLogStream")
            .action("logs", "PutLogEvents")
            .on_resource("*");

        assert_eq!(
            statement.to_value().to_json(),
            json!({
                "Effect": "Allow",
                "Action": ["logs:CreateLogStream", "logs:PutLogEvents"],
                "Resource": ["*"]
            })
        );
    }

    #[test]
    fn trust_statement_has_principal_and_no_resource() {
        let statement = Statement::allow()
            .service_principal("ecs-tasks.amazonaws.com")
            .action("sts", "AssumeRole");

        assert_eq!(
            statement.to_value().to_json(),
            json!({
                "Effect": "Allow",
                "Principal": { "Service": "ecs-tasks.amazonaws.com" },
                "Action": ["sts:AssumeRole"]
            })
        );
    }

    #[test]
    fn policy_document_pins_version() {
        let document = PolicyDocument::new().statement(Statement::allow().action("ec2", "Describe*"));
        assert_eq!(document.to_value().to_json()["Version"], json!("2012-10-17"));
    }

    #[test]
    fn role_descriptor() {
        let descriptor: ResourceDescriptor = Role::assumed_by_service("ecs.amazonaws.com")
            .with_path("/")
            .with_policy(Policy::new(
                Value::join("-", vec![Value::reference("AWS::StackName"), "ServicePolicy".into()]),
                PolicyDocument::new().statement(
                    Statement::allow()
                        .action("elasticloadbalancing", "RegisterTargets")
                        .on_resource("*"),
                ),
            ))
            .into();

        assert_eq!(descriptor.resource_type(), "AWS::IAM::Role");
        let properties = descriptor.properties().to_json();
        assert_eq!(properties["Path"], json!("/"));
        assert_eq!(
            properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            json!("ecs.amazonaws.com")
        );
        assert_eq!(
            properties["Policies"][0]["PolicyDocument"]["Statement"][0]["Action"][0],
            json!("elasticloadbalancing:RegisterTargets")
        );
    }

    #[test]
    fn deny_statement_effect() {
        let statement = Statement::deny().action("s3", "DeleteBucket").on_resource("*");
        assert_eq!(statement.to_value().to_json()["Effect"], json!("Deny"));
    }
}
