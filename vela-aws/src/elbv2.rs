//! Elastic Load Balancing v2 resource types

use vela_core::resource::ResourceDescriptor;
use vela_core::value::Value;

/// Listener/target group protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        }
    }
}

/// HTTP codes a health check counts as healthy, e.g. "200,302"
#[derive(Debug, Clone)]
pub struct Matcher {
    http_code: String,
}

impl Matcher {
    pub fn http_code(codes: impl Into<String>) -> Self {
        Self {
            http_code: codes.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::object([("HttpCode", self.http_code.as_str().into())])
    }
}

/// A key/value target group attribute
#[derive(Debug, Clone)]
pub struct TargetGroupAttribute {
    key: String,
    value: String,
}

impl TargetGroupAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("Key", self.key.as_str().into()),
            ("Value", self.value.as_str().into()),
        ])
    }
}

/// A resource tag
#[derive(Debug, Clone)]
pub struct Tag {
    key: String,
    value: Value,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::object([("Key", self.key.as_str().into()), ("Value", self.value.clone())])
    }
}

/// A target group registered with a load balancer listener
///
/// Based on CloudFormation AWS::ElasticLoadBalancingV2::TargetGroup.
/// See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-elasticloadbalancingv2-targetgroup.html
#[derive(Debug, Clone)]
pub struct TargetGroup {
    port: Value,
    protocol: Protocol,
    vpc_id: Value,
    health_check_path: Option<Value>,
    health_check_protocol: Option<Protocol>,
    health_check_interval_seconds: Option<u32>,
    health_check_timeout_seconds: Option<u32>,
    healthy_threshold_count: Option<u32>,
    unhealthy_threshold_count: Option<u32>,
    matcher: Option<Matcher>,
    attributes: Vec<TargetGroupAttribute>,
    tags: Vec<Tag>,
}

impl TargetGroup {
    pub fn new(port: impl Into<Value>, protocol: Protocol, vpc_id: impl Into<Value>) -> Self {
        Self {
            port: port.into(),
            protocol,
            vpc_id: vpc_id.into(),
            health_check_path: None,
            health_check_protocol: None,
            health_check_interval_seconds: None,
            health_check_timeout_seconds: None,
            healthy_threshold_count: None,
            unhealthy_threshold_count: None,
            matcher: None,
            attributes: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_health_check_path(mut self, path: impl Into<Value>) -> Self {
        self.health_check_path = Some(path.into());
        self
    }

    pub fn with_health_check_protocol(mut self, protocol: Protocol) -> Self {
        self.health_check_protocol = Some(protocol);
        self
    }

    pub fn with_health_check_interval_seconds(mut self, seconds: u32) -> Self {
        self.health_check_interval_seconds = Some(seconds);
        self
    }

    pub fn with_health_check_timeout_seconds(mut self, seconds: u32) -> Self {
        self.health_check_timeout_seconds = Some(seconds);
        self
    }

    pub fn with_healthy_threshold_count(mut self, count: u32) -> Self {
        self.healthy_threshold_count = Some(count);
        self
    }

    pub fn with_unhealthy_threshold_count(mut self, count: u32) -> Self {
        self.unhealthy_threshold_count = Some(count);
        self
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_attribute(mut self, attribute: TargetGroupAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }
}

impl From<TargetGroup> for ResourceDescriptor {
    fn from(group: TargetGroup) -> Self {
        let mut properties = vec![
            ("Port", group.port),
            ("Protocol", group.protocol.as_str().into()),
            ("VpcId", group.vpc_id),
        ];
        if let Some(path) = group.health_check_path {
            properties.push(("HealthCheckPath", path));
        }
        if let Some(protocol) = group.health_check_protocol {
            properties.push(("HealthCheckProtocol", protocol.as_str().into()));
        }
        if let Some(seconds) = group.health_check_interval_seconds {
            properties.push(("HealthCheckIntervalSeconds", seconds.into()));
        }
        if let Some(seconds) = group.health_check_timeout_seconds {
            properties.push(("HealthCheckTimeoutSeconds", seconds.into()));
        }
        if let Some(count) = group.healthy_threshold_count {
            properties.push(("HealthyThresholdCount", count.into()));
        }
        if let Some(count) = group.unhealthy_threshold_count {
            properties.push(("UnhealthyThresholdCount", count.into()));
        }
        if let Some(matcher) = group.matcher {
            properties.push(("Matcher", matcher.to_value()));
        }
        if !group.attributes.is_empty() {
            properties.push((
                "TargetGroupAttributes",
                Value::List(
                    group
                        .attributes
                        .iter()
                        .map(TargetGroupAttribute::to_value)
                        .collect(),
                ),
            ));
        }
        if !group.tags.is_empty() {
            properties.push(("Tags", Value::List(group.tags.iter().map(Tag::to_value).collect())));
        }
        ResourceDescriptor::new(
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            Value::object(properties),
        )
    }
}

/// A rule action; only forwarding to a target group is needed here
#[derive(Debug, Clone)]
pub struct RuleAction {
    target_group_arn: Value,
}

impl RuleAction {
    pub fn forward(target_group_arn: impl Into<Value>) -> Self {
        Self {
            target_group_arn: target_group_arn.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("TargetGroupArn", self.target_group_arn.clone()),
            ("Type", "forward".into()),
        ])
    }
}

/// What a listener rule matches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleConditionField {
    PathPattern,
    HostHeader,
}

impl RuleConditionField {
    fn as_str(&self) -> &'static str {
        match self {
            RuleConditionField::PathPattern => "path-pattern",
            RuleConditionField::HostHeader => "host-header",
        }
    }
}

/// A listener rule match condition
#[derive(Debug, Clone)]
pub struct RuleCondition {
    field: RuleConditionField,
    values: Vec<Value>,
}

impl RuleCondition {
    pub fn new(field: RuleConditionField, values: Vec<Value>) -> Self {
        Self { field, values }
    }

    pub fn path_pattern(value: impl Into<Value>) -> Self {
        Self::new(RuleConditionField::PathPattern, vec![value.into()])
    }

    pub fn host_header(value: impl Into<Value>) -> Self {
        Self::new(RuleConditionField::HostHeader, vec![value.into()])
    }

    pub fn to_value(&self) -> Value {
        Value::object([
            ("Field", self.field.as_str().into()),
            ("Values", Value::List(self.values.clone())),
        ])
    }
}

/// A rule attached to a load balancer listener
///
/// Based on CloudFormation AWS::ElasticLoadBalancingV2::ListenerRule.
/// See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-elasticloadbalancingv2-listenerrule.html
#[derive(Debug, Clone)]
pub struct ListenerRule {
    listener_arn: Value,
    priority: Value,
    actions: Vec<RuleAction>,
    conditions: Vec<Value>,
}

impl ListenerRule {
    pub fn new(listener_arn: impl Into<Value>, priority: impl Into<Value>) -> Self {
        Self {
            listener_arn: listener_arn.into(),
            priority: priority.into(),
            actions: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition.to_value());
        self
    }

    /// Add a match condition that is only present when the named template
    /// condition holds; it is omitted entirely otherwise
    pub fn with_condition_when(
        mut self,
        template_condition: impl Into<String>,
        condition: RuleCondition,
    ) -> Self {
        self.conditions
            .push(Value::if_present(template_condition, condition.to_value()));
        self
    }
}

impl From<ListenerRule> for ResourceDescriptor {
    fn from(rule: ListenerRule) -> Self {
        let properties = vec![
            (
                "Actions",
                Value::List(rule.actions.iter().map(RuleAction::to_value).collect()),
            ),
            ("Conditions", Value::List(rule.conditions)),
            ("ListenerArn", rule.listener_arn),
            ("Priority", rule.priority),
        ];
        ResourceDescriptor::new(
            "AWS::ElasticLoadBalancingV2::ListenerRule",
            Value::object(properties),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_group_descriptor() {
        let descriptor: ResourceDescriptor = TargetGroup::new(
            Value::reference("ContainerPort"),
            Protocol::Http,
            Value::import_value(Value::sub("${NetworkStack}-Vpc")),
        )
        .with_health_check_path(Value::reference("HealthCheckPath"))
        .with_health_check_protocol(Protocol::Http)
        .with_health_check_interval_seconds(30)
        .with_health_check_timeout_seconds(10)
        .with_healthy_threshold_count(4)
        .with_unhealthy_threshold_count(3)
        .with_matcher(Matcher::http_code("200,302"))
        .with_attribute(TargetGroupAttribute::new(
            "deregistration_delay.timeout_seconds",
            "10",
        ))
        .into();

        assert_eq!(
            descriptor.resource_type(),
            "AWS::ElasticLoadBalancingV2::TargetGroup"
        );
        let properties = descriptor.properties().to_json();
        assert_eq!(properties["Protocol"], json!("HTTP"));
        assert_eq!(properties["Matcher"], json!({ "HttpCode": "200,302" }));
        assert_eq!(
            properties["TargetGroupAttributes"][0],
            json!({ "Key": "deregistration_delay.timeout_seconds", "Value": "10" })
        );
        assert_eq!(
            properties["VpcId"],
            json!({ "Fn::ImportValue": { "Fn::Sub": "${NetworkStack}-Vpc" } })
        );
    }

    #[test]
    fn listener_rule_guarded_conditions() {
        let descriptor: ResourceDescriptor = ListenerRule::new(
            Value::import_value(Value::sub("${AlbStack}-AlbPublicListener80")),
            Value::reference("ListenerPriority"),
        )
        .with_action(RuleAction::forward(Value::reference("TargetGroup1")))
        .with_condition_when(
            "ServicePathCondition",
            RuleCondition::path_pattern(Value::reference("ServicePath")),
        )
        .into();

        let properties = descriptor.properties().to_json();
        assert_eq!(
            properties["Actions"][0],
            json!({ "TargetGroupArn": { "Ref": "TargetGroup1" }, "Type": "forward" })
        );
        assert_eq!(
            properties["Conditions"][0],
            json!({ "Fn::If": [
                "ServicePathCondition",
                { "Field": "path-pattern", "Values": [{ "Ref": "ServicePath" }] },
                { "Ref": "AWS::NoValue" }
            ] })
        );
    }

    #[test]
    fn host_header_condition() {
        let condition = RuleCondition::host_header(Value::reference("ServiceHost"));
        assert_eq!(
            condition.to_value().to_json(),
            json!({ "Field": "host-header", "Values": [{ "Ref": "ServiceHost" }] })
        );
    }
}
