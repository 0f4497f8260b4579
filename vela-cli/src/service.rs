//! ECS service stack assembly
//!
//! Builds the template for one load-balanced ECS service: a log group, the
//! IAM roles, a target group, the task definition, listener rules, per-zone
//! ingress rules, and the service itself. Construction is a single pass in
//! dependency order against an explicit `Template`, so the assembly can be
//! called repeatedly with different configurations.

use vela_aws::ec2::SecurityGroupIngress;
use vela_aws::ecs::{
    ContainerDefinition, DeploymentConfiguration, EnvironmentVariable, LogConfiguration,
    NetworkMode, PlacementConstraint, PlacementStrategy, PortMapping, Service,
    ServiceLoadBalancer, TaskDefinition,
};
use vela_aws::elbv2::{
    ListenerRule, Matcher, Protocol, RuleAction, RuleCondition, Tag, TargetGroup,
    TargetGroupAttribute,
};
use vela_aws::iam::{Policy, PolicyDocument, Role, Statement};
use vela_aws::logs::LogGroup;
use vela_core::condition::ConditionExpr;
use vela_core::error::TemplateError;
use vela_core::parameter::Parameter;
use vela_core::resource::ResourceDescriptor;
use vela_core::template::{ParameterHandle, ResourceHandle, Template};
use vela_core::value::Value;

/// Sentinel default for optional string parameters ("NONE" means unset)
const NONE: &str = "NONE";

/// Assembly options for the service stack
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Availability zone labels used for the per-zone ingress fan-out
    pub zones: Vec<String>,
    /// Listener port for plain HTTP traffic
    pub http_port: u16,
    /// Listener port for TLS traffic, guarded by the certificate condition
    pub https_port: u16,
    /// HTTP codes the target group health check counts as healthy
    pub health_check_matcher: String,
    /// Log group retention in days
    pub log_retention_days: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            zones: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            http_port: 80,
            https_port: 443,
            health_check_matcher: "200,302".to_string(),
            log_retention_days: 60,
        }
    }
}

/// Assemble the service template
pub fn service_template(config: &ServiceConfig) -> Result<Template, TemplateError> {
    let mut t = Template::new();

    t.add_description("ecs-apache service");

    // PARAMETERS

    let container_name = t.add_parameter(
        "ContainerName",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Container name")
            .with_default(NONE),
    )?;

    let container_port = t.add_parameter(
        "ContainerPort",
        Parameter::number()
            .with_description("Container port")
            .with_default(80),
    )?;

    let ecr = t.add_parameter(
        "Ecr",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("ECR repository")
            .with_default(NONE),
    )?;

    let family = t.add_parameter(
        "Family",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Task family")
            .with_default(NONE),
    )?;

    let listener_priority = t.add_parameter(
        "ListenerPriority",
        Parameter::number()
            .with_description("Listener Rule Priority, must be unique across listeners")
            .with_default(10),
    )?;

    let alb_stack = t.add_parameter(
        "AlbStack",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("ALB stack name")
            .with_default(NONE),
    )?;

    let ecs_stack = t.add_parameter(
        "EcsStack",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("ECS stack name")
            .with_default(NONE),
    )?;

    let network_stack = t.add_parameter(
        "NetworkStack",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Network stack name")
            .with_default(NONE),
    )?;

    let encrypt_lambda_stack = t.add_parameter(
        "EncryptLambdaStack",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Encrypt Lambda stack name")
            .with_default(NONE),
    )?;

    t.add_condition(
        "EncryptLambdaStackCondition",
        ConditionExpr::not(ConditionExpr::equals("", encrypt_lambda_stack.reference())),
    )?;

    let service_path = t.add_parameter(
        "ServicePath",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Optional: Path portion of the service URL (NONE for empty)")
            .with_default(NONE),
    )?;

    let service_path_condition = t.add_condition(
        "ServicePathCondition",
        ConditionExpr::not(ConditionExpr::equals(service_path.reference(), NONE)),
    )?;

    let service_host = t.add_parameter(
        "ServiceHost",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Optional: Hostname for the listener (NONE for empty)")
            .with_default(NONE),
    )?;

    let service_host_condition = t.add_condition(
        "ServiceHostCondition",
        ConditionExpr::not(ConditionExpr::equals(service_host.reference(), NONE)),
    )?;

    let certificate_arn = t.add_parameter(
        "CertificateArn",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description(
                "Optional: When certificate ARN is provided, 443 listener is created on ALB \
                 (NONE for none)",
            )
            .with_default(NONE),
    )?;

    let certificate_arn_condition = t.add_condition(
        "CertificateArnCondition",
        ConditionExpr::not(ConditionExpr::equals(certificate_arn.reference(), NONE)),
    )?;

    let autoscaling_max = t.add_parameter(
        "AutoscalingMax",
        Parameter::number()
            .with_description("Maximum number of tasks to autoscale")
            .with_default(3),
    )?;

    let autoscaling_min = t.add_parameter(
        "AutoscalingMin",
        Parameter::number()
            .with_description("Minimum number of tasks to autoscale")
            .with_default(3),
    )?;

    let health_check_path = t.add_parameter(
        "HealthCheckPath",
        Parameter::string()
            .with_description("Healthcheck path")
            .with_default(NONE),
    )?;

    let stack_env = t.add_parameter(
        "StackEnv",
        Parameter::string()
            .with_allowed_values(["PROD", "UAT", "OTHER"])
            .with_description(
                "When PROD is selected dsaas will be installed on the instances. Use UAT for \
                 UAT stacks and OTHER for everything else",
            )
            .with_default("OTHER"),
    )?;

    t.add_condition(
        "IsProd",
        ConditionExpr::equals("PROD", stack_env.reference()),
    )?;

    // Defined in imageconfig.conf

    let image_name = t.add_parameter(
        "ImageName",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Docker image name")
            .with_default(NONE),
    )?;

    let image_tag = t.add_parameter(
        "ImageTag",
        Parameter::string()
            .with_allowed_pattern("^.+$")
            .with_description("Docker image tag")
            .with_default(NONE),
    )?;

    // METADATA

    t.add_metadata(
        "AWS::CloudFormation::Interface",
        Value::object([(
            "ParameterGroups",
            Value::List(vec![
                parameter_group(
                    "Container",
                    &[
                        &container_name,
                        &container_port,
                        &family,
                        &ecr,
                        &image_name,
                        &image_tag,
                        &service_path,
                        &service_host,
                        &health_check_path,
                        &autoscaling_max,
                        &autoscaling_min,
                        &listener_priority,
                    ],
                ),
                parameter_group(
                    "Dependent stacks",
                    &[&alb_stack, &encrypt_lambda_stack, &ecs_stack, &network_stack],
                ),
                parameter_group("Optional", &[&certificate_arn]),
            ]),
        )]),
    );

    // RESOURCES

    let log_group = t.add_resource(
        "LogGroup",
        LogGroup::new(Value::reference("AWS::StackName"))
            .with_retention_days(config.log_retention_days),
    )?;

    let task_role = t.add_resource(
        "TaskRole",
        Role::assumed_by_service("ecs-tasks.amazonaws.com")
            .with_path("/")
            .with_policy(Policy::new(
                stack_scoped_name("TaskPolicy"),
                PolicyDocument::new().statement(log_write_statement(&log_group)),
            )),
    )?;

    let service_role = t.add_resource(
        "ServiceRole",
        Role::assumed_by_service("ecs.amazonaws.com")
            .with_path("/")
            .with_policy(Policy::new(
                stack_scoped_name("ServicePolicy"),
                PolicyDocument::new()
                    .statement(
                        Statement::allow()
                            .action("ec2", "AuthorizeSecurityGroupIngress")
                            .action("ec2", "Describe*")
                            .action("elasticloadbalancing", "DeregisterInstancesFromLoadBalancer")
                            .action("elasticloadbalancing", "DeregisterTargets")
                            .action("elasticloadbalancing", "Describe*")
                            .action("elasticloadbalancing", "RegisterInstancesWithLoadBalancer")
                            .action("elasticloadbalancing", "RegisterTargets")
                            .on_resource("*"),
                    )
                    .statement(log_write_statement(&log_group)),
            )),
    )?;

    t.add_resource(
        "AutoscaleRole",
        Role::assumed_by_service("application-autoscaling.amazonaws.com")
            .with_path("/")
            .with_policy(Policy::new(
                stack_scoped_name("AutoScalePolicy"),
                PolicyDocument::new()
                    .statement(
                        Statement::allow()
                            .action("ecs", "DescribeServices")
                            .action("ecs", "UpdateService")
                            .on_resource("*"),
                    )
                    .statement(
                        Statement::allow()
                            .action("cloudwatch", "DescribeAlarms")
                            .on_resource("*"),
                    ),
            )),
    )?;

    // Target group attached to the ALB of the ECS stack
    let target_group = t.add_resource(
        "TargetGroup1",
        TargetGroup::new(
            container_port.reference(),
            Protocol::Http,
            Value::import_value(Value::sub("${NetworkStack}-Vpc")),
        )
        .with_health_check_path(health_check_path.reference())
        .with_health_check_protocol(Protocol::Http)
        .with_health_check_interval_seconds(30)
        .with_health_check_timeout_seconds(10)
        .with_healthy_threshold_count(4)
        .with_unhealthy_threshold_count(3)
        .with_matcher(Matcher::http_code(config.health_check_matcher.as_str()))
        .with_attribute(TargetGroupAttribute::new(
            "deregistration_delay.timeout_seconds",
            "10",
        ))
        .with_tag(Tag::new(
            "TargetGroupName",
            Value::join("", vec!["Tg-".into(), container_name.reference()]),
        )),
    )?;

    let task_definition = t.add_resource(
        "TaskDefinition",
        ResourceDescriptor::from(
            TaskDefinition::new(family.reference())
                .with_network_mode(NetworkMode::Bridge)
                .with_task_role(task_role.attribute("Arn"))
                .with_container(
                    ContainerDefinition::new(
                        container_name.reference(),
                        Value::join(
                            "",
                            vec![
                                ecr.reference(),
                                "/".into(),
                                image_name.reference(),
                                ":".into(),
                                image_tag.reference(),
                            ],
                        ),
                    )
                    .with_cpu(200)
                    .with_memory(2048)
                    .with_memory_reservation(512)
                    .essential(true)
                    .with_log_configuration(
                        LogConfiguration::awslogs()
                            .with_option("awslogs-group", Value::reference("AWS::StackName"))
                            .with_option("awslogs-region", Value::reference("AWS::Region"))
                            .with_option("awslogs-stream-prefix", container_name.reference()),
                    )
                    .with_port_mapping(PortMapping::tcp(0, container_port.reference()))
                    .with_environment(EnvironmentVariable::new(
                        "AWSStackName",
                        Value::reference("AWS::StackName"),
                    ))
                    .with_environment(EnvironmentVariable::new(
                        "AWSRegion",
                        Value::reference("AWS::Region"),
                    ))
                    .with_environment(EnvironmentVariable::new(
                        "ALB",
                        Value::import_value(Value::sub("${AlbStack}-AlbPrivateDNSName")),
                    )),
                ),
        )
        .depends_on(log_group.name()),
    )?;

    // Route the target group from the public listeners; the path and host
    // matches are present only when the matching parameter is set
    let routed_rule = |listener_export: &str| -> ListenerRule {
        ListenerRule::new(
            Value::import_value(Value::sub(listener_export)),
            listener_priority.reference(),
        )
        .with_action(RuleAction::forward(target_group.reference()))
        .with_condition_when(
            service_path_condition.name(),
            RuleCondition::path_pattern(service_path.reference()),
        )
        .with_condition_when(
            service_host_condition.name(),
            RuleCondition::host_header(service_host.reference()),
        )
    };

    t.add_resource(
        "ListenerRule1",
        routed_rule(&format!("${{AlbStack}}-AlbPublicListener{}", config.http_port)),
    )?;

    t.add_resource(
        "ListenerRule2",
        ResourceDescriptor::from(routed_rule(&format!(
            "${{AlbStack}}-AlbPublicListener{}",
            config.https_port
        )))
        .when(certificate_arn_condition.name()),
    )?;

    // Allow the NAT instances to reach the public ALB, one rule per zone
    let alb_group_id = Value::import_value(Value::sub("${AlbStack}-SgAlbPublicGroupId"));
    for zone in &config.zones {
        let nat_ip = Value::join(
            "/",
            vec![
                Value::import_value(Value::sub(format!("${{NetworkStack}}-NatIpPublic{zone}"))),
                "32".into(),
            ],
        );

        t.add_resource(
            format!("ApacheIngressRule{zone}"),
            SecurityGroupIngress::tcp(alb_group_id.clone(), config.http_port)
                .with_cidr_ip(nat_ip.clone()),
        )?;

        t.add_resource(
            format!("ApacheIngressRuleSsl{zone}"),
            ResourceDescriptor::from(
                SecurityGroupIngress::tcp(alb_group_id.clone(), config.https_port)
                    .with_cidr_ip(nat_ip),
            )
            .when(certificate_arn_condition.name()),
        )?;
    }

    // Spread over zones for availability, binpack within a zone to keep
    // the host count down
    t.add_resource(
        "Service",
        ResourceDescriptor::from(
            Service::new(
                Value::import_value(Value::sub("${EcsStack}-Cluster")),
                task_definition.reference(),
            )
            .with_desired_count(autoscaling_min.reference())
            .with_role(service_role.reference())
            .with_load_balancer(ServiceLoadBalancer::new(
                container_name.reference(),
                container_port.reference(),
                target_group.reference(),
            ))
            .with_placement_strategy(PlacementStrategy::spread(
                "attribute:ecs.availability-zone",
            ))
            .with_placement_strategy(PlacementStrategy::binpack("memory"))
            .with_placement_constraint(PlacementConstraint::distinct_instance())
            .with_deployment_configuration(DeploymentConfiguration::new(200, 50)),
        )
        .depends_on(service_role.name()),
    )?;

    Ok(t)
}

/// A name scoped to the stack, e.g. "<stack>-TaskPolicy"
fn stack_scoped_name(suffix: &str) -> Value {
    Value::join("-", vec![Value::reference("AWS::StackName"), suffix.into()])
}

/// Allow writing container output to the stack's log group
fn log_write_statement(log_group: &ResourceHandle) -> Statement {
    Statement::allow()
        .action("logs", "CreateLogStream")
        .action("logs", "PutLogEvents")
        .action("logs", "CreateLogGroup")
        .on_resource(Value::join(
            ":",
            vec![
                "arn:aws:logs".into(),
                Value::reference("AWS::Region"),
                Value::reference("AWS::AccountId"),
                "log-group".into(),
                log_group.reference(),
                "*".into(),
            ],
        ))
}

/// One `AWS::CloudFormation::Interface` parameter group
fn parameter_group(label: &str, parameters: &[&ParameterHandle]) -> Value {
    Value::object([
        ("Label", Value::object([("default", label.into())])),
        (
            "Parameters",
            Value::List(parameters.iter().map(|p| p.name().into()).collect()),
        ),
    ])
}
