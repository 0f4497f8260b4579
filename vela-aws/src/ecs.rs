//! ECS resource types

use vela_core::resource::ResourceDescriptor;
use vela_core::value::Value;

/// Task networking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    Bridge,
    AwsVpc,
    Host,
}

impl NetworkMode {
    fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Bridge => "bridge",
            NetworkMode::AwsVpc => "awsvpc",
            NetworkMode::Host => "host",
        }
    }
}

/// Container log driver configuration
#[derive(Debug, Clone)]
pub struct LogConfiguration {
    log_driver: String,
    options: Vec<(String, Value)>,
}

impl LogConfiguration {
    pub fn new(log_driver: impl Into<String>) -> Self {
        Self {
            log_driver: log_driver.into(),
            options: Vec::new(),
        }
    }

    /// The awslogs driver, shipping container output to CloudWatch Logs
    pub fn awslogs() -> Self {
        Self::new("awslogs")
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("LogDriver", self.log_driver.as_str().into()),
            ("Options", Value::object(self.options.clone())),
        ])
    }
}

/// Container port mapping; a host port of 0 lets the agent pick one
#[derive(Debug, Clone)]
pub struct PortMapping {
    host_port: Value,
    container_port: Value,
    protocol: &'static str,
}

impl PortMapping {
    pub fn tcp(host_port: impl Into<Value>, container_port: impl Into<Value>) -> Self {
        Self {
            host_port: host_port.into(),
            container_port: container_port.into(),
            protocol: "tcp",
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("ContainerPort", self.container_port.clone()),
            ("HostPort", self.host_port.clone()),
            ("Protocol", self.protocol.into()),
        ])
    }
}

/// A container environment variable
#[derive(Debug, Clone)]
pub struct EnvironmentVariable {
    name: String,
    value: Value,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("Name", self.name.as_str().into()),
            ("Value", self.value.clone()),
        ])
    }
}

/// A container inside a task definition
#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    name: Value,
    image: Value,
    cpu: Option<u32>,
    memory: Option<u32>,
    memory_reservation: Option<u32>,
    essential: Option<bool>,
    log_configuration: Option<LogConfiguration>,
    port_mappings: Vec<PortMapping>,
    environment: Vec<EnvironmentVariable>,
}

impl ContainerDefinition {
    pub fn new(name: impl Into<Value>, image: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            cpu: None,
            memory: None,
            memory_reservation: None,
            essential: None,
            log_configuration: None,
            port_mappings: Vec::new(),
            environment: Vec::new(),
        }
    }

    pub fn with_cpu(mut self, units: u32) -> Self {
        self.cpu = Some(units);
        self
    }

    pub fn with_memory(mut self, mib: u32) -> Self {
        self.memory = Some(mib);
        self
    }

    pub fn with_memory_reservation(mut self, mib: u32) -> Self {
        self.memory_reservation = Some(mib);
        self
    }

    pub fn essential(mut self, essential: bool) -> Self {
        self.essential = Some(essential);
        self
    }

    pub fn with_log_configuration(mut self, log_configuration: LogConfiguration) -> Self {
        self.log_configuration = Some(log_configuration);
        self
    }

    pub fn with_port_mapping(mut self, mapping: PortMapping) -> Self {
        self.port_mappings.push(mapping);
        self
    }

    pub fn with_environment(mut self, variable: EnvironmentVariable) -> Self {
        self.environment.push(variable);
        self
    }

    fn to_value(&self) -> Value {
        let mut entries = vec![("Name", self.name.clone()), ("Image", self.image.clone())];
        if let Some(units) = self.cpu {
            entries.push(("Cpu", units.into()));
        }
        if let Some(mib) = self.memory {
            entries.push(("Memory", mib.into()));
        }
        if let Some(mib) = self.memory_reservation {
            entries.push(("MemoryReservation", mib.into()));
        }
        if let Some(essential) = self.essential {
            entries.push(("Essential", essential.into()));
        }
        if let Some(log_configuration) = &self.log_configuration {
            entries.push(("LogConfiguration", log_configuration.to_value()));
        }
        if !self.port_mappings.is_empty() {
            entries.push((
                "PortMappings",
                Value::List(self.port_mappings.iter().map(PortMapping::to_value).collect()),
            ));
        }
        if !self.environment.is_empty() {
            entries.push((
                "Environment",
                Value::List(
                    self.environment
                        .iter()
                        .map(EnvironmentVariable::to_value)
                        .collect(),
                ),
            ));
        }
        Value::object(entries)
    }
}

/// A task definition
///
/// Based on CloudFormation AWS::ECS::TaskDefinition.
/// See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-ecs-taskdefinition.html
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    family: Value,
    network_mode: Option<NetworkMode>,
    task_role_arn: Option<Value>,
    container_definitions: Vec<ContainerDefinition>,
}

impl TaskDefinition {
    pub fn new(family: impl Into<Value>) -> Self {
        Self {
            family: family.into(),
            network_mode: None,
            task_role_arn: None,
            container_definitions: Vec::new(),
        }
    }

    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = Some(mode);
        self
    }

    pub fn with_task_role(mut self, arn: impl Into<Value>) -> Self {
        self.task_role_arn = Some(arn.into());
        self
    }

    pub fn with_container(mut self, container: ContainerDefinition) -> Self {
        self.container_definitions.push(container);
        self
    }
}

impl From<TaskDefinition> for ResourceDescriptor {
    fn from(task: TaskDefinition) -> Self {
        let mut properties = vec![("Family", task.family)];
        if let Some(mode) = task.network_mode {
            properties.push(("NetworkMode", mode.as_str().into()));
        }
        if let Some(arn) = task.task_role_arn {
            properties.push(("TaskRoleArn", arn));
        }
        properties.push((
            "ContainerDefinitions",
            Value::List(
                task.container_definitions
                    .iter()
                    .map(ContainerDefinition::to_value)
                    .collect(),
            ),
        ));
        ResourceDescriptor::new("AWS::ECS::TaskDefinition", Value::object(properties))
    }
}

/// A load balancer attachment for a service
#[derive(Debug, Clone)]
pub struct ServiceLoadBalancer {
    container_name: Value,
    container_port: Value,
    target_group_arn: Value,
}

impl ServiceLoadBalancer {
    pub fn new(
        container_name: impl Into<Value>,
        container_port: impl Into<Value>,
        target_group_arn: impl Into<Value>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            container_port: container_port.into(),
            target_group_arn: target_group_arn.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("ContainerName", self.container_name.clone()),
            ("ContainerPort", self.container_port.clone()),
            ("TargetGroupArn", self.target_group_arn.clone()),
        ])
    }
}

/// Task placement strategy
#[derive(Debug, Clone)]
pub struct PlacementStrategy {
    strategy_type: &'static str,
    field: String,
}

impl PlacementStrategy {
    /// Spread tasks evenly over the given field
    pub fn spread(field: impl Into<String>) -> Self {
        Self {
            strategy_type: "spread",
            field: field.into(),
        }
    }

    /// Pack tasks to minimize hosts, by the given resource field
    pub fn binpack(field: impl Into<String>) -> Self {
        Self {
            strategy_type: "binpack",
            field: field.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("Field", self.field.as_str().into()),
            ("Type", self.strategy_type.into()),
        ])
    }
}

/// Task placement constraint
#[derive(Debug, Clone)]
pub struct PlacementConstraint {
    constraint_type: &'static str,
}

impl PlacementConstraint {
    /// Each task on a distinct container instance
    pub fn distinct_instance() -> Self {
        Self {
            constraint_type: "distinctInstance",
        }
    }

    fn to_value(&self) -> Value {
        Value::object([("Type", self.constraint_type.into())])
    }
}

/// Rolling deployment bounds, in percent of the desired count
#[derive(Debug, Clone)]
pub struct DeploymentConfiguration {
    maximum_percent: u32,
    minimum_healthy_percent: u32,
}

impl DeploymentConfiguration {
    pub fn new(maximum_percent: u32, minimum_healthy_percent: u32) -> Self {
        Self {
            maximum_percent,
            minimum_healthy_percent,
        }
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("MaximumPercent", self.maximum_percent.into()),
            ("MinimumHealthyPercent", self.minimum_healthy_percent.into()),
        ])
    }
}

/// A long-running service keeping a task definition at a desired count
///
/// Based on CloudFormation AWS::ECS::Service.
/// See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-ecs-service.html
#[derive(Debug, Clone)]
pub struct Service {
    cluster: Value,
    task_definition: Value,
    desired_count: Option<Value>,
    role: Option<Value>,
    load_balancers: Vec<ServiceLoadBalancer>,
    placement_strategies: Vec<PlacementStrategy>,
    placement_constraints: Vec<PlacementConstraint>,
    deployment_configuration: Option<DeploymentConfiguration>,
}

impl Service {
    pub fn new(cluster: impl Into<Value>, task_definition: impl Into<Value>) -> Self {
        Self {
            cluster: cluster.into(),
            task_definition: task_definition.into(),
            desired_count: None,
            role: None,
            load_balancers: Vec::new(),
            placement_strategies: Vec::new(),
            placement_constraints: Vec::new(),
            deployment_configuration: None,
        }
    }

    pub fn with_desired_count(mut self, count: impl Into<Value>) -> Self {
        self.desired_count = Some(count.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<Value>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_load_balancer(mut self, load_balancer: ServiceLoadBalancer) -> Self {
        self.load_balancers.push(load_balancer);
        self
    }

    pub fn with_placement_strategy(mut self, strategy: PlacementStrategy) -> Self {
        self.placement_strategies.push(strategy);
        self
    }

    pub fn with_placement_constraint(mut self, constraint: PlacementConstraint) -> Self {
        self.placement_constraints.push(constraint);
        self
    }

    pub fn with_deployment_configuration(mut self, config: DeploymentConfiguration) -> Self {
        self.deployment_configuration = Some(config);
        self
    }
}

impl From<Service> for ResourceDescriptor {
    fn from(service: Service) -> Self {
        let mut properties = vec![
            ("Cluster", service.cluster),
            ("TaskDefinition", service.task_definition),
        ];
        if let Some(count) = service.desired_count {
            properties.push(("DesiredCount", count));
        }
        if let Some(role) = service.role {
            properties.push(("Role", role));
        }
        if !service.load_balancers.is_empty() {
            properties.push((
                "LoadBalancers",
                Value::List(
                    service
                        .load_balancers
                        .iter()
                        .map(ServiceLoadBalancer::to_value)
                        .collect(),
                ),
            ));
        }
        if !service.placement_strategies.is_empty() {
            properties.push((
                "PlacementStrategies",
                Value::List(
                    service
                        .placement_strategies
                        .iter()
                        .map(PlacementStrategy::to_value)
                        .collect(),
                ),
            ));
        }
        if !service.placement_constraints.is_empty() {
            properties.push((
                "PlacementConstraints",
                Value::List(
                    service
                        .placement_constraints
                        .iter()
                        .map(PlacementConstraint::to_value)
                        .collect(),
                ),
            ));
        }
        if let Some(config) = service.deployment_configuration {
            properties.push(("DeploymentConfiguration", config.to_value()));
        }
        ResourceDescriptor::new("AWS::ECS::Service", Value::object(properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_definition_descriptor() {
        let descriptor: ResourceDescriptor = TaskDefinition::new(Value::reference("Family"))
            .with_network_mode(NetworkMode::Bridge)
            .with_task_role(Value::get_att("TaskRole", "Arn"))
            .with_container(
                ContainerDefinition::new(
                    Value::reference("ContainerName"),
                    Value::join(
                        "",
                        vec![
                            Value::reference("Ecr"),
                            "/".into(),
                            Value::reference("ImageName"),
                            ":".into(),
                            Value::reference("ImageTag"),
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
                        .with_option("awslogs-region", Value::reference("AWS::Region")),
                )
                .with_port_mapping(PortMapping::tcp(0, Value::reference("ContainerPort"))),
            )
            .into();

        assert_eq!(descriptor.resource_type(), "AWS::ECS::TaskDefinition");
        let properties = descriptor.properties().to_json();
        assert_eq!(properties["NetworkMode"], json!("bridge"));
        assert_eq!(
            properties["TaskRoleArn"],
            json!({ "Fn::GetAtt": ["TaskRole", "Arn"] })
        );

        let container = &properties["ContainerDefinitions"][0];
        assert_eq!(container["Cpu"], json!(200));
        assert_eq!(container["Memory"], json!(2048));
        assert_eq!(container["MemoryReservation"], json!(512));
        assert_eq!(container["Essential"], json!(true));
        assert_eq!(container["LogConfiguration"]["LogDriver"], json!("awslogs"));
        assert_eq!(
            container["PortMappings"][0],
            json!({ "ContainerPort": { "Ref": "ContainerPort" }, "HostPort": 0, "Protocol": "tcp" })
        );
    }

    #[test]
    fn service_descriptor() {
        let descriptor: ResourceDescriptor = Service::new(
            Value::import_value(Value::sub("${EcsStack}-Cluster")),
            Value::reference("TaskDefinition"),
        )
        .with_desired_count(Value::reference("AutoscalingMin"))
        .with_role(Value::reference("ServiceRole"))
        .with_load_balancer(ServiceLoadBalancer::new(
            Value::reference("ContainerName"),
            Value::reference("ContainerPort"),
            Value::reference("TargetGroup1"),
        ))
        .with_placement_strategy(PlacementStrategy::spread("attribute:ecs.availability-zone"))
        .with_placement_strategy(PlacementStrategy::binpack("memory"))
        .with_placement_constraint(PlacementConstraint::distinct_instance())
        .with_deployment_configuration(DeploymentConfiguration::new(200, 50))
        .into();

        assert_eq!(descriptor.resource_type(), "AWS::ECS::Service");
        let properties = descriptor.properties().to_json();
        assert_eq!(
            properties["PlacementStrategies"],
            json!([
                { "Field": "attribute:ecs.availability-zone", "Type": "spread" },
                { "Field": "memory", "Type": "binpack" }
            ])
        );
        assert_eq!(
            properties["PlacementConstraints"],
            json!([{ "Type": "distinctInstance" }])
        );
        assert_eq!(
            properties["DeploymentConfiguration"],
            json!({ "MaximumPercent": 200, "MinimumHealthyPercent": 50 })
        );
    }

    #[test]
    fn environment_variables_keep_declaration_order() {
        let container = ContainerDefinition::new("app", "image")
            .with_environment(EnvironmentVariable::new(
                "AWSStackName",
                Value::reference("AWS::StackName"),
            ))
            .with_environment(EnvironmentVariable::new(
                "AWSRegion",
                Value::reference("AWS::Region"),
            ));

        let json = container.to_value().to_json();
        assert_eq!(json["Environment"][0]["Name"], json!("AWSStackName"));
        assert_eq!(json["Environment"][1]["Name"], json!("AWSRegion"));
    }
}
