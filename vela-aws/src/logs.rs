//! CloudWatch Logs resource types

use vela_core::resource::ResourceDescriptor;
use vela_core::value::Value;

/// A log group
///
/// Based on CloudFormation AWS::Logs::LogGroup.
/// See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-logs-loggroup.html
#[derive(Debug, Clone)]
pub struct LogGroup {
    log_group_name: Value,
    retention_in_days: Option<u32>,
}

impl LogGroup {
    pub fn new(log_group_name: impl Into<Value>) -> Self {
        Self {
            log_group_name: log_group_name.into(),
            retention_in_days: None,
        }
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_in_days = Some(days);
        self
    }
}

impl From<LogGroup> for ResourceDescriptor {
    fn from(group: LogGroup) -> Self {
        let mut properties = vec![("LogGroupName", group.log_group_name)];
        if let Some(days) = group.retention_in_days {
            properties.push(("RetentionInDays", days.into()));
        }
        ResourceDescriptor::new("AWS::Logs::LogGroup", Value::object(properties))
    }
}
