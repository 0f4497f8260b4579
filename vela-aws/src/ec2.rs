//! EC2 resource types

use vela_core::resource::ResourceDescriptor;
use vela_core::value::Value;

/// Ingress rule protocol, serialized as an IANA protocol number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    Tcp,
    Udp,
    Icmp,
    /// All traffic
    All,
}

impl IpProtocol {
    fn as_str(&self) -> &'static str {
        match self {
            IpProtocol::Tcp => "6",
            IpProtocol::Udp => "17",
            IpProtocol::Icmp => "1",
            IpProtocol::All => "-1",
        }
    }
}

/// An inbound rule added to an existing security group
///
/// Based on CloudFormation AWS::EC2::SecurityGroupIngress.
/// See: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-ec2-securitygroupingress.html
#[derive(Debug, Clone)]
pub struct SecurityGroupIngress {
    group_id: Value,
    ip_protocol: IpProtocol,
    from_port: u16,
    to_port: u16,
    cidr_ip: Option<Value>,
}

impl SecurityGroupIngress {
    pub fn new(
        group_id: impl Into<Value>,
        ip_protocol: IpProtocol,
        from_port: u16,
        to_port: u16,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            ip_protocol,
            from_port,
            to_port,
            cidr_ip: None,
        }
    }

    /// Single-port convenience for TCP rules
    pub fn tcp(group_id: impl Into<Value>, port: u16) -> Self {
        Self::new(group_id, IpProtocol::Tcp, port, port)
    }

    pub fn with_cidr_ip(mut self, cidr_ip: impl Into<Value>) -> Self {
        self.cidr_ip = Some(cidr_ip.into());
        self
    }
}

impl From<SecurityGroupIngress> for ResourceDescriptor {
    fn from(rule: SecurityGroupIngress) -> Self {
        let mut properties = vec![
            ("GroupId", rule.group_id),
            ("IpProtocol", rule.ip_protocol.as_str().into()),
            ("FromPort", rule.from_port.into()),
            ("ToPort", rule.to_port.into()),
        ];
        if let Some(cidr_ip) = rule.cidr_ip {
            properties.push(("CidrIp", cidr_ip));
        }
        ResourceDescriptor::new("AWS::EC2::SecurityGroupIngress", Value::object(properties))
    }
}
