//! Vela AWS
//!
//! Typed CloudFormation resource descriptors for the services an ECS stack
//! uses. Each resource type is a struct with a typed property set that
//! lowers into a `vela_core::resource::ResourceDescriptor`.

pub mod ec2;
pub mod ecs;
pub mod elbv2;
pub mod iam;
pub mod logs;
