//! Vela Core
//!
//! Document model for assembling CloudFormation templates: parameters,
//! conditions, resource descriptors, intrinsic values, and serialization.

pub mod condition;
pub mod error;
pub mod parameter;
pub mod resource;
pub mod template;
pub mod value;
