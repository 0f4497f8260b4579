//! Condition - Named boolean expressions over parameters
//!
//! Conditions guard resources and properties. They are declared once,
//! referenced by name, and evaluated by the deployment engine at
//! deployment time, never by the generator.

use serde_json::json;

use crate::value::{Reference, Value};

/// A boolean expression over parameter values
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionExpr {
    Equals(Value, Value),
    Not(Box<ConditionExpr>),
    And(Vec<ConditionExpr>),
    Or(Vec<ConditionExpr>),
}

impl ConditionExpr {
    pub fn equals(left: impl Into<Value>, right: impl Into<Value>) -> Self {
        ConditionExpr::Equals(left.into(), right.into())
    }

    pub fn not(expr: ConditionExpr) -> Self {
        ConditionExpr::Not(Box::new(expr))
    }

    pub fn and(exprs: Vec<ConditionExpr>) -> Self {
        ConditionExpr::And(exprs)
    }

    pub fn or(exprs: Vec<ConditionExpr>) -> Self {
        ConditionExpr::Or(exprs)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ConditionExpr::Equals(left, right) => {
                json!({ "Fn::Equals": [left.to_json(), right.to_json()] })
            }
            ConditionExpr::Not(expr) => json!({ "Fn::Not": [expr.to_json()] }),
            ConditionExpr::And(exprs) => {
                let exprs: Vec<serde_json::Value> =
                    exprs.iter().map(ConditionExpr::to_json).collect();
                json!({ "Fn::And": exprs })
            }
            ConditionExpr::Or(exprs) => {
                let exprs: Vec<serde_json::Value> =
                    exprs.iter().map(ConditionExpr::to_json).collect();
                json!({ "Fn::Or": exprs })
            }
        }
    }

    /// Collect every cross-reference the expression makes
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        self.collect(&mut refs);
        refs
    }

    fn collect(&self, refs: &mut Vec<Reference>) {
        match self {
            ConditionExpr::Equals(left, right) => {
                refs.extend(left.references());
                refs.extend(right.references());
            }
            ConditionExpr::Not(expr) => expr.collect(refs),
            ConditionExpr::And(exprs) | ConditionExpr::Or(exprs) => {
                for expr in exprs {
                    expr.collect(refs);
                }
            }
        }
    }
}
