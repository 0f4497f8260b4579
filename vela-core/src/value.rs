//! Value - Property values and intrinsic functions
//!
//! A Value is either a plain JSON-like scalar/collection or one of the
//! intrinsic forms the deployment engine resolves at deployment time
//! (Ref, Fn::GetAtt, Fn::Sub, Fn::ImportValue, Fn::Join, Fn::If).

use std::collections::BTreeMap;

use serde_json::json;

/// Pseudo parameters predeclared by the deployment engine.
/// These may be referenced without being declared in the template.
pub const PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::AccountId",
    "AWS::NoValue",
    "AWS::NotificationARNs",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

/// Returns true if `name` is a pseudo parameter
pub fn is_pseudo_parameter(name: &str) -> bool {
    PSEUDO_PARAMETERS.contains(&name)
}

/// A property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Reference to a parameter, resource, or pseudo parameter
    Ref(String),
    /// Attribute lookup on a resource (logical name, attribute name)
    GetAtt(String, String),
    /// String substitution over `${Name}` variables
    Sub(String),
    /// Cross-stack import of an exported name
    ImportValue(Box<Value>),
    /// Join parts with a delimiter
    Join(String, Vec<Value>),
    /// Guarded value: taken when the named condition holds, otherwise the
    /// alternative (usually `NoValue`, which omits the property entirely)
    If {
        condition: String,
        then: Box<Value>,
        otherwise: Box<Value>,
    },
    /// Omission marker; a property resolving to this is dropped by the
    /// deployment engine, not emitted as null
    NoValue,
}

impl Value {
    /// Build a `Value::Map` from key/value pairs
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// `Ref` to a parameter, resource, or pseudo parameter
    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    /// `Fn::GetAtt` attribute lookup on a resource
    pub fn get_att(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::GetAtt(name.into(), attribute.into())
    }

    /// `Fn::Sub` string substitution
    pub fn sub(template: impl Into<String>) -> Self {
        Value::Sub(template.into())
    }

    /// `Fn::ImportValue` cross-stack import
    pub fn import_value(exported_name: impl Into<Value>) -> Self {
        Value::ImportValue(Box::new(exported_name.into()))
    }

    /// `Fn::Join` over parts with a delimiter
    pub fn join(delimiter: impl Into<String>, parts: Vec<Value>) -> Self {
        Value::Join(delimiter.into(), parts)
    }

    /// Guarded value with an explicit alternative
    pub fn if_else(
        condition: impl Into<String>,
        then: impl Into<Value>,
        otherwise: impl Into<Value>,
    ) -> Self {
        Value::If {
            condition: condition.into(),
            then: Box::new(then.into()),
            otherwise: Box::new(otherwise.into()),
        }
    }

    /// Guarded value that is omitted entirely when the condition is false
    pub fn if_present(condition: impl Into<String>, value: impl Into<Value>) -> Self {
        Value::if_else(condition, value, Value::NoValue)
    }

    /// Convert to the serialized document form
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => json!(s),
            Value::Int(n) => json!(n),
            Value::Bool(b) => json!(b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => {
                let obj: serde_json::Map<String, serde_json::Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                serde_json::Value::Object(obj)
            }
            Value::Ref(name) => json!({ "Ref": name }),
            Value::GetAtt(name, attribute) => json!({ "Fn::GetAtt": [name, attribute] }),
            Value::Sub(template) => json!({ "Fn::Sub": template }),
            Value::ImportValue(inner) => json!({ "Fn::ImportValue": inner.to_json() }),
            Value::Join(delimiter, parts) => {
                let parts: Vec<serde_json::Value> = parts.iter().map(Value::to_json).collect();
                json!({ "Fn::Join": [delimiter, parts] })
            }
            Value::If {
                condition,
                then,
                otherwise,
            } => json!({ "Fn::If": [condition, then.to_json(), otherwise.to_json()] }),
            Value::NoValue => json!({ "Ref": "AWS::NoValue" }),
        }
    }

    /// Collect every cross-reference contained in this value tree
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        collect_references(self, &mut refs);
        refs
    }
}

/// A cross-reference found inside a value tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `Ref` target: a parameter, resource, or pseudo parameter
    Logical(String),
    /// `Fn::GetAtt` target: a resource
    Attribute(String),
    /// Condition name used by `Fn::If`
    Condition(String),
    /// Variable referenced from a `Fn::Sub` template
    SubVariable(String),
}

fn collect_references(value: &Value, refs: &mut Vec<Reference>) {
    match value {
        Value::Ref(name) => refs.push(Reference::Logical(name.clone())),
        Value::GetAtt(name, _) => refs.push(Reference::Attribute(name.clone())),
        Value::Sub(template) => {
            for name in sub_variables(template) {
                refs.push(Reference::SubVariable(name));
            }
        }
        Value::ImportValue(inner) => collect_references(inner, refs),
        Value::List(items) => {
            for item in items {
                collect_references(item, refs);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                collect_references(v, refs);
            }
        }
        Value::Join(_, parts) => {
            for part in parts {
                collect_references(part, refs);
            }
        }
        Value::If {
            condition,
            then,
            otherwise,
        } => {
            refs.push(Reference::Condition(condition.clone()));
            collect_references(then, refs);
            collect_references(otherwise, refs);
        }
        Value::String(_) | Value::Int(_) | Value::Bool(_) | Value::NoValue => {}
    }
}

/// Extract the variable names a `Fn::Sub` template references.
/// `${!Literal}` escapes are skipped; `${Name.Attribute}` lookups count as
/// a reference to `Name`.
fn sub_variables(template: &str) -> Vec<String> {
    let mut vars = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let var = &after[..end];
        if !var.starts_with('!') && !var.is_empty() {
            let name = var.split('.').next().unwrap_or(var);
            vars.push(name.to_string());
        }
        rest = &after[end + 1..];
    }

    vars
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
