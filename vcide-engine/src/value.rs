// Counterexample values as reported by the interpreter.
//
// Values keep the structure of the source language (arrays, objects, class
// instances) so a frame inspector can expand them lazily.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Value {
    Undefined,
    Null,
    Bool { v: bool },
    Num { v: f64 },
    Str { v: String },
    /// Closure; only its printed form survives the model.
    Fun { body: String },
    Arr { elems: Vec<Value> },
    Obj { v: BTreeMap<String, Value> },
    ObjCls { cls: String, args: Vec<Value> },
}

impl Value {
    pub fn num(v: f64) -> Self {
        Value::Num { v }
    }

    pub fn bool(v: bool) -> Self {
        Value::Bool { v }
    }

    pub fn str(v: impl Into<String>) -> Self {
        Value::Str { v: v.into() }
    }

    /// Equality as seen by a frame inspector: functions are never equal, so a
    /// closure in the model always shows both its dynamic and static form.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool { v: a }, Value::Bool { v: b }) => a == b,
            (Value::Num { v: a }, Value::Num { v: b }) => a == b,
            (Value::Str { v: a }, Value::Str { v: b }) => a == b,
            (Value::Fun { .. }, _) => false,
            (Value::Arr { elems: a }, Value::Arr { elems: b }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Value::Obj { v: a }, Value::Obj { v: b }) => {
                a.len() == b.len()
                    && a.iter().all(|(k, x)| b.get(k).is_some_and(|y| x.same_as(y)))
            }
            (Value::ObjCls { cls: ca, args: a }, Value::ObjCls { cls: cb, args: b }) => {
                ca == cb && a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            _ => false,
        }
    }

    /// Single-line form truncated for inline labels.
    pub fn display_compact(&self, max: usize) -> String {
        let s = self.to_string();
        if s.chars().count() > max && max > 3 {
            let head: String = s.chars().take(max - 3).collect();
            format!("{head}..")
        } else {
            s
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool { v } => write!(f, "{v}"),
            Value::Num { v } => write!(f, "{v}"),
            Value::Str { v } => write!(f, "{v:?}"),
            Value::Fun { body } => f.write_str(body),
            Value::Arr { elems } => {
                f.write_str("[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str("]")
            }
            Value::Obj { v } => {
                f.write_str("{ ")?;
                for (i, (k, e)) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {e}")?;
                }
                f.write_str(" }")
            }
            Value::ObjCls { cls, args } => {
                write!(f, "new {cls}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
        }
    }
}
