use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DomainError, QueryableMap, queryable_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompoundKind {
    And,
    Or,
    Not,
}

impl CompoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}

impl FromStr for CompoundKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "not" => Ok(Self::Not),
            _ => Err(DomainError::UnknownCompoundKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Contains,
    BeginsWith,
    EndsWith,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Contains => "contains",
            Self::BeginsWith => "beginsWith",
            Self::EndsWith => "endsWith",
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" | "=" | "eq" => Ok(Self::Equal),
            "!=" | "<>" | "ne" => Ok(Self::NotEqual),
            "<" | "lt" => Ok(Self::Less),
            "<=" | "le" => Ok(Self::LessOrEqual),
            ">" | "gt" => Ok(Self::Greater),
            ">=" | "ge" => Ok(Self::GreaterOrEqual),
            "contains" => Ok(Self::Contains),
            "beginsWith" | "begins_with" => Ok(Self::BeginsWith),
            "endsWith" | "ends_with" => Ok(Self::EndsWith),
            other => Err(DomainError::InvalidPredicate(format!("unknown operator: {other}"))),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean query tree over entry attributes.
///
/// JSON form: `true`/`false`, `{"and": [..]}`, `{"or": [..]}`, `{"not": [p]}`,
/// or a leaf `{"key": "fileSize", "op": ">", "value": 10, "caseInsensitive": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Predicate {
    Constant(bool),
    Compound {
        kind: CompoundKind,
        operands: Vec<Predicate>,
    },
    Comparison {
        key: String,
        op: ComparisonOp,
        value: Value,
        case_insensitive: bool,
    },
}

impl Predicate {
    pub fn comparison(key: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self::Comparison {
            key: key.into(),
            op,
            value: value.into(),
            case_insensitive: false,
        }
    }

    pub fn and(operands: Vec<Predicate>) -> Self {
        Self::Compound {
            kind: CompoundKind::And,
            operands,
        }
    }

    pub fn or(operands: Vec<Predicate>) -> Self {
        Self::Compound {
            kind: CompoundKind::Or,
            operands,
        }
    }

    pub fn not(operand: Predicate) -> Self {
        Self::Compound {
            kind: CompoundKind::Not,
            operands: vec![operand],
        }
    }

    /// Marks a comparison leaf as case-insensitive. Other nodes are returned unchanged.
    pub fn case_insensitive(self) -> Self {
        match self {
            Self::Comparison { key, op, value, .. } => Self::Comparison {
                key,
                op,
                value,
                case_insensitive: true,
            },
            other => other,
        }
    }

    /// Evaluates the tree against a projection produced by `FileObject::to_queryable_map`.
    pub fn evaluate(&self, attributes: &QueryableMap) -> Result<bool, DomainError> {
        match self {
            Self::Constant(value) => Ok(*value),
            Self::Compound { kind, operands } => match kind {
                CompoundKind::And => {
                    for operand in operands {
                        if !operand.evaluate(attributes)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                CompoundKind::Or => {
                    for operand in operands {
                        if operand.evaluate(attributes)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                CompoundKind::Not => Ok(!single_operand(operands)?.evaluate(attributes)?),
            },
            Self::Comparison {
                key,
                op,
                value,
                case_insensitive,
            } => Ok(match attributes.get(key) {
                Some(actual) => compare(actual, *op, value, *case_insensitive),
                None => *op == ComparisonOp::NotEqual,
            }),
        }
    }
}

/// Rewrites resource keys in every leaf to queryable keys.
///
/// Unmapped keys pass through unchanged. A `not` node must have exactly one operand.
pub fn translate(predicate: &Predicate) -> Result<Predicate, DomainError> {
    match predicate {
        Predicate::Constant(value) => Ok(Predicate::Constant(*value)),
        Predicate::Compound { kind, operands } => {
            if *kind == CompoundKind::Not {
                single_operand(operands)?;
            }
            let operands = operands
                .iter()
                .map(translate)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Predicate::Compound {
                kind: *kind,
                operands,
            })
        }
        Predicate::Comparison {
            key,
            op,
            value,
            case_insensitive,
        } => Ok(Predicate::Comparison {
            key: queryable_key(key).map_or_else(|| key.clone(), str::to_string),
            op: *op,
            value: value.clone(),
            case_insensitive: *case_insensitive,
        }),
    }
}

fn single_operand(operands: &[Predicate]) -> Result<&Predicate, DomainError> {
    match operands {
        [operand] => Ok(operand),
        _ => Err(DomainError::InvalidCompoundArity {
            kind: CompoundKind::Not.as_str(),
            expected: "1",
            actual: operands.len(),
        }),
    }
}

fn compare(actual: &Value, op: ComparisonOp, expected: &Value, case_insensitive: bool) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .is_some_and(|ordering| ordering_matches(ordering, op)),
            _ => false,
        },
        (Value::String(a), Value::String(b)) => {
            let (a, b) = if case_insensitive {
                (a.to_lowercase(), b.to_lowercase())
            } else {
                (a.clone(), b.clone())
            };
            match op {
                ComparisonOp::Contains => a.contains(&b),
                ComparisonOp::BeginsWith => a.starts_with(&b),
                ComparisonOp::EndsWith => a.ends_with(&b),
                _ => ordering_matches(a.cmp(&b), op),
            }
        }
        (a, b) => match op {
            ComparisonOp::Equal => a == b,
            ComparisonOp::NotEqual => a != b,
            _ => false,
        },
    }
}

fn ordering_matches(ordering: Ordering, op: ComparisonOp) -> bool {
    match op {
        ComparisonOp::Equal => ordering == Ordering::Equal,
        ComparisonOp::NotEqual => ordering != Ordering::Equal,
        ComparisonOp::Less => ordering == Ordering::Less,
        ComparisonOp::LessOrEqual => ordering != Ordering::Greater,
        ComparisonOp::Greater => ordering == Ordering::Greater,
        ComparisonOp::GreaterOrEqual => ordering != Ordering::Less,
        ComparisonOp::Contains | ComparisonOp::BeginsWith | ComparisonOp::EndsWith => false,
    }
}

impl TryFrom<Value> for Predicate {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(value) => Ok(Self::Constant(value)),
            Value::Object(mut object) if object.contains_key("key") => {
                let key = match object.remove("key") {
                    Some(Value::String(key)) => key,
                    _ => return Err(DomainError::InvalidPredicate("`key` must be a string".into())),
                };
                let op = match object.remove("op") {
                    Some(Value::String(op)) => op.parse()?,
                    None => ComparisonOp::Equal,
                    Some(_) => return Err(DomainError::InvalidPredicate("`op` must be a string".into())),
                };
                let case_insensitive = object
                    .remove("caseInsensitive")
                    .and_then(|flag| flag.as_bool())
                    .unwrap_or(false);
                Ok(Self::Comparison {
                    key,
                    op,
                    value: object.remove("value").unwrap_or(Value::Null),
                    case_insensitive,
                })
            }
            Value::Object(object) if object.len() == 1 => {
                let Some((kind, operands)) = object.into_iter().next() else {
                    return Err(DomainError::InvalidPredicate("empty compound".into()));
                };
                let kind: CompoundKind = kind.parse()?;
                let operands = match operands {
                    Value::Array(items) => items
                        .into_iter()
                        .map(Predicate::try_from)
                        .collect::<Result<Vec<_>, _>>()?,
                    single @ Value::Object(_) => vec![Predicate::try_from(single)?],
                    _ => {
                        return Err(DomainError::InvalidPredicate(format!(
                            "operands of `{}` must be an array",
                            kind.as_str()
                        )));
                    }
                };
                Ok(Self::Compound { kind, operands })
            }
            other => Err(DomainError::InvalidPredicate(format!(
                "unsupported predicate node: {other}"
            ))),
        }
    }
}

impl From<Predicate> for Value {
    fn from(predicate: Predicate) -> Self {
        match predicate {
            Predicate::Constant(value) => Value::Bool(value),
            Predicate::Compound { kind, operands } => {
                let mut object = Map::new();
                object.insert(
                    kind.as_str().to_string(),
                    Value::Array(operands.into_iter().map(Value::from).collect()),
                );
                Value::Object(object)
            }
            Predicate::Comparison {
                key,
                op,
                value,
                case_insensitive,
            } => {
                let mut object = Map::new();
                object.insert("key".to_string(), Value::String(key));
                object.insert("op".to_string(), Value::String(op.as_str().to_string()));
                object.insert("value".to_string(), value);
                if case_insensitive {
                    object.insert("caseInsensitive".to_string(), Value::Bool(true));
                }
                Value::Object(object)
            }
        }
    }
}
