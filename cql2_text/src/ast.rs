//! Abstract syntax tree for CQL2 text filters and its CQL2-JSON rendering

use serde_json::{json, Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    IntegerDivide,
    Power,
}

impl ArithmeticOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
            ArithmeticOp::IntegerDivide => "div",
            ArithmeticOp::Power => "^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(Number),
    Boolean(bool),
    Timestamp(String),
    Date(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
    },
    IsNull(Box<Expr>),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `('a', 'b')`, the operand of the array operators
    Array(Vec<Expr>),
    Property(String),
    Literal(Literal),
    Interval(Box<Expr>, Box<Expr>),
    /// Spatial, temporal, array and custom functions
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// GeoJSON geometry parsed from WKT
    Geometry(Value),
    Bbox(Vec<Number>),
}

impl Expr {
    /// Render as a CQL2-JSON value
    pub fn to_json(&self) -> Value {
        match self {
            Expr::And(args) => op("and", args.iter().map(Expr::to_json).collect()),
            Expr::Or(args) => op("or", args.iter().map(Expr::to_json).collect()),
            Expr::Not(expr) => op("not", vec![expr.to_json()]),
            Expr::Comparison { op: cmp, left, right } => {
                op(cmp.as_str(), vec![left.to_json(), right.to_json()])
            }
            Expr::Like { expr, pattern } => op("like", vec![expr.to_json(), pattern.to_json()]),
            Expr::Between { expr, low, high } => op(
                "between",
                vec![expr.to_json(), low.to_json(), high.to_json()],
            ),
            Expr::In { expr, list } => op(
                "in",
                vec![
                    expr.to_json(),
                    Value::Array(list.iter().map(Expr::to_json).collect()),
                ],
            ),
            Expr::IsNull(expr) => op("isNull", vec![expr.to_json()]),
            Expr::Arithmetic {
                op: arithmetic,
                left,
                right,
            } => op(arithmetic.as_str(), vec![left.to_json(), right.to_json()]),
            Expr::Array(items) => Value::Array(items.iter().map(Expr::to_json).collect()),
            Expr::Property(name) => json!({ "property": name }),
            Expr::Literal(literal) => match literal {
                Literal::String(s) => Value::String(s.clone()),
                Literal::Number(n) => Value::Number(n.clone()),
                Literal::Boolean(b) => Value::Bool(*b),
                Literal::Timestamp(t) => json!({ "timestamp": t }),
                Literal::Date(d) => json!({ "date": d }),
            },
            Expr::Interval(start, end) => json!({ "interval": [start.to_json(), end.to_json()] }),
            Expr::Function { name, args } => op(name, args.iter().map(Expr::to_json).collect()),
            Expr::Geometry(geometry) => geometry.clone(),
            Expr::Bbox(values) => json!({ "bbox": values }),
        }
    }
}

fn op(name: &str, args: Vec<Value>) -> Value {
    let mut object = Map::new();
    object.insert("op".to_string(), Value::String(name.to_string()));
    object.insert("args".to_string(), Value::Array(args));
    Value::Object(object)
}
