// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for condition expressions

/// A condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Comparison expression: left op right
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// Operand used on its own, tested for truthiness
    Truthy(Operand),
    /// Logical AND over two or more operands
    And(Vec<Expression>),
    /// Logical OR over two or more operands
    Or(Vec<Expression>),
    /// Logical NOT
    Not(Box<Expression>),
    /// Literal true
    True,
    /// Literal false
    False,
}

/// Something that produces a value: a field, a literal or a coercion call
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Dotted field reference, e.g. `doc.customer.country`
    Field(Vec<String>),
    Literal(Literal),
    Call {
        func: Coercion,
        arg: Box<Operand>,
    },
    /// Parenthesized sub-expression used as a value
    Group(Box<Expression>),
}

/// The only functions reachable from a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// `int(x)`: leading integer
    Int,
    /// `float(x)`: leading decimal
    Float,
    /// `str(x)`: text rendering
    Str,
}

impl Coercion {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "str" => Some(Self::Str),
            _ => None,
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// ===
    StrictEq,
    /// !==
    StrictNotEq,
    /// ==
    Eq,
    /// !=
    NotEq,
    /// >
    Gt,
    /// >=
    Gte,
    /// <
    Lt,
    /// <=
    Lte,
}

/// Literal values in expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::StrictEq => write!(f, "==="),
            CompareOp::StrictNotEq => write!(f, "!=="),
            CompareOp::Eq => write!(f, "=="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_op_display() {
        assert_eq!(format!("{}", CompareOp::StrictEq), "===");
        assert_eq!(format!("{}", CompareOp::StrictNotEq), "!==");
        assert_eq!(format!("{}", CompareOp::Eq), "==");
        assert_eq!(format!("{}", CompareOp::NotEq), "!=");
        assert_eq!(format!("{}", CompareOp::Gt), ">");
        assert_eq!(format!("{}", CompareOp::Gte), ">=");
        assert_eq!(format!("{}", CompareOp::Lt), "<");
        assert_eq!(format!("{}", CompareOp::Lte), "<=");
    }

    #[test]
    fn test_coercion_names() {
        assert_eq!(Coercion::from_name("int"), Some(Coercion::Int));
        assert_eq!(Coercion::from_name("float"), Some(Coercion::Float));
        assert_eq!(Coercion::from_name("str"), Some(Coercion::Str));
        assert_eq!(Coercion::from_name("eval"), None);
    }
}
