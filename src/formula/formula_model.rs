//! Expression types for derived-field formulas.
//!
//! A formula is a single expression over one bound name, `values`, which
//! refers to the current value set of the form being filled in.

use std::fmt;

/// Binary operators, loosest to tightest binding within each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Literal values that can appear directly in a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

/// Formula AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A bare name (`values`, `Number`, `Math`)
    Ident(String),
    /// Property access: `obj.name` (property is a string literal) or `obj[expr]`
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `condition ? then_expr : else_expr`
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

impl Expr {
    /// Property access with a fixed name, as produced by `obj.name`.
    pub fn member(object: Expr, name: &str) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: Box::new(Expr::Literal(Literal::Str(name.to_string()))),
        }
    }

    /// The fixed property name of a dot access, if this is one.
    pub fn static_property(&self) -> Option<&str> {
        match self {
            Expr::Member { property, .. } => match property.as_ref() {
                Expr::Literal(Literal::Str(name)) => Some(name.as_str()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Deepest expression tree the parser builds and the evaluator walks.
/// Counts parentheses, unary operators, member and call chains, and each
/// operator in a binary chain.
pub const MAX_DEPTH: usize = 100;

/// Everything that can go wrong while lexing, parsing or evaluating a formula.
///
/// These never reach the form: the propagator turns any of them into an
/// empty derived value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// Character the lexer does not understand
    UnexpectedChar { ch: char, position: usize },

    /// String literal without a closing quote
    UnterminatedString { position: usize },

    /// Token that does not fit the grammar at this point
    UnexpectedToken(String),

    /// Formula ended while more input was expected
    UnexpectedEnd,

    /// Bare name that is not bound (only `values` and the builtins are)
    UnknownName(String),

    /// `values.<id>` where the id is not in the value set
    UnknownField(String),

    /// Call target is not a known function or method
    NotCallable(String),

    /// Operation applied to a value of the wrong kind
    Type(String),

    /// Expression nested deeper than the parser or evaluator will follow
    TooDeep { limit: usize },
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::UnexpectedChar { ch, position } => {
                write!(f, "Unexpected character '{}' at {}", ch, position)
            }
            FormulaError::UnterminatedString { position } => {
                write!(f, "Unterminated string starting at {}", position)
            }
            FormulaError::UnexpectedToken(token) => write!(f, "Unexpected token: {}", token),
            FormulaError::UnexpectedEnd => write!(f, "Unexpected end of formula"),
            FormulaError::UnknownName(name) => write!(f, "{} is not defined", name),
            FormulaError::UnknownField(id) => write!(f, "Unknown field id: {}", id),
            FormulaError::NotCallable(name) => write!(f, "{} is not a function", name),
            FormulaError::Type(msg) => write!(f, "Type error: {}", msg),
            FormulaError::TooDeep { limit } => {
                write!(f, "Formula nests deeper than {} levels", limit)
            }
        }
    }
}

impl std::error::Error for FormulaError {}
