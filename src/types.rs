use crate::environment::Environment;
use crate::{evaluator::EvalResult, source::Span};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Sexpr, // The actual S-expression data
    pub span: Span,  // The source span it covers
}

impl Node {
    pub fn new(kind: Sexpr, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_int(n: i64, span: Span) -> Self {
        Node::new(Sexpr::Number(Number::Int(n)), span)
    }

    pub fn new_float(n: f64, span: Span) -> Self {
        Node::new(Sexpr::Number(Number::Float(n)), span)
    }

    pub fn new_number(n: Number, span: Span) -> Self {
        Node::new(Sexpr::Number(n), span)
    }

    pub fn new_symbol(name: impl Into<String>, span: Span) -> Self {
        Node::new(Sexpr::Symbol(name.into()), span)
    }

    pub fn new_list(elements: Vec<Node>, span: Span) -> Self {
        Node::new(Sexpr::List(elements), span)
    }

    pub fn new_unspecified(span: Span) -> Self {
        Node::new(Sexpr::Unspecified, span)
    }

    pub fn new_primitive(func: PrimitiveFunc, name: &str, span: Span) -> Self {
        Node::new(
            Sexpr::Procedure(Procedure::Primitive(func, name.to_string())),
            span,
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to Sexpr's Display implementation
        write!(f, "{}", self.kind)
    }
}

/// A numeric value: an exact integer or an inexact float. Which one an atom
/// becomes is decided by the parser's integer-first classification, and
/// arithmetic preserves the distinction (only `/` always goes to float).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(n) => n == 0,
            Number::Float(n) => n == 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            // Floats always render with a decimal point so they read back as
            // floats; non-finite values have no such form.
            Number::Float(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{:.1}", n),
            Number::Float(n) => write!(f, "{}", n),
        }
    }
}

/// A runtime value and, equally, a parse-tree node: the language is
/// homoiconic, so code and data share this one representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    Number(Number),        // e.g., 42, 0.5
    Symbol(String),        // e.g., +, variable-name, quote
    List(Vec<Node>),       // e.g., (+ 1 2); () is the null value
    Procedure(Procedure),  // primitive or user-defined closure
    Unspecified,           // the "no value" result of define/set!
}

impl Sexpr {
    pub fn type_name(&self) -> &'static str {
        match self {
            Sexpr::Number(_) => "number",
            Sexpr::Symbol(_) => "symbol",
            Sexpr::List(_) => "list",
            Sexpr::Procedure(_) => "procedure",
            Sexpr::Unspecified => "unspecified",
        }
    }

    /// Truthiness: exactly 0, 0.0 and the empty list are false; every other
    /// value (procedures and the unspecified value included) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Sexpr::Number(n) => !n.is_zero(),
            Sexpr::List(elements) => !elements.is_empty(),
            _ => true,
        }
    }
}

// Implement Display trait for pretty printing the Sexpr values
impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Number(n) => write!(f, "{}", n),
            Sexpr::Symbol(s) => write!(f, "{}", s),
            Sexpr::List(elements) => {
                write!(f, "(")?;
                let mut first = true;
                for expr in elements {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", expr)?;
                    first = false;
                }
                write!(f, ")")
            }
            Sexpr::Procedure(procedure) => write!(f, "{}", procedure),
            // The REPL never prints this; rendered empty for completeness.
            Sexpr::Unspecified => Ok(()),
        }
    }
}

pub type PrimitiveFunc = fn(Vec<Node>, Span) -> EvalResult;

#[derive(Clone)] // Need Clone for Sexpr::Procedure
pub enum Procedure {
    Primitive(PrimitiveFunc, String), // The function pointer and its name (for display/debug)
    Lambda(Lambda),                   // A user-defined closure
}

/// A user-defined procedure: parameter names, a body expression, and the
/// environment captured at the definition site. The environment is a shared
/// handle, not a copy, so `set!` on a captured variable is visible to every
/// closure sharing that frame.
#[derive(Clone)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub env: Rc<RefCell<Environment>>,
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Primitive(_, name) => write!(f, "#<primitive:{}>", name),
            Procedure::Lambda(lambda) => {
                write!(f, "#<procedure ({})>", lambda.params.join(" "))
            }
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Deliberately skips the captured environment: a closure stored in
        // the frame it captures would otherwise recurse forever.
        match self {
            Procedure::Primitive(_, name) => write!(f, "Primitive({})", name),
            Procedure::Lambda(lambda) => write!(f, "Lambda({})", lambda.params.join(" ")),
        }
    }
}

// Function pointers don't implement PartialEq directly, and lambdas compare
// by identity of their shared parts (the same closure object, not closures
// that merely look alike).
impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Primitive(_f1, n1), Procedure::Primitive(_f2, n2)) => n1 == n2,
            (Procedure::Lambda(l1), Procedure::Lambda(l2)) => {
                Rc::ptr_eq(&l1.body, &l2.body) && Rc::ptr_eq(&l1.env, &l2.env)
            }
            _ => false,
        }
    }
}
