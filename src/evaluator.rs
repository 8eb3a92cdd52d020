use crate::environment::{EnvError, Environment};
use crate::source::Span;
use crate::types::{Lambda, Node, Procedure, Sexpr};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Env(#[from] EnvError), // Unbound variables and call-frame arity mismatches
    #[error("Evaluation Error: Expected a procedure, but got: {0}")]
    NotAProcedure(Sexpr, Span), // Tried to call something that isn't a procedure
    #[error("Evaluation Error: Invalid arguments - {0}")]
    InvalidArguments(String, Span), // Wrong count or type of primitive args
    #[error("Evaluation Error: Expected a symbol, but got: {0}")]
    NotASymbol(Sexpr, Span), // Expected a symbol (e.g., for define/set!)
    #[error("Evaluation Error: Invalid special form - {0}")]
    InvalidSpecialForm(String, Span), // Malformed special form (e.g., (if cond))
}

// Result type alias for convenience
pub type EvalResult<T = Node> = Result<T, EvalError>;

/// The keywords the evaluator recognizes before generic application (used by
/// the REPL completer alongside the environment's identifiers).
pub fn special_form_identifiers() -> HashSet<String> {
    ["quote", "if", "define", "set!", "func", "lambda"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// --- Evaluate Function ---

/// Evaluates a given AST Node within the specified environment.
///
/// Plain native recursion: evaluation depth (and user-procedure call depth)
/// consumes host stack space, so a non-terminating recursive source program
/// exhausts the stack rather than failing gracefully. A known limit for a
/// teaching-scale interpreter, not a defect.
pub fn evaluate(node: Node, env: Rc<RefCell<Environment>>) -> EvalResult {
    match &node.kind {
        // 1. Symbols: look up in the environment
        Sexpr::Symbol(name) => Ok(env.borrow().get(name, node.span)?),

        // 2. Self-evaluating atoms
        Sexpr::Number(_) | Sexpr::Procedure(_) | Sexpr::Unspecified => Ok(node),

        // 3. Lists: special forms, procedure calls, or the null value
        Sexpr::List(elements) => {
            if let [first, rest @ ..] = &elements[..] {
                match &first.kind {
                    Sexpr::Symbol(sym_name) if sym_name == "quote" => {
                        evaluate_quote(rest, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "if" => {
                        evaluate_if(rest, env, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "define" => {
                        evaluate_define(rest, env, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "set!" => {
                        evaluate_set(rest, env, node.span)
                    }
                    Sexpr::Symbol(sym_name) if sym_name == "func" || sym_name == "lambda" => {
                        evaluate_func(rest, env, node.span)
                    }
                    _ => evaluate_application(first, rest, env, node.span),
                }
            } else {
                // The empty list is the null value and evaluates to itself
                Ok(node)
            }
        }
    }
}

/// `(quote expr)`: the single operand, returned unevaluated.
fn evaluate_quote(operands: &[Node], span: Span) -> EvalResult {
    if let [node] = operands {
        Ok(node.clone())
    } else {
        Err(EvalError::InvalidSpecialForm(
            "quote expects exactly one argument".to_string(),
            span, // Span of the whole (quote ...) form
        ))
    }
}

/// `(if condition consequent alternate)`: evaluates the condition, then
/// exactly one branch. 0, 0.0 and () are the false values.
fn evaluate_if(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [condition, consequent, alternate] = operands {
        let condition_result = evaluate(condition.clone(), env.clone())?;
        if condition_result.kind.is_truthy() {
            evaluate(consequent.clone(), env)
        } else {
            evaluate(alternate.clone(), env)
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            "if expects condition, consequent and alternate".to_string(),
            span, // Span of the whole (if ...) form
        ))
    }
}

/// `(define symbol expr)`: evaluates expr in the current environment and
/// binds it in the *current* frame. Yields no useful value.
fn evaluate_define(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [target, value_expr] = operands {
        match &target.kind {
            Sexpr::Symbol(name) => {
                let value = evaluate(value_expr.clone(), env.clone())?;
                env.borrow_mut().define(name.clone(), value);
                Ok(Node::new_unspecified(span))
            }
            other => Err(EvalError::NotASymbol(other.clone(), target.span)),
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            "define expects a symbol and a value expression".to_string(),
            span,
        ))
    }
}

/// `(set! symbol expr)`: evaluates expr, then mutates the existing binding
/// in the nearest frame that defines it. Yields no useful value.
fn evaluate_set(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [target, value_expr] = operands {
        match &target.kind {
            Sexpr::Symbol(name) => {
                let value = evaluate(value_expr.clone(), env.clone())?;
                env.borrow_mut().set(name, value, target.span)?;
                Ok(Node::new_unspecified(span))
            }
            other => Err(EvalError::NotASymbol(other.clone(), target.span)),
        }
    } else {
        Err(EvalError::InvalidSpecialForm(
            "set! expects a symbol and a value expression".to_string(),
            span,
        ))
    }
}

/// `(func (params...) body)` / `(lambda (params...) body)`: builds a closure
/// capturing the current environment by reference, not by copy.
fn evaluate_func(operands: &[Node], env: Rc<RefCell<Environment>>, span: Span) -> EvalResult {
    if let [params_node, body] = operands {
        let params = match &params_node.kind {
            Sexpr::List(elements) => {
                let mut params = Vec::with_capacity(elements.len());
                for element in elements {
                    match &element.kind {
                        Sexpr::Symbol(name) => params.push(name.clone()),
                        other => {
                            return Err(EvalError::NotASymbol(other.clone(), element.span));
                        }
                    }
                }
                params
            }
            other => {
                return Err(EvalError::InvalidSpecialForm(
                    format!("func expects a parameter list, got {}", other.type_name()),
                    params_node.span,
                ));
            }
        };
        let lambda = Lambda {
            params,
            body: Rc::new(body.clone()),
            env,
        };
        Ok(Node::new(
            Sexpr::Procedure(Procedure::Lambda(lambda)),
            span,
        ))
    } else {
        Err(EvalError::InvalidSpecialForm(
            "func expects a parameter list and a body expression".to_string(),
            span,
        ))
    }
}

/// Generic application: evaluate the operator, evaluate every operand left
/// to right, then apply.
fn evaluate_application(
    operator: &Node,
    operands: &[Node],
    env: Rc<RefCell<Environment>>,
    span: Span,
) -> EvalResult {
    let operator_node = evaluate(operator.clone(), env.clone())?;

    let procedure = match operator_node.kind {
        Sexpr::Procedure(procedure) => procedure,
        other => return Err(EvalError::NotAProcedure(other, operator.span)),
    };

    let mut evaluated_args: Vec<Node> = Vec::with_capacity(operands.len());
    for operand_node in operands {
        evaluated_args.push(evaluate(operand_node.clone(), env.clone())?);
    }

    apply(procedure, evaluated_args, span)
}

/// Applies a procedure to already-evaluated arguments. Public so that
/// primitives like `map` and `call` can re-enter application.
pub fn apply(procedure: Procedure, args: Vec<Node>, span: Span) -> EvalResult {
    match procedure {
        Procedure::Primitive(func, _) => func(args, span),
        Procedure::Lambda(lambda) => {
            // The new frame's parent is the environment captured at the
            // definition site, never the caller's: lexical scoping.
            let frame =
                Environment::new_call_frame(&lambda.params, args, lambda.env.clone(), span)?;
            evaluate((*lambda.body).clone(), frame)
        }
    }
}
