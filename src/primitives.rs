use crate::evaluator::{EvalError, EvalResult, apply};
use crate::source::Span;
use crate::types::{Node, Number, Sexpr};

// Checks the number of arguments
macro_rules! check_arity {
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects exactly {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects at least {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
}

// Extracts a Number from a Node or returns an InvalidArguments error
macro_rules! expect_number {
    ($node:expr, $span:expr, $name:expr) => {
        match $node.kind {
            Sexpr::Number(n) => n,
            _ => {
                return Err(EvalError::InvalidArguments(
                    format!(
                        "Primitive '{}' expects number arguments, got {}",
                        $name,
                        $node.kind.type_name()
                    ),
                    $span,
                ));
            }
        }
    };
}

// Extracts the element vector of a list argument
macro_rules! expect_list {
    ($node:expr, $span:expr, $name:expr) => {
        match &$node.kind {
            Sexpr::List(elements) => elements,
            _ => {
                return Err(EvalError::InvalidArguments(
                    format!(
                        "Primitive '{}' expects a list, got {}",
                        $name,
                        $node.kind.type_name()
                    ),
                    $span,
                ));
            }
        }
    };
}

// Extracts a procedure argument (for map/call)
macro_rules! expect_procedure {
    ($node:expr, $span:expr, $name:expr) => {
        match &$node.kind {
            Sexpr::Procedure(procedure) => procedure.clone(),
            _ => {
                return Err(EvalError::InvalidArguments(
                    format!(
                        "Primitive '{}' expects a procedure, got {}",
                        $name,
                        $node.kind.type_name()
                    ),
                    $span,
                ));
            }
        }
    };
}

// The language has no boolean type; predicates and comparisons answer with
// the integers 1 and 0, which the truthiness rule treats as true and false.
fn bool_node(value: bool, span: Span) -> Node {
    Node::new_int(value as i64, span)
}

// --- Numeric helpers: Int stays Int until a Float joins in ---

fn numeric_add(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Number::Int(x + y),
        _ => Number::Float(a.as_f64() + b.as_f64()),
    }
}

fn numeric_sub(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Number::Int(x - y),
        _ => Number::Float(a.as_f64() - b.as_f64()),
    }
}

fn numeric_mul(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Number::Int(x * y),
        _ => Number::Float(a.as_f64() * b.as_f64()),
    }
}

fn fold_numbers<F: Fn(Number, Number) -> Number>(
    args: Vec<Node>,
    span: Span,
    start: Number,
    func: F,
    operator: &str,
) -> EvalResult {
    let mut acc = start;
    for node in args.iter() {
        let num = expect_number!(node, span, operator);
        acc = func(acc, num);
    }
    Ok(Node::new_number(acc, span))
}

pub fn prim_add(args: Vec<Node>, span: Span) -> EvalResult {
    // (+) -> 0
    // (+ 1 2 3) -> 6
    fold_numbers(args, span, Number::Int(0), numeric_add, "+")
}

pub fn prim_sub(args: Vec<Node>, span: Span) -> EvalResult {
    // (- x) -> -x
    // (- x y z) -> x - y - z
    check_arity!(args, min 1, span, "-");
    let first = expect_number!(&args[0], span, "-");

    if args.len() == 1 {
        let negated = match first {
            Number::Int(n) => Number::Int(-n),
            Number::Float(n) => Number::Float(-n),
        };
        Ok(Node::new_number(negated, span))
    } else {
        fold_numbers(args[1..].to_vec(), span, first, numeric_sub, "-")
    }
}

pub fn prim_mul(args: Vec<Node>, span: Span) -> EvalResult {
    // (*) -> 1
    // (* 2 3 4) -> 24
    fold_numbers(args, span, Number::Int(1), numeric_mul, "*")
}

pub fn prim_div(args: Vec<Node>, span: Span) -> EvalResult {
    // True division: the result is always a float, (/ 1 2) -> 0.5.
    // (/ x) -> 1/x
    // (/ x y z) -> x / y / z
    check_arity!(args, min 1, span, "/");
    let first = expect_number!(&args[0], span, "/");

    if args.len() == 1 {
        if first.is_zero() {
            return Err(EvalError::InvalidArguments(
                "Division by zero: (/ 0)".to_string(),
                span,
            ));
        }
        Ok(Node::new_float(1.0 / first.as_f64(), span))
    } else {
        let mut result = first.as_f64();
        for node in args.iter().skip(1) {
            let num = expect_number!(node, span, "/");
            if num.is_zero() {
                return Err(EvalError::InvalidArguments(
                    "Division by zero".to_string(),
                    node.span,
                ));
            }
            result /= num.as_f64();
        }
        Ok(Node::new_float(result, span))
    }
}

// --- Comparisons: chained over all arguments, Int/Float compared numerically ---

fn compare_numbers<F: Fn(f64, f64) -> bool>(
    args: Vec<Node>,
    span: Span,
    compare: F,
    operator: &str,
) -> EvalResult {
    // (< n1 n2 ...) -> 1 iff the relation holds between every adjacent pair
    check_arity!(args, min 2, span, operator);
    let mut last_val = expect_number!(&args[0], span, operator).as_f64();
    let mut result = true;
    for arg in args.iter().skip(1) {
        let val = expect_number!(arg, span, operator).as_f64();
        result = result && compare(last_val, val);
        last_val = val;
    }
    Ok(bool_node(result, span))
}

pub fn prim_equals(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left == right, "=")
}

pub fn prim_less_than(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left < right, "<")
}

pub fn prim_less_than_or_equals(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left <= right, "<=")
}

pub fn prim_greater_than(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left > right, ">")
}

pub fn prim_greater_than_or_equals(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left >= right, ">=")
}

pub fn prim_abs(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "abs");
    let result = match expect_number!(&args[0], span, "abs") {
        Number::Int(n) => Number::Int(n.abs()),
        Number::Float(n) => Number::Float(n.abs()),
    };
    Ok(Node::new_number(result, span))
}

fn select_number<F: Fn(f64, f64) -> bool>(
    args: Vec<Node>,
    span: Span,
    wins: F,
    operator: &str,
) -> EvalResult {
    // Returns the winning operand itself, keeping its numeric kind
    check_arity!(args, min 1, span, operator);
    let mut best = expect_number!(&args[0], span, operator);
    for node in args.iter().skip(1) {
        let num = expect_number!(node, span, operator);
        if wins(num.as_f64(), best.as_f64()) {
            best = num;
        }
    }
    Ok(Node::new_number(best, span))
}

pub fn prim_max(args: Vec<Node>, span: Span) -> EvalResult {
    select_number(args, span, |candidate, best| candidate > best, "max")
}

pub fn prim_min(args: Vec<Node>, span: Span) -> EvalResult {
    select_number(args, span, |candidate, best| candidate < best, "min")
}

pub fn prim_round(args: Vec<Node>, span: Span) -> EvalResult {
    // Rounds to the nearest integer, ties to even
    check_arity!(args, 1, span, "round");
    let result = match expect_number!(&args[0], span, "round") {
        Number::Int(n) => n,
        Number::Float(n) => n.round_ties_even() as i64,
    };
    Ok(Node::new_int(result, span))
}

// --- List Primitives ---

pub fn prim_head(args: Vec<Node>, span: Span) -> EvalResult {
    // (head list) -> first item; the empty list has no head
    check_arity!(args, 1, span, "head");
    let elements = expect_list!(&args[0], span, "head");
    match elements.first() {
        Some(first) => Ok(first.clone()),
        None => Err(EvalError::InvalidArguments(
            "head: the empty list has no head".to_string(),
            args[0].span,
        )),
    }
}

pub fn prim_tail(args: Vec<Node>, span: Span) -> EvalResult {
    // (tail list) -> everything after the first item; total on lists, the
    // tail of () is ()
    check_arity!(args, 1, span, "tail");
    let elements = expect_list!(&args[0], span, "tail");
    let rest: Vec<Node> = elements.iter().skip(1).cloned().collect();
    Ok(Node::new_list(rest, span))
}

pub fn prim_pair(args: Vec<Node>, span: Span) -> EvalResult {
    // (pair item list) -> [item, ..list]
    check_arity!(args, 2, span, "pair");
    let rest = expect_list!(&args[1], span, "pair");
    let mut elements = Vec::with_capacity(rest.len() + 1);
    elements.push(args[0].clone());
    elements.extend(rest.iter().cloned());
    Ok(Node::new_list(elements, span))
}

pub fn prim_list(args: Vec<Node>, span: Span) -> EvalResult {
    // (list item1 item2 ...) -> new list containing the evaluated items;
    // (list) -> ()
    Ok(Node::new_list(args, span))
}

pub fn prim_length(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "length");
    let elements = expect_list!(&args[0], span, "length");
    Ok(Node::new_int(elements.len() as i64, span))
}

pub fn prim_append(args: Vec<Node>, span: Span) -> EvalResult {
    // (append l1 l2 ...) -> one list with the elements of every argument
    let mut elements = Vec::new();
    for arg in args.iter() {
        let list = expect_list!(arg, span, "append");
        elements.extend(list.iter().cloned());
    }
    Ok(Node::new_list(elements, span))
}

pub fn prim_map(args: Vec<Node>, span: Span) -> EvalResult {
    // (map proc list) -> list of results, in argument order
    check_arity!(args, 2, span, "map");
    let procedure = expect_procedure!(&args[0], span, "map");
    let elements = expect_list!(&args[1], span, "map");
    let mut mapped = Vec::with_capacity(elements.len());
    for element in elements {
        mapped.push(apply(procedure.clone(), vec![element.clone()], span)?);
    }
    Ok(Node::new_list(mapped, span))
}

pub fn prim_call(args: Vec<Node>, span: Span) -> EvalResult {
    // (call proc args-list) -> proc applied to the list's elements
    check_arity!(args, 2, span, "call");
    let procedure = expect_procedure!(&args[0], span, "call");
    let call_args = expect_list!(&args[1], span, "call").clone();
    apply(procedure, call_args, span)
}

// --- Equality ---

// eq? is identity: atoms compare by value and numeric kind, procedures by
// shared pointers. Two lists are never eq?, since values here have no object
// identity, only structure (which is equal?'s job).
fn identical(a: &Sexpr, b: &Sexpr) -> bool {
    match (a, b) {
        (Sexpr::Number(x), Sexpr::Number(y)) => x == y,
        (Sexpr::Symbol(x), Sexpr::Symbol(y)) => x == y,
        (Sexpr::Procedure(x), Sexpr::Procedure(y)) => x == y,
        (Sexpr::Unspecified, Sexpr::Unspecified) => true,
        _ => false,
    }
}

// equal? is structural; numbers compare numerically across kinds, so
// (equal? 1 1.0) holds even though (eq? 1 1.0) does not.
fn equal_values(a: &Sexpr, b: &Sexpr) -> bool {
    match (a, b) {
        (Sexpr::Number(x), Sexpr::Number(y)) => x.as_f64() == y.as_f64(),
        (Sexpr::List(xs), Sexpr::List(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| equal_values(&x.kind, &y.kind))
        }
        (Sexpr::Symbol(x), Sexpr::Symbol(y)) => x == y,
        (Sexpr::Procedure(x), Sexpr::Procedure(y)) => x == y,
        (Sexpr::Unspecified, Sexpr::Unspecified) => true,
        _ => false,
    }
}

pub fn prim_is_eq(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "eq?");
    Ok(bool_node(identical(&args[0].kind, &args[1].kind), span))
}

pub fn prim_is_equal(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 2, span, "equal?");
    Ok(bool_node(equal_values(&args[0].kind, &args[1].kind), span))
}

// --- Type Predicates ---

macro_rules! type_predicate {
    ($fn_name:ident, $pattern:pat, $name:literal) => {
        pub fn $fn_name(args: Vec<Node>, span: Span) -> EvalResult {
            check_arity!(args, 1, span, $name);
            Ok(bool_node(matches!(args[0].kind, $pattern), span))
        }
    };
}

type_predicate!(prim_is_list, Sexpr::List(_), "list?");
type_predicate!(prim_is_number, Sexpr::Number(_), "number?");
type_predicate!(prim_is_symbol, Sexpr::Symbol(_), "symbol?");
type_predicate!(prim_is_procedure, Sexpr::Procedure(_), "procedure?");

pub fn prim_is_null(args: Vec<Node>, span: Span) -> EvalResult {
    // (null? obj) -> 1 iff obj is the empty list
    check_arity!(args, 1, span, "null?");
    let is_null = matches!(&args[0].kind, Sexpr::List(elements) if elements.is_empty());
    Ok(bool_node(is_null, span))
}

pub fn prim_not(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "not");
    Ok(bool_node(!args[0].kind.is_truthy(), span))
}

// --- Sequencing ---

pub fn prim_begin(mut args: Vec<Node>, span: Span) -> EvalResult {
    // Not a special form: the arguments were already evaluated left to
    // right by the time we get here, so this just keeps the last one.
    match args.pop() {
        Some(last) => Ok(last),
        None => Err(EvalError::InvalidArguments(
            "Primitive 'begin' expects at least 1 arguments, got 0".to_string(),
            span,
        )),
    }
}

// --- Math functions (single-argument, from the host float library) ---

macro_rules! math_primitive {
    ($fn_name:ident, $method:ident, $name:literal) => {
        pub fn $fn_name(args: Vec<Node>, span: Span) -> EvalResult {
            check_arity!(args, 1, span, $name);
            let num = expect_number!(&args[0], span, $name);
            Ok(Node::new_float(num.as_f64().$method(), span))
        }
    };
}

math_primitive!(prim_sin, sin, "sin");
math_primitive!(prim_cos, cos, "cos");
math_primitive!(prim_tan, tan, "tan");
math_primitive!(prim_asin, asin, "asin");
math_primitive!(prim_acos, acos, "acos");
math_primitive!(prim_atan, atan, "atan");
math_primitive!(prim_sinh, sinh, "sinh");
math_primitive!(prim_cosh, cosh, "cosh");
math_primitive!(prim_tanh, tanh, "tanh");
math_primitive!(prim_exp, exp, "exp");
math_primitive!(prim_sqrt, sqrt, "sqrt");
math_primitive!(prim_log, ln, "log");
math_primitive!(prim_log2, log2, "log2");
math_primitive!(prim_log10, log10, "log10");

pub fn prim_floor(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "floor");
    let num = expect_number!(&args[0], span, "floor");
    Ok(Node::new_int(num.as_f64().floor() as i64, span))
}

pub fn prim_ceil(args: Vec<Node>, span: Span) -> EvalResult {
    check_arity!(args, 1, span, "ceil");
    let num = expect_number!(&args[0], span, "ceil");
    Ok(Node::new_int(num.as_f64().ceil() as i64, span))
}
