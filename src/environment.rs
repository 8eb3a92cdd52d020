use crate::primitives;
use crate::source::Span;
use crate::types::{Node, Number, PrimitiveFunc};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Unbound variable: '{0}'")]
    UnboundVariable(String, Span), // Symbol name, span where lookup happened
    #[error("Procedure expects {expected} arguments, got {got}")]
    ArityMismatch {
        expected: usize,
        got: usize,
        span: Span,
    },
}

// --- Environment Definition ---

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    // Rc<RefCell<...>> for shared ownership and interior mutability: closures
    // keep their defining frame alive, and 'set!' mutates it in place.
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Node>, // Maps variable names to Nodes
}

impl Environment {
    /// Creates a new, empty, top-level environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: None,
            bindings: HashMap::new(),
        }))
    }

    /// The standard environment: a fresh global frame holding the whole
    /// primitive table and the math constants. There is no process-wide
    /// singleton; each interpreter session owns one of these.
    pub fn standard() -> Rc<RefCell<Environment>> {
        let env_ptr = Environment::new();
        {
            // Borrow mutably only inside this scope
            let mut env = env_ptr.borrow_mut();

            // Arithmetic and comparison
            env.add_primitive("+", primitives::prim_add);
            env.add_primitive("-", primitives::prim_sub);
            env.add_primitive("*", primitives::prim_mul);
            env.add_primitive("/", primitives::prim_div);
            env.add_primitive("=", primitives::prim_equals);
            env.add_primitive("<", primitives::prim_less_than);
            env.add_primitive("<=", primitives::prim_less_than_or_equals);
            env.add_primitive(">", primitives::prim_greater_than);
            env.add_primitive(">=", primitives::prim_greater_than_or_equals);
            env.add_primitive("abs", primitives::prim_abs);
            env.add_primitive("max", primitives::prim_max);
            env.add_primitive("min", primitives::prim_min);
            env.add_primitive("round", primitives::prim_round);

            // List operations; head/tail/pair carry car/cdr/cons aliases
            env.add_primitive("head", primitives::prim_head);
            env.add_primitive("car", primitives::prim_head);
            env.add_primitive("tail", primitives::prim_tail);
            env.add_primitive("cdr", primitives::prim_tail);
            env.add_primitive("pair", primitives::prim_pair);
            env.add_primitive("cons", primitives::prim_pair);
            env.add_primitive("list", primitives::prim_list);
            env.add_primitive("length", primitives::prim_length);
            env.add_primitive("append", primitives::prim_append);
            env.add_primitive("map", primitives::prim_map);
            env.add_primitive("call", primitives::prim_call);

            // Equality and type predicates
            env.add_primitive("eq?", primitives::prim_is_eq);
            env.add_primitive("equal?", primitives::prim_is_equal);
            env.add_primitive("list?", primitives::prim_is_list);
            env.add_primitive("number?", primitives::prim_is_number);
            env.add_primitive("symbol?", primitives::prim_is_symbol);
            env.add_primitive("procedure?", primitives::prim_is_procedure);
            env.add_primitive("func?", primitives::prim_is_procedure);
            env.add_primitive("null?", primitives::prim_is_null);
            env.add_primitive("not", primitives::prim_not);

            // Sequencing (a variadic primitive, not a special form)
            env.add_primitive("begin", primitives::prim_begin);

            // Single-argument math functions
            env.add_primitive("sin", primitives::prim_sin);
            env.add_primitive("cos", primitives::prim_cos);
            env.add_primitive("tan", primitives::prim_tan);
            env.add_primitive("asin", primitives::prim_asin);
            env.add_primitive("acos", primitives::prim_acos);
            env.add_primitive("atan", primitives::prim_atan);
            env.add_primitive("sinh", primitives::prim_sinh);
            env.add_primitive("cosh", primitives::prim_cosh);
            env.add_primitive("tanh", primitives::prim_tanh);
            env.add_primitive("exp", primitives::prim_exp);
            env.add_primitive("sqrt", primitives::prim_sqrt);
            env.add_primitive("log", primitives::prim_log);
            env.add_primitive("log2", primitives::prim_log2);
            env.add_primitive("log10", primitives::prim_log10);
            env.add_primitive("floor", primitives::prim_floor);
            env.add_primitive("ceil", primitives::prim_ceil);

            // Math constants
            env.add_constant("pi", std::f64::consts::PI);
            env.add_constant("e", std::f64::consts::E);
            env.add_constant("tau", std::f64::consts::TAU);
            env.add_constant("inf", f64::INFINITY);
            env.add_constant("nan", f64::NAN);
        }
        env_ptr
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: HashMap::new(),
        }))
    }

    /// Creates the frame for a procedure call: each parameter bound to the
    /// argument at the same position, enclosed in the environment the
    /// procedure captured at its definition site. A length mismatch is an
    /// error rather than a silent truncation.
    pub fn new_call_frame(
        params: &[String],
        args: Vec<Node>,
        outer_env: Rc<RefCell<Environment>>,
        call_span: Span,
    ) -> Result<Rc<RefCell<Environment>>, EnvError> {
        if params.len() != args.len() {
            return Err(EnvError::ArityMismatch {
                expected: params.len(),
                got: args.len(),
                span: call_span,
            });
        }
        let frame = Environment::new_enclosed(outer_env);
        {
            let mut env = frame.borrow_mut();
            for (param, arg) in params.iter().zip(args) {
                env.define(param.clone(), arg);
            }
        }
        Ok(frame)
    }

    /// Defines a variable in the *current* environment frame.
    /// Replaces the value if the variable already exists in this frame.
    pub fn define(&mut self, name: String, value_node: Node) {
        self.bindings.insert(name, value_node);
    }

    /// Looks up a variable's value.
    /// Checks the current environment first, then walks up the outer chain.
    /// `lookup_span` is where the variable was referenced, for error reporting.
    pub fn get(&self, name: &str, lookup_span: Span) -> Result<Node, EnvError> {
        if let Some(value_node) = self.bindings.get(name) {
            Ok(value_node.clone())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().get(name, lookup_span),
                None => Err(EnvError::UnboundVariable(name.to_string(), lookup_span)),
            }
        }
    }

    /// Sets the value of an *existing* variable: searches outward from the
    /// current environment and mutates the binding in the first frame where
    /// the variable is found. Errors if no frame defines it.
    pub fn set(&mut self, name: &str, value_node: Node, set_span: Span) -> Result<(), EnvError> {
        if let Some(value_mut) = self.bindings.get_mut(name) {
            *value_mut = value_node;
            Ok(())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow_mut().set(name, value_node, set_span),
                None => Err(EnvError::UnboundVariable(name.to_string(), set_span)),
            }
        }
    }

    /// Helper to add a primitive procedure to the environment.
    fn add_primitive(&mut self, name: &str, func: PrimitiveFunc) {
        let node = Node::new_primitive(func, name, Span::default());
        self.define(name.to_string(), node);
    }

    /// Helper to bind a float constant (pi, e, ...).
    fn add_constant(&mut self, name: &str, value: f64) {
        let node = Node::new_number(Number::Float(value), Span::default());
        self.define(name.to_string(), node);
    }

    fn add_identifiers(&self, mut identifiers: HashSet<String>) -> HashSet<String> {
        for identifier in self.bindings.keys() {
            identifiers.insert(identifier.to_string());
        }
        identifiers
    }

    /// Gets the names bound anywhere along the chain (used for completion).
    pub fn get_identifiers(&self) -> HashSet<String> {
        let identifiers = self.bindings.keys().map(|i| i.to_string()).collect();
        match self.outer {
            Some(ref outer_env_ptr) => outer_env_ptr.borrow().add_identifiers(identifiers),
            None => identifiers,
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    // Helper to create a dummy node with default span
    fn num_node(n: i64) -> Node {
        Node::new_int(n, Span::default())
    }

    fn sym_node(s: &str) -> Node {
        Node::new_symbol(s, Span::default())
    }

    #[test]
    fn test_define_and_get_global() {
        let env = Environment::new();
        env.borrow_mut().define("x".to_string(), num_node(10));

        let result = env.borrow().get("x", Span::default());
        assert_eq!(result, Ok(num_node(10)));
    }

    #[test]
    fn test_get_unbound_global() {
        let env = Environment::new();
        let result = env.borrow().get("y", Span::default());
        assert!(matches!(result, Err(EnvError::UnboundVariable(s, _)) if s == "y"));
    }

    #[test]
    fn test_define_and_get_enclosed() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x".to_string(), num_node(10)); // Define x globally

        let local_env = Environment::new_enclosed(global_env);
        local_env.borrow_mut().define("y".to_string(), num_node(20)); // Define y locally

        // Get local var y
        assert_eq!(local_env.borrow().get("y", Span::default()), Ok(num_node(20)));

        // Get global var x from local scope
        assert_eq!(local_env.borrow().get("x", Span::default()), Ok(num_node(10)));
    }

    #[test]
    fn test_get_unbound_enclosed() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env);

        let span = Span::new(11, 12);
        let result = local_env.borrow().get("z", span);
        assert_eq!(result, Err(EnvError::UnboundVariable("z".to_string(), span)));
    }

    #[test]
    fn test_shadowing() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x".to_string(), num_node(10));

        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().define("x".to_string(), num_node(50)); // Shadow global x

        let inner_local_env = Environment::new_enclosed(local_env.clone());
        inner_local_env
            .borrow_mut()
            .define("y".to_string(), sym_node("y-value"));

        // Get x from inner local (should be 50 from local_env)
        assert_eq!(
            inner_local_env.borrow().get("x", Span::default()),
            Ok(num_node(50))
        );

        // Get y from inner local
        assert_eq!(
            inner_local_env.borrow().get("y", Span::default()),
            Ok(sym_node("y-value"))
        );

        // Get x from global (should still be 10)
        assert_eq!(global_env.borrow().get("x", Span::default()), Ok(num_node(10)));
    }

    #[test]
    fn test_set_in_current_frame() {
        let env = Environment::new();
        env.borrow_mut().define("x".to_string(), num_node(1));

        assert_eq!(
            env.borrow_mut().set("x", num_node(2), Span::default()),
            Ok(())
        );
        assert_eq!(env.borrow().get("x", Span::default()), Ok(num_node(2)));
    }

    #[test]
    fn test_set_mutates_defining_frame() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x".to_string(), num_node(1));

        let local_env = Environment::new_enclosed(global_env.clone());

        // set! from the inner frame must mutate the frame that holds the
        // binding, not create a local shadow
        assert_eq!(
            local_env.borrow_mut().set("x", num_node(99), Span::default()),
            Ok(())
        );
        assert_eq!(global_env.borrow().get("x", Span::default()), Ok(num_node(99)));
        assert!(!local_env.borrow().bindings.contains_key("x"));
    }

    #[test]
    fn test_set_unbound_error() {
        let env = Environment::new();
        let result = env.borrow_mut().set("nope", num_node(1), Span::default());
        assert!(matches!(result, Err(EnvError::UnboundVariable(s, _)) if s == "nope"));
    }

    #[test]
    fn test_call_frame_binds_positionally() {
        let outer = Environment::new();
        let params = vec!["a".to_string(), "b".to_string()];
        let frame = Environment::new_call_frame(
            &params,
            vec![num_node(1), num_node(2)],
            outer,
            Span::default(),
        )
        .expect("matching lengths should bind");

        assert_eq!(frame.borrow().get("a", Span::default()), Ok(num_node(1)));
        assert_eq!(frame.borrow().get("b", Span::default()), Ok(num_node(2)));
    }

    #[test]
    fn test_call_frame_arity_mismatch() {
        let outer = Environment::new();
        let params = vec!["a".to_string(), "b".to_string()];
        let result =
            Environment::new_call_frame(&params, vec![num_node(1)], outer, Span::default());
        assert_eq!(
            result,
            Err(EnvError::ArityMismatch {
                expected: 2,
                got: 1,
                span: Span::default(),
            })
        );
    }

    #[test]
    fn test_standard_env_has_primitives_and_constants() {
        let env = Environment::standard();
        for name in ["+", "car", "map", "begin", "sqrt", "pi"] {
            assert!(
                env.borrow().get(name, Span::default()).is_ok(),
                "'{}' missing from the standard environment",
                name
            );
        }
        let identifiers = env.borrow().get_identifiers();
        assert!(identifiers.contains("equal?"));
        assert!(identifiers.contains("tau"));
    }
}
