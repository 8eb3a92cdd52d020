// Use the library crate (whose name is defined in Cargo.toml)
use rispy::Sexpr;
use rispy::environment::Environment;
use rispy::evaluator::evaluate;
use rispy::parser::parse_str;

// A small non-interactive run through the whole pipeline. The interactive
// REPL lives in src/bin/repl.rs.
fn main() {
    println!("Welcome to rispy!");

    let program = [
        "(define square (func (x) (* x x)))",
        "(map square (list 1 2 3 4))",
        "(define compose (func (f g) (func (x) (f (g x)))))",
        "((compose square abs) -3)",
        "(/ 1 2)",
    ];

    let env = Environment::standard();
    for input in program {
        println!("> {}", input);
        match parse_str(input) {
            Ok(node) => match evaluate(node, env.clone()) {
                Ok(result) => {
                    if result.kind != Sexpr::Unspecified {
                        println!("{}", result);
                    }
                }
                Err(e) => e.pretty_print(input),
            },
            Err(e) => e.pretty_print(input),
        }
    }
}
