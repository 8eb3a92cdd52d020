use crate::environment::EnvError;
use crate::evaluator::EvalError;
use crate::parser::ParseError;
use ariadne::{Label, Report, ReportKind, Source};

impl EvalError {
    pub fn pretty_print(&self, input: &str) {
        let report = match self {
            EvalError::Env(env_error) => match env_error {
                EnvError::UnboundVariable(symbol, span) => {
                    Report::build(ReportKind::Error, ("REPL", span.to_range()))
                        .with_message(format!("Unbound symbol `{}`", symbol))
                        .with_label(
                            Label::new(("REPL", span.to_range()))
                                .with_message("This symbol is not defined in the current scope"),
                        )
                }
                EnvError::ArityMismatch {
                    expected,
                    got,
                    span,
                } => Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("Wrong number of arguments")
                    .with_label(Label::new(("REPL", span.to_range())).with_message(format!(
                        "This call passes {} arguments to a procedure expecting {}",
                        got, expected
                    ))),
            },
            EvalError::NotAProcedure(sexpr, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("Not a procedure: {}", sexpr))
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("This expression cannot be called as a procedure"),
                    )
            }
            EvalError::InvalidArguments(message, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("Invalid arguments:")
                    .with_label(Label::new(("REPL", span.to_range())).with_message(message))
            }
            EvalError::NotASymbol(sexpr, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("Not a symbol: {}", sexpr))
                    .with_label(Label::new(("REPL", span.to_range())).with_message(format!(
                        "Expected a symbol but found a {}",
                        sexpr.type_name()
                    )))
            }
            EvalError::InvalidSpecialForm(message, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("Invalid special form: {}", message))
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("This special form is malformed or incomplete"),
                    )
            }
        };
        report
            .finish()
            .print(("REPL", Source::from(input)))
            .unwrap();
    }
}

impl ParseError {
    pub fn pretty_print(&self, input: &str) {
        let report = match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, ("REPL", found.span.to_range()))
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new(("REPL", found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::UnexpectedEof(expected) => {
                let range = input.len().saturating_sub(1)..input.len();
                Report::build(ReportKind::Error, ("REPL", range.clone()))
                    .with_message("Unexpected end of input")
                    .with_label(Label::new(("REPL", range)).with_message(format!(
                        "The input ends here; expected {}",
                        expected
                    )))
            }
        };
        report
            .finish()
            .print(("REPL", Source::from(input)))
            .unwrap();
    }
}
