use std::cell::RefCell;
use std::rc::Rc;

use rispy::TokenKind;
use rispy::environment::Environment;
use rispy::evaluator::{evaluate, special_form_identifiers};
use rispy::lexer::tokenize;
use rispy::parser::parse_str;
use rispy::types::Sexpr;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::HistoryHinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

const HISTORY_FILE: &str = "rispy_history.txt";

struct RispyCompleter {
    env: Rc<RefCell<Environment>>,
}

impl RispyCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        RispyCompleter { env }
    }
}

impl rustyline::completion::Completer for RispyCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let tokens = tokenize(&line[..pos]);
        let candidates = if let Some(TokenKind::Atom(prefix)) = tokens.last().map(|t| &t.kind) {
            self.env
                .borrow()
                .get_identifiers()
                .union(&special_form_identifiers())
                .filter_map(|id| {
                    if id.starts_with(prefix.as_str()) {
                        Some(id[prefix.len()..].to_string())
                    } else {
                        None
                    }
                })
                .collect()
        } else {
            vec![]
        };
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: RispyValidator,
    #[rustyline(Highlighter)]
    highlighter: RispyHighlighter,
    #[rustyline(Completer)]
    completer: RispyCompleter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
}

struct RispyValidator;

// Reports an input as Incomplete while parens are still open, so a form can
// span multiple lines before the evaluator sees it.
impl Validator for RispyValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let mut depth: i32 = 0;

        for (i, c) in input.chars().enumerate() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched ')' at position {}",
                            i
                        ))));
                    }
                }
                _ => {}
            }
        }

        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct RispyHighlighter;

impl Highlighter for RispyHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> std::borrow::Cow<'l, str> {
        let mut stack: Vec<usize> = Vec::new();
        let mut highlighted = String::new();

        for (i, c) in line.chars().enumerate() {
            match c {
                '(' => {
                    stack.push(highlighted.len());
                    highlighted.push(c);
                }
                ')' => {
                    if let Some(matching_pos) = stack.pop() {
                        if matching_pos == pos.saturating_sub(1) || i == pos.saturating_sub(1) {
                            // Blue for the matching pair under the cursor
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c));
                            highlighted.replace_range(
                                matching_pos..=matching_pos,
                                "\x1b[1;34m(\x1b[0m",
                            );
                        } else {
                            highlighted.push(c);
                        }
                    } else {
                        // Red for unmatched closing parens
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c));
                    }
                }
                _ => {
                    highlighted.push(c);
                }
            }
        }

        std::borrow::Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn main() -> rustyline::Result<()> {
    // The one optional CLI argument overrides the prompt string
    let prompt = std::env::args().nth(1).unwrap_or_else(|| "rispy> ".to_string());

    println!("rispy REPL v0.1.0");
    println!("Type 'exit' or press Ctrl-D to quit.");

    // One standard environment per session; definitions persist across lines
    let global_env = Environment::standard();
    let h = InputValidator {
        validator: RispyValidator,
        highlighter: RispyHighlighter,
        completer: RispyCompleter::new(global_env.clone()),
        hinter: HistoryHinter::new(),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(rustyline::EditMode::Vi)
        .build();
    let mut rl: Editor<InputValidator, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(HISTORY_FILE).is_err() {
        println!("No previous history.");
    }

    loop {
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match parse_str(trimmed_input) {
                    Ok(node) => {
                        match evaluate(node, global_env.clone()) {
                            Ok(result_node) => {
                                // define/set! yield no value; print nothing
                                if result_node.kind != Sexpr::Unspecified {
                                    println!("{}", result_node);
                                }
                            }
                            Err(e) => e.pretty_print(trimmed_input),
                        }
                    }
                    Err(parse_err) => parse_err.pretty_print(trimmed_input),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}
