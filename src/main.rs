//! Cinder CLI and REPL
//!
//! Usage:
//!   cinder run <file.cin>   - Execute a Cinder file
//!   cinder repl             - Start interactive REPL
//!   cinder help             - Show help message

use std::env;
use std::fs;
use std::process;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use cinder::{ErrorKind, Interpreter, Value, VERSION};

fn main() {
    cinder::init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "run" => {
            if args.len() < 3 {
                eprintln!("{}: missing file argument", "error".red());
                eprintln!("Usage: cinder run <file.cin>");
                process::exit(1);
            }
            run_file(&args[2]);
        }
        "repl" => run_repl(),
        "help" | "--help" | "-h" => print_help(),
        "version" | "--version" | "-v" => println!("Cinder {}", VERSION),
        _ => {
            if args[1].ends_with(".cin") {
                run_file(&args[1]);
            } else {
                eprintln!("{}: unknown command '{}'", "error".red(), args[1]);
                print_help();
                process::exit(1);
            }
        }
    }
}

fn print_help() {
    println!("{}", "Cinder".cyan().bold());
    println!("A small imperative scripting language");
    println!("{} {}\n", "Version".cyan(), VERSION);
    println!("{}", "USAGE:".yellow());
    println!("  cinder run <file.cin>    Execute a Cinder file");
    println!("  cinder repl              Start interactive REPL");
    println!("  cinder help              Show this help message");
    println!("  cinder version           Show version\n");
    println!("{}", "ENVIRONMENT:".yellow());
    println!("  RUST_LOG=cinder=debug    Log parser and interpreter activity\n");
    println!("{}", "LANGUAGE FEATURES:".yellow());
    print_language_examples();
}

fn print_language_examples() {
    println!("  var x = 10;                          Declaration");
    println!("  x = x + 1;                           Assignment");
    println!("  if (x > 5) : print(x); else : print(0); end");
    println!("  for (var i = 0; i < 3; i++) : print(i); end");
    println!("  func add(a, b) : return a + b; end");
    println!("  var xs = [1, 2, 3]; xs[-1] = 9;      Arrays");
}

fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{}: cannot read file '{}': {}", "error".red(), path, e);
            process::exit(1);
        }
    };

    debug!(path, bytes = source.len(), "running file");

    let program = match cinder::parse(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.with_source(&source));
            process::exit(1);
        }
    };

    let mut interpreter = Interpreter::new();
    if let Err(e) = interpreter.interpret(&program) {
        eprintln!("{}", e.with_source(&source));
        process::exit(1);
    }
}

fn run_repl() {
    println!(
        "{} {} - {}",
        "Cinder".cyan().bold(),
        VERSION.cyan(),
        "A small imperative scripting language".dimmed()
    );
    println!("Type {} to exit, {} for help\n", "exit".yellow(), "help".yellow());

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}: cannot start REPL: {}", "error".red(), e);
            process::exit(1);
        }
    };

    // Globals persist across REPL entries
    let mut interpreter = Interpreter::new();
    // Lines of a statement still missing its end
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() {
            format!("{} ", "cin>".green().bold())
        } else {
            format!("{} ", "...>".dimmed())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if pending.is_empty() {
                    if trimmed.is_empty() {
                        continue;
                    }

                    match trimmed {
                        "exit" | "quit" => {
                            println!("{}", "Goodbye!".cyan());
                            break;
                        }
                        "help" => {
                            print_repl_help();
                            continue;
                        }
                        "clear" => {
                            interpreter = Interpreter::new();
                            println!("{}", "State cleared.".dimmed());
                            continue;
                        }
                        "vars" => {
                            print_globals(&interpreter);
                            continue;
                        }
                        _ => {}
                    }
                }

                let _ = rl.add_history_entry(trimmed);
                pending.push_str(&line);
                pending.push('\n');

                let program = match cinder::parse(&pending) {
                    Ok(p) => p,
                    Err(e) if matches!(e.kind, ErrorKind::UnexpectedEof(_)) => continue,
                    Err(e) => {
                        eprintln!("{}", e.with_source(&pending).to_string().red());
                        pending.clear();
                        continue;
                    }
                };

                if let Err(e) = interpreter.interpret(&program) {
                    eprintln!("{}", e.with_source(&pending).to_string().red());
                }
                pending.clear();
            }
            Err(ReadlineError::Interrupted) => {
                // drop a half-typed block
                pending.clear();
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }
}

fn print_globals(interpreter: &Interpreter) {
    let env = interpreter.environment();
    for name in env.local_names() {
        match env.get(&name) {
            Ok(Value::Builtin(_)) | Err(_) => {}
            Ok(value) => println!("  {} = {}", name.cyan(), value.repr()),
        }
    }
}

fn print_repl_help() {
    println!("{}", "REPL Commands:".yellow());
    println!("  exit, quit   Exit the REPL");
    println!("  clear        Reset all globals");
    println!("  vars         List global variables");
    println!("  help         Show this help\n");
    println!("Unfinished blocks continue on the next line.\n");
    println!("{}", "Language Examples:".yellow());
    print_language_examples();
}
