use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser as ClapParser};

use rill::{format_source, tokenize, Parser, Registry, Runtime, Value};

#[derive(ClapParser, Debug)]
#[command(name = "rill", version, about = "A dynamically typed scripting language")]
struct Cli {
    /// Dump the token stream as JSON instead of running.
    #[arg(long)]
    lexer: bool,

    /// Dump the parsed AST as JSON instead of running.
    #[arg(long)]
    parser: bool,

    /// Pretty-print the script instead of running.
    #[arg(long)]
    format: bool,

    /// Script file to run.
    script: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let Some(path) = cli.script else {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    };

    let source = fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file = path.to_string_lossy().into_owned();

    if cli.lexer {
        let tokens = tokenize(&source, &file);
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.parser {
        return match Parser::with_file(&source, file.as_str()).parse() {
            Ok(block) => {
                println!("{}", serde_json::to_string_pretty(&block)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(error) => {
                eprintln!("{error}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    if cli.format {
        return match format_source(&source, &file) {
            Ok(formatted) => {
                print!("{formatted}");
                Ok(ExitCode::SUCCESS)
            }
            Err(error) => {
                eprintln!("{error}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let block = match Parser::with_file(&source, file.as_str()).parse() {
        Ok(block) => block,
        Err(error) => {
            eprintln!("{error}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let mut runtime = Runtime::new(Registry::with_defaults());
    let result = runtime.run(&block);
    print!("{}", runtime.output());
    match result {
        Ok(Value::Nil) => Ok(ExitCode::SUCCESS),
        Ok(value) => {
            println!("{}", value.render());
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!("{error}");
            Ok(ExitCode::FAILURE)
        }
    }
}
