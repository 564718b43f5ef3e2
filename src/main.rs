use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, Subcommand};

use brio_lang::ast::Stmt;
use brio_lang::lexer::Lexer;
use brio_lang::parser::Parser;
use brio_lang::runtime::{AssignPolicy, Interpreter};

#[derive(ClapParser)]
#[command(name = "brio", version, about = "The Brio programming language interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the token stream (debug)
    Tokenize {
        /// Path to .brio file
        file: PathBuf,
    },
    /// Parse and display the AST
    Parse {
        /// Path to .brio file
        file: PathBuf,
        /// Emit the AST as JSON
        #[arg(long)]
        json: bool,
    },
    /// Execute a script
    Run {
        /// Path to .brio file
        file: PathBuf,
        /// Reject assignment to names no scope defines
        #[arg(long)]
        strict_assign: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Tokenize { file } => cmd_tokenize(&file),
        Commands::Parse { file, json } => cmd_parse(&file, json),
        Commands::Run { file, strict_assign } => cmd_run(&file, strict_assign),
    };
    process::exit(exit_code);
}

const MAX_SOURCE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

fn read_source(path: &PathBuf) -> Result<(String, String), i32> {
    let filename = path.to_string_lossy().to_string();

    // Check file size before reading
    match std::fs::metadata(path) {
        Ok(meta) => {
            if meta.len() > MAX_SOURCE_SIZE {
                eprintln!(
                    "Error: file {} is too large ({} bytes, max {} bytes)",
                    filename,
                    meta.len(),
                    MAX_SOURCE_SIZE
                );
                return Err(1);
            }
        }
        Err(e) => {
            eprintln!("Error: cannot read file {}: {}", filename, e);
            return Err(1);
        }
    }

    match std::fs::read_to_string(path) {
        Ok(source) => Ok((source, filename)),
        Err(e) => {
            eprintln!("Error: cannot read file {}: {}", filename, e);
            Err(1)
        }
    }
}

fn lex_and_parse(path: &PathBuf) -> Result<Vec<Stmt>, i32> {
    let (source, filename) = read_source(path)?;

    let tokens = match Lexer::new(&source, &filename).tokenize() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            return Err(1);
        }
    };

    let statements = match Parser::new(tokens, &filename).parse() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            return Err(1);
        }
    };

    Ok(statements)
}

fn cmd_tokenize(path: &PathBuf) -> i32 {
    let (source, filename) = match read_source(path) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let tokens = match Lexer::new(&source, &filename).tokenize() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            return 1;
        }
    };

    for tok in &tokens {
        println!("{}", tok);
    }
    0
}

fn cmd_parse(path: &PathBuf, json: bool) -> i32 {
    let statements = match lex_and_parse(path) {
        Ok(r) => r,
        Err(code) => return code,
    };

    if json {
        match serde_json::to_string_pretty(&statements) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: cannot serialize AST: {}", e);
                return 1;
            }
        }
    } else {
        for stmt in &statements {
            println!("{:#?}", stmt);
        }
    }
    0
}

fn cmd_run(path: &PathBuf, strict_assign: bool) -> i32 {
    let statements = match lex_and_parse(path) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let policy = if strict_assign {
        AssignPolicy::Strict
    } else {
        AssignPolicy::AutoDefine
    };

    let mut interpreter = Interpreter::new().with_assign_policy(policy);
    match interpreter.interpret(&statements) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}
