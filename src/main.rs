use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, WrapErr};
use smartcalc::{eval_expr, lexer::Lexer, parse, Evaluator, Number};
use std::{fs, path::PathBuf, process::ExitCode};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the token stream of an expression.
    Tokenize(Input),
    /// Print the parsed tree of an expression, fully parenthesized.
    Parse(Input),
    /// Evaluate statements in order; variables carry over between them.
    Eval {
        #[arg(required = true)]
        statements: Vec<String>,

        /// Add or replace a constant, e.g. `--const g=9.81`.
        #[arg(long = "const", value_name = "NAME=EXPR", value_parser = parse_constant)]
        constants: Vec<(String, Number)>,

        /// Render errors with miette's graphical report.
        #[arg(short, long)]
        report: bool,
    },
}

#[derive(Args, Debug)]
struct Input {
    expr: Option<String>,

    #[arg(short, long, conflicts_with = "expr")]
    file: Option<PathBuf>,
}

impl Input {
    fn read(self) -> miette::Result<String> {
        match (self.expr, self.file) {
            (_, Some(filename)) => fs::read_to_string(&filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading '{}' failed", filename.display())),
            (Some(expr), None) => Ok(expr),
            (None, None) => Err(miette::miette!("expected an expression or --file")),
        }
    }
}

fn parse_constant(arg: &str) -> Result<(String, Number), String> {
    let (name, expr) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=EXPR, got '{arg}'"))?;
    let value = eval_expr(expr, std::iter::empty::<(&str, Number)>())
        .map_err(|err| err.render(expr))?;
    Ok((name.trim().to_string(), value))
}

fn main() -> miette::Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tokenize(input) => {
            let source = input.read()?;
            for token in Lexer::new(&source) {
                match token {
                    Ok(token) => println!("{token:?}"),
                    Err(err) => {
                        eprintln!("{}", err.render(&source));
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
        }
        Commands::Parse(input) => {
            let source = input.read()?;
            match parse(&source) {
                Ok(node) => println!("{node}"),
                Err(err) => {
                    eprintln!("{}", err.render(&source));
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Eval {
            statements,
            constants,
            report,
        } => {
            let mut evaluator = Evaluator::with_constants(constants);
            let mut failed = false;

            for statement in &statements {
                let result = parse(statement).and_then(|node| evaluator.eval(&node));
                match result {
                    Ok(value) => println!("{}", value.normalized()),
                    Err(err) if report => {
                        failed = true;
                        eprintln!("{:?}", err.into_report(statement));
                    }
                    Err(err) => {
                        failed = true;
                        eprintln!("error: {}", err.render(statement));
                    }
                }
            }

            if failed {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
