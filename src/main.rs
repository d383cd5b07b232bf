use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use js_expression_eval::{EvalOptions, Evaluator, Node, Value};
use tracing::Level;

/// Evaluate a JavaScript-like expression against a JSON context.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Expression text, or a JSON syntax tree when --tree is given.
    expression: String,
    /// Context as inline JSON.
    #[arg(long, conflicts_with = "context_file")]
    context: Option<String>,
    /// Read the context from a JSON file.
    #[arg(long)]
    context_file: Option<PathBuf>,
    /// Print the parsed syntax tree as JSON instead of evaluating.
    #[arg(long)]
    ast: bool,
    /// Treat the input as a JSON syntax tree rather than expression text.
    #[arg(long)]
    tree: bool,
    /// Evaluate unknown operators to `undefined` instead of failing.
    #[arg(long)]
    lenient: bool,
    /// Log evaluation steps to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::TRACE } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, String> {
    let options = if args.lenient { EvalOptions::lenient() } else { EvalOptions::default() };
    let evaluator = Evaluator::with_options(options);

    let tree: Node = if args.tree {
        serde_json::from_str(&args.expression).map_err(|e| format!("Invalid syntax tree: {e}"))?
    } else {
        evaluator.parse(&args.expression).map_err(|e| e.to_string())?
    };

    if args.ast {
        return serde_json::to_string_pretty(&tree).map_err(|e| e.to_string());
    }

    let context = load_context(args)?;
    let value = evaluator.evaluate_tree(&tree, &context).map_err(|e| e.to_string())?;
    match value {
        Value::Undefined => Ok("undefined".to_string()),
        Value::Function(f) => Ok(format!("{f:?}")),
        other => serde_json::to_string_pretty(&other).map_err(|e| e.to_string()),
    }
}

fn load_context(args: &Args) -> Result<Value, String> {
    let text = match (&args.context, &args.context_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {e}", path.display()))?,
        (None, None) => return Ok(Value::Undefined),
    };
    serde_json::from_str::<serde_json::Value>(&text)
        .map(Value::from)
        .map_err(|e| format!("Invalid JSON: {e}"))
}
