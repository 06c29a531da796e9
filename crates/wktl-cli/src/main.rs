use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    process,
    rc::Rc,
};

use clap::{CommandFactory, Parser, ValueEnum};
use crossterm::style::Stylize;
use wktl_lang::{Error, Scope, Value, evaluate};

mod geojson;

/// Ends one REPL entry.
const TERMINATOR: &str = ";;";

#[derive(Debug, Parser)]
#[command(name = "wktl")]
#[command(version)]
#[command(about = "Evaluate WKT-flavored geometry scripts.", long_about = None)]
struct Args {
    /// Script files, evaluated in order against one shared scope.
    files: Vec<PathBuf>,
    /// Script text evaluated before any file.
    #[arg(long, short)]
    evaluate: Option<String>,
    /// How results are printed.
    #[arg(long, default_value_t = Format::Wkt, value_enum)]
    format: Format,
    /// Shorthand for `--format geo-json`.
    #[arg(long)]
    geojson: bool,
    /// Start an interactive session after running any scripts.
    #[arg(long, short)]
    interactive: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Format {
    /// Well-known text.
    Wkt,
    /// GeoJSON geometry objects.
    GeoJson,
}

fn main() {
    init_tracing();
    let args = Args::parse();
    let format = if args.geojson { Format::GeoJson } else { args.format };

    if args.evaluate.is_none() && args.files.is_empty() && !args.interactive {
        if let Err(e) = Args::command().print_help() {
            eprintln!("{e}");
        }
        return;
    }

    let scope = Scope::global();

    if let Some(script) = &args.evaluate {
        run_script("<evaluate>", script, &scope, format);
    }
    for path in &args.files {
        let script = fs::read_to_string(path).unwrap_or_else(|e| {
            report(&format!("cannot read {}: {e}", path.display()));
            process::exit(1);
        });
        run_script(&path.display().to_string(), &script, &scope, format);
    }

    if args.interactive {
        if let Err(e) = repl(&scope, format) {
            report(&format!("input error: {e}"));
            process::exit(1);
        }
    }
}

/// Only installs a subscriber when `RUST_LOG` is set; output goes to stderr.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_script(name: &str, script: &str, scope: &Rc<Scope>, format: Format) {
    tracing::info!(source = name, "running script");
    match evaluate(script, Some(Rc::clone(scope))) {
        Ok(Value::Unit) => {}
        Ok(value) => println!("{}", render(&value, format)),
        Err(e) => {
            report(&describe(name, &e));
            process::exit(1);
        }
    }
}

fn repl(scope: &Rc<Scope>, format: Format) -> io::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer = String::new();
    let mut entry = 1;

    loop {
        if buffer.trim().is_empty() {
            prompt(entry)?;
        }
        let Some(line) = lines.next().transpose()? else { break };
        buffer.push_str(&line);
        buffer.push('\n');

        let Some(end) = buffer.find(TERMINATOR) else { continue };
        let input: String = buffer[..end].to_string();
        buffer = buffer[end + TERMINATOR.len()..].trim_start().to_string();

        if input.trim() == "exit()" {
            break;
        }
        match evaluate(&input, Some(Rc::clone(scope))) {
            Ok(value) => println!("{}", render(&value, format)),
            Err(e) => report(&describe("<repl>", &e)),
        }
        entry += 1;
    }
    Ok(())
}

fn prompt(entry: usize) -> io::Result<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", format!("--- [{entry}] ---").dark_grey())?;
    stdout.flush()
}

fn render(value: &Value, format: Format) -> String {
    match format {
        Format::Wkt => value.to_string(),
        Format::GeoJson => format!("{:#}", geojson::encode(value)),
    }
}

fn describe(source: &str, e: &Error) -> String {
    match e {
        Error::Syntax(s) => format!("{source}: syntax error {s}"),
        Error::Eval(r) => format!("{source}: {r}"),
    }
}

fn report(message: &str) {
    eprintln!("{} {message}", "error:".red().bold());
}
