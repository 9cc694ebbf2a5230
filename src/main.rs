//! Purpose: `fixturedb` CLI entry point.
//! Role: Binary crate root; parses args, loads fixtures, runs commands, emits JSON on stdout.
//! Invariants: Fixture files are read-only inputs; nothing is written back to disk.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Logs go to stderr so stdout stays machine-readable.
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use fixturedb::api::{Db, Error, ErrorKind, load_fixtures, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `fixturedb --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command).map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "fixturedb",
    version,
    about = "Query and mutate in-memory mock collections seeded from JSON fixtures",
    long_about = None,
    before_help = r#"A fixture file maps collection names to arrays of records:
  {"users": [{"name": "Link"}, {"name": "Zelda"}], "posts": []}

Records without an `id` get one assigned (collection length + 1).
Changes live in memory only; fixture files are never rewritten."#,
    after_help = r#"EXAMPLES
  $ fixturedb show fixtures.json
  $ fixturedb find fixtures.json users 1 2
  $ fixturedb where fixtures.json users --field type=admin
  $ fixturedb where fixtures.json users --expr '.age > 30'
  $ fixturedb apply fixtures.json script.json
  $ echo '[{"op":"insert","collection":"users","data":{"name":"Midna"}}]' | fixturedb apply fixtures.json -"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print every collection (or one) after loading the fixtures")]
    Show {
        #[arg(help = "Fixture JSON file", value_hint = ValueHint::FilePath)]
        fixture: PathBuf,
        #[arg(long, help = "Only print this collection's records")]
        collection: Option<String>,
    },
    #[command(
        about = "Look up records by id; digit-only ids match integer ids",
        after_help = r#"NOTES
  - One id prints the record, or null on a miss
  - Several ids print an array in request order; misses are skipped
  - Misses are not errors: exit status stays 0"#
    )]
    Find {
        #[arg(help = "Fixture JSON file", value_hint = ValueHint::FilePath)]
        fixture: PathBuf,
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(required = true, help = "One or more record ids")]
        ids: Vec<String>,
    },
    #[command(
        about = "Filter records by field equality or a jq-style expression",
        after_help = r#"NOTES
  - --field compares stringified values, so --field age=30 matches 30 and "30"
  - --field and --expr combine: a record must satisfy both
  - --expr must yield booleans (e.g. '.tags[]? == "x"')"#
    )]
    Where {
        #[arg(help = "Fixture JSON file", value_hint = ValueHint::FilePath)]
        fixture: PathBuf,
        #[arg(help = "Collection name")]
        collection: String,
        #[arg(long = "field", value_name = "KEY=VALUE", help = "Repeatable field match")]
        fields: Vec<String>,
        #[arg(long, help = "jq-style boolean expression")]
        expr: Option<String>,
    },
    #[command(
        about = "Run an op script against the fixtures and print results plus final state",
        after_help = r#"OPS
  {"op":"create_collection","collection":C,"data":[...]}
  {"op":"all","collection":C}
  {"op":"insert","collection":C,"data":{...}|[...]}
  {"op":"find","collection":C,"ids":ID|[ID...]}
  {"op":"where","collection":C,"query":{...}} | {"op":"where","collection":C,"expr":"..."}
  {"op":"first_or_create","collection":C,"query":{...},"defaults":{...}}
  {"op":"update","collection":C,"target":ID|[ID...]|{...}|null,"attrs":{...}}
  {"op":"remove","collection":C,"target":ID|[ID...]|{...}|null}"#
    )]
    Apply {
        #[arg(help = "Fixture JSON file", value_hint = ValueHint::FilePath)]
        fixture: PathBuf,
        #[arg(help = "Op script file (use - for stdin)", value_hint = ValueHint::FilePath)]
        script: String,
        #[arg(long, help = "Omit the final database state from the output")]
        no_state: bool,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn read_fixture(path: &Path) -> Result<Db, Error> {
    let text = std::fs::read_to_string(path).map_err(|err| io_error(err, path))?;
    let db = load_fixtures(&text, &path.display().to_string()).map_err(|err| err.with_path(path))?;
    tracing::debug!(
        path = %path.display(),
        collections = db.collection_names().count(),
        "loaded fixtures"
    );
    Ok(db)
}

fn read_script_text(source: &str) -> Result<String, Error> {
    if source == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read op script from stdin")
                .with_source(err)
        })?;
        return Ok(text);
    }
    let path = Path::new(source);
    std::fs::read_to_string(path).map_err(|err| io_error(err, path))
}

fn io_error(err: io::Error, path: &Path) -> Error {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Io,
    };
    Error::new(kind)
        .with_message("failed to read file")
        .with_path(path)
        .with_source(err)
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(collection) = err.collection() {
        inner.insert("collection".to_string(), json!(collection));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(collection) = err.collection() {
        lines.push(format!(
            "{} {collection}",
            colorize_label("collection:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    "invalid arguments".to_string()
}
