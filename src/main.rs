//! Purpose: `localpost` CLI entry point.
//! Role: Binary crate root; parses args, opens a session, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout (pretty on a TTY, compact otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All state mutations go through `api::Session`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use localpost::api::{
    DEFAULT_BASE_URL, Error, ErrorKind, Post, Renderer, SessionConfig, default_state_dir,
    to_exit_code,
};

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
    let cli = match Cli::try_parse() {
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
                        .with_hint("Try `localpost --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let mut config = SessionConfig::new()
        .with_state_dir(cli.dir.unwrap_or_else(default_state_dir))
        .with_base_url(cli.base_url)
        .ephemeral(cli.ephemeral);
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(timeout_ms));
    }

    command_dispatch::dispatch_command(cli.command, config, cli.render)
        .map_err(add_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "localpost",
    version,
    about = "Post collection backed by a REST service plus a local cache",
    long_about = None,
    before_help = r#"Posts with ids 1-100 live on the service; new posts get local ids above 100.

Mental model:
  - `create` sends to the service, then keeps the post under a local id
  - `update`/`delete` on local ids never touch the network
  - `fetch` always reads from the service"#,
    after_help = r#"EXAMPLES
  $ localpost create "Hello" "First post"
  $ localpost update 101 "Hello again" "Edited locally"
  $ localpost update 5 "Remote" "Sent to the service"
  $ localpost delete 101
  $ localpost fetch 1
  $ localpost list
  $ localpost reset"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "State directory for the id counter and cached posts (default: ~/.localpost)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = DEFAULT_BASE_URL,
        help = "Base url of the posts service",
        value_hint = ValueHint::Url
    )]
    base_url: String,
    #[arg(long, help = "Network timeout in milliseconds")]
    timeout_ms: Option<u64>,
    #[arg(long, help = "Keep state in memory only (nothing is read or written on disk)")]
    ephemeral: bool,
    #[arg(long, help = "Print the cached posts to stderr after each change")]
    render: bool,
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
    #[command(about = "Create a post on the service and keep it under a new local id")]
    Create {
        #[arg(help = "Post title (must not be blank)")]
        title: String,
        #[arg(help = "Post body (must not be blank)")]
        body: String,
    },
    #[command(
        about = "Update a post (local ids edit the cache, remote ids go to the service)"
    )]
    Update {
        #[arg(help = "Post id between 1 and the current counter")]
        id: u64,
        #[arg(help = "New title (must not be blank)")]
        title: String,
        #[arg(help = "New body (must not be blank)")]
        body: String,
    },
    #[command(about = "Delete a post (local ids succeed even when already gone)")]
    Delete {
        #[arg(help = "Post id between 1 and the current counter")]
        id: u64,
    },
    #[command(about = "Read a post from the service (the cache is not consulted)")]
    Fetch {
        #[arg(help = "Post id on the service")]
        id: u64,
    },
    #[command(about = "Show the cached copy of a post without touching the network")]
    Lookup {
        #[arg(help = "Post id")]
        id: u64,
    },
    #[command(about = "List cached posts, newest first")]
    List,
    #[command(about = "Show the id boundary and the range accepted by update/delete")]
    Limits,
    #[command(about = "Clear cached posts and reset the id counter")]
    Reset,
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version info")]
    Version,
}

/// Prints the cached collection as a table on stderr.
struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render(&mut self, posts: &[Post]) {
        if posts.is_empty() {
            eprintln!("(no cached posts)");
            return;
        }
        let rows = posts
            .iter()
            .map(|post| vec![post.id.to_string(), post.title.clone(), post.body.clone()])
            .collect::<Vec<_>>();
        eprintln!("{}", render_table(&["ID", "TITLE", "BODY"], &rows));
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn post_json(post: &Post) -> Value {
    json!({
        "id": post.id,
        "title": post.title,
        "body": post.body,
    })
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

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("localpost {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "localpost",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    let rows = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.replace('\n', "\\n").replace('\r', "\\r"))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    std::iter::once(&header)
        .chain(rows.iter())
        .map(|cells| format_table_line(cells, &widths))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len && idx + 1 < widths.len() {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line
}

fn add_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Remote if err.status() == Some(404) => {
            err.with_hint("The service has no post with that id.")
        }
        ErrorKind::Remote => {
            err.with_hint("The service rejected the request; nothing was changed locally.")
        }
        ErrorKind::Io => {
            err.with_hint("Network or disk error. Check --base-url, connectivity, and --dir.")
        }
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Use --dir to point at a writable location.")
        }
        ErrorKind::Busy => err.with_hint("Another localpost process holds the state lock. Retry."),
        ErrorKind::Corrupt => {
            err.with_hint("Stored state is unreadable. Run `localpost reset` to start over.")
        }
        ErrorKind::Internal => err.with_hint(
            "Unexpected internal failure. Retry with RUST_LOG=debug and share the output if it persists.",
        ),
        _ => err,
    }
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
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Validation => "invalid input".to_string(),
        ErrorKind::Range => "id out of range".to_string(),
        ErrorKind::Remote => "remote service error".to_string(),
        ErrorKind::Corrupt => "corrupt state".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Busy => "state is busy".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
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
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(id) = err.id() {
        inner.insert("id".to_string(), json!(id));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
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
    if let Some(status) = err.status() {
        lines.push(format!(
            "{} {status}",
            colorize_label("status:", use_color, AnsiColor::Yellow)
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

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, add_hint, error_json, render_table};

    #[test]
    fn render_table_pads_all_but_last_column() {
        let rows = vec![
            vec!["101".to_string(), "Hi".to_string(), "line\nbreak".to_string()],
            vec!["5".to_string(), "Longer title".to_string(), "b".to_string()],
        ];
        let table = render_table(&["ID", "TITLE", "BODY"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID   TITLE         BODY");
        assert_eq!(lines[1], "101  Hi            line\\nbreak");
        assert_eq!(lines[2], "5    Longer title  b");
    }

    #[test]
    fn remote_not_found_gets_specific_hint() {
        let err = add_hint(Error::remote(404));
        assert_eq!(err.hint(), Some("The service has no post with that id."));
        let err = add_hint(Error::new(ErrorKind::Validation));
        assert_eq!(err.hint(), None);
    }

    #[test]
    fn error_json_carries_status_and_id() {
        let err = Error::remote(500).with_id(7);
        let value = error_json(&err);
        let inner = value.get("error").expect("error");
        assert_eq!(inner["kind"], "Remote");
        assert_eq!(inner["status"], 500);
        assert_eq!(inner["id"], 7);
    }
}
