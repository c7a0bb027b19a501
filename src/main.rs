//! Purpose: `framepass` CLI entry point: encode, decode, and inspect JSON-in-URL tokens.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: stdout carries only command output (one JSON value, or JSON lines for `listen`).
//! Invariants: Non-interactive errors and notices are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod color_json;
mod command_dispatch;
mod frame_stdio;

use color_json::colorize_json;
use framepass::api::{
    CARDS_FIELD, Codec, DataParam, Error, ErrorKind, FLASHCARDS_WIDGET, WidgetConfig,
    WidgetParams, decode_config, example_cards, fetch_json, to_exit_code,
};
use framepass::core::select::Explanation;
use framepass::notice::{Notice, notice_json};

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
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, color_mode)
        .map_err(add_decode_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "framepass",
    version,
    about = "Carry JSON payloads through URLs and iframes, and read them back",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Tokens look like b64_<url-safe base64 of UTF-8 JSON>.

Mental model:
  - `encode` turns JSON into a token
  - `decode` turns a token (or a mangled copy of one) back into JSON
  - `params` reads a widget URL the way the widget page would
"#,
    after_help = r#"EXAMPLES
  $ framepass encode '[{"Q":"Qual é a capital do Brasil?","A":"Brasília","T":"Geografia"}]'
  $ framepass decode b64_W3siUSI6IlF1YWwgw6kgYSBjYXBpdGFsIGRvIEJyYXNpbD8iLCJBIjoiQnJhc8OtbGlhIiwiVCI6Ikdlb2dyYWZpYSJ9XQ==
  $ framepass embed --origin https://widgets.example -f cards.json
  $ framepass params 'https://widgets.example/widgets/flashcards?data_b64=...'

LEARN MORE
  $ framepass <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
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
    #[command(
        about = "Encode a JSON payload into a URL token",
        long_about = r#"Serialize JSON as UTF-8, base64 it with the URL-safe alphabet, and add the b64_ prefix.

Reads JSON from the argument, from --file, or from stdin."#,
        after_help = r#"EXAMPLES
  $ framepass encode '{"title":"Revisão"}'
  $ framepass encode -f cards.json
  $ cat cards.json | framepass encode --bare"#
    )]
    Encode {
        #[arg(help = "JSON payload (omit to use --file or stdin)")]
        json: Option<String>,
        #[arg(short = 'f', long = "file", value_hint = ValueHint::FilePath, conflicts_with = "json")]
        file: Option<PathBuf>,
        #[arg(long, help = "Omit the b64_ prefix (still decodable as bare base64)")]
        bare: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Decode a token or raw URL parameter back into JSON",
        long_about = r#"Decode a raw parameter value.

Default: tolerant decode. Tries every plausible reading (UTF-8, Latin-1, mojibake repairs,
percent-decoding) and returns the least corrupted one that parses.
--strict: the token must be exactly what `encode` produced."#,
        after_help = r#"EXAMPLES
  $ framepass decode b64_eyJhIjoiw6EifQ==
  $ framepass decode '%7B%22a%22%3A1%7D'
  $ framepass decode --explain b64_eyJhIjoiw6EifQ==
  $ framepass decode --strict b64_eyJhIjoiw6EifQ=="#
    )]
    Decode {
        #[arg(help = "Raw parameter value (token, bare base64, or percent-encoded JSON)")]
        raw: String,
        #[arg(long, conflicts_with = "explain", help = "Only accept well-formed tokens")]
        strict: bool,
        #[arg(long, help = "Show the strategy and every candidate that was tried")]
        explain: bool,
        #[arg(long, help = "Repair known mojibake sequences in every decoded string")]
        fix: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Build a widget link and iframe snippet for a payload",
        after_help = r#"EXAMPLES
  $ framepass embed --origin https://widgets.example -f cards.json
  $ framepass embed --origin https://widgets.example --widget quiz '{"items":[1,2]}'"#
    )]
    Embed {
        #[arg(long, help = "Origin serving the widgets, e.g. https://widgets.example")]
        origin: String,
        #[arg(long, default_value = FLASHCARDS_WIDGET, help = "Widget type (path segment)")]
        widget: String,
        #[arg(help = "JSON payload (omit to use --file or stdin)")]
        json: Option<String>,
        #[arg(short = 'f', long = "file", value_hint = ValueHint::FilePath, conflicts_with = "json")]
        file: Option<PathBuf>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Read widget data and config from a widget URL",
        long_about = r#"Resolve data the way a widget page does: data_b64, then data, then example data.

A `data` value that is an http(s) URL is only fetched with --fetch.
Decode failures fall back to example data with a notice on stderr."#,
        after_help = r#"EXAMPLES
  $ framepass params 'https://widgets.example/widgets/flashcards?data_b64=b64_...'
  $ framepass params --fetch 'https://widgets.example/widgets/flashcards?data=https://cdn.example/cards.json'"#
    )]
    Params {
        #[arg(help = "Full widget URL")]
        url: String,
        #[arg(long, help = "Fetch remote data referenced by an http(s) `data` parameter")]
        fetch: bool,
    },
    #[command(
        about = "Print the example payload for a widget",
        after_help = r#"EXAMPLES
  $ framepass example
  $ framepass example | framepass encode"#
    )]
    Example {
        #[arg(long, default_value = FLASHCARDS_WIDGET)]
        widget: String,
    },
    #[command(
        about = "Run the widget side of the fallback channel over stdio",
        long_about = r#"Act as an embedded widget waiting for data.

If --url carries a decodable token, the data is printed right away. Otherwise a
{"type":"ready","widget":...} line is written to stdout and host messages are read
from stdin, one JSON value per line, until one matches the widget type."#,
        after_help = r#"EXAMPLES
  $ framepass listen
  $ echo '{"type":"flashcards","cards":[{"Q":"q","A":"a","T":"t"}]}' | framepass listen
  $ framepass listen --widget quiz --field items"#
    )]
    Listen {
        #[arg(long, default_value = FLASHCARDS_WIDGET)]
        widget: String,
        #[arg(long, default_value = CARDS_FIELD, help = "Array field carrying the payload")]
        field: String,
        #[arg(long, help = "Widget URL to read a token from first")]
        url: Option<String>,
    },
    #[command(
        about = "Print version info as JSON",
        after_help = r#"EXAMPLES
  $ framepass version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ framepass completion bash > ~/.local/share/bash-completion/completions/framepass
  $ framepass completion zsh > ~/.zfunc/_framepass
  $ framepass completion fish > ~/.config/fish/completions/framepass.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn read_payload(json: Option<String>, file: Option<&Path>) -> Result<Value, Error> {
    if let Some(json) = json {
        return parse_inline_json(&json);
    }
    let text = match file {
        Some(path) => std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {}", path.display()))
                .with_source(err)
        })?,
        None => {
            if io::stdin().is_terminal() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("no payload given")
                    .with_hint("Pass JSON as an argument, with --file, or on stdin."));
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            buf
        }
    };
    parse_inline_json(&text)
}

fn parse_inline_json(data: &str) -> Result<Value, Error> {
    serde_json::from_str(data).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid json")
            .with_hint("Provide a single JSON value (e.g. '{\"x\":1}').")
            .with_source(err)
    })
}

fn example_payload(widget: &str) -> Result<Value, Error> {
    if widget != FLASHCARDS_WIDGET {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("no example data for widget `{widget}`"))
            .with_hint(format!("Known widgets: {FLASHCARDS_WIDGET}.")));
    }
    serde_json::to_value(example_cards()).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode example data")
            .with_source(err)
    })
}

fn explanation_json(explanation: &Explanation) -> Value {
    let candidates = explanation
        .attempts
        .iter()
        .map(|(candidate, parses)| {
            json!({
                "source": candidate.source.as_str(),
                "score": candidate.score,
                "parses": parses,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "strategy": explanation.strategy.as_str(),
        "candidates": candidates,
        "value": explanation.value.clone().unwrap_or(Value::Null),
    })
}

/// `params` command body: data and config as a widget page would load them.
fn resolve_params(url: &str, fetch: bool, color_mode: ColorMode) -> Result<Value, Error> {
    let params = WidgetParams::from_url(url)?;
    let codec = Codec::default();

    let (source, data) = match params.data_param() {
        DataParam::Token { param, raw } => match codec.decode_param(raw) {
            Ok(value) => (param, value),
            Err(err) => {
                emit_fallback_notice(param, &err, color_mode);
                ("example", example_payload(FLASHCARDS_WIDGET)?)
            }
        },
        DataParam::Remote(remote) if fetch => match fetch_json(&remote) {
            Ok(value) => ("remote", value),
            Err(err) => {
                emit_fallback_notice("remote", &err, color_mode);
                ("example", example_payload(FLASHCARDS_WIDGET)?)
            }
        },
        DataParam::Remote(remote) => {
            let mut details = Map::new();
            details.insert("url".to_string(), json!(remote.as_str()));
            emit_notice(
                &new_notice(
                    "remote",
                    "data",
                    "data parameter points at a remote document; pass --fetch to load it",
                    details,
                ),
                color_mode,
            );
            ("example", example_payload(FLASHCARDS_WIDGET)?)
        }
        DataParam::Absent => ("example", example_payload(FLASHCARDS_WIDGET)?),
    };

    let config = match params.config.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => decode_config(&codec, raw).unwrap_or_else(|err| {
            let mut details = Map::new();
            details.insert("error".to_string(), json!(error_message(&err)));
            emit_notice(
                &new_notice("config-ignored", "config", "widget config ignored", details),
                color_mode,
            );
            WidgetConfig::default()
        }),
        None => WidgetConfig::default(),
    };
    let config = serde_json::to_value(config).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode widget config")
            .with_source(err)
    })?;

    Ok(json!({
        "source": source,
        "data": data,
        "config": config,
        "debug": params.debug,
    }))
}

fn emit_fallback_notice(source: &str, err: &Error, color_mode: ColorMode) {
    let mut details = Map::new();
    details.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    details.insert("error".to_string(), json!(error_message(err)));
    if let Some(strategy) = err.strategy() {
        details.insert("strategy".to_string(), json!(strategy));
    }
    emit_notice(
        &new_notice(
            "fallback",
            source,
            "could not decode widget data; using example data",
            details,
        ),
        color_mode,
    );
}

fn emit_version_output(color_mode: ColorMode) {
    if io::stdout().is_terminal() {
        println!("framepass {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(
            json!({
                "name": "framepass",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            color_mode,
        );
    }
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let use_color = color_mode.use_color(is_tty);
    let json = if is_tty || use_color {
        colorize_json(&value, use_color)
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
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

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn new_notice(kind: &str, source: &str, message: &str, details: Map<String, Value>) -> Notice {
    Notice {
        kind: kind.to_string(),
        time: notice_time_now().unwrap_or_default(),
        cmd: "params".to_string(),
        source: source.to_string(),
        message: message.to_string(),
        details,
    }
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (param: {})", notice.message, notice.source);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
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
        ErrorKind::NotSerializable => "payload is not serializable as JSON".to_string(),
        ErrorKind::InvalidBase64 => "invalid base64".to_string(),
        ErrorKind::NoValidCandidate => "no decode candidate parsed as JSON".to_string(),
        ErrorKind::MalformedMessage => "malformed message".to_string(),
        ErrorKind::Cancelled => "cancelled".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Remote => "remote data unavailable".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    use std::error::Error as _;
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
    if let Some(strategy) = err.strategy() {
        inner.insert("strategy".to_string(), json!(strategy));
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
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(strategy) = err.strategy() {
        lines.push(format!(
            "{} {strategy}",
            colorize_label("strategy:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
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

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let subcommand = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .and_then(|usage| {
            let mut tokens = usage.split_whitespace();
            tokens.find(|token| *token == "framepass")?;
            tokens.next().filter(|token| {
                !token.starts_with('-') && !token.starts_with('<') && !token.starts_with('[')
            })
        });
    match subcommand {
        Some(subcommand) => format!("Try `framepass {subcommand} --help`."),
        None => "Try `framepass --help`.".to_string(),
    }
}

fn add_decode_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NoValidCandidate => {
            err.with_hint("Run `framepass decode --explain <raw>` to see every candidate that was tried.")
        }
        ErrorKind::InvalidBase64 => err.with_hint(
            "The value contains characters outside the base64 alphabet. Was it copied in full?",
        ),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share command/context if it persists.",
    )
}
