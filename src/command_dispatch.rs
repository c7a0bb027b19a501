//! Purpose: Hold top-level CLI command dispatch for `framepass`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Only `listen` starts an async runtime; every other command is synchronous.
//! Invariants: Helpers in `main.rs` remain the source of command business logic.

use super::*;

use framepass::api::{FallbackChannel, build_embed};
use framepass::core::mojibake::fix_value;

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "framepass", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Encode { json, file, bare } => {
            let payload = read_payload(json, file.as_deref())?;
            let codec = Codec::default();
            let token = if bare {
                codec.encode_bare(&payload)?
            } else {
                codec.encode(&payload)?
            };
            emit_json(json!({ "token": token, "bytes": token.len() }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Decode {
            raw,
            strict,
            explain,
            fix,
        } => {
            let codec = Codec::default();
            if explain {
                let explanation = codec.explain(&raw)?;
                let found = explanation.value.is_some();
                emit_json(explanation_json(&explanation), color_mode);
                return Ok(if found {
                    RunOutcome::ok()
                } else {
                    RunOutcome::with_code(to_exit_code(ErrorKind::NoValidCandidate))
                });
            }
            let value = if strict {
                codec.decode_strict(&raw)?
            } else {
                codec.decode(&raw)?
            };
            let value = if fix { fix_value(value) } else { value };
            emit_json(value, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Embed {
            origin,
            widget,
            json,
            file,
        } => {
            let payload = read_payload(json, file.as_deref())?;
            let link = build_embed(&Codec::default(), &origin, &widget, &payload)?;
            emit_json(
                json!({
                    "token": link.token,
                    "url": link.url.as_str(),
                    "iframe": link.iframe,
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Params { url, fetch } => {
            let value = resolve_params(&url, fetch, color_mode)?;
            emit_json(value, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Example { widget } => {
            emit_json(example_payload(&widget)?, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Listen { widget, field, url } => {
            let url_token = match url {
                Some(url) => WidgetParams::from_url(&url)?
                    .raw_data()
                    .map(|(_, raw)| raw.to_string()),
                None => None,
            };
            let channel = FallbackChannel::new(widget, field);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            let result = runtime.block_on(frame_stdio::serve(channel, url_token));
            // A stdin read may still be parked on a blocking thread.
            runtime.shutdown_background();
            result?;
            Ok(RunOutcome::ok())
        }
    }
}
