//! Purpose: Run the widget side of the fallback channel over stdio.
//! Exports: `serve`.
//! Role: Bridge newline-delimited JSON: stdin plays the host posting messages,
//! stdout receives what the widget posts to its host, then the resolved data.
//! Invariants: stdout only emits JSON lines (ready notifications, then one resolution).
//! Invariants: stdin is read only after the widget has posted `ready`.
//! Invariants: stdin EOF before a matching message ends the channel as cancelled.

use framepass::api::channel::{FallbackChannel, HostEnd, HostLink, Resolution};
use framepass::api::{Error, ErrorKind};
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

pub(super) async fn serve(mut channel: FallbackChannel, url_token: Option<String>) -> Result<(), Error> {
    let (link, mut host) = HostLink::pair();
    let widget = channel.widget().to_string();
    let field = channel.payload_field().to_string();
    let mut resolving = tokio::spawn(async move { channel.resolve(url_token.as_deref(), &link).await });

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut ready_seen = false;
    let mut stdin_open = true;

    loop {
        tokio::select! {
            joined = &mut resolving => {
                // Flush anything the widget posted before resolving.
                while let Some(message) = host.try_recv_from_widget() {
                    write_json_line(&mut stdout, &message).await?;
                }
                let resolution = joined.map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("fallback channel task failed")
                        .with_source(err)
                })??;
                return write_json_line(&mut stdout, &resolution_json(&widget, &field, resolution)).await;
            }
            Some(message) = host.recv_from_widget() => {
                ready_seen = true;
                write_json_line(&mut stdout, &message).await?;
            }
            line = lines.next_line(), if ready_seen && stdin_open => {
                let line = line.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read host message")
                        .with_source(err)
                })?;
                match line {
                    Some(line) => post_line(&host, &line),
                    None => {
                        stdin_open = false;
                        host.close();
                    }
                }
            }
        }
    }
}

fn post_line(host: &HostEnd, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(message) => {
            let listeners = host.post_to_widget(message);
            tracing::debug!(listeners, "host message posted");
        }
        Err(err) => {
            tracing::debug!(error = %err, "ignoring host line that is not JSON");
        }
    }
}

fn resolution_json(widget: &str, field: &str, resolution: Resolution) -> Value {
    let mut out = Map::new();
    out.insert("type".to_string(), json!("resolved"));
    out.insert("widget".to_string(), json!(widget));
    out.insert("source".to_string(), json!(resolution.source.as_str()));
    out.insert(field.to_string(), resolution.value);
    Value::Object(out)
}

async fn write_json_line<W>(writer: &mut W, payload: &Value) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(payload).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode channel message")
            .with_source(err)
    })?;
    line.push(b'\n');
    writer.write_all(&line).await.map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write channel message")
            .with_source(err)
    })?;
    writer.flush().await.map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush channel message")
            .with_source(err)
    })
}
