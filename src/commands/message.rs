use anyhow::{Context as _, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mgmtkit::{Catalog, FieldMap, Transport, Verb, paths, request};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};

use crate::Context;
use crate::cli::FieldArgs;
use crate::{output, ui};

/// Columns shown for fetched messages in tabular formats.
const MESSAGE_COLUMNS: &[&str] = &[
    "routing_key",
    "exchange",
    "message_count",
    "payload",
    "payload_bytes",
    "payload_encoding",
    "redelivered",
];

/// Publish one message. Without `payload=`, the payload is read from stdin.
pub fn publish(ctx: &Context, args: &FieldArgs) -> Result<()> {
    let descriptor = Catalog::global().lookup_verb(Verb::Publish)?;
    let mut fields = request::parse_fields(&args.fields)?;

    if !fields.contains_key("payload") {
        let mut payload = Vec::new();
        io::stdin()
            .read_to_end(&mut payload)
            .context("Failed to read the message payload from stdin")?;
        attach_payload(&mut fields, &payload);
    }

    let request = request::build(descriptor, &fields, &ctx.config)?;
    let response = Transport::new(&ctx.config)?.send(&request)?;

    let routed = response
        .json()?
        .and_then(|body| body.get("routed").and_then(Value::as_bool))
        .unwrap_or(true);
    if !routed {
        ui::warn("Message published but NOT routed");
    } else if !ctx.quiet {
        ui::success("Message published");
    }
    Ok(())
}

/// Fetch messages. With `payload_file=`, the single fetched payload is
/// written to that file instead of being printed.
pub fn get(ctx: &Context, args: &FieldArgs) -> Result<()> {
    let descriptor = Catalog::global().lookup_verb(Verb::Get)?;
    let fields = request::parse_fields(&args.fields)?;

    let payload_file = fields.get("payload_file").map(|p| paths::expand(p));
    if payload_file.is_some() && fields.get("count").is_some_and(|count| count != "1") {
        return Err(mgmtkit::Error::usage("payload_file requires count=1").into());
    }

    let request = request::build(descriptor, &fields, &ctx.config)?;
    let response = Transport::new(&ctx.config)?.send(&request)?;
    let messages = response.json()?.unwrap_or_else(|| Value::Array(Vec::new()));

    let Some(path) = payload_file else {
        let columns: Vec<String> = if ctx.config.format.uses_default_columns() {
            MESSAGE_COLUMNS.iter().map(|c| (*c).to_string()).collect()
        } else {
            Vec::new()
        };
        print!(
            "{}",
            output::render(&messages, &columns, ctx.config.format, ctx.config.depth)
        );
        return Ok(());
    };

    let Some(message) = messages.as_array().and_then(|m| m.first()) else {
        ui::warn(&format!("Queue is empty, nothing written to {}", path.display()));
        return Ok(());
    };
    let payload = decode_payload(message)?;
    fs::write(&path, &payload)
        .with_context(|| format!("Failed to write payload to {}", path.display()))?;

    if !ctx.quiet {
        ui::info(&format!(
            "Wrote {} bytes to {}",
            payload.len(),
            path.display()
        ));
    }
    Ok(())
}

fn attach_payload(fields: &mut FieldMap, payload: &[u8]) {
    fields.insert("payload".to_string(), STANDARD.encode(payload));
    fields.insert("payload_encoding".to_string(), "base64".to_string());
}

/// Raw payload bytes of a fetched message.
fn decode_payload(message: &Value) -> Result<Vec<u8>> {
    let payload = message
        .get("payload")
        .and_then(Value::as_str)
        .context("Fetched message has no payload")?;
    match message.get("payload_encoding").and_then(Value::as_str) {
        Some("base64") => STANDARD
            .decode(payload)
            .context("Fetched payload is not valid base64"),
        _ => Ok(payload.as_bytes().to_vec()),
    }
}
