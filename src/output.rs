//! Rendering of API responses.
//!
//! A response is either a list of objects (one row each) or a single object
//! (one row). Nested objects are flattened into `parent.child` columns down
//! to `depth` levels; anything deeper is shown as compact JSON.

use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use mgmtkit::OutputFormat;
use serde_json::Value;
use std::fmt::Write;

/// Render a response body in the requested format.
///
/// `columns` picks and orders the cells. Dotted names (`queue_totals.messages`)
/// reach into nested objects regardless of `depth`. When empty, every
/// flattened key is shown in order of first appearance.
pub fn render(value: &Value, columns: &[String], format: OutputFormat, depth: u32) -> String {
    match format {
        OutputFormat::RawJson => return format!("{value}\n"),
        OutputFormat::PrettyJson => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            return format!("{pretty}\n");
        }
        _ => {}
    }

    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        scalar => return format!("{}\n", cell(scalar)),
    };

    let (headers, rows) = tabulate(&items, columns, depth);
    match format {
        OutputFormat::Table => table(&headers, &rows),
        OutputFormat::Tsv => tsv(&rows),
        OutputFormat::Kvp => kvp(&headers, &rows),
        _ => long(&headers, &rows),
    }
}

/// Header names and cell text for each item.
fn tabulate(items: &[&Value], columns: &[String], depth: u32) -> (Vec<String>, Vec<Vec<String>>) {
    if !columns.is_empty() {
        let rows = items
            .iter()
            .map(|item| {
                columns
                    .iter()
                    .map(|column| lookup(item, column).map(cell).unwrap_or_default())
                    .collect()
            })
            .collect();
        return (columns.to_vec(), rows);
    }

    let flattened: Vec<Vec<(String, String)>> = items
        .iter()
        .map(|item| {
            let mut pairs = Vec::new();
            flatten(item, "", depth.max(1), &mut pairs);
            pairs
        })
        .collect();

    let mut headers: Vec<String> = Vec::new();
    for pairs in &flattened {
        for (key, _) in pairs {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = flattened
        .iter()
        .map(|pairs| {
            headers
                .iter()
                .map(|header| {
                    pairs
                        .iter()
                        .find(|(key, _)| key == header)
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    (headers, rows)
}

fn flatten(value: &Value, prefix: &str, depth: u32, out: &mut Vec<(String, String)>) {
    let Value::Object(map) = value else {
        out.push((prefix.to_string(), cell(value)));
        return;
    };
    for (key, child) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match child {
            Value::Object(inner) if depth > 1 && !inner.is_empty() => {
                flatten(child, &name, depth - 1, out);
            }
            _ => out.push((name, cell(child))),
        }
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(direct) = value.get(path) {
        return Some(direct);
    }
    path.split('.').try_fold(value, |current, key| current.get(key))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn table(headers: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "No items\n".to_string();
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(headers.to_vec());
    for row in rows {
        table.add_row(row.clone());
    }
    format!("{table}\n")
}

fn tsv(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        let escaped: Vec<String> = row.iter().map(|c| c.replace(['\t', '\n'], " ")).collect();
        out.push_str(&escaped.join("\t"));
        out.push('\n');
    }
    out
}

fn kvp(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        let pairs: Vec<String> = headers
            .iter()
            .zip(row)
            .map(|(key, value)| {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("{key}=\"{escaped}\"")
            })
            .collect();
        out.push_str(&pairs.join(" "));
        out.push('\n');
    }
    out
}

fn long(headers: &[String], rows: &[Vec<String>]) -> String {
    let separator = "-".repeat(80);
    let width = headers.iter().map(|h| h.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(out, "{separator}\n");
        for (key, value) in headers.iter().zip(row) {
            let _ = writeln!(out, "{key:>width$}: {value}");
        }
        out.push('\n');
    }
    if !rows.is_empty() {
        let _ = writeln!(out, "{separator}");
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
