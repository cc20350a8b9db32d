use rsiscope_core::Envelope;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Ndjson => {
            for line in ndjson_lines(envelope)? {
                println!("{line}");
            }
        }
        OutputFormat::Table => println!("{}", render_table(envelope)?),
    }

    Ok(())
}

/// One line for the metadata, then one per array element found under `data`.
fn ndjson_lines(envelope: &Envelope<Value>) -> Result<Vec<String>, CliError> {
    let mut lines = vec![serde_json::to_string(&json!({
        "meta": envelope.meta,
        "errors": envelope.errors,
    }))?];

    match &envelope.data {
        Value::Object(fields) => {
            for (key, value) in fields {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            lines.push(serde_json::to_string(&json!({ (key.clone()): item }))?);
                        }
                    }
                    other => lines.push(serde_json::to_string(&json!({ (key.clone()): other }))?),
                }
            }
        }
        other => lines.push(serde_json::to_string(other)?),
    }

    Ok(lines)
}

fn render_table(envelope: &Envelope<Value>) -> Result<String, CliError> {
    let mut out = Vec::new();
    out.push(format!("request_id  : {}", envelope.meta.request_id));
    if let Some(trace_id) = &envelope.meta.trace_id {
        out.push(format!("trace_id    : {trace_id}"));
    }
    out.push(format!("schema      : {}", envelope.meta.schema_version));
    out.push(format!("generated_at: {}", envelope.meta.generated_at));
    out.push(format!(
        "sources     : {}",
        envelope
            .meta
            .source_chain
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    ));
    out.push(format!("latency_ms  : {}", envelope.meta.latency_ms));

    if !envelope.meta.warnings.is_empty() {
        out.push(String::from("warnings:"));
        for warning in &envelope.meta.warnings {
            out.push(format!("  - {warning}"));
        }
    }

    out.push(String::from("data:"));
    let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
    for line in pretty_data.lines() {
        out.push(format!("  {line}"));
    }

    if !envelope.errors.is_empty() {
        out.push(String::from("errors:"));
        for error in &envelope.errors {
            match &error.symbol {
                Some(symbol) => out.push(format!("  - [{symbol}] {}: {}", error.code, error.message)),
                None => out.push(format!("  - {}: {}", error.code, error.message)),
            }
        }
    }

    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsiscope_core::{EnvelopeError, EnvelopeMeta, ProviderId};

    fn envelope() -> Envelope<Value> {
        let mut meta = EnvelopeMeta::new("req-12345678", "v1.0.0", vec![ProviderId::Yahoo], 7)
            .expect("valid meta");
        meta.push_warning("skipped 'XYZ': not found");
        Envelope::with_errors(
            meta,
            json!({ "symbol": "AAPL", "rows": [{ "price": 1.0 }, { "price": 2.0 }] }),
            vec![EnvelopeError {
                symbol: Some(String::from("XYZ")),
                ..EnvelopeError::new("source.not_found", "no data").expect("valid error")
            }],
        )
        .expect("valid envelope")
    }

    #[test]
    fn ndjson_emits_one_line_per_row() {
        let lines = ndjson_lines(&envelope()).expect("renders");
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("\"request_id\":\"req-12345678\""));
        assert_eq!(lines[1], r#"{"rows":{"price":1.0}}"#);
        assert_eq!(lines[3], r#"{"symbol":"AAPL"}"#);
    }

    #[test]
    fn table_lists_warnings_and_errors() {
        let table = render_table(&envelope()).expect("renders");
        assert!(table.contains("sources     : yahoo"));
        assert!(table.contains("  - skipped 'XYZ': not found"));
        assert!(table.contains("  - [XYZ] source.not_found: no data"));
    }
}
