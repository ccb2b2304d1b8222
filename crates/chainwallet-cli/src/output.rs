//! Output formatting for human-readable and JSON modes.
//!
//! Human mode uses colored terminal output.
//! JSON mode outputs pure JSON with no ANSI escapes.

use colored::Colorize;

/// Prints a success message.
pub fn print_success(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "status": "ok", "message": msg });
        println!("{}", obj);
    } else {
        println!("{} {}", "✓".green().bold(), msg);
    }
}

/// Prints a single key-value pair.
pub fn print_kv(key: &str, value: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ key: value });
        println!("{}", obj);
    } else {
        println!("{}: {}", key.bold(), value);
    }
}

/// Prints a JSON object: verbatim in JSON mode, one `key: value` line per
/// field otherwise.
pub fn print_object(value: &serde_json::Value, json_mode: bool) {
    if json_mode {
        println!("{value}");
        return;
    }
    match value.as_object() {
        Some(fields) => {
            for (key, field) in fields {
                match field {
                    serde_json::Value::String(s) => println!("{}: {}", key.bold(), s),
                    other => println!("{}: {}", key.bold(), other),
                }
            }
        }
        None => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Error formatting output: {e}"),
        },
    }
}

/// Prints an error message.
pub fn print_error(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "error": msg });
        eprintln!("{}", obj);
    } else {
        eprintln!("{} {}", "error:".red().bold(), msg);
    }
}

/// Prints rows under `headers` as aligned columns (human mode only;
/// JSON callers serialize their rows directly).
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        println!("{}", "(none)".dimmed());
        return;
    }

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .fold(h.len(), usize::max)
        })
        .collect();
    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(widths.iter().copied())
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!(
        "{}",
        render(headers.iter().map(|h| h.to_uppercase()).collect()).bold()
    );
    println!(
        "{}",
        render(widths.iter().map(|w| "-".repeat(*w)).collect()).dimmed()
    );
    for row in rows {
        println!("{}", render(row.clone()));
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Decodes a hex string of exactly `N` bytes.
pub fn parse_hex_array<const N: usize>(
    what: &str,
    s: &str,
) -> std::result::Result<[u8; N], String> {
    let bytes = parse_hex(what, s)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        format!(
            "{what} must be {} hex characters (got {})",
            N * 2,
            s.trim().len()
        )
    })
}

/// Decodes a hex string of any length.
pub fn parse_hex(what: &str, s: &str) -> std::result::Result<Vec<u8>, String> {
    hex::decode(s.trim()).map_err(|e| format!("{what} is not valid hex: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_array_length_checked() {
        assert_eq!(parse_hex_array::<2>("id", "abcd"), Ok([0xab, 0xcd]));
        assert!(parse_hex_array::<2>("id", "abcdef").is_err_and(|e| e.contains("4 hex")));
        assert!(parse_hex_array::<2>("id", "zz").is_err_and(|e| e.contains("not valid hex")));
    }
}
