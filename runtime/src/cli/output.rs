//! Terminal output helpers.

use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}

/// One `[OK]` / `[!!]` report line.
pub fn status_line(ok: bool, message: impl std::fmt::Display) -> String {
    format!("{} {message}", if ok { "[OK]" } else { "[!!]" })
}
