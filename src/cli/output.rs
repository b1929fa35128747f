//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.  Status lines go to stderr so
//! stdout carries only values that scripts may capture.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::Encoding;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of keys and their stored encodings.
pub fn print_keys_table(rows: &[(String, Option<Encoding>)]) {
    if rows.is_empty() {
        info("No keys in this vault yet.");
        tip("Run `shardvault set <KEY> <VALUE>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Encoding"]);

    for (key, encoding) in rows {
        table.add_row(vec![
            key.clone(),
            encoding.map_or_else(|| "-".to_string(), |e| e.to_string()),
        ]);
    }

    println!("{table}");
}
