//! Mock pfish binary for integration testing
//!
//! Accepts `test -c <category> -o <name>` and answers with CRLF-delimited
//! output, so the runner can be exercised without a real pfish install.
//!
//! Environment:
//! - `MOCK_PFISH_LOG`: append each argument vector as a JSON line to this file
//! - `MOCK_PFISH_FAIL`: operation type name that exits with status 1

use serde_json::json;
use std::io::Write;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Ok(log) = std::env::var("MOCK_PFISH_LOG") {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)
            .expect("open mock log");
        writeln!(file, "{}", json!(args)).expect("write mock log");
    }

    let (category, name) = match parse_args(&args) {
        Some(parsed) => parsed,
        None => {
            eprintln!("usage: pfish test -c <category> -o <operation type>");
            std::process::exit(2);
        }
    };

    if std::env::var("MOCK_PFISH_FAIL").ok().as_deref() == Some(name) {
        print!("Testing {}\r\nFAILED", name);
        eprintln!("mock pfish: {} failed", name);
        std::process::exit(1);
    }

    print!("Testing {}\r\ncategory: {}\r\nPASSED", name, category);
}

fn parse_args(args: &[String]) -> Option<(&str, &str)> {
    match args {
        [cmd, c, category, o, name] if cmd == "test" && c == "-c" && o == "-o" => {
            Some((category.as_str(), name.as_str()))
        }
        _ => None,
    }
}
