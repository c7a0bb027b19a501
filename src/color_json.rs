//! Purpose: Pretty-print decoded JSON for terminals, flagging strings that still look like mojibake.
//! Exports: `colorize_json`.
//! Role: Pure formatter behind the CLI's stdout emission when stdout is a TTY.
//! Invariants: With color off, output equals `serde_json::to_string_pretty`.
//! Invariants: Strings that `looks_corrupted` accepts render in the warning color.
use framepass::core::mojibake::looks_corrupted;
use serde_json::{Map, Value};

const INDENT: &str = "  ";

const KEY: &str = "36";
const STRING: &str = "32";
const SUSPECT: &str = "1;31";
const NUMBER: &str = "33";
const LITERAL: &str = "35";
const PUNCT: &str = "39";

pub fn colorize_json(value: &Value, use_color: bool) -> String {
    let mut painter = Painter {
        out: String::new(),
        use_color,
    };
    painter.value(value, 0);
    painter.out
}

struct Painter {
    out: String,
    use_color: bool,
}

impl Painter {
    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.paint("null", LITERAL),
            Value::Bool(flag) => self.paint(if *flag { "true" } else { "false" }, LITERAL),
            Value::Number(num) => self.paint(&num.to_string(), NUMBER),
            Value::String(text) => {
                let color = if looks_corrupted(text) { SUSPECT } else { STRING };
                self.paint(&quoted(text), color);
            }
            Value::Array(items) => self.array(items, depth),
            Value::Object(map) => self.object(map, depth),
        }
    }

    fn array(&mut self, items: &[Value], depth: usize) {
        if items.is_empty() {
            self.paint("[]", PUNCT);
            return;
        }
        self.paint("[", PUNCT);
        for (idx, item) in items.iter().enumerate() {
            self.newline(depth + 1);
            self.value(item, depth + 1);
            if idx + 1 < items.len() {
                self.paint(",", PUNCT);
            }
        }
        self.newline(depth);
        self.paint("]", PUNCT);
    }

    fn object(&mut self, map: &Map<String, Value>, depth: usize) {
        if map.is_empty() {
            self.paint("{}", PUNCT);
            return;
        }
        self.paint("{", PUNCT);
        for (idx, (key, value)) in map.iter().enumerate() {
            self.newline(depth + 1);
            self.paint(&quoted(key), KEY);
            self.paint(":", PUNCT);
            self.out.push(' ');
            self.value(value, depth + 1);
            if idx + 1 < map.len() {
                self.paint(",", PUNCT);
            }
        }
        self.newline(depth);
        self.paint("}", PUNCT);
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        self.out.push_str(&INDENT.repeat(depth));
    }

    fn paint(&mut self, text: &str, color: &str) {
        if self.use_color {
            self.out.push_str(&format!("\u{1b}[{color}m{text}\u{1b}[0m"));
        } else {
            self.out.push_str(text);
        }
    }
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
