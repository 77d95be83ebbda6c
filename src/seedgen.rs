//! Seed-corpus generation from C source literals.
//!
//! Every string, char, numeric and preprocessor-argument literal becomes one
//! seed file. Extracted integers additionally produce filler inputs of that
//! length, which primes the fuzzer for length-sensitive buffer bugs.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tree_sitter::Node;

use crate::csource::{children, CSource};
use crate::error::Result;

/// Largest extracted integer that still produces an `'a' * n` filler seed.
const MAX_FILLER_SIZE: i64 = 65536;

/// Un-escape one character following a backslash, C compiler fashion.
fn unescape_char(c: char) -> char {
    match c {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        '0' => '\0',
        '\\' | '\'' | '"' | '?' => c,
        other => {
            log::warn!("unknown escape character: {other} ({})", other as u32);
            ' '
        }
    }
}

/// Strip the surrounding quotes and resolve C escape sequences. An escaped
/// newline (line continuation) disappears entirely.
fn unescape_string(literal: &str) -> String {
    let chars: Vec<char> = literal.chars().collect();
    if chars.len() < 2 {
        return String::new();
    }
    let inner = &chars[1..chars.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == '\\' && i + 1 < inner.len() {
            i += 1;
            if inner[i] != '\n' {
                out.push(unescape_char(inner[i]));
            }
        } else {
            out.push(inner[i]);
        }
        i += 1;
    }
    out
}

/// Collects literals from parsed sources and writes them out as seeds.
#[derive(Default)]
pub struct SeedGenerator {
    strings: HashSet<String>,
    chars: HashSet<String>,
    ints: HashSet<String>,
    others: HashSet<String>,
}

impl SeedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one C file and record every literal it contains.
    pub fn parse_source(&mut self, source: &str) -> Result<()> {
        let src = CSource::parse(source.to_string())?;
        self.collect(&src, src.root());
        self.classify_others();
        Ok(())
    }

    fn collect(&mut self, src: &CSource, node: Node) {
        for child in children(node) {
            match child.kind() {
                "string_literal" => {
                    self.strings.insert(unescape_string(src.node_text(child)));
                }
                "char_literal" => {
                    self.chars.insert(unescape_string(src.node_text(child)));
                }
                "number_literal" => self.record_number(src.node_text(child)),
                // Skip includes so `#include "code.h"` is not taken as a seed.
                "preproc_include" => continue,
                "preproc_arg" => {
                    self.others.insert(src.node_text(child).to_string());
                }
                _ => {}
            }
            self.collect(src, child);
        }
    }

    /// Base-10 integers are kept apart; hex, floats and suffixed numbers are
    /// treated as plain strings.
    fn record_number(&mut self, literal: &str) {
        if literal.chars().all(|c| c.is_ascii_digit() || c == '-') {
            self.ints.insert(literal.to_string());
        } else {
            self.strings.insert(literal.to_string());
        }
    }

    /// Preprocessor arguments come in raw; sort them into the typed buckets
    /// by shape.
    fn classify_others(&mut self) {
        for other in self.others.clone() {
            if other.starts_with('"') && other.ends_with('"') && other.len() >= 2 {
                self.strings.insert(unescape_string(&other));
            }
            if other.starts_with('\'') && other.ends_with('\'') && other.len() >= 2 {
                self.chars.insert(unescape_string(&other));
            } else if other.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                let digits_end = other
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(other.len());
                if let Ok(num) = other[..digits_end].parse::<i64>() {
                    self.ints.insert(num.to_string());
                    if other[digits_end..].starts_with('.') {
                        // A float; keep its integer part as a string seed too.
                        self.strings.insert(num.to_string());
                    }
                }
            }
        }
    }

    /// Write one `<i>.txt` per collected literal, then `'a' * n` fillers for
    /// every extracted integer `1 ≤ n ≤ 65536` whose size is not yet taken.
    /// Returns the number of seed files created.
    pub fn create_seeds(&self, out_dir: &Path) -> Result<usize> {
        log::info!(
            "found constants: {} strings, {} chars, {} integers",
            self.strings.len(),
            self.chars.len(),
            self.ints.len()
        );

        let mut strings = self.strings.clone();
        strings.extend(self.chars.iter().cloned());
        strings.extend(self.ints.iter().cloned());
        strings.extend(self.others.iter().cloned());
        strings.remove("");

        fs::create_dir_all(out_dir)?;

        let mut sizes: HashSet<usize> = HashSet::new();
        let mut count = 0usize;

        for string in &strings {
            fs::write(out_dir.join(format!("{count}.txt")), string.as_bytes())?;
            sizes.insert(string.len());
            count += 1;
        }

        for int in &self.ints {
            let Ok(num) = int.parse::<i64>() else { continue };
            if num > 0 && num <= MAX_FILLER_SIZE && sizes.insert(num as usize) {
                fs::write(
                    out_dir.join(format!("{count}.txt")),
                    "a".repeat(num as usize),
                )?;
                count += 1;
            }
        }

        log::info!("created {count} new seeds");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_c_sequences() {
        assert_eq!(unescape_string("\"a\\nb\""), "a\nb");
        assert_eq!(unescape_string("\"tab\\there\""), "tab\there");
        assert_eq!(unescape_string("\"q\\\"q\""), "q\"q");
        assert_eq!(unescape_string("'x'"), "x");
        assert_eq!(unescape_string("\"\""), "");
    }

    #[test]
    fn collects_literals_by_type() {
        let mut gen = SeedGenerator::new();
        gen.parse_source(
            "#define LIMIT 42\nint check(const char *s) {\n    char c = 'x';\n    if (s[0] == c) return 100;\n    return -7;\n}\nconst char *greeting = \"hello\\n\";\n",
        )
        .unwrap();

        assert!(gen.strings.contains("hello\n"));
        assert!(gen.chars.contains("x"));
        assert!(gen.ints.contains("100"));
        assert!(gen.ints.contains("7"));
        assert!(gen.ints.contains("42"));
    }

    #[test]
    fn includes_are_not_seeds() {
        let mut gen = SeedGenerator::new();
        gen.parse_source("#include \"code.h\"\nint x = 1;\n").unwrap();
        assert!(!gen.strings.contains("code.h"));
    }

    #[test]
    fn non_decimal_numbers_become_strings() {
        let mut gen = SeedGenerator::new();
        gen.parse_source("double d = 3.5; int h = 0xff;\n").unwrap();
        assert!(gen.strings.contains("3.5"));
        assert!(gen.strings.contains("0xff"));
        assert!(gen.ints.is_empty());
    }

    #[test]
    fn creates_literal_and_filler_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = SeedGenerator::new();
        gen.parse_source("const char *s = \"abc\"; int n = 5;\n").unwrap();

        let count = gen.create_seeds(dir.path()).unwrap();

        let mut contents: Vec<Vec<u8>> = (0..count)
            .map(|i| fs::read(dir.path().join(format!("{i}.txt"))).unwrap())
            .collect();
        contents.sort();

        // "5", "abc" and the filler "aaaaa" (size 5 not otherwise taken).
        assert!(contents.contains(&b"abc".to_vec()));
        assert!(contents.contains(&b"5".to_vec()));
        assert!(contents.contains(&b"aaaaa".to_vec()));
    }

    #[test]
    fn fillers_skip_sizes_already_covered() {
        let dir = tempfile::tempdir().unwrap();
        let mut gen = SeedGenerator::new();
        // "abc" has length 3, so the integer 3 produces no filler.
        gen.parse_source("const char *s = \"abc\"; int n = 3;\n").unwrap();

        let count = gen.create_seeds(dir.path()).unwrap();
        let contents: Vec<Vec<u8>> = (0..count)
            .map(|i| fs::read(dir.path().join(format!("{i}.txt"))).unwrap())
            .collect();

        assert!(!contents.contains(&b"aaa".to_vec()));
    }
}
