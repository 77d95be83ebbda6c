//! Source instrumentation for line coverage.
//!
//! Each instrumented file gets a per-line hit array `_F<fileId>` and a
//! counter increment `++_F<fid>[idx];` spliced in front of every
//! instrumented statement. Braceless `if`/`else`/`for`/`while` bodies are
//! wrapped in `{ … }` so the increment stays inside the body. The file
//! defining `int main` additionally registers `_GenerateLcov` via `atexit`
//! and carries the array definitions plus the LCOV writer for every file;
//! the other files only declare the arrays `extern`.

use std::fmt::Write as _;

use tree_sitter::Node;

use crate::csource::{children, find_descendant, CSource};
use crate::error::Result;

/// Name of the trace the generated `_GenerateLcov` writes at exit.
pub const COVERAGE_FILE_NAME: &str = "coverage.lcov";

#[derive(Default)]
struct Instrumentation {
    /// `(byte offset, 1-based source line)` per counter, in source order.
    counters: Vec<(usize, usize)>,
    /// Literal splices: brace wrappers and the `atexit` registration.
    splices: Vec<(usize, String)>,
    last_line: Option<usize>,
    is_main_file: bool,
}

impl Instrumentation {
    /// At most one counter per source line.
    fn instrument_line(&mut self, byte: usize, line: usize) {
        if self.last_line != Some(line) {
            self.counters.push((byte, line));
            self.last_line = Some(line);
        }
    }
}

/// One source file prepared for instrumentation.
pub struct FileInstrument {
    text: String,
    pub filename: String,
    pub file_id: usize,
    pub is_main_file: bool,
    counters: Vec<(usize, usize)>,
    splices: Vec<(usize, String)>,
}

impl FileInstrument {
    pub fn new(text: String, filename: String, file_id: usize) -> Result<Self> {
        let src = CSource::parse(text)?;
        let mut ins = Instrumentation::default();
        scan_translation_unit(&src, &mut ins);

        Ok(Self {
            text: src.into_text(),
            filename,
            file_id,
            is_main_file: ins.is_main_file,
            counters: ins.counters,
            splices: ins.splices,
        })
    }

    /// Number of instrumented lines, i.e. the hit-array length.
    pub fn instrumented_lines(&self) -> usize {
        self.counters.len()
    }

    /// The instrumented source body, without any header.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.text.len() * 2);
        let mut pos = 0;
        let mut splice = 0;

        for (idx, &(counter_byte, _line)) in self.counters.iter().enumerate() {
            while splice < self.splices.len() && self.splices[splice].0 <= counter_byte {
                out.push_str(&self.text[pos..self.splices[splice].0]);
                pos = self.splices[splice].0;
                out.push_str(&self.splices[splice].1);
                splice += 1;
            }
            out.push_str(&self.text[pos..counter_byte]);
            pos = counter_byte;
            let _ = write!(out, "++_F{}[{}];", self.file_id, idx);
        }

        while splice < self.splices.len() {
            out.push_str(&self.text[pos..self.splices[splice].0]);
            pos = self.splices[splice].0;
            out.push_str(&self.splices[splice].1);
            splice += 1;
        }

        out.push_str(&self.text[pos..]);
        out
    }
}

fn scan_translation_unit(src: &CSource, ins: &mut Instrumentation) {
    for top_level in children(src.root()) {
        if top_level.kind() != "function_definition" {
            continue;
        }

        let Some(name) = find_descendant(top_level, "identifier") else {
            continue;
        };
        if src.node_text(name) == "main" {
            // Register the LCOV dump right after main's opening brace. A
            // declared-but-undefined main has no body and is skipped.
            if let Some(body) = children(top_level)
                .into_iter()
                .find(|child| child.kind() == "compound_statement")
            {
                if let Some(brace) = children(body).into_iter().find(|child| child.kind() == "{") {
                    ins.splices
                        .push((brace.end_byte(), "atexit(_GenerateLcov);".to_string()));
                    ins.is_main_file = true;
                }
            }
        }

        for child in children(top_level) {
            if child.kind() == "compound_statement" {
                instrument_recursive(src, child, ins);
                break;
            }
        }
    }
}

fn instrument_recursive(src: &CSource, node: Node, ins: &mut Instrumentation) {
    match node.kind() {
        "return_statement" | "break_statement" | "continue_statement" | "if_statement"
        | "declaration" | "expression_statement" | "for_statement" | "while_statement" => {
            ins.instrument_line(node.start_byte(), node.start_position().row + 1);
        }
        "compound_statement" | "{" | "}" | "comment" | "switch_statement" | "case_statement" => {}
        other => {
            log::debug!("not instrumenting untested node kind: {other}");
            return;
        }
    }

    match node.kind() {
        "for_statement" | "while_statement" => {
            if let Some(body) = node.child(node.child_count().saturating_sub(1)) {
                instrument_possible_one_liner(src, body, ins);
            }
        }
        "if_statement" => {
            if node.child_count() >= 3 {
                // Children: `if`, the parenthesized condition, then the
                // consequence (possibly preceded by comments).
                let mut idx = 2;
                while node.child(idx).is_some_and(|c| c.kind() == "comment") {
                    idx += 1;
                }
                if let Some(consequence) = node.child(idx) {
                    instrument_possible_one_liner(src, consequence, ins);
                }

                if let Some(last) = node.child(node.child_count() - 1) {
                    if last.kind() == "else_clause" {
                        if let Some(alternative) = last.child(1) {
                            instrument_possible_one_liner(src, alternative, ins);
                        }
                    }
                }
            }
        }
        "compound_statement" => {
            for child in children(node) {
                instrument_recursive(src, child, ins);
            }
        }
        "switch_statement" => {
            if let Some(body) = node.child(2) {
                instrument_recursive(src, body, ins);
            }
        }
        "case_statement" => {
            // Skip the label up to and including the colon, then treat the
            // arm like a statement sequence.
            let mut idx = 0;
            while node.child(idx).is_some_and(|c| c.kind() != ":") {
                idx += 1;
            }
            for i in idx + 1..node.child_count() {
                if let Some(child) = node.child(i) {
                    instrument_recursive(src, child, ins);
                }
            }
        }
        _ => {}
    }
}

/// Bodies of `if`/`else`/`for`/`while`: compound statements recurse as-is,
/// a lone statement gets wrapped in braces around its original span.
fn instrument_possible_one_liner(src: &CSource, statement: Node, ins: &mut Instrumentation) {
    match statement.kind() {
        "compound_statement" => instrument_recursive(src, statement, ins),
        "{" | "}" | "comment" => {}
        _ => {
            ins.splices.push((statement.start_byte(), "{".to_string()));
            instrument_recursive(src, statement, ins);
            ins.splices.push((statement.end_byte(), "}".to_string()));
        }
    }
}

/// Header for a file that does not define `main`: one extern declaration.
pub fn header_extern(file: &FileInstrument) -> String {
    format!("extern unsigned long long _F{}[];\n", file.file_id)
}

/// Header for the file defining `main`: hit arrays for every instrumented
/// file and the `_GenerateLcov` writer. Prepends exactly four lines, which
/// is the line skew the oracle compensates for in greybox mode.
pub fn header_main(all_files: &[FileInstrument]) -> String {
    let mut out = String::new();

    for file in all_files {
        let _ = write!(
            out,
            "unsigned long long _F{}[{}];",
            file.file_id,
            file.instrumented_lines()
        );
    }
    out.push('\n');

    out.push_str("#include <stdio.h>\n#include <stdlib.h>\n");
    let _ = write!(
        out,
        "void _GenerateLcov(){{FILE *f = fopen(\"{COVERAGE_FILE_NAME}\", \"w\");"
    );

    for file in all_files {
        let _ = write!(
            out,
            "unsigned long long LH{id}=0;for(unsigned long long i=0;i<{len};++i)if(_F{id}[i]>0)++LH{id};",
            id = file.file_id,
            len = file.instrumented_lines()
        );
    }

    out.push_str("fprintf(f,\"TN:test\\n");
    for file in all_files {
        let _ = write!(out, "SF:{}\\n", file.filename);
        for &(_, line) in &file.counters {
            let _ = write!(out, "DA:{line},%llu\\n");
        }
        let _ = write!(
            out,
            "LH:%llu\\nLF:{}\\nend_of_record\\n",
            file.instrumented_lines()
        );
    }
    out.push('"');

    for file in all_files {
        out.push(',');
        for idx in 0..file.instrumented_lines() {
            let _ = write!(out, "_F{}[{}],", file.file_id, idx);
        }
        let _ = write!(out, "LH{}", file.file_id);
    }

    out.push_str(");}\n");
    out
}
