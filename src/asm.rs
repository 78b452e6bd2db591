//! Mnemonic/label assembler. Source is a whitespace-separated stream of
//! cells; `//` starts a comment; an all upper-case token ending in `:`
//! defines a label at the address of the next emitted cell.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constrain::Word;
use crate::instructions::InstructionTable;

const COMMENT: &str = "//";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error(
        "unable to parse token \"{token}\" at {position} (line {}, column {})",
        .line + 1,
        .column + 1
    )]
    UnresolvedToken {
        token: String,
        /// Index among emitted cells.
        position: usize,
        line: usize,
        column: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Label,
    Operand,
}

/// A source token with its 0-based line and character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

fn is_label_definition(text: &str) -> bool {
    text.ends_with(':') && text == text.to_uppercase()
}

/// Split source into tokens: comments stripped, whitespace runs as separators.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    for (line, raw) in source.split('\n').enumerate() {
        let code = raw.find(COMMENT).map_or(raw, |p| &raw[..p]);
        let mut start: Option<(usize, usize)> = None; // (byte, column)
        let mut push = |from: usize, to: usize, column: usize| {
            let text = &code[from..to];
            let kind = if is_label_definition(text) {
                TokenKind::Label
            } else {
                TokenKind::Operand
            };
            out.push(Token {
                text,
                kind,
                line,
                column,
            });
        };
        for (column, (byte, ch)) in code.char_indices().enumerate() {
            if ch.is_whitespace() {
                if let Some((from, col)) = start.take() {
                    push(from, byte, col);
                }
            } else if start.is_none() {
                start = Some((byte, column));
            }
        }
        if let Some((from, col)) = start {
            push(from, code.len(), col);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

/// Emitted cell index to the source position of the token that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    locations: Vec<SourceLocation>,
}

impl SourceMap {
    pub fn get(&self, index: usize) -> Option<SourceLocation> {
        self.locations.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, SourceLocation)> + '_ {
        self.locations.iter().copied().enumerate()
    }

    /// First cell emitted from `line`, e.g. to place a breakpoint.
    pub fn first_on_line(&self, line: usize) -> Option<usize> {
        self.locations.iter().position(|loc| loc.line == line)
    }
}

/// Build the source map for `source` without resolving anything.
pub fn source_map(source: &str) -> SourceMap {
    SourceMap {
        locations: tokenize(source)
            .into_iter()
            .filter(|t| t.kind == TokenKind::Operand)
            .map(|t| SourceLocation {
                line: t.line,
                column: t.column,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub bytes: Vec<Word>,
    pub source_map: SourceMap,
}

/// Assemble `source` into memory cells.
pub fn assemble(table: &InstructionTable, source: &str) -> Result<Vec<Word>, AssembleError> {
    assemble_program(table, source).map(|p| p.bytes)
}

/// Assemble and build the source map in one go.
pub fn assemble_program(table: &InstructionTable, source: &str) -> Result<Program, AssembleError> {
    let tokens = tokenize(source);

    // Labels first so that forward references resolve. A label takes the
    // address of the next operand; a later definition of the same name wins.
    let mut labels: HashMap<String, Word> = HashMap::new();
    let mut address: Word = 0;
    for t in &tokens {
        match t.kind {
            TokenKind::Label => {
                labels.insert(label_name(t.text), address);
            }
            TokenKind::Operand => address += 1,
        }
    }

    let mnemonics = table.mnemonics();
    let operands: Vec<&Token<'_>> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Operand)
        .collect();

    let mut bytes = Vec::with_capacity(operands.len());
    for (position, t) in operands.iter().enumerate() {
        let value = resolve_token(t.text, &labels, &mnemonics).ok_or_else(|| {
            AssembleError::UnresolvedToken {
                token: t.text.to_string(),
                position,
                line: t.line,
                column: t.column,
            }
        })?;
        bytes.push(value);
    }
    debug!(cells = bytes.len(), labels = labels.len(), "assembled program");

    let source_map = SourceMap {
        locations: operands
            .iter()
            .map(|t| SourceLocation {
                line: t.line,
                column: t.column,
            })
            .collect(),
    };
    Ok(Program { bytes, source_map })
}

/// Only the first colon is dropped, so `A:B:` names the label `AB:`.
fn label_name(definition: &str) -> String {
    definition.replacen(':', "", 1)
}

fn resolve_token(
    text: &str,
    labels: &HashMap<String, Word>,
    mnemonics: &HashMap<&str, Word>,
) -> Option<Word> {
    if let Some(&addr) = labels.get(text) {
        return Some(addr);
    }
    if let Some(&op) = mnemonics.get(text) {
        return Some(op);
    }
    if let Some(ch) = quoted_char(text) {
        return Some(Word::from(u32::from(ch)));
    }
    text.parse::<Word>().ok()
}

/// `'x'` to `x`.
fn quoted_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next(), chars.next(), chars.next()) {
        (Some('\''), Some(ch), Some('\''), None) => Some(ch),
        _ => None,
    }
}
