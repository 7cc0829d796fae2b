//! Hypergraph text parsing and identifier interning.
//!
//! The input format is one hyperedge per entry, `Name(v1, v2, …)`,
//! entries separated by commas and/or newlines. An integer prefix before
//! the name is accepted and ignored. Identifiers are alphanumeric
//! (underscores permitted); vertex identifiers may be purely numeric.
//!
//! Parsing is parameterized by a per-call [`Interner`] that is returned
//! alongside the graph; there is no global symbol table. Edge names are
//! interned before any vertex so the id layout is reproducible: ids are
//! assigned from 1 upward, edges first, then vertices in order of first
//! occurrence.

use crate::edges::{Edge, Edges};
use crate::graph::Graph;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::Path;

// ============================================================================
// Interner
// ============================================================================

/// A bidirectional identifier table. Ids start at 1; 0 is never issued.
#[derive(Clone, Debug, Default)]
pub struct Interner {
    names: Vec<String>,
    ids: FxHashMap<String, u32>,
}

impl Interner {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, issuing a fresh one on first sight.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        self.names.push(name.to_owned());
        let id = self.names.len() as u32;
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Looks up a name without interning it.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Resolves an id back to its name.
    pub fn resolve(&self, id: u32) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.names.get(id as usize - 1).map(String::as_str)
    }

    /// Number of interned identifiers.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns whether nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The largest id issued so far.
    pub fn max_id(&self) -> u32 {
        self.names.len() as u32
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Parse and I/O failures at the input boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A character that can start neither an identifier nor punctuation.
    UnexpectedChar {
        /// Byte offset into the input.
        position: usize,
        /// The offending character.
        ch: char,
    },
    /// An integer prefix was not followed by an edge name.
    ExpectedName {
        /// Byte offset into the input.
        position: usize,
    },
    /// An edge name was not followed by `(`.
    ExpectedParen {
        /// Byte offset into the input.
        position: usize,
    },
    /// The input ended inside a vertex list.
    UnclosedEdge {
        /// Name of the unterminated edge.
        name: String,
    },
    /// The same edge name occurred twice.
    DuplicateEdge {
        /// The repeated name.
        name: String,
    },
    /// Reading the input file failed.
    Io(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedChar { position, ch } => {
                write!(f, "unexpected character {ch:?} at byte {position}")
            }
            ParseError::ExpectedName { position } => {
                write!(f, "expected an edge name at byte {position}")
            }
            ParseError::ExpectedParen { position } => {
                write!(f, "expected '(' at byte {position}")
            }
            ParseError::UnclosedEdge { name } => {
                write!(f, "edge {name:?} is missing its closing ')'")
            }
            ParseError::DuplicateEdge { name } => {
                write!(f, "edge name {name:?} occurs more than once")
            }
            ParseError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a hypergraph from text. An empty (or whitespace-only) input
/// yields the empty graph.
pub fn parse_hypergraph(text: &str) -> Result<(Graph, Interner), ParseError> {
    let entries = scan_entries(text)?;

    let mut interner = Interner::new();
    for entry in &entries {
        if interner.lookup(&entry.name).is_some() {
            return Err(ParseError::DuplicateEdge {
                name: entry.name.clone(),
            });
        }
        interner.intern(&entry.name);
    }

    let mut edges = Vec::with_capacity(entries.len());
    for entry in &entries {
        let name_id = interner
            .lookup(&entry.name)
            .expect("edge names interned above");
        let vertices = entry.vertices.iter().map(|v| interner.intern(v)).collect();
        edges.push(Edge::new(name_id, vertices));
    }
    Ok((Graph::new(Edges::new(edges)), interner))
}

/// Reads and parses a hypergraph file.
pub fn load_hypergraph(path: impl AsRef<Path>) -> Result<(Graph, Interner), ParseError> {
    let text =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ParseError::Io(e.to_string()))?;
    parse_hypergraph(&text)
}

struct RawEdge {
    name: String,
    vertices: Vec<String>,
}

fn scan_entries(text: &str) -> Result<Vec<RawEdge>, ParseError> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let mut entries = Vec::new();

    loop {
        skip_separators(bytes, &mut pos);
        if pos == bytes.len() {
            return Ok(entries);
        }
        if !is_word_byte(bytes[pos]) {
            return Err(unexpected(text, pos));
        }

        let first = read_word(bytes, &mut pos);
        skip_whitespace(bytes, &mut pos);

        // An all-digit token is the ignored integer prefix; the actual
        // edge name has to follow.
        let name = if first.bytes().all(|b| b.is_ascii_digit()) {
            if pos == bytes.len() || !is_word_byte(bytes[pos]) {
                return Err(ParseError::ExpectedName { position: pos });
            }
            read_word(bytes, &mut pos)
        } else {
            first
        };

        skip_whitespace(bytes, &mut pos);
        if pos == bytes.len() || bytes[pos] != b'(' {
            return Err(ParseError::ExpectedParen { position: pos });
        }
        pos += 1;

        let mut vertices = Vec::new();
        loop {
            skip_separators(bytes, &mut pos);
            if pos == bytes.len() {
                return Err(ParseError::UnclosedEdge { name });
            }
            if bytes[pos] == b')' {
                pos += 1;
                break;
            }
            if !is_word_byte(bytes[pos]) {
                return Err(unexpected(text, pos));
            }
            vertices.push(read_word(bytes, &mut pos));
        }

        entries.push(RawEdge { name, vertices });
    }
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn read_word(bytes: &[u8], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < bytes.len() && is_word_byte(bytes[*pos]) {
        *pos += 1;
    }
    String::from_utf8_lossy(&bytes[start..*pos]).into_owned()
}

fn skip_whitespace(bytes: &[u8], pos: &mut usize) {
    while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
}

fn skip_separators(bytes: &[u8], pos: &mut usize) {
    while *pos < bytes.len() && (bytes[*pos].is_ascii_whitespace() || bytes[*pos] == b',') {
        *pos += 1;
    }
}

fn unexpected(text: &str, pos: usize) -> ParseError {
    let ch = text[pos..].chars().next().unwrap_or('\u{fffd}');
    ParseError::UnexpectedChar { position: pos, ch }
}

// ============================================================================
// Tests
// ============================================================================
