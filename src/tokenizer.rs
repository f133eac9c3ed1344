//! Phase-3 tokenization: logical lines into preprocessing tokens

use std::fmt;
use std::rc::Rc;

use crate::error::Diagnostics;
use crate::files::SourceFile;
use crate::lines::{LineReader, LineStatus};
use crate::spelling::Spelling;

/// A position in original source coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePos {
    pub path: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.column)
    }
}

/// One level of provenance attached to an emitted token: the file it
/// physically sits in, an include site that was crossed, or a macro
/// expansion it was produced by.
#[derive(Clone, Debug)]
pub enum SourceFrame {
    File(SourcePos),
    Include(SourcePos),
    Macro {
        name: String,
        defined_at: SourcePos,
    },
}

/// Preprocessing token kinds per C11 6.4. `Placemarker` and
/// `ConcatDoubleHash` are internal to the macro engine: a placemarker gives
/// `##` a defined meaning for empty arguments, and `ConcatDoubleHash` marks
/// a `##` spelled out by pasting two `#`s, which must never be treated as an
/// operator again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PpTokenKind {
    HeaderName,
    Identifier,
    Number,
    CharConst,
    StrLiteral,
    Hash,
    DoubleHash,
    Dot,
    Arrow,
    Comma,
    QuestionMark,
    Assign,
    Plus,
    PlusAssign,
    Minus,
    MinusAssign,
    Star,
    StarAssign,
    Div,
    DivAssign,
    Mod,
    ModAssign,
    Increment,
    Decrement,
    Equals,
    NotEquals,
    Greater,
    GreaterEquals,
    Less,
    LessEquals,
    LogicalNot,
    LogicalAnd,
    LogicalOr,
    BitwiseNot,
    BitwiseAnd,
    BitwiseAndAssign,
    BitwiseOr,
    BitwiseOrAssign,
    BitwiseXor,
    BitwiseXorAssign,
    LeftShift,
    LeftShiftAssign,
    RightShift,
    RightShiftAssign,
    OpenSquareBracket,
    CloseSquareBracket,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Semicolon,
    Colon,
    Other,
    Placemarker,
    ConcatDoubleHash,
}

/// A preprocessing token. `has_whitespace` means whitespace (or a comment,
/// or the end of the line) follows the token in the source. `frames` lists
/// the macro expansions the token has left, outermost first; it stays empty
/// for tokens that never passed through one.
#[derive(Clone, Debug)]
pub struct PpToken {
    pub kind: PpTokenKind,
    pub data: Spelling,
    pub source: SourcePos,
    pub frames: Vec<SourceFrame>,
    pub has_whitespace: bool,
}

impl PpToken {
    pub fn is_identifier(&self, name: &str) -> bool {
        self.kind == PpTokenKind::Identifier && self.data == name
    }
}

// Newlines are line terminators, not whitespace.
fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == 0x0b || c == 0x0c
}

fn is_ident_start(c: u8) -> bool {
    (c >= b'a' && c <= b'z') || (c >= b'A' && c <= b'Z') || c == b'_'
}

fn is_ident_char(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

struct LineScanner<'a> {
    data: &'a [u8],
    vec: &'a mut Vec<PpToken>,
    /// Length of `vec` when scanning started; only tokens pushed by this
    /// scan may receive a whitespace mark.
    first: usize,
    path: Rc<str>,
    line: u32,
    column: u32,
    done: usize,
    processed: usize,
}

impl<'a> LineScanner<'a> {
    fn remaining(&self) -> bool {
        self.done + self.processed < self.data.len()
    }

    fn has(&self, n: usize) -> bool {
        self.done + self.processed + n < self.data.len()
    }

    fn at(&self, n: usize) -> u8 {
        self.data[self.done + self.processed + n]
    }

    /// Flushes the current run as whitespace and marks the previous token.
    fn whitespace(&mut self) {
        self.done += self.processed;
        self.column += self.processed as u32;
        self.processed = 0;

        if self.vec.len() > self.first {
            self.vec.last_mut().unwrap().has_whitespace = true;
        }
    }

    fn push(&mut self, kind: PpTokenKind) {
        let data = Spelling::from_slice(&self.data[self.done..self.done + self.processed]);
        let source = SourcePos {
            path: self.path.clone(),
            line: self.line,
            column: self.column,
        };

        self.vec.push(PpToken {
            kind,
            data,
            source,
            frames: Vec::new(),
            has_whitespace: false,
        });

        self.done += self.processed;
        self.column += self.processed as u32;
        self.processed = 0;
    }

    fn pos(&self) -> SourcePos {
        SourcePos {
            path: self.path.clone(),
            line: self.line,
            column: self.column,
        }
    }
}

/// Tokenizes one source file, one logical line per call. Block comments and
/// the `#include` header-name latch carry over between lines.
#[derive(Debug)]
pub struct Tokenizer {
    reader: LineReader,
    line: Vec<u8>,
    in_multiline_comment: bool,
    multiline_start: Option<SourcePos>,
    in_include: bool,
    finished: bool,
}

impl Tokenizer {
    pub fn new(file: Rc<SourceFile>) -> Tokenizer {
        Tokenizer {
            reader: LineReader::new(file),
            line: Vec::new(),
            in_multiline_comment: false,
            multiline_start: None,
            in_include: false,
            finished: false,
        }
    }

    /// Tokenizer over an in-memory fragment, used for command-line macro
    /// definitions and token pasting.
    pub fn from_source(name: &str, contents: Vec<u8>) -> Tokenizer {
        Tokenizer::new(SourceFile::virtual_file(name, contents))
    }

    pub fn path(&self) -> Rc<str> {
        self.reader.path()
    }

    /// First source line of the most recently read logical line.
    pub fn line_start(&self) -> u32 {
        self.reader.line_start
    }

    /// Source line the next logical line will start on.
    pub fn next_physical_line(&self) -> u32 {
        self.reader.line_end
    }

    /// Appends the pp-tokens of the next logical line to `vec`. Returns
    /// false once the input is exhausted and no line was produced.
    pub fn tokenize_line(&mut self, vec: &mut Vec<PpToken>, diags: &mut Diagnostics) -> bool {
        if self.finished {
            return false;
        }

        let mut buf = std::mem::replace(&mut self.line, Vec::new());
        let status = self.reader.next_line(&mut buf, diags);
        self.line = buf;

        match status {
            LineStatus::HasMore => {},
            LineStatus::LastLine => self.finished = true,
            LineStatus::Eof => {
                self.finished = true;
                self.report_open_comment(diags);
                return false;
            }
        }

        let line = std::mem::replace(&mut self.line, Vec::new());
        self.scan(&line, vec, diags);
        self.line = line;

        if self.finished {
            self.report_open_comment(diags);
        }

        true
    }

    fn report_open_comment(&mut self, diags: &mut Diagnostics) {
        if self.in_multiline_comment {
            let pos = self.multiline_start.take();
            diags.error(pos, Vec::new(), "Unterminated multi-line comment.".to_string());
            self.in_multiline_comment = false;
        }
    }

    fn scan(&mut self, data: &[u8], vec: &mut Vec<PpToken>, diags: &mut Diagnostics) {
        let first = vec.len();
        let mut s = LineScanner {
            data,
            vec,
            first,
            path: self.reader.path(),
            line: self.reader.line_start,
            column: self.reader.column_start,
            done: 0,
            processed: 0,
        };

        let mut in_strliteral = false;
        let mut in_charliteral = false;
        let mut literal_start = None;

        while s.remaining() {
            if self.in_multiline_comment {
                if s.has(1) && s.at(0) == b'*' && s.at(1) == b'/' {
                    self.in_multiline_comment = false;
                    self.multiline_start = None;
                    s.processed += 2;
                    s.whitespace();
                } else {
                    s.processed += 1;
                }
            } else if in_strliteral {
                if s.has(1) && s.at(0) == b'\\' && (s.at(1) == b'"' || s.at(1) == b'\\') {
                    s.processed += 2;
                } else if s.at(0) == b'"' {
                    s.processed += 1;
                    s.push(PpTokenKind::StrLiteral);
                    in_strliteral = false;
                    literal_start = None;
                } else {
                    s.processed += 1;
                }
            } else if in_charliteral {
                if s.has(1) && s.at(0) == b'\\' && (s.at(1) == b'\'' || s.at(1) == b'\\') {
                    s.processed += 2;
                } else if s.at(0) == b'\'' {
                    s.processed += 1;
                    s.push(PpTokenKind::CharConst);
                    in_charliteral = false;
                    literal_start = None;
                } else {
                    s.processed += 1;
                }
            } else if self.in_include {
                if is_whitespace(s.at(0)) {
                    s.processed += 1;
                    while s.has(0) && is_whitespace(s.at(0)) {
                        s.processed += 1;
                    }
                    s.whitespace();
                }

                self.in_include = false;

                if s.remaining() {
                    if s.at(0) == b'"' {
                        // No escapes inside header names.
                        s.processed += 1;
                        let mut closed = false;
                        while s.has(0) {
                            if s.at(0) == b'"' {
                                s.processed += 1;
                                s.push(PpTokenKind::HeaderName);
                                closed = true;
                                break;
                            }
                            s.processed += 1;
                        }
                        if !closed {
                            diags.error(Some(s.pos()), Vec::new(),
                                "Relative include not closed on its line.".to_string());
                        }
                    } else if s.at(0) == b'<' {
                        s.processed += 1;
                        let mut closed = false;
                        while s.has(0) {
                            if s.at(0) == b'>' {
                                s.processed += 1;
                                s.push(PpTokenKind::HeaderName);
                                closed = true;
                                break;
                            }
                            s.processed += 1;
                        }
                        if !closed {
                            diags.error(Some(s.pos()), Vec::new(),
                                "Absolute include not closed on its line.".to_string());
                        }
                    }
                }
            } else if s.has(1) && s.at(0) == b'/' && s.at(1) == b'/' {
                // Line comment: the rest of the logical line is whitespace.
                s.processed = s.data.len() - s.done;
                s.whitespace();
            } else if s.has(1) && s.at(0) == b'/' && s.at(1) == b'*' {
                self.multiline_start = Some(s.pos());
                self.in_multiline_comment = true;
                s.processed += 2;
            } else if s.at(0) == b'"' {
                literal_start = Some(s.pos());
                s.processed += 1;
                in_strliteral = true;
            } else if s.at(0) == b'\'' {
                literal_start = Some(s.pos());
                s.processed += 1;
                in_charliteral = true;
            } else if is_whitespace(s.at(0)) {
                s.processed += 1;
                while s.has(0) && is_whitespace(s.at(0)) {
                    s.processed += 1;
                }
                s.whitespace();
            } else if is_ident_start(s.at(0)) {
                s.processed += 1;
                while s.has(0) && is_ident_char(s.at(0)) {
                    s.processed += 1;
                }
                s.push(PpTokenKind::Identifier);

                // Header-name mode: `#` opening the line followed by `include`.
                let len = s.vec.len();
                if len - s.first == 2
                    && s.vec[s.first].kind == PpTokenKind::Hash
                    && s.vec[len - 1].data == "include"
                {
                    self.in_include = true;
                }
            } else if s.at(0) == b'#' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'#' {
                    s.processed += 1;
                    s.push(PpTokenKind::DoubleHash);
                } else {
                    s.push(PpTokenKind::Hash);
                }
            } else if s.at(0) == b'-' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'>' {
                    s.processed += 1;
                    s.push(PpTokenKind::Arrow);
                } else if s.has(0) && s.at(0) == b'-' {
                    s.processed += 1;
                    s.push(PpTokenKind::Decrement);
                } else if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::MinusAssign);
                } else {
                    s.push(PpTokenKind::Minus);
                }
            } else if s.at(0) == b',' {
                s.processed += 1;
                s.push(PpTokenKind::Comma);
            } else if s.at(0) == b'?' {
                s.processed += 1;
                s.push(PpTokenKind::QuestionMark);
            } else if s.at(0) == b'=' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::Equals);
                } else {
                    s.push(PpTokenKind::Assign);
                }
            } else if s.at(0) == b'+' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'+' {
                    s.processed += 1;
                    s.push(PpTokenKind::Increment);
                } else if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::PlusAssign);
                } else {
                    s.push(PpTokenKind::Plus);
                }
            } else if s.at(0) == b'*' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::StarAssign);
                } else {
                    s.push(PpTokenKind::Star);
                }
            } else if s.at(0) == b'/' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::DivAssign);
                } else {
                    s.push(PpTokenKind::Div);
                }
            } else if s.at(0) == b'%' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::ModAssign);
                } else if s.has(0) && s.at(0) == b'>' {
                    // Digraph for `}`
                    s.processed += 1;
                    s.push(PpTokenKind::CloseBracket);
                } else if s.has(0) && s.at(0) == b':' {
                    s.processed += 1;
                    if s.has(1) && s.at(0) == b'%' && s.at(1) == b':' {
                        s.processed += 2;
                        s.push(PpTokenKind::DoubleHash);
                    } else if s.has(0) && s.at(0) == b'#' {
                        s.processed += 1;
                        s.push(PpTokenKind::DoubleHash);
                    } else {
                        s.push(PpTokenKind::Hash);
                    }
                } else {
                    s.push(PpTokenKind::Mod);
                }
            } else if s.at(0) == b'!' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::NotEquals);
                } else {
                    s.push(PpTokenKind::LogicalNot);
                }
            } else if s.at(0) == b'>' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::GreaterEquals);
                } else if s.has(1) && s.at(0) == b'>' && s.at(1) == b'=' {
                    s.processed += 2;
                    s.push(PpTokenKind::RightShiftAssign);
                } else if s.has(0) && s.at(0) == b'>' {
                    s.processed += 1;
                    s.push(PpTokenKind::RightShift);
                } else {
                    s.push(PpTokenKind::Greater);
                }
            } else if s.at(0) == b'<' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::LessEquals);
                } else if s.has(1) && s.at(0) == b'<' && s.at(1) == b'=' {
                    s.processed += 2;
                    s.push(PpTokenKind::LeftShiftAssign);
                } else if s.has(0) && s.at(0) == b'<' {
                    s.processed += 1;
                    s.push(PpTokenKind::LeftShift);
                } else if s.has(0) && s.at(0) == b':' {
                    // Digraph for `[`
                    s.processed += 1;
                    s.push(PpTokenKind::OpenSquareBracket);
                } else if s.has(0) && s.at(0) == b'%' {
                    // Digraph for `{`
                    s.processed += 1;
                    s.push(PpTokenKind::OpenBracket);
                } else {
                    s.push(PpTokenKind::Less);
                }
            } else if s.at(0) == b'&' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::BitwiseAndAssign);
                } else if s.has(0) && s.at(0) == b'&' {
                    s.processed += 1;
                    s.push(PpTokenKind::LogicalAnd);
                } else {
                    s.push(PpTokenKind::BitwiseAnd);
                }
            } else if s.at(0) == b'|' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::BitwiseOrAssign);
                } else if s.has(0) && s.at(0) == b'|' {
                    s.processed += 1;
                    s.push(PpTokenKind::LogicalOr);
                } else {
                    s.push(PpTokenKind::BitwiseOr);
                }
            } else if s.at(0) == b'~' {
                s.processed += 1;
                s.push(PpTokenKind::BitwiseNot);
            } else if s.at(0) == b'^' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'=' {
                    s.processed += 1;
                    s.push(PpTokenKind::BitwiseXorAssign);
                } else {
                    s.push(PpTokenKind::BitwiseXor);
                }
            } else if s.at(0) == b'[' {
                s.processed += 1;
                s.push(PpTokenKind::OpenSquareBracket);
            } else if s.at(0) == b']' {
                s.processed += 1;
                s.push(PpTokenKind::CloseSquareBracket);
            } else if s.at(0) == b'{' {
                s.processed += 1;
                s.push(PpTokenKind::OpenBracket);
            } else if s.at(0) == b'}' {
                s.processed += 1;
                s.push(PpTokenKind::CloseBracket);
            } else if s.at(0) == b'(' {
                s.processed += 1;
                s.push(PpTokenKind::OpenParen);
            } else if s.at(0) == b')' {
                s.processed += 1;
                s.push(PpTokenKind::CloseParen);
            } else if s.at(0) == b';' {
                s.processed += 1;
                s.push(PpTokenKind::Semicolon);
            } else if s.at(0) == b':' {
                s.processed += 1;
                if s.has(0) && s.at(0) == b'>' {
                    // Digraph for `]`
                    s.processed += 1;
                    s.push(PpTokenKind::CloseSquareBracket);
                } else {
                    s.push(PpTokenKind::Colon);
                }
            } else if s.at(0) == b'.' {
                s.processed += 1;
                if s.has(0) && s.at(0).is_ascii_digit() {
                    scan_number_rest(&mut s);
                    s.push(PpTokenKind::Number);
                } else {
                    s.push(PpTokenKind::Dot);
                }
            } else if s.at(0).is_ascii_digit() {
                s.processed += 1;
                scan_number_rest(&mut s);
                s.push(PpTokenKind::Number);
            } else {
                s.processed += 1;
                s.push(PpTokenKind::Other);
            }
        }

        // The newline counts as whitespace.
        s.whitespace();

        if in_strliteral {
            diags.error(literal_start, Vec::new(), "Unterminated string literal.".to_string());
        } else if in_charliteral {
            diags.error(literal_start, Vec::new(), "Unterminated character literal.".to_string());
        }
    }
}

// pp-number: identifier characters and dots, with `e+`/`p-`-style exponent
// sign sequences folded in. The first character has already been consumed.
fn scan_number_rest(s: &mut LineScanner) {
    while s.has(0) && (is_ident_char(s.at(0)) || s.at(0) == b'.') {
        s.processed += 1;

        let prev = s.data[s.done + s.processed - 1];
        if prev == b'e' || prev == b'E' || prev == b'p' || prev == b'P' {
            if s.has(0) && (s.at(0) == b'+' || s.at(0) == b'-') {
                s.processed += 1;
            }
        }
    }
}

/// Pastes two tokens per the `##` operator. The joined spelling is run back
/// through the tokenizer and must come out as exactly one token; `None`
/// otherwise. Placemarkers absorb into the other operand, and a `##` spelled
/// out of two `#`s comes back as `ConcatDoubleHash` so it is never
/// re-interpreted as an operator.
pub fn concatenate(left: &PpToken, right: &PpToken) -> Option<PpToken> {
    if right.kind == PpTokenKind::Placemarker {
        // This also covers two placemarkers.
        return Some(left.clone());
    }
    if left.kind == PpTokenKind::Placemarker {
        return Some(right.clone());
    }

    let mut joined = Vec::with_capacity(left.data.len() + right.data.len());
    joined.extend_from_slice(left.data.as_bytes());
    joined.extend_from_slice(right.data.as_bytes());

    let mut scratch = Diagnostics::new(false);
    let mut tokens = Vec::new();
    let mut tokenizer = Tokenizer::from_source("<paste>", joined);
    while tokenizer.tokenize_line(&mut tokens, &mut scratch) {}

    if tokens.len() != 1 || scratch.has_errors() {
        return None;
    }

    let result = tokens.pop().unwrap();
    let kind = if result.kind == PpTokenKind::DoubleHash {
        PpTokenKind::ConcatDoubleHash
    } else {
        result.kind
    };

    Some(PpToken {
        kind,
        data: result.data,
        source: left.source.clone(),
        frames: left.frames.clone(),
        has_whitespace: right.has_whitespace,
    })
}
