//! Final token classification (simplified phase 7)

use std::io::{Error};
use std::rc::Rc;

use crate::spelling::Spelling;
use crate::tokenizer::{PpToken, PpTokenKind, SourceFrame};

/// Final token kinds handed to the parser. Preprocessing-only kinds
/// (`#`, `##`, header names, placemarkers) have no counterpart here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    CharConst,
    StrLiteral,
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
}

/// `#line`-adjusted origin of an emitted token: `path` is set only while a
/// `#line` directive with a path is in effect, `line` is the adjusted
/// emission line (the physical one when no override is active).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineMark {
    pub path: Option<Rc<str>>,
    pub line: u32,
}

/// A classified output token with full provenance: the file position it was
/// born at, the include chain that was crossed, and the macro expansions it
/// was produced by, oldest frame first.
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub data: Spelling,
    pub stack: Vec<SourceFrame>,
    pub line: LineMark,
    pub has_whitespace: bool,
}

// C11 6.4.1.
pub const KEYWORDS: [&str; 44] = [
    "auto", "break", "case", "char", "const", "continue", "default", "do",
    "double", "else", "enum", "extern", "float", "for", "goto", "if",
    "inline", "int", "long", "register", "restrict", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union",
    "unsigned", "void", "volatile", "while",
    "_Alignas", "_Alignof", "_Atomic", "_Bool", "_Complex", "_Generic",
    "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Maps a pp-token kind to its final kind. Kinds that must never survive to
/// this point are an internal error: the driver is responsible for reporting
/// and dropping stray `#`/`##`/unknown-byte tokens beforehand.
pub fn classify(tok: &PpToken) -> Result<TokenKind, Error> {
    let kind = match tok.kind {
        PpTokenKind::Identifier => {
            if is_keyword(tok.data.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            }
        },
        PpTokenKind::Number => TokenKind::Number,
        PpTokenKind::CharConst => TokenKind::CharConst,
        PpTokenKind::StrLiteral => TokenKind::StrLiteral,
        PpTokenKind::Dot => TokenKind::Dot,
        PpTokenKind::Arrow => TokenKind::Arrow,
        PpTokenKind::Comma => TokenKind::Comma,
        PpTokenKind::QuestionMark => TokenKind::QuestionMark,
        PpTokenKind::Assign => TokenKind::Assign,
        PpTokenKind::Plus => TokenKind::Plus,
        PpTokenKind::PlusAssign => TokenKind::PlusAssign,
        PpTokenKind::Minus => TokenKind::Minus,
        PpTokenKind::MinusAssign => TokenKind::MinusAssign,
        PpTokenKind::Star => TokenKind::Star,
        PpTokenKind::StarAssign => TokenKind::StarAssign,
        PpTokenKind::Div => TokenKind::Div,
        PpTokenKind::DivAssign => TokenKind::DivAssign,
        PpTokenKind::Mod => TokenKind::Mod,
        PpTokenKind::ModAssign => TokenKind::ModAssign,
        PpTokenKind::Increment => TokenKind::Increment,
        PpTokenKind::Decrement => TokenKind::Decrement,
        PpTokenKind::Equals => TokenKind::Equals,
        PpTokenKind::NotEquals => TokenKind::NotEquals,
        PpTokenKind::Greater => TokenKind::Greater,
        PpTokenKind::GreaterEquals => TokenKind::GreaterEquals,
        PpTokenKind::Less => TokenKind::Less,
        PpTokenKind::LessEquals => TokenKind::LessEquals,
        PpTokenKind::LogicalNot => TokenKind::LogicalNot,
        PpTokenKind::LogicalAnd => TokenKind::LogicalAnd,
        PpTokenKind::LogicalOr => TokenKind::LogicalOr,
        PpTokenKind::BitwiseNot => TokenKind::BitwiseNot,
        PpTokenKind::BitwiseAnd => TokenKind::BitwiseAnd,
        PpTokenKind::BitwiseAndAssign => TokenKind::BitwiseAndAssign,
        PpTokenKind::BitwiseOr => TokenKind::BitwiseOr,
        PpTokenKind::BitwiseOrAssign => TokenKind::BitwiseOrAssign,
        PpTokenKind::BitwiseXor => TokenKind::BitwiseXor,
        PpTokenKind::BitwiseXorAssign => TokenKind::BitwiseXorAssign,
        PpTokenKind::LeftShift => TokenKind::LeftShift,
        PpTokenKind::LeftShiftAssign => TokenKind::LeftShiftAssign,
        PpTokenKind::RightShift => TokenKind::RightShift,
        PpTokenKind::RightShiftAssign => TokenKind::RightShiftAssign,
        PpTokenKind::OpenSquareBracket => TokenKind::OpenSquareBracket,
        PpTokenKind::CloseSquareBracket => TokenKind::CloseSquareBracket,
        PpTokenKind::OpenBracket => TokenKind::OpenBracket,
        PpTokenKind::CloseBracket => TokenKind::CloseBracket,
        PpTokenKind::OpenParen => TokenKind::OpenParen,
        PpTokenKind::CloseParen => TokenKind::CloseParen,
        PpTokenKind::Semicolon => TokenKind::Semicolon,
        PpTokenKind::Colon => TokenKind::Colon,
        PpTokenKind::HeaderName
        | PpTokenKind::Hash
        | PpTokenKind::DoubleHash
        | PpTokenKind::ConcatDoubleHash
        | PpTokenKind::Placemarker
        | PpTokenKind::Other => {
            return Err(error!("Internal error: {:?} token \"{}\" reached classification at {}.",
                tok.kind, tok.data, tok.source));
        }
    };

    Ok(kind)
}
