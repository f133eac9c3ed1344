//! Integer constant expression evaluation for `#if` and `#elif`

use crate::error::Diagnostics;
use crate::tokenizer::{PpToken, PpTokenKind, SourceFrame, SourcePos};

/// Evaluates a fully macro-expanded `#if` expression. Remaining identifiers
/// evaluate to 0. Overflow and division by zero are recorded and yield 0;
/// operands skipped by `&&`, `||` and `?:` are parsed but never evaluated,
/// so they cannot raise either.
pub fn evaluate(tokens: &[PpToken], diags: &mut Diagnostics, stack: &[SourceFrame]) -> i64 {
    let mut parser = Parser {
        tokens,
        pos: 0,
        diags,
        stack,
        failed: false,
    };

    if tokens.is_empty() {
        parser.syntax_error(None, "Expected expression.");
        return 0;
    }

    let value = parser.conditional(true);

    if parser.pos < tokens.len() {
        let pos = tokens[parser.pos].source.clone();
        parser.syntax_error(Some(pos), "Extra tokens after expression.");
    }

    value
}

struct Parser<'a> {
    tokens: &'a [PpToken],
    pos: usize,
    diags: &'a mut Diagnostics,
    stack: &'a [SourceFrame],
    failed: bool,
}

// Binary operator precedence, tightest last. `?:` sits above all of these.
fn precedence(kind: PpTokenKind) -> Option<u8> {
    match kind {
        PpTokenKind::LogicalOr => Some(1),
        PpTokenKind::LogicalAnd => Some(2),
        PpTokenKind::BitwiseOr => Some(3),
        PpTokenKind::BitwiseXor => Some(4),
        PpTokenKind::BitwiseAnd => Some(5),
        PpTokenKind::Equals | PpTokenKind::NotEquals => Some(6),
        PpTokenKind::Less | PpTokenKind::LessEquals
        | PpTokenKind::Greater | PpTokenKind::GreaterEquals => Some(7),
        PpTokenKind::LeftShift | PpTokenKind::RightShift => Some(8),
        PpTokenKind::Plus | PpTokenKind::Minus => Some(9),
        PpTokenKind::Star | PpTokenKind::Div | PpTokenKind::Mod => Some(10),
        _ => None,
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a PpToken> {
        self.tokens.get(self.pos)
    }

    fn syntax_error(&mut self, pos: Option<SourcePos>, message: &str) {
        // One syntax error per expression is enough.
        if !self.failed {
            self.failed = true;
            self.diags.error(pos, self.stack.to_vec(), message.to_string());
        }
    }

    fn value_error(&mut self, pos: &SourcePos, message: &str) {
        self.diags.error(Some(pos.clone()), self.stack.to_vec(), message.to_string());
    }

    /// conditional-expression, right associative.
    fn conditional(&mut self, live: bool) -> i64 {
        let condition = self.binary(1, live);

        if let Some(tok) = self.peek() {
            if tok.kind == PpTokenKind::QuestionMark {
                self.pos += 1;
                let then_value = self.conditional(live && condition != 0);

                match self.peek() {
                    Some(colon) if colon.kind == PpTokenKind::Colon => self.pos += 1,
                    other => {
                        let pos = other.map(|t| t.source.clone());
                        self.syntax_error(pos, "Expected \":\" in conditional expression.");
                        return 0;
                    }
                }

                let else_value = self.conditional(live && condition == 0);
                return if condition != 0 { then_value } else { else_value };
            }
        }

        condition
    }

    fn binary(&mut self, min_precedence: u8, live: bool) -> i64 {
        let mut lhs = self.unary(live);

        loop {
            let (kind, op_pos) = match self.peek() {
                Some(tok) => match precedence(tok.kind) {
                    Some(p) if p >= min_precedence => (tok.kind, tok.source.clone()),
                    _ => break,
                },
                None => break,
            };
            self.pos += 1;

            let rhs_live = match kind {
                PpTokenKind::LogicalAnd => live && lhs != 0,
                PpTokenKind::LogicalOr => live && lhs == 0,
                _ => live,
            };

            let rhs = self.binary(precedence(kind).unwrap() + 1, rhs_live);
            lhs = self.apply(kind, lhs, rhs, live, &op_pos);
        }

        lhs
    }

    fn apply(&mut self, kind: PpTokenKind, lhs: i64, rhs: i64, live: bool, pos: &SourcePos) -> i64 {
        let overflowing = |parser: &mut Parser, value: Option<i64>| -> i64 {
            match value {
                Some(v) => v,
                None => {
                    if live {
                        parser.value_error(pos, "Integer overflow in expression.");
                    }
                    0
                }
            }
        };

        match kind {
            PpTokenKind::LogicalOr => ((lhs != 0) || (rhs != 0)) as i64,
            PpTokenKind::LogicalAnd => ((lhs != 0) && (rhs != 0)) as i64,
            PpTokenKind::BitwiseOr => lhs | rhs,
            PpTokenKind::BitwiseXor => lhs ^ rhs,
            PpTokenKind::BitwiseAnd => lhs & rhs,
            PpTokenKind::Equals => (lhs == rhs) as i64,
            PpTokenKind::NotEquals => (lhs != rhs) as i64,
            PpTokenKind::Less => (lhs < rhs) as i64,
            PpTokenKind::LessEquals => (lhs <= rhs) as i64,
            PpTokenKind::Greater => (lhs > rhs) as i64,
            PpTokenKind::GreaterEquals => (lhs >= rhs) as i64,
            PpTokenKind::LeftShift => {
                if rhs < 0 || rhs >= 64 {
                    if live {
                        self.value_error(pos, "Shift amount out of range in expression.");
                    }
                    0
                } else {
                    overflowing(self, lhs.checked_shl(rhs as u32))
                }
            },
            PpTokenKind::RightShift => {
                if rhs < 0 || rhs >= 64 {
                    if live {
                        self.value_error(pos, "Shift amount out of range in expression.");
                    }
                    0
                } else {
                    lhs >> rhs
                }
            },
            PpTokenKind::Plus => overflowing(self, lhs.checked_add(rhs)),
            PpTokenKind::Minus => overflowing(self, lhs.checked_sub(rhs)),
            PpTokenKind::Star => overflowing(self, lhs.checked_mul(rhs)),
            PpTokenKind::Div => {
                if rhs == 0 {
                    if live {
                        self.value_error(pos, "Division by zero in expression.");
                    }
                    0
                } else {
                    overflowing(self, lhs.checked_div(rhs))
                }
            },
            PpTokenKind::Mod => {
                if rhs == 0 {
                    if live {
                        self.value_error(pos, "Division by zero in expression.");
                    }
                    0
                } else {
                    overflowing(self, lhs.checked_rem(rhs))
                }
            },
            _ => 0,
        }
    }

    fn unary(&mut self, live: bool) -> i64 {
        let tok = match self.peek() {
            Some(tok) => tok,
            None => {
                self.syntax_error(None, "Expected expression.");
                return 0;
            }
        };
        let pos = tok.source.clone();

        match tok.kind {
            PpTokenKind::LogicalNot => {
                self.pos += 1;
                (self.unary(live) == 0) as i64
            },
            PpTokenKind::BitwiseNot => {
                self.pos += 1;
                !self.unary(live)
            },
            PpTokenKind::Minus => {
                self.pos += 1;
                let value = self.unary(live);
                match value.checked_neg() {
                    Some(v) => v,
                    None => {
                        if live {
                            self.value_error(&pos, "Integer overflow in expression.");
                        }
                        0
                    }
                }
            },
            PpTokenKind::Plus => {
                self.pos += 1;
                self.unary(live)
            },
            PpTokenKind::OpenParen => {
                self.pos += 1;
                let value = self.conditional(live);
                match self.peek() {
                    Some(close) if close.kind == PpTokenKind::CloseParen => self.pos += 1,
                    other => {
                        let p = other.map(|t| t.source.clone());
                        self.syntax_error(p, "Expected \")\" in expression.");
                    }
                }
                value
            },
            PpTokenKind::Number => {
                self.pos += 1;
                let tok = &self.tokens[self.pos - 1];
                self.integer_constant(tok, live)
            },
            PpTokenKind::CharConst => {
                self.pos += 1;
                let tok = &self.tokens[self.pos - 1];
                character_constant(tok)
            },
            PpTokenKind::Identifier => {
                // Undefined identifiers (keywords included) evaluate to 0.
                self.pos += 1;
                0
            },
            _ => {
                self.syntax_error(Some(pos), "Unexpected token in expression.");
                self.pos += 1;
                0
            }
        }
    }

    fn integer_constant(&mut self, tok: &PpToken, live: bool) -> i64 {
        let bytes = tok.data.as_bytes();

        // Strip integer suffixes.
        let mut end = bytes.len();
        while end > 0 && matches!(bytes[end - 1], b'u' | b'U' | b'l' | b'L') {
            end -= 1;
        }
        let body = &bytes[..end];

        let (radix, digits): (i64, &[u8]) =
            if body.len() > 2 && (body.starts_with(b"0x") || body.starts_with(b"0X")) {
                (16, &body[2..])
            } else if body.len() > 1 && body[0] == b'0' {
                (8, &body[1..])
            } else {
                (10, body)
            };

        let is_float = body.contains(&b'.')
            || (radix != 16 && (body.contains(&b'e') || body.contains(&b'E')))
            || (radix == 16 && (body.contains(&b'p') || body.contains(&b'P')));
        if is_float {
            self.value_error(&tok.source, "Floating constant in preprocessor expression.");
            return 0;
        }

        if digits.is_empty() {
            self.value_error(&tok.source,
                &format!("Invalid integer constant \"{}\".", tok.data));
            return 0;
        }

        let mut value: i64 = 0;
        for &b in digits {
            let digit = match b {
                b'0'..=b'9' => (b - b'0') as i64,
                b'a'..=b'f' => (b - b'a') as i64 + 10,
                b'A'..=b'F' => (b - b'A') as i64 + 10,
                _ => radix,
            };

            if digit >= radix {
                self.value_error(&tok.source,
                    &format!("Invalid integer constant \"{}\".", tok.data));
                return 0;
            }

            value = match value.checked_mul(radix).and_then(|v| v.checked_add(digit)) {
                Some(v) => v,
                None => {
                    if live {
                        self.value_error(&tok.source, "Integer constant overflows.");
                    }
                    return 0;
                }
            };
        }

        value
    }
}

/// Character constant value, multi-character constants packed a byte at a
/// time like the common implementations do.
fn character_constant(tok: &PpToken) -> i64 {
    let bytes = tok.data.as_bytes();
    if bytes.len() < 2 {
        return 0;
    }

    // Strip the quotes.
    let inner = &bytes[1..bytes.len() - 1];
    let mut value: i64 = 0;
    let mut i = 0;

    while i < inner.len() {
        let c = if inner[i] == b'\\' && i + 1 < inner.len() {
            i += 2;
            match inner[i - 1] {
                b'n' => b'\n',
                b't' => b'\t',
                b'r' => b'\r',
                b'0'..=b'7' => {
                    let mut v: u8 = inner[i - 1] - b'0';
                    let mut digits = 1;
                    while digits < 3 && i < inner.len() && (b'0'..=b'7').contains(&inner[i]) {
                        v = v.wrapping_mul(8).wrapping_add(inner[i] - b'0');
                        i += 1;
                        digits += 1;
                    }
                    v
                },
                b'a' => 0x07,
                b'b' => 0x08,
                b'f' => 0x0c,
                b'v' => 0x0b,
                b'x' => {
                    let mut v: u8 = 0;
                    while i < inner.len() && inner[i].is_ascii_hexdigit() {
                        let d = match inner[i] {
                            b'0'..=b'9' => inner[i] - b'0',
                            b'a'..=b'f' => inner[i] - b'a' + 10,
                            _ => inner[i] - b'A' + 10,
                        };
                        v = v.wrapping_mul(16).wrapping_add(d);
                        i += 1;
                    }
                    v
                },
                other => other,
            }
        } else {
            i += 1;
            inner[i - 1]
        };

        value = (value << 8) | c as i64;
    }

    value
}
