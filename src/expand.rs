//! The C11 macro expansion algorithm: argument collection and
//! pre-expansion, `#` stringification, `##` concatenation with
//! placemarkers, and rescan with self-exclusion

use std::io::{Error};
use std::rc::Rc;

use crate::defines::{DefineTable, Macro};
use crate::error::Diagnostics;
use crate::spelling::Spelling;
use crate::tokenizer::{concatenate, PpToken, PpTokenKind, SourceFrame};

// Substitution element: either a `##` operator from the replacement list, or
// a run of tokens. Only `Paste` elements act as concatenation operators;
// `##` tokens inside substituted arguments never do.
enum Elem {
    Paste,
    Seq(Vec<PpToken>),
}

enum CollectOutcome {
    Complete(Vec<Vec<PpToken>>, usize),
    Unterminated,
}

/// One macro expansion context. Borrows the define table and diagnostics
/// from the preprocessor; carries its own stack of macro frames for
/// self-exclusion and the recursion cap. Tokens pick up one provenance
/// frame per expansion they leave (see `attach_frame`), so stringified,
/// pasted and parameter-substituted tokens all report every level.
pub struct Expander<'a> {
    defines: &'a DefineTable,
    diags: &'a mut Diagnostics,
    base_stack: &'a [SourceFrame],
    macro_stack: Vec<SourceFrame>,
    depth_limit: u32,
    file_name: Rc<str>,
    line_delta: i64,
}

impl<'a> Expander<'a> {
    pub fn new(
        defines: &'a DefineTable,
        diags: &'a mut Diagnostics,
        base_stack: &'a [SourceFrame],
        depth_limit: u32,
        file_name: Rc<str>,
        line_delta: i64,
    ) -> Expander<'a> {
        Expander {
            defines,
            diags,
            base_stack,
            macro_stack: Vec::new(),
            depth_limit,
            file_name,
            line_delta,
        }
    }

    fn stack_snapshot(&self) -> Vec<SourceFrame> {
        self.base_stack.iter().chain(self.macro_stack.iter()).cloned().collect()
    }

    /// Self-exclusion: an identifier naming any macro currently being
    /// expanded is not expanded again.
    fn excluded(&self, name: &str) -> bool {
        self.macro_stack.iter().any(|frame| match frame {
            SourceFrame::Macro { name: frame_name, .. } => frame_name == name,
            _ => false,
        })
    }

    /// Expands `input` and appends the result to `out`. Function-like macro
    /// invocations must be complete within `input`; the driver buffers
    /// logical lines until they are (see `invocation_open`).
    pub fn expand(&mut self, input: &[PpToken], out: &mut Vec<PpToken>) -> Result<(), Error> {
        let mut i = 0;

        while i < input.len() {
            let tok = &input[i];

            if tok.kind == PpTokenKind::Identifier {
                if let Some(builtin) = self.builtin(tok) {
                    out.push(builtin);
                    i += 1;
                    continue;
                }

                let name = tok.data.as_str();
                let defines: &'a DefineTable = self.defines;
                if let Some(def) = defines.lookup_active(name) {
                    if !self.excluded(name) {
                        if !def.is_function_like() {
                            self.expand_object(def, tok, out)?;
                            i += 1;
                            continue;
                        }

                        if i + 1 < input.len() && input[i + 1].kind == PpTokenKind::OpenParen {
                            match collect_arguments(def, &input[i + 1..]) {
                                CollectOutcome::Complete(mut args, consumed) => {
                                    if !self.check_arity(def, &mut args, tok) {
                                        // Abort the expansion: the call passes
                                        // through untouched.
                                        for t in &input[i..=i + consumed] {
                                            out.push(t.clone());
                                        }
                                    } else {
                                        let trailing = input[i + consumed].has_whitespace;
                                        self.expand_call(def, tok, args, trailing, out)?;
                                    }
                                    i += consumed + 1;
                                    continue;
                                },
                                CollectOutcome::Unterminated => {
                                    self.diags.error(Some(tok.source.clone()), self.stack_snapshot(),
                                        format!("Unterminated invocation of macro \"{}\".", name));
                                }
                            }
                        }
                        // A function-like macro name without `(` stays as it is.
                    }
                }
            }

            out.push(tok.clone());
            i += 1;
        }

        Ok(())
    }

    /// `__FILE__` and `__LINE__` are expanded directly; they have no entry
    /// in the define table.
    fn builtin(&self, tok: &PpToken) -> Option<PpToken> {
        if tok.is_identifier("__FILE__") {
            let mut data = Spelling::new();
            data.push(b'"');
            for &b in self.file_name.as_bytes() {
                if b == b'"' || b == b'\\' {
                    data.push(b'\\');
                }
                data.push(b);
            }
            data.push(b'"');

            Some(PpToken {
                kind: PpTokenKind::StrLiteral,
                data,
                source: tok.source.clone(),
                frames: Vec::new(),
                has_whitespace: tok.has_whitespace,
            })
        } else if tok.is_identifier("__LINE__") {
            let line = (tok.source.line as i64 + self.line_delta).max(0);

            Some(PpToken {
                kind: PpTokenKind::Number,
                data: Spelling::from(line.to_string().as_str()),
                source: tok.source.clone(),
                frames: Vec::new(),
                has_whitespace: tok.has_whitespace,
            })
        } else {
            None
        }
    }

    fn enter(&mut self, def: &Macro, invocation: &PpToken) -> Result<(), Error> {
        if self.macro_stack.len() as u32 >= self.depth_limit {
            return Err(error!("Macro expansion exceeds {} nested expansions at {}.",
                self.depth_limit, invocation.source));
        }

        self.macro_stack.push(SourceFrame::Macro {
            name: def.name.clone(),
            defined_at: def.defined_at.clone(),
        });

        Ok(())
    }

    fn expand_object(&mut self, def: &Macro, invocation: &PpToken, out: &mut Vec<PpToken>) -> Result<(), Error> {
        self.enter(def, invocation)?;

        let result = self.substitute(def, &[], &[]).and_then(|substituted| {
            let mut rescanned = Vec::new();
            self.expand(&substituted, &mut rescanned).map(|_| rescanned)
        });

        let frame = self.macro_stack.pop().unwrap();

        let mut rescanned = result?;
        attach_frame(&frame, &mut rescanned);
        emit_expansion(rescanned, invocation.has_whitespace, out);
        Ok(())
    }

    fn expand_call(
        &mut self,
        def: &Macro,
        invocation: &PpToken,
        raw_args: Vec<Vec<PpToken>>,
        trailing_whitespace: bool,
        out: &mut Vec<PpToken>,
    ) -> Result<(), Error> {
        // Arguments are pre-expanded in the context of the call site, before
        // this macro's own frame goes on the stack, so the invoked macro's
        // self-exclusion does not apply inside its arguments.
        let mut expanded_args = Vec::with_capacity(raw_args.len());
        for arg in &raw_args {
            let mut buf = Vec::new();
            self.expand(arg, &mut buf)?;
            expanded_args.push(buf);
        }

        self.enter(def, invocation)?;

        let result = self.substitute(def, &raw_args, &expanded_args).and_then(|substituted| {
            let mut rescanned = Vec::new();
            self.expand(&substituted, &mut rescanned).map(|_| rescanned)
        });

        let frame = self.macro_stack.pop().unwrap();

        let mut rescanned = result?;
        attach_frame(&frame, &mut rescanned);
        emit_expansion(rescanned, trailing_whitespace, out);
        Ok(())
    }

    /// Checks the argument count against the parameter list and normalizes
    /// `args` to one slot per named parameter, plus one for `__VA_ARGS__`.
    fn check_arity(&mut self, def: &Macro, args: &mut Vec<Vec<PpToken>>, invocation: &PpToken) -> bool {
        let named = def.args.names.len();

        // `M()` supplies zero arguments, not one empty one.
        if named == 0 && args.len() == 1 && args[0].is_empty() {
            args.clear();
        }

        if def.args.has_varargs {
            if args.len() < named {
                self.diags.error(Some(invocation.source.clone()), self.stack_snapshot(),
                    format!("Macro \"{}\" expects at least {} arguments, got {}.",
                        def.name, named, args.len()));
                return false;
            }
            if args.len() == named {
                // Empty __VA_ARGS__.
                args.push(Vec::new());
            }
        } else if args.len() != named {
            self.diags.error(Some(invocation.source.clone()), self.stack_snapshot(),
                format!("Macro \"{}\" expects {} arguments, got {}.",
                    def.name, named, args.len()));
            return false;
        }

        true
    }

    /// Walks the replacement list, applying `#`, parameter substitution and
    /// `##` concatenation. Placemarkers may survive in the result; they are
    /// dropped after rescan.
    fn substitute(&mut self, def: &Macro, raw: &[Vec<PpToken>], expanded: &[Vec<PpToken>]) -> Result<Vec<PpToken>, Error> {
        let rep = &def.replacement;
        let mut elems: Vec<Elem> = Vec::new();
        let mut i = 0;

        while i < rep.len() {
            let tok = &rep[i];

            match tok.kind {
                PpTokenKind::DoubleHash => {
                    elems.push(Elem::Paste);
                    i += 1;
                },
                PpTokenKind::Hash if def.is_function_like() => {
                    // Definition-time validation guarantees a parameter follows.
                    let param = &rep[i + 1];
                    let slot = def.args.position(param.data.as_str()).unwrap();
                    let literal = self.stringify(&raw[slot], tok, param.has_whitespace);
                    elems.push(Elem::Seq(vec![literal]));
                    i += 2;
                },
                PpTokenKind::Identifier => {
                    if let Some(slot) = def.args.position(tok.data.as_str()) {
                        let next_to_paste = i + 1 < rep.len() && rep[i + 1].kind == PpTokenKind::DoubleHash;
                        let prev_was_paste = matches!(elems.last(), Some(Elem::Paste));

                        let mut seq = if next_to_paste || prev_was_paste {
                            // `##` operands take the unexpanded argument; an
                            // empty one becomes a placemarker.
                            if raw[slot].is_empty() {
                                vec![placemarker(tok)]
                            } else {
                                raw[slot].clone()
                            }
                        } else {
                            expanded[slot].clone()
                        };

                        if let Some(last) = seq.last_mut() {
                            last.has_whitespace = tok.has_whitespace;
                        }

                        elems.push(Elem::Seq(seq));
                    } else {
                        elems.push(Elem::Seq(vec![tok.clone()]));
                    }
                    i += 1;
                },
                _ => {
                    elems.push(Elem::Seq(vec![tok.clone()]));
                    i += 1;
                }
            }
        }

        // Concatenation pass.
        let mut result: Vec<PpToken> = Vec::new();
        let mut pending_paste = false;

        for elem in elems {
            match elem {
                Elem::Paste => pending_paste = true,
                Elem::Seq(mut seq) => {
                    if pending_paste {
                        pending_paste = false;

                        // Replacement lists never begin or end with `##` and
                        // every sequence holds at least one token, so both
                        // operands exist.
                        let left = result.pop().unwrap();
                        let right = seq.remove(0);

                        match concatenate(&left, &right) {
                            Some(tok) => result.push(tok),
                            None => {
                                self.diags.error(Some(left.source.clone()), self.stack_snapshot(),
                                    format!("Pasting \"{}\" and \"{}\" does not give a valid preprocessing token.",
                                        left.data, right.data));
                                result.push(left);
                                result.push(right);
                            }
                        }

                        result.extend(seq);
                    } else {
                        result.extend(seq);
                    }
                }
            }
        }

        Ok(result)
    }

    /// `#` stringification: the unexpanded argument as one string literal,
    /// with a single space wherever whitespace separated its tokens, and
    /// `\`/`"` escaped inside string and character literals.
    fn stringify(&self, raw: &[PpToken], hash: &PpToken, has_whitespace: bool) -> PpToken {
        let mut data = Spelling::new();
        data.push(b'"');

        for (i, tok) in raw.iter().enumerate() {
            match tok.kind {
                PpTokenKind::StrLiteral | PpTokenKind::CharConst => {
                    for &b in tok.data.as_bytes() {
                        if b == b'"' || b == b'\\' {
                            data.push(b'\\');
                        }
                        data.push(b);
                    }
                },
                PpTokenKind::Placemarker => {},
                _ => data.extend_from_slice(tok.data.as_bytes()),
            }

            if tok.has_whitespace && i + 1 < raw.len() {
                data.push(b' ');
            }
        }

        data.push(b'"');

        PpToken {
            kind: PpTokenKind::StrLiteral,
            data,
            source: hash.source.clone(),
            frames: Vec::new(),
            has_whitespace,
        }
    }
}

/// Every token leaving an expansion gains that macro's frame, outermost
/// first, so an emitted token's `frames` read oldest to most recent even
/// when it was produced inside an argument or a nested expansion.
fn attach_frame(frame: &SourceFrame, tokens: &mut Vec<PpToken>) {
    for tok in tokens.iter_mut() {
        tok.frames.insert(0, frame.clone());
    }
}

fn placemarker(at: &PpToken) -> PpToken {
    PpToken {
        kind: PpTokenKind::Placemarker,
        data: Spelling::new(),
        source: at.source.clone(),
        frames: Vec::new(),
        has_whitespace: at.has_whitespace,
    }
}

/// Appends an expansion result, dropping placemarkers. The invocation's
/// trailing whitespace moves onto the last produced token, or onto the
/// previous output token when the expansion is empty.
fn emit_expansion(tokens: Vec<PpToken>, trailing_whitespace: bool, out: &mut Vec<PpToken>) {
    let mut produced = false;

    for tok in tokens {
        if tok.kind != PpTokenKind::Placemarker {
            out.push(tok);
            produced = true;
        }
    }

    if produced {
        out.last_mut().unwrap().has_whitespace = trailing_whitespace;
    } else if let Some(prev) = out.last_mut() {
        prev.has_whitespace = prev.has_whitespace || trailing_whitespace;
    }
}

/// Collects the arguments of a function-like invocation. `input[0]` is the
/// opening parenthesis. Parentheses nest; top-level commas split, except
/// that everything past the last named parameter belongs to `__VA_ARGS__`.
fn collect_arguments(def: &Macro, input: &[PpToken]) -> CollectOutcome {
    let mut args: Vec<Vec<PpToken>> = vec![Vec::new()];
    let mut depth = 1usize;
    let mut i = 1;

    loop {
        if i >= input.len() {
            return CollectOutcome::Unterminated;
        }

        let tok = &input[i];
        match tok.kind {
            PpTokenKind::OpenParen => {
                depth += 1;
                args.last_mut().unwrap().push(tok.clone());
            },
            PpTokenKind::CloseParen => {
                depth -= 1;
                if depth == 0 {
                    return CollectOutcome::Complete(args, i + 1);
                }
                args.last_mut().unwrap().push(tok.clone());
            },
            PpTokenKind::Comma if depth == 1
                && (!def.args.has_varargs || args.len() <= def.args.names.len()) =>
            {
                args.push(Vec::new());
            },
            _ => args.last_mut().unwrap().push(tok.clone()),
        }

        i += 1;
    }
}

/// How `tokens` end with respect to function-like macro invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Closed,
    /// A function-like macro name is the last token; its parenthesis may
    /// arrive on the next line.
    Dangling,
    /// An argument list was opened but its parentheses have not balanced.
    Unbalanced,
}

/// Argument lists nest purely textually, so a balance scan is enough to
/// decide whether more input is needed.
fn call_state(tokens: &[PpToken], defines: &DefineTable) -> CallState {
    let mut i = 0;

    while i < tokens.len() {
        let tok = &tokens[i];

        if tok.kind == PpTokenKind::Identifier {
            if let Some(def) = defines.lookup_active(tok.data.as_str()) {
                if def.is_function_like() {
                    if i + 1 == tokens.len() {
                        return CallState::Dangling;
                    }

                    if tokens[i + 1].kind == PpTokenKind::OpenParen {
                        let mut depth = 0usize;
                        let mut j = i + 1;
                        loop {
                            if j >= tokens.len() {
                                return CallState::Unbalanced;
                            }
                            match tokens[j].kind {
                                PpTokenKind::OpenParen => depth += 1,
                                PpTokenKind::CloseParen => {
                                    depth -= 1;
                                    if depth == 0 {
                                        break;
                                    }
                                },
                                _ => {}
                            }
                            j += 1;
                        }
                        i = j;
                    }
                }
            }
        }

        i += 1;
    }

    CallState::Closed
}

/// Whether the driver must buffer this line and keep collecting: a
/// function-like invocation is incomplete, or a macro name at the end of
/// the line may still turn into one.
pub fn invocation_open(tokens: &[PpToken], defines: &DefineTable) -> bool {
    call_state(tokens, defines) != CallState::Closed
}

/// Whether an actually opened argument list never balanced. At end of file
/// this is an error; a merely dangling name is not an invocation at all.
pub fn invocation_unbalanced(tokens: &[PpToken], defines: &DefineTable) -> bool {
    call_state(tokens, defines) == CallState::Unbalanced
}
