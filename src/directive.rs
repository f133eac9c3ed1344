//! Directive parsing and execution

use std::io::{Error};
use std::rc::Rc;

use crate::classify::is_keyword;
use crate::defines::{DefineTable, InsertResult, Macro, MacroArgs};
use crate::error::{Diagnostics, ErrorExt};
use crate::eval::evaluate;
use crate::expand::Expander;
use crate::files::resolve_include;
use crate::preprocess::{FileContext, Preprocessor};
use crate::spelling::Spelling;
use crate::tokenizer::{PpToken, PpTokenKind, SourceFrame};

/// One conditional-inclusion level. `taken` is whether this group is
/// currently included; `fired` records that some branch of the chain has
/// already been taken, so later `#elif`/`#else` cannot re-activate it.
#[derive(Debug, Clone)]
pub struct BranchFrame {
    pub taken: bool,
    pub fired: bool,
    pub else_seen: bool,
}

/// Stack of conditional-inclusion levels. Tokens are skipped whenever any
/// level is not taken. A frame is pushed for every `#if*` even inside a
/// skipped region, which is what keeps `#endif` matching balanced there.
#[derive(Debug, Default)]
pub struct BranchStack {
    frames: Vec<BranchFrame>,
}

impl BranchStack {
    pub fn new() -> BranchStack {
        BranchStack { frames: Vec::new() }
    }

    pub fn active(&self) -> bool {
        self.frames.iter().all(|f| f.taken)
    }

    /// Whether everything outside the innermost level is included.
    pub fn enclosing_active(&self) -> bool {
        let n = self.frames.len();
        n == 0 || self.frames[..n - 1].iter().all(|f| f.taken)
    }

    pub fn push(&mut self, taken: bool, fired: bool) {
        self.frames.push(BranchFrame { taken, fired, else_seen: false });
    }

    pub fn pop(&mut self) -> Option<BranchFrame> {
        self.frames.pop()
    }

    pub fn top_mut(&mut self) -> Option<&mut BranchFrame> {
        self.frames.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// `#line` state, per file level. The default (no path, delta 0) is
/// indistinguishable from "no override". `#line N` keeps a previously set
/// path; `#line N "P"` sets both.
#[derive(Debug, Clone, Default)]
pub struct LineOverride {
    pub path: Option<Rc<str>>,
    pub delta: i64,
}

// Names with built-in meaning that can be neither defined nor undefined.
fn is_protected_name(name: &str) -> bool {
    name == "defined" || name == "__VA_ARGS__" || name == "__FILE__" || name == "__LINE__"
}

/// Executes one directive line. `line[0]` is the introducing `#`.
pub(crate) fn handle_directive(pp: &mut Preprocessor, fs: &mut FileContext, line: &[PpToken], depth: u32) -> Result<(), Error> {
    let directive = &line[1..];

    if directive.is_empty() {
        // Null directive.
        return Ok(());
    }

    let name_tok = &directive[0];
    if name_tok.kind != PpTokenKind::Identifier {
        if pp.branches.active() {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                format!("Invalid preprocessor directive \"{}\".", name_tok.data));
        }
        return Ok(());
    }

    let rest = &directive[1..];

    match name_tok.data.as_str() {
        "ifdef" => do_ifdef(pp, rest, true, name_tok),
        "ifndef" => do_ifdef(pp, rest, false, name_tok),
        "if" => do_if(pp, fs, rest, name_tok)?,
        "elif" => do_elif(pp, fs, rest, name_tok)?,
        "else" => do_else(pp, rest, name_tok),
        "endif" => do_endif(pp, rest, name_tok),
        // Everything else is discarded without interpretation while skipping.
        _ if !pp.branches.active() => {},
        "define" => do_define(pp, rest, name_tok),
        "undef" => do_undef(pp, rest, name_tok),
        "include" => do_include(pp, fs, rest, name_tok, depth)?,
        "line" => do_line(pp, fs, rest, name_tok),
        "error" => do_error(pp, rest, name_tok),
        "pragma" => do_pragma(pp, rest, name_tok),
        other => {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                format!("Invalid preprocessor directive \"{}\".", other));
        }
    }

    Ok(())
}

fn check_no_extra(pp: &mut Preprocessor, rest: &[PpToken], directive: &str) {
    if let Some(extra) = rest.first() {
        pp.diags.error(Some(extra.source.clone()), pp.include_stack.clone(),
            format!("Extra tokens after #{}.", directive));
    }
}

/// Joins token spellings, the way diagnostics and `#error` payloads want it.
fn detokenize(tokens: &[PpToken]) -> String {
    let mut text = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(tok.data.as_str());
    }
    text
}

fn do_ifdef(pp: &mut Preprocessor, rest: &[PpToken], expect_defined: bool, name_tok: &PpToken) {
    let directive = if expect_defined { "ifdef" } else { "ifndef" };

    if !pp.branches.active() {
        pp.branches.push(false, true);
        return;
    }

    let ident = match rest.first() {
        Some(tok) if tok.kind == PpTokenKind::Identifier => tok,
        _ => {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                format!("Expected identifier after #{}.", directive));
            pp.branches.push(false, false);
            return;
        }
    };

    check_no_extra(pp, &rest[1..], directive);

    let taken = pp.defines.is_defined(ident.data.as_str()) == expect_defined;
    pp.branches.push(taken, taken);
}

fn do_if(pp: &mut Preprocessor, fs: &mut FileContext, rest: &[PpToken], name_tok: &PpToken) -> Result<(), Error> {
    if !pp.branches.active() {
        // The expression of a skipped #if is never evaluated.
        pp.branches.push(false, true);
        return Ok(());
    }

    if rest.is_empty() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "Expected expression after #if.".to_string());
        pp.branches.push(false, false);
        return Ok(());
    }

    let value = eval_condition(pp, fs, rest)?;
    pp.branches.push(value != 0, value != 0);
    Ok(())
}

fn do_elif(pp: &mut Preprocessor, fs: &mut FileContext, rest: &[PpToken], name_tok: &PpToken) -> Result<(), Error> {
    let (else_seen, fired) = match pp.branches.top_mut() {
        Some(top) => (top.else_seen, top.fired),
        None => {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                "#elif without #if.".to_string());
            return Ok(());
        }
    };

    if else_seen {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "#elif after #else.".to_string());
        return Ok(());
    }

    if !pp.branches.enclosing_active() {
        return Ok(());
    }

    if fired {
        // A branch of this chain was already taken; this one is skipped
        // without evaluating its expression.
        pp.branches.top_mut().unwrap().taken = false;
        return Ok(());
    }

    if rest.is_empty() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "Expected expression after #elif.".to_string());
        return Ok(());
    }

    let value = eval_condition(pp, fs, rest)?;
    let top = pp.branches.top_mut().unwrap();
    top.taken = value != 0;
    top.fired = value != 0;
    Ok(())
}

fn do_else(pp: &mut Preprocessor, rest: &[PpToken], name_tok: &PpToken) {
    if pp.branches.is_empty() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "#else without #if.".to_string());
        return;
    }

    let enclosing = pp.branches.enclosing_active();
    if enclosing {
        check_no_extra(pp, rest, "else");
    }

    let top = pp.branches.top_mut().unwrap();
    if top.else_seen {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "#else after #else.".to_string());
        return;
    }

    top.else_seen = true;
    if enclosing {
        top.taken = !top.fired;
        top.fired = true;
    }
}

fn do_endif(pp: &mut Preprocessor, rest: &[PpToken], name_tok: &PpToken) {
    if pp.branches.pop().is_none() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "#endif without #if.".to_string());
        return;
    }

    if pp.branches.active() {
        check_no_extra(pp, rest, "endif");
    }
}

/// Replaces `defined X` and `defined(X)` before any macro expansion, then
/// expands and evaluates.
fn eval_condition(pp: &mut Preprocessor, fs: &mut FileContext, rest: &[PpToken]) -> Result<i64, Error> {
    let replaced = replace_defined(rest, &pp.defines, &mut pp.diags, &pp.include_stack);

    let mut expanded = Vec::new();
    {
        let file_name = fs.line_override.path.clone().unwrap_or_else(|| fs.tokenizer.path());
        let mut expander = Expander::new(&pp.defines, &mut pp.diags, &pp.include_stack,
            pp.max_expansion_depth, file_name, fs.line_override.delta);
        expander.expand(&replaced, &mut expanded)?;
    }

    Ok(evaluate(&expanded, &mut pp.diags, &pp.include_stack))
}

fn replace_defined(tokens: &[PpToken], defines: &DefineTable, diags: &mut Diagnostics, stack: &[SourceFrame]) -> Vec<PpToken> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let tok = &tokens[i];

        if tok.is_identifier("defined") {
            let (name, consumed) = if i + 1 < tokens.len() && tokens[i + 1].kind == PpTokenKind::Identifier {
                (Some(&tokens[i + 1]), 2)
            } else if i + 3 < tokens.len()
                && tokens[i + 1].kind == PpTokenKind::OpenParen
                && tokens[i + 2].kind == PpTokenKind::Identifier
                && tokens[i + 3].kind == PpTokenKind::CloseParen
            {
                (Some(&tokens[i + 2]), 4)
            } else {
                (None, 1)
            };

            match name {
                Some(ident) => {
                    let name = ident.data.as_str();
                    let defined = defines.is_defined(name)
                        || name == "__FILE__" || name == "__LINE__";

                    out.push(PpToken {
                        kind: PpTokenKind::Number,
                        data: Spelling::from(if defined { "1" } else { "0" }),
                        source: tok.source.clone(),
                        frames: Vec::new(),
                        has_whitespace: tokens[i + consumed - 1].has_whitespace,
                    });
                    i += consumed;
                },
                None => {
                    diags.error(Some(tok.source.clone()), stack.to_vec(),
                        "Expected identifier after \"defined\" operator.".to_string());
                    out.push(PpToken {
                        kind: PpTokenKind::Number,
                        data: Spelling::from("0"),
                        source: tok.source.clone(),
                        frames: Vec::new(),
                        has_whitespace: tok.has_whitespace,
                    });
                    i += 1;
                }
            }
        } else {
            out.push(tok.clone());
            i += 1;
        }
    }

    out
}

fn do_define(pp: &mut Preprocessor, rest: &[PpToken], name_tok: &PpToken) {
    let ident = match rest.first() {
        Some(tok) if tok.kind == PpTokenKind::Identifier => tok,
        Some(tok) => {
            pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                "Expected identifier after #define.".to_string());
            return;
        },
        None => {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                "Expected macro name after #define.".to_string());
            return;
        }
    };

    let name = ident.data.as_str().to_string();

    if is_protected_name(&name) {
        pp.diags.error(Some(ident.source.clone()), pp.include_stack.clone(),
            format!("\"{}\" cannot be used as a macro name.", name));
        return;
    }

    if is_keyword(&name) {
        pp.diags.warning(Some(ident.source.clone()), pp.include_stack.clone(),
            format!("Defining over keyword \"{}\", be careful.", name));
    }

    let mut args = MacroArgs::default();
    let mut function_like = false;
    let mut body_start = 1;

    // A parenthesis with no whitespace after the name opens a parameter list.
    if rest.len() > 1 && rest[1].kind == PpTokenKind::OpenParen && !ident.has_whitespace {
        function_like = true;
        match parse_parameters(pp, &rest[2..]) {
            Some((parsed, consumed)) => {
                args = parsed;
                body_start = 2 + consumed;
            },
            None => return,
        }
    }

    let replacement: Vec<PpToken> = rest[body_start..].to_vec();

    if !validate_replacement(pp, &args, function_like, &replacement) {
        return;
    }

    let previous = pp.defines.lookup(&name)
        .filter(|old| old.active)
        .map(|old| old.defined_at.clone());

    let def = Macro {
        name: name.clone(),
        args,
        function_like,
        replacement,
        active: true,
        defined_at: ident.source.clone(),
    };

    if pp.defines.insert(def) == InsertResult::Incompatible {
        let at = previous.map(|p| format!(" (previously defined at {})", p)).unwrap_or_default();
        pp.diags.error(Some(ident.source.clone()), pp.include_stack.clone(),
            format!("Macro \"{}\" redefined incompatibly{}.", name, at));
    }
}

/// Parses a macro parameter list, starting after the opening parenthesis.
/// Returns the parameters and the number of tokens consumed, closing
/// parenthesis included.
fn parse_parameters(pp: &mut Preprocessor, tokens: &[PpToken]) -> Option<(MacroArgs, usize)> {
    let mut names: Vec<String> = Vec::new();
    let mut has_varargs = false;
    let mut expect_item = true;
    let mut i = 0;

    loop {
        let tok = match tokens.get(i) {
            Some(tok) => tok,
            None => {
                pp.diags.error(tokens.last().map(|t| t.source.clone()), pp.include_stack.clone(),
                    "Unterminated macro parameter list.".to_string());
                return None;
            }
        };

        match tok.kind {
            PpTokenKind::CloseParen => {
                if expect_item && !names.is_empty() {
                    pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                        "Expected parameter name before \")\".".to_string());
                    return None;
                }
                return Some((MacroArgs { names, has_varargs }, i + 1));
            },
            PpTokenKind::Comma if !expect_item => {
                if has_varargs {
                    pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                        "\"...\" must be the last macro parameter.".to_string());
                    return None;
                }
                expect_item = true;
                i += 1;
            },
            PpTokenKind::Identifier if expect_item && !has_varargs => {
                let name = tok.data.as_str();
                if name == "__VA_ARGS__" {
                    pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                        "\"__VA_ARGS__\" cannot be used as a macro parameter.".to_string());
                    return None;
                }
                if names.iter().any(|n| n == name) {
                    pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                        format!("Duplicate macro parameter \"{}\".", name));
                    return None;
                }
                names.push(name.to_string());
                expect_item = false;
                i += 1;
            },
            PpTokenKind::Dot if expect_item && !has_varargs => {
                // The three dots of `...` must be adjacent, with no
                // intervening whitespace.
                let adjacent = i + 2 < tokens.len()
                    && tokens[i + 1].kind == PpTokenKind::Dot
                    && tokens[i + 2].kind == PpTokenKind::Dot
                    && !tokens[i].has_whitespace
                    && !tokens[i + 1].has_whitespace;

                if !adjacent {
                    pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                        "Malformed \"...\" in macro parameter list.".to_string());
                    return None;
                }

                has_varargs = true;
                expect_item = false;
                i += 3;
            },
            _ => {
                pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                    format!("Unexpected token \"{}\" in macro parameter list.", tok.data));
                return None;
            }
        }
    }
}

fn validate_replacement(pp: &mut Preprocessor, args: &MacroArgs, function_like: bool, replacement: &[PpToken]) -> bool {
    if let Some(first) = replacement.first() {
        if first.kind == PpTokenKind::DoubleHash {
            pp.diags.error(Some(first.source.clone()), pp.include_stack.clone(),
                "\"##\" cannot appear at the start of a macro replacement list.".to_string());
            return false;
        }
    }

    if let Some(last) = replacement.last() {
        if last.kind == PpTokenKind::DoubleHash {
            pp.diags.error(Some(last.source.clone()), pp.include_stack.clone(),
                "\"##\" cannot appear at the end of a macro replacement list.".to_string());
            return false;
        }
    }

    for (i, tok) in replacement.iter().enumerate() {
        if function_like && tok.kind == PpTokenKind::Hash {
            let follows_param = replacement.get(i + 1)
                .map(|next| next.kind == PpTokenKind::Identifier
                    && args.position(next.data.as_str()).is_some())
                .unwrap_or(false);

            if !follows_param {
                pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                    "\"#\" must be followed by a macro parameter.".to_string());
                return false;
            }
        }

        if !args.has_varargs && tok.is_identifier("__VA_ARGS__") {
            pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                "\"__VA_ARGS__\" can only appear in a variadic macro.".to_string());
            return false;
        }
    }

    true
}

fn do_undef(pp: &mut Preprocessor, rest: &[PpToken], name_tok: &PpToken) {
    let ident = match rest.first() {
        Some(tok) if tok.kind == PpTokenKind::Identifier => tok,
        _ => {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                "Expected identifier after #undef.".to_string());
            return;
        }
    };

    let name = ident.data.as_str();

    if is_protected_name(name) {
        pp.diags.error(Some(ident.source.clone()), pp.include_stack.clone(),
            format!("\"{}\" cannot be undefined.", name));
        return;
    }

    check_no_extra(pp, &rest[1..], "undef");

    if !pp.defines.deactivate(name) {
        pp.diags.debug(Some(ident.source.clone()), pp.include_stack.clone(),
            format!("Undefined non-existent macro \"{}\".", name));
    }
}

fn do_include(pp: &mut Preprocessor, fs: &mut FileContext, rest: &[PpToken], name_tok: &PpToken, depth: u32) -> Result<(), Error> {
    let operand = match include_operand(pp, fs, rest, name_tok)? {
        Some(operand) => operand,
        None => return Ok(()),
    };
    let (path_text, quoted) = operand;

    if path_text.is_empty() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "Empty file name in #include.".to_string());
        return Ok(());
    }

    let resolved = resolve_include(&path_text, quoted, Some(&fs.path), &pp.include_dirs);

    match resolved {
        Some(path) => {
            pp.include_stack.push(SourceFrame::Include(name_tok.source.clone()));
            let result = pp.preprocess_include(&path, depth + 1)
                .prepend_error(format!("Failed to preprocess include \"{}\":", path_text));
            pp.include_stack.pop();
            result
        },
        None => {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                format!("Include file \"{}\" not found.", path_text));
            Ok(())
        }
    }
}

/// Extracts the header name of an `#include`. A single header-name token is
/// used directly; anything else is macro-expanded and re-interpreted as the
/// `"..."` or `< ... >` form.
fn include_operand(pp: &mut Preprocessor, fs: &mut FileContext, rest: &[PpToken], name_tok: &PpToken) -> Result<Option<(String, bool)>, Error> {
    if rest.is_empty() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "Expected file name after #include.".to_string());
        return Ok(None);
    }

    if rest[0].kind == PpTokenKind::HeaderName {
        if pp.branches.active() {
            check_no_extra(pp, &rest[1..], "include");
        }

        let bytes = rest[0].data.as_bytes();
        let inner = String::from_utf8_lossy(&bytes[1..bytes.len() - 1]).into_owned();
        let quoted = bytes[0] == b'"';
        return Ok(Some((inner, quoted)));
    }

    let mut expanded = Vec::new();
    {
        let file_name = fs.line_override.path.clone().unwrap_or_else(|| fs.tokenizer.path());
        let mut expander = Expander::new(&pp.defines, &mut pp.diags, &pp.include_stack,
            pp.max_expansion_depth, file_name, fs.line_override.delta);
        expander.expand(rest, &mut expanded)?;
    }

    if expanded.is_empty() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "Expected file name after #include.".to_string());
        return Ok(None);
    }

    if expanded[0].kind == PpTokenKind::StrLiteral {
        if expanded.len() > 1 {
            check_no_extra(pp, &expanded[1..], "include");
        }

        let bytes = expanded[0].data.as_bytes();
        let inner = String::from_utf8_lossy(&bytes[1..bytes.len() - 1]).into_owned();
        return Ok(Some((inner, true)));
    }

    if expanded[0].kind == PpTokenKind::Less {
        let close = expanded.iter().rposition(|t| t.kind == PpTokenKind::Greater);
        match close {
            Some(pos) if pos > 0 => {
                check_no_extra(pp, &expanded[pos + 1..], "include");

                let mut text = String::new();
                for (i, tok) in expanded[1..pos].iter().enumerate() {
                    text.push_str(tok.data.as_str());
                    if tok.has_whitespace && i + 2 < pos {
                        text.push(' ');
                    }
                }
                return Ok(Some((text, false)));
            },
            _ => {
                pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                    "Expected \">\" to close #include file name.".to_string());
                return Ok(None);
            }
        }
    }

    pp.diags.error(Some(expanded[0].source.clone()), pp.include_stack.clone(),
        format!("Invalid #include operand \"{}\".", expanded[0].data));
    Ok(None)
}

fn do_line(pp: &mut Preprocessor, fs: &mut FileContext, rest: &[PpToken], name_tok: &PpToken) {
    if rest.is_empty() {
        pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
            "Expected line number after #line.".to_string());
        return;
    }

    // #line operands are macro-expanded first.
    let mut expanded = Vec::new();
    {
        let file_name = fs.line_override.path.clone().unwrap_or_else(|| fs.tokenizer.path());
        let mut expander = Expander::new(&pp.defines, &mut pp.diags, &pp.include_stack,
            pp.max_expansion_depth, file_name, fs.line_override.delta);
        if expander.expand(rest, &mut expanded).is_err() {
            return;
        }
    }

    let number = expanded.first()
        .filter(|tok| tok.kind == PpTokenKind::Number)
        .and_then(|tok| {
            let bytes = tok.data.as_bytes();
            if bytes.iter().all(|b| b.is_ascii_digit()) {
                tok.data.as_str().parse::<i64>().ok()
            } else {
                None
            }
        });

    let number = match number {
        Some(n) if n >= 1 && n <= 2147483647 => n,
        _ => {
            pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
                "#line requires a line number between 1 and 2147483647.".to_string());
            return;
        }
    };

    let mut path: Option<Rc<str>> = None;
    match expanded.get(1) {
        Some(tok) if tok.kind == PpTokenKind::StrLiteral => {
            let bytes = tok.data.as_bytes();
            path = Some(Rc::from(String::from_utf8_lossy(&bytes[1..bytes.len() - 1]).as_ref()));
            check_no_extra(pp, &expanded[2..], "line");
        },
        Some(tok) => {
            pp.diags.error(Some(tok.source.clone()), pp.include_stack.clone(),
                "Expected file name string after #line number.".to_string());
        },
        None => {}
    }

    // The line after the directive reports as `number`.
    fs.line_override.delta = number - fs.tokenizer.next_physical_line() as i64;
    if path.is_some() {
        fs.line_override.path = path;
    }
}

fn do_error(pp: &mut Preprocessor, rest: &[PpToken], name_tok: &PpToken) {
    let payload = detokenize(rest);
    pp.diags.error(Some(name_tok.source.clone()), pp.include_stack.clone(),
        format!("#error {}", payload));
}

fn do_pragma(pp: &mut Preprocessor, rest: &[PpToken], name_tok: &PpToken) {
    pp.diags.debug(Some(name_tok.source.clone()), pp.include_stack.clone(),
        format!("Ignored #pragma {}.", detokenize(rest)));
}
