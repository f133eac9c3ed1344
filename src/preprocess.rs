//! The preprocessor driver: per-line loop, include recursion, token
//! emission and the text output mode

use std::io::{Error, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::classify::{classify, LineMark, Token};
use crate::defines::{DefineTable, InsertResult, Macro, MacroArgs};
use crate::directive::{handle_directive, BranchStack, LineOverride};
use crate::error::*;
use crate::expand::{invocation_open, invocation_unbalanced, Expander};
use crate::files::{FileCache, SourceFile};
use crate::tokenizer::{PpToken, PpTokenKind, SourceFrame, SourcePos, Tokenizer};

/// Include nesting cap. Far below what a pathological build could need, but
/// it catches include cycles.
pub const MAX_INCLUDE_DEPTH: u32 = 64;

/// Macro expansion nesting cap.
pub const MAX_EXPANSION_DEPTH: u32 = 200;

/// Per-file preprocessing state: the file's tokenizer, its `#line` override
/// and the buffer of text-line tokens waiting for a macro invocation to
/// complete across lines.
pub(crate) struct FileContext {
    pub tokenizer: Tokenizer,
    pub path: PathBuf,
    pub line_override: LineOverride,
    pub pending: Vec<PpToken>,
}

/// One preprocessing run over one translation unit.
///
/// # Examples
///
/// ```
/// # use cpre::preprocess::Preprocessor;
/// let mut pp = Preprocessor::new(Vec::new());
/// let tokens = pp.preprocess_str("#define N 42\nint x = N;\n", "example.c").unwrap();
///
/// let spellings: Vec<&str> = tokens.iter().map(|t| t.data.as_str()).collect();
/// assert_eq!(vec!["int", "x", "=", "42", ";"], spellings);
/// ```
pub struct Preprocessor {
    files: FileCache,
    pub(crate) defines: DefineTable,
    pub(crate) diags: Diagnostics,
    pub(crate) branches: BranchStack,
    pub(crate) include_stack: Vec<SourceFrame>,
    pub(crate) include_dirs: Vec<PathBuf>,
    pub(crate) max_expansion_depth: u32,
    max_include_depth: u32,
    output: Vec<Token>,
}

impl Preprocessor {
    pub fn new(include_dirs: Vec<PathBuf>) -> Preprocessor {
        let mut pp = Preprocessor {
            files: FileCache::new(),
            defines: DefineTable::new(),
            diags: Diagnostics::new(false),
            branches: BranchStack::new(),
            include_stack: Vec::new(),
            include_dirs,
            max_expansion_depth: MAX_EXPANSION_DEPTH,
            max_include_depth: MAX_INCLUDE_DEPTH,
            output: Vec::new(),
        };

        pp.predefine("__STDC__", "1");
        pp.predefine("__STDC_VERSION__", "201112L");
        pp.predefine("__STDC_HOSTED__", "1");

        pp
    }

    pub fn warnings_as_errors(&mut self, set: bool) {
        self.diags.set_warnings_as_errors(set);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    fn predefine(&mut self, name: &str, value: &str) {
        let replacement = self.tokenize_fragment(value);

        self.defines.insert(Macro {
            name: name.to_string(),
            args: MacroArgs::default(),
            function_like: false,
            replacement,
            active: true,
            defined_at: builtin_pos(),
        });
    }

    /// Pre-defines a macro from a `-D` argument: `NAME`, `NAME=` or
    /// `NAME=VALUE`. A bare `NAME` defines it as `1`.
    pub fn define_cmdline(&mut self, spec: &str) -> Result<(), Error> {
        let (name, value) = match spec.find('=') {
            Some(split) => (&spec[..split], &spec[split + 1..]),
            None => (spec, "1"),
        };

        let valid = !name.is_empty()
            && name.bytes().next().map(|b| b.is_ascii_alphabetic() || b == b'_').unwrap_or(false)
            && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
        if !valid {
            return Err(error!("Invalid macro name \"{}\" in -D argument.", name));
        }

        let replacement = self.tokenize_fragment(value);

        let result = self.defines.insert(Macro {
            name: name.to_string(),
            args: MacroArgs::default(),
            function_like: false,
            replacement,
            active: true,
            defined_at: builtin_pos(),
        });

        if result == InsertResult::Incompatible {
            self.diags.error(None, Vec::new(),
                format!("Macro \"{}\" redefined incompatibly on the command line.", name));
        }

        Ok(())
    }

    /// `-U`: pre-undefines a macro, builtin predefines included.
    pub fn undefine(&mut self, name: &str) {
        self.defines.deactivate(name);
    }

    fn tokenize_fragment(&mut self, text: &str) -> Vec<PpToken> {
        let mut tokens = Vec::new();
        let mut tokenizer = Tokenizer::from_source("<command line>", text.as_bytes().to_vec());
        while tokenizer.tokenize_line(&mut tokens, &mut self.diags) {}
        tokens
    }

    /// Preprocesses the translation unit rooted at `path` into a classified
    /// token stream. Non-fatal problems are accumulated as diagnostics; the
    /// `Err` case is reserved for fatal ones (I/O failures, recursion caps,
    /// internal invariant violations).
    pub fn preprocess_path(&mut self, path: &Path) -> Result<Vec<Token>, Error> {
        self.output.clear();

        let handle = self.files.load(path)?;
        let file = self.files.file(handle);
        let real_path = file.path.clone();

        self.run_file(file, real_path, 0)?;

        Ok(std::mem::replace(&mut self.output, Vec::new()))
    }

    /// Preprocesses in-memory text under a virtual file name. Relative
    /// includes resolve against the search list only.
    pub fn preprocess_str(&mut self, text: &str, name: &str) -> Result<Vec<Token>, Error> {
        self.output.clear();

        let file = SourceFile::virtual_file(name, text.as_bytes().to_vec());
        self.run_file(file, PathBuf::from(name), 0)?;

        Ok(std::mem::replace(&mut self.output, Vec::new()))
    }

    /// Re-enters the pipeline on an included file.
    pub(crate) fn preprocess_include(&mut self, path: &Path, depth: u32) -> Result<(), Error> {
        if depth > self.max_include_depth {
            return Err(error!("Include depth exceeds the limit of {}.", self.max_include_depth));
        }

        let handle = self.files.load(path)?;
        let file = self.files.file(handle);
        let real_path = file.path.clone();

        self.run_file(file, real_path, depth)
    }

    fn run_file(&mut self, file: Rc<SourceFile>, path: PathBuf, depth: u32) -> Result<(), Error> {
        let branch_base = self.branches.depth();
        let file_name = file.name.clone();

        let mut fs = FileContext {
            tokenizer: Tokenizer::new(file),
            path,
            line_override: LineOverride::default(),
            pending: Vec::new(),
        };

        let mut line: Vec<PpToken> = Vec::new();
        loop {
            line.clear();
            if !fs.tokenizer.tokenize_line(&mut line, &mut self.diags) {
                break;
            }
            self.process_line(&mut fs, &line, depth)?;
        }

        self.flush_pending(&mut fs, true)?;

        // Conditionals opened in this file must be closed in it.
        while self.branches.depth() > branch_base {
            self.branches.pop();
            self.diags.error(None, self.include_stack.clone(),
                format!("Missing #endif at end of \"{}\".", file_name));
        }

        Ok(())
    }

    fn process_line(&mut self, fs: &mut FileContext, line: &[PpToken], depth: u32) -> Result<(), Error> {
        if line.is_empty() {
            return Ok(());
        }

        if line[0].kind == PpTokenKind::Hash {
            if !fs.pending.is_empty() {
                self.diags.error(Some(line[0].source.clone()), self.include_stack.clone(),
                    "Preprocessor directive inside a macro invocation.".to_string());
                let pending = std::mem::replace(&mut fs.pending, Vec::new());
                self.emit_tokens(fs, &pending)?;
            }
            return handle_directive(self, fs, line, depth);
        }

        if !self.branches.active() {
            return Ok(());
        }

        fs.pending.extend_from_slice(line);

        if invocation_open(&fs.pending, &self.defines) {
            // A function-like invocation is still collecting arguments;
            // keep buffering lines.
            return Ok(());
        }

        self.flush_pending(fs, false)
    }

    fn flush_pending(&mut self, fs: &mut FileContext, at_eof: bool) -> Result<(), Error> {
        if fs.pending.is_empty() {
            return Ok(());
        }

        if at_eof && invocation_unbalanced(&fs.pending, &self.defines) {
            let pos = fs.pending.last().map(|t| t.source.clone());
            self.diags.error(pos, self.include_stack.clone(),
                "Unterminated macro invocation at end of file.".to_string());

            let pending = std::mem::replace(&mut fs.pending, Vec::new());
            return self.emit_tokens(fs, &pending);
        }

        let pending = std::mem::replace(&mut fs.pending, Vec::new());

        let mut expanded = Vec::new();
        {
            let file_name = fs.line_override.path.clone().unwrap_or_else(|| fs.tokenizer.path());
            let mut expander = Expander::new(&self.defines, &mut self.diags, &self.include_stack,
                self.max_expansion_depth, file_name, fs.line_override.delta);
            expander.expand(&pending, &mut expanded)?;
        }

        self.emit_tokens(fs, &expanded)
    }

    /// Classifies and emits one batch of expanded tokens. Stray tokens the
    /// parser could never accept are reported and dropped here, so anything
    /// that still trips `classify` is a genuine internal error.
    fn emit_tokens(&mut self, fs: &mut FileContext, tokens: &[PpToken]) -> Result<(), Error> {
        // Emission line of macro-born tokens: the line of the nearest
        // preceding token that came straight from source text.
        let mut current_line = tokens.first().map(|t| t.source.line).unwrap_or(1);

        let mut i = 0;
        while i < tokens.len() {
            let tok = &tokens[i];

            // The _Pragma operator is accepted and discarded.
            if tok.is_identifier("_Pragma")
                && i + 3 < tokens.len()
                && tokens[i + 1].kind == PpTokenKind::OpenParen
                && tokens[i + 2].kind == PpTokenKind::StrLiteral
                && tokens[i + 3].kind == PpTokenKind::CloseParen
            {
                self.diags.debug(Some(tok.source.clone()), self.include_stack.clone(),
                    format!("Ignored _Pragma operator with {}.", tokens[i + 2].data));
                i += 4;
                continue;
            }

            match tok.kind {
                PpTokenKind::Hash | PpTokenKind::DoubleHash | PpTokenKind::ConcatDoubleHash => {
                    self.diags.error(Some(tok.source.clone()), self.token_stack(tok),
                        format!("Stray \"{}\" in program.", tok.data));
                },
                PpTokenKind::Other => {
                    self.diags.error(Some(tok.source.clone()), self.token_stack(tok),
                        format!("Unknown character \"{}\" in program.", tok.data));
                },
                _ => {
                    if tok.frames.is_empty() {
                        current_line = tok.source.line;
                    }

                    let kind = classify(tok)?;
                    let line = (current_line as i64 + fs.line_override.delta).max(0) as u32;

                    self.output.push(Token {
                        kind,
                        data: tok.data.clone(),
                        stack: self.token_stack(tok),
                        line: LineMark {
                            path: fs.line_override.path.clone(),
                            line,
                        },
                        has_whitespace: tok.has_whitespace,
                    });
                }
            }

            i += 1;
        }

        Ok(())
    }

    /// Emit-time snapshot of a token's provenance: its own file position,
    /// the include chain, then the macro frames it was born under.
    fn token_stack(&self, tok: &PpToken) -> Vec<SourceFrame> {
        let mut stack = Vec::with_capacity(1 + self.include_stack.len() + tok.frames.len());
        stack.push(SourceFrame::File(tok.source.clone()));
        stack.extend(self.include_stack.iter().cloned());
        stack.extend(tok.frames.iter().cloned());
        stack
    }
}

fn builtin_pos() -> SourcePos {
    SourcePos {
        path: Rc::from("<command line>"),
        line: 1,
        column: 1,
    }
}

/// Prints a token stream as text: one space between tokens whose
/// predecessor was followed by whitespace, a line break whenever the
/// emission line changes.
pub fn write_tokens<O: Write>(tokens: &[Token], output: &mut O) -> Result<(), Error> {
    let mut previous: Option<&Token> = None;

    for tok in tokens {
        if let Some(prev) = previous {
            if prev.line != tok.line {
                output.write_all(b"\n")?;
            } else if prev.has_whitespace {
                output.write_all(b" ")?;
            }
        }

        output.write_all(tok.data.as_bytes())?;
        previous = Some(tok);
    }

    if previous.is_some() {
        output.write_all(b"\n")?;
    }

    Ok(())
}

/// CLI entry: preprocesses `source` and writes the text emission to
/// `output`. Returns the process exit code: 0 on success, 1 when non-fatal
/// errors were reported, 2 on a fatal error.
pub fn cmd_preprocess<O: Write>(
    source: &Path,
    output: &mut O,
    include_dirs: Vec<PathBuf>,
    defines: &[String],
    undefines: &[String],
    warnings_as_errors: bool,
    verbose: bool,
) -> i32 {
    let mut pp = Preprocessor::new(include_dirs);
    pp.warnings_as_errors(warnings_as_errors);

    for spec in defines {
        if let Err(e) = pp.define_cmdline(spec) {
            print_error(&e);
            return 2;
        }
    }

    for name in undefines {
        pp.undefine(name);
    }

    match pp.preprocess_path(source) {
        Ok(tokens) => {
            pp.diagnostics().print_all(verbose);

            if let Err(e) = write_tokens(&tokens, output).prepend_error("Failed to write output:") {
                print_error(&e);
                return 2;
            }

            if pp.diagnostics().has_errors() { 1 } else { 0 }
        },
        Err(e) => {
            pp.diagnostics().print_all(verbose);
            print_error(&e);
            2
        }
    }
}
