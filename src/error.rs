use std::fmt::{self, Display};
use std::io::{Error};

use colored::*;

use crate::tokenizer::{SourceFrame, SourcePos};

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => (
        std::io::Error::new(std::io::ErrorKind::Other, format!($($arg)*))
    )
}

/// Attaches context to a hard failure as it propagates out.
pub trait ErrorExt<T> {
    fn prepend_error<M: Display>(self, msg: M) -> Result<T, Error>;
}

impl<T> ErrorExt<T> for Result<T, Error> {
    fn prepend_error<M: Display>(self, msg: M) -> Result<T, Error> {
        self.map_err(|e| error!("{}\n{}", msg, e))
    }
}

/// Renders a fatal error with the same prefix recorded diagnostics use.
/// The exit code is the caller's business.
pub fn print_error(error: &Error) {
    eprintln!("{}: {}", "error".red().bold(), error);
}

/// Severity of a recorded diagnostic. `Debug` records are only shown in
/// verbose mode; `Error` records make the run exit nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational note
    Debug,
    /// Warning
    Warning,
    /// Recoverable error
    Error,
}

/// A single diagnostic record with the source stack that was active when it
/// was raised.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub pos: Option<SourcePos>,
    pub stack: Vec<SourceFrame>,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref pos) = self.pos {
            write!(f, "{}: ", pos)?;
        }
        write!(f, "{}", self.message)?;

        for frame in self.stack.iter().rev() {
            match frame {
                SourceFrame::Macro { name, defined_at } => {
                    write!(f, "\n    in expansion of macro \"{}\" defined at {}", name, defined_at)?;
                },
                SourceFrame::Include(pos) => {
                    write!(f, "\n    in file included from {}", pos)?;
                },
                SourceFrame::File(_) => {}
            }
        }

        Ok(())
    }
}

/// Collector for all diagnostics of one preprocessing run. Owned by the
/// `Preprocessor`, so independent runs never share state.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    warnings_as_errors: bool,
    errors: usize,
}

impl Diagnostics {
    pub fn new(warnings_as_errors: bool) -> Diagnostics {
        Diagnostics {
            records: Vec::new(),
            warnings_as_errors,
            errors: 0,
        }
    }

    pub fn set_warnings_as_errors(&mut self, set: bool) {
        self.warnings_as_errors = set;
    }

    pub fn error(&mut self, pos: Option<SourcePos>, stack: Vec<SourceFrame>, message: String) {
        self.errors += 1;
        self.records.push(Diagnostic { severity: Severity::Error, message, pos, stack });
    }

    pub fn warning(&mut self, pos: Option<SourcePos>, stack: Vec<SourceFrame>, message: String) {
        if self.warnings_as_errors {
            self.error(pos, stack, message);
        } else {
            self.records.push(Diagnostic { severity: Severity::Warning, message, pos, stack });
        }
    }

    pub fn debug(&mut self, pos: Option<SourcePos>, stack: Vec<SourceFrame>, message: String) {
        self.records.push(Diagnostic { severity: Severity::Debug, message, pos, stack });
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn print_all(&self, verbose: bool) {
        for record in &self.records {
            match record.severity {
                Severity::Error => eprintln!("{}: {}", "error".red().bold(), record),
                Severity::Warning => eprintln!("{}: {}", "warning".yellow().bold(), record),
                Severity::Debug => if verbose {
                    eprintln!("{}: {}", "debug".cyan().bold(), record);
                }
            }
        }
    }
}
