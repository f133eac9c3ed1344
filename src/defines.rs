//! Macro records and the define table

use linked_hash_map::{LinkedHashMap};

use crate::tokenizer::{PpToken, SourcePos};

/// Parameter list of a macro. `names` does not include the variadic
/// parameter; arguments bound to `...` are addressed as `__VA_ARGS__`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MacroArgs {
    pub names: Vec<String>,
    pub has_varargs: bool,
}

impl MacroArgs {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && !self.has_varargs
    }

    /// Argument slot for a parameter name, with `__VA_ARGS__` mapped to the
    /// slot after the named parameters.
    pub fn position(&self, name: &str) -> Option<usize> {
        if self.has_varargs && name == "__VA_ARGS__" {
            return Some(self.names.len());
        }
        self.names.iter().position(|n| n == name)
    }
}

/// A macro definition. `active` is false for tombstones left by `#undef`;
/// they keep their slot so diagnostics can point at the old definition, and
/// a later `#define` revives the slot without a compatibility check.
#[derive(Clone, Debug)]
pub struct Macro {
    pub name: String,
    pub args: MacroArgs,
    /// Distinguishes `#define F() x` from `#define F x`.
    pub function_like: bool,
    pub replacement: Vec<PpToken>,
    pub active: bool,
    pub defined_at: SourcePos,
}

impl Macro {
    pub fn is_function_like(&self) -> bool {
        self.function_like
    }

    /// Structural equivalence per C11 6.10.3p2: same parameters, and
    /// replacement lists identical in spelling with matching whitespace
    /// separation between tokens.
    pub fn compatible_with(&self, other: &Macro) -> bool {
        if self.function_like != other.function_like || self.args != other.args {
            return false;
        }

        if self.replacement.len() != other.replacement.len() {
            return false;
        }

        let len = self.replacement.len();
        for (i, (a, b)) in self.replacement.iter().zip(other.replacement.iter()).enumerate() {
            if a.kind != b.kind || a.data != b.data {
                return false;
            }
            // Whitespace only matters between tokens.
            if i + 1 < len && a.has_whitespace != b.has_whitespace {
                return false;
            }
        }

        true
    }
}

/// Outcome of inserting into the define table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// No previous entry
    Added,
    /// Replaced an inactive tombstone
    Redefined,
    /// An identical active definition already exists; the new one is dropped
    Identical,
    /// An incompatible active definition exists; the new one is dropped
    Incompatible,
}

/// Name to macro mapping for one translation unit. Iteration order is
/// insertion order, which keeps diagnostics deterministic.
#[derive(Debug, Default)]
pub struct DefineTable {
    defines: LinkedHashMap<String, Macro>,
}

impl DefineTable {
    pub fn new() -> DefineTable {
        DefineTable {
            defines: LinkedHashMap::new(),
        }
    }

    /// Looks a name up, tombstones included.
    pub fn lookup(&self, name: &str) -> Option<&Macro> {
        self.defines.get(name)
    }

    pub fn lookup_active(&self, name: &str) -> Option<&Macro> {
        self.defines.get(name).filter(|def| def.active)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup_active(name).is_some()
    }

    pub fn insert(&mut self, def: Macro) -> InsertResult {
        match self.defines.get_mut(&def.name) {
            Some(old) if old.active => {
                if old.compatible_with(&def) {
                    InsertResult::Identical
                } else {
                    InsertResult::Incompatible
                }
            },
            Some(old) => {
                *old = def;
                InsertResult::Redefined
            },
            None => {
                self.defines.insert(def.name.clone(), def);
                InsertResult::Added
            }
        }
    }

    /// `#undef`: leaves a tombstone. Returns false if the name was never
    /// defined.
    pub fn deactivate(&mut self, name: &str) -> bool {
        match self.defines.get_mut(name) {
            Some(def) => {
                def.active = false;
                true
            },
            None => false,
        }
    }
}
