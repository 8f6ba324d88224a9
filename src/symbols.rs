use std::collections::HashMap;

use crate::ast::VarDecl;

/// What kind of storage a declaration names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Var,
}

/// A single scope: name to declaration. Jack has exactly two scope levels
/// (function and class); consumers chain the lookup themselves.
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: HashMap<String, VarDecl>,
    name: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            entries: HashMap::new(),
            name: name.into(),
        }
    }

    /// Name of the owning scope (class or subroutine).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the name was new. A duplicate leaves the first
    /// binding intact.
    pub fn insert(&mut self, decl: VarDecl) -> bool {
        if self.entries.contains_key(&decl.name) {
            return false;
        }
        self.entries.insert(decl.name.clone(), decl);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&VarDecl> {
        self.entries.get(name)
    }

    /// Re-binds the declared type of an existing entry. Used when a class
    /// adopts a method and fills in the type of the synthetic `this`.
    pub fn set_type(&mut self, name: &str, ty: impl Into<String>) {
        if let Some(decl) = self.entries.get_mut(name) {
            decl.ty = ty.into();
        }
    }
}
