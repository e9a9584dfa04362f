use super::{CrateId, DefId, Import, ScopeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// Names come from the module's items and imports; lexical lookup stops here.
    Module,
    /// Generic parameters (and `Self`) of an item.
    Item(DefId),
    Block,
    /// `for<'a>` lifetimes.
    Binder,
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub module: DefId,
    pub krate: CrateId,
    pub(crate) bindings: Vec<(String, DefId)>,
    pub(crate) lifetimes: Vec<(String, DefId)>,
    /// `use` declarations inside blocks.
    pub(crate) imports: Vec<Import>,
}

impl Scope {
    pub(crate) fn new(parent: Option<ScopeId>, kind: ScopeKind, module: DefId, krate: CrateId) -> Self {
        Self {
            parent,
            kind,
            module,
            krate,
            bindings: Vec::new(),
            lifetimes: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, DefId)> {
        self.bindings.iter().map(|(name, def)| (name.as_str(), *def))
    }

    pub fn lifetime(&self, name: &str) -> Option<DefId> {
        self.lifetimes
            .iter()
            .rev()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, def)| *def)
    }
}
