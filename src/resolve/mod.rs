use crate::language::{
    ast::{Expr, FnDef, StructFields, Visibility},
    span::Span,
    types::{Path, TypeBound, TypeExpr},
};
use rustc_hash::FxHashSet;
use std::fmt;

pub mod builtin;
mod cache;
mod loader;
mod modules;
mod resolver;
mod scope;
#[cfg(test)]
mod tests;
mod workspace;

pub use cache::{CacheStats, ResolveCache};
pub use loader::{DiskLoader, FileErrors, LoadError, LoadedModule, ModuleLoader, NoModuleFiles};
pub use modules::Binding;
pub use resolver::{CallSite, Resolver};
pub use scope::{Scope, ScopeKind};
pub use workspace::{CrateData, FileData, ModuleData, Workspace};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrateId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Ordered by tie-break priority: types win over values, values over macros.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Types,
    Values,
    Macros,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Types, Namespace::Values, Namespace::Macros];
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Types => write!(f, "type"),
            Namespace::Values => write!(f, "value"),
            Namespace::Macros => write!(f, "macro"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DefData {
    pub name: String,
    pub kind: DefKind,
    pub krate: CrateId,
    pub file: FileId,
    /// Enclosing module, trait, impl, enum or function.
    pub parent: Option<DefId>,
    pub visibility: Visibility,
    pub span: Span,
    /// Lifetime, type and const parameters in declaration order.
    pub generics: Vec<DefId>,
    /// Variants of an enum, items of a trait or impl.
    pub children: Vec<DefId>,
}

#[derive(Clone, Debug)]
pub enum DefKind {
    Module,
    Struct { fields: StructFields },
    Enum,
    Variant { fields: StructFields },
    /// Signature only; bodies stay in the crate's syntax tree.
    Fn(Box<FnDef>),
    /// Module-level aliases and associated types of traits and impls.
    TypeAlias {
        ty: Option<TypeExpr>,
        bounds: Vec<TypeBound>,
    },
    Trait { supertraits: Vec<TypeBound> },
    Impl {
        trait_ref: Option<Path>,
        self_ty: TypeExpr,
    },
    /// `Self` inside a trait or impl; the parent is the owner.
    SelfType,
    Const {
        ty: Option<TypeExpr>,
        value: Option<Expr>,
    },
    Macro,
    TypeParam {
        bounds: Vec<TypeBound>,
        default: Option<TypeExpr>,
    },
    ConstParam {
        ty: TypeExpr,
        default: Option<Expr>,
    },
    LifetimeParam,
    Local {
        ty: Option<TypeExpr>,
        init: Option<Expr>,
    },
    Primitive,
}

impl DefKind {
    pub fn namespaces(&self) -> &'static [Namespace] {
        match self {
            DefKind::Module
            | DefKind::Enum
            | DefKind::TypeAlias { .. }
            | DefKind::Trait { .. }
            | DefKind::SelfType
            | DefKind::TypeParam { .. }
            | DefKind::Primitive => &[Namespace::Types],
            DefKind::Struct { fields } => match fields {
                StructFields::Named(_) => &[Namespace::Types],
                StructFields::Tuple(_) | StructFields::Unit => &[Namespace::Types, Namespace::Values],
            },
            DefKind::Variant { .. } => &[Namespace::Types, Namespace::Values],
            DefKind::Fn(_) | DefKind::Const { .. } | DefKind::ConstParam { .. } | DefKind::Local { .. } => {
                &[Namespace::Values]
            }
            DefKind::Macro => &[Namespace::Macros],
            DefKind::Impl { .. } | DefKind::LifetimeParam => &[],
        }
    }

    pub fn in_namespace(&self, ns: Namespace) -> bool {
        self.namespaces().contains(&ns)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DefKind::Module => "module",
            DefKind::Struct { .. } => "struct",
            DefKind::Enum => "enum",
            DefKind::Variant { .. } => "variant",
            DefKind::Fn(_) => "function",
            DefKind::TypeAlias { .. } => "type alias",
            DefKind::Trait { .. } => "trait",
            DefKind::Impl { .. } => "impl",
            DefKind::SelfType => "Self type",
            DefKind::Const { .. } => "constant",
            DefKind::Macro => "macro",
            DefKind::TypeParam { .. } => "type parameter",
            DefKind::ConstParam { .. } => "const parameter",
            DefKind::LifetimeParam => "lifetime parameter",
            DefKind::Local { .. } => "local",
            DefKind::Primitive => "primitive type",
        }
    }

    pub fn is_generic_param(&self) -> bool {
        matches!(
            self,
            DefKind::TypeParam { .. } | DefKind::ConstParam { .. } | DefKind::LifetimeParam
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolved {
    pub def: DefId,
    pub ns: Namespace,
}

/// Every target a path may denote. Empty means unresolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolutionResult {
    candidates: Vec<Resolved>,
}

impl ResolutionResult {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn from_candidates(candidates: Vec<Resolved>) -> Self {
        let mut seen = FxHashSet::default();
        let candidates = candidates
            .into_iter()
            .filter(|candidate| seen.insert(*candidate))
            .collect();
        Self { candidates }
    }

    pub fn is_unresolved(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }

    pub fn candidates(&self) -> &[Resolved] {
        &self.candidates
    }

    /// Deterministic pick among candidates: first of the highest-priority namespace.
    pub fn primary(&self) -> Option<DefId> {
        self.candidates
            .iter()
            .min_by_key(|candidate| candidate.ns)
            .map(|candidate| candidate.def)
    }

    pub fn in_namespace(&self, ns: Namespace) -> impl Iterator<Item = DefId> + '_ {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.ns == ns)
            .map(|candidate| candidate.def)
    }

    pub fn first_in(&self, ns: Namespace) -> Option<DefId> {
        self.in_namespace(ns).next()
    }

    pub fn defs(&self) -> impl Iterator<Item = DefId> + '_ {
        self.candidates.iter().map(|candidate| candidate.def)
    }
}

/// One flattened leaf of a `use` tree.
#[derive(Clone, Debug)]
pub struct Import {
    pub global: bool,
    pub path: Vec<String>,
    pub kind: ImportKind,
    pub visibility: Visibility,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportKind {
    /// Binds `name`; `_` imports anonymously.
    Named { name: String },
    Glob,
}

impl Import {
    pub fn binding_name(&self) -> Option<&str> {
        match &self.kind {
            ImportKind::Named { name } if name != "_" => Some(name),
            _ => None,
        }
    }
}
