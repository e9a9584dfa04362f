use crate::language::{ast::Expr, span::Span};

/// Identity of a path or lifetime node. Stable for the lifetime of a workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Nodes built outside a parsed source file (rendering inputs, fragments).
    pub const DETACHED: NodeId = NodeId(u32::MAX);

    pub fn is_detached(self) -> bool {
        self == NodeId::DETACHED
    }
}

#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExpr {
    Tuple(Vec<TypeExpr>, Span),
    Unit(Span),
    Never(Span),
    Infer(Span),
    Path(Path),
    Ref {
        lifetime: Option<Lifetime>,
        mutable: bool,
        inner: Box<TypeExpr>,
        span: Span,
    },
    Ptr {
        mutable: bool,
        inner: Box<TypeExpr>,
        span: Span,
    },
    Array {
        elem: Box<TypeExpr>,
        len: Box<Expr>,
        span: Span,
    },
    Slice(Box<TypeExpr>, Span),
    FnPtr(FnPtrType),
    TraitObject {
        kind: TraitObjectKind,
        bounds: Vec<TypeBound>,
        span: Span,
    },
    Macro(MacroCall),
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Tuple(_, span)
            | TypeExpr::Unit(span)
            | TypeExpr::Never(span)
            | TypeExpr::Infer(span)
            | TypeExpr::Slice(_, span) => *span,
            TypeExpr::Path(path) => path.span,
            TypeExpr::Ref { span, .. }
            | TypeExpr::Ptr { span, .. }
            | TypeExpr::Array { span, .. }
            | TypeExpr::TraitObject { span, .. } => *span,
            TypeExpr::FnPtr(fn_ptr) => fn_ptr.span,
            TypeExpr::Macro(call) => call.span,
        }
    }

    /// A single-segment detached path type such as `u32` or `bool`.
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Path(Path::single(name))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            TypeExpr::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Calls `f` for every path nested in this type, outermost first.
    pub fn walk_paths<'a>(&'a self, f: &mut dyn FnMut(&'a Path)) {
        match self {
            TypeExpr::Tuple(items, _) => {
                for item in items {
                    item.walk_paths(f);
                }
            }
            TypeExpr::Unit(_) | TypeExpr::Never(_) | TypeExpr::Infer(_) => {}
            TypeExpr::Path(path) => path.walk_paths(f),
            TypeExpr::Ref { inner, .. } | TypeExpr::Ptr { inner, .. } | TypeExpr::Slice(inner, _) => {
                inner.walk_paths(f)
            }
            TypeExpr::Array { elem, len, .. } => {
                elem.walk_paths(f);
                len.walk_paths(f);
            }
            TypeExpr::FnPtr(fn_ptr) => {
                for param in &fn_ptr.params {
                    param.walk_paths(f);
                }
                if let Some(ret) = &fn_ptr.ret {
                    ret.walk_paths(f);
                }
            }
            TypeExpr::TraitObject { bounds, .. } => {
                for bound in bounds {
                    if let TypeBound::Trait(poly) = bound {
                        poly.path.walk_paths(f);
                    }
                }
            }
            TypeExpr::Macro(call) => f(&call.path),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraitObjectKind {
    Dyn,
    Impl,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FnPtrType {
    pub is_unsafe: bool,
    /// `Some(None)` for a bare `extern`, `Some(Some("C"))` for `extern "C"`.
    pub abi: Option<Option<String>>,
    pub params: Vec<TypeExpr>,
    pub ret: Option<Box<TypeExpr>>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lifetime {
    pub id: NodeId,
    /// Includes the leading quote, e.g. `'a`, `'static`, `'_`.
    pub name: String,
    pub span: Span,
}

impl Lifetime {
    pub fn is_static(&self) -> bool {
        self.name == "'static"
    }

    pub fn is_anonymous(&self) -> bool {
        self.name == "'_"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub id: NodeId,
    pub qself: Option<Box<QualifiedSelf>>,
    /// Leading `::`.
    pub global: bool,
    pub segments: Vec<PathSegment>,
    pub span: Span,
}

impl Path {
    pub fn single(name: impl Into<String>) -> Self {
        Path {
            id: NodeId::DETACHED,
            qself: None,
            global: false,
            segments: vec![PathSegment::plain(name, Span::default())],
            span: Span::default(),
        }
    }

    pub fn from_segments<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path {
            id: NodeId::DETACHED,
            qself: None,
            global: false,
            segments: names
                .into_iter()
                .map(|name| PathSegment::plain(name, Span::default()))
                .collect(),
            span: Span::default(),
        }
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn last_name(&self) -> &str {
        self.segments.last().map(|seg| seg.name.as_str()).unwrap_or("")
    }

    /// True when nothing precedes the final segment.
    pub fn is_single(&self) -> bool {
        self.qself.is_none() && !self.global && self.segments.len() == 1
    }

    pub fn has_qualifier(&self) -> bool {
        self.qself.is_some() || self.global || self.segments.len() > 1
    }

    /// Walks the path itself, then every path nested in its qualifier and generic arguments.
    pub fn walk_paths<'a>(&'a self, f: &mut dyn FnMut(&'a Path)) {
        f(self);
        if let Some(qself) = &self.qself {
            qself.ty.walk_paths(f);
            if let Some(trait_ref) = &qself.trait_ref {
                trait_ref.walk_paths(f);
            }
        }
        for segment in &self.segments {
            if let Some(args) = &segment.args {
                args.walk_paths(f);
            }
            if let Some(sugar) = &segment.fn_sugar {
                for input in &sugar.inputs {
                    input.walk_paths(f);
                }
                if let Some(output) = &sugar.output {
                    output.walk_paths(f);
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QualifiedSelf {
    pub ty: TypeExpr,
    pub trait_ref: Option<Path>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathSegment {
    pub name: String,
    pub span: Span,
    pub args: Option<GenericArgs>,
    pub fn_sugar: Option<FnSugar>,
    /// Arguments were written as `::<...>`.
    pub turbofish: bool,
}

impl PathSegment {
    pub fn plain(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
            args: None,
            fn_sugar: None,
            turbofish: false,
        }
    }

    pub fn is_self_type(&self) -> bool {
        self.name == "Self"
    }
}

/// `Fn(A, B) -> C` style arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct FnSugar {
    pub inputs: Vec<TypeExpr>,
    pub output: Option<Box<TypeExpr>>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenericArg {
    Lifetime(Lifetime),
    Type(TypeExpr),
    Const(Expr),
    Binding(AssocBinding),
}

impl GenericArg {
    pub fn span(&self) -> Span {
        match self {
            GenericArg::Lifetime(lifetime) => lifetime.span,
            GenericArg::Type(ty) => ty.span(),
            GenericArg::Const(expr) => expr.span(),
            GenericArg::Binding(binding) => binding.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenericArgs {
    pub args: Vec<GenericArg>,
    pub span: Span,
}

impl GenericArgs {
    pub fn lifetimes(&self) -> impl Iterator<Item = &Lifetime> {
        self.args.iter().filter_map(|arg| match arg {
            GenericArg::Lifetime(lifetime) => Some(lifetime),
            _ => None,
        })
    }

    /// Type and const arguments in source order.
    pub fn positional(&self) -> impl Iterator<Item = &GenericArg> {
        self.args
            .iter()
            .filter(|arg| matches!(arg, GenericArg::Type(_) | GenericArg::Const(_)))
    }

    pub fn bindings(&self) -> impl Iterator<Item = &AssocBinding> {
        self.args.iter().filter_map(|arg| match arg {
            GenericArg::Binding(binding) => Some(binding),
            _ => None,
        })
    }

    pub fn positional_count(&self) -> usize {
        self.positional().count()
    }

    pub fn walk_paths<'a>(&'a self, f: &mut dyn FnMut(&'a Path)) {
        for arg in &self.args {
            match arg {
                GenericArg::Lifetime(_) => {}
                GenericArg::Type(ty) => ty.walk_paths(f),
                GenericArg::Const(expr) => expr.walk_paths(f),
                GenericArg::Binding(binding) => binding.ty.walk_paths(f),
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssocBinding {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeBound {
    Trait(PolyTraitRef),
    Lifetime(Lifetime),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolyTraitRef {
    pub for_lifetimes: Vec<Lifetime>,
    /// `?Sized`
    pub maybe: bool,
    pub path: Path,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MacroCall {
    pub path: Path,
    /// Raw text between (and excluding) the delimiters.
    pub body: String,
    pub delimiter: Delimiter,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiter {
    Paren,
    Bracket,
    Brace,
}

impl Delimiter {
    pub fn open(self) -> char {
        match self {
            Delimiter::Paren => '(',
            Delimiter::Bracket => '[',
            Delimiter::Brace => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Delimiter::Paren => ')',
            Delimiter::Bracket => ']',
            Delimiter::Brace => '}',
        }
    }
}
