use crate::language::{
    span::Span,
    types::{GenericArgs, Lifetime, MacroCall, Path, PathSegment, TypeBound, TypeExpr},
};

#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// `pub(crate)`, `pub(super)` and `pub(in ..)`.
    Crate,
    #[default]
    Private,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub visibility: Visibility,
    pub span: Span,
}

impl Item {
    pub fn name(&self) -> Option<&Ident> {
        match &self.kind {
            ItemKind::Fn(def) => Some(&def.name),
            ItemKind::Struct(def) => Some(&def.name),
            ItemKind::Enum(def) => Some(&def.name),
            ItemKind::TypeAlias(def) => Some(&def.name),
            ItemKind::Trait(def) => Some(&def.name),
            ItemKind::Mod(def) => Some(&def.name),
            ItemKind::Const(def) => Some(&def.name),
            ItemKind::MacroRules(def) => Some(&def.name),
            ItemKind::Impl(_) | ItemKind::Use(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    Fn(FnDef),
    Struct(StructDef),
    Enum(EnumDef),
    TypeAlias(TypeAliasDef),
    Trait(TraitDef),
    Impl(ImplDef),
    Mod(ModDef),
    Use(UseTree),
    Const(ConstDef),
    MacroRules(MacroDef),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generics {
    pub params: Vec<GenericParam>,
    pub where_clause: Vec<WherePredicate>,
    pub span: Span,
}

impl Generics {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.where_clause.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenericParam {
    /// Lifetime parameters keep their leading quote.
    pub name: Ident,
    pub kind: GenericParamKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenericParamKind {
    Lifetime {
        bounds: Vec<Lifetime>,
    },
    Type {
        bounds: Vec<TypeBound>,
        default: Option<TypeExpr>,
    },
    Const {
        ty: TypeExpr,
        default: Option<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum WherePredicate {
    Bound {
        for_lifetimes: Vec<Lifetime>,
        ty: TypeExpr,
        bounds: Vec<TypeBound>,
        span: Span,
    },
    Lifetime {
        lifetime: Lifetime,
        bounds: Vec<Lifetime>,
        span: Span,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FnQualifiers {
    pub is_async: bool,
    pub is_const: bool,
    pub is_unsafe: bool,
    /// `Some(None)` for a bare `extern`.
    pub abi: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FnDef {
    pub name: Ident,
    pub qualifiers: FnQualifiers,
    pub generics: Generics,
    pub self_param: Option<SelfParam>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelfParam {
    pub kind: SelfKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelfKind {
    Value { mutable: bool },
    Ref { lifetime: Option<Lifetime>, mutable: bool },
    Explicit { mutable: bool, ty: TypeExpr },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Ident {
        name: Ident,
        mutable: bool,
        by_ref: bool,
    },
    Wild(Span),
    Tuple(Vec<Pattern>, Span),
    Ref {
        mutable: bool,
        inner: Box<Pattern>,
        span: Span,
    },
}

impl Pattern {
    /// Names bound by the pattern, left to right.
    pub fn bindings(&self) -> Vec<&Ident> {
        let mut out = Vec::new();
        self.collect_bindings(&mut out);
        out
    }

    fn collect_bindings<'a>(&'a self, out: &mut Vec<&'a Ident>) {
        match self {
            Pattern::Ident { name, .. } => out.push(name),
            Pattern::Wild(_) => {}
            Pattern::Tuple(items, _) => {
                for item in items {
                    item.collect_bindings(out);
                }
            }
            Pattern::Ref { inner, .. } => inner.collect_bindings(out),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Pattern::Ident { name, .. } => name.span,
            Pattern::Wild(span) | Pattern::Tuple(_, span) | Pattern::Ref { span, .. } => *span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    pub name: Ident,
    pub generics: Generics,
    pub fields: StructFields,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StructFields {
    Named(Vec<FieldDef>),
    Tuple(Vec<FieldDef>),
    Unit,
}

impl StructFields {
    pub fn iter(&self) -> std::slice::Iter<'_, FieldDef> {
        match self {
            StructFields::Named(fields) | StructFields::Tuple(fields) => fields.iter(),
            StructFields::Unit => [].iter(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: Option<Ident>,
    pub visibility: Visibility,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDef {
    pub name: Ident,
    pub generics: Generics,
    pub variants: Vec<VariantDef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariantDef {
    pub name: Ident,
    pub fields: StructFields,
    pub discriminant: Option<Expr>,
    pub span: Span,
}

/// Shared by `type` items and associated types in traits and impls.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeAliasDef {
    pub name: Ident,
    pub generics: Generics,
    pub bounds: Vec<TypeBound>,
    pub ty: Option<TypeExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TraitDef {
    pub name: Ident,
    pub is_unsafe: bool,
    pub generics: Generics,
    pub supertraits: Vec<TypeBound>,
    pub items: Vec<AssocItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImplDef {
    pub generics: Generics,
    pub is_unsafe: bool,
    pub negative: bool,
    pub trait_ref: Option<Path>,
    pub self_ty: TypeExpr,
    pub items: Vec<AssocItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssocItem {
    pub kind: AssocItemKind,
    pub visibility: Visibility,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AssocItemKind {
    Fn(FnDef),
    Type(TypeAliasDef),
    Const(ConstDef),
}

impl AssocItem {
    pub fn name(&self) -> &Ident {
        match &self.kind {
            AssocItemKind::Fn(def) => &def.name,
            AssocItemKind::Type(def) => &def.name,
            AssocItemKind::Const(def) => &def.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModDef {
    pub name: Ident,
    /// `None` for `mod foo;` before the file has been loaded.
    pub items: Option<Vec<Item>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UseTree {
    /// Leading `::`.
    pub global: bool,
    pub prefix: Vec<Ident>,
    pub kind: UseTreeKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UseTreeKind {
    /// `a::b` or `a::b as c`; an alias of `_` imports anonymously.
    Simple { alias: Option<Ident> },
    Glob,
    Nested(Vec<UseTree>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstDef {
    pub name: Ident,
    pub is_static: bool,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MacroDef {
    pub name: Ident,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub tail: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Let(LetStmt),
    Expr(Expr),
    Item(Box<Item>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LetStmt {
    pub pattern: Pattern,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Plain,
    Unsafe,
    Async,
    Const,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Literal {
    pub kind: LitKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LitKind {
    Int { value: u128, suffix: Option<String> },
    Float(String),
    Bool(bool),
    Char(char),
    Byte(u8),
    Str(String),
    ByteStr(Vec<u8>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
    Ref,
    RefMut,
}

impl UnaryOp {
    pub fn sign(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Deref => "*",
            UnaryOp::Ref => "&",
            UnaryOp::RefMut => "&mut ",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn sign(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::BitOr => 4,
            BinaryOp::BitXor => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::Shl | BinaryOp::Shr => 7,
            BinaryOp::Add | BinaryOp::Sub => 8,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 9,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldInit {
    pub name: Ident,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Path(Path),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: PathSegment,
        args: Vec<Expr>,
        span: Span,
    },
    Field {
        base: Box<Expr>,
        name: Ident,
        span: Span,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
        span: Span,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Try {
        expr: Box<Expr>,
        span: Span,
    },
    Block {
        kind: BlockKind,
        block: Block,
    },
    Paren(Box<Expr>, Span),
    Tuple(Vec<Expr>, Span),
    Array(Vec<Expr>, Span),
    Repeat {
        value: Box<Expr>,
        len: Box<Expr>,
        span: Span,
    },
    Struct {
        path: Path,
        fields: Vec<FieldInit>,
        span: Span,
    },
    If {
        cond: Box<Expr>,
        then_branch: Block,
        else_branch: Option<Box<Expr>>,
        span: Span,
    },
    Return(Option<Box<Expr>>, Span),
    Macro(MacroCall),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span,
            Expr::Path(path) => path.span,
            Expr::Call { span, .. }
            | Expr::MethodCall { span, .. }
            | Expr::Field { span, .. }
            | Expr::Index { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Try { span, .. }
            | Expr::Repeat { span, .. }
            | Expr::Struct { span, .. }
            | Expr::If { span, .. } => *span,
            Expr::Block { block, .. } => block.span,
            Expr::Paren(_, span)
            | Expr::Tuple(_, span)
            | Expr::Array(_, span)
            | Expr::Return(_, span) => *span,
            Expr::Macro(call) => call.span,
        }
    }

    pub fn method_generic_args(&self) -> Option<&GenericArgs> {
        match self {
            Expr::MethodCall { method, .. } => method.args.as_ref(),
            _ => None,
        }
    }

    /// Paths written directly in this expression, not inside nested blocks' items.
    pub fn walk_paths<'a>(&'a self, f: &mut dyn FnMut(&'a Path)) {
        match self {
            Expr::Literal(_) | Expr::Return(None, _) => {}
            Expr::Path(path) => path.walk_paths(f),
            Expr::Call { callee, args, .. } => {
                callee.walk_paths(f);
                for arg in args {
                    arg.walk_paths(f);
                }
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
                ..
            } => {
                receiver.walk_paths(f);
                if let Some(generic_args) = &method.args {
                    generic_args.walk_paths(f);
                }
                for arg in args {
                    arg.walk_paths(f);
                }
            }
            Expr::Field { base, .. } => base.walk_paths(f),
            Expr::Index { base, index, .. } => {
                base.walk_paths(f);
                index.walk_paths(f);
            }
            Expr::Unary { expr, .. } | Expr::Try { expr, .. } | Expr::Paren(expr, _) => {
                expr.walk_paths(f)
            }
            Expr::Return(Some(expr), _) => expr.walk_paths(f),
            Expr::Binary { left, right, .. } => {
                left.walk_paths(f);
                right.walk_paths(f);
            }
            Expr::Cast { expr, ty, .. } => {
                expr.walk_paths(f);
                ty.walk_paths(f);
            }
            Expr::Assign { target, value, .. } => {
                target.walk_paths(f);
                value.walk_paths(f);
            }
            Expr::Block { block, .. } => block.walk_paths(f),
            Expr::Tuple(items, _) | Expr::Array(items, _) => {
                for item in items {
                    item.walk_paths(f);
                }
            }
            Expr::Repeat { value, len, .. } => {
                value.walk_paths(f);
                len.walk_paths(f);
            }
            Expr::Struct { path, fields, .. } => {
                path.walk_paths(f);
                for field in fields {
                    field.value.walk_paths(f);
                }
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                cond.walk_paths(f);
                then_branch.walk_paths(f);
                if let Some(else_branch) = else_branch {
                    else_branch.walk_paths(f);
                }
            }
            Expr::Macro(call) => f(&call.path),
        }
    }
}

impl Block {
    pub fn walk_paths<'a>(&'a self, f: &mut dyn FnMut(&'a Path)) {
        for stmt in &self.stmts {
            match stmt {
                Stmt::Let(local) => {
                    if let Some(ty) = &local.ty {
                        ty.walk_paths(f);
                    }
                    if let Some(init) = &local.init {
                        init.walk_paths(f);
                    }
                }
                Stmt::Expr(expr) => expr.walk_paths(f),
                Stmt::Item(_) => {}
            }
        }
        if let Some(tail) = &self.tail {
            tail.walk_paths(f);
        }
    }
}
