use super::{SubstValue, Substitution};
use crate::{
    language::{
        ast::{Block, Expr, FieldInit, LetStmt, Stmt},
        types::{
            AssocBinding, FnPtrType, FnSugar, GenericArg, GenericArgs, Lifetime, NodeId, Path,
            PathSegment, PolyTraitRef, QualifiedSelf, TypeBound, TypeExpr,
        },
    },
    resolve::{DefId, DefKind, Namespace, Resolver},
};
use tracing::{trace, warn};

const MAX_EXPANSION_DEPTH: usize = 32;

/// Maps the generic parameters of `decl` to `args`. Lifetimes pair with lifetime
/// parameters, types and consts with the rest in order. Omitted parameters with a
/// default take the default, substituted with the parameters before it.
pub fn substitution_for(
    resolver: &Resolver<'_>,
    decl: DefId,
    args: Option<&GenericArgs>,
) -> Substitution {
    let ws = resolver.workspace();
    let positional: Vec<&GenericArg> = args.map(|args| args.positional().collect()).unwrap_or_default();
    let lifetimes: Vec<&Lifetime> = args.map(|args| args.lifetimes().collect()).unwrap_or_default();
    let mut next_positional = 0;
    let mut next_lifetime = 0;
    let mut subst = Substitution::new();

    for &param in &ws.def(decl).generics {
        match &ws.def(param).kind {
            DefKind::LifetimeParam => {
                if let Some(lifetime) = lifetimes.get(next_lifetime) {
                    subst.insert(param, SubstValue::Lifetime((*lifetime).clone()));
                }
                next_lifetime += 1;
            }
            DefKind::TypeParam { default, .. } => {
                let value = match positional.get(next_positional) {
                    Some(GenericArg::Type(ty)) => Some(SubstValue::Type(ty.clone())),
                    Some(GenericArg::Const(expr)) => Some(SubstValue::Const(expr.clone())),
                    _ => default
                        .as_ref()
                        .map(|default| SubstValue::Type(substitute_type(resolver, default, &subst))),
                };
                if let Some(value) = value {
                    subst.insert(param, value);
                }
                next_positional += 1;
            }
            DefKind::ConstParam { default, .. } => {
                let value = match positional.get(next_positional) {
                    Some(GenericArg::Const(expr)) => Some(SubstValue::Const(expr.clone())),
                    // `Foo<N>` parses `N` as a type
                    Some(GenericArg::Type(TypeExpr::Path(path))) if path.is_single() => {
                        Some(SubstValue::Const(Expr::Path(path.clone())))
                    }
                    Some(GenericArg::Type(ty)) => Some(SubstValue::Type(ty.clone())),
                    _ => default
                        .as_ref()
                        .map(|default| SubstValue::Const(substitute_expr(resolver, default, &subst))),
                };
                if let Some(value) = value {
                    subst.insert(param, value);
                }
                next_positional += 1;
            }
            _ => {}
        }
    }
    trace!(decl = %ws.def(decl).name, params = subst.len(), "substitution built");
    subst
}

/// Resolves `path` and maps its declaration's parameters to the arguments of the last segment.
pub fn substitution_for_path(resolver: &Resolver<'_>, path: &Path) -> Option<(DefId, Substitution)> {
    let decl = resolver.resolve(path).primary()?;
    let args = path.last().and_then(|segment| segment.args.as_ref());
    Some((decl, substitution_for(resolver, decl, args)))
}

/// The substitution equivalent to applying `first`, then `second`.
pub fn compose(resolver: &Resolver<'_>, first: &Substitution, second: &Substitution) -> Substitution {
    let mut out = Substitution::new();
    for (param, value) in first.iter() {
        out.insert(param, substitute_value(resolver, value, second));
    }
    for (param, value) in second.iter() {
        if !out.contains(param) {
            out.insert(param, value.clone());
        }
    }
    out
}

fn substitute_value(resolver: &Resolver<'_>, value: &SubstValue, subst: &Substitution) -> SubstValue {
    match value {
        SubstValue::Type(ty) => SubstValue::Type(substitute_type(resolver, ty, subst)),
        SubstValue::Const(expr) => SubstValue::Const(substitute_expr(resolver, expr, subst)),
        SubstValue::Lifetime(lifetime) => {
            SubstValue::Lifetime(substitute_lifetime(resolver, lifetime, subst))
        }
    }
}

enum PathSubst {
    Value(SubstValue),
    Path(Path),
}

/// The substituted parameter a path starts with, if any.
fn leading_param(resolver: &Resolver<'_>, path: &Path, subst: &Substitution) -> Option<DefId> {
    if path.qself.is_some() || path.global {
        return None;
    }
    let first = path.segments.first()?;
    if first.args.is_some() || first.fn_sugar.is_some() {
        return None;
    }
    let result = if path.segments.len() == 1 {
        resolver.resolve(path)
    } else {
        resolver.resolve_prefix(path, 1)
    };
    let found = result.defs().find(|def| subst.contains(*def));
    found
}

fn substitute_path(resolver: &Resolver<'_>, path: &Path, subst: &Substitution) -> PathSubst {
    if let Some(value) = leading_param(resolver, path, subst).and_then(|param| subst.get(param)) {
        if path.segments.len() == 1 {
            return PathSubst::Value(value.clone());
        }
        if let SubstValue::Type(replacement) = value {
            // `T::Item` becomes `<Replacement>::Item`
            let segments = path.segments[1..]
                .iter()
                .map(|segment| substitute_segment(resolver, segment, subst))
                .collect();
            return PathSubst::Path(Path {
                id: NodeId::DETACHED,
                qself: Some(Box::new(QualifiedSelf {
                    ty: replacement.clone(),
                    trait_ref: None,
                })),
                global: false,
                segments,
                span: path.span,
            });
        }
    }

    let mut id = path.id;
    let qself = path.qself.as_ref().map(|qself| {
        if qself.trait_ref.is_none() {
            id = NodeId::DETACHED;
        }
        Box::new(QualifiedSelf {
            ty: substitute_type(resolver, &qself.ty, subst),
            trait_ref: qself
                .trait_ref
                .as_ref()
                .map(|trait_ref| substitute_path_args(resolver, trait_ref, subst)),
        })
    });
    PathSubst::Path(Path {
        id,
        qself,
        global: path.global,
        segments: path
            .segments
            .iter()
            .map(|segment| substitute_segment(resolver, segment, subst))
            .collect(),
        span: path.span,
    })
}

fn substitute_path_args(resolver: &Resolver<'_>, path: &Path, subst: &Substitution) -> Path {
    match substitute_path(resolver, path, subst) {
        PathSubst::Path(path) => path,
        PathSubst::Value(_) => path.clone(),
    }
}

fn substitute_segment(resolver: &Resolver<'_>, segment: &PathSegment, subst: &Substitution) -> PathSegment {
    PathSegment {
        name: segment.name.clone(),
        span: segment.span,
        args: segment
            .args
            .as_ref()
            .map(|args| substitute_args(resolver, args, subst)),
        fn_sugar: segment.fn_sugar.as_ref().map(|sugar| FnSugar {
            inputs: sugar
                .inputs
                .iter()
                .map(|input| substitute_type(resolver, input, subst))
                .collect(),
            output: sugar
                .output
                .as_ref()
                .map(|output| Box::new(substitute_type(resolver, output, subst))),
            span: sugar.span,
        }),
        turbofish: segment.turbofish,
    }
}

fn substitute_args(resolver: &Resolver<'_>, args: &GenericArgs, subst: &Substitution) -> GenericArgs {
    GenericArgs {
        args: args
            .args
            .iter()
            .map(|arg| substitute_arg(resolver, arg, subst))
            .collect(),
        span: args.span,
    }
}

fn substitute_arg(resolver: &Resolver<'_>, arg: &GenericArg, subst: &Substitution) -> GenericArg {
    match arg {
        GenericArg::Lifetime(lifetime) => {
            GenericArg::Lifetime(substitute_lifetime(resolver, lifetime, subst))
        }
        GenericArg::Type(TypeExpr::Path(path)) => match substitute_path(resolver, path, subst) {
            PathSubst::Value(SubstValue::Type(ty)) => GenericArg::Type(ty),
            PathSubst::Value(SubstValue::Const(expr)) => GenericArg::Const(expr),
            PathSubst::Value(SubstValue::Lifetime(lifetime)) => GenericArg::Lifetime(lifetime),
            PathSubst::Path(path) => GenericArg::Type(TypeExpr::Path(path)),
        },
        GenericArg::Type(ty) => GenericArg::Type(substitute_type(resolver, ty, subst)),
        GenericArg::Const(expr) => GenericArg::Const(substitute_expr(resolver, expr, subst)),
        GenericArg::Binding(binding) => GenericArg::Binding(AssocBinding {
            name: binding.name.clone(),
            ty: substitute_type(resolver, &binding.ty, subst),
            span: binding.span,
        }),
    }
}

fn substitute_lifetime(resolver: &Resolver<'_>, lifetime: &Lifetime, subst: &Substitution) -> Lifetime {
    match resolver
        .resolve_lifetime(lifetime)
        .and_then(|param| subst.get(param))
    {
        Some(SubstValue::Lifetime(replacement)) => replacement.clone(),
        _ => lifetime.clone(),
    }
}

fn substitute_bounds(resolver: &Resolver<'_>, bounds: &[TypeBound], subst: &Substitution) -> Vec<TypeBound> {
    bounds
        .iter()
        .map(|bound| match bound {
            TypeBound::Trait(poly) => TypeBound::Trait(PolyTraitRef {
                for_lifetimes: poly.for_lifetimes.clone(),
                maybe: poly.maybe,
                path: substitute_path_args(resolver, &poly.path, subst),
                span: poly.span,
            }),
            TypeBound::Lifetime(lifetime) => {
                TypeBound::Lifetime(substitute_lifetime(resolver, lifetime, subst))
            }
        })
        .collect()
}

/// Replaces substituted parameters in `ty`; others pass through unchanged.
pub fn substitute_type(resolver: &Resolver<'_>, ty: &TypeExpr, subst: &Substitution) -> TypeExpr {
    if subst.is_empty() {
        return ty.clone();
    }
    let sub = |inner: &TypeExpr| Box::new(substitute_type(resolver, inner, subst));
    match ty {
        TypeExpr::Tuple(items, span) => TypeExpr::Tuple(
            items
                .iter()
                .map(|item| substitute_type(resolver, item, subst))
                .collect(),
            *span,
        ),
        TypeExpr::Unit(_) | TypeExpr::Never(_) | TypeExpr::Infer(_) | TypeExpr::Macro(_) => ty.clone(),
        TypeExpr::Path(path) => match substitute_path(resolver, path, subst) {
            PathSubst::Value(SubstValue::Type(replacement)) => replacement,
            PathSubst::Value(_) => ty.clone(),
            PathSubst::Path(path) => TypeExpr::Path(path),
        },
        TypeExpr::Ref {
            lifetime,
            mutable,
            inner,
            span,
        } => TypeExpr::Ref {
            lifetime: lifetime
                .as_ref()
                .map(|lifetime| substitute_lifetime(resolver, lifetime, subst)),
            mutable: *mutable,
            inner: sub(inner),
            span: *span,
        },
        TypeExpr::Ptr {
            mutable,
            inner,
            span,
        } => TypeExpr::Ptr {
            mutable: *mutable,
            inner: sub(inner),
            span: *span,
        },
        TypeExpr::Array { elem, len, span } => TypeExpr::Array {
            elem: sub(elem),
            len: Box::new(substitute_expr(resolver, len, subst)),
            span: *span,
        },
        TypeExpr::Slice(inner, span) => TypeExpr::Slice(sub(inner), *span),
        TypeExpr::FnPtr(fn_ptr) => TypeExpr::FnPtr(FnPtrType {
            is_unsafe: fn_ptr.is_unsafe,
            abi: fn_ptr.abi.clone(),
            params: fn_ptr
                .params
                .iter()
                .map(|param| substitute_type(resolver, param, subst))
                .collect(),
            ret: fn_ptr.ret.as_deref().map(sub),
            span: fn_ptr.span,
        }),
        TypeExpr::TraitObject { kind, bounds, span } => TypeExpr::TraitObject {
            kind: *kind,
            bounds: substitute_bounds(resolver, bounds, subst),
            span: *span,
        },
    }
}

/// Replaces substituted const parameters in `expr`. Compound replacements are parenthesized.
pub fn substitute_expr(resolver: &Resolver<'_>, expr: &Expr, subst: &Substitution) -> Expr {
    if subst.is_empty() {
        return expr.clone();
    }
    let sub = |inner: &Expr| Box::new(substitute_expr(resolver, inner, subst));
    let sub_all = |items: &[Expr]| -> Vec<Expr> {
        items
            .iter()
            .map(|item| substitute_expr(resolver, item, subst))
            .collect()
    };
    match expr {
        Expr::Literal(_) | Expr::Macro(_) => expr.clone(),
        Expr::Path(path) => match substitute_path(resolver, path, subst) {
            PathSubst::Value(SubstValue::Const(value)) => parenthesize(value),
            PathSubst::Value(_) => expr.clone(),
            PathSubst::Path(path) => Expr::Path(path),
        },
        Expr::Call { callee, args, span } => Expr::Call {
            callee: sub(callee),
            args: sub_all(args),
            span: *span,
        },
        Expr::MethodCall {
            receiver,
            method,
            args,
            span,
        } => Expr::MethodCall {
            receiver: sub(receiver),
            method: substitute_segment(resolver, method, subst),
            args: sub_all(args),
            span: *span,
        },
        Expr::Field { base, name, span } => Expr::Field {
            base: sub(base),
            name: name.clone(),
            span: *span,
        },
        Expr::Index { base, index, span } => Expr::Index {
            base: sub(base),
            index: sub(index),
            span: *span,
        },
        Expr::Unary { op, expr, span } => Expr::Unary {
            op: *op,
            expr: sub(expr),
            span: *span,
        },
        Expr::Binary {
            op,
            left,
            right,
            span,
        } => Expr::Binary {
            op: *op,
            left: sub(left),
            right: sub(right),
            span: *span,
        },
        Expr::Cast { expr, ty, span } => Expr::Cast {
            expr: sub(expr),
            ty: substitute_type(resolver, ty, subst),
            span: *span,
        },
        Expr::Assign {
            target,
            value,
            span,
        } => Expr::Assign {
            target: sub(target),
            value: sub(value),
            span: *span,
        },
        Expr::Try { expr, span } => Expr::Try {
            expr: sub(expr),
            span: *span,
        },
        Expr::Block { kind, block } => Expr::Block {
            kind: *kind,
            block: substitute_block(resolver, block, subst),
        },
        Expr::Paren(inner, span) => Expr::Paren(sub(inner), *span),
        Expr::Tuple(items, span) => Expr::Tuple(sub_all(items), *span),
        Expr::Array(items, span) => Expr::Array(sub_all(items), *span),
        Expr::Repeat { value, len, span } => Expr::Repeat {
            value: sub(value),
            len: sub(len),
            span: *span,
        },
        Expr::Struct { path, fields, span } => Expr::Struct {
            path: substitute_path_args(resolver, path, subst),
            fields: fields
                .iter()
                .map(|field| FieldInit {
                    name: field.name.clone(),
                    value: substitute_expr(resolver, &field.value, subst),
                })
                .collect(),
            span: *span,
        },
        Expr::If {
            cond,
            then_branch,
            else_branch,
            span,
        } => Expr::If {
            cond: sub(cond),
            then_branch: substitute_block(resolver, then_branch, subst),
            else_branch: else_branch.as_deref().map(sub),
            span: *span,
        },
        Expr::Return(value, span) => Expr::Return(value.as_deref().map(sub), *span),
    }
}

fn substitute_block(resolver: &Resolver<'_>, block: &Block, subst: &Substitution) -> Block {
    Block {
        stmts: block
            .stmts
            .iter()
            .map(|stmt| match stmt {
                Stmt::Let(local) => Stmt::Let(LetStmt {
                    pattern: local.pattern.clone(),
                    ty: local
                        .ty
                        .as_ref()
                        .map(|ty| substitute_type(resolver, ty, subst)),
                    init: local
                        .init
                        .as_ref()
                        .map(|init| substitute_expr(resolver, init, subst)),
                    span: local.span,
                }),
                Stmt::Expr(expr) => Stmt::Expr(substitute_expr(resolver, expr, subst)),
                Stmt::Item(item) => Stmt::Item(item.clone()),
            })
            .collect(),
        tail: block
            .tail
            .as_deref()
            .map(|tail| Box::new(substitute_expr(resolver, tail, subst))),
        span: block.span,
    }
}

fn parenthesize(value: Expr) -> Expr {
    match value {
        Expr::Binary { .. } | Expr::Unary { .. } | Expr::Cast { .. } | Expr::Assign { .. } => {
            let span = value.span();
            Expr::Paren(Box::new(value), span)
        }
        other => other,
    }
}

/// Replaces paths to type aliases, and to associated types with a known value, by
/// their substituted targets. Generic arguments are expanded too.
pub fn expand_aliases(resolver: &Resolver<'_>, ty: &TypeExpr) -> TypeExpr {
    expand(resolver, ty, 0)
}

fn expand(resolver: &Resolver<'_>, ty: &TypeExpr, depth: usize) -> TypeExpr {
    if depth > MAX_EXPANSION_DEPTH {
        warn!(target: "rustpath::ty", "alias expansion depth limit reached");
        return ty.clone();
    }
    if let TypeExpr::Path(path) = ty {
        if let Some(target) = alias_target(resolver, path) {
            return expand(resolver, &target, depth + 1);
        }
    }
    map_type_children(ty, &mut |inner| expand(resolver, inner, depth))
}

fn alias_target(resolver: &Resolver<'_>, path: &Path) -> Option<TypeExpr> {
    let def = resolver.resolve(path).first_in(Namespace::Types)?;
    let DefKind::TypeAlias {
        ty: Some(target), ..
    } = &resolver.workspace().def(def).kind
    else {
        return None;
    };
    let args = path.last().and_then(|segment| segment.args.as_ref());
    let subst = substitution_for(resolver, def, args);
    Some(substitute_type(resolver, target, &subst))
}

/// Rebuilds `ty` with `f` applied to each directly nested type.
fn map_type_children(ty: &TypeExpr, f: &mut dyn FnMut(&TypeExpr) -> TypeExpr) -> TypeExpr {
    match ty {
        TypeExpr::Tuple(items, span) => {
            TypeExpr::Tuple(items.iter().map(|item| f(item)).collect(), *span)
        }
        TypeExpr::Unit(_) | TypeExpr::Never(_) | TypeExpr::Infer(_) | TypeExpr::Macro(_) => ty.clone(),
        TypeExpr::Path(path) => TypeExpr::Path(map_path_types(path, f)),
        TypeExpr::Ref {
            lifetime,
            mutable,
            inner,
            span,
        } => TypeExpr::Ref {
            lifetime: lifetime.clone(),
            mutable: *mutable,
            inner: Box::new(f(inner)),
            span: *span,
        },
        TypeExpr::Ptr {
            mutable,
            inner,
            span,
        } => TypeExpr::Ptr {
            mutable: *mutable,
            inner: Box::new(f(inner)),
            span: *span,
        },
        TypeExpr::Array { elem, len, span } => TypeExpr::Array {
            elem: Box::new(f(elem)),
            len: len.clone(),
            span: *span,
        },
        TypeExpr::Slice(inner, span) => TypeExpr::Slice(Box::new(f(inner)), *span),
        TypeExpr::FnPtr(fn_ptr) => TypeExpr::FnPtr(FnPtrType {
            is_unsafe: fn_ptr.is_unsafe,
            abi: fn_ptr.abi.clone(),
            params: fn_ptr.params.iter().map(|param| f(param)).collect(),
            ret: fn_ptr.ret.as_deref().map(|ret| Box::new(f(ret))),
            span: fn_ptr.span,
        }),
        TypeExpr::TraitObject { kind, bounds, span } => TypeExpr::TraitObject {
            kind: *kind,
            bounds: bounds
                .iter()
                .map(|bound| match bound {
                    TypeBound::Trait(poly) => TypeBound::Trait(PolyTraitRef {
                        for_lifetimes: poly.for_lifetimes.clone(),
                        maybe: poly.maybe,
                        path: map_path_types(&poly.path, f),
                        span: poly.span,
                    }),
                    TypeBound::Lifetime(lifetime) => TypeBound::Lifetime(lifetime.clone()),
                })
                .collect(),
            span: *span,
        },
    }
}

fn map_path_types(path: &Path, f: &mut dyn FnMut(&TypeExpr) -> TypeExpr) -> Path {
    let mut out = path.clone();
    if let Some(qself) = &mut out.qself {
        qself.ty = f(&qself.ty);
        if qself.trait_ref.is_none() {
            out.id = NodeId::DETACHED;
        }
    }
    for segment in &mut out.segments {
        if let Some(args) = &mut segment.args {
            for arg in &mut args.args {
                match arg {
                    GenericArg::Type(ty) => *ty = f(ty),
                    GenericArg::Binding(binding) => binding.ty = f(&binding.ty),
                    GenericArg::Lifetime(_) | GenericArg::Const(_) => {}
                }
            }
        }
        if let Some(sugar) = &mut segment.fn_sugar {
            for input in &mut sugar.inputs {
                *input = f(input);
            }
            if let Some(output) = &mut sugar.output {
                **output = f(output);
            }
        }
    }
    out
}
