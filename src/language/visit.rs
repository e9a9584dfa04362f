use crate::language::{
    ast::*,
    types::{GenericArg, GenericArgs, Lifetime, Path, TraitObjectKind, TypeBound, TypeExpr},
};

/// Where a path was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathContext {
    /// A path type: field, parameter, argument, `Self` type of an impl.
    Type,
    /// A bound of a `dyn` trait object.
    TraitObject,
    /// A bound of `impl Trait`.
    ImplTrait,
    /// Generic parameter and where-clause bounds, supertraits, associated type bounds.
    Bound,
    /// The trait of `impl Trait for Type`.
    ImplHeader,
    /// The trait of `<T as Trait>`.
    Qualifier,
    /// A value path in an expression.
    Expr,
    /// Struct literal and macro paths.
    Other,
}

/// Receives every path and lifetime of a file in source order, nested items included.
/// Paths nested inside another path's arguments are visited after it.
pub trait Visitor<'a> {
    fn visit_path(&mut self, _path: &'a Path, _cx: PathContext) {}
    fn visit_lifetime(&mut self, _lifetime: &'a Lifetime) {}
    /// Called before the expression's children are walked.
    fn visit_expr(&mut self, _expr: &'a Expr) {}
}

pub fn walk_file<'a>(file: &'a SourceFile, v: &mut dyn Visitor<'a>) {
    for item in &file.items {
        walk_item(item, v);
    }
}

pub fn walk_item<'a>(item: &'a Item, v: &mut dyn Visitor<'a>) {
    match &item.kind {
        ItemKind::Fn(def) => walk_fn(def, v),
        ItemKind::Struct(def) => {
            walk_generics(&def.generics, v);
            for field in def.fields.iter() {
                walk_type(&field.ty, v);
            }
        }
        ItemKind::Enum(def) => {
            walk_generics(&def.generics, v);
            for variant in &def.variants {
                for field in variant.fields.iter() {
                    walk_type(&field.ty, v);
                }
                if let Some(discriminant) = &variant.discriminant {
                    walk_expr(discriminant, v);
                }
            }
        }
        ItemKind::TypeAlias(def) => walk_type_alias(def, v),
        ItemKind::Trait(def) => {
            walk_generics(&def.generics, v);
            walk_bounds(&def.supertraits, PathContext::Bound, v);
            for item in &def.items {
                walk_assoc_item(item, v);
            }
        }
        ItemKind::Impl(def) => {
            walk_generics(&def.generics, v);
            if let Some(trait_ref) = &def.trait_ref {
                walk_path(trait_ref, PathContext::ImplHeader, v);
            }
            walk_type(&def.self_ty, v);
            for item in &def.items {
                walk_assoc_item(item, v);
            }
        }
        ItemKind::Mod(def) => {
            if let Some(items) = &def.items {
                for item in items {
                    walk_item(item, v);
                }
            }
        }
        ItemKind::Use(_) | ItemKind::MacroRules(_) => {}
        ItemKind::Const(def) => walk_const(def, v),
    }
}

fn walk_assoc_item<'a>(item: &'a AssocItem, v: &mut dyn Visitor<'a>) {
    match &item.kind {
        AssocItemKind::Fn(def) => walk_fn(def, v),
        AssocItemKind::Type(def) => walk_type_alias(def, v),
        AssocItemKind::Const(def) => walk_const(def, v),
    }
}

fn walk_type_alias<'a>(def: &'a TypeAliasDef, v: &mut dyn Visitor<'a>) {
    walk_generics(&def.generics, v);
    walk_bounds(&def.bounds, PathContext::Bound, v);
    if let Some(ty) = &def.ty {
        walk_type(ty, v);
    }
}

fn walk_const<'a>(def: &'a ConstDef, v: &mut dyn Visitor<'a>) {
    if let Some(ty) = &def.ty {
        walk_type(ty, v);
    }
    if let Some(value) = &def.value {
        walk_expr(value, v);
    }
}

pub fn walk_fn<'a>(def: &'a FnDef, v: &mut dyn Visitor<'a>) {
    walk_generics(&def.generics, v);
    if let Some(self_param) = &def.self_param {
        match &self_param.kind {
            SelfKind::Ref {
                lifetime: Some(lifetime),
                ..
            } => v.visit_lifetime(lifetime),
            SelfKind::Explicit { ty, .. } => walk_type(ty, v),
            _ => {}
        }
    }
    for param in &def.params {
        walk_type(&param.ty, v);
    }
    if let Some(ret) = &def.ret {
        walk_type(ret, v);
    }
    if let Some(body) = &def.body {
        walk_block(body, v);
    }
}

pub fn walk_generics<'a>(generics: &'a Generics, v: &mut dyn Visitor<'a>) {
    for param in &generics.params {
        match &param.kind {
            GenericParamKind::Lifetime { bounds } => {
                for bound in bounds {
                    v.visit_lifetime(bound);
                }
            }
            GenericParamKind::Type { bounds, default } => {
                walk_bounds(bounds, PathContext::Bound, v);
                if let Some(default) = default {
                    walk_type(default, v);
                }
            }
            GenericParamKind::Const { ty, default } => {
                walk_type(ty, v);
                if let Some(default) = default {
                    walk_expr(default, v);
                }
            }
        }
    }
    for predicate in &generics.where_clause {
        match predicate {
            WherePredicate::Bound { ty, bounds, .. } => {
                walk_type(ty, v);
                walk_bounds(bounds, PathContext::Bound, v);
            }
            WherePredicate::Lifetime {
                lifetime, bounds, ..
            } => {
                v.visit_lifetime(lifetime);
                for bound in bounds {
                    v.visit_lifetime(bound);
                }
            }
        }
    }
}

pub fn walk_bounds<'a>(bounds: &'a [TypeBound], cx: PathContext, v: &mut dyn Visitor<'a>) {
    for bound in bounds {
        match bound {
            TypeBound::Trait(poly) => walk_path(&poly.path, cx, v),
            TypeBound::Lifetime(lifetime) => v.visit_lifetime(lifetime),
        }
    }
}

pub fn walk_type<'a>(ty: &'a TypeExpr, v: &mut dyn Visitor<'a>) {
    match ty {
        TypeExpr::Tuple(items, _) => {
            for item in items {
                walk_type(item, v);
            }
        }
        TypeExpr::Unit(_) | TypeExpr::Never(_) | TypeExpr::Infer(_) => {}
        TypeExpr::Path(path) => walk_path(path, PathContext::Type, v),
        TypeExpr::Ref {
            lifetime, inner, ..
        } => {
            if let Some(lifetime) = lifetime {
                v.visit_lifetime(lifetime);
            }
            walk_type(inner, v);
        }
        TypeExpr::Ptr { inner, .. } | TypeExpr::Slice(inner, _) => walk_type(inner, v),
        TypeExpr::Array { elem, len, .. } => {
            walk_type(elem, v);
            walk_expr(len, v);
        }
        TypeExpr::FnPtr(fn_ptr) => {
            for param in &fn_ptr.params {
                walk_type(param, v);
            }
            if let Some(ret) = &fn_ptr.ret {
                walk_type(ret, v);
            }
        }
        TypeExpr::TraitObject { kind, bounds, .. } => {
            let cx = match kind {
                TraitObjectKind::Dyn => PathContext::TraitObject,
                TraitObjectKind::Impl => PathContext::ImplTrait,
            };
            walk_bounds(bounds, cx, v);
        }
        TypeExpr::Macro(call) => walk_path(&call.path, PathContext::Other, v),
    }
}

pub fn walk_path<'a>(path: &'a Path, cx: PathContext, v: &mut dyn Visitor<'a>) {
    v.visit_path(path, cx);
    if let Some(qself) = &path.qself {
        walk_type(&qself.ty, v);
        if let Some(trait_ref) = &qself.trait_ref {
            walk_path(trait_ref, PathContext::Qualifier, v);
        }
    }
    for segment in &path.segments {
        if let Some(args) = &segment.args {
            walk_generic_args(args, v);
        }
        if let Some(sugar) = &segment.fn_sugar {
            for input in &sugar.inputs {
                walk_type(input, v);
            }
            if let Some(output) = &sugar.output {
                walk_type(output, v);
            }
        }
    }
}

pub fn walk_generic_args<'a>(args: &'a GenericArgs, v: &mut dyn Visitor<'a>) {
    for arg in &args.args {
        match arg {
            GenericArg::Lifetime(lifetime) => v.visit_lifetime(lifetime),
            GenericArg::Type(ty) => walk_type(ty, v),
            GenericArg::Const(expr) => walk_expr(expr, v),
            GenericArg::Binding(binding) => walk_type(&binding.ty, v),
        }
    }
}

pub fn walk_block<'a>(block: &'a Block, v: &mut dyn Visitor<'a>) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::Let(local) => {
                if let Some(ty) = &local.ty {
                    walk_type(ty, v);
                }
                if let Some(init) = &local.init {
                    walk_expr(init, v);
                }
            }
            Stmt::Expr(expr) => walk_expr(expr, v),
            Stmt::Item(item) => walk_item(item, v),
        }
    }
    if let Some(tail) = &block.tail {
        walk_expr(tail, v);
    }
}

pub fn walk_expr<'a>(expr: &'a Expr, v: &mut dyn Visitor<'a>) {
    v.visit_expr(expr);
    match expr {
        Expr::Literal(_) | Expr::Return(None, _) => {}
        Expr::Path(path) => walk_path(path, PathContext::Expr, v),
        Expr::Call { callee, args, .. } => {
            walk_expr(callee, v);
            for arg in args {
                walk_expr(arg, v);
            }
        }
        Expr::MethodCall {
            receiver,
            method,
            args,
            ..
        } => {
            walk_expr(receiver, v);
            if let Some(generic_args) = &method.args {
                walk_generic_args(generic_args, v);
            }
            for arg in args {
                walk_expr(arg, v);
            }
        }
        Expr::Field { base, .. } => walk_expr(base, v),
        Expr::Unary { expr, .. } | Expr::Try { expr, .. } | Expr::Paren(expr, _) => walk_expr(expr, v),
        Expr::Return(Some(expr), _) => walk_expr(expr, v),
        Expr::Index { base, index, .. } => {
            walk_expr(base, v);
            walk_expr(index, v);
        }
        Expr::Binary { left, right, .. } => {
            walk_expr(left, v);
            walk_expr(right, v);
        }
        Expr::Assign { target, value, .. } => {
            walk_expr(target, v);
            walk_expr(value, v);
        }
        Expr::Repeat { value, len, .. } => {
            walk_expr(value, v);
            walk_expr(len, v);
        }
        Expr::Cast { expr, ty, .. } => {
            walk_expr(expr, v);
            walk_type(ty, v);
        }
        Expr::Block { block, .. } => walk_block(block, v),
        Expr::Tuple(items, _) | Expr::Array(items, _) => {
            for item in items {
                walk_expr(item, v);
            }
        }
        Expr::Struct { path, fields, .. } => {
            walk_path(path, PathContext::Other, v);
            for field in fields {
                walk_expr(&field.value, v);
            }
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            walk_expr(cond, v);
            walk_block(then_branch, v);
            if let Some(else_branch) = else_branch {
                walk_expr(else_branch, v);
            }
        }
        Expr::Macro(call) => walk_path(&call.path, PathContext::Other, v),
    }
}

/// Collects every path of a file.
pub fn collect_paths(file: &SourceFile) -> Vec<&Path> {
    struct Collect<'a>(Vec<&'a Path>);
    impl<'a> Visitor<'a> for Collect<'a> {
        fn visit_path(&mut self, path: &'a Path, _cx: PathContext) {
            self.0.push(path);
        }
    }
    let mut collect = Collect(Vec::new());
    walk_file(file, &mut collect);
    collect.0
}
