use super::{importing::ImportState, literal};
use crate::{
    language::{
        ast::{
            BinaryOp, Expr, FnDef, GenericParamKind, Generics, Pattern, SelfKind, WherePredicate,
        },
        types::{
            GenericArg, GenericArgs, Lifetime, Path, PathSegment, TraitObjectKind, TypeBound,
            TypeExpr,
        },
    },
    resolve::{DefKind, Resolver},
    ty::{self, ConstValue, Substitution},
};
use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub render_lifetimes: bool,
    /// Evaluate const arguments and array lengths. Unevaluable ones render as `{}`.
    pub fold_consts: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            render_lifetimes: true,
            fold_consts: false,
        }
    }
}

/// Turns syntax nodes back into canonical source text.
pub struct Renderer<'a, 'w> {
    pub(super) resolver: &'a Resolver<'w>,
    pub(super) subst: Substitution,
    pub(super) options: RenderOptions,
    pub(super) imports: Option<ImportState>,
}

impl<'a, 'w> Renderer<'a, 'w> {
    pub fn new(resolver: &'a Resolver<'w>) -> Self {
        Self {
            resolver,
            subst: Substitution::new(),
            options: RenderOptions::default(),
            imports: None,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Renders through `subst`. Const arguments are folded from then on.
    pub fn with_substitution(mut self, subst: Substitution) -> Self {
        if !subst.is_empty() {
            self.options.fold_consts = true;
        }
        self.subst = subst;
        self
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    fn substituted<'t>(&self, ty: &'t TypeExpr) -> Cow<'t, TypeExpr> {
        if self.subst.is_empty() {
            Cow::Borrowed(ty)
        } else {
            Cow::Owned(ty::substitute_type(self.resolver, ty, &self.subst))
        }
    }

    pub fn render_type(&mut self, ty: &TypeExpr) -> String {
        let ty = self.substituted(ty);
        let mut out = String::new();
        self.write_type(&mut out, &ty);
        out
    }

    pub fn render_path(&mut self, path: &Path) -> String {
        let ty = self.substituted_path(path);
        let mut out = String::new();
        match &ty {
            TypeExpr::Path(path) => self.write_path(&mut out, path),
            other => self.write_type(&mut out, other),
        }
        out
    }

    /// A trait reference as written after `impl` or in a bound.
    pub fn render_trait_ref(&mut self, path: &Path) -> String {
        self.render_path(path)
    }

    pub fn render_generic_args(&mut self, args: &GenericArgs) -> String {
        let mut out = String::new();
        let args = if self.subst.is_empty() {
            Cow::Borrowed(args)
        } else {
            let mut holder = Path::single("_");
            holder.segments[0].args = Some(args.clone());
            match ty::substitute_type(self.resolver, &TypeExpr::Path(holder), &self.subst) {
                TypeExpr::Path(mut path) => match path.segments.pop().and_then(|segment| segment.args) {
                    Some(args) => Cow::Owned(args),
                    None => Cow::Borrowed(args),
                },
                _ => Cow::Borrowed(args),
            }
        };
        self.write_generic_args(&mut out, &args, false, None);
        out
    }

    pub fn render_const_expr(&mut self, expr: &Expr) -> String {
        let expr = if self.subst.is_empty() {
            Cow::Borrowed(expr)
        } else {
            Cow::Owned(ty::substitute_expr(self.resolver, expr, &self.subst))
        };
        let mut out = String::new();
        self.write_const(&mut out, &expr, None, false);
        out
    }

    /// `const async unsafe extern "C" fn name<..>(..) -> Ret where ..`, without a body.
    pub fn render_fn_signature(&mut self, def: &FnDef) -> String {
        let mut out = String::new();
        let q = &def.qualifiers;
        if q.is_const {
            out.push_str("const ");
        }
        if q.is_async {
            out.push_str("async ");
        }
        if q.is_unsafe {
            out.push_str("unsafe ");
        }
        self.write_abi(&mut out, &q.abi);
        out.push_str("fn ");
        out.push_str(&def.name.name);
        self.write_generic_params(&mut out, &def.generics);
        out.push_str(&self.render_value_params(def));
        if let Some(ret) = &def.ret {
            out.push_str(" -> ");
            let ret = self.substituted(ret);
            self.write_type(&mut out, &ret);
        }
        self.write_where_clause(&mut out, &def.generics);
        out
    }

    /// The parenthesized parameter list, `self` first.
    pub fn render_value_params(&mut self, def: &FnDef) -> String {
        let mut parts = Vec::new();
        if let Some(self_param) = &def.self_param {
            let mut part = String::new();
            match &self_param.kind {
                SelfKind::Value { mutable } => {
                    if *mutable {
                        part.push_str("mut ");
                    }
                    part.push_str("self");
                }
                SelfKind::Ref { lifetime, mutable } => {
                    part.push('&');
                    if let Some(lifetime) = lifetime {
                        self.write_lifetime_prefix(&mut part, lifetime);
                    }
                    if *mutable {
                        part.push_str("mut ");
                    }
                    part.push_str("self");
                }
                SelfKind::Explicit { mutable, ty } => {
                    if *mutable {
                        part.push_str("mut ");
                    }
                    part.push_str("self: ");
                    let ty = self.substituted(ty);
                    self.write_type(&mut part, &ty);
                }
            }
            parts.push(part);
        }
        for param in &def.params {
            let mut part = String::new();
            write_pattern(&mut part, &param.pattern);
            part.push_str(": ");
            let ty = self.substituted(&param.ty);
            self.write_type(&mut part, &ty);
            parts.push(part);
        }
        format!("({})", parts.join(", "))
    }

    fn substituted_path(&self, path: &Path) -> TypeExpr {
        let ty = TypeExpr::Path(path.clone());
        if self.subst.is_empty() {
            ty
        } else {
            ty::substitute_type(self.resolver, &ty, &self.subst)
        }
    }

    fn write_abi(&self, out: &mut String, abi: &Option<Option<String>>) {
        match abi {
            Some(Some(abi)) => {
                out.push_str("extern ");
                out.push_str(&literal::str_literal(abi));
                out.push(' ');
            }
            Some(None) => out.push_str("extern "),
            None => {}
        }
    }

    pub(super) fn write_type(&mut self, out: &mut String, ty: &TypeExpr) {
        match ty {
            TypeExpr::Tuple(items, _) => {
                out.push('(');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, item);
                }
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            TypeExpr::Unit(_) => out.push_str("()"),
            TypeExpr::Never(_) => out.push('!'),
            TypeExpr::Infer(_) => out.push('_'),
            TypeExpr::Path(path) => self.write_path(out, path),
            TypeExpr::Ref {
                lifetime,
                mutable,
                inner,
                ..
            } => {
                out.push('&');
                if let Some(lifetime) = lifetime {
                    self.write_lifetime_prefix(out, lifetime);
                }
                if *mutable {
                    out.push_str("mut ");
                }
                self.write_type(out, inner);
            }
            TypeExpr::Ptr { mutable, inner, .. } => {
                out.push_str(if *mutable { "*mut " } else { "*const " });
                self.write_type(out, inner);
            }
            TypeExpr::Array { elem, len, .. } => {
                out.push('[');
                self.write_type(out, elem);
                out.push_str("; ");
                self.write_const(out, len, Some("usize"), false);
                out.push(']');
            }
            TypeExpr::Slice(inner, _) => {
                out.push('[');
                self.write_type(out, inner);
                out.push(']');
            }
            TypeExpr::FnPtr(fn_ptr) => {
                if fn_ptr.is_unsafe {
                    out.push_str("unsafe ");
                }
                self.write_abi(out, &fn_ptr.abi);
                out.push_str("fn(");
                for (index, param) in fn_ptr.params.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, param);
                }
                out.push(')');
                if let Some(ret) = &fn_ptr.ret {
                    out.push_str(" -> ");
                    self.write_type(out, ret);
                }
            }
            TypeExpr::TraitObject { kind, bounds, .. } => {
                out.push_str(match kind {
                    TraitObjectKind::Dyn => "dyn ",
                    TraitObjectKind::Impl => "impl ",
                });
                self.write_bounds(out, bounds);
            }
            TypeExpr::Macro(call) => {
                self.write_path_as_written(out, &call.path);
                out.push('!');
                out.push(call.delimiter.open());
                out.push_str(&call.body);
                out.push(call.delimiter.close());
            }
        }
    }

    fn write_lifetime_prefix(&self, out: &mut String, lifetime: &Lifetime) {
        if self.options.render_lifetimes {
            out.push_str(&lifetime.name);
            out.push(' ');
        }
    }

    pub(super) fn write_bounds(&mut self, out: &mut String, bounds: &[TypeBound]) {
        let mut first = true;
        for bound in bounds {
            if let TypeBound::Lifetime(_) = bound {
                if !self.options.render_lifetimes {
                    continue;
                }
            }
            if !first {
                out.push_str(" + ");
            }
            first = false;
            match bound {
                TypeBound::Trait(poly) => {
                    if !poly.for_lifetimes.is_empty() && self.options.render_lifetimes {
                        let names: Vec<&str> =
                            poly.for_lifetimes.iter().map(|l| l.name.as_str()).collect();
                        out.push_str(&format!("for<{}> ", names.join(", ")));
                    }
                    if poly.maybe {
                        out.push('?');
                    }
                    self.write_path(out, &poly.path);
                }
                TypeBound::Lifetime(lifetime) => out.push_str(&lifetime.name),
            }
        }
    }

    /// Import-aware for the outermost path when importing, as written otherwise.
    pub(super) fn write_path(&mut self, out: &mut String, path: &Path) {
        if self.imports.is_some() && path.qself.is_none() && self.write_imported_path(out, path) {
            return;
        }
        self.write_path_as_written(out, path);
    }

    pub(super) fn write_path_as_written(&mut self, out: &mut String, path: &Path) {
        if let Some(qself) = &path.qself {
            out.push('<');
            self.write_type(out, &qself.ty);
            if let Some(trait_ref) = &qself.trait_ref {
                out.push_str(" as ");
                self.write_path(out, trait_ref);
            }
            out.push_str(">::");
        } else if path.global {
            out.push_str("::");
        }
        let expected = self.const_param_types(path);
        for (index, segment) in path.segments.iter().enumerate() {
            if index > 0 {
                out.push_str("::");
            }
            let expected = if index + 1 == path.segments.len() {
                expected.as_deref()
            } else {
                None
            };
            self.write_segment(out, segment, expected);
        }
    }

    pub(super) fn write_segment(
        &mut self,
        out: &mut String,
        segment: &PathSegment,
        const_types: Option<&[Option<String>]>,
    ) {
        out.push_str(&segment.name);
        self.write_segment_args(out, segment, const_types);
    }

    pub(super) fn write_segment_args(
        &mut self,
        out: &mut String,
        segment: &PathSegment,
        const_types: Option<&[Option<String>]>,
    ) {
        if let Some(sugar) = &segment.fn_sugar {
            out.push('(');
            for (index, input) in sugar.inputs.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                self.write_type(out, input);
            }
            out.push(')');
            if let Some(output) = &sugar.output {
                out.push_str(" -> ");
                self.write_type(out, output);
            }
        } else if let Some(args) = &segment.args {
            self.write_generic_args(out, args, segment.turbofish, const_types);
        }
    }

    /// Lifetimes, then types, then consts, then bindings.
    /// Nothing is written when every group is empty.
    fn write_generic_args(
        &mut self,
        out: &mut String,
        args: &GenericArgs,
        turbofish: bool,
        const_types: Option<&[Option<String>]>,
    ) {
        let mut lifetimes = Vec::new();
        if self.options.render_lifetimes {
            for lifetime in args.lifetimes() {
                lifetimes.push(lifetime.name.clone());
            }
        }
        let mut types = Vec::new();
        let mut consts = Vec::new();
        for (index, arg) in args.positional().enumerate() {
            let mut text = String::new();
            match arg {
                GenericArg::Type(ty) => {
                    self.write_type(&mut text, ty);
                    types.push(text);
                }
                GenericArg::Const(expr) => {
                    // const types are indexed by position among all positional args
                    let expected = const_types
                        .and_then(|types| types.get(index))
                        .and_then(|ty| ty.as_deref());
                    self.write_const(&mut text, expr, expected, true);
                    consts.push(text);
                }
                GenericArg::Lifetime(_) | GenericArg::Binding(_) => {}
            }
        }
        let mut bindings = Vec::new();
        for binding in args.bindings() {
            let mut text = format!("{}=", binding.name);
            self.write_type(&mut text, &binding.ty);
            bindings.push(text);
        }

        let groups: Vec<String> = [lifetimes, types, consts, bindings]
            .into_iter()
            .filter(|group| !group.is_empty())
            .map(|group| group.join(", "))
            .collect();
        if groups.is_empty() {
            return;
        }
        if turbofish {
            out.push_str("::");
        }
        out.push('<');
        out.push_str(&groups.join(", "));
        out.push('>');
    }

    /// Declared types of the const parameters behind each positional argument of the
    /// path's last segment.
    pub(super) fn const_param_types(&self, path: &Path) -> Option<Vec<Option<String>>> {
        let args = path.last()?.args.as_ref()?;
        if !args.args.iter().any(|arg| matches!(arg, GenericArg::Const(_))) {
            return None;
        }
        let ws = self.resolver.workspace();
        let decl = self.resolver.resolve(path).primary()?;
        let types = ws
            .def(decl)
            .generics
            .iter()
            .filter_map(|param| match &ws.def(*param).kind {
                DefKind::ConstParam { ty, .. } => Some(
                    ty.as_path()
                        .filter(|path| path.is_single())
                        .map(|path| path.last_name().to_string()),
                ),
                DefKind::TypeParam { .. } => Some(None),
                _ => None,
            })
            .collect();
        Some(types)
    }

    /// A const argument (`in_args`) or array length.
    fn write_const(&mut self, out: &mut String, expr: &Expr, expected: Option<&str>, in_args: bool) {
        if self.options.fold_consts {
            match ty::eval_const(self.resolver, expr, expected) {
                ConstValue::Int(value) => {
                    out.push_str(&value.to_string());
                    return;
                }
                ConstValue::Bool(value) => {
                    out.push_str(if value { "true" } else { "false" });
                    return;
                }
                ConstValue::Char(value) => {
                    out.push_str(&literal::char_literal(value));
                    return;
                }
                ConstValue::Str(value) => {
                    out.push_str(&literal::str_literal(&value));
                    return;
                }
                ConstValue::Param(param) => {
                    out.push_str(&self.resolver.workspace().def(param).name);
                    return;
                }
                ConstValue::Symbolic => {}
                ConstValue::Unknown => {
                    out.push_str("{}");
                    return;
                }
            }
        }
        let mut text = String::new();
        self.write_const_expr(&mut text, expr);
        let bare = matches!(
            expr,
            Expr::Literal(_) | Expr::Block { .. } | Expr::Path(_)
        ) || matches!(expr, Expr::Unary { expr, .. } if matches!(expr.as_ref(), Expr::Literal(_)));
        if in_args && !bare && text != "{}" {
            out.push_str("{ ");
            out.push_str(&text);
            out.push_str(" }");
        } else {
            out.push_str(&text);
        }
    }

    /// Paths, literals, blocks with a tail, unary and binary operations; `{}` for the rest.
    pub(super) fn write_const_expr(&mut self, out: &mut String, expr: &Expr) {
        match expr {
            Expr::Path(path) => self.write_path(out, path),
            Expr::Literal(lit) => out.push_str(&literal::render_literal(lit)),
            Expr::Block { block, .. } => match block.tail.as_deref() {
                Some(tail) if block.stmts.is_empty() => {
                    out.push_str("{ ");
                    self.write_const_expr(out, tail);
                    out.push_str(" }");
                }
                _ => out.push_str("{}"),
            },
            Expr::Unary { op, expr, .. } => {
                out.push_str(op.sign());
                self.write_const_expr(out, expr);
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                self.write_operand(out, left, *op, false);
                out.push(' ');
                out.push_str(op.sign());
                out.push(' ');
                self.write_operand(out, right, *op, true);
            }
            Expr::Paren(inner, _) => {
                out.push('(');
                self.write_const_expr(out, inner);
                out.push(')');
            }
            _ => out.push_str("{}"),
        }
    }

    fn write_operand(&mut self, out: &mut String, operand: &Expr, parent: BinaryOp, right: bool) {
        let needs_parens = match operand {
            Expr::Binary { op, .. } => {
                op.precedence() < parent.precedence()
                    || (right && op.precedence() == parent.precedence())
            }
            _ => false,
        };
        if needs_parens {
            out.push('(');
            self.write_const_expr(out, operand);
            out.push(')');
        } else {
            self.write_const_expr(out, operand);
        }
    }

    fn write_generic_params(&mut self, out: &mut String, generics: &Generics) {
        let mut parts = Vec::new();
        for param in &generics.params {
            let mut part = String::new();
            match &param.kind {
                GenericParamKind::Lifetime { bounds } => {
                    if !self.options.render_lifetimes {
                        continue;
                    }
                    part.push_str(&param.name.name);
                    if !bounds.is_empty() {
                        let names: Vec<&str> = bounds.iter().map(|l| l.name.as_str()).collect();
                        part.push_str(": ");
                        part.push_str(&names.join(" + "));
                    }
                }
                GenericParamKind::Type { bounds, default } => {
                    part.push_str(&param.name.name);
                    if !bounds.is_empty() {
                        let mut rendered = String::new();
                        self.write_bounds(&mut rendered, bounds);
                        if !rendered.is_empty() {
                            part.push_str(": ");
                            part.push_str(&rendered);
                        }
                    }
                    if let Some(default) = default {
                        part.push_str(" = ");
                        self.write_type(&mut part, default);
                    }
                }
                GenericParamKind::Const { ty, default } => {
                    part.push_str("const ");
                    part.push_str(&param.name.name);
                    part.push_str(": ");
                    self.write_type(&mut part, ty);
                    if let Some(default) = default {
                        part.push_str(" = ");
                        self.write_const(&mut part, default, None, true);
                    }
                }
            }
            parts.push(part);
        }
        if !parts.is_empty() {
            out.push('<');
            out.push_str(&parts.join(", "));
            out.push('>');
        }
    }

    fn write_where_clause(&mut self, out: &mut String, generics: &Generics) {
        let mut parts = Vec::new();
        for predicate in &generics.where_clause {
            let mut part = String::new();
            match predicate {
                WherePredicate::Bound {
                    for_lifetimes,
                    ty,
                    bounds,
                    ..
                } => {
                    if !for_lifetimes.is_empty() && self.options.render_lifetimes {
                        let names: Vec<&str> = for_lifetimes.iter().map(|l| l.name.as_str()).collect();
                        part.push_str(&format!("for<{}> ", names.join(", ")));
                    }
                    let ty = self.substituted(ty);
                    self.write_type(&mut part, &ty);
                    part.push_str(": ");
                    self.write_bounds(&mut part, bounds);
                }
                WherePredicate::Lifetime {
                    lifetime, bounds, ..
                } => {
                    if !self.options.render_lifetimes {
                        continue;
                    }
                    let names: Vec<&str> = bounds.iter().map(|l| l.name.as_str()).collect();
                    part.push_str(&format!("{}: {}", lifetime.name, names.join(" + ")));
                }
            }
            parts.push(part);
        }
        if !parts.is_empty() {
            out.push_str(" where ");
            out.push_str(&parts.join(", "));
        }
    }
}

fn write_pattern(out: &mut String, pattern: &Pattern) {
    match pattern {
        Pattern::Ident {
            name,
            mutable,
            by_ref,
        } => {
            if *by_ref {
                out.push_str("ref ");
            }
            if *mutable {
                out.push_str("mut ");
            }
            out.push_str(&name.name);
        }
        Pattern::Wild(_) => out.push('_'),
        Pattern::Tuple(items, _) => {
            out.push('(');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_pattern(out, item);
            }
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Pattern::Ref { mutable, inner, .. } => {
            out.push('&');
            if *mutable {
                out.push_str("mut ");
            }
            write_pattern(out, inner);
        }
    }
}
