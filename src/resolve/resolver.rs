use super::{
    cache::ResolveCache, scope::ScopeKind, DefId, DefKind, Namespace, ResolutionResult, Resolved,
    ScopeId, Workspace,
};
use crate::language::{
    ast::{Expr, FnDef, LitKind, StructFields, UnaryOp},
    types::{Lifetime, Path, TypeBound, TypeExpr},
};
use rustc_hash::FxHashSet;
use std::cell::Cell;
use tracing::{trace, warn};

const MAX_DEPTH: u32 = 64;
const MAX_ALIAS_DEPTH: usize = 32;

/// A call expression with its callee resolved to a function.
#[derive(Clone, Copy, Debug)]
pub struct CallSite<'e> {
    pub function: DefId,
    pub args: &'e [Expr],
    /// `Type::method(receiver, ..)`: the receiver is the first argument.
    pub receiver_in_args: bool,
}

impl<'e> CallSite<'e> {
    /// Index into the function's declared parameters (`self` excluded).
    pub fn parameter_index(&self, arg_index: usize) -> Option<usize> {
        if arg_index >= self.args.len() {
            return None;
        }
        if self.receiver_in_args {
            arg_index.checked_sub(1)
        } else {
            Some(arg_index)
        }
    }
}

pub struct Resolver<'w> {
    ws: &'w Workspace,
    cache: &'w ResolveCache,
    depth: Cell<u32>,
}

impl<'w> Resolver<'w> {
    pub fn new(ws: &'w Workspace, cache: &'w ResolveCache) -> Self {
        cache.invalidate(ws.revision());
        Self {
            ws,
            cache,
            depth: Cell::new(0),
        }
    }

    pub fn workspace(&self) -> &'w Workspace {
        self.ws
    }

    /// Scope a path was written in; detached paths resolve in the prelude.
    pub fn scope_for(&self, path: &Path) -> ScopeId {
        if path.id.is_detached() {
            return self.ws.prelude_scope();
        }
        self.ws
            .scope_of(path.id)
            .unwrap_or_else(|| self.ws.prelude_scope())
    }

    pub fn resolve(&self, path: &Path) -> ResolutionResult {
        self.resolve_in(path, self.scope_for(path))
    }

    pub fn resolve_in(&self, path: &Path, scope: ScopeId) -> ResolutionResult {
        if path.id.is_detached() {
            return self.resolve_segments(path, path.segments.len(), scope);
        }
        if let Some(hit) = self.cache.get(path.id, scope) {
            return hit;
        }
        let result = self.resolve_segments(path, path.segments.len(), scope);
        self.cache.insert(path.id, scope, result.clone());
        result
    }

    /// Resolves the qualifier formed by the first `len` segments (plus any `<T as Trait>`).
    pub fn resolve_prefix(&self, path: &Path, len: usize) -> ResolutionResult {
        if len >= path.segments.len() {
            return self.resolve(path);
        }
        self.resolve_segments(path, len, self.scope_for(path))
    }

    fn resolve_segments(&self, path: &Path, upto: usize, scope: ScopeId) -> ResolutionResult {
        if upto == 0 {
            return ResolutionResult::unresolved();
        }
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            warn!(target: "rustpath::resolve", path = %path_text(path), "resolution depth limit reached");
            return ResolutionResult::unresolved();
        }
        self.depth.set(depth + 1);
        let result = self.resolve_segments_inner(path, upto, scope);
        self.depth.set(depth);
        trace!(
            path = %path_text(path),
            scope = scope.0,
            candidates = result.candidates().len(),
            "path resolved"
        );
        result
    }

    fn resolve_segments_inner(&self, path: &Path, upto: usize, scope: ScopeId) -> ResolutionResult {
        let full = upto == path.segments.len();
        let namespaces_at = |index: usize| -> &'static [Namespace] {
            if full && index + 1 == upto {
                &Namespace::ALL
            } else {
                &[Namespace::Types]
            }
        };
        let segments = &path.segments[..upto];
        let scope_data = self.ws.scope(scope);

        let mut current: Vec<Resolved> = if let Some(qself) = &path.qself {
            let owners: Vec<DefId> = match &qself.trait_ref {
                Some(trait_ref) => self.resolve(trait_ref).first_in(Namespace::Types).into_iter().collect(),
                None => self.type_head(&qself.ty).into_iter().collect(),
            };
            owners
                .into_iter()
                .flat_map(|owner| self.members(owner, &segments[0].name, namespaces_at(0)))
                .collect()
        } else if path.global {
            self.ws
                .extern_crate_root(scope_data.krate, &segments[0].name)
                .map(|root| Resolved {
                    def: root,
                    ns: Namespace::Types,
                })
                .into_iter()
                .collect()
        } else {
            let first = segments[0].name.as_str();
            let as_module = |def: Option<DefId>| -> Vec<Resolved> {
                def.map(|def| Resolved {
                    def,
                    ns: Namespace::Types,
                })
                .into_iter()
                .collect()
            };
            match first {
                "crate" => as_module(Some(self.ws.crate_data(scope_data.krate).root)),
                "self" if path.segments.len() > 1 => as_module(Some(scope_data.module)),
                "super" => as_module(self.ws.parent_module(scope_data.module)),
                _ => self.lookup_lexical(scope, first, namespaces_at(0)),
            }
        };

        for (index, segment) in segments.iter().enumerate().skip(1) {
            if current.is_empty() {
                break;
            }
            let owners: Vec<DefId> = current
                .iter()
                .filter(|candidate| candidate.ns == Namespace::Types)
                .map(|candidate| candidate.def)
                .collect();
            current = if segment.name == "super" {
                owners
                    .into_iter()
                    .filter_map(|owner| self.ws.parent_module(owner))
                    .map(|def| Resolved {
                        def,
                        ns: Namespace::Types,
                    })
                    .collect()
            } else {
                owners
                    .into_iter()
                    .flat_map(|owner| self.members(owner, &segment.name, namespaces_at(index)))
                    .collect()
            };
        }
        ResolutionResult::from_candidates(current)
    }

    /// Walks scopes outward to the enclosing module, then the extern prelude,
    /// the std prelude and the primitive types. Stops at the first level with a match.
    pub fn lookup_lexical(&self, scope: ScopeId, name: &str, namespaces: &[Namespace]) -> Vec<Resolved> {
        let krate = self.ws.scope(scope).krate;
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.ws.scope(id);
            let mut found = Vec::new();
            for &ns in namespaces {
                if data.kind == ScopeKind::Module {
                    found.extend(
                        self.ws
                            .module_lookup(data.module, name, ns)
                            .into_iter()
                            .map(|def| Resolved { def, ns }),
                    );
                    continue;
                }
                found.extend(
                    data.bindings()
                        .filter(|(candidate, def)| {
                            *candidate == name && self.ws.def(*def).kind.in_namespace(ns)
                        })
                        .map(|(_, def)| Resolved { def, ns }),
                );
                if !data.imports.is_empty() {
                    found.extend(
                        self.ws
                            .block_import_lookup(id, name, ns)
                            .into_iter()
                            .map(|def| Resolved { def, ns }),
                    );
                }
            }
            if !found.is_empty() {
                return found;
            }
            if data.kind == ScopeKind::Module {
                break;
            }
            current = data.parent;
        }

        if namespaces.contains(&Namespace::Types) {
            if let Some(root) = self.ws.extern_crate_root(krate, name) {
                return vec![Resolved {
                    def: root,
                    ns: Namespace::Types,
                }];
            }
        }
        if let Some(prelude) = self.ws.prelude_module() {
            let found: Vec<Resolved> = namespaces
                .iter()
                .flat_map(|&ns| {
                    self.ws
                        .module_lookup(prelude, name, ns)
                        .into_iter()
                        .map(move |def| Resolved { def, ns })
                })
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        if namespaces.contains(&Namespace::Types) {
            if let Some(primitive) = self.ws.primitive(name) {
                return vec![Resolved {
                    def: primitive,
                    ns: Namespace::Types,
                }];
            }
        }
        Vec::new()
    }

    /// Items named `name` reachable through `owner`.
    pub fn members(&self, owner: DefId, name: &str, namespaces: &[Namespace]) -> Vec<Resolved> {
        let mut out = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_members(owner, name, namespaces, &mut out, &mut visited);
        out
    }

    fn collect_members(
        &self,
        owner: DefId,
        name: &str,
        namespaces: &[Namespace],
        out: &mut Vec<Resolved>,
        visited: &mut FxHashSet<DefId>,
    ) {
        if !visited.insert(owner) {
            return;
        }
        match &self.ws.def(owner).kind {
            DefKind::Module => {
                for &ns in namespaces {
                    out.extend(
                        self.ws
                            .module_lookup(owner, name, ns)
                            .into_iter()
                            .map(|def| Resolved { def, ns }),
                    );
                }
            }
            DefKind::Enum => {
                self.push_children(owner, name, namespaces, out);
                self.impl_members(owner, name, namespaces, out, visited);
            }
            DefKind::Struct { .. } | DefKind::Primitive => {
                self.impl_members(owner, name, namespaces, out, visited);
            }
            DefKind::Trait { supertraits } => {
                self.push_children(owner, name, namespaces, out);
                for supertrait in self.bound_traits(supertraits) {
                    self.collect_members(supertrait, name, namespaces, out, visited);
                }
            }
            DefKind::TypeParam { bounds, .. } => {
                for bound in self.bound_traits(bounds) {
                    self.collect_members(bound, name, namespaces, out, visited);
                }
            }
            DefKind::SelfType => {
                let Some(parent) = self.ws.def(owner).parent else {
                    return;
                };
                match &self.ws.def(parent).kind {
                    DefKind::Trait { .. } => {
                        self.collect_members(parent, name, namespaces, out, visited)
                    }
                    DefKind::Impl { trait_ref, self_ty } => {
                        self.push_children(parent, name, namespaces, out);
                        visited.insert(parent);
                        if let Some(trait_def) = trait_ref
                            .as_ref()
                            .and_then(|path| self.resolve(path).first_in(Namespace::Types))
                        {
                            self.collect_members(trait_def, name, namespaces, out, visited);
                        }
                        if let Some(head) = self.type_head(self_ty) {
                            self.collect_members(head, name, namespaces, out, visited);
                        }
                    }
                    _ => {}
                }
            }
            DefKind::TypeAlias { ty: Some(ty), .. } => {
                if let Some(head) = self.type_head(ty) {
                    self.collect_members(head, name, namespaces, out, visited);
                }
            }
            DefKind::TypeAlias { ty: None, bounds } => {
                for bound in self.bound_traits(bounds) {
                    self.collect_members(bound, name, namespaces, out, visited);
                }
            }
            _ => {}
        }
    }

    fn push_children(&self, owner: DefId, name: &str, namespaces: &[Namespace], out: &mut Vec<Resolved>) {
        for child in self.ws.named_children(owner, name) {
            for &ns in namespaces {
                if self.ws.def(child).kind.in_namespace(ns) {
                    out.push(Resolved { def: child, ns });
                }
            }
        }
    }

    /// Inherent and trait impl items of a nominal type, then default items of the
    /// implemented traits.
    fn impl_members(
        &self,
        ty_def: DefId,
        name: &str,
        namespaces: &[Namespace],
        out: &mut Vec<Resolved>,
        visited: &mut FxHashSet<DefId>,
    ) {
        let impls: Vec<DefId> = self
            .ws
            .impls_for(ty_def)
            .iter()
            .chain(self.ws.blanket_impls())
            .copied()
            .collect();
        for imp in &impls {
            self.push_children(*imp, name, namespaces, out);
        }
        for imp in impls {
            let DefKind::Impl {
                trait_ref: Some(trait_ref),
                ..
            } = &self.ws.def(imp).kind
            else {
                continue;
            };
            if let Some(trait_def) = self.resolve(trait_ref).first_in(Namespace::Types) {
                self.collect_members(trait_def, name, namespaces, out, visited);
            }
        }
    }

    /// Traits named by `bounds`, skipping `?Sized` and lifetimes.
    pub fn bound_traits(&self, bounds: &[TypeBound]) -> Vec<DefId> {
        bounds
            .iter()
            .filter_map(|bound| match bound {
                TypeBound::Trait(poly) if !poly.maybe => self
                    .resolve(&poly.path)
                    .in_namespace(Namespace::Types)
                    .find(|def| matches!(self.ws.def(*def).kind, DefKind::Trait { .. })),
                _ => None,
            })
            .collect()
    }

    /// The nominal definition a type is built on: `Vec<u8>` and `&Vec<u8>` give `Vec`.
    /// Aliases are followed to their target.
    pub fn type_head(&self, ty: &TypeExpr) -> Option<DefId> {
        let mut def = match ty {
            TypeExpr::Path(path) => self.resolve(path).first_in(Namespace::Types)?,
            TypeExpr::Ref { inner, .. } | TypeExpr::Ptr { inner, .. } => return self.type_head(inner),
            _ => return None,
        };
        for _ in 0..MAX_ALIAS_DEPTH {
            let DefKind::TypeAlias { ty: Some(target), .. } = &self.ws.def(def).kind else {
                return Some(def);
            };
            let TypeExpr::Path(path) = strip_refs(target) else {
                return Some(def);
            };
            match self.resolve(path).first_in(Namespace::Types) {
                Some(next) => def = next,
                None => return Some(def),
            }
        }
        Some(def)
    }

    /// Methods a `receiver.name(..)` call may target. Falls back to every method
    /// named `name` in declaration order when the receiver type is unknown.
    pub fn resolve_method(&self, receiver: &Expr, name: &str) -> Vec<DefId> {
        match self.receiver_methods(receiver, name) {
            Some(found) => found,
            None => self.methods_named(name),
        }
    }

    /// The method a `receiver.name(..)` call runs. With an unknown receiver type
    /// the name must belong to a single method in the workspace.
    pub fn method_target(&self, receiver: &Expr, name: &str) -> Option<DefId> {
        if let Some(found) = self.receiver_methods(receiver, name) {
            return found.first().copied();
        }
        match self.methods_named(name).as_slice() {
            [only] => Some(*only),
            candidates => {
                trace!(
                    target: "rustpath::resolve",
                    method = name,
                    candidates = candidates.len(),
                    "method target not determined"
                );
                None
            }
        }
    }

    fn receiver_methods(&self, receiver: &Expr, name: &str) -> Option<Vec<DefId>> {
        let ty_def = self.infer_head(receiver, 0)?;
        let found: Vec<DefId> = self
            .members(ty_def, name, &[Namespace::Values])
            .into_iter()
            .map(|resolved| resolved.def)
            .filter(|def| matches!(self.ws.def(*def).kind, DefKind::Fn(_)))
            .collect();
        if found.is_empty() {
            None
        } else {
            Some(dedup_defs(found))
        }
    }

    fn methods_named(&self, name: &str) -> Vec<DefId> {
        self.ws
            .defs()
            .filter(|(_, data)| data.name == name && matches!(data.kind, DefKind::Fn(_)))
            .filter(|(_, data)| {
                data.parent.map_or(false, |parent| {
                    matches!(
                        self.ws.def(parent).kind,
                        DefKind::Impl { .. } | DefKind::Trait { .. }
                    )
                })
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Best-effort nominal type of an expression.
    pub fn infer_head(&self, expr: &Expr, depth: usize) -> Option<DefId> {
        if depth > MAX_ALIAS_DEPTH {
            return None;
        }
        match expr {
            Expr::Literal(lit) => {
                let name = match &lit.kind {
                    LitKind::Int { suffix, .. } => suffix.as_deref().unwrap_or("i32"),
                    LitKind::Float(text) if text.ends_with("f32") => "f32",
                    LitKind::Float(_) => "f64",
                    LitKind::Bool(_) => "bool",
                    LitKind::Char(_) => "char",
                    LitKind::Byte(_) => "u8",
                    LitKind::Str(_) => "str",
                    LitKind::ByteStr(_) => return None,
                };
                self.ws.primitive(name)
            }
            Expr::Path(path) => {
                let def = self.resolve(path).first_in(Namespace::Values)?;
                match &self.ws.def(def).kind {
                    DefKind::Local { ty: Some(ty), .. } => self.type_head(ty),
                    DefKind::Local { init: Some(init), .. } => self.infer_head(init, depth + 1),
                    DefKind::Const { ty: Some(ty), .. } => self.type_head(ty),
                    DefKind::Struct { .. } => Some(def),
                    DefKind::Variant { .. } => self.ws.def(def).parent,
                    _ => None,
                }
            }
            Expr::Struct { path, .. } => {
                let def = self.resolve(path).first_in(Namespace::Types)?;
                match self.ws.def(def).kind {
                    DefKind::Variant { .. } => self.ws.def(def).parent,
                    _ => self.type_head(&TypeExpr::Path(path.clone())),
                }
            }
            Expr::Call { callee, .. } => {
                let Expr::Path(path) = callee.as_ref() else {
                    return None;
                };
                let def = self.resolve(path).first_in(Namespace::Values)?;
                match &self.ws.def(def).kind {
                    DefKind::Fn(signature) => self.return_head(def, signature),
                    DefKind::Struct { .. } => Some(def),
                    DefKind::Variant { .. } => self.ws.def(def).parent,
                    _ => None,
                }
            }
            Expr::MethodCall {
                receiver, method, ..
            } => {
                let def = self.method_target(receiver, &method.name)?;
                match &self.ws.def(def).kind {
                    DefKind::Fn(signature) => self.return_head(def, signature),
                    _ => None,
                }
            }
            Expr::Field { base, name, .. } => {
                let owner = self.infer_head(base, depth + 1)?;
                let DefKind::Struct { fields } = &self.ws.def(owner).kind else {
                    return None;
                };
                let field = match fields {
                    StructFields::Named(fields) => fields
                        .iter()
                        .find(|field| field.name.as_ref().map_or(false, |ident| ident.name == name.name)),
                    StructFields::Tuple(fields) => name
                        .name
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| fields.get(index)),
                    StructFields::Unit => None,
                }?;
                self.type_head(&field.ty)
            }
            Expr::Paren(inner, _) => self.infer_head(inner, depth + 1),
            Expr::Unary {
                op: UnaryOp::Ref | UnaryOp::RefMut | UnaryOp::Deref,
                expr,
                ..
            } => self.infer_head(expr, depth + 1),
            Expr::Cast { ty, .. } => self.type_head(ty),
            Expr::Block { block, .. } => block
                .tail
                .as_deref()
                .and_then(|tail| self.infer_head(tail, depth + 1)),
            _ => None,
        }
    }

    fn return_head(&self, function: DefId, signature: &FnDef) -> Option<DefId> {
        let head = self.type_head(signature.ret.as_ref()?)?;
        if !matches!(self.ws.def(head).kind, DefKind::SelfType) {
            return Some(head);
        }
        // `-> Self` inside an impl names the impl's self type
        let owner = self.ws.def(function).parent?;
        match &self.ws.def(owner).kind {
            DefKind::Impl { self_ty, .. } => self.type_head(self_ty),
            _ => Some(head),
        }
    }

    /// The generic lifetime parameter a lifetime refers to. `'static` and `'_` have none.
    pub fn resolve_lifetime(&self, lifetime: &Lifetime) -> Option<DefId> {
        if lifetime.is_static() || lifetime.is_anonymous() {
            return None;
        }
        let mut current = self.ws.scope_of(lifetime.id);
        while let Some(id) = current {
            let scope = self.ws.scope(id);
            if let Some(def) = scope.lifetime(&lifetime.name) {
                return Some(def);
            }
            if scope.kind == ScopeKind::Module {
                break;
            }
            current = scope.parent;
        }
        None
    }

    /// Resolves the callee of a call or method call to a function.
    pub fn call_site<'e>(&self, expr: &'e Expr) -> Option<CallSite<'e>> {
        match expr {
            Expr::Call { callee, args, .. } => {
                let Expr::Path(path) = callee.as_ref() else {
                    return None;
                };
                let function = self
                    .resolve(path)
                    .in_namespace(Namespace::Values)
                    .find(|def| matches!(self.ws.def(*def).kind, DefKind::Fn(_)))?;
                let DefKind::Fn(signature) = &self.ws.def(function).kind else {
                    return None;
                };
                Some(CallSite {
                    function,
                    args,
                    receiver_in_args: signature.self_param.is_some(),
                })
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
                ..
            } => {
                let function = self.method_target(receiver, &method.name)?;
                Some(CallSite {
                    function,
                    args,
                    receiver_in_args: false,
                })
            }
            _ => None,
        }
    }

    pub fn signature(&self, function: DefId) -> Option<&'w FnDef> {
        match &self.ws.def(function).kind {
            DefKind::Fn(signature) => Some(signature),
            _ => None,
        }
    }

    /// Names of type-namespace items visible at `scope`, innermost first.
    /// A name shadowed by an inner binding is listed once.
    pub fn visible_type_names(&self, scope: ScopeId) -> Vec<(String, DefId)> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut push = |name: &str, def: DefId, out: &mut Vec<(String, DefId)>| {
            if seen.insert(name.to_string()) {
                out.push((name.to_string(), def));
            }
        };

        let krate = self.ws.scope(scope).krate;
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.ws.scope(id);
            if data.kind == ScopeKind::Module {
                for (name, binding) in self.ws.module_entries(data.module) {
                    if self.ws.def(binding.def).kind.in_namespace(Namespace::Types) {
                        push(&name, binding.def, &mut out);
                    }
                }
                break;
            }
            for (name, def) in data.bindings().collect::<Vec<_>>().into_iter().rev() {
                if self.ws.def(def).kind.in_namespace(Namespace::Types) {
                    push(name, def, &mut out);
                }
            }
            for import in &data.imports {
                if let Some(name) = import.binding_name() {
                    for def in self.ws.block_import_lookup(id, name, Namespace::Types) {
                        push(name, def, &mut out);
                    }
                }
            }
            current = data.parent;
        }

        for dep in &self.ws.crate_data(krate).deps {
            let dep = self.ws.crate_data(*dep);
            push(&dep.name, dep.root, &mut out);
        }
        if let Some(prelude) = self.ws.prelude_module() {
            for (name, binding) in self.ws.module_entries(prelude) {
                if self.ws.def(binding.def).kind.in_namespace(Namespace::Types) {
                    push(&name, binding.def, &mut out);
                }
            }
        }
        for name in super::builtin::PRIMITIVES {
            if let Some(def) = self.ws.primitive(name) {
                push(name, def, &mut out);
            }
        }
        out
    }
}

fn strip_refs(ty: &TypeExpr) -> &TypeExpr {
    match ty {
        TypeExpr::Ref { inner, .. } | TypeExpr::Ptr { inner, .. } => strip_refs(inner),
        other => other,
    }
}

fn dedup_defs(defs: Vec<DefId>) -> Vec<DefId> {
    let mut seen = FxHashSet::default();
    defs.into_iter().filter(|def| seen.insert(*def)).collect()
}

pub(crate) fn path_text(path: &Path) -> String {
    let mut text = String::new();
    if path.qself.is_some() {
        text.push_str("<..>::");
    }
    if path.global {
        text.push_str("::");
    }
    for (index, segment) in path.segments.iter().enumerate() {
        if index > 0 {
            text.push_str("::");
        }
        text.push_str(&segment.name);
    }
    text
}
