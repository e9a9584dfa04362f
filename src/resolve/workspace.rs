use super::{
    builtin::{PRIMITIVES, STD_CRATE, STD_SOURCE},
    cache::ResolveCache,
    loader::{read_source, DiskLoader, FileErrors, LoadError, ModuleLoader, NoModuleFiles},
    resolver::Resolver,
    scope::{Scope, ScopeKind},
    CrateId, DefData, DefId, DefKind, FileId, Import, ImportKind, ScopeId,
};
use crate::language::{
    ast::*,
    errors::SyntaxErrors,
    parser::{parse_expr, parse_file, parse_type},
    span::Span,
    types::{
        GenericArg, GenericArgs, Lifetime, NodeId, NodeIdGen, Path, PathSegment, TypeBound,
        TypeExpr,
    },
};
use rustc_hash::FxHashMap;
use std::path::{Path as FsPath, PathBuf};
use tracing::{debug, trace};

#[derive(Debug)]
pub struct FileData {
    pub path: PathBuf,
    pub source: String,
    pub krate: CrateId,
    /// Module whose items the file holds.
    pub module: DefId,
    pub syntax: SourceFile,
}

#[derive(Debug)]
pub struct CrateData {
    pub id: CrateId,
    pub name: String,
    pub root: DefId,
    pub root_file: FileId,
    pub deps: Vec<CrateId>,
}

#[derive(Debug)]
pub struct ModuleData {
    pub parent: Option<DefId>,
    pub scope: ScopeId,
    /// Declared items in source order.
    pub items: Vec<DefId>,
    pub imports: Vec<Import>,
    names: FxHashMap<String, Vec<DefId>>,
}

impl ModuleData {
    fn new(parent: Option<DefId>, scope: ScopeId) -> Self {
        Self {
            parent,
            scope,
            items: Vec::new(),
            imports: Vec::new(),
            names: FxHashMap::default(),
        }
    }

    fn insert(&mut self, name: &str, def: DefId) {
        self.items.push(def);
        self.names.entry(name.to_string()).or_default().push(def);
    }

    pub fn declared(&self, name: &str) -> &[DefId] {
        self.names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Every crate the analysis can see, lowered into one definition arena.
#[derive(Debug)]
pub struct Workspace {
    files: Vec<FileData>,
    crates: Vec<CrateData>,
    defs: Vec<DefData>,
    scopes: Vec<Scope>,
    modules: FxHashMap<DefId, ModuleData>,
    node_scopes: FxHashMap<NodeId, ScopeId>,
    impls: Vec<DefId>,
    impls_by_self: FxHashMap<DefId, Vec<DefId>>,
    blanket_impls: Vec<DefId>,
    primitives: FxHashMap<String, DefId>,
    ids: NodeIdGen,
    revision: u64,
    std_crate: CrateId,
    prelude: Option<DefId>,
}

struct ParsedModule {
    path: PathBuf,
    source: String,
    syntax: SourceFile,
}

struct LowerCx {
    krate: CrateId,
    file: FileId,
    module_path: Vec<String>,
    pending: FxHashMap<Vec<String>, ParsedModule>,
}

#[derive(Clone, Copy)]
enum Container {
    Module(DefId),
    Block { scope: ScopeId, owner: DefId },
}

impl Container {
    fn parent(self) -> DefId {
        match self {
            Container::Module(module) => module,
            Container::Block { owner, .. } => owner,
        }
    }
}

impl Workspace {
    /// A workspace holding only the builtin standard library.
    pub fn new() -> Result<Self, LoadError> {
        let mut ws = Workspace {
            files: Vec::new(),
            crates: Vec::new(),
            defs: Vec::new(),
            scopes: Vec::new(),
            modules: FxHashMap::default(),
            node_scopes: FxHashMap::default(),
            impls: Vec::new(),
            impls_by_self: FxHashMap::default(),
            blanket_impls: Vec::new(),
            primitives: FxHashMap::default(),
            ids: NodeIdGen::new(),
            revision: 0,
            std_crate: CrateId(0),
            prelude: None,
        };
        let std = ws.add_crate_with(
            STD_CRATE,
            PathBuf::from("<std>"),
            STD_SOURCE.to_string(),
            &[],
            &mut NoModuleFiles,
        )?;
        ws.std_crate = std;
        let std_root = ws.crates[std.0 as usize].root;
        let std_file = ws.crates[std.0 as usize].root_file;
        ws.prelude = ws
            .module(std_root)
            .and_then(|module| module.declared("prelude").first().copied());
        for name in PRIMITIVES {
            let def = ws.alloc_def(DefData {
                name: (*name).to_string(),
                kind: DefKind::Primitive,
                krate: std,
                file: std_file,
                parent: None,
                visibility: Visibility::Public,
                span: Span::default(),
                generics: Vec::new(),
                children: Vec::new(),
            });
            ws.primitives.insert((*name).to_string(), def);
        }
        // re-index now that primitive self types resolve
        ws.impls_by_self.clear();
        ws.blanket_impls.clear();
        ws.index_impls(std);
        Ok(ws)
    }

    /// Adds a single-file crate; `mod name;` declarations stay empty.
    pub fn add_crate(
        &mut self,
        name: &str,
        path: impl Into<PathBuf>,
        source: impl Into<String>,
        deps: &[CrateId],
    ) -> Result<CrateId, LoadError> {
        self.add_crate_with(name, path.into(), source.into(), deps, &mut NoModuleFiles)
    }

    /// Reads a crate from disk, following `mod name;` declarations.
    pub fn load_crate(
        &mut self,
        name: &str,
        root: &FsPath,
        deps: &[CrateId],
    ) -> Result<CrateId, LoadError> {
        let source = read_source(root)?;
        self.add_crate_with(name, root.to_path_buf(), source, deps, &mut DiskLoader)
    }

    pub fn add_crate_with(
        &mut self,
        name: &str,
        path: PathBuf,
        source: String,
        deps: &[CrateId],
        loader: &mut dyn ModuleLoader,
    ) -> Result<CrateId, LoadError> {
        let syntax = match parse_file(&source, &mut self.ids) {
            Ok(syntax) => syntax,
            Err(err) => {
                return Err(LoadError::Syntax(vec![FileErrors {
                    path,
                    source,
                    errors: err.errors,
                }]))
            }
        };

        let dir = path
            .parent()
            .map(FsPath::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut pending = FxHashMap::default();
        let mut file_errors = Vec::new();
        self.collect_module_files(
            &syntax.items,
            &dir,
            &mut Vec::new(),
            loader,
            &mut pending,
            &mut file_errors,
        )?;
        if !file_errors.is_empty() {
            return Err(LoadError::Syntax(file_errors));
        }

        let krate = CrateId(self.crates.len() as u32);
        let mut all_deps = Vec::new();
        if !self.crates.is_empty() {
            all_deps.push(self.std_crate);
        }
        for dep in deps {
            if !all_deps.contains(dep) {
                all_deps.push(*dep);
            }
        }

        let file = FileId(self.files.len() as u32);
        let root = self.alloc_def(DefData {
            name: name.to_string(),
            kind: DefKind::Module,
            krate,
            file,
            parent: None,
            visibility: Visibility::Public,
            span: Span::default(),
            generics: Vec::new(),
            children: Vec::new(),
        });
        self.push_file(path, source, krate, root);
        let scope = self.new_scope(None, ScopeKind::Module, root, krate);
        self.modules.insert(root, ModuleData::new(None, scope));
        self.crates.push(CrateData {
            id: krate,
            name: name.to_string(),
            root,
            root_file: file,
            deps: all_deps,
        });

        let mut cx = LowerCx {
            krate,
            file,
            module_path: Vec::new(),
            pending,
        };
        self.lower_items(&mut cx, &syntax.items, Container::Module(root), scope);
        self.files[file.0 as usize].syntax = syntax;
        self.index_impls(krate);
        self.revision += 1;
        debug!(
            krate = name,
            files = self.files.iter().filter(|f| f.krate == krate).count(),
            defs = self.defs.len(),
            revision = self.revision,
            "crate added to workspace"
        );
        Ok(krate)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn def(&self, id: DefId) -> &DefData {
        &self.defs[id.0 as usize]
    }

    pub fn defs(&self) -> impl Iterator<Item = (DefId, &DefData)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(index, data)| (DefId(index as u32), data))
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn module(&self, id: DefId) -> Option<&ModuleData> {
        self.modules.get(&id)
    }

    pub fn crate_data(&self, id: CrateId) -> &CrateData {
        &self.crates[id.0 as usize]
    }

    pub fn crates(&self) -> &[CrateData] {
        &self.crates
    }

    pub fn crate_by_name(&self, name: &str) -> Option<CrateId> {
        self.crates
            .iter()
            .rev()
            .find(|data| data.name == name)
            .map(|data| data.id)
    }

    pub fn file(&self, id: FileId) -> &FileData {
        &self.files[id.0 as usize]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileData)> {
        self.files
            .iter()
            .enumerate()
            .map(|(index, data)| (FileId(index as u32), data))
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    pub fn std_crate(&self) -> CrateId {
        self.std_crate
    }

    pub fn prelude_module(&self) -> Option<DefId> {
        self.prelude
    }

    /// Scope detached paths resolve in.
    pub fn prelude_scope(&self) -> ScopeId {
        self.prelude
            .and_then(|prelude| self.module(prelude))
            .map(|module| module.scope)
            .unwrap_or(ScopeId(0))
    }

    pub fn primitive(&self, name: &str) -> Option<DefId> {
        self.primitives.get(name).copied()
    }

    pub fn impls(&self) -> &[DefId] {
        &self.impls
    }

    pub fn impls_for(&self, def: DefId) -> &[DefId] {
        self.impls_by_self
            .get(&def)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn blanket_impls(&self) -> &[DefId] {
        &self.blanket_impls
    }

    /// Nearest enclosing module; primitives belong to the std root.
    pub fn module_of(&self, def: DefId) -> DefId {
        let mut current = def;
        loop {
            let data = self.def(current);
            if matches!(data.kind, DefKind::Module) {
                return current;
            }
            match data.parent {
                Some(parent) => current = parent,
                None => return self.crate_data(data.krate).root,
            }
        }
    }

    pub fn crate_root_scope(&self, krate: CrateId) -> ScopeId {
        let root = self.crate_data(krate).root;
        self.module(root)
            .map(|module| module.scope)
            .unwrap_or(ScopeId(0))
    }

    /// Follows declared submodules from the crate root, e.g. `["net", "http"]`.
    pub fn find_module(&self, krate: CrateId, segments: &[&str]) -> Option<DefId> {
        let mut current = self.crate_data(krate).root;
        for segment in segments {
            let module = self.module(current)?;
            current = module
                .declared(segment)
                .iter()
                .copied()
                .find(|def| matches!(self.def(*def).kind, DefKind::Module))?;
        }
        Some(current)
    }

    /// Parses a type written at `scope`, registering its paths there.
    pub fn parse_type_at(&mut self, text: &str, scope: ScopeId) -> Result<TypeExpr, SyntaxErrors> {
        let ty = parse_type(text, &mut self.ids)?;
        let mut cx = self.fragment_cx(scope);
        self.record_type(&mut cx, &ty, scope);
        Ok(ty)
    }

    pub fn parse_expr_at(&mut self, text: &str, scope: ScopeId) -> Result<Expr, SyntaxErrors> {
        let expr = parse_expr(text, &mut self.ids)?;
        let mut cx = self.fragment_cx(scope);
        let owner = self.scope(scope).module;
        self.record_expr(&mut cx, &expr, scope, owner);
        Ok(expr)
    }

    fn fragment_cx(&self, scope: ScopeId) -> LowerCx {
        let krate = self.scope(scope).krate;
        LowerCx {
            krate,
            file: self.crate_data(krate).root_file,
            module_path: Vec::new(),
            pending: FxHashMap::default(),
        }
    }

    fn push_file(&mut self, path: PathBuf, source: String, krate: CrateId, module: DefId) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(FileData {
            path,
            source,
            krate,
            module,
            syntax: SourceFile { items: Vec::new() },
        });
        id
    }

    fn alloc_def(&mut self, data: DefData) -> DefId {
        let id = DefId(self.defs.len() as u32);
        self.defs.push(data);
        id
    }

    fn alloc(
        &mut self,
        cx: &LowerCx,
        name: &Ident,
        kind: DefKind,
        parent: Option<DefId>,
        visibility: Visibility,
    ) -> DefId {
        self.alloc_def(DefData {
            name: name.name.clone(),
            kind,
            krate: cx.krate,
            file: cx.file,
            parent,
            visibility,
            span: name.span,
            generics: Vec::new(),
            children: Vec::new(),
        })
    }

    fn new_scope(
        &mut self,
        parent: Option<ScopeId>,
        kind: ScopeKind,
        module: DefId,
        krate: CrateId,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(parent, kind, module, krate));
        id
    }

    fn child_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let (module, krate) = {
            let scope = self.scope(parent);
            (scope.module, scope.krate)
        };
        self.new_scope(Some(parent), kind, module, krate)
    }

    fn bind(&mut self, scope: ScopeId, name: &str, def: DefId) {
        self.scopes[scope.0 as usize]
            .bindings
            .push((name.to_string(), def));
    }

    fn register(&mut self, container: Container, def: DefId) {
        let name = self.def(def).name.clone();
        match container {
            Container::Module(module) => {
                if let Some(data) = self.modules.get_mut(&module) {
                    data.insert(&name, def);
                }
            }
            Container::Block { scope, .. } => self.bind(scope, &name, def),
        }
    }

    fn collect_module_files(
        &mut self,
        items: &[Item],
        dir: &FsPath,
        module_path: &mut Vec<String>,
        loader: &mut dyn ModuleLoader,
        pending: &mut FxHashMap<Vec<String>, ParsedModule>,
        errors: &mut Vec<FileErrors>,
    ) -> Result<(), LoadError> {
        for item in items {
            let ItemKind::Mod(def) = &item.kind else {
                continue;
            };
            let child_dir = dir.join(&def.name.name);
            module_path.push(def.name.name.clone());
            match &def.items {
                Some(inner) => {
                    self.collect_module_files(inner, &child_dir, module_path, loader, pending, errors)?
                }
                None => {
                    if let Some(loaded) = loader.load(dir, &def.name.name)? {
                        match parse_file(&loaded.source, &mut self.ids) {
                            Ok(syntax) => {
                                self.collect_module_files(
                                    &syntax.items,
                                    &child_dir,
                                    module_path,
                                    loader,
                                    pending,
                                    errors,
                                )?;
                                pending.insert(
                                    module_path.clone(),
                                    ParsedModule {
                                        path: loaded.path,
                                        source: loaded.source,
                                        syntax,
                                    },
                                );
                            }
                            Err(err) => errors.push(FileErrors {
                                path: loaded.path,
                                source: loaded.source,
                                errors: err.errors,
                            }),
                        }
                    }
                }
            }
            module_path.pop();
        }
        Ok(())
    }

    fn lower_items(&mut self, cx: &mut LowerCx, items: &[Item], container: Container, scope: ScopeId) {
        for item in items {
            self.lower_item(cx, item, container, scope);
        }
    }

    fn lower_item(&mut self, cx: &mut LowerCx, item: &Item, container: Container, scope: ScopeId) {
        let parent = Some(container.parent());
        match &item.kind {
            ItemKind::Fn(def) => {
                let id = self.lower_fn(cx, def, item.visibility, parent, scope);
                self.register(container, id);
            }
            ItemKind::Struct(def) => {
                let kind = DefKind::Struct {
                    fields: def.fields.clone(),
                };
                let id = self.alloc(cx, &def.name, kind, parent, item.visibility);
                let inner = self.lower_generics(cx, &def.generics, id, scope);
                for field in def.fields.iter() {
                    self.record_type(cx, &field.ty, inner);
                }
                self.register(container, id);
            }
            ItemKind::Enum(def) => {
                let id = self.alloc(cx, &def.name, DefKind::Enum, parent, item.visibility);
                let inner = self.lower_generics(cx, &def.generics, id, scope);
                for variant in &def.variants {
                    let kind = DefKind::Variant {
                        fields: variant.fields.clone(),
                    };
                    let variant_id = self.alloc(cx, &variant.name, kind, Some(id), Visibility::Public);
                    for field in variant.fields.iter() {
                        self.record_type(cx, &field.ty, inner);
                    }
                    if let Some(discriminant) = &variant.discriminant {
                        self.record_expr(cx, discriminant, inner, id);
                    }
                    self.defs[id.0 as usize].children.push(variant_id);
                }
                self.register(container, id);
            }
            ItemKind::TypeAlias(def) => {
                let id = self.lower_type_alias(cx, def, item.visibility, parent, scope);
                self.register(container, id);
            }
            ItemKind::Trait(def) => {
                let kind = DefKind::Trait {
                    supertraits: def.supertraits.clone(),
                };
                let id = self.alloc(cx, &def.name, kind, parent, item.visibility);
                let inner = self.open_generics(cx, &def.generics, id, scope);
                self.bind_self_type(cx, id, inner, def.name.span);
                self.record_generics(cx, &def.generics, inner);
                self.record_bounds(cx, &def.supertraits, inner);
                self.lower_assoc_items(cx, &def.items, id, inner, true);
                self.register(container, id);
            }
            ItemKind::Impl(def) => {
                let kind = DefKind::Impl {
                    trait_ref: def.trait_ref.clone(),
                    self_ty: def.self_ty.clone(),
                };
                let name = Ident::new("", item.span);
                let id = self.alloc(cx, &name, kind, parent, item.visibility);
                let inner = self.open_generics(cx, &def.generics, id, scope);
                self.bind_self_type(cx, id, inner, def.self_ty.span());
                self.record_generics(cx, &def.generics, inner);
                if let Some(trait_ref) = &def.trait_ref {
                    self.record_path(cx, trait_ref, inner);
                }
                self.record_type(cx, &def.self_ty, inner);
                self.lower_assoc_items(cx, &def.items, id, inner, false);
                self.impls.push(id);
            }
            ItemKind::Mod(def) => self.lower_mod(cx, def, item.visibility, container, scope),
            ItemKind::Use(tree) => {
                let mut imports = Vec::new();
                flatten_use_tree(tree, &[], tree.global, item.visibility, &mut imports);
                match container {
                    Container::Module(module) => {
                        if let Some(data) = self.modules.get_mut(&module) {
                            data.imports.extend(imports);
                        }
                    }
                    Container::Block { scope, .. } => {
                        self.scopes[scope.0 as usize].imports.extend(imports)
                    }
                }
            }
            ItemKind::Const(def) => {
                let id = self.lower_const(cx, def, item.visibility, parent, scope);
                self.register(container, id);
            }
            ItemKind::MacroRules(def) => {
                let id = self.alloc(cx, &def.name, DefKind::Macro, parent, item.visibility);
                self.register(container, id);
            }
        }
    }

    fn lower_mod(
        &mut self,
        cx: &mut LowerCx,
        def: &ModDef,
        visibility: Visibility,
        container: Container,
        scope: ScopeId,
    ) {
        let parent_module = self.scope(scope).module;
        let id = self.alloc(cx, &def.name, DefKind::Module, Some(container.parent()), visibility);
        let module_scope = self.new_scope(None, ScopeKind::Module, id, cx.krate);
        self.modules
            .insert(id, ModuleData::new(Some(parent_module), module_scope));
        self.register(container, id);

        cx.module_path.push(def.name.name.clone());
        match &def.items {
            Some(items) => self.lower_items(cx, items, Container::Module(id), module_scope),
            None => match cx.pending.remove(&cx.module_path) {
                Some(parsed) => {
                    let file = self.push_file(parsed.path, parsed.source, cx.krate, id);
                    let outer = std::mem::replace(&mut cx.file, file);
                    self.lower_items(cx, &parsed.syntax.items, Container::Module(id), module_scope);
                    cx.file = outer;
                    self.files[file.0 as usize].syntax = parsed.syntax;
                }
                None => debug!(module = %def.name.name, "out-of-line module has no source"),
            },
        }
        cx.module_path.pop();
    }

    fn lower_fn(
        &mut self,
        cx: &mut LowerCx,
        def: &FnDef,
        visibility: Visibility,
        parent: Option<DefId>,
        scope: ScopeId,
    ) -> DefId {
        let signature = FnDef {
            name: def.name.clone(),
            qualifiers: def.qualifiers.clone(),
            generics: def.generics.clone(),
            self_param: def.self_param.clone(),
            params: def.params.clone(),
            ret: def.ret.clone(),
            body: None,
            span: def.span,
        };
        let id = self.alloc(cx, &def.name, DefKind::Fn(Box::new(signature)), parent, visibility);
        let inner = self.lower_generics(cx, &def.generics, id, scope);
        if let Some(self_param) = &def.self_param {
            match &self_param.kind {
                SelfKind::Ref {
                    lifetime: Some(lifetime),
                    ..
                } => self.record_lifetime(lifetime, inner),
                SelfKind::Explicit { ty, .. } => self.record_type(cx, ty, inner),
                _ => {}
            }
        }
        for param in &def.params {
            self.record_type(cx, &param.ty, inner);
        }
        if let Some(ret) = &def.ret {
            self.record_type(cx, ret, inner);
        }

        if let Some(body) = &def.body {
            let params_scope = self.child_scope(inner, ScopeKind::Block);
            if let Some(self_param) = &def.self_param {
                let ty = self.self_param_type(self_param, inner);
                let name = Ident::new("self", self_param.span);
                let kind = DefKind::Local {
                    ty: Some(ty),
                    init: None,
                };
                let local = self.alloc(cx, &name, kind, Some(id), Visibility::Private);
                self.bind(params_scope, "self", local);
            }
            for param in &def.params {
                let simple = matches!(param.pattern, Pattern::Ident { .. });
                for name in param.pattern.bindings() {
                    let kind = DefKind::Local {
                        ty: simple.then(|| param.ty.clone()),
                        init: None,
                    };
                    let local = self.alloc(cx, name, kind, Some(id), Visibility::Private);
                    self.bind(params_scope, &name.name, local);
                }
            }
            self.lower_block(cx, body, params_scope, id);
        }
        id
    }

    fn self_param_type(&mut self, param: &SelfParam, scope: ScopeId) -> TypeExpr {
        let path = Path {
            id: self.ids.next_id(),
            qself: None,
            global: false,
            segments: vec![PathSegment::plain("Self", param.span)],
            span: param.span,
        };
        self.node_scopes.insert(path.id, scope);
        let self_ty = TypeExpr::Path(path);
        match &param.kind {
            SelfKind::Value { .. } => self_ty,
            SelfKind::Ref { lifetime, mutable } => TypeExpr::Ref {
                lifetime: lifetime.clone(),
                mutable: *mutable,
                inner: Box::new(self_ty),
                span: param.span,
            },
            SelfKind::Explicit { ty, .. } => ty.clone(),
        }
    }

    fn lower_type_alias(
        &mut self,
        cx: &mut LowerCx,
        def: &TypeAliasDef,
        visibility: Visibility,
        parent: Option<DefId>,
        scope: ScopeId,
    ) -> DefId {
        let kind = DefKind::TypeAlias {
            ty: def.ty.clone(),
            bounds: def.bounds.clone(),
        };
        let id = self.alloc(cx, &def.name, kind, parent, visibility);
        let inner = self.lower_generics(cx, &def.generics, id, scope);
        self.record_bounds(cx, &def.bounds, inner);
        if let Some(ty) = &def.ty {
            self.record_type(cx, ty, inner);
        }
        id
    }

    fn lower_const(
        &mut self,
        cx: &mut LowerCx,
        def: &ConstDef,
        visibility: Visibility,
        parent: Option<DefId>,
        scope: ScopeId,
    ) -> DefId {
        let kind = DefKind::Const {
            ty: def.ty.clone(),
            value: def.value.clone(),
        };
        let id = self.alloc(cx, &def.name, kind, parent, visibility);
        if let Some(ty) = &def.ty {
            self.record_type(cx, ty, scope);
        }
        if let Some(value) = &def.value {
            self.record_expr(cx, value, scope, id);
        }
        id
    }

    fn lower_assoc_items(
        &mut self,
        cx: &mut LowerCx,
        items: &[AssocItem],
        owner: DefId,
        scope: ScopeId,
        in_trait: bool,
    ) {
        for item in items {
            let visibility = if in_trait {
                Visibility::Public
            } else {
                item.visibility
            };
            let id = match &item.kind {
                AssocItemKind::Fn(def) => self.lower_fn(cx, def, visibility, Some(owner), scope),
                AssocItemKind::Type(def) => {
                    self.lower_type_alias(cx, def, visibility, Some(owner), scope)
                }
                AssocItemKind::Const(def) => {
                    self.lower_const(cx, def, visibility, Some(owner), scope)
                }
            };
            self.defs[owner.0 as usize].children.push(id);
        }
    }

    fn bind_self_type(&mut self, cx: &LowerCx, owner: DefId, scope: ScopeId, span: Span) {
        let name = Ident::new("Self", span);
        let id = self.alloc(cx, &name, DefKind::SelfType, Some(owner), Visibility::Private);
        self.bind(scope, "Self", id);
    }

    fn lower_generics(
        &mut self,
        cx: &mut LowerCx,
        generics: &Generics,
        owner: DefId,
        parent: ScopeId,
    ) -> ScopeId {
        let scope = self.open_generics(cx, generics, owner, parent);
        self.record_generics(cx, generics, scope);
        scope
    }

    /// Declares the parameters; where-clause bounds on a bare parameter merge into it.
    fn open_generics(
        &mut self,
        cx: &LowerCx,
        generics: &Generics,
        owner: DefId,
        parent: ScopeId,
    ) -> ScopeId {
        let scope = self.child_scope(parent, ScopeKind::Item(owner));
        for param in &generics.params {
            let kind = match &param.kind {
                GenericParamKind::Lifetime { .. } => DefKind::LifetimeParam,
                GenericParamKind::Type { bounds, default } => DefKind::TypeParam {
                    bounds: bounds.clone(),
                    default: default.clone(),
                },
                GenericParamKind::Const { ty, default } => DefKind::ConstParam {
                    ty: ty.clone(),
                    default: default.clone(),
                },
            };
            let is_lifetime = matches!(kind, DefKind::LifetimeParam);
            let def = self.alloc(cx, &param.name, kind, Some(owner), Visibility::Private);
            self.defs[owner.0 as usize].generics.push(def);
            let entry = (param.name.name.clone(), def);
            if is_lifetime {
                self.scopes[scope.0 as usize].lifetimes.push(entry);
            } else {
                self.scopes[scope.0 as usize].bindings.push(entry);
            }
        }

        for predicate in &generics.where_clause {
            let WherePredicate::Bound {
                for_lifetimes,
                ty: TypeExpr::Path(path),
                bounds,
                ..
            } = predicate
            else {
                continue;
            };
            if !for_lifetimes.is_empty() || !path.is_single() || path.segments[0].args.is_some() {
                continue;
            }
            let target = self
                .def(owner)
                .generics
                .iter()
                .copied()
                .find(|def| self.def(*def).name == path.last_name());
            if let Some(target) = target {
                if let DefKind::TypeParam {
                    bounds: existing, ..
                } = &mut self.defs[target.0 as usize].kind
                {
                    existing.extend(bounds.iter().cloned());
                }
            }
        }
        scope
    }

    fn record_generics(&mut self, cx: &mut LowerCx, generics: &Generics, scope: ScopeId) {
        for param in &generics.params {
            match &param.kind {
                GenericParamKind::Lifetime { bounds } => {
                    for bound in bounds {
                        self.record_lifetime(bound, scope);
                    }
                }
                GenericParamKind::Type { bounds, default } => {
                    self.record_bounds(cx, bounds, scope);
                    if let Some(default) = default {
                        self.record_type(cx, default, scope);
                    }
                }
                GenericParamKind::Const { ty, default } => {
                    self.record_type(cx, ty, scope);
                    if let Some(default) = default {
                        self.record_const_expr(default, scope);
                    }
                }
            }
        }
        for predicate in &generics.where_clause {
            match predicate {
                WherePredicate::Bound {
                    for_lifetimes,
                    ty,
                    bounds,
                    ..
                } => {
                    let scope = self.binder_scope(cx, for_lifetimes, scope);
                    self.record_type(cx, ty, scope);
                    self.record_bounds(cx, bounds, scope);
                }
                WherePredicate::Lifetime {
                    lifetime, bounds, ..
                } => {
                    self.record_lifetime(lifetime, scope);
                    for bound in bounds {
                        self.record_lifetime(bound, scope);
                    }
                }
            }
        }
    }

    /// Opens a scope for `for<'a>` binders; returns `scope` when there are none.
    fn binder_scope(&mut self, cx: &LowerCx, lifetimes: &[Lifetime], scope: ScopeId) -> ScopeId {
        if lifetimes.is_empty() {
            return scope;
        }
        let binder = self.child_scope(scope, ScopeKind::Binder);
        for lifetime in lifetimes {
            let name = Ident::new(lifetime.name.clone(), lifetime.span);
            let def = self.alloc(cx, &name, DefKind::LifetimeParam, None, Visibility::Private);
            self.scopes[binder.0 as usize]
                .lifetimes
                .push((lifetime.name.clone(), def));
            self.record_lifetime(lifetime, binder);
        }
        binder
    }

    fn lower_block(&mut self, cx: &mut LowerCx, block: &Block, parent: ScopeId, owner: DefId) {
        let mut current = self.child_scope(parent, ScopeKind::Block);
        let container = Container::Block {
            scope: current,
            owner,
        };
        for stmt in &block.stmts {
            if let Stmt::Item(item) = stmt {
                self.lower_item(cx, item, container, current);
            }
        }
        for stmt in &block.stmts {
            match stmt {
                Stmt::Let(local) => {
                    if let Some(ty) = &local.ty {
                        self.record_type(cx, ty, current);
                    }
                    if let Some(init) = &local.init {
                        self.record_expr(cx, init, current, owner);
                    }
                    let names = local.pattern.bindings();
                    if names.is_empty() {
                        continue;
                    }
                    let next = self.child_scope(current, ScopeKind::Block);
                    let simple = matches!(local.pattern, Pattern::Ident { .. });
                    for name in names {
                        let kind = DefKind::Local {
                            ty: if simple { local.ty.clone() } else { None },
                            init: if simple { local.init.clone() } else { None },
                        };
                        let def = self.alloc(cx, name, kind, Some(owner), Visibility::Private);
                        self.bind(next, &name.name, def);
                    }
                    current = next;
                }
                Stmt::Expr(expr) => self.record_expr(cx, expr, current, owner),
                Stmt::Item(_) => {}
            }
        }
        if let Some(tail) = &block.tail {
            self.record_expr(cx, tail, current, owner);
        }
    }

    fn record_expr(&mut self, cx: &mut LowerCx, expr: &Expr, scope: ScopeId, owner: DefId) {
        match expr {
            Expr::Literal(_) | Expr::Return(None, _) => {}
            Expr::Path(path) => self.record_path(cx, path, scope),
            Expr::Call { callee, args, .. } => {
                self.record_expr(cx, callee, scope, owner);
                for arg in args {
                    self.record_expr(cx, arg, scope, owner);
                }
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
                ..
            } => {
                self.record_expr(cx, receiver, scope, owner);
                if let Some(generic_args) = &method.args {
                    self.record_generic_args(cx, generic_args, scope);
                }
                for arg in args {
                    self.record_expr(cx, arg, scope, owner);
                }
            }
            Expr::Field { base, .. } => self.record_expr(cx, base, scope, owner),
            Expr::Unary { expr, .. } | Expr::Try { expr, .. } | Expr::Paren(expr, _) => {
                self.record_expr(cx, expr, scope, owner)
            }
            Expr::Return(Some(expr), _) => self.record_expr(cx, expr, scope, owner),
            Expr::Index { base, index, .. } => {
                self.record_expr(cx, base, scope, owner);
                self.record_expr(cx, index, scope, owner);
            }
            Expr::Binary { left, right, .. } => {
                self.record_expr(cx, left, scope, owner);
                self.record_expr(cx, right, scope, owner);
            }
            Expr::Assign { target, value, .. } => {
                self.record_expr(cx, target, scope, owner);
                self.record_expr(cx, value, scope, owner);
            }
            Expr::Repeat { value, len, .. } => {
                self.record_expr(cx, value, scope, owner);
                self.record_expr(cx, len, scope, owner);
            }
            Expr::Cast { expr, ty, .. } => {
                self.record_expr(cx, expr, scope, owner);
                self.record_type(cx, ty, scope);
            }
            Expr::Block { block, .. } => self.lower_block(cx, block, scope, owner),
            Expr::Tuple(items, _) | Expr::Array(items, _) => {
                for item in items {
                    self.record_expr(cx, item, scope, owner);
                }
            }
            Expr::Struct { path, fields, .. } => {
                self.record_path(cx, path, scope);
                for field in fields {
                    self.record_expr(cx, &field.value, scope, owner);
                }
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.record_expr(cx, cond, scope, owner);
                self.lower_block(cx, then_branch, scope, owner);
                if let Some(else_branch) = else_branch {
                    self.record_expr(cx, else_branch, scope, owner);
                }
            }
            Expr::Macro(call) => self.record_path(cx, &call.path, scope),
        }
    }

    /// Const arguments and array lengths: every path lands in `scope`.
    fn record_const_expr(&mut self, expr: &Expr, scope: ScopeId) {
        let mut ids = Vec::new();
        expr.walk_paths(&mut |path| ids.push(path.id));
        for id in ids {
            if !id.is_detached() {
                self.node_scopes.insert(id, scope);
            }
        }
    }

    fn record_path(&mut self, cx: &mut LowerCx, path: &Path, scope: ScopeId) {
        if !path.id.is_detached() {
            self.node_scopes.insert(path.id, scope);
        }
        if let Some(qself) = &path.qself {
            self.record_type(cx, &qself.ty, scope);
            if let Some(trait_ref) = &qself.trait_ref {
                self.record_path(cx, trait_ref, scope);
            }
        }
        for segment in &path.segments {
            if let Some(args) = &segment.args {
                self.record_generic_args(cx, args, scope);
            }
            if let Some(sugar) = &segment.fn_sugar {
                for input in &sugar.inputs {
                    self.record_type(cx, input, scope);
                }
                if let Some(output) = &sugar.output {
                    self.record_type(cx, output, scope);
                }
            }
        }
    }

    fn record_generic_args(&mut self, cx: &mut LowerCx, args: &GenericArgs, scope: ScopeId) {
        for arg in &args.args {
            match arg {
                GenericArg::Lifetime(lifetime) => self.record_lifetime(lifetime, scope),
                GenericArg::Type(ty) => self.record_type(cx, ty, scope),
                GenericArg::Const(expr) => self.record_const_expr(expr, scope),
                GenericArg::Binding(binding) => self.record_type(cx, &binding.ty, scope),
            }
        }
    }

    fn record_type(&mut self, cx: &mut LowerCx, ty: &TypeExpr, scope: ScopeId) {
        match ty {
            TypeExpr::Tuple(items, _) => {
                for item in items {
                    self.record_type(cx, item, scope);
                }
            }
            TypeExpr::Unit(_) | TypeExpr::Never(_) | TypeExpr::Infer(_) => {}
            TypeExpr::Path(path) => self.record_path(cx, path, scope),
            TypeExpr::Ref {
                lifetime, inner, ..
            } => {
                if let Some(lifetime) = lifetime {
                    self.record_lifetime(lifetime, scope);
                }
                self.record_type(cx, inner, scope);
            }
            TypeExpr::Ptr { inner, .. } | TypeExpr::Slice(inner, _) => {
                self.record_type(cx, inner, scope)
            }
            TypeExpr::Array { elem, len, .. } => {
                self.record_type(cx, elem, scope);
                self.record_const_expr(len, scope);
            }
            TypeExpr::FnPtr(fn_ptr) => {
                for param in &fn_ptr.params {
                    self.record_type(cx, param, scope);
                }
                if let Some(ret) = &fn_ptr.ret {
                    self.record_type(cx, ret, scope);
                }
            }
            TypeExpr::TraitObject { bounds, .. } => self.record_bounds(cx, bounds, scope),
            TypeExpr::Macro(call) => self.record_path(cx, &call.path, scope),
        }
    }

    fn record_bounds(&mut self, cx: &mut LowerCx, bounds: &[TypeBound], scope: ScopeId) {
        for bound in bounds {
            match bound {
                TypeBound::Trait(poly) => {
                    let scope = self.binder_scope(cx, &poly.for_lifetimes, scope);
                    self.record_path(cx, &poly.path, scope);
                }
                TypeBound::Lifetime(lifetime) => self.record_lifetime(lifetime, scope),
            }
        }
    }

    fn record_lifetime(&mut self, lifetime: &Lifetime, scope: ScopeId) {
        if !lifetime.id.is_detached() {
            self.node_scopes.insert(lifetime.id, scope);
        }
    }

    fn index_impls(&mut self, krate: CrateId) {
        let cache = ResolveCache::new();
        let mut entries = Vec::new();
        {
            let resolver = Resolver::new(self, &cache);
            for &imp in &self.impls {
                if self.def(imp).krate != krate {
                    continue;
                }
                let DefKind::Impl { self_ty, .. } = &self.def(imp).kind else {
                    continue;
                };
                entries.push((imp, resolver.type_head(self_ty)));
            }
        }
        for (imp, head) in entries {
            match head {
                Some(def) if matches!(self.def(def).kind, DefKind::TypeParam { .. }) => {
                    self.blanket_impls.push(imp)
                }
                Some(def) => self.impls_by_self.entry(def).or_default().push(imp),
                None => trace!(impl_def = imp.0, "impl self type has no nominal head"),
            }
        }
    }
}

fn flatten_use_tree(
    tree: &UseTree,
    prefix: &[String],
    global: bool,
    visibility: Visibility,
    out: &mut Vec<Import>,
) {
    let mut path = prefix.to_vec();
    path.extend(tree.prefix.iter().map(|ident| ident.name.clone()));
    match &tree.kind {
        UseTreeKind::Simple { alias } => {
            // `a::{self}` binds `a` itself
            if path.len() > 1 && path.last().map(String::as_str) == Some("self") {
                path.pop();
            }
            let Some(last) = path.last() else {
                return;
            };
            let name = alias
                .as_ref()
                .map(|alias| alias.name.clone())
                .unwrap_or_else(|| last.clone());
            out.push(Import {
                global,
                path,
                kind: ImportKind::Named { name },
                visibility,
                span: tree.span,
            });
        }
        UseTreeKind::Glob => out.push(Import {
            global,
            path,
            kind: ImportKind::Glob,
            visibility,
            span: tree.span,
        }),
        UseTreeKind::Nested(children) => {
            for child in children {
                flatten_use_tree(child, &path, global, visibility, out);
            }
        }
    }
}
