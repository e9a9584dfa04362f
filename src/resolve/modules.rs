use super::{
    DefId, DefKind, Import, ImportKind, Namespace, ScopeId, Workspace,
};
use crate::language::ast::Visibility;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// A name bound in a module together with the visibility of the binding itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub def: DefId,
    pub visibility: Visibility,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ImportOwner {
    Module(DefId),
    Block(ScopeId),
}

/// Imports currently being resolved; re-entering one means a cycle.
pub(crate) type ImportGuard = Vec<(ImportOwner, usize)>;

impl Workspace {
    /// Definitions `name` denotes inside `module`. Declared items and explicit
    /// imports shadow glob imports.
    pub fn module_lookup(&self, module: DefId, name: &str, ns: Namespace) -> Vec<DefId> {
        self.module_bindings(module, name, ns, &mut Vec::new())
            .into_iter()
            .map(|binding| binding.def)
            .collect()
    }

    pub(crate) fn module_bindings(
        &self,
        module: DefId,
        name: &str,
        ns: Namespace,
        guard: &mut ImportGuard,
    ) -> Vec<Binding> {
        let Some(data) = self.module(module) else {
            return Vec::new();
        };
        let mut found: Vec<Binding> = data
            .declared(name)
            .iter()
            .copied()
            .filter(|def| self.def(*def).kind.in_namespace(ns))
            .map(|def| Binding {
                def,
                visibility: self.def(def).visibility,
            })
            .collect();
        for (index, import) in data.imports.iter().enumerate() {
            if import.binding_name() != Some(name) {
                continue;
            }
            let owner = ImportOwner::Module(module);
            for def in self.resolve_import(owner, module, index, import, Some(ns), guard) {
                found.push(Binding {
                    def,
                    visibility: import.visibility,
                });
            }
        }
        if !found.is_empty() {
            return dedup(found);
        }

        for (index, import) in data.imports.iter().enumerate() {
            if import.kind != ImportKind::Glob {
                continue;
            }
            let owner = ImportOwner::Module(module);
            found.extend(self.glob_bindings(owner, module, index, import, name, ns, guard));
        }
        dedup(found)
    }

    /// Names a block-level `use` binds.
    pub(crate) fn block_import_lookup(&self, scope: ScopeId, name: &str, ns: Namespace) -> Vec<DefId> {
        let data = self.scope(scope);
        let module = data.module;
        let mut guard = Vec::new();
        let mut found = Vec::new();
        for (index, import) in data.imports.iter().enumerate() {
            let owner = ImportOwner::Block(scope);
            match &import.kind {
                ImportKind::Named { .. } if import.binding_name() == Some(name) => {
                    found.extend(self.resolve_import(owner, module, index, import, Some(ns), &mut guard));
                }
                ImportKind::Glob => found.extend(
                    self.glob_bindings(owner, module, index, import, name, ns, &mut guard)
                        .into_iter()
                        .map(|binding| binding.def),
                ),
                ImportKind::Named { .. } => {}
            }
        }
        found
    }

    fn resolve_import(
        &self,
        owner: ImportOwner,
        from_module: DefId,
        index: usize,
        import: &Import,
        ns: Option<Namespace>,
        guard: &mut ImportGuard,
    ) -> Vec<DefId> {
        if guard.contains(&(owner, index)) {
            return Vec::new();
        }
        guard.push((owner, index));
        let result = self.resolve_import_path(from_module, import.global, &import.path, ns, guard);
        guard.pop();
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn glob_bindings(
        &self,
        owner: ImportOwner,
        from_module: DefId,
        index: usize,
        import: &Import,
        name: &str,
        ns: Namespace,
        guard: &mut ImportGuard,
    ) -> Vec<Binding> {
        if guard.contains(&(owner, index)) {
            return Vec::new();
        }
        guard.push((owner, index));
        let targets = self.resolve_import_path(from_module, import.global, &import.path, None, guard);
        let mut out = Vec::new();
        for target in targets {
            match self.def(target).kind {
                DefKind::Module => {
                    for binding in self.module_bindings(target, name, ns, guard) {
                        if self.is_visible(binding.visibility, target, from_module) {
                            out.push(Binding {
                                def: binding.def,
                                visibility: import.visibility,
                            });
                        }
                    }
                }
                DefKind::Enum => {
                    for variant in self.named_children(target, name) {
                        if self.def(variant).kind.in_namespace(ns) {
                            out.push(Binding {
                                def: variant,
                                visibility: import.visibility,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        guard.pop();
        out
    }

    /// Resolves a `use` path. `ns` filters the last segment; `None` resolves a glob
    /// target, where every segment names a module or enum.
    fn resolve_import_path(
        &self,
        from_module: DefId,
        global: bool,
        segments: &[String],
        ns: Option<Namespace>,
        guard: &mut ImportGuard,
    ) -> Vec<DefId> {
        let Some((first, rest)) = segments.split_first() else {
            return Vec::new();
        };
        let krate = self.def(from_module).krate;
        let mut current: Vec<DefId> = if global {
            self.extern_crate_root(krate, first).into_iter().collect()
        } else {
            match first.as_str() {
                "crate" => vec![self.crate_data(krate).root],
                "self" => vec![from_module],
                "super" => self.parent_module(from_module).into_iter().collect(),
                _ => {
                    let first_ns = if rest.is_empty() {
                        ns.unwrap_or(Namespace::Types)
                    } else {
                        Namespace::Types
                    };
                    let local: Vec<DefId> = self
                        .module_bindings(from_module, first, first_ns, guard)
                        .into_iter()
                        .map(|binding| binding.def)
                        .collect();
                    if local.is_empty() && first_ns == Namespace::Types {
                        self.extern_crate_root(krate, first).into_iter().collect()
                    } else {
                        local
                    }
                }
            }
        };

        for (index, segment) in rest.iter().enumerate() {
            let is_last = index + 1 == rest.len();
            let segment_ns = if is_last {
                ns.unwrap_or(Namespace::Types)
            } else {
                Namespace::Types
            };
            let mut next = Vec::new();
            for owner in current {
                if segment == "super" {
                    next.extend(self.parent_module(owner));
                    continue;
                }
                match self.def(owner).kind {
                    DefKind::Module => next.extend(
                        self.module_bindings(owner, segment, segment_ns, guard)
                            .into_iter()
                            .map(|binding| binding.def),
                    ),
                    DefKind::Enum => next.extend(
                        self.named_children(owner, segment)
                            .into_iter()
                            .filter(|def| self.def(*def).kind.in_namespace(segment_ns)),
                    ),
                    _ => {}
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }

    pub(crate) fn named_children(&self, owner: DefId, name: &str) -> Vec<DefId> {
        self.def(owner)
            .children
            .iter()
            .copied()
            .filter(|child| self.def(*child).name == name)
            .collect()
    }

    pub fn parent_module(&self, module: DefId) -> Option<DefId> {
        self.module(module).and_then(|data| data.parent)
    }

    /// Root module of a dependency visible from `krate` under `name`.
    pub fn extern_crate_root(&self, krate: super::CrateId, name: &str) -> Option<DefId> {
        self.crate_data(krate)
            .deps
            .iter()
            .map(|dep| self.crate_data(*dep))
            .find(|dep| dep.name == name)
            .map(|dep| dep.root)
    }

    /// True when `module` is `ancestor` or nested inside it.
    pub fn is_within(&self, module: DefId, ancestor: DefId) -> bool {
        let mut current = Some(module);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_module(id);
        }
        false
    }

    /// Whether a binding with `visibility` made in `owner_module` can be named from `from_module`.
    pub fn is_visible(&self, visibility: Visibility, owner_module: DefId, from_module: DefId) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Crate => self.def(owner_module).krate == self.def(from_module).krate,
            Visibility::Private => self.is_within(from_module, owner_module),
        }
    }

    /// Every name bound in `module`: declared items, explicit imports, then glob imports
    /// for names not already bound.
    pub fn module_entries(&self, module: DefId) -> Vec<(String, Binding)> {
        self.module_entries_guarded(module, &mut Vec::new())
    }

    fn module_entries_guarded(&self, module: DefId, stack: &mut Vec<DefId>) -> Vec<(String, Binding)> {
        let Some(data) = self.module(module) else {
            return Vec::new();
        };
        if stack.contains(&module) {
            return Vec::new();
        }
        stack.push(module);

        let mut entries: Vec<(String, Binding)> = data
            .items
            .iter()
            .map(|def| {
                let item = self.def(*def);
                (
                    item.name.clone(),
                    Binding {
                        def: *def,
                        visibility: item.visibility,
                    },
                )
            })
            .collect();
        let mut guard = Vec::new();
        for (index, import) in data.imports.iter().enumerate() {
            let Some(name) = import.binding_name() else {
                continue;
            };
            for ns in Namespace::ALL {
                let owner = ImportOwner::Module(module);
                for def in self.resolve_import(owner, module, index, import, Some(ns), &mut guard) {
                    entries.push((
                        name.to_string(),
                        Binding {
                            def,
                            visibility: import.visibility,
                        },
                    ));
                }
            }
        }

        let explicit: FxHashSet<String> = entries.iter().map(|(name, _)| name.clone()).collect();
        for import in data.imports.iter().filter(|import| import.kind == ImportKind::Glob) {
            let targets =
                self.resolve_import_path(module, import.global, &import.path, None, &mut guard);
            for target in targets {
                let inherited: Vec<(String, Binding)> = match self.def(target).kind {
                    DefKind::Module => self
                        .module_entries_guarded(target, stack)
                        .into_iter()
                        .filter(|(_, binding)| self.is_visible(binding.visibility, target, module))
                        .collect(),
                    DefKind::Enum => self
                        .def(target)
                        .children
                        .iter()
                        .map(|variant| {
                            (
                                self.def(*variant).name.clone(),
                                Binding {
                                    def: *variant,
                                    visibility: Visibility::Public,
                                },
                            )
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                for (name, binding) in inherited {
                    if !explicit.contains(&name) {
                        entries.push((
                            name,
                            Binding {
                                def: binding.def,
                                visibility: import.visibility,
                            },
                        ));
                    }
                }
            }
        }

        stack.pop();
        let mut seen = FxHashSet::default();
        entries.retain(|(name, binding)| seen.insert((name.clone(), binding.def)));
        entries
    }

    /// Shortest `use` path naming `target` from `dest_module`, honouring visibility.
    /// Same-crate paths start with `crate`, others with the dependency's name.
    pub fn import_path(&self, target: DefId, dest_module: DefId) -> Option<Vec<String>> {
        let krate = self.def(dest_module).krate;
        let target_parent = self.def(target).parent;
        let mut queue = VecDeque::new();
        let mut seen = FxHashSet::default();
        queue.push_back((self.crate_data(krate).root, vec!["crate".to_string()]));
        for dep in &self.crate_data(krate).deps {
            let dep = self.crate_data(*dep);
            queue.push_back((dep.root, vec![dep.name.clone()]));
        }

        while let Some((module, path)) = queue.pop_front() {
            if !seen.insert(module) {
                continue;
            }
            for (name, binding) in self.module_entries(module) {
                if !self.is_visible(binding.visibility, module, dest_module) {
                    continue;
                }
                let def = binding.def;
                if def == target {
                    let mut found = path.clone();
                    found.push(name);
                    return Some(found);
                }
                match self.def(def).kind {
                    DefKind::Module if !seen.contains(&def) => {
                        let mut next = path.clone();
                        next.push(name);
                        queue.push_back((def, next));
                    }
                    DefKind::Enum if target_parent == Some(def) => {
                        let mut found = path.clone();
                        found.push(name);
                        found.push(self.def(target).name.clone());
                        return Some(found);
                    }
                    _ => {}
                }
            }
        }
        None
    }

    /// Path from the crate root to `def`, excluding the root itself.
    pub fn crate_relative_path(&self, def: DefId) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = Some(def);
        while let Some(id) = current {
            let data = self.def(id);
            if data.parent.is_none() && matches!(data.kind, DefKind::Module) {
                break;
            }
            if !data.name.is_empty() {
                segments.push(data.name.clone());
            }
            current = data.parent;
        }
        segments.reverse();
        segments
    }
}

fn dedup(bindings: Vec<Binding>) -> Vec<Binding> {
    let mut seen = FxHashSet::default();
    bindings
        .into_iter()
        .filter(|binding| seen.insert(binding.def))
        .collect()
}
