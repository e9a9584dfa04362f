use super::renderer::{RenderOptions, Renderer};
use crate::{
    language::{ast::FnDef, types::{Path, TypeExpr}},
    resolve::{DefId, DefKind, Resolver, ScopeId, Workspace},
    ty::Substitution,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// A `use` item the rendered text needs at its destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRequirement {
    pub target: DefId,
    pub path: Vec<String>,
}

impl ImportRequirement {
    pub fn use_text(&self) -> String {
        format!("use {};", self.path.join("::"))
    }
}

pub(super) struct ImportState {
    scope: ScopeId,
    module: DefId,
    visible: Option<Vec<(String, DefId)>>,
    requirements: Vec<ImportRequirement>,
    recorded: FxHashSet<DefId>,
    claimed: FxHashMap<String, DefId>,
}

impl ImportState {
    fn new(ws: &Workspace, scope: ScopeId) -> Self {
        Self {
            scope,
            module: ws.scope(scope).module,
            visible: None,
            requirements: Vec::new(),
            recorded: FxHashSet::default(),
            claimed: FxHashMap::default(),
        }
    }
}

/// Renders for insertion at a destination scope, reusing names visible there and
/// collecting the imports the text needs.
pub struct ImportingRenderer<'a, 'w> {
    renderer: Renderer<'a, 'w>,
}

impl<'a, 'w> ImportingRenderer<'a, 'w> {
    pub fn new(resolver: &'a Resolver<'w>, dest: ScopeId) -> Self {
        let mut renderer = Renderer::new(resolver);
        renderer.imports = Some(ImportState::new(resolver.workspace(), dest));
        Self { renderer }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.renderer = self.renderer.with_options(options);
        self
    }

    pub fn with_substitution(mut self, subst: Substitution) -> Self {
        self.renderer = self.renderer.with_substitution(subst);
        self
    }

    pub fn render_type(&mut self, ty: &TypeExpr) -> String {
        self.renderer.render_type(ty)
    }

    pub fn render_path(&mut self, path: &Path) -> String {
        self.renderer.render_path(path)
    }

    pub fn render_fn_signature(&mut self, def: &FnDef) -> String {
        self.renderer.render_fn_signature(def)
    }

    pub fn requirements(&self) -> &[ImportRequirement] {
        self.renderer
            .imports
            .as_ref()
            .map(|state| state.requirements.as_slice())
            .unwrap_or_default()
    }

    pub fn into_requirements(self) -> Vec<ImportRequirement> {
        self.renderer
            .imports
            .map(|state| state.requirements)
            .unwrap_or_default()
    }
}

/// Module-level items that can be named by a `use` item. Items declared in a
/// function body are only visible inside it.
fn is_importable(ws: &Workspace, def: DefId) -> bool {
    let data = ws.def(def);
    let module_level = data
        .parent
        .map_or(true, |parent| matches!(ws.def(parent).kind, DefKind::Module));
    module_level
        && matches!(
            data.kind,
            DefKind::Struct { .. }
                | DefKind::Enum
                | DefKind::Trait { .. }
                | DefKind::TypeAlias { .. }
                | DefKind::Fn(_)
                | DefKind::Const { .. }
        )
}

impl Renderer<'_, '_> {
    /// Writes `path` as the destination should spell it. Returns false when the path
    /// does not name an importable item (or a member of one) and must be written as is.
    pub(super) fn write_imported_path(&mut self, out: &mut String, path: &Path) -> bool {
        let resolver = self.resolver;
        let ws = resolver.workspace();
        let Some(target) = resolver.resolve(path).primary() else {
            return false;
        };
        let Some(last) = path.last() else {
            return false;
        };

        if is_importable(ws, target) {
            let name = self.import_name(target);
            out.push_str(&name);
            let const_types = self.const_param_types(path);
            self.write_segment_args(out, last, const_types.as_deref());
            return true;
        }

        let len = path.segments.len();
        if len < 2 {
            return false;
        }
        let Some(owner) = resolver.resolve_prefix(path, len - 1).primary() else {
            return false;
        };
        if !is_importable(ws, owner) || matches!(ws.def(owner).kind, DefKind::Fn(_) | DefKind::Const { .. }) {
            return false;
        }
        let name = self.import_name(owner);
        out.push_str(&name);
        self.write_segment_args(out, &path.segments[len - 2], None);
        out.push_str("::");
        self.write_segment(out, last, None);
        true
    }

    /// The name `target` goes by at the destination, recording an import when needed.
    fn import_name(&mut self, target: DefId) -> String {
        let resolver = self.resolver;
        let ws = resolver.workspace();
        let name = ws.def(target).name.clone();
        let Some(state) = self.imports.as_mut() else {
            return name;
        };

        if state.recorded.contains(&target) {
            return name;
        }
        let here = resolver.resolve_in(&Path::single(name.as_str()), state.scope);
        if here.defs().any(|def| def == target) {
            return name;
        }
        let scope = state.scope;
        let visible = state
            .visible
            .get_or_insert_with(|| resolver.visible_type_names(scope));
        if let Some((alias, _)) = visible.iter().find(|(_, def)| *def == target) {
            return alias.clone();
        }

        let full = match ws.import_path(target, state.module) {
            Some(path) => path,
            None => {
                let krate = ws.crate_data(ws.def(target).krate);
                let head = if krate.id == ws.scope(scope).krate {
                    "crate".to_string()
                } else {
                    krate.name.clone()
                };
                let mut path = vec![head];
                path.extend(ws.crate_relative_path(target));
                return path.join("::");
            }
        };

        let conflict = ws
            .def(target)
            .kind
            .namespaces()
            .iter()
            .any(|ns| here.in_namespace(*ns).any(|def| def != target))
            || state.claimed.get(&name).map_or(false, |claimed| *claimed != target);
        if conflict {
            for start in (0..full.len().saturating_sub(1)).rev() {
                let suffix = &full[start..];
                let candidate = Path::from_segments(suffix.iter().cloned());
                if resolver
                    .resolve_in(&candidate, scope)
                    .defs()
                    .any(|def| def == target)
                {
                    return suffix.join("::");
                }
            }
            return full.join("::");
        }

        trace!(target: "rustpath::render", import = %full.join("::"), "import required");
        state.recorded.insert(target);
        state.claimed.insert(name.clone(), target);
        state.requirements.push(ImportRequirement {
            target,
            path: full,
        });
        name
    }
}
