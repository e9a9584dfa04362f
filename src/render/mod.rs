mod importing;
pub mod literal;
mod renderer;
#[cfg(test)]
mod tests;

pub use importing::{ImportRequirement, ImportingRenderer};
pub use renderer::{RenderOptions, Renderer};

use crate::{
    language::types::TypeExpr,
    resolve::{Resolver, ScopeId},
    ty::Substitution,
};
use tracing::debug;

/// Text of one rendering pass and the imports it needs at its destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub imports: Vec<ImportRequirement>,
}

/// Renders `ty` through `subst`. With a destination scope, names are made to resolve
/// there and missing imports are reported.
pub fn render(
    resolver: &Resolver<'_>,
    ty: &TypeExpr,
    subst: Substitution,
    options: RenderOptions,
    dest: Option<ScopeId>,
) -> Rendered {
    let rendered = match dest {
        Some(dest) => {
            let mut renderer = ImportingRenderer::new(resolver, dest)
                .with_options(options)
                .with_substitution(subst);
            let text = renderer.render_type(ty);
            Rendered {
                text,
                imports: renderer.into_requirements(),
            }
        }
        None => {
            let mut renderer = Renderer::new(resolver)
                .with_options(options)
                .with_substitution(subst);
            Rendered {
                text: renderer.render_type(ty),
                imports: Vec::new(),
            }
        }
    };
    debug!(target: "rustpath::render", text = %rendered.text, imports = rendered.imports.len(), "rendered type");
    rendered
}
