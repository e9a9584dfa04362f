use super::{
    arity::name_end,
    diagnostic::{Diagnostic, DiagnosticCode, FixKind, SuggestedFix, TextEdit},
};
use crate::{
    language::{
        span::Span,
        types::{Path, PathSegment},
        visit::PathContext,
    },
    resolve::{DefId, DefKind, FileId, Namespace, Resolver},
};
use rustc_hash::FxHashSet;

const FN_TRAITS: [&str; 3] = ["Fn", "FnMut", "FnOnce"];

/// An associated type declared by a trait or one of its supertraits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssocType {
    pub name: String,
    pub def: DefId,
    /// The trait declaring it.
    pub owner: DefId,
    pub has_default: bool,
}

/// Associated types of `trait_def` and, transitively, of its supertraits.
/// A name declared twice is reported once, nearest trait first.
pub fn assoc_types(resolver: &Resolver<'_>, trait_def: DefId) -> Vec<AssocType> {
    let ws = resolver.workspace();
    let mut out: Vec<AssocType> = Vec::new();
    let mut visited = FxHashSet::default();
    let mut pending = vec![trait_def];
    while let Some(current) = pending.pop() {
        if !visited.insert(current) {
            continue;
        }
        let data = ws.def(current);
        let DefKind::Trait { supertraits } = &data.kind else {
            continue;
        };
        for child in &data.children {
            let child_data = ws.def(*child);
            if let DefKind::TypeAlias { ty, .. } = &child_data.kind {
                if out.iter().all(|known| known.name != child_data.name) {
                    out.push(AssocType {
                        name: child_data.name.clone(),
                        def: *child,
                        owner: current,
                        has_default: ty.is_some(),
                    });
                }
            }
        }
        let mut supers = resolver.bound_traits(supertraits);
        supers.reverse();
        pending.extend(supers);
    }
    out
}

fn is_fn_trait(resolver: &Resolver<'_>, trait_def: DefId) -> bool {
    let ws = resolver.workspace();
    let data = ws.def(trait_def);
    data.krate == ws.std_crate() && FN_TRAITS.contains(&data.name.as_str())
}

/// Contexts where every associated type must be given a value.
fn requires_all_bindings(cx: PathContext) -> bool {
    matches!(cx, PathContext::Type | PathContext::TraitObject)
}

/// Checks the associated type bindings written on a trait path.
pub(super) fn check_bindings(
    resolver: &Resolver<'_>,
    file: FileId,
    path: &Path,
    cx: PathContext,
) -> Vec<Diagnostic> {
    if matches!(cx, PathContext::Expr | PathContext::Other) {
        return Vec::new();
    }
    let Some(segment) = path.last() else {
        return Vec::new();
    };
    if segment.is_self_type() {
        return Vec::new();
    }
    let ws = resolver.workspace();
    let Some(trait_def) = resolver
        .resolve(path)
        .in_namespace(Namespace::Types)
        .find(|def| matches!(ws.def(*def).kind, DefKind::Trait { .. }))
    else {
        return Vec::new();
    };
    let declared = assoc_types(resolver, trait_def);
    let trait_name = &ws.def(trait_def).name;

    let mut out = Vec::new();
    if let Some(args) = &segment.args {
        for binding in args.bindings() {
            if declared.iter().any(|assoc| assoc.name == binding.name) {
                continue;
            }
            let fix = SuggestedFix::new(
                FixKind::RemoveAssocTypeBinding,
                "Remove redundant associated type",
                vec![TextEdit::delete(file, removal_span(segment, binding.span))],
            );
            out.push(
                Diagnostic::new(
                    DiagnosticCode::UnknownAssocTypeBinding,
                    file,
                    binding.span,
                    format!("Associated type `{}` not found for `{trait_name}`", binding.name),
                )
                .with_fix(fix),
            );
        }
    }

    if !requires_all_bindings(cx) || path.qself.is_some() || is_fn_trait(resolver, trait_def) {
        return out;
    }
    let bound: FxHashSet<&str> = segment
        .args
        .iter()
        .flat_map(|args| args.bindings())
        .map(|binding| binding.name.as_str())
        .collect();
    let mut missing: Vec<&AssocType> = declared
        .iter()
        .filter(|assoc| !assoc.has_default && !bound.contains(assoc.name.as_str()))
        .collect();
    if missing.is_empty() {
        return out;
    }
    missing.sort_by(|a, b| a.name.cmp(&b.name));

    let listed = missing
        .iter()
        .map(|assoc| format!("`{}` (from trait `{}`)", assoc.name, ws.def(assoc.owner).name))
        .collect::<Vec<_>>()
        .join(", ");
    let names: Vec<&str> = missing.iter().map(|assoc| assoc.name.as_str()).collect();
    let fix = SuggestedFix::new(
        FixKind::AddAssocTypeBindings,
        "Add missing associated types",
        vec![add_bindings(file, segment, &names)],
    );
    out.push(
        Diagnostic::new(
            DiagnosticCode::MissingAssocTypeBindings,
            file,
            path.span,
            format!("The value of the associated types {listed} must be specified"),
        )
        .with_fix(fix),
    );
    out
}

/// The binding with the comma separating it from a neighbour, or the whole
/// argument list when it is the only argument.
fn removal_span(segment: &PathSegment, binding: Span) -> Span {
    let Some(args) = &segment.args else {
        return binding;
    };
    let position = args.args.iter().position(|arg| arg.span() == binding);
    match position {
        Some(_) if args.args.len() == 1 => Span::new(name_end(segment), args.span.end),
        Some(index) if index + 1 < args.args.len() => {
            Span::new(binding.start, args.args[index + 1].span().start)
        }
        Some(index) if index > 0 => Span::new(args.args[index - 1].span().end, binding.end),
        _ => binding,
    }
}

fn add_bindings(file: FileId, segment: &PathSegment, names: &[&str]) -> TextEdit {
    let bindings = names
        .iter()
        .map(|name| format!("{name}=()"))
        .collect::<Vec<_>>()
        .join(", ");
    let edit = match &segment.args {
        Some(args) => match args.args.last() {
            Some(last) => TextEdit::insert(file, last.span().end, format!(", {bindings}")),
            None => TextEdit::insert(file, args.span.start + 1, bindings),
        },
        None => TextEdit::insert(file, name_end(segment), format!("<{bindings}>")),
    };
    edit.with_placeholders("()")
}

