use super::diagnostic::{Diagnostic, DiagnosticCode, FixKind, SuggestedFix, TextEdit};
use crate::{
    language::{
        span::Span,
        types::{NodeId, Path},
    },
    resolve::{FileId, Resolver},
};

const PATH_KEYWORDS: [&str; 3] = ["crate", "self", "super"];

/// The shortest suffix of `path` that resolves to the same item where the path
/// is written, as the number of segments kept. The path itself is never offered.
pub fn shortest_equivalent_suffix(resolver: &Resolver<'_>, path: &Path) -> Option<usize> {
    if path.qself.is_some() || !path.has_qualifier() {
        return None;
    }
    let target = resolver.resolve(path).primary()?;
    let scope = resolver.scope_for(path);
    let len = path.segments.len();
    let longest = if path.global { len } else { len - 1 };
    (1..=longest).find(|&kept| {
        let removed = &path.segments[..len - kept];
        if removed
            .iter()
            .any(|segment| segment.args.is_some() || segment.fn_sugar.is_some())
        {
            return false;
        }
        if PATH_KEYWORDS.contains(&path.segments[len - kept].name.as_str()) {
            return false;
        }
        let candidate = Path {
            id: NodeId::DETACHED,
            qself: None,
            global: false,
            segments: path.segments[len - kept..].to_vec(),
            span: path.span,
        };
        resolver.resolve_in(&candidate, scope).primary() == Some(target)
    })
}

pub(super) fn check_path(resolver: &Resolver<'_>, file: FileId, path: &Path) -> Option<Diagnostic> {
    let kept = shortest_equivalent_suffix(resolver, path)?;
    let first_kept = &path.segments[path.segments.len() - kept];
    let prefix = Span::new(path.span.start, first_kept.span.start);
    let fix = SuggestedFix::new(
        FixKind::RemovePathPrefix,
        "Remove unnecessary path prefix",
        vec![TextEdit::delete(file, prefix)],
    );
    Some(
        Diagnostic::new(
            DiagnosticCode::UnnecessaryQualification,
            file,
            prefix,
            "Unnecessary qualification",
        )
        .with_fix(fix),
    )
}
