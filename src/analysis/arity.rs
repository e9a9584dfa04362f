use super::diagnostic::{Diagnostic, DiagnosticCode, FixKind, SuggestedFix, TextEdit};
use crate::{
    language::{
        span::Span,
        types::{GenericArg, GenericArgs, Path, PathSegment},
    },
    resolve::{DefId, DefKind, FileId, Namespace, Resolver, Workspace},
};
use std::fmt;

/// Generic parameter counts of a declaration. Lifetimes are not counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenericDeclaration {
    /// Parameters without a default.
    pub required: usize,
    pub total: usize,
}

impl GenericDeclaration {
    pub fn new(required: usize, total: usize) -> Self {
        Self { required, total }
    }

    pub fn of(ws: &Workspace, decl: DefId) -> Self {
        let mut counts = Self::new(0, 0);
        for param in &ws.def(decl).generics {
            let has_default = match &ws.def(*param).kind {
                DefKind::TypeParam { default, .. } => default.is_some(),
                DefKind::ConstParam { default, .. } => default.is_some(),
                _ => continue,
            };
            counts.total += 1;
            if !has_default {
                counts.required += 1;
            }
        }
        counts
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArityVerdict {
    Exact,
    TooFew { required: usize, provided: usize },
    TooMany { max: usize, provided: usize },
    /// Arguments given to a declaration without generic parameters.
    NoParametersExpected { provided: usize },
}

pub fn check_arity(decl: GenericDeclaration, provided: usize) -> ArityVerdict {
    if decl.total == 0 && provided > 0 {
        ArityVerdict::NoParametersExpected { provided }
    } else if provided < decl.required {
        ArityVerdict::TooFew {
            required: decl.required,
            provided,
        }
    } else if provided > decl.total {
        ArityVerdict::TooMany {
            max: decl.total,
            provided,
        }
    } else {
        ArityVerdict::Exact
    }
}

/// Where generic arguments were written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UseSite {
    TypePosition,
    MethodCall,
    Call,
}

impl UseSite {
    fn code(self, verdict: ArityVerdict) -> Option<DiagnosticCode> {
        match (self, verdict) {
            (_, ArityVerdict::Exact) => None,
            (UseSite::TypePosition, ArityVerdict::TooFew { .. }) => {
                Some(DiagnosticCode::TooFewTypeArgsTypePos)
            }
            (UseSite::TypePosition, _) => Some(DiagnosticCode::TooManyTypeArgsTypePos),
            // inferred unless a turbofish is written
            (UseSite::MethodCall, ArityVerdict::TooFew { provided, .. }) => {
                (provided > 0).then_some(DiagnosticCode::TooFewTypeArgsMethod)
            }
            (UseSite::MethodCall, _) => Some(DiagnosticCode::TooManyTypeArgsMethod),
            (UseSite::Call, ArityVerdict::TooFew { .. }) => None,
            (UseSite::Call, _) => Some(DiagnosticCode::TooManyTypeArgsCall),
        }
    }
}

/// The expected count as phrased in messages.
struct Expected(GenericDeclaration, ArityVerdict);

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Expected(decl, verdict) = self;
        let exact = decl.required == decl.total;
        match verdict {
            ArityVerdict::TooFew { required, .. } if !exact => write!(f, "at least {required}"),
            ArityVerdict::TooMany { max, .. } if !exact => write!(f, "at most {max}"),
            ArityVerdict::NoParametersExpected { .. } => write!(f, "0"),
            _ => write!(f, "{}", decl.total),
        }
    }
}

fn is_generic_declaration(kind: &DefKind) -> bool {
    matches!(
        kind,
        DefKind::Struct { .. }
            | DefKind::Enum
            | DefKind::TypeAlias { .. }
            | DefKind::Trait { .. }
            | DefKind::Fn(_)
    )
}

/// End of the segment's name, where an argument list starts.
pub(super) fn name_end(segment: &PathSegment) -> usize {
    segment.span.start + segment.name.len()
}

/// Checks a path written in type position. `Fn(..)` sugar and `Self` are skipped.
pub(super) fn check_type_path(resolver: &Resolver<'_>, file: FileId, path: &Path) -> Option<Diagnostic> {
    let segment = path.last()?;
    if segment.fn_sugar.is_some() || segment.is_self_type() {
        return None;
    }
    let decl = resolver.resolve(path).first_in(Namespace::Types)?;
    check_segment(resolver, file, decl, segment, path.span, UseSite::TypePosition)
}

/// Checks the turbofish of a called path.
pub(super) fn check_call(resolver: &Resolver<'_>, file: FileId, callee: &Path) -> Option<Diagnostic> {
    let segment = callee.last()?;
    let decl = resolver.resolve(callee).primary()?;
    check_segment(resolver, file, decl, segment, callee.span, UseSite::Call)
}

pub(super) fn check_method_call(
    resolver: &Resolver<'_>,
    file: FileId,
    method: DefId,
    segment: &PathSegment,
) -> Option<Diagnostic> {
    check_segment(resolver, file, method, segment, segment.span, UseSite::MethodCall)
}

fn check_segment(
    resolver: &Resolver<'_>,
    file: FileId,
    decl: DefId,
    segment: &PathSegment,
    span: Span,
    site: UseSite,
) -> Option<Diagnostic> {
    let ws = resolver.workspace();
    if !is_generic_declaration(&ws.def(decl).kind) {
        return None;
    }
    let counts = GenericDeclaration::of(ws, decl);
    let provided = segment.args.as_ref().map_or(0, GenericArgs::positional_count);
    let verdict = check_arity(counts, provided);
    let code = site.code(verdict)?;
    let message = format!(
        "Wrong number of type arguments: expected {}, found {provided}",
        Expected(counts, verdict)
    );
    let diagnostic = Diagnostic::new(code, file, span, message);
    Some(match fix_for(file, segment, verdict, site) {
        Some(fix) => diagnostic.with_fix(fix),
        None => diagnostic,
    })
}

fn fix_for(file: FileId, segment: &PathSegment, verdict: ArityVerdict, site: UseSite) -> Option<SuggestedFix> {
    match verdict {
        ArityVerdict::NoParametersExpected { .. } => {
            let args = segment.args.as_ref()?;
            let span = Span::new(name_end(segment), args.span.end);
            Some(SuggestedFix::new(
                FixKind::RemoveTypeArguments,
                "Remove all type arguments",
                vec![TextEdit::delete(file, span)],
            ))
        }
        ArityVerdict::TooFew { required, provided } => {
            let edit = add_placeholders(file, segment, required - provided, site);
            Some(SuggestedFix::new(
                FixKind::AddTypeArguments,
                "Add missing type arguments",
                vec![edit],
            ))
        }
        ArityVerdict::TooMany { .. } | ArityVerdict::Exact => None,
    }
}

/// Inserts `missing` `_` arguments after the last type or const argument, else after
/// the last lifetime, else at the start of the list.
fn add_placeholders(file: FileId, segment: &PathSegment, missing: usize, site: UseSite) -> TextEdit {
    let placeholders = vec!["_"; missing].join(", ");
    let Some(args) = &segment.args else {
        let open = if site == UseSite::TypePosition { "<" } else { "::<" };
        return TextEdit::insert(file, name_end(segment), format!("{open}{placeholders}>"))
            .with_placeholders("_");
    };
    let anchor = args
        .positional()
        .last()
        .or_else(|| args.args.iter().filter(|arg| matches!(arg, GenericArg::Lifetime(_))).last());
    match anchor {
        Some(anchor) => TextEdit::insert(file, anchor.span().end, format!(", {placeholders}")),
        None if args.args.is_empty() => TextEdit::insert(file, args.span.start + 1, placeholders),
        None => TextEdit::insert(file, args.span.start + 1, format!("{placeholders}, ")),
    }
    .with_placeholders("_")
}
