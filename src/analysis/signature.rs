use super::diagnostic::{Diagnostic, DiagnosticCode, FixKind, SuggestedFix, TextEdit};
use crate::{
    language::{
        ast::{Expr, FnDef, LitKind, Pattern, UnaryOp},
        span::Span,
        types::TypeExpr,
    },
    render::{ImportingRenderer, Renderer},
    resolve::{DefId, DefKind, FileId, Namespace, Resolver},
};
use tracing::trace;

const MAX_INFER_DEPTH: usize = 32;

const INTEGERS: [&str; 12] = [
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];

/// Type of an argument expression, as far as it can be told without inference.
#[derive(Clone, Debug)]
struct ArgumentType {
    ty: TypeExpr,
    /// Unsuffixed literals fit any type of their family.
    family: Option<LiteralFamily>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LiteralFamily {
    Integer,
    Float,
}

impl ArgumentType {
    fn exact(ty: TypeExpr) -> Self {
        Self { ty, family: None }
    }
}

fn shared_ref(inner: TypeExpr) -> TypeExpr {
    TypeExpr::Ref {
        lifetime: None,
        mutable: false,
        inner: Box::new(inner),
        span: Span::default(),
    }
}

fn argument_type(resolver: &Resolver<'_>, expr: &Expr, depth: usize) -> Option<ArgumentType> {
    if depth > MAX_INFER_DEPTH {
        return None;
    }
    let ws = resolver.workspace();
    match expr {
        Expr::Literal(lit) => Some(match &lit.kind {
            LitKind::Int { suffix: Some(suffix), .. } => ArgumentType::exact(TypeExpr::named(suffix.as_str())),
            LitKind::Int { suffix: None, .. } => ArgumentType {
                ty: TypeExpr::named("i32"),
                family: Some(LiteralFamily::Integer),
            },
            LitKind::Float(text) if text.ends_with("f32") => ArgumentType::exact(TypeExpr::named("f32")),
            LitKind::Float(text) if text.ends_with("f64") => ArgumentType::exact(TypeExpr::named("f64")),
            LitKind::Float(_) => ArgumentType {
                ty: TypeExpr::named("f64"),
                family: Some(LiteralFamily::Float),
            },
            LitKind::Bool(_) => ArgumentType::exact(TypeExpr::named("bool")),
            LitKind::Char(_) => ArgumentType::exact(TypeExpr::named("char")),
            LitKind::Byte(_) => ArgumentType::exact(TypeExpr::named("u8")),
            LitKind::Str(_) => ArgumentType::exact(shared_ref(TypeExpr::named("str"))),
            LitKind::ByteStr(_) => return None,
        }),
        Expr::Path(path) => {
            let def = resolver.resolve(path).first_in(Namespace::Values)?;
            match &ws.def(def).kind {
                DefKind::Local { ty: Some(ty), .. } | DefKind::Const { ty: Some(ty), .. } => {
                    Some(ArgumentType::exact(ty.clone()))
                }
                DefKind::Local { init: Some(init), .. } => argument_type(resolver, init, depth + 1),
                DefKind::Struct { .. } if ws.def(def).generics.is_empty() => {
                    Some(ArgumentType::exact(TypeExpr::Path(path.clone())))
                }
                _ => None,
            }
        }
        Expr::Struct { path, .. } => {
            let def = resolver.resolve(path).first_in(Namespace::Types)?;
            match ws.def(def).kind {
                DefKind::Struct { .. } if ws.def(def).generics.is_empty() => {
                    Some(ArgumentType::exact(TypeExpr::Path(path.clone())))
                }
                _ => None,
            }
        }
        Expr::Call { callee, .. } => {
            let Expr::Path(path) = callee.as_ref() else {
                return None;
            };
            let def = resolver.resolve(path).first_in(Namespace::Values)?;
            match &ws.def(def).kind {
                DefKind::Fn(signature) if ws.def(def).generics.is_empty() => {
                    let ret = signature.ret.as_ref()?;
                    let head = resolver.type_head(ret)?;
                    (!matches!(ws.def(head).kind, DefKind::SelfType)).then(|| ArgumentType::exact(ret.clone()))
                }
                DefKind::Struct { .. } if ws.def(def).generics.is_empty() => {
                    Some(ArgumentType::exact(TypeExpr::Path(path.clone())))
                }
                _ => None,
            }
        }
        Expr::Unary {
            op: op @ (UnaryOp::Ref | UnaryOp::RefMut),
            expr,
            span,
        } => {
            let inner = argument_type(resolver, expr, depth + 1)?;
            Some(ArgumentType {
                ty: TypeExpr::Ref {
                    lifetime: None,
                    mutable: matches!(op, UnaryOp::RefMut),
                    inner: Box::new(inner.ty),
                    span: *span,
                },
                family: inner.family,
            })
        }
        Expr::Paren(inner, _) => argument_type(resolver, inner, depth + 1),
        Expr::Cast { ty, .. } => Some(ArgumentType::exact(ty.clone())),
        Expr::Block { block, .. } => block
            .tail
            .as_deref()
            .and_then(|tail| argument_type(resolver, tail, depth + 1)),
        _ => None,
    }
}

/// Splits off `&`/`*` layers, counting them.
fn peel(ty: &TypeExpr) -> (usize, &TypeExpr) {
    let mut depth = 0;
    let mut current = ty;
    while let TypeExpr::Ref { inner, .. } | TypeExpr::Ptr { inner, .. } = current {
        depth += 1;
        current = inner;
    }
    (depth, current)
}

/// Whether the nominal types clearly differ. Generic parameters, `Self` and
/// anything unresolved never count as a mismatch.
fn mismatched(resolver: &Resolver<'_>, expected: &TypeExpr, actual: &ArgumentType) -> bool {
    let ws = resolver.workspace();
    let (expected_depth, expected_inner) = peel(expected);
    let (actual_depth, actual_inner) = peel(&actual.ty);
    let (Some(expected_head), Some(actual_head)) = (
        resolver.type_head(expected_inner),
        resolver.type_head(actual_inner),
    ) else {
        return false;
    };
    if !matches!(
        ws.def(expected_head).kind,
        DefKind::Primitive | DefKind::Struct { .. } | DefKind::Enum
    ) {
        return false;
    }
    if expected_depth > 0 && actual_depth > 0 {
        // deref coercion: `&&T` to `&T`, `&String` to `&str`, `&Box<T>` to `&T`
        let actual_data = ws.def(actual_head);
        if actual_depth > expected_depth
            || (actual_data.krate == ws.std_crate() && matches!(actual_data.kind, DefKind::Struct { .. }))
        {
            return false;
        }
    }
    if expected_depth != actual_depth {
        return true;
    }
    let expected_name = ws.def(expected_head).name.as_str();
    match actual.family {
        Some(LiteralFamily::Integer) if INTEGERS.contains(&expected_name) => false,
        Some(LiteralFamily::Float) if matches!(expected_name, "f32" | "f64") => false,
        _ => expected_head != actual_head,
    }
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn fix_title(signature: &FnDef, index: usize, rendered: &str) -> String {
    let callable = if signature.self_param.is_some() {
        "method"
    } else {
        "function"
    };
    let parameter = match &signature.params[index].pattern {
        Pattern::Ident { name, .. } => format!("parameter `{}`", name.name),
        _ => format!("`{}` parameter", ordinal(index + 1)),
    };
    format!(
        "Change type of {parameter} of {callable} `{}` to `{rendered}`",
        signature.name.name
    )
}

/// Offset right after the opening brace of the module holding `function`,
/// or the start of its file.
fn import_offset(resolver: &Resolver<'_>, function: DefId) -> Option<usize> {
    let ws = resolver.workspace();
    let module = ws.module_of(function);
    let file = ws.file(ws.def(function).file);
    if file.module == module {
        return Some(0);
    }
    // the module's span covers its name; the body brace follows it
    let name_end = ws.def(module).span.end;
    let rest = file.source.get(name_end..)?;
    let brace = rest.find(|c: char| !c.is_whitespace())?;
    if !rest[brace..].starts_with('{') {
        return None;
    }
    Some(name_end + brace + 1)
}

fn change_parameter_type(
    resolver: &Resolver<'_>,
    function: DefId,
    index: usize,
    actual: &TypeExpr,
) -> Option<SuggestedFix> {
    let ws = resolver.workspace();
    let data = ws.def(function);
    if data.krate == ws.std_crate() {
        return None;
    }
    let signature = resolver.signature(function)?;
    let param = signature.params.get(index)?;
    let dest = ws.module(ws.module_of(function))?.scope;
    let mut renderer = ImportingRenderer::new(resolver, dest);
    let rendered = renderer.render_type(actual);
    let mut edits = vec![TextEdit::replace(data.file, param.ty.span(), rendered.clone())];
    let requirements = renderer.into_requirements();
    if !requirements.is_empty() {
        let offset = import_offset(resolver, function)?;
        let lines: String = requirements
            .iter()
            .map(|requirement| format!("{}\n", requirement.use_text()))
            .collect();
        edits.push(TextEdit::insert(data.file, offset, lines));
    }
    Some(SuggestedFix::new(
        FixKind::ChangeParameterType,
        fix_title(signature, index, &rendered),
        edits,
    ))
}

/// Compares each argument of a call against the declared parameter type.
pub(super) fn check_arguments(resolver: &Resolver<'_>, file: FileId, expr: &Expr) -> Vec<Diagnostic> {
    let Some(site) = resolver.call_site(expr) else {
        return Vec::new();
    };
    let Some(signature) = resolver.signature(site.function) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (arg_index, arg) in site.args.iter().enumerate() {
        let Some(index) = site.parameter_index(arg_index) else {
            continue;
        };
        let Some(param) = signature.params.get(index) else {
            continue;
        };
        let Some(actual) = argument_type(resolver, arg, 0) else {
            continue;
        };
        if !mismatched(resolver, &param.ty, &actual) {
            continue;
        }
        let expected_text = Renderer::new(resolver).render_type(&param.ty);
        let actual_text = Renderer::new(resolver).render_type(&actual.ty);
        trace!(
            target: "rustpath::analysis",
            function = %signature.name.name,
            index,
            expected = %expected_text,
            found = %actual_text,
            "argument type mismatch"
        );
        let diagnostic = Diagnostic::new(
            DiagnosticCode::ArgumentTypeMismatch,
            file,
            arg.span(),
            format!("mismatched types: expected `{expected_text}`, found `{actual_text}`"),
        );
        out.push(match change_parameter_type(resolver, site.function, index, &actual.ty) {
            Some(fix) => diagnostic.with_fix(fix),
            None => diagnostic,
        });
    }
    out
}
