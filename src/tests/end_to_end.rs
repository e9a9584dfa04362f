use crate::{
    analysis::{apply_edits, check_crate, CheckOptions, DiagnosticCode},
    language::{
        ast::{Expr, Pattern},
        visit::{walk_file, Visitor},
    },
    render::{render, RenderOptions},
    resolve::{CrateId, ResolveCache, Resolver, Workspace},
    ty::{expand_aliases, Substitution},
};

fn workspace(source: &str) -> (Workspace, CrateId) {
    let mut ws = Workspace::new().expect("std");
    let krate = ws
        .add_crate("demo", "demo/lib.rs", source, &[])
        .expect("crate");
    (ws, krate)
}

fn calls(ws: &Workspace, krate: CrateId) -> Vec<&Expr> {
    struct Calls<'a>(Vec<&'a Expr>);
    impl<'a> Visitor<'a> for Calls<'a> {
        fn visit_expr(&mut self, expr: &'a Expr) {
            if matches!(expr, Expr::Call { .. }) {
                self.0.push(expr);
            }
        }
    }
    let mut calls = Calls(Vec::new());
    walk_file(&ws.file(ws.crate_data(krate).root_file).syntax, &mut calls);
    calls.0
}

const MISMATCH: &str = "fn foo(a: u32) {}\nfn main() {\n    foo(true);\n}\n";

#[test]
fn call_argument_resolves_to_its_parameter() {
    let (ws, krate) = workspace(MISMATCH);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);

    let calls = calls(&ws, krate);
    assert_eq!(calls.len(), 1);
    let site = resolver.call_site(calls[0]).expect("call site");
    assert_eq!(ws.def(site.function).name, "foo");
    assert_eq!(site.parameter_index(0), Some(0));
    assert_eq!(site.parameter_index(1), None);

    let signature = resolver.signature(site.function).expect("signature");
    let Pattern::Ident { name, .. } = &signature.params[0].pattern else {
        panic!("expected an ident parameter");
    };
    assert_eq!(name.name, "a");
}

#[test]
fn mismatched_argument_suggests_the_argument_type() {
    let (ws, krate) = workspace(MISMATCH);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);

    let diagnostics = check_crate(&resolver, krate, CheckOptions::default());
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.code, DiagnosticCode::ArgumentTypeMismatch);
    assert_eq!(diagnostic.message, "mismatched types: expected `u32`, found `bool`");
    assert_eq!(&MISMATCH[diagnostic.span.range()], "true");

    let fix = diagnostic.fix.as_ref().expect("fix");
    assert_eq!(fix.title, "Change type of parameter `a` of function `foo` to `bool`");
    let fixed = apply_edits(MISMATCH, &fix.edits);
    assert!(fixed.starts_with("fn foo(a: bool) {}"), "{fixed}");

    let (ws, krate) = workspace(&fixed);
    let cache = ResolveCache::new();
    assert!(check_crate(&Resolver::new(&ws, &cache), krate, CheckOptions::default()).is_empty());
}

#[test]
fn alias_chains_render_through_their_targets() {
    let (mut ws, krate) = workspace("type A<T> = T;\ntype B<T> = A<T>;\n");
    let scope = ws.crate_root_scope(krate);
    let ty = ws.parse_type_at("B<u32>", scope).expect("type");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);

    let expanded = expand_aliases(&resolver, &ty);
    let rendered = render(&resolver, &expanded, Substitution::new(), RenderOptions::default(), None);
    assert_eq!(rendered.text, "u32");
    let unexpanded = render(&resolver, &ty, Substitution::new(), RenderOptions::default(), None);
    assert_eq!(unexpanded.text, "B<u32>");
}

#[test]
fn one_import_covers_repeated_references() {
    let (mut ws, krate) = workspace("mod shapes {\n    pub struct Circle;\n}\nmod draw {}\n");
    let root = ws.crate_root_scope(krate);
    let ty = ws
        .parse_type_at("(shapes::Circle, Vec<shapes::Circle>)", root)
        .expect("type");
    let draw = ws.find_module(krate, &["draw"]).expect("module");
    let dest = ws.module(draw).expect("module data").scope;
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);

    let rendered = render(&resolver, &ty, Substitution::new(), RenderOptions::default(), Some(dest));
    assert_eq!(rendered.text, "(Circle, Vec<Circle>)");
    assert_eq!(rendered.imports.len(), 1);
    assert_eq!(rendered.imports[0].use_text(), "use crate::shapes::Circle;");
}
