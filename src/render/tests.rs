use super::{literal, render, ImportingRenderer, RenderOptions, Renderer};
use crate::{
    language::{
        ast::LitKind,
        lexer::lex,
        token::TokenKind,
        types::{Path, TypeExpr},
        visit::collect_paths,
    },
    resolve::{CrateId, DefKind, ResolveCache, Resolver, ScopeId, Workspace},
    ty::{self, Substitution},
};

fn workspace(source: &str) -> (Workspace, CrateId) {
    let mut ws = Workspace::new().expect("std");
    let krate = ws
        .add_crate("demo", "demo/lib.rs", source, &[])
        .expect("crate");
    (ws, krate)
}

fn type_at(ws: &mut Workspace, scope: ScopeId, source: &str) -> TypeExpr {
    ws.parse_type_at(source, scope).expect("parse type")
}

fn crate_type(ws: &Workspace, krate: CrateId, name: &str) -> TypeExpr {
    let path = ws
        .files()
        .filter(|(_, file)| file.krate == krate)
        .flat_map(|(_, file)| collect_paths(&file.syntax))
        .find(|path| path.last_name() == name && path.last().map_or(false, |seg| seg.args.is_some()))
        .cloned()
        .unwrap_or_else(|| panic!("no generic path ending in `{name}`"));
    TypeExpr::Path(path)
}

fn module_scope(ws: &Workspace, krate: CrateId, name: &str) -> ScopeId {
    let module = ws.find_module(krate, &[name]).expect("module");
    ws.module(module).expect("module data").scope
}

fn plain(source: &str) -> String {
    let (mut ws, krate) = workspace("");
    let scope = ws.crate_root_scope(krate);
    let ty = type_at(&mut ws, scope, source);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    Renderer::new(&resolver).render_type(&ty)
}

const CANONICAL: &[(&str, &str)] = &[
    ("( u8 , )", "(u8,)"),
    ("(u8, (), !)", "(u8, (), !)"),
    ("Vec<_>", "Vec<_>"),
    ("&'a mut [u32; 4]", "&'a mut [u32; 4]"),
    ("*const [u8]", "*const [u8]"),
    ("*mut Node", "*mut Node"),
    ("unsafe extern \"C\" fn(x: i32) -> i32", "unsafe extern \"C\" fn(i32) -> i32"),
    (
        "Box<dyn Iterator<Item = u32> + Send + 'static>",
        "Box<dyn Iterator<Item=u32> + Send + 'static>",
    ),
    ("impl Fn(u8, &str) -> bool", "impl Fn(u8, &str) -> bool"),
    ("<T as Iterator>::Item", "<T as Iterator>::Item"),
    ("::core::cell::Cell<u8>", "::core::cell::Cell<u8>"),
    ("Matrix<f32, 3, { N + 1 }, -2>", "Matrix<f32, 3, { N + 1 }, -2>"),
    ("Holder<'a, T, Item = u8>", "Holder<'a, T, Item=u8>"),
    ("vec![u8; 3]", "vec![u8; 3]"),
];

#[test]
fn renders_types_in_canonical_form() {
    for (source, expected) in CANONICAL {
        assert_eq!(plain(source), *expected, "rendering `{source}`");
    }
}

#[test]
fn rendered_types_parse_back_to_the_same_text() {
    for (source, _) in CANONICAL {
        let first = plain(source);
        assert_eq!(plain(&first), first, "re-rendering `{first}`");
    }
}

#[test]
fn lifetimes_can_be_left_out() {
    let (mut ws, krate) = workspace("");
    let scope = ws.crate_root_scope(krate);
    let types = [
        type_at(&mut ws, scope, "&'a Holder<'a, u8>"),
        type_at(&mut ws, scope, "Ref<'static>"),
        type_at(&mut ws, scope, "Box<dyn Fn() + 'static>"),
    ];
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let mut renderer = Renderer::new(&resolver).with_options(RenderOptions {
        render_lifetimes: false,
        ..RenderOptions::default()
    });
    let rendered: Vec<String> = types.iter().map(|ty| renderer.render_type(ty)).collect();
    assert_eq!(rendered, vec!["&Holder<u8>", "Ref", "Box<dyn Fn()>"]);
}

#[test]
fn generic_arguments_render_grouped_by_kind() {
    let (mut ws, krate) = workspace("");
    let scope = ws.crate_root_scope(krate);
    let mixed = type_at(&mut ws, scope, "Mixed<'a, 3, u8, Item = u16>");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    assert_eq!(
        Renderer::new(&resolver).render_type(&mixed),
        "Mixed<'a, u8, 3, Item=u16>"
    );
    let mut no_lifetimes = Renderer::new(&resolver).with_options(RenderOptions {
        render_lifetimes: false,
        ..RenderOptions::default()
    });
    assert_eq!(no_lifetimes.render_type(&mixed), "Mixed<u8, 3, Item=u16>");
}

#[test]
fn alias_chains_collapse_under_substitution() {
    let (ws, krate) = workspace(
        r#"
        type A<T> = T;
        type B<T> = A<T>;
        fn take(value: B<u32>) {}
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let ty = crate_type(&ws, krate, "B");
    let expanded = ty::expand_aliases(&resolver, &ty);
    assert_eq!(Renderer::new(&resolver).render_type(&expanded), "u32");
    assert_eq!(Renderer::new(&resolver).render_type(&ty), "B<u32>");
}

#[test]
fn field_types_render_through_the_use_site_substitution() {
    let (ws, krate) = workspace(
        r#"
        struct Grid<T, const N: usize> {
            cells: [T; N],
        }
        fn take(grid: Grid<u8, { 2 + 1 }>) {}
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let TypeExpr::Path(path) = crate_type(&ws, krate, "Grid") else {
        panic!("expected a path type");
    };
    let (grid, subst) = ty::substitution_for_path(&resolver, &path).expect("substitution");
    let DefKind::Struct { fields } = &ws.def(grid).kind else {
        panic!("expected a struct");
    };
    let field = fields.iter().next().expect("field");
    let rendered = render(&resolver, &field.ty, subst, RenderOptions::default(), None);
    assert_eq!(rendered.text, "[u8; 3]");
    assert!(rendered.imports.is_empty());
}

#[test]
fn unevaluable_const_arguments_render_as_empty_blocks() {
    let (ws, krate) = workspace(
        r#"
        struct Bits<const N: u8>;
        fn take(bits: Bits<{ 200 + 100 }>) {}
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let ty = crate_type(&ws, krate, "Bits");
    let mut folding = Renderer::new(&resolver).with_options(RenderOptions {
        fold_consts: true,
        ..RenderOptions::default()
    });
    assert_eq!(folding.render_type(&ty), "Bits<{}>");
    assert_eq!(
        Renderer::new(&resolver).render_type(&ty),
        "Bits<{ 200 + 100 }>"
    );
}

#[test]
fn const_expressions_keep_their_structure() {
    let (mut ws, krate) = workspace("");
    let scope = ws.crate_root_scope(krate);
    let expr = ws.parse_expr_at("-(1 + 2) * N", scope).expect("parse expr");
    let call = ws.parse_expr_at("size_of::<u8>()", scope).expect("parse expr");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let mut renderer = Renderer::new(&resolver);
    assert_eq!(renderer.render_const_expr(&expr), "-(1 + 2) * N");
    assert_eq!(renderer.render_const_expr(&call), "{}");
}

#[test]
fn function_signatures_render_without_bodies() {
    let (ws, krate) = workspace(
        r#"
        struct Store;
        impl Store {
            pub async fn get<'a, T: Clone + 'a, const N: usize>(&'a self, mut index: usize, _: [T; N]) -> Option<&'a T>
            where
                T: Default,
            {
                None
            }
        }
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let (get, _) = ws
        .defs()
        .find(|(_, data)| {
            data.name == "get" && matches!(data.kind, DefKind::Fn(_)) && ws.file(data.file).krate == krate
        })
        .expect("method");
    let signature = resolver.signature(get).expect("signature");
    let mut renderer = Renderer::new(&resolver);
    assert_eq!(
        renderer.render_fn_signature(signature),
        "async fn get<'a, T: Clone + 'a, const N: usize>(&'a self, mut index: usize, _: [T; N]) -> Option<&'a T> where T: Default"
    );
    assert_eq!(
        renderer.render_value_params(signature),
        "(&'a self, mut index: usize, _: [T; N])"
    );
}

const SHAPES: &str = r#"
    mod shapes {
        pub struct Circle;
        pub struct Pair<A, B>(A, B);
    }
    mod plain {}
    mod aliased {
        use crate::shapes::Circle as Round;
    }
    mod clashing {
        pub struct Circle;
        use crate::shapes;
    }
    mod hidden {
        pub struct Circle;
    }
    fn source(pair: shapes::Pair<shapes::Circle, shapes::Circle>, one: shapes::Circle) {}
"#;

fn shapes_path(ws: &Workspace, krate: CrateId, text: &str) -> Path {
    ws.files()
        .filter(|(_, file)| file.krate == krate)
        .flat_map(|(_, file)| collect_paths(&file.syntax))
        .find(|path| {
            let names: Vec<&str> = path.segments.iter().map(|seg| seg.name.as_str()).collect();
            names.join("::") == text
        })
        .cloned()
        .unwrap_or_else(|| panic!("no path `{text}`"))
}

#[test]
fn importing_records_one_requirement_per_item() {
    let (ws, krate) = workspace(SHAPES);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let pair = shapes_path(&ws, krate, "shapes::Pair");
    let mut renderer = ImportingRenderer::new(&resolver, module_scope(&ws, krate, "plain"));
    assert_eq!(renderer.render_path(&pair), "Pair<Circle, Circle>");
    let imports: Vec<String> = renderer
        .into_requirements()
        .iter()
        .map(|import| import.use_text())
        .collect();
    assert_eq!(
        imports,
        vec!["use crate::shapes::Pair;", "use crate::shapes::Circle;"]
    );
}

#[test]
fn importing_reuses_names_visible_at_the_destination() {
    let (ws, krate) = workspace(SHAPES);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let circle = TypeExpr::Path(shapes_path(&ws, krate, "shapes::Circle"));
    let rendered = render(
        &resolver,
        &circle,
        Substitution::new(),
        RenderOptions::default(),
        Some(module_scope(&ws, krate, "aliased")),
    );
    assert_eq!(rendered.text, "Round");
    assert!(rendered.imports.is_empty());
}

#[test]
fn importing_qualifies_conflicting_names() {
    let (ws, krate) = workspace(SHAPES);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let circle = TypeExpr::Path(shapes_path(&ws, krate, "shapes::Circle"));

    let mut clashing = ImportingRenderer::new(&resolver, module_scope(&ws, krate, "clashing"));
    assert_eq!(clashing.render_type(&circle), "shapes::Circle");
    assert!(clashing.requirements().is_empty());

    let mut hidden = ImportingRenderer::new(&resolver, module_scope(&ws, krate, "hidden"));
    assert_eq!(hidden.render_type(&circle), "crate::shapes::Circle");
    assert!(hidden.requirements().is_empty());
}

#[test]
fn importing_leaves_primitives_and_parameters_alone() {
    let (mut ws, krate) = workspace("mod dest {}");
    let dest = module_scope(&ws, krate, "dest");
    let tuple = type_at(&mut ws, dest, "(u8, bool)");
    let map = type_at(&mut ws, dest, "std::collections::HashMap<u8, String>");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let mut renderer = ImportingRenderer::new(&resolver, dest);
    assert_eq!(renderer.render_type(&tuple), "(u8, bool)");
    assert_eq!(renderer.render_type(&map), "HashMap<u8, String>");
    let imports: Vec<String> = renderer
        .requirements()
        .iter()
        .map(|import| import.use_text())
        .collect();
    assert_eq!(imports, vec!["use std::collections::HashMap;"]);
}

#[test]
fn importing_skips_items_local_to_a_function() {
    let (ws, krate) = workspace(
        r#"
        mod dest {}
        fn build() {
            struct Local;
            let made: Local = Local;
        }
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let local = TypeExpr::Path(shapes_path(&ws, krate, "Local"));
    let mut renderer = ImportingRenderer::new(&resolver, module_scope(&ws, krate, "dest"));
    assert_eq!(renderer.render_type(&local), "Local");
    assert!(renderer.requirements().is_empty());
}

#[test]
fn literals_escape_exactly() {
    assert_eq!(literal::render_lit_kind(&LitKind::Str("a\"b\n'".into())), "\"a\\\"b\\n'\"");
    assert_eq!(literal::render_lit_kind(&LitKind::Char('\'')), "'\\''");
    assert_eq!(literal::render_lit_kind(&LitKind::Char('"')), "'\"'");
    assert_eq!(literal::render_lit_kind(&LitKind::Byte(0x7f)), "b'\\x7f'");
    assert_eq!(
        literal::render_lit_kind(&LitKind::ByteStr(b"x\"\0".to_vec())),
        "b\"x\\\"\\0\""
    );
    assert_eq!(
        literal::render_lit_kind(&LitKind::Int {
            value: 7,
            suffix: Some("u8".into())
        }),
        "7u8"
    );
}

#[test]
fn rendered_literals_lex_back_to_the_same_value() {
    let text = literal::str_literal("tab\tquote\"slash\\");
    let tokens = lex(&text).expect("lex");
    assert_eq!(tokens[0].kind, TokenKind::Str("tab\tquote\"slash\\".into()));
    let bytes = literal::render_lit_kind(&LitKind::ByteStr(vec![0, 0xff, b'a']));
    let tokens = lex(&bytes).expect("lex");
    assert_eq!(tokens[0].kind, TokenKind::ByteStr(vec![0, 0xff, b'a']));
}
