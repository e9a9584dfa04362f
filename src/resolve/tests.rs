use super::{
    resolver::path_text, CrateId, DefId, DefKind, Namespace, ResolutionResult, ResolveCache,
    Resolver, Workspace,
};
use crate::language::{
    ast::{Expr, ItemKind, Stmt},
    types::{Path, TypeExpr},
    visit::collect_paths,
};

fn workspace(source: &str) -> (Workspace, CrateId) {
    let mut ws = Workspace::new().expect("std");
    let krate = ws
        .add_crate("demo", "demo/lib.rs", source, &[])
        .expect("crate");
    (ws, krate)
}

fn find_path(ws: &Workspace, krate: CrateId, text: &str) -> Path {
    ws.files()
        .filter(|(_, file)| file.krate == krate)
        .flat_map(|(_, file)| collect_paths(&file.syntax))
        .find(|path| path_text(path) == text)
        .cloned()
        .unwrap_or_else(|| panic!("no path `{text}` in crate"))
}

fn resolve(ws: &Workspace, krate: CrateId, text: &str) -> ResolutionResult {
    let cache = ResolveCache::new();
    let resolver = Resolver::new(ws, &cache);
    resolver.resolve(&find_path(ws, krate, text))
}

fn qualified(ws: &Workspace, def: DefId) -> String {
    ws.crate_relative_path(def).join("::")
}

fn primary(ws: &Workspace, krate: CrateId, text: &str) -> DefId {
    resolve(ws, krate, text)
        .primary()
        .unwrap_or_else(|| panic!("`{text}` did not resolve"))
}

/// The body of the last function in the crate's root file.
fn last_fn_body(ws: &Workspace, krate: CrateId) -> &crate::language::ast::Block {
    let root = ws.crate_data(krate).root_file;
    ws.file(root)
        .syntax
        .items
        .iter()
        .rev()
        .find_map(|item| match &item.kind {
            ItemKind::Fn(def) => def.body.as_ref(),
            _ => None,
        })
        .expect("function body")
}

#[test]
fn resolves_items_through_modules_and_imports() {
    let (ws, krate) = workspace(
        r#"
        mod shapes {
            pub struct Circle;
            pub mod nested {
                pub struct Square;
            }
        }
        use shapes::nested::Square;
        use shapes::*;
        fn build(c: Circle, s: Square, q: shapes::nested::Square) {}
        "#,
    );
    assert_eq!(qualified(&ws, primary(&ws, krate, "Circle")), "shapes::Circle");
    let square = primary(&ws, krate, "Square");
    assert_eq!(qualified(&ws, square), "shapes::nested::Square");
    assert_eq!(primary(&ws, krate, "shapes::nested::Square"), square);
    assert!(matches!(ws.def(square).kind, DefKind::Struct { .. }));
}

#[test]
fn same_name_in_two_namespaces_prefers_the_type() {
    let (ws, krate) = workspace(
        r#"
        struct Pair { a: u8 }
        fn Pair() {}
        fn use_it() { Pair(); }
        "#,
    );
    let result = resolve(&ws, krate, "Pair");
    assert_eq!(result.candidates().len(), 2);
    assert!(result.is_ambiguous());
    let def = result.primary().expect("resolved");
    assert!(matches!(ws.def(def).kind, DefKind::Struct { .. }));
    let value = result.first_in(Namespace::Values).expect("value");
    assert!(matches!(ws.def(value).kind, DefKind::Fn(_)));
}

#[test]
fn locals_shadow_module_items() {
    let (ws, krate) = workspace(
        r#"
        const count: u32 = 3;
        fn run() -> u32 {
            let count = 1;
            count
        }
        "#,
    );
    let body = last_fn_body(&ws, krate);
    let Some(tail) = body.tail.as_deref() else {
        panic!("expected tail expression");
    };
    let Expr::Path(path) = tail else {
        panic!("expected path, got {tail:?}");
    };
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let def = resolver.resolve(path).primary().expect("resolved");
    assert!(matches!(ws.def(def).kind, DefKind::Local { .. }));
}

#[test]
fn resolves_enum_variants_and_inherent_functions() {
    let (ws, krate) = workspace(
        r#"
        enum Shape { Circle(f64), Square }
        impl Shape {
            fn new() -> Shape { Shape::Square }
        }
        fn make() { Shape::new(); Shape::Circle(1.0); }
        "#,
    );
    let variant = primary(&ws, krate, "Shape::Circle");
    assert!(matches!(ws.def(variant).kind, DefKind::Variant { .. }));
    let function = primary(&ws, krate, "Shape::new");
    assert!(matches!(ws.def(function).kind, DefKind::Fn(_)));
    assert_eq!(ws.def(function).name, "new");
}

#[test]
fn resolves_trait_items_through_bounds_and_supertraits() {
    let (ws, krate) = workspace(
        r#"
        trait Base { fn base(); }
        trait Derived: Base { fn derived(); }
        fn call<T: Derived>() {
            T::base();
            T::derived();
        }
        "#,
    );
    let base = primary(&ws, krate, "T::base");
    assert_eq!(qualified(&ws, base), "Base::base");
    let derived = primary(&ws, krate, "T::derived");
    assert_eq!(qualified(&ws, derived), "Derived::derived");
}

#[test]
fn resolves_qualified_self_paths_to_associated_types() {
    let (ws, krate) = workspace(
        r#"
        fn first<I: Iterator>(iter: I) -> Option<<I as Iterator>::Item> { None }
        "#,
    );
    let item = primary(&ws, krate, "<..>::Item");
    assert!(matches!(ws.def(item).kind, DefKind::TypeAlias { .. }));
    let owner = ws.def(item).parent.expect("owner");
    assert_eq!(ws.def(owner).name, "Iterator");
}

#[test]
fn resolves_crate_self_and_super_prefixes() {
    let (ws, krate) = workspace(
        r#"
        struct Top;
        mod inner {
            pub struct Local;
            fn f(a: crate::Top, b: super::Top, c: self::Local) {}
        }
        "#,
    );
    let top = primary(&ws, krate, "crate::Top");
    assert_eq!(primary(&ws, krate, "super::Top"), top);
    assert_eq!(
        qualified(&ws, primary(&ws, krate, "self::Local")),
        "inner::Local"
    );
}

#[test]
fn resolves_self_type_inside_impls() {
    let (ws, krate) = workspace(
        r#"
        struct Counter;
        impl Counter {
            fn zero() -> Self { Counter }
            fn reset() { Self::zero(); }
        }
        "#,
    );
    let zero = primary(&ws, krate, "Self::zero");
    assert_eq!(ws.def(zero).name, "zero");
    assert!(matches!(ws.def(zero).kind, DefKind::Fn(_)));
}

#[test]
fn resolves_paths_into_dependency_crates() {
    let mut ws = Workspace::new().expect("std");
    let util = ws
        .add_crate("util", "util/lib.rs", "pub fn helper() {}", &[])
        .expect("util");
    let app = ws
        .add_crate(
            "app",
            "app/main.rs",
            "fn main() { util::helper(); ::util::helper(); }",
            &[util],
        )
        .expect("app");
    let helper = primary(&ws, app, "util::helper");
    assert_eq!(ws.def(helper).krate, util);
    assert_eq!(primary(&ws, app, "::util::helper"), helper);
}

#[test]
fn resolves_prelude_std_paths_and_primitives() {
    let (ws, krate) = workspace(
        r#"
        fn f(a: Vec<u32>, b: Option<String>, c: std::collections::HashMap<u8, u8>) {}
        "#,
    );
    let vec = primary(&ws, krate, "Vec");
    assert_eq!(ws.def(vec).krate, ws.std_crate());
    let int = primary(&ws, krate, "u32");
    assert!(matches!(ws.def(int).kind, DefKind::Primitive));
    let map = primary(&ws, krate, "std::collections::HashMap");
    assert_eq!(qualified(&ws, map), "collections::hash_map::HashMap");
    assert!(matches!(
        ws.def(primary(&ws, krate, "Option")).kind,
        DefKind::Enum
    ));
}

#[test]
fn unknown_paths_resolve_to_nothing() {
    let (ws, krate) = workspace("fn f(a: missing::Thing, b: Nowhere) {}");
    assert!(resolve(&ws, krate, "missing::Thing").is_unresolved());
    assert!(resolve(&ws, krate, "Nowhere").is_unresolved());
}

#[test]
fn cyclic_reexports_stay_unresolved() {
    let (ws, krate) = workspace(
        r#"
        mod a { pub use super::b::Knot; }
        mod b { pub use super::a::Knot; }
        fn f(k: a::Knot) {}
        "#,
    );
    assert!(resolve(&ws, krate, "a::Knot").is_unresolved());
}

#[test]
fn explicit_imports_shadow_glob_imports() {
    let (ws, krate) = workspace(
        r#"
        mod one { pub struct Item; }
        mod two { pub struct Item; }
        use one::*;
        use two::Item;
        fn f(i: Item) {}
        "#,
    );
    let result = resolve(&ws, krate, "Item");
    // a unit struct binds the same def in the type and value namespaces
    let mut defs: Vec<DefId> = result.candidates().iter().map(|candidate| candidate.def).collect();
    defs.sort();
    defs.dedup();
    assert_eq!(defs.len(), 1);
    assert_eq!(qualified(&ws, defs[0]), "two::Item");
    assert_eq!(result.primary(), Some(defs[0]));
}

#[test]
fn renamed_and_nested_self_imports() {
    let (ws, krate) = workspace(
        r#"
        mod geometry {
            pub mod shapes { pub struct Circle; }
        }
        use geometry::shapes::{self, Circle as Round};
        fn f(a: Round, b: shapes::Circle) {}
        "#,
    );
    let round = primary(&ws, krate, "Round");
    assert_eq!(qualified(&ws, round), "geometry::shapes::Circle");
    assert_eq!(primary(&ws, krate, "shapes::Circle"), round);
}

#[test]
fn block_level_items_and_imports_are_visible_in_the_block() {
    let (ws, krate) = workspace(
        r#"
        mod tools { pub struct Hammer; }
        fn work() {
            use tools::Hammer;
            struct Nail;
            let a: Hammer = Hammer;
            let b: Nail = Nail;
        }
        "#,
    );
    assert_eq!(qualified(&ws, primary(&ws, krate, "Hammer")), "tools::Hammer");
    let nail = primary(&ws, krate, "Nail");
    assert_eq!(ws.def(nail).name, "Nail");
}

#[test]
fn cache_is_reused_until_the_workspace_changes() {
    let (mut ws, krate) = workspace("struct Point; fn f(p: Point) {}");
    let path = find_path(&ws, krate, "Point");
    let cache = ResolveCache::new();
    {
        let resolver = Resolver::new(&ws, &cache);
        let first = resolver.resolve(&path);
        let second = resolver.resolve(&path);
        assert_eq!(first, second);
    }
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
    assert_eq!(cache.revision(), Some(ws.revision()));

    ws.add_crate("other", "other/lib.rs", "pub struct Other;", &[])
        .expect("other");
    let _resolver = Resolver::new(&ws, &cache);
    assert!(cache.is_empty());
    assert_eq!(cache.revision(), Some(ws.revision()));
}

#[test]
fn method_calls_use_the_receiver_type() {
    let (ws, krate) = workspace(
        r#"
        fn fill() {
            let v: Vec<u8> = Vec::new();
            v.push(1);
        }
        "#,
    );
    let body = last_fn_body(&ws, krate);
    let Some(Stmt::Expr(call)) = body.stmts.get(1) else {
        panic!("expected method call statement");
    };
    let Expr::MethodCall { receiver, .. } = call else {
        panic!("expected method call, got {call:?}");
    };
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let methods = resolver.resolve_method(receiver, "push");
    assert_eq!(methods.len(), 1);
    assert_eq!(qualified(&ws, methods[0]), "vec::push");
}

#[test]
fn method_calls_on_unknown_receivers_list_every_candidate() {
    let (ws, krate) = workspace("fn count(x: Mystery) -> usize { x.len() }");
    let body = last_fn_body(&ws, krate);
    let Some(Expr::MethodCall { receiver, .. }) = body.tail.as_deref() else {
        panic!("expected method call tail");
    };
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let methods = resolver.resolve_method(receiver, "len");
    assert!(methods.len() >= 2);
    assert!(methods.iter().all(|def| ws.def(*def).name == "len"));
}

#[test]
fn call_sites_map_arguments_to_parameters() {
    let (ws, krate) = workspace(
        r#"
        struct Meter;
        impl Meter {
            fn add(&self, amount: u32) {}
        }
        fn foo(a: u32, b: bool) {}
        fn run(m: Meter) {
            foo(1, true);
            Meter::add(m, 2);
        }
        "#,
    );
    let body = last_fn_body(&ws, krate);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);

    let Some(Stmt::Expr(direct)) = body.stmts.first() else {
        panic!("expected call statement");
    };
    let site = resolver.call_site(direct).expect("call site");
    assert_eq!(ws.def(site.function).name, "foo");
    assert_eq!(site.parameter_index(1), Some(1));
    assert_eq!(site.parameter_index(2), None);

    let Some(Stmt::Expr(ufcs)) = body.stmts.get(1) else {
        panic!("expected call statement");
    };
    let site = resolver.call_site(ufcs).expect("call site");
    assert!(site.receiver_in_args);
    assert_eq!(site.parameter_index(0), None);
    assert_eq!(site.parameter_index(1), Some(0));
}

#[test]
fn lifetimes_resolve_to_their_generic_parameter() {
    let (ws, krate) = workspace("fn pick<'a>(x: &'a u8, y: &'static u8) {}");
    let root = ws.crate_data(krate).root_file;
    let ItemKind::Fn(def) = &ws.file(root).syntax.items[0].kind else {
        panic!("expected fn");
    };
    let lifetime_of = |index: usize| match &def.params[index].ty {
        TypeExpr::Ref {
            lifetime: Some(lifetime),
            ..
        } => lifetime.clone(),
        other => panic!("expected reference, got {other:?}"),
    };
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let param = resolver.resolve_lifetime(&lifetime_of(0)).expect("'a");
    assert!(matches!(ws.def(param).kind, DefKind::LifetimeParam));
    assert_eq!(resolver.resolve_lifetime(&lifetime_of(1)), None);
}

#[test]
fn import_paths_respect_visibility_and_reexports() {
    let (ws, krate) = workspace(
        r#"
        mod private { pub struct Hidden; }
        pub mod api {
            mod detail { pub struct Widget; }
            pub use self::detail::Widget;
        }
        mod consumer {}
        fn f(w: api::Widget, m: std::collections::HashMap<u8, u8>) {}
        "#,
    );
    let consumer = ws.find_module(krate, &["consumer"]).expect("module");
    let widget = primary(&ws, krate, "api::Widget");
    assert_eq!(
        ws.import_path(widget, consumer),
        Some(vec!["crate".to_string(), "api".into(), "Widget".into()])
    );
    let map = primary(&ws, krate, "std::collections::HashMap");
    assert_eq!(
        ws.import_path(map, consumer),
        Some(vec!["std".to_string(), "collections".into(), "HashMap".into()])
    );

    let mut other = Workspace::new().expect("std");
    let lib = other
        .add_crate("lib", "lib/lib.rs", "mod private { pub struct Hidden; }", &[])
        .expect("lib");
    let app = other
        .add_crate("app", "app/main.rs", "fn main() {}", &[lib])
        .expect("app");
    let hidden = other
        .defs()
        .find(|(_, data)| data.name == "Hidden")
        .map(|(id, _)| id)
        .expect("Hidden");
    let app_root = other.crate_data(app).root;
    assert_eq!(other.import_path(hidden, app_root), None);
}

#[test]
fn visible_type_names_list_inner_bindings_first() {
    let (ws, krate) = workspace(
        r#"
        struct Vec;
        fn f<T>(x: T) {}
        "#,
    );
    let path = find_path(&ws, krate, "T");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let names = resolver.visible_type_names(resolver.scope_for(&path));
    assert_eq!(names[0].0, "T");
    let vec = names
        .iter()
        .find(|(name, _)| name == "Vec")
        .map(|(_, def)| *def)
        .expect("Vec");
    assert_eq!(ws.def(vec).krate, krate);
    assert_eq!(names.iter().filter(|(name, _)| name == "Vec").count(), 1);
    assert!(names.iter().any(|(name, _)| name == "u8"));
}

#[test]
fn disk_loader_follows_module_declarations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("lib.rs");
    std::fs::write(&root, "mod shapes;\nmod nested;\nfn f(c: shapes::Circle, t: nested::Tri) {}\n")
        .expect("write root");
    std::fs::write(dir.path().join("shapes.rs"), "pub struct Circle;\n").expect("write shapes");
    std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
    std::fs::write(dir.path().join("nested").join("mod.rs"), "pub struct Tri;\n")
        .expect("write nested");

    let mut ws = Workspace::new().expect("std");
    let krate = ws.load_crate("disk", &root, &[]).expect("load");
    assert_eq!(
        qualified(&ws, primary(&ws, krate, "shapes::Circle")),
        "shapes::Circle"
    );
    assert_eq!(
        qualified(&ws, primary(&ws, krate, "nested::Tri")),
        "nested::Tri"
    );
    assert_eq!(ws.files().filter(|(_, file)| file.krate == krate).count(), 3);
}

#[test]
fn syntax_errors_are_reported_per_file() {
    let mut ws = Workspace::new().expect("std");
    let err = ws
        .add_crate("broken", "broken/lib.rs", "fn f( {", &[])
        .expect_err("syntax error");
    let super::LoadError::Syntax(files) = err else {
        panic!("expected syntax errors, got {err:?}");
    };
    assert_eq!(files.len(), 1);
    assert!(!files[0].errors.is_empty());
}
