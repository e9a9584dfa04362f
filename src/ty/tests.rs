use super::{
    compose, eval_const, expand_aliases, int_range, substitute_type, substitution_for_path,
    ConstValue, SubstValue, Substitution,
};
use crate::{
    language::{
        ast::{Expr, ItemKind},
        types::{Path, TypeExpr},
        visit::collect_paths,
    },
    render::Renderer,
    resolve::{CrateId, DefId, DefKind, ResolveCache, Resolver, Workspace},
};

fn workspace(source: &str) -> (Workspace, CrateId) {
    let mut ws = Workspace::new().expect("std");
    let krate = ws
        .add_crate("demo", "demo/lib.rs", source, &[])
        .expect("crate");
    (ws, krate)
}

fn generic_path(ws: &Workspace, krate: CrateId, name: &str) -> Path {
    ws.files()
        .filter(|(_, file)| file.krate == krate)
        .flat_map(|(_, file)| collect_paths(&file.syntax))
        .find(|path| path.last_name() == name && path.last().map_or(false, |seg| seg.args.is_some()))
        .cloned()
        .unwrap_or_else(|| panic!("no generic path ending in `{name}`"))
}

fn def_named(ws: &Workspace, krate: CrateId, name: &str) -> DefId {
    ws.defs()
        .find(|(_, data)| data.krate == krate && data.name == name)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no definition `{name}`"))
}

fn field_type(ws: &Workspace, owner: DefId, index: usize) -> TypeExpr {
    let DefKind::Struct { fields } = &ws.def(owner).kind else {
        panic!("expected a struct");
    };
    fields.iter().nth(index).expect("field").ty.clone()
}

fn const_value(ws: &Workspace, krate: CrateId, name: &str) -> Expr {
    let root = ws.crate_data(krate).root_file;
    ws.file(root)
        .syntax
        .items
        .iter()
        .find_map(|item| match &item.kind {
            ItemKind::Const(def) if def.name.name == name => def.value.clone(),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no const `{name}`"))
}

fn rendered(resolver: &Resolver<'_>, value: Option<&SubstValue>) -> String {
    match value {
        Some(SubstValue::Type(ty)) => Renderer::new(resolver).render_type(ty),
        Some(SubstValue::Const(expr)) => Renderer::new(resolver).render_const_expr(expr),
        Some(SubstValue::Lifetime(lifetime)) => lifetime.name.clone(),
        None => "<missing>".into(),
    }
}

#[test]
fn omitted_parameters_take_substituted_defaults() {
    let (ws, krate) = workspace(
        r#"
        struct Hasher<T>(T);
        struct Map<'a, K, V = K, S = Hasher<V>>(&'a K, V, S);
        fn take(map: Map<'static, u8>) {}
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let (map, subst) = substitution_for_path(&resolver, &generic_path(&ws, krate, "Map"))
        .expect("substitution");
    let params = &ws.def(map).generics;
    let values: Vec<String> = params
        .iter()
        .map(|param| rendered(&resolver, subst.get(*param)))
        .collect();
    assert_eq!(values, vec!["'static", "u8", "u8", "Hasher<u8>"]);
}

#[test]
fn missing_arguments_without_defaults_stay_unmapped() {
    let (ws, krate) = workspace(
        r#"
        struct Pair<A, B>(A, B);
        fn take(pair: Pair<u8>) {}
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let (pair, subst) = substitution_for_path(&resolver, &generic_path(&ws, krate, "Pair"))
        .expect("substitution");
    assert_eq!(subst.len(), 1);
    assert!(!subst.contains(ws.def(pair).generics[1]));
    let second = field_type(&ws, pair, 1);
    assert_eq!(
        Renderer::new(&resolver).render_type(&substitute_type(&resolver, &second, &subst)),
        "B"
    );
}

#[test]
fn composition_matches_sequential_application() {
    let (mut ws, krate) = workspace(
        r#"
        struct Pair<T, U> {
            left: T,
            right: Vec<U>,
        }
        "#,
    );
    let root = ws.crate_root_scope(krate);
    let byte = ws.parse_type_at("u8", root).expect("type");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let pair = def_named(&ws, krate, "Pair");
    let (t, u) = (ws.def(pair).generics[0], ws.def(pair).generics[1]);
    let left = field_type(&ws, pair, 0);
    let right = field_type(&ws, pair, 1);

    let mut first = Substitution::new();
    first.insert(t, SubstValue::Type(right.clone()));
    let mut second = Substitution::new();
    second.insert(u, SubstValue::Type(byte));
    let composed = compose(&resolver, &first, &second);

    for ty in [&left, &right] {
        let sequential = substitute_type(
            &resolver,
            &substitute_type(&resolver, ty, &first),
            &second,
        );
        let at_once = substitute_type(&resolver, ty, &composed);
        let mut renderer = Renderer::new(&resolver);
        assert_eq!(renderer.render_type(&at_once), renderer.render_type(&sequential));
    }
    assert_eq!(
        Renderer::new(&resolver).render_type(&substitute_type(&resolver, &left, &composed)),
        "Vec<u8>"
    );
}

#[test]
fn associated_projections_get_a_qualified_self() {
    let (mut ws, krate) = workspace(
        r#"
        trait Source {
            type Item;
        }
        fn first<T: Source>(item: T::Item) {}
        "#,
    );
    let root = ws.crate_root_scope(krate);
    let concrete = ws.parse_type_at("Vec<u8>", root).expect("type");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let first = def_named(&ws, krate, "first");
    let Some(signature) = resolver.signature(first) else {
        panic!("expected a function");
    };
    let mut subst = Substitution::new();
    subst.insert(ws.def(first).generics[0], SubstValue::Type(concrete));
    let projected = substitute_type(&resolver, &signature.params[0].ty, &subst);
    let TypeExpr::Path(path) = &projected else {
        panic!("expected a path");
    };
    assert!(path.id.is_detached());
    assert_eq!(Renderer::new(&resolver).render_type(&projected), "<Vec<u8>>::Item");
}

#[test]
fn alias_expansion_stops_on_cycles() {
    let (ws, krate) = workspace(
        r#"
        type Loop = Loop;
        type Id<T> = T;
        fn take(a: Loop, b: Vec<Id<bool>>) {}
        "#,
    );
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let cyclic = ws
        .files()
        .filter(|(_, file)| file.krate == krate)
        .flat_map(|(_, file)| collect_paths(&file.syntax))
        .find(|path| path.last_name() == "Loop")
        .cloned()
        .expect("path");
    let expanded = expand_aliases(&resolver, &TypeExpr::Path(cyclic));
    assert_eq!(Renderer::new(&resolver).render_type(&expanded), "Loop");

    let nested = TypeExpr::Path(generic_path(&ws, krate, "Vec"));
    assert_eq!(
        Renderer::new(&resolver).render_type(&expand_aliases(&resolver, &nested)),
        "Vec<bool>"
    );
}

const CONSTS: &str = r#"
    const BASE: u8 = 200;
    const DOUBLE: u16 = BASE as u16 * 2;
    const WRAPPED: u8 = 300u16 as u8;
    const OVERFLOW: u8 = BASE + 100;
    const BY_ZERO: i32 = 1 / 0;
    const MIN: i8 = -128;
    const MASK: u8 = !0;
    const FLAG: bool = 3 > 2 && true;
    const ORDERED: bool = 'a' < 'b';
    const SHIFTED: u32 = 1 << 4;
    const NAME: &str = "demo";
    const FLOAT: f32 = 1.5;
    struct Buffer<const N: usize> {
        data: [u8; N],
        spare: [u8; N + 1],
    }
"#;

#[test]
fn constants_fold_with_checked_arithmetic() {
    let (ws, krate) = workspace(CONSTS);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let eval = |name: &str, ty: Option<&str>| eval_const(&resolver, &const_value(&ws, krate, name), ty);

    assert_eq!(eval("BASE", Some("u8")), ConstValue::Int(200));
    assert_eq!(eval("DOUBLE", Some("u16")), ConstValue::Int(400));
    assert_eq!(eval("WRAPPED", Some("u8")), ConstValue::Int(44));
    assert_eq!(eval("OVERFLOW", Some("u8")), ConstValue::Unknown);
    assert_eq!(eval("BY_ZERO", Some("i32")), ConstValue::Unknown);
    assert_eq!(eval("MIN", Some("i8")), ConstValue::Int(-128));
    assert_eq!(eval("MASK", Some("u8")), ConstValue::Int(255));
    assert_eq!(eval("FLAG", Some("bool")), ConstValue::Bool(true));
    assert_eq!(eval("ORDERED", Some("bool")), ConstValue::Bool(true));
    assert_eq!(eval("SHIFTED", Some("u32")), ConstValue::Int(16));
    assert_eq!(eval("NAME", None), ConstValue::Str("demo".into()));
    assert_eq!(eval("FLOAT", Some("f32")), ConstValue::Unknown);
}

#[test]
fn constants_follow_paths_and_parameters() {
    let (mut ws, krate) = workspace(CONSTS);
    let root = ws.crate_root_scope(krate);
    let via_path = ws.parse_expr_at("DOUBLE + 1", root).expect("expr");
    let unknown = ws.parse_expr_at("MISSING * 2", root).expect("expr");
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);

    assert_eq!(eval_const(&resolver, &via_path, Some("u16")), ConstValue::Int(401));
    assert_eq!(eval_const(&resolver, &unknown, None), ConstValue::Unknown);

    let buffer = def_named(&ws, krate, "Buffer");
    let param = ws.def(buffer).generics[0];
    let lengths: Vec<ConstValue> = (0..2)
        .map(|index| match field_type(&ws, buffer, index) {
            TypeExpr::Array { len, .. } => eval_const(&resolver, &len, Some("usize")),
            other => panic!("expected an array, found {other:?}"),
        })
        .collect();
    assert_eq!(lengths, vec![ConstValue::Param(param), ConstValue::Symbolic]);
    assert!(!ConstValue::Symbolic.is_known());
}

#[test]
fn integer_ranges_cover_every_width() {
    assert_eq!(int_range("u8"), Some((0, 255)));
    assert_eq!(int_range("i16"), Some((-32768, 32767)));
    assert_eq!(int_range("usize"), Some((0, u64::MAX as i128)));
    assert_eq!(int_range("u128"), Some((0, i128::MAX)));
    assert_eq!(int_range("i128"), Some((i128::MIN, i128::MAX)));
    assert_eq!(int_range("f64"), None);
}
