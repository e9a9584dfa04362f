use crate::language::{
    ast::*,
    lexer::lex,
    parser::{parse_expr, parse_file, parse_type},
    token::TokenKind,
    types::{GenericArg, NodeIdGen, TraitObjectKind, TypeBound, TypeExpr},
};

fn parse_source(source: &str) -> SourceFile {
    let mut ids = NodeIdGen::new();
    parse_file(source, &mut ids).expect("parse")
}

fn parse_ty(source: &str) -> TypeExpr {
    let mut ids = NodeIdGen::new();
    parse_type(source, &mut ids).expect("parse type")
}

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .expect("lex")
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn lexer_separates_lifetimes_from_char_literals() {
    let tokens = kinds("'a 'b' '\\n' 'static");
    assert_eq!(
        tokens,
        vec![
            TokenKind::Lifetime("'a".into()),
            TokenKind::Char('b'),
            TokenKind::Char('\n'),
            TokenKind::Lifetime("'static".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn lexer_reads_byte_and_raw_literals() {
    let tokens = kinds(r####"b'x' b"a\x01" r#"raw "quoted""# br"bytes""####);
    assert_eq!(tokens[0], TokenKind::Byte(b'x'));
    assert_eq!(tokens[1], TokenKind::ByteStr(vec![b'a', 1]));
    assert_eq!(tokens[2], TokenKind::Str("raw \"quoted\"".into()));
    assert_eq!(tokens[3], TokenKind::ByteStr(b"bytes".to_vec()));
}

#[test]
fn lexer_reads_numeric_bases_and_suffixes() {
    let tokens = kinds("0xff_u8 1_000 0b101 2.5 3f32 1..2");
    assert_eq!(
        tokens[0],
        TokenKind::Integer {
            value: 255,
            suffix: Some("u8".into())
        }
    );
    assert_eq!(
        tokens[1],
        TokenKind::Integer {
            value: 1000,
            suffix: None
        }
    );
    assert_eq!(
        tokens[2],
        TokenKind::Integer {
            value: 5,
            suffix: None
        }
    );
    assert_eq!(tokens[3], TokenKind::Float("2.5".into()));
    assert_eq!(tokens[4], TokenKind::Float("3f32".into()));
    assert_eq!(tokens[6], TokenKind::DotDot);
}

#[test]
fn lexer_reports_unterminated_string() {
    let errors = lex("\"open").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Unterminated"));
}

#[test]
fn parses_generic_parameters_with_defaults_and_const_params() {
    let file = parse_source("pub struct Buf<'a, T: Clone + 'a, const N: usize = 4, U = Vec<T>> { data: &'a [T; N], extra: U }");
    let ItemKind::Struct(def) = &file.items[0].kind else {
        panic!("expected struct");
    };
    assert_eq!(file.items[0].visibility, Visibility::Public);
    assert_eq!(def.generics.params.len(), 4);
    assert!(matches!(
        def.generics.params[0].kind,
        GenericParamKind::Lifetime { .. }
    ));
    match &def.generics.params[1].kind {
        GenericParamKind::Type { bounds, default } => {
            assert_eq!(bounds.len(), 2);
            assert!(default.is_none());
        }
        other => panic!("unexpected param {other:?}"),
    }
    assert!(matches!(
        def.generics.params[2].kind,
        GenericParamKind::Const {
            default: Some(_),
            ..
        }
    ));
    assert!(matches!(
        def.generics.params[3].kind,
        GenericParamKind::Type {
            default: Some(_),
            ..
        }
    ));
}

#[test]
fn nested_generic_lists_close_on_split_angle_brackets() {
    let ty = parse_ty("Vec<Vec<u8>>");
    let path = ty.as_path().expect("path");
    let args = path.segments[0].args.as_ref().expect("args");
    let GenericArg::Type(inner) = &args.args[0] else {
        panic!("expected type argument");
    };
    assert!(inner.as_path().and_then(|p| p.segments[0].args.as_ref()).is_some());
}

#[test]
fn parses_qualified_paths_and_bindings() {
    let ty = parse_ty("<T as Iterator>::Item");
    let path = ty.as_path().expect("path");
    let qself = path.qself.as_ref().expect("qualified self");
    assert_eq!(qself.trait_ref.as_ref().map(|p| p.last_name()), Some("Iterator"));
    assert_eq!(path.last_name(), "Item");

    let ty = parse_ty("Box<dyn Iterator<Item = u32> + Send>");
    let path = ty.as_path().expect("path");
    let args = path.segments[0].args.as_ref().expect("args");
    let GenericArg::Type(TypeExpr::TraitObject { kind, bounds, .. }) = &args.args[0] else {
        panic!("expected trait object");
    };
    assert_eq!(*kind, TraitObjectKind::Dyn);
    assert_eq!(bounds.len(), 2);
    let TypeBound::Trait(poly) = &bounds[0] else {
        panic!("expected trait bound");
    };
    let iter_args = poly.path.segments[0].args.as_ref().expect("iterator args");
    assert_eq!(iter_args.bindings().count(), 1);
    assert_eq!(iter_args.positional_count(), 0);
}

#[test]
fn parses_const_generic_arguments() {
    let ty = parse_ty("Matrix<f32, 3, { N + 1 }, -2>");
    let args = ty.as_path().and_then(|p| p.segments[0].args.clone()).expect("args");
    assert_eq!(args.positional_count(), 4);
    assert!(matches!(args.args[1], GenericArg::Const(Expr::Literal(_))));
    assert!(matches!(args.args[2], GenericArg::Const(Expr::Block { .. })));
    assert!(matches!(
        args.args[3],
        GenericArg::Const(Expr::Unary {
            op: UnaryOp::Neg,
            ..
        })
    ));
}

#[test]
fn parses_fn_sugar_and_function_pointers() {
    let ty = parse_ty("impl Fn(u8, &str) -> bool");
    let TypeExpr::TraitObject { kind, bounds, .. } = ty else {
        panic!("expected impl trait");
    };
    assert_eq!(kind, TraitObjectKind::Impl);
    let TypeBound::Trait(poly) = &bounds[0] else {
        panic!("expected trait bound");
    };
    let sugar = poly.path.segments[0].fn_sugar.as_ref().expect("fn sugar");
    assert_eq!(sugar.inputs.len(), 2);
    assert!(sugar.output.is_some());

    let TypeExpr::FnPtr(fn_ptr) = parse_ty("unsafe extern \"C\" fn(x: i32) -> i32") else {
        panic!("expected fn pointer");
    };
    assert!(fn_ptr.is_unsafe);
    assert_eq!(fn_ptr.abi, Some(Some("C".to_string())));
    assert_eq!(fn_ptr.params.len(), 1);
}

#[test]
fn parses_turbofish_method_calls() {
    let mut ids = NodeIdGen::new();
    let expr = parse_expr("value.convert::<u8, u16>(1)", &mut ids).expect("parse expr");
    let Expr::MethodCall { method, args, .. } = expr else {
        panic!("expected method call");
    };
    assert_eq!(method.name, "convert");
    assert!(method.turbofish);
    assert_eq!(method.args.map(|a| a.positional_count()), Some(2));
    assert_eq!(args.len(), 1);
}

#[test]
fn joins_adjacent_angle_tokens_in_expressions() {
    let mut ids = NodeIdGen::new();
    let expr = parse_expr("1 << 4 >= x >> 2", &mut ids).expect("parse expr");
    let Expr::Binary { op, left, right, .. } = expr else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Ge);
    assert!(matches!(*left, Expr::Binary { op: BinaryOp::Shl, .. }));
    assert!(matches!(*right, Expr::Binary { op: BinaryOp::Shr, .. }));
}

#[test]
fn parses_nested_use_trees() {
    let file = parse_source("use std::{collections::{self, HashMap as Map}, fmt::*};");
    let ItemKind::Use(tree) = &file.items[0].kind else {
        panic!("expected use");
    };
    assert_eq!(tree.prefix[0].name, "std");
    let UseTreeKind::Nested(children) = &tree.kind else {
        panic!("expected nested use");
    };
    assert_eq!(children.len(), 2);
    assert!(matches!(children[1].kind, UseTreeKind::Glob));
    let UseTreeKind::Nested(inner) = &children[0].kind else {
        panic!("expected inner nested use");
    };
    assert_eq!(inner[0].prefix[0].name, "self");
    assert!(matches!(
        &inner[1].kind,
        UseTreeKind::Simple { alias: Some(alias) } if alias.name == "Map"
    ));
}

#[test]
fn parses_traits_impls_and_self_params() {
    let source = r#"
pub trait Shape: Clone {
    type Output;
    const SIDES: usize = 4;
    fn area(&self) -> f64;
    fn scale(&'a mut self, by: f64);
}

impl<T> Shape for Square<T> where T: Copy {
    type Output = T;
    fn area(&self) -> f64 { 1.0 }
    fn scale(&mut self, by: f64) {}
}
"#;
    let file = parse_source(source);
    let ItemKind::Trait(trait_def) = &file.items[0].kind else {
        panic!("expected trait");
    };
    assert_eq!(trait_def.supertraits.len(), 1);
    assert_eq!(trait_def.items.len(), 4);
    let AssocItemKind::Fn(scale) = &trait_def.items[3].kind else {
        panic!("expected fn");
    };
    assert!(matches!(
        scale.self_param.as_ref().map(|p| &p.kind),
        Some(SelfKind::Ref {
            lifetime: Some(_),
            mutable: true
        })
    ));

    let ItemKind::Impl(impl_def) = &file.items[1].kind else {
        panic!("expected impl");
    };
    assert_eq!(impl_def.trait_ref.as_ref().map(|p| p.last_name()), Some("Shape"));
    assert_eq!(impl_def.generics.where_clause.len(), 1);
    assert_eq!(impl_def.items.len(), 3);
}

#[test]
fn unsupported_function_bodies_are_skipped() {
    let source = r#"
fn uses_closures(items: Vec<u32>) -> u32 {
    items.iter().map(|x| x + 1).sum()
}

fn plain() -> u32 { 1 }
"#;
    let file = parse_source(source);
    assert_eq!(file.items.len(), 2);
    let ItemKind::Fn(skipped) = &file.items[0].kind else {
        panic!("expected fn");
    };
    assert!(skipped.body.as_ref().is_some_and(|b| b.stmts.is_empty() && b.tail.is_none()));
    let ItemKind::Fn(plain) = &file.items[1].kind else {
        panic!("expected fn");
    };
    assert!(plain.body.as_ref().is_some_and(|b| b.tail.is_some()));
}

#[test]
fn struct_literals_are_not_parsed_in_if_conditions() {
    let source = r#"
fn check(flag: bool) -> Point {
    if flag { Point { x: 1, y: 2 } } else { Point { x: 0, y: 0 } }
}
"#;
    let file = parse_source(source);
    let ItemKind::Fn(def) = &file.items[0].kind else {
        panic!("expected fn");
    };
    let tail = def.body.as_ref().and_then(|b| b.tail.as_deref()).expect("tail");
    let Expr::If { cond, then_branch, .. } = tail else {
        panic!("expected if");
    };
    assert!(matches!(**cond, Expr::Path(_)));
    assert!(matches!(
        then_branch.tail.as_deref(),
        Some(Expr::Struct { fields, .. }) if fields.len() == 2
    ));
}

#[test]
fn reports_syntax_errors_with_spans() {
    let mut ids = NodeIdGen::new();
    let errors = parse_file("struct { }", &mut ids).unwrap_err();
    assert_eq!(errors.errors.len(), 1);
    assert!(errors.errors[0].message.starts_with("Expected struct name"));
    assert_eq!(errors.errors[0].span.start, 7);
}
