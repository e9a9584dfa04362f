use super::{
    apply_edits, assoc_types, check_arity, check_crate, ArityVerdict, CheckOptions, Diagnostic,
    DiagnosticCode, FixKind, GenericDeclaration, Severity,
};
use crate::resolve::{CrateId, ResolveCache, Resolver, Workspace};

fn workspace(source: &str) -> (Workspace, CrateId) {
    let mut ws = Workspace::new().expect("std");
    let krate = ws
        .add_crate("demo", "demo/lib.rs", source, &[])
        .expect("crate");
    (ws, krate)
}

fn none() -> CheckOptions {
    CheckOptions {
        type_arguments: false,
        assoc_type_bindings: false,
        unnecessary_qualifications: false,
        argument_types: false,
    }
}

fn check(source: &str, options: CheckOptions) -> Vec<Diagnostic> {
    let (ws, krate) = workspace(source);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    check_crate(&resolver, krate, options)
}

fn arity(source: &str) -> Vec<Diagnostic> {
    check(
        source,
        CheckOptions {
            type_arguments: true,
            ..none()
        },
    )
}

fn bindings(source: &str) -> Vec<Diagnostic> {
    check(
        source,
        CheckOptions {
            assoc_type_bindings: true,
            ..none()
        },
    )
}

fn qualifications(source: &str) -> Vec<Diagnostic> {
    check(
        source,
        CheckOptions {
            unnecessary_qualifications: true,
            ..none()
        },
    )
}

fn arguments(source: &str) -> Vec<Diagnostic> {
    check(
        source,
        CheckOptions {
            argument_types: true,
            ..none()
        },
    )
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<(DiagnosticCode, &str)> {
    diagnostics
        .iter()
        .map(|diagnostic| (diagnostic.code, diagnostic.message.as_str()))
        .collect()
}

fn fixed(source: &str, diagnostic: &Diagnostic) -> String {
    let fix = diagnostic.fix.as_ref().expect("diagnostic has a fix");
    apply_edits(source, &fix.edits)
}

#[test]
fn arity_verdicts_follow_required_and_total_counts() {
    let optional = GenericDeclaration::new(1, 2);
    assert_eq!(check_arity(optional, 1), ArityVerdict::Exact);
    assert_eq!(check_arity(optional, 2), ArityVerdict::Exact);
    assert_eq!(
        check_arity(optional, 0),
        ArityVerdict::TooFew {
            required: 1,
            provided: 0
        }
    );
    assert_eq!(check_arity(optional, 3), ArityVerdict::TooMany { max: 2, provided: 3 });
    assert_eq!(
        check_arity(GenericDeclaration::new(0, 0), 1),
        ArityVerdict::NoParametersExpected { provided: 1 }
    );
    assert_eq!(check_arity(GenericDeclaration::new(0, 0), 0), ArityVerdict::Exact);
}

const TYPE_POSITIONS: &str = r#"
struct Pair<A, B = A>(A, B);
struct Unit;
fn take(a: Pair, b: Pair<u8, u8, u8>, c: Unit<u8>, d: Pair<u8>) {}
"#;

#[test]
fn type_positions_report_wrong_argument_counts() {
    let found = arity(TYPE_POSITIONS);
    assert_eq!(
        messages(&found),
        vec![
            (
                DiagnosticCode::TooFewTypeArgsTypePos,
                "Wrong number of type arguments: expected at least 1, found 0"
            ),
            (
                DiagnosticCode::TooManyTypeArgsTypePos,
                "Wrong number of type arguments: expected at most 2, found 3"
            ),
            (
                DiagnosticCode::TooManyTypeArgsTypePos,
                "Wrong number of type arguments: expected 0, found 1"
            ),
        ]
    );
    assert!(found.iter().all(|diagnostic| diagnostic.severity == Severity::Error));
    assert!(found[1].fix.is_none());

    let missing = found[0].fix.as_ref().expect("fix");
    assert_eq!(missing.kind, FixKind::AddTypeArguments);
    assert_eq!(missing.edits[0].placeholders, vec![1..2]);
    assert!(fixed(TYPE_POSITIONS, &found[0]).contains("fn take(a: Pair<_>, b:"));

    assert_eq!(found[2].fix.as_ref().map(|fix| fix.kind), Some(FixKind::RemoveTypeArguments));
    assert!(fixed(TYPE_POSITIONS, &found[2]).contains("c: Unit, d: Pair<u8>"));
}

const CALLS: &str = r#"
struct Store;
impl Store {
    fn get<T>(&self) -> u8 { 0 }
    fn pair<A, B>(&self) {}
    fn plain(&self) {}
}
fn make<T, U>() {}
fn run(store: Store) {
    store.get::<u8, u16>();
    store.plain::<u8>();
    store.pair::<u8>();
    make::<u8, u16, u32>();
    make::<u8>();
    store.get();
}
"#;

#[test]
fn calls_and_method_calls_check_their_turbofish() {
    let found = arity(CALLS);
    assert_eq!(
        messages(&found),
        vec![
            (
                DiagnosticCode::TooManyTypeArgsMethod,
                "Wrong number of type arguments: expected 1, found 2"
            ),
            (
                DiagnosticCode::TooManyTypeArgsMethod,
                "Wrong number of type arguments: expected 0, found 1"
            ),
            (
                DiagnosticCode::TooFewTypeArgsMethod,
                "Wrong number of type arguments: expected 2, found 1"
            ),
            (
                DiagnosticCode::TooManyTypeArgsCall,
                "Wrong number of type arguments: expected 2, found 3"
            ),
        ]
    );
    assert!(fixed(CALLS, &found[1]).contains("store.plain();"));
    assert!(fixed(CALLS, &found[2]).contains("store.pair::<u8, _>();"));
    assert!(found[3].fix.is_none());
}

#[test]
fn rustc_codes_and_severities() {
    assert_eq!(DiagnosticCode::TooManyTypeArgsCall.rustc_code(), Some("E0107"));
    assert_eq!(DiagnosticCode::UnknownAssocTypeBinding.rustc_code(), Some("E0220"));
    assert_eq!(DiagnosticCode::MissingAssocTypeBindings.rustc_code(), Some("E0191"));
    assert_eq!(DiagnosticCode::ArgumentTypeMismatch.rustc_code(), Some("E0308"));
    assert!(DiagnosticCode::UnnecessaryQualification.is_lint());
    assert_eq!(DiagnosticCode::UnnecessaryQualification.severity(), Severity::Warning);
    assert_eq!(DiagnosticCode::ALL.len(), 9);
}

const TRAIT_OBJECTS: &str = r#"
trait Container {
    type Item;
    type Key;
    type Extra = ();
}
fn read(source: &dyn Container<Item = u8, Bogus = u8>) {}
fn bounded<T: Container<Item = u8>>(value: T) {}
"#;

#[test]
fn trait_objects_need_every_associated_type() {
    let found = bindings(TRAIT_OBJECTS);
    assert_eq!(
        messages(&found),
        vec![
            (
                DiagnosticCode::MissingAssocTypeBindings,
                "The value of the associated types `Key` (from trait `Container`) must be specified"
            ),
            (
                DiagnosticCode::UnknownAssocTypeBinding,
                "Associated type `Bogus` not found for `Container`"
            ),
        ]
    );
    assert!(fixed(TRAIT_OBJECTS, &found[0]).contains("dyn Container<Item = u8, Bogus = u8, Key=()>"));
    let removal = found[1].fix.as_ref().expect("fix");
    assert_eq!(removal.title, "Remove redundant associated type");
    assert!(fixed(TRAIT_OBJECTS, &found[1]).contains("&dyn Container<Item = u8>)"));
}

const SUPERTRAITS: &str = r#"
trait Base {
    type Zeta;
}
trait Derived: Base {
    type Alpha;
}
fn boxed(value: Box<dyn Derived>) {}
"#;

#[test]
fn missing_types_are_collected_from_supertraits_in_name_order() {
    let found = bindings(SUPERTRAITS);
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].message,
        "The value of the associated types `Alpha` (from trait `Derived`), \
         `Zeta` (from trait `Base`) must be specified"
    );
    let fix = found[0].fix.as_ref().expect("fix");
    assert_eq!(fix.title, "Add missing associated types");
    assert_eq!(fix.edits[0].placeholders.len(), 2);
    assert!(fixed(SUPERTRAITS, &found[0]).contains("Box<dyn Derived<Alpha=(), Zeta=()>>"));
}

#[test]
fn associated_types_list_each_name_once() {
    let (ws, krate) = workspace(SUPERTRAITS);
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let derived = ws
        .defs()
        .find(|(_, data)| data.krate == krate && data.name == "Derived")
        .map(|(id, _)| id)
        .expect("trait");
    let names: Vec<String> = assoc_types(&resolver, derived)
        .into_iter()
        .map(|assoc| assoc.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "Zeta"]);
}

const BOUNDS: &str = r#"
trait Source {
    type Item;
}
struct Numbers;
impl Source for Numbers {
    type Item = u8;
}
fn call(f: &dyn Fn(u8), source: impl Source) {}
fn given(source: &dyn Source<Item = u8>) {}
fn wrong<T: Source<Bogus = u8>>(value: T) {}
"#;

#[test]
fn bounds_and_fn_traits_only_check_unknown_names() {
    let found = bindings(BOUNDS);
    assert_eq!(
        messages(&found),
        vec![(
            DiagnosticCode::UnknownAssocTypeBinding,
            "Associated type `Bogus` not found for `Source`"
        )]
    );
    assert!(fixed(BOUNDS, &found[0]).contains("fn wrong<T: Source>(value: T) {}"));
}

const QUALIFIED: &str = r#"
mod shapes {
    pub struct Circle;
}
mod inner {
    pub struct Hidden;
}
use shapes::Circle;
fn draw(a: shapes::Circle, b: crate::shapes::Circle, c: std::vec::Vec<u8>, d: Vec<u8>, e: inner::Hidden) {}
"#;

#[test]
fn qualifiers_that_resolve_the_same_are_unnecessary() {
    let found = qualifications(QUALIFIED);
    let prefixes: Vec<&str> = found
        .iter()
        .map(|diagnostic| &QUALIFIED[diagnostic.span.range()])
        .collect();
    assert_eq!(prefixes, vec!["shapes::", "crate::shapes::", "std::vec::"]);
    assert!(found.iter().all(|diagnostic| {
        diagnostic.message == "Unnecessary qualification" && diagnostic.severity == Severity::Warning
    }));
    assert!(fixed(QUALIFIED, &found[1]).contains("b: Circle, c:"));
    assert_eq!(
        found[0].fix.as_ref().map(|fix| fix.title.as_str()),
        Some("Remove unnecessary path prefix")
    );
}

const CALL_ARGUMENTS: &str = r#"
fn foo(a: u32) {}
fn wild(_: u32) {}
fn run() {
    foo(true);
    foo(7);
    foo(7u32);
    foo("text");
    wild('c');
}
"#;

#[test]
fn argument_types_are_compared_with_parameters() {
    let found = arguments(CALL_ARGUMENTS);
    assert_eq!(
        messages(&found),
        vec![
            (
                DiagnosticCode::ArgumentTypeMismatch,
                "mismatched types: expected `u32`, found `bool`"
            ),
            (
                DiagnosticCode::ArgumentTypeMismatch,
                "mismatched types: expected `u32`, found `&str`"
            ),
            (
                DiagnosticCode::ArgumentTypeMismatch,
                "mismatched types: expected `u32`, found `char`"
            ),
        ]
    );
    let change = found[0].fix.as_ref().expect("fix");
    assert_eq!(change.title, "Change type of parameter `a` of function `foo` to `bool`");
    assert!(fixed(CALL_ARGUMENTS, &found[0]).contains("fn foo(a: bool) {}"));
    assert_eq!(
        found[2].fix.as_ref().map(|fix| fix.title.as_str()),
        Some("Change type of `1st` parameter of function `wild` to `char`")
    );
}

const METHOD_ARGUMENTS: &str = r#"
struct Counter;
impl Counter {
    fn add(&mut self, amount: u32) {}
}
fn run(counter: Counter) {
    counter.add(false);
    Counter::add(counter, 'x');
}
"#;

#[test]
fn method_arguments_skip_the_receiver() {
    let found = arguments(METHOD_ARGUMENTS);
    let titles: Vec<&str> = found
        .iter()
        .filter_map(|diagnostic| diagnostic.fix.as_ref())
        .map(|fix| fix.title.as_str())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Change type of parameter `amount` of method `add` to `bool`",
            "Change type of parameter `amount` of method `add` to `char`",
        ]
    );
}

const IMPORTED_ARGUMENT: &str = r#"
mod shapes {
    pub struct Circle;
}
mod api {
    pub fn draw(size: u32) {}
}
fn run() {
    api::draw(shapes::Circle);
}
"#;

#[test]
fn changed_parameter_types_bring_their_imports() {
    let found = arguments(IMPORTED_ARGUMENT);
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].message,
        "mismatched types: expected `u32`, found `shapes::Circle`"
    );
    let fix = found[0].fix.as_ref().expect("fix");
    assert_eq!(fix.kind, FixKind::ChangeParameterType);
    assert_eq!(fix.title, "Change type of parameter `size` of function `draw` to `Circle`");
    let result = fixed(IMPORTED_ARGUMENT, &found[0]);
    assert!(result.contains("mod api {use crate::shapes::Circle;\n"));
    assert!(result.contains("pub fn draw(size: Circle) {}"));
}

#[test]
fn imports_go_inside_the_nearest_inline_module() {
    let source = r#"
mod shapes {
    pub struct Circle;
}
mod outer {
    pub mod api
    {
        pub fn draw(size: u32) {}
    }
}
fn run() {
    outer::api::draw(shapes::Circle);
}
"#;
    let found = arguments(source);
    assert_eq!(found.len(), 1);
    let result = fixed(source, &found[0]);
    assert!(result.contains("pub mod api\n    {use crate::shapes::Circle;\n"), "{result}");
    assert!(result.contains("pub fn draw(size: Circle) {}"));
}

const FIELD_RECEIVERS: &str = r#"
struct A;
struct B;
impl A {
    fn put(&self, x: u8) {}
    fn fetch(&self) {}
}
impl B {
    fn put(&self, x: bool) {}
    fn fetch<T>(&self) {}
}
struct W {
    b: B,
}
struct Pair(A, B);
fn run(w: W, pair: Pair) {
    w.b.put(true);
    w.b.fetch::<u8>();
    pair.1.put(false);
    pair.0.put(true);
}
"#;

#[test]
fn field_receivers_use_the_declared_field_type() {
    let found = check(FIELD_RECEIVERS, CheckOptions::default());
    assert_eq!(
        messages(&found),
        vec![(
            DiagnosticCode::ArgumentTypeMismatch,
            "mismatched types: expected `u8`, found `bool`"
        )]
    );
    let fix = found[0].fix.as_ref().expect("fix");
    assert_eq!(fix.title, "Change type of parameter `x` of method `put` to `bool`");
    assert!(fixed(FIELD_RECEIVERS, &found[0]).contains("fn put(&self, x: bool) {}\n    fn fetch(&self) {}"));
}

#[test]
fn unknown_receivers_need_a_single_candidate() {
    let ambiguous = r#"
        struct A;
        struct B;
        impl A {
            fn put(&self, x: u8) {}
            fn fetch(&self) {}
        }
        impl B {
            fn put(&self, x: bool) {}
            fn fetch<T>(&self) {}
        }
        fn run(m: Mystery) {
            m.put(true);
            m.fetch::<u8>();
        }
    "#;
    assert!(check(ambiguous, CheckOptions::default()).is_empty());

    let single = r#"
        struct A;
        impl A {
            fn stamp(&self, x: u8) {}
        }
        fn run(m: Mystery) {
            m.stamp(true);
        }
    "#;
    assert_eq!(
        messages(&arguments(single)),
        vec![(
            DiagnosticCode::ArgumentTypeMismatch,
            "mismatched types: expected `u8`, found `bool`"
        )]
    );
}

#[test]
fn std_functions_get_no_parameter_fix() {
    let found = arguments(
        r#"
        fn run() {
            let boxed = Box::new(1);
            let text = String::new();
            text.push_str(5u8);
        }
        "#,
    );
    assert_eq!(found.len(), 1);
    assert!(found[0].fix.is_none());
}

#[test]
fn clean_code_has_no_diagnostics() {
    let found = check(
        r#"
        use std::collections::HashMap;
        trait Shape {
            type Unit;
            fn area(&self) -> f64;
        }
        struct Square(f64);
        impl Shape for Square {
            type Unit = f64;
            fn area(&self) -> f64 { 1.0 }
        }
        fn total(shapes: Vec<Box<dyn Shape<Unit = f64>>>, index: HashMap<String, u32>) -> f64 {
            let scale: f64 = 2.0;
            measure(scale, "m")
        }
        fn measure(value: f64, unit: &str) -> f64 { value }
        "#,
        CheckOptions::default(),
    );
    assert!(found.is_empty(), "unexpected diagnostics: {found:?}");
}
