use super::{
    arity, assoc,
    diagnostic::{Diagnostic, DiagnosticCode},
    qualification, signature,
};
use crate::{
    language::{
        ast::Expr,
        types::Path,
        visit::{walk_file, PathContext, Visitor},
    },
    resolve::{CrateId, FileId, Resolver},
};
use serde::Deserialize;
use tracing::debug;

/// Which checks run. Everything is on by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckOptions {
    pub type_arguments: bool,
    pub assoc_type_bindings: bool,
    pub unnecessary_qualifications: bool,
    pub argument_types: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            type_arguments: true,
            assoc_type_bindings: true,
            unnecessary_qualifications: true,
            argument_types: true,
        }
    }
}

impl CheckOptions {
    pub fn enables(&self, code: DiagnosticCode) -> bool {
        match code {
            DiagnosticCode::TooFewTypeArgsTypePos
            | DiagnosticCode::TooManyTypeArgsTypePos
            | DiagnosticCode::TooFewTypeArgsMethod
            | DiagnosticCode::TooManyTypeArgsMethod
            | DiagnosticCode::TooManyTypeArgsCall => self.type_arguments,
            DiagnosticCode::UnknownAssocTypeBinding | DiagnosticCode::MissingAssocTypeBindings => {
                self.assoc_type_bindings
            }
            DiagnosticCode::UnnecessaryQualification => self.unnecessary_qualifications,
            DiagnosticCode::ArgumentTypeMismatch => self.argument_types,
        }
    }
}

struct Checker<'r, 'w> {
    resolver: &'r Resolver<'w>,
    file: FileId,
    options: CheckOptions,
    diagnostics: Vec<Diagnostic>,
}

impl Checker<'_, '_> {
    fn check_path(&mut self, path: &Path, cx: PathContext) {
        if self.options.type_arguments && cx == PathContext::Type {
            self.diagnostics
                .extend(arity::check_type_path(self.resolver, self.file, path));
        }
        if self.options.assoc_type_bindings {
            self.diagnostics
                .extend(assoc::check_bindings(self.resolver, self.file, path, cx));
        }
        if self.options.unnecessary_qualifications {
            self.diagnostics
                .extend(qualification::check_path(self.resolver, self.file, path));
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        if self.options.type_arguments {
            let found = match expr {
                Expr::Call { callee, .. } => match callee.as_ref() {
                    Expr::Path(path) => arity::check_call(self.resolver, self.file, path),
                    _ => None,
                },
                Expr::MethodCall {
                    receiver, method, ..
                } if method.args.is_some() => self
                    .resolver
                    .method_target(receiver, &method.name)
                    .and_then(|def| arity::check_method_call(self.resolver, self.file, def, method)),
                _ => None,
            };
            self.diagnostics.extend(found);
        }
        if self.options.argument_types {
            self.diagnostics
                .extend(signature::check_arguments(self.resolver, self.file, expr));
        }
    }
}

impl<'a> Visitor<'a> for Checker<'_, '_> {
    fn visit_path(&mut self, path: &'a Path, cx: PathContext) {
        self.check_path(path, cx);
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        self.check_expr(expr);
    }
}

/// Runs the enabled checks over one file.
pub fn check_file(resolver: &Resolver<'_>, file: FileId, options: CheckOptions) -> Vec<Diagnostic> {
    let data = resolver.workspace().file(file);
    let mut checker = Checker {
        resolver,
        file,
        options,
        diagnostics: Vec::new(),
    };
    walk_file(&data.syntax, &mut checker);
    let mut diagnostics = checker.diagnostics;
    sort(&mut diagnostics);
    debug!(
        target: "rustpath::analysis",
        file = %data.path.display(),
        diagnostics = diagnostics.len(),
        "checked file"
    );
    diagnostics
}

/// Runs the enabled checks over every file of a crate.
pub fn check_crate(resolver: &Resolver<'_>, krate: CrateId, options: CheckOptions) -> Vec<Diagnostic> {
    let ws = resolver.workspace();
    let mut diagnostics: Vec<Diagnostic> = ws
        .files()
        .filter(|(_, data)| data.krate == krate)
        .flat_map(|(file, _)| check_file(resolver, file, options))
        .collect();
    sort(&mut diagnostics);
    diagnostics
}

fn sort(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|diagnostic| (diagnostic.file, diagnostic.span.start, diagnostic.code));
}

