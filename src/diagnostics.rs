use crate::{
    analysis::{Diagnostic as CheckDiagnostic, Severity},
    language::errors::SyntaxError,
    registry::DependencyIssue,
    resolve::{FileErrors, Workspace},
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(rustpath::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: "here".to_string(),
        }
    }
}

pub fn emit_syntax_errors(errors: &[FileErrors]) {
    for file in errors {
        let src = NamedSource::new(file.path.display().to_string(), file.source.clone());
        for err in &file.errors {
            let diagnostic = SyntaxDiagnostic::from_error(src.clone(), err);
            eprintln!("{:?}", Report::new(diagnostic));
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(rustpath::check))]
pub struct CheckError {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(rustpath::lint), severity(Warning))]
pub struct LintWarning {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

/// Builds the miette report for a check result, with the source of its file attached.
pub fn check_report(ws: &Workspace, diagnostic: &CheckDiagnostic) -> Report {
    let file = ws.file(diagnostic.file);
    let src = NamedSource::new(file.path.display().to_string(), file.source.clone());
    let code = diagnostic.code;
    let message = match code.rustc_code() {
        Some(rustc) => format!("{} [{rustc}]", diagnostic.message),
        None => diagnostic.message.clone(),
    };
    let help = diagnostic.fix.as_ref().map(|fix| format!("{} ({})", fix.title, fix.kind.id()));
    let label = code.as_str().to_ascii_lowercase();
    let span = SourceSpan::from(diagnostic.span);
    match diagnostic.severity {
        Severity::Error => Report::new(CheckError {
            src,
            span,
            help,
            message,
            label,
        }),
        Severity::Warning => Report::new(LintWarning {
            src,
            span,
            help,
            message,
            label,
        }),
    }
}

/// Prints every diagnostic and returns how many were errors.
pub fn emit_diagnostics(ws: &Workspace, diagnostics: &[CheckDiagnostic]) -> usize {
    for diagnostic in diagnostics {
        eprintln!("{:?}", check_report(ws, diagnostic));
    }
    diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Error)
        .count()
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("dependency `{name}`: {issue}")]
#[diagnostic(code(rustpath::registry))]
pub struct DependencyDiagnostic {
    name: String,
    issue: DependencyIssue,
    #[help]
    help: Option<String>,
}

pub fn emit_dependency_issue(name: &str, issue: DependencyIssue) {
    let help = match &issue {
        DependencyIssue::CrateNotFound { .. } => Some("check the crate name in rustpath.toml".to_string()),
        DependencyIssue::NoMatchingVersion { .. } => Some("relax the version requirement".to_string()),
        DependencyIssue::InvalidRequirement(_) => None,
    };
    let diagnostic = DependencyDiagnostic {
        name: name.to_string(),
        issue,
        help,
    };
    eprintln!("{:?}", Report::new(diagnostic));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{check_file, CheckOptions},
        language::span::Span,
        resolve::{ResolveCache, Resolver},
    };

    fn checked(source: &str) -> (Workspace, Vec<CheckDiagnostic>) {
        let mut ws = Workspace::new().expect("std");
        let krate = ws.add_crate("demo", "demo/lib.rs", source, &[]).expect("crate");
        let file = ws.crate_data(krate).root_file;
        let cache = ResolveCache::new();
        let diagnostics = check_file(&Resolver::new(&ws, &cache), file, CheckOptions::default());
        (ws, diagnostics)
    }

    #[test]
    fn errors_carry_the_rustc_code_and_fix() {
        let (ws, diagnostics) = checked("struct Unit;\nfn f(_: Unit<u8>) {}\n");
        assert_eq!(diagnostics.len(), 1);
        let report = check_report(&ws, &diagnostics[0]);
        assert!(report.to_string().ends_with("[E0107]"));
        assert_eq!(report.code().map(|code| code.to_string()).as_deref(), Some("rustpath::check"));
        let help = report.help().map(|help| help.to_string()).expect("help");
        assert!(help.starts_with("Remove all type arguments"));
        let label = report.labels().and_then(|mut labels| labels.next()).expect("label");
        assert_eq!(label.label(), Some("too_many_type_args_type_pos"));
    }

    #[test]
    fn lints_are_warnings() {
        let (ws, diagnostics) = checked("mod shapes { pub struct Circle; }\nfn f(_: shapes::Circle) {}\nuse shapes::Circle;\n");
        let lint = diagnostics
            .iter()
            .find(|diagnostic| diagnostic.severity == Severity::Warning)
            .expect("lint");
        let report = check_report(&ws, lint);
        assert_eq!(report.severity(), Some(miette::Severity::Warning));
        assert_eq!(report.to_string(), "Unnecessary qualification");
    }

    #[test]
    fn syntax_errors_keep_their_file_name() {
        let src = NamedSource::new("demo/lib.rs", "fn f( {}\n".to_string());
        let err = SyntaxError::new("expected `)`", Span::new(6, 7)).with_help("close the parameter list");
        let first = Report::new(SyntaxDiagnostic::from_error(src.clone(), &err));
        let second = Report::new(SyntaxDiagnostic::from_error(src, &err));
        assert_eq!(first.to_string(), "expected `)`");
        assert_eq!(
            second.help().map(|help| help.to_string()).as_deref(),
            Some("close the parameter list")
        );
        let label = first.labels().and_then(|mut labels| labels.next()).expect("label");
        assert_eq!(label.label(), Some("here"));
        assert_eq!((label.offset(), label.len()), (6, 1));
        let contents = first
            .source_code()
            .expect("source")
            .read_span(label.inner(), 0, 0)
            .expect("span contents");
        assert_eq!(contents.name(), Some("demo/lib.rs"));
    }

    #[test]
    fn dependency_issues_render_their_message() {
        let diagnostic = DependencyDiagnostic {
            name: "serde".to_string(),
            issue: DependencyIssue::NoMatchingVersion {
                req: "^9".to_string(),
            },
            help: None,
        };
        assert_eq!(diagnostic.to_string(), "dependency `serde`: No version found matching ^9");
    }
}
