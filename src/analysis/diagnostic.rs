use crate::{language::span::Span, resolve::FileId};
use std::{cmp::Reverse, fmt, ops::Range};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCode {
    TooFewTypeArgsTypePos,
    TooManyTypeArgsTypePos,
    TooFewTypeArgsMethod,
    TooManyTypeArgsMethod,
    TooManyTypeArgsCall,
    UnknownAssocTypeBinding,
    MissingAssocTypeBindings,
    UnnecessaryQualification,
    ArgumentTypeMismatch,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 9] = [
        DiagnosticCode::TooFewTypeArgsTypePos,
        DiagnosticCode::TooManyTypeArgsTypePos,
        DiagnosticCode::TooFewTypeArgsMethod,
        DiagnosticCode::TooManyTypeArgsMethod,
        DiagnosticCode::TooManyTypeArgsCall,
        DiagnosticCode::UnknownAssocTypeBinding,
        DiagnosticCode::MissingAssocTypeBindings,
        DiagnosticCode::UnnecessaryQualification,
        DiagnosticCode::ArgumentTypeMismatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::TooFewTypeArgsTypePos => "TOO_FEW_TYPE_ARGS_TYPE_POS",
            DiagnosticCode::TooManyTypeArgsTypePos => "TOO_MANY_TYPE_ARGS_TYPE_POS",
            DiagnosticCode::TooFewTypeArgsMethod => "TOO_FEW_TYPE_ARGS_METHOD",
            DiagnosticCode::TooManyTypeArgsMethod => "TOO_MANY_TYPE_ARGS_METHOD",
            DiagnosticCode::TooManyTypeArgsCall => "TOO_MANY_TYPE_ARGS_CALL",
            DiagnosticCode::UnknownAssocTypeBinding => "UNKNOWN_ASSOC_TYPE_BINDING",
            DiagnosticCode::MissingAssocTypeBindings => "MISSING_ASSOC_TYPE_BINDINGS",
            DiagnosticCode::UnnecessaryQualification => "UNNECESSARY_QUALIFICATION",
            DiagnosticCode::ArgumentTypeMismatch => "ARGUMENT_TYPE_MISMATCH",
        }
    }

    /// The rustc error code for the same problem. Lints have none.
    pub fn rustc_code(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::TooFewTypeArgsTypePos
            | DiagnosticCode::TooManyTypeArgsTypePos
            | DiagnosticCode::TooFewTypeArgsMethod
            | DiagnosticCode::TooManyTypeArgsMethod
            | DiagnosticCode::TooManyTypeArgsCall => Some("E0107"),
            DiagnosticCode::UnknownAssocTypeBinding => Some("E0220"),
            DiagnosticCode::MissingAssocTypeBindings => Some("E0191"),
            DiagnosticCode::ArgumentTypeMismatch => Some("E0308"),
            DiagnosticCode::UnnecessaryQualification => None,
        }
    }

    pub fn is_lint(self) -> bool {
        self.rustc_code().is_none()
    }

    pub fn severity(self) -> Severity {
        if self.is_lint() {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Replace `span` of `file` with `replacement`. `placeholders` are byte ranges
/// inside `replacement` meant to be filled in by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub file: FileId,
    pub span: Span,
    pub replacement: String,
    pub placeholders: Vec<Range<usize>>,
}

impl TextEdit {
    pub fn insert(file: FileId, offset: usize, text: impl Into<String>) -> Self {
        Self {
            file,
            span: Span::empty(offset),
            replacement: text.into(),
            placeholders: Vec::new(),
        }
    }

    pub fn delete(file: FileId, span: Span) -> Self {
        Self {
            file,
            span,
            replacement: String::new(),
            placeholders: Vec::new(),
        }
    }

    pub fn replace(file: FileId, span: Span, text: impl Into<String>) -> Self {
        Self {
            file,
            span,
            replacement: text.into(),
            placeholders: Vec::new(),
        }
    }

    /// Marks every occurrence of `placeholder` in the replacement.
    pub fn with_placeholders(mut self, placeholder: &str) -> Self {
        self.placeholders = self
            .replacement
            .match_indices(placeholder)
            .map(|(start, text)| start..start + text.len())
            .collect();
        self
    }
}

/// Applies non-overlapping edits of one file to its source text.
pub fn apply_edits<'e>(source: &str, edits: impl IntoIterator<Item = &'e TextEdit>) -> String {
    let mut ordered: Vec<&TextEdit> = edits.into_iter().collect();
    ordered.sort_by_key(|edit| Reverse((edit.span.start, edit.span.end)));
    let mut out = source.to_string();
    for edit in ordered {
        out.replace_range(edit.span.range(), &edit.replacement);
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixKind {
    AddTypeArguments,
    RemoveTypeArguments,
    AddAssocTypeBindings,
    RemoveAssocTypeBinding,
    RemovePathPrefix,
    ChangeParameterType,
}

impl FixKind {
    pub fn id(self) -> &'static str {
        match self {
            FixKind::AddTypeArguments => "add-type-arguments",
            FixKind::RemoveTypeArguments => "remove-type-arguments",
            FixKind::AddAssocTypeBindings => "add-assoc-type-bindings",
            FixKind::RemoveAssocTypeBinding => "remove-assoc-type-binding",
            FixKind::RemovePathPrefix => "remove-path-prefix",
            FixKind::ChangeParameterType => "change-parameter-type",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestedFix {
    pub kind: FixKind,
    pub title: String,
    pub edits: Vec<TextEdit>,
}

impl SuggestedFix {
    pub fn new(kind: FixKind, title: impl Into<String>, edits: Vec<TextEdit>) -> Self {
        Self {
            kind,
            title: title.into(),
            edits,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub file: FileId,
    pub span: Span,
    pub message: String,
    pub fix: Option<SuggestedFix>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, file: FileId, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            file,
            span,
            message: message.into(),
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.fix = Some(fix);
        self
    }
}
