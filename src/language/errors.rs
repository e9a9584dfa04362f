use crate::language::{lexer::LexError, span::Span};
use miette::SourceSpan;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_source_span(&self) -> SourceSpan {
        self.span.into()
    }
}

impl From<LexError> for SyntaxError {
    fn from(err: LexError) -> Self {
        SyntaxError::new(err.message, err.span)
    }
}

#[derive(Clone, Debug, Error)]
#[error("{} syntax error(s), first: {}", .errors.len(), first_message(.errors))]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxErrors {
    pub fn new(errors: Vec<SyntaxError>) -> Self {
        Self { errors }
    }

    pub fn single(error: SyntaxError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

fn first_message(errors: &[SyntaxError]) -> &str {
    errors.first().map(|err| err.message.as_str()).unwrap_or("<none>")
}
