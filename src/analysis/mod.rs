mod arity;
mod assoc;
mod check;
pub mod diagnostic;
mod qualification;
mod signature;
#[cfg(test)]
mod tests;

pub use arity::{check_arity, ArityVerdict, GenericDeclaration, UseSite};
pub use assoc::{assoc_types, AssocType};
pub use check::{check_crate, check_file, CheckOptions};
pub use diagnostic::{
    apply_edits, Diagnostic, DiagnosticCode, FixKind, Severity, SuggestedFix, TextEdit,
};
pub use qualification::shortest_equivalent_suffix;
