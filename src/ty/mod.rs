mod consts;
mod subst;
#[cfg(test)]
mod tests;

pub use consts::{eval_const, int_range, ConstValue};
pub use subst::{
    compose, expand_aliases, substitute_expr, substitute_type, substitution_for,
    substitution_for_path,
};

use crate::{
    language::{ast::Expr, types::{Lifetime, TypeExpr}},
    resolve::DefId,
};
use rustc_hash::FxHashMap;

/// What a generic parameter is replaced by.
#[derive(Clone, Debug, PartialEq)]
pub enum SubstValue {
    Type(TypeExpr),
    Const(Expr),
    Lifetime(Lifetime),
}

/// Generic parameter to argument mapping. Each parameter maps to at most one value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Substitution {
    values: FxHashMap<DefId, SubstValue>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, param: DefId, value: SubstValue) -> Option<SubstValue> {
        self.values.insert(param, value)
    }

    pub fn get(&self, param: DefId) -> Option<&SubstValue> {
        self.values.get(&param)
    }

    pub fn contains(&self, param: DefId) -> bool {
        self.values.contains_key(&param)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DefId, &SubstValue)> {
        self.values.iter().map(|(param, value)| (*param, value))
    }
}
