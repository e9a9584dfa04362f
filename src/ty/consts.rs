use crate::{
    language::{
        ast::{BinaryOp, Expr, LitKind, UnaryOp},
        types::TypeExpr,
    },
    resolve::{DefId, DefKind, Namespace, Resolver},
};

const MAX_EVAL_DEPTH: usize = 32;

/// Result of folding a constant expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstValue {
    Int(i128),
    Bool(bool),
    Char(char),
    Str(String),
    /// A const generic parameter without a value.
    Param(DefId),
    /// Depends on a const generic parameter.
    Symbolic,
    /// Overflow, division by zero, unresolved paths and unsupported expressions.
    Unknown,
}

impl ConstValue {
    pub fn is_known(&self) -> bool {
        matches!(
            self,
            ConstValue::Int(_) | ConstValue::Bool(_) | ConstValue::Char(_) | ConstValue::Str(_)
        )
    }

    fn is_generic(&self) -> bool {
        matches!(self, ConstValue::Param(_) | ConstValue::Symbolic)
    }
}

fn int_kind(ty: &str) -> Option<(u32, bool)> {
    let kind = match ty {
        "i8" => (8, true),
        "i16" => (16, true),
        "i32" => (32, true),
        "i64" | "isize" => (64, true),
        "i128" => (128, true),
        "u8" => (8, false),
        "u16" => (16, false),
        "u32" => (32, false),
        "u64" | "usize" => (64, false),
        "u128" => (128, false),
        _ => return None,
    };
    Some(kind)
}

/// Inclusive bounds of an integer primitive. `u128` is capped at `i128::MAX`.
pub fn int_range(ty: &str) -> Option<(i128, i128)> {
    let range = match int_kind(ty)? {
        (128, true) => (i128::MIN, i128::MAX),
        (128, false) => (0, i128::MAX),
        (bits, true) => (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1),
        (bits, false) => (0, (1i128 << bits) - 1),
    };
    Some(range)
}

fn checked_int(value: i128, ty: Option<&str>) -> ConstValue {
    match ty.and_then(int_range) {
        Some((min, max)) if value < min || value > max => ConstValue::Unknown,
        _ => ConstValue::Int(value),
    }
}

/// Two's-complement truncation performed by `as`.
fn wrap_int(value: i128, ty: &str) -> ConstValue {
    match int_kind(ty) {
        Some((128, true)) => ConstValue::Int(value),
        Some((128, false)) => checked_int(value, Some(ty)),
        Some((bits, signed)) => {
            let modulus = 1i128 << bits;
            let mut wrapped = value.rem_euclid(modulus);
            if signed && wrapped >= modulus / 2 {
                wrapped -= modulus;
            }
            ConstValue::Int(wrapped)
        }
        None => ConstValue::Unknown,
    }
}

fn primitive_name(ty: &TypeExpr) -> Option<&str> {
    match ty {
        TypeExpr::Path(path) if path.is_single() && path.segments[0].args.is_none() => {
            Some(path.last_name())
        }
        _ => None,
    }
}

/// Folds `expr`. Integers are checked against `expected` (an integer primitive name)
/// when given.
pub fn eval_const(resolver: &Resolver<'_>, expr: &Expr, expected: Option<&str>) -> ConstValue {
    eval(resolver, expr, expected, 0)
}

fn eval(resolver: &Resolver<'_>, expr: &Expr, expected: Option<&str>, depth: usize) -> ConstValue {
    if depth > MAX_EVAL_DEPTH {
        return ConstValue::Unknown;
    }
    match expr {
        Expr::Literal(lit) => match &lit.kind {
            LitKind::Int { value, suffix } => match i128::try_from(*value) {
                Ok(value) => checked_int(value, suffix.as_deref().or(expected)),
                Err(_) => ConstValue::Unknown,
            },
            LitKind::Bool(value) => ConstValue::Bool(*value),
            LitKind::Char(value) => ConstValue::Char(*value),
            LitKind::Byte(value) => ConstValue::Int(i128::from(*value)),
            LitKind::Str(value) => ConstValue::Str(value.clone()),
            LitKind::Float(_) | LitKind::ByteStr(_) => ConstValue::Unknown,
        },
        Expr::Path(path) => {
            let ws = resolver.workspace();
            let result = resolver.resolve(path);
            for def in result.in_namespace(Namespace::Values) {
                match &ws.def(def).kind {
                    DefKind::Const {
                        ty,
                        value: Some(value),
                    } => {
                        let ty = ty.as_ref().and_then(primitive_name).or(expected);
                        return eval(resolver, value, ty, depth + 1);
                    }
                    DefKind::ConstParam { .. } => return ConstValue::Param(def),
                    _ => {}
                }
            }
            ConstValue::Unknown
        }
        Expr::Paren(inner, _) => eval(resolver, inner, expected, depth + 1),
        Expr::Block { block, .. } if block.stmts.is_empty() => match block.tail.as_deref() {
            Some(tail) => eval(resolver, tail, expected, depth + 1),
            None => ConstValue::Unknown,
        },
        Expr::Unary { op, expr, .. } => {
            // `-128i8` negates a literal outside the type's range
            let operand_ty = if matches!(op, UnaryOp::Neg) { None } else { expected };
            let operand = eval(resolver, expr, operand_ty, depth + 1);
            unary(*op, operand, expected)
        }
        Expr::Binary {
            op, left, right, ..
        } => {
            let operand_ty = if op.is_comparison() { None } else { expected };
            let right_ty = match op {
                BinaryOp::Shl | BinaryOp::Shr => None,
                _ => operand_ty,
            };
            let left = eval(resolver, left, operand_ty, depth + 1);
            let right = eval(resolver, right, right_ty, depth + 1);
            binary(*op, left, right, expected)
        }
        Expr::Cast { expr, ty, .. } => {
            let Some(target) = primitive_name(ty).filter(|name| int_kind(name).is_some()) else {
                return ConstValue::Unknown;
            };
            match eval(resolver, expr, None, depth + 1) {
                ConstValue::Int(value) => wrap_int(value, target),
                ConstValue::Bool(value) => ConstValue::Int(i128::from(value)),
                ConstValue::Char(value) => wrap_int(i128::from(u32::from(value)), target),
                value if value.is_generic() => ConstValue::Symbolic,
                _ => ConstValue::Unknown,
            }
        }
        _ => ConstValue::Unknown,
    }
}

fn unary(op: UnaryOp, operand: ConstValue, ty: Option<&str>) -> ConstValue {
    match (op, operand) {
        (_, value) if value.is_generic() => ConstValue::Symbolic,
        (UnaryOp::Neg, ConstValue::Int(value)) => match value.checked_neg() {
            Some(negated) => checked_int(negated, ty),
            None => ConstValue::Unknown,
        },
        (UnaryOp::Not, ConstValue::Bool(value)) => ConstValue::Bool(!value),
        (UnaryOp::Not, ConstValue::Int(value)) => match ty.and_then(int_range) {
            Some((0, max)) => ConstValue::Int(max - value),
            _ => ConstValue::Int(!value),
        },
        _ => ConstValue::Unknown,
    }
}

fn binary(op: BinaryOp, left: ConstValue, right: ConstValue, ty: Option<&str>) -> ConstValue {
    use ConstValue::*;

    if left == Unknown || right == Unknown {
        return Unknown;
    }
    if left.is_generic() || right.is_generic() {
        return Symbolic;
    }
    match (left, right) {
        (Int(a), Int(b)) => {
            let folded = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Rem => a.checked_rem(b),
                BinaryOp::BitAnd => Some(a & b),
                BinaryOp::BitOr => Some(a | b),
                BinaryOp::BitXor => Some(a ^ b),
                BinaryOp::Shl => u32::try_from(b).ok().and_then(|shift| a.checked_shl(shift)),
                BinaryOp::Shr => u32::try_from(b).ok().and_then(|shift| a.checked_shr(shift)),
                BinaryOp::Eq => return Bool(a == b),
                BinaryOp::Ne => return Bool(a != b),
                BinaryOp::Lt => return Bool(a < b),
                BinaryOp::Le => return Bool(a <= b),
                BinaryOp::Gt => return Bool(a > b),
                BinaryOp::Ge => return Bool(a >= b),
                BinaryOp::And | BinaryOp::Or => None,
            };
            folded.map_or(Unknown, |value| checked_int(value, ty))
        }
        (Bool(a), Bool(b)) => match op {
            BinaryOp::And | BinaryOp::BitAnd => Bool(a && b),
            BinaryOp::Or | BinaryOp::BitOr => Bool(a || b),
            BinaryOp::BitXor | BinaryOp::Ne => Bool(a != b),
            BinaryOp::Eq => Bool(a == b),
            _ => Unknown,
        },
        (Char(a), Char(b)) => compare(op, a, b),
        (Str(a), Str(b)) => match op {
            BinaryOp::Eq => Bool(a == b),
            BinaryOp::Ne => Bool(a != b),
            _ => Unknown,
        },
        _ => Unknown,
    }
}

fn compare<T: Ord>(op: BinaryOp, a: T, b: T) -> ConstValue {
    match op {
        BinaryOp::Eq => ConstValue::Bool(a == b),
        BinaryOp::Ne => ConstValue::Bool(a != b),
        BinaryOp::Lt => ConstValue::Bool(a < b),
        BinaryOp::Le => ConstValue::Bool(a <= b),
        BinaryOp::Gt => ConstValue::Bool(a > b),
        BinaryOp::Ge => ConstValue::Bool(a >= b),
        _ => ConstValue::Unknown,
    }
}
