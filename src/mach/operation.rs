use super::Val;
use crate::error;
use crate::lang::Error;
use std::cmp::Ordering;

type Result<T> = std::result::Result<T, Error>;

/// Binary and unary operator semantics over `Val`.
pub struct Operation {}

impl Operation {
    pub fn negate(val: Val) -> Result<Val> {
        Ok(Val::Num(-val.as_num()?))
    }

    /// `+` concatenates two texts, adds two numerics, and otherwise falls
    /// back to textual concatenation.
    pub fn sum(lhs: Val, rhs: Val) -> Result<Val> {
        let (lhs, rhs) = (lhs.flatten(), rhs.flatten());
        if lhs.is_text() && rhs.is_text() {
            return Operation::concat(lhs, rhs);
        }
        if lhs.is_num_convertible() && rhs.is_num_convertible() {
            return Ok(Val::Num(lhs.as_num()?.wrapping_add(rhs.as_num()?)));
        }
        Operation::concat(lhs, rhs)
    }

    pub fn concat(lhs: Val, rhs: Val) -> Result<Val> {
        let mut s = lhs.as_text()?.to_string();
        s.push_str(&rhs.as_text()?);
        Ok(Val::Text(s.into()))
    }

    pub fn subtract(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::Num(lhs.as_num()?.wrapping_sub(rhs.as_num()?)))
    }

    pub fn multiply(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::Num(lhs.as_num()?.wrapping_mul(rhs.as_num()?)))
    }

    pub fn divide(lhs: Val, rhs: Val) -> Result<Val> {
        let r = rhs.as_num()?;
        if r == 0 {
            return Err(error!(DivisionByZero));
        }
        Ok(Val::Num(lhs.as_num()?.wrapping_div(r)))
    }

    pub fn modulo(lhs: Val, rhs: Val) -> Result<Val> {
        let r = rhs.as_num()?;
        if r == 0 {
            return Err(error!(DivisionByZero));
        }
        Ok(Val::Num(lhs.as_num()?.wrapping_rem(r)))
    }

    pub fn and(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::Num(lhs.as_num()? & rhs.as_num()?))
    }

    pub fn or(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::Num(lhs.as_num()? | rhs.as_num()?))
    }

    pub fn not(val: Val) -> Result<Val> {
        Ok(Val::Num(!val.as_num()?))
    }

    /// Common-type comparison: numeric when both sides convert, textual
    /// otherwise. Tuples compare element-wise.
    pub fn compare(lhs: &Val, rhs: &Val) -> Result<Ordering> {
        if let (Val::Tuple(l), Val::Tuple(r)) = (lhs, rhs) {
            for (a, b) in l.iter().zip(r.iter()) {
                match Operation::compare(a, b)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            return Ok(l.len().cmp(&r.len()));
        }
        if lhs.is_num_convertible() && rhs.is_num_convertible() {
            Ok(lhs.as_num()?.cmp(&rhs.as_num()?))
        } else {
            Ok(lhs.as_text()?.cmp(&rhs.as_text()?))
        }
    }

    pub fn equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(
            Operation::compare(&lhs, &rhs)? == Ordering::Equal,
        ))
    }

    pub fn not_equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(
            Operation::compare(&lhs, &rhs)? != Ordering::Equal,
        ))
    }

    pub fn less(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(
            Operation::compare(&lhs, &rhs)? == Ordering::Less,
        ))
    }

    pub fn less_equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(
            Operation::compare(&lhs, &rhs)? != Ordering::Greater,
        ))
    }

    pub fn greater(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(
            Operation::compare(&lhs, &rhs)? == Ordering::Greater,
        ))
    }

    pub fn greater_equal(lhs: Val, rhs: Val) -> Result<Val> {
        Ok(Val::from_bool(
            Operation::compare(&lhs, &rhs)? != Ordering::Less,
        ))
    }
}
