use crate::error;
use crate::lang::Error;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// The one dynamic value passed everywhere.
///
/// Booleans are numbers: true is -1 (all bits set), false is 0, matching the
/// bitwise logic operators. Tuples only appear as expression intermediates.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Num(i64),
    Text(Rc<str>),
    Tuple(Vec<Val>),
}

impl Val {
    pub fn text(s: &str) -> Val {
        Val::Text(s.into())
    }

    pub fn from_bool(b: bool) -> Val {
        if b {
            Val::Num(-1)
        } else {
            Val::Num(0)
        }
    }

    /// Single-element tuples collapse to their element.
    pub fn flatten(self) -> Val {
        match self {
            Val::Tuple(mut v) if v.len() == 1 => v.pop().unwrap_or(Val::Num(0)).flatten(),
            other => other,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Val::Text(_))
    }

    /// True when numeric coercion would succeed.
    pub fn is_num_convertible(&self) -> bool {
        match self {
            Val::Num(_) => true,
            Val::Text(s) => parse_num(s).is_some(),
            Val::Tuple(v) => v.len() == 1 && v[0].is_num_convertible(),
        }
    }

    /// Numeric coercion. Text parses a leading numeric prefix and fails only
    /// if anything besides trailing whitespace remains; blank text is zero.
    pub fn as_num(&self) -> Result<i64> {
        match self {
            Val::Num(n) => Ok(*n),
            Val::Text(s) => parse_num(s).ok_or_else(|| error!(TypeMismatch)),
            Val::Tuple(v) => {
                if v.len() == 1 {
                    v[0].as_num()
                } else {
                    Err(error!(TypeMismatch))
                }
            }
        }
    }

    /// Textual coercion; numbers stringify in plain decimal.
    pub fn as_text(&self) -> Result<Rc<str>> {
        match self {
            Val::Num(n) => Ok(n.to_string().into()),
            Val::Text(s) => Ok(s.clone()),
            Val::Tuple(v) => {
                if v.len() == 1 {
                    v[0].as_text()
                } else {
                    Err(error!(TypeMismatch))
                }
            }
        }
    }

    /// Condition truth for IF and IIF: nonzero number, or text that is
    /// neither blank nor a zero numeral.
    pub fn truth(&self) -> bool {
        match self {
            Val::Num(n) => *n != 0,
            Val::Text(s) => match parse_num(s) {
                Some(n) => n != 0,
                None => !s.trim().is_empty(),
            },
            Val::Tuple(v) => !v.is_empty(),
        }
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Val::Num(n) => write!(f, "{}", n),
            Val::Text(s) => write!(f, "{}", s),
            Val::Tuple(v) => {
                write!(f, "[")?;
                for (i, val) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn parse_num(s: &str) -> Option<i64> {
    let s = s.trim_start_matches(|c: char| c.is_whitespace());
    if s.trim_end().is_empty() {
        return Some(0);
    }
    let (sign, digits) = match s.as_bytes()[0] {
        b'-' => (-1i64, &s[1..]),
        b'+' => (1, &s[1..]),
        _ => (1, s),
    };
    let mut value: i64 = 0;
    let mut len = 0;
    for c in digits.chars() {
        if let Some(d) = c.to_digit(10) {
            value = value.wrapping_mul(10).wrapping_add(d as i64);
            len += 1;
        } else {
            break;
        }
    }
    if len == 0 {
        return None;
    }
    if !digits[len..].trim_end().is_empty() {
        return None;
    }
    Some(sign * value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_num() {
        assert_eq!(Val::text("42").as_num().unwrap(), 42);
        assert_eq!(Val::text(" -7  ").as_num().unwrap(), -7);
        assert_eq!(Val::text("").as_num().unwrap(), 0);
        assert_eq!(Val::text("  ").as_num().unwrap(), 0);
        assert!(Val::text("3a").as_num().is_err());
        assert!(Val::text("a3").as_num().is_err());
    }

    #[test]
    fn test_num_to_text() {
        assert_eq!(Val::Num(-5).as_text().unwrap().as_ref(), "-5");
    }

    #[test]
    fn test_flatten() {
        let v = Val::Tuple(vec![Val::Tuple(vec![Val::Num(9)])]);
        assert_eq!(v.flatten(), Val::Num(9));
    }

    #[test]
    fn test_truth() {
        assert!(Val::Num(-1).truth());
        assert!(!Val::text("0").truth());
        assert!(!Val::text("  ").truth());
        assert!(Val::text("yes").truth());
    }
}
