use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Size limited operand stack
///
/// Overflow surfaces as the STACK OVERFLOW script error; underflow is a
/// compiler bug and reports as a syntax error with a marker message.

pub struct Stack<T> {
    overflow_message: &'static str,
    vec: Vec<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.vec)
    }
}

impl<T> Stack<T> {
    pub fn new(overflow_message: &'static str) -> Stack<T> {
        Stack {
            overflow_message,
            vec: vec![],
        }
    }
    fn max_len(&self) -> usize {
        u16::max_value() as usize
    }
    fn overflow_check(&self) -> Result<()> {
        if self.vec.len() > self.max_len() {
            Err(error!(StackOverflow; self.overflow_message))
        } else {
            Ok(())
        }
    }
    fn underflow_error(&self) -> Error {
        error!(Syntax; "STACK UNDERFLOW")
    }
    pub fn clear(&mut self) {
        self.vec.clear()
    }
    pub fn len(&self) -> usize {
        self.vec.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
    pub fn last(&self) -> Option<&T> {
        self.vec.last()
    }
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.vec.last_mut()
    }
    pub fn push(&mut self, val: T) -> Result<()> {
        self.vec.push(val);
        self.overflow_check()
    }
    pub fn pop(&mut self) -> Result<T> {
        match self.vec.pop() {
            Some(v) => Ok(v),
            None => Err(self.underflow_error()),
        }
    }
    pub fn pop_2(&mut self) -> Result<(T, T)> {
        let two = self.pop()?;
        let one = self.pop()?;
        Ok((one, two))
    }
    pub fn last_n_mut(&mut self, len: usize) -> Result<&mut [T]> {
        if len > self.vec.len() {
            Err(self.underflow_error())
        } else {
            let at = self.vec.len() - len;
            Ok(&mut self.vec[at..])
        }
    }
    pub fn pop_n(&mut self, len: usize) -> Result<Vec<T>> {
        if len > self.vec.len() {
            Err(self.underflow_error())
        } else {
            let range = (self.vec.len() - len)..;
            Ok(self.vec.drain(range).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_n_order() {
        let mut s: Stack<i64> = Stack::new("TEST");
        for n in 1..=4 {
            s.push(n).unwrap();
        }
        assert_eq!(s.pop_n(3).unwrap(), vec![2, 3, 4]);
        assert_eq!(s.pop().unwrap(), 1);
        assert!(s.pop().is_err());
    }

    #[test]
    fn test_last_n_mut() {
        let mut s: Stack<i64> = Stack::new("TEST");
        for n in 1..=3 {
            s.push(n).unwrap();
        }
        for v in s.last_n_mut(2).unwrap() {
            *v *= 10;
        }
        assert_eq!(s.pop_n(3).unwrap(), vec![1, 20, 30]);
        assert!(s.last_n_mut(9).is_err());
    }
}
