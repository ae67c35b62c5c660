use super::Val;
use crate::error;
use crate::lang::{text, Error};
use indexmap::IndexMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

pub const BUCKETS: usize = 256;
pub const BUCKET_SLOTS: usize = 32;

/// One array element. The numeric and textual parts coexist; a `$` prefix
/// on the referencing identifier selects which one is read or written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Elem {
    pub num: i64,
    pub text: Option<Rc<str>>,
}

/// A named value array with an ordered text-key index for associative
/// access. Element order is stable and is the save order.
#[derive(Debug, Clone, Default)]
pub struct Variable {
    pub name: Rc<str>,
    pub values: Vec<Elem>,
    pub keys: IndexMap<Box<str>, usize>,
}

impl Variable {
    fn new(name: Rc<str>) -> Variable {
        Variable {
            name,
            values: vec![],
            keys: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolves a text key to an element index. A missing key maps to the
    /// current element count: scripts probe for existence by comparing the
    /// result against ARRSIZE, so this must not be an error.
    pub fn key_index(&self, key: &str) -> usize {
        let folded = text::fold(key);
        match self.keys.get(folded.as_str()) {
            Some(index) => *index,
            None => self.values.len(),
        }
    }

    fn key_index_create(&mut self, key: &str) -> usize {
        let folded = text::fold(key);
        if let Some(index) = self.keys.get(folded.as_str()) {
            return *index;
        }
        let index = self.values.len();
        self.keys.insert(folded.into_boxed_str(), index);
        index
    }

    pub fn fetch(&self, index: usize, text_part: bool) -> Val {
        match self.values.get(index) {
            None => {
                if text_part {
                    Val::text("")
                } else {
                    Val::Num(0)
                }
            }
            Some(elem) => {
                if text_part {
                    match &elem.text {
                        Some(s) => Val::Text(s.clone()),
                        None => Val::text(""),
                    }
                } else {
                    Val::Num(elem.num)
                }
            }
        }
    }

    fn store(&mut self, index: usize, text_part: bool, value: Val) -> Result<()> {
        if index >= self.values.len() {
            self.values.resize(index + 1, Elem::default());
        }
        let elem = &mut self.values[index];
        if text_part {
            elem.text = Some(value.as_text()?);
        } else {
            elem.num = value.as_num()?;
        }
        Ok(())
    }

    pub fn remove_element(&mut self, index: usize) {
        if index >= self.values.len() {
            return;
        }
        self.values.remove(index);
        self.keys.retain(|_, v| *v != index);
        for v in self.keys.values_mut() {
            if *v > index {
                *v -= 1;
            }
        }
    }
}

/// ## Hashed variable store
///
/// Fixed capacity: an 8-bit rolling hash of the folded name picks one of 256
/// buckets, each holding up to 32 slots searched linearly. Exhausting a
/// bucket is the fatal TOO MANY VARIABLES condition; there is no rehashing.
#[derive(Debug)]
pub struct Vars {
    buckets: Vec<Vec<Variable>>,
}

impl Default for Vars {
    fn default() -> Vars {
        Vars {
            buckets: (0..BUCKETS).map(|_| vec![]).collect(),
        }
    }
}

impl Vars {
    pub fn new() -> Vars {
        Vars::default()
    }

    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
    }

    fn hash(folded: &str) -> usize {
        let mut h: u8 = 0;
        for b in folded.bytes() {
            h = h.wrapping_mul(7).wrapping_add(b);
        }
        h as usize
    }

    fn check_name(name: &str) -> Result<()> {
        if text::is_valid_name(name) {
            Ok(())
        } else {
            Err(error!(IncorrectName))
        }
    }

    /// Finds the slot for `name`, creating it when asked. The name must not
    /// carry the `$` marker.
    pub fn reference(&mut self, name: &str, create: bool) -> Result<Option<&mut Variable>> {
        Vars::check_name(name)?;
        let folded = text::fold(name);
        let bucket = Vars::hash(&folded);
        let slots = &mut self.buckets[bucket];
        if let Some(at) = slots.iter().position(|v| *v.name == folded) {
            return Ok(Some(&mut slots[at]));
        }
        if !create {
            return Ok(None);
        }
        if slots.len() >= BUCKET_SLOTS {
            return Err(error!(TooManyVariables));
        }
        slots.push(Variable::new(folded.into()));
        Ok(slots.last_mut())
    }

    pub fn find(&self, name: &str) -> Option<&Variable> {
        let folded = text::fold(name);
        let bucket = Vars::hash(&folded);
        self.buckets[bucket].iter().find(|v| *v.name == folded)
    }

    /// Reads one element; absent variables and out-of-range indices yield
    /// the type's default.
    pub fn fetch(&self, name: &str, index: usize, text_part: bool) -> Result<Val> {
        Vars::check_name(name)?;
        match self.find(name) {
            Some(var) => Ok(var.fetch(index, text_part)),
            None => Ok(if text_part {
                Val::text("")
            } else {
                Val::Num(0)
            }),
        }
    }

    /// Resolves an index value against a variable: numbers index directly
    /// (clamped at zero), text goes through the key map.
    pub fn index_of(&mut self, name: &str, index: &Val, create: bool) -> Result<usize> {
        match index {
            Val::Text(key) => {
                if create {
                    match self.reference(name, true)? {
                        Some(var) => Ok(var.key_index_create(key)),
                        None => Ok(0),
                    }
                } else {
                    Vars::check_name(name)?;
                    Ok(self.find(name).map_or(0, |var| var.key_index(key)))
                }
            }
            _ => {
                let n = index.as_num()?;
                Ok(if n < 0 { 0 } else { n as usize })
            }
        }
    }

    pub fn store(&mut self, name: &str, index: usize, text_part: bool, value: Val) -> Result<()> {
        match self.reference(name, true)? {
            Some(var) => var.store(index, text_part, value),
            None => Ok(()),
        }
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        Vars::check_name(name)?;
        let folded = text::fold(name);
        let bucket = Vars::hash(&folded);
        self.buckets[bucket].retain(|v| *v.name != folded);
        Ok(())
    }

    /// Detaches a whole variable; used to save ARGS/RESULT around calls.
    pub fn take(&mut self, name: &str) -> Option<Variable> {
        let folded = text::fold(name);
        let bucket = Vars::hash(&folded);
        let slots = &mut self.buckets[bucket];
        let at = slots.iter().position(|v| *v.name == folded)?;
        Some(slots.remove(at))
    }

    /// Re-attaches a variable detached with `take`, replacing any value
    /// stored under the name in between.
    pub fn put(&mut self, var: Variable) {
        let bucket = Vars::hash(&var.name);
        let slots = &mut self.buckets[bucket];
        if let Some(at) = slots.iter().position(|v| v.name == var.name) {
            slots[at] = var;
        } else {
            slots.push(var);
        }
    }

    /// Every non-empty variable in bucket order; this is the save order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.buckets
            .iter()
            .flat_map(|b| b.iter())
            .filter(|v| !v.is_empty())
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    #[test]
    fn test_case_insensitive_single_slot() {
        let mut vars = Vars::new();
        vars.store("money", 0, false, Val::Num(5)).unwrap();
        vars.store("MONEY", 0, false, Val::Num(7)).unwrap();
        assert_eq!(vars.fetch("Money", 0, false).unwrap(), Val::Num(7));
        assert_eq!(vars.count(), 1);
    }

    #[test]
    fn test_incorrect_name() {
        let mut vars = Vars::new();
        assert!(vars
            .store("9lives", 0, false, Val::Num(1))
            .unwrap_err()
            .is(ErrorCode::IncorrectName));
        assert!(vars
            .store("a b", 0, false, Val::Num(1))
            .unwrap_err()
            .is(ErrorCode::IncorrectName));
        assert!(vars
            .store("", 0, false, Val::Num(1))
            .unwrap_err()
            .is(ErrorCode::IncorrectName));
    }

    #[test]
    fn test_both_parts_coexist() {
        let mut vars = Vars::new();
        vars.store("x", 2, false, Val::Num(9)).unwrap();
        vars.store("x", 2, true, Val::text("nine")).unwrap();
        assert_eq!(vars.fetch("x", 2, false).unwrap(), Val::Num(9));
        assert_eq!(vars.fetch("x", 2, true).unwrap(), Val::text("nine"));
        // earlier elements were filled in
        assert_eq!(vars.fetch("x", 0, false).unwrap(), Val::Num(0));
    }

    #[test]
    fn test_text_key_append_sentinel() {
        let mut vars = Vars::new();
        let key = Val::text("apple");
        let at = vars.index_of("fruit", &key, true).unwrap();
        assert_eq!(at, 0);
        vars.store("fruit", at, false, Val::Num(3)).unwrap();
        // a missing key reads as the current length, not an error
        let miss = vars.index_of("fruit", &Val::text("pear"), false).unwrap();
        assert_eq!(miss, 1);
        assert_eq!(vars.fetch("fruit", miss, false).unwrap(), Val::Num(0));
    }

    #[test]
    fn test_bucket_exhaustion() {
        let mut vars = Vars::new();
        // fill one bucket artificially by inserting into the raw slots
        let folded = "X";
        let bucket = Vars::hash(folded);
        for n in 0..BUCKET_SLOTS {
            vars.buckets[bucket].push(Variable::new(format!("F{}", n).into()));
        }
        let e = vars.reference("X", true).unwrap_err();
        assert!(e.is(ErrorCode::TooManyVariables));
    }

    #[test]
    fn test_take_put_roundtrip() {
        let mut vars = Vars::new();
        vars.store("args", 0, false, Val::Num(1)).unwrap();
        let saved = vars.take("ARGS").unwrap();
        assert!(vars.find("args").is_none());
        vars.store("args", 0, false, Val::Num(99)).unwrap();
        vars.put(saved);
        assert_eq!(vars.fetch("args", 0, false).unwrap(), Val::Num(1));
    }

    #[test]
    fn test_remove_element_reindexes_keys() {
        let mut vars = Vars::new();
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            let at = vars.index_of("m", &Val::text(key), true).unwrap();
            vars.store("m", at, false, Val::Num(i as i64)).unwrap();
        }
        let var = vars.reference("m", true).unwrap().unwrap();
        var.remove_element(1);
        assert_eq!(var.values.len(), 2);
        assert_eq!(var.key_index("a"), 0);
        assert_eq!(var.key_index("c"), 1);
        assert_eq!(var.key_index("b"), 2); // gone: append sentinel
    }
}
