use crate::error;
use crate::lang::Error;
use regex::Regex;

type Result<T> = std::result::Result<T, Error>;

const CACHE_SLOTS: usize = 8;

/// ## Compiled pattern cache
///
/// STRCOMP and friends tend to reuse a handful of patterns in a tight loop,
/// so compiled programs are kept in a small ring replaced round-robin.
/// Patterns are anchored implicitly when matching whole strings; callers
/// decide which match mode they need.
#[derive(Debug, Default)]
pub struct RegexpCache {
    slots: Vec<(String, Regex)>,
    next: usize,
}

impl RegexpCache {
    pub fn new() -> RegexpCache {
        RegexpCache::default()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.next = 0;
    }

    pub fn get(&mut self, pattern: &str) -> Result<&Regex> {
        if let Some(at) = self.slots.iter().position(|(p, _)| p == pattern) {
            return Ok(&self.slots[at].1);
        }
        let compiled = match Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => return Err(error!(IncorrectRegexp)),
        };
        if self.slots.len() < CACHE_SLOTS {
            self.slots.push((pattern.to_string(), compiled));
            let at = self.slots.len() - 1;
            Ok(&self.slots[at].1)
        } else {
            let at = self.next;
            self.next = (self.next + 1) % CACHE_SLOTS;
            self.slots[at] = (pattern.to_string(), compiled);
            Ok(&self.slots[at].1)
        }
    }

    /// Whole-string match, the STRCOMP rule.
    pub fn is_full_match(&mut self, value: &str, pattern: &str) -> Result<bool> {
        let re = self.get(pattern)?;
        Ok(match re.find(value) {
            Some(m) => m.start() == 0 && m.end() == value.len(),
            None => false,
        })
    }

    /// Text of capture group `group` of the first whole-string match, the
    /// STRFIND rule. Group 0 is the whole match.
    pub fn find_group(&mut self, value: &str, pattern: &str, group: usize) -> Result<String> {
        let re = self.get(pattern)?;
        Ok(match re.captures(value) {
            Some(caps) => caps
                .get(group)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            None => String::new(),
        })
    }

    /// One-based character position of capture group `group` of the first
    /// match, or zero; the STRPOS rule.
    pub fn find_pos(&mut self, value: &str, pattern: &str, group: usize) -> Result<i64> {
        let re = self.get(pattern)?;
        Ok(match re.captures(value) {
            Some(caps) => match caps.get(group) {
                Some(m) => value[..m.start()].chars().count() as i64 + 1,
                None => 0,
            },
            None => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    #[test]
    fn test_full_match() {
        let mut cache = RegexpCache::new();
        assert!(cache.is_full_match("hello", "h.*o").unwrap());
        assert!(!cache.is_full_match("hello!", "h.*o").unwrap());
    }

    #[test]
    fn test_groups_and_positions() {
        let mut cache = RegexpCache::new();
        assert_eq!(
            cache.find_group("take lamp", r"take (\w+)", 1).unwrap(),
            "lamp"
        );
        assert_eq!(cache.find_pos("take lamp", r"lamp", 0).unwrap(), 6);
        assert_eq!(cache.find_pos("take lamp", r"sword", 0).unwrap(), 0);
    }

    #[test]
    fn test_bad_pattern() {
        let mut cache = RegexpCache::new();
        let e = cache.is_full_match("x", "(").unwrap_err();
        assert!(e.is(ErrorCode::IncorrectRegexp));
    }

    #[test]
    fn test_ring_replacement() {
        let mut cache = RegexpCache::new();
        for n in 0..CACHE_SLOTS + 3 {
            let pat = format!("p{}", n);
            assert!(cache.is_full_match(&pat, &pat).unwrap());
        }
        // earliest entries were recycled, later ones still hit the cache
        assert!(cache.is_full_match("p9", "p9").unwrap());
    }
}
