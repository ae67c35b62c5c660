use super::codec::{Reader, Writer};
use super::current::{Action, Object};
use crate::error;
use crate::lang::Error;
use log::debug;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

pub const SAVE_MAGIC: &[u8; 4] = b"FBLS";

/// Oldest save layout this engine still reads.
pub const MIN_SAVE_VERSION: &str = "0.1.0";

/// Snapshot of one variable for the save file. Element order and key order
/// are preserved exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarSnapshot {
    pub name: String,
    pub values: Vec<(i64, Option<String>)>,
    pub keys: Vec<(String, u32)>,
}

/// Complete dynamic state of a running game, detached from the engine so
/// the serializer stays a pure data transform. The runtime gathers one of
/// these to save and applies one atomically to restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveState {
    pub version: String,
    pub game_crc: u32,
    pub elapsed_ms: i64,
    pub selected_action: Option<usize>,
    pub selected_object: Option<usize>,
    pub playlist: Vec<String>,
    pub main_desc: String,
    pub vars_desc: String,
    pub input_text: String,
    pub cur_loc: Option<usize>,
    pub windows: [bool; 4],
    pub includes: Vec<String>,
    pub actions: Vec<Action>,
    pub objects: Vec<Object>,
    pub vars: Vec<VarSnapshot>,
}

fn put_index(w: &mut Writer, v: Option<usize>) {
    match v {
        Some(n) => w.put_i32(n as i32),
        None => w.put_i32(-1),
    }
}

fn get_index(r: &mut Reader) -> Result<Option<usize>> {
    let n = r.get_i32()?;
    if n < 0 {
        Ok(None)
    } else {
        Ok(Some(n as usize))
    }
}

fn put_strings(w: &mut Writer, items: &[String]) {
    w.put_u32(items.len() as u32);
    for s in items {
        w.put_str(s);
    }
}

fn get_strings(r: &mut Reader) -> Result<Vec<String>> {
    let count = r.get_count()?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(r.get_str()?);
    }
    Ok(items)
}

/// Dotted version strings compared componentwise, missing parts zero.
pub fn version_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |s: &str| -> Vec<u32> {
        s.split('.')
            .map(|part| part.trim().parse::<u32>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for n in 0..len {
        let (x, y) = (a.get(n).unwrap_or(&0), b.get(n).unwrap_or(&0));
        if x != y {
            return x.cmp(y);
        }
    }
    std::cmp::Ordering::Equal
}

impl SaveState {
    pub fn write(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_raw(SAVE_MAGIC);
        w.put_str(&self.version);
        w.put_u32(self.game_crc);
        w.put_i64(self.elapsed_ms);
        put_index(&mut w, self.selected_action);
        put_index(&mut w, self.selected_object);
        put_strings(&mut w, &self.playlist);
        w.put_str(&self.main_desc);
        w.put_str(&self.vars_desc);
        w.put_str(&self.input_text);
        match self.cur_loc {
            Some(at) => {
                w.put_bool(true);
                w.put_u32(at as u32);
            }
            None => w.put_bool(false),
        }
        for flag in &self.windows {
            w.put_bool(*flag);
        }
        put_strings(&mut w, &self.includes);
        w.put_u32(self.actions.len() as u32);
        for act in &self.actions {
            w.put_opt_str(&act.image);
            w.put_str(&act.name);
            put_strings(&mut w, &act.code);
            match &act.source_loc {
                Some(name) => {
                    w.put_bool(true);
                    w.put_str(name);
                }
                None => w.put_bool(false),
            }
            put_index(&mut w, act.source_act);
        }
        w.put_u32(self.objects.len() as u32);
        for obj in &self.objects {
            w.put_opt_str(&obj.image);
            w.put_str(&obj.name);
        }
        w.put_u32(self.vars.len() as u32);
        for var in &self.vars {
            w.put_str(&var.name);
            w.put_u32(var.values.len() as u32);
            for (num, text) in &var.values {
                w.put_i64(*num);
                w.put_opt_str(text);
            }
            w.put_u32(var.keys.len() as u32);
            for (key, at) in &var.keys {
                w.put_str(key);
                w.put_u32(*at);
            }
        }
        debug!(
            "state serialized: {} vars, {} actions, {} objects",
            self.vars.len(),
            self.actions.len(),
            self.objects.len()
        );
        w.into_bytes()
    }

    /// Parses and version-gates a save file. Game identity (CRC) is checked
    /// by the caller, which knows the loaded game and the debug override.
    pub fn parse(bytes: &[u8], engine_version: &str) -> Result<SaveState> {
        let mut r = Reader::new(bytes);
        if r.get_raw(4)? != SAVE_MAGIC {
            return Err(error!(CannotLoadFile; "NOT A SAVED GAME"));
        }
        let version = r.get_str()?;
        if version_cmp(&version, engine_version) == std::cmp::Ordering::Greater
            || version_cmp(&version, MIN_SAVE_VERSION) == std::cmp::Ordering::Less
        {
            return Err(error!(CannotLoadFile; "UNSUPPORTED SAVE VERSION"));
        }
        let game_crc = r.get_u32()?;
        let elapsed_ms = r.get_i64()?;
        let selected_action = get_index(&mut r)?;
        let selected_object = get_index(&mut r)?;
        let playlist = get_strings(&mut r)?;
        let main_desc = r.get_str()?;
        let vars_desc = r.get_str()?;
        let input_text = r.get_str()?;
        let cur_loc = if r.get_bool()? {
            Some(r.get_u32()? as usize)
        } else {
            None
        };
        let mut windows = [false; 4];
        for flag in windows.iter_mut() {
            *flag = r.get_bool()?;
        }
        let includes = get_strings(&mut r)?;
        let count = r.get_count()?;
        let mut actions = Vec::with_capacity(count);
        for _ in 0..count {
            let image = r.get_opt_str()?;
            let name = r.get_str()?;
            let code = get_strings(&mut r)?;
            let source_loc: Option<Rc<str>> = if r.get_bool()? {
                Some(r.get_str()?.into())
            } else {
                None
            };
            let source_act = get_index(&mut r)?;
            actions.push(Action {
                image,
                name,
                code,
                source_loc,
                source_act,
            });
        }
        let count = r.get_count()?;
        let mut objects = Vec::with_capacity(count);
        for _ in 0..count {
            objects.push(Object {
                image: r.get_opt_str()?,
                name: r.get_str()?,
            });
        }
        let count = r.get_count()?;
        let mut vars = Vec::with_capacity(count);
        for _ in 0..count {
            let name = r.get_str()?;
            let elems = r.get_count()?;
            let mut values = Vec::with_capacity(elems);
            for _ in 0..elems {
                let num = r.get_i64()?;
                let text = r.get_opt_str()?;
                values.push((num, text));
            }
            let key_count = r.get_count()?;
            let mut keys = Vec::with_capacity(key_count);
            for _ in 0..key_count {
                let key = r.get_str()?;
                let at = r.get_u32()?;
                keys.push((key, at));
            }
            vars.push(VarSnapshot { name, values, keys });
        }
        Ok(SaveState {
            version,
            game_crc,
            elapsed_ms,
            selected_action,
            selected_object,
            playlist,
            main_desc,
            vars_desc,
            input_text,
            cur_loc,
            windows,
            includes,
            actions,
            objects,
            vars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    fn sample() -> SaveState {
        SaveState {
            version: "1.0.0".to_string(),
            game_crc: 0xdead_beef,
            elapsed_ms: 12345,
            selected_action: Some(1),
            selected_object: None,
            playlist: vec!["theme.mp3".to_string()],
            main_desc: "You are home.\n".to_string(),
            vars_desc: String::new(),
            input_text: "look".to_string(),
            cur_loc: Some(0),
            windows: [true, true, false, true],
            includes: vec!["lib.fbl".to_string()],
            actions: vec![Action {
                image: None,
                name: "Leave".to_string(),
                code: vec!["goto 'Cave'".to_string()],
                source_loc: Some("Home".into()),
                source_act: Some(0),
            }],
            objects: vec![Object {
                image: Some("lamp.png".to_string()),
                name: "lamp".to_string(),
            }],
            vars: vec![VarSnapshot {
                name: "MONEY".to_string(),
                values: vec![(50, None), (0, Some("gold".to_string()))],
                keys: vec![("POCKET".to_string(), 0)],
            }],
        }
    }

    #[test]
    fn test_roundtrip() {
        let state = sample();
        let bytes = state.write();
        let back = SaveState::parse(&bytes, "1.0.0").unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_newer_save_rejected() {
        let mut state = sample();
        state.version = "99.0".to_string();
        let bytes = state.write();
        let e = SaveState::parse(&bytes, "1.0.0").unwrap_err();
        assert!(e.is(ErrorCode::CannotLoadFile));
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = sample().write();
        assert!(SaveState::parse(&bytes[..bytes.len() / 2], "1.0.0").is_err());
    }

    #[test]
    fn test_version_cmp() {
        use std::cmp::Ordering::*;
        assert_eq!(version_cmp("1.0.0", "1.0"), Equal);
        assert_eq!(version_cmp("1.2", "1.10"), Less);
        assert_eq!(version_cmp("2.0", "1.9.9"), Greater);
    }
}
