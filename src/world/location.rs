use indexmap::IndexMap;
use crate::lang::text;

/// An action declared on a location in the game file. The description and
/// code are templates: `<<expr>>` spans are expanded when the location runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocAction {
    pub image: Option<String>,
    pub name: String,
    pub code: Vec<String>,
}

/// One room of the game. Everything here is immutable after load; the
/// runtime never writes back into the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub name: String,
    pub desc: String,
    pub code: Vec<String>,
    pub actions: Vec<LocAction>,
}

/// All loaded locations with a folded-name index. INCLIB appends; the first
/// location bearing a name wins lookups, matching load order priority.
#[derive(Debug, Default)]
pub struct World {
    locations: Vec<Location>,
    index: IndexMap<Box<str>, usize>,
}

impl World {
    pub fn new() -> World {
        World::default()
    }

    pub fn clear(&mut self) {
        self.locations.clear();
        self.index.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn push(&mut self, loc: Location) {
        let folded = text::fold(&loc.name);
        let at = self.locations.len();
        self.locations.push(loc);
        self.index.entry(folded.into_boxed_str()).or_insert(at);
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.index.get(text::fold(name).as_str()).copied()
    }

    pub fn get(&self, at: usize) -> Option<&Location> {
        self.locations.get(at)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Drops every location at or past `len`; used to roll back a partial
    /// INCLIB and to shed included libraries on restart.
    pub fn truncate(&mut self, len: usize) {
        self.locations.truncate(len);
        self.index.retain(|_, at| *at < len);
    }
}
