#![allow(dead_code)]

use fable::mach::{Runtime, VERSION};
use fable::world::{GameFile, GameFormat, LocAction, Location};

pub fn loc(name: &str, desc: &str, code: &[&str]) -> Location {
    Location {
        name: name.to_string(),
        desc: desc.to_string(),
        code: code.iter().map(|s| s.to_string()).collect(),
        actions: vec![],
    }
}

pub fn act(name: &str, code: &[&str]) -> LocAction {
    LocAction {
        image: None,
        name: name.to_string(),
        code: code.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn game(locations: Vec<Location>) -> Vec<u8> {
    GameFile::write(VERSION, &locations, GameFormat::Current)
}

/// Loads the locations as a game and runs it from the first one.
pub fn start(locations: Vec<Location>) -> Runtime {
    let mut runtime = Runtime::new();
    runtime.load_game(&game(locations)).unwrap();
    runtime.restart().unwrap();
    runtime
}

/// A runtime with a one-location empty game, for running bare code.
pub fn scratch() -> Runtime {
    start(vec![loc("Main", "", &[])])
}

pub fn num(runtime: &mut Runtime, source: &str) -> i64 {
    runtime.exec_expr(source).unwrap().as_num().unwrap()
}

pub fn text(runtime: &mut Runtime, source: &str) -> String {
    runtime.exec_expr(source).unwrap().as_text().unwrap().to_string()
}
