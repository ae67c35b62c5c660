//! # Fable
//!
//! An embeddable interpreter for text adventure games. A game is a set of
//! locations with descriptions, actions and objects; a line-oriented script
//! language drives the world through a variable store and a host callback
//! interface.
//!
//! The engine is frontend-agnostic: everything it cannot do by itself
//! (media, dialogs, menus, timers) goes through the [`mach::Host`] trait,
//! and a small terminal player ships as the reference host.
//!
//! ```no_run
//! use fable::mach::Runtime;
//!
//! let mut runtime = Runtime::new();
//! runtime.load_game_file(std::path::Path::new("game.fbl"))?;
//! runtime.restart()?;
//! println!("{}", runtime.main_desc());
//! # Ok::<(), fable::lang::Error>(())
//! ```

pub mod lang;
pub mod mach;
pub mod world;
