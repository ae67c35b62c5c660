//! Static world data and the two on-disk formats.

mod codec;
mod current;
mod game_file;
mod location;
mod save;

pub use current::{Action, MenuItem, Object};
pub use current::{MAX_ACTIONS, MAX_INCLUDES, MAX_MENU_ITEMS, MAX_OBJECTS};
pub use game_file::{GameFile, GameFormat, GAME_MAGIC, LEGACY_ACTION_SLOTS};
pub use location::{LocAction, Location, World};
pub use save::{version_cmp, SaveState, VarSnapshot, MIN_SAVE_VERSION, SAVE_MAGIC};
