use std::rc::Rc;

pub const MAX_ACTIONS: usize = 50;
pub const MAX_OBJECTS: usize = 1000;
pub const MAX_MENU_ITEMS: usize = 100;
pub const MAX_INCLUDES: usize = 100;

/// A live entry in the actions pane. The name is already expanded text; the
/// code is kept raw and compiled when the player picks the action. Source
/// coordinates feed error reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Action {
    pub image: Option<String>,
    pub name: String,
    pub code: Vec<String>,
    pub source_loc: Option<Rc<str>>,
    pub source_act: Option<usize>,
}

/// A live entry in the objects pane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    pub image: Option<String>,
    pub name: String,
}

/// One pending MENU entry; picking it runs the named location with the
/// one-based item position in ARGS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItem {
    pub image: Option<String>,
    pub name: String,
    pub location: String,
}
