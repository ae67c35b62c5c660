/// ## Host callbacks
///
/// Everything the interpreter cannot do by itself goes through this trait:
/// media, dialogs, menus, timers, persistence. Every method has a no-op
/// default so embedders implement only what their frontend supports.
///
/// Calls are wrapped by the runtime in a state guard that snapshots the
/// dirty flags before the call and OR-merges them back afterwards, so a
/// frontend that re-enters the engine cannot make pending screen updates
/// disappear.

/// The four switchable interface panes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    Actions,
    Objects,
    Vars,
    Input,
}

pub trait Host {
    /// Debug message from the engine or the DEBUG facility.
    fn debug(&mut self, _text: &str) {}
    /// True when the named media file is currently playing.
    fn is_playing(&mut self, _file: &str) -> bool {
        false
    }
    fn play_file(&mut self, _file: &str, _volume: i64) {}
    /// `None` closes every playing file.
    fn close_file(&mut self, _file: Option<&str>) {}
    /// `None` clears the picture pane.
    fn show_image(&mut self, _file: Option<&str>) {}
    fn show_window(&mut self, _window: Window, _visible: bool) {}
    fn delete_menu(&mut self) {}
    fn add_menu_item(&mut self, _name: &str, _image: Option<&str>) {}
    /// Presents the assembled menu; returns the zero-based pick, or `None`
    /// when dismissed.
    fn show_menu(&mut self) -> Option<usize> {
        None
    }
    fn show_message(&mut self, _text: &str) {}
    /// Modal line input with a prompt.
    fn input_box(&mut self, _prompt: &str) -> String {
        String::new()
    }
    fn refresh_interface(&mut self, _forced: bool) {}
    fn set_timer(&mut self, _interval_ms: i64) {}
    fn set_input_text(&mut self, _text: &str) {}
    /// EXEC passthrough to the operating environment.
    fn system(&mut self, _command: &str) {}
    /// Request from the game to restore a saved status; `None` asks the
    /// frontend to prompt for a file.
    fn open_game_status(&mut self, _file: Option<&str>) {}
    fn save_game_status(&mut self, _file: Option<&str>) {}
    fn sleep(&mut self, _ms: i64) {}
    /// Milliseconds elapsed since the game started; frontends with their
    /// own clock override this, otherwise the engine's clock is used.
    fn get_ms_count(&mut self) -> Option<i64> {
        None
    }
}

/// The built-in do-nothing host, used when embedders have not attached one
/// and throughout the test suite.
#[derive(Debug, Default)]
pub struct NullHost {}

impl Host for NullHost {}

/// Pending screen updates, one flag per pane.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dirty {
    pub main: bool,
    pub vars: bool,
    pub actions: bool,
    pub objects: bool,
}

impl Dirty {
    pub fn all() -> Dirty {
        Dirty {
            main: true,
            vars: true,
            actions: true,
            objects: true,
        }
    }

    pub fn clear(&mut self) {
        *self = Dirty::default();
    }

    pub fn any(&self) -> bool {
        self.main || self.vars || self.actions || self.objects
    }

    /// Used by the callback guard: updates marked on either side of a host
    /// call survive it.
    pub fn merge(&mut self, other: Dirty) {
        self.main |= other.main;
        self.vars |= other.vars;
        self.actions |= other.actions;
        self.objects |= other.objects;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_or() {
        let mut a = Dirty {
            main: true,
            ..Dirty::default()
        };
        let b = Dirty {
            objects: true,
            ..Dirty::default()
        };
        a.merge(b);
        assert!(a.main && a.objects && !a.vars && !a.actions);
    }

    #[test]
    fn test_null_host_defaults() {
        let mut host = NullHost::default();
        assert!(!host.is_playing("theme.mp3"));
        assert_eq!(host.show_menu(), None);
        assert_eq!(host.input_box("name?"), "");
        assert_eq!(host.get_ms_count(), None);
    }
}
