use super::host::{Dirty, Host, NullHost, Window};
use super::regexp::RegexpCache;
use super::var::{Vars, Variable, Elem};
use super::Val;
use crate::error;
use crate::lang::{text, Error};
use crate::world::{
    Action, GameFile, MenuItem, Object, SaveState, VarSnapshot, World,
    MAX_INCLUDES,
};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

type Result<T> = std::result::Result<T, Error>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where executing code currently is, for error reports.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExecCtx {
    pub loc: Option<Rc<str>>,
    pub act: Option<usize>,
    pub line: usize,
}

/// ## The interpreter engine
///
/// One `Runtime` is one complete interpreter: the static world, the variable
/// store, the transient panes and the host connection. Instances are fully
/// independent.
///
/// A generation stamp guards re-entrant flows: loading a game, restoring a
/// state or restarting bumps `gen`, and every loop that can call back into
/// the interpreter re-checks the stamp and unwinds quietly when it moved.
pub struct Runtime {
    pub(crate) host: Box<dyn Host>,

    // static world
    pub(crate) world: World,
    pub(crate) game_version: String,
    pub(crate) game_crc: u32,
    pub(crate) game_dir: Option<PathBuf>,
    pub(crate) base_locations: usize,
    pub(crate) includes: Vec<String>,

    // dynamic state
    pub(crate) vars: Vars,
    pub(crate) actions: Vec<Action>,
    pub(crate) objects: Vec<Object>,
    pub(crate) menu: Vec<MenuItem>,
    pub(crate) main_desc: String,
    pub(crate) vars_desc: String,
    pub(crate) input_text: String,
    pub(crate) playlist: Vec<String>,
    pub(crate) cur_loc: Option<usize>,
    pub(crate) selected_action: Option<usize>,
    pub(crate) selected_object: Option<usize>,
    pub(crate) windows: [bool; 4],

    // machinery
    pub(crate) regexps: RegexpCache,
    pub(crate) rng: StdRng,
    pub(crate) dirty: Dirty,
    pub(crate) error: Option<Error>,
    pub(crate) gen: u32,
    /// Bumped on every location change; lets an outer GOTO frame see that a
    /// nested one already settled the move.
    pub(crate) loc_serial: u32,
    pub(crate) busy: AtomicBool,
    pub(crate) in_refresh: bool,
    pub(crate) ctx: ExecCtx,
    pub(crate) timer_ms: i64,
    started: Instant,
    elapsed_base_ms: i64,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("locations", &self.world.len())
            .field("cur_loc", &self.cur_loc)
            .field("gen", &self.gen)
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::with_host(Box::new(NullHost::default()))
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        Runtime::default()
    }

    pub fn with_host(host: Box<dyn Host>) -> Runtime {
        Runtime {
            host,
            world: World::new(),
            game_version: String::new(),
            game_crc: 0,
            game_dir: None,
            base_locations: 0,
            includes: vec![],
            vars: Vars::new(),
            actions: vec![],
            objects: vec![],
            menu: vec![],
            main_desc: String::new(),
            vars_desc: String::new(),
            input_text: String::new(),
            playlist: vec![],
            cur_loc: None,
            selected_action: None,
            selected_object: None,
            windows: [true; 4],
            regexps: RegexpCache::new(),
            rng: StdRng::from_entropy(),
            dirty: Dirty::default(),
            error: None,
            gen: 0,
            loc_serial: 0,
            busy: AtomicBool::new(false),
            in_refresh: false,
            ctx: ExecCtx::default(),
            timer_ms: 500,
            started: Instant::now(),
            elapsed_base_ms: 0,
        }
    }

    // *** Accessors

    pub fn version(&self) -> &'static str {
        VERSION
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The version string the loaded game file was written with.
    pub fn game_version(&self) -> &str {
        &self.game_version
    }

    /// The current SETTIMER interval for the counter hook.
    pub fn timer_interval(&self) -> i64 {
        self.timer_ms
    }

    pub fn cur_loc_name(&self) -> Option<&str> {
        self.cur_loc
            .and_then(|at| self.world.get(at))
            .map(|loc| loc.name.as_str())
    }

    pub fn main_desc(&self) -> &str {
        &self.main_desc
    }

    pub fn vars_desc(&self) -> &str {
        &self.vars_desc
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn selected_action(&self) -> Option<usize> {
        self.selected_action
    }

    pub fn selected_object(&self) -> Option<usize> {
        self.selected_object
    }

    pub fn window_shown(&self, window: Window) -> bool {
        self.windows[Runtime::window_slot(window)]
    }

    /// Pending pane updates since the last `clear_dirty`.
    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    pub fn var_num(&self, name: &str, index: usize) -> i64 {
        match self.vars.fetch(name, index, false) {
            Ok(Val::Num(n)) => n,
            _ => 0,
        }
    }

    pub fn var_text(&self, name: &str, index: usize) -> String {
        match self.vars.fetch(name, index, true) {
            Ok(v) => v.to_string(),
            _ => String::new(),
        }
    }

    pub fn var_count(&self) -> usize {
        self.vars.count()
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn error_desc(code: u16) -> &'static str {
        Error::describe(code)
    }

    pub fn reset_error(&mut self) {
        self.error = None;
    }

    /// Milliseconds of play time; saved and restored with the game state.
    pub fn msecs_count(&mut self) -> i64 {
        if let Some(ms) = self.host.get_ms_count() {
            return ms;
        }
        self.elapsed_base_ms + self.started.elapsed().as_millis() as i64
    }

    // *** Error latch

    /// First error wins; later ones only reach the log.
    pub(crate) fn latch(&mut self, e: &Error) {
        warn!("script error: {}", e);
        if self.error.is_none() {
            self.error = Some(self.err_here(e.clone()));
        }
    }

    /// Stamps the current execution position onto an error. Earlier stamps
    /// win, so the innermost frame decides.
    pub(crate) fn err_here(&self, e: Error) -> Error {
        let e = match &self.ctx.loc {
            Some(loc) => e.in_location(loc.clone()),
            None => e,
        };
        e.in_action(self.ctx.act).in_line(self.ctx.line)
    }

    fn enter(&mut self) -> Result<()> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(error!(Syntax; "ENGINE BUSY"));
        }
        Ok(())
    }

    fn leave<T>(&mut self, result: Result<T>) -> Result<T> {
        self.busy.store(false, Ordering::SeqCst);
        if let Err(e) = &result {
            self.latch(e);
        }
        result
    }

    // *** Host callback guard

    /// Snapshots the pending-update flags around a host call and OR-merges
    /// them back, so nested activity cannot lose updates.
    pub(crate) fn host_call<R>(&mut self, f: impl FnOnce(&mut dyn Host) -> R) -> R {
        let saved = self.dirty;
        self.dirty.clear();
        let out = f(self.host.as_mut());
        self.dirty.merge(saved);
        out
    }

    pub(crate) fn window_slot(window: Window) -> usize {
        match window {
            Window::Actions => 0,
            Window::Objects => 1,
            Window::Vars => 2,
            Window::Input => 3,
        }
    }

    // *** Game lifecycle

    pub fn load_game_file(&mut self, path: &std::path::Path) -> Result<()> {
        self.enter()?;
        let result = self.load_game_file_inner(path);
        self.leave(result)
    }

    fn load_game_file_inner(&mut self, path: &std::path::Path) -> Result<()> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => return Err(error!(FileNotFound)),
        };
        self.game_dir = path.parent().map(|p| p.to_path_buf());
        self.install_game(&bytes)
    }

    pub fn load_game(&mut self, bytes: &[u8]) -> Result<()> {
        self.enter()?;
        let result = self.install_game(bytes);
        self.leave(result)
    }

    fn install_game(&mut self, bytes: &[u8]) -> Result<()> {
        let game = GameFile::parse(bytes)?;
        debug!("loading game, {} locations", game.locations.len());
        self.world.clear();
        for loc in game.locations {
            self.world.push(loc);
        }
        self.game_version = game.version;
        self.game_crc = game.crc;
        self.base_locations = self.world.len();
        self.includes.clear();
        self.reset_state();
        Ok(())
    }

    /// Clears everything a running game accumulated; the world stays.
    fn reset_state(&mut self) {
        self.gen = self.gen.wrapping_add(1);
        self.vars.clear();
        self.regexps.clear();
        self.actions.clear();
        self.objects.clear();
        self.menu.clear();
        self.main_desc.clear();
        self.vars_desc.clear();
        self.input_text.clear();
        self.playlist.clear();
        self.cur_loc = None;
        self.selected_action = None;
        self.selected_object = None;
        self.error = None;
        self.ctx = ExecCtx::default();
        self.elapsed_base_ms = 0;
        self.started = Instant::now();
        self.dirty = Dirty::all();
    }

    /// Starts (or starts over) from the first location.
    pub fn restart(&mut self) -> Result<()> {
        self.enter()?;
        let result = self.restart_inner();
        self.leave(result)
    }

    fn restart_inner(&mut self) -> Result<()> {
        if self.world.is_empty() {
            return Err(error!(GameNotLoaded));
        }
        self.world.truncate(self.base_locations);
        self.includes.clear();
        self.reset_state();
        self.goto_location_at(0, &[], true)?;
        Ok(())
    }

    // *** Execution entry points

    /// Runs a code fragment in the current context.
    pub fn exec_code(&mut self, source: &str) -> Result<()> {
        self.enter()?;
        let result = self.exec_code_inner(source);
        self.leave(result)
    }

    fn exec_code_inner(&mut self, source: &str) -> Result<()> {
        let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
        match self.exec_block(&lines)? {
            super::statement::Flow::Jump(_) => Err(error!(LabelNotFound)),
            _ => Ok(()),
        }
    }

    /// Evaluates one expression and returns the value.
    pub fn exec_expr(&mut self, source: &str) -> Result<Val> {
        self.enter()?;
        let result = self.eval_expr(source);
        self.leave(result)
    }

    /// Moves the player to a named location, as GOTO does.
    pub fn exec_location(&mut self, name: &str) -> Result<()> {
        self.enter()?;
        let result = self.goto_location(name, &[], true);
        self.leave(result)
    }

    /// Runs the timer hook location if the game declares one.
    pub fn exec_counter(&mut self) -> Result<()> {
        self.enter()?;
        let result = self.run_hook("COUNTER", &[]);
        self.leave(result)
    }

    /// Feeds the input line to the user-command hook.
    pub fn exec_user_input(&mut self) -> Result<()> {
        self.enter()?;
        let text = Val::Text(self.input_text.as_str().into());
        let result = self.run_hook("USERCOM", &[text]);
        self.leave(result)
    }

    pub fn set_input_text(&mut self, text: &str) {
        self.input_text = text.to_string();
    }

    /// The player picked an action from the pane.
    pub fn select_action(&mut self, at: usize) -> Result<()> {
        self.enter()?;
        let result = self.select_action_inner(at);
        self.leave(result)
    }

    fn select_action_inner(&mut self, at: usize) -> Result<()> {
        if at >= self.actions.len() {
            return Err(error!(UnknownAction));
        }
        self.selected_action = Some(at);
        let act = self.actions[at].clone();
        let saved_ctx = self.ctx.clone();
        self.ctx = ExecCtx {
            loc: act.source_loc.clone(),
            act: act.source_act,
            line: 0,
        };
        let gen = self.gen;
        let result = self
            .exec_block(&act.code)
            .map(|_| ())
            .map_err(|e| self.err_here(e));
        if self.gen == gen {
            self.ctx = saved_ctx;
            self.run_hook("ONACTSEL", &[])?;
        }
        result
    }

    /// The player highlighted an object.
    pub fn select_object(&mut self, at: usize) -> Result<()> {
        self.enter()?;
        let result = self.select_object_inner(at);
        self.leave(result)
    }

    fn select_object_inner(&mut self, at: usize) -> Result<()> {
        if at >= self.objects.len() {
            return Ok(());
        }
        self.selected_object = Some(at);
        self.run_hook("ONOBJSEL", &[])
    }

    /// Runs a hook location named by the text of `$<var>`, quietly doing
    /// nothing when the game declares no hook.
    pub(crate) fn run_hook(&mut self, var: &str, args: &[Val]) -> Result<()> {
        let name = match self.vars.fetch(var, 0, true)? {
            Val::Text(s) if !s.is_empty() => s,
            _ => return Ok(()),
        };
        if self.world.find(&name).is_none() {
            return Ok(()); // a dangling hook name is not an error
        }
        self.call_location(&name, args).map(|_| ())
    }

    // *** Location execution (the mechanics live in statement.rs)

    pub(crate) fn goto_location(&mut self, name: &str, args: &[Val], clear_desc: bool) -> Result<()> {
        let at = match self.world.find(name) {
            Some(at) => at,
            None => return Err(error!(LocationNotFound)),
        };
        self.goto_location_at(at, args, clear_desc)
    }

    pub(crate) fn goto_location_at(&mut self, at: usize, args: &[Val], clear_desc: bool) -> Result<()> {
        if clear_desc {
            self.main_desc.clear();
            self.dirty.main = true;
        }
        self.actions.clear();
        self.dirty.actions = true;
        self.cur_loc = Some(at);
        self.loc_serial = self.loc_serial.wrapping_add(1);
        let serial = self.loc_serial;
        let gen = self.gen;
        self.run_location(at, true, args)?;
        // a nested move already ran the hook for its own destination
        if self.gen == gen && self.loc_serial == serial {
            self.run_hook("ONNEWLOC", args)?;
        }
        Ok(())
    }

    /// GOSUB/FUNC entry: processes a location in place, current location
    /// unchanged, and returns what it left in RESULT.
    pub(crate) fn call_location(&mut self, name: &str, args: &[Val]) -> Result<Val> {
        let at = match self.world.find(name) {
            Some(at) => at,
            None => return Err(error!(LocationNotFound)),
        };
        self.run_location(at, true, args)
    }

    /// Runs one location: expands the description, adds its base actions,
    /// executes the on-visit code. ARGS and RESULT are saved around the run.
    pub(crate) fn run_location(&mut self, at: usize, add_desc: bool, args: &[Val]) -> Result<Val> {
        let loc = match self.world.get(at) {
            Some(loc) => loc.clone(),
            None => return Err(error!(LocationNotFound)),
        };
        let saved_args = self.vars.take("ARGS");
        let saved_result = self.vars.take("RESULT");
        let saved_ctx = self.ctx.clone();
        self.ctx = ExecCtx {
            loc: Some(loc.name.as_str().into()),
            act: None,
            line: 0,
        };
        self.set_args(args)?;
        let gen = self.gen;

        let result = self
            .run_location_body(&loc, add_desc)
            .map_err(|e| self.err_here(e));

        let mut out = Val::Num(0);
        if self.gen == gen {
            out = self.read_result();
            self.ctx = saved_ctx;
            self.vars.remove("ARGS").ok();
            self.vars.remove("RESULT").ok();
            if let Some(var) = saved_args {
                self.vars.put(var);
            }
            if let Some(var) = saved_result {
                self.vars.put(var);
            }
        }
        result.map(|_| out)
    }

    fn run_location_body(&mut self, loc: &crate::world::Location, add_desc: bool) -> Result<()> {
        if add_desc && !loc.desc.is_empty() {
            let desc = self.format_text(&loc.desc)?;
            self.main_desc.push_str(&desc);
            self.main_desc.push('\n');
            self.dirty.main = true;
        }
        for (n, act) in loc.actions.iter().enumerate() {
            let name = self.format_text(&act.name)?;
            self.add_action(Action {
                image: act.image.clone(),
                name,
                code: act.code.clone(),
                source_loc: Some(loc.name.as_str().into()),
                source_act: Some(n),
            })?;
        }
        let gen = self.gen;
        match self.exec_block(&loc.code)? {
            super::statement::Flow::Jump(_) if self.gen == gen => Err(error!(LabelNotFound)),
            _ => Ok(()),
        }
    }

    fn set_args(&mut self, args: &[Val]) -> Result<()> {
        for (n, arg) in args.iter().enumerate() {
            match arg {
                Val::Text(_) => self.vars.store("ARGS", n, true, arg.clone())?,
                _ => self.vars.store("ARGS", n, false, arg.clone())?,
            }
        }
        Ok(())
    }

    fn read_result(&mut self) -> Val {
        match self.vars.find("RESULT") {
            None => Val::Num(0),
            Some(var) => {
                let elem = var.values.first().cloned().unwrap_or_else(Elem::default);
                match elem.text {
                    Some(s) => Val::Text(s),
                    None => Val::Num(elem.num),
                }
            }
        }
    }

    pub(crate) fn add_action(&mut self, act: Action) -> Result<()> {
        if let Some(at) = self.actions.iter().position(|a| a.name == act.name) {
            self.actions[at] = act;
        } else {
            if self.actions.len() >= crate::world::MAX_ACTIONS {
                return Err(error!(CannotAddAction));
            }
            self.actions.push(act);
        }
        self.dirty.actions = true;
        Ok(())
    }

    // *** Description templates

    /// Expands every `<<expr>>` span in a template. Expansion output is not
    /// rescanned, so a span cannot feed itself.
    pub(crate) fn format_text(&mut self, template: &str) -> Result<String> {
        let mut out = String::new();
        let mut rest = template;
        while let Some((start, end)) = text::subexpr_span(rest) {
            out.push_str(&rest[..start]);
            let inner = &rest[start + 2..end - 2];
            let val = self.eval_expr(inner)?;
            out.push_str(&val.to_string());
            rest = &rest[end..];
        }
        out.push_str(rest);
        Ok(out)
    }

    // *** Saved state

    pub fn write_state(&mut self) -> Result<Vec<u8>> {
        self.enter()?;
        let result = self.gather_state().map(|s| s.write());
        self.leave(result)
    }

    pub fn save_state(&mut self, path: &std::path::Path) -> Result<()> {
        self.enter()?;
        let result = self.gather_state().map(|s| s.write()).and_then(|bytes| {
            std::fs::write(path, bytes).map_err(|_| error!(CannotLoadFile; "CANNOT WRITE FILE"))
        });
        self.leave(result)
    }

    fn gather_state(&mut self) -> Result<SaveState> {
        if self.world.is_empty() {
            return Err(error!(GameNotLoaded));
        }
        let elapsed_ms = self.msecs_count();
        Ok(SaveState {
            version: VERSION.to_string(),
            game_crc: self.game_crc,
            elapsed_ms,
            selected_action: self.selected_action,
            selected_object: self.selected_object,
            playlist: self.playlist.clone(),
            main_desc: self.main_desc.clone(),
            vars_desc: self.vars_desc.clone(),
            input_text: self.input_text.clone(),
            cur_loc: self.cur_loc,
            windows: self.windows,
            includes: self.includes.clone(),
            actions: self.actions.clone(),
            objects: self.objects.clone(),
            vars: self
                .vars
                .iter()
                .map(|var| VarSnapshot {
                    name: var.name.to_string(),
                    values: var
                        .values
                        .iter()
                        .map(|e| (e.num, e.text.as_ref().map(|s| s.to_string())))
                        .collect(),
                    keys: var
                        .keys
                        .iter()
                        .map(|(k, v)| (k.to_string(), *v as u32))
                        .collect(),
                })
                .collect(),
        })
    }

    pub fn open_state(&mut self, path: &std::path::Path) -> Result<()> {
        self.enter()?;
        let result = match std::fs::read(path) {
            Ok(bytes) => self.apply_state(&bytes),
            Err(_) => Err(error!(FileNotFound)),
        };
        self.leave(result)
    }

    pub fn read_state(&mut self, bytes: &[u8]) -> Result<()> {
        self.enter()?;
        let result = self.apply_state(bytes);
        self.leave(result)
    }

    /// All-or-nothing restore: every validation gate passes before any
    /// engine state is touched.
    fn apply_state(&mut self, bytes: &[u8]) -> Result<()> {
        if self.world.is_empty() {
            return Err(error!(GameNotLoaded));
        }
        let state = SaveState::parse(bytes, VERSION)?;
        let debug_override = self.var_num("DEBUG", 0) != 0;
        if state.game_crc != self.game_crc && !debug_override {
            return Err(error!(CannotLoadFile; "SAVED GAME IS FOR A DIFFERENT GAME"));
        }
        // load every included library up front so a failure leaves the
        // engine untouched
        let mut included = vec![];
        for file in &state.includes {
            included.push(self.read_include(file)?);
        }
        let world_len = self.base_locations + included.iter().map(|l| l.len()).sum::<usize>();
        if let Some(at) = state.cur_loc {
            if at >= world_len {
                return Err(error!(CannotLoadFile; "LOCATION OUT OF RANGE"));
            }
        }
        debug!("restoring state: {} vars", state.vars.len());

        self.reset_state();
        self.world.truncate(self.base_locations);
        for locations in included {
            for loc in locations {
                self.world.push(loc);
            }
        }
        self.elapsed_base_ms = state.elapsed_ms;
        self.started = Instant::now();
        self.selected_action = state.selected_action;
        self.selected_object = state.selected_object;
        self.playlist = state.playlist;
        self.main_desc = state.main_desc;
        self.vars_desc = state.vars_desc;
        self.input_text = state.input_text;
        self.cur_loc = state.cur_loc;
        self.windows = state.windows;
        self.actions = state.actions;
        self.objects = state.objects;
        self.includes = state.includes;
        for snap in state.vars {
            let mut var = Variable::default();
            var.name = text::fold(&snap.name).into();
            for (num, text) in snap.values {
                var.values.push(Elem {
                    num,
                    text: text.map(|s| s.into()),
                });
            }
            for (key, at) in snap.keys {
                var.keys.insert(key.into_boxed_str(), at as usize);
            }
            self.vars.put(var);
        }
        self.dirty = Dirty::all();
        Ok(())
    }

    // *** Included libraries

    fn read_include(&self, file: &str) -> Result<Vec<crate::world::Location>> {
        let path = match &self.game_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => return Err(error!(CannotIncludeFile)),
        };
        match GameFile::parse(&bytes) {
            Ok(game) => Ok(game.locations),
            Err(_) => Err(error!(CannotIncludeFile)),
        }
    }

    pub(crate) fn include_file(&mut self, file: &str) -> Result<()> {
        if self.includes.len() >= MAX_INCLUDES {
            return Err(error!(CannotIncludeFile));
        }
        for loc in self.read_include(file)? {
            self.world.push(loc);
        }
        self.includes.push(file.to_string());
        debug!("included {}, world now {} locations", file, self.world.len());
        Ok(())
    }

    // *** Interface refresh

    /// Pushes pending pane updates to the host. Hook code running during a
    /// refresh cannot trigger another one.
    pub fn refresh(&mut self, forced: bool) {
        if self.in_refresh {
            return;
        }
        self.in_refresh = true;
        if forced || self.dirty.any() {
            self.host_call(|host| host.refresh_interface(forced));
            self.dirty.clear();
        }
        self.in_refresh = false;
    }
}
