use super::runtime::Runtime;
use super::Val;
use crate::error;
use crate::lang::{text, Error};
use crate::world::{Action, MenuItem, Object, MAX_MENU_ITEMS, MAX_OBJECTS};
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// How control leaves a statement or a block.
///
/// EXIT unwinds the current code body; a jump carries its folded label
/// upward until some enclosing block owns it. Blocks also translate a moved
/// generation stamp into a quiet EXIT.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Continue,
    Exit,
    Jump(String),
}

/// Statement keywords, sorted for binary search. Abbreviations are separate
/// entries mapping to the same keyword.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Keyword {
    MainClear,
    MainNl,
    MainP,
    MainPl,
    Act,
    AddObj,
    Cla,
    Clear,
    Close,
    Cls,
    DelAct,
    DelObj,
    Dynamic,
    Else,
    End,
    Exec,
    Exit,
    Gosub,
    Goto,
    If,
    IncLib,
    Jump,
    KillAll,
    KillObj,
    KillVar,
    Menu,
    Msg,
    Nl,
    OpenGame,
    P,
    Pl,
    Play,
    RefInt,
    SaveGame,
    Set,
    SetTimer,
    ShowActs,
    ShowInput,
    ShowObjs,
    ShowStat,
    View,
    Wait,
    XGoto,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("*CLEAR", Keyword::MainClear),
    ("*CLR", Keyword::MainClear),
    ("*NL", Keyword::MainNl),
    ("*P", Keyword::MainP),
    ("*PL", Keyword::MainPl),
    ("ACT", Keyword::Act),
    ("ADDOBJ", Keyword::AddObj),
    ("CLA", Keyword::Cla),
    ("CLEAR", Keyword::Clear),
    ("CLOSE", Keyword::Close),
    ("CLR", Keyword::Clear),
    ("CLS", Keyword::Cls),
    ("DELACT", Keyword::DelAct),
    ("DELOBJ", Keyword::DelObj),
    ("DYNAMIC", Keyword::Dynamic),
    ("ELSE", Keyword::Else),
    ("END", Keyword::End),
    ("EXEC", Keyword::Exec),
    ("EXIT", Keyword::Exit),
    ("GOSUB", Keyword::Gosub),
    ("GOTO", Keyword::Goto),
    ("GS", Keyword::Gosub),
    ("GT", Keyword::Goto),
    ("IF", Keyword::If),
    ("INCLIB", Keyword::IncLib),
    ("JUMP", Keyword::Jump),
    ("KILLALL", Keyword::KillAll),
    ("KILLOBJ", Keyword::KillObj),
    ("KILLVAR", Keyword::KillVar),
    ("LET", Keyword::Set),
    ("MENU", Keyword::Menu),
    ("MSG", Keyword::Msg),
    ("NL", Keyword::Nl),
    ("OPENGAME", Keyword::OpenGame),
    ("P", Keyword::P),
    ("PL", Keyword::Pl),
    ("PLAY", Keyword::Play),
    ("REFINT", Keyword::RefInt),
    ("SAVEGAME", Keyword::SaveGame),
    ("SET", Keyword::Set),
    ("SETTIMER", Keyword::SetTimer),
    ("SHOWACTS", Keyword::ShowActs),
    ("SHOWINPUT", Keyword::ShowInput),
    ("SHOWOBJS", Keyword::ShowObjs),
    ("SHOWSTAT", Keyword::ShowStat),
    ("VIEW", Keyword::View),
    ("WAIT", Keyword::Wait),
    ("XGOTO", Keyword::XGoto),
    ("XGT", Keyword::XGoto),
];

fn lookup(word: &str) -> Option<Keyword> {
    KEYWORDS
        .binary_search_by_key(&word, |entry| entry.0)
        .ok()
        .map(|at| KEYWORDS[at].1)
}

/// The folded first token of a statement: `*` fuses with the following
/// word, `:` and `!` stand alone.
fn split_keyword(stmt: &str) -> (String, &str) {
    let stmt = stmt.trim_start();
    let mut end = 0;
    let bytes = stmt.as_bytes();
    if !bytes.is_empty() && (bytes[0] == b':' || bytes[0] == b'!') {
        return (text::fold(&stmt[..1]), &stmt[1..]);
    }
    if !bytes.is_empty() && bytes[0] == b'*' {
        end = 1;
    }
    while end < stmt.len() {
        let c = stmt[end..].chars().next().unwrap_or(' ');
        if text::is_delim(c) {
            break;
        }
        end += c.len_utf8();
    }
    (text::fold(&stmt[..end]), &stmt[end..])
}

/// True for a line whose last statement opens a multi-line IF or ACT body
/// (the colon ends the line).
fn opens_multiline(line: &str) -> bool {
    let trimmed = line.trim_start();
    let (keyword, _) = split_keyword(trimmed);
    if keyword != "IF" && keyword != "ACT" {
        return false;
    }
    match text::find_top_level(trimmed, ':') {
        Some(at) => {
            let tail = trimmed[at + 1..].trim();
            tail.is_empty() || tail.starts_with('!')
        }
        None => false,
    }
}

/// Finds the matching END for a construct opened just before `start`.
/// Returns the line of the first depth-1 ELSE, if any, and the END line.
fn scan_block(lines: &[String], start: usize) -> Result<(Option<usize>, usize)> {
    let mut depth = 1usize;
    let mut else_line = None;
    for (j, line) in lines.iter().enumerate().skip(start) {
        if opens_multiline(line) {
            depth += 1;
            continue;
        }
        let (keyword, _) = split_keyword(line.trim_start());
        match keyword.as_str() {
            "END" => {
                depth -= 1;
                if depth == 0 {
                    return Ok((else_line, j));
                }
            }
            "ELSE" => {
                if depth == 1 && else_line.is_none() {
                    else_line = Some(j);
                }
            }
            _ => {}
        }
    }
    Err(error!(EndNotFound))
}

/// Searches a block for `:label`, skipping nested multi-line bodies so a
/// jump cannot land inside a sibling construct. Returns the line and the
/// byte offset of the statement after the label.
fn find_label(lines: &[String], label: &str) -> Option<(usize, usize)> {
    let mut j = 0;
    while j < lines.len() {
        let line = &lines[j];
        if opens_multiline(line) {
            match scan_block(lines, j + 1) {
                Ok((_, end)) => {
                    j = end + 1;
                    continue;
                }
                Err(_) => return None,
            }
        }
        let mut base = 0;
        loop {
            let rest = &line[base..];
            let stmt_end = text::find_top_level(rest, '&');
            let stmt = match stmt_end {
                Some(at) => &rest[..at],
                None => rest,
            };
            let trimmed = stmt.trim();
            if let Some(name) = trimmed.strip_prefix(':') {
                if text::fold(name.trim()) == label {
                    let after = match stmt_end {
                        Some(at) => base + at + 1,
                        None => line.len(),
                    };
                    return Some((j, after));
                }
            }
            match stmt_end {
                Some(at) => base += at + 1,
                None => break,
            }
        }
        j += 1;
    }
    None
}

/// Finds an ELSE belonging to the current single-line IF, skipping any that
/// close nested IFs in the tail.
fn find_top_level_else(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut if_depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if text::is_quote(c) {
            i = text::skip_quoted(s, i)?;
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 && !text::is_delim(c) => {
                let start = i;
                while i < bytes.len() && !text::is_delim(bytes[i] as char) {
                    i += 1;
                }
                match text::fold(&s[start..i]).as_str() {
                    "IF" => if_depth += 1,
                    "ELSE" => {
                        if if_depth > 0 {
                            if_depth -= 1;
                        } else {
                            return Some(start);
                        }
                    }
                    _ => {}
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

impl Runtime {
    /// Runs a block of code lines, resolving jumps against this block's own
    /// labels and passing unresolved ones to the caller.
    pub(crate) fn exec_block(&mut self, lines: &[String]) -> Result<Flow> {
        let gen = self.gen;
        let mut i = 0;
        let mut offset = 0;
        while i < lines.len() {
            self.ctx.line = i;
            let (flow, next) = self.exec_line(lines, i, offset)?;
            if self.gen != gen {
                return Ok(Flow::Exit);
            }
            offset = 0;
            match flow {
                Flow::Continue => i = next,
                Flow::Exit => return Ok(Flow::Exit),
                Flow::Jump(label) => match find_label(lines, &label) {
                    Some((line, after)) => {
                        i = line;
                        offset = after;
                    }
                    None => return Ok(Flow::Jump(label)),
                },
            }
        }
        Ok(Flow::Continue)
    }

    /// One source line starting at `offset`, which may consume following
    /// lines when it opens a multi-line construct. Returns the flow and the
    /// next line to run.
    fn exec_line(&mut self, lines: &[String], i: usize, offset: usize) -> Result<(Flow, usize)> {
        let mut base = offset;
        let line = &lines[i];
        loop {
            let rest = &line[base..];
            if rest.trim().is_empty() {
                return Ok((Flow::Continue, i + 1));
            }
            let (keyword, _) = split_keyword(rest.trim_start());
            match keyword.as_str() {
                "!" => return Ok((Flow::Continue, i + 1)), // comment to end of line
                "IF" => return self.stmt_if(lines, i, rest.trim_start()),
                "ACT" => return self.stmt_act(lines, i, rest.trim_start()),
                _ => {}
            }
            let stmt_end = text::find_top_level(rest, '&');
            let stmt = match stmt_end {
                Some(at) => &rest[..at],
                None => rest,
            };
            let trimmed = stmt.trim();
            if !trimmed.is_empty() && !trimmed.starts_with(':') {
                let flow = self.exec_stmt(trimmed)?;
                if flow != Flow::Continue {
                    return Ok((flow, i + 1));
                }
            }
            match stmt_end {
                Some(at) => base += at + 1,
                None => return Ok((Flow::Continue, i + 1)),
            }
        }
    }

    /// A statement fragment inside a single-line IF branch. Runs with the
    /// outer line number preserved for error reports.
    fn exec_fragment(&mut self, src: &str) -> Result<Flow> {
        let line = self.ctx.line;
        let flow = self.exec_block(&[src.to_string()]);
        self.ctx.line = line;
        flow
    }

    fn stmt_if(&mut self, lines: &[String], i: usize, stmt: &str) -> Result<(Flow, usize)> {
        let (_, body) = split_keyword(stmt);
        let colon = match text::find_top_level(body, ':') {
            Some(at) => at,
            None => return Err(error!(ColonNotFound)),
        };
        let cond_src = &body[..colon];
        let tail = &body[colon + 1..];
        if tail.trim().is_empty() || tail.trim().starts_with('!') {
            // multi-line form
            let (else_line, end_line) = scan_block(lines, i + 1)?;
            let cond = self.eval_truth(cond_src)?;
            let flow = if cond {
                let stop = else_line.unwrap_or(end_line);
                self.exec_block(&lines[i + 1..stop])?
            } else if let Some(el) = else_line {
                self.exec_else(lines, el, end_line)?
            } else {
                Flow::Continue
            };
            Ok((flow, end_line + 1))
        } else {
            let (then_src, else_src) = match find_top_level_else(tail) {
                Some(at) => (&tail[..at], Some(tail[at + 4..].trim_start())),
                None => (tail, None),
            };
            let cond = self.eval_truth(cond_src)?;
            let flow = if cond {
                self.exec_fragment(then_src)?
            } else if let Some(src) = else_src {
                self.exec_fragment(src)?
            } else {
                Flow::Continue
            };
            Ok((flow, i + 1))
        }
    }

    /// The ELSE line may carry inline code after the keyword (with an
    /// optional colon); then the block below it runs.
    fn exec_else(&mut self, lines: &[String], el: usize, end_line: usize) -> Result<Flow> {
        let (_, inline) = split_keyword(lines[el].trim_start());
        let inline = inline.trim_start().strip_prefix(':').unwrap_or(inline).trim();
        if !inline.is_empty() && !inline.starts_with('!') {
            let flow = self.exec_fragment(inline)?;
            if flow != Flow::Continue {
                return Ok(flow);
            }
        }
        self.exec_block(&lines[el + 1..end_line])
    }

    fn stmt_act(&mut self, lines: &[String], i: usize, stmt: &str) -> Result<(Flow, usize)> {
        let (_, body) = split_keyword(stmt);
        let colon = match text::find_top_level(body, ':') {
            Some(at) => at,
            None => return Err(error!(ColonNotFound)),
        };
        let mut args = self.eval_args(&body[..colon])?;
        if args.is_empty() || args.len() > 2 {
            return Err(error!(ArgsCount));
        }
        let image = if args.len() == 2 {
            Some(args.pop().unwrap_or(Val::Num(0)).as_text()?.to_string())
        } else {
            None
        };
        let name = self.format_text(&args.remove(0).as_text()?)?;
        let tail = &body[colon + 1..];
        let (code, next) = if tail.trim().is_empty() || tail.trim().starts_with('!') {
            let (_, end_line) = scan_block(lines, i + 1)?;
            (lines[i + 1..end_line].to_vec(), end_line + 1)
        } else {
            (vec![tail.to_string()], i + 1)
        };
        self.add_action(Action {
            image,
            name,
            code,
            source_loc: self.ctx.loc.clone(),
            source_act: None,
        })?;
        Ok((Flow::Continue, next))
    }

    fn eval_args(&mut self, src: &str) -> Result<Vec<Val>> {
        let src = src.trim();
        if src.is_empty() {
            return Ok(vec![]);
        }
        let mut out = vec![];
        for part in text::split_top_level(src, ',') {
            out.push(self.eval_expr(part)?);
        }
        Ok(out)
    }

    fn one_text(&mut self, rest: &str) -> Result<Rc<str>> {
        let mut args = self.eval_args(rest)?;
        if args.len() != 1 {
            return Err(error!(ArgsCount));
        }
        args.remove(0).as_text()
    }

    /// An optional file name argument; absent means "ask the frontend".
    fn file_arg(&mut self, rest: &str) -> Result<Option<Rc<str>>> {
        let mut args = self.eval_args(rest)?;
        match args.len() {
            0 => Ok(None),
            1 => args.remove(0).as_text().map(Some),
            _ => Err(error!(ArgsCount)),
        }
    }

    /// One simple statement (IF/ACT never reach here).
    fn exec_stmt(&mut self, stmt: &str) -> Result<Flow> {
        let gen = self.gen;
        let (word, rest) = split_keyword(stmt);
        let keyword = match lookup(&word) {
            Some(kw) => kw,
            None => return self.assignment(stmt).map(|_| Flow::Continue),
        };
        match keyword {
            Keyword::Exit => {
                self.expect_no_args(rest)?;
                return Ok(Flow::Exit);
            }
            Keyword::Jump => {
                let label = self.one_text(rest)?;
                return Ok(Flow::Jump(text::fold(label.trim())));
            }
            Keyword::Goto | Keyword::XGoto => {
                let mut args = self.eval_args(rest)?;
                if args.is_empty() {
                    return Err(error!(ArgsCount));
                }
                let name = args.remove(0).as_text()?;
                self.goto_location(&name, &args, keyword == Keyword::Goto)?;
                return Ok(Flow::Exit);
            }
            Keyword::Gosub => {
                let mut args = self.eval_args(rest)?;
                if args.is_empty() {
                    return Err(error!(ArgsCount));
                }
                let name = args.remove(0).as_text()?;
                self.call_location(&name, &args)?;
            }
            Keyword::Set => self.assignment(rest)?,
            Keyword::MainP => {
                let out = self.print_arg(rest)?;
                self.main_desc.push_str(&out);
                self.dirty.main = true;
            }
            Keyword::MainPl => {
                let out = self.print_arg(rest)?;
                self.main_desc.push_str(&out);
                self.main_desc.push('\n');
                self.dirty.main = true;
            }
            Keyword::MainNl => {
                let out = self.print_arg(rest)?;
                self.main_desc.push('\n');
                self.main_desc.push_str(&out);
                self.dirty.main = true;
            }
            Keyword::MainClear => {
                self.expect_no_args(rest)?;
                self.main_desc.clear();
                self.dirty.main = true;
            }
            Keyword::P => {
                let out = self.print_arg(rest)?;
                self.vars_desc.push_str(&out);
                self.dirty.vars = true;
            }
            Keyword::Pl => {
                let out = self.print_arg(rest)?;
                self.vars_desc.push_str(&out);
                self.vars_desc.push('\n');
                self.dirty.vars = true;
            }
            Keyword::Nl => {
                let out = self.print_arg(rest)?;
                self.vars_desc.push('\n');
                self.vars_desc.push_str(&out);
                self.dirty.vars = true;
            }
            Keyword::Clear => {
                self.expect_no_args(rest)?;
                self.vars_desc.clear();
                self.dirty.vars = true;
            }
            Keyword::Msg => {
                let out = self.print_arg(rest)?;
                self.host_call(|host| host.show_message(&out));
            }
            Keyword::AddObj => self.stmt_addobj(rest)?,
            Keyword::DelObj => {
                let name = self.one_text(rest)?;
                let folded = text::fold(&name);
                if let Some(at) = self
                    .objects
                    .iter()
                    .position(|o| text::fold(&o.name) == folded)
                {
                    self.remove_object(at);
                }
            }
            Keyword::KillObj => {
                let args = self.eval_args(rest)?;
                match args.first() {
                    None => {
                        self.objects.clear();
                        self.selected_object = None;
                        self.dirty.objects = true;
                    }
                    Some(v) => {
                        let n = v.as_num()?;
                        if n >= 1 && (n as usize) <= self.objects.len() {
                            self.remove_object(n as usize - 1);
                        }
                    }
                }
            }
            Keyword::DelAct => {
                let name = self.one_text(rest)?;
                let folded = text::fold(&name);
                if let Some(at) = self
                    .actions
                    .iter()
                    .position(|a| text::fold(&a.name) == folded)
                {
                    self.actions.remove(at);
                    if self.selected_action == Some(at) {
                        self.selected_action = None;
                    }
                    self.dirty.actions = true;
                }
            }
            Keyword::Cla => {
                self.expect_no_args(rest)?;
                self.actions.clear();
                self.selected_action = None;
                self.dirty.actions = true;
            }
            Keyword::Cls => {
                self.expect_no_args(rest)?;
                self.main_desc.clear();
                self.vars_desc.clear();
                self.input_text.clear();
                self.actions.clear();
                self.selected_action = None;
                self.host_call(|host| host.set_input_text(""));
                self.dirty.main = true;
                self.dirty.vars = true;
                self.dirty.actions = true;
            }
            Keyword::KillVar => {
                let args = self.eval_args(rest)?;
                self.stmt_killvar(args)?;
            }
            Keyword::KillAll => {
                self.expect_no_args(rest)?;
                self.vars.clear();
                self.objects.clear();
                self.selected_object = None;
                self.dirty.objects = true;
            }
            Keyword::Dynamic => {
                let mut args = self.eval_args(rest)?;
                if args.is_empty() {
                    return Err(error!(CodeNotFound));
                }
                let code = args.remove(0).as_text()?;
                self.exec_dynamic(&code, &args)?;
            }
            Keyword::Exec => {
                let cmd = self.one_text(rest)?;
                self.host_call(|host| host.system(&cmd));
            }
            Keyword::IncLib => {
                let file = self.one_text(rest)?;
                self.include_file(&file)?;
            }
            Keyword::Menu => {
                let name = self.one_text(rest)?;
                self.stmt_menu(&name)?;
            }
            Keyword::Play => {
                let mut args = self.eval_args(rest)?;
                if args.is_empty() {
                    return Err(error!(ArgsCount));
                }
                let volume = if args.len() > 1 {
                    args.pop().unwrap_or(Val::Num(100)).as_num()?
                } else {
                    100
                };
                let file = args.remove(0).as_text()?;
                if !self.playlist.iter().any(|f| f == file.as_ref()) {
                    self.playlist.push(file.to_string());
                }
                self.host_call(|host| host.play_file(&file, volume));
            }
            Keyword::Close => {
                if text::fold(rest.trim()) == "ALL" {
                    self.playlist.clear();
                    self.host_call(|host| host.close_file(None));
                } else {
                    let file = self.one_text(rest)?;
                    self.playlist.retain(|f| f != file.as_ref());
                    self.host_call(|host| host.close_file(Some(&file)));
                }
            }
            Keyword::RefInt => {
                self.expect_no_args(rest)?;
                self.refresh(true);
            }
            Keyword::OpenGame => {
                let file = self.file_arg(rest)?;
                self.host_call(|host| host.open_game_status(file.as_deref()));
            }
            Keyword::SaveGame => {
                let file = self.file_arg(rest)?;
                self.host_call(|host| host.save_game_status(file.as_deref()));
            }
            Keyword::View => {
                let args = self.eval_args(rest)?;
                match args.first() {
                    None => self.host_call(|host| host.show_image(None)),
                    Some(v) => {
                        let file = v.clone().as_text()?;
                        self.host_call(|host| host.show_image(Some(&file)));
                    }
                }
            }
            Keyword::ShowActs => self.stmt_show(rest, super::host::Window::Actions)?,
            Keyword::ShowObjs => self.stmt_show(rest, super::host::Window::Objects)?,
            Keyword::ShowStat => self.stmt_show(rest, super::host::Window::Vars)?,
            Keyword::ShowInput => self.stmt_show(rest, super::host::Window::Input)?,
            Keyword::Wait => {
                let mut args = self.eval_args(rest)?;
                if args.len() != 1 {
                    return Err(error!(ArgsCount));
                }
                let ms = args.remove(0).as_num()?;
                self.host_call(|host| host.sleep(ms));
            }
            Keyword::SetTimer => {
                let mut args = self.eval_args(rest)?;
                if args.len() != 1 {
                    return Err(error!(ArgsCount));
                }
                let ms = args.remove(0).as_num()?;
                self.timer_ms = ms;
                self.host_call(|host| host.set_timer(ms));
            }
            Keyword::Else | Keyword::End => {
                return Err(error!(Syntax; "MISPLACED ELSE/END"));
            }
            Keyword::If | Keyword::Act => {
                return Err(error!(Syntax; "MISPLACED IF/ACT"));
            }
        }
        if self.gen != gen {
            return Ok(Flow::Exit);
        }
        Ok(Flow::Continue)
    }

    fn expect_no_args(&self, rest: &str) -> Result<()> {
        if rest.trim().is_empty() {
            Ok(())
        } else {
            Err(error!(ArgsCount))
        }
    }

    /// Print statements take one optional value, shown with the value's
    /// display form. `<<expr>>` spans in the result are expanded, the same
    /// treatment location descriptions get.
    fn print_arg(&mut self, rest: &str) -> Result<String> {
        let args = self.eval_args(rest)?;
        match args.len() {
            0 => Ok(String::new()),
            1 => self.format_text(&args[0].to_string()),
            _ => Err(error!(ArgsCount)),
        }
    }

    fn remove_object(&mut self, at: usize) {
        self.objects.remove(at);
        match self.selected_object {
            Some(sel) if sel == at => self.selected_object = None,
            Some(sel) if sel > at => self.selected_object = Some(sel - 1),
            _ => {}
        }
        self.dirty.objects = true;
    }

    fn stmt_addobj(&mut self, rest: &str) -> Result<()> {
        let mut args = self.eval_args(rest)?;
        if args.is_empty() || args.len() > 3 {
            return Err(error!(ArgsCount));
        }
        if self.objects.len() >= MAX_OBJECTS {
            return Err(error!(CannotAddObject));
        }
        let pos = if args.len() == 3 {
            let n = args.pop().unwrap_or(Val::Num(0)).as_num()?;
            Some((n.max(1) as usize - 1).min(self.objects.len()))
        } else {
            None
        };
        let image = if args.len() == 2 {
            Some(args.pop().unwrap_or(Val::Num(0)).as_text()?.to_string())
        } else {
            None
        };
        let name = args.remove(0).as_text()?.to_string();
        let obj = Object { image, name };
        match pos {
            Some(at) => self.objects.insert(at, obj),
            None => self.objects.push(obj),
        }
        self.dirty.objects = true;
        Ok(())
    }

    fn stmt_killvar(&mut self, args: Vec<Val>) -> Result<()> {
        let mut iter = args.into_iter();
        let name = match iter.next() {
            None => {
                self.vars.clear();
                return Ok(());
            }
            Some(v) => v.as_text()?,
        };
        let name = name.strip_prefix('$').unwrap_or(&name).to_string();
        match iter.next() {
            None => self.vars.remove(&name),
            Some(index) => {
                let at = self.vars.index_of(&name, &index, false)?;
                if let Some(var) = self.vars.reference(&name, false)? {
                    var.remove_element(at);
                }
                Ok(())
            }
        }
    }

    /// DYNAMIC: executes a code text in place with its own ARGS window.
    /// EXIT inside the fragment ends the fragment only.
    fn exec_dynamic(&mut self, code: &str, args: &[Val]) -> Result<()> {
        let saved = self.vars.take("ARGS");
        let saved_ctx = self.ctx.clone();
        let gen = self.gen;
        let mut result = Ok(());
        for (n, arg) in args.iter().enumerate() {
            let text_part = matches!(arg, Val::Text(_));
            result = self.vars.store("ARGS", n, text_part, arg.clone());
            if result.is_err() {
                break;
            }
        }
        if result.is_ok() {
            let lines: Vec<String> = code.lines().map(|l| l.to_string()).collect();
            result = match self.exec_block(&lines) {
                Ok(Flow::Jump(_)) => Err(error!(LabelNotFound)),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
        }
        if self.gen == gen {
            self.ctx = saved_ctx;
            self.vars.remove("ARGS").ok();
            if let Some(var) = saved {
                self.vars.put(var);
            }
        }
        result
    }

    /// MENU: builds the popup from a variable whose text elements read
    /// `name:location[:image]`, shows it, and runs the picked entry's
    /// location with the one-based position in ARGS.
    fn stmt_menu(&mut self, var_name: &str) -> Result<()> {
        let name = var_name.strip_prefix('$').unwrap_or(var_name);
        let len = self.vars.find(name).map_or(0, |var| var.values.len());
        self.menu.clear();
        for at in 0..len {
            let entry = self.vars.fetch(name, at, true)?.as_text()?;
            if entry.trim().is_empty() {
                continue;
            }
            if self.menu.len() >= MAX_MENU_ITEMS {
                return Err(error!(CannotAddMenuItem));
            }
            let mut parts = entry.splitn(3, ':');
            let label = parts.next().unwrap_or("").to_string();
            let location = parts.next().unwrap_or("").to_string();
            let image = parts.next().map(|s| s.to_string());
            self.menu.push(MenuItem {
                image,
                name: label,
                location,
            });
        }
        if self.menu.is_empty() {
            return Ok(());
        }
        let items = self.menu.clone();
        let gen = self.gen;
        let pick = self.host_call(|host| {
            host.delete_menu();
            for item in &items {
                host.add_menu_item(&item.name, item.image.as_deref());
            }
            host.show_menu()
        });
        if self.gen != gen {
            return Ok(());
        }
        if let Some(at) = pick {
            if let Some(item) = items.get(at) {
                if !item.location.is_empty() {
                    let args = [Val::Num(at as i64 + 1)];
                    self.call_location(&item.location, &args)?;
                }
            }
        }
        Ok(())
    }

    fn stmt_show(&mut self, rest: &str, window: super::host::Window) -> Result<()> {
        let mut args = self.eval_args(rest)?;
        if args.len() != 1 {
            return Err(error!(ArgsCount));
        }
        let visible = args.remove(0).truth();
        self.windows[Runtime::window_slot(window)] = visible;
        self.host_call(|host| host.show_window(window, visible));
        Ok(())
    }

    /// Assignment: `[$]name[[index]] [op]= expr`, also reached through SET
    /// and LET. A trailing `+ - * /` before the equals makes it compound.
    fn assignment(&mut self, src: &str) -> Result<()> {
        let eq = match text::find_top_level(src, '=') {
            Some(at) => at,
            None => {
                return Err(error!(UnknownAction));
            }
        };
        if eq == 0 {
            return Err(error!(IncorrectName));
        }
        let mut lhs = src[..eq].trim_end();
        let compound = lhs.chars().last().filter(|c| "+-*/".contains(*c));
        if compound.is_some() {
            lhs = lhs[..lhs.len() - 1].trim_end();
        }
        let value = self.eval_expr(&src[eq + 1..])?;

        let lhs = lhs.trim_start();
        let text_part = lhs.starts_with('$');
        let lhs = lhs.strip_prefix('$').unwrap_or(lhs);
        let (name, index_src) = match lhs.find('[') {
            Some(open) => {
                if !lhs.ends_with(']') {
                    return Err(error!(BracketNotFound));
                }
                (&lhs[..open], Some(&lhs[open + 1..lhs.len() - 1]))
            }
            None => (lhs, None),
        };
        let name = name.trim();
        let at = match index_src.map(|s| s.trim()) {
            None => 0,
            Some("") => self.vars.find(name).map_or(0, |var| var.values.len()),
            Some(src) => {
                let index = self.eval_expr(src)?;
                self.vars.index_of(name, &index, true)?
            }
        };
        let value = match compound {
            None => value,
            Some(op) => {
                let have = self.vars.fetch(name, at, text_part)?;
                match op {
                    '+' => super::operation::Operation::sum(have, value)?,
                    '-' => super::operation::Operation::subtract(have, value)?,
                    '*' => super::operation::Operation::multiply(have, value)?,
                    _ => super::operation::Operation::divide(have, value)?,
                }
            }
        };
        let value = value.flatten();
        self.vars.store(name, at, text_part, value)
    }
}
