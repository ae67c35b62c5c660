//! The reference terminal host: a minimal player that drives the engine
//! through the same public API a GUI frontend would use.

extern crate ansi_term;
extern crate linefeed;

use ansi_term::{Colour, Style};
use chrono::Local;
use fable::mach::{Host, Runtime, Window};
use linefeed::{Interface, ReadResult};
use std::io::Write;
use std::path::Path;

pub fn main() {
    env_logger::init();
    if let Err(error) = main_loop() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

fn main_loop() -> std::io::Result<()> {
    let mut runtime = Runtime::with_host(Box::new(TermHost::default()));
    println!(
        "FABLE {}  {}",
        runtime.version(),
        Local::now().format("%e %b %Y %H:%M")
    );
    let game = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: fable <game file>");
            return Ok(());
        }
    };
    if let Err(error) = runtime
        .load_game_file(Path::new(&game))
        .and_then(|_| runtime.restart())
    {
        eprintln!("{}", Style::new().bold().paint(error.to_string()));
        return Ok(());
    }

    let command = Interface::new("fable")?;
    command.set_prompt("> ")?;
    loop {
        render(&mut runtime);
        let line = match command.read_line()? {
            ReadResult::Input(line) => line,
            ReadResult::Signal(_) | ReadResult::Eof => break,
        };
        if !dispatch(&mut runtime, line.trim()) {
            break;
        }
        command.add_history_unique(line);
    }
    Ok(())
}

/// Prints whichever panes changed since the last prompt.
fn render(runtime: &mut Runtime) {
    let dirty = runtime.dirty();
    if dirty.main && !runtime.main_desc().is_empty() {
        println!("{}", runtime.main_desc().trim_end());
    }
    if dirty.vars && runtime.window_shown(Window::Vars) && !runtime.vars_desc().is_empty() {
        println!("{}", Colour::Cyan.paint(runtime.vars_desc().trim_end()));
    }
    if dirty.objects && runtime.window_shown(Window::Objects) && !runtime.objects().is_empty() {
        let names: Vec<&str> = runtime.objects().iter().map(|o| o.name.as_str()).collect();
        println!("{} {}", Colour::Green.paint("you have:"), names.join(", "));
    }
    if dirty.actions && runtime.window_shown(Window::Actions) {
        for (n, action) in runtime.actions().iter().enumerate() {
            println!("  {}. {}", n + 1, action.name);
        }
    }
    runtime.clear_dirty();
}

/// One line of player input; returns false to quit.
fn dispatch(runtime: &mut Runtime, line: &str) -> bool {
    let result = match line {
        "" => Ok(()),
        "/quit" | "/q" => return false,
        "/restart" => runtime.restart(),
        _ if line.starts_with("/save ") => runtime.save_state(Path::new(line[6..].trim())),
        _ if line.starts_with("/open ") => runtime.open_state(Path::new(line[6..].trim())),
        _ => match line.parse::<usize>() {
            Ok(n) if n >= 1 && n <= runtime.actions().len() => runtime.select_action(n - 1),
            _ => {
                runtime.set_input_text(line);
                runtime.exec_user_input()
            }
        },
    };
    if let Err(error) = result {
        eprintln!("{}", Style::new().bold().paint(error.to_string()));
        runtime.reset_error();
    }
    true
}

/// Host implementation over plain stdio; media and timers degrade to text
/// notes or no-ops.
#[derive(Default)]
struct TermHost {}

impl Host for TermHost {
    fn debug(&mut self, text: &str) {
        log::debug!("game: {}", text);
    }

    fn show_message(&mut self, text: &str) {
        println!("{}", Style::new().bold().paint(text));
        print!("[press enter]");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).ok();
    }

    fn input_box(&mut self, prompt: &str) -> String {
        print!("{} ", prompt);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).ok();
        line.trim_end().to_string()
    }

    fn show_image(&mut self, file: Option<&str>) {
        if let Some(file) = file {
            println!("{}", Colour::Yellow.paint(format!("[picture: {}]", file)));
        }
    }

    fn play_file(&mut self, file: &str, _volume: i64) {
        println!("{}", Colour::Yellow.paint(format!("[music: {}]", file)));
    }

    fn sleep(&mut self, ms: i64) {
        if ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(ms as u64));
        }
    }
}
