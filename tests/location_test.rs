mod common;
use common::*;
use fable::lang::ErrorCode;
use fable::world::Location;

fn town() -> Vec<Location> {
    let mut home = loc("Home", "You are home, <<$name>>.", &["visits += 1"]);
    home.actions.push(act("Leave", &["goto 'Square'"]));
    let square = loc("Square", "The town square.", &[]);
    vec![home, square]
}

#[test]
fn test_desc_template_expansion() {
    let mut r = start(vec![loc("Main", "Coins: <<10*3>>", &[])]);
    assert_eq!(r.main_desc(), "Coins: 30\n");
}

#[test]
fn test_base_actions_added() {
    let r = start(town());
    assert_eq!(r.actions().len(), 1);
    assert_eq!(r.actions()[0].name, "Leave");
}

#[test]
fn test_goto_clears_desc_and_actions() {
    let mut r = start(town());
    r.select_action(0).unwrap();
    assert_eq!(r.cur_loc_name(), Some("Square"));
    assert_eq!(r.main_desc(), "The town square.\n");
    assert!(r.actions().is_empty());
}

#[test]
fn test_xgoto_keeps_desc() {
    let mut r = start(vec![
        loc("A", "First.", &["xgt 'B'"]),
        loc("B", "Second.", &[]),
    ]);
    assert_eq!(r.cur_loc_name(), Some("B"));
    assert_eq!(r.main_desc(), "First.\nSecond.\n");
}

#[test]
fn test_location_code_runs_on_visit() {
    let mut r = start(town());
    assert_eq!(r.var_num("visits", 0), 1);
    r.restart().unwrap();
    assert_eq!(r.var_num("visits", 0), 1);
}

#[test]
fn test_gosub_runs_in_place() {
    let mut r = start(vec![
        loc("Main", "", &["gs 'greet', 'Ann'"]),
        loc("greet", "", &["$hello = 'Hi ' + $args[0]"]),
    ]);
    assert_eq!(r.cur_loc_name(), Some("Main"));
    assert_eq!(r.var_text("hello", 0), "Hi Ann");
}

#[test]
fn test_func_returns_result() {
    let mut r = start(vec![
        loc("Main", "", &["total = func('double', 21)"]),
        loc("double", "", &["result = args[0] * 2"]),
    ]);
    assert_eq!(r.var_num("total", 0), 42);
}

#[test]
fn test_args_are_scoped_to_the_call() {
    let mut r = start(vec![
        loc("Main", "", &["args[0] = 7", "n = func('probe')", "keep = args[0]"]),
        loc("probe", "", &["result = arrsize('args')"]),
    ]);
    assert_eq!(r.var_num("n", 0), 0);
    assert_eq!(r.var_num("keep", 0), 7);
}

#[test]
fn test_onnewloc_hook() {
    let mut r = start(vec![
        loc("Main", "", &["$onnewloc = 'tally'", "gt 'End'"]),
        loc("End", "", &[]),
        loc("tally", "", &["moves += 1"]),
    ]);
    assert_eq!(r.cur_loc_name(), Some("End"));
    assert_eq!(r.var_num("moves", 0), 1);
}

#[test]
fn test_onnewloc_fires_once_after_nested_goto() {
    let mut r = start(vec![
        loc("Main", "", &["$onnewloc = 'tally'", "gt 'Mid'"]),
        loc("Mid", "", &["gt 'End'"]),
        loc("End", "", &[]),
        loc("tally", "", &["moves += 1"]),
    ]);
    assert_eq!(r.cur_loc_name(), Some("End"));
    assert_eq!(r.var_num("moves", 0), 1);
}

#[test]
fn test_dangling_hook_is_quiet() {
    let mut r = start(vec![
        loc("Main", "", &["$onnewloc = 'nowhere'", "gt 'End'"]),
        loc("End", "", &[]),
    ]);
    assert_eq!(r.cur_loc_name(), Some("End"));
    assert!(r.last_error().is_none());
}

#[test]
fn test_unknown_location() {
    let mut r = scratch();
    let e = r.exec_code("gt 'Atlantis'").unwrap_err();
    assert!(e.is(ErrorCode::LocationNotFound));
}

#[test]
fn test_exec_location_entry_point() {
    let mut r = start(town());
    r.exec_location("square").unwrap();
    assert_eq!(r.cur_loc_name(), Some("Square"));
}

#[test]
fn test_location_names_fold() {
    let mut r = start(town());
    r.exec_code("gt 'SQUARE'").unwrap();
    assert_eq!(r.cur_loc_name(), Some("Square"));
}

#[test]
fn test_error_reports_location_and_line() {
    let mut r = fable::mach::Runtime::new();
    r.load_game(&game(vec![loc("Cave", "", &["x = 1", "y = 1/0"])]))
        .unwrap();
    let e = r.restart().unwrap_err();
    assert!(e.is(ErrorCode::DivisionByZero));
    let shown = e.to_string();
    assert!(shown.contains("AT Cave"), "got: {}", shown);
    assert!(shown.contains("LINE 2"), "got: {}", shown);
    assert_eq!(r.var_num("x", 0), 1);
}

#[test]
fn test_dirty_flags_settle() {
    let mut r = start(town());
    assert!(r.dirty().any());
    r.clear_dirty();
    r.exec_code("n = 1").unwrap();
    assert!(!r.dirty().any());
    r.exec_code("p 'hi'").unwrap();
    assert!(r.dirty().vars);
}
