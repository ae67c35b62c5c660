mod common;
use common::*;
use fable::lang::ErrorCode;
use fable::mach::Runtime;
use fable::world::{GameFormat, GameFile};

#[test]
fn test_save_restore_roundtrip() {
    let mut r = start(vec![
        loc("Home", "A quiet room.", &["money = 50", "$name = 'Ann'"]),
        loc("Cave", "", &[]),
    ]);
    r.exec_code("addobj 'lamp' & stock['sword'] = 3").unwrap();
    r.exec_code("act 'Dig': depth += 1").unwrap();
    r.exec_code("p 'status line'").unwrap();
    let bytes = r.write_state().unwrap();

    r.exec_code("money = 0 & killobj & cla & gt 'Cave'").unwrap();
    assert_eq!(r.var_num("money", 0), 0);

    r.read_state(&bytes).unwrap();
    assert_eq!(r.cur_loc_name(), Some("Home"));
    assert_eq!(r.var_num("money", 0), 50);
    assert_eq!(r.var_text("name", 0), "Ann");
    assert_eq!(r.main_desc(), "A quiet room.\n");
    assert_eq!(r.vars_desc(), "status line");
    assert_eq!(r.objects().len(), 1);
    assert_eq!(r.actions().len(), 1);
    assert_eq!(num(&mut r, "stock['sword']"), 3);

    // the restored action still runs
    r.select_action(0).unwrap();
    assert_eq!(r.var_num("depth", 0), 1);
}

#[test]
fn test_save_for_other_game_rejected() {
    let mut a = start(vec![loc("A", "", &["x = 1"])]);
    let bytes = a.write_state().unwrap();

    let mut b = start(vec![loc("B", "", &[])]);
    let e = b.read_state(&bytes).unwrap_err();
    assert!(e.is(ErrorCode::CannotLoadFile));
    b.reset_error();

    // the debug flag bypasses the identity check
    b.exec_code("debug = 1").unwrap();
    b.read_state(&bytes).unwrap();
    assert_eq!(b.var_num("x", 0), 1);
}

#[test]
fn test_rejected_restore_leaves_state_alone() {
    let mut a = start(vec![loc("A", "", &[])]);
    let bytes = a.write_state().unwrap();

    let mut b = start(vec![loc("B", "", &["n = 7"])]);
    b.read_state(&bytes).unwrap_err();
    assert_eq!(b.var_num("n", 0), 7);
    assert_eq!(b.cur_loc_name(), Some("B"));
}

#[test]
fn test_garbage_save_rejected() {
    let mut r = scratch();
    assert!(r.read_state(b"not a save at all").is_err());
}

#[test]
fn test_save_and_open_file() {
    let path = std::env::temp_dir().join(format!("fable-test-{}.sav", std::process::id()));
    let mut r = start(vec![loc("Home", "", &["gold = 12"])]);
    r.save_state(&path).unwrap();
    r.exec_code("gold = 0").unwrap();
    r.open_state(&path).unwrap();
    assert_eq!(r.var_num("gold", 0), 12);
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_corrupted_game_rejected() {
    let mut bytes = game(vec![loc("Main", "", &[])]);
    let at = bytes.len() - 3;
    bytes[at] ^= 0xff;
    let mut r = Runtime::new();
    let e = r.load_game(&bytes).unwrap_err();
    assert!(e.is(ErrorCode::CannotLoadFile));
}

#[test]
fn test_wrong_magic_rejected() {
    let mut r = Runtime::new();
    assert!(r.load_game(b"MZ\x00\x01whatever").is_err());
}

#[test]
fn test_legacy_game_format_loads() {
    let locations = vec![loc("Main", "Old world.", &["x = 3"])];
    let bytes = GameFile::write(fable::mach::VERSION, &locations, GameFormat::Legacy);
    let mut r = Runtime::new();
    r.load_game(&bytes).unwrap();
    r.restart().unwrap();
    assert_eq!(r.main_desc(), "Old world.\n");
    assert_eq!(r.var_num("x", 0), 3);
}

#[test]
fn test_restart_resets_everything() {
    let mut r = start(vec![loc("Main", "Fresh.", &[])]);
    r.exec_code("n = 9 & addobj 'coin' & p 'junk'").unwrap();
    r.restart().unwrap();
    assert_eq!(r.var_num("n", 0), 0);
    assert!(r.objects().is_empty());
    assert_eq!(r.vars_desc(), "");
    assert_eq!(r.main_desc(), "Fresh.\n");
}
