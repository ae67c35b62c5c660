mod common;
use common::*;
use fable::lang::ErrorCode;

#[test]
fn test_single_line_if() {
    let mut r = scratch();
    r.exec_code("if 2 > 1: x = 1").unwrap();
    assert_eq!(r.var_num("x", 0), 1);
    r.exec_code("if 0: y = 1").unwrap();
    assert_eq!(r.var_num("y", 0), 0);
}

#[test]
fn test_single_line_if_else() {
    let mut r = scratch();
    r.exec_code("if 0: x = 1 else x = 2").unwrap();
    assert_eq!(r.var_num("x", 0), 2);
    r.exec_code("if 1: x = 3 else x = 4").unwrap();
    assert_eq!(r.var_num("x", 0), 3);
}

#[test]
fn test_else_binds_to_nearest_if() {
    let mut r = scratch();
    r.exec_code("if 1: if 0: x = 1 else x = 2").unwrap();
    assert_eq!(r.var_num("x", 0), 2);
    r.exec_code("if 0: if 1: y = 1 else y = 2").unwrap();
    assert_eq!(r.var_num("y", 0), 0);
}

#[test]
fn test_multiline_if() {
    let mut r = scratch();
    r.exec_code("if 1:\n  x = 1\n  y = 2\nend").unwrap();
    assert_eq!(r.var_num("x", 0), 1);
    assert_eq!(r.var_num("y", 0), 2);
}

#[test]
fn test_multiline_if_else() {
    let mut r = scratch();
    r.exec_code("if 0:\n  x = 1\nelse\n  x = 2\nend").unwrap();
    assert_eq!(r.var_num("x", 0), 2);
}

#[test]
fn test_nested_multiline() {
    let mut r = scratch();
    let code = "if 1:\n  if 0:\n    x = 1\n  else\n    x = 2\n  end\n  y = 3\nend";
    r.exec_code(code).unwrap();
    assert_eq!(r.var_num("x", 0), 2);
    assert_eq!(r.var_num("y", 0), 3);
}

#[test]
fn test_missing_end() {
    let mut r = scratch();
    let e = r.exec_code("if 1:\n  x = 1").unwrap_err();
    assert!(e.is(ErrorCode::EndNotFound));
    r.reset_error();
}

#[test]
fn test_missing_colon() {
    let mut r = scratch();
    let e = r.exec_code("if 1 x = 1").unwrap_err();
    assert!(e.is(ErrorCode::ColonNotFound));
    r.reset_error();
}

#[test]
fn test_truthy_text_condition() {
    let mut r = scratch();
    r.exec_code("$w = 'look'\nif $w: x = 1").unwrap();
    assert_eq!(r.var_num("x", 0), 1);
    r.exec_code("$w = '0'\nif $w: x = 2").unwrap();
    assert_eq!(r.var_num("x", 0), 1);
}
