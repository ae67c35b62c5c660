mod common;
use common::*;
use fable::lang::ErrorCode;

#[test]
fn test_numeric_text_coercion() {
    let mut r = scratch();
    assert_eq!(num(&mut r, "'3' + 4"), 7);
    assert_eq!(num(&mut r, "'10' - '2'"), 8);
    assert_eq!(text(&mut r, "'3' + 'a'"), "3a");
    assert_eq!(num(&mut r, "'' + 1"), 1);
}

#[test]
fn test_comparison_prefers_numbers() {
    let mut r = scratch();
    assert_eq!(num(&mut r, "'2' < '10'"), -1);
    assert_eq!(num(&mut r, "'b' > 'a'"), -1);
    assert_eq!(num(&mut r, "3 = '3'"), -1);
}

#[test]
fn test_precedence_and_unary() {
    let mut r = scratch();
    assert_eq!(num(&mut r, "2 + 3 * 4"), 14);
    assert_eq!(num(&mut r, "-(2 + 3)"), -5);
    assert_eq!(num(&mut r, "not 0 and 5 > 2"), -1);
    assert_eq!(num(&mut r, "3 or 4 and 4"), 7);
}

#[test]
fn test_division_by_zero() {
    let mut r = scratch();
    let e = r.exec_expr("1 / 0").unwrap_err();
    assert!(e.is(ErrorCode::DivisionByZero));
    let e = r.exec_expr("7 mod 0").unwrap_err();
    assert!(e.is(ErrorCode::DivisionByZero));
}

#[test]
fn test_string_functions() {
    let mut r = scratch();
    assert_eq!(text(&mut r, "mid('fable', 2, 3)"), "abl");
    assert_eq!(num(&mut r, "instr('fable', 'ble')"), 3);
    assert_eq!(text(&mut r, "replace('banana', 'na', '*')"), "ba**");
    assert_eq!(text(&mut r, "trim('  x  ')"), "x");
    assert_eq!(text(&mut r, "ucase('abc') + lcase('DE')"), "ABCde");
    assert_eq!(num(&mut r, "len('hello')"), 5);
}

#[test]
fn test_conversion_functions() {
    let mut r = scratch();
    assert_eq!(num(&mut r, "val('12ab')"), 0);
    assert_eq!(num(&mut r, "val('12')"), 12);
    assert_eq!(text(&mut r, "str(42)"), "42");
    assert_eq!(num(&mut r, "isnum('  -3 ')"), -1);
    assert_eq!(num(&mut r, "isnum('x')"), 0);
}

#[test]
fn test_iif_min_max() {
    let mut r = scratch();
    assert_eq!(text(&mut r, "iif(2 > 1, 'yes', 'no')"), "yes");
    assert_eq!(num(&mut r, "min(3, 1, 2)"), 1);
    assert_eq!(num(&mut r, "max(3, 1, 2)"), 3);
    assert_eq!(text(&mut r, "min('b', 'a')"), "a");
}

#[test]
fn test_rand_stays_in_range() {
    let mut r = scratch();
    for _ in 0..50 {
        let n = num(&mut r, "rand(5, 2)");
        assert!((2..=5).contains(&n));
        let n = num(&mut r, "rnd()");
        assert!((1..=1000).contains(&n));
    }
}

#[test]
fn test_regexp_functions() {
    let mut r = scratch();
    assert_eq!(num(&mut r, r"strcomp('ab12', '[a-z]+\d+')"), -1);
    assert_eq!(num(&mut r, r"strcomp('ab12x', '[a-z]+\d+')"), 0);
    assert_eq!(text(&mut r, r"strfind('go north', 'go (\w+)', 1)"), "north");
    assert_eq!(num(&mut r, r"strpos('abc123', '\d+')"), 4);
}

#[test]
fn test_bad_regexp_reported() {
    let mut r = scratch();
    let e = r.exec_expr("strcomp('x', '(')").unwrap_err();
    assert!(e.is(ErrorCode::IncorrectRegexp));
}

#[test]
fn test_subexpression_concat() {
    let mut r = scratch();
    assert_eq!(text(&mut r, "('a' & 'b')"), "ab");
}

#[test]
fn test_curloc() {
    let mut r = start(vec![loc("Cave", "", &[])]);
    assert_eq!(text(&mut r, "curloc()"), "Cave");
}
