mod common;
use common::*;

#[test]
fn test_names_are_case_insensitive() {
    let mut r = scratch();
    r.exec_code("abc = 5").unwrap();
    assert_eq!(r.var_num("ABC", 0), 5);
    assert_eq!(num(&mut r, "aBc + 1"), 6);
}

#[test]
fn test_text_and_num_parts_coexist() {
    let mut r = scratch();
    r.exec_code("hero = 9 & $hero = 'Ann'").unwrap();
    assert_eq!(r.var_num("hero", 0), 9);
    assert_eq!(r.var_text("hero", 0), "Ann");
}

#[test]
fn test_numeric_indexing() {
    let mut r = scratch();
    r.exec_code("arr[4] = 7").unwrap();
    assert_eq!(num(&mut r, "arr[4]"), 7);
    assert_eq!(num(&mut r, "arr[2]"), 0);
    assert_eq!(num(&mut r, "arrsize('arr')"), 5);
}

#[test]
fn test_append_with_empty_brackets() {
    let mut r = scratch();
    r.exec_code("q[] = 10 & q[] = 20 & q[] = 30").unwrap();
    assert_eq!(num(&mut r, "arrsize('q')"), 3);
    assert_eq!(num(&mut r, "q[2]"), 30);
}

#[test]
fn test_text_keys() {
    let mut r = scratch();
    r.exec_code("price['sword'] = 120 & price['shield'] = 80").unwrap();
    assert_eq!(num(&mut r, "price['sword']"), 120);
    assert_eq!(num(&mut r, "price['shield']"), 80);
    // an unseen key reads as a default without creating an element
    assert_eq!(num(&mut r, "price['axe']"), 0);
    assert_eq!(num(&mut r, "arrsize('price')"), 2);
}

#[test]
fn test_arrpos_and_arrcomp() {
    let mut r = scratch();
    r.exec_code("$pets[0] = 'cat' & $pets[1] = 'dog' & $pets[2] = 'rat'").unwrap();
    assert_eq!(num(&mut r, "arrpos('$pets', 'dog')"), 1);
    assert_eq!(num(&mut r, "arrpos('$pets', 'fox')"), -1);
    assert_eq!(num(&mut r, r"arrcomp('$pets', '.a.')"), 0);
    assert_eq!(num(&mut r, r"arrcomp('$pets', 'd.g')"), 1);
}

#[test]
fn test_killvar_forms() {
    let mut r = scratch();
    r.exec_code("a[0] = 1 & a[1] = 2 & a[2] = 3 & b = 9").unwrap();
    r.exec_code("killvar 'a', 1").unwrap();
    assert_eq!(num(&mut r, "arrsize('a')"), 2);
    assert_eq!(num(&mut r, "a[1]"), 3);
    r.exec_code("killvar 'a'").unwrap();
    assert_eq!(num(&mut r, "arrsize('a')"), 0);
    assert_eq!(r.var_num("b", 0), 9);
    r.exec_code("killvar").unwrap();
    assert_eq!(r.var_num("b", 0), 0);
}

#[test]
fn test_key_removal_keeps_later_keys() {
    let mut r = scratch();
    r.exec_code("m['x'] = 1 & m['y'] = 2 & m['z'] = 3").unwrap();
    r.exec_code("killvar 'm', 1").unwrap();
    assert_eq!(num(&mut r, "m['x']"), 1);
    assert_eq!(num(&mut r, "m['z']"), 3);
}

#[test]
fn test_compound_assignment() {
    let mut r = scratch();
    r.exec_code("n = 10 & n += 5 & n -= 3 & n *= 2 & n /= 4").unwrap();
    assert_eq!(r.var_num("n", 0), 6);
    r.exec_code("$s = 'ab' & $s += 'cd'").unwrap();
    assert_eq!(r.var_text("s", 0), "abcd");
}
