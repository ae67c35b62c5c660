use super::compile::compile;
use super::operation::Operation;
use super::runtime::Runtime;
use super::stack::Stack;
use super::{ArgType, Function, Opcode, Val};
use crate::error;
use crate::lang::Error;
use rand::Rng;
use std::cmp::Ordering;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Expression evaluation
///
/// A single pass over the opcode stream with an explicit value stack.
/// Function opcodes that can re-enter the interpreter (FUNC, DYNEVAL, the
/// host dialogs) re-check the generation stamp afterwards and unwind
/// quietly with a zero value when it moved.
impl Runtime {
    pub(crate) fn eval_expr(&mut self, source: &str) -> Result<Val> {
        let ops = compile(source)?;
        self.eval_ops(&ops)
    }

    /// Evaluates an expression to the truth rule: nonzero number, nonempty
    /// text.
    pub(crate) fn eval_truth(&mut self, source: &str) -> Result<bool> {
        Ok(self.eval_expr(source)?.truth())
    }

    pub(crate) fn eval_ops(&mut self, ops: &[Opcode]) -> Result<Val> {
        use Opcode::*;
        let gen = self.gen;
        let mut stack: Stack<Val> = Stack::new("EXPRESSION");
        for op in ops {
            match op {
                Literal(v) => stack.push(v.clone())?,
                PushVar(name, text) => {
                    let v = self.vars.fetch(name, 0, *text)?;
                    stack.push(v)?;
                }
                PushVarIndexed(name, text) => {
                    let index = stack.pop()?;
                    let at = self.vars.index_of(name, &index, false)?;
                    let v = self.vars.fetch(name, at, *text)?;
                    stack.push(v)?;
                }
                MakeTuple(n) => {
                    let items = stack.pop_n(*n)?;
                    stack.push(Val::Tuple(items))?;
                }
                Coerce(n, types) => {
                    for (at, v) in stack.last_n_mut(*n)?.iter_mut().enumerate() {
                        match Function::arg_type(types, at) {
                            ArgType::Num => *v = Val::Num(v.as_num()?),
                            ArgType::Text => *v = Val::Text(v.as_text()?),
                            ArgType::Any => {}
                        }
                    }
                }

                Neg => {
                    let v = stack.pop()?;
                    stack.push(Operation::negate(v)?)?;
                }
                Not => {
                    let v = stack.pop()?;
                    stack.push(Operation::not(v)?)?;
                }
                Mul | Div | Mod | Add | Sub | Concat | Eq | NotEq | Lt | LtEq | Gt | GtEq
                | And | Or => {
                    let (a, b) = stack.pop_2()?;
                    stack.push(Runtime::binary(op, a, b)?)?;
                }

                Len => {
                    let s = stack.pop()?.as_text()?;
                    stack.push(Val::Num(s.chars().count() as i64))?;
                }
                Mid(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(self.fn_mid(args)?)?;
                }
                Instr(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(self.fn_instr(args)?)?;
                }
                Str => {
                    let n = stack.pop()?.as_num()?;
                    stack.push(Val::Text(n.to_string().into()))?;
                }
                ToNum => {
                    let s = stack.pop()?.as_text()?;
                    let n = Val::Text(s).as_num().unwrap_or(0);
                    stack.push(Val::Num(n))?;
                }
                Iif => {
                    let otherwise = stack.pop()?;
                    let then = stack.pop()?;
                    let cond = stack.pop()?;
                    stack.push(if cond.truth() { then } else { otherwise })?;
                }
                Min(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(Runtime::fold_extreme(args, Ordering::Less)?)?;
                }
                Max(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(Runtime::fold_extreme(args, Ordering::Greater)?)?;
                }
                Rand(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(self.fn_rand(args)?)?;
                }
                Rnd => {
                    let n = self.rng.gen_range(1..=1000);
                    stack.push(Val::Num(n))?;
                }
                StrComp => {
                    let (s, pattern) = Runtime::two_texts(&mut stack)?;
                    let hit = self.regexps.is_full_match(&s, &pattern)?;
                    stack.push(Val::from_bool(hit))?;
                }
                StrFind(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(self.fn_strfind(args)?)?;
                }
                StrPos(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(self.fn_strpos(args)?)?;
                }
                ArrPos(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(self.fn_arrpos(args)?)?;
                }
                ArrComp(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(self.fn_arrcomp(args)?)?;
                }
                ArrSize => {
                    let name = stack.pop()?.as_text()?;
                    let size = self
                        .vars
                        .find(strip_dollar(&name))
                        .map_or(0, |var| var.values.len());
                    stack.push(Val::Num(size as i64))?;
                }
                Func(n) => {
                    let mut args = stack.pop_n(*n)?;
                    let name = args.remove(0).as_text()?;
                    let out = self.call_location(&name, &args)?;
                    if self.gen != gen {
                        return Ok(Val::Num(0));
                    }
                    stack.push(out)?;
                }
                DynEval(n) => {
                    let mut args = stack.pop_n(*n)?;
                    let code = args.remove(0).as_text()?;
                    let out = self.dyn_eval(&code, &args)?;
                    if self.gen != gen {
                        return Ok(Val::Num(0));
                    }
                    stack.push(out)?;
                }
                UCase => {
                    let s = stack.pop()?.as_text()?;
                    stack.push(Val::text(&s.to_uppercase()))?;
                }
                LCase => {
                    let s = stack.pop()?.as_text()?;
                    stack.push(Val::text(&s.to_lowercase()))?;
                }
                Trim => {
                    let s = stack.pop()?.as_text()?;
                    stack.push(Val::text(s.trim()))?;
                }
                Replace(n) => {
                    let args = stack.pop_n(*n)?;
                    stack.push(Runtime::fn_replace(args)?)?;
                }
                IsNum => {
                    let v = stack.pop()?;
                    stack.push(Val::from_bool(v.is_num_convertible()))?;
                }
                IsPlay => {
                    let file = stack.pop()?.as_text()?;
                    let playing = self.host_call(|host| host.is_playing(&file));
                    if self.gen != gen {
                        return Ok(Val::Num(0));
                    }
                    stack.push(Val::from_bool(playing))?;
                }
                Rgb => {
                    let args = stack.pop_n(3)?;
                    let mut parts = [0i64; 3];
                    for (slot, v) in parts.iter_mut().zip(args) {
                        *slot = v.as_num()?.max(0).min(255);
                    }
                    let color = (0xff << 24) | (parts[0] << 16) | (parts[1] << 8) | parts[2];
                    stack.push(Val::Num(color))?;
                }
                MsecsCount => {
                    let ms = self.msecs_count();
                    stack.push(Val::Num(ms))?;
                }
                Input => {
                    let prompt = stack.pop()?.as_text()?;
                    let reply = self.host_call(|host| host.input_box(&prompt));
                    if self.gen != gen {
                        return Ok(Val::Num(0));
                    }
                    stack.push(Val::text(&reply))?;
                }
                CurLoc => {
                    let name = self.cur_loc_name().unwrap_or("").to_string();
                    stack.push(Val::text(&name))?;
                }
                Desc => {
                    let name = stack.pop()?.as_text()?;
                    let at = match self.world.find(&name) {
                        Some(at) => at,
                        None => return Err(error!(LocationNotFound)),
                    };
                    let template = match self.world.get(at) {
                        Some(loc) => loc.desc.clone(),
                        None => String::new(),
                    };
                    let out = self.format_text(&template)?;
                    if self.gen != gen {
                        return Ok(Val::Num(0));
                    }
                    stack.push(Val::text(&out))?;
                }
                GetObj => {
                    let n = stack.pop()?.as_num()?;
                    let name = if n >= 1 {
                        self.objects
                            .get(n as usize - 1)
                            .map(|o| o.name.clone())
                            .unwrap_or_default()
                    } else {
                        String::new()
                    };
                    stack.push(Val::text(&name))?;
                }
                CountObj => stack.push(Val::Num(self.objects.len() as i64))?,
                SelAct => {
                    let name = self
                        .selected_action
                        .and_then(|at| self.actions.get(at))
                        .map(|a| a.name.clone())
                        .unwrap_or_default();
                    stack.push(Val::text(&name))?;
                }
                SelObj => {
                    let name = self
                        .selected_object
                        .and_then(|at| self.objects.get(at))
                        .map(|o| o.name.clone())
                        .unwrap_or_default();
                    stack.push(Val::text(&name))?;
                }
                UserText => {
                    let text = self.input_text.clone();
                    stack.push(Val::text(&text))?;
                }
            }
        }
        let out = stack.pop()?;
        if !stack.is_empty() {
            return Err(error!(Syntax; "UNBALANCED EXPRESSION"));
        }
        Ok(out.flatten())
    }

    fn binary(op: &Opcode, a: Val, b: Val) -> Result<Val> {
        use Opcode::*;
        match op {
            Mul => Operation::multiply(a, b),
            Div => Operation::divide(a, b),
            Mod => Operation::modulo(a, b),
            Add => Operation::sum(a, b),
            Sub => Operation::subtract(a, b),
            Concat => Operation::concat(a, b),
            Eq => Operation::equal(a, b),
            NotEq => Operation::not_equal(a, b),
            Lt => Operation::less(a, b),
            LtEq => Operation::less_equal(a, b),
            Gt => Operation::greater(a, b),
            GtEq => Operation::greater_equal(a, b),
            And => Operation::and(a, b),
            Or => Operation::or(a, b),
            _ => Err(error!(Syntax; "NOT A BINARY OPERATOR")),
        }
    }

    fn two_texts(stack: &mut Stack<Val>) -> Result<(Rc<str>, Rc<str>)> {
        let (a, b) = stack.pop_2()?;
        Ok((a.as_text()?, b.as_text()?))
    }

    fn fold_extreme(args: Vec<Val>, keep: Ordering) -> Result<Val> {
        let mut iter = args.into_iter();
        let mut best = match iter.next() {
            Some(v) => v,
            None => return Err(error!(ArgsCount)),
        };
        for v in iter {
            if Operation::compare(&v, &best)? == keep {
                best = v;
            }
        }
        Ok(best)
    }

    fn fn_mid(&mut self, args: Vec<Val>) -> Result<Val> {
        let mut iter = args.into_iter();
        let s = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let start = iter.next().unwrap_or(Val::Num(1)).as_num()?;
        let len = match iter.next() {
            Some(v) => Some(v.as_num()?),
            None => None,
        };
        if start < 1 || len.map_or(false, |l| l < 1) {
            return Ok(Val::text(""));
        }
        let skipped = s.chars().skip(start as usize - 1);
        let out: String = match len {
            Some(l) => skipped.take(l as usize).collect(),
            None => skipped.collect(),
        };
        Ok(Val::text(&out))
    }

    fn fn_instr(&mut self, args: Vec<Val>) -> Result<Val> {
        let mut iter = args.into_iter();
        let s = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let sub = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let start = match iter.next() {
            Some(v) => v.as_num()?.max(1) as usize,
            None => 1,
        };
        let from_byte = match s.char_indices().nth(start - 1) {
            Some((byte, _)) => byte,
            None => return Ok(Val::Num(0)),
        };
        Ok(match s[from_byte..].find(sub.as_ref()) {
            Some(at) => {
                let chars = s[..from_byte + at].chars().count() as i64;
                Val::Num(chars + 1)
            }
            None => Val::Num(0),
        })
    }

    fn fn_rand(&mut self, args: Vec<Val>) -> Result<Val> {
        let mut iter = args.into_iter();
        let a = iter.next().unwrap_or(Val::Num(1)).as_num()?;
        let b = match iter.next() {
            Some(v) => v.as_num()?,
            None => 1,
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Ok(Val::Num(self.rng.gen_range(lo..=hi)))
    }

    fn fn_strfind(&mut self, args: Vec<Val>) -> Result<Val> {
        let (s, pattern, group) = Runtime::text_text_num(args, 0)?;
        let out = self.regexps.find_group(&s, &pattern, group as usize)?;
        Ok(Val::text(&out))
    }

    fn fn_strpos(&mut self, args: Vec<Val>) -> Result<Val> {
        let (s, pattern, group) = Runtime::text_text_num(args, 0)?;
        let at = self.regexps.find_pos(&s, &pattern, group as usize)?;
        Ok(Val::Num(at))
    }

    fn text_text_num(args: Vec<Val>, default: i64) -> Result<(Rc<str>, Rc<str>, i64)> {
        let mut iter = args.into_iter();
        let a = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let b = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let n = match iter.next() {
            Some(v) => v.as_num()?,
            None => default,
        };
        Ok((a, b, n.max(0)))
    }

    fn fn_arrpos(&mut self, args: Vec<Val>) -> Result<Val> {
        let mut iter = args.into_iter();
        let name = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let wanted = iter.next().unwrap_or(Val::Num(0));
        let start = match iter.next() {
            Some(v) => v.as_num()?.max(0) as usize,
            None => 0,
        };
        let text_part = matches!(wanted, Val::Text(_)) || name.starts_with('$');
        let name = strip_dollar(&name);
        let len = self.vars.find(name).map_or(0, |var| var.values.len());
        for at in start..len {
            let have = self.vars.fetch(name, at, text_part)?;
            if Operation::equal(have, wanted.clone())?.truth() {
                return Ok(Val::Num(at as i64));
            }
        }
        Ok(Val::Num(-1))
    }

    fn fn_arrcomp(&mut self, args: Vec<Val>) -> Result<Val> {
        let (name, pattern, start) = Runtime::text_text_num(args, 0)?;
        let name = strip_dollar(&name);
        let len = self.vars.find(name).map_or(0, |var| var.values.len());
        for at in start as usize..len {
            let have = self.vars.fetch(name, at, true)?.as_text()?;
            if self.regexps.is_full_match(&have, &pattern)? {
                return Ok(Val::Num(at as i64));
            }
        }
        Ok(Val::Num(-1))
    }

    fn fn_replace(args: Vec<Val>) -> Result<Val> {
        let mut iter = args.into_iter();
        let s = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let what = iter.next().unwrap_or(Val::Num(0)).as_text()?;
        let with = match iter.next() {
            Some(v) => v.as_text()?,
            None => "".into(),
        };
        if what.is_empty() {
            return Ok(Val::Text(s));
        }
        Ok(Val::text(&s.replace(what.as_ref(), &with)))
    }

    /// DYNEVAL: compiles and evaluates a text as an expression, with its own
    /// ARGS window.
    fn dyn_eval(&mut self, code: &str, args: &[Val]) -> Result<Val> {
        let saved = self.vars.take("ARGS");
        let mut set = Ok(());
        for (n, arg) in args.iter().enumerate() {
            let text_part = matches!(arg, Val::Text(_));
            set = self.vars.store("ARGS", n, text_part, arg.clone());
            if set.is_err() {
                break;
            }
        }
        let result = match set {
            Ok(()) => self.eval_expr(code),
            Err(e) => Err(e),
        };
        self.vars.remove("ARGS").ok();
        if let Some(var) = saved {
            self.vars.put(var);
        }
        result
    }
}

fn strip_dollar(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    fn eval(rt: &mut Runtime, src: &str) -> Val {
        rt.eval_expr(src).unwrap()
    }

    #[test]
    fn test_arithmetic_and_coercion() {
        let mut rt = Runtime::new();
        assert_eq!(eval(&mut rt, "1 + 2 * 3"), Val::Num(7));
        assert_eq!(eval(&mut rt, "'3' + 4"), Val::Num(7));
        assert_eq!(eval(&mut rt, "'a' + 4"), Val::text("a4"));
        assert_eq!(eval(&mut rt, "'ab' + 'cd'"), Val::text("abcd"));
        assert_eq!(eval(&mut rt, "7 mod 3 = 1"), Val::Num(-1));
    }

    #[test]
    fn test_division_by_zero() {
        let mut rt = Runtime::new();
        let e = rt.eval_expr("1/0").unwrap_err();
        assert!(e.is(ErrorCode::DivisionByZero));
    }

    #[test]
    fn test_string_functions() {
        let mut rt = Runtime::new();
        assert_eq!(eval(&mut rt, "len('hello')"), Val::Num(5));
        assert_eq!(eval(&mut rt, "mid('hello', 2, 3)"), Val::text("ell"));
        assert_eq!(eval(&mut rt, "mid('hello', 9)"), Val::text(""));
        assert_eq!(eval(&mut rt, "instr('hello', 'll')"), Val::Num(3));
        assert_eq!(eval(&mut rt, "instr('hello', 'zz')"), Val::Num(0));
        assert_eq!(eval(&mut rt, "ucase('abc')"), Val::text("ABC"));
        assert_eq!(eval(&mut rt, "trim('  x ')"), Val::text("x"));
        assert_eq!(
            eval(&mut rt, "replace('a-b-c', '-', '+')"),
            Val::text("a+b+c")
        );
        assert_eq!(eval(&mut rt, "str(42)"), Val::text("42"));
        assert_eq!(eval(&mut rt, "val('17 ')"), Val::Num(17));
        assert_eq!(eval(&mut rt, "val('abc')"), Val::Num(0));
        assert_eq!(eval(&mut rt, "isnum(' 12 ')"), Val::Num(-1));
        assert_eq!(eval(&mut rt, "isnum('12a')"), Val::Num(0));
    }

    #[test]
    fn test_forced_arg_coercion() {
        let mut rt = Runtime::new();
        assert_eq!(eval(&mut rt, "len(1000)"), Val::Num(4));
        assert_eq!(eval(&mut rt, "ucase(12)"), Val::text("12"));
        let e = rt.eval_expr("mid('abc', 'x')").unwrap_err();
        assert!(e.is(ErrorCode::TypeMismatch));
    }

    #[test]
    fn test_iif_min_max() {
        let mut rt = Runtime::new();
        assert_eq!(eval(&mut rt, "iif(2 > 1, 'y', 'n')"), Val::text("y"));
        assert_eq!(eval(&mut rt, "min(3, 1, 2)"), Val::Num(1));
        assert_eq!(eval(&mut rt, "max('a', 'c', 'b')"), Val::text("c"));
    }

    #[test]
    fn test_rand_bounds() {
        let mut rt = Runtime::new();
        for _ in 0..50 {
            let v = rt.eval_expr("rand(3, 5)").unwrap().as_num().unwrap();
            assert!((3..=5).contains(&v));
            let v = rt.eval_expr("rnd()").unwrap().as_num().unwrap();
            assert!((1..=1000).contains(&v));
        }
    }

    #[test]
    fn test_regex_functions() {
        let mut rt = Runtime::new();
        assert_eq!(eval(&mut rt, r"strcomp('take lamp', 'take \w+')"), Val::Num(-1));
        assert_eq!(
            eval(&mut rt, r"strfind('take lamp', 'take (\w+)', 1)"),
            Val::text("lamp")
        );
        assert_eq!(eval(&mut rt, r"strpos('take lamp', 'lamp')"), Val::Num(6));
    }

    #[test]
    fn test_array_functions() {
        let mut rt = Runtime::new();
        rt.exec_code("m[0] = 5 & m[1] = 7 & $s[0] = 'dog' & $s[1] = 'cat'")
            .unwrap();
        assert_eq!(eval(&mut rt, "arrsize('m')"), Val::Num(2));
        assert_eq!(eval(&mut rt, "arrpos('m', 7)"), Val::Num(1));
        assert_eq!(eval(&mut rt, "arrpos('m', 9)"), Val::Num(-1));
        assert_eq!(eval(&mut rt, "arrpos('$s', 'dog')"), Val::Num(0));
        assert_eq!(eval(&mut rt, "arrcomp('$s', 'c.t')"), Val::Num(1));
    }

    #[test]
    fn test_rgb() {
        let mut rt = Runtime::new();
        assert_eq!(
            eval(&mut rt, "rgb(255, 128, 0)"),
            Val::Num(0xffff8000u32 as i64)
        );
        assert_eq!(eval(&mut rt, "rgb(999, -5, 0)"), Val::Num(0xffff0000u32 as i64));
    }

    #[test]
    fn test_indexed_reads() {
        let mut rt = Runtime::new();
        rt.exec_code("x[3] = 9 & x['key'] = 4").unwrap();
        assert_eq!(eval(&mut rt, "x[3]"), Val::Num(9));
        assert_eq!(eval(&mut rt, "x['key']"), Val::Num(4));
        assert_eq!(eval(&mut rt, "x[100]"), Val::Num(0));
    }

    #[test]
    fn test_tuple_compare_and_flatten() {
        let mut rt = Runtime::new();
        assert_eq!(eval(&mut rt, "[1, 2] = [1, 2]"), Val::Num(-1));
        assert_eq!(eval(&mut rt, "[5]"), Val::Num(5));
    }
}
