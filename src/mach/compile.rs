use super::{Function, Opcode, Val};
use crate::error;
use crate::lang::{text, Error};
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// Compiles one expression into a flat opcode stream.
///
/// This is a modified shunting-yard pass: operands are emitted directly,
/// operators wait on a pending stack ordered by precedence, and every open
/// call/bracket pushes a marker carrying an argument counter that commas
/// increment and the closing bracket validates against the function table.
pub fn compile(source: &str) -> Result<Vec<Opcode>> {
    Compiler::new(source).run()
}

// Unary minus binds tighter than every binary operator; NOT sits between
// AND and the comparisons.
const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_CMP: u8 = 4;
const PREC_CONCAT: u8 = 5;
const PREC_ADD: u8 = 6;
const PREC_MOD: u8 = 7;
const PREC_MUL: u8 = 8;
const PREC_NEG: u8 = 9;

enum Pending {
    Bin(Opcode, u8),
    Unary(Opcode, u8),
    Paren,
    Call { name: String, args: usize },
    Index { name: Rc<str>, text: bool },
    Tuple { args: usize },
}

struct Compiler<'a> {
    src: &'a str,
    pos: usize,
    out: Vec<Opcode>,
    pending: Vec<Pending>,
}

impl<'a> Compiler<'a> {
    fn new(src: &'a str) -> Compiler<'a> {
        Compiler {
            src,
            pos: 0,
            out: vec![],
            pending: vec![],
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn run(mut self) -> Result<Vec<Opcode>> {
        let mut expect_operand = true;
        loop {
            self.skip_spaces();
            let c = match self.peek() {
                Some(c) => c,
                None => break,
            };
            if expect_operand {
                expect_operand = self.operand(c)?;
            } else {
                expect_operand = self.operator(c)?;
            }
        }
        if expect_operand {
            return Err(error!(Syntax; "EXPECTED OPERAND"));
        }
        self.finish()
    }

    /// One operand-position token. Returns whether an operand is still
    /// expected (true after a prefix operator or an opening bracket).
    fn operand(&mut self, c: char) -> Result<bool> {
        match c {
            '-' => {
                self.bump();
                self.pending.push(Pending::Unary(Opcode::Neg, PREC_NEG));
                Ok(true)
            }
            '+' => {
                // unary plus is a no-op
                self.bump();
                Ok(true)
            }
            '(' => {
                self.bump();
                self.pending.push(Pending::Paren);
                Ok(true)
            }
            '[' => {
                self.bump();
                self.skip_spaces();
                if self.peek() == Some(']') {
                    self.bump();
                    self.out.push(Opcode::MakeTuple(0));
                    return Ok(false);
                }
                self.pending.push(Pending::Tuple { args: 0 });
                Ok(true)
            }
            '{' => {
                let lit = self.code_literal()?;
                self.out.push(Opcode::Literal(Val::Text(lit.into())));
                Ok(false)
            }
            _ if text::is_quote(c) => {
                let lit = self.text_literal()?;
                self.out.push(Opcode::Literal(Val::Text(lit.into())));
                Ok(false)
            }
            _ if c.is_ascii_digit() => {
                let n = self.number_literal()?;
                self.out.push(Opcode::Literal(Val::Num(n)));
                Ok(false)
            }
            '$' => self.identifier(),
            _ if !text::is_delim(c) => self.identifier(),
            _ => Err(error!(Syntax; "EXPECTED OPERAND")),
        }
    }

    /// One operator-position token. Returns whether an operand is expected
    /// next (false after a closing bracket).
    fn operator(&mut self, c: char) -> Result<bool> {
        match c {
            ')' => {
                self.bump();
                self.close_paren()?;
                return Ok(false);
            }
            ']' => {
                self.bump();
                self.close_bracket()?;
                return Ok(false);
            }
            ',' => {
                self.bump();
                self.comma()?;
                return Ok(true);
            }
            _ => {}
        }
        let op = match c {
            '&' => {
                self.bump();
                (Opcode::Concat, PREC_CONCAT)
            }
            '+' => {
                self.bump();
                (Opcode::Add, PREC_ADD)
            }
            '-' => {
                self.bump();
                (Opcode::Sub, PREC_ADD)
            }
            '*' => {
                self.bump();
                (Opcode::Mul, PREC_MUL)
            }
            '/' => {
                self.bump();
                (Opcode::Div, PREC_MUL)
            }
            '!' => {
                self.bump();
                (Opcode::NotEq, PREC_CMP)
            }
            '=' => {
                self.bump();
                match self.peek() {
                    Some('<') => {
                        self.bump();
                        (Opcode::LtEq, PREC_CMP)
                    }
                    Some('>') => {
                        self.bump();
                        (Opcode::GtEq, PREC_CMP)
                    }
                    _ => (Opcode::Eq, PREC_CMP),
                }
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        (Opcode::LtEq, PREC_CMP)
                    }
                    Some('>') => {
                        self.bump();
                        (Opcode::NotEq, PREC_CMP)
                    }
                    _ => (Opcode::Lt, PREC_CMP),
                }
            }
            '>' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        (Opcode::GtEq, PREC_CMP)
                    }
                    _ => (Opcode::Gt, PREC_CMP),
                }
            }
            _ if !text::is_delim(c) => {
                let word = text::fold(self.ident_chars());
                match word.as_str() {
                    "MOD" => (Opcode::Mod, PREC_MOD),
                    "AND" => (Opcode::And, PREC_AND),
                    "OR" => (Opcode::Or, PREC_OR),
                    _ => return Err(error!(Syntax; "EXPECTED OPERATOR")),
                }
            }
            _ => return Err(error!(Syntax; "EXPECTED OPERATOR")),
        };
        self.push_binary(op.0, op.1);
        Ok(true)
    }

    fn identifier(&mut self) -> Result<bool> {
        let text_part = self.peek() == Some('$');
        if text_part {
            self.bump();
        }
        let raw = self.ident_chars();
        if raw.is_empty() {
            return Err(error!(Syntax; "EXPECTED IDENTIFIER"));
        }
        let name = text::fold(raw);
        match name.as_str() {
            "NOT" => {
                self.pending.push(Pending::Unary(Opcode::Not, PREC_NOT));
                return Ok(true);
            }
            "MOD" | "AND" | "OR" => return Err(error!(Syntax; "EXPECTED OPERAND")),
            _ => {}
        }
        if Function::opcode_and_arity(&name, 0).is_some() {
            self.skip_spaces();
            if self.peek() == Some('(') {
                self.bump();
                self.skip_spaces();
                if self.peek() == Some(')') {
                    self.bump();
                    self.emit_call(&name, 0)?;
                    return Ok(false);
                }
                self.pending.push(Pending::Call { name, args: 0 });
                return Ok(true);
            }
            // a known function used without parentheses takes no arguments
            self.emit_call(&name, 0)?;
            return Ok(false);
        }
        self.skip_spaces();
        if self.peek() == Some('[') {
            self.bump();
            self.pending.push(Pending::Index {
                name: name.into(),
                text: text_part,
            });
            return Ok(true);
        }
        self.out.push(Opcode::PushVar(name.into(), text_part));
        Ok(false)
    }

    fn ident_chars(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if text::is_delim(c) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn number_literal(&mut self) -> Result<i64> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.pos]
            .parse::<i64>()
            .map_err(|_| error!(Syntax; "NUMBER TOO LARGE"))
    }

    fn text_literal(&mut self) -> Result<String> {
        let quote = match self.bump() {
            Some(q) => q,
            None => return Err(error!(QuoteNotFound)),
        };
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(error!(QuoteNotFound)),
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        s.push(quote);
                        continue;
                    }
                    return Ok(s);
                }
                Some(c) => s.push(c),
            }
        }
    }

    /// `{ ... }` quotes a code block as text, nesting included.
    fn code_literal(&mut self) -> Result<String> {
        self.bump(); // {
        let mut depth = 1usize;
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(error!(BracketNotFound)),
                Some('{') => {
                    depth += 1;
                    s.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(s);
                    }
                    s.push('}');
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn push_binary(&mut self, op: Opcode, prec: u8) {
        loop {
            let ready = matches!(
                self.pending.last(),
                Some(Pending::Bin(_, p)) | Some(Pending::Unary(_, p)) if *p >= prec
            );
            if !ready {
                break;
            }
            if let Some(Pending::Bin(op, _)) | Some(Pending::Unary(op, _)) = self.pending.pop() {
                self.out.push(op);
            }
        }
        self.pending.push(Pending::Bin(op, prec));
    }

    fn pop_until_marker(&mut self) {
        loop {
            match self.pending.last() {
                Some(Pending::Bin(..)) | Some(Pending::Unary(..)) => {
                    if let Some(Pending::Bin(op, _)) | Some(Pending::Unary(op, _)) =
                        self.pending.pop()
                    {
                        self.out.push(op);
                    }
                }
                _ => break,
            }
        }
    }

    fn comma(&mut self) -> Result<()> {
        self.pop_until_marker();
        match self.pending.last_mut() {
            Some(Pending::Call { args, .. }) | Some(Pending::Tuple { args }) => {
                *args += 1;
                Ok(())
            }
            _ => Err(error!(Syntax; "UNEXPECTED COMMA")),
        }
    }

    fn close_paren(&mut self) -> Result<()> {
        self.pop_until_marker();
        match self.pending.pop() {
            Some(Pending::Paren) => Ok(()),
            Some(Pending::Call { name, args }) => self.emit_call(&name, args + 1),
            _ => Err(error!(BracketsNotFound)),
        }
    }

    fn close_bracket(&mut self) -> Result<()> {
        self.pop_until_marker();
        match self.pending.pop() {
            Some(Pending::Tuple { args }) => {
                self.out.push(Opcode::MakeTuple(args + 1));
                Ok(())
            }
            Some(Pending::Index { name, text }) => {
                self.out.push(Opcode::PushVarIndexed(name, text));
                Ok(())
            }
            _ => Err(error!(BracketNotFound)),
        }
    }

    fn emit_call(&mut self, name: &str, args: usize) -> Result<()> {
        match Function::opcode_and_arity(name, args) {
            Some((op, arity, types)) => {
                if !arity.contains(&args) {
                    return Err(error!(ArgsCount));
                }
                if args > 0 && types.iter().any(|t| *t != super::ArgType::Any) {
                    self.out.push(Opcode::Coerce(args, types));
                }
                self.out.push(op);
                Ok(())
            }
            None => Err(error!(Syntax; "UNKNOWN FUNCTION")),
        }
    }

    fn finish(mut self) -> Result<Vec<Opcode>> {
        while let Some(p) = self.pending.pop() {
            match p {
                Pending::Bin(op, _) | Pending::Unary(op, _) => self.out.push(op),
                Pending::Paren | Pending::Call { .. } => return Err(error!(BracketsNotFound)),
                Pending::Index { .. } | Pending::Tuple { .. } => {
                    return Err(error!(BracketNotFound))
                }
            }
        }
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    fn ops(src: &str) -> Vec<String> {
        compile(src)
            .unwrap()
            .iter()
            .map(|op| op.to_string())
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            ops("1+2*3"),
            vec!["Num(1)", "Num(2)", "Num(3)", "MUL", "ADD"]
        );
        assert_eq!(
            ops("(1+2)*3"),
            vec!["Num(1)", "Num(2)", "ADD", "Num(3)", "MUL"]
        );
    }

    #[test]
    fn test_unary_minus_binds_tighter() {
        assert_eq!(ops("-1+2"), vec!["Num(1)", "NEG", "Num(2)", "ADD"]);
        assert_eq!(ops("2*-3"), vec!["Num(2)", "Num(3)", "NEG", "MUL"]);
    }

    #[test]
    fn test_function_args() {
        assert_eq!(
            ops("mid('abc', 2)"),
            vec!["Text(\"abc\")", "Num(2)", "COERCE(2)", "MID(2)"]
        );
        assert_eq!(ops("rnd"), vec!["RND"]);
        let e = compile("mid('abc')").unwrap_err();
        assert!(e.is(ErrorCode::ArgsCount));
    }

    #[test]
    fn test_forced_arg_types() {
        // declared types force a coercion pass; all-ANY argument lists skip it
        assert_eq!(ops("len(123)"), vec!["Num(123)", "COERCE(1)", "LEN"]);
        assert_eq!(ops("min(1, 2)"), vec!["Num(1)", "Num(2)", "MIN(2)"]);
    }

    #[test]
    fn test_indexing_and_dollar() {
        assert_eq!(ops("$arr['key']"), vec!["Text(\"key\")", "PUSHIDX($ARR)"]);
        assert_eq!(ops("x"), vec!["PUSH(X)"]);
    }

    #[test]
    fn test_quote_doubling() {
        assert_eq!(ops("'it''s'"), vec!["Text(\"it's\")"]);
    }

    #[test]
    fn test_error_kinds() {
        assert!(compile("(1+2").unwrap_err().is(ErrorCode::BracketsNotFound));
        assert!(compile("a[1").unwrap_err().is(ErrorCode::BracketNotFound));
        assert!(compile("'open").unwrap_err().is(ErrorCode::QuoteNotFound));
        assert!(compile("1+").unwrap_err().is(ErrorCode::Syntax));
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(
            ops("1 and 2 or not 3"),
            vec!["Num(1)", "Num(2)", "AND", "Num(3)", "NOT", "OR"]
        );
        assert_eq!(ops("7 mod 3"), vec!["Num(7)", "Num(3)", "MOD"]);
    }

    #[test]
    fn test_tuple_literal() {
        assert_eq!(ops("[1, 2]"), vec!["Num(1)", "Num(2)", "TUPLE(2)"]);
        assert_eq!(ops("[]"), vec!["TUPLE(0)"]);
    }
}
