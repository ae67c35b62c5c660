use super::{ArgType, Val};
use std::rc::Rc;

/// ## Compiled expression stream
///
/// An expression compiles to a flat array of opcodes evaluated on an
/// explicit value stack, for example `X + 1` becomes
/// `[PushVar(X), Literal(1), Add]`.
///
/// Variable reads carry a `text` flag: a `$` prefix on the identifier selects
/// the textual part of the element. Variadic opcodes carry the argument
/// count the compiler validated against the function table.

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // *** Stack manipulation
    Literal(Val),
    /// Push element 0 of a named variable.
    PushVar(Rc<str>, bool),
    /// Pop an index value, push that element of a named variable.
    PushVarIndexed(Rc<str>, bool),
    /// Gather the top n values into a tuple.
    MakeTuple(usize),
    /// Force the declared argument types onto the top n values before a
    /// function opcode runs.
    Coerce(usize, &'static [ArgType]),

    // *** Operators
    Neg,
    Not,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,

    // *** Functions
    Len,
    Mid(usize),
    Instr(usize),
    Str,
    ToNum,
    Iif,
    Min(usize),
    Max(usize),
    Rand(usize),
    Rnd,
    StrComp,
    StrFind(usize),
    StrPos(usize),
    ArrPos(usize),
    ArrComp(usize),
    ArrSize,
    Func(usize),
    DynEval(usize),
    UCase,
    LCase,
    Trim,
    Replace(usize),
    IsNum,
    IsPlay,
    Rgb,
    MsecsCount,
    Input,
    CurLoc,
    Desc,
    GetObj,
    CountObj,
    SelAct,
    SelObj,
    UserText,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Opcode::*;
        match self {
            Literal(v) => write!(f, "{:?}", v),
            PushVar(s, text) => write!(f, "PUSH({}{})", if *text { "$" } else { "" }, s),
            PushVarIndexed(s, text) => write!(f, "PUSHIDX({}{})", if *text { "$" } else { "" }, s),
            MakeTuple(n) => write!(f, "TUPLE({})", n),
            Coerce(n, _) => write!(f, "COERCE({})", n),

            Neg => write!(f, "NEG"),
            Not => write!(f, "NOT"),
            Mul => write!(f, "MUL"),
            Div => write!(f, "DIV"),
            Mod => write!(f, "MOD"),
            Add => write!(f, "ADD"),
            Sub => write!(f, "SUB"),
            Concat => write!(f, "CONCAT"),
            Eq => write!(f, "EQ"),
            NotEq => write!(f, "NOTEQ"),
            Lt => write!(f, "LT"),
            LtEq => write!(f, "LTEQ"),
            Gt => write!(f, "GT"),
            GtEq => write!(f, "GTEQ"),
            And => write!(f, "AND"),
            Or => write!(f, "OR"),

            Len => write!(f, "LEN"),
            Mid(n) => write!(f, "MID({})", n),
            Instr(n) => write!(f, "INSTR({})", n),
            Str => write!(f, "STR"),
            ToNum => write!(f, "VAL"),
            Iif => write!(f, "IIF"),
            Min(n) => write!(f, "MIN({})", n),
            Max(n) => write!(f, "MAX({})", n),
            Rand(n) => write!(f, "RAND({})", n),
            Rnd => write!(f, "RND"),
            StrComp => write!(f, "STRCOMP"),
            StrFind(n) => write!(f, "STRFIND({})", n),
            StrPos(n) => write!(f, "STRPOS({})", n),
            ArrPos(n) => write!(f, "ARRPOS({})", n),
            ArrComp(n) => write!(f, "ARRCOMP({})", n),
            ArrSize => write!(f, "ARRSIZE"),
            Func(n) => write!(f, "FUNC({})", n),
            DynEval(n) => write!(f, "DYNEVAL({})", n),
            UCase => write!(f, "UCASE"),
            LCase => write!(f, "LCASE"),
            Trim => write!(f, "TRIM"),
            Replace(n) => write!(f, "REPLACE({})", n),
            IsNum => write!(f, "ISNUM"),
            IsPlay => write!(f, "ISPLAY"),
            Rgb => write!(f, "RGB"),
            MsecsCount => write!(f, "MSECSCOUNT"),
            Input => write!(f, "INPUT"),
            CurLoc => write!(f, "CURLOC"),
            Desc => write!(f, "DESC"),
            GetObj => write!(f, "GETOBJ"),
            CountObj => write!(f, "COUNTOBJ"),
            SelAct => write!(f, "SELACT"),
            SelObj => write!(f, "SELOBJ"),
            UserText => write!(f, "USRTXT"),
        }
    }
}
