use super::Opcode;
use std::ops::RangeInclusive;

/// Forced coercion applied to a function argument before the opcode runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgType {
    Any,
    Num,
    Text,
}

pub struct Function {}

impl Function {
    /// Looks up a built-in by upper-cased name. Returns the opcode for the
    /// given argument count, the declared arity range and the per-argument
    /// forced types (the last entry repeats for trailing arguments).
    pub fn opcode_and_arity(
        func_name: &str,
        args: usize,
    ) -> Option<(Opcode, RangeInclusive<usize>, &'static [ArgType])> {
        use ArgType::*;
        use Opcode::*;
        const ANY: &[ArgType] = &[Any];
        const NUM: &[ArgType] = &[Num];
        const TEXT: &[ArgType] = &[Text];
        const TEXT_NUM: &[ArgType] = &[Text, Num];
        const TEXT_TEXT: &[ArgType] = &[Text, Text];
        const TEXT_TEXT_NUM: &[ArgType] = &[Text, Text, Num];
        const TEXT_ANY: &[ArgType] = &[Text, Any];
        const IIF_ARGS: &[ArgType] = &[Num, Any, Any];
        const NONE: &[ArgType] = &[];
        Some(match func_name {
            "LEN" => (Len, 1..=1, TEXT),
            "MID" => (Mid(args), 2..=3, TEXT_NUM),
            "INSTR" => (Instr(args), 2..=3, TEXT_TEXT_NUM),
            "STR" => (Str, 1..=1, NUM),
            "VAL" => (ToNum, 1..=1, TEXT),
            "IIF" => (Iif, 3..=3, IIF_ARGS),
            "MIN" => (Min(args), 2..=20, ANY),
            "MAX" => (Max(args), 2..=20, ANY),
            "RAND" => (Rand(args), 1..=2, NUM),
            "RND" => (Rnd, 0..=0, NONE),
            "STRCOMP" => (StrComp, 2..=2, TEXT_TEXT),
            "STRFIND" => (StrFind(args), 2..=3, TEXT_TEXT_NUM),
            "STRPOS" => (StrPos(args), 2..=3, TEXT_TEXT_NUM),
            "ARRPOS" => (ArrPos(args), 2..=3, &[Text, Any, Num]),
            "ARRCOMP" => (ArrComp(args), 2..=3, TEXT_TEXT_NUM),
            "ARRSIZE" => (ArrSize, 1..=1, TEXT),
            "FUNC" => (Func(args), 1..=20, TEXT_ANY),
            "DYNEVAL" => (DynEval(args), 1..=20, TEXT_ANY),
            "UCASE" => (UCase, 1..=1, TEXT),
            "LCASE" => (LCase, 1..=1, TEXT),
            "TRIM" => (Trim, 1..=1, TEXT),
            "REPLACE" => (Replace(args), 2..=3, TEXT_TEXT),
            "ISNUM" => (IsNum, 1..=1, TEXT),
            "ISPLAY" => (IsPlay, 1..=1, TEXT),
            "RGB" => (Rgb, 3..=3, NUM),
            "MSECSCOUNT" => (MsecsCount, 0..=0, NONE),
            "INPUT" => (Input, 1..=1, TEXT),
            "CURLOC" => (CurLoc, 0..=0, NONE),
            "DESC" => (Desc, 1..=1, TEXT),
            "GETOBJ" => (GetObj, 1..=1, NUM),
            "COUNTOBJ" => (CountObj, 0..=0, NONE),
            "SELACT" => (SelAct, 0..=0, NONE),
            "SELOBJ" => (SelObj, 0..=0, NONE),
            "USER_TEXT" | "USRTXT" => (UserText, 0..=0, NONE),
            _ => return None,
        })
    }

    /// The forced type for argument `index` under the trailing-repeat rule.
    pub fn arg_type(types: &[ArgType], index: usize) -> ArgType {
        match types.get(index) {
            Some(t) => *t,
            None => *types.last().unwrap_or(&ArgType::Any),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let (op, arity, _) = Function::opcode_and_arity("MID", 2).unwrap();
        assert_eq!(op, Opcode::Mid(2));
        assert!(arity.contains(&3));
        assert!(Function::opcode_and_arity("NOSUCH", 0).is_none());
    }

    #[test]
    fn test_trailing_repeat() {
        let (_, _, types) = Function::opcode_and_arity("MID", 3).unwrap();
        assert_eq!(Function::arg_type(types, 0), ArgType::Text);
        assert_eq!(Function::arg_type(types, 1), ArgType::Num);
        assert_eq!(Function::arg_type(types, 2), ArgType::Num);
    }
}
