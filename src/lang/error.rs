use std::rc::Rc;

/// A script or host-contract error.
///
/// Errors latch into the engine's single error slot with the position of the
/// statement that raised them: the location name, the index of the current
/// action (or none) and the zero-based line within the executing code body.
#[derive(Clone)]
pub struct Error {
    code: u16,
    location: Option<Rc<str>>,
    action: Option<usize>,
    line: Option<usize>,
    message: &'static str,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code: code as u16,
            location: None,
            action: None,
            line: None,
            message: "",
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code as u16
    }

    pub fn location(&self) -> Option<&Rc<str>> {
        self.location.as_ref()
    }

    pub fn action(&self) -> Option<usize> {
        self.action
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn in_location(mut self, location: Rc<str>) -> Error {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub fn in_action(mut self, action: Option<usize>) -> Error {
        if self.action.is_none() {
            self.action = action;
        }
        self
    }

    pub fn in_line(mut self, line: usize) -> Error {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    pub fn message(mut self, message: &'static str) -> Error {
        debug_assert!(self.message.is_empty());
        self.message = message;
        self
    }

    /// The fixed human-readable string for an error code.
    pub fn describe(code: u16) -> &'static str {
        match code {
            100 => "DIVISION BY ZERO",
            101 => "TYPE MISMATCH",
            102 => "STACK OVERFLOW",
            103 => "TOO MANY ITEMS",
            104 => "FILE NOT FOUND",
            105 => "CANNOT LOAD FILE",
            106 => "GAME NOT LOADED",
            107 => "COLON NOT FOUND",
            108 => "CANNOT INCLUDE FILE",
            109 => "CANNOT ADD ACTION",
            110 => "EQUALS NOT FOUND",
            111 => "LOCATION NOT FOUND",
            112 => "END NOT FOUND",
            113 => "LABEL NOT FOUND",
            114 => "INCORRECT NAME",
            115 => "QUOTE NOT FOUND",
            116 => "BRACKET NOT FOUND",
            117 => "BRACKETS NOT FOUND",
            118 => "SYNTAX ERROR",
            119 => "UNKNOWN ACTION",
            120 => "WRONG NUMBER OF ARGUMENTS",
            121 => "CANNOT ADD OBJECT",
            122 => "CANNOT ADD MENU ITEM",
            123 => "TOO MANY VARIABLES",
            124 => "INCORRECT REGULAR EXPRESSION",
            125 => "CODE NOT FOUND",
            126 => "TO NOT FOUND",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    DivisionByZero = 100,
    TypeMismatch = 101,
    StackOverflow = 102,
    TooManyItems = 103,
    FileNotFound = 104,
    CannotLoadFile = 105,
    GameNotLoaded = 106,
    ColonNotFound = 107,
    CannotIncludeFile = 108,
    CannotAddAction = 109,
    EqualsNotFound = 110,
    LocationNotFound = 111,
    EndNotFound = 112,
    LabelNotFound = 113,
    IncorrectName = 114,
    QuoteNotFound = 115,
    BracketNotFound = 116,
    BracketsNotFound = 117,
    Syntax = 118,
    UnknownAction = 119,
    ArgsCount = 120,
    CannotAddObject = 121,
    CannotAddMenuItem = 122,
    TooManyVariables = 123,
    IncorrectRegexp = 124,
    CodeNotFound = 125,
    ToNotFound = 126,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let code_str = Error::describe(self.code);
        let mut suffix = String::new();
        if let Some(location) = &self.location {
            suffix.push_str(&format!(" AT {}", location));
        }
        if let Some(action) = self.action {
            suffix.push_str(&format!(" ACTION {}", action));
        }
        if let Some(line) = self.line {
            suffix.push_str(&format!(" LINE {}", line + 1));
        }
        if !self.message.is_empty() {
            suffix.push_str(&format!("; {}", self.message));
        }
        if code_str.is_empty() {
            write!(f, "PROGRAM ERROR {}{}", self.code, suffix)
        } else {
            write!(f, "{}{}", code_str, suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(Error::describe(100), "DIVISION BY ZERO");
        assert_eq!(Error::describe(9999), "");
    }

    #[test]
    fn test_position_is_sticky() {
        let e = error!(Syntax)
            .in_location("HOME".into())
            .in_line(2)
            .in_location("AWAY".into())
            .in_line(7);
        assert_eq!(e.location().map(|l| l.as_ref()), Some("HOME"));
        assert_eq!(e.line(), Some(2));
        assert_eq!(e.to_string(), "SYNTAX ERROR AT HOME LINE 3");
    }
}
