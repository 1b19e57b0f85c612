//! Module `commands`
//!
//! Parses raw control lines into commands. Parsing is stateless: a line is
//! split on runs of whitespace into a verb followed by its arguments.

use std::fmt;

/// The verbs this server understands.
///
/// Matching is case-sensitive. Anything else, including `TYPE` and `RETR`,
/// is `Unimplemented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    User,
    Pass,
    Syst,
    Cwd,
    Pwd,
    Port,
    List,
    Quit,
    Unimplemented,
}

impl Verb {
    fn from_token(token: &str) -> Self {
        match token {
            "" | "QUIT" => Verb::Quit,
            "USER" => Verb::User,
            "PASS" => Verb::Pass,
            "SYST" => Verb::Syst,
            "CWD" => Verb::Cwd,
            "PWD" => Verb::Pwd,
            "PORT" => Verb::Port,
            "LIST" => Verb::List,
            _ => Verb::Unimplemented,
        }
    }

    /// Verbs whose handler needs exactly one argument
    pub fn takes_single_argument(self) -> bool {
        matches!(self, Verb::User | Verb::Pass | Verb::Cwd | Verb::Port)
    }
}

/// A command read from the control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub args: Vec<String>,
}

impl Command {
    /// Parses one control line. Line terminators and surrounding whitespace
    /// are ignored; an empty line yields an empty verb.
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace().map(str::to_string);
        let verb = tokens.next().unwrap_or_default();
        Self {
            verb,
            args: tokens.collect(),
        }
    }

    pub fn kind(&self) -> Verb {
        Verb::from_token(&self.verb)
    }

    /// First argument, if any
    pub fn argument(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// The received tokens joined by single spaces
    pub fn echo(&self) -> String {
        std::iter::once(self.verb.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Log-safe rendering: the PASS argument is masked.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind() == Verb::Pass && !self.args.is_empty() {
            write!(f, "{} ****", self.verb)
        } else {
            f.write_str(&self.echo())
        }
    }
}
