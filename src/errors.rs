//! The one and only error type for neodoc.
use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Write};
use std::result;

use serde::de;

/// Print to stderr without going through the error machinery itself.
macro_rules! werr(
    ($($arg:tt)*) => ({
        write!(&mut ::std::io::stderr(), $($arg)*).unwrap();
    })
);

/// Represents the different types of neodoc errors.
///
/// This error type has a lot of variants. In the common case, you probably
/// don't care why parsing has failed, and would rather just quit the program
/// and show an error message instead. The `exit` method defined on the
/// `Error` type will do just that. It will also set the exit code
/// appropriately (no error for `--help` or `--version`, but an error code
/// for a bad help text, bad argv or a failed deserialization).
///
/// ### Example
///
/// Generally, you want to compile the help text, try to match the argv
/// and then quit the program if there was an error reported at any point
/// in that process. This can be achieved like so:
///
/// ```no_run
/// use neodoc::Docopt;
///
/// const USAGE: &str = "
/// Usage: prog [--verbose]
/// ";
///
/// let args = Docopt::new(USAGE)
///                   .and_then(|d| d.parse())
///                   .unwrap_or_else(|e| e.exit());
/// ```
#[derive(Debug)]
pub enum Error {
    /// The help text has no usage section (or a malformed one).
    ///
    /// This error can only be triggered by the programmer, i.e., the writer
    /// of the help text. It is usually indicative of a bug in your program.
    Scan(String),

    /// The usage section or an option description failed to parse.
    SpecParse(String),

    /// The usage section and the option descriptions could not be fused
    /// into a single coherent specification: ambiguous aliases, a missing
    /// argument for an option that requires one, a placeholder mismatch or
    /// an unresolvable `[options]`-style reference.
    Solve(String),

    /// Matching the given argv against the compiled specification failed.
    ///
    /// The payload describes why; see [`MatchError`] for the subcases.
    Match(MatchError),

    /// A version flag was triggered but no version string is available.
    VersionMissing,

    /// This indicates a problem deserializing a successful match into a
    /// deserializable value.
    Deserialize(String),

    /// Parsing failed, and the program usage should be printed next to the
    /// failure message. Typically this wraps `Match` errors.
    WithProgramUsage(Box<Error>, String),

    /// Parsing stopped because the command line asked for the help message,
    /// which is included as the payload.
    Help(String),

    /// Parsing stopped because the command line asked for the version,
    /// which is included as the payload.
    Version(String),
}

/// The ways matching argv against a compiled specification can fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchError {
    /// Catch-all with a message.
    Generic(String),

    /// A required pattern was never matched and has no fallback value.
    MissingArgument(String),

    /// An option that requires an argument was given none.
    OptionRequiresArgument(String),

    /// An option that takes no argument was given one with `=`.
    OptionTakesNoArgument(String),

    /// Trailing or misplaced tokens remained after the best match.
    UnexpectedInput(String),

    /// The argv itself could not be lexed.
    MalformedInput(String),
}

impl MatchError {
    pub fn message(&self) -> &str {
        match *self {
            MatchError::Generic(ref s)
            | MatchError::MissingArgument(ref s)
            | MatchError::OptionRequiresArgument(ref s)
            | MatchError::OptionTakesNoArgument(ref s)
            | MatchError::UnexpectedInput(ref s)
            | MatchError::MalformedInput(ref s) => s,
        }
    }
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl Error {
    /// Return whether this was a fatal error or not.
    ///
    /// Non-fatal errors include requests to print the help or version
    /// information of a program, while fatal errors include those such as
    /// failing to compile the help text or to match the argv.
    pub fn fatal(&self) -> bool {
        match *self {
            Error::Help(..) | Error::Version(..) => false,
            Error::Scan(..)
            | Error::SpecParse(..)
            | Error::Solve(..)
            | Error::Match(..)
            | Error::VersionMissing
            | Error::Deserialize(..) => true,
            Error::WithProgramUsage(ref b, _) => b.fatal(),
        }
    }

    /// Print this error and immediately exit the program.
    ///
    /// If the error is non-fatal (e.g., `Help` or `Version`), then the
    /// error is printed to stdout and the exit status will be `0`. Otherwise,
    /// when the error is fatal, the error is printed to stderr and the
    /// exit status will be `1`.
    pub fn exit(&self) -> ! {
        if self.fatal() {
            werr!("{}\n", self);
            ::std::process::exit(1)
        } else {
            let _ = writeln!(&mut io::stdout(), "{}", self);
            ::std::process::exit(0)
        }
    }
}

/// Short result type alias.
pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::WithProgramUsage(ref other, ref usage) => {
                let other = other.to_string();
                if other.is_empty() {
                    write!(f, "{usage}")
                } else {
                    write!(f, "{other}\n\n{usage}")
                }
            }
            Error::Scan(ref s)
            | Error::SpecParse(ref s)
            | Error::Solve(ref s)
            | Error::Deserialize(ref s)
            | Error::Help(ref s)
            | Error::Version(ref s) => write!(f, "{s}"),
            Error::Match(ref e) => write!(f, "{e}"),
            Error::VersionMissing => {
                write!(f, "A version was requested, but none is available.")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::WithProgramUsage(ref cause, _) => Some(&**cause),
            _ => None,
        }
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Deserialize(msg.to_string())
    }
}
