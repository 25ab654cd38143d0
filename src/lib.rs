//! Neodoc for Rust: docopt-convention command line parsing driven by your
//! program's own help text.
//!
//! The help text is compiled into an argument-matching engine (scanned
//! into sections, parsed into usage layouts and option descriptions,
//! *solved* into a normalized specification) and then run against argv
//! and the environment to produce one canonical map from every way of
//! writing an argument to its value.
//!
//! # Example
//!
//! ```
//! use neodoc::Docopt;
//!
//! const USAGE: &str = "
//! Usage: cp [options] <source> <dest>
//!        cp --version
//!
//! Options:
//!   -a, --archive  Copy everything.
//! ";
//!
//! let args = Docopt::new(USAGE)
//!     .and_then(|d| d.argv(["cp", "-a", "src", "dst"]).parse())
//!     .unwrap_or_else(|e| e.exit());
//! assert!(args.get_bool("-a") && args.get_bool("--archive"));
//! assert_eq!(args.get_str("<source>"), "src");
//! assert_eq!(args.get_str("<dest>"), "dst");
//! ```
//!
//! Option descriptions may carry `[default: ...]` and `[env: VAR]` tags;
//! argv beats the environment, which beats the default:
//!
//! ```
//! use neodoc::Docopt;
//!
//! const USAGE: &str = "
//! Usage: serve [options]
//!
//! Options:
//!   -h, --host <host>  Host to bind. [env: HOST] [default: localhost]
//! ";
//!
//! let args = Docopt::new(USAGE)
//!     .and_then(|d| d.argv(["serve"]).env([("HOST", "0.0.0.0")]).parse())
//!     .unwrap_or_else(|e| e.exit());
//! assert_eq!(args.get_str("--host"), "0.0.0.0");
//! assert_eq!(args.get_str("-h"), "0.0.0.0");
//! ```
//!
//! Struct deserialization works through serde; see [`ArgvMap::deserialize`].

#[macro_use]
mod utils;

pub use crate::dopt::{ArgvMap, Docopt, Output};
pub use crate::errors::{Error, MatchError, Result};
pub use crate::spec::{
    Branch, Description, Key, Layout, OptionAlias, OptionArgument, Section, SolvedArg, Spec,
    UsageArg,
};
pub use crate::synonym::SynonymMap;
pub use crate::value::{Origin, RichValue, Value};

mod argv;
mod dopt;
mod errors;
mod matcher;
mod parse;
mod reduce;
mod scan;
mod solve;
mod spec;
mod synonym;
mod value;

#[cfg(test)]
mod test;
