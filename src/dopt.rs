//! The public entry point: compile a help text, run it against argv.

use std::collections::HashMap;
use std::fmt;

use regex::Captures;
use serde::de::{self, IntoDeserializer, Visitor};

use crate::argv;
use crate::errors::{Error, Result};
use crate::matcher::{self, MatchOpts};
use crate::parse;
use crate::reduce;
use crate::scan;
use crate::solve;
use crate::spec::{Spec, UsageArg};
use crate::synonym::SynonymMap;
use crate::utils::cap_or_empty;
use crate::value::Value;

/// The main neodoc type, which is constructed with a help text.
///
/// This can be used to match command line arguments to produce an `ArgvMap`.
#[derive(Clone, Debug)]
pub struct Docopt {
    spec: Spec<UsageArg>,
    argv: Option<Vec<String>>,
    env: Option<HashMap<String, String>>,
    options_first: bool,
    smart_options: bool,
    require_flags: bool,
    lax_placement: bool,
    repeatable_options: bool,
    allow_unknown: bool,
    stop_at: Vec<String>,
    help_flags: Vec<String>,
    version_flags: Vec<String>,
    dont_exit: bool,
    version: Option<String>,
}

/// What a successful run produced.
#[derive(Clone, Debug)]
pub enum Output {
    /// The argv matched; here is the canonical map.
    Args(ArgvMap),
    /// A help flag fired; the payload is the full help text.
    Help(String),
    /// A version flag fired; the payload is the version string.
    Version(String),
}

impl Docopt {
    /// Compile the given help text.
    ///
    /// The `Docopt` value returned may be used immediately to parse command
    /// line arguments with a default configuration.
    ///
    /// If there was a problem splitting or parsing the help text, a `Scan`
    /// or `SpecParse` error is returned.
    pub fn new<S>(usage: S) -> Result<Docopt>
    where
        S: ::std::ops::Deref<Target = str>,
    {
        let scanned = scan::scan(&usage)?;
        Ok(Docopt::from_spec(parse::parse(&scanned)?))
    }

    /// Use an already-compiled specification instead of a help text.
    pub fn from_spec(spec: Spec<UsageArg>) -> Docopt {
        Docopt {
            spec,
            argv: None,
            env: None,
            options_first: false,
            smart_options: false,
            require_flags: false,
            lax_placement: false,
            repeatable_options: false,
            allow_unknown: false,
            stop_at: vec![],
            help_flags: vec!["--help".into()],
            version_flags: vec!["--version".into()],
            dont_exit: false,
            version: None,
        }
    }

    /// Run the full pipeline: solve the spec, lex the argv, match and
    /// reduce.
    ///
    /// Returns `Output::Help` or `Output::Version` when one of the
    /// configured flags fired (unless `dont_exit` is set), and the reduced
    /// map otherwise. Matching errors come wrapped in `WithProgramUsage`.
    pub fn run(&self) -> Result<Output> {
        let solved = solve::solve(&self.spec, self.smart_options)?;
        let argv = self.argv.clone().unwrap_or_else(Docopt::get_argv);
        let env = self.env.clone().unwrap_or_else(Docopt::get_env);
        let toks = argv::lex(&argv)
            .map_err(|e| self.err_with_usage(Error::Match(e)))?;
        let opts = MatchOpts {
            options_first: self.options_first,
            require_flags: self.require_flags,
            lax_placement: self.lax_placement,
            repeatable_options: self.repeatable_options,
            allow_unknown: self.allow_unknown,
            stop_at: self.stop_at.clone(),
        };
        let prepared = matcher::prepare(&solved, &env, &opts);
        let (branch, kvs) = matcher::match_argv(&prepared, toks, &opts)
            .map_err(|e| self.err_with_usage(Error::Match(e)))?;
        let vals = ArgvMap {
            map: reduce::reduce(&prepared.branches[branch], kvs),
        };
        if !self.dont_exit {
            if self.help_flags.iter().any(|f| vals.get_bool(f)) {
                return Ok(Output::Help(self.spec.help_text.clone()));
            }
            if self.version_flags.iter().any(|f| vals.get_bool(f)) {
                return match self.version {
                    Some(ref v) => Ok(Output::Version(v.clone())),
                    None => Err(Error::VersionMissing),
                };
            }
        }
        Ok(Output::Args(vals))
    }

    /// Parse command line arguments and try to match them against the
    /// usage patterns in the help text.
    ///
    /// If there is a match, an `ArgvMap` is returned, which maps flags,
    /// commands and arguments to values.
    ///
    /// A fired help or version flag surfaces as an `Error::Help` or
    /// `Error::Version`, so the whole outcome funnels into one `Result`
    /// whose `exit` method does the right thing in every case.
    pub fn parse(&self) -> Result<ArgvMap> {
        match self.run()? {
            Output::Args(vals) => Ok(vals),
            Output::Help(text) => Err(Error::Help(text)),
            Output::Version(v) => Err(Error::Version(v)),
        }
    }

    /// Parse and deserialize the given argv.
    ///
    /// This is a convenience method for
    /// `parse().and_then(|vals| vals.deserialize())`.
    ///
    /// For details on how deserialization works, please see the
    /// documentation for `ArgvMap`.
    pub fn deserialize<D>(&self) -> Result<D>
    where
        D: de::DeserializeOwned,
    {
        self.parse().and_then(|vals| vals.deserialize())
    }

    /// Set the argv to be used for parsing.
    ///
    /// By default, when no argv is set, it is automatically taken from
    /// `std::env::args()`.
    ///
    /// The `argv` given *must* be the full set of `argv` passed to the
    /// program. e.g., `["cp", "src", "dest"]` is right while `["src",
    /// "dest"]` is wrong.
    pub fn argv<I, S>(mut self, argv: I) -> Docopt
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.argv = Some(
            argv.into_iter()
                .skip(1)
                .map(|s| s.as_ref().to_owned())
                .collect(),
        );
        self
    }

    /// Set the environment map consulted by `[env: VAR]` tags.
    ///
    /// By default the process environment is used.
    pub fn env<I, K, V>(mut self, vars: I) -> Docopt
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned()))
                .collect(),
        );
        self
    }

    /// Enables the "options first" behavior.
    ///
    /// When enabled, the trailing positional of a usage branch consumes
    /// every remaining token, options included, as an array.
    pub fn options_first(mut self, yes: bool) -> Docopt {
        self.options_first = yes;
        self
    }

    /// Enables the solver's slurp-adjacent heuristic, so `[-f FILE]` binds
    /// `FILE` as the argument of `-f` even without a description.
    pub fn smart_options(mut self, yes: bool) -> Docopt {
        self.smart_options = yes;
        self
    }

    /// Treat flags written in the usage section as required rather than
    /// implicitly optional.
    pub fn require_flags(mut self, yes: bool) -> Docopt {
        self.require_flags = yes;
        self
    }

    /// Let options in a group that contains positionals or commands appear
    /// in any order relative to those non-option siblings.
    pub fn lax_placement(mut self, yes: bool) -> Docopt {
        self.lax_placement = yes;
        self
    }

    /// Treat every option as repeatable regardless of `...` marks.
    pub fn repeatable_options(mut self, yes: bool) -> Docopt {
        self.repeatable_options = yes;
        self
    }

    /// Collect unknown options under the `?` key instead of rejecting them.
    pub fn allow_unknown(mut self, yes: bool) -> Docopt {
        self.allow_unknown = yes;
        self
    }

    /// Aliases (as written, e.g. `-n` or `--noop`) that terminate parsing
    /// and collect the rest of the command line verbatim.
    pub fn stop_at<I, S>(mut self, aliases: I) -> Docopt
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_at = aliases.into_iter().map(|s| s.as_ref().to_owned()).collect();
        self
    }

    /// The aliases whose presence makes `run` return `Output::Help`.
    /// Defaults to `--help`; the flag must be a valid pattern for this
    /// to have any effect.
    pub fn help_flags<I, S>(mut self, aliases: I) -> Docopt
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.help_flags = aliases.into_iter().map(|s| s.as_ref().to_owned()).collect();
        self
    }

    /// The aliases whose presence makes `run` return `Output::Version`.
    /// Defaults to `--version`.
    pub fn version_flags<I, S>(mut self, aliases: I) -> Docopt
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.version_flags = aliases
            .into_iter()
            .map(|s| s.as_ref().to_owned())
            .collect();
        self
    }

    /// Disable help and version interception entirely; the flags flow into
    /// the output map like any other.
    pub fn dont_exit(mut self, yes: bool) -> Docopt {
        self.dont_exit = yes;
        self
    }

    /// Set the string returned when a version flag fires.
    ///
    /// When unset (a `None` value), a fired version flag is an error.
    pub fn version(mut self, version: Option<String>) -> Docopt {
        self.version = version;
        self
    }

    #[doc(hidden)]
    pub fn spec(&self) -> &Spec<UsageArg> {
        &self.spec
    }

    fn err_with_usage(&self, e: Error) -> Error {
        Error::WithProgramUsage(Box::new(e), self.spec.short_help.trim().into())
    }

    fn get_argv() -> Vec<String> {
        ::std::env::args().skip(1).collect()
    }

    fn get_env() -> HashMap<String, String> {
        ::std::env::vars().collect()
    }
}

/// A map containing matched values from command line arguments.
///
/// The keys are just as specified in the help text: `--flag` for a long
/// flag or `-f` for a short flag. If `-f` is a synonym for `--flag`, both
/// keys work and hold equal values. `ARG` or `<arg>` specify a positional
/// argument and `cmd` specifies a command. Unknown options collected under
/// `allow_unknown` live under the `?` key.
#[derive(Clone)]
pub struct ArgvMap {
    #[doc(hidden)]
    pub map: SynonymMap<String, Value>,
}

impl ArgvMap {
    /// Tries to deserialize the map of values into a struct.
    ///
    /// This method should always be called to deserialize an `ArgvMap` into
    /// a struct. All fields of the struct must map to a corresponding key
    /// in the `ArgvMap`. To this end, each member must have a special
    /// prefix corresponding to the different kinds of patterns. There are
    /// three prefixes: `flag_`, `arg_` and `cmd_` which respectively
    /// correspond to short/long flags, positional arguments and commands.
    ///
    /// If a pattern name has a `-` in it, it is converted to an `_`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use neodoc::Docopt;
    /// use serde::Deserialize;
    ///
    /// const USAGE: &str = "
    /// Usage: cargo [options] (build | test)
    ///        cargo --help
    ///
    /// Options: -v, --verbose
    ///          -h, --help
    /// ";
    ///
    /// #[derive(Deserialize)]
    /// struct Args {
    ///     cmd_build: bool,
    ///     cmd_test: bool,
    ///     flag_verbose: bool,
    ///     flag_h: bool,
    /// }
    ///
    /// let argv = || vec!["cargo", "build", "-v"];
    /// let args: Args = Docopt::new(USAGE)
    ///     .and_then(|d| d.argv(argv()).deserialize())
    ///     .unwrap_or_else(|e| e.exit());
    /// assert!(args.cmd_build && !args.cmd_test
    ///         && args.flag_verbose && !args.flag_h);
    /// ```
    ///
    /// Note that in the above example, `flag_h` is used but `flag_help`
    /// could also be used. (In fact, both could be used at the same time.)
    ///
    /// In this example, only the `bool` type was used, but any type
    /// satisfying the `Deserialize` trait is valid.
    pub fn deserialize<T: de::DeserializeOwned>(self) -> Result<T> {
        T::deserialize(MapDeserializer { vals: self })
    }

    /// Finds the value corresponding to `key` and calls `as_bool()` on it.
    /// If the key does not exist, `false` is returned.
    pub fn get_bool(&self, key: &str) -> bool {
        self.find(key).map_or(false, Value::as_bool)
    }

    /// Finds the value corresponding to `key` and calls `as_count()` on it.
    /// If the key does not exist, `0` is returned.
    pub fn get_count(&self, key: &str) -> i64 {
        self.find(key).map_or(0, Value::as_count)
    }

    /// Finds the value corresponding to `key` and calls `as_str()` on it.
    /// If the key does not exist, `""` is returned.
    pub fn get_str(&self, key: &str) -> &str {
        self.find(key).map_or("", Value::as_str)
    }

    /// Finds the value corresponding to `key` and calls `as_vec()` on it.
    /// If the key does not exist, `vec!()` is returned.
    pub fn get_vec(&self, key: &str) -> Vec<&str> {
        self.find(key).map(Value::as_vec).unwrap_or_default()
    }

    /// Return the raw value corresponding to some `key`.
    ///
    /// `key` should be a string in the traditional docopt format. e.g.,
    /// `<arg>` or `--flag`.
    pub fn find(&self, key: &str) -> Option<&Value> {
        self.map.find(&key.into())
    }

    /// Return the number of values, not including synonyms.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether any value was produced at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Converts a key to a struct field name.
    /// This makes a half-hearted attempt at making the key a valid struct
    /// field name (like replacing `-` with `_`), but it does not otherwise
    /// guarantee that the result is a valid struct field name.
    #[doc(hidden)]
    pub fn key_to_struct_field(name: &str) -> String {
        let key_shape = regex!(
            r"^(?:--?(?P<flag>\S+)|(?:(?P<argu>\p{Lu}[\p{Lu}0-9_-]*)|<(?P<argb>[^>]+)>)|(?P<cmd>\S+))$"
        );
        fn sanitize(name: &str) -> String {
            name.replace('-', "_")
        }

        key_shape
            .replace(name, |cap: &Captures<'_>| {
                let (flag, cmd) = (cap_or_empty(cap, "flag"), cap_or_empty(cap, "cmd"));
                let (argu, argb) = (cap_or_empty(cap, "argu"), cap_or_empty(cap, "argb"));
                let (prefix, name) = if !flag.is_empty() {
                    ("flag_", flag)
                } else if !argu.is_empty() {
                    ("arg_", argu)
                } else if !argb.is_empty() {
                    ("arg_", argb)
                } else if !cmd.is_empty() {
                    ("cmd_", cmd)
                } else {
                    panic!("Unknown ArgvMap key: '{name}'")
                };
                let mut prefix = prefix.to_owned();
                prefix.push_str(&sanitize(name));
                prefix
            })
            .into_owned()
    }

    /// Converts a struct field name to a key.
    #[doc(hidden)]
    pub fn struct_field_to_key(field: &str) -> String {
        let bare_letters = regex!(r"^\p{Lu}[\p{Lu}0-9_-]*$");
        fn desanitize(name: &str) -> String {
            name.replace('_', "-")
        }
        let name = if let Some(name) = field.strip_prefix("flag_") {
            let mut pre_name = (if name.chars().count() == 1 { "-" } else { "--" }).to_owned();
            pre_name.push_str(name);
            pre_name
        } else if let Some(name) = field.strip_prefix("arg_") {
            if bare_letters.is_match(name) {
                name.to_owned()
            } else {
                format!("<{name}>")
            }
        } else if let Some(name) = field.strip_prefix("cmd_") {
            name.to_owned()
        } else {
            panic!("Unrecognized struct field: '{field}'")
        };
        desanitize(&name)
    }
}

impl fmt::Debug for ArgvMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len() == 0 {
            return write!(f, "{{EMPTY}}");
        }

        // This is a little crazy, but we want to group synonyms with
        // their keys and sort them for predictable output.
        let mut reverse: HashMap<&String, Vec<&String>> = HashMap::new();
        for (from, to) in self.map.synonyms() {
            reverse.entry(to).or_default().push(from);
        }
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        let mut first = true;
        for &k in &keys {
            if !first {
                writeln!(f)?;
            } else {
                first = false;
            }
            match reverse.get(&k) {
                None => {
                    write!(f, "{k} => {:?}", self.map.get(k))?;
                }
                Some(syns) => {
                    let mut syns: Vec<&str> = syns.iter().map(|s| s.as_str()).collect();
                    syns.sort_unstable();
                    write!(f, "{}, {k} => {:?}", syns.join(", "), self.map.get(k))?;
                }
            }
        }
        Ok(())
    }
}

/// Deserializer for `ArgvMap` into your own `Deserialize` types.
///
/// In general, you shouldn't have to use this type directly. It is exposed
/// in case you want to write a generic function that produces a
/// deserializable value.
struct MapDeserializer {
    vals: ArgvMap,
}

impl<'de> de::Deserializer<'de> for MapDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        Err(de::Error::custom(
            "an ArgvMap deserializes into structs only",
        ))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_map(FieldAccess {
            vals: self.vals,
            fields,
            at: 0,
        })
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str string bytes
        byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct enum identifier ignored_any
    }
}

struct FieldAccess {
    vals: ArgvMap,
    fields: &'static [&'static str],
    at: usize,
}

impl<'de> de::MapAccess<'de> for FieldAccess {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.fields.get(self.at) {
            None => Ok(None),
            Some(&field) => seed.deserialize(field.into_deserializer()).map(Some),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        let field = self.fields[self.at];
        self.at += 1;
        let key = ArgvMap::struct_field_to_key(field);
        let value = self.vals.find(&key).cloned();
        seed.deserialize(ValueDeserializer { key, value })
    }
}

/// Deserializes one looked-up value. A missing value reads as `false`,
/// `0`, `""`, `None` or an empty list, matching the output map's habit of
/// omitting everything that was never bound.
struct ValueDeserializer {
    key: String,
    value: Option<Value>,
}

macro_rules! derr(
    ($($arg:tt)*) => (return Err(Error::Deserialize(format!($($arg)*))))
);

impl ValueDeserializer {
    fn to_number(&self) -> Result<i64> {
        match self.value {
            None => Ok(0),
            Some(Value::Str(ref s)) => {
                if s.trim().is_empty() {
                    Ok(0)
                } else {
                    match s.trim().parse() {
                        Ok(n) => Ok(n),
                        Err(_) => {
                            derr!("Could not decode '{s}' into a number for '{}'.", self.key)
                        }
                    }
                }
            }
            Some(Value::Float(f)) => Ok(f as i64),
            Some(ref v) => Ok(v.as_count()),
        }
    }

    fn to_float(&self) -> Result<f64> {
        match self.value {
            Some(Value::Float(f)) => Ok(f),
            Some(Value::Str(ref s)) => match s.trim().parse() {
                Ok(f) => Ok(f),
                Err(_) => derr!("Could not decode '{s}' into a float for '{}'.", self.key),
            },
            _ => self.to_number().map(|n| n as f64),
        }
    }

    fn elements(&self) -> Vec<Value> {
        match self.value {
            None => vec![],
            Some(Value::List(ref vs)) => vs.clone(),
            Some(ref v) => vec![v.clone()],
        }
    }
}

macro_rules! deserialize_num {
    ($name:ident, $visit:ident, $ty:ty) => {
        fn $name<V>(self, visitor: V) -> Result<V::Value>
        where
            V: Visitor<'de>,
        {
            let n = self.to_number()?;
            visitor.$visit(n as $ty)
        }
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            None => visitor.visit_unit(),
            Some(Value::Bool(b)) => visitor.visit_bool(b),
            Some(Value::Int(n)) => visitor.visit_i64(n),
            Some(Value::Float(f)) => visitor.visit_f64(f),
            Some(Value::Str(s)) => visitor.visit_string(s),
            Some(Value::List(_)) => self.deserialize_seq(visitor),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_bool(self.value.as_ref().map_or(false, Value::as_bool))
    }

    deserialize_num!(deserialize_i8, visit_i8, i8);
    deserialize_num!(deserialize_i16, visit_i16, i16);
    deserialize_num!(deserialize_i32, visit_i32, i32);
    deserialize_num!(deserialize_i64, visit_i64, i64);
    deserialize_num!(deserialize_u8, visit_u8, u8);
    deserialize_num!(deserialize_u16, visit_u16, u16);
    deserialize_num!(deserialize_u32, visit_u32, u32);
    deserialize_num!(deserialize_u64, visit_u64, u64);

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let f = self.to_float()?;
        visitor.visit_f32(f as f32)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_f64(self.to_float()?)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let vstr = self.value.as_ref().map_or("", Value::as_str);
        let mut chars = vstr.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => derr!("Could not decode '{vstr}' into a char for '{}'.", self.key),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(Value::Str(s)) => visitor.visit_string(s),
            Some(ref v) => visitor.visit_string(v.as_str().to_owned()),
            None => visitor.visit_str(""),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        // Absence and falsy presence both read as `None`, so optional
        // struct fields track whether the argument was actually given.
        if self.value.as_ref().map_or(false, Value::as_bool) {
            visitor.visit_some(self)
        } else {
            visitor.visit_none()
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let key = self.key.clone();
        let elems = self
            .elements()
            .into_iter()
            .map(|v| ValueDeserializer {
                key: key.clone(),
                value: Some(v),
            })
            .collect::<Vec<_>>();
        let mut seq = de::value::SeqDeserializer::new(elems.into_iter());
        let out = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(out)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let given = self
            .value
            .as_ref()
            .map_or("", Value::as_str)
            .to_lowercase();
        let variant = variants
            .iter()
            .find(|v| v.to_lowercase() == given);
        match variant {
            Some(&v) => visitor.visit_enum(v.into_deserializer()),
            None => derr!(
                "Could not match '{given}' with any of the allowed variants: {variants:?}"
            ),
        }
    }

    serde::forward_to_deserialize_any! {
        bytes byte_buf unit_struct tuple tuple_struct map struct identifier
        ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for ValueDeserializer {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
