//! The data model shared by the compilation stages.
//!
//! A help text is parsed into a tree of [`Layout`]s over [`UsageArg`] leaves,
//! which the solver rewrites into the same tree shape over [`SolvedArg`]
//! leaves. Keeping the two leaf types distinct catches stage-confusion bugs
//! at compile time; the solver is the only total conversion between them.

use std::fmt;

/// A single way of writing an option on the command line.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionAlias {
    /// `-f`
    Short(char),
    /// `--file` (stored without the leading dashes)
    Long(String),
}

impl OptionAlias {
    /// Parse an alias from its written form, e.g. `-f` or `--file`.
    pub fn from_written(s: &str) -> Option<OptionAlias> {
        if let Some(name) = s.strip_prefix("--") {
            if !name.is_empty() {
                return Some(OptionAlias::Long(name.into()));
            }
        } else if let Some(rest) = s.strip_prefix('-') {
            let mut chars = rest.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Some(OptionAlias::Short(c));
            }
        }
        None
    }

    pub fn is_long(&self) -> bool {
        matches!(*self, OptionAlias::Long(_))
    }
}

impl fmt::Display for OptionAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            OptionAlias::Short(c) => write!(f, "-{c}"),
            OptionAlias::Long(ref s) => write!(f, "--{s}"),
        }
    }
}

/// The argument an option binds, e.g. the `FILE` of `--output=FILE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionArgument {
    /// The placeholder as written, without angle brackets.
    pub name: String,
    /// Whether the `[=FILE]` form was used, making the argument omissible.
    pub optional: bool,
}

impl OptionArgument {
    pub fn new(name: &str, optional: bool) -> OptionArgument {
        OptionArgument {
            name: strip_angles(name).into(),
            optional,
        }
    }

    /// Placeholder equality: case-insensitive and angle-bracket-insensitive.
    pub fn answers_to(&self, placeholder: &str) -> bool {
        placeholders_agree(&self.name, placeholder)
    }
}

pub(crate) fn strip_angles(name: &str) -> &str {
    match name.strip_prefix('<').and_then(|n| n.strip_suffix('>')) {
        Some(inner) => inner,
        None => name,
    }
}

pub(crate) fn placeholders_agree(a: &str, b: &str) -> bool {
    strip_angles(a).to_lowercase() == strip_angles(b).to_lowercase()
}

/// One record from an option description section.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Description {
    /// All ways of writing this option. Non-empty.
    pub aliases: Vec<OptionAlias>,
    /// Whether the description marks the option with `...`.
    pub repeatable: bool,
    /// The argument the option binds, if any.
    pub arg: Option<OptionArgument>,
    /// The value of a `[default: ...]` tag.
    pub default: Option<String>,
    /// The variable named by an `[env: VAR]` tag.
    pub env: Option<String>,
}

impl Description {
    pub fn matches(&self, alias: &OptionAlias) -> bool {
        self.aliases.contains(alias)
    }

    /// The alias used as the canonical output key: the first long alias,
    /// or the first alias when no long form exists.
    pub fn canonical(&self) -> &OptionAlias {
        self.aliases
            .iter()
            .find(|a| a.is_long())
            .unwrap_or(&self.aliases[0])
    }
}

/// One alternative of a disjunction: a non-empty ordered run of layouts.
///
/// The single exception to non-emptiness is a top-level usage line that
/// names only the program, which matches the empty argv.
pub type Branch<A> = Vec<Layout<A>>;

/// The recursive tree of groups and leaves representing a usage shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Layout<A> {
    /// A leaf carrying one argument.
    Elem(A),
    /// A disjunction of branches, `( a b | c )` or `[ a b | c ]`.
    Group {
        optional: bool,
        repeatable: bool,
        branches: Vec<Branch<A>>,
    },
}

/// Leaves as the usage parser produces them.
///
/// `OptionStack` and `Reference` only exist at this stage; the solver
/// expands both away.
#[derive(Clone, Debug, PartialEq)]
pub enum UsageArg {
    /// A literal command word.
    Command { name: String, repeatable: bool },
    /// `<arg>` or `ARG`.
    Positional { name: String, repeatable: bool },
    /// `--name` or `--name=ARG`, stored without the dashes.
    Option {
        name: String,
        arg: Option<OptionArgument>,
        repeatable: bool,
    },
    /// `-abc`: one or more stacked short options.
    OptionStack {
        stack: Vec<char>,
        arg: Option<OptionArgument>,
        repeatable: bool,
    },
    /// A literal `--`.
    Eoa,
    /// A literal `-`.
    Stdin,
    /// `[options]`-style inclusion of a description section by name.
    Reference(String),
}

/// Leaves after solving: every option carries a single resolved alias and
/// its reconciled argument; stacks and references are gone.
#[derive(Clone, Debug, PartialEq)]
pub enum SolvedArg {
    Command {
        name: String,
        repeatable: bool,
    },
    Positional {
        name: String,
        repeatable: bool,
    },
    Option {
        alias: OptionAlias,
        arg: Option<OptionArgument>,
        repeatable: bool,
    },
    Eoa,
    Stdin,
}

impl SolvedArg {
    pub fn repeatable(&self) -> bool {
        match *self {
            SolvedArg::Command { repeatable, .. }
            | SolvedArg::Positional { repeatable, .. }
            | SolvedArg::Option { repeatable, .. } => repeatable,
            SolvedArg::Eoa | SolvedArg::Stdin => false,
        }
    }

    pub fn set_repeatable(&mut self, rep: bool) {
        match *self {
            SolvedArg::Command {
                ref mut repeatable, ..
            }
            | SolvedArg::Positional {
                ref mut repeatable, ..
            }
            | SolvedArg::Option {
                ref mut repeatable, ..
            } => *repeatable = rep,
            SolvedArg::Eoa | SolvedArg::Stdin => {}
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(*self, SolvedArg::Option { .. })
    }
}

impl fmt::Display for SolvedArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SolvedArg::Command { ref name, .. } => write!(f, "{name}"),
            SolvedArg::Positional { ref name, .. } => {
                write!(f, "{}", render_positional(name))
            }
            SolvedArg::Option { ref alias, .. } => write!(f, "{alias}"),
            SolvedArg::Eoa => write!(f, "--"),
            SolvedArg::Stdin => write!(f, "-"),
        }
    }
}

/// `FOO` stays bare, anything else renders as `<foo>`, like the source text.
pub(crate) fn render_positional(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) {
        name.into()
    } else {
        format!("<{name}>")
    }
}

/// The canonical identity of an argument.
///
/// Two leaves collide in the reducer iff they share a `Key`. For options the
/// key is the full alias set, so `-f` and `--file` collapse to one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Sorted, deduplicated alias set.
    Option(Vec<OptionAlias>),
    Command(String),
    Positional(String),
    Eoa,
    Stdin,
    /// The synthetic `?` key collecting unknown options.
    Unknown,
}

impl Key {
    /// Derive the key of a solved leaf, folding in the full alias set from
    /// its description when one exists.
    pub fn of(arg: &SolvedArg, desc: Option<&Description>) -> Key {
        match *arg {
            SolvedArg::Command { ref name, .. } => Key::Command(name.clone()),
            SolvedArg::Positional { ref name, .. } => Key::Positional(name.clone()),
            SolvedArg::Option { ref alias, .. } => {
                let mut aliases = match desc {
                    Some(d) => d.aliases.clone(),
                    None => vec![],
                };
                if !aliases.contains(alias) {
                    aliases.push(alias.clone());
                }
                aliases.sort();
                aliases.dedup();
                Key::Option(aliases)
            }
            SolvedArg::Eoa => Key::Eoa,
            SolvedArg::Stdin => Key::Stdin,
        }
    }

    /// Every output-map key string this key expands to.
    pub fn written_forms(&self) -> Vec<String> {
        match *self {
            Key::Option(ref aliases) => aliases.iter().map(|a| a.to_string()).collect(),
            Key::Command(ref name) => vec![name.clone()],
            Key::Positional(ref name) => vec![render_positional(name)],
            Key::Eoa => vec!["--".into()],
            Key::Stdin => vec!["-".into()],
            Key::Unknown => vec!["?".into()],
        }
    }

    /// The written form used as the canonical map entry; long aliases win.
    pub fn canonical_form(&self) -> String {
        match *self {
            Key::Option(ref aliases) => aliases
                .iter()
                .find(|a| a.is_long())
                .unwrap_or(&aliases[0])
                .to_string(),
            _ => self.written_forms().remove(0),
        }
    }
}

/// One description section, its heading preserved for `[heading]` references
/// in the usage section.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub heading: String,
    pub descriptions: Vec<Description>,
}

/// A compiled specification, parameterized by the leaf type of its layouts
/// so the same container flows through solving.
#[derive(Clone, Debug)]
pub struct Spec<A> {
    /// The program name, taken from the first usage line.
    pub program: String,
    /// The disjunction of usage branches.
    pub layouts: Vec<Branch<A>>,
    /// The option description sections, in order of appearance.
    pub sections: Vec<Section>,
    /// The full help text, verbatim.
    pub help_text: String,
    /// The original usage fragment, for error messages.
    pub short_help: String,
}

impl<A> Spec<A> {
    /// All option descriptions, across every section.
    pub fn descriptions(&self) -> impl Iterator<Item = &Description> {
        self.sections.iter().flat_map(|s| s.descriptions.iter())
    }

    /// The description documenting `alias`, if any.
    pub fn description_of(&self, alias: &OptionAlias) -> Option<&Description> {
        self.descriptions().find(|d| d.matches(alias))
    }
}

#[cfg(test)]
mod tests {
    use super::{Description, Key, OptionAlias, OptionArgument, SolvedArg};

    #[test]
    fn aliases_collapse_to_one_key() {
        let desc = Description {
            aliases: vec![OptionAlias::Short('f'), OptionAlias::Long("file".into())],
            ..Description::default()
        };
        let by_short = Key::of(
            &SolvedArg::Option {
                alias: OptionAlias::Short('f'),
                arg: None,
                repeatable: false,
            },
            Some(&desc),
        );
        let by_long = Key::of(
            &SolvedArg::Option {
                alias: OptionAlias::Long("file".into()),
                arg: None,
                repeatable: false,
            },
            Some(&desc),
        );
        assert_eq!(by_short, by_long);
        assert_eq!(by_short.canonical_form(), "--file");
        assert_eq!(by_short.written_forms(), vec!["-f", "--file"]);
    }

    #[test]
    fn placeholders_compare_loosely() {
        let arg = OptionArgument::new("<file>", false);
        assert!(arg.answers_to("FILE"));
        assert!(arg.answers_to("file"));
        assert!(!arg.answers_to("dir"));
    }
}
