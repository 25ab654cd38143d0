//! Parsing the usage section and the option description sections.
//!
//! The usage section is tokenized with the same regex trick the scanner
//! family uses throughout: group delimiters and `...` are padded into
//! standalone words first, then words are picked out. Parsing is a small
//! recursive descent with an explicit stack of expected closing brackets.
//! Description sections are line-oriented and regex-driven.

use crate::errors::{Error, Result};
use crate::scan::{Scanned, ScannedSection};
use crate::spec::{
    Branch, Description, Layout, OptionAlias, OptionArgument, Section, Spec, UsageArg,
};
use crate::utils::cap_or_empty;

/// Parse a scanned help text into a usage-stage specification.
pub fn parse(scanned: &Scanned) -> Result<Spec<UsageArg>> {
    let mut sections = Vec::with_capacity(scanned.sections.len());
    for section in &scanned.sections {
        sections.push(parse_section(section)?);
    }

    let mut layouts = vec![];
    for pattern in split_patterns(&scanned.usage_body, &scanned.program)? {
        let tokens = pattern_tokens(&pattern);
        layouts.extend(UsageParser::new(tokens).parse()?);
    }

    Ok(Spec {
        program: scanned.program.clone(),
        layouts,
        sections,
        help_text: scanned.help_text.clone(),
        short_help: scanned.short_help.clone(),
    })
}

/// Split the usage body into one pattern text per usage alternative.
///
/// A new pattern starts at every line whose first word is the program name,
/// or at an `or:`/`usage:` prefix; other lines continue the previous
/// pattern. The program token itself is stripped.
fn split_patterns(usage_body: &str, program: &str) -> Result<Vec<String>> {
    let line_prefix = regex!(r"(?i)^(?:usage|or):[ \t]*");
    let mut patterns: Vec<String> = vec![];
    for raw_line in usage_body.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let (line, prefixed) = match line_prefix.find(line) {
            Some(m) => (line[m.end()..].trim(), true),
            None => (line, false),
        };
        let mut words = line.splitn(2, char::is_whitespace);
        let first = words.next().unwrap_or("");
        let rest = words.next().unwrap_or("").trim();
        if first == program {
            patterns.push(rest.into());
        } else if prefixed || patterns.is_empty() {
            err!(
                Error::SpecParse,
                "Expected usage line to start with the program name '{program}', \
                 but found '{first}'."
            )
        } else {
            // Continuation of the previous usage line.
            let last = patterns.last_mut().unwrap();
            last.push(' ');
            last.push_str(line);
        }
    }
    Ok(patterns)
}

// Tokenizes a usage pattern.
// Beware: regex hack ahead. Tokenizes based on whitespace separated words.
// It first normalizes `[xyz]` -> `[ xyz ]` so that delimiters are tokens.
// Similarly for `...`, `(`, `)` and `|`. One hitch: `--flag=<arg spaces>`
// is allowed, so we use a regex to pick out words.
fn pattern_tokens(pat: &str) -> Vec<String> {
    let delimiters = regex!(r"\.\.\.|\[|\]|\(|\)|\|");
    let words = regex!(r"--\S+?=<[^>]+>|<[^>]+>|\S+");
    let pat = delimiters.replace_all(pat.trim(), " $0 ");
    words
        .captures_iter(&pat)
        .map(|cap| cap[0].to_string())
        .collect()
}

struct UsageParser {
    tokens: Vec<String>,    // the words of a single usage pattern
    curi: usize,            // ^^ index into those words
    expecting: Vec<char>,   // stack of expected ']' or ')'
}

impl UsageParser {
    fn new(tokens: Vec<String>) -> UsageParser {
        UsageParser {
            tokens,
            curi: 0,
            expecting: vec![],
        }
    }

    fn parse(mut self) -> Result<Vec<Branch<UsageArg>>> {
        let branches = self.alternatives(true)?;
        if let Some(c) = self.expecting.pop() {
            err!(Error::SpecParse, "Unclosed group. Expected '{c}'.")
        }
        Ok(branches)
    }

    /// A `|`-separated run of sequences, ending at EOF or at the closing
    /// bracket of the enclosing group (left unconsumed for the caller).
    fn alternatives(&mut self, top: bool) -> Result<Vec<Branch<UsageArg>>> {
        let mut alts = vec![];
        let mut seq: Branch<UsageArg> = vec![];
        while !self.is_eof() {
            match self.cur() {
                "..." => {
                    err!(
                        Error::SpecParse,
                        "'...' must appear directly after a group, argument, \
                         flag or command."
                    )
                }
                "|" => {
                    if seq.is_empty() {
                        err!(Error::SpecParse, "Unexpected '|'. Not in form 'a | b | c'.")
                    }
                    self.next_noeof("pattern")?;
                    alts.push(seq);
                    seq = vec![];
                }
                "]" | ")" => {
                    if top {
                        err!(
                            Error::SpecParse,
                            "Unexpected '{}'. No open bracket found.",
                            self.cur()
                        )
                    }
                    break;
                }
                "[" => {
                    if let Some(elem) = self.reference()? {
                        seq.push(elem);
                    } else {
                        seq.push(self.group('[')?);
                    }
                }
                "(" => seq.push(self.group('(')?),
                "--" => {
                    seq.push(Layout::Elem(UsageArg::Eoa));
                    self.next();
                }
                "-" => {
                    seq.push(Layout::Elem(UsageArg::Stdin));
                    self.next();
                }
                _ => {
                    if is_long(self.cur()) {
                        seq.push(self.long()?);
                    } else if is_short(self.cur()) {
                        seq.push(self.short()?);
                    } else if is_arg(self.cur()) {
                        seq.push(self.positional());
                    } else if is_cmd(self.cur()) {
                        seq.push(self.command());
                    } else {
                        err!(Error::SpecParse, "Unknown token type '{}'.", self.cur())
                    }
                }
            }
        }
        if seq.is_empty() && !alts.is_empty() {
            err!(Error::SpecParse, "Unexpected '|'. Not in form 'a | b | c'.")
        }
        alts.push(seq);
        Ok(alts)
    }

    fn group(&mut self, open: char) -> Result<Layout<UsageArg>> {
        let close = if open == '[' { ']' } else { ')' };
        self.expecting.push(close);
        self.next_noeof("pattern")?;
        let branches = self.alternatives(false)?;
        if self.is_eof() {
            err!(Error::SpecParse, "Unclosed group. Expected '{close}'.")
        }
        let got = self.cur().chars().next().unwrap();
        let expected = self.expecting.pop().unwrap();
        if got != expected {
            err!(Error::SpecParse, "Expected '{expected}' but got '{got}'.")
        }
        if branches.iter().any(Vec::is_empty) {
            err!(
                Error::SpecParse,
                "Unexpected '{got}'. Empty groups are not allowed."
            )
        }
        self.next();
        let repeatable = self.maybe_repeat();
        Ok(Layout::Group {
            optional: open == '[',
            repeatable,
            branches,
        })
    }

    /// Recognize `[options]` (or `[advanced options]`) as a reference to a
    /// description section rather than as a group.
    fn reference(&mut self) -> Result<Option<Layout<UsageArg>>> {
        let t1 = self.tokens.get(self.curi + 1).cloned();
        let t2 = self.tokens.get(self.curi + 2).cloned();
        let t3 = self.tokens.get(self.curi + 3).cloned();
        let section = match (t1.as_deref(), t2.as_deref(), t3.as_deref()) {
            (Some(word), Some("]"), _) if word.to_lowercase() == "options" => {
                self.next(); // word
                self.next(); // ]
                self.next();
                word.to_lowercase()
            }
            (Some(first), Some(word), Some("]"))
                if word.to_lowercase() == "options" && is_cmd(first) && !first.starts_with('-') =>
            {
                let heading = format!("{} {}", first.to_lowercase(), word.to_lowercase());
                self.next(); // first
                self.next(); // word
                self.next(); // ]
                self.next();
                heading
            }
            _ => return Ok(None),
        };
        let elem = Layout::Elem(UsageArg::Reference(section));
        if self.maybe_repeat() {
            // `[options]...` repeats the whole inclusion.
            return Ok(Some(Layout::Group {
                optional: false,
                repeatable: true,
                branches: vec![vec![elem]],
            }));
        }
        Ok(Some(elem))
    }

    fn long(&mut self) -> Result<Layout<UsageArg>> {
        let tok = self.cur().to_string();
        let (name, mut arg) = match tok.split_once('=') {
            None => (tok[2..].to_string(), None),
            Some((name, argname)) => {
                if !is_arg(argname) {
                    err!(
                        Error::SpecParse,
                        "Argument '{argname}' for flag '{name}' is not in the \
                         form ARG or <arg>."
                    )
                }
                (
                    name[2..].to_string(),
                    Some(OptionArgument::new(argname, false)),
                )
            }
        };
        self.next();
        if arg.is_none() {
            arg = self.maybe_bracket_arg();
        }
        let repeatable = self.maybe_repeat();
        Ok(Layout::Elem(UsageArg::Option {
            name,
            arg,
            repeatable,
        }))
    }

    fn short(&mut self) -> Result<Layout<UsageArg>> {
        let tok = self.cur().to_string();
        let (stackstr, mut arg) = match tok.split_once('=') {
            None => (tok[1..].to_string(), None),
            Some((stack, argname)) => {
                if !is_arg(argname) {
                    err!(
                        Error::SpecParse,
                        "Argument '{argname}' for flag '{stack}' is not in the \
                         form ARG or <arg>."
                    )
                }
                (
                    stack[1..].to_string(),
                    Some(OptionArgument::new(argname, false)),
                )
            }
        };
        self.next();
        if arg.is_none() {
            arg = self.maybe_bracket_arg();
        }
        let repeatable = self.maybe_repeat();
        Ok(Layout::Elem(UsageArg::OptionStack {
            stack: stackstr.chars().collect(),
            arg,
            repeatable,
        }))
    }

    /// The tokenizer turns `--flag[=ARG]` into `--flag [ =ARG ]`; stitch the
    /// optional argument back onto the option it follows.
    fn maybe_bracket_arg(&mut self) -> Option<OptionArgument> {
        let t0 = self.tokens.get(self.curi).cloned();
        let t1 = self.tokens.get(self.curi + 1).cloned();
        let t2 = self.tokens.get(self.curi + 2).cloned();
        if let (Some("["), Some(arg), Some("]")) = (t0.as_deref(), t1.as_deref(), t2.as_deref()) {
            if let Some(name) = arg.strip_prefix('=') {
                if is_arg(name) {
                    let arg = OptionArgument::new(name, true);
                    self.next();
                    self.next();
                    self.next();
                    return Some(arg);
                }
            }
        }
        None
    }

    fn command(&mut self) -> Layout<UsageArg> {
        let name = self.cur().to_string();
        self.next();
        let repeatable = self.maybe_repeat();
        Layout::Elem(UsageArg::Command { name, repeatable })
    }

    fn positional(&mut self) -> Layout<UsageArg> {
        let name = crate::spec::strip_angles(self.cur()).to_string();
        self.next();
        let repeatable = self.maybe_repeat();
        Layout::Elem(UsageArg::Positional { name, repeatable })
    }

    fn maybe_repeat(&mut self) -> bool {
        if self.atis(0, "...") {
            self.next();
            true
        } else {
            false
        }
    }

    fn is_eof(&self) -> bool {
        self.curi == self.tokens.len()
    }
    fn next(&mut self) {
        if self.curi == self.tokens.len() {
            return;
        }
        self.curi += 1;
    }
    fn next_noeof(&mut self, expected: &str) -> Result<()> {
        self.next();
        if self.curi == self.tokens.len() {
            err!(
                Error::SpecParse,
                "Expected {expected} but reached end of usage pattern."
            )
        }
        Ok(())
    }
    fn cur(&self) -> &str {
        &self.tokens[self.curi]
    }
    fn atis(&self, offset: usize, is: &str) -> bool {
        let i = self.curi + offset;
        i < self.tokens.len() && self.tokens[i] == is
    }
}

fn is_short(s: &str) -> bool {
    regex!(r"^-[^-=\s]\S*$").is_match(s)
}

fn is_long(s: &str) -> bool {
    s != "--" && regex!(r"^--\S+$").is_match(s)
}

fn is_arg(s: &str) -> bool {
    regex!(r"^(\p{Lu}[\p{Lu}0-9_-]*|<[^>]+>)$").is_match(s)
}

fn is_cmd(s: &str) -> bool {
    regex!(r"^[^-\s\[\]()|=]\S*$").is_match(s)
}

/// Parse one description section into its option records.
fn parse_section(section: &ScannedSection) -> Result<Section> {
    let is_flag = regex!(r"^(-\S|--\S)");
    let remove_desc = regex!(r"  .*$");
    let normalize_flags = regex!(r"([^-\s]), -");
    let find_flags = regex!(
        r"(?x)
        (?:(?P<long>--[^\x20\t=,\[\]]+)|(?P<short>-[^-\x20\t=,\[\]]))
        (?:
            \[=(?P<optarg>[^\]\x20\t]+)\]
          | (?:\x20|=)(?P<arg>[^-,.\s]\S*)
        )?
        (?P<rep>\x20?\.\.\.)?"
    );

    let mut descriptions: Vec<Description> = vec![];
    for full_line in section.body.lines() {
        let line = full_line.trim();
        if !is_flag.is_match(line) {
            // Prose or a continuation line; it may still carry tags for the
            // option described above it.
            parse_tags(full_line, &mut descriptions)?;
            continue;
        }

        // Get rid of the free-form description, which must be at least two
        // spaces after the flags.
        let flags = remove_desc.replace(line, "");
        // Normalize `-x, --xyz` to `-x --xyz`.
        let flags = normalize_flags.replace_all(&flags, "$1 -");
        let flags = flags.trim();

        let mut desc = Description::default();
        let mut last_end = 0;
        for caps in find_flags.captures_iter(flags) {
            last_end = caps.get(0).unwrap().end();
            let (short, long) = (cap_or_empty(&caps, "short"), cap_or_empty(&caps, "long"));
            if !short.is_empty() {
                desc.aliases
                    .push(OptionAlias::Short(short.chars().nth(1).unwrap()));
            }
            if !long.is_empty() {
                desc.aliases.push(OptionAlias::Long(long[2..].into()));
            }
            if !cap_or_empty(&caps, "rep").is_empty() {
                desc.repeatable = true;
            }
            let (optarg, plainarg) = (cap_or_empty(&caps, "optarg"), cap_or_empty(&caps, "arg"));
            let found = if !optarg.is_empty() {
                Some(OptionArgument::new(optarg, true))
            } else if !plainarg.is_empty() {
                if !is_arg(plainarg) {
                    err!(
                        Error::SpecParse,
                        "Argument '{plainarg}' is not of the form ARG or <arg>."
                    )
                }
                Some(OptionArgument::new(plainarg, false))
            } else {
                None
            };
            if let Some(found) = found {
                match desc.arg {
                    None => desc.arg = Some(found),
                    Some(ref prev) => {
                        if !prev.answers_to(&found.name) {
                            err!(
                                Error::SpecParse,
                                "Conflicting argument names '{}' and '{}' in \
                                 option description '{flags}'.",
                                prev.name,
                                found.name
                            )
                        }
                    }
                }
            }
        }
        // Make sure that we consumed everything. If there are leftovers,
        // then there is some malformed description. Alert the user.
        if last_end < flags.len() {
            err!(
                Error::SpecParse,
                "Extraneous text '{}' in option description '{flags}'.",
                &flags[last_end..]
            )
        }
        if desc.aliases.is_empty() {
            continue;
        }
        descriptions.push(desc);
        // Tags on the same line belong to the description just added.
        parse_tags(full_line, &mut descriptions)?;
    }

    Ok(Section {
        heading: section.heading.to_lowercase(),
        descriptions,
    })
}

/// Pick up `[default: ...]` and `[env: ...]` tags, which always belong to
/// the most recently parsed description.
fn parse_tags(line: &str, descriptions: &mut Vec<Description>) -> Result<()> {
    if let Some(caps) = regex!(r"(?i)\[default:(?P<val>[^\]]*)\]").captures(line) {
        let defval = unquote(cap_or_empty(&caps, "val").trim());
        let last = match descriptions.last_mut() {
            None => {
                err!(
                    Error::SpecParse,
                    "Found default value '{defval}' in '{}' before first \
                     option description.",
                    line.trim()
                )
            }
            Some(last) => last,
        };
        let name = last.canonical().to_string();
        if last.arg.is_none() {
            err!(
                Error::SpecParse,
                "Cannot assign default value '{defval}' to flag '{name}' \
                 that has no arguments."
            )
        }
        if let Some(ref curval) = last.default {
            err!(
                Error::SpecParse,
                "Flag '{name}' already has a default value of '{curval}' \
                 (second default value: '{defval}')."
            )
        }
        last.default = Some(defval.into());
    }

    if let Some(caps) = regex!(r"(?i)\[env:[ \t]*(?P<var>[^\]\s]+)[ \t]*\]").captures(line) {
        let var = cap_or_empty(&caps, "var");
        let last = match descriptions.last_mut() {
            None => {
                err!(
                    Error::SpecParse,
                    "Found environment variable '{var}' in '{}' before first \
                     option description.",
                    line.trim()
                )
            }
            Some(last) => last,
        };
        let name = last.canonical().to_string();
        if last.arg.is_none() {
            err!(
                Error::SpecParse,
                "Cannot bind environment variable '{var}' to flag '{name}' \
                 that has no arguments."
            )
        }
        if let Some(ref curvar) = last.env {
            err!(
                Error::SpecParse,
                "Flag '{name}' is already bound to environment variable \
                 '{curvar}' (second variable: '{var}')."
            )
        }
        last.env = Some(var.into());
    }

    Ok(())
}

/// Strip one pair of symmetric quotes from a default value.
fn unquote(s: &str) -> &str {
    let stripped = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    stripped.unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::{parse, pattern_tokens};
    use crate::scan::scan;
    use crate::spec::{Layout, OptionAlias, UsageArg};

    fn parsed(doc: &str) -> crate::spec::Spec<UsageArg> {
        parse(&scan(doc).unwrap()).unwrap()
    }

    #[test]
    fn tokenizer_pads_delimiters() {
        assert_eq!(
            pattern_tokens("[-a | -b]... <x>"),
            vec!["[", "-a", "|", "-b", "]", "...", "<x>"]
        );
        assert_eq!(
            pattern_tokens("--file=<a b>"),
            vec!["--file=<a b>"]
        );
    }

    #[test]
    fn usage_lines_become_branches() {
        let spec = parsed("usage: prog a <x>\n       prog b | c\n");
        assert_eq!(spec.layouts.len(), 3);
        assert_eq!(
            spec.layouts[0][0],
            Layout::Elem(UsageArg::Command {
                name: "a".into(),
                repeatable: false
            })
        );
    }

    #[test]
    fn continuation_lines_extend_the_previous_pattern() {
        let spec = parsed("usage: prog a\n          b c\n");
        assert_eq!(spec.layouts.len(), 1);
        assert_eq!(spec.layouts[0].len(), 3);
    }

    #[test]
    fn descriptions_pick_up_tags() {
        let spec = parsed(
            "usage: prog [options]\n\nOptions:\n  \
             -o, --out FILE  Where to write. [default: /dev/stdout]\n  \
             -v  Chatty.\n  --host <host>  Host. [env: HOST]\n",
        );
        let descs: Vec<_> = spec.descriptions().collect();
        assert_eq!(descs.len(), 3);
        assert_eq!(
            descs[0].aliases,
            vec![OptionAlias::Short('o'), OptionAlias::Long("out".into())]
        );
        assert_eq!(descs[0].default.as_deref(), Some("/dev/stdout"));
        assert_eq!(descs[0].arg.as_ref().unwrap().name, "FILE");
        assert_eq!(descs[2].env.as_deref(), Some("HOST"));
    }

    #[test]
    fn bracketed_option_argument_is_optional() {
        let spec = parsed("usage: prog --color[=WHEN]\n");
        match &spec.layouts[0][0] {
            Layout::Elem(UsageArg::Option { name, arg, .. }) => {
                assert_eq!(name, "color");
                let arg = arg.as_ref().unwrap();
                assert_eq!(arg.name, "WHEN");
                assert!(arg.optional);
            }
            other => panic!("unexpected layout: {other:?}"),
        }
    }

    #[test]
    fn unbalanced_groups_fail() {
        assert!(parse(&scan("usage: prog (a [b)]\n").unwrap()).is_err());
        assert!(parse(&scan("usage: prog (a\n").unwrap()).is_err());
        assert!(parse(&scan("usage: prog []\n").unwrap()).is_err());
    }
}
