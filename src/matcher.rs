//! The backtracking pattern parser over positioned argv tokens.
//!
//! Every solved leaf is wrapped into an [`Arg`] carrying its canonical key,
//! its description, a precomputed fallback value and a `can_term` flag.
//! Matching explores alternatives over immutable token-list suffixes: every
//! way a sequence can play out is collected and the best state wins, with
//! most input consumed, then fewest omissions, then the earlier alternative.
//! Errors are first-class values; only option shape violations (`=` given
//! to a flag, a missing mandatory option argument) are fatal and cut the
//! whole branch choice short.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use strsim::levenshtein;

use crate::argv::{PositionedToken, Token};
use crate::errors::MatchError;
use crate::spec::{Description, Key, Layout, OptionAlias, OptionArgument, SolvedArg, Spec};
use crate::value::{Origin, RichValue, Value};

/// Knobs the caller can turn; see the crate-level documentation.
#[derive(Clone, Debug, Default)]
pub struct MatchOpts {
    pub options_first: bool,
    pub require_flags: bool,
    pub lax_placement: bool,
    pub repeatable_options: bool,
    pub allow_unknown: bool,
    pub stop_at: Vec<String>,
}

/// A pre-cached bundle attached to each leaf during preparation.
#[derive(Debug)]
pub struct Arg {
    /// Monotonic within one preparation.
    pub id: usize,
    /// The underlying leaf; `None` only for the synthetic unknown-collector
    /// args.
    pub shape: Option<SolvedArg>,
    pub key: Key,
    /// May this leaf consume all remaining input as an array?
    pub can_term: bool,
    pub desc: Option<Description>,
    /// Default or environment value, origin recorded accordingly.
    pub fallback: Option<RichValue>,
}

impl Arg {
    fn option_argument(&self) -> Option<&OptionArgument> {
        match self.shape {
            Some(SolvedArg::Option { ref arg, .. }) => arg.as_ref(),
            _ => None,
        }
    }

    /// All aliases this leaf answers to, the described set included.
    fn aliases(&self) -> Vec<OptionAlias> {
        let mut aliases = match self.desc {
            Some(ref d) => d.aliases.clone(),
            None => vec![],
        };
        if let Some(SolvedArg::Option { ref alias, .. }) = self.shape {
            if !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
        }
        aliases
    }

    fn long_names(&self) -> Vec<String> {
        self.aliases()
            .into_iter()
            .filter_map(|a| match a {
                OptionAlias::Long(name) => Some(name),
                OptionAlias::Short(_) => None,
            })
            .collect()
    }

    fn short_chars(&self) -> Vec<char> {
        self.aliases()
            .into_iter()
            .filter_map(|a| match a {
                OptionAlias::Short(c) => Some(c),
                OptionAlias::Long(_) => None,
            })
            .collect()
    }

    pub fn is_flag(&self) -> bool {
        matches!(
            self.shape,
            Some(SolvedArg::Option { ref arg, .. }) if arg.is_none()
        )
    }

    pub fn is_command(&self) -> bool {
        matches!(self.shape, Some(SolvedArg::Command { .. }))
    }

    fn display(&self) -> String {
        match self.shape {
            Some(ref shape) => shape.to_string(),
            None => "?".into(),
        }
    }
}

/// One emission of the parser: a leaf and the value it bound.
pub type KeyValue = (Rc<Arg>, RichValue);

/// A leaf or group, recast for matching.
pub enum Pattern {
    Leaf(LeafPattern),
    Choice(ChoicePattern),
}

pub struct LeafPattern {
    pub optional: bool,
    pub repeatable: bool,
    /// Position-bound: everything that is not an option.
    pub fixed: bool,
    pub arg: Rc<Arg>,
}

pub struct ChoicePattern {
    pub optional: bool,
    pub repeatable: bool,
    /// A group containing any non-option element must match in written
    /// order; pure-option groups are free-order.
    pub fixed: bool,
    pub branches: Vec<Vec<Pattern>>,
}

impl Pattern {
    fn fixed(&self) -> bool {
        match *self {
            Pattern::Leaf(ref l) => l.fixed,
            Pattern::Choice(ref c) => c.fixed,
        }
    }

    fn repeatable(&self) -> bool {
        match *self {
            Pattern::Leaf(ref l) => l.repeatable,
            Pattern::Choice(ref c) => c.repeatable,
        }
    }

    /// May this pattern be passed over without failing the branch?
    fn omissible(&self) -> bool {
        match *self {
            Pattern::Leaf(ref l) => l.optional || l.arg.fallback.is_some(),
            Pattern::Choice(ref c) => {
                c.optional
                    || c.branches
                        .iter()
                        .any(|b| b.iter().all(Pattern::omissible))
            }
        }
    }

    fn leftmost(&self) -> String {
        match *self {
            Pattern::Leaf(ref l) => l.arg.display(),
            Pattern::Choice(ref c) => c.branches[0][0].leftmost(),
        }
    }

    /// Collect every leaf bundle in this pattern, repeat flags included.
    pub fn leaves<'a>(&'a self, out: &mut Vec<(&'a LeafPattern, &'a Rc<Arg>)>) {
        match *self {
            Pattern::Leaf(ref l) => out.push((l, &l.arg)),
            Pattern::Choice(ref c) => {
                for b in &c.branches {
                    for p in b {
                        p.leaves(out);
                    }
                }
            }
        }
    }
}

/// Prepared top-level branches plus the synthetic collectors and the
/// known-token memo, all of which live exactly as long as one parse.
pub struct Prepared {
    pub branches: Vec<Vec<Pattern>>,
    pub unknown: Rc<Arg>,
    pub unknown_eoa: Rc<Arg>,
    known: KnownTokens,
}

/// The memoized answer to "is this token spelled anywhere in the spec?".
struct KnownTokens {
    longs: HashSet<String>,
    shorts: HashSet<char>,
    commands: HashSet<String>,
    has_eoa: bool,
}

/// Wrap every leaf of the solved layouts into patterns and args.
pub fn prepare(
    spec: &Spec<SolvedArg>,
    env: &HashMap<String, String>,
    opts: &MatchOpts,
) -> Prepared {
    let mut prep = Prep {
        spec,
        env,
        opts,
        next_id: 0,
    };
    let branches = spec
        .layouts
        .iter()
        .map(|branch| prep.build_branch(branch, false, opts.options_first))
        .collect();
    let unknown = Rc::new(Arg {
        id: prep.fresh_id(),
        shape: None,
        key: Key::Unknown,
        can_term: false,
        desc: None,
        fallback: None,
    });
    let unknown_eoa = Rc::new(Arg {
        id: prep.fresh_id(),
        shape: None,
        key: Key::Eoa,
        can_term: false,
        desc: None,
        fallback: None,
    });
    Prepared {
        branches,
        unknown,
        unknown_eoa,
        known: known_tokens(spec),
    }
}

struct Prep<'a> {
    spec: &'a Spec<SolvedArg>,
    env: &'a HashMap<String, String>,
    opts: &'a MatchOpts,
    next_id: usize,
}

impl<'a> Prep<'a> {
    fn fresh_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn build_branch(
        &mut self,
        branch: &[Layout<SolvedArg>],
        in_repeatable: bool,
        tail: bool,
    ) -> Vec<Pattern> {
        let last = branch.len().saturating_sub(1);
        branch
            .iter()
            .enumerate()
            .map(|(i, layout)| self.build_pattern(layout, in_repeatable, tail && i == last))
            .collect()
    }

    fn build_pattern(
        &mut self,
        layout: &Layout<SolvedArg>,
        in_repeatable: bool,
        tail: bool,
    ) -> Pattern {
        match *layout {
            Layout::Group {
                optional,
                repeatable,
                ref branches,
            } => {
                let built: Vec<Vec<Pattern>> = branches
                    .iter()
                    .map(|b| self.build_branch(b, in_repeatable || repeatable, tail))
                    .collect();
                let fixed = built
                    .iter()
                    .any(|b| b.iter().any(Pattern::fixed));
                // Forcing every option repeatable must also let the groups
                // that carry nothing but options match again.
                let repeatable =
                    repeatable || (self.opts.repeatable_options && !fixed);
                Pattern::Choice(ChoicePattern {
                    optional,
                    repeatable,
                    fixed,
                    branches: built,
                })
            }
            Layout::Elem(ref arg) => Pattern::Leaf(self.build_leaf(arg, in_repeatable, tail)),
        }
    }

    fn build_leaf(&mut self, arg: &SolvedArg, in_repeatable: bool, tail: bool) -> LeafPattern {
        let desc = match *arg {
            SolvedArg::Option { ref alias, .. } => self.spec.description_of(alias).cloned(),
            _ => None,
        };
        let fallback = desc.as_ref().and_then(|d| {
            if let Some(ref var) = d.env {
                if let Some(v) = self.env.get(var) {
                    return Some(RichValue::new(Origin::Environment, Value::Str(v.clone())));
                }
            }
            d.default
                .as_ref()
                .map(|v| RichValue::new(Origin::Default, Value::Str(v.clone())))
        });
        let key = Key::of(arg, desc.as_ref());
        let stop_at = &self.opts.stop_at;
        let can_term = match *arg {
            SolvedArg::Eoa => true,
            SolvedArg::Option { .. } => key
                .written_forms()
                .iter()
                .any(|written| stop_at.contains(written)),
            SolvedArg::Command { ref name, .. } => stop_at.contains(name),
            SolvedArg::Positional { .. } => self.opts.options_first && tail,
            SolvedArg::Stdin => false,
        };
        let is_option = arg.is_option();
        LeafPattern {
            optional: is_option && !self.opts.require_flags,
            repeatable: arg.repeatable()
                || in_repeatable
                || (is_option && self.opts.repeatable_options),
            fixed: !is_option,
            arg: Rc::new(Arg {
                id: self.fresh_id(),
                key,
                can_term,
                desc,
                fallback,
                shape: Some(arg.clone()),
            }),
        }
    }
}

fn known_tokens(spec: &Spec<SolvedArg>) -> KnownTokens {
    fn add_alias(known: &mut KnownTokens, alias: &OptionAlias) {
        match *alias {
            OptionAlias::Long(ref name) => {
                known.longs.insert(name.clone());
            }
            OptionAlias::Short(c) => {
                known.shorts.insert(c);
            }
        }
    }
    fn walk(layouts: &[Layout<SolvedArg>], known: &mut KnownTokens) {
        for layout in layouts {
            match *layout {
                Layout::Group { ref branches, .. } => {
                    for b in branches {
                        walk(b, known);
                    }
                }
                Layout::Elem(ref arg) => match *arg {
                    SolvedArg::Option { ref alias, .. } => add_alias(known, alias),
                    SolvedArg::Command { ref name, .. } => {
                        known.commands.insert(name.clone());
                    }
                    SolvedArg::Eoa => known.has_eoa = true,
                    _ => {}
                },
            }
        }
    }

    let mut known = KnownTokens {
        longs: HashSet::new(),
        shorts: HashSet::new(),
        commands: HashSet::new(),
        has_eoa: false,
    };
    for desc in spec.descriptions() {
        for alias in &desc.aliases {
            add_alias(&mut known, alias);
        }
    }
    for branch in &spec.layouts {
        walk(branch, &mut known);
    }
    known
}

#[derive(Clone)]
struct MState {
    toks: VecDeque<PositionedToken>,
    kvs: Vec<KeyValue>,
    consumed: usize,
    omitted: usize,
    terminated: bool,
}

impl MState {
    /// A strictly decreasing measure of remaining input; short stacks count
    /// their pending characters so popping one is progress too.
    fn measure(&self) -> (usize, usize) {
        let head = match self.toks.front().map(|t| &t.token) {
            Some(Token::SOpt(_, tail, _)) => tail.len() + 1,
            _ => 0,
        };
        (self.toks.len(), head)
    }

    fn emit(&mut self, arg: &Rc<Arg>, value: RichValue) {
        self.kvs.push((Rc::clone(arg), value));
    }

    fn pop(&mut self) -> PositionedToken {
        self.consumed += 1;
        self.toks.pop_front().unwrap()
    }

    /// Consume everything left, rendered back to plain words.
    fn slurp_rest(&mut self) -> Vec<Value> {
        let mut words = vec![];
        while let Some(tok) = self.toks.pop_front() {
            self.consumed += 1;
            match tok.token {
                Token::Eoa(rest) => {
                    words.push(Value::Str("--".into()));
                    words.extend(rest.into_iter().map(Value::Str));
                }
                ref t => words.push(Value::Str(t.render())),
            }
        }
        words
    }
}

#[derive(Clone, Debug)]
struct MFail {
    fatal: bool,
    consumed: usize,
    err: MatchError,
}

type MResult = Result<MState, MFail>;

#[derive(Default)]
struct FailTracker {
    best: Option<MFail>,
}

impl FailTracker {
    fn note(&mut self, f: MFail) {
        let better = match self.best {
            None => true,
            Some(ref b) => f.consumed > b.consumed,
        };
        if better {
            self.best = Some(f);
        }
    }
}

/// Match argv tokens against the prepared branches and return the winning
/// branch index plus its emissions.
pub fn match_argv(
    prepared: &Prepared,
    toks: Vec<PositionedToken>,
    opts: &MatchOpts,
) -> Result<(usize, Vec<KeyValue>), MatchError> {
    let m = Matcher { opts, prepared };
    m.run(toks)
}

struct Matcher<'a> {
    opts: &'a MatchOpts,
    prepared: &'a Prepared,
}

impl<'a> Matcher<'a> {
    fn run(&self, toks: Vec<PositionedToken>) -> Result<(usize, Vec<KeyValue>), MatchError> {
        let init = MState {
            toks: VecDeque::from(toks),
            kvs: vec![],
            consumed: 0,
            omitted: 0,
            terminated: false,
        };
        let mut fails = FailTracker::default();
        let mut best: Option<(usize, MState)> = None;
        for (i, pats) in self.prepared.branches.iter().enumerate() {
            // A fatal failure short-circuits the whole branch choice.
            let states = self
                .seq_states(pats, init.clone(), false, &mut fails)
                .map_err(|f| f.err)?;
            for st in states {
                let replace = match best {
                    None => true,
                    Some((_, ref b)) => {
                        st.consumed > b.consumed
                            || (st.consumed == b.consumed && st.omitted < b.omitted)
                    }
                };
                if replace {
                    best = Some((i, st));
                }
            }
        }
        match best {
            None => Err(fails.best.map(|f| f.err).unwrap_or_else(|| {
                MatchError::Generic("The arguments did not match any usage pattern.".into())
            })),
            Some((i, st)) => {
                let st = self.consume_trailing(st)?;
                Ok((i, st.kvs))
            }
        }
    }

    /// All the ways `pats` can match a prefix of the input. Each returned
    /// state is fully finalized (omissions processed, fallbacks emitted).
    fn seq_states(
        &self,
        pats: &[Pattern],
        init: MState,
        strict: bool,
        fails: &mut FailTracker,
    ) -> Result<Vec<MState>, MFail> {
        let mut out = vec![];
        self.seq_step(
            pats,
            vec![0; pats.len()],
            vec![false; pats.len()],
            init,
            strict,
            &mut out,
            fails,
        )?;
        dedup_states(&mut out);
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn seq_step(
        &self,
        pats: &[Pattern],
        counts: Vec<usize>,
        closed: Vec<bool>,
        st: MState,
        strict: bool,
        out: &mut Vec<MState>,
        fails: &mut FailTracker,
    ) -> Result<(), MFail> {
        // Stopping here is always one of the alternatives; later patterns
        // are omitted (or fail) and leftover input stays for the caller.
        match self.finalize(pats, &counts, st.clone()) {
            Ok(fin) => out.push(fin),
            Err(f) => fails.note(f),
        }
        if st.terminated || st.toks.is_empty() {
            return Ok(());
        }

        let open = |i: usize| !closed[i] && (counts[i] == 0 || pats[i].repeatable());

        // In strict (positional) order only the first open pattern may
        // match; in free order every open option pattern may, plus the
        // first open fixed one.
        let first_open_fixed = (0..pats.len()).find(|&i| open(i) && (strict || pats[i].fixed()));
        let eligible: Vec<usize> = (0..pats.len())
            .filter(|&i| {
                if strict {
                    Some(i) == first_open_fixed
                } else {
                    open(i) && (!pats[i].fixed() || Some(i) == first_open_fixed)
                }
            })
            .collect();

        for i in eligible {
            let states = self.pattern_states(&pats[i], &st, strict, fails)?;
            for st2 in states {
                if st2.measure() >= st.measure() && !st2.terminated {
                    // No progress; indistinguishable from omitting it.
                    continue;
                }
                let mut counts2 = counts.clone();
                counts2[i] += 1;
                self.seq_step(pats, counts2, closed.clone(), st2, strict, out, fails)?;
            }
        }

        // Unknown options may be collected mid-parse.
        if self.opts.allow_unknown {
            if let Some(st2) = self.collect_unknown_head(&st) {
                self.seq_step(pats, counts.clone(), closed.clone(), st2, strict, out, fails)?;
            }
        }

        // Passing over the first open fixed pattern lets the one after it
        // have a go; whether skipping was legal is checked at finalize.
        if let Some(i) = first_open_fixed {
            let mut closed2 = closed;
            closed2[i] = true;
            self.seq_step(pats, counts, closed2, st, strict, out, fails)?;
        }
        Ok(())
    }

    /// Process the patterns never matched: emit fallbacks, count omissions,
    /// fail on a required pattern with neither.
    fn finalize(&self, pats: &[Pattern], counts: &[usize], mut st: MState) -> MResult {
        if st.terminated {
            return Ok(st);
        }
        for (i, p) in pats.iter().enumerate() {
            if counts[i] == 0 {
                self.omit(p, &mut st)?;
            }
        }
        Ok(st)
    }

    fn omit(&self, p: &Pattern, st: &mut MState) -> Result<(), MFail> {
        match *p {
            Pattern::Leaf(ref l) => {
                if let Some(ref fb) = l.arg.fallback {
                    st.emit(&l.arg, fb.clone());
                    st.omitted += 1;
                    Ok(())
                } else if l.optional {
                    st.omitted += 1;
                    Ok(())
                } else {
                    Err(MFail {
                        fatal: false,
                        consumed: st.consumed,
                        err: MatchError::MissingArgument(format!(
                            "Missing required argument: '{}'.",
                            l.arg.display()
                        )),
                    })
                }
            }
            Pattern::Choice(ref c) => {
                let omissible_branch = c
                    .branches
                    .iter()
                    .find(|b| b.iter().all(Pattern::omissible));
                match omissible_branch {
                    Some(branch) => {
                        for p in branch {
                            self.omit(p, st)?;
                        }
                        Ok(())
                    }
                    None if c.optional => {
                        st.omitted += 1;
                        Ok(())
                    }
                    None => Err(MFail {
                        fatal: false,
                        consumed: st.consumed,
                        err: MatchError::MissingArgument(format!(
                            "Missing required argument: '{}'.",
                            p.leftmost()
                        )),
                    }),
                }
            }
        }
    }

    /// One match step of a single pattern: a leaf consumes input directly,
    /// a choice tries each of its branches.
    fn pattern_states(
        &self,
        p: &Pattern,
        st: &MState,
        outer_strict: bool,
        fails: &mut FailTracker,
    ) -> Result<Vec<MState>, MFail> {
        match *p {
            Pattern::Leaf(ref l) => match self.match_leaf(l, st.clone()) {
                Ok(st2) => Ok(vec![st2]),
                Err(f) if f.fatal => Err(f),
                Err(f) => {
                    fails.note(f);
                    Ok(vec![])
                }
            },
            Pattern::Choice(ref c) => {
                // Inside a fixed group everything matches in written order
                // unless lax placement was asked for; pure-option groups
                // (and any group under lax placement) use free order.
                let strict = (c.fixed && !self.opts.lax_placement) || outer_strict;
                let mut states = vec![];
                for b in &c.branches {
                    states.extend(self.seq_states(b, st.clone(), strict, fails)?);
                }
                Ok(states)
            }
        }
    }

    fn match_leaf(&self, l: &LeafPattern, mut st: MState) -> MResult {
        let head = match st.toks.front() {
            None => {
                return Err(self.fail(&st, "Unexpected end of arguments."));
            }
            Some(head) => head.clone(),
        };
        let arg = &l.arg;
        let shape = arg.shape.as_ref().expect("synthetic arg in a pattern");
        match *shape {
            SolvedArg::Command { ref name, .. } => match head.token {
                Token::Lit(ref s) if s == name => {
                    st.pop();
                    if arg.can_term {
                        let rest = st.slurp_rest();
                        st.emit(arg, RichValue::from_argv(Value::List(rest)));
                        st.terminated = true;
                    } else {
                        st.emit(arg, RichValue::from_argv(Value::Bool(true)));
                    }
                    Ok(st)
                }
                _ => Err(self.fail(&st, &format!("Expected the command '{name}'."))),
            },
            SolvedArg::Positional { .. } => {
                if arg.can_term {
                    let rest = st.slurp_rest();
                    st.emit(arg, RichValue::from_argv(Value::List(rest)));
                    st.terminated = true;
                    return Ok(st);
                }
                match head.token {
                    Token::Lit(ref s) => {
                        let value = Value::Str(s.clone());
                        st.pop();
                        st.emit(arg, RichValue::from_argv(value));
                        Ok(st)
                    }
                    _ => Err(self.fail(
                        &st,
                        &format!("Expected a positional argument {}.", arg.display()),
                    )),
                }
            }
            SolvedArg::Eoa => match head.token {
                Token::Eoa(ref rest) => {
                    let words = rest.iter().cloned().map(Value::Str).collect();
                    st.pop();
                    st.emit(arg, RichValue::from_argv(Value::List(words)));
                    Ok(st)
                }
                _ => Err(self.fail(&st, "Expected '--'.")),
            },
            SolvedArg::Stdin => match head.token {
                Token::Stdin => {
                    st.pop();
                    st.emit(arg, RichValue::from_argv(Value::Bool(true)));
                    Ok(st)
                }
                _ => Err(self.fail(&st, "Expected '-'.")),
            },
            SolvedArg::Option { .. } => self.match_option(l, st, head),
        }
    }

    fn match_option(&self, l: &LeafPattern, mut st: MState, head: PositionedToken) -> MResult {
        let arg = Rc::clone(&l.arg);
        let oarg = arg.option_argument().cloned();
        let matched = match head.token {
            Token::LOpt(ref name, ref explicit) => {
                let longs = arg.long_names();
                if longs.iter().any(|n| n == name) {
                    match (explicit, &oarg) {
                        (&Some(ref v), &Some(_)) => {
                            st.pop();
                            st.emit(&arg, RichValue::from_argv(Value::Str(v.clone())));
                            true
                        }
                        (&Some(ref v), &None) => {
                            return Err(self.fatal(
                                &st,
                                MatchError::OptionTakesNoArgument(format!(
                                    "The option '--{name}' takes no argument, but was \
                                     given '{v}'."
                                )),
                            ))
                        }
                        (&None, &None) => {
                            st.pop();
                            st.emit(&arg, RichValue::from_argv(Value::Bool(true)));
                            true
                        }
                        (&None, &Some(ref oa)) => {
                            st.pop();
                            self.bind_trailing_value(l, &arg, oa, &mut st)?;
                            true
                        }
                    }
                } else if explicit.is_none() && oarg.is_some() {
                    // Prefix subsumption: `--input/dev/null` against
                    // `--input` binds the suffix as the value.
                    match longs
                        .iter()
                        .find(|n| name.starts_with(n.as_str()) && name.len() > n.len())
                    {
                        Some(n) => {
                            let suffix = name[n.len()..].to_string();
                            st.pop();
                            st.emit(&arg, RichValue::from_argv(Value::Str(suffix)));
                            true
                        }
                        None => false,
                    }
                } else {
                    false
                }
            }
            Token::SOpt(head_char, ref tail, ref explicit) => {
                if !arg.short_chars().contains(&head_char) {
                    false
                } else {
                    match oarg {
                        None => {
                            if tail.is_empty() {
                                if let Some(ref v) = *explicit {
                                    return Err(self.fatal(
                                        &st,
                                        MatchError::OptionTakesNoArgument(format!(
                                            "The option '-{head_char}' takes no argument, \
                                             but was given '{v}'."
                                        )),
                                    ));
                                }
                                st.pop();
                            } else {
                                // Unstack: the remaining characters go back
                                // onto the token stream.
                                let mut chars = tail.chars();
                                let next = chars.next().unwrap();
                                let tok = PositionedToken {
                                    token: Token::SOpt(next, chars.collect(), explicit.clone()),
                                    source: head.source.clone(),
                                    id: head.id,
                                };
                                st.toks.pop_front();
                                st.toks.push_front(tok);
                            }
                            st.emit(&arg, RichValue::from_argv(Value::Bool(true)));
                            true
                        }
                        Some(ref oa) => {
                            if !tail.is_empty() {
                                let mut value = tail.clone();
                                if let Some(ref v) = *explicit {
                                    value.push('=');
                                    value.push_str(v);
                                }
                                st.pop();
                                st.emit(&arg, RichValue::from_argv(Value::Str(value)));
                            } else if let Some(ref v) = *explicit {
                                st.pop();
                                st.emit(&arg, RichValue::from_argv(Value::Str(v.clone())));
                            } else {
                                st.pop();
                                self.bind_trailing_value(l, &arg, oa, &mut st)?;
                            }
                            true
                        }
                    }
                }
            }
            _ => false,
        };
        if !matched {
            return Err(self.fail(
                &st,
                &format!("Expected the option '{}'.", arg.display()),
            ));
        }
        if arg.can_term && !st.terminated {
            // Stop-at: drop the option's own value and collect the rest of
            // the input verbatim under it.
            st.kvs.pop();
            let rest = st.slurp_rest();
            st.emit(&arg, RichValue::from_argv(Value::List(rest)));
            st.terminated = true;
        }
        Ok(st)
    }

    /// The option consumed its own token but still needs a value: take the
    /// following literal (a run of them when repeatable), fall back to a
    /// bare `true` when the argument is optional, or die.
    fn bind_trailing_value(
        &self,
        l: &LeafPattern,
        arg: &Rc<Arg>,
        oa: &OptionArgument,
        st: &mut MState,
    ) -> Result<(), MFail> {
        let is_lit = |tok: Option<&PositionedToken>| {
            matches!(tok.map(|t| &t.token), Some(&Token::Lit(_)))
        };
        if is_lit(st.toks.front()) {
            let first = match st.pop().token {
                Token::Lit(s) => s,
                _ => unreachable!(),
            };
            if l.repeatable {
                let mut values = vec![Value::Str(first)];
                while is_lit(st.toks.front()) {
                    if let Token::Lit(s) = st.pop().token {
                        values.push(Value::Str(s));
                    }
                }
                st.emit(arg, RichValue::from_argv(Value::List(values)));
            } else {
                st.emit(arg, RichValue::from_argv(Value::Str(first)));
            }
            Ok(())
        } else if oa.optional {
            st.emit(arg, RichValue::from_argv(Value::Bool(true)));
            Ok(())
        } else {
            Err(self.fatal(
                st,
                MatchError::OptionRequiresArgument(format!(
                    "The option '{}' requires an argument '{}'.",
                    arg.display(),
                    oa.name
                )),
            ))
        }
    }

    /// Capture the head token under the synthetic `?` (or `--`) key if it
    /// is option-shaped and spelled nowhere in the spec.
    fn collect_unknown_head(&self, st: &MState) -> Option<MState> {
        let known = &self.prepared.known;
        let head = st.toks.front()?;
        match head.token {
            Token::LOpt(ref name, _) if !known.longs.contains(name) => {
                let mut st = st.clone();
                let tok = st.pop();
                st.emit(
                    &self.prepared.unknown,
                    RichValue::from_argv(Value::Str(tok.token.render())),
                );
                Some(st)
            }
            Token::SOpt(c, _, _) if !known.shorts.contains(&c) => {
                let mut st = st.clone();
                let tok = st.pop();
                st.emit(
                    &self.prepared.unknown,
                    RichValue::from_argv(Value::Str(tok.token.render())),
                );
                Some(st)
            }
            Token::Eoa(ref rest) if !known.has_eoa => {
                let mut st = st.clone();
                let words = rest.iter().cloned().map(Value::Str).collect();
                st.pop();
                st.emit(
                    &self.prepared.unknown_eoa,
                    RichValue::from_argv(Value::List(words)),
                );
                Some(st)
            }
            _ => None,
        }
    }

    /// After the winning branch, leftovers must be consumable under the
    /// unknown-token policy or the parse fails.
    fn consume_trailing(&self, mut st: MState) -> Result<MState, MatchError> {
        loop {
            if st.toks.is_empty() {
                return Ok(st);
            }
            if self.opts.allow_unknown {
                if let Some(st2) = self.collect_unknown_head(&st) {
                    st = st2;
                    continue;
                }
            }
            let head = st.toks.front().unwrap();
            let known = &self.prepared.known;
            return Err(match head.token {
                Token::LOpt(ref name, _) if !known.longs.contains(name) => {
                    self.unknown_flag_error(&format!("--{name}"))
                }
                Token::SOpt(c, _, _) if !known.shorts.contains(&c) => {
                    self.unknown_flag_error(&format!("-{c}"))
                }
                Token::Lit(ref s) => match self.suggest(s) {
                    Some(best) => MatchError::UnexpectedInput(format!(
                        "Unknown command: '{s}'. Did you mean '{best}'?"
                    )),
                    None => {
                        MatchError::UnexpectedInput(format!("Unexpected argument: '{s}'."))
                    }
                },
                ref tok => MatchError::UnexpectedInput(format!(
                    "Unexpected input: '{}'.",
                    tok.render()
                )),
            });
        }
    }

    fn unknown_flag_error(&self, written: &str) -> MatchError {
        match self.suggest(written) {
            Some(best) => MatchError::UnexpectedInput(format!(
                "Unknown flag: '{written}'. Did you mean '{best}'?"
            )),
            None => MatchError::UnexpectedInput(format!("Unknown flag: '{written}'")),
        }
    }

    /// A close long flag or command name, by edit distance.
    fn suggest(&self, written: &str) -> Option<String> {
        let known = &self.prepared.known;
        let mut best: Option<(usize, String)> = None;
        let candidates = known
            .longs
            .iter()
            .map(|n| format!("--{n}"))
            .chain(known.commands.iter().cloned());
        for cand in candidates {
            let dist = levenshtein(written, &cand);
            if dist < 3 && best.as_ref().map_or(true, |&(min, _)| dist < min) {
                best = Some((dist, cand));
            }
        }
        best.map(|(_, name)| name)
    }

    fn fail(&self, st: &MState, msg: &str) -> MFail {
        MFail {
            fatal: false,
            consumed: st.consumed,
            err: MatchError::Generic(msg.into()),
        }
    }

    fn fatal(&self, st: &MState, err: MatchError) -> MFail {
        MFail {
            fatal: true,
            consumed: st.consumed,
            err,
        }
    }
}

/// Exploration revisits equivalent states; keep one of each.
fn dedup_states(states: &mut Vec<MState>) {
    let mut seen: Vec<(usize, usize, bool, Vec<(usize, RichValue)>)> = vec![];
    states.retain(|st| {
        let print: Vec<(usize, RichValue)> = st
            .kvs
            .iter()
            .map(|(arg, v)| (arg.id, v.clone()))
            .collect();
        let entry = (st.toks.len(), st.omitted, st.terminated, print);
        if seen.contains(&entry) {
            false
        } else {
            seen.push(entry);
            true
        }
    });
}
