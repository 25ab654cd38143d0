//! Rewriting the usage-stage layout into a solved layout.
//!
//! Solving fuses the usage section with the option descriptions: short
//! stacks are expanded, option arguments are bound (by subsumption or by
//! slurping the adjacent positional), `[options]`-style references are
//! inlined and branches emptied by the rewrite are pruned. The output
//! contains only [`SolvedArg`] leaves.

use std::collections::{HashMap, HashSet};

use crate::errors::{Error, Result};
use crate::spec::{
    Branch, Description, Key, Layout, OptionAlias, OptionArgument, Section, SolvedArg, Spec,
    UsageArg,
};

/// Solve a parsed specification.
///
/// `smart_options` enables the heuristic that binds an undescribed option to
/// a positional when the two are the sole members of a group (`[-f FILE]`).
pub fn solve(spec: &Spec<UsageArg>, smart_options: bool) -> Result<Spec<SolvedArg>> {
    check_alias_ambiguity(&spec.sections)?;

    let solver = Solver {
        spec,
        smart: smart_options,
    };
    let mut layouts = vec![];
    for branch in &spec.layouts {
        let branch_aliases = solver.branch_aliases(branch);
        let solved = solver.solve_branch(branch, &branch_aliases, false)?;
        // Only branches *emptied by solving* are pruned; a usage line that
        // names nothing but the program legitimately matches the empty argv.
        if solved.is_empty() && !branch.is_empty() {
            continue;
        }
        layouts.push(solved);
    }
    if layouts.is_empty() {
        return Err(Error::Solve(
            "No usage branch survived solving; the usage section is empty.".into(),
        ));
    }

    let mut solved = Spec {
        program: spec.program.clone(),
        layouts,
        sections: spec.sections.clone(),
        help_text: spec.help_text.clone(),
        short_help: spec.short_help.clone(),
    };
    propagate_repeats(&mut solved);
    Ok(solved)
}

/// Two descriptions claiming the same alias cannot be reconciled.
fn check_alias_ambiguity(sections: &[Section]) -> Result<()> {
    let mut seen: HashSet<&OptionAlias> = HashSet::new();
    for section in sections {
        for desc in &section.descriptions {
            for alias in &desc.aliases {
                if !seen.insert(alias) {
                    err!(
                        Error::Solve,
                        "The option '{alias}' is described more than once."
                    )
                }
            }
        }
    }
    Ok(())
}

struct Solver<'a> {
    spec: &'a Spec<UsageArg>,
    smart: bool,
}

impl<'a> Solver<'a> {
    fn desc_for(&self, alias: &OptionAlias) -> Option<&'a Description> {
        self.spec.description_of(alias)
    }

    /// Every alias referenced anywhere in a top-level branch, expanded to
    /// full alias sets through the descriptions. Used to avoid duplicating
    /// an option when a reference is inlined into the same branch.
    fn branch_aliases(&self, branch: &[Layout<UsageArg>]) -> HashSet<OptionAlias> {
        fn walk(layouts: &[Layout<UsageArg>], found: &mut Vec<OptionAlias>) {
            for layout in layouts {
                match *layout {
                    Layout::Group { ref branches, .. } => {
                        for b in branches {
                            walk(b, found);
                        }
                    }
                    Layout::Elem(UsageArg::Option { ref name, .. }) => {
                        found.push(OptionAlias::Long(name.clone()));
                    }
                    Layout::Elem(UsageArg::OptionStack { ref stack, .. }) => {
                        found.extend(stack.iter().map(|&c| OptionAlias::Short(c)));
                    }
                    Layout::Elem(_) => {}
                }
            }
        }
        let mut found = vec![];
        walk(branch, &mut found);
        let mut set = HashSet::new();
        for alias in found {
            if let Some(desc) = self.desc_for(&alias) {
                set.extend(desc.aliases.iter().cloned());
            }
            set.insert(alias);
        }
        set
    }

    fn solve_branch(
        &self,
        branch: &[Layout<UsageArg>],
        branch_aliases: &HashSet<OptionAlias>,
        in_group: bool,
    ) -> Result<Branch<SolvedArg>> {
        let mut out: Branch<SolvedArg> = vec![];
        let mut i = 0;
        while i < branch.len() {
            let rest = &branch[i + 1..];
            // `[-f FILE]`: an option and a positional as the sole members of
            // a group may be fused even without a description.
            let smart_pair = self.smart && in_group && i == 0 && branch.len() == 2;
            match branch[i] {
                Layout::Group {
                    optional,
                    repeatable,
                    ref branches,
                } => {
                    let mut solved_branches = vec![];
                    for b in branches {
                        let sb = self.solve_branch(b, branch_aliases, true)?;
                        if !sb.is_empty() {
                            solved_branches.push(sb);
                        }
                    }
                    if !solved_branches.is_empty() {
                        out.push(Layout::Group {
                            optional,
                            repeatable,
                            branches: solved_branches,
                        });
                    }
                    i += 1;
                }
                Layout::Elem(UsageArg::Command {
                    ref name,
                    repeatable,
                }) => {
                    out.push(Layout::Elem(SolvedArg::Command {
                        name: name.clone(),
                        repeatable,
                    }));
                    i += 1;
                }
                Layout::Elem(UsageArg::Positional {
                    ref name,
                    repeatable,
                }) => {
                    out.push(Layout::Elem(SolvedArg::Positional {
                        name: name.clone(),
                        repeatable,
                    }));
                    i += 1;
                }
                Layout::Elem(UsageArg::Eoa) => {
                    out.push(Layout::Elem(SolvedArg::Eoa));
                    i += 1;
                }
                Layout::Elem(UsageArg::Stdin) => {
                    out.push(Layout::Elem(SolvedArg::Stdin));
                    i += 1;
                }
                Layout::Elem(UsageArg::Reference(ref name)) => {
                    out.extend(self.inline_reference(name, branch_aliases)?);
                    i += 1;
                }
                Layout::Elem(UsageArg::Option {
                    ref name,
                    ref arg,
                    repeatable,
                }) => {
                    let (elem, consumed) =
                        self.solve_long(name, arg.as_ref(), repeatable, rest, smart_pair)?;
                    out.push(elem);
                    i += 1 + consumed;
                }
                Layout::Elem(UsageArg::OptionStack {
                    ref stack,
                    ref arg,
                    repeatable,
                }) => {
                    let (elems, consumed) =
                        self.solve_stack(stack, arg.as_ref(), repeatable, rest, smart_pair)?;
                    out.extend(elems);
                    i += 1 + consumed;
                }
            }
        }
        Ok(out)
    }

    fn solve_long(
        &self,
        name: &str,
        usage_arg: Option<&OptionArgument>,
        repeatable: bool,
        rest: &[Layout<UsageArg>],
        smart_pair: bool,
    ) -> Result<(Layout<SolvedArg>, usize)> {
        let alias = OptionAlias::Long(name.into());
        let desc_arg = self.desc_for(&alias).and_then(|d| d.arg.clone());
        let (arg, consumed) =
            self.bind_argument(&alias, usage_arg, desc_arg, rest, smart_pair)?;
        let repeatable = repeatable || consumed_repeats(rest, consumed);
        Ok((
            Layout::Elem(SolvedArg::Option {
                alias,
                arg,
                repeatable,
            }),
            consumed,
        ))
    }

    fn solve_stack(
        &self,
        stack: &[char],
        usage_arg: Option<&OptionArgument>,
        repeatable: bool,
        rest: &[Layout<UsageArg>],
        smart_pair: bool,
    ) -> Result<(Vec<Layout<SolvedArg>>, usize)> {
        let written: String = stack.iter().collect();
        let mut out = vec![];
        for (i, &c) in stack.iter().enumerate() {
            let alias = OptionAlias::Short(c);
            let desc_arg = self.desc_for(&alias).and_then(|d| d.arg.clone());
            let is_last = i + 1 == stack.len();
            if !is_last {
                let restchars: String = stack[i + 1..].iter().collect();
                match desc_arg {
                    Some(da) if da.answers_to(&restchars) => {
                        // Subsumption: `-abcdFILE` with `-d FILE` described
                        // consumes the trailing characters as the argument.
                        out.push(opt(alias, Some(da), repeatable));
                        return Ok((out, 0));
                    }
                    Some(da) if !da.optional => {
                        err!(
                            Error::Solve,
                            "Option '-{c}' requires argument '{}', but is stacked \
                             in '-{written}' before its last position.",
                            da.name
                        )
                    }
                    da => out.push(opt(alias, da, false)),
                }
            } else {
                let (arg, consumed) =
                    self.bind_argument(&alias, usage_arg, desc_arg, rest, smart_pair)?;
                let repeatable = repeatable || consumed_repeats(rest, consumed);
                out.push(opt(alias, arg, repeatable));
                return Ok((out, consumed));
            }
        }
        Ok((out, 0))
    }

    /// Reconcile what the usage wrote with what the description demands,
    /// slurping the adjacent layout when the description requires an
    /// argument the usage did not spell out.
    fn bind_argument(
        &self,
        alias: &OptionAlias,
        usage_arg: Option<&OptionArgument>,
        desc_arg: Option<OptionArgument>,
        rest: &[Layout<UsageArg>],
        smart_pair: bool,
    ) -> Result<(Option<OptionArgument>, usize)> {
        match (usage_arg, desc_arg) {
            (Some(ua), Some(da)) => {
                if !da.answers_to(&ua.name) {
                    err!(
                        Error::Solve,
                        "Usage writes '{alias}' with argument '{}', but its \
                         description names the argument '{}'.",
                        ua.name,
                        da.name
                    )
                }
                let optional = ua.optional || da.optional;
                Ok((Some(OptionArgument::new(&da.name, optional)), 0))
            }
            (Some(ua), None) => {
                if self.desc_for(alias).is_some() {
                    err!(
                        Error::Solve,
                        "Usage writes '{alias}' with argument '{}', but its \
                         description takes no argument.",
                        ua.name
                    )
                }
                Ok((Some(ua.clone()), 0))
            }
            (None, Some(da)) => {
                if da.optional {
                    return Ok((Some(da), 0));
                }
                match adjacent_argument(rest) {
                    Some(adj) => {
                        if !da.answers_to(adj.placeholder) {
                            err!(
                                Error::Solve,
                                "Option '{alias}' is described with argument '{}', \
                                 but is followed by '{}' in the usage section.",
                                da.name,
                                adj.placeholder
                            )
                        }
                        Ok((Some(OptionArgument::new(&da.name, adj.wrapped)), 1))
                    }
                    None => {
                        err!(
                            Error::Solve,
                            "Option '{alias}' requires argument '{}', but the \
                             usage section provides none.",
                            da.name
                        )
                    }
                }
            }
            (None, None) => {
                if smart_pair {
                    if let Some(adj) = adjacent_argument(rest) {
                        return Ok((
                            Some(OptionArgument::new(adj.placeholder, adj.wrapped)),
                            1,
                        ));
                    }
                }
                Ok((None, 0))
            }
        }
    }

    fn inline_reference(
        &self,
        name: &str,
        branch_aliases: &HashSet<OptionAlias>,
    ) -> Result<Vec<Layout<SolvedArg>>> {
        let section = self
            .spec
            .sections
            .iter()
            .find(|s| s.heading == name)
            .or_else(|| self.spec.sections.iter().find(|s| s.heading.contains(name)));
        let section = match section {
            None => {
                err!(
                    Error::Solve,
                    "The usage section references '[{name}]', but no such \
                     description section exists."
                )
            }
            Some(section) => section,
        };
        let mut out = vec![];
        for desc in &section.descriptions {
            if desc.aliases.iter().any(|a| branch_aliases.contains(a)) {
                continue;
            }
            let leaf = opt(desc.canonical().clone(), desc.arg.clone(), desc.repeatable);
            out.push(Layout::Group {
                optional: true,
                repeatable: desc.repeatable,
                branches: vec![vec![leaf]],
            });
        }
        Ok(out)
    }
}

fn opt(alias: OptionAlias, arg: Option<OptionArgument>, repeatable: bool) -> Layout<SolvedArg> {
    Layout::Elem(SolvedArg::Option {
        alias,
        arg,
        repeatable,
    })
}

struct Adjacent<'a> {
    placeholder: &'a str,
    /// Whether the argument sat inside an optional group (`-o [FILE]`).
    wrapped: bool,
}

/// The layout an option may slurp as its argument: a positional or command
/// leaf, possibly wrapped in a single-branch, single-element optional group.
fn adjacent_argument(rest: &[Layout<UsageArg>]) -> Option<Adjacent<'_>> {
    fn leaf_name(layout: &Layout<UsageArg>) -> Option<&str> {
        match *layout {
            Layout::Elem(UsageArg::Positional { ref name, .. })
            | Layout::Elem(UsageArg::Command { ref name, .. }) => Some(name),
            _ => None,
        }
    }
    match rest.first()? {
        &Layout::Group {
            optional: true,
            ref branches,
            ..
        } if branches.len() == 1 && branches[0].len() == 1 => {
            leaf_name(&branches[0][0]).map(|placeholder| Adjacent {
                placeholder,
                wrapped: true,
            })
        }
        layout => leaf_name(layout).map(|placeholder| Adjacent {
            placeholder,
            wrapped: false,
        }),
    }
}

/// Whether a slurped adjacent layout was marked repeatable, which makes the
/// option it now belongs to repeatable as well.
fn consumed_repeats(rest: &[Layout<UsageArg>], consumed: usize) -> bool {
    if consumed == 0 {
        return false;
    }
    match rest.first() {
        Some(Layout::Elem(UsageArg::Positional { repeatable, .. }))
        | Some(Layout::Elem(UsageArg::Command { repeatable, .. }))
        | Some(Layout::Group { repeatable, .. }) => *repeatable,
        _ => false,
    }
}

/// Make every option leaf's repeat flag the OR of the flags across all
/// leaves sharing its key, its description and its enclosing groups.
fn propagate_repeats(spec: &mut Spec<SolvedArg>) {
    fn collect(
        layouts: &[Layout<SolvedArg>],
        group_rep: bool,
        spec: &Spec<SolvedArg>,
        reps: &mut HashMap<Key, bool>,
    ) {
        for layout in layouts {
            match *layout {
                Layout::Group {
                    repeatable,
                    ref branches,
                    ..
                } => {
                    for b in branches {
                        collect(b, group_rep || repeatable, spec, reps);
                    }
                }
                Layout::Elem(ref arg) => {
                    if let SolvedArg::Option { ref alias, .. } = *arg {
                        let desc = spec.description_of(alias);
                        let key = Key::of(arg, desc);
                        let desc_rep = desc.map_or(false, |d| d.repeatable);
                        let rep = arg.repeatable() || group_rep || desc_rep;
                        let entry = reps.entry(key).or_insert(false);
                        *entry = *entry || rep;
                    }
                }
            }
        }
    }

    fn apply(
        layouts: &mut [Layout<SolvedArg>],
        spec: &Spec<SolvedArg>,
        reps: &HashMap<Key, bool>,
    ) {
        for layout in layouts {
            match *layout {
                Layout::Group {
                    ref mut branches, ..
                } => {
                    for b in branches {
                        apply(b, spec, reps);
                    }
                }
                Layout::Elem(ref mut arg) => {
                    if let SolvedArg::Option { ref alias, .. } = *arg {
                        let key = Key::of(arg, spec.description_of(alias));
                        if let Some(&rep) = reps.get(&key) {
                            arg.set_repeatable(rep);
                        }
                    }
                }
            }
        }
    }

    let mut reps = HashMap::new();
    for branch in &spec.layouts {
        collect(branch, false, spec, &mut reps);
    }
    let snapshot = spec.clone();
    for branch in &mut spec.layouts {
        apply(branch, &snapshot, &reps);
    }
}

#[cfg(test)]
mod tests {
    use super::solve;
    use crate::parse::parse;
    use crate::scan::scan;
    use crate::spec::{Layout, OptionAlias, SolvedArg, Spec};

    fn solved(doc: &str) -> Spec<SolvedArg> {
        solve(&parse(&scan(doc).unwrap()).unwrap(), false).unwrap()
    }

    fn flat(spec: &Spec<SolvedArg>) -> Vec<&SolvedArg> {
        fn walk<'a>(layouts: &'a [Layout<SolvedArg>], out: &mut Vec<&'a SolvedArg>) {
            for layout in layouts {
                match *layout {
                    Layout::Group { ref branches, .. } => {
                        for b in branches {
                            walk(b, out);
                        }
                    }
                    Layout::Elem(ref arg) => out.push(arg),
                }
            }
        }
        let mut out = vec![];
        for b in &spec.layouts {
            walk(b, &mut out);
        }
        out
    }

    #[test]
    fn stacks_expand_per_character() {
        let spec = solved("usage: prog -abc\n");
        let leaves = flat(&spec);
        assert_eq!(leaves.len(), 3);
        match leaves[0] {
            SolvedArg::Option { alias, .. } => assert_eq!(*alias, OptionAlias::Short('a')),
            other => panic!("not an option: {other:?}"),
        }
    }

    #[test]
    fn trailing_characters_subsume_the_placeholder() {
        let spec = solved(
            "usage: prog -abcdFILE\n\noptions:\n  -d FILE  Output file.\n",
        );
        let leaves = flat(&spec);
        assert_eq!(leaves.len(), 4);
        match leaves[3] {
            SolvedArg::Option { alias, arg, .. } => {
                assert_eq!(*alias, OptionAlias::Short('d'));
                assert_eq!(arg.as_ref().unwrap().name, "FILE");
            }
            other => panic!("not an option: {other:?}"),
        }
    }

    #[test]
    fn adjacent_positional_is_slurped_when_described() {
        let spec = solved("usage: prog -i FILE\n\noptions:\n  -i FILE  Input.\n");
        let leaves = flat(&spec);
        assert_eq!(leaves.len(), 1);
        match leaves[0] {
            SolvedArg::Option { arg, .. } => {
                assert_eq!(arg.as_ref().unwrap().name, "FILE");
            }
            other => panic!("not an option: {other:?}"),
        }
    }

    #[test]
    fn placeholder_mismatch_fails() {
        let doc = "usage: prog -i <dir>\n\noptions:\n  -i FILE  Input.\n";
        assert!(solve(&parse(&scan(doc).unwrap()).unwrap(), false).is_err());
    }

    #[test]
    fn references_inline_undescribed_options_only_once(
    ) {
        let spec = solved(
            "usage: prog [options] -v\n\noptions:\n  -v  Chatty.\n  -q  Quiet.\n",
        );
        let leaves = flat(&spec);
        // -q from the reference plus the explicit -v; -v is not duplicated.
        assert_eq!(leaves.len(), 2);
    }

    #[test]
    fn unresolved_reference_fails() {
        let doc = "usage: prog [options]\n";
        assert!(solve(&parse(&scan(doc).unwrap()).unwrap(), false).is_err());
    }

    #[test]
    fn repeats_propagate_across_shared_keys() {
        let spec = solved(
            "usage: prog [-v]... [--verbose]\n\noptions:\n  -v, --verbose  Chatty.\n",
        );
        for leaf in flat(&spec) {
            assert!(leaf.repeatable(), "leaf {leaf:?} should repeat");
        }
    }

    #[test]
    fn solving_is_idempotent_in_shape() {
        let doc = "usage: prog -abcdFILE [options]\n\noptions:\n  -d FILE  F.\n  -z  Z.\n";
        let first = solved(doc);
        // A second pass over an already-solved tree has nothing left to
        // rewrite: no stacks, no references, identical leaves.
        let again = solved(doc);
        assert_eq!(first.layouts, again.layouts);
    }
}
