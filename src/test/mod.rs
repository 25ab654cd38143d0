use std::collections::HashMap;

use crate::value::Value;
use crate::{ArgvMap, Docopt};

pub fn compiled(doc: &str) -> Docopt {
    match Docopt::new(doc) {
        Err(err) => panic!("Invalid usage: {err}"),
        Ok(dopt) => dopt,
    }
}

pub fn get_args(doc: &str, argv: &[&'static str]) -> ArgvMap {
    get_args_with(doc, argv, |d| d)
}

pub fn get_args_with(
    doc: &str,
    argv: &[&'static str],
    conf: impl FnOnce(Docopt) -> Docopt,
) -> ArgvMap {
    let dopt = conf(compiled(doc));
    match dopt
        .argv(vec!["cmd"].iter().chain(argv.iter()).cloned())
        .parse()
    {
        Err(err) => panic!("{err}"),
        Ok(vals) => vals,
    }
}

pub fn map_from_alist(alist: Vec<(&'static str, Value)>) -> HashMap<String, Value> {
    alist.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub fn same_args(expected: &HashMap<String, Value>, got: &ArgvMap) {
    for (k, ve) in expected.iter() {
        match got.find(k) {
            None => panic!("EXPECTED has '{k}' but GOT does not."),
            Some(vg) => {
                assert!(ve == vg, "{k}: EXPECTED = '{ve:?}' != '{vg:?}' = GOT")
            }
        }
    }
    for (k, vg) in got.map.iter() {
        // The canonical key or any of its synonyms must be expected.
        let mut names = vec![k.clone()];
        for (from, to) in got.map.synonyms() {
            if to == k {
                names.push(from.clone());
            }
        }
        match names.iter().find_map(|n| expected.get(n)) {
            None => panic!("GOT has '{k}' but EXPECTED does not."),
            Some(ve) => assert!(vg == ve, "{k}: GOT = '{vg:?}' != '{ve:?}' = EXPECTED"),
        }
    }
}

/// A list of plain string values.
pub fn strs(xs: &[&str]) -> Value {
    Value::List(xs.iter().map(|s| Value::Str(s.to_string())).collect())
}

macro_rules! test_expect(
    ($name:ident, $doc:expr, $args:expr, $expected:expr) => (
        #[test]
        fn $name() {
            let vals = crate::test::get_args($doc, $args);
            let expected = crate::test::map_from_alist($expected);
            crate::test::same_args(&expected, &vals);
        }
    );
);

macro_rules! test_user_error(
    ($name:ident, $doc:expr, $args:expr) => (
        #[test]
        #[should_panic]
        fn $name() { crate::test::get_args($doc, $args); }
    );
);

test_expect!(
    test_command_and_positional_sharing_a_name,
    "Usage: prog file <file>",
    &["file", "file"],
    vec![
        ("file", Value::Bool(true)),
        ("<file>", Value::Str("file".to_string()))
    ]
);

test_expect!(
    test_explicit_value_with_spaces,
    "Usage: prog [options]

Options:
    --foo ARG   Foo foo.",
    &["--foo=a b"],
    vec![("--foo", Value::Str("a b".to_string()))]
);

mod scenarios;
mod suggestions;
mod testcases;
