//! "Did you mean" hints on rejected input.

use crate::{Docopt, Error, MatchError};

const DEPLOY: &str = "
Usage: shipit deploy [options] <target>
       shipit rollback <target>
       shipit [--dry-run]

Options:
  -p, --publish     Push the built artifacts.
  -g, --gate NAME   Require a release gate.
  -v, --verbose     Say more.
";

const TIDY: &str = "
Usage: branchkeeper tidy [options]

Options:
  -h, --help         Show this message.
  -p, --prune WHEN   Drop merged branches.
  -k, --keep NAME    Branches to keep.
";

/// Run `argv` against `doc` and return the unexpected-input message the
/// rejection carried.
fn rejection(doc: &str, argv: &[&str]) -> String {
    let dopt = Docopt::new(doc).unwrap_or_else(|err| panic!("Invalid usage: {err}"));
    let mut full = vec!["prog".to_string()];
    full.extend(argv.iter().map(|s| s.to_string()));
    match dopt.argv(full).parse() {
        Ok(_) => panic!("expected the arguments to be rejected"),
        Err(Error::WithProgramUsage(e, _)) => match *e {
            Error::Match(MatchError::UnexpectedInput(msg)) => msg,
            err => panic!("not an unexpected-input error: {err:?}"),
        },
        Err(err) => panic!("error without program usage: {err:?}"),
    }
}

#[test]
fn close_long_flag_is_suggested() {
    assert_eq!(
        rejection(DEPLOY, &["--publsh"]),
        "Unknown flag: '--publsh'. Did you mean '--publish'?"
    );
}

#[test]
fn unknown_short_flag_gets_no_guess() {
    assert_eq!(rejection(DEPLOY, &["-z"]), "Unknown flag: '-z'");
}

#[test]
fn typo_after_a_matched_flag_is_still_caught() {
    assert_eq!(
        rejection(DEPLOY, &["--dry-run", "--verbse"]),
        "Unknown flag: '--verbse'. Did you mean '--verbose'?"
    );
}

#[test]
fn bare_word_suggests_the_flag_spelling() {
    assert_eq!(
        rejection(TIDY, &["tidy", "prune"]),
        "Unknown command: 'prune'. Did you mean '--prune'?"
    );
}

#[test]
fn far_off_word_gets_no_guess() {
    assert_eq!(
        rejection(DEPLOY, &["flotsam"]),
        "Unexpected argument: 'flotsam'."
    );
}

#[test]
fn known_flag_outside_its_branch_is_rejected() {
    assert_eq!(
        rejection(DEPLOY, &["rollback", "prod", "-g", "x"]),
        "Unexpected input: '-g'."
    );
}
