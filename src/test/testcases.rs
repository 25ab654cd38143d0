use serde::Deserialize;

use crate::test::{get_args, get_args_with, map_from_alist, same_args, strs};
use crate::value::Value::{Bool, Int, Str};
use crate::{Docopt, Error, MatchError, Output};

test_expect!(test_empty_usage, "
Usage: prog
", &[], vec![]);

test_user_error!(test_unknown_long_flag, "
Usage: prog
", &["--xxx"]);

test_expect!(test_absent_flag_is_absent, "
Usage: prog [options]

Options:
  -a  All.
", &[], vec![]);

test_expect!(test_present_flag, "
Usage: prog [options]

Options:
  -a  All.
", &["-a"], vec![("-a", Bool(true))]);

test_user_error!(test_unknown_short_flag, "
Usage: prog [options]

Options:
  -a  All.
", &["-x"]);

test_expect!(test_synonyms_share_one_value, "
Usage: prog [options]

Options:
  -v, --verbose  Say more.
", &["--verbose"], vec![("-v", Bool(true)), ("--verbose", Bool(true))]);

test_expect!(test_short_option_argument_separate, "
Usage: prog [options]

Options:
  -o FILE  Output file.
", &["-o", "out.txt"], vec![("-o", Str("out.txt".into()))]);

test_expect!(test_short_option_argument_attached, "
Usage: prog [options]

Options:
  -o FILE  Output file.
", &["-oout.txt"], vec![("-o", Str("out.txt".into()))]);

test_expect!(test_long_option_argument_equals, "
Usage: prog [options]

Options:
  --out FILE  Output file.
", &["--out=x"], vec![("--out", Str("x".into()))]);

test_expect!(test_long_option_argument_separate, "
Usage: prog [options]

Options:
  --out FILE  Output file.
", &["--out", "x"], vec![("--out", Str("x".into()))]);

test_expect!(test_long_option_prefix_binds_suffix, "
Usage: prog [options]

Options:
  --input <file>  Input file.
", &["--input/dev/null"], vec![("--input", Str("/dev/null".into()))]);

test_expect!(test_positional, "
Usage: prog <x>
", &["a"], vec![("<x>", Str("a".into()))]);

test_user_error!(test_missing_positional, "
Usage: prog <x>
", &[]);

test_expect!(test_command_alternatives, "
Usage: prog (build | test)
", &["build"], vec![("build", Bool(true))]);

test_expect!(test_shorter_branch_wins, "
Usage: prog <a> <b>
       prog <a>
", &["x"], vec![("<a>", Str("x".into()))]);

test_expect!(test_stdin_dash, "
Usage: prog [-]
", &["-"], vec![("-", Bool(true))]);

test_expect!(test_stacked_shorts, "
Usage: prog [options]

Options:
  -a  A.
  -b  B.
  -c  C.
", &["-abc"], vec![("-a", Bool(true)), ("-b", Bool(true)), ("-c", Bool(true))]);

test_expect!(test_default_introduced, "
Usage: prog [options]

Options:
  -o, --out FILE  Output. [default: /dev/stdout]
", &[], vec![("-o", Str("/dev/stdout".into())), ("--out", Str("/dev/stdout".into()))]);

test_expect!(test_default_overridden_by_argv, "
Usage: prog [options]

Options:
  -o, --out FILE  Output. [default: /dev/stdout]
", &["-o", "x"], vec![("-o", Str("x".into())), ("--out", Str("x".into()))]);

test_expect!(test_repeated_flag_counts, "
Usage: prog [-v]...
", &["-v", "-v", "-v"], vec![("-v", Int(3))]);

test_expect!(test_repeatable_option_collects_values, "
Usage: prog [options]

Options:
  --add X ...  Things to add.
", &["--add=a", "--add=b"], vec![("--add", strs(&["a", "b"]))]);

test_expect!(test_repeatable_option_slurps_literal_run, "
Usage: prog [options]

Options:
  --pt POINT ...  Points.
", &["--pt", "1", "2"], vec![("--pt", strs(&["1", "2"]))]);

test_expect!(test_optional_option_argument_absent, "
Usage: prog [options]

Options:
  --color[=WHEN]  Colorize.
", &["--color"], vec![("--color", Bool(true))]);

test_expect!(test_optional_option_argument_present, "
Usage: prog [options]

Options:
  --color[=WHEN]  Colorize.
", &["--color=auto"], vec![("--color", Str("auto".into()))]);

test_user_error!(test_flag_given_an_argument, "
Usage: prog [options]

Options:
  -q  Quiet.
", &["-q=loud"]);

test_user_error!(test_option_missing_its_argument, "
Usage: prog [options]

Options:
  -o FILE  Output.
", &["-o"]);

#[test]
fn test_env_fallback_and_precedence() {
    let doc = "
Usage: prog [options]

Options:
  -o, --out FILE  Output. [env: OUT] [default: def]
";
    let vals = get_args_with(doc, &[], |d| d.env([("OUT", "from-env")]));
    same_args(
        &map_from_alist(vec![("--out", Str("from-env".into()))]),
        &vals,
    );

    let vals = get_args_with(doc, &["--out", "given"], |d| d.env([("OUT", "from-env")]));
    same_args(&map_from_alist(vec![("--out", Str("given".into()))]), &vals);

    let vals = get_args_with(doc, &[], |d| d.env([("UNRELATED", "x")]));
    same_args(&map_from_alist(vec![("--out", Str("def".into()))]), &vals);
}

#[test]
fn test_require_flags() {
    let doc = "
Usage: prog -a

Options:
  -a  All.
";
    let vals = get_args(doc, &[]);
    same_args(&map_from_alist(vec![]), &vals);

    let err = crate::test::compiled(doc)
        .argv(["cmd"])
        .require_flags(true)
        .parse()
        .unwrap_err();
    match err {
        Error::WithProgramUsage(e, _) => {
            assert!(matches!(*e, Error::Match(MatchError::MissingArgument(_))))
        }
        err => panic!("unexpected error: {err:?}"),
    }
}

#[test]
fn test_repeatable_options_config() {
    let doc = "
Usage: prog [options]

Options:
  -v  Verbose.
";
    let vals = get_args_with(doc, &["-v", "-v"], |d| d.repeatable_options(true));
    same_args(&map_from_alist(vec![("-v", Int(2))]), &vals);
}

#[test]
fn test_smart_options() {
    let doc = "
Usage: prog [-f FILE]
";
    let vals = get_args_with(doc, &["-f", "x"], |d| d.smart_options(true));
    same_args(&map_from_alist(vec![("-f", Str("x".into()))]), &vals);

    // Without the heuristic, `-f` stays a bare flag and `FILE` a
    // positional of its own.
    let vals = get_args(doc, &["-f", "x"]);
    same_args(
        &map_from_alist(vec![("-f", Bool(true)), ("FILE", Str("x".into()))]),
        &vals,
    );
}

#[test]
fn test_lax_placement() {
    let doc = "
Usage: prog (go <x> -v)

Options:
  -v  Verbose.
";
    assert!(crate::test::compiled(doc)
        .argv(["cmd", "-v", "go", "abc"])
        .parse()
        .is_err());

    let vals = get_args_with(doc, &["-v", "go", "abc"], |d| d.lax_placement(true));
    same_args(
        &map_from_alist(vec![
            ("go", Bool(true)),
            ("<x>", Str("abc".into())),
            ("-v", Bool(true)),
        ]),
        &vals,
    );
}

#[test]
fn test_allow_unknown_collects_options() {
    let doc = "
Usage: prog [options]

Options:
  -a  All.
";
    let vals = get_args_with(doc, &["-a", "--wat", "-z"], |d| d.allow_unknown(true));
    same_args(
        &map_from_alist(vec![("-a", Bool(true)), ("?", strs(&["--wat", "-z"]))]),
        &vals,
    );
}

#[test]
fn test_unknown_literals_are_still_rejected() {
    let doc = "
Usage: prog [options]

Options:
  -a  All.
";
    assert!(crate::test::compiled(doc)
        .argv(["cmd", "mystery"])
        .allow_unknown(true)
        .parse()
        .is_err());
}

#[test]
fn test_stop_at_collects_the_rest() {
    let doc = "
Usage: prog [options] <file>

Options:
  -n  Pass the rest through.
";
    let vals = get_args_with(doc, &["f", "-n", "--wat", "x"], |d| d.stop_at(["-n"]));
    same_args(
        &map_from_alist(vec![
            ("<file>", Str("f".into())),
            ("-n", strs(&["--wat", "x"])),
        ]),
        &vals,
    );
}

#[test]
fn test_help_output() {
    let doc = "
Usage: prog [options]

Options:
  -h, --help  Show this message.
";
    let out = crate::test::compiled(doc)
        .argv(["cmd", "--help"])
        .run()
        .unwrap();
    match out {
        Output::Help(text) => assert!(text.contains("Usage: prog")),
        out => panic!("unexpected output: {out:?}"),
    }
    let err = crate::test::compiled(doc)
        .argv(["cmd", "-h"])
        .parse()
        .unwrap_err();
    assert!(!err.fatal());
    assert!(matches!(err, Error::Help(_)));
}

#[test]
fn test_version_output() {
    let doc = "
Usage: prog --version
";
    let out = crate::test::compiled(doc)
        .argv(["cmd", "--version"])
        .version(Some("0.1.9".into()))
        .run()
        .unwrap();
    match out {
        Output::Version(v) => assert_eq!(v, "0.1.9"),
        out => panic!("unexpected output: {out:?}"),
    }

    let err = crate::test::compiled(doc)
        .argv(["cmd", "--version"])
        .run()
        .unwrap_err();
    assert!(matches!(err, Error::VersionMissing));
}

#[test]
fn test_dont_exit_leaves_help_in_the_map() {
    let doc = "
Usage: prog [options]

Options:
  -h, --help  Show this message.
";
    let vals = get_args_with(doc, &["--help"], |d| d.dont_exit(true));
    same_args(
        &map_from_alist(vec![("-h", Bool(true)), ("--help", Bool(true))]),
        &vals,
    );
}

#[test]
fn test_malformed_argv() {
    let err = crate::test::compiled("Usage: prog")
        .argv(["cmd", "--=x"])
        .parse()
        .unwrap_err();
    match err {
        Error::WithProgramUsage(e, _) => {
            assert!(matches!(*e, Error::Match(MatchError::MalformedInput(_))))
        }
        err => panic!("unexpected error: {err:?}"),
    }
}

#[test]
fn test_deserialize_into_struct() {
    const USAGE: &str = "
Usage: prog [options] <name> [<rest>...]

Options:
  -v  Verbose.
  --level N  Level. [default: 3]
";

    #[derive(Deserialize)]
    struct Args {
        flag_v: bool,
        flag_level: usize,
        arg_name: String,
        arg_rest: Vec<String>,
    }

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.argv(["prog", "-v", "alice", "x", "y"]).deserialize())
        .unwrap();
    assert!(args.flag_v);
    assert_eq!(args.flag_level, 3);
    assert_eq!(args.arg_name, "alice");
    assert_eq!(args.arg_rest, vec!["x".to_string(), "y".to_string()]);
}

#[test]
fn test_deserialize_enum_case_insensitively() {
    const USAGE: &str = "
Usage: prog [options]

Options:
  --color WHEN  Colorize. [default: auto]
";

    #[derive(Deserialize, Debug, PartialEq)]
    enum When {
        Auto,
        Always,
        Never,
    }

    #[derive(Deserialize)]
    struct Args {
        flag_color: When,
    }

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.argv(["prog"]).deserialize())
        .unwrap();
    assert_eq!(args.flag_color, When::Auto);

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.argv(["prog", "--color", "NEVER"]).deserialize())
        .unwrap();
    assert_eq!(args.flag_color, When::Never);
}

#[test]
fn test_deserialize_option_tracks_presence() {
    const USAGE: &str = "
Usage: prog [<name>]
";

    #[derive(Deserialize)]
    struct Args {
        arg_name: Option<String>,
    }

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.argv(["prog"]).deserialize())
        .unwrap();
    assert_eq!(args.arg_name, None);

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.argv(["prog", "bob"]).deserialize())
        .unwrap();
    assert_eq!(args.arg_name, Some("bob".to_string()));
}
