//! End-to-end checks of the subtler interactions: repetition, `--`
//! passthrough, option-argument binding, fallbacks, counting, stop-at and
//! positional-order groups.

use crate::test::{get_args_with, map_from_alist, same_args, strs};
use crate::value::Value::{Bool, Int, Str};

test_expect!(scenario_repeating_positional, "
Usage: prog <qux>...
", &["a", "b", "c"], vec![("<qux>", crate::test::strs(&["a", "b", "c"]))]);

test_expect!(scenario_end_of_arguments_collects_verbatim, "
Usage: prog <qux>... --
", &["a", "b", "c", "--", "--", "--"], vec![
    ("<qux>", crate::test::strs(&["a", "b", "c"])),
    ("--", crate::test::strs(&["--", "--"]))
]);

test_expect!(scenario_attached_short_option_value, "
Usage: prog [options]

Options:
  -h, --host <H>  The host. [default: \"http://localhost:3000\"]
", &["-hhttp://localhost:5000"], vec![
    ("-h", Str("http://localhost:5000".into())),
    ("--host", Str("http://localhost:5000".into()))
]);

#[test]
fn scenario_environment_fallback() {
    let doc = "
Usage: prog [options]

Options:
  -h, --host FOO  The host. [env: HOST]
";
    let vals = get_args_with(doc, &[], |d| d.env([("HOST", "HOME")]));
    same_args(
        &map_from_alist(vec![
            ("-h", Str("HOME".into())),
            ("--host", Str("HOME".into())),
        ]),
        &vals,
    );
}

test_expect!(scenario_counted_flags, "
Usage: prog [-i] [-q]...
", &["-q", "-i", "-q"], vec![("-i", Bool(true)), ("-q", Int(2))]);

test_expect!(scenario_interleaved_alternations_count, "
Usage: prog (-a | -b)... (-d | -e)...
", &["-a", "-d", "-a", "-a", "-d", "-a"], vec![("-a", Int(4)), ("-d", Int(2))]);

#[test]
fn scenario_stop_at_slurps_the_rest() {
    let doc = "
Usage: prog [options]

Options:
  -n  Pass everything after through.
";
    let vals = get_args_with(doc, &["-n", "-a", "-b", "-c"], |d| {
        d.stop_at(["-n"]).options_first(true)
    });
    same_args(
        &map_from_alist(vec![("-n", strs(&["-a", "-b", "-c"]))]),
        &vals,
    );
}

test_user_error!(scenario_group_with_positional_is_order_strict, "
Usage: prog ((-i FILE) <env>) -oFILE

Options:
  -i FILE  Input.
  -o FILE  Output.
", &["-o", "bar", "x", "-i", "bar"]);

#[test]
fn scenario_options_first_slurps_trailing_positional() {
    let doc = "
Usage: prog [-v] <cmd> [<args>...]

Options:
  -v  Verbose.
";
    let vals = get_args_with(doc, &["-v", "go", "-x", "12"], |d| d.options_first(true));
    same_args(
        &map_from_alist(vec![
            ("-v", Bool(true)),
            ("<cmd>", Str("go".into())),
            ("<args>", strs(&["-x", "12"])),
        ]),
        &vals,
    );
}
