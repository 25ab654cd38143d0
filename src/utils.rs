//! Small helpers shared by every stage.

/// Compile a regex on first use and hand out the cached instance from then
/// on. Expression position, so the pattern lives next to the code using it:
/// `let anchor = regex!(r"(?i)^usage:");`
macro_rules! regex {
    ($re:literal) => {{
        static RE: ::once_cell::sync::OnceCell<::regex::Regex> =
            ::once_cell::sync::OnceCell::new();
        RE.get_or_init(|| ::regex::Regex::new($re).unwrap())
    }};
}

/// Early-return with a formatted error wrapped by the given constructor.
macro_rules! err(
    ($kind:expr, $($arg:tt)*) => (return Err($kind(format!($($arg)*))))
);

/// A named capture's text, or `""` when the group did not participate.
pub(crate) fn cap_or_empty<'t>(caps: &regex::Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}
