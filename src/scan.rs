//! Splitting a raw help text into its usage and description blocks.

use std::borrow::Cow;

use crate::errors::{Error, Result};
use crate::utils::cap_or_empty;

/// The raw pieces of a help text, before any parsing.
#[derive(Clone, Debug)]
pub struct Scanned {
    /// The program name: the first token of the first usage line.
    pub program: String,
    /// The usage patterns, program tokens included, heading stripped.
    pub usage_body: String,
    /// The original usage fragment verbatim (heading included).
    pub short_help: String,
    /// The full help text, ANSI escapes stripped.
    pub help_text: String,
    /// Every description block, in order of appearance.
    pub sections: Vec<ScannedSection>,
}

/// One `options:`-headed block of the help text.
#[derive(Clone, Debug)]
pub struct ScannedSection {
    /// The heading as written, without the trailing colon.
    pub heading: String,
    /// Everything from the heading up to the next heading.
    pub body: String,
}

/// Split a help text into its usage block and description blocks.
///
/// The `usage:` anchor is searched case-insensitively; the usage block
/// extends until a blank line or the heading of a description block. Fails
/// when no usage section can be found.
pub fn scan(doc: &str) -> Result<Scanned> {
    // Any line whose heading text mentions "options" opens a description
    // block. The rest of the heading line may already hold the first
    // description.
    let heading = regex!(r"(?im)^[ \t]*(?P<heading>[^\n:=]*options)[ \t]*:");
    let usage = regex!(r"(?im)^[ \t]*usage:[ \t]*");
    let blank = regex!(r"\n[ \t]*\n");

    let doc = strip_ansi(doc);

    let anchor = match usage.find(&doc) {
        None => {
            return Err(Error::Scan(
                "Could not find a usage section in the help text.".into(),
            ))
        }
        Some(m) => m,
    };

    // The usage block runs from the anchor to the first blank line or
    // description heading, whichever comes first.
    let after = &doc[anchor.end()..];
    let mut body_end = blank.find(after).map_or(after.len(), |m| m.start());
    if let Some(h) = heading.find(after) {
        if h.start() < body_end {
            body_end = h.start();
        }
    }
    let usage_body = after[..body_end].trim_end().to_string();
    let short_help = doc[anchor.start()..anchor.end() + body_end]
        .trim()
        .to_string();

    let program = match usage_body.split_whitespace().next() {
        None => {
            return Err(Error::Scan(
                "Could not find a program name in the usage section.".into(),
            ))
        }
        Some(prog) => prog.to_string(),
    };

    // Description blocks run from their heading to the next heading (or the
    // end of the text). Blank lines do not close a block; prose between
    // option lines is common and skipped later by the description parser.
    let mut sections = vec![];
    let headings: Vec<_> = heading.captures_iter(&doc).collect();
    for (i, caps) in headings.iter().enumerate() {
        let whole = caps.get(0).unwrap();
        let start = whole.end();
        let end = headings
            .get(i + 1)
            .map_or(doc.len(), |next| next.get(0).unwrap().start());
        sections.push(ScannedSection {
            heading: cap_or_empty(caps, "heading").trim().to_string(),
            body: doc[start..end].to_string(),
        });
    }

    Ok(Scanned {
        program,
        usage_body,
        short_help,
        help_text: doc.into_owned(),
        sections,
    })
}

/// Remove ANSI escape sequences so headings in colored help texts are still
/// recognized.
fn strip_ansi(doc: &str) -> Cow<'_, str> {
    regex!(r"\x1b\[[0-9;]*[A-Za-z]").replace_all(doc, "")
}

#[cfg(test)]
mod tests {
    use super::scan;

    #[test]
    fn finds_program_and_sections() {
        let doc = "
A program.

Usage: prog [options] <file>
       prog --version

Options:
  -v, --verbose  Say more.

Advanced options:
  --frob         Frobnicate.
";
        let s = scan(doc).unwrap();
        assert_eq!(s.program, "prog");
        assert!(s.usage_body.contains("prog --version"));
        assert_eq!(s.sections.len(), 2);
        assert_eq!(s.sections[0].heading.to_lowercase(), "options");
        assert_eq!(s.sections[1].heading.to_lowercase(), "advanced options");
        assert!(s.sections[0].body.contains("--verbose"));
        assert!(!s.sections[0].body.contains("--frob"));
    }

    #[test]
    fn usage_block_stops_at_heading_without_blank_line() {
        let doc = "usage: prog [options]\noptions:\n  -a  All.\n";
        let s = scan(doc).unwrap();
        assert_eq!(s.usage_body, "prog [options]");
        assert_eq!(s.sections.len(), 1);
    }

    #[test]
    fn ansi_escapes_are_stripped() {
        let doc = "\x1b[1mUsage:\x1b[0m prog\n";
        let s = scan(doc).unwrap();
        assert_eq!(s.program, "prog");
    }

    #[test]
    fn missing_usage_is_a_scan_error() {
        assert!(scan("no anchor here\n").is_err());
    }
}
