//! Lexing argv into positioned tokens.

use crate::errors::MatchError;

/// One lexed argv word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `--name` or `--name=value`.
    LOpt(String, Option<String>),
    /// `-abc` or `-abc=value`: the head character, the remaining stacked
    /// characters and the explicit `=value` if any.
    SOpt(char, String, Option<String>),
    /// Anything that is not option-shaped.
    Lit(String),
    /// A lone `--`, carrying everything that followed it verbatim.
    Eoa(Vec<String>),
    /// A lone `-`.
    Stdin,
}

impl Token {
    /// The written form of the token, reconstructed from its pieces.
    pub fn render(&self) -> String {
        match *self {
            Token::LOpt(ref name, None) => format!("--{name}"),
            Token::LOpt(ref name, Some(ref v)) => format!("--{name}={v}"),
            Token::SOpt(head, ref tail, None) => format!("-{head}{tail}"),
            Token::SOpt(head, ref tail, Some(ref v)) => format!("-{head}{tail}={v}"),
            Token::Lit(ref s) => s.clone(),
            Token::Eoa(_) => "--".into(),
            Token::Stdin => "-".into(),
        }
    }
}

/// A token plus the argv word it came from and its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionedToken {
    pub token: Token,
    pub source: String,
    pub id: usize,
}

/// Lex an argv vector left to right.
///
/// `--` ends lexing and carries the remaining words; a lone `-` stands for
/// stdin. Everything that is not option-shaped becomes a literal.
pub fn lex(argv: &[String]) -> Result<Vec<PositionedToken>, MatchError> {
    let mut toks = vec![];
    let mut id = 0;
    let mut words = argv.iter();
    while let Some(word) = words.next() {
        let token = match word.as_str() {
            "--" => {
                let rest: Vec<String> = words.map(String::clone).collect();
                toks.push(PositionedToken {
                    token: Token::Eoa(rest),
                    source: word.clone(),
                    id,
                });
                return Ok(toks);
            }
            "-" => Token::Stdin,
            _ if word.starts_with("--") => {
                let body = &word[2..];
                match body.split_once('=') {
                    None => Token::LOpt(body.into(), None),
                    Some(("", _)) => {
                        return Err(MatchError::MalformedInput(format!(
                            "Cannot lex the argument '{word}'."
                        )))
                    }
                    Some((name, value)) => Token::LOpt(name.into(), Some(value.into())),
                }
            }
            _ if word.starts_with('-') => {
                let body = &word[1..];
                let (stack, explicit) = match body.split_once('=') {
                    None => (body, None),
                    Some((stack, value)) => (stack, Some(value.to_string())),
                };
                let mut chars = stack.chars();
                match chars.next() {
                    None | Some('=') => {
                        return Err(MatchError::MalformedInput(format!(
                            "Cannot lex the argument '{word}'."
                        )))
                    }
                    Some(head) => Token::SOpt(head, chars.collect(), explicit),
                }
            }
            _ => Token::Lit(word.clone()),
        };
        toks.push(PositionedToken {
            token,
            source: word.clone(),
            id,
        });
        id += 1;
    }
    Ok(toks)
}

/// The written forms of a token run, `--` separators expanded back out.
pub fn render_all(toks: &[PositionedToken]) -> Vec<String> {
    let mut out = vec![];
    for tok in toks {
        match tok.token {
            Token::Eoa(ref rest) => {
                out.push("--".into());
                out.extend(rest.iter().cloned());
            }
            _ => out.push(tok.source.clone()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{lex, render_all, Token};

    fn words(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn recognizes_every_shape() {
        let toks = lex(&words(&["--file=x", "-abc", "-", "lit", "--", "-q", "--"])).unwrap();
        assert_eq!(toks[0].token, Token::LOpt("file".into(), Some("x".into())));
        assert_eq!(toks[1].token, Token::SOpt('a', "bc".into(), None));
        assert_eq!(toks[2].token, Token::Stdin);
        assert_eq!(toks[3].token, Token::Lit("lit".into()));
        assert_eq!(
            toks[4].token,
            Token::Eoa(vec!["-q".into(), "--".into()])
        );
        assert_eq!(toks.len(), 5);
    }

    #[test]
    fn sources_rerender_the_original_argv() {
        let argv = words(&["-abc=1", "x", "--", "--weird", "--"]);
        let toks = lex(&argv).unwrap();
        assert_eq!(render_all(&toks), argv);
    }

    #[test]
    fn empty_option_names_are_malformed() {
        assert!(lex(&words(&["--=x"])).is_err());
        assert!(lex(&words(&["-=x"])).is_err());
    }
}
