use logos::Logos;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default, Error)]
pub enum LexerError {
    #[default]
    #[error("unexpected control character")]
    ControlCharacter,
}

/// Words are maximal runs of printable characters. There is no quoting, so
/// `|`, `<`, `>` and `&` only act as operators when they stand alone.
#[derive(Debug, PartialEq, Logos)]
#[logos(skip r"[ \t\r\n\f\v]+", error = LexerError)]
pub enum Token<'a> {
    #[regex(r"[^\x00-\x20\x7f]+")]
    Word(&'a str),
}
