use logos::Logos;
use thiserror::Error;

use self::token::{LexerError, Token};

pub mod token;

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("failed to tokenize command")]
    Lexer(Vec<LexerError>),
}

/// Splits a line into the words handed to [`dispatch`](crate::dispatch).
pub fn tokenize(line: &str) -> Result<Vec<&str>, CommandParseError> {
    let tokens = Token::lexer(line).collect::<Vec<_>>();

    if tokens.iter().any(|r| r.is_err()) {
        return Err(CommandParseError::Lexer(
            tokens.into_iter().filter_map(|r| r.err()).collect(),
        ));
    }

    Ok(tokens
        .into_iter()
        .filter_map(|r| r.ok())
        .map(|Token::Word(word)| word)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            tokenize("  cat  in.txt\t|  wc -l\n").unwrap(),
            vec!["cat", "in.txt", "|", "wc", "-l"]
        );
    }

    #[test]
    fn blank_line_has_no_words() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize(" \t \n").unwrap().is_empty());
    }

    #[test]
    fn operators_are_not_split_out_of_words() {
        assert_eq!(tokenize("echo a>b &").unwrap(), vec!["echo", "a>b", "&"]);
    }

    #[test]
    fn keeps_non_ascii_words() {
        assert_eq!(tokenize("echo héllo").unwrap(), vec!["echo", "héllo"]);
    }

    #[test]
    fn rejects_control_characters() {
        let err = tokenize("echo \u{1}bad").unwrap_err();

        let CommandParseError::Lexer(errors) = err;
        assert_eq!(errors, vec![LexerError::ControlCharacter]);
    }
}
