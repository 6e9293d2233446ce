use strum::{Display, EnumString};
use thiserror::Error;

use crate::process::redirect::Direction;

/// Words the classifier treats as operators. Anything else, including these
/// characters embedded in a longer word, is an ordinary argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ControlToken {
    #[strum(serialize = "|")]
    Pipe,
    #[strum(serialize = "<")]
    Read,
    #[strum(serialize = ">")]
    Write,
    #[strum(serialize = "&")]
    Background,
}

impl ControlToken {
    pub fn of(token: &str) -> Option<Self> {
        token.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPlan<'a> {
    Execute(Vec<&'a str>),
    Pipe(Vec<&'a str>, Vec<&'a str>),
    Redirect(Vec<&'a str>, Redirection<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection<'a> {
    pub direction: Direction,
    pub file: &'a str,
}

/// A classified command line: exactly one plan, plus whether a trailing `&`
/// was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub plan: ExecutionPlan<'a>,
    pub background: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandSyntaxError {
    #[error("empty command")]
    Empty,
    #[error("missing command before `{0}`")]
    MissingCommand(ControlToken),
    #[error("missing operand after `{0}`")]
    MissingOperand(ControlToken),
    #[error("unexpected `{found}` after `{operator}`")]
    UnexpectedToken {
        operator: ControlToken,
        found: ControlToken,
    },
}

impl<'a> CommandLine<'a> {
    /// Scans `tokens` once, left to right. The first pipe or redirection marker
    /// decides the plan and nothing after it is looked at again.
    ///
    /// A `<` or `>` directly followed by the same marker is not a redirection;
    /// the first of the pair is kept as an argument.
    pub fn parse(tokens: &[&'a str]) -> Result<Self, CommandSyntaxError> {
        let (background, tokens) = match tokens.split_last() {
            None => return Err(CommandSyntaxError::Empty),
            Some((last, rest)) if ControlToken::of(last) == Some(ControlToken::Background) => {
                (true, rest)
            }
            Some(_) => (false, tokens),
        };

        if tokens.is_empty() {
            return Err(CommandSyntaxError::MissingCommand(ControlToken::Background));
        }

        for (index, token) in tokens.iter().enumerate() {
            let plan = match ControlToken::of(token) {
                Some(ControlToken::Pipe) => pipe(tokens, index)?,
                Some(operator @ (ControlToken::Read | ControlToken::Write)) => {
                    if tokens.get(index + 1) == Some(token) {
                        continue;
                    }
                    redirect(tokens, index, operator)?
                }
                _ => continue,
            };

            return Ok(Self { plan, background });
        }

        Ok(Self {
            plan: ExecutionPlan::Execute(tokens.to_vec()),
            background,
        })
    }
}

fn operand<'a>(
    tokens: &[&'a str],
    index: usize,
    operator: ControlToken,
) -> Result<&'a str, CommandSyntaxError> {
    let next = tokens
        .get(index + 1)
        .copied()
        .ok_or(CommandSyntaxError::MissingOperand(operator))?;

    match ControlToken::of(next) {
        Some(found) => Err(CommandSyntaxError::UnexpectedToken { operator, found }),
        None => Ok(next),
    }
}

fn pipe<'a>(tokens: &[&'a str], index: usize) -> Result<ExecutionPlan<'a>, CommandSyntaxError> {
    if index == 0 {
        return Err(CommandSyntaxError::MissingCommand(ControlToken::Pipe));
    }

    operand(tokens, index, ControlToken::Pipe)?;

    Ok(ExecutionPlan::Pipe(
        tokens[..index].to_vec(),
        tokens[index + 1..].to_vec(),
    ))
}

fn redirect<'a>(
    tokens: &[&'a str],
    index: usize,
    operator: ControlToken,
) -> Result<ExecutionPlan<'a>, CommandSyntaxError> {
    let file = operand(tokens, index, operator)?;

    // nothing past the file name is re-scanned or passed on
    let argv = tokens[..index].to_vec();

    if argv.is_empty() {
        return Err(CommandSyntaxError::MissingCommand(operator));
    }

    let direction = match operator {
        ControlToken::Read => Direction::Input,
        _ => Direction::Output,
    };

    Ok(ExecutionPlan::Redirect(argv, Redirection { direction, file }))
}
