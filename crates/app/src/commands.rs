use std::fmt;

use exam_core::AnswerValue;
use exam_core::model::QuestionId;

/// One line typed at the session prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load,
    Begin,
    Answer {
        question_id: QuestionId,
        value: AnswerValue,
    },
    Clear(QuestionId),
    Flag(QuestionId),
    Next,
    Previous,
    /// 1-based position as shown on screen.
    Jump(usize),
    Goto(QuestionId),
    Unanswered,
    Status,
    Submit,
    Reset,
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    InvalidPosition(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(cmd) => write!(f, "unknown command: {cmd} (try `help`)"),
            CommandError::MissingArgument { command, what } => {
                write!(f, "{command} requires {what}")
            }
            CommandError::InvalidPosition(raw) => write!(f, "invalid question number: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

pub const HELP: &str = "\
Commands:
  load                      retry loading the test
  begin                     start the clock
  answer <qid> <opt>[,<opt>]  choose option(s) or fill a blank
  write <qid> <text...>     free-text answer
  clear <qid>               remove an answer
  flag <qid>                toggle review flag
  next | prev               move through questions
  jump <n>                  go to question number n
  goto <qid>                go to a question by id
  unanswered                list questions without an answer
  status                    time left and progress
  submit                    submit the test
  reset                     start over after completion
  exit                      leave without submitting";

/// # Errors
///
/// Returns `CommandError` for unknown commands or missing arguments.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (head, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(head, rest)| (head, rest.trim()));

    match head.to_ascii_lowercase().as_str() {
        "load" | "retry" => Ok(Command::Load),
        "begin" | "start" => Ok(Command::Begin),
        "answer" | "a" => {
            let (question_id, raw) = question_and_value(rest, "answer")?;
            Ok(Command::Answer {
                question_id,
                value: choice_value(raw),
            })
        }
        "write" | "w" => {
            let (question_id, raw) = question_and_value(rest, "write")?;
            Ok(Command::Answer {
                question_id,
                value: AnswerValue::Text(raw.to_owned()),
            })
        }
        "clear" => question(rest, "clear").map(Command::Clear),
        "flag" | "f" => question(rest, "flag").map(Command::Flag),
        "next" | "n" => Ok(Command::Next),
        "prev" | "previous" | "p" => Ok(Command::Previous),
        "jump" | "j" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "jump",
                    what: "a question number",
                });
            }
            rest.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Command::Jump)
                .ok_or_else(|| CommandError::InvalidPosition(rest.to_owned()))
        }
        "goto" | "g" => question(rest, "goto").map(Command::Goto),
        "unanswered" | "u" => Ok(Command::Unanswered),
        "status" | "s" => Ok(Command::Status),
        "submit" => Ok(Command::Submit),
        "reset" => Ok(Command::Reset),
        "help" | "h" | "?" => Ok(Command::Help),
        "exit" | "quit" | "q" => Ok(Command::Exit),
        other => Err(CommandError::Unknown(other.to_owned())),
    }
}

fn question(rest: &str, command: &'static str) -> Result<QuestionId, CommandError> {
    rest.split_whitespace()
        .next()
        .map(QuestionId::new)
        .ok_or(CommandError::MissingArgument {
            command,
            what: "a question id",
        })
}

fn question_and_value<'a>(
    rest: &'a str,
    command: &'static str,
) -> Result<(QuestionId, &'a str), CommandError> {
    let question_id = question(rest, command)?;
    let value = rest
        .split_once(char::is_whitespace)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(CommandError::MissingArgument {
            command,
            what: "a value",
        })?;
    Ok((question_id, value))
}

// Comma-separated input selects several options.
fn choice_value(raw: &str) -> AnswerValue {
    if raw.contains(',') {
        AnswerValue::Multi(
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    } else {
        AnswerValue::Single(raw.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_and_multi_choices() {
        assert_eq!(
            parse("answer q1 optA").unwrap(),
            Command::Answer {
                question_id: QuestionId::new("q1"),
                value: AnswerValue::Single("optA".into()),
            }
        );
        assert_eq!(
            parse("a q1 optA, optC").unwrap(),
            Command::Answer {
                question_id: QuestionId::new("q1"),
                value: AnswerValue::Multi(vec!["optA".into(), "optC".into()]),
            }
        );
    }

    #[test]
    fn write_keeps_the_whole_sentence() {
        assert_eq!(
            parse("write q9   Cities grow, people move.").unwrap(),
            Command::Answer {
                question_id: QuestionId::new("q9"),
                value: AnswerValue::Text("Cities grow, people move.".into()),
            }
        );
    }

    #[test]
    fn rejects_missing_arguments() {
        assert_eq!(
            parse("answer q1").unwrap_err(),
            CommandError::MissingArgument {
                command: "answer",
                what: "a value"
            }
        );
        assert!(matches!(
            parse("flag").unwrap_err(),
            CommandError::MissingArgument { command: "flag", .. }
        ));
    }

    #[test]
    fn jump_positions_are_one_based() {
        assert_eq!(parse("jump 3").unwrap(), Command::Jump(3));
        assert_eq!(
            parse("jump 0").unwrap_err(),
            CommandError::InvalidPosition("0".into())
        );
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(
            parse("dance").unwrap_err(),
            CommandError::Unknown("dance".into())
        );
        assert_eq!(parse("  QUIT ").unwrap(), Command::Exit);
    }
}
