//! Console commands read from stdin.

use lumibulb_domain::sensor::AxisSample;

pub const HELP: &str = "\
commands:
  connect            connect to the bulb
  disconnect         disconnect from the bulb
  pick <#rrggbb>     apply a color from the picker
  record             start/stop recording a spoken color
  say <text>         hear <text> as a partial transcription
  say! <text>        hear <text> as a finished transcription
  tilt               start/stop the accelerometer stream
  sample <x> <y> <z> feed one accelerometer reading, each axis in [-1, 1]
  status             print the controller state as JSON
  help               print this message
  quit               disconnect and exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect,
    Disconnect,
    Pick(String),
    Record,
    Say { text: String, finished: bool },
    Tilt,
    Sample(AxisSample),
    Status,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("unknown command {0:?}, type `help` for the list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns [`ConsoleError`] for unknown commands or missing arguments.
pub fn parse(line: &str) -> Result<Option<Command>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim_start()));

    let command = match word {
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "pick" => {
            if rest.is_empty() {
                return Err(ConsoleError::Usage("pick <#rrggbb>"));
            }
            Command::Pick(rest.to_string())
        }
        "record" => Command::Record,
        "say" | "say!" => {
            if rest.is_empty() {
                return Err(ConsoleError::Usage("say <text> | say! <text>"));
            }
            Command::Say {
                text: rest.to_string(),
                finished: word == "say!",
            }
        }
        "tilt" => Command::Tilt,
        "sample" => Command::Sample(parse_sample(rest)?),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ConsoleError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_sample(args: &str) -> Result<AxisSample, ConsoleError> {
    const USAGE: &str = "sample <x> <y> <z>";

    let axes = args
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConsoleError::Usage(USAGE))?;
    match axes.as_slice() {
        [x, y, z] => Ok(AxisSample::new(*x, *y, *z)),
        _ => Err(ConsoleError::Usage(USAGE)),
    }
}
