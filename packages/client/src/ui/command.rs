//! Line commands of the terminal dashboard.

use thiserror::Error;

/// A parsed dashboard command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `set <device> <control> <value>`
    Set {
        device_id: String,
        control_id: String,
        value: f64,
    },
    /// `toggle <device> <control>`
    Toggle {
        device_id: String,
        control_id: String,
    },
    /// `echo <text>`
    Echo(String),
    /// `list`
    List,
    /// `read <id>`
    Read(String),
    /// `read-all`
    ReadAll,
    /// `remove <id>`
    Remove(String),
    /// `clear`
    Clear,
    /// `status`
    Status,
    /// `help`
    Help,
    /// `quit` / `exit`
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for the list of commands")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid value '{0}': expected a number")]
    InvalidValue(String),
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        match name {
            "set" => match args.as_slice() {
                [device_id, control_id, value] => Ok(Self::Set {
                    device_id: device_id.to_string(),
                    control_id: control_id.to_string(),
                    value: value
                        .parse()
                        .map_err(|_| CommandError::InvalidValue(value.to_string()))?,
                }),
                _ => Err(CommandError::Usage("set <device> <control> <value>")),
            },
            "toggle" => match args.as_slice() {
                [device_id, control_id] => Ok(Self::Toggle {
                    device_id: device_id.to_string(),
                    control_id: control_id.to_string(),
                }),
                _ => Err(CommandError::Usage("toggle <device> <control>")),
            },
            "echo" if !rest.is_empty() => Ok(Self::Echo(rest.to_string())),
            "echo" => Err(CommandError::Usage("echo <text>")),
            "read" => single_id(&args, "read <id>").map(Self::Read),
            "remove" => single_id(&args, "remove <id>").map(Self::Remove),
            "list" => Ok(Self::List),
            "read-all" => Ok(Self::ReadAll),
            "clear" => Ok(Self::Clear),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn single_id(args: &[&str], usage: &'static str) -> Result<String, CommandError> {
    match args {
        [id] => Ok(id.to_string()),
        _ => Err(CommandError::Usage(usage)),
    }
}
