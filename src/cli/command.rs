use thiserror::Error;

use crate::loader::RecordId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Page(u32),
    Next,
    Prev,
    Reload,
    Toggle(Vec<RecordId>),
    Select(Vec<RecordId>),
    Deselect(Vec<RecordId>),
    SelectPage,
    ClearPage,
    Bulk(usize),
    Clear,
    Selected,
    Export(Option<String>),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{name}', type 'help' for the list of commands")]
    Unknown { name: String },

    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("invalid argument for '{command}': {message}")]
    InvalidArgument {
        command: &'static str,
        message: String,
    },

    #[error("'{command}' takes no arguments")]
    UnexpectedArgument { command: &'static str },
}

pub const COMMAND_HELP: &str = "\
Commands:
  page N            open page N (1-indexed)
  next | n          open the next page
  prev | p          open the previous page
  reload            fetch the visible page again
  toggle ID...      flip selection of rows on the visible page
  select ID...      select rows on the visible page
  deselect ID...    deselect rows on the visible page
  all               select every row on the visible page
  none              deselect every row on the visible page
  bulk N            select the first N records of the catalog (0 clears)
  clear             drop the whole selection
  selected          list selected ids on the visible page
  export [FILE]     fetch and write every selected record
  show              render the visible page
  help              show this help
  quit | q          leave
";

fn no_args(command: &'static str, rest: &str, value: Command) -> Result<Command, CommandError> {
    if rest.is_empty() {
        Ok(value)
    } else {
        Err(CommandError::UnexpectedArgument { command })
    }
}

fn ids(command: &'static str, rest: &str) -> Result<Vec<RecordId>, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            expected: "one or more record ids",
        });
    }
    crate::utils::parse_id_list(rest)
        .map_err(|message| CommandError::InvalidArgument { command, message })
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match name.to_lowercase().as_str() {
        "page" | "goto" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "page",
                    expected: "a page number",
                });
            }
            crate::utils::parse_page_number(rest)
                .map(Command::Page)
                .map_err(|message| CommandError::InvalidArgument {
                    command: "page",
                    message,
                })
        }
        "next" | "n" => no_args("next", rest, Command::Next),
        "prev" | "p" => no_args("prev", rest, Command::Prev),
        "reload" => no_args("reload", rest, Command::Reload),
        "toggle" | "t" => ids("toggle", rest).map(Command::Toggle),
        "select" => ids("select", rest).map(Command::Select),
        "deselect" => ids("deselect", rest).map(Command::Deselect),
        "all" => no_args("all", rest, Command::SelectPage),
        "none" => no_args("none", rest, Command::ClearPage),
        "bulk" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "bulk",
                    expected: "a record count",
                });
            }
            rest.parse::<usize>()
                .map(Command::Bulk)
                .map_err(|_| CommandError::InvalidArgument {
                    command: "bulk",
                    message: format!("invalid count '{rest}'"),
                })
        }
        "clear" => no_args("clear", rest, Command::Clear),
        "selected" => no_args("selected", rest, Command::Selected),
        "export" => Ok(Command::Export(if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        })),
        "show" | "ls" => no_args("show", rest, Command::Show),
        "help" | "?" => no_args("help", rest, Command::Help),
        "quit" | "exit" | "q" => no_args("quit", rest, Command::Quit),
        _ => Err(CommandError::Unknown {
            name: name.to_string(),
        }),
    }
}
