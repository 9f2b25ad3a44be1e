//! Commands accepted by the interactive session screen

use crate::entries::FormField;
use crate::export::ExportFormat;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Edit(FormField, String),
    Form,
    List,
    Refresh,
    Delete(String),
    Export(Option<ExportFormat>),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  start                 Start a weigh-in session
  stop                  Stop the session and save the entry
  truck <id>            Set the truck ID
  weight <tons>         Set the weight
  comments <text>       Set the comments
  form                  Show the current form
  list                  Show recorded entries
  refresh               Reload entries from the backend
  delete <entry-id>     Delete an entry (asks for confirmation)
  export [xlsx|csv]     Export the displayed entries
  status                Show session state and elapsed time
  help                  Show this help
  quit                  Exit";

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "truck" | "weight" | "comments" | "comment" => {
                let field = word.parse::<FormField>()?;
                Ok(Command::Edit(field, rest.to_string()))
            }
            "form" => Ok(Command::Form),
            "list" | "ls" => Ok(Command::List),
            "refresh" => Ok(Command::Refresh),
            "delete" | "rm" => {
                if rest.is_empty() {
                    Err("Usage: delete <entry-id>".to_string())
                } else {
                    Ok(Command::Delete(rest.to_string()))
                }
            }
            "export" => {
                if rest.is_empty() {
                    Ok(Command::Export(None))
                } else {
                    Ok(Command::Export(Some(rest.parse()?)))
                }
            }
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err("Type 'help' for a list of commands".to_string()),
            other => Err(format!("Unknown command: {} (type 'help')", other)),
        }
    }
}

/// Whether a confirmation answer means yes
pub fn is_confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("start".parse::<Command>().unwrap(), Command::Start);
        assert_eq!("  STOP ".parse::<Command>().unwrap(), Command::Stop);
        assert_eq!("ls".parse::<Command>().unwrap(), Command::List);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_edits_keep_spaces() {
        assert_eq!(
            "comments wet gravel, half load".parse::<Command>().unwrap(),
            Command::Edit(FormField::Comments, "wet gravel, half load".to_string())
        );
        assert_eq!(
            "truck T-12".parse::<Command>().unwrap(),
            Command::Edit(FormField::TruckId, "T-12".to_string())
        );
        // Clearing a field
        assert_eq!(
            "weight".parse::<Command>().unwrap(),
            Command::Edit(FormField::Weight, String::new())
        );
    }

    #[test]
    fn test_parse_delete_and_export() {
        assert_eq!(
            "delete abc-123".parse::<Command>().unwrap(),
            Command::Delete("abc-123".to_string())
        );
        assert!("delete".parse::<Command>().is_err());

        assert_eq!("export".parse::<Command>().unwrap(), Command::Export(None));
        assert_eq!(
            "export csv".parse::<Command>().unwrap(),
            Command::Export(Some(ExportFormat::Csv))
        );
        assert!("export pdf".parse::<Command>().is_err());
    }

    #[test]
    fn test_unknown_and_empty() {
        assert!("launch".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn test_confirmation() {
        assert!(is_confirmed("y"));
        assert!(is_confirmed(" YES\n"));
        assert!(!is_confirmed(""));
        assert!(!is_confirmed("n"));
    }
}
