use std::path::PathBuf;

/// A slash command typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    History,
    Plots,
    Save(PathBuf),
    Clear,
    Health,
    Exit,
}

/// What one line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Question(String),
    Command(Command),
    Invalid(String),
}

/// Name and description of every slash command, in help order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show this help"),
    ("/history", "Print the conversation so far"),
    ("/plots", "List the answers that came with a plot"),
    ("/save <dir>", "Write every plot of this session into <dir>"),
    ("/clear", "Forget the conversation"),
    ("/health", "Check that the relay service is reachable"),
    ("/exit", "Leave the chat"),
];

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        return Input::Command(Command::Exit);
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Input::Question(trimmed.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let command = match name {
        "help" | "?" => Command::Help,
        "history" => Command::History,
        "plots" => Command::Plots,
        "save" if arg.is_empty() => return Input::Invalid("Usage: /save <dir>".to_string()),
        "save" => Command::Save(PathBuf::from(arg)),
        "clear" => Command::Clear,
        "health" => Command::Health,
        "exit" | "quit" => Command::Exit,
        other => {
            return Input::Invalid(format!("Unknown command '/{other}'. Type /help for a list."));
        }
    };
    Input::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            parse_input("  how many survived?  "),
            Input::Question("how many survived?".to_string())
        );
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn slash_commands_parse() {
        assert_eq!(parse_input("/plots"), Input::Command(Command::Plots));
        assert_eq!(parse_input("exit"), Input::Command(Command::Exit));
        assert_eq!(
            parse_input("/save  out/plots "),
            Input::Command(Command::Save(PathBuf::from("out/plots")))
        );
    }

    #[test]
    fn bad_commands_are_reported() {
        assert!(matches!(parse_input("/save"), Input::Invalid(ref m) if m.contains("Usage")));
        assert!(matches!(parse_input("/frobnicate"), Input::Invalid(ref m) if m.contains("/frobnicate")));
    }
}
