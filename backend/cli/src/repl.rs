//! Line parsing for the chat prompt.

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Open,
    Collapse,
    Reset,
    Close,
    Goto(String),
    Yes,
    No,
    Quit,
    Text(String),
    Blank,
    Unknown(String),
}

pub const HELP: &str = "/open  /collapse  /reset  /close  /goto <path>  /yes  /no  /quit";

pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplInput::Text(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "open" => ReplInput::Open,
        "collapse" => ReplInput::Collapse,
        "reset" => ReplInput::Reset,
        "close" => ReplInput::Close,
        "goto" if !arg.is_empty() => ReplInput::Goto(arg.to_string()),
        "yes" | "y" => ReplInput::Yes,
        "no" | "n" => ReplInput::No,
        "quit" | "exit" => ReplInput::Quit,
        _ => ReplInput::Unknown(line.to_string()),
    }
}

/// Resolve a `/goto` target against the current path. Relative targets
/// are taken from the current location.
pub fn resolve_path(current: &str, target: &str) -> String {
    if target.starts_with('/') {
        return target.to_string();
    }
    format!("{}/{}", current.trim_end_matches('/'), target)
}
