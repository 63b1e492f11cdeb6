//! Command grammar and canned response text
//!
//! One inbound line parses to exactly one [`Command`]. The first
//! whitespace-separated token picks the command, case-sensitively
//! ("Create" is chat, "create" is a command); the next token is its
//! argument and anything past that is ignored. A line matching no
//! command is a chat message carrying the whole trimmed line, and a
//! blank line is its own case.

/// Prompt that terminates every server response. No newline after it.
pub const PROMPT: &str = "chat>";

/// Greeting pushed to every fresh connection.
pub const MOTD: &str = "Thanks for connecting to the BisonChat Server.\n\nchat>";

/// `help` output.
pub const HELP: &str = concat!(
    "login <username> - \"login with username\" \n",
    "create <room>   - \"create a room\" \n",
    "join <room>     - \"join a room\" \n",
    "leave <room>    - \"leave a room\" \n",
    "users           - \"list all users\" \n",
    "rooms           - \"list all rooms\" \n",
    "connect <user>  - \"connect to user\" \n",
    "disconnect <user> - \"disconnect from user\" \n",
    "exit/logout     - \"exit chat\" \n",
    "help            - \"show this help\" \n",
    "Any other text  - \"chat message\"\nchat>",
);

const USAGE_CREATE: &str = "Usage: create <room>\nchat>";
const USAGE_JOIN: &str = "Usage: join <room>\nchat>";
const USAGE_LEAVE: &str = "Usage: leave <room>\nchat>";
const USAGE_CONNECT: &str = "Usage: connect <user>\nchat>";
const USAGE_DISCONNECT: &str = "Usage: disconnect <user>\nchat>";
const USAGE_LOGIN: &str = "Usage: login <username>\nchat>";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a room (idempotent) and join it
    Create { room: String },
    /// Join a room, creating it first if needed
    Join { room: String },
    /// Leave a room
    Leave { room: String },
    /// Open a one-way DM link to a user
    Connect { user: String },
    /// Drop a one-way DM link
    Disconnect { user: String },
    /// Pick a display name
    Login { name: String },
    /// List all connected users
    Users,
    /// List all rooms
    Rooms,
    /// Show the command summary
    Help,
    /// End the session (`exit` or `logout`)
    Exit,
    /// Blank or whitespace-only line
    Empty,
    /// Known command missing its argument; carries the usage line
    Usage { text: &'static str },
    /// Anything else: a chat message to fan out
    Chat { message: String },
}

impl Command {
    /// Parse one raw input line.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let mut tokens = trimmed.split_whitespace();
        let Some(word) = tokens.next() else {
            return Self::Empty;
        };
        let arg = tokens.next();

        match (word, arg) {
            ("create", Some(room)) => Self::Create { room: room.to_string() },
            ("create", None) => Self::Usage { text: USAGE_CREATE },
            ("join", Some(room)) => Self::Join { room: room.to_string() },
            ("join", None) => Self::Usage { text: USAGE_JOIN },
            ("leave", Some(room)) => Self::Leave { room: room.to_string() },
            ("leave", None) => Self::Usage { text: USAGE_LEAVE },
            ("connect", Some(user)) => Self::Connect { user: user.to_string() },
            ("connect", None) => Self::Usage { text: USAGE_CONNECT },
            ("disconnect", Some(user)) => Self::Disconnect { user: user.to_string() },
            ("disconnect", None) => Self::Usage { text: USAGE_DISCONNECT },
            ("login", Some(name)) => Self::Login { name: name.to_string() },
            ("login", None) => Self::Usage { text: USAGE_LOGIN },
            ("users", _) => Self::Users,
            ("rooms", _) => Self::Rooms,
            ("help", _) => Self::Help,
            ("exit", _) | ("logout", _) => Self::Exit,
            _ => Self::Chat {
                message: trimmed.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands_with_argument() {
        assert_eq!(
            Command::parse("create games"),
            Command::Create { room: "games".into() }
        );
        assert_eq!(
            Command::parse("join games"),
            Command::Join { room: "games".into() }
        );
        assert_eq!(
            Command::parse("leave games"),
            Command::Leave { room: "games".into() }
        );
        assert_eq!(
            Command::parse("connect bob"),
            Command::Connect { user: "bob".into() }
        );
        assert_eq!(
            Command::parse("disconnect bob"),
            Command::Disconnect { user: "bob".into() }
        );
        assert_eq!(
            Command::parse("login alice"),
            Command::Login { name: "alice".into() }
        );
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(Command::parse("users"), Command::Users);
        assert_eq!(Command::parse("rooms"), Command::Rooms);
        assert_eq!(Command::parse("help"), Command::Help);
        assert_eq!(Command::parse("exit"), Command::Exit);
        assert_eq!(Command::parse("logout"), Command::Exit);
    }

    #[test]
    fn test_parse_missing_argument_yields_usage() {
        for line in ["create", "join", "leave", "connect", "disconnect", "login"] {
            match Command::parse(line) {
                Command::Usage { text } => {
                    assert!(text.starts_with(&format!("Usage: {}", line)));
                    assert!(text.ends_with(PROMPT));
                }
                other => panic!("expected usage for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            Command::parse("Create games"),
            Command::Chat { message: "Create games".into() }
        );
        assert_eq!(
            Command::parse("EXIT"),
            Command::Chat { message: "EXIT".into() }
        );
    }

    #[test]
    fn test_parse_ignores_extra_tokens() {
        assert_eq!(
            Command::parse("join games extra words"),
            Command::Join { room: "games".into() }
        );
        assert_eq!(Command::parse("users now please"), Command::Users);
        assert_eq!(Command::parse("exit 0"), Command::Exit);
    }

    #[test]
    fn test_parse_blank_lines() {
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("   \t  "), Command::Empty);
    }

    #[test]
    fn test_parse_chat_keeps_interior_whitespace() {
        assert_eq!(
            Command::parse("  hello   world  "),
            Command::Chat { message: "hello   world".into() }
        );
    }

    #[test]
    fn test_parse_skips_leading_whitespace_before_command() {
        assert_eq!(Command::parse("  users"), Command::Users);
    }

    #[test]
    fn test_help_covers_the_whole_grammar() {
        for word in [
            "login", "create", "join", "leave", "users", "rooms", "connect",
            "disconnect", "exit/logout", "help",
        ] {
            assert!(HELP.contains(word), "help text is missing {:?}", word);
        }
        assert!(HELP.ends_with(PROMPT));
    }
}
