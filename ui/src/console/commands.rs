use crate::error::{AppError, AppResult};
use busview_server::connection_session::SessionError;
use busview_server::model::EntityDescriptor;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

/// Flags accepted by `connect`. Anything left out is taken from the
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectArgs {
    pub connection_string: Option<String>,
    pub admin_connection_string: Option<String>,
    pub entity_name: Option<String>,
    pub subscription_name: Option<String>,
}

/// A validated console request
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect(ConnectArgs),
    Disconnect,
    Status,
    Entities,
    Refresh,
    Select(EntityDescriptor),
    Props(EntityDescriptor),
    Peek(Option<u32>),
    Find(String),
    Receive,
    Send {
        body: String,
        properties: Vec<(String, Value)>,
    },
    /// Rendered help for the console or one command
    Help(String),
    Quit,
}

/// One input line; the first word names the command.
#[derive(Debug, Parser)]
#[command(name = "busview", multicall = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Debug, Subcommand)]
enum ConsoleCommand {
    /// Open a session; omitted values come from configuration
    Connect {
        /// Data-plane connection string
        connection_string: Option<String>,
        /// Connection string with manage rights, lists the whole namespace
        #[arg(long)]
        admin: Option<String>,
        /// Queue or topic to work with
        #[arg(long)]
        entity: Option<String>,
        /// Subscription of the topic given with --entity
        #[arg(long)]
        subscription: Option<String>,
    },
    /// Close the session
    Disconnect,
    /// Show connection and selection
    Status,
    /// List known entities
    #[command(visible_alias = "ls")]
    Entities,
    /// Re-list the namespace (administrative sessions only)
    Refresh,
    /// Make a queue or subscription the active entity
    Select(EntityArgs),
    /// Show an entity's configuration
    Props(EntityArgs),
    /// Show messages without removing them
    Peek {
        /// Page size, defaults to the configured one
        count: Option<u32>,
    },
    /// Look up a message by id among the first peeked messages
    Find { message_id: String },
    /// Take one message and complete it
    Receive,
    /// Send a JSON message to the active entity
    Send {
        #[arg(allow_hyphen_values = true)]
        body: Option<String>,
        /// Application properties as key=value
        #[arg(value_parser = parse_property)]
        properties: Vec<(String, Value)>,
    },
    /// Leave the console
    #[command(visible_alias = "exit")]
    Quit,
}

#[derive(Debug, Args)]
struct EntityArgs {
    /// queue, subscription or topic
    kind: String,
    name: String,
    /// Parent topic of a subscription
    topic: Option<String>,
}

impl EntityArgs {
    fn descriptor(&self) -> AppResult<EntityDescriptor> {
        EntityDescriptor::from_parts(&self.kind, &self.name, self.topic.as_deref())
            .map_err(|e| AppError::Session(SessionError::from(e)))
    }
}

impl ConsoleCommand {
    /// Check the values clap cannot: entity kinds and the message body.
    fn into_command(self) -> AppResult<Command> {
        let command = match self {
            ConsoleCommand::Connect {
                connection_string,
                admin,
                entity,
                subscription,
            } => Command::Connect(ConnectArgs {
                connection_string,
                admin_connection_string: admin,
                entity_name: entity,
                subscription_name: subscription,
            }),
            ConsoleCommand::Disconnect => Command::Disconnect,
            ConsoleCommand::Status => Command::Status,
            ConsoleCommand::Entities => Command::Entities,
            ConsoleCommand::Refresh => Command::Refresh,
            ConsoleCommand::Select(args) => Command::Select(args.descriptor()?),
            ConsoleCommand::Props(args) => Command::Props(args.descriptor()?),
            ConsoleCommand::Peek { count } => Command::Peek(count),
            ConsoleCommand::Find { message_id } => Command::Find(message_id),
            ConsoleCommand::Receive => Command::Receive,
            ConsoleCommand::Send { body, properties } => {
                let body = body
                    .filter(|b| !b.trim().is_empty())
                    .ok_or(AppError::EmptyBody)?;
                Command::Send { body, properties }
            }
            ConsoleCommand::Quit => Command::Quit,
        };
        Ok(command)
    }
}

/// Split a line into words. Single and double quotes group words; inside
/// double quotes `\"` and `\\` are escapes.
pub fn tokenize(line: &str) -> AppResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\')) => current.push(escaped),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(AppError::usage("Unterminated quote")),
                        },
                        Some(other) => current.push(other),
                        None => return Err(AppError::usage("Unterminated quote")),
                    }
                }
            }
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(other) => current.push(other),
                        None => return Err(AppError::usage("Unterminated quote")),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> AppResult<Option<Command>> {
    let mut tokens = tokenize(line)?;
    let Some(name) = tokens.first_mut() else {
        return Ok(None);
    };
    *name = name.to_lowercase();

    match ConsoleLine::try_parse_from(tokens) {
        Ok(parsed) => parsed.command.into_command().map(Some),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Ok(Some(Command::Help(e.render().to_string().trim_end().to_string())))
        }
        Err(e) => Err(usage_error(&e)),
    }
}

fn usage_error(err: &clap::Error) -> AppError {
    let rendered = err.render().to_string();
    let message = rendered.trim().trim_start_matches("error: ");
    AppError::usage(message)
}

/// `key=value`, where the value is read as JSON when it parses and as a
/// plain string otherwise.
fn parse_property(pair: &str) -> Result<(String, Value), String> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
    let value =
        serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_none, assert_ok};
    use serde_json::json;

    fn parse(line: &str) -> Command {
        assert_ok!(parse_line(line)).expect("a command")
    }

    #[test]
    fn tokenize_handles_quotes() {
        let tokens = assert_ok!(tokenize(r#"send "{\"a\": 1}" 'x y' plain"#));
        assert_eq!(tokens, vec!["send", r#"{"a": 1}"#, "x y", "plain"]);
        assert_eq!(assert_ok!(tokenize(r#"send """#)), vec!["send", ""]);
        assert_err!(tokenize("send \"open"));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_none!(assert_ok!(parse_line("   ")));
    }

    #[test]
    fn connect_flags() {
        let command = parse("connect Endpoint=sb://a; --entity orders --subscription audit");
        assert_eq!(
            command,
            Command::Connect(ConnectArgs {
                connection_string: Some("Endpoint=sb://a;".to_string()),
                admin_connection_string: None,
                entity_name: Some("orders".to_string()),
                subscription_name: Some("audit".to_string()),
            })
        );
        assert_eq!(parse("CONNECT"), Command::Connect(ConnectArgs::default()));

        let err = assert_err!(parse_line("connect --entity"));
        assert_eq!(err.kind(), "UsageError");
        let err = assert_err!(parse_line("connect --verbose"));
        assert!(err.to_string().contains("--verbose"));
    }

    #[test]
    fn select_builds_descriptors() {
        assert_eq!(
            parse("select subscription audit events"),
            Command::Select(EntityDescriptor::subscription("audit", "events"))
        );
        assert_eq!(
            parse("props Queue orders"),
            Command::Props(EntityDescriptor::queue("orders"))
        );

        let err = assert_err!(parse_line("select exchange orders"));
        assert_eq!(err.kind(), "UnknownEntityKind");
        let err = assert_err!(parse_line("select subscription audit"));
        assert_eq!(err.kind(), "UnknownEntityKind");
        let err = assert_err!(parse_line("select queue"));
        assert_eq!(err.kind(), "UsageError");
    }

    #[test]
    fn peek_count() {
        assert_eq!(parse("peek"), Command::Peek(None));
        assert_eq!(parse("peek 0"), Command::Peek(Some(0)));
        assert_err!(parse_line("peek many"));
        assert_err!(parse_line("peek 1 2"));
    }

    #[test]
    fn send_body_and_properties() {
        assert_eq!(
            parse(r#"send "{\"n\":1}" priority=5 region=eu flag=true"#),
            Command::Send {
                body: r#"{"n":1}"#.to_string(),
                properties: vec![
                    ("priority".to_string(), json!(5)),
                    ("region".to_string(), json!("eu")),
                    ("flag".to_string(), json!(true)),
                ],
            }
        );
    }

    #[test]
    fn empty_send_is_rejected() {
        let err = assert_err!(parse_line("send"));
        assert_eq!(err.kind(), "EmptyBody");
        let err = assert_err!(parse_line("send '  '"));
        assert_eq!(err.kind(), "EmptyBody");
        let err = assert_err!(parse_line("send body novalue"));
        assert_eq!(err.kind(), "UsageError");
    }

    #[test]
    fn help_lists_commands() {
        let Command::Help(text) = parse("help") else {
            panic!("help should render text");
        };
        assert!(text.contains("connect"));
        assert!(text.contains("peek"));

        let Command::Help(text) = parse("peek --help") else {
            panic!("per-command help should render text");
        };
        assert!(text.contains("Page size"));
    }

    #[test]
    fn aliases_and_unknown_commands() {
        assert_eq!(parse("ls"), Command::Entities);
        assert_eq!(parse("exit"), Command::Quit);

        let err = assert_err!(parse_line("purge"));
        assert_eq!(err.kind(), "UsageError");
        assert!(err.to_string().contains("purge"));
    }
}
