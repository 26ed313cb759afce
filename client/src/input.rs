//! Text commands typed at the client prompt

use shared::{Bounds, Coord, Packet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join { name: Option<String> },
    Move { from: Coord, to: Coord },
    Query { bounds: Bounds },
    Show { bounds: Bounds },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    WrongArgCount { command: &'static str, usage: &'static str },
    InvalidNumber(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::UnknownCommand(cmd) => write!(
                f,
                "unknown command '{}' (try join, move, query, show or quit)",
                cmd
            ),
            ParseError::WrongArgCount { command, usage } => {
                write!(f, "wrong arguments for {}, usage: {}", command, usage)
            }
            ParseError::InvalidNumber(arg) => write!(f, "'{}' is not a valid coordinate", arg),
        }
    }
}

impl std::error::Error for ParseError {}

const MOVE_USAGE: &str = "move <from_x> <from_y> <to_x> <to_y>";
const QUERY_USAGE: &str = "query <min_x> <max_x> <min_y> <max_y>";
const SHOW_USAGE: &str = "show <min_x> <max_x> <min_y> <max_y>";

impl Command {
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(ParseError::Empty)?;
        let args: Vec<&str> = words.collect();

        match command.to_ascii_lowercase().as_str() {
            "join" => {
                let name = args.join(" ");
                Ok(Command::Join {
                    name: if name.is_empty() { None } else { Some(name) },
                })
            }
            "move" => {
                let [fx, fy, tx, ty] = numbers(&args, "move", MOVE_USAGE)?;
                Ok(Command::Move {
                    from: Coord::new(fx, fy),
                    to: Coord::new(tx, ty),
                })
            }
            "query" => {
                let [min_x, max_x, min_y, max_y] = numbers(&args, "query", QUERY_USAGE)?;
                Ok(Command::Query {
                    bounds: Bounds::new(min_x, max_x, min_y, max_y),
                })
            }
            "show" => {
                let [min_x, max_x, min_y, max_y] = numbers(&args, "show", SHOW_USAGE)?;
                Ok(Command::Show {
                    bounds: Bounds::new(min_x, max_x, min_y, max_y),
                })
            }
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }

    /// The packet to send for this command, if it talks to the server.
    pub fn to_packet(&self) -> Option<Packet> {
        match self {
            Command::Join { name } => Some(Packet::Join { name: name.clone() }),
            Command::Move { from, to } => Some(Packet::move_between(*from, *to)),
            Command::Query { bounds } => Some(Packet::QuerySection { bounds: *bounds }),
            Command::Quit => Some(Packet::Leave),
            Command::Show { .. } => None,
        }
    }
}

fn numbers(
    args: &[&str],
    command: &'static str,
    usage: &'static str,
) -> Result<[i64; 4], ParseError> {
    if args.len() != 4 {
        return Err(ParseError::WrongArgCount { command, usage });
    }
    let mut values = [0i64; 4];
    for (value, arg) in values.iter_mut().zip(args) {
        *value = arg
            .parse()
            .map_err(|_| ParseError::InvalidNumber(arg.to_string()))?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join() {
        assert_eq!(
            Command::parse("join").unwrap(),
            Command::Join { name: None }
        );
        assert_eq!(
            Command::parse("  JOIN  Magnus   C ").unwrap(),
            Command::Join {
                name: Some("Magnus C".to_string())
            }
        );
    }

    #[test]
    fn test_parse_move() {
        assert_eq!(
            Command::parse("move 0 1 0 -2").unwrap(),
            Command::Move {
                from: Coord::new(0, 1),
                to: Coord::new(0, -2)
            }
        );
        assert_eq!(
            Command::parse("move 0 1 0").unwrap_err(),
            ParseError::WrongArgCount {
                command: "move",
                usage: MOVE_USAGE
            }
        );
        assert_eq!(
            Command::parse("move 0 one 0 2").unwrap_err(),
            ParseError::InvalidNumber("one".to_string())
        );
    }

    #[test]
    fn test_parse_query_and_show() {
        let bounds = Bounds::new(-5, 5, -2, 9);
        assert_eq!(
            Command::parse("query -5 5 -2 9").unwrap(),
            Command::Query { bounds }
        );
        assert_eq!(
            Command::parse("show -5 5 -2 9").unwrap(),
            Command::Show { bounds }
        );
        assert!(Command::parse("show -5 5").is_err());
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(Command::parse("quit").unwrap(), Command::Quit);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
        assert_eq!(Command::parse("   ").unwrap_err(), ParseError::Empty);
        assert_eq!(
            Command::parse("castle").unwrap_err(),
            ParseError::UnknownCommand("castle".to_string())
        );
    }

    #[test]
    fn test_to_packet() {
        assert_eq!(Command::Quit.to_packet(), Some(Packet::Leave));
        assert_eq!(
            Command::parse("move 1 2 3 4").unwrap().to_packet(),
            Some(Packet::Move {
                from_x: 1,
                from_y: 2,
                to_x: 3,
                to_y: 4
            })
        );
        assert!(Command::Show {
            bounds: Bounds::new(0, 0, 0, 0)
        }
        .to_packet()
        .is_none());
    }
}
