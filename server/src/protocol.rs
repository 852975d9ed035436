//! Line protocol shared by the connection handler and the match session.
//!
//! Every message is a single `\n`-terminated UTF-8 line; tokens are
//! whitespace separated and case-insensitive.

use crate::game::types::TowerKind;
use std::str::FromStr;
use thiserror::Error;

// ---------- login ----------

/// `<username>|<password>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub username: String,
    pub password: String,
}

impl FromStr for Login {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.trim().split('|').collect();
        match parts.as_slice() {
            [user, pass] if !user.trim().is_empty() => Ok(Login {
                username: user.trim().to_string(),
                password: pass.to_string(),
            }),
            _ => Err(ParseError::BadLogin),
        }
    }
}

// ---------- in-match commands ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Lower-cased troop name.
    Summon(String),
    Attack(TowerKind),
    Defend,
    Skill,
    End,
    Help,
}

impl Command {
    /// Whether a successful command hands the turn to the opponent.
    /// `Attack` is conditional: a lethal hit ends the match instead.
    pub fn ends_turn(&self) -> bool {
        matches!(
            self,
            Command::Attack(_) | Command::Defend | Command::Skill | Command::End
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid login format, expected <username>|<password>.")]
    BadLogin,
    #[error("Invalid command, type 'help' for the command list.")]
    Unknown,
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid target! Use: g1, g2, king")]
    BadTarget,
}

const SUMMON_USAGE: &str = "summon <troop name>";
const ATTACK_USAGE: &str = "attack g1 / g2 / king";

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim().to_lowercase();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = tokens.split_first() else {
            return Err(ParseError::Unknown);
        };

        let no_args = |cmd: Command, usage: &'static str| {
            if args.is_empty() {
                Ok(cmd)
            } else {
                Err(ParseError::Usage(usage))
            }
        };

        match head {
            "summon" => match args {
                [name] => Ok(Command::Summon(name.to_string())),
                _ => Err(ParseError::Usage(SUMMON_USAGE)),
            },
            "attack" => match args {
                [target] => parse_target(target).map(Command::Attack),
                _ => Err(ParseError::Usage(ATTACK_USAGE)),
            },
            "defend" => no_args(Command::Defend, "defend"),
            "skill" => no_args(Command::Skill, "skill"),
            "end" => no_args(Command::End, "end"),
            "help" => no_args(Command::Help, "help"),
            _ => Err(ParseError::Unknown),
        }
    }
}

fn parse_target(token: &str) -> Result<TowerKind, ParseError> {
    match token {
        "g1" => Ok(TowerKind::Guard1),
        "g2" => Ok(TowerKind::Guard2),
        "king" => Ok(TowerKind::King),
        _ => Err(ParseError::BadTarget),
    }
}

// ---------- post-match ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayChoice {
    Replay,
    Quit,
}

impl ReplayChoice {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "replay" => Some(ReplayChoice::Replay),
            "quit" => Some(ReplayChoice::Quit),
            _ => None,
        }
    }
}

// ---------- server → client text ----------

pub const WELCOME: &str = "Welcome to the Tower Clash server! Log in with <username>|<password>.";
pub const LOGIN_OK: &str = "Login successful!";
pub const LOGIN_REJECTED: &str = "Wrong username or password.";
pub const WAITING: &str = "Waiting for another player to connect...";
pub const NOT_YOUR_TURN: &str = "It's not your turn!";
pub const MATCH_ALREADY_ENDED: &str = "The match has already ended.";
pub const REPLAY_PROMPT: &str = "Type 'replay' to play again or 'quit' to leave.";
pub const GOODBYE: &str = "Goodbye!";
pub const NEXT_TURN: &str = "Next turn.";

pub fn match_banner(p1: &str, p2: &str) -> String {
    format!("Match started: {p1} vs {p2}. {p1} moves first. Type 'help' for commands.")
}

pub const HELP: &str = "\
[ In-game commands ]
 - summon <troop>     : summon a troop (pawn, rook, ...)
 - attack g1/g2/king  : attack an enemy tower with your oldest troop
 - defend             : heal your King Tower by 50 HP
 - skill              : heal your King Tower by 100 HP
 - end                : end your turn
 - help               : show this list";
