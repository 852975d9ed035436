//! Turn rules and combat arithmetic for one match.
//!
//! [`Match`] is plain data plus pure-ish transitions; it never touches a
//! socket. Every transition returns the lines to deliver to each seat and
//! the session actor does the delivery.

use thiserror::Error;

use crate::{
    catalog::TroopCatalog,
    game::{
        scoring,
        types::{
            MatchOutcome, Phase, PlayerState, Seat, TowerKind, Verdict, DEFEND_HEAL, SKILL_HEAL,
        },
    },
    protocol::{self, Command, ParseError},
};

/// One line addressed to one seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: Seat,
    pub text: String,
}

impl Outbound {
    pub fn new(to: Seat, text: impl Into<String>) -> Self {
        Outbound {
            to,
            text: text.into(),
        }
    }
}

/// Result of feeding one raw line to [`Match::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// `false` when the line did not parse as a command at all.
    pub handled: bool,
    pub outbound: Vec<Outbound>,
}

/// Rejections. The `Display` text is exactly what the offending player sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{}", protocol::MATCH_ALREADY_ENDED)]
    MatchOver,
    #[error("{}", protocol::NOT_YOUR_TURN)]
    NotYourTurn,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("There is no troop called '{0}'!")]
    UnknownTroop(String),
    #[error("Not enough mana! Need {need}, you have {have}.")]
    NotEnoughMana { need: u32, have: u32 },
    #[error("You have no troops! Use: summon <troop>")]
    NoTroops,
    #[error("You must destroy {0} first!")]
    Guarded(TowerKind),
}

#[derive(Debug, Clone)]
pub struct Match {
    players: [PlayerState; 2],
    turn: Seat,
    phase: Phase,
}

impl Match {
    /// Fresh match: full towers, starting mana, empty troop queues, P1 to move.
    pub fn new(p1: impl Into<String>, p2: impl Into<String>) -> Self {
        Match {
            players: [PlayerState::new(p1), PlayerState::new(p2)],
            turn: Seat::P1,
            phase: Phase::Active,
        }
    }

    pub fn player(&self, seat: Seat) -> &PlayerState {
        &self.players[seat.index()]
    }

    /// Unchecked access for building test positions.
    #[doc(hidden)]
    pub fn player_mut(&mut self, seat: Seat) -> &mut PlayerState {
        &mut self.players[seat.index()]
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Over(_))
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        match &self.phase {
            Phase::Over(outcome) => Some(outcome),
            Phase::Active => None,
        }
    }

    /// Parses and applies one line from `seat`. Rejections are reported to
    /// that seat only and leave the match untouched.
    pub fn process(&mut self, seat: Seat, line: &str, catalog: &TroopCatalog) -> Reply {
        let parsed = self
            .check_can_act(seat)
            .and_then(|_| line.parse::<Command>().map_err(CommandError::from));

        let result = parsed.and_then(|cmd| self.apply(seat, cmd, catalog));
        match result {
            Ok(outbound) => Reply {
                handled: true,
                outbound,
            },
            Err(err) => Reply {
                handled: !matches!(err, CommandError::Parse(_)),
                outbound: vec![Outbound::new(seat, err.to_string())],
            },
        }
    }

    /// Applies an already-parsed command.
    pub fn apply(
        &mut self,
        seat: Seat,
        cmd: Command,
        catalog: &TroopCatalog,
    ) -> Result<Vec<Outbound>, CommandError> {
        self.check_can_act(seat)?;
        log::debug!("{} → {cmd:?}", self.player(seat).username);

        let ends_turn = cmd.ends_turn();
        let mut out = match cmd {
            Command::Summon(name) => self.summon(seat, &name, catalog)?,
            Command::Attack(target) => self.attack(seat, target)?,
            Command::Defend => self.heal_king(seat, DEFEND_HEAL, "You defend"),
            Command::Skill => self.heal_king(seat, SKILL_HEAL, "You use your skill"),
            Command::End => vec![Outbound::new(seat, "You end your turn.")],
            Command::Help => vec![Outbound::new(seat, protocol::HELP)],
        };

        // A lethal attack ends the match instead of the turn.
        if ends_turn && !self.is_over() {
            out.extend(self.pass_turn());
        }
        Ok(out)
    }

    fn check_can_act(&self, seat: Seat) -> Result<(), CommandError> {
        if self.is_over() {
            return Err(CommandError::MatchOver);
        }
        if self.turn != seat {
            return Err(CommandError::NotYourTurn);
        }
        Ok(())
    }

    fn summon(
        &mut self,
        seat: Seat,
        name: &str,
        catalog: &TroopCatalog,
    ) -> Result<Vec<Outbound>, CommandError> {
        let troop = catalog
            .get(name)
            .ok_or_else(|| CommandError::UnknownTroop(name.to_string()))?;

        let player = &mut self.players[seat.index()];
        if player.mana < troop.mana {
            return Err(CommandError::NotEnoughMana {
                need: troop.mana,
                have: player.mana,
            });
        }
        player.mana -= troop.mana;
        player.troops.push_back(troop.clone());

        Ok(vec![Outbound::new(
            seat,
            format!("Summoned {}! Mana left: {}", troop.name, player.mana),
        )])
    }

    fn attack(&mut self, seat: Seat, target: TowerKind) -> Result<Vec<Outbound>, CommandError> {
        let foe = seat.other();
        if self.player(seat).troops.is_empty() {
            return Err(CommandError::NoTroops);
        }

        let defender = self.player(foe);
        match target {
            TowerKind::Guard1 => {}
            TowerKind::Guard2 => {
                if !defender.guard1.is_destroyed() {
                    return Err(CommandError::Guarded(TowerKind::Guard1));
                }
            }
            TowerKind::King => {
                if !defender.guard1.is_destroyed() {
                    return Err(CommandError::Guarded(TowerKind::Guard1));
                }
                if !defender.guard2.is_destroyed() {
                    return Err(CommandError::Guarded(TowerKind::Guard2));
                }
            }
        }

        let attacker = &mut self.players[seat.index()];
        let Some(troop) = attacker.troops.pop_front() else {
            return Err(CommandError::NoTroops);
        };
        let attacker_name = attacker.username.clone();

        let tower = self.players[foe.index()].tower_mut(target);
        let damage = tower.take_hit(troop.atk);
        let hp_left = tower.hp;

        let mut out = vec![
            Outbound::new(
                seat,
                format!(
                    "Your {} hit the enemy {target} for {damage} damage! ({hp_left} HP left)",
                    troop.name
                ),
            ),
            Outbound::new(
                foe,
                format!(
                    "{attacker_name} attacked your {target} with {}! ({hp_left} HP left)",
                    troop.name
                ),
            ),
        ];

        if target == TowerKind::King && hp_left == 0 {
            out.extend(self.finish(MatchOutcome::KingDestroyed { winner: seat }));
        }
        Ok(out)
    }

    fn heal_king(&mut self, seat: Seat, amount: u32, verb: &str) -> Vec<Outbound> {
        let king = &mut self.players[seat.index()].king;
        king.heal(amount);
        vec![Outbound::new(
            seat,
            format!("{verb}! King Tower HP: {}", king.hp),
        )]
    }

    fn pass_turn(&mut self) -> Vec<Outbound> {
        self.turn = self.turn.other();
        let next = &self.player(self.turn).username;
        Seat::BOTH
            .iter()
            .map(|&s| Outbound::new(s, format!("{} It's {next}'s turn.", protocol::NEXT_TURN)))
            .collect()
    }

    /// One regenerator tick for `seat`. No effect once the match is over or at the cap.
    pub fn regen_mana(&mut self, seat: Seat) -> Option<Outbound> {
        if self.is_over() {
            return None;
        }
        self.players[seat.index()]
            .regen_mana()
            .map(|mana| Outbound::new(seat, format!("Mana: {mana}")))
    }

    /// Timer expiry. Returns nothing if the match already ended.
    pub fn time_up(&mut self) -> Vec<Outbound> {
        if self.is_over() {
            return Vec::new();
        }
        let verdict = scoring::decide_by_kings(
            self.player(Seat::P1).king.hp,
            self.player(Seat::P2).king.hp,
        );
        self.finish(MatchOutcome::TimeUp { verdict })
    }

    /// `gone` dropped its connection; the other seat wins.
    pub fn forfeit(&mut self, gone: Seat) -> Vec<Outbound> {
        if self.is_over() {
            return Vec::new();
        }
        self.finish(MatchOutcome::Forfeit {
            winner: gone.other(),
        })
    }

    fn finish(&mut self, outcome: MatchOutcome) -> Vec<Outbound> {
        let out = self.outcome_lines(&outcome);
        self.phase = Phase::Over(outcome);
        out
    }

    fn outcome_lines(&self, outcome: &MatchOutcome) -> Vec<Outbound> {
        match outcome {
            MatchOutcome::KingDestroyed { winner } => vec![
                Outbound::new(*winner, "You destroyed the enemy King Tower! You win!"),
                Outbound::new(winner.other(), "Your King Tower was destroyed! You lose!"),
            ],
            MatchOutcome::TimeUp { verdict } => Seat::BOTH
                .iter()
                .flat_map(|&seat| {
                    let mine = self.player(seat).king.hp;
                    let theirs = self.player(seat.other()).king.hp;
                    let result = match verdict {
                        Verdict::Draw => "It's a draw!",
                        Verdict::Winner(w) if *w == seat => "You win!",
                        Verdict::Winner(_) => "You lose!",
                    };
                    [
                        Outbound::new(
                            seat,
                            format!("Time is up! King Tower HP: yours {mine}, opponent {theirs}."),
                        ),
                        Outbound::new(seat, result),
                    ]
                })
                .collect(),
            MatchOutcome::Forfeit { winner } => {
                let gone = &self.player(winner.other()).username;
                vec![Outbound::new(
                    *winner,
                    format!("{gone} disconnected. You win by forfeit!"),
                )]
            }
        }
    }
}
