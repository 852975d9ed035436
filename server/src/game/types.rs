use std::collections::VecDeque;
use std::fmt;

/// One summonable unit, copied by value out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Troop {
    pub name: String,
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    pub mana: u32,
    pub exp: u32,
    pub special: String,
}

/// Which of the three structures a tower is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TowerKind {
    King,
    Guard1,
    Guard2,
}

impl TowerKind {
    pub fn label(self) -> &'static str {
        match self {
            TowerKind::King => "King Tower",
            TowerKind::Guard1 => "Guard Tower 1",
            TowerKind::Guard2 => "Guard Tower 2",
        }
    }
}

impl fmt::Display for TowerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    pub kind: TowerKind,
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    /// Carried for completeness; combat never rolls it.
    pub crit: f64,
}

impl Tower {
    pub fn king() -> Self {
        Tower {
            kind: TowerKind::King,
            hp: 2000,
            atk: 500,
            def: 300,
            crit: 0.1,
        }
    }

    pub fn guard(kind: TowerKind) -> Self {
        Tower {
            kind,
            hp: 1000,
            atk: 300,
            def: 100,
            crit: 0.05,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.hp == 0
    }

    /// Applies one troop hit and returns the damage dealt.
    pub fn take_hit(&mut self, atk: u32) -> u32 {
        let damage = atk.saturating_sub(self.def);
        self.hp = self.hp.saturating_sub(damage);
        damage
    }

    pub fn heal(&mut self, amount: u32) {
        self.hp = self.hp.saturating_add(amount);
    }
}

/// Side of the board a player occupies for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    P1,
    P2,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::P1 => Seat::P2,
            Seat::P2 => Seat::P1,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::P1 => 0,
            Seat::P2 => 1,
        }
    }

    pub const BOTH: [Seat; 2] = [Seat::P1, Seat::P2];
}

/// Fixed per-match numbers that are not configurable at runtime.
pub const STARTING_MANA: u32 = 5;
pub const MANA_CAP: u32 = 10;
pub const DEFEND_HEAL: u32 = 50;
pub const SKILL_HEAL: u32 = 100;

/// Everything one player owns during a single match.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub username: String,
    pub mana: u32,
    pub king: Tower,
    pub guard1: Tower,
    pub guard2: Tower,
    pub troops: VecDeque<Troop>,
}

impl PlayerState {
    pub fn new(username: impl Into<String>) -> Self {
        PlayerState {
            username: username.into(),
            mana: STARTING_MANA,
            king: Tower::king(),
            guard1: Tower::guard(TowerKind::Guard1),
            guard2: Tower::guard(TowerKind::Guard2),
            troops: VecDeque::new(),
        }
    }

    pub fn tower_mut(&mut self, kind: TowerKind) -> &mut Tower {
        match kind {
            TowerKind::King => &mut self.king,
            TowerKind::Guard1 => &mut self.guard1,
            TowerKind::Guard2 => &mut self.guard2,
        }
    }

    /// Adds one mana unless already at the cap. Returns the new value when it changed.
    pub fn regen_mana(&mut self) -> Option<u32> {
        if self.mana < MANA_CAP {
            self.mana += 1;
            Some(self.mana)
        } else {
            None
        }
    }
}

/// How a match reached the Over state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    KingDestroyed { winner: Seat },
    TimeUp { verdict: Verdict },
    Forfeit { winner: Seat },
}

impl MatchOutcome {
    pub fn winner(&self) -> Option<Seat> {
        match self {
            MatchOutcome::KingDestroyed { winner } | MatchOutcome::Forfeit { winner } => {
                Some(*winner)
            }
            MatchOutcome::TimeUp { verdict } => match verdict {
                Verdict::Winner(seat) => Some(*seat),
                Verdict::Draw => None,
            },
        }
    }
}

/// Result of comparing King towers when the clock runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Winner(Seat),
    Draw,
}

/// Match life-cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Active,
    Over(MatchOutcome),
}
