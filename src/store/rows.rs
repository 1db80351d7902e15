use crate::ID;
use crate::Probability;
use crate::antenna::Role;
use crate::antenna::Serial;
use crate::cards::Card;
use crate::cards::Hole;
use std::time::SystemTime;

/// One round, from the first card read to the clear that archives it.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: ID<Game>,
    pub started: SystemTime,
    pub finished: Option<SystemTime>,
}

impl Game {
    pub fn start() -> Self {
        Self {
            id: ID::default(),
            started: SystemTime::now(),
            finished: None,
        }
    }
    pub fn is_current(&self) -> bool {
        self.finished.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Antenna {
    pub id: ID<Antenna>,
    pub serial: Serial,
    pub role: Role,
    pub player: Option<ID<Player>>,
}

impl From<Serial> for Antenna {
    fn from(serial: Serial) -> Self {
        Self {
            id: ID::default(),
            serial,
            role: Role::Unknown,
            player: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: ID<Player>,
    pub name: String,
}

impl Player {
    /// placeholder seat name for a freshly seen antenna
    pub fn seated_at(serial: &Serial) -> Self {
        Self {
            id: ID::default(),
            name: format!("player-{}", serial),
        }
    }
}

/// A physical card as read by one antenna during one game.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: ID<Tag>,
    pub game: ID<Game>,
    pub serial: Serial,
    pub card: Card,
    pub is_board: bool,
    pub hand: Option<ID<Hand>>,
    pub read: SystemTime,
}

impl Tag {
    pub fn read(game: ID<Game>, serial: &Serial, card: Card, is_board: bool) -> Self {
        Self {
            id: ID::default(),
            game,
            serial: serial.clone(),
            card,
            is_board,
            hand: None,
            read: SystemTime::now(),
        }
    }
}

/// Two assembled tags belonging to one player, lower rank in `a`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    pub id: ID<Hand>,
    pub game: ID<Game>,
    pub player: ID<Player>,
    pub a: ID<Tag>,
    pub b: ID<Tag>,
    pub mucked: bool,
    pub equity: Option<Probability>,
}

/// A hand joined with its owner and cards, as equity and viewers need it.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub hand: ID<Hand>,
    pub player: ID<Player>,
    pub name: String,
    pub hole: Hole,
    pub mucked: bool,
    pub equity: Option<Probability>,
}

/// Archived hand of a cleared game. Never mutated after insert.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub id: ID<History>,
    pub game: ID<Game>,
    pub player: String,
    pub hole: Hole,
    pub mucked: bool,
    pub equity: Option<Probability>,
    pub archived: SystemTime,
}

impl History {
    pub fn archive(game: ID<Game>, holding: &Holding, at: SystemTime) -> Self {
        Self {
            id: ID::default(),
            game,
            player: holding.name.clone(),
            hole: holding.hole,
            mucked: holding.mucked,
            equity: holding.equity,
            archived: at,
        }
    }
}
