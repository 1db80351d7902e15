use crate::Error;
use crate::ID;
use crate::Probability;
use crate::antenna::Serial;
use crate::projection::Face;
use crate::store::Antenna;
use crate::store::Game;
use crate::store::Hand;
use crate::store::History;
use crate::store::Holding;
use crate::store::Player;
use serde::Serialize;
use std::time::UNIX_EPOCH;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl From<&Error> for ApiError {
    fn from(e: &Error) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiAntenna {
    pub id: ID<Antenna>,
    pub device_id: String,
    pub pair_id: u32,
    pub antenna_type_name: String,
}

impl From<Antenna> for ApiAntenna {
    fn from(antenna: Antenna) -> Self {
        Self {
            id: antenna.id,
            device_id: antenna.serial.device().to_string(),
            pair_id: antenna.serial.pair(),
            antenna_type_name: antenna.role.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiAntennas {
    pub antenna: Vec<ApiAntenna>,
}

#[derive(Debug, Serialize)]
pub struct ApiPlayer {
    pub id: ID<Player>,
    pub name: String,
    pub device_id: Option<String>,
    pub pair_id: Option<u32>,
}

impl From<(Player, Option<Serial>)> for ApiPlayer {
    fn from((player, serial): (Player, Option<Serial>)) -> Self {
        Self {
            id: player.id,
            name: player.name,
            device_id: serial.as_ref().map(|s| s.device().to_string()),
            pair_id: serial.as_ref().map(Serial::pair),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiPlayers {
    pub players: Vec<ApiPlayer>,
}

#[derive(Debug, Serialize)]
pub struct ApiHand {
    pub id: ID<Hand>,
    pub player_id: ID<Player>,
    pub is_muck: bool,
    pub cards: Vec<Face>,
    pub equity: Option<Probability>,
}

impl From<Holding> for ApiHand {
    fn from(holding: Holding) -> Self {
        Self {
            id: holding.hand,
            player_id: holding.player,
            is_muck: holding.mucked,
            cards: holding.hole.cards().into_iter().map(Face::from).collect(),
            equity: holding.equity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiHistory {
    pub id: ID<History>,
    pub game_id: ID<Game>,
    pub player: String,
    pub cards: Vec<Face>,
    pub is_muck: bool,
    pub equity: Option<Probability>,
    /// unix seconds
    pub archived: u64,
}

impl From<History> for ApiHistory {
    fn from(history: History) -> Self {
        Self {
            id: history.id,
            game_id: history.game,
            player: history.player,
            cards: history.hole.cards().into_iter().map(Face::from).collect(),
            is_muck: history.mucked,
            equity: history.equity,
            archived: history
                .archived
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}
