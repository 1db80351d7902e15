//! What a viewer sees: every hand still in contention and the board.
use crate::cards::Card;
use crate::store::Holding;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Face {
    pub rank: String,
    pub suit: String,
}

impl From<Card> for Face {
    fn from(card: Card) -> Self {
        Self {
            rank: card.rank().to_string(),
            suit: card.suit().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seat {
    pub name: String,
    pub hand: Vec<Face>,
    pub equity: f32,
}

impl From<&Holding> for Seat {
    fn from(holding: &Holding) -> Self {
        Self {
            name: holding.name.clone(),
            hand: holding.hole.cards().into_iter().map(Face::from).collect(),
            equity: holding.equity.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub players: Vec<Seat>,
    pub board: Vec<Face>,
}

impl Snapshot {
    /// Mucked hands are left out; unset equity shows as zero.
    pub fn project(holdings: &[Holding], board: &[Card]) -> Self {
        Self {
            players: holdings
                .iter()
                .filter(|h| !h.mucked)
                .map(Seat::from)
                .collect(),
            board: board.iter().copied().map(Face::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ID;
    use crate::cards::Hole;

    fn holding(name: &str, a: &str, b: &str, mucked: bool, equity: Option<f32>) -> Holding {
        let a = Card::try_from(a).unwrap();
        let b = Card::try_from(b).unwrap();
        Holding {
            hand: ID::default(),
            player: ID::default(),
            name: name.to_string(),
            hole: Hole::try_from((a, b)).unwrap(),
            mucked,
            equity,
        }
    }

    #[test]
    fn serializes_sorted_hands_and_board() {
        let snapshot = Snapshot::project(
            &[holding("alice", "As", "Kd", false, Some(0.25))],
            &[Card::try_from("2c").unwrap()],
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "players": [{
                    "name": "alice",
                    "hand": [{"rank": "K", "suit": "d"}, {"rank": "A", "suit": "s"}],
                    "equity": 0.25,
                }],
                "board": [{"rank": "2", "suit": "c"}],
            })
        );
    }

    #[test]
    fn mucked_hands_are_hidden() {
        let snapshot = Snapshot::project(
            &[
                holding("alice", "As", "Kd", true, Some(0.5)),
                holding("bob", "7h", "7c", false, None),
            ],
            &[],
        );
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].name, "bob");
        assert_eq!(snapshot.players[0].equity, 0.0);
        assert!(snapshot.board.is_empty());
    }
}
