use super::card::Card;
use super::hand::Hand;
use crate::Error;

/// Two distinct cards held by one player.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Hole(Hand);

impl Hole {
    /// both cards, lower rank first
    pub fn cards(&self) -> [Card; 2] {
        let mut iter = self.0.into_iter();
        match (iter.next(), iter.next()) {
            (Some(lo), Some(hi)) => [lo, hi],
            _ => unreachable!("hole always holds two cards"),
        }
    }
}

impl std::fmt::Display for Hole {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Hole> for Hand {
    fn from(hole: Hole) -> Self {
        hole.0
    }
}

impl TryFrom<(Card, Card)> for Hole {
    type Error = Error;
    fn try_from((a, b): (Card, Card)) -> Result<Self, Self::Error> {
        match a == b {
            true => Err(Error::Inconsistent(format!("hole repeats {}", a))),
            false => Ok(Self(Hand::add(Hand::from(a), Hand::from(b)))),
        }
    }
}

/// i64 isomorphism, for storage
impl TryFrom<i64> for Hole {
    type Error = Error;
    fn try_from(n: i64) -> Result<Self, Self::Error> {
        let hand = Hand::from(n as u64);
        match hand.size() {
            2 => Ok(Self(hand)),
            n => Err(Error::Inconsistent(format!("stored hole has {} cards", n))),
        }
    }
}
impl From<Hole> for i64 {
    fn from(hole: Hole) -> Self {
        u64::from(hole.0) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cards_come_out_rank_sorted() {
        let ace = Card::try_from("As").unwrap();
        let king = Card::try_from("Kd").unwrap();
        let hole = Hole::try_from((ace, king)).unwrap();
        assert_eq!(hole.cards(), [king, ace]);
    }

    #[test]
    fn rejects_duplicate_card() {
        let ace = Card::try_from("As").unwrap();
        assert!(Hole::try_from((ace, ace)).is_err());
    }

    #[test]
    fn storage_round_trip() {
        let hole = Hole::try_from((Card::try_from("2c").unwrap(), Card::try_from("7h").unwrap())).unwrap();
        assert_eq!(Hole::try_from(i64::from(hole)), Ok(hole));
        assert!(Hole::try_from(0b111i64).is_err());
    }
}
