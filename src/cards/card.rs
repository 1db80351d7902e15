use super::rank::Rank;
use super::suit::Suit;
use crate::Error;
use std::fmt::Display;
use std::fmt::Formatter;

/// A single playing card, stored as its index in a sorted deck.
///
/// Ordering follows the index, so cards sort by rank first and suit second.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Card(u8);

impl Card {
    pub fn rank(&self) -> Rank {
        Rank::from(self.0 / 4)
    }
    pub fn suit(&self) -> Suit {
        Suit::from(self.0 % 4)
    }
}

impl From<(Rank, Suit)> for Card {
    fn from((rank, suit): (Rank, Suit)) -> Self {
        Self(u8::from(rank) * 4 + u8::from(suit))
    }
}

/// u8 isomorphism
/// each card is mapped to its location in a sorted deck 0-51
/// Ts
/// 35
/// 0b00100011
impl From<Card> for u8 {
    fn from(c: Card) -> u8 {
        c.0
    }
}
impl TryFrom<u8> for Card {
    type Error = Error;
    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            0..52 => Ok(Self(n)),
            _ => Err(Error::InvalidFormat(format!("card index {}", n))),
        }
    }
}

/// u64 injection
/// each card is just one bit turned on
/// Ts
/// xxxxxxxxxxxx 0000000000000000100000000000000000000000000000000000
impl From<Card> for u64 {
    fn from(c: Card) -> u64 {
        1 << c.0
    }
}

/// str isomorphism
/// exactly two characters, rank then suit: `As`, `Td`, `2c`
impl TryFrom<&str> for Card {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(s), None) => Ok(Self::from((Rank::try_from(r)?, Suit::try_from(s)?))),
            _ => Err(Error::InvalidFormat(format!("card label {:?}", s))),
        }
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.rank(), self.suit())
    }
}
