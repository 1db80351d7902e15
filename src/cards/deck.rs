use super::card::Card;
use super::hand::Hand;
use rand::Rng;

/// Deck extends Hand with the ability to remove cards from itself.
/// Random selection via ::draw(), without replacement.
#[derive(Debug, Clone, Copy)]
pub struct Deck(Hand);

impl From<Deck> for Hand {
    fn from(deck: Deck) -> Self {
        deck.0
    }
}

impl Deck {
    /// every card not already in `dead`
    pub fn without(dead: Hand) -> Self {
        Self(dead.complement())
    }
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// remove a random card from the deck
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<Card> {
        match self.0.size() {
            0 => None,
            n => {
                let skip = rng.random_range(0..n);
                let card = self.0.into_iter().nth(skip)?;
                self.0.remove(card);
                Some(card)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn draws_without_replacement() {
        let ref mut rng = SmallRng::seed_from_u64(7);
        let dead = Hand::try_from("As Kd").unwrap();
        let mut deck = Deck::without(dead);
        let mut seen = Hand::empty();
        while let Some(card) = deck.draw(rng) {
            assert!(!dead.contains(&card));
            assert!(!seen.contains(&card));
            seen = Hand::add(seen, Hand::from(card));
        }
        assert_eq!(seen.size(), 50);
        assert_eq!(deck.size(), 0);
    }
}
