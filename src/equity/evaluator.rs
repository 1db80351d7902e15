use crate::EQUITY_SAMPLES;
use crate::EXHAUSTIVE_DEPTH;
use crate::Error;
use crate::Probability;
use crate::cards::Card;
use crate::cards::Deck;
use crate::cards::Hand;
use crate::cards::Hole;
use crate::cards::Strength;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;

/// Win probabilities for N hole pairs against a partial board.
///
/// Implementations are synchronous and CPU bound; callers run them off the
/// async executor.
pub trait Evaluator: Send + Sync + 'static {
    fn evaluate(&self, holes: &[Hole], board: &[Card]) -> Result<Vec<Probability>, Error>;
}

/// Showdown equity by enumerating every runout when few board cards are
/// missing, and by uniform sampling otherwise. Ties split the pot evenly.
#[derive(Debug, Clone, Copy)]
pub struct Showdown {
    samples: usize,
}

impl Default for Showdown {
    fn default() -> Self {
        Self {
            samples: EQUITY_SAMPLES,
        }
    }
}

impl Showdown {
    pub fn with_samples(samples: usize) -> Self {
        Self { samples }
    }

    fn validate(holes: &[Hole], board: &[Card]) -> Result<Hand, Error> {
        if board.len() > crate::BOARD_LIMIT {
            return Err(Error::Evaluator(format!("{} board cards", board.len())));
        }
        let dead = holes
            .iter()
            .map(|hole| Hand::from(*hole))
            .chain(board.iter().map(|card| Hand::from(*card)))
            .fold(Ok(Hand::empty()), |acc, next| {
                acc.and_then(|acc: Hand| match u64::from(acc) & u64::from(next) {
                    0 => Ok(Hand::add(acc, next)),
                    _ => Err(Error::Evaluator(format!("card repeated in {}", next))),
                })
            })?;
        Ok(dead)
    }

    /// pot shares won by each hole on one complete board
    fn showdown(holes: &[Hole], board: Hand) -> Vec<f64> {
        let strengths = holes
            .iter()
            .map(|hole| Strength::from(Hand::add(Hand::from(*hole), board)))
            .collect::<Vec<_>>();
        let best = strengths.iter().max().copied();
        let winners = strengths.iter().filter(|s| Some(**s) == best).count() as f64;
        strengths
            .iter()
            .map(|s| if Some(*s) == best { 1.0 / winners } else { 0.0 })
            .collect()
    }

    fn tally(holes: &[Hole], board: Hand, runouts: impl Iterator<Item = Hand>) -> (Vec<f64>, usize) {
        runouts.fold((vec![0.0; holes.len()], 0), |(mut shares, n), runout| {
            Self::showdown(holes, Hand::add(board, runout))
                .into_iter()
                .zip(shares.iter_mut())
                .for_each(|(won, total)| *total += won);
            (shares, n + 1)
        })
    }

    fn merge(a: (Vec<f64>, usize), b: (Vec<f64>, usize)) -> (Vec<f64>, usize) {
        let shares = a.0.into_iter().zip(b.0).map(|(x, y)| x + y).collect();
        (shares, a.1 + b.1)
    }

    fn exhaustive(holes: &[Hole], board: Hand, deck: &[Card], missing: usize) -> (Vec<f64>, usize) {
        let empty = (vec![0.0; holes.len()], 0);
        match missing {
            0 => Self::tally(holes, board, std::iter::once(Hand::empty())),
            1 => Self::tally(holes, board, deck.iter().map(|c| Hand::from(*c))),
            _ => (0..deck.len())
                .into_par_iter()
                .map(|i| {
                    let runouts = deck[i + 1..]
                        .iter()
                        .map(move |c| Hand::add(Hand::from(deck[i]), Hand::from(*c)));
                    Self::tally(holes, board, runouts)
                })
                .reduce(|| empty.clone(), Self::merge),
        }
    }

    fn sampled(&self, holes: &[Hole], board: Hand, dead: Hand, missing: usize) -> (Vec<f64>, usize) {
        let empty = (vec![0.0; holes.len()], 0);
        let chunks = rayon::current_num_threads().max(1);
        let per = self.samples.div_ceil(chunks);
        (0..chunks)
            .into_par_iter()
            .map(|_| {
                let ref mut rng = SmallRng::seed_from_u64(rand::random::<u64>());
                let runouts = (0..per).map(|_| {
                    let mut deck = Deck::without(dead);
                    (0..missing)
                        .filter_map(|_| deck.draw(rng))
                        .map(Hand::from)
                        .fold(Hand::empty(), Hand::add)
                });
                Self::tally(holes, board, runouts)
            })
            .reduce(|| empty.clone(), Self::merge)
    }
}

impl Evaluator for Showdown {
    fn evaluate(&self, holes: &[Hole], board: &[Card]) -> Result<Vec<Probability>, Error> {
        if holes.len() < 2 {
            return Err(Error::Evaluator(format!("{} contenders", holes.len())));
        }
        let dead = Self::validate(holes, board)?;
        let missing = crate::BOARD_LIMIT - board.len();
        let board = Hand::from(board);
        let (shares, n) = match missing <= EXHAUSTIVE_DEPTH {
            true => {
                let ref deck = Vec::<Card>::from(dead.complement());
                Self::exhaustive(holes, board, deck, missing)
            }
            false => self.sampled(holes, board, dead, missing),
        };
        match n {
            0 => Err(Error::Evaluator("no runouts evaluated".into())),
            n => Ok(shares
                .into_iter()
                .map(|share| (share / n as f64) as Probability)
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole(s: &str) -> Hole {
        let cards = Vec::<Card>::from(Hand::try_from(s).unwrap());
        Hole::try_from((cards[0], cards[1])).unwrap()
    }
    fn board(s: &str) -> Vec<Card> {
        s.split_whitespace().map(|c| Card::try_from(c).unwrap()).collect()
    }

    #[test]
    fn river_is_decided() {
        let equity = Showdown::default()
            .evaluate(&[hole("As Ah"), hole("Kd Kc")], &board("2c 7h 9s Td 3d"))
            .unwrap();
        assert_eq!(equity, vec![1.0, 0.0]);
    }

    #[test]
    fn river_chop_splits() {
        let equity = Showdown::default()
            .evaluate(&[hole("2c 3d"), hole("4h 5h")], &board("Ts Js Qs Ks As"))
            .unwrap();
        assert_eq!(equity, vec![0.5, 0.5]);
    }

    #[test]
    fn turn_enumerates_outs() {
        let equity = Showdown::default()
            .evaluate(&[hole("As Ah"), hole("Kd Kc")], &board("2c 7h 9s Kh"))
            .unwrap();
        // two aces left among 44 unseen cards
        assert!((equity[0] - 2.0 / 44.0).abs() < 1e-6);
        assert!((equity.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn flop_enumerates_and_sums_to_one() {
        let equity = Showdown::default()
            .evaluate(&[hole("As Ah"), hole("Kd Kc"), hole("7s 8s")], &board("2c 7h 9s"))
            .unwrap();
        assert_eq!(equity.len(), 3);
        assert!(equity.iter().all(|e| (0.0..=1.0).contains(e)));
        assert!((equity.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn preflop_samples_favor_aces() {
        let equity = Showdown::with_samples(4_000)
            .evaluate(&[hole("As Ah"), hole("7d 2c")], &[])
            .unwrap();
        assert!((equity.iter().sum::<f32>() - 1.0).abs() < 1e-3);
        assert!(equity[0] > 0.75);
    }

    #[test]
    fn rejects_repeated_cards() {
        let result = Showdown::default().evaluate(&[hole("As Ah"), hole("As Kc")], &[]);
        assert!(matches!(result, Err(Error::Evaluator(_))));
    }

    #[test]
    fn rejects_lone_contender() {
        assert!(Showdown::default().evaluate(&[hole("As Ah")], &[]).is_err());
    }
}
