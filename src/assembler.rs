//! Per-role card assembly.
//!
//! Each read is applied inside the caller's transaction, so the decision to
//! stage, complete, muck or ignore is always made against state that no other
//! event can change before the write commits.
use crate::BOARD_LIMIT;
use crate::Error;
use crate::ID;
use crate::antenna::Role;
use crate::cards::Card;
use crate::lifecycle;
use crate::store::Antenna;
use crate::store::Hand;
use crate::store::Queries;
use crate::store::Tag;

/// What a single read did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// duplicate, already complete, or an unclassified antenna
    Ignored,
    /// first card of a pair stored, waiting for its partner
    Staged,
    /// a player's second card arrived and formed a hand
    Dealt(ID<Hand>),
    /// a muck pair matched and folded an existing hand
    Mucked(ID<Hand>),
    /// a muck pair matched no hand; the staged cards were discarded
    Unmatched(Card),
    /// a new board card, with the board's size after it
    Board(usize),
}

impl Outcome {
    /// whether the set of contenders or the board moved
    pub fn changes_equity(&self) -> bool {
        matches!(self, Outcome::Dealt(_) | Outcome::Mucked(_) | Outcome::Board(_))
    }
    /// whether anything was written
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Outcome::Ignored)
    }
}

/// Apply one classified read.
pub async fn assemble(q: &mut dyn Queries, antenna: &Antenna, card: Card) -> Result<Outcome, Error> {
    match antenna.role {
        Role::Player => player(q, antenna, card).await,
        Role::Muck => muck(q, antenna, card).await,
        Role::Board => board(q, antenna, card).await,
        Role::Unknown => {
            log::info!("[antenna {}] unclassified, dropped {}", antenna.serial, card);
            Ok(Outcome::Ignored)
        }
    }
}

async fn player(q: &mut dyn Queries, antenna: &Antenna, card: Card) -> Result<Outcome, Error> {
    let player = antenna
        .player
        .ok_or_else(|| Error::Inconsistent(format!("player antenna {} has no seat", antenna.serial)))?;
    let game = lifecycle::get_or_create_current(q).await?;
    let held = q.tags_by_serial(game, &antenna.serial).await?;
    match held.as_slice() {
        [] => {
            q.create_tag(&Tag::read(game, &antenna.serial, card, false)).await?;
            log::debug!("[antenna {}] staged {}", antenna.serial, card);
            Ok(Outcome::Staged)
        }
        [first] if first.card == card => Ok(Outcome::Ignored),
        [first] => {
            let second = Tag::read(game, &antenna.serial, card, false);
            q.create_tag(&second).await?;
            let (lo, hi) = match first.card.rank() <= second.card.rank() {
                true => (first.id, second.id),
                false => (second.id, first.id),
            };
            let hand = Hand {
                id: ID::default(),
                game,
                player,
                a: lo,
                b: hi,
                mucked: false,
                equity: None,
            };
            q.create_hand(&hand).await?;
            q.attach_tag(lo, hand.id).await?;
            q.attach_tag(hi, hand.id).await?;
            log::info!("[antenna {}] dealt {}{}", antenna.serial, first.card, card);
            Ok(Outcome::Dealt(hand.id))
        }
        _ => Ok(Outcome::Ignored),
    }
}

async fn muck(q: &mut dyn Queries, antenna: &Antenna, card: Card) -> Result<Outcome, Error> {
    let game = lifecycle::get_or_create_current(q).await?;
    let held = q.tags_by_serial(game, &antenna.serial).await?;
    match held.as_slice() {
        [] => {
            q.create_tag(&Tag::read(game, &antenna.serial, card, false)).await?;
            Ok(Outcome::Staged)
        }
        [first] if first.card == card => Ok(Outcome::Ignored),
        [first] => {
            let hand = match q.hand_by_card(game, first.card).await? {
                Some(hand) => Some(hand),
                None => q.hand_by_card(game, card).await?,
            };
            q.delete_tag(first.id).await?;
            match hand {
                Some(hand) if hand.mucked => Ok(Outcome::Ignored),
                Some(hand) => {
                    q.muck_hand(hand.id).await?;
                    log::info!("[antenna {}] mucked hand {}", antenna.serial, hand.id);
                    Ok(Outcome::Mucked(hand.id))
                }
                None => Ok(Outcome::Unmatched(first.card)),
            }
        }
        _ => {
            for tag in held.iter() {
                q.delete_tag(tag.id).await?;
            }
            Ok(Outcome::Ignored)
        }
    }
}

async fn board(q: &mut dyn Queries, antenna: &Antenna, card: Card) -> Result<Outcome, Error> {
    let game = lifecycle::get_or_create_current(q).await?;
    let board = q.board(game).await?;
    if board.iter().any(|tag| tag.card == card) {
        return Ok(Outcome::Ignored);
    }
    if board.len() >= BOARD_LIMIT {
        return Err(Error::BoardLimitExceeded);
    }
    q.create_tag(&Tag::read(game, &antenna.serial, card, true)).await?;
    log::info!("[board] {} ({}/{})", card, board.len() + 1, BOARD_LIMIT);
    Ok(Outcome::Board(board.len() + 1))
}
