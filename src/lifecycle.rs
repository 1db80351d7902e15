//! The notion of a "current game": created lazily by the first card that
//! needs one, archived by an explicit clear or the watchdog.
use crate::Error;
use crate::ID;
use crate::store::Game;
use crate::store::History;
use crate::store::Queries;
use std::time::SystemTime;

/// Current game, starting one if none is open.
pub async fn get_or_create_current(q: &mut dyn Queries) -> Result<ID<Game>, Error> {
    match q.current_game().await? {
        Some(game) => Ok(game.id),
        None => {
            let game = Game::start();
            q.create_game(&game).await?;
            log::info!("[game {}] started", game.id);
            Ok(game.id)
        }
    }
}

/// Current game if one is open.
pub async fn current(q: &mut dyn Queries) -> Result<Option<ID<Game>>, Error> {
    Ok(q.current_game().await?.map(|game| game.id))
}

/// Archive the current game's hands and close it. `None` when nothing was open.
pub async fn clear(q: &mut dyn Queries) -> Result<Option<ID<Game>>, Error> {
    let Some(game) = q.current_game().await? else {
        return Ok(None);
    };
    let now = SystemTime::now();
    let holdings = q.holdings(game.id).await?;
    for holding in holdings.iter() {
        q.create_history(&History::archive(game.id, holding, now)).await?;
    }
    q.delete_game_tags(game.id).await?;
    q.delete_game_hands(game.id).await?;
    q.finish_game(game.id, now).await?;
    log::info!("[game {}] cleared, {} hands archived", game.id, holdings.len());
    Ok(Some(game.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antenna::Serial;
    use crate::cards::Card;
    use crate::store::Database;
    use crate::store::Hand;
    use crate::store::Memory;
    use crate::store::Player;
    use crate::store::Tag;

    /// a game holding one complete hand
    async fn seeded(db: &Memory) -> ID<Game> {
        db.transact(|q| {
            Box::pin(async move {
                let game = get_or_create_current(q).await?;
                let serial = Serial::new("dev1", 0)?;
                let player = Player::seated_at(&serial);
                q.create_player(&player).await?;
                let a = Tag::read(game, &serial, Card::try_from("Kd")?, false);
                let b = Tag::read(game, &serial, Card::try_from("As")?, false);
                q.create_tag(&a).await?;
                q.create_tag(&b).await?;
                let hand = Hand {
                    id: ID::default(),
                    game,
                    player: player.id,
                    a: a.id,
                    b: b.id,
                    mucked: false,
                    equity: Some(0.5),
                };
                q.create_hand(&hand).await?;
                q.attach_tag(a.id, hand.id).await?;
                q.attach_tag(b.id, hand.id).await?;
                Ok(game)
            })
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn current_game_is_reused() {
        let db = Memory::default();
        let (a, b) = db
            .transact(|q| {
                Box::pin(async move {
                    let a = get_or_create_current(q).await?;
                    let b = get_or_create_current(q).await?;
                    Ok((a, b))
                })
            })
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn clear_without_game_is_noop() {
        let db = Memory::default();
        let cleared = db.transact(|q| Box::pin(clear(q))).await.unwrap();
        assert_eq!(cleared, None);
    }

    #[tokio::test]
    async fn clear_archives_and_empties() {
        let db = Memory::default();
        let game = seeded(&db).await;
        let cleared = db.transact(|q| Box::pin(clear(q))).await.unwrap();
        assert_eq!(cleared, Some(game));
        let (history, holdings, board, current) = db
            .transact(move |q| {
                Box::pin(async move {
                    let history = q.history().await?;
                    let holdings = q.holdings(game).await?;
                    let board = q.board(game).await?;
                    let current = current(q).await?;
                    Ok((history, holdings, board, current))
                })
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].game, game);
        assert_eq!(history[0].player, "player-dev1-0");
        assert_eq!(history[0].hole.to_string(), "KdAs");
        assert!(holdings.is_empty());
        assert!(board.is_empty());
        assert_eq!(current, None);
    }

    #[tokio::test]
    async fn next_game_gets_fresh_id() {
        let db = Memory::default();
        let first = seeded(&db).await;
        db.transact(|q| Box::pin(clear(q))).await.unwrap();
        let second = db
            .transact(|q| Box::pin(get_or_create_current(q)))
            .await
            .unwrap();
        assert_ne!(first, second);
    }
}
