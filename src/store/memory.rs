use super::*;
use crate::ID;
use crate::Probability;
use crate::antenna::Role;
use crate::antenna::Serial;
use crate::cards::Card;
use crate::cards::Hole;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;

/// In-process store. Each transaction works on a private copy of the tables
/// and swaps it in on commit, so a failed body leaves nothing behind.
///
/// The append-only archives sit behind `Arc` and are only copied by the rare
/// transaction that writes them.
#[derive(Default)]
pub struct Memory(Mutex<Tables>);

#[derive(Debug, Clone, Default)]
pub struct Tables {
    games: Arc<Vec<Game>>,
    antennas: Vec<Antenna>,
    players: Vec<Player>,
    tags: Vec<Tag>,
    hands: Vec<Hand>,
    history: Arc<Vec<History>>,
}

#[async_trait::async_trait]
impl Database for Memory {
    async fn transact<T, F>(&self, body: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: for<'q> FnOnce(&'q mut dyn Queries) -> BoxFuture<'q, Result<T, Error>> + Send + 'static,
    {
        let mut tables = self.0.lock().await;
        let mut draft = tables.clone();
        let output = body(&mut draft).await?;
        *tables = draft;
        Ok(output)
    }
}

impl Tables {
    fn sorted(mut tags: Vec<Tag>) -> Vec<Tag> {
        tags.sort_by_key(|t| (t.read, t.id));
        tags
    }
    fn tag(&self, id: ID<Tag>) -> Result<&Tag, Error> {
        self.tags
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::Inconsistent(format!("hand references missing tag {}", id)))
    }
    fn hand_mut(&mut self, id: ID<Hand>) -> Option<&mut Hand> {
        self.hands.iter_mut().find(|h| h.id == id)
    }
}

#[async_trait::async_trait]
impl Queries for Tables {
    async fn current_game(&mut self) -> Result<Option<Game>, Error> {
        Ok(self.games.iter().find(|g| g.is_current()).cloned())
    }
    async fn create_game(&mut self, game: &Game) -> Result<(), Error> {
        match self.games.iter().any(|g| g.is_current()) {
            true => Err(Error::Storage("a current game already exists".into())),
            false => Ok(Arc::make_mut(&mut self.games).push(game.clone())),
        }
    }
    async fn finish_game(&mut self, game: ID<Game>, at: SystemTime) -> Result<(), Error> {
        Arc::make_mut(&mut self.games)
            .iter_mut()
            .filter(|g| g.id == game)
            .for_each(|g| g.finished = Some(at));
        Ok(())
    }

    async fn antennas(&mut self) -> Result<Vec<Antenna>, Error> {
        let mut antennas = self.antennas.clone();
        antennas.sort_by(|a, b| a.serial.cmp(&b.serial));
        Ok(antennas)
    }
    async fn antenna(&mut self, id: ID<Antenna>) -> Result<Option<Antenna>, Error> {
        Ok(self.antennas.iter().find(|a| a.id == id).cloned())
    }
    async fn antenna_by_serial(&mut self, serial: &Serial) -> Result<Option<Antenna>, Error> {
        Ok(self.antennas.iter().find(|a| &a.serial == serial).cloned())
    }
    async fn antennas_by_role(&mut self, role: Role) -> Result<Vec<Antenna>, Error> {
        Ok(self.antennas.iter().filter(|a| a.role == role).cloned().collect())
    }
    async fn create_antenna(&mut self, antenna: &Antenna) -> Result<(), Error> {
        match self.antennas.iter().any(|a| a.serial == antenna.serial) {
            true => Err(Error::Storage(format!("duplicate antenna {}", antenna.serial))),
            false => Ok(self.antennas.push(antenna.clone())),
        }
    }
    async fn update_antenna(&mut self, antenna: &Antenna) -> Result<(), Error> {
        self.antennas
            .iter_mut()
            .filter(|a| a.id == antenna.id)
            .for_each(|a| *a = antenna.clone());
        Ok(())
    }
    async fn delete_antenna(&mut self, id: ID<Antenna>) -> Result<(), Error> {
        self.antennas.retain(|a| a.id != id);
        Ok(())
    }

    async fn players(&mut self) -> Result<Vec<Player>, Error> {
        Ok(self.players.clone())
    }
    async fn player(&mut self, id: ID<Player>) -> Result<Option<Player>, Error> {
        Ok(self.players.iter().find(|p| p.id == id).cloned())
    }
    async fn create_player(&mut self, player: &Player) -> Result<(), Error> {
        self.players.push(player.clone());
        Ok(())
    }
    async fn rename_player(&mut self, id: ID<Player>, name: &str) -> Result<(), Error> {
        self.players
            .iter_mut()
            .filter(|p| p.id == id)
            .for_each(|p| p.name = name.to_string());
        Ok(())
    }
    async fn delete_player(&mut self, id: ID<Player>) -> Result<(), Error> {
        self.players.retain(|p| p.id != id);
        self.antennas
            .iter_mut()
            .filter(|a| a.player == Some(id))
            .for_each(|a| a.player = None);
        Ok(())
    }

    async fn tags_by_serial(&mut self, game: ID<Game>, serial: &Serial) -> Result<Vec<Tag>, Error> {
        Ok(Self::sorted(
            self.tags
                .iter()
                .filter(|t| t.game == game && &t.serial == serial)
                .cloned()
                .collect(),
        ))
    }
    async fn board(&mut self, game: ID<Game>) -> Result<Vec<Tag>, Error> {
        Ok(Self::sorted(
            self.tags
                .iter()
                .filter(|t| t.game == game && t.is_board)
                .cloned()
                .collect(),
        ))
    }
    async fn create_tag(&mut self, tag: &Tag) -> Result<(), Error> {
        match self
            .tags
            .iter()
            .any(|t| t.game == tag.game && t.serial == tag.serial && t.card == tag.card)
        {
            true => Err(Error::Storage(format!("duplicate tag {} on {}", tag.card, tag.serial))),
            false => Ok(self.tags.push(tag.clone())),
        }
    }
    async fn attach_tag(&mut self, tag: ID<Tag>, hand: ID<Hand>) -> Result<(), Error> {
        self.tags
            .iter_mut()
            .filter(|t| t.id == tag)
            .for_each(|t| t.hand = Some(hand));
        Ok(())
    }
    async fn delete_tag(&mut self, tag: ID<Tag>) -> Result<(), Error> {
        self.tags.retain(|t| t.id != tag);
        Ok(())
    }
    async fn delete_tags_by_serial(&mut self, serial: &Serial) -> Result<(), Error> {
        self.tags.retain(|t| &t.serial != serial);
        Ok(())
    }
    async fn delete_board(&mut self) -> Result<(), Error> {
        self.tags.retain(|t| !t.is_board);
        Ok(())
    }
    async fn delete_game_tags(&mut self, game: ID<Game>) -> Result<(), Error> {
        self.tags.retain(|t| t.game != game);
        Ok(())
    }

    async fn create_hand(&mut self, hand: &Hand) -> Result<(), Error> {
        self.hands.push(hand.clone());
        Ok(())
    }
    async fn hand_by_card(&mut self, game: ID<Game>, card: Card) -> Result<Option<Hand>, Error> {
        Ok(self
            .tags
            .iter()
            .filter(|t| t.game == game && t.card == card)
            .filter_map(|t| t.hand)
            .find_map(|id| self.hands.iter().find(|h| h.id == id))
            .cloned())
    }
    async fn hand_by_player(&mut self, game: ID<Game>, player: ID<Player>) -> Result<Option<Hand>, Error> {
        Ok(self
            .hands
            .iter()
            .find(|h| h.game == game && h.player == player)
            .cloned())
    }
    async fn holdings(&mut self, game: ID<Game>) -> Result<Vec<Holding>, Error> {
        let mut hands = self
            .hands
            .iter()
            .filter(|h| h.game == game)
            .collect::<Vec<_>>();
        hands.sort_by_key(|h| h.id);
        hands
            .into_iter()
            .map(|h| {
                let a = self.tag(h.a)?.card;
                let b = self.tag(h.b)?.card;
                let name = self
                    .players
                    .iter()
                    .find(|p| p.id == h.player)
                    .map(|p| p.name.clone())
                    .ok_or_else(|| Error::Inconsistent(format!("hand {} has no player", h.id)))?;
                Ok(Holding {
                    hand: h.id,
                    player: h.player,
                    name,
                    hole: Hole::try_from((a, b))?,
                    mucked: h.mucked,
                    equity: h.equity,
                })
            })
            .collect()
    }
    async fn muck_hand(&mut self, hand: ID<Hand>) -> Result<(), Error> {
        if let Some(h) = self.hand_mut(hand) {
            h.mucked = true;
        }
        Ok(())
    }
    async fn set_equity(&mut self, hand: ID<Hand>, equity: Option<Probability>) -> Result<(), Error> {
        if let Some(h) = self.hand_mut(hand) {
            h.equity = equity;
        }
        Ok(())
    }
    async fn reset_equity(&mut self, game: ID<Game>) -> Result<(), Error> {
        self.hands
            .iter_mut()
            .filter(|h| h.game == game)
            .for_each(|h| h.equity = None);
        Ok(())
    }
    async fn delete_hands_by_player(&mut self, player: ID<Player>) -> Result<(), Error> {
        let doomed = self
            .hands
            .iter()
            .filter(|h| h.player == player)
            .map(|h| h.id)
            .collect::<Vec<_>>();
        self.tags.retain(|t| t.hand.map_or(true, |h| !doomed.contains(&h)));
        self.hands.retain(|h| h.player != player);
        Ok(())
    }
    async fn delete_game_hands(&mut self, game: ID<Game>) -> Result<(), Error> {
        self.hands.retain(|h| h.game != game);
        Ok(())
    }

    async fn create_history(&mut self, history: &History) -> Result<(), Error> {
        Arc::make_mut(&mut self.history).push(history.clone());
        Ok(())
    }
    async fn history(&mut self) -> Result<Vec<History>, Error> {
        Ok(self.history.to_vec())
    }

    async fn roles_in_game(&mut self, game: ID<Game>) -> Result<Vec<Role>, Error> {
        let mut roles = self
            .tags
            .iter()
            .filter(|t| t.game == game)
            .filter_map(|t| self.antennas.iter().find(|a| a.serial == t.serial))
            .map(|a| a.role)
            .collect::<Vec<_>>();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explode() -> Result<(), Error> {
        panic!("body failed after writing")
    }

    async fn antennas(db: &Memory) -> Vec<Antenna> {
        db.transact(|q| Box::pin(async move { q.antennas().await }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn commits_on_ok() {
        let db = Memory::default();
        let antenna = Antenna::from(Serial::new("dev1", 0).unwrap());
        db.transact(move |q| Box::pin(async move { q.create_antenna(&antenna).await }))
            .await
            .unwrap();
        assert_eq!(antennas(&db).await.len(), 1);
    }

    #[tokio::test]
    async fn rolls_back_writes_on_err() {
        let db = Memory::default();
        let antenna = Antenna::from(Serial::new("dev1", 0).unwrap());
        let card = Card::try_from("As").unwrap();
        let result = db
            .transact(move |q| {
                Box::pin(async move {
                    q.create_antenna(&antenna).await?;
                    let game = Game::start();
                    q.create_game(&game).await?;
                    q.create_tag(&Tag::read(game.id, &antenna.serial, card, false)).await?;
                    Err::<(), _>(Error::Inconsistent("late failure".into()))
                })
            })
            .await;
        assert!(matches!(result, Err(Error::Inconsistent(_))));
        assert!(antennas(&db).await.is_empty());
        let game = db
            .transact(|q| Box::pin(async move { q.current_game().await }))
            .await
            .unwrap();
        assert_eq!(game, None);
    }

    #[tokio::test]
    async fn rolls_back_writes_on_panic() {
        let db = Arc::new(Memory::default());
        let antenna = Antenna::from(Serial::new("dev1", 0).unwrap());
        let task = tokio::spawn({
            let db = db.clone();
            async move {
                db.transact(move |q| {
                    Box::pin(async move {
                        q.create_antenna(&antenna).await?;
                        explode()
                    })
                })
                .await
            }
        });
        assert!(task.await.unwrap_err().is_panic());
        assert!(antennas(&db).await.is_empty());
    }

    #[tokio::test]
    async fn reads_share_the_archive() {
        let db = Memory::default();
        let hole = Hole::try_from((Card::try_from("As").unwrap(), Card::try_from("Kd").unwrap())).unwrap();
        db.transact(move |q| {
            Box::pin(async move {
                let game = Game::start();
                q.create_game(&game).await?;
                let holding = Holding {
                    hand: ID::default(),
                    player: ID::default(),
                    name: "alice".into(),
                    hole,
                    mucked: false,
                    equity: None,
                };
                q.create_history(&History::archive(game.id, &holding, SystemTime::now())).await
            })
        })
        .await
        .unwrap();
        let before = db.0.lock().await.history.clone();
        db.transact(|q| Box::pin(async move { q.history().await }))
            .await
            .unwrap();
        let after = db.0.lock().await.history.clone();
        assert_eq!(after.len(), 1);
        assert!(Arc::ptr_eq(&before, &after));
    }
}
