use super::*;
use crate::BOARD_LIMIT;
use crate::Error;
use crate::ID;
use crate::Shutdown;
use crate::lifecycle;
use crate::notify::Notifier;
use crate::store::Database;
use crate::store::Hand;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What a recompute pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompute {
    /// no current game
    Idle,
    /// fewer than two contenders; every equity is unset
    Reset,
    /// this many hands received fresh equity
    Updated(usize),
}

/// Recomputes equity for every hand still in contention.
///
/// Passes never overlap: the read, the evaluation and the write of one pass
/// all happen under one process-wide lock, so a pass that starts after a
/// mutation always sees it and two passes never interleave their writes.
pub struct Engine<D> {
    db: Arc<D>,
    evaluator: Arc<dyn Evaluator>,
    notifier: Notifier,
    lock: Mutex<()>,
}

impl<D: Database> Engine<D> {
    pub fn new(db: Arc<D>, evaluator: Arc<dyn Evaluator>, notifier: Notifier) -> Self {
        Self {
            db,
            evaluator,
            notifier,
            lock: Mutex::new(()),
        }
    }

    pub async fn recompute(&self) -> Result<Recompute, Error> {
        let _guard = self.lock.lock().await;
        let snapshot = self
            .db
            .transact(|q| {
                Box::pin(async move {
                    let Some(game) = lifecycle::current(q).await? else {
                        return Ok(None);
                    };
                    let holdings = q.holdings(game).await?;
                    let stale = holdings.iter().any(|h| h.equity.is_some());
                    let contenders = holdings
                        .into_iter()
                        .filter(|h| !h.mucked)
                        .collect::<Vec<_>>();
                    let dirty = contenders.iter().any(|h| h.equity.is_none());
                    let reset = stale && (dirty || contenders.len() < 2);
                    if reset {
                        q.reset_equity(game).await?;
                    }
                    let board = q
                        .board(game)
                        .await?
                        .into_iter()
                        .take(BOARD_LIMIT)
                        .map(|tag| tag.card)
                        .collect::<Vec<_>>();
                    Ok(Some((contenders, board, reset)))
                })
            })
            .await?;
        let Some((contenders, board, reset)) = snapshot else {
            return Ok(Recompute::Idle);
        };
        if reset {
            self.notifier.pulse();
        }
        if contenders.len() < 2 {
            return Ok(Recompute::Reset);
        }
        let hands = contenders.iter().map(|h| h.hand).collect::<Vec<ID<Hand>>>();
        let holes = contenders.iter().map(|h| h.hole).collect::<Vec<_>>();
        let evaluator = self.evaluator.clone();
        let equities = tokio::task::spawn_blocking(move || evaluator.evaluate(&holes, &board))
            .await?
            .inspect_err(|e| log::warn!("[equity] keeping last known values: {}", e))?;
        if equities.len() != hands.len() {
            return Err(Error::Evaluator(format!(
                "{} equities for {} hands",
                equities.len(),
                hands.len()
            )));
        }
        let n = hands.len();
        self.db
            .transact(move |q| {
                Box::pin(async move {
                    for (hand, equity) in hands.into_iter().zip(equities) {
                        q.set_equity(hand, Some(equity)).await?;
                    }
                    Ok(())
                })
            })
            .await?;
        self.notifier.pulse();
        log::debug!("[equity] refreshed {} hands", n);
        Ok(Recompute::Updated(n))
    }

    /// Start the single worker that drains recompute requests.
    pub fn spawn(self: Arc<Self>, mut shutdown: Shutdown) -> (Queue, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(async move {
            log::info!("[equity] worker started");
            loop {
                tokio::select! {
                    biased;
                    _ = crate::stopped(&mut shutdown) => break,
                    request = rx.recv() => match request {
                        None => break,
                        Some(()) => match self.recompute().await {
                            Ok(outcome) => log::debug!("[equity] {:?}", outcome),
                            Err(e) => log::warn!("[equity] recompute failed: {}", e),
                        },
                    },
                }
            }
            log::info!("[equity] worker stopped");
        });
        (Queue(tx), handle)
    }
}

/// Handle for requesting a recompute without waiting for it.
///
/// At most one request waits behind the running pass; later requests fold
/// into it, since a pass reads fresh state when it starts.
#[derive(Debug, Clone)]
pub struct Queue(mpsc::Sender<()>);

impl Queue {
    pub fn request(&self) {
        match self.0.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                log::debug!("[equity] worker gone, request dropped")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Probability;
    use crate::antenna::Role;
    use crate::antenna::Serial;
    use crate::antenna::registry;
    use crate::assembler;
    use crate::cards::Card;
    use crate::cards::Hole;
    use crate::store::Holding;
    use crate::store::Memory;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    /// splits equity evenly and counts its calls
    #[derive(Default)]
    struct Even(AtomicUsize);
    impl Evaluator for Even {
        fn evaluate(&self, holes: &[Hole], _: &[Card]) -> Result<Vec<Probability>, Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0 / holes.len() as Probability; holes.len()])
        }
    }

    struct Broken;
    impl Evaluator for Broken {
        fn evaluate(&self, _: &[Hole], _: &[Card]) -> Result<Vec<Probability>, Error> {
            Err(Error::Evaluator("offline".into()))
        }
    }

    async fn read(db: &Memory, serial: &str, role: Role, label: &str) {
        let serial = Serial::try_from(serial).unwrap();
        let card = Card::try_from(label).unwrap();
        db.transact(move |q| {
            Box::pin(async move {
                let antenna = match q.antenna_by_serial(&serial).await? {
                    Some(antenna) => antenna,
                    None => {
                        registry::register_unknown(q, &serial).await?;
                        registry::set_role(q, &serial, role).await?
                    }
                };
                assembler::assemble(q, &antenna, card).await
            })
        })
        .await
        .unwrap();
    }

    async fn holdings(db: &Memory) -> Vec<Holding> {
        db.transact(|q| {
            Box::pin(async move {
                let game = lifecycle::get_or_create_current(q).await?;
                q.holdings(game).await
            })
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn idle_without_game() {
        let db = Arc::new(Memory::default());
        let engine = Engine::new(db, Arc::new(Even::default()), Notifier::default());
        assert_eq!(engine.recompute().await, Ok(Recompute::Idle));
    }

    #[tokio::test]
    async fn single_contender_is_reset() {
        let db = Arc::new(Memory::default());
        read(&db, "dev1-0", Role::Player, "As").await;
        read(&db, "dev1-0", Role::Player, "Kd").await;
        let even = Arc::new(Even::default());
        let engine = Engine::new(db.clone(), even.clone(), Notifier::default());
        assert_eq!(engine.recompute().await, Ok(Recompute::Reset));
        assert_eq!(even.0.load(Ordering::SeqCst), 0);
        assert!(holdings(&db).await.iter().all(|h| h.equity.is_none()));
    }

    #[tokio::test]
    async fn contenders_share_equity() {
        let db = Arc::new(Memory::default());
        read(&db, "dev1-0", Role::Player, "As").await;
        read(&db, "dev1-0", Role::Player, "Kd").await;
        read(&db, "dev2-0", Role::Player, "7h").await;
        read(&db, "dev2-0", Role::Player, "7c").await;
        let notifier = Notifier::default();
        let pulses = notifier.subscribe();
        let engine = Engine::new(db.clone(), Arc::new(Even::default()), notifier);
        assert_eq!(engine.recompute().await, Ok(Recompute::Updated(2)));
        assert!(pulses.pending());
        let equities = holdings(&db)
            .await
            .iter()
            .map(|h| h.equity)
            .collect::<Vec<_>>();
        assert_eq!(equities, vec![Some(0.5), Some(0.5)]);
    }

    #[tokio::test]
    async fn mucked_hands_leave_contention() {
        let db = Arc::new(Memory::default());
        read(&db, "dev1-0", Role::Player, "As").await;
        read(&db, "dev1-0", Role::Player, "Kd").await;
        read(&db, "dev2-0", Role::Player, "7h").await;
        read(&db, "dev2-0", Role::Player, "7c").await;
        let engine = Engine::new(db.clone(), Arc::new(Even::default()), Notifier::default());
        engine.recompute().await.unwrap();
        read(&db, "dev3-0", Role::Muck, "7h").await;
        read(&db, "dev3-0", Role::Muck, "7c").await;
        assert_eq!(engine.recompute().await, Ok(Recompute::Reset));
        assert!(holdings(&db).await.iter().all(|h| h.equity.is_none()));
    }

    #[tokio::test]
    async fn evaluator_failure_keeps_last_values() {
        let db = Arc::new(Memory::default());
        read(&db, "dev1-0", Role::Player, "As").await;
        read(&db, "dev1-0", Role::Player, "Kd").await;
        read(&db, "dev2-0", Role::Player, "7h").await;
        read(&db, "dev2-0", Role::Player, "7c").await;
        Engine::new(db.clone(), Arc::new(Even::default()), Notifier::default())
            .recompute()
            .await
            .unwrap();
        read(&db, "dev9-0", Role::Board, "2c").await;
        let broken = Engine::new(db.clone(), Arc::new(Broken), Notifier::default());
        assert!(matches!(broken.recompute().await, Err(Error::Evaluator(_))));
        assert!(holdings(&db).await.iter().all(|h| h.equity == Some(0.5)));
    }

    #[tokio::test]
    async fn new_hand_forces_reset_before_evaluation() {
        let db = Arc::new(Memory::default());
        read(&db, "dev1-0", Role::Player, "As").await;
        read(&db, "dev1-0", Role::Player, "Kd").await;
        read(&db, "dev2-0", Role::Player, "7h").await;
        read(&db, "dev2-0", Role::Player, "7c").await;
        Engine::new(db.clone(), Arc::new(Even::default()), Notifier::default())
            .recompute()
            .await
            .unwrap();
        read(&db, "dev3-0", Role::Player, "2d").await;
        read(&db, "dev3-0", Role::Player, "3d").await;
        let broken = Engine::new(db.clone(), Arc::new(Broken), Notifier::default());
        assert!(broken.recompute().await.is_err());
        assert!(holdings(&db).await.iter().all(|h| h.equity.is_none()));
    }

    #[tokio::test]
    async fn queued_requests_coalesce() {
        let db = Arc::new(Memory::default());
        read(&db, "dev1-0", Role::Player, "As").await;
        read(&db, "dev1-0", Role::Player, "Kd").await;
        read(&db, "dev2-0", Role::Player, "7h").await;
        read(&db, "dev2-0", Role::Player, "7c").await;
        let even = Arc::new(Even::default());
        let engine = Arc::new(Engine::new(db.clone(), even.clone(), Notifier::default()));
        let (tx, shutdown) = tokio::sync::watch::channel(false);
        let lock = engine.lock.lock().await;
        let (queue, handle) = engine.clone().spawn(shutdown);
        for _ in 0..10 {
            queue.request();
        }
        drop(lock);
        while even.0.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(even.0.load(Ordering::SeqCst) <= 2);
        assert!(holdings(&db).await.iter().all(|h| h.equity == Some(0.5)));
    }
}
