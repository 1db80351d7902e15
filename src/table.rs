//! The table service: reader ingestion, admin operations and the viewer
//! projection, all over one [`Database`].
//!
//! Every state change runs in a single transaction. Side effects that only
//! advise (watchdog bookkeeping, viewer pulses, equity requests) happen after
//! the commit, so a rolled back event leaves no trace in any of them.
use crate::Error;
use crate::ID;
use crate::Shutdown;
use crate::antenna::Role;
use crate::antenna::Serial;
use crate::antenna::registry;
use crate::assembler;
use crate::assembler::Outcome;
use crate::catalog::Catalog;
use crate::cards::Card;
use crate::equity::Engine;
use crate::equity::Evaluator;
use crate::equity::Queue;
use crate::lifecycle;
use crate::notify::Notifier;
use crate::notify::Pulses;
use crate::projection::Snapshot;
use crate::store::Antenna;
use crate::store::Database;
use crate::store::Game;
use crate::store::History;
use crate::store::Holding;
use crate::store::Player;
use crate::store::Queries;
use crate::watchdog::Watchdog;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Table<D> {
    db: Arc<D>,
    catalog: Catalog,
    notifier: Notifier,
    equity: Queue,
    worker: Mutex<Option<JoinHandle<()>>>,
    watchdog: Watchdog,
    shutdown: Shutdown,
    sessions: AtomicU64,
}

impl<D: Database> Table<D> {
    /// Wire the table and start its equity worker.
    pub fn new(
        db: Arc<D>,
        catalog: Catalog,
        evaluator: Arc<dyn Evaluator>,
        watchdog: Watchdog,
        shutdown: Shutdown,
    ) -> Arc<Self> {
        let notifier = Notifier::default();
        let engine = Arc::new(Engine::new(db.clone(), evaluator, notifier.clone()));
        let (equity, worker) = engine.spawn(shutdown.clone());
        Arc::new(Self {
            db,
            catalog,
            notifier,
            equity,
            worker: Mutex::new(Some(worker)),
            watchdog,
            shutdown,
            sessions: AtomicU64::new(1),
        })
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Wait for the equity worker to finish its pass after shutdown. Later
    /// calls return at once.
    pub async fn drain(&self) {
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(e) = worker.await {
                log::error!("[equity] worker ended abnormally: {}", e);
            }
        }
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    /// Validate a raw reader event without touching state.
    pub fn identify(&self, uid: &str, device: &str, pair: i64) -> Result<(Serial, Card), Error> {
        let serial = Serial::new(device, pair)?;
        let card = self.catalog.identify(uid)?;
        Ok((serial, card))
    }

    /// Apply one validated read and log what it did.
    pub async fn apply(&self, serial: Serial, card: Card) -> Result<Outcome, Error> {
        let tag = serial.clone();
        let outcome = self.assemble(serial, card).await;
        match outcome {
            Ok(ref outcome) => log::debug!("[ingest {}] {} {:?}", tag, card, outcome),
            Err(ref e) if e.is_validation() => log::warn!("[ingest {}] {} rejected: {}", tag, card, e),
            Err(ref e) => log::error!("[ingest {}] {} failed: {}", tag, card, e),
        }
        outcome
    }

    async fn assemble(&self, serial: Serial, card: Card) -> Result<Outcome, Error> {
        let (role, outcome) = self
            .db
            .transact(move |q| {
                Box::pin(async move {
                    let antenna = match registry::get_by_serial(q, &serial).await {
                        Ok(antenna) => antenna,
                        Err(Error::NotFound(_)) => registry::register_unknown(q, &serial).await?,
                        Err(e) => return Err(e),
                    };
                    let antenna = registry::seat(q, antenna).await?;
                    let outcome = assembler::assemble(q, &antenna, card).await?;
                    Ok((antenna.role, outcome))
                })
            })
            .await?;
        if role != Role::Unknown {
            self.watchdog.touch(role).await;
        }
        if outcome.is_mutation() {
            self.notifier.pulse();
        }
        if outcome.changes_equity() {
            self.equity.request();
        }
        match outcome {
            Outcome::Unmatched(first) => Err(Error::Inconsistent(format!(
                "mucked {} and {} belong to no hand",
                first, card
            ))),
            outcome => Ok(outcome),
        }
    }

    /// Full pipeline for one raw reader event.
    pub async fn ingest(&self, uid: &str, device: &str, pair: i64) -> Result<Outcome, Error> {
        let (serial, card) = self.identify(uid, device, pair)?;
        self.apply(serial, card).await
    }

    /// Register every antenna a device reports on power-up. Returns the
    /// serials seen for the first time.
    pub async fn boot(&self, device: &str, pairs: &[i64]) -> Result<Vec<Serial>, Error> {
        let serials = pairs
            .iter()
            .map(|pair| Serial::new(device, *pair))
            .collect::<Result<Vec<_>, _>>()?;
        let fresh = self
            .db
            .transact(move |q| {
                Box::pin(async move {
                    let mut fresh = Vec::new();
                    for serial in serials {
                        if q.antenna_by_serial(&serial).await?.is_none() {
                            registry::register_unknown(q, &serial).await?;
                            fresh.push(serial);
                        }
                    }
                    Ok(fresh)
                })
            })
            .await?;
        if !fresh.is_empty() {
            self.notifier.pulse();
        }
        log::info!("[boot {}] {} new antennas", device, fresh.len());
        Ok(fresh)
    }

    // ========================================================================
    // ADMIN
    // ========================================================================

    pub async fn antennas(&self) -> Result<Vec<Antenna>, Error> {
        self.db.transact(|q| Box::pin(q.antennas())).await
    }

    pub async fn assign(&self, id: ID<Antenna>, role: &str) -> Result<Antenna, Error> {
        let role = Role::try_from(role)?;
        let antenna = self
            .db
            .transact(move |q| {
                Box::pin(async move {
                    let antenna = q
                        .antenna(id)
                        .await?
                        .ok_or_else(|| Error::NotFound(format!("antenna {}", id)))?;
                    registry::set_role(q, &antenna.serial, role).await
                })
            })
            .await?;
        self.notifier.pulse();
        self.equity.request();
        Ok(antenna)
    }

    pub async fn remove_antenna(&self, id: ID<Antenna>) -> Result<Antenna, Error> {
        let antenna = self
            .db
            .transact(move |q| {
                Box::pin(async move {
                    let antenna = q
                        .antenna(id)
                        .await?
                        .ok_or_else(|| Error::NotFound(format!("antenna {}", id)))?;
                    registry::delete(q, &antenna.serial).await
                })
            })
            .await?;
        self.notifier.pulse();
        self.equity.request();
        Ok(antenna)
    }

    /// Every player with the serial of the antenna seating them, if any.
    pub async fn players(&self) -> Result<Vec<(Player, Option<Serial>)>, Error> {
        self.db
            .transact(|q| {
                Box::pin(async move {
                    let antennas = q.antennas().await?;
                    let players = q.players().await?;
                    Ok(players
                        .into_iter()
                        .map(|player| {
                            let serial = antennas
                                .iter()
                                .find(|a| a.player == Some(player.id))
                                .map(|a| a.serial.clone());
                            (player, serial)
                        })
                        .collect())
                })
            })
            .await
    }

    pub async fn rename(&self, id: ID<Player>, name: &str) -> Result<Player, Error> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidFormat("empty player name".into()));
        }
        let player = self
            .db
            .transact(move |q| {
                Box::pin(async move {
                    let mut player = q
                        .player(id)
                        .await?
                        .ok_or_else(|| Error::NotFound(format!("player {}", id)))?;
                    q.rename_player(id, &name).await?;
                    player.name = name;
                    Ok(player)
                })
            })
            .await?;
        self.notifier.pulse();
        Ok(player)
    }

    /// The player's hand in the current game.
    pub async fn hand(&self, id: ID<Player>) -> Result<Holding, Error> {
        self.db
            .transact(move |q| Box::pin(async move { current_hand(q, id).await }))
            .await
    }

    /// Fold the player's hand, as if the muck antenna had read it.
    pub async fn muck(&self, id: ID<Player>) -> Result<Holding, Error> {
        let (holding, changed) = self
            .db
            .transact(move |q| {
                Box::pin(async move {
                    let mut holding = current_hand(q, id).await?;
                    if holding.mucked {
                        return Ok((holding, false));
                    }
                    q.muck_hand(holding.hand).await?;
                    holding.mucked = true;
                    Ok((holding, true))
                })
            })
            .await?;
        if changed {
            log::info!("[admin] mucked hand {} of {}", holding.hand, holding.name);
            self.notifier.pulse();
            self.equity.request();
        }
        Ok(holding)
    }

    /// Archive the current game. Resets the watchdog either way.
    pub async fn clear(&self) -> Result<Option<ID<Game>>, Error> {
        let cleared = self.db.transact(|q| Box::pin(lifecycle::clear(q))).await?;
        self.watchdog.reset().await;
        self.notifier.pulse();
        self.equity.request();
        Ok(cleared)
    }

    pub async fn history(&self) -> Result<Vec<History>, Error> {
        self.db.transact(|q| Box::pin(q.history())).await
    }

    // ========================================================================
    // VIEWERS
    // ========================================================================

    pub async fn snapshot(&self) -> Result<Snapshot, Error> {
        self.db
            .transact(|q| {
                Box::pin(async move {
                    let Some(game) = lifecycle::current(q).await? else {
                        return Ok(Snapshot::default());
                    };
                    let holdings = q.holdings(game).await?;
                    let board = q
                        .board(game)
                        .await?
                        .into_iter()
                        .map(|tag| tag.card)
                        .collect::<Vec<_>>();
                    Ok(Snapshot::project(&holdings, &board))
                })
            })
            .await
    }

    pub fn subscribe(&self) -> Pulses {
        self.notifier.subscribe()
    }

    pub fn viewers(&self) -> usize {
        self.notifier.viewers()
    }

    /// Number the next viewer session, for logs.
    pub fn admit(&self) -> u64 {
        self.sessions.fetch_add(1, Ordering::Relaxed)
    }

    /// Current game, if any, for liveness probes.
    pub async fn health(&self) -> Result<Option<ID<Game>>, Error> {
        self.db.transact(|q| Box::pin(lifecycle::current(q))).await
    }

    // ========================================================================
    // WATCHDOG
    // ========================================================================

    /// Seed the watchdog from a game left open by a previous process.
    pub async fn rehydrate(&self) -> Result<(), Error> {
        let roles = self
            .db
            .transact(|q| {
                Box::pin(async move {
                    match lifecycle::current(q).await? {
                        Some(game) => q.roles_in_game(game).await,
                        None => Ok(vec![]),
                    }
                })
            })
            .await?;
        self.watchdog.rehydrate(&roles).await;
        Ok(())
    }

    /// Start the polling loop that clears silent games. `None` when the
    /// timeout is disabled.
    pub fn watch(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.watchdog.enabled() {
            log::info!("[watchdog] disabled");
            return None;
        }
        let mut shutdown = self.shutdown.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.watchdog.tick());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::info!("[watchdog] polling every {:?}", self.watchdog.tick());
            loop {
                tokio::select! {
                    biased;
                    _ = crate::stopped(&mut shutdown) => break,
                    _ = interval.tick() => {
                        if !self.watchdog.due().await {
                            continue;
                        }
                        match self.clear().await {
                            Ok(game) => log::info!("[watchdog] table went quiet, cleared {:?}", game),
                            Err(e) => log::warn!("[watchdog] clear failed, retrying next tick: {}", e),
                        }
                    }
                }
            }
            log::info!("[watchdog] stopped");
        }))
    }
}

/// A player's hand in the current game.
async fn current_hand(q: &mut dyn Queries, id: ID<Player>) -> Result<Holding, Error> {
    q.player(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("player {}", id)))?;
    let missing = || Error::NotFound(format!("hand of player {}", id));
    let game = lifecycle::current(q).await?.ok_or_else(missing)?;
    q.holdings(game)
        .await?
        .into_iter()
        .find(|h| h.player == id)
        .ok_or_else(missing)
}
