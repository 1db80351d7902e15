//! Timeout Watchdog bookkeeping.
//!
//! A game counts as started once both a player antenna and the board antenna
//! have read. From then on, when every role that has read stays silent past
//! the timeout, the game is due to be cleared.
use crate::antenna::Role;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Last successful read per role category for the current game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchdogState {
    player: Option<Instant>,
    board: Option<Instant>,
    muck: Option<Instant>,
}

impl WatchdogState {
    pub fn touch(&mut self, role: Role, at: Instant) {
        match role {
            Role::Player => self.player = Some(at),
            Role::Board => self.board = Some(at),
            Role::Muck => self.muck = Some(at),
            Role::Unknown => {}
        }
    }
    pub fn started(&self) -> bool {
        self.player.is_some() && self.board.is_some()
    }
    pub fn expired(&self, now: Instant, timeout: Duration) -> bool {
        self.started()
            && [self.player, self.board, self.muck]
                .into_iter()
                .flatten()
                .all(|last| now.saturating_duration_since(last) > timeout)
    }
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shared bookkeeping plus the polling parameters.
///
/// The state is advisory, so a plain read/write lock guards it.
#[derive(Debug)]
pub struct Watchdog {
    state: RwLock<WatchdogState>,
    timeout: Option<Duration>,
    tick: Duration,
}

impl Watchdog {
    /// A zero timeout disables the watchdog.
    pub fn new(timeout: Duration, tick: Duration) -> Self {
        Self {
            state: RwLock::new(WatchdogState::default()),
            timeout: Some(timeout).filter(|t| !t.is_zero()),
            tick: tick.max(Duration::from_millis(1)),
        }
    }
    pub fn enabled(&self) -> bool {
        self.timeout.is_some()
    }
    pub fn tick(&self) -> Duration {
        self.tick
    }
    pub async fn touch(&self, role: Role) {
        self.state.write().await.touch(role, Instant::now());
    }
    pub async fn reset(&self) {
        self.state.write().await.reset();
    }
    /// Treat every role that already read into the current game as having
    /// read just now.
    pub async fn rehydrate(&self, roles: &[Role]) {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.reset();
        roles.iter().for_each(|role| state.touch(*role, now));
        log::info!("[watchdog] rehydrated {:?}", *state);
    }
    pub async fn due(&self) -> bool {
        match self.timeout {
            Some(timeout) => self.state.read().await.expired(Instant::now(), timeout),
            None => false,
        }
    }
    pub async fn state(&self) -> WatchdogState {
        *self.state.read().await
    }
}
