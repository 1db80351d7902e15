use crate::antenna::Role;

/// Everything that can go wrong between a reader event and a committed state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// unknown antenna, player, hand or uid
    NotFound(String),
    /// malformed card label or serial
    InvalidFormat(String),
    /// role name outside the closed set
    InvalidRole(String),
    /// a singleton role already held by another antenna
    RoleConflict(Role),
    /// the board already holds its five cards
    BoardLimitExceeded,
    /// stored state contradicts an incoming event
    Inconsistent(String),
    /// transaction or connection failure
    Storage(String),
    /// showdown computation failed
    Evaluator(String),
}

impl Error {
    /// Malformed input rejected before touching state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_) | Error::InvalidRole(_) | Error::BoardLimitExceeded
        )
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::NotFound(what) => write!(f, "not found: {}", what),
            Error::InvalidFormat(what) => write!(f, "invalid format: {}", what),
            Error::InvalidRole(role) => write!(f, "invalid role: {}", role),
            Error::RoleConflict(role) => write!(f, "another antenna already holds role {}", role),
            Error::BoardLimitExceeded => write!(f, "board already holds {} cards", crate::BOARD_LIMIT),
            Error::Inconsistent(what) => write!(f, "inconsistent state: {}", what),
            Error::Storage(what) => write!(f, "storage failure: {}", what),
            Error::Evaluator(what) => write!(f, "equity evaluation failed: {}", what),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "database")]
impl From<tokio_postgres::Error> for Error {
    fn from(e: tokio_postgres::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Evaluator(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_distinct() {
        assert!(Error::InvalidFormat("x".into()).is_validation());
        assert!(Error::InvalidRole("dealer".into()).is_validation());
        assert!(!Error::NotFound("x".into()).is_validation());
        assert!(!Error::RoleConflict(Role::Board).is_validation());
        assert!(!Error::Storage("x".into()).is_validation());
    }

    #[test]
    fn conflict_names_the_role() {
        assert!(Error::RoleConflict(Role::Muck).to_string().contains("muck"));
    }
}
