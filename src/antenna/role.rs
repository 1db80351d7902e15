use crate::Error;

/// What an antenna's reads mean to the table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    #[default]
    Unknown,
    Player,
    Muck,
    Board,
}

impl Role {
    pub const fn all() -> [Role; 4] {
        [Role::Unknown, Role::Player, Role::Muck, Role::Board]
    }
    /// at most one antenna may hold this role
    pub fn is_singleton(&self) -> bool {
        matches!(self, Role::Muck | Role::Board)
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unknown => "unknown",
            Role::Player => "player",
            Role::Muck => "muck",
            Role::Board => "board",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Role::all()
            .into_iter()
            .find(|role| role.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| Error::InvalidRole(s.to_string()))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_str() {
        for role in Role::all() {
            assert_eq!(Role::try_from(role.as_str()), Ok(role));
        }
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(Role::try_from("dealer"), Err(Error::InvalidRole("dealer".to_string())));
    }

    #[test]
    fn singletons() {
        assert!(Role::Board.is_singleton());
        assert!(Role::Muck.is_singleton());
        assert!(!Role::Player.is_singleton());
        assert!(!Role::Unknown.is_singleton());
    }
}
