use super::*;
use crate::ID;
use crate::Probability;
use crate::antenna::Role;
use crate::antenna::Serial;
use crate::cards::Card;
use std::time::SystemTime;

/// Queries defines every primitive read and write against the table's state.
/// Implementations run each call inside an already open transaction, so a
/// sequence of calls made through one `&mut dyn Queries` commits or rolls back
/// as a unit.
#[async_trait::async_trait]
pub trait Queries: Send {
    // games
    async fn current_game(&mut self) -> Result<Option<Game>, Error>;
    async fn create_game(&mut self, game: &Game) -> Result<(), Error>;
    async fn finish_game(&mut self, game: ID<Game>, at: SystemTime) -> Result<(), Error>;

    // antennas
    async fn antennas(&mut self) -> Result<Vec<Antenna>, Error>;
    async fn antenna(&mut self, id: ID<Antenna>) -> Result<Option<Antenna>, Error>;
    async fn antenna_by_serial(&mut self, serial: &Serial) -> Result<Option<Antenna>, Error>;
    async fn antennas_by_role(&mut self, role: Role) -> Result<Vec<Antenna>, Error>;
    async fn create_antenna(&mut self, antenna: &Antenna) -> Result<(), Error>;
    async fn update_antenna(&mut self, antenna: &Antenna) -> Result<(), Error>;
    async fn delete_antenna(&mut self, id: ID<Antenna>) -> Result<(), Error>;

    // players
    async fn players(&mut self) -> Result<Vec<Player>, Error>;
    async fn player(&mut self, id: ID<Player>) -> Result<Option<Player>, Error>;
    async fn create_player(&mut self, player: &Player) -> Result<(), Error>;
    async fn rename_player(&mut self, id: ID<Player>, name: &str) -> Result<(), Error>;
    async fn delete_player(&mut self, id: ID<Player>) -> Result<(), Error>;

    // tags, ordered by read time
    async fn tags_by_serial(&mut self, game: ID<Game>, serial: &Serial) -> Result<Vec<Tag>, Error>;
    async fn board(&mut self, game: ID<Game>) -> Result<Vec<Tag>, Error>;
    async fn create_tag(&mut self, tag: &Tag) -> Result<(), Error>;
    async fn attach_tag(&mut self, tag: ID<Tag>, hand: ID<Hand>) -> Result<(), Error>;
    async fn delete_tag(&mut self, tag: ID<Tag>) -> Result<(), Error>;
    async fn delete_tags_by_serial(&mut self, serial: &Serial) -> Result<(), Error>;
    async fn delete_board(&mut self) -> Result<(), Error>;
    async fn delete_game_tags(&mut self, game: ID<Game>) -> Result<(), Error>;

    // hands
    async fn create_hand(&mut self, hand: &Hand) -> Result<(), Error>;
    async fn hand_by_card(&mut self, game: ID<Game>, card: Card) -> Result<Option<Hand>, Error>;
    async fn hand_by_player(&mut self, game: ID<Game>, player: ID<Player>) -> Result<Option<Hand>, Error>;
    async fn holdings(&mut self, game: ID<Game>) -> Result<Vec<Holding>, Error>;
    async fn muck_hand(&mut self, hand: ID<Hand>) -> Result<(), Error>;
    async fn set_equity(&mut self, hand: ID<Hand>, equity: Option<Probability>) -> Result<(), Error>;
    async fn reset_equity(&mut self, game: ID<Game>) -> Result<(), Error>;
    async fn delete_hands_by_player(&mut self, player: ID<Player>) -> Result<(), Error>;
    async fn delete_game_hands(&mut self, game: ID<Game>) -> Result<(), Error>;

    // archive
    async fn create_history(&mut self, history: &History) -> Result<(), Error>;
    async fn history(&mut self) -> Result<Vec<History>, Error>;

    /// roles of the antennas whose reads are still stored for this game
    async fn roles_in_game(&mut self, game: ID<Game>) -> Result<Vec<Role>, Error>;
}
