use super::*;
use crate::ID;
use crate::Probability;
use crate::antenna::Role;
use crate::antenna::Serial;
use crate::cards::Card;
use crate::cards::Hole;
use const_format::concatcp;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tokio_postgres::Client;
use tokio_postgres::Row;
use tokio_postgres::Transaction;

/// Table for games, current and finished.
#[rustfmt::skip]
pub const GAMES:    &str = "game";
/// Table for antennas and their roles.
#[rustfmt::skip]
pub const ANTENNAS: &str = "antenna";
/// Table for seated players.
#[rustfmt::skip]
pub const PLAYERS:  &str = "player";
/// Table for physical card reads.
#[rustfmt::skip]
pub const TAGS:     &str = "tag";
/// Table for assembled two card hands.
#[rustfmt::skip]
pub const HANDS:    &str = "hand";
/// Table for hands archived by a clear.
#[rustfmt::skip]
pub const HISTORY:  &str = "hand_history";

#[rustfmt::skip]
const SCHEMA: &str = concatcp!(
    "CREATE TABLE IF NOT EXISTS ", GAMES, " (",
        "id         UUID PRIMARY KEY, ",
        "started    TIMESTAMPTZ NOT NULL, ",
        "finished   TIMESTAMPTZ",
    "); ",
    "CREATE UNIQUE INDEX IF NOT EXISTS ", GAMES, "_current ",
        "ON ", GAMES, " ((finished IS NULL)) WHERE finished IS NULL; ",
    "CREATE TABLE IF NOT EXISTS ", PLAYERS, " (",
        "id         UUID PRIMARY KEY, ",
        "name       TEXT NOT NULL",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", ANTENNAS, " (",
        "id         UUID PRIMARY KEY, ",
        "serial     TEXT NOT NULL UNIQUE, ",
        "role       TEXT NOT NULL, ",
        "player_id  UUID REFERENCES ", PLAYERS, " (id) ON DELETE SET NULL",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", TAGS, " (",
        "id         UUID PRIMARY KEY, ",
        "game_id    UUID NOT NULL REFERENCES ", GAMES, " (id), ",
        "serial     TEXT NOT NULL, ",
        "card       SMALLINT NOT NULL, ",
        "is_board   BOOLEAN NOT NULL, ",
        "hand_id    UUID, ",
        "read_at    TIMESTAMPTZ NOT NULL, ",
        "UNIQUE (game_id, serial, card)",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", HANDS, " (",
        "id         UUID PRIMARY KEY, ",
        "game_id    UUID NOT NULL REFERENCES ", GAMES, " (id), ",
        "player_id  UUID NOT NULL REFERENCES ", PLAYERS, " (id) ON DELETE CASCADE, ",
        "card_a     UUID NOT NULL, ",
        "card_b     UUID NOT NULL, ",
        "is_muck    BOOLEAN NOT NULL DEFAULT FALSE, ",
        "equity     REAL",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", HISTORY, " (",
        "id         UUID PRIMARY KEY, ",
        "game_id    UUID NOT NULL, ",
        "player     TEXT NOT NULL, ",
        "hole       BIGINT NOT NULL, ",
        "is_muck    BOOLEAN NOT NULL, ",
        "equity     REAL, ",
        "archived   TIMESTAMPTZ NOT NULL",
    ");"
);

/// PostgreSQL store over a single connection. Transactions are serialized
/// by the connection lock; a transaction dropped without commit rolls back.
pub struct Postgres(Mutex<Client>);

impl Postgres {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        log::info!("[store] connecting to database");
        let (client, connection) = tokio_postgres::connect(url, tokio_postgres::NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("[store] database connection closed: {}", e);
            }
        });
        client.execute("SET client_min_messages TO WARNING", &[]).await?;
        client.batch_execute(SCHEMA).await?;
        log::info!("[store] schema ready");
        Ok(Self(Mutex::new(client)))
    }
}

#[async_trait::async_trait]
impl Database for Postgres {
    async fn transact<T, F>(&self, body: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: for<'q> FnOnce(&'q mut dyn Queries) -> BoxFuture<'q, Result<T, Error>> + Send + 'static,
    {
        let mut client = self.0.lock().await;
        let mut tx = client.transaction().await?;
        let output = body(&mut tx).await?;
        tx.commit().await?;
        Ok(output)
    }
}

fn game(row: &Row) -> Game {
    Game {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        started: row.get::<_, SystemTime>(1),
        finished: row.get::<_, Option<SystemTime>>(2),
    }
}
fn antenna(row: &Row) -> Result<Antenna, Error> {
    Ok(Antenna {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        serial: Serial::try_from(row.get::<_, &str>(1))?,
        role: Role::try_from(row.get::<_, &str>(2))?,
        player: row.get::<_, Option<uuid::Uuid>>(3).map(ID::from),
    })
}
fn player(row: &Row) -> Player {
    Player {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        name: row.get::<_, String>(1),
    }
}
fn card(n: i16) -> Result<Card, Error> {
    u8::try_from(n)
        .map_err(|_| Error::Inconsistent(format!("stored card {}", n)))
        .and_then(Card::try_from)
}
fn tag(row: &Row) -> Result<Tag, Error> {
    Ok(Tag {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        game: ID::from(row.get::<_, uuid::Uuid>(1)),
        serial: Serial::try_from(row.get::<_, &str>(2))?,
        card: card(row.get::<_, i16>(3))?,
        is_board: row.get::<_, bool>(4),
        hand: row.get::<_, Option<uuid::Uuid>>(5).map(ID::from),
        read: row.get::<_, SystemTime>(6),
    })
}
fn hand(row: &Row) -> Hand {
    Hand {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        game: ID::from(row.get::<_, uuid::Uuid>(1)),
        player: ID::from(row.get::<_, uuid::Uuid>(2)),
        a: ID::from(row.get::<_, uuid::Uuid>(3)),
        b: ID::from(row.get::<_, uuid::Uuid>(4)),
        mucked: row.get::<_, bool>(5),
        equity: row.get::<_, Option<Probability>>(6),
    }
}
fn holding(row: &Row) -> Result<Holding, Error> {
    Ok(Holding {
        hand: ID::from(row.get::<_, uuid::Uuid>(0)),
        player: ID::from(row.get::<_, uuid::Uuid>(1)),
        name: row.get::<_, String>(2),
        hole: Hole::try_from((card(row.get::<_, i16>(3))?, card(row.get::<_, i16>(4))?))?,
        mucked: row.get::<_, bool>(5),
        equity: row.get::<_, Option<Probability>>(6),
    })
}
fn history(row: &Row) -> Result<History, Error> {
    Ok(History {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        game: ID::from(row.get::<_, uuid::Uuid>(1)),
        player: row.get::<_, String>(2),
        hole: Hole::try_from(row.get::<_, i64>(3))?,
        mucked: row.get::<_, bool>(4),
        equity: row.get::<_, Option<Probability>>(5),
        archived: row.get::<_, SystemTime>(6),
    })
}

#[rustfmt::skip]
const GAME_COLUMNS:    &str = "id, started, finished";
#[rustfmt::skip]
const ANTENNA_COLUMNS: &str = "id, serial, role, player_id";
#[rustfmt::skip]
const TAG_COLUMNS:     &str = "id, game_id, serial, card, is_board, hand_id, read_at";
#[rustfmt::skip]
const HAND_COLUMNS:    &str = "id, game_id, player_id, card_a, card_b, is_muck, equity";

#[rustfmt::skip]
#[async_trait::async_trait]
impl<'t> Queries for Transaction<'t> {
    async fn current_game(&mut self) -> Result<Option<Game>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", GAME_COLUMNS, " ",
            "FROM   ", GAMES, " ",
            "WHERE  finished IS NULL ",
            "LIMIT  1"
        );
        Ok(self.query_opt(SQL, &[]).await?.as_ref().map(game))
    }
    async fn create_game(&mut self, game: &Game) -> Result<(), Error> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", GAMES, " (", GAME_COLUMNS, ") ",
            "VALUES ($1, $2, $3)"
        );
        self.execute(SQL, &[&game.id.inner(), &game.started, &game.finished]).await?;
        Ok(())
    }
    async fn finish_game(&mut self, game: ID<Game>, at: SystemTime) -> Result<(), Error> {
        const SQL: &str = concatcp!(
            "UPDATE ", GAMES, " ",
            "SET    finished = $2 ",
            "WHERE  id       = $1"
        );
        self.execute(SQL, &[&game.inner(), &at]).await?;
        Ok(())
    }

    async fn antennas(&mut self) -> Result<Vec<Antenna>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", ANTENNA_COLUMNS, " ",
            "FROM   ", ANTENNAS, " ",
            "ORDER  BY serial"
        );
        self.query(SQL, &[]).await?.iter().map(antenna).collect()
    }
    async fn antenna(&mut self, id: ID<Antenna>) -> Result<Option<Antenna>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", ANTENNA_COLUMNS, " ",
            "FROM   ", ANTENNAS, " ",
            "WHERE  id = $1"
        );
        self.query_opt(SQL, &[&id.inner()]).await?.as_ref().map(antenna).transpose()
    }
    async fn antenna_by_serial(&mut self, serial: &Serial) -> Result<Option<Antenna>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", ANTENNA_COLUMNS, " ",
            "FROM   ", ANTENNAS, " ",
            "WHERE  serial = $1"
        );
        self.query_opt(SQL, &[&serial.to_string()]).await?.as_ref().map(antenna).transpose()
    }
    async fn antennas_by_role(&mut self, role: Role) -> Result<Vec<Antenna>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", ANTENNA_COLUMNS, " ",
            "FROM   ", ANTENNAS, " ",
            "WHERE  role = $1"
        );
        self.query(SQL, &[&role.as_str()]).await?.iter().map(antenna).collect()
    }
    async fn create_antenna(&mut self, antenna: &Antenna) -> Result<(), Error> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", ANTENNAS, " (", ANTENNA_COLUMNS, ") ",
            "VALUES ($1, $2, $3, $4)"
        );
        let player = antenna.player.map(|p| p.inner());
        self.execute(SQL, &[&antenna.id.inner(), &antenna.serial.to_string(), &antenna.role.as_str(), &player]).await?;
        Ok(())
    }
    async fn update_antenna(&mut self, antenna: &Antenna) -> Result<(), Error> {
        const SQL: &str = concatcp!(
            "UPDATE ", ANTENNAS, " ",
            "SET    serial    = $2, ",
                   "role      = $3, ",
                   "player_id = $4 ",
            "WHERE  id        = $1"
        );
        let player = antenna.player.map(|p| p.inner());
        self.execute(SQL, &[&antenna.id.inner(), &antenna.serial.to_string(), &antenna.role.as_str(), &player]).await?;
        Ok(())
    }
    async fn delete_antenna(&mut self, id: ID<Antenna>) -> Result<(), Error> {
        const SQL: &str = concatcp!("DELETE FROM ", ANTENNAS, " WHERE id = $1");
        self.execute(SQL, &[&id.inner()]).await?;
        Ok(())
    }

    async fn players(&mut self) -> Result<Vec<Player>, Error> {
        const SQL: &str = concatcp!(
            "SELECT id, name ",
            "FROM   ", PLAYERS, " ",
            "ORDER  BY id"
        );
        Ok(self.query(SQL, &[]).await?.iter().map(player).collect())
    }
    async fn player(&mut self, id: ID<Player>) -> Result<Option<Player>, Error> {
        const SQL: &str = concatcp!(
            "SELECT id, name ",
            "FROM   ", PLAYERS, " ",
            "WHERE  id = $1"
        );
        Ok(self.query_opt(SQL, &[&id.inner()]).await?.as_ref().map(player))
    }
    async fn create_player(&mut self, player: &Player) -> Result<(), Error> {
        const SQL: &str = concatcp!("INSERT INTO ", PLAYERS, " (id, name) VALUES ($1, $2)");
        self.execute(SQL, &[&player.id.inner(), &player.name]).await?;
        Ok(())
    }
    async fn rename_player(&mut self, id: ID<Player>, name: &str) -> Result<(), Error> {
        const SQL: &str = concatcp!("UPDATE ", PLAYERS, " SET name = $2 WHERE id = $1");
        self.execute(SQL, &[&id.inner(), &name]).await?;
        Ok(())
    }
    async fn delete_player(&mut self, id: ID<Player>) -> Result<(), Error> {
        const SQL: &str = concatcp!("DELETE FROM ", PLAYERS, " WHERE id = $1");
        self.execute(SQL, &[&id.inner()]).await?;
        Ok(())
    }

    async fn tags_by_serial(&mut self, game: ID<Game>, serial: &Serial) -> Result<Vec<Tag>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", TAG_COLUMNS, " ",
            "FROM   ", TAGS, " ",
            "WHERE  game_id = $1 ",
            "AND    serial  = $2 ",
            "ORDER  BY read_at, id"
        );
        self.query(SQL, &[&game.inner(), &serial.to_string()]).await?.iter().map(tag).collect()
    }
    async fn board(&mut self, game: ID<Game>) -> Result<Vec<Tag>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", TAG_COLUMNS, " ",
            "FROM   ", TAGS, " ",
            "WHERE  game_id = $1 ",
            "AND    is_board ",
            "ORDER  BY read_at, id"
        );
        self.query(SQL, &[&game.inner()]).await?.iter().map(tag).collect()
    }
    async fn create_tag(&mut self, tag: &Tag) -> Result<(), Error> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", TAGS, " (", TAG_COLUMNS, ") ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        let card = i16::from(u8::from(tag.card));
        let hand = tag.hand.map(|h| h.inner());
        self.execute(SQL, &[&tag.id.inner(), &tag.game.inner(), &tag.serial.to_string(), &card, &tag.is_board, &hand, &tag.read]).await?;
        Ok(())
    }
    async fn attach_tag(&mut self, tag: ID<Tag>, hand: ID<Hand>) -> Result<(), Error> {
        const SQL: &str = concatcp!("UPDATE ", TAGS, " SET hand_id = $2 WHERE id = $1");
        self.execute(SQL, &[&tag.inner(), &hand.inner()]).await?;
        Ok(())
    }
    async fn delete_tag(&mut self, tag: ID<Tag>) -> Result<(), Error> {
        const SQL: &str = concatcp!("DELETE FROM ", TAGS, " WHERE id = $1");
        self.execute(SQL, &[&tag.inner()]).await?;
        Ok(())
    }
    async fn delete_tags_by_serial(&mut self, serial: &Serial) -> Result<(), Error> {
        const SQL: &str = concatcp!("DELETE FROM ", TAGS, " WHERE serial = $1");
        self.execute(SQL, &[&serial.to_string()]).await?;
        Ok(())
    }
    async fn delete_board(&mut self) -> Result<(), Error> {
        const SQL: &str = concatcp!("DELETE FROM ", TAGS, " WHERE is_board");
        self.execute(SQL, &[]).await?;
        Ok(())
    }
    async fn delete_game_tags(&mut self, game: ID<Game>) -> Result<(), Error> {
        const SQL: &str = concatcp!("DELETE FROM ", TAGS, " WHERE game_id = $1");
        self.execute(SQL, &[&game.inner()]).await?;
        Ok(())
    }

    async fn create_hand(&mut self, hand: &Hand) -> Result<(), Error> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", HANDS, " (", HAND_COLUMNS, ") ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        self.execute(SQL, &[&hand.id.inner(), &hand.game.inner(), &hand.player.inner(), &hand.a.inner(), &hand.b.inner(), &hand.mucked, &hand.equity]).await?;
        Ok(())
    }
    async fn hand_by_card(&mut self, game: ID<Game>, card: Card) -> Result<Option<Hand>, Error> {
        const SQL: &str = concatcp!(
            "SELECT h.id, h.game_id, h.player_id, h.card_a, h.card_b, h.is_muck, h.equity ",
            "FROM   ", HANDS, " h ",
            "JOIN   ", TAGS,  " t ON t.hand_id = h.id ",
            "WHERE  h.game_id = $1 ",
            "AND    t.card    = $2 ",
            "LIMIT  1"
        );
        let card = i16::from(u8::from(card));
        Ok(self.query_opt(SQL, &[&game.inner(), &card]).await?.as_ref().map(hand))
    }
    async fn hand_by_player(&mut self, game: ID<Game>, player: ID<Player>) -> Result<Option<Hand>, Error> {
        const SQL: &str = concatcp!(
            "SELECT ", HAND_COLUMNS, " ",
            "FROM   ", HANDS, " ",
            "WHERE  game_id   = $1 ",
            "AND    player_id = $2 ",
            "LIMIT  1"
        );
        Ok(self.query_opt(SQL, &[&game.inner(), &player.inner()]).await?.as_ref().map(hand))
    }
    async fn holdings(&mut self, game: ID<Game>) -> Result<Vec<Holding>, Error> {
        const SQL: &str = concatcp!(
            "SELECT h.id, h.player_id, p.name, a.card, b.card, h.is_muck, h.equity ",
            "FROM   ", HANDS,   " h ",
            "JOIN   ", PLAYERS, " p ON p.id = h.player_id ",
            "JOIN   ", TAGS,    " a ON a.id = h.card_a ",
            "JOIN   ", TAGS,    " b ON b.id = h.card_b ",
            "WHERE  h.game_id = $1 ",
            "ORDER  BY h.id"
        );
        self.query(SQL, &[&game.inner()]).await?.iter().map(holding).collect()
    }
    async fn muck_hand(&mut self, hand: ID<Hand>) -> Result<(), Error> {
        const SQL: &str = concatcp!("UPDATE ", HANDS, " SET is_muck = TRUE WHERE id = $1");
        self.execute(SQL, &[&hand.inner()]).await?;
        Ok(())
    }
    async fn set_equity(&mut self, hand: ID<Hand>, equity: Option<Probability>) -> Result<(), Error> {
        const SQL: &str = concatcp!("UPDATE ", HANDS, " SET equity = $2 WHERE id = $1");
        self.execute(SQL, &[&hand.inner(), &equity]).await?;
        Ok(())
    }
    async fn reset_equity(&mut self, game: ID<Game>) -> Result<(), Error> {
        const SQL: &str = concatcp!("UPDATE ", HANDS, " SET equity = NULL WHERE game_id = $1");
        self.execute(SQL, &[&game.inner()]).await?;
        Ok(())
    }
    async fn delete_hands_by_player(&mut self, player: ID<Player>) -> Result<(), Error> {
        const TAGS_SQL: &str = concatcp!(
            "DELETE FROM ", TAGS, " ",
            "WHERE  hand_id IN (SELECT id FROM ", HANDS, " WHERE player_id = $1)"
        );
        const HANDS_SQL: &str = concatcp!("DELETE FROM ", HANDS, " WHERE player_id = $1");
        self.execute(TAGS_SQL, &[&player.inner()]).await?;
        self.execute(HANDS_SQL, &[&player.inner()]).await?;
        Ok(())
    }
    async fn delete_game_hands(&mut self, game: ID<Game>) -> Result<(), Error> {
        const SQL: &str = concatcp!("DELETE FROM ", HANDS, " WHERE game_id = $1");
        self.execute(SQL, &[&game.inner()]).await?;
        Ok(())
    }

    async fn create_history(&mut self, history: &History) -> Result<(), Error> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", HISTORY, " (id, game_id, player, hole, is_muck, equity, archived) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        let hole = i64::from(history.hole);
        self.execute(SQL, &[&history.id.inner(), &history.game.inner(), &history.player, &hole, &history.mucked, &history.equity, &history.archived]).await?;
        Ok(())
    }
    async fn history(&mut self) -> Result<Vec<History>, Error> {
        const SQL: &str = concatcp!(
            "SELECT id, game_id, player, hole, is_muck, equity, archived ",
            "FROM   ", HISTORY, " ",
            "ORDER  BY archived, id"
        );
        self.query(SQL, &[]).await?.iter().map(history).collect()
    }

    async fn roles_in_game(&mut self, game: ID<Game>) -> Result<Vec<Role>, Error> {
        const SQL: &str = concatcp!(
            "SELECT DISTINCT a.role ",
            "FROM   ", TAGS,     " t ",
            "JOIN   ", ANTENNAS, " a ON a.serial = t.serial ",
            "WHERE  t.game_id = $1"
        );
        self.query(SQL, &[&game.inner()])
            .await?
            .iter()
            .map(|row| Role::try_from(row.get::<_, &str>(0)))
            .collect()
    }
}
