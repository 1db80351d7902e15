use super::*;
use crate::Error;
use crate::store::Antenna;
use crate::store::Player;
use crate::store::Queries;

/// Antenna registered under `serial`.
pub async fn get_by_serial(q: &mut dyn Queries, serial: &Serial) -> Result<Antenna, Error> {
    q.antenna_by_serial(serial)
        .await?
        .ok_or_else(|| Error::NotFound(format!("antenna {}", serial)))
}

/// Record a never-seen serial with no role yet. Returns the existing row if
/// another event registered it first.
pub async fn register_unknown(q: &mut dyn Queries, serial: &Serial) -> Result<Antenna, Error> {
    if let Some(existing) = q.antenna_by_serial(serial).await? {
        return Ok(existing);
    }
    let antenna = Antenna::from(serial.clone());
    q.create_antenna(&antenna).await?;
    log::info!("[antenna {}] registered", serial);
    Ok(antenna)
}

/// Link a player to an antenna whose reads may belong to a seat.
///
/// Antennas that are still unclassified or already act as a player get a
/// generated player the first time they read, so naming can happen later.
pub async fn seat(q: &mut dyn Queries, mut antenna: Antenna) -> Result<Antenna, Error> {
    match (antenna.role, antenna.player) {
        (Role::Unknown | Role::Player, None) => {
            let player = Player::seated_at(&antenna.serial);
            q.create_player(&player).await?;
            antenna.player = Some(player.id);
            q.update_antenna(&antenna).await?;
            log::info!("[antenna {}] seated {}", antenna.serial, player.name);
            Ok(antenna)
        }
        _ => Ok(antenna),
    }
}

/// Reassign an antenna's role, cleaning up whatever the old role owned.
pub async fn set_role(q: &mut dyn Queries, serial: &Serial, role: Role) -> Result<Antenna, Error> {
    let mut antenna = get_by_serial(q, serial).await?;
    if antenna.role == role {
        return Ok(antenna);
    }
    if role.is_singleton()
        && q.antennas_by_role(role)
            .await?
            .iter()
            .any(|holder| holder.id != antenna.id)
    {
        return Err(Error::RoleConflict(role));
    }
    let old = antenna.role;
    cleanup(q, &mut antenna, old, role).await?;
    antenna.role = role;
    q.update_antenna(&antenna).await?;
    log::info!("[antenna {}] {} -> {}", serial, old, role);
    match role {
        Role::Player => seat(q, antenna).await,
        _ => Ok(antenna),
    }
}

/// Drop the state a role owned when the antenna stops holding it.
pub async fn cleanup(q: &mut dyn Queries, antenna: &mut Antenna, old: Role, new: Role) -> Result<(), Error> {
    if old == new {
        return Ok(());
    }
    match old {
        Role::Unknown if new == Role::Player => Ok(()),
        Role::Unknown => unseat(q, antenna).await,
        Role::Muck => q.delete_tags_by_serial(&antenna.serial).await,
        Role::Board => q.delete_board().await,
        Role::Player => {
            q.delete_tags_by_serial(&antenna.serial).await?;
            unseat(q, antenna).await
        }
    }
}

/// Drop the player linked to an antenna, with every hand it held.
async fn unseat(q: &mut dyn Queries, antenna: &mut Antenna) -> Result<(), Error> {
    if let Some(player) = antenna.player.take() {
        q.delete_hands_by_player(player).await?;
        q.delete_player(player).await?;
        log::info!("[antenna {}] unseated player {}", antenna.serial, player);
    }
    Ok(())
}

/// Remove an antenna along with everything its role and seat owned.
pub async fn delete(q: &mut dyn Queries, serial: &Serial) -> Result<Antenna, Error> {
    let mut antenna = get_by_serial(q, serial).await?;
    let old = antenna.role;
    cleanup(q, &mut antenna, old, Role::Unknown).await?;
    q.delete_tags_by_serial(serial).await?;
    if let Some(player) = antenna.player.take() {
        q.delete_hands_by_player(player).await?;
        q.delete_player(player).await?;
    }
    q.delete_antenna(antenna.id).await?;
    log::info!("[antenna {}] deleted", serial);
    Ok(antenna)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use crate::store::Memory;

    fn serial(s: &str) -> Serial {
        Serial::try_from(s).unwrap()
    }

    async fn assign(db: &Memory, s: &str, role: Role) -> Result<Antenna, Error> {
        let serial = serial(s);
        db.transact(move |q| {
            Box::pin(async move {
                register_unknown(q, &serial).await?;
                set_role(q, &serial, role).await
            })
        })
        .await
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let db = Memory::default();
        let s = serial("dev1-0");
        let (a, b) = db
            .transact(move |q| {
                Box::pin(async move {
                    let a = register_unknown(q, &s).await?;
                    let b = register_unknown(q, &s).await?;
                    Ok((a, b))
                })
            })
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.role, Role::Unknown);
    }

    #[tokio::test]
    async fn missing_serial_is_not_found() {
        let db = Memory::default();
        let s = serial("ghost-1");
        let result = db
            .transact(move |q| Box::pin(async move { get_by_serial(q, &s).await }))
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn singleton_roles_conflict() {
        let db = Memory::default();
        assign(&db, "dev1-0", Role::Board).await.unwrap();
        assert_eq!(assign(&db, "dev2-0", Role::Board).await, Err(Error::RoleConflict(Role::Board)));
        assign(&db, "dev3-0", Role::Muck).await.unwrap();
        assert_eq!(assign(&db, "dev4-0", Role::Muck).await, Err(Error::RoleConflict(Role::Muck)));
        assign(&db, "dev5-0", Role::Player).await.unwrap();
        assign(&db, "dev6-0", Role::Player).await.unwrap();
    }

    #[tokio::test]
    async fn same_role_is_noop() {
        let db = Memory::default();
        let first = assign(&db, "dev1-0", Role::Board).await.unwrap();
        let again = assign(&db, "dev1-0", Role::Board).await.unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn player_role_seats_a_player() {
        let db = Memory::default();
        let antenna = assign(&db, "dev1-0", Role::Player).await.unwrap();
        let id = antenna.player.unwrap();
        let player = db
            .transact(move |q| Box::pin(async move { q.player(id).await }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(player.name, "player-dev1-0");
    }

    #[tokio::test]
    async fn leaving_player_role_unseats() {
        let db = Memory::default();
        assign(&db, "dev1-0", Role::Player).await.unwrap();
        let antenna = assign(&db, "dev1-0", Role::Board).await.unwrap();
        assert_eq!(antenna.player, None);
        let players = db
            .transact(|q| Box::pin(async move { q.players().await }))
            .await
            .unwrap();
        assert!(players.is_empty());
    }

    async fn read(db: &Memory, s: &str, label: &str) -> Result<crate::assembler::Outcome, Error> {
        let serial = serial(s);
        let card = crate::cards::Card::try_from(label).unwrap();
        db.transact(move |q| {
            Box::pin(async move {
                let antenna = get_by_serial(q, &serial).await?;
                let antenna = seat(q, antenna).await?;
                crate::assembler::assemble(q, &antenna, card).await
            })
        })
        .await
    }

    #[tokio::test]
    async fn leaving_muck_role_drops_staged_card() {
        use crate::assembler::Outcome;
        let db = Memory::default();
        assign(&db, "dev3-0", Role::Muck).await.unwrap();
        assert_eq!(read(&db, "dev3-0", "Kd").await, Ok(Outcome::Staged));
        assign(&db, "dev3-0", Role::Player).await.unwrap();
        assert_eq!(read(&db, "dev3-0", "As").await, Ok(Outcome::Staged));
        assert!(matches!(read(&db, "dev3-0", "Qh").await, Ok(Outcome::Dealt(_))));
        let holdings = db
            .transact(|q| {
                Box::pin(async move {
                    let game = crate::lifecycle::get_or_create_current(q).await?;
                    q.holdings(game).await
                })
            })
            .await
            .unwrap();
        assert_eq!(holdings.len(), 1);
        let cards = holdings[0].hole.cards();
        assert!(!cards.contains(&crate::cards::Card::try_from("Kd").unwrap()));
        assert!(cards.contains(&crate::cards::Card::try_from("As").unwrap()));
    }

    #[tokio::test]
    async fn placeholder_player_is_dropped_off_seat_roles() {
        let db = Memory::default();
        let s = serial("dev2-0");
        let seated = db
            .transact(move |q| {
                Box::pin(async move {
                    let antenna = register_unknown(q, &s).await?;
                    seat(q, antenna).await
                })
            })
            .await
            .unwrap();
        assert!(seated.player.is_some());
        let antenna = assign(&db, "dev2-0", Role::Board).await.unwrap();
        assert_eq!(antenna.player, None);
        let players = db
            .transact(|q| Box::pin(async move { q.players().await }))
            .await
            .unwrap();
        assert!(players.is_empty());
    }

    #[tokio::test]
    async fn role_conflict_rolls_back() {
        let db = Memory::default();
        assign(&db, "dev1-0", Role::Board).await.unwrap();
        assign(&db, "dev2-0", Role::Player).await.unwrap();
        assert!(assign(&db, "dev2-0", Role::Board).await.is_err());
        let s = serial("dev2-0");
        let antenna = db
            .transact(move |q| Box::pin(async move { get_by_serial(q, &s).await }))
            .await
            .unwrap();
        assert_eq!(antenna.role, Role::Player);
        assert!(antenna.player.is_some());
    }

    #[tokio::test]
    async fn singleton_invariant_holds_under_random_assignments() {
        use rand::Rng;
        use rand::SeedableRng;
        let db = Memory::default();
        let ref mut rng = rand::rngs::SmallRng::seed_from_u64(11);
        for _ in 0..200 {
            let s = format!("dev{}-{}", rng.random_range(0..4), rng.random_range(0..2));
            let role = Role::all()[rng.random_range(0..4)];
            let _ = assign(&db, &s, role).await;
            let antennas = db
                .transact(|q| Box::pin(async move { q.antennas().await }))
                .await
                .unwrap();
            assert!(antennas.iter().filter(|a| a.role == Role::Board).count() <= 1);
            assert!(antennas.iter().filter(|a| a.role == Role::Muck).count() <= 1);
        }
    }
}
