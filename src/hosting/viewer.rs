use crate::store::Database;
use crate::table::Table;
use std::sync::Arc;

/// Push the current projection to one socket. A projection that cannot be
/// read is skipped; the next pulse tries again.
async fn push<D: Database>(table: &Table<D>, session: &mut actix_ws::Session, viewer: u64) -> Result<(), actix_ws::Closed> {
    let snapshot = match table.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::warn!("[viewer {}] projection unavailable: {}", viewer, e);
            return Ok(());
        }
    };
    match serde_json::to_string(&snapshot) {
        Ok(json) => session.text(json).await,
        Err(e) => {
            log::error!("[viewer {}] cannot encode projection: {}", viewer, e);
            Ok(())
        }
    }
}

/// Spawns the per-viewer task: one projection on connect, one per pulse,
/// until the socket closes or the process shuts down.
pub fn bridge<D: Database>(table: Arc<Table<D>>, mut session: actix_ws::Session, mut stream: actix_ws::MessageStream) {
    use futures::StreamExt;
    let viewer = table.admit();
    let mut pulses = table.subscribe();
    let mut shutdown = table.shutdown();
    actix_web::rt::spawn(async move {
        log::info!("[viewer {}] connected", viewer);
        if push(&table, &mut session, viewer).await.is_ok() {
            'sesh: loop {
                tokio::select! {
                    biased;
                    _ = crate::stopped(&mut shutdown) => break 'sesh,
                    alive = pulses.next() => match alive {
                        true => if push(&table, &mut session, viewer).await.is_err() { break 'sesh },
                        false => break 'sesh,
                    },
                    msg = stream.next() => match msg {
                        Some(Ok(actix_ws::Message::Ping(bytes))) => if session.pong(&bytes).await.is_err() { break 'sesh },
                        Some(Ok(actix_ws::Message::Close(_))) => break 'sesh,
                        Some(Err(_)) => break 'sesh,
                        None => break 'sesh,
                        _ => continue 'sesh,
                    },
                }
            }
        }
        let _ = session.close(None).await;
        log::info!("[viewer {}] disconnected", viewer);
    });
}
