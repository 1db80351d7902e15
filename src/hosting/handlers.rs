use super::*;
use crate::Error;
use crate::ID;
use crate::store::Database;
use crate::table::Table;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;

/// Status code for each failure a client can act on differently.
pub fn failure(e: &Error) -> HttpResponse {
    let body = ApiError::from(e);
    match e {
        Error::NotFound(_) => HttpResponse::NotFound().json(body),
        Error::InvalidFormat(_) | Error::InvalidRole(_) => HttpResponse::BadRequest().json(body),
        Error::RoleConflict(_) | Error::BoardLimitExceeded | Error::Inconsistent(_) => {
            HttpResponse::Conflict().json(body)
        }
        Error::Storage(_) | Error::Evaluator(_) => HttpResponse::InternalServerError().json(body),
    }
}

pub async fn health<D: Database>(table: web::Data<Table<D>>) -> impl Responder {
    match table
        .health()
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(game) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "game": game,
            "viewers": table.viewers(),
        })),
        Err(_) => HttpResponse::ServiceUnavailable().body("storage unavailable"),
    }
}

/// Acknowledge a read as soon as it parses; the table applies it in the
/// background and logs the result.
pub async fn card<D: Database>(table: web::Data<Table<D>>, req: web::Json<CardRequest>) -> impl Responder {
    let CardRequest { uid, device_id, pair_id } = req.into_inner();
    match table.identify(&uid, &device_id, pair_id) {
        Ok((serial, card)) => {
            let table = table.into_inner();
            actix_web::rt::spawn(async move {
                let _ = table.apply(serial, card).await;
            });
            HttpResponse::Ok().json(serde_json::json!({ "status": "received" }))
        }
        Err(e) => {
            log::warn!("[ingest {}-{}] uid {:?} rejected: {}", device_id, pair_id, uid, e);
            HttpResponse::BadRequest().json(ApiError::from(&e))
        }
    }
}

pub async fn boot<D: Database>(table: web::Data<Table<D>>, req: web::Json<BootRequest>) -> impl Responder {
    match table.boot(&req.device_id, &req.pair_ids).await {
        Ok(fresh) => HttpResponse::Ok().json(serde_json::json!({
            "registered": fresh.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        })),
        Err(e) => failure(&e),
    }
}

pub async fn ws<D: Database>(table: web::Data<Table<D>>, body: web::Payload, req: HttpRequest) -> impl Responder {
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            bridge(table.into_inner(), session, stream);
            response
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

pub async fn antennas<D: Database>(table: web::Data<Table<D>>) -> impl Responder {
    match table.antennas().await {
        Ok(antennas) => HttpResponse::Ok().json(ApiAntennas {
            antenna: antennas.into_iter().map(ApiAntenna::from).collect(),
        }),
        Err(e) => failure(&e),
    }
}

pub async fn assign<D: Database>(
    table: web::Data<Table<D>>,
    path: web::Path<uuid::Uuid>,
    req: web::Json<RoleRequest>,
) -> impl Responder {
    match table
        .assign(ID::from(path.into_inner()), &req.antenna_type_name)
        .await
    {
        Ok(antenna) => HttpResponse::Ok().json(ApiAntenna::from(antenna)),
        Err(e) => failure(&e),
    }
}

pub async fn remove_antenna<D: Database>(table: web::Data<Table<D>>, path: web::Path<uuid::Uuid>) -> impl Responder {
    match table.remove_antenna(ID::from(path.into_inner())).await {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => failure(&e),
    }
}

pub async fn players<D: Database>(table: web::Data<Table<D>>) -> impl Responder {
    match table.players().await {
        Ok(players) => HttpResponse::Ok().json(ApiPlayers {
            players: players.into_iter().map(ApiPlayer::from).collect(),
        }),
        Err(e) => failure(&e),
    }
}

pub async fn rename<D: Database>(
    table: web::Data<Table<D>>,
    path: web::Path<uuid::Uuid>,
    req: web::Json<RenameRequest>,
) -> impl Responder {
    match table.rename(ID::from(path.into_inner()), &req.name).await {
        Ok(player) => HttpResponse::Ok().json(serde_json::json!({
            "player": ApiPlayer::from((player, None)),
        })),
        Err(e) => failure(&e),
    }
}

pub async fn hand<D: Database>(table: web::Data<Table<D>>, path: web::Path<uuid::Uuid>) -> impl Responder {
    match table.hand(ID::from(path.into_inner())).await {
        Ok(holding) => HttpResponse::Ok().json(serde_json::json!({ "hand": ApiHand::from(holding) })),
        Err(e) => failure(&e),
    }
}

pub async fn muck<D: Database>(table: web::Data<Table<D>>, path: web::Path<uuid::Uuid>) -> impl Responder {
    match table.muck(ID::from(path.into_inner())).await {
        Ok(holding) => HttpResponse::Ok().json(serde_json::json!({ "hand": ApiHand::from(holding) })),
        Err(e) => failure(&e),
    }
}

pub async fn clear<D: Database>(table: web::Data<Table<D>>) -> impl Responder {
    match table.clear().await {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => failure(&e),
    }
}

pub async fn history<D: Database>(table: web::Data<Table<D>>) -> impl Responder {
    match table.history().await {
        Ok(history) => HttpResponse::Ok().json(history.into_iter().map(ApiHistory::from).collect::<Vec<_>>()),
        Err(e) => failure(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Probability;
    use crate::catalog::Catalog;
    use crate::cards::Card;
    use crate::cards::Hole;
    use crate::equity::Evaluator;
    use crate::store::Memory;
    use crate::watchdog::Watchdog;
    use actix_web::App;
    use actix_web::http::StatusCode;
    use actix_web::test as harness;
    use std::sync::Arc;
    use std::time::Duration;

    struct Even;
    impl Evaluator for Even {
        fn evaluate(&self, holes: &[Hole], _: &[Card]) -> Result<Vec<Probability>, Error> {
            Ok(vec![1.0 / holes.len() as Probability; holes.len()])
        }
    }

    fn table() -> (Arc<Table<Memory>>, tokio::sync::watch::Sender<bool>) {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let watchdog = Watchdog::new(Duration::ZERO, Duration::from_secs(5));
        let table = Table::new(
            Arc::new(Memory::default()),
            Catalog::default(),
            Arc::new(Even),
            watchdog,
            rx,
        );
        (table, tx)
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(failure(&Error::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(failure(&Error::InvalidRole("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(failure(&Error::RoleConflict(crate::antenna::Role::Board)).status(), StatusCode::CONFLICT);
        assert_eq!(failure(&Error::BoardLimitExceeded).status(), StatusCode::CONFLICT);
        assert_eq!(failure(&Error::Storage("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn reader_and_admin_routes() {
        let (table, _tx) = table();
        let app = harness::init_service(
            App::new()
                .app_data(web::Data::from(table.clone()))
                .configure(routes::<Memory>),
        )
        .await;

        let bad = harness::TestRequest::post()
            .uri("/card")
            .set_json(CardRequest {
                uid: "As".into(),
                device_id: "dev-1".into(),
                pair_id: 0,
            })
            .to_request();
        assert_eq!(harness::call_service(&app, bad).await.status(), StatusCode::BAD_REQUEST);

        let boot = harness::TestRequest::post()
            .uri("/device/boot")
            .set_json(BootRequest {
                device_id: "dev1".into(),
                pair_ids: vec![0, 1],
            })
            .to_request();
        assert_eq!(harness::call_service(&app, boot).await.status(), StatusCode::OK);

        let list = harness::TestRequest::get().uri("/admin/antenna").to_request();
        let body: serde_json::Value = harness::call_and_read_body_json(&app, list).await;
        let antennas = body["antenna"].as_array().cloned().unwrap_or_default();
        assert_eq!(antennas.len(), 2);
        assert_eq!(antennas[0]["antenna_type_name"], "unknown");
        let id = antennas[0]["id"].as_str().unwrap().to_string();

        let wrong = harness::TestRequest::post()
            .uri(&format!("/admin/antenna/{}", id))
            .set_json(RoleRequest {
                antenna_type_name: "dealer".into(),
            })
            .to_request();
        assert_eq!(harness::call_service(&app, wrong).await.status(), StatusCode::BAD_REQUEST);

        let missing = harness::TestRequest::post()
            .uri(&format!("/admin/antenna/{}", uuid::Uuid::now_v7()))
            .set_json(RoleRequest {
                antenna_type_name: "board".into(),
            })
            .to_request();
        assert_eq!(harness::call_service(&app, missing).await.status(), StatusCode::NOT_FOUND);

        let assign = harness::TestRequest::post()
            .uri(&format!("/admin/antenna/{}", id))
            .set_json(RoleRequest {
                antenna_type_name: "board".into(),
            })
            .to_request();
        assert_eq!(harness::call_service(&app, assign).await.status(), StatusCode::OK);

        let clear = harness::TestRequest::delete().uri("/admin/game").to_request();
        assert_eq!(harness::call_service(&app, clear).await.status(), StatusCode::NO_CONTENT);

        let health = harness::TestRequest::get().uri("/health").to_request();
        assert_eq!(harness::call_service(&app, health).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn card_is_acknowledged_then_applied() {
        let (table, _tx) = table();
        let app = harness::init_service(
            App::new()
                .app_data(web::Data::from(table.clone()))
                .configure(routes::<Memory>),
        )
        .await;
        let read = harness::TestRequest::post()
            .uri("/card")
            .set_json(CardRequest {
                uid: "As".into(),
                device_id: "dev1".into(),
                pair_id: 0,
            })
            .to_request();
        assert_eq!(harness::call_service(&app, read).await.status(), StatusCode::OK);
        while table.antennas().await.unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(table.players().await.unwrap().len(), 1);
    }
}
