use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use marketplace_payment_engine::{EscrowFlowApi, PaymentsApi, SqliteDatabase};

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        AdminPaymentActionRoute,
        AdminPaymentsRoute,
        ConfirmDeliveryRoute,
        ReconcileOrderRoute,
        SellerPaymentsRoute,
    },
    webhook_routes::HexalogWebhookRoute,
};

/// The header Hexalog carries its HMAC signature in.
pub const HEXALOG_SIGNATURE_HEADER: &str = "x-hexalog-signature";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new(25, Some(&config.database_url))
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let escrow_api = EscrowFlowApi::new(db.clone());
        let payments_api = PaymentsApi::new(db.clone());
        let token_issuer = TokenIssuer::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mps::access_log"))
            .app_data(web::Data::new(escrow_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(token_issuer))
            .app_data(web::Data::new(config.clone()));
        let admin_scope = web::scope("/api/admin")
            .service(AdminPaymentsRoute::<SqliteDatabase>::new())
            .service(AdminPaymentActionRoute::<SqliteDatabase>::new())
            .service(ReconcileOrderRoute::<SqliteDatabase>::new());
        let seller_scope = web::scope("/api/seller")
            .service(SellerPaymentsRoute::<SqliteDatabase>::new())
            .service(ConfirmDeliveryRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/api/hexalog")
            .wrap(HmacMiddlewareFactory::new(
                HEXALOG_SIGNATURE_HEADER,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .service(HexalogWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(admin_scope).service(seller_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
