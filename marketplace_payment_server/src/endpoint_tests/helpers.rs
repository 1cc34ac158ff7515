use mpg_common::Secret;

use crate::{
    auth::{issuer_from_secret, Role},
    config::{AuthConfig, ServerConfig, WebhookConfig},
    helpers::calculate_hmac,
};

pub const TEST_JWT_SECRET: &str = "endpoint-test-jwt-secret";
pub const TEST_HMAC_SECRET: &str = "endpoint-test-hmac-secret";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        auth: AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()) },
        webhook: WebhookConfig { hmac_secret: Secret::new(TEST_HMAC_SECRET.to_string()), hmac_checks: true },
        ..ServerConfig::default()
    }
}

pub fn admin_token(id: i64) -> String {
    issuer_from_secret(TEST_JWT_SECRET).issue_token(id, Role::Admin).unwrap()
}

pub fn seller_token(id: i64) -> String {
    issuer_from_secret(TEST_JWT_SECRET).issue_token(id, Role::Seller).unwrap()
}

pub fn webhook_signature(body: &str) -> String {
    calculate_hmac(TEST_HMAC_SECRET, body.as_bytes())
}

/// Renders service-level errors (e.g. from middleware) into the responses the real HTTP dispatcher would
/// produce via `ResponseError`, so `test::call_service` observes what a client would see instead of panicking.
pub struct RenderErrors<S>(pub S);

impl<S, B> actix_web::dev::Service<actix_http::Request> for RenderErrors<S>
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = actix_web::dev::ServiceResponse;
    type Error = actix_web::Error;
    type Future = futures::future::LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.0.poll_ready(ctx)
    }

    fn call(&self, req: actix_http::Request) -> Self::Future {
        let fut = self.0.call(req);
        Box::pin(async move {
            match fut.await {
                Ok(res) => Ok(res.map_into_boxed_body()),
                Err(err) => Ok(actix_web::dev::ServiceResponse::new(
                    actix_web::test::TestRequest::default().to_http_request(),
                    err.error_response(),
                )),
            }
        })
    }
}

/// Builds the full application (routes, scopes, middleware) the way `create_server_instance` wires it, as an
/// initialised test service.
macro_rules! test_app {
    ($db:expr, $config:expr) => {{
        use marketplace_payment_engine::{EscrowFlowApi, PaymentsApi, SqliteDatabase};
        let escrow_api = EscrowFlowApi::new($db.clone());
        let payments_api = PaymentsApi::new($db.clone());
        let token_issuer = $crate::auth::TokenIssuer::new(&$config.auth);
        $crate::endpoint_tests::helpers::RenderErrors(actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(escrow_api))
                .app_data(actix_web::web::Data::new(payments_api))
                .app_data(actix_web::web::Data::new(token_issuer))
                .app_data(actix_web::web::Data::new($config.clone()))
                .service(
                    actix_web::web::scope("/api/admin")
                        .service($crate::routes::AdminPaymentsRoute::<SqliteDatabase>::new())
                        .service($crate::routes::AdminPaymentActionRoute::<SqliteDatabase>::new())
                        .service($crate::routes::ReconcileOrderRoute::<SqliteDatabase>::new()),
                )
                .service(
                    actix_web::web::scope("/api/seller")
                        .service($crate::routes::SellerPaymentsRoute::<SqliteDatabase>::new())
                        .service($crate::routes::ConfirmDeliveryRoute::<SqliteDatabase>::new()),
                )
                .service(
                    actix_web::web::scope("/api/hexalog")
                        .wrap($crate::middleware::HmacMiddlewareFactory::new(
                            $crate::server::HEXALOG_SIGNATURE_HEADER,
                            $config.webhook.hmac_secret.clone(),
                            $config.webhook.hmac_checks,
                        ))
                        .service($crate::webhook_routes::HexalogWebhookRoute::<SqliteDatabase>::new()),
                )
                .service($crate::routes::health),
        )
        .await)
    }};
}
pub(crate) use test_app;
