//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are async and must never block the worker thread; every database interaction goes through the engine
//! APIs, which are futures all the way down.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use marketplace_payment_engine::{
    db_types::ActorRef,
    traits::{LedgerManagement, PaymentLedgerDatabase},
    EscrowFlowApi,
    PaymentsApi,
};
use serde_json::json;

use crate::{
    auth::{JwtClaims, Role},
    config::ServerConfig,
    data_objects::{PaymentAction, PaymentActionRequest, PaymentsQuery},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires $role:expr) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new($role));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Admin payments  ----------------------------------------------------
route!(admin_payments => Get "/payments" impl LedgerManagement where requires Role::Admin);
/// The admin payment dashboard: a filtered, paginated listing plus aggregate figures.
///
/// The listing honours every query predicate; the summary drops the status predicate so the dashboard totals
/// always cover all statuses.
pub async fn admin_payments<A: LedgerManagement>(
    claims: JwtClaims,
    query: web::Query<PaymentsQuery>,
    api: web::Data<PaymentsApi<A>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET admin payments by admin {}", claims.sub);
    let listing = api.admin_payments(&query.filter(), &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payments": listing.payments,
        "summary": listing.summary,
        "offset": listing.offset,
        "count": listing.count,
    })))
}

route!(admin_payment_action => Post "/payments" impl PaymentLedgerDatabase where requires Role::Admin);
/// Admin mutation entry point: release, refund or dispute an escrow payment, or advance a manual payout.
pub async fn admin_payment_action<A: PaymentLedgerDatabase>(
    claims: JwtClaims,
    body: web::Json<PaymentActionRequest>,
    api: web::Data<EscrowFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    let actor = ActorRef::admin(claims.sub);
    debug!("💻️ POST admin payment action {} on sub-order {} by {actor}", request.action, request.sub_order_id);
    let payment = match request.action {
        PaymentAction::Release => api.release_escrow_payment(request.sub_order_id, &actor, request.note).await?,
        PaymentAction::Refund => api.refund_escrow_payment(request.sub_order_id, &actor, request.note).await?,
        PaymentAction::Dispute => api.dispute_escrow_payment(request.sub_order_id, &actor, request.note).await?,
        PaymentAction::MarkManualPaid => api.advance_manual_payout(request.sub_order_id, &actor, request.note).await?,
    };
    Ok(HttpResponse::Ok().json(json!({ "success": true, "payment": payment })))
}

route!(reconcile_order => Post "/orders/{order_id}/reconcile" impl PaymentLedgerDatabase where requires Role::Admin);
/// Makes sure every sub-order of the given order has an escrow ledger entry, at the configured commission rate.
pub async fn reconcile_order<A: PaymentLedgerDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<EscrowFlowApi<A>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST reconcile order {order_id} by admin {}", claims.sub);
    let payments = api.ensure_escrow_payments(order_id, config.commission_rate).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "payments": payments })))
}

//----------------------------------------------   Seller routes  ----------------------------------------------------
route!(seller_payments => Get "/payments" impl LedgerManagement where requires Role::Seller);
/// The seller's view of the payment ledger: the admin listing, pinned to their own records.
pub async fn seller_payments<A: LedgerManagement>(
    claims: JwtClaims,
    query: web::Query<PaymentsQuery>,
    api: web::Data<PaymentsApi<A>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET seller payments for seller {}", claims.sub);
    let listing = api.seller_payments(claims.sub, &query.filter(), &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payments": listing.payments,
        "summary": listing.summary,
        "offset": listing.offset,
        "count": listing.count,
    })))
}

route!(confirm_delivery => Put "/orders/{sub_order_id}/deliver" impl PaymentLedgerDatabase where requires Role::Seller);
/// Seller delivery confirmation. Marks the sub-order delivered and releases the escrowed funds.
///
/// The delivery always sticks; if the release phase fails the response still succeeds and reports the gap in the
/// `delivery` object, so the storefront can surface "delivered, payout pending".
pub async fn confirm_delivery<A: PaymentLedgerDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<EscrowFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let sub_order_id = path.into_inner();
    let actor = ActorRef::seller(claims.sub);
    debug!("💻️ PUT delivery confirmation for sub-order {sub_order_id} by {actor}");
    let outcome = api.confirm_delivery(sub_order_id, &actor, Some(claims.sub)).await?;
    if let Some(release_error) = outcome.release_error() {
        warn!("💻️ Sub-order {sub_order_id} delivered, but its escrow release is pending. {release_error}");
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "delivery": outcome })))
}
