use actix_web::{http::StatusCode, test};
use marketplace_payment_engine::{
    db_types::{ShipmentStatus, SubOrderStatus},
    test_utils::{new_test_database, prepare_test_env, seed_order},
    LedgerManagement,
};
use serde_json::{json, Value};

use crate::{
    config::WebhookConfig,
    endpoint_tests::helpers::{test_app, test_config, webhook_signature},
};

#[actix_web::test]
async fn forged_webhooks_are_rejected_without_touching_the_ledger() {
    prepare_test_env();
    let db = new_test_database().await;
    let (_, sub_orders, _) = seed_order(&db, "ORD-E-300", &[30_000]).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let body = json!({
        "vendor": "Hexalog", "wbn": "WBN-300", "channelId": "marketplace", "orderId": sub_orders[0].id
    })
    .to_string();

    // Signature computed with the wrong secret
    let req = test::TestRequest::post()
        .uri("/api/hexalog/webhook")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-hexalog-signature", "deadbeef".repeat(8)))
        .set_payload(body.clone())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // No signature at all
    let req = test::TestRequest::post()
        .uri("/api/hexalog/webhook")
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Neither attempt may have written anything
    let sub_order = db.fetch_sub_order(sub_orders[0].id).await.unwrap().unwrap();
    assert!(sub_order.tracking_number.is_none());
    assert_eq!(sub_order.status, SubOrderStatus::Pending);
}

#[actix_web::test]
async fn signed_webhooks_apply_shipment_creation_and_tracking() {
    prepare_test_env();
    let db = new_test_database().await;
    let (_, sub_orders, _) = seed_order(&db, "ORD-E-301", &[30_000]).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let body = json!({
        "vendor": "Hexalog", "wbn": "WBN-301", "channelId": "marketplace", "orderId": sub_orders[0].id
    })
    .to_string();
    let req = test::TestRequest::post()
        .uri("/api/hexalog/webhook")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-hexalog-signature", webhook_signature(&body)))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let reply: Value = test::read_body_json(res).await;
    assert_eq!(reply["success"], true);

    let body = json!({"wbn": "WBN-301", "status": "Out For Delivery", "ctime": "2024-06-07 09:00:00"}).to_string();
    let req = test::TestRequest::post()
        .uri("/api/hexalog/webhook")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-hexalog-signature", webhook_signature(&body)))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let sub_order = db.fetch_sub_order(sub_orders[0].id).await.unwrap().unwrap();
    assert_eq!(sub_order.tracking_number.as_deref(), Some("WBN-301"));
    assert_eq!(sub_order.shipment_status, Some(ShipmentStatus::OutForDelivery));
    assert_eq!(sub_order.delivery_attempts, 1);
}

#[actix_web::test]
async fn tracking_for_an_unknown_waybill_is_a_404() {
    prepare_test_env();
    let db = new_test_database().await;
    let config = test_config();
    let app = test_app!(db, config);

    let body = json!({"wbn": "WBN-GHOST", "status": "In Transit", "ctime": "2024-06-08 10:00:00"}).to_string();
    let req = test::TestRequest::post()
        .uri("/api/hexalog/webhook")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-hexalog-signature", webhook_signature(&body)))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let reply: Value = test::read_body_json(res).await;
    assert_eq!(reply["success"], false);
}

#[actix_web::test]
async fn unrecognised_payload_shapes_get_a_400() {
    prepare_test_env();
    let db = new_test_database().await;
    let config = test_config();
    let app = test_app!(db, config);

    let body = json!({"surprise": "party"}).to_string();
    let req = test::TestRequest::post()
        .uri("/api/hexalog/webhook")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-hexalog-signature", webhook_signature(&body)))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let reply: Value = test::read_body_json(res).await;
    assert_eq!(reply["success"], false);
}

#[actix_web::test]
async fn hmac_checks_can_be_disabled_for_local_development() {
    prepare_test_env();
    let db = new_test_database().await;
    let (_, sub_orders, _) = seed_order(&db, "ORD-E-302", &[30_000]).await.unwrap();
    let mut config = test_config();
    config.webhook = WebhookConfig { hmac_checks: false, ..config.webhook };
    let app = test_app!(db, config);

    let body = json!({
        "vendor": "Hexalog", "wbn": "WBN-302", "channelId": "marketplace", "orderId": sub_orders[0].id
    })
    .to_string();
    let req = test::TestRequest::post()
        .uri("/api/hexalog/webhook")
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}
