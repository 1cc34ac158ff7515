use actix_web::{cookie::Cookie, http::StatusCode, test};
use marketplace_payment_engine::{
    db_types::{PaymentStatus, SubOrderStatus},
    test_utils::{new_test_database, prepare_test_env, seed_order},
    EscrowFlowApi,
    LedgerManagement,
};
use serde_json::Value;

use crate::endpoint_tests::helpers::{admin_token, seller_token, test_app, test_config};

#[actix_web::test]
async fn seller_confirms_delivery_and_escrow_is_released() {
    prepare_test_env();
    let db = new_test_database().await;
    let (order, sub_orders, sellers) = seed_order(&db, "ORD-E-100", &[55_000]).await.unwrap();
    EscrowFlowApi::new(db.clone()).ensure_escrow_payments(order.id, 0.10).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let req = test::TestRequest::put()
        .uri(&format!("/api/seller/orders/{}/deliver", sub_orders[0].id))
        .cookie(Cookie::new("seller-auth-token", seller_token(sellers[0].id)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["delivery"]["outcome"], "Delivered");

    let sub_order = db.fetch_sub_order(sub_orders[0].id).await.unwrap().unwrap();
    assert_eq!(sub_order.status, SubOrderStatus::Delivered);
    let payment = db.fetch_payment_for_sub_order(sub_orders[0].id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Released);
}

#[actix_web::test]
async fn delivery_without_a_payment_reports_the_release_gap() {
    prepare_test_env();
    let db = new_test_database().await;
    let (_, sub_orders, sellers) = seed_order(&db, "ORD-E-101", &[15_000]).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let req = test::TestRequest::put()
        .uri(&format!("/api/seller/orders/{}/deliver", sub_orders[0].id))
        .cookie(Cookie::new("seller-auth-token", seller_token(sellers[0].id)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["delivery"]["outcome"], "DeliveredReleasePending");
    assert!(body["delivery"]["release_error"].as_str().unwrap().contains("No payment record"));
}

#[actix_web::test]
async fn delivery_requires_a_seller_token() {
    prepare_test_env();
    let db = new_test_database().await;
    let (_, sub_orders, _) = seed_order(&db, "ORD-E-102", &[15_000]).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);
    let uri = format!("/api/seller/orders/{}/deliver", sub_orders[0].id);

    // No token at all
    let req = test::TestRequest::put().uri(&uri).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // An admin token is the wrong role for a seller route
    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(Cookie::new("admin_token", admin_token(1)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Even presented in the seller cookie slot
    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(Cookie::new("seller-auth-token", admin_token(1)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn sellers_cannot_deliver_someone_elses_sub_order() {
    prepare_test_env();
    let db = new_test_database().await;
    let (_, sub_orders, sellers) = seed_order(&db, "ORD-E-103", &[15_000, 25_000]).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let req = test::TestRequest::put()
        .uri(&format!("/api/seller/orders/{}/deliver", sub_orders[0].id))
        .cookie(Cookie::new("seller-auth-token", seller_token(sellers[1].id)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
