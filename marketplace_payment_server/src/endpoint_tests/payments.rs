use actix_web::{cookie::Cookie, http::StatusCode, test};
use marketplace_payment_engine::{
    db_types::{ActorRef, PaymentStatus},
    test_utils::{new_test_database, prepare_test_env, seed_order, set_manual_payout_mode},
    EscrowFlowApi,
    LedgerManagement,
    PaymentLedgerDatabase,
};
use serde_json::{json, Value};

use crate::endpoint_tests::helpers::{admin_token, seller_token, test_app, test_config};

#[actix_web::test]
async fn admin_listing_returns_payments_and_summary() {
    prepare_test_env();
    let db = new_test_database().await;
    let (order, sub_orders, _) = seed_order(&db, "ORD-E-200", &[10_000, 20_000]).await.unwrap();
    let api = EscrowFlowApi::new(db.clone());
    api.ensure_escrow_payments(order.id, 0.10).await.unwrap();
    db.transition_payment(sub_orders[1].id, PaymentStatus::AdminApproval, &ActorRef::admin(1), None).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let req = test::TestRequest::get()
        .uri("/api/admin/payments")
        .cookie(Cookie::new("admin_token", admin_token(1)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], true);
    let payments = body["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 2);
    // Approval queue first
    assert_eq!(payments[0]["status"], "AdminApproval");
    assert_eq!(body["summary"]["total_count"], 2);
    assert_eq!(body["summary"]["escrow_count"], 2);
}

#[actix_web::test]
async fn admin_listing_requires_an_admin_token() {
    prepare_test_env();
    let db = new_test_database().await;
    let config = test_config();
    let app = test_app!(db, config);

    let req = test::TestRequest::get().uri("/api/admin/payments").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/admin/payments")
        .cookie(Cookie::new("admin_token", seller_token(1)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_actions_walk_the_payment_lifecycle() {
    prepare_test_env();
    let db = new_test_database().await;
    let (order, sub_orders, _) = seed_order(&db, "ORD-E-201", &[40_000, 50_000]).await.unwrap();
    EscrowFlowApi::new(db.clone()).ensure_escrow_payments(order.id, 0.10).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);
    let cookie = Cookie::new("admin_token", admin_token(7));

    let req = test::TestRequest::post()
        .uri("/api/admin/payments")
        .cookie(cookie.clone())
        .set_json(json!({"sub_order_id": sub_orders[0].id, "action": "release", "note": "Looks good"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["payment"]["status"], "Released");

    // Refunding a released payment is a conflict
    let req = test::TestRequest::post()
        .uri("/api/admin/payments")
        .cookie(cookie.clone())
        .set_json(json!({"sub_order_id": sub_orders[0].id, "action": "refund"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/admin/payments")
        .cookie(cookie.clone())
        .set_json(json!({"sub_order_id": sub_orders[1].id, "action": "dispute", "note": "Buyer complaint"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let payment = db.fetch_payment_for_sub_order(sub_orders[1].id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Disputed);
    assert_eq!(payment.history.0.len(), 2);
}

#[actix_web::test]
async fn manual_payouts_progress_through_the_admin_action() {
    prepare_test_env();
    let db = new_test_database().await;
    let (order, sub_orders, _) = seed_order(&db, "ORD-E-204", &[40_000, 50_000]).await.unwrap();
    EscrowFlowApi::new(db.clone()).ensure_escrow_payments(order.id, 0.10).await.unwrap();
    set_manual_payout_mode(&db, sub_orders[0].id).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);
    let cookie = Cookie::new("admin_token", admin_token(9));

    let req = test::TestRequest::post()
        .uri("/api/admin/payments")
        .cookie(cookie.clone())
        .set_json(json!({"sub_order_id": sub_orders[0].id, "action": "mark_manual_paid", "note": "NEFT initiated"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["payment"]["manual_status"], "Processing");

    let req = test::TestRequest::post()
        .uri("/api/admin/payments")
        .cookie(cookie.clone())
        .set_json(json!({"sub_order_id": sub_orders[0].id, "action": "mark_manual_paid"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["payment"]["manual_status"], "Paid");

    // An escrow-mode payment has no manual payout track
    let req = test::TestRequest::post()
        .uri("/api/admin/payments")
        .cookie(cookie)
        .set_json(json!({"sub_order_id": sub_orders[1].id, "action": "mark_manual_paid"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn seller_listing_is_scoped_to_the_token_subject() {
    prepare_test_env();
    let db = new_test_database().await;
    let (order, sub_orders, sellers) = seed_order(&db, "ORD-E-202", &[10_000, 90_000]).await.unwrap();
    EscrowFlowApi::new(db.clone()).ensure_escrow_payments(order.id, 0.10).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let req = test::TestRequest::get()
        .uri("/api/seller/payments")
        .cookie(Cookie::new("seller-auth-token", seller_token(sellers[1].id)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let payments = body["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["sub_order_id"], sub_orders[1].id);
    assert_eq!(body["summary"]["total_count"], 1);
}

#[actix_web::test]
async fn reconcile_creates_escrow_payments_for_an_order() {
    prepare_test_env();
    let db = new_test_database().await;
    let (order, sub_orders, _) = seed_order(&db, "ORD-E-203", &[12_345]).await.unwrap();
    let config = test_config();
    let app = test_app!(db, config);

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/orders/{}/reconcile", order.id))
        .cookie(Cookie::new("admin_token", admin_token(1)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let payment = db.fetch_payment_for_sub_order(sub_orders[0].id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Escrow);
    // Default commission rate: 10% of ₹123.45, rounded to the nearest paisa
    assert_eq!(payment.commission_amount.value(), 1_235);
    assert_eq!(payment.seller_amount.value(), 11_110);
}
