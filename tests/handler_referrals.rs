mod common;

use affiliate_engine::application::services::LinkOptions;
use axum_test::TestServer;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

fn cookie_token(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("aff_ref="))
        .unwrap()
        .to_string()
}

async fn setup() -> (TestServer, common::TestApp, String) {
    let app = common::create_test_app().await;
    let affiliate = common::create_active_affiliate(&app, 1, "Jane").await;
    let link = app
        .state
        .link_service
        .generate_link(affiliate.id, LinkOptions::default())
        .await
        .unwrap();

    let server = TestServer::new(common::test_router(app.state.clone())).unwrap();
    (server, app, link.short_code)
}

#[tokio::test]
async fn test_redirect_sets_referral_cookie() {
    let (server, app, short_code) = setup().await;

    let response = server
        .get(&format!("/ref/{short_code}"))
        .add_header("User-Agent", "TestBot/1.0")
        .add_header("Referer", "https://blog.example.org/post")
        .await;

    assert_eq!(response.status_code(), 302);

    let location = response.header("location");
    let location = location.to_str().unwrap();
    assert!(location.starts_with(common::BASE_URL));
    assert!(location.contains("utm_source=affiliate"));
    assert!(location.contains("utm_medium=referral"));
    assert!(location.contains("ref=jane"));

    let cookie = response.header("set-cookie");
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("aff_ref="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains(&format!("Max-Age={}", 30 * 86_400)));

    assert_eq!(app.store.click_count().await, 1);
}

#[tokio::test]
async fn test_redirect_unknown_code() {
    let (server, _app, _) = setup().await;

    let response = server.get("/ref/deadbeef").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_referral_to_commission() {
    let (server, app, short_code) = setup().await;
    common::create_user(&app.store, 50, "Customer").await;

    let redirect = server.get(&format!("/ref/{short_code}")).await;
    let token = cookie_token(redirect.header("set-cookie").to_str().unwrap());

    let attribution = server
        .post("/api/attributions")
        .json(&json!({ "user_id": 50, "referral_token": token }))
        .await;
    attribution.assert_status_ok();
    let attribution = attribution.json::<Value>();
    assert_eq!(attribution["attributed"], true);
    assert!(attribution["attribution"]["affiliate_code"]
        .as_str()
        .unwrap()
        .starts_with("jane"));

    let conversion = server
        .post("/api/conversions")
        .json(&json!({
            "user_id": 50,
            "conversion_type": "sale",
            "conversion_value": "200.00",
            "order_id": "ORD-1001"
        }))
        .await;
    conversion.assert_status_ok();

    let conversion = conversion.json::<Value>();
    assert_eq!(conversion["attributed"], true);
    let commission = &conversion["record"]["commission"];
    assert_eq!(decimal(&commission["amount"]), Decimal::new(10, 0));
    assert_eq!(commission["status"], "PENDING");
    assert_eq!(commission["order_id"], "ORD-1001");

    let commission_id = commission["id"].as_i64().unwrap();
    let approved = server
        .post(&format!("/api/commissions/{commission_id}/approve"))
        .await;
    approved.assert_status_ok();
    assert_eq!(approved.json::<Value>()["status"], "APPROVED");

    let affiliate_id = conversion["record"]["affiliate"]["id"].as_i64().unwrap();
    let commissions = server
        .get(&format!("/api/affiliates/{affiliate_id}/commissions"))
        .await
        .json::<Vec<Value>>();
    assert_eq!(commissions.len(), 1);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let (server, _app, short_code) = setup().await;

    let redirect = server.get(&format!("/ref/{short_code}")).await;
    let mut token = cookie_token(redirect.header("set-cookie").to_str().unwrap());
    token.push('0');

    let response = server
        .post("/api/attributions")
        .json(&json!({ "user_id": 50, "referral_token": token }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_conversion_without_referral_not_attributed() {
    let (server, _app, _) = setup().await;

    let response = server
        .post("/api/conversions")
        .json(&json!({
            "user_id": 77,
            "conversion_type": "signup",
            "conversion_value": 10
        }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["attributed"], false);
    assert!(json.get("record").is_none());
}

#[tokio::test]
async fn test_conversion_rejects_non_positive_value() {
    let (server, _app, _) = setup().await;

    let response = server
        .post("/api/conversions")
        .json(&json!({
            "user_id": 77,
            "conversion_type": "sale",
            "conversion_value": "0"
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_conversion_value_above_ledger_limit_rejected() {
    let (server, _app, _) = setup().await;

    let response = server
        .post("/api/conversions")
        .json(&json!({
            "user_id": 77,
            "conversion_type": "sale",
            "conversion_value": "79228162514264337593543950335"
        }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_withdrawal_endpoints() {
    let app = common::create_test_app().await;
    let affiliate = common::create_active_affiliate(&app, 1, "Jane").await;
    common::fund_affiliate(&app, &affiliate, 50, Decimal::new(1000, 0)).await;
    let server = TestServer::new(common::test_router(app.state.clone())).unwrap();

    let destination = json!({
        "method": "bank_transfer",
        "account_holder": "Jane Doe",
        "account_number": "000123456789",
        "routing_number": "110000000"
    });

    let mismatch = server
        .post(&format!("/api/affiliates/{}/withdrawals", affiliate.id))
        .json(&json!({ "amount": "100", "method": "paypal", "destination": destination }))
        .await;
    mismatch.assert_status_bad_request();

    let too_much = server
        .post(&format!("/api/affiliates/{}/withdrawals", affiliate.id))
        .json(&json!({ "amount": "5000", "method": "bank_transfer", "destination": destination }))
        .await;
    assert_eq!(too_much.status_code(), 422);
    assert_eq!(too_much.json::<Value>()["error"]["code"], "insufficient_balance");

    let created = server
        .post(&format!("/api/affiliates/{}/withdrawals", affiliate.id))
        .json(&json!({ "amount": "1000", "method": "bank_transfer", "destination": destination }))
        .await;
    assert_eq!(created.status_code(), 201);
    let created = created.json::<Value>();
    // 2% of 1000 = 20, under the 50.00 cap
    assert_eq!(decimal(&created["processing_fee"]), Decimal::new(20, 0));
    assert_eq!(decimal(&created["net_amount"]), Decimal::new(980, 0));
    assert_eq!(created["status"], "PENDING");

    let id = created["id"].as_i64().unwrap();

    let early = server
        .post(&format!("/api/withdrawals/{id}/complete"))
        .json(&json!({ "payment_reference": "TX-1" }))
        .await;
    assert_eq!(early.status_code(), 409);

    let processed = server
        .post(&format!("/api/withdrawals/{id}/process"))
        .json(&json!({ "processed_by": 1, "notes": "Weekly batch" }))
        .await;
    processed.assert_status_ok();
    assert_eq!(processed.json::<Value>()["status"], "COMPLETED");

    let listed = server
        .get(&format!("/api/affiliates/{}/withdrawals", affiliate.id))
        .await
        .json::<Vec<Value>>();
    assert_eq!(listed.len(), 1);

    server
        .get("/api/withdrawals/999")
        .await
        .assert_status_not_found();
}
