#![allow(dead_code)]

use affiliate_engine::api::handlers::{health_handler, referral_redirect_handler};
use affiliate_engine::api::routes::api_routes;
use affiliate_engine::application::services::{ConversionRequest, LinkOptions};
use affiliate_engine::domain::entities::{
    Affiliate, AffiliateProfile, ConversionRecord, RequestContext, UserAccount,
};
use affiliate_engine::infrastructure::memory::MemoryStore;
use affiliate_engine::infrastructure::notification::LogNotifier;
use affiliate_engine::infrastructure::settlement::ManualSettlement;
use affiliate_engine::state::{AppState, EngineOptions, Repositories};
use axum::{Router, extract::ConnectInfo, routing::get};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::Layer;

pub const REFERRAL_SECRET: &str = "test-referral-secret";
pub const BASE_URL: &str = "https://shop.example.com";
pub const OPERATOR_ID: i64 = 1;

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

fn options() -> EngineOptions {
    EngineOptions {
        notifier: Arc::new(LogNotifier::new()),
        settlement: Arc::new(ManualSettlement::new()),
        referral_token_secret: REFERRAL_SECRET.to_string(),
        public_base_url: BASE_URL.to_string(),
        behind_proxy: false,
    }
}

/// Builds the full service graph on an empty in-memory store.
pub async fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::build(Repositories::in_memory(store.clone()), options())
        .await
        .unwrap();

    TestApp { state, store }
}

/// Builds the full service graph on a migrated test database.
pub async fn create_pg_state(pool: PgPool) -> AppState {
    AppState::build(Repositories::postgres(Arc::new(pool)), options())
        .await
        .unwrap()
}

pub async fn create_user(store: &MemoryStore, id: i64, name: &str) {
    store
        .insert_user(UserAccount {
            id,
            email: format!("{}@example.com", name.to_lowercase()),
            display_name: Some(name.to_string()),
        })
        .await;
}

pub async fn create_pg_user(pool: &PgPool, email: &str, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (email, display_name) VALUES ($1, $2) RETURNING id")
        .bind(email)
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Registers `user_id` and approves the new affiliate.
pub async fn create_active_affiliate(app: &TestApp, user_id: i64, name: &str) -> Affiliate {
    create_user(&app.store, user_id, name).await;

    let affiliate = app
        .state
        .affiliate_service
        .register(
            user_id,
            AffiliateProfile {
                display_name: Some(name.to_string()),
                website: None,
            },
        )
        .await
        .unwrap();

    app.state
        .affiliate_service
        .approve(affiliate.id, OPERATOR_ID, None)
        .await
        .unwrap()
}

/// Clicks a fresh link of `affiliate` and attributes `customer_id` to it.
pub async fn refer_customer(app: &TestApp, affiliate: &Affiliate, customer_id: i64) {
    let link = app
        .state
        .link_service
        .generate_link(affiliate.id, LinkOptions::default())
        .await
        .unwrap();

    let resolution = app
        .state
        .link_service
        .resolve_click(
            &link.short_code,
            RequestContext::new(Some("203.0.113.7".to_string()), Some("TestBot/1.0"), None),
        )
        .await
        .unwrap();

    let attribution = app
        .state
        .conversion_service
        .attribute_user(customer_id, &resolution.referral_token)
        .await
        .unwrap();
    assert!(attribution.is_some());
}

pub async fn convert(
    app: &TestApp,
    customer_id: i64,
    value: Decimal,
) -> Option<ConversionRecord> {
    app.state
        .conversion_service
        .track_conversion(ConversionRequest {
            user_id: customer_id,
            conversion_type: "sale".to_string(),
            conversion_value: value,
            order_id: None,
            product_id: None,
            campaign: None,
        })
        .await
        .unwrap()
}

/// Gives `affiliate` exactly `amount` of available balance: rate 1 on a
/// Bronze tier pays the whole conversion value while staying under the
/// first performance bonus threshold.
pub async fn fund_affiliate(app: &TestApp, affiliate: &Affiliate, customer_id: i64, amount: Decimal) {
    app.state
        .affiliate_service
        .update_terms(affiliate.id, None, Some(Decimal::ONE))
        .await
        .unwrap();

    refer_customer(app, affiliate, customer_id).await;
    let record = convert(app, customer_id, amount).await.unwrap();
    assert_eq!(record.affiliate.available_balance, amount);
}

/// Routes of the application without rate limiting, with a fixed peer
/// address injected so that `ConnectInfo` extraction succeeds.
pub fn test_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ref/{short_code}", get(referral_redirect_handler))
        .nest("/api", api_routes())
        .layer(MockConnectInfoLayer)
        .with_state(state)
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
