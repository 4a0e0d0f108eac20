// region:    --- Imports
use crate::database::DatabaseManager;
use crate::notifier::KafkaNotifier;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Modules
mod bidding;
mod database;
mod handlers;
mod notifier;
mod query;
mod scheduler;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 가격 변경 알림 프로듀서 생성 및 토픽 준비
    let kafka_notifier = Arc::new(KafkaNotifier::new()?);
    if let Err(e) = kafka_notifier.create_topic(5, 1).await {
        // 토픽이 이미 있거나 브로커가 늦게 뜨는 경우, 발행 시점에 다시 시도된다
        warn!("{:<12} --> 알림 토픽 준비 실패: {}", "Main", e);
    }
    info!("{:<12} --> 알림 프로듀서 준비 완료", "Main");

    // 경매 마감 스케줄러 시작
    let auction_scheduler = scheduler::AuctionScheduler::new(db_manager.get_pool());
    auction_scheduler.start().await;

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route(
            "/api/auctions/:id",
            post(handlers::handle_place_bid).get(handlers::handle_get_auction),
        )
        .route(
            "/api/auctions/:id/cancel",
            post(handlers::handle_cancel_auction),
        )
        .route(
            "/api/auctions/:id/bids",
            get(handlers::handle_get_bid_history),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state((db_manager, kafka_notifier));

    // 리스너 생성
    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
