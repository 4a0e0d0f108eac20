// region:    --- Imports
use crate::bidding::commands::{self, PlaceBidCommand, PlaceBidError};
use crate::bidding::model::Auction;
use crate::bidding::validator::BidRejection;
use crate::database::DatabaseManager;
use crate::notifier::KafkaNotifier;
use crate::query;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

pub type AppState = (Arc<DatabaseManager>, Arc<KafkaNotifier>);

// region:    --- Response Models

/// 외부 JSON 표현 (camelCase)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionResponse {
    pub id: i64,
    pub product_id: i64,
    pub seller_id: i64,
    pub starting_price: i64,
    pub current_price: i64,
    pub reserve_price: Option<i64>,
    pub bid_increment: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub bid_count: i64,
}

impl From<Auction> for AuctionResponse {
    fn from(auction: Auction) -> Self {
        AuctionResponse {
            id: auction.id,
            product_id: auction.product_id,
            seller_id: auction.seller_id,
            starting_price: auction.starting_price,
            current_price: auction.current_price,
            reserve_price: auction.reserve_price,
            bid_increment: auction.bid_increment,
            start_date: auction.start_date,
            end_date: auction.end_date,
            status: auction.status,
            bid_count: auction.bid_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidResponse {
    pub id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidStatsResponse {
    pub total: i64,
    pub highest_bid: i64,
    pub lowest_bid: i64,
    pub average_bid: f64,
    pub unique_bidders: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct BidHistoryResponse {
    pub bids: Vec<BidResponse>,
    pub stats: BidStatsResponse,
    pub pagination: PaginationResponse,
}

// endregion: --- Response Models

// region:    --- Error Mapping

/// 거절 사유 -> HTTP 상태 코드
fn rejection_status(rejection: &BidRejection) -> StatusCode {
    match rejection {
        BidRejection::AuctionNotFound { .. } => StatusCode::NOT_FOUND,
        BidRejection::AuctionClosed { .. } | BidRejection::AuctionExpired { .. } => {
            StatusCode::CONFLICT
        }
        BidRejection::BidTooLow { .. } => StatusCode::BAD_REQUEST,
    }
}

/// 인프라 오류는 내부 정보 없이 500으로만 응답한다
fn storage_error_response(context: &str, e: sqlx::Error) -> axum::response::Response {
    error!("{:<12} --> 저장소 오류 ({}): {:?}", "Handler", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "내부 오류가 발생했습니다."})),
    )
        .into_response()
}

// endregion: --- Error Mapping

// region:    --- Command Handlers

/// 입찰 요청 처리
/// POST /api/auctions/:id  body: {"amount": .., "bidderId": ..}
pub async fn handle_place_bid(
    State((db_manager, notifier)): State<AppState>,
    Path(auction_id): Path<i64>,
    Json(mut cmd): Json<PlaceBidCommand>,
) -> impl IntoResponse {
    cmd.auction_id = auction_id;
    info!("{:<12} --> 입찰 요청: {:?}", "Command", cmd);

    match commands::place_bid(cmd, &db_manager, notifier.as_ref()).await {
        // 수락 응답은 조건부 갱신이 돌려준 행 그대로다
        // 커밋된 입찰이 뒤따르는 조회 실패나 경쟁 입찰 때문에 다르게 보고되지 않는다
        Ok(accepted) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "auction": AuctionResponse::from(accepted)
            })),
        )
            .into_response(),
        Err(PlaceBidError::Rejected(rejection)) => {
            info!(
                "{:<12} --> 입찰 거절: code={}",
                "Command",
                rejection.code()
            );
            (rejection_status(&rejection), Json(rejection.body())).into_response()
        }
        Err(PlaceBidError::Storage(e)) => storage_error_response("place_bid", e),
    }
}

/// 경매 취소 요청 처리
/// POST /api/auctions/:id/cancel
pub async fn handle_cancel_auction(
    State((db_manager, _)): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 취소 요청: id={}", "Command", auction_id);

    match commands::cancel_auction(auction_id, &db_manager).await {
        Ok(auction) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "auction": AuctionResponse::from(auction)
            })),
        )
            .into_response(),
        Err(PlaceBidError::Rejected(rejection)) => {
            (rejection_status(&rejection), Json(rejection.body())).into_response()
        }
        Err(PlaceBidError::Storage(e)) => storage_error_response("cancel_auction", e),
    }
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 경매 상태 조회
/// GET /api/auctions/:id
pub async fn handle_get_auction(
    State((db_manager, _)): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 상태 조회 id: {}", "HandlerQuery", auction_id);
    match query::handlers::get_auction(&db_manager, auction_id).await {
        Ok(Some(auction)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "auction": AuctionResponse::from(auction)
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(BidRejection::AuctionNotFound { auction_id }.body()),
        )
            .into_response(),
        Err(e) => storage_error_response("get_auction", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct BidHistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 입찰 이력 및 통계 조회
/// GET /api/auctions/:id/bids?limit=50&offset=0
pub async fn handle_get_bid_history(
    State((db_manager, _)): State<AppState>,
    Path(auction_id): Path<i64>,
    Query(params): Query<BidHistoryParams>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 입찰 이력 조회 id: {}, params: {:?}",
        "HandlerQuery", auction_id, params
    );

    let limit = query::handlers::clamp_limit(params.limit.unwrap_or(query::handlers::DEFAULT_LIMIT));
    let offset = params.offset.unwrap_or(query::handlers::DEFAULT_OFFSET).max(0);

    // 존재 확인과 통계, 페이지는 한 스냅샷에서 함께 읽는다
    let (stats, page) =
        match query::handlers::get_bid_history(&db_manager, auction_id, limit, offset).await {
            Ok(Some((stats, page))) => (stats, page),
            // 알 수 없는 경매는 404
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(BidRejection::AuctionNotFound { auction_id }.body()),
                )
                    .into_response()
            }
            Err(e) => return storage_error_response("get_bid_history", e),
        };

    let has_more = query::handlers::has_more(offset, page.len(), stats.total);
    let response = BidHistoryResponse {
        bids: page
            .into_iter()
            .map(|bid| BidResponse {
                id: bid.id,
                amount: bid.amount,
                created_at: bid.created_at,
                user: UserResponse {
                    id: bid.bidder_id,
                    name: bid.bidder_name,
                    avatar: bid.bidder_avatar,
                },
            })
            .collect(),
        stats: BidStatsResponse {
            total: stats.total,
            highest_bid: stats.highest_bid,
            lowest_bid: stats.lowest_bid,
            average_bid: stats.average_bid,
            unique_bidders: stats.unique_bidders,
        },
        pagination: PaginationResponse {
            limit,
            offset,
            total: stats.total,
            has_more,
        },
    };

    (StatusCode::OK, Json(response)).into_response()
}

// endregion: --- Query Handlers
