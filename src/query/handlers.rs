/// 읽기 전용 조회 계층
/// 경매 상태 조회와 입찰 원장에 대한 통계/이력 집계
// region:    --- Imports
use super::queries;
use crate::bidding::model::{Auction, Bid};
use crate::database::DatabaseManager;
use chrono::{DateTime, Utc};
use sqlx::Error as SqlxError;
use sqlx::FromRow;
use tracing::info;

// endregion: --- Imports

// region:    --- Read Models

/// 경매 전체 입찰에 대한 집계
#[derive(Debug, FromRow)]
pub struct BidStats {
    pub total: i64,
    pub highest_bid: i64,
    pub lowest_bid: i64,
    pub average_bid: f64,
    pub unique_bidders: i64,
}

/// 입찰자 표시 정보가 붙은 입찰 이력 행
#[derive(Debug, FromRow)]
pub struct BidWithUser {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub bidder_name: Option<String>,
    pub bidder_avatar: Option<String>,
}

// endregion: --- Read Models

// region:    --- Pagination

pub const DEFAULT_LIMIT: i64 = 50;
pub const DEFAULT_OFFSET: i64 = 0;
const MAX_LIMIT: i64 = 200;

/// 페이지 크기 제한 (1..=200)
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIMIT)
}

/// 다음 페이지 존재 여부
pub fn has_more(offset: i64, returned: usize, total: i64) -> bool {
    offset + (returned as i64) < total
}

// endregion: --- Pagination

// region:    --- Query Handlers

/// 경매 상태 조회
/// 폴링 기반 외부 레이어가 사용하는 값싼 멱등 읽기
pub async fn get_auction(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Option<Auction>, SqlxError> {
    info!("{:<12} --> 경매 상태 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
                    .bind(auction_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// 전체 입찰 원장 조회 (시간순)
pub async fn get_bids(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Vec<Bid>, SqlxError> {
    info!("{:<12} --> 입찰 원장 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_BIDS)
                    .bind(auction_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 입찰 통계 조회
/// 입찰이 없는 경매는 0으로 채운 통계를 돌려준다
pub async fn get_bid_stats(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<BidStats, SqlxError> {
    info!("{:<12} --> 입찰 통계 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, BidStats>(queries::GET_BID_STATS)
                    .bind(auction_id)
                    .fetch_one(&mut **tx)
                    .await
            })
        })
        .await
}

/// 입찰 이력 조회 (최신순 페이지 + 전체 집계)
/// 존재 확인, 통계, 페이지를 한 트랜잭션의 단일 스냅샷에서 읽어
/// 중간에 수락된 입찰 때문에 total/hasMore와 페이지가 어긋나지 않게 한다
/// 알 수 없는 경매면 None
pub async fn get_bid_history(
    db_manager: &DatabaseManager,
    auction_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Option<(BidStats, Vec<BidWithUser>)>, SqlxError> {
    info!(
        "{:<12} --> 입찰 이력 조회 id: {}, limit: {}, offset: {}",
        "Query", auction_id, limit, offset
    );
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                // 문장마다 스냅샷이 갱신되지 않도록 고정한다
                sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
                    .execute(&mut **tx)
                    .await?;

                let auction = sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
                    .bind(auction_id)
                    .fetch_optional(&mut **tx)
                    .await?;
                if auction.is_none() {
                    return Ok(None);
                }

                let stats = sqlx::query_as::<_, BidStats>(queries::GET_BID_STATS)
                    .bind(auction_id)
                    .fetch_one(&mut **tx)
                    .await?;

                let page = sqlx::query_as::<_, BidWithUser>(queries::GET_BID_PAGE)
                    .bind(auction_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&mut **tx)
                    .await?;

                Ok(Some((stats, page)))
            })
        })
        .await
}

// endregion: --- Query Handlers

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_more_when_ledger_extends_past_page() {
        // 5건 중 limit=2, offset=0 이면 다음 페이지가 있다
        assert!(has_more(0, 2, 5));
        assert!(has_more(2, 2, 5));
        assert!(!has_more(4, 1, 5));
        assert!(!has_more(0, 0, 0));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-10), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(10_000), 200);
    }
}

// endregion: --- Tests
