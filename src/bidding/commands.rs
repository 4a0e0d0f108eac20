/// 입찰 관련 커맨드 처리
/// 1. 입찰 (조건부 갱신 + 입찰 기록을 한 트랜잭션으로)
/// 2. 경매 취소 (ACTIVE -> CANCELLED)
// region:    --- Imports
use crate::bidding::model::{Auction, STATUS_ACTIVE, STATUS_CANCELLED};
use crate::bidding::validator::{self, BidRejection};
use crate::database::DatabaseManager;
use crate::notifier::{Notifier, PriceChanged};
use crate::query::queries;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidCommand {
    #[serde(default)]
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
}

/// 입찰 실패
/// Rejected는 호출자가 금액을 고쳐 재시도할 수 있고,
/// Storage는 재시도 후에도 남은 인프라 장애다
#[derive(Debug)]
pub enum PlaceBidError {
    Rejected(BidRejection),
    Storage(sqlx::Error),
}

impl From<BidRejection> for PlaceBidError {
    fn from(rejection: BidRejection) -> Self {
        PlaceBidError::Rejected(rejection)
    }
}

// endregion: --- Commands

// region:    --- SQL

/// 입찰 수락 조건부 갱신
/// 저장소에 있는 실시간 가격이 증분 규칙을 만족할 때만 갱신된다 (CAS)
/// 갱신된 행 전체를 돌려받아, 커밋 이후의 추가 조회 없이 응답을 만든다
const CAS_ACCEPT_BID: &str = r#"
    UPDATE auctions
    SET current_price = $1, bid_count = bid_count + 1
    WHERE id = $2 AND status = 'ACTIVE' AND current_price <= $1 - bid_increment
    RETURNING *
"#;

/// 입찰 기록 추가 (불변, 감사 이력)
const INSERT_BID: &str =
    "INSERT INTO bids (auction_id, bidder_id, amount, created_at) VALUES ($1, $2, $3, $4)";

/// 경매 취소 (ACTIVE 상태에서만)
const CANCEL_AUCTION: &str =
    "UPDATE auctions SET status = $1 WHERE id = $2 AND status = $3 RETURNING *";

// endregion: --- SQL

// region:    --- Retry Policy

// 일시적 저장소 오류에 대한 최대 재시도 횟수
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 50;

/// 재시도 간격 (2배씩 증가)
fn backoff_delay(retry: u32) -> std::time::Duration {
    std::time::Duration::from_millis(BASE_BACKOFF_MS << retry)
}

/// 재시도 가능한 저장소 오류 판별
/// 직렬화 충돌(40001), 데드락(40P01), 풀/IO 오류만 재시도한다
fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

// endregion: --- Retry Policy

// region:    --- Place Bid

/// 1. 입찰
/// 검증 실패는 즉시 반환하고, CAS 경합 패배는 실시간 가격을 다시 읽어
/// 갱신된 최소 입찰가를 담은 거절로 변환한다. 조용히 실패하는 경로는 없다.
/// 수락 시에는 조건부 갱신이 돌려준 경매 행을 그대로 반환한다.
pub async fn place_bid(
    cmd: PlaceBidCommand,
    db_manager: &DatabaseManager,
    notifier: &impl Notifier,
) -> Result<Auction, PlaceBidError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    let mut retries = 0;

    loop {
        match attempt_place_bid(&cmd, db_manager).await {
            Ok(Ok(accepted)) => {
                // 알림 실패는 수락된 입찰에 영향을 주지 않는다
                let notification = PriceChanged {
                    auction_id: accepted.id,
                    current_price: accepted.current_price,
                    bid_count: accepted.bid_count,
                    timestamp: Utc::now(),
                };
                if let Err(e) = notifier.notify(notification).await {
                    warn!("{:<12} --> 가격 변경 알림 발행 실패: {}", "Command", e);
                }
                return Ok(accepted);
            }
            Ok(Err(rejection)) => return Err(PlaceBidError::Rejected(rejection)),
            Err(e) if is_transient(&e) && retries < MAX_RETRIES => {
                warn!(
                    "{:<12} --> 일시적 저장소 오류, 재시도 {}/{}: {:?}",
                    "Command",
                    retries + 1,
                    MAX_RETRIES,
                    e
                );
                tokio::time::sleep(backoff_delay(retries)).await;
                retries += 1;
            }
            Err(e) => return Err(PlaceBidError::Storage(e)),
        }
    }
}

/// 입찰 1회 시도
/// 바깥 Result는 저장소 오류, 안쪽 Result는 수락/거절 판정
async fn attempt_place_bid(
    cmd: &PlaceBidCommand,
    db_manager: &DatabaseManager,
) -> Result<Result<Auction, BidRejection>, sqlx::Error> {
    let now = Utc::now();

    // 사전 검증 (실시간 저장소 값 기준)
    let auction = match fetch_auction(db_manager, cmd.auction_id).await? {
        Some(auction) => auction,
        None => {
            return Ok(Err(BidRejection::AuctionNotFound {
                auction_id: cmd.auction_id,
            }))
        }
    };
    if let Err(rejection) = validator::validate(&auction, cmd.amount, cmd.bidder_id, now) {
        return Ok(Err(rejection));
    }

    // 조건부 갱신과 입찰 기록을 한 트랜잭션으로 묶는다
    // 중간에 중단되면 아무 흔적도 남지 않는다
    let mut tx = db_manager.pool.begin().await?;

    let updated = sqlx::query_as::<_, Auction>(CAS_ACCEPT_BID)
        .bind(cmd.amount)
        .bind(cmd.auction_id)
        .fetch_optional(&mut *tx)
        .await?;

    match updated {
        Some(accepted) => {
            sqlx::query(INSERT_BID)
                .bind(cmd.auction_id)
                .bind(cmd.bidder_id)
                .bind(cmd.amount)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            info!(
                "{:<12} --> 입찰 수락: auction_id={}, current_price={}, bid_count={}",
                "Command", accepted.id, accepted.current_price, accepted.bid_count
            );
            Ok(Ok(accepted))
        }
        None => {
            // 다른 입찰 또는 마감이 경합에서 이겼다
            // 실시간 상태를 다시 읽어 갱신된 거절 사유를 돌려준다
            tx.rollback().await?;
            info!(
                "{:<12} --> 입찰 경합 패배, 실시간 상태 재조회: auction_id={}",
                "Command", cmd.auction_id
            );

            let rejection = match fetch_auction(db_manager, cmd.auction_id).await? {
                None => BidRejection::AuctionNotFound {
                    auction_id: cmd.auction_id,
                },
                Some(live) => {
                    match validator::validate(&live, cmd.amount, cmd.bidder_id, now) {
                        Err(rejection) => rejection,
                        // 갱신 조건이 거짓이었으므로 도달하지 않지만,
                        // 항상 최소 입찰가를 담은 거절로 수렴시킨다
                        Ok(()) => BidRejection::BidTooLow {
                            min_bid: live.min_bid(),
                        },
                    }
                }
            };
            Ok(Err(rejection))
        }
    }
}

/// 경매 단건 조회
async fn fetch_auction(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Option<Auction>, sqlx::Error> {
    sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
        .bind(auction_id)
        .fetch_optional(&*db_manager.pool)
        .await
}

// endregion: --- Place Bid

// region:    --- Cancel Auction

/// 2. 경매 취소
/// 판매자/관리자의 명시적 액션으로 ACTIVE -> CANCELLED 전이
/// 마감 스케줄러와 같은 status = 'ACTIVE' 가드를 사용한다
pub async fn cancel_auction(
    auction_id: i64,
    db_manager: &DatabaseManager,
) -> Result<Auction, PlaceBidError> {
    info!("{:<12} --> 경매 취소 요청: auction_id={}", "Command", auction_id);

    let cancelled = sqlx::query_as::<_, Auction>(CANCEL_AUCTION)
        .bind(STATUS_CANCELLED)
        .bind(auction_id)
        .bind(STATUS_ACTIVE)
        .fetch_optional(&*db_manager.pool)
        .await
        .map_err(PlaceBidError::Storage)?;

    match cancelled {
        Some(auction) => Ok(auction),
        None => match fetch_auction(db_manager, auction_id)
            .await
            .map_err(PlaceBidError::Storage)?
        {
            None => Err(BidRejection::AuctionNotFound { auction_id }.into()),
            Some(auction) => Err(BidRejection::AuctionClosed {
                status: auction.status,
            }
            .into()),
        },
    }
}

// endregion: --- Cancel Auction

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_retry() {
        assert_eq!(backoff_delay(0).as_millis(), 50);
        assert_eq!(backoff_delay(1).as_millis(), 100);
        assert_eq!(backoff_delay(2).as_millis(), 200);
    }
}

// endregion: --- Tests
