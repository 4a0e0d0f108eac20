/// 경매 마감 스케줄러
/// 종료 시각이 지난 ACTIVE 경매를 주기적으로 훑어 SOLD 또는 EXPIRED로 전이한다
/// 모든 전이는 status = 'ACTIVE' 가드가 붙은 조건부 갱신이라
/// 중복 실행이나 동시 실행이 겹쳐도 각 경매는 한 번만 전이된다
// region:    --- Imports
use crate::bidding::model::{STATUS_ACTIVE, STATUS_EXPIRED, STATUS_SOLD};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- SQL

/// 마감 대상 조회
const SELECT_DUE_AUCTIONS: &str =
    "SELECT id, current_price, reserve_price FROM auctions WHERE status = 'ACTIVE' AND end_date <= $1";

/// 마감 전이
/// 읽은 시점의 가격까지 가드에 넣어, 마감 직전에 들어온 입찰과 엇갈리면
/// 이번 틱에서는 건너뛰고 다음 틱이 다시 판정하게 한다
const CLOSE_AUCTION: &str =
    "UPDATE auctions SET status = $1 WHERE id = $2 AND status = 'ACTIVE' AND current_price = $3";

// endregion: --- SQL

// region:    --- Closing Decision

/// 마감 시 최종 상태 판정
/// 최저 낙찰가가 없거나 충족되면 SOLD, 미달이면 EXPIRED (유찰)
/// 유찰 처리 방침이 바뀌어도 이 함수만 고치면 된다
pub fn closing_status(reserve_price: Option<i64>, current_price: i64) -> &'static str {
    match reserve_price {
        Some(reserve) if current_price < reserve => STATUS_EXPIRED,
        _ => STATUS_SOLD,
    }
}

// endregion: --- Closing Decision

// region:    --- Sweep

/// 마감 스윕
/// 전이된 경매 id 목록을 돌려준다
/// 같은 now로 두 번 실행해도 결과는 같다 (가드가 더 이상 맞지 않음)
pub async fn sweep(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<i64>, sqlx::Error> {
    let due = sqlx::query(SELECT_DUE_AUCTIONS)
        .bind(now)
        .fetch_all(pool)
        .await?;

    let mut transitioned = Vec::with_capacity(due.len());
    for row in due {
        let auction_id: i64 = row.get("id");
        let current_price: i64 = row.get("current_price");
        let reserve_price: Option<i64> = row.get("reserve_price");

        let next_status = closing_status(reserve_price, current_price);
        let result = sqlx::query(CLOSE_AUCTION)
            .bind(next_status)
            .bind(auction_id)
            .bind(current_price)
            .execute(pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(
                "{:<12} --> 경매 마감: auction_id={}, status={}",
                "Scheduler", auction_id, next_status
            );
            transitioned.push(auction_id);
        }
    }

    Ok(transitioned)
}

// endregion: --- Sweep

// region:    --- Auction Scheduler

/// 경매 마감 스케줄러
pub struct AuctionScheduler {
    pool: Arc<PgPool>,
}

impl AuctionScheduler {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// 스케줄러 시작 (1초마다 스윕)
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                match sweep(&pool, Utc::now()).await {
                    Ok(transitioned) if !transitioned.is_empty() => {
                        debug!(
                            "{:<12} --> 스윕 완료, 전이된 경매: {:?}",
                            "Scheduler", transitioned
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("{:<12} --> 경매 마감 스윕 중 오류 발생: {:?}", "Scheduler", e);
                    }
                }
            }
        });
    }
}

// endregion: --- Auction Scheduler

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reserve_closes_as_sold() {
        assert_eq!(closing_status(None, 1000), STATUS_SOLD);
    }

    #[test]
    fn met_reserve_closes_as_sold() {
        assert_eq!(closing_status(Some(2000), 2000), STATUS_SOLD);
        assert_eq!(closing_status(Some(2000), 2500), STATUS_SOLD);
    }

    #[test]
    fn unmet_reserve_closes_as_expired() {
        // currentPrice=1100 < reservePrice=2000 이면 유찰
        assert_eq!(closing_status(Some(2000), 1100), STATUS_EXPIRED);
    }
}

// endregion: --- Tests
