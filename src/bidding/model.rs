use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 경매 상태 값
// 상태 전이는 ACTIVE -> {SOLD, EXPIRED, CANCELLED} 단방향만 허용
// 외부 시스템이 기록한 그 밖의 상태(예: "ENDED")는 모두 종료로 취급해 읽기만 한다
pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_SOLD: &str = "SOLD";
pub const STATUS_CANCELLED: &str = "CANCELLED";
pub const STATUS_EXPIRED: &str = "EXPIRED";

// 경매 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Auction {
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
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// 다음 입찰이 만족해야 하는 최소 금액
    pub fn min_bid(&self) -> i64 {
        self.current_price + self.bid_increment
    }
}

// 입찰 모델 (한번 기록되면 수정/삭제 없음)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}
