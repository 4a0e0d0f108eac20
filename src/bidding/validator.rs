/// 입찰 검증기
/// 경매 스냅샷과 입찰 후보를 받아 수락/거절만 판정하는 순수 함수
/// 부수 효과와 I/O가 없어 단독으로 테스트 가능하다
// region:    --- Imports
use crate::bidding::model::{Auction, STATUS_ACTIVE};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

// endregion: --- Imports

// region:    --- Rejection

/// 입찰 거절 사유
/// 호출자가 금액을 수정해 재시도할 수 있도록 필요한 컨텍스트를 함께 담는다
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidRejection {
    /// 알 수 없는 경매 id
    AuctionNotFound { auction_id: i64 },
    /// ACTIVE가 아닌 상태
    AuctionClosed { status: String },
    /// 상태는 ACTIVE지만 종료 시각이 지남 (스케줄러와의 경합 방어)
    AuctionExpired { end_date: DateTime<Utc> },
    /// 최소 입찰가 미달, min_bid = current_price + bid_increment
    BidTooLow { min_bid: i64 },
}

impl BidRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BidRejection::AuctionNotFound { .. } => "AUCTION_NOT_FOUND",
            BidRejection::AuctionClosed { .. } => "AUCTION_CLOSED",
            BidRejection::AuctionExpired { .. } => "AUCTION_EXPIRED",
            BidRejection::BidTooLow { .. } => "BID_TOO_LOW",
        }
    }

    /// 응답 바디 생성
    /// 가격 관련 거절은 항상 minBid를 포함한다
    pub fn body(&self) -> Value {
        match self {
            BidRejection::AuctionNotFound { auction_id } => json!({
                "error": "경매를 찾을 수 없습니다.",
                "code": self.code(),
                "auctionId": auction_id,
            }),
            BidRejection::AuctionClosed { status } => json!({
                "error": "경매가 이미 종료되었습니다.",
                "code": self.code(),
                "status": status,
            }),
            BidRejection::AuctionExpired { end_date } => json!({
                "error": "경매 종료 시각이 지났습니다.",
                "code": self.code(),
                "endDate": end_date,
            }),
            BidRejection::BidTooLow { min_bid } => json!({
                "error": "입찰 금액이 최소 입찰가보다 낮습니다.",
                "code": self.code(),
                "minBid": min_bid,
            }),
        }
    }
}

// endregion: --- Rejection

// region:    --- Validator

/// 입찰 검증
/// 상태 -> 시간 -> 금액 순으로 판정한다
pub fn validate(
    auction: &Auction,
    amount: i64,
    _bidder_id: i64,
    now: DateTime<Utc>,
) -> Result<(), BidRejection> {
    if auction.status != STATUS_ACTIVE {
        return Err(BidRejection::AuctionClosed {
            status: auction.status.clone(),
        });
    }

    // 스케줄러가 아직 마감하지 않은 경매도 종료 시각이 지났으면 거절
    if now > auction.end_date {
        return Err(BidRejection::AuctionExpired {
            end_date: auction.end_date,
        });
    }

    if amount < auction.min_bid() {
        return Err(BidRejection::BidTooLow {
            min_bid: auction.min_bid(),
        });
    }

    Ok(())
}

// endregion: --- Validator

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::model::{STATUS_EXPIRED, STATUS_SOLD};
    use chrono::Duration;

    /// 테스트용 경매 생성 (starting_price=1000, bid_increment=50, reserve_price=2000)
    fn test_auction(now: DateTime<Utc>) -> Auction {
        Auction {
            id: 1,
            product_id: 10,
            seller_id: 20,
            starting_price: 1000,
            current_price: 1000,
            reserve_price: Some(2000),
            bid_increment: 50,
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
            status: STATUS_ACTIVE.to_string(),
            bid_count: 0,
            created_at: now - Duration::hours(1),
        }
    }

    #[test]
    fn accepts_bid_at_exact_minimum() {
        let now = Utc::now();
        let auction = test_auction(now);
        // 정확히 current_price + bid_increment 는 수락
        assert_eq!(validate(&auction, 1050, 1, now), Ok(()));
    }

    #[test]
    fn rejects_bid_one_unit_below_minimum() {
        let now = Utc::now();
        let auction = test_auction(now);
        assert_eq!(
            validate(&auction, 1049, 1, now),
            Err(BidRejection::BidTooLow { min_bid: 1050 })
        );
    }

    #[test]
    fn rejects_low_bid_with_updated_minimum() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.current_price = 1050;
        auction.bid_count = 1;
        // 1000원 입찰은 거절, minBid는 1100
        assert_eq!(
            validate(&auction, 1000, 2, now),
            Err(BidRejection::BidTooLow { min_bid: 1100 })
        );
        // 1100원 입찰은 수락
        assert_eq!(validate(&auction, 1100, 2, now), Ok(()));
    }

    #[test]
    fn rejects_non_active_auction() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.status = STATUS_SOLD.to_string();
        assert_eq!(
            validate(&auction, 5000, 1, now),
            Err(BidRejection::AuctionClosed {
                status: STATUS_SOLD.to_string()
            })
        );

        auction.status = STATUS_EXPIRED.to_string();
        assert!(matches!(
            validate(&auction, 5000, 1, now),
            Err(BidRejection::AuctionClosed { .. })
        ));

        // 외부 시스템이 기록한 상태도 ACTIVE가 아니면 종료로 취급
        auction.status = "ENDED".to_string();
        assert!(matches!(
            validate(&auction, 5000, 1, now),
            Err(BidRejection::AuctionClosed { .. })
        ));
    }

    #[test]
    fn rejects_expired_but_still_active_auction() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        // 상태가 갱신되지 않은 ACTIVE 경매라도 종료 시각이 지나면 거절
        auction.end_date = now - Duration::seconds(1);
        assert_eq!(
            validate(&auction, 5000, 1, now),
            Err(BidRejection::AuctionExpired {
                end_date: auction.end_date
            })
        );
    }

    #[test]
    fn seller_may_bid_on_own_auction() {
        let now = Utc::now();
        let auction = test_auction(now);
        // 판매자 본인 입찰 금지는 외부 정책, 검증기는 관여하지 않는다
        assert_eq!(validate(&auction, 1050, auction.seller_id, now), Ok(()));
    }

    #[test]
    fn rejection_body_carries_min_bid() {
        let body = BidRejection::BidTooLow { min_bid: 1100 }.body();
        assert_eq!(body["code"], "BID_TOO_LOW");
        assert_eq!(body["minBid"], 1100);
    }
}

// endregion: --- Tests
