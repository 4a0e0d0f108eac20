/// 경매 단건 조회
pub const GET_AUCTION: &str = "SELECT id, product_id, seller_id, starting_price, current_price, reserve_price, bid_increment, start_date, end_date, status, bid_count, created_at FROM auctions WHERE id = $1";

/// 경매 하나의 전체 입찰 원장 조회 (시간순)
pub const GET_BIDS: &str = r#"
    SELECT id, auction_id, bidder_id, amount, created_at
    FROM bids
    WHERE auction_id = $1
    ORDER BY created_at ASC
"#;

/// 입찰 이력 페이지 조회 (최신순)
/// 입찰자 표시 정보는 외부 소유의 users 테이블에서 읽기만 한다
pub const GET_BID_PAGE: &str = r#"
    SELECT b.id, b.auction_id, b.bidder_id, b.amount, b.created_at,
           u.name AS bidder_name, u.avatar AS bidder_avatar
    FROM bids b
    LEFT JOIN users u ON u.id = b.bidder_id
    WHERE b.auction_id = $1
    ORDER BY b.created_at DESC
    LIMIT $2 OFFSET $3
"#;

/// 입찰 통계 조회
/// 집계는 페이지가 아니라 해당 경매의 전체 입찰을 대상으로 한다
/// 입찰이 없으면 0으로 채워 항상 성공한다
pub const GET_BID_STATS: &str = r#"
    SELECT COUNT(*) AS total,
           COALESCE(MAX(amount), 0) AS highest_bid,
           COALESCE(MIN(amount), 0) AS lowest_bid,
           COALESCE(AVG(amount)::DOUBLE PRECISION, 0) AS average_bid,
           COUNT(DISTINCT bidder_id) AS unique_bidders
    FROM bids
    WHERE auction_id = $1
"#;
