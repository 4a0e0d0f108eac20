/// 가격 변경 알림
/// 입찰이 수락될 때마다 외부 실시간 레이어가 중계할 수 있도록 Kafka 토픽에 발행한다
/// 전달 방식(폴링/푸시)은 본 엔진의 관심사가 아니다
// region:    --- Imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// endregion: --- Imports

// 가격 변경 알림 토픽
pub const PRICE_CHANGED_TOPIC: &str = "auction-price-changed";

// region:    --- Notification Model

/// 수락된 입찰 한 건에 대한 알림 페이로드
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PriceChanged {
    pub auction_id: i64,
    pub current_price: i64,
    pub bid_count: i64,
    pub timestamp: DateTime<Utc>,
}

// endregion: --- Notification Model

// region:    --- Notifier Trait

/// 알림 발행 트레이트
/// 테스트에서는 기록용 구현체로 대체할 수 있다
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: PriceChanged) -> Result<(), String>;
}

// endregion: --- Notifier Trait

// region:    --- Kafka Notifier

pub struct KafkaNotifier {
    producer: Arc<FutureProducer>,
    brokers: String,
}

/// KafkaNotifier 구현
impl KafkaNotifier {
    pub fn new() -> Result<Self, String> {
        let brokers =
            std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string());

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| format!("Producer creation error: {:?}", e))?;

        Ok(KafkaNotifier {
            producer: Arc::new(producer),
            brokers,
        })
    }

    /// 알림 토픽 생성
    pub async fn create_topic(
        &self,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<(), String> {
        info!(
            "{:<12} --> 알림 토픽 생성 시작: {}",
            "Notifier", PRICE_CHANGED_TOPIC
        );

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()
            .map_err(|e| format!("AdminClient 생성 실패: {:?}", e))?;

        let new_topic = NewTopic::new(
            PRICE_CHANGED_TOPIC,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        match admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await
        {
            Ok(_) => {
                info!(
                    "{:<12} --> 알림 토픽 생성 성공: {}",
                    "Notifier", PRICE_CHANGED_TOPIC
                );
                Ok(())
            }
            Err(e) => {
                error!("{:<12} --> 알림 토픽 생성 실패: {:?}", "Notifier", e);
                Err(format!("토픽 생성 실패: {:?}", e))
            }
        }
    }
}

#[async_trait]
impl Notifier for KafkaNotifier {
    /// 가격 변경 알림 발행
    async fn notify(&self, notification: PriceChanged) -> Result<(), String> {
        info!(
            "{:<12} --> 가격 변경 알림 발행: auction_id={}, current_price={}",
            "Notifier", notification.auction_id, notification.current_price
        );

        let key = notification.auction_id.to_string();
        let payload =
            serde_json::to_string(&notification).map_err(|e| e.to_string())?;
        let record = FutureRecord::to(PRICE_CHANGED_TOPIC)
            .key(&key)
            .payload(&payload);

        self.producer
            .send(record, Duration::from_secs(0))
            .await
            .map_err(|(e, _)| format!("Error sending notification: {:?}", e))?;

        Ok(())
    }
}

// endregion: --- Kafka Notifier
