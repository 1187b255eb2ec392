use std::time::Duration;

use shared::models::PaymentKey;

use crate::connection::ConnectionConfig;
use crate::dispatch::DispatcherConfig;
use crate::ingestion::PollerConfig;
use crate::rotation::RotationConfig;

/// 服务器配置 - 通知服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | STORE_PHONE | (empty) | 店铺通知号码 |
/// | POLL_INTERVAL_SECS | 10 | 订单轮询间隔(秒) |
/// | POLL_BATCH_LIMIT | 50 | 每轮最大订单数 |
/// | PROCESSED_CAP | 4096 | 去重集合容量 |
/// | BACKOFF_BASE_MS | 2000 | 重连退避基数(毫秒) |
/// | MAX_RECONNECT_ATTEMPTS | 6 | 退避上限次数 |
/// | COURIER_SEND_GAP_MS | 500 | 骑手消息间隔(毫秒) |
/// | BLOCK_WINDOW_HOURS | 6 | 支付标识重复阻塞窗口 |
/// | HISTORY_RETENTION_HOURS | 24 | 请求者历史保留时长 |
/// | AVAILABILITY_TTL_SECS | 120 | 营业状态缓存时长 |
/// | PAYMENT_KEYS | [] | 轮换支付标识 (JSON) |
/// | LOG_DIR | (none) | 日志目录 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// STORE_PHONE=5511999990000 POLL_INTERVAL_SECS=5 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 店铺员工接收通知的号码
    pub store_phone: String,
    /// 订单轮询间隔
    pub poll_interval: Duration,
    /// 每轮最大订单数
    pub poll_batch_limit: usize,
    /// 去重集合容量
    pub processed_cap: usize,
    /// 重连退避基数
    pub backoff_base: Duration,
    /// 退避上限次数
    pub max_reconnect_attempts: u32,
    /// 连续骑手消息之间的间隔
    pub courier_send_gap: Duration,
    /// 同一请求者的支付标识阻塞窗口
    pub block_window: Duration,
    /// 请求者历史保留时长
    pub history_retention: Duration,
    /// 营业状态缓存时长
    pub availability_ttl: Duration,
    /// 轮换支付标识列表
    pub payment_keys: Vec<PaymentKey>,
    /// 日志目录 (可选)
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        let payment_keys = std::env::var("PAYMENT_KEYS")
            .ok()
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(keys) => Some(keys),
                Err(e) => {
                    tracing::warn!("PAYMENT_KEYS is not valid JSON, ignoring: {e}");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            store_phone: std::env::var("STORE_PHONE").unwrap_or_default(),
            poll_interval: Duration::from_secs(env_u64("POLL_INTERVAL_SECS", 10)),
            poll_batch_limit: env_u64("POLL_BATCH_LIMIT", 50) as usize,
            processed_cap: env_u64("PROCESSED_CAP", 4096) as usize,
            backoff_base: Duration::from_millis(env_u64("BACKOFF_BASE_MS", 2000)),
            max_reconnect_attempts: env_u64("MAX_RECONNECT_ATTEMPTS", 6) as u32,
            courier_send_gap: Duration::from_millis(env_u64("COURIER_SEND_GAP_MS", 500)),
            block_window: Duration::from_secs(env_u64("BLOCK_WINDOW_HOURS", 6) * 3600),
            history_retention: Duration::from_secs(env_u64("HISTORY_RETENTION_HOURS", 24) * 3600),
            availability_ttl: Duration::from_secs(env_u64("AVAILABILITY_TTL_SECS", 120)),
            payment_keys,
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            batch_limit: self.poll_batch_limit,
            processed_cap: self.processed_cap,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            store_phone: self.store_phone.clone(),
            courier_send_gap: self.courier_send_gap,
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            backoff_base: self.backoff_base,
            max_reconnect_attempts: self.max_reconnect_attempts,
            ..ConnectionConfig::default()
        }
    }

    pub fn rotation_config(&self) -> RotationConfig {
        RotationConfig {
            block_window_ms: self.block_window.as_millis() as i64,
            retention_ms: self.history_retention.as_millis() as i64,
            ..RotationConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
