//! 应用状态 - 组装通知服务的所有组件

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::availability::{AvailabilityMonitor, Schedule};
use crate::connection::ConnectionManager;
use crate::dispatch::{NotificationDispatcher, Templates};
use crate::ingestion::OrderIngestionPoller;
use crate::rotation::KeyRotationSelector;
use crate::store::{CourierDirectory, CredentialStore, OrderStore, OverrideSource};
use crate::transport::Transport;

use super::Config;

/// 外部协作者集合
///
/// 订单库、骑手名录、排班表等都在服务之外维护；这里只接入它们的
/// trait 实现。测试用内存版，部署用真实后端。
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub credentials: Arc<dyn CredentialStore>,
    pub orders: Arc<dyn OrderStore>,
    pub couriers: Arc<dyn CourierDirectory>,
    pub override_source: Arc<dyn OverrideSource>,
    pub schedule: Arc<dyn Schedule>,
    pub templates: Arc<dyn Templates>,
}

/// 全局应用状态
pub struct AppState {
    pub config: Config,
    pub connection: Arc<ConnectionManager>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub poller: Arc<OrderIngestionPoller>,
    pub availability: Arc<AvailabilityMonitor>,
    pub rotation: Arc<KeyRotationSelector>,
}

impl AppState {
    /// 按依赖顺序组装所有组件
    ///
    /// 连接管理器实现 [`crate::dispatch::OutboundSender`]，分发器直接
    /// 通过它发送消息。
    pub async fn initialize(
        config: Config,
        collaborators: Collaborators,
        shutdown: CancellationToken,
    ) -> Self {
        let connection = ConnectionManager::new(
            collaborators.transport,
            collaborators.credentials,
            config.connection_config(),
            shutdown,
        );

        let availability = Arc::new(AvailabilityMonitor::new(
            collaborators.override_source,
            collaborators.schedule,
            config.availability_ttl,
        ));

        let dispatcher = Arc::new(NotificationDispatcher::new(
            connection.clone(),
            collaborators.couriers,
            collaborators.templates,
            config.dispatcher_config(),
        ));

        let poller = Arc::new(
            OrderIngestionPoller::initialize(
                collaborators.orders,
                availability.clone(),
                dispatcher.clone(),
                config.poller_config(),
            )
            .await,
        );

        let rotation = Arc::new(KeyRotationSelector::new(
            config.payment_keys.clone(),
            config.rotation_config(),
        ));

        tracing::info!(
            environment = %config.environment,
            payment_keys = config.payment_keys.len(),
            "Application state initialized"
        );

        Self { config, connection, dispatcher, poller, availability, rotation }
    }
}
