use std::sync::Arc;

use anyhow::Context;
use waiter_server::availability::AlwaysOpen;
use waiter_server::dispatch::PlainTemplates;
use waiter_server::store::{
    MemoryCredentialStore, MemoryOrderStore, StaticCourierDirectory, StaticOverrideSource,
};
use waiter_server::transport::MemoryTransport;
use waiter_server::{AppState, BackgroundTasks, Collaborators, Config, init_logger_with_file};

use shared::models::ManualOverride;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (dotenv + 日志)
    dotenv::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    tracing::info!("Waiter Server starting...");

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 接入协作者
    //
    // 内存实现，供本地运行和冒烟测试。部署时在这里换成真实后端
    // (订单库、骑手名录、排班表、持久凭证)。
    let collaborators = Collaborators {
        transport: Arc::new(MemoryTransport::with_auto_auth()),
        credentials: Arc::new(MemoryCredentialStore::new()),
        orders: Arc::new(MemoryOrderStore::new()),
        couriers: Arc::new(StaticCourierDirectory::new(vec![])),
        override_source: Arc::new(StaticOverrideSource::new(ManualOverride::Unset)),
        schedule: Arc::new(AlwaysOpen),
        templates: Arc::new(PlainTemplates),
    };

    // 4. 组装状态 + 启动后台任务
    let mut tasks = BackgroundTasks::new();
    let state = AppState::initialize(config, collaborators, tasks.shutdown_token()).await;

    let connection = state.connection.clone();
    let conn_shutdown = tasks.shutdown_token();
    tasks.spawn("connection_manager", async move {
        connection.start().await;
        // start() 返回后重连由内部定时器驱动；这个任务只负责首次建连。
        conn_shutdown.cancelled().await;
    });

    let poller = state.poller.clone();
    let poll_shutdown = tasks.shutdown_token();
    tasks.spawn("order_poller", poller.run(poll_shutdown));

    tracing::info!(tasks = tasks.len(), "Waiter Server ready");

    // 5. 等待退出信号
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    state.connection.stop().await;
    tasks.shutdown().await;
    tracing::info!("Waiter Server stopped");
    Ok(())
}
