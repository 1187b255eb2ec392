//! Waiter Server - 餐厅订单通知服务
//!
//! # 架构概述
//!
//! 轮询外部订单库，把新订单和状态变化扇出成消息通知：顾客、店铺、
//! 骑手各走各的模板。消息通道的会话由连接管理器维护（配对、凭证、
//! 断线重连）。
//!
//! - **连接** (`connection`): 传输会话生命周期与指数退避重连
//! - **摄取** (`ingestion`): 游标轮询 + 去重，产出分发事件
//! - **分发** (`dispatch`): 按订单类型和状态扇出通知
//! - **轮换** (`rotation`): 支付标识的公平轮换选择
//! - **营业状态** (`availability`): 人工开关 + 排班表回退
//!
//! # 模块结构
//!
//! ```text
//! waiter-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── connection/    # 会话生命周期
//! ├── ingestion/     # 订单轮询
//! ├── dispatch/      # 通知扇出
//! ├── rotation/      # 支付标识轮换
//! ├── availability/  # 营业状态
//! ├── store/         # 外部协作者 trait + 内存实现
//! ├── transport/     # 消息通道抽象
//! └── utils/         # 错误、日志
//! ```

pub mod availability;
pub mod connection;
pub mod core;
pub mod dispatch;
pub mod ingestion;
pub mod rotation;
pub mod store;
pub mod transport;
pub mod utils;

// Re-export 公共类型
pub use availability::AvailabilityMonitor;
pub use connection::{ConnectionManager, ConnectionState};
pub use core::{AppState, BackgroundTasks, Collaborators, Config};
pub use dispatch::NotificationDispatcher;
pub use ingestion::OrderIngestionPoller;
pub use rotation::KeyRotationSelector;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
