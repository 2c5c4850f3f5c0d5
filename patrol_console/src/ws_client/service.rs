//! 机器人链路服务模块。
//!
//! `RobotLinkService` 是操作台与远程机器人之间 WebSocket 链路的唯一
//! 管理者，负责：
//! - 连接的建立、关闭与受限次数的自动重连；
//! - 周期性心跳 (`ping`/`pong`) 与链路质量评估；
//! - 入站消息的解码与分发（内建处理器写入状态存储，其余交给路由器）；
//! - 出站消息的统一发送入口（链路未打开时发送失败而非排队）。
//!
//! 服务实例通过构造函数注入状态存储与配置，自身不持有任何全局单例；
//! 调用方以 `Arc<RobotLinkService>` 的形式在各处共享同一实例。

use crate::config::LinkConfig;
use crate::store::robot_store::RobotStore;
use crate::ws_client::router::{InboundMessage, MessageRouter};
use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use log::{debug, error, info, warn};
use patrol_models::enums::{ConnectionQuality, LinkState};
use patrol_models::ws_payloads::{
    EmptyPayload, PingPayload, PING_MESSAGE_TYPE, REQUEST_TELEMETRY_MESSAGE_TYPE,
};
use patrol_websocket_utils::client::transport::{connect_client, receive_message, ClientWsStream};
use patrol_websocket_utils::error::WsError;
use patrol_websocket_utils::message::WsMessage;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex as TokioMutex, RwLock as TokioRwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::protocol::Message;

/// 根据一次心跳往返时延（毫秒）评估链路质量。
///
/// 档位边界值归入时延更低的一档：50ms 恰好仍是"极好"，
/// 100ms 恰好仍是"良好"，200ms 恰好仍是"一般"。
pub fn classify_link_quality(rtt_ms: i64) -> ConnectionQuality {
    if rtt_ms <= 50 {
        ConnectionQuality::Excellent
    } else if rtt_ms <= 100 {
        ConnectionQuality::Good
    } else if rtt_ms <= 200 {
        ConnectionQuality::Fair
    } else {
        ConnectionQuality::Poor
    }
}

/// WebSocket 发送端的共享句柄类型。
/// 连接打开时为 `Some(sender)`，关闭或尚未建立时为 `None`。
type SharedSender = Arc<TokioMutex<Option<SplitSink<ClientWsStream, Message>>>>;

/// 机器人链路服务。
///
/// 同一时刻最多维护一条到机器人服务端的 WebSocket 连接。
/// 所有方法都以 `&self`（或 `&Arc<Self>`）接收者工作，内部状态由
/// 异步锁保护，可安全地在多任务间共享。
pub struct RobotLinkService {
    /// 链路配置（目标 URL、重连与心跳参数）。
    config: LinkConfig,
    /// 中央状态存储，内建处理器把遥测/状态写入这里。
    store: Arc<RobotStore>,
    /// 应用消息路由器，保留类型之外的消息交给它分发。
    router: Arc<MessageRouter>,
    /// 当前活动连接的 WebSocket 发送端。
    ws_sender: SharedSender,
    /// 链路的当前生命周期状态。
    link_state: Arc<TokioRwLock<LinkState>>,
    /// 已经消耗的自动重连次数。连接成功后归零；
    /// 显式断开时被钉在上限值，阻止后台任务再次重连。
    reconnect_attempts_used: Arc<TokioRwLock<u32>>,
    /// 最近一次心跳的往返时延（毫秒）。尚未完成任何心跳时为 `None`。
    last_rtt_ms: Arc<TokioRwLock<Option<i64>>>,
    /// 当前链路质量评估结果。
    connection_quality: Arc<TokioRwLock<ConnectionQuality>>,
    /// 连接生命周期任务（连接、接收循环、重连决策）的句柄。
    connection_task_handle: Arc<TokioMutex<Option<JoinHandle<()>>>>,
    /// 心跳任务的句柄。
    heartbeat_task_handle: Arc<TokioMutex<Option<JoinHandle<()>>>>,
}

impl RobotLinkService {
    /// 创建一个新的链路服务实例。
    ///
    /// # Arguments
    /// * `config` - 链路配置参数包。
    /// * `store` - 共享的状态存储，入站遥测与连接状态写入其中。
    /// * `router` - 应用消息路由器。
    pub fn new(config: LinkConfig, store: Arc<RobotStore>, router: Arc<MessageRouter>) -> Self {
        Self {
            config,
            store,
            router,
            ws_sender: Arc::new(TokioMutex::new(None)),
            link_state: Arc::new(TokioRwLock::new(LinkState::Idle)),
            reconnect_attempts_used: Arc::new(TokioRwLock::new(0)),
            last_rtt_ms: Arc::new(TokioRwLock::new(None)),
            connection_quality: Arc::new(TokioRwLock::new(ConnectionQuality::Good)),
            connection_task_handle: Arc::new(TokioMutex::new(None)),
            heartbeat_task_handle: Arc::new(TokioMutex::new(None)),
        }
    }

    /// 返回链路的当前生命周期状态。
    pub async fn link_state(&self) -> LinkState {
        *self.link_state.read().await
    }

    /// 链路当前是否处于打开状态。
    pub async fn is_connected(&self) -> bool {
        *self.link_state.read().await == LinkState::Open
    }

    /// 返回最近一次心跳的往返时延（毫秒）。尚无心跳结果时为 `None`。
    pub async fn last_rtt_ms(&self) -> Option<i64> {
        *self.last_rtt_ms.read().await
    }

    /// 返回当前链路质量评估结果。
    pub async fn connection_quality(&self) -> ConnectionQuality {
        *self.connection_quality.read().await
    }

    /// 返回已消耗的自动重连次数。
    pub async fn reconnect_attempts_used(&self) -> u32 {
        *self.reconnect_attempts_used.read().await
    }

    /// 返回此服务使用的消息路由器，供调用方注册应用消息处理器。
    pub fn router(&self) -> Arc<MessageRouter> {
        Arc::clone(&self.router)
    }

    /// 发起到机器人服务端的连接。
    ///
    /// 若链路已处于打开或正在连接的状态，则本次调用为无操作；
    /// 否则中止可能残留的旧生命周期任务，清零重连计数，
    /// 并启动一个新的连接生命周期任务。本方法立即返回，
    /// 连接结果通过链路状态与状态存储的事件对外可见。
    pub async fn connect(self: &Arc<Self>) {
        {
            let state = *self.link_state.read().await;
            if state == LinkState::Open || state == LinkState::Connecting {
                info!(
                    "[机器人链路服务] connect 被调用但链路已处于 {:?} 状态，本次调用忽略。",
                    state
                );
                return;
            }
        }

        // 中止上一条生命周期任务的残留（若有）。
        if let Some(handle) = self.connection_task_handle.lock().await.take() {
            handle.abort();
        }
        self.abort_heartbeat_task().await;

        *self.reconnect_attempts_used.write().await = 0;
        *self.link_state.write().await = LinkState::Connecting;
        info!(
            "[机器人链路服务] 开始连接到机器人服务端: {}",
            self.config.url
        );

        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            service.run_connection_lifecycle().await;
        });
        *self.connection_task_handle.lock().await = Some(handle);
    }

    /// 显式断开链路。
    ///
    /// 中止生命周期与心跳任务、关闭底层连接，并把重连计数钉在上限值，
    /// 确保不会有后台任务在断开之后继续尝试重连。
    /// 之后需要用户再次调用 [`RobotLinkService::connect`] 才会重新连接。
    pub async fn disconnect(&self) {
        info!("[机器人链路服务] 收到显式断开请求，开始关闭链路。");
        *self.link_state.write().await = LinkState::Closing;

        // 先钉住重连计数，再中止任务：即使生命周期任务此刻正好在
        // 重连判定的间隙，也不会再获得新的尝试额度。
        *self.reconnect_attempts_used.write().await = self.config.reconnect_attempts;

        if let Some(handle) = self.connection_task_handle.lock().await.take() {
            handle.abort();
        }
        self.abort_heartbeat_task().await;

        if let Some(mut sender) = self.ws_sender.lock().await.take() {
            if let Err(e) = sender.send(Message::Close(None)).await {
                debug!("[机器人链路服务] 发送 Close 帧时出错 (连接可能已断): {}", e);
            }
        }

        *self.link_state.write().await = LinkState::Closed;
        self.store.set_connected(false);
        info!("[机器人链路服务] 链路已关闭。");
    }

    /// 向机器人发送一条业务消息。
    ///
    /// 链路未处于打开状态时不排队、不报错，仅记录警告并返回 `false`。
    ///
    /// # Returns
    /// * `bool` - 消息被成功交给底层发送时为 `true`。
    pub async fn send<T: Serialize>(&self, message_type: &str, payload: &T) -> bool {
        if *self.link_state.read().await != LinkState::Open {
            warn!(
                "[机器人链路服务] 链路未打开，丢弃待发送的消息 (类型: '{}')。",
                message_type
            );
            return false;
        }
        let message = match WsMessage::new(message_type, payload) {
            Ok(m) => m,
            Err(e) => {
                error!(
                    "[机器人链路服务] 构造出站消息 (类型: '{}') 失败: {}",
                    message_type, e
                );
                return false;
            }
        };
        match self.send_envelope(&message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "[机器人链路服务] 发送消息 (类型: '{}') 失败: {}",
                    message_type, e
                );
                false
            }
        }
    }

    /// 把一条已构造好的信封发送到当前连接。
    async fn send_envelope(&self, message: &WsMessage) -> Result<(), WsError> {
        let mut sender_guard = self.ws_sender.lock().await;
        let sender = sender_guard.as_mut().ok_or(WsError::NotConnected)?;
        let msg_json = serde_json::to_string(message)
            .map_err(|e| WsError::SerializationError(format!("出站消息序列化失败: {}", e)))?;
        sender.send(Message::Text(msg_json)).await?;
        debug!(
            "[机器人链路服务] 消息已发送 (类型: '{}')。",
            message.message_type
        );
        Ok(())
    }

    /// 连接生命周期任务的主体。
    ///
    /// 每轮循环尝试建立一次连接；连接成功后进入接收循环直到连接断开，
    /// 然后根据配置与已消耗的重连次数决定是否重试。
    /// 本任务可能被 `connect`/`disconnect` 随时中止 (abort)。
    async fn run_connection_lifecycle(self: Arc<Self>) {
        loop {
            match connect_client(self.config.url.clone()).await {
                Ok(mut connection) => {
                    *self.ws_sender.lock().await = Some(connection.ws_sender);
                    *self.link_state.write().await = LinkState::Open;
                    *self.reconnect_attempts_used.write().await = 0;
                    self.store.set_connected(true);
                    info!("[机器人链路服务] 链路已打开: {}", self.config.url);

                    self.spawn_heartbeat_task().await;

                    // 连接建立后立即索取一次完整遥测快照。
                    if !self
                        .send(REQUEST_TELEMETRY_MESSAGE_TYPE, &EmptyPayload {})
                        .await
                    {
                        warn!("[机器人链路服务] 连接打开后索取遥测快照失败。");
                    }

                    loop {
                        match receive_message(&mut connection.ws_receiver).await {
                            Some(Ok(message)) => self.process_received_message(message).await,
                            Some(Err(e)) => {
                                error!("[机器人链路服务] 接收消息时发生错误: {}", e);
                            }
                            None => {
                                info!("[机器人链路服务] 与机器人服务端的连接已断开。");
                                break;
                            }
                        }
                    }

                    // 连接结束后的清理。
                    self.abort_heartbeat_task().await;
                    *self.ws_sender.lock().await = None;
                    self.store.set_connected(false);
                }
                Err(e) => {
                    warn!(
                        "[机器人链路服务] 连接到 {} 失败: {}",
                        self.config.url, e
                    );
                }
            }

            // 重连决策。
            if !self.config.auto_reconnect {
                info!("[机器人链路服务] 自动重连已禁用，链路保持关闭。");
                *self.link_state.write().await = LinkState::Closed;
                break;
            }
            {
                let mut attempts = self.reconnect_attempts_used.write().await;
                if *attempts >= self.config.reconnect_attempts {
                    error!(
                        "[机器人链路服务] 自动重连次数已达上限 ({} 次)，停止重连。需要用户手动重新连接。",
                        self.config.reconnect_attempts
                    );
                    *self.link_state.write().await = LinkState::Closed;
                    break;
                }
                *attempts += 1;
                info!(
                    "[机器人链路服务] 将在 {} 毫秒后进行第 {}/{} 次重连。",
                    self.config.reconnect_interval_ms, *attempts, self.config.reconnect_attempts
                );
            }
            *self.link_state.write().await = LinkState::Reconnecting;
            sleep(Duration::from_millis(self.config.reconnect_interval_ms)).await;
        }
    }

    /// 启动心跳任务：按配置的间隔发送携带当前时间戳的 `ping`。
    ///
    /// 对端未按时回 `pong` 不视为链路故障，仅影响质量指标的新鲜度；
    /// 真正的链路断开由接收循环感知。
    async fn spawn_heartbeat_task(self: &Arc<Self>) {
        self.abort_heartbeat_task().await;
        let service = Arc::clone(self);
        let interval_ms = self.config.heartbeat_interval_ms;
        let handle = tokio::spawn(async move {
            loop {
                sleep(Duration::from_millis(interval_ms)).await;
                let ping = PingPayload {
                    timestamp: Utc::now().timestamp_millis(),
                };
                if !service.send(PING_MESSAGE_TYPE, &ping).await {
                    debug!("[机器人链路服务] 心跳 Ping 发送失败 (链路可能正在关闭)。");
                }
            }
        });
        *self.heartbeat_task_handle.lock().await = Some(handle);
    }

    /// 中止当前的心跳任务（若存在）。
    async fn abort_heartbeat_task(&self) {
        if let Some(handle) = self.heartbeat_task_handle.lock().await.take() {
            handle.abort();
        }
    }

    /// 处理一条成功解码的入站信封。
    ///
    /// 保留类型 (`pong` / 遥测 / 状态) 由内建处理器消费，
    /// 其余消息交给路由器按注册顺序分发。解码失败只记录日志。
    async fn process_received_message(&self, message: WsMessage) {
        match InboundMessage::classify(message) {
            Ok(InboundMessage::Pong(pong)) => {
                let rtt_ms = Utc::now().timestamp_millis() - pong.timestamp;
                let quality = classify_link_quality(rtt_ms);
                *self.last_rtt_ms.write().await = Some(rtt_ms);
                *self.connection_quality.write().await = quality;
                debug!(
                    "[机器人链路服务] 心跳往返时延: {} 毫秒，链路质量: {}",
                    rtt_ms, quality
                );
            }
            Ok(InboundMessage::Telemetry(telemetry)) => {
                self.store.update_telemetry(&telemetry);
            }
            Ok(InboundMessage::Status(status)) => {
                info!(
                    "[机器人链路服务] 收到机器人状态通告: is_connected={}",
                    status.is_connected
                );
                self.store.set_connected(status.is_connected);
            }
            Ok(InboundMessage::Application(envelope)) => {
                self.router.dispatch(&envelope);
            }
            Err(e) => {
                error!("[机器人链路服务] 入站消息解码失败，已丢弃: {}", e);
            }
        }
    }
}
