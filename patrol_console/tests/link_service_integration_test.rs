//! 链路服务的集成测试。
//!
//! 每个测试用例在本地启动一个真实的 WebSocket 服务端
//! (使用 `patrol_websocket_utils` 的服务端传输层模拟机器人)，
//! 验证连接建立、遥测入库、心跳质量评估、受限重连与显式断开的
//! 端到端行为。各用例使用不同的端口，可以并行运行。

use log::{error, info};
use patrol_console::config::LinkConfig;
use patrol_console::store::robot_store::RobotStore;
use patrol_console::ws_client::router::MessageRouter;
use patrol_console::ws_client::service::RobotLinkService;
use patrol_models::enums::LinkState;
use patrol_models::ws_payloads::{
    PingPayload, PongPayload, TelemetryPayload, PING_MESSAGE_TYPE, PONG_MESSAGE_TYPE,
    REQUEST_TELEMETRY_MESSAGE_TYPE, TELEMETRY_MESSAGE_TYPE,
};
use patrol_websocket_utils::error::WsError;
use patrol_websocket_utils::message::WsMessage;
use patrol_websocket_utils::server::transport::{receive_message, start_server, ConnectionHandler};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build_service(config: LinkConfig) -> (Arc<RobotLinkService>, Arc<RobotStore>) {
    let store = Arc::new(RobotStore::new());
    let router = Arc::new(MessageRouter::new());
    let service = Arc::new(RobotLinkService::new(config, Arc::clone(&store), router));
    (service, store)
}

/// 轮询等待某个条件成立，超时返回 `false`。
async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(50)).await;
    }
}

/// 启动一个模拟机器人服务端：应答遥测请求并回显心跳时间戳。
fn spawn_robot_server(addr: String) -> tokio::task::JoinHandle<Result<(), WsError>> {
    tokio::spawn(async move {
        start_server(addr, move |mut handler: ConnectionHandler, mut receiver| async move {
            info!("[模拟机器人] 操作台已连接: {}", handler.peer_addr);
            loop {
                match receive_message(&mut receiver).await {
                    Some(Ok(msg)) => {
                        let reply = match msg.message_type.as_str() {
                            REQUEST_TELEMETRY_MESSAGE_TYPE => WsMessage::new(
                                TELEMETRY_MESSAGE_TYPE,
                                &TelemetryPayload {
                                    battery_level: Some(73.0),
                                    temperature: Some(51.0),
                                    ..Default::default()
                                },
                            ),
                            PING_MESSAGE_TYPE => match msg.deserialize_payload::<PingPayload>() {
                                Ok(ping) => WsMessage::new(
                                    PONG_MESSAGE_TYPE,
                                    &PongPayload {
                                        timestamp: ping.timestamp,
                                    },
                                ),
                                Err(e) => {
                                    error!("[模拟机器人] 解析 Ping 失败: {}", e);
                                    continue;
                                }
                            },
                            _ => continue,
                        };
                        match reply {
                            Ok(reply) => {
                                if let Err(e) = handler.send_message(&reply).await {
                                    error!("[模拟机器人] 发送应答失败: {}", e);
                                    break;
                                }
                            }
                            Err(e) => error!("[模拟机器人] 构造应答失败: {}", e),
                        }
                    }
                    Some(Err(e)) => {
                        error!("[模拟机器人] 接收消息失败: {}", e);
                        break;
                    }
                    None => {
                        info!("[模拟机器人] 操作台已断开。");
                        break;
                    }
                }
            }
        })
        .await
    })
}

#[tokio::test]
/// 连接建立后：遥测请求得到应答并入库，心跳往返时延被评估，
/// 显式断开产生"连接丢失"告警并使链路进入关闭状态。
async fn test_connect_telemetry_heartbeat_and_disconnect() {
    init_test_logging();
    let server_addr = "127.0.0.1:18751".to_string();
    let server_handle = spawn_robot_server(server_addr.clone());
    sleep(Duration::from_millis(200)).await;

    let (service, store) = build_service(LinkConfig {
        url: format!("ws://{}", server_addr),
        heartbeat_interval_ms: 200,
        ..Default::default()
    });
    service.connect().await;

    assert!(
        wait_until(Duration::from_secs(5), || {
            let service = Arc::clone(&service);
            async move { service.is_connected().await }
        })
        .await,
        "链路应在超时之前进入打开状态"
    );

    // 连接打开后立即索取的遥测快照应已合并进状态存储
    assert!(
        wait_until(Duration::from_secs(5), || {
            let store = Arc::clone(&store);
            async move { store.status().battery_level == 73.0 }
        })
        .await,
        "遥测数据应在超时之前入库"
    );
    let status = store.status();
    assert!(status.is_connected);
    assert_eq!(status.temperature, 51.0);
    assert!(status.last_update.is_some());

    // 心跳应产生往返时延与质量评估（本地回环应为极好）
    assert!(
        wait_until(Duration::from_secs(5), || {
            let service = Arc::clone(&service);
            async move { service.last_rtt_ms().await.is_some() }
        })
        .await,
        "心跳应在超时之前完成至少一次往返"
    );

    service.disconnect().await;
    assert_eq!(service.link_state().await, LinkState::Closed);
    assert!(!store.status().is_connected);
    let alerts = store.alerts();
    assert!(
        alerts.iter().any(|a| a.title == "连接丢失"),
        "断开应产生连接丢失告警"
    );

    server_handle.abort();
}

#[tokio::test]
/// 目标端口无人监听时：自动重连消耗完全部额度后链路进入关闭状态。
async fn test_reconnect_bound_is_exhausted_against_dead_endpoint() {
    init_test_logging();
    let (service, store) = build_service(LinkConfig {
        url: "ws://127.0.0.1:18752".to_string(),
        reconnect_attempts: 3,
        reconnect_interval_ms: 100,
        ..Default::default()
    });
    service.connect().await;

    assert!(
        wait_until(Duration::from_secs(10), || {
            let service = Arc::clone(&service);
            async move { service.link_state().await == LinkState::Closed }
        })
        .await,
        "重连额度耗尽后链路应进入关闭状态"
    );
    assert_eq!(service.reconnect_attempts_used().await, 3);
    assert!(!store.status().is_connected);
}

#[tokio::test]
/// 显式断开会把重连计数钉在上限，阻止后台继续重连。
async fn test_disconnect_pins_reconnect_budget() {
    init_test_logging();
    let (service, _store) = build_service(LinkConfig {
        url: "ws://127.0.0.1:18753".to_string(),
        reconnect_attempts: 5,
        reconnect_interval_ms: 200,
        ..Default::default()
    });
    service.connect().await;
    sleep(Duration::from_millis(150)).await;

    service.disconnect().await;
    assert_eq!(service.link_state().await, LinkState::Closed);
    assert_eq!(
        service.reconnect_attempts_used().await,
        5,
        "断开应把重连计数钉在上限"
    );

    // 之后不应再有任何后台任务改变链路状态
    sleep(Duration::from_millis(600)).await;
    assert_eq!(service.link_state().await, LinkState::Closed);
}

#[tokio::test]
/// 服务端掉线后自动重连：第一条连接被服务端立即关闭，
/// 重连成功后链路恢复打开且重连计数归零。
async fn test_auto_reconnect_after_server_drop() {
    init_test_logging();
    let server_addr = "127.0.0.1:18754".to_string();
    let connection_count = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&connection_count);
    let server_handle = tokio::spawn({
        let server_addr = server_addr.clone();
        async move {
            start_server(server_addr, move |handler: ConnectionHandler, mut receiver| {
                let counter = Arc::clone(&counter);
                async move {
                    let index = counter.fetch_add(1, Ordering::SeqCst);
                    if index == 0 {
                        // 第一条连接：立即丢弃，模拟服务端掉线
                        info!("[模拟机器人] 立即关闭第一条连接: {}", handler.peer_addr);
                        return;
                    }
                    info!("[模拟机器人] 为重连后的操作台服务: {}", handler.peer_addr);
                    let mut handler = handler;
                    while let Some(Ok(msg)) = receive_message(&mut receiver).await {
                        if msg.message_type == PING_MESSAGE_TYPE {
                            if let Ok(ping) = msg.deserialize_payload::<PingPayload>() {
                                if let Ok(pong) = WsMessage::new(
                                    PONG_MESSAGE_TYPE,
                                    &PongPayload {
                                        timestamp: ping.timestamp,
                                    },
                                ) {
                                    let _ = handler.send_message(&pong).await;
                                }
                            }
                        }
                    }
                }
            })
            .await
        }
    });
    sleep(Duration::from_millis(200)).await;

    let (service, _store) = build_service(LinkConfig {
        url: format!("ws://{}", server_addr),
        reconnect_attempts: 5,
        reconnect_interval_ms: 100,
        heartbeat_interval_ms: 200,
        ..Default::default()
    });
    service.connect().await;

    assert!(
        wait_until(Duration::from_secs(10), || {
            let service = Arc::clone(&service);
            async move {
                service.is_connected().await && service.reconnect_attempts_used().await == 0
            }
        })
        .await,
        "链路应在重连成功后恢复打开且重连计数归零"
    );
    assert!(
        connection_count.load(Ordering::SeqCst) >= 2,
        "服务端应至少接受过两条连接"
    );

    service.disconnect().await;
    server_handle.abort();
}
