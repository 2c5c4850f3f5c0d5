//! 单个操作台连接的会话处理模块。
//!
//! 每条连接都在独立的 Tokio 任务中运行 [`handle_session`]：
//! 按固定间隔推送遥测、应答心跳 Ping、响应遥测请求，
//! 并把控制与摄像头指令转交给共享的 [`SimRobot`]。

use crate::sim::SimRobot;
use futures_util::stream::SplitStream;
use log::{error, info, warn};
use patrol_models::ws_payloads::{
    CameraModePayload, CameraQualityPayload, ControlCommandPayload, PingPayload, PongPayload,
    CAMERA_CAPTURE_MESSAGE_TYPE, CAMERA_MODE_MESSAGE_TYPE, CAMERA_QUALITY_MESSAGE_TYPE,
    CAMERA_START_RECORDING_MESSAGE_TYPE, CAMERA_STOP_RECORDING_MESSAGE_TYPE, CONTROL_MESSAGE_TYPE,
    PING_MESSAGE_TYPE, PONG_MESSAGE_TYPE, REQUEST_TELEMETRY_MESSAGE_TYPE, TELEMETRY_MESSAGE_TYPE,
};
use patrol_websocket_utils::message::WsMessage;
use patrol_websocket_utils::server::transport::{receive_message, ConnectionHandler, WsStream};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::{interval, Duration};

/// 所有会话共享的机器人状态句柄。
pub type SharedRobot = Arc<Mutex<SimRobot>>;

fn lock_robot(robot: &SharedRobot) -> MutexGuard<'_, SimRobot> {
    match robot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 处理一条操作台连接的完整生命周期，连接断开时返回。
pub async fn handle_session(
    robot: SharedRobot,
    mut handler: ConnectionHandler,
    mut receiver: SplitStream<WsStream>,
    telemetry_interval_ms: u64,
) {
    info!("[会话] 操作台已连接: {}", handler.peer_addr);
    let mut telemetry_ticker = interval(Duration::from_millis(telemetry_interval_ms));
    // 第一个 tick 立即完成，跳过它，让遥测从一个完整间隔之后开始
    telemetry_ticker.tick().await;

    loop {
        tokio::select! {
            _ = telemetry_ticker.tick() => {
                let snapshot = {
                    let mut robot = lock_robot(&robot);
                    robot.tick();
                    robot.full_snapshot()
                };
                match WsMessage::new(TELEMETRY_MESSAGE_TYPE, &snapshot) {
                    Ok(message) => {
                        if let Err(e) = handler.send_message(&message).await {
                            warn!("[会话] 向 {} 推送遥测失败，结束会话: {}", handler.peer_addr, e);
                            break;
                        }
                    }
                    Err(e) => error!("[会话] 构造遥测消息失败: {}", e),
                }
            }
            incoming = receive_message(&mut receiver) => {
                match incoming {
                    Some(Ok(message)) => {
                        if !process_message(&robot, &mut handler, message).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("[会话] 接收来自 {} 的消息失败: {}", handler.peer_addr, e);
                    }
                    None => {
                        info!("[会话] 操作台 {} 已断开连接。", handler.peer_addr);
                        break;
                    }
                }
            }
        }
    }
}

/// 处理一条入站消息。返回 `false` 表示会话应当结束。
async fn process_message(
    robot: &SharedRobot,
    handler: &mut ConnectionHandler,
    message: WsMessage,
) -> bool {
    match message.message_type.as_str() {
        PING_MESSAGE_TYPE => match message.deserialize_payload::<PingPayload>() {
            Ok(ping) => {
                // Ping 的时间戳必须原样回显，操作台据此计算往返时延
                let pong = PongPayload {
                    timestamp: ping.timestamp,
                };
                match WsMessage::new(PONG_MESSAGE_TYPE, &pong) {
                    Ok(reply) => {
                        if let Err(e) = handler.send_message(&reply).await {
                            warn!("[会话] 发送 Pong 失败，结束会话: {}", e);
                            return false;
                        }
                    }
                    Err(e) => error!("[会话] 构造 Pong 消息失败: {}", e),
                }
            }
            Err(e) => warn!("[会话] 解析 Ping 载荷失败: {}", e),
        },
        REQUEST_TELEMETRY_MESSAGE_TYPE => {
            let snapshot = lock_robot(robot).full_snapshot();
            match WsMessage::new(TELEMETRY_MESSAGE_TYPE, &snapshot) {
                Ok(reply) => {
                    if let Err(e) = handler.send_message(&reply).await {
                        warn!("[会话] 应答遥测请求失败，结束会话: {}", e);
                        return false;
                    }
                }
                Err(e) => error!("[会话] 构造遥测快照消息失败: {}", e),
            }
        }
        CONTROL_MESSAGE_TYPE => match message.deserialize_payload::<ControlCommandPayload>() {
            Ok(payload) => lock_robot(robot).apply_control(&payload),
            Err(e) => warn!("[会话] 解析控制指令载荷失败: {}", e),
        },
        CAMERA_QUALITY_MESSAGE_TYPE => {
            match message.deserialize_payload::<CameraQualityPayload>() {
                Ok(payload) => lock_robot(robot).set_camera_quality(payload.quality),
                Err(e) => warn!("[会话] 解析画质设置载荷失败: {}", e),
            }
        }
        CAMERA_MODE_MESSAGE_TYPE => match message.deserialize_payload::<CameraModePayload>() {
            Ok(payload) => lock_robot(robot).set_camera_mode(payload.mode),
            Err(e) => warn!("[会话] 解析成像模式载荷失败: {}", e),
        },
        CAMERA_START_RECORDING_MESSAGE_TYPE => lock_robot(robot).set_recording(true),
        CAMERA_STOP_RECORDING_MESSAGE_TYPE => lock_robot(robot).set_recording(false),
        CAMERA_CAPTURE_MESSAGE_TYPE => {
            info!("[会话] 收到抓拍请求 (模拟器不生成图像数据)。");
        }
        other => {
            warn!("[会话] 收到未知类型的消息: '{}'，忽略。", other);
        }
    }
    true
}
