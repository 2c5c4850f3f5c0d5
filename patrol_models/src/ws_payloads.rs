//! 包含 WebSocket 通信中使用的各种 Payload 结构体定义。
//!
//! 操作台与机器人之间交换的每条消息都是一个信封
//! `{type, payload, timestamp}`（见 `patrol_websocket_utils::message`），
//! 本模块定义 `payload` 部分对应各个消息类型的具体结构体，
//! 以及消息类型字符串常量本身。

use crate::robot_state::{MotorHealth, MotorPowers, Position, ProximitySensors};
use serde::{Deserialize, Serialize};

// --- 消息类型常量 ---

/// 心跳探测消息，Payload 为 [`PingPayload`]。
pub const PING_MESSAGE_TYPE: &str = "ping";
/// 心跳应答消息，Payload 为 [`PongPayload`]，其中的时间戳原样回显。
pub const PONG_MESSAGE_TYPE: &str = "pong";
/// 机器人遥测消息，Payload 为 [`TelemetryPayload`]。
pub const TELEMETRY_MESSAGE_TYPE: &str = "robot:telemetry";
/// 机器人连接状态消息，Payload 为 [`StatusPayload`]。
pub const STATUS_MESSAGE_TYPE: &str = "robot:status";
/// 机器人控制指令消息，Payload 为 [`ControlCommandPayload`]。
pub const CONTROL_MESSAGE_TYPE: &str = "robot:control";
/// 请求一次完整遥测快照，Payload 为 [`EmptyPayload`]，连接建立后立即发送一次。
pub const REQUEST_TELEMETRY_MESSAGE_TYPE: &str = "robot:requestTelemetry";
/// 设置摄像头画质，Payload 为 [`CameraQualityPayload`]。
pub const CAMERA_QUALITY_MESSAGE_TYPE: &str = "camera:quality";
/// 设置摄像头成像模式，Payload 为 [`CameraModePayload`]。
pub const CAMERA_MODE_MESSAGE_TYPE: &str = "camera:mode";
/// 开始录制，Payload 为 [`EmptyPayload`]。
pub const CAMERA_START_RECORDING_MESSAGE_TYPE: &str = "camera:startRecording";
/// 停止录制，Payload 为 [`EmptyPayload`]。
pub const CAMERA_STOP_RECORDING_MESSAGE_TYPE: &str = "camera:stopRecording";
/// 抓拍一帧图像，Payload 为 [`EmptyPayload`]。
pub const CAMERA_CAPTURE_MESSAGE_TYPE: &str = "camera:capture";
/// 通配类型：注册到该类型的处理器会收到所有入站消息。
pub const WILDCARD_MESSAGE_TYPE: &str = "*";

// --- Payload 结构体 ---

/// 空 Payload，用于无参数消息（遥测请求、录制开关、抓拍等）。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct EmptyPayload {}

/// Ping 心跳 Payload：携带发送时刻的毫秒级 UTC 时间戳。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPayload {
    pub timestamp: i64,
}

/// Pong 心跳应答 Payload：原样回显对应 Ping 的时间戳，供发送方计算 RTT。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PongPayload {
    pub timestamp: i64,
}

/// 机器人连接状态 Payload。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub is_connected: bool,
}

/// 机器人遥测 Payload。
///
/// 所有字段均为可选：机器人既可以推送完整快照，也可以只推送发生变化的
/// 字段。接收方按"部分合并"语义处理——缺失的字段保持原值不变。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_usage: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motors: Option<MotorPowers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_status: Option<MotorHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensors: Option<ProximitySensors>,
}

/// 机器人控制指令 Payload：`{command, data}`。
///
/// `command` 为指令名（如 `"move"`、`"emergencyStop"`），
/// `data` 为该指令的参数对象，结构由指令名决定。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControlCommandPayload {
    pub command: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// 摄像头画质设置 Payload。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraQualityPayload {
    pub quality: crate::enums::CameraQuality,
}

/// 摄像头成像模式设置 Payload。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraModePayload {
    pub mode: crate::enums::CameraMode,
}
