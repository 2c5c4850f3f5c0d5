//! 定义 WebSocket 通信中使用的核心消息信封结构。
//!
//! 本模块主要包含 `WsMessage` 结构体的定义及其相关实现。
//! `WsMessage` 作为操作台与机器人之间所有 WebSocket 消息交换的标准格式，
//! 确保了通信的统一性和可扩展性：每条消息都由消息类型、业务负载和
//! 发送时刻的时间戳三部分组成。

use crate::error::WsError;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// `WsMessage` 代表在操作台与机器人之间进行交换的标准消息信封。
///
/// 线上格式为 UTF-8 文本帧中的 JSON 对象：`{"type", "payload", "timestamp"}`。
///
/// # 字段
/// - `message_type`: 点号命名空间的消息类型字符串（例如 `"robot:telemetry"`、
///   `"robot:control"`、`"ping"`），接收方据此决定如何解释 `payload`。
/// - `payload`: 消息的实际业务负载，以 JSON 值的形式内嵌在信封中，
///   其具体数据结构由 `message_type` 决定（见 `patrol_models::ws_payloads`）。
/// - `timestamp`: 消息创建时的 UTC 时间戳（自 Unix 纪元以来的毫秒数）。
///   每条出站消息在发送时都携带新鲜的时间戳；`ping` 的时间戳会被对方
///   在 `pong` 中原样回显，用于测量往返时延。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WsMessage {
    /// 描述消息业务类型的字符串，线上字段名为 `type`。
    #[serde(rename = "type")]
    pub message_type: String,

    /// 消息的实际数据负载，内嵌的 JSON 值。
    pub payload: serde_json::Value,

    /// 消息创建时的毫秒级 UTC 时间戳。
    pub timestamp: i64,
}

impl WsMessage {
    /// 创建一个新的 `WsMessage` 实例。
    ///
    /// 此构造函数会自动盖上当前的 UTC 毫秒时间戳，并把提供的
    /// `payload_data` 序列化为 JSON 值存入 `payload` 字段。
    ///
    /// # Arguments
    /// * `message_type` - 此消息的业务类型。
    /// * `payload_data` - 一个实现了 `serde::Serialize` 的数据结构引用。
    ///
    /// # Returns
    /// * `Result<WsMessage, WsError>` - 序列化失败时返回
    ///   `WsError::SerializationError`。
    pub fn new<T: Serialize>(message_type: impl Into<String>, payload_data: &T) -> Result<WsMessage, WsError> {
        let payload = serde_json::to_value(payload_data)
            .map_err(|e| WsError::SerializationError(format!("创建 WsMessage 时序列化载荷失败: {}", e)))?;
        Ok(WsMessage {
            message_type: message_type.into(),
            payload,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// 将内部存储的 JSON 载荷反序列化为指定的目标类型 `T`。
    ///
    /// # Returns
    /// * `Result<T, WsError>` - 如果 JSON 结构与类型 `T` 不匹配，
    ///   则返回 `WsError::DeserializationError`。
    pub fn deserialize_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, WsError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            WsError::DeserializationError(format!(
                "WsMessage 载荷反序列化为目标类型失败: {}, 原始载荷: '{}'",
                e, self.payload
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patrol_models::ws_payloads::{PingPayload, PING_MESSAGE_TYPE};

    #[test]
    /// 测试 `WsMessage::new` 能正确初始化基本字段，
    /// 且其 `payload` 能被反序列化回原始结构。
    fn test_ws_message_new_creation_and_payload_integrity() {
        let ping = PingPayload {
            timestamp: 1_724_380_000_000,
        };
        let ws_message =
            WsMessage::new(PING_MESSAGE_TYPE, &ping).expect("创建 WsMessage 失败，这不应发生");

        assert_eq!(ws_message.message_type, PING_MESSAGE_TYPE, "消息类型与预期不符");
        assert!(ws_message.timestamp > 0, "时间戳应为正数");

        let parsed: PingPayload = ws_message
            .deserialize_payload()
            .expect("从 payload 反序列化 PingPayload 失败");
        assert_eq!(parsed, ping, "反序列化得到的 PingPayload 与原始实例不相等");
    }

    #[test]
    /// 测试信封的线上格式：`type`/`payload`/`timestamp` 三个字段，
    /// 且 `payload` 是内嵌的 JSON 对象而非字符串。
    fn test_ws_message_wire_format() {
        let ping = PingPayload { timestamp: 42 };
        let ws_message = WsMessage::new(PING_MESSAGE_TYPE, &ping).expect("创建 WsMessage 失败");

        let json = serde_json::to_string(&ws_message).expect("序列化 WsMessage 失败");
        assert!(json.contains("\"type\":\"ping\""), "线上字段名应为 type: {}", json);
        assert!(
            json.contains("\"payload\":{\"timestamp\":42}"),
            "payload 应为内嵌 JSON 对象: {}",
            json
        );

        let parsed: WsMessage = serde_json::from_str(&json).expect("反序列化 WsMessage 失败");
        assert_eq!(parsed, ws_message, "序列化/反序列化往返后不一致");
    }

    #[test]
    /// 测试将 `payload` 反序列化为不匹配的类型时返回
    /// `WsError::DeserializationError`。
    fn test_deserialize_payload_to_mismatched_type_error_handling() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct AnotherDistinctPayload {
            some_value: Vec<String>,
        }

        let ping = PingPayload { timestamp: 7 };
        let ws_message = WsMessage::new(PING_MESSAGE_TYPE, &ping).expect("创建 WsMessage 失败");

        let result: Result<AnotherDistinctPayload, WsError> = ws_message.deserialize_payload();
        match result {
            Err(WsError::DeserializationError(details)) => {
                assert!(!details.is_empty(), "错误详情不应为空");
            }
            other => panic!("预期 WsError::DeserializationError，但收到了: {:?}", other.err()),
        }
    }
}
