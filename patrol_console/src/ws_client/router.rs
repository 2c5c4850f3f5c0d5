//! 入站消息路由模块。
//!
//! 本模块负责把解码后的消息信封分发给正确的处理逻辑：
//! - 三种保留类型 (`pong` / `robot:telemetry` / `robot:status`) 被归类为
//!   [`InboundMessage`] 的类型化变体，由链路服务在应用处理器之前消费，
//!   因为它们直接更新状态存储或链路自身的质量指标；
//! - 其余所有类型都作为 `Application` 变体交给 [`MessageRouter`]，
//!   按注册顺序分发给该精确类型的处理器，然后再分发给通配处理器。
//!
//! 单个处理器返回错误不会阻止后续处理器的分发；
//! 解码失败的消息会被记录日志后丢弃，绝不会影响连接状态。

use log::{debug, error, warn};
use patrol_models::ws_payloads::{
    PongPayload, StatusPayload, TelemetryPayload, PONG_MESSAGE_TYPE, STATUS_MESSAGE_TYPE,
    TELEMETRY_MESSAGE_TYPE, WILDCARD_MESSAGE_TYPE,
};
use patrol_websocket_utils::error::WsError;
use patrol_websocket_utils::message::WsMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// 交给应用处理器的消息信封（保留类型之外的所有消息）。
#[derive(Debug, Clone)]
pub struct RouterEnvelope {
    /// 消息类型字符串。
    pub message_type: String,
    /// 内嵌的 JSON 载荷。
    pub payload: serde_json::Value,
    /// 发送方盖的毫秒级时间戳。
    pub timestamp: i64,
}

/// 入站消息的类型化分类结果。
///
/// 对已知信封类型做带标签的联合分发：保留类型解码为具体的 Payload
/// 结构体，未知/前向兼容类型落入 `Application` 兜底分支。
#[derive(Debug)]
pub enum InboundMessage {
    /// 心跳应答，携带被原样回显的 Ping 时间戳。
    Pong(PongPayload),
    /// 遥测数据（部分合并语义）。
    Telemetry(TelemetryPayload),
    /// 机器人连接状态。
    Status(StatusPayload),
    /// 其余所有类型：交给消息路由器分发。
    Application(RouterEnvelope),
}

impl InboundMessage {
    /// 将一条解码后的信封归类为类型化变体。
    ///
    /// 保留类型的载荷在此处解码；解码失败返回
    /// `WsError::DeserializationError`，调用方记录日志后丢弃该消息。
    pub fn classify(msg: WsMessage) -> Result<InboundMessage, WsError> {
        match msg.message_type.as_str() {
            PONG_MESSAGE_TYPE => Ok(InboundMessage::Pong(msg.deserialize_payload()?)),
            TELEMETRY_MESSAGE_TYPE => Ok(InboundMessage::Telemetry(msg.deserialize_payload()?)),
            STATUS_MESSAGE_TYPE => Ok(InboundMessage::Status(msg.deserialize_payload()?)),
            _ => Ok(InboundMessage::Application(RouterEnvelope {
                message_type: msg.message_type,
                payload: msg.payload,
                timestamp: msg.timestamp,
            })),
        }
    }
}

/// 应用消息处理器的类型别名。
///
/// 处理器返回 `Err` 时仅记录日志，不影响其余处理器和连接本身。
pub type HandlerFn = dyn Fn(&RouterEnvelope) -> anyhow::Result<()> + Send + Sync;

/// 注销凭据：`MessageRouter::on` 的返回值，交给 `off` 可取消对应的注册。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    message_type: String,
    id: u64,
}

/// 入站应用消息路由器。
///
/// 维护从消息类型到处理器列表的映射，外加一个保留的通配类型 `*`，
/// 注册到通配类型的处理器会收到每一条应用消息。
/// 同一个处理器可以在不同类型下独立注册多次。
pub struct MessageRouter {
    handlers: Mutex<HashMap<String, Vec<(u64, Arc<HandlerFn>)>>>,
    next_id: AtomicU64,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRouter {
    /// 创建一个空的消息路由器。
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 为指定的消息类型注册一个处理器。
    ///
    /// 类型为 [`WILDCARD_MESSAGE_TYPE`] (`"*"`) 时，处理器会收到所有应用消息。
    ///
    /// # 返回值
    /// 返回一个 [`Subscription`] 注销凭据，交给 [`MessageRouter::off`]
    /// 即可取消本次注册。
    pub fn on<F>(&self, message_type: &str, handler: F) -> Subscription
    where
        F: Fn(&RouterEnvelope) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.lock_handlers();
        handlers
            .entry(message_type.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(
            "[消息路由] 已为类型 '{}' 注册处理器 (id={})",
            message_type, id
        );
        Subscription {
            message_type: message_type.to_string(),
            id,
        }
    }

    /// 取消一次注册。
    ///
    /// # 返回值
    /// 如果找到了对应的注册并已移除，返回 `true`；否则返回 `false`。
    pub fn off(&self, subscription: &Subscription) -> bool {
        let mut handlers = self.lock_handlers();
        if let Some(list) = handlers.get_mut(&subscription.message_type) {
            let before = list.len();
            list.retain(|(id, _)| *id != subscription.id);
            let removed = list.len() < before;
            if list.is_empty() {
                handlers.remove(&subscription.message_type);
            }
            if removed {
                debug!(
                    "[消息路由] 已注销类型 '{}' 的处理器 (id={})",
                    subscription.message_type, subscription.id
                );
            }
            removed
        } else {
            false
        }
    }

    /// 把一条应用消息分发给所有匹配的处理器。
    ///
    /// 分发顺序：先是该精确类型的处理器（按注册顺序），
    /// 然后是所有通配处理器（按注册顺序）。
    /// 单个处理器的错误被隔离：记录日志后继续分发给其余处理器。
    pub fn dispatch(&self, envelope: &RouterEnvelope) {
        // 在锁外调用处理器，允许处理器内再次注册/注销。
        let to_invoke: Vec<Arc<HandlerFn>> = {
            let handlers = self.lock_handlers();
            let mut list: Vec<Arc<HandlerFn>> = Vec::new();
            if let Some(exact) = handlers.get(&envelope.message_type) {
                list.extend(exact.iter().map(|(_, h)| Arc::clone(h)));
            }
            if envelope.message_type != WILDCARD_MESSAGE_TYPE {
                if let Some(wildcard) = handlers.get(WILDCARD_MESSAGE_TYPE) {
                    list.extend(wildcard.iter().map(|(_, h)| Arc::clone(h)));
                }
            }
            list
        };

        if to_invoke.is_empty() {
            warn!(
                "[消息路由] 收到无人处理的消息类型: '{}'，忽略此消息。",
                envelope.message_type
            );
            return;
        }

        for handler in to_invoke {
            if let Err(e) = handler(envelope) {
                error!(
                    "[消息路由] 类型 '{}' 的处理器执行失败: {:#}",
                    envelope.message_type, e
                );
            }
        }
    }

    fn lock_handlers(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Vec<(u64, Arc<HandlerFn>)>>> {
        match self.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn envelope(message_type: &str) -> RouterEnvelope {
        RouterEnvelope {
            message_type: message_type.to_string(),
            payload: serde_json::json!({"value": 1}),
            timestamp: 1_724_380_000_000,
        }
    }

    #[test]
    /// 测试精确类型处理器按注册顺序执行，之后才轮到通配处理器。
    fn test_dispatch_order_exact_then_wildcard() {
        let router = MessageRouter::new();
        let calls: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));

        let c1 = Arc::clone(&calls);
        router.on("patrol:waypoint", move |_| {
            c1.lock().unwrap().push("第一个");
            Ok(())
        });
        let c2 = Arc::clone(&calls);
        router.on("patrol:waypoint", move |_| {
            c2.lock().unwrap().push("第二个");
            Ok(())
        });
        let c3 = Arc::clone(&calls);
        router.on(WILDCARD_MESSAGE_TYPE, move |_| {
            c3.lock().unwrap().push("通配");
            Ok(())
        });

        router.dispatch(&envelope("patrol:waypoint"));
        assert_eq!(*calls.lock().unwrap(), vec!["第一个", "第二个", "通配"]);
    }

    #[test]
    /// 测试通配处理器能收到任意类型的消息。
    fn test_wildcard_receives_all_types() {
        let router = MessageRouter::new();
        let seen: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        router.on(WILDCARD_MESSAGE_TYPE, move |env| {
            s.lock().unwrap().push(env.message_type.clone());
            Ok(())
        });

        router.dispatch(&envelope("camera:quality"));
        router.dispatch(&envelope("patrol:route"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["camera:quality".to_string(), "patrol:route".to_string()]
        );
    }

    #[test]
    /// 测试单个处理器出错不影响后续处理器的分发。
    fn test_handler_error_is_isolated() {
        let router = MessageRouter::new();
        let calls: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));

        let c1 = Arc::clone(&calls);
        router.on("patrol:event", move |_| {
            c1.lock().unwrap().push("出错的");
            anyhow::bail!("处理器内部错误")
        });
        let c2 = Arc::clone(&calls);
        router.on("patrol:event", move |_| {
            c2.lock().unwrap().push("正常的");
            Ok(())
        });

        router.dispatch(&envelope("patrol:event"));
        assert_eq!(*calls.lock().unwrap(), vec!["出错的", "正常的"]);
    }

    #[test]
    /// 测试注销凭据：`off` 之后处理器不再收到消息，重复注销返回 `false`。
    fn test_subscription_off() {
        let router = MessageRouter::new();
        let count = Arc::new(StdMutex::new(0u32));

        let c = Arc::clone(&count);
        let sub = router.on("patrol:event", move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });

        router.dispatch(&envelope("patrol:event"));
        assert!(router.off(&sub), "首次注销应成功");
        router.dispatch(&envelope("patrol:event"));

        assert_eq!(*count.lock().unwrap(), 1, "注销后处理器不应再被调用");
        assert!(!router.off(&sub), "重复注销应返回 false");
    }

    #[test]
    /// 测试保留类型的分类：pong/telemetry/status 解码为类型化变体，
    /// 其余类型落入 Application 兜底分支。
    fn test_inbound_message_classification() {
        let pong = WsMessage::new(PONG_MESSAGE_TYPE, &PongPayload { timestamp: 42 }).unwrap();
        match InboundMessage::classify(pong).unwrap() {
            InboundMessage::Pong(p) => assert_eq!(p.timestamp, 42),
            other => panic!("预期 Pong 变体，实际: {:?}", other),
        }

        let telemetry = WsMessage::new(
            TELEMETRY_MESSAGE_TYPE,
            &TelemetryPayload {
                battery_level: Some(73.0),
                ..Default::default()
            },
        )
        .unwrap();
        match InboundMessage::classify(telemetry).unwrap() {
            InboundMessage::Telemetry(t) => assert_eq!(t.battery_level, Some(73.0)),
            other => panic!("预期 Telemetry 变体，实际: {:?}", other),
        }

        let unknown = WsMessage::new("patrol:custom", &serde_json::json!({"k": "v"})).unwrap();
        match InboundMessage::classify(unknown).unwrap() {
            InboundMessage::Application(env) => {
                assert_eq!(env.message_type, "patrol:custom");
                assert_eq!(env.payload["k"], "v");
            }
            other => panic!("预期 Application 变体，实际: {:?}", other),
        }
    }

    #[test]
    /// 测试保留类型载荷结构不匹配时分类返回解码错误。
    fn test_classification_decode_failure() {
        let bad = WsMessage::new(PONG_MESSAGE_TYPE, &serde_json::json!({"没有时间戳": true})).unwrap();
        match InboundMessage::classify(bad) {
            Err(WsError::DeserializationError(_)) => {}
            other => panic!("预期解码错误，实际: {:?}", other),
        }
    }
}
