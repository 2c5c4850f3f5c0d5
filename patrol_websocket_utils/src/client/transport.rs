//! 客户端 WebSocket 传输层核心逻辑。
//!
//! 本模块提供了 `patrol_websocket_utils` 库中用于客户端 WebSocket 通信的
//! 主要功能：建立与服务端的连接、发送和接收结构化的 `WsMessage`，
//! 以及对底层连接事件的抽象。其设计旨在简化操作台应用程序与机器人
//! WebSocket 服务端的异步交互。

use crate::error::WsError;
use crate::message::WsMessage;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use log::{debug, error, info};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    tungstenite::Error as TungsteniteError,
    WebSocketStream,
};
use url::Url;

/// `ClientWsStream` 类型别名，代表一个可能经过 TLS 加密的 TCP WebSocket 流。
/// 这是 `tokio-tungstenite` 库在客户端连接成功后返回的典型流类型。
pub type ClientWsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// `ClientConnection` 结构体代表一个活动的客户端 WebSocket 连接。
///
/// 它封装了与服务端进行通信所需的发送端 (`SplitSink`) 和接收端 (`SplitStream`)。
/// 实例在成功连接到服务端后创建。
pub struct ClientConnection {
    /// 用于向 WebSocket 服务端异步发送消息的发送端。
    pub ws_sender: SplitSink<ClientWsStream, Message>,
    /// 用于从 WebSocket 服务端异步接收消息的接收端。
    /// (字段设为 `pub` 以便调用方在连接生命周期任务中独立轮询。)
    pub ws_receiver: SplitStream<ClientWsStream>,
}

impl ClientConnection {
    /// 异步向 WebSocket 服务端发送一个 `WsMessage`。
    ///
    /// 该方法首先将 `WsMessage` 序列化为 JSON 字符串，然后以文本帧发送。
    ///
    /// # Returns
    /// * `Result<(), WsError>` - 序列化失败或发送过程中发生网络错误时
    ///   返回相应的 `WsError`。
    pub async fn send_message(&mut self, message: &WsMessage) -> Result<(), WsError> {
        let msg_json = serde_json::to_string(message)
            .map_err(|e| WsError::SerializationError(format!("消息序列化为JSON失败: {}", e)))?;
        debug!("客户端：准备发送消息: {}", msg_json);
        self.ws_sender.send(Message::Text(msg_json)).await?;
        debug!("客户端：消息已成功发送 (类型: {})", message.message_type);
        Ok(())
    }
}

/// 异步连接到指定的 WebSocket 服务端。
///
/// 此函数尝试解析给定的 URL 字符串，然后使用 `tokio-tungstenite` 的
/// `connect_async` 建立 WebSocket 连接。如果连接和握手成功，
/// 返回的 `WebSocketStream` 会被分割成发送端和接收端，封装在
/// `ClientConnection` 中返回。
///
/// # Arguments
/// * `url_str` - WebSocket 服务端的完整 URL 字符串 (例如 "ws://127.0.0.1:4000")。
///
/// # Returns
/// * `Result<ClientConnection, WsError>` - URL 解析失败、连接失败或
///   握手过程中发生错误时返回相应的 `WsError`。
pub async fn connect_client(url_str: String) -> Result<ClientConnection, WsError> {
    info!("客户端：开始尝试连接到 WebSocket 服务端，URL: {}", url_str);
    let parsed_url = Url::parse(&url_str)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;

    match connect_async(parsed_url.as_str()).await {
        Ok((ws_stream, response)) => {
            info!(
                "客户端：已成功连接到 {} (HTTP 状态码: {})",
                url_str,
                response.status()
            );
            let (ws_sender, ws_receiver) = ws_stream.split();
            Ok(ClientConnection {
                ws_sender,
                ws_receiver,
            })
        }
        Err(e) => {
            error!("客户端：连接到 {} 失败，错误: {}", url_str, e);
            Err(WsError::WebSocketProtocolError(e))
        }
    }
}

/// 从给定的 WebSocket 接收流中异步接收并尝试解析一个 `WsMessage`。
///
/// 此函数处理单个传入的 WebSocket 消息事件。它会跳过非业务相关的
/// 控制帧（Ping/Pong 由底层库自动应答）。收到文本帧时尝试将其
/// 反序列化为 `WsMessage`；收到二进制帧视为错误；连接关闭时返回 `None`。
///
/// **注意：** 在一个持续的客户端会话中，调用方需要在循环中重复调用
/// 此函数来处理所有传入的消息。
///
/// # Returns
/// * `Option<Result<WsMessage, WsError>>`:
///     - `Some(Ok(ws_message))`：成功接收并解析了一个 `WsMessage`。
///     - `Some(Err(ws_error))`：接收或解析过程中发生错误。
///     - `None`：WebSocket 连接已关闭。
pub async fn receive_message(
    ws_receiver: &mut SplitStream<ClientWsStream>,
) -> Option<Result<WsMessage, WsError>> {
    loop {
        match ws_receiver.next().await {
            Some(msg_result) => match msg_result {
                Ok(msg) => match msg {
                    Message::Text(text) => {
                        debug!("客户端：收到原始文本消息，内容: '{}'", text);
                        break Some(serde_json::from_str::<WsMessage>(&text).map_err(|e| {
                            WsError::DeserializationError(format!(
                                "收到的文本消息反序列化为 WsMessage 失败: {}, 原始文本: '{}'",
                                e, text
                            ))
                        }));
                    }
                    Message::Binary(bin) => {
                        debug!("客户端：收到原始二进制消息，长度: {} 字节", bin.len());
                        break Some(Err(WsError::Message(
                            "客户端收到了非预期的 WebSocket 二进制消息".to_string(),
                        )));
                    }
                    Message::Ping(ping_data) => {
                        debug!("客户端：收到 Ping 控制帧，数据: {:?} (由底层库自动应答)", ping_data);
                    }
                    Message::Pong(pong_data) => {
                        debug!("客户端：收到 Pong 控制帧，数据: {:?}", pong_data);
                    }
                    Message::Close(close_frame) => {
                        debug!("客户端：收到 Close 控制帧，详细信息: {:?}", close_frame);
                        break None;
                    }
                    Message::Frame(_) => {
                        debug!("客户端：收到一个非预期的底层原始 Frame 类型消息，正在跳过。");
                    }
                },
                Err(e) => match e {
                    TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed => {
                        debug!("客户端：连接已关闭 (接收期间检测到 ConnectionClosed/AlreadyClosed)。");
                        break None;
                    }
                    _ => {
                        error!("客户端：从 WebSocket 流接收消息时发生底层错误: {}", e);
                        break Some(Err(WsError::WebSocketProtocolError(e)));
                    }
                },
            },
            None => {
                debug!("客户端：WebSocket 接收流已结束。");
                break None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::transport::{
        receive_message as server_receive_message, start_server, ConnectionHandler,
    };
    use patrol_models::ws_payloads::{PingPayload, PING_MESSAGE_TYPE};
    use tokio::time::{timeout, Duration};

    // 辅助函数：启动一个简单的本地回显服务端，专门用于客户端连接和消息收发测试。
    // 这个服务端会接收客户端发来的任何 WsMessage，并将其原样发送回去。
    fn spawn_echo_server(addr: String) -> tokio::task::JoinHandle<Result<(), WsError>> {
        tokio::spawn(async move {
            start_server(addr, move |mut handler: ConnectionHandler, mut receiver| async move {
                info!("[测试回显服务端] 新客户端已连接: {}", handler.peer_addr);
                loop {
                    match server_receive_message(&mut receiver).await {
                        Some(Ok(ws_msg)) => {
                            if let Err(e) = handler.send_message(&ws_msg).await {
                                error!("[测试回显服务端] 回显消息时发生错误: {}", e);
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            error!("[测试回显服务端] 接收客户端消息时发生错误: {}", e);
                            break;
                        }
                        None => {
                            info!("[测试回显服务端] 客户端已断开连接。");
                            break;
                        }
                    }
                }
            })
            .await
        })
    }

    #[tokio::test]
    /// 集成测试：客户端连接本地回显服务端、发送消息并接收回显的完整流程。
    async fn test_client_connect_send_receive_echo() {
        let _ = env_logger::builder().is_test(true).try_init();

        let server_bind_addr = "127.0.0.1:18741".to_string();
        let client_connect_url = format!("ws://{}", server_bind_addr);

        let server_handle = spawn_echo_server(server_bind_addr);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut client_conn = connect_client(client_connect_url.clone())
            .await
            .expect("客户端连接到测试服务端失败");

        let ping = PingPayload {
            timestamp: 1_724_380_000_000,
        };
        let message_to_send =
            WsMessage::new(PING_MESSAGE_TYPE, &ping).expect("创建 WsMessage 失败，这不应发生");
        client_conn
            .send_message(&message_to_send)
            .await
            .expect("发送消息失败");

        match timeout(
            Duration::from_secs(5),
            receive_message(&mut client_conn.ws_receiver),
        )
        .await
        {
            Ok(Some(Ok(response_msg))) => {
                assert_eq!(
                    response_msg.message_type, PING_MESSAGE_TYPE,
                    "回显消息的类型与预期不符"
                );
                let received: PingPayload = response_msg
                    .deserialize_payload()
                    .expect("反序列化回显 PingPayload 失败");
                assert_eq!(received, ping, "回显的载荷内容与原始发送的不符");
            }
            Ok(Some(Err(e))) => panic!("从回显服务端接收消息时发生错误: {}", e),
            Ok(None) => panic!("在期望收到回显消息之前，连接意外被服务端关闭"),
            Err(e_timeout) => panic!("等待服务端回显响应超时: {}", e_timeout),
        }

        server_handle.abort();
    }

    #[tokio::test]
    /// 测试连接到无效 URL 时返回 `WsError::InvalidUrl`。
    async fn test_connect_client_invalid_url() {
        let result = connect_client("不是一个URL".to_string()).await;
        match result {
            Err(WsError::InvalidUrl(_)) => {}
            other => panic!("预期 WsError::InvalidUrl，但收到了: {:?}", other.err()),
        }
    }
}
