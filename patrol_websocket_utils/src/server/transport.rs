//! 包含服务端 WebSocket 监听、接受连接和通信逻辑。
//!
//! `robotsim` 机器人模拟服务器以及各集成测试通过本模块监听端口、
//! 接受操作台的连接，并以 `WsMessage` 信封收发消息。

use crate::error::WsError;
use crate::message::WsMessage;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use log::{debug, error, info};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_async, tungstenite::protocol::Message, tungstenite::Error as TungsteniteError,
    WebSocketStream,
};

/// `WsStream` 是一个类型别名，代表经过 WebSocket 握手后的 TCP 流。
pub type WsStream = WebSocketStream<TcpStream>;

/// `ConnectionHandler` 代表服务端视角下的一个活动客户端连接的发送端。
///
/// 连接回调会收到一个 `ConnectionHandler` 和对应的接收流，
/// 分别用于向该客户端发送消息和从该客户端接收消息。
pub struct ConnectionHandler {
    /// 用于向该客户端异步发送消息的发送端。
    pub ws_sender: SplitSink<WsStream, Message>,
    /// 该客户端的对端地址。
    pub peer_addr: SocketAddr,
}

impl ConnectionHandler {
    /// 异步向该客户端发送一个 `WsMessage`。
    pub async fn send_message(&mut self, message: &WsMessage) -> Result<(), WsError> {
        let msg_json = serde_json::to_string(message)
            .map_err(|e| WsError::SerializationError(format!("消息序列化为JSON失败: {}", e)))?;
        debug!("服务端：准备向 {} 发送消息: {}", self.peer_addr, msg_json);
        self.ws_sender.send(Message::Text(msg_json)).await?;
        Ok(())
    }
}

/// 启动 WebSocket 服务端并开始监听指定的地址。
///
/// 对于每一个成功建立的 WebSocket 连接，都会在一个新的 Tokio 任务中
/// 调用 `on_connect` 回调进行处理。这个服务端会持续运行，直到发生
/// 不可恢复的错误 (例如 TCP 监听器绑定失败) 或任务被中止。
///
/// # Arguments
/// * `addr`: 服务端监听的地址字符串 (例如 "127.0.0.1:4000")。
/// * `on_connect`: 新的 WebSocket 连接建立时被调用的回调函数，
///   接收该连接的 `ConnectionHandler` (发送端) 和 `SplitStream` (接收端)。
///   此回调必须是 `async` 的，并且是 `Send + Sync + Clone + 'static`，
///   因为它会在一个新的 Tokio 任务中为每个连接执行。
///
/// # Returns
/// * `Result<(), WsError>`: 如果监听器启动失败，则返回错误；
///   否则，此函数将无限期运行。
pub async fn start_server<F, Fut>(addr: String, on_connect: F) -> Result<(), WsError>
where
    F: Fn(ConnectionHandler, SplitStream<WsStream>) -> Fut + Send + Sync + Clone + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(&addr).await.map_err(WsError::IoError)?;
    info!("WebSocket 服务端正在监听地址: {}", addr);

    loop {
        match listener.accept().await {
            Ok((tcp_stream, peer_addr)) => {
                info!("从 {} 接受了新的 TCP 连接", peer_addr);
                let on_connect_callback = on_connect.clone();

                tokio::spawn(async move {
                    match accept_async(tcp_stream).await {
                        Ok(ws_stream) => {
                            info!("与 {} 的 WebSocket 握手成功", peer_addr);
                            let (ws_sender, ws_receiver) = ws_stream.split();
                            let handler = ConnectionHandler {
                                ws_sender,
                                peer_addr,
                            };
                            on_connect_callback(handler, ws_receiver).await;
                        }
                        Err(e) => {
                            // 握手失败仅终止此特定连接的任务，服务端继续运行。
                            error!("与 {} 的 WebSocket 握手失败: {}", peer_addr, e);
                        }
                    }
                });
            }
            Err(e) => {
                error!("接受 TCP 连接失败: {}。服务端将继续运行。", e);
            }
        }
    }
}

/// 从给定的服务端接收流中异步接收并尝试解析一个 `WsMessage`。
///
/// 与客户端侧的 `receive_message` 行为一致：跳过控制帧，
/// 文本帧解析为 `WsMessage`，连接关闭时返回 `None`。
pub async fn receive_message(
    ws_receiver: &mut SplitStream<WsStream>,
) -> Option<Result<WsMessage, WsError>> {
    loop {
        match ws_receiver.next().await {
            Some(msg_result) => match msg_result {
                Ok(msg) => match msg {
                    Message::Text(text) => {
                        debug!("服务端：收到原始文本消息，内容: '{}'", text);
                        break Some(serde_json::from_str::<WsMessage>(&text).map_err(|e| {
                            WsError::DeserializationError(format!(
                                "收到的文本消息反序列化为 WsMessage 失败: {}, 原始文本: '{}'",
                                e, text
                            ))
                        }));
                    }
                    Message::Binary(bin) => {
                        debug!("服务端：收到原始二进制消息，长度: {} 字节", bin.len());
                        break Some(Err(WsError::Message(
                            "服务端收到了非预期的 WebSocket 二进制消息".to_string(),
                        )));
                    }
                    Message::Ping(_) | Message::Pong(_) => {
                        // 控制帧由底层库处理，继续等待业务消息。
                    }
                    Message::Close(close_frame) => {
                        debug!("服务端：收到 Close 控制帧，详细信息: {:?}", close_frame);
                        break None;
                    }
                    Message::Frame(_) => {
                        debug!("服务端：收到一个非预期的底层原始 Frame 类型消息，正在跳过。");
                    }
                },
                Err(e) => match e {
                    TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed => {
                        debug!("服务端：连接已关闭。");
                        break None;
                    }
                    _ => {
                        error!("服务端：从 WebSocket 流接收消息时发生底层错误: {}", e);
                        break Some(Err(WsError::WebSocketProtocolError(e)));
                    }
                },
            },
            None => {
                debug!("服务端：WebSocket 接收流已结束。");
                break None;
            }
        }
    }
}
