//! 操作台链路配置管理模块。
//!
//! 本模块定义连接管理器所需的核心配置参数 (`LinkConfig` 结构体)，
//! 提供从 JSON 配置文件加载、保存这些配置的功能，并处理默认配置的生成。
//! 目标端点 URL 等参数通常来自应用设置，此处的配置结构同时作为
//! 依赖注入给 `RobotLinkService` 的参数包。

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 链路配置结构体，对应于配置文件 (`link_config.json`) 中的内容。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    /// 机器人 WebSocket 服务端的完整 URL 地址。
    /// 例如: `"ws://192.168.1.50:4000"`
    pub url: String,

    /// 连接断开后是否自动重连。
    pub auto_reconnect: bool,

    /// 自动重连的最大尝试次数。达到上限后链路保持关闭，
    /// 直到用户再次显式发起连接。
    pub reconnect_attempts: u32,

    /// 两次重连尝试之间的固定间隔，单位：毫秒。
    pub reconnect_interval_ms: u64,

    /// 心跳 Ping 的发送间隔，单位：毫秒。
    pub heartbeat_interval_ms: u64,
}

/// 为 `LinkConfig` 提供默认值实现。
///
/// 当无法从配置文件加载现有配置（首次启动或文件损坏/丢失）时，
/// `LinkConfig::default()` 将被调用以生成一套可工作的默认参数。
impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:4000".to_string(),
            auto_reconnect: true,
            reconnect_attempts: 5,
            reconnect_interval_ms: 3000,
            heartbeat_interval_ms: 5000,
        }
    }
}

/// 从指定路径加载链路配置。
///
/// 1. 如果配置文件存在，读取并反序列化其内容。
/// 2. 如果不存在，使用默认值创建配置、保存到该路径，并返回默认配置。
///
/// # 返回值
/// * `Result<LinkConfig, String>` - 读取、解析或保存失败时返回中文错误描述。
pub fn load_link_config(path: &Path) -> Result<LinkConfig, String> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("读取配置文件 '{}' 失败: {}", path.display(), e))?;
        let config: LinkConfig = serde_json::from_str(&content)
            .map_err(|e| format!("解析配置文件 '{}' 的内容失败: {}", path.display(), e))?;
        Ok(config)
    } else {
        info!(
            "[配置模块] 配置文件 '{}' 未找到，将使用默认配置参数创建新文件。",
            path.display()
        );
        let default_config = LinkConfig::default();
        save_link_config(path, &default_config)?;
        Ok(default_config)
    }
}

/// 将链路配置序列化为美化的 JSON 并写入指定路径。
///
/// 写入前会确保父目录存在，必要时递归创建。
pub fn save_link_config(path: &Path, config: &LinkConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("创建配置目录 '{}' 失败: {}", parent.display(), e))?;
        }
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("序列化配置信息失败: {}", e))?;
    fs::write(path, content)
        .map_err(|e| format!("将配置写入文件 '{}' 失败: {}", path.display(), e))?;
    Ok(())
}
