//! 模拟服务器的配置模块。
//!
//! 配置以 JSON 文件形式存放，优先使用当前目录下的 `robotsim_settings.json`，
//! 当前目录不可写时退回用户主目录下的 `.config/robotsim/`。
//! 文件缺失或损坏时使用默认配置并尝试写回新文件。

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

/// 配置文件名。
const CONFIG_FILE_NAME: &str = "robotsim_settings.json";

/// 模拟服务器的配置结构体。
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SimConfig {
    /// WebSocket 服务绑定的主机地址。
    pub host: String,
    /// WebSocket 服务监听的端口号。
    pub port: u16,
    /// 遥测推送的间隔时间（单位：毫秒）。
    pub telemetry_interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            telemetry_interval_ms: 1000,
        }
    }
}

impl SimConfig {
    /// 返回监听地址字符串，例如 `"0.0.0.0:4000"`。
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// 全局静态配置实例
static SIM_CONFIG: OnceLock<SimConfig> = OnceLock::new();

/// 加载或创建配置文件。
fn load_or_create_config() -> SimConfig {
    let config_file_path = get_config_file_path();

    match fs::read_to_string(&config_file_path) {
        Ok(content) => match serde_json::from_str::<SimConfig>(&content) {
            Ok(config) => {
                info!(
                    "[配置模块] 已成功从配置文件 {:?} 加载模拟服务器配置。",
                    config_file_path
                );
                config
            }
            Err(e) => {
                warn!(
                    "[配置模块] 警告：从 {:?} 反序列化配置失败: {}. 文件可能已损坏。将使用默认配置并尝试覆盖。",
                    config_file_path, e
                );
                let default_config = SimConfig::default();
                save_config(&default_config, &config_file_path);
                default_config
            }
        },
        Err(e) => {
            info!(
                "[配置模块] 未在 {:?} 找到配置文件或读取时发生错误 (错误: {}). 将使用默认配置并尝试创建新文件。",
                config_file_path, e
            );
            let default_config = SimConfig::default();
            save_config(&default_config, &config_file_path);
            default_config
        }
    }
}

/// 获取配置文件路径：优先当前目录，不可用时退回用户主目录。
fn get_config_file_path() -> PathBuf {
    let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_file_path = current_dir.join(CONFIG_FILE_NAME);

    let current_dir_writable = fs::metadata(&current_dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false);
    if config_file_path.exists() || current_dir_writable {
        return config_file_path;
    }

    if let Ok(home) = env::var("HOME") {
        let home_config = PathBuf::from(home).join(".config").join("robotsim");
        if !home_config.exists() {
            let _ = fs::create_dir_all(&home_config);
        }
        return home_config.join(CONFIG_FILE_NAME);
    }

    config_file_path
}

/// 保存配置到文件。
fn save_config(config: &SimConfig, path: &PathBuf) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("[配置模块] 错误：创建配置目录 {:?} 失败: {}", parent, e);
                return;
            }
        }
    }
    match serde_json::to_string_pretty(config) {
        Ok(content) => {
            if let Err(e) = fs::write(path, content) {
                warn!("[配置模块] 错误：将配置写入文件 {:?} 时失败: {}", path, e);
            } else {
                info!("[配置模块] 已成功将当前配置保存到 {:?}.", path);
            }
        }
        Err(e) => {
            warn!("[配置模块] 错误：序列化配置信息以便保存时失败: {}", e);
        }
    }
}

/// 初始化全局配置。
pub fn init_config() {
    let loaded_config = load_or_create_config();
    if SIM_CONFIG.set(loaded_config).is_err() {
        warn!("[配置模块] 全局配置 SIM_CONFIG 已被初始化，本次 init_config 调用未覆盖已有配置。");
    }
    info!("[配置模块] 模拟服务器配置已成功初始化完毕。");
}

/// 获取已加载的全局配置。
pub fn get_config() -> &'static SimConfig {
    SIM_CONFIG
        .get()
        .expect("[配置模块] 全局配置尚未初始化，请先调用 init_config()")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 测试默认配置与监听地址的拼接。
    fn test_default_config_and_bind_addr() {
        let config = SimConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.telemetry_interval_ms, 1000);
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
    }
}
