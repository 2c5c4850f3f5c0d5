//! 机器人状态模型模块。
//!
//! 本模块定义了操作台状态存储 (`patrol_console` 中的 `RobotStore`) 所持有的
//! 各类实体：机器人实时状态、操控意图、摄像头设置、告警、历史记录与应用设置。
//!
//! 这些结构体同时也是线上遥测与本地持久化快照的数据形态，因此统一使用
//! `#[serde(rename_all = "camelCase")]` 与 JSON 线上格式对齐。

use crate::enums::{AlertSeverity, CameraMode, CameraQuality, HistoryCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 机器人在二维平面上的位置与朝向。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    /// 朝向角，单位：度。
    pub heading: f64,
}

/// 四个驱动电机的功率值。
///
/// 有符号数值，绝对值不超过 255（负值表示反转）。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MotorPowers {
    pub m1: i16,
    pub m2: i16,
    pub m3: i16,
    pub m4: i16,
}

/// 四个驱动电机的健康标志，`true` 表示该电机工作正常。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MotorHealth {
    pub front_left: bool,
    pub front_right: bool,
    pub rear_left: bool,
    pub rear_right: bool,
}

impl Default for MotorHealth {
    fn default() -> Self {
        Self {
            front_left: true,
            front_right: true,
            rear_left: true,
            rear_right: true,
        }
    }
}

/// 四个方向的近距传感器读数，单位：厘米。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProximitySensors {
    pub front_distance: f32,
    pub rear_distance: f32,
    pub left_distance: f32,
    pub right_distance: f32,
}

/// 机器人实时状态。
///
/// 由状态存储独占持有，仅允许通过其动作方法
/// (`update_telemetry` / `update_status` / `set_connected`) 修改。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RobotStatus {
    /// 当前是否与机器人保持连接。
    pub is_connected: bool,
    /// 电量百分比，范围 [0, 100]。
    pub battery_level: f32,
    /// 当前速度，单位：米/秒，非负。
    pub speed: f32,
    /// 机体温度，单位：摄氏度。
    pub temperature: f32,
    /// CPU 占用百分比，范围 [0, 100]。
    pub cpu_usage: f32,
    /// 内存占用百分比，范围 [0, 100]。
    pub memory_usage: f32,
    /// 开机时长，单位：秒，连接期间单调不减。
    pub uptime: u64,
    /// 最近一次遥测合并的时间，进程启动后为 `None`。
    pub last_update: Option<DateTime<Utc>>,
    pub position: Position,
    pub motors: MotorPowers,
    pub motor_health: MotorHealth,
    pub sensors: ProximitySensors,
}

impl Default for RobotStatus {
    fn default() -> Self {
        Self {
            is_connected: false,
            battery_level: 85.0,
            speed: 0.0,
            temperature: 42.0,
            cpu_usage: 35.0,
            memory_usage: 48.0,
            uptime: 3600,
            last_update: None,
            position: Position::default(),
            motors: MotorPowers::default(),
            motor_health: MotorHealth::default(),
            sensors: ProximitySensors::default(),
        }
    }
}

/// 操作台侧的操控意图状态。
///
/// 由 UI 发起的意图调用修改，并以指令形式回传给机器人；
/// 它本身并不是机器人物理状态的权威来源。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    /// 摇杆 X 轴，范围 [-1, 1]。
    pub joystick_x: f32,
    /// 摇杆 Y 轴，范围 [-1, 1]。
    pub joystick_y: f32,
    /// 旋转意图，范围 [-1, 1]。
    pub rotation: f32,
    /// 当前速度百分比，范围 [0, 100]。
    pub speed_percent: f32,
    /// 最大速度百分比，范围 [0, 100]。
    pub max_speed_percent: f32,
    /// 是否处于手动操控模式（相对于自主巡逻）。
    pub is_manual_mode: bool,
    /// 安全模式开关。
    pub safety_mode: bool,
    /// 避障开关。
    pub obstacle_avoidance: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            joystick_x: 0.0,
            joystick_y: 0.0,
            rotation: 0.0,
            speed_percent: 50.0,
            max_speed_percent: 100.0,
            is_manual_mode: true,
            safety_mode: true,
            obstacle_avoidance: true,
        }
    }
}

/// 摄像头设置。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraSettings {
    pub quality: CameraQuality,
    pub mode: CameraMode,
    /// 变焦倍率，范围 [1, 5]。
    pub zoom: f32,
    pub is_recording: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            quality: CameraQuality::Hd720,
            mode: CameraMode::Normal,
            zoom: 1.0,
            is_recording: false,
        }
    }
}

/// 一条告警记录。
///
/// 创建后除 `read` 标志外不再修改。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// 唯一标识符 (UUID v4 字符串)。
    pub id: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// 用户是否已读。
    pub read: bool,
}

impl Alert {
    /// 创建一条新的告警，自动生成 `id` 与当前时间戳，初始为未读状态。
    pub fn new(severity: AlertSeverity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            severity,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
        }
    }
}

/// 一条历史记录。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// 唯一标识符 (UUID v4 字符串)。
    pub id: String,
    pub category: HistoryCategory,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// 可选的附加详情（任意 JSON 映射）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HistoryItem {
    /// 创建一条新的历史记录，自动生成 `id` 与当前时间戳。
    pub fn new(
        category: HistoryCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            title: title.into(),
            description: description.into(),
            timestamp: Utc::now(),
            details,
        }
    }
}

/// 应用设置。
///
/// 长生命周期实体，是唯一会通过持久化适配器在进程重启之间保留的实体。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// 界面主题，例如 `"dark"` / `"light"`。
    pub theme: String,
    /// 界面语言，例如 `"zh-CN"`。
    pub language: String,
    /// 机器人 WebSocket 服务端地址。
    pub server_url: String,
    /// 目标机器人标识符。
    pub robot_id: String,
    /// 连接断开后是否自动重连。
    pub auto_reconnect: bool,
    /// 是否弹出通知。
    pub notifications_enabled: bool,
    /// 通知是否伴随提示音。
    pub sound_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            language: "zh-CN".to_string(),
            server_url: "ws://localhost:4000".to_string(),
            robot_id: "patrol-robot-01".to_string(),
            auto_reconnect: true,
            notifications_enabled: true,
            sound_enabled: true,
        }
    }
}

/// `AppSettings` 的浅合并补丁：仅 `Some` 的字段会覆盖现有设置。
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_reconnect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
}

impl AppSettings {
    /// 将补丁中所有 `Some` 的字段浅合并到当前设置上。
    pub fn apply_patch(&mut self, patch: SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(server_url) = patch.server_url {
            self.server_url = server_url;
        }
        if let Some(robot_id) = patch.robot_id {
            self.robot_id = robot_id;
        }
        if let Some(auto_reconnect) = patch.auto_reconnect {
            self.auto_reconnect = auto_reconnect;
        }
        if let Some(notifications_enabled) = patch.notifications_enabled {
            self.notifications_enabled = notifications_enabled;
        }
        if let Some(sound_enabled) = patch.sound_enabled {
            self.sound_enabled = sound_enabled;
        }
    }
}
