//! 机器人状态存储模块。
//!
//! `RobotStore` 是操作台的中央状态容器，独占持有机器人实时状态、
//! 操控意图、摄像头设置、告警、历史记录与应用设置。
//! 所有修改都必须通过它的动作方法进行；每次修改都会通过
//! `tokio::sync::broadcast` 通道广播一条 [`StoreEvent`]，
//! 供表现层与其他观察者实时感知。
//!
//! 内部使用 `std::sync::RwLock` 保护状态：动作方法都是同步的短临界区，
//! 可以同时被异步任务（链路服务的内建处理器）与同步调用方使用。

use crate::event::StoreEvent;
use chrono::Utc;
use log::{info, warn};
use patrol_models::enums::{AlertSeverity, CameraMode, CameraQuality, HistoryCategory};
use patrol_models::robot_state::{
    Alert, AppSettings, CameraSettings, ControlState, HistoryItem, MotorPowers, RobotStatus,
    SettingsPatch,
};
use patrol_models::ws_payloads::TelemetryPayload;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// 告警列表的容量上限，超出时淘汰最旧的条目。
pub const MAX_ALERTS: usize = 100;
/// 历史记录的容量上限，超出时淘汰最旧的条目。
pub const MAX_HISTORY: usize = 500;

/// 事件广播通道的容量。落后的订阅者会丢失最旧的事件，
/// 但总能通过读取最新快照恢复一致。
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 状态存储的内部数据，整体由一把读写锁保护。
#[derive(Debug, Clone, Default)]
struct RobotStoreState {
    status: RobotStatus,
    control: ControlState,
    camera: CameraSettings,
    /// 最新的告警在最前面。
    alerts: Vec<Alert>,
    /// 最新的历史记录在最前面。
    history: Vec<HistoryItem>,
    settings: AppSettings,
}

/// 操作台的中央状态存储。
pub struct RobotStore {
    state: RwLock<RobotStoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for RobotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotStore {
    /// 创建一个新的状态存储，所有实体取默认值。
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(RobotStoreState::default()),
            events,
        }
    }

    /// 订阅状态变更事件。
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // 没有订阅者时发送会失败，这不是错误。
        let _ = self.events.send(event);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RobotStoreState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RobotStoreState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // --- 快照读取 ---

    /// 返回机器人实时状态的快照。
    pub fn status(&self) -> RobotStatus {
        self.read_state().status.clone()
    }

    /// 返回操控意图状态的快照。
    pub fn control(&self) -> ControlState {
        self.read_state().control.clone()
    }

    /// 返回摄像头设置的快照。
    pub fn camera(&self) -> CameraSettings {
        self.read_state().camera.clone()
    }

    /// 返回告警列表的快照（最新的在最前面）。
    pub fn alerts(&self) -> Vec<Alert> {
        self.read_state().alerts.clone()
    }

    /// 返回历史记录的快照（最新的在最前面）。
    pub fn history(&self) -> Vec<HistoryItem> {
        self.read_state().history.clone()
    }

    /// 返回应用设置的快照。
    pub fn settings(&self) -> AppSettings {
        self.read_state().settings.clone()
    }

    /// 返回未读告警的数量。
    pub fn unread_alert_count(&self) -> usize {
        self.read_state().alerts.iter().filter(|a| !a.read).count()
    }

    // --- 连接与遥测 ---

    /// 设置与机器人的连接状态。
    ///
    /// 仅在状态实际发生变化时广播事件；从连接变为断开的那一次转变
    /// 额外产生一条"连接丢失"警告告警（边沿触发，重复断开不重复告警）。
    pub fn set_connected(&self, connected: bool) {
        let lost_connection = {
            let mut state = self.write_state();
            if state.status.is_connected == connected {
                return;
            }
            state.status.is_connected = connected;
            !connected
        };

        info!(
            "[状态存储] 连接状态变更: {}",
            if connected { "已连接" } else { "已断开" }
        );
        self.emit(StoreEvent::ConnectionChanged { connected });

        if lost_connection {
            self.push_alert(Alert::new(
                AlertSeverity::Warning,
                "连接丢失",
                "与机器人的连接已断开",
            ));
        }
    }

    /// 把一批遥测数据按部分合并语义写入机器人状态。
    ///
    /// 仅 `Some` 的字段覆盖原值，缺失的字段保持不变；
    /// 每次合并都刷新 `last_update` 时间戳。
    pub fn update_telemetry(&self, telemetry: &TelemetryPayload) {
        {
            let mut state = self.write_state();
            Self::merge_telemetry(&mut state.status, telemetry);
            state.status.last_update = Some(Utc::now());
        }
        self.emit(StoreEvent::TelemetryUpdated);
    }

    /// 通过非遥测通道部分更新机器人状态。
    ///
    /// 合并语义与 [`RobotStore::update_telemetry`] 相同，
    /// 但不刷新 `last_update`（该时间戳专指遥测新鲜度）。
    pub fn update_status(&self, patch: &TelemetryPayload) {
        {
            let mut state = self.write_state();
            Self::merge_telemetry(&mut state.status, patch);
        }
        self.emit(StoreEvent::StatusUpdated);
    }

    fn merge_telemetry(status: &mut RobotStatus, telemetry: &TelemetryPayload) {
        if let Some(battery_level) = telemetry.battery_level {
            status.battery_level = battery_level;
        }
        if let Some(speed) = telemetry.speed {
            status.speed = speed;
        }
        if let Some(temperature) = telemetry.temperature {
            status.temperature = temperature;
        }
        if let Some(cpu_usage) = telemetry.cpu_usage {
            status.cpu_usage = cpu_usage;
        }
        if let Some(ram_usage) = telemetry.ram_usage {
            status.memory_usage = ram_usage;
        }
        if let Some(uptime) = telemetry.uptime {
            status.uptime = uptime;
        }
        if let Some(position) = telemetry.position {
            status.position = position;
        }
        if let Some(motors) = telemetry.motors {
            status.motors = motors;
        }
        if let Some(motor_status) = telemetry.motor_status {
            status.motor_health = motor_status;
        }
        if let Some(sensors) = telemetry.sensors {
            status.sensors = sensors;
        }
    }

    // --- 操控意图 ---

    /// 设置摇杆位置，两轴都被收拢到 [-1, 1]。
    pub fn set_joystick(&self, x: f32, y: f32) {
        {
            let mut state = self.write_state();
            state.control.joystick_x = x.clamp(-1.0, 1.0);
            state.control.joystick_y = y.clamp(-1.0, 1.0);
        }
        self.emit(StoreEvent::ControlChanged);
    }

    /// 设置旋转意图，收拢到 [-1, 1]。
    pub fn set_rotation(&self, rotation: f32) {
        {
            let mut state = self.write_state();
            state.control.rotation = rotation.clamp(-1.0, 1.0);
        }
        self.emit(StoreEvent::ControlChanged);
    }

    /// 设置速度百分比，收拢到 [0, 100]。
    pub fn set_speed_percent(&self, percent: f32) {
        {
            let mut state = self.write_state();
            state.control.speed_percent = percent.clamp(0.0, 100.0);
        }
        self.emit(StoreEvent::ControlChanged);
    }

    /// 切换手动/自主模式。
    ///
    /// 仅在模式实际发生变化时记录一条历史并广播事件。
    pub fn set_manual_mode(&self, manual: bool) {
        {
            let mut state = self.write_state();
            if state.control.is_manual_mode == manual {
                return;
            }
            state.control.is_manual_mode = manual;
        }
        self.emit(StoreEvent::ControlChanged);
        let (title, description) = if manual {
            ("切换到手动模式", "操作员已接管机器人操控")
        } else {
            ("切换到自主模式", "机器人已恢复自主巡逻")
        };
        self.push_history(HistoryItem::new(HistoryCategory::System, title, description, None));
    }

    /// 设置安全模式开关。
    pub fn set_safety_mode(&self, enabled: bool) {
        {
            let mut state = self.write_state();
            state.control.safety_mode = enabled;
        }
        self.emit(StoreEvent::ControlChanged);
    }

    /// 设置避障开关。
    pub fn set_obstacle_avoidance(&self, enabled: bool) {
        {
            let mut state = self.write_state();
            state.control.obstacle_avoidance = enabled;
        }
        self.emit(StoreEvent::ControlChanged);
    }

    /// 执行紧急停止的本地副作用。
    ///
    /// 立即清零所有运动相关状态（摇杆、旋转、当前速度、电机功率），
    /// 记录一条错误级告警与一条历史，无论指令是否成功送达机器人。
    pub fn emergency_stop(&self) {
        {
            let mut state = self.write_state();
            state.control.joystick_x = 0.0;
            state.control.joystick_y = 0.0;
            state.control.rotation = 0.0;
            state.status.speed = 0.0;
            state.status.motors = MotorPowers::default();
        }
        warn!("[状态存储] 已执行紧急停止的本地副作用。");
        self.emit(StoreEvent::ControlChanged);
        self.emit(StoreEvent::EmergencyStopTriggered);
        self.push_alert(Alert::new(
            AlertSeverity::Error,
            "紧急停止",
            "已触发紧急停止，所有运动已中止",
        ));
        self.push_history(HistoryItem::new(
            HistoryCategory::Alert,
            "紧急停止",
            "操作员触发了紧急停止",
            None,
        ));
    }

    // --- 摄像头 ---

    /// 设置摄像头画质。
    pub fn set_camera_quality(&self, quality: CameraQuality) {
        {
            let mut state = self.write_state();
            state.camera.quality = quality;
        }
        self.emit(StoreEvent::CameraSettingsChanged);
    }

    /// 设置摄像头成像模式。
    pub fn set_camera_mode(&self, mode: CameraMode) {
        {
            let mut state = self.write_state();
            state.camera.mode = mode;
        }
        self.emit(StoreEvent::CameraSettingsChanged);
    }

    /// 设置变焦倍率，收拢到 [1, 5]。
    pub fn set_zoom(&self, zoom: f32) {
        {
            let mut state = self.write_state();
            state.camera.zoom = zoom.clamp(1.0, 5.0);
        }
        self.emit(StoreEvent::CameraSettingsChanged);
    }

    /// 切换录制状态。
    ///
    /// 仅在状态实际发生变化时记录一条历史并广播事件。
    pub fn set_recording(&self, recording: bool) {
        {
            let mut state = self.write_state();
            if state.camera.is_recording == recording {
                return;
            }
            state.camera.is_recording = recording;
        }
        self.emit(StoreEvent::CameraSettingsChanged);
        let (title, description) = if recording {
            ("开始录制", "摄像头已开始录制视频")
        } else {
            ("停止录制", "摄像头已停止录制视频")
        };
        self.push_history(HistoryItem::new(HistoryCategory::System, title, description, None));
    }

    // --- 告警与历史 ---

    /// 新增一条告警，返回创建的条目。
    pub fn add_alert(
        &self,
        severity: AlertSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Alert {
        let alert = Alert::new(severity, title, message);
        self.push_alert(alert.clone());
        alert
    }

    fn push_alert(&self, alert: Alert) {
        {
            let mut state = self.write_state();
            state.alerts.insert(0, alert.clone());
            state.alerts.truncate(MAX_ALERTS);
        }
        self.emit(StoreEvent::AlertAdded(alert));
    }

    /// 将指定 `id` 的告警标记为已读。
    ///
    /// # Returns
    /// 找到并标记成功时返回 `true`。
    pub fn mark_alert_read(&self, alert_id: &str) -> bool {
        let mut state = self.write_state();
        match state.alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.read = true;
                true
            }
            None => false,
        }
    }

    /// 清空所有告警。
    pub fn clear_alerts(&self) {
        self.write_state().alerts.clear();
    }

    /// 新增一条历史记录，返回创建的条目。
    pub fn add_history(
        &self,
        category: HistoryCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> HistoryItem {
        let item = HistoryItem::new(category, title, description, details);
        self.push_history(item.clone());
        item
    }

    fn push_history(&self, item: HistoryItem) {
        {
            let mut state = self.write_state();
            state.history.insert(0, item.clone());
            state.history.truncate(MAX_HISTORY);
        }
        self.emit(StoreEvent::HistoryAdded(item));
    }

    // --- 设置 ---

    /// 按浅合并语义更新应用设置。
    pub fn update_settings(&self, patch: SettingsPatch) {
        {
            let mut state = self.write_state();
            state.settings.apply_patch(patch);
        }
        self.emit(StoreEvent::SettingsUpdated);
    }

    /// 将应用设置重置为默认值。
    pub fn reset_settings(&self) {
        {
            let mut state = self.write_state();
            state.settings = AppSettings::default();
        }
        self.emit(StoreEvent::SettingsReset);
    }

    /// 从持久化快照恢复设置与告警（进程启动时调用一次）。
    pub fn restore(&self, settings: AppSettings, alerts: Vec<Alert>) {
        {
            let mut state = self.write_state();
            state.settings = settings;
            state.alerts = alerts;
            state.alerts.truncate(MAX_ALERTS);
        }
        self.emit(StoreEvent::SettingsUpdated);
    }
}
