//! 机器人行为模拟模块。
//!
//! `SimRobot` 维护一台虚拟巡逻机器人的全部内部状态，并提供两个入口：
//! - [`SimRobot::tick`]：按固定节拍推进状态（电量消耗、温度起伏、位置推算）；
//! - [`SimRobot::apply_control`]：响应操作台下发的控制指令。
//!
//! 所有漂移都是确定性的（仅依赖节拍计数），便于在测试中断言。

use log::{info, warn};
use patrol_models::enums::{CameraMode, CameraQuality, MoveDirection, RotateDirection};
use patrol_models::robot_state::{MotorHealth, MotorPowers, Position, ProximitySensors};
use patrol_models::ws_payloads::{ControlCommandPayload, TelemetryPayload};

/// 每个节拍消耗的电量百分比。
const BATTERY_DRAIN_PER_TICK: f32 = 0.01;
/// 电量下限，模拟机器人不会完全耗尽。
const BATTERY_FLOOR: f32 = 5.0;
/// 每次旋转指令改变的朝向角（度）。
const ROTATE_STEP_DEGREES: f64 = 15.0;
/// 电机满功率值。
const MOTOR_FULL_POWER: i16 = 255;

/// 一台虚拟巡逻机器人的内部状态。
#[derive(Debug, Clone)]
pub struct SimRobot {
    tick_count: u64,
    battery_level: f32,
    temperature: f32,
    cpu_usage: f32,
    ram_usage: f32,
    uptime_secs: u64,
    /// 每个节拍对应的秒数（由遥测间隔决定）。
    secs_per_tick: u64,
    position: Position,
    motors: MotorPowers,
    /// 当前移动方向，`None` 表示静止。
    moving: Option<MoveDirection>,
    /// 当前速度，单位：米/秒。
    speed: f32,
    /// 操作台设定的速度百分比。
    speed_percent: f32,
    camera_quality: CameraQuality,
    camera_mode: CameraMode,
    is_recording: bool,
}

impl SimRobot {
    /// 创建一台满电、静止的虚拟机器人。
    pub fn new(secs_per_tick: u64) -> Self {
        Self {
            tick_count: 0,
            battery_level: 100.0,
            temperature: 42.0,
            cpu_usage: 35.0,
            ram_usage: 48.0,
            uptime_secs: 0,
            secs_per_tick: secs_per_tick.max(1),
            position: Position::default(),
            motors: MotorPowers::default(),
            moving: None,
            speed: 0.0,
            speed_percent: 50.0,
            camera_quality: CameraQuality::Hd720,
            camera_mode: CameraMode::Normal,
            is_recording: false,
        }
    }

    /// 推进一个节拍：消耗电量、起伏负载指标、按当前速度推算位置。
    pub fn tick(&mut self) {
        self.tick_count += 1;
        self.uptime_secs += self.secs_per_tick;
        self.battery_level = (self.battery_level - BATTERY_DRAIN_PER_TICK).max(BATTERY_FLOOR);

        // 负载指标围绕基准值做确定性的小幅起伏
        let phase = (self.tick_count % 20) as f32;
        self.cpu_usage = 35.0 + phase * 0.5;
        self.ram_usage = 48.0 + phase * 0.25;
        self.temperature = 42.0 + phase * 0.1;

        if let Some(direction) = self.moving {
            let distance = self.speed as f64 * self.secs_per_tick as f64;
            match direction {
                MoveDirection::Forward => self.position.y += distance,
                MoveDirection::Backward => self.position.y -= distance,
                MoveDirection::Left => self.position.x -= distance,
                MoveDirection::Right => self.position.x += distance,
                MoveDirection::Stop => {}
            }
        }
    }

    /// 返回完整的遥测快照。
    pub fn full_snapshot(&self) -> TelemetryPayload {
        TelemetryPayload {
            battery_level: Some(self.battery_level),
            speed: Some(self.speed),
            temperature: Some(self.temperature),
            cpu_usage: Some(self.cpu_usage),
            ram_usage: Some(self.ram_usage),
            uptime: Some(self.uptime_secs),
            position: Some(self.position),
            motors: Some(self.motors),
            motor_status: Some(MotorHealth::default()),
            sensors: Some(ProximitySensors {
                front_distance: 150.0,
                rear_distance: 200.0,
                left_distance: 80.0,
                right_distance: 95.0,
            }),
        }
    }

    /// 应用一条 `robot:control` 指令。
    pub fn apply_control(&mut self, payload: &ControlCommandPayload) {
        match payload.command.as_str() {
            "move" => {
                let direction = serde_json::from_value::<MoveDirection>(
                    payload.data.get("direction").cloned().unwrap_or_default(),
                );
                let speed_percent = payload
                    .data
                    .get("speed")
                    .and_then(|v| v.as_f64())
                    .map(|v| v as f32)
                    .unwrap_or(self.speed_percent);
                match direction {
                    Ok(MoveDirection::Stop) => self.stop_motion(),
                    Ok(direction) => {
                        self.moving = Some(direction);
                        self.speed_percent = speed_percent.clamp(0.0, 100.0);
                        self.speed = 2.0 * self.speed_percent / 100.0;
                        self.motors = Self::motors_for(direction, self.speed_percent);
                        info!(
                            "[模拟机器人] 开始移动: {:?}，速度 {:.0}%",
                            direction, self.speed_percent
                        );
                    }
                    Err(e) => warn!("[模拟机器人] 无法识别的移动方向: {}", e),
                }
            }
            "rotate" => match serde_json::from_value::<RotateDirection>(
                payload.data.get("direction").cloned().unwrap_or_default(),
            ) {
                Ok(RotateDirection::Clockwise) => {
                    self.position.heading = (self.position.heading + ROTATE_STEP_DEGREES) % 360.0;
                }
                Ok(RotateDirection::CounterClockwise) => {
                    self.position.heading =
                        (self.position.heading - ROTATE_STEP_DEGREES).rem_euclid(360.0);
                }
                Err(e) => warn!("[模拟机器人] 无法识别的旋转方向: {}", e),
            },
            "setSpeed" => {
                if let Some(speed) = payload.data.get("speed").and_then(|v| v.as_f64()) {
                    self.speed_percent = (speed as f32).clamp(0.0, 100.0);
                    if self.moving.is_some() {
                        self.speed = 2.0 * self.speed_percent / 100.0;
                    }
                    info!("[模拟机器人] 速度已设置为 {:.0}%", self.speed_percent);
                }
            }
            "emergencyStop" => {
                self.stop_motion();
                warn!("[模拟机器人] 已执行紧急停止。");
            }
            other => {
                warn!("[模拟机器人] 收到未知控制指令: '{}'，忽略。", other);
            }
        }
    }

    fn stop_motion(&mut self) {
        self.moving = None;
        self.speed = 0.0;
        self.motors = MotorPowers::default();
    }

    fn motors_for(direction: MoveDirection, speed_percent: f32) -> MotorPowers {
        let power = (MOTOR_FULL_POWER as f32 * speed_percent / 100.0) as i16;
        match direction {
            MoveDirection::Forward => MotorPowers { m1: power, m2: power, m3: power, m4: power },
            MoveDirection::Backward => {
                MotorPowers { m1: -power, m2: -power, m3: -power, m4: -power }
            }
            MoveDirection::Left => MotorPowers { m1: -power, m2: power, m3: -power, m4: power },
            MoveDirection::Right => MotorPowers { m1: power, m2: -power, m3: power, m4: -power },
            MoveDirection::Stop => MotorPowers::default(),
        }
    }

    // --- 摄像头 ---

    /// 设置摄像头画质。
    pub fn set_camera_quality(&mut self, quality: CameraQuality) {
        self.camera_quality = quality;
        info!("[模拟机器人] 摄像头画质已设置为 {:?}", quality);
    }

    /// 设置摄像头成像模式。
    pub fn set_camera_mode(&mut self, mode: CameraMode) {
        self.camera_mode = mode;
        info!("[模拟机器人] 摄像头模式已设置为 {:?}", mode);
    }

    /// 设置录制状态。
    pub fn set_recording(&mut self, recording: bool) {
        self.is_recording = recording;
        info!(
            "[模拟机器人] 录制状态: {}",
            if recording { "录制中" } else { "已停止" }
        );
    }
}
