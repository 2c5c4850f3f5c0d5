//! 机器人指令门面模块。
//!
//! `RobotCommander` 把操作台的控制意图转换为线上指令消息：
//! 运动类指令统一走 `robot:control` 信封 (`{command, data}`)，
//! 摄像头类指令各自使用独立的消息类型。
//!
//! 所有指令方法返回 `bool` 表示消息是否被成功交给链路发送；
//! 链路未打开时指令不排队、不报错，直接返回 `false`。
//! 需要本地镜像的指令（速度、摄像头设置、紧急停止）会在发送之前
//! 先把副作用写入状态存储，确保界面即时响应，即使链路此刻不可用。

use crate::store::robot_store::RobotStore;
use crate::ws_client::service::RobotLinkService;
use log::warn;
use patrol_models::enums::{CameraMode, CameraQuality, MoveDirection, RotateDirection};
use patrol_models::ws_payloads::{
    CameraModePayload, CameraQualityPayload, ControlCommandPayload, EmptyPayload,
    CAMERA_CAPTURE_MESSAGE_TYPE, CAMERA_MODE_MESSAGE_TYPE, CAMERA_QUALITY_MESSAGE_TYPE,
    CAMERA_START_RECORDING_MESSAGE_TYPE, CAMERA_STOP_RECORDING_MESSAGE_TYPE, CONTROL_MESSAGE_TYPE,
};
use serde_json::json;
use std::sync::Arc;

/// 类型化的机器人指令门面。
pub struct RobotCommander {
    link: Arc<RobotLinkService>,
    store: Arc<RobotStore>,
}

impl RobotCommander {
    /// 创建指令门面。
    ///
    /// # Arguments
    /// * `link` - 共享的链路服务，所有指令经由它发送。
    /// * `store` - 共享的状态存储，本地镜像的副作用写入其中。
    pub fn new(link: Arc<RobotLinkService>, store: Arc<RobotStore>) -> Self {
        Self { link, store }
    }

    /// 发送一条 `robot:control` 指令。
    async fn send_control(&self, command: &str, data: serde_json::Value) -> bool {
        let payload = ControlCommandPayload {
            command: command.to_string(),
            data,
        };
        self.link.send(CONTROL_MESSAGE_TYPE, &payload).await
    }

    /// 命令机器人向指定方向移动。
    ///
    /// `speed` 为本次指令的速度百分比覆盖值（收拢到 [0, 100]），
    /// 传 `None` 时取当前的速度百分比设置。
    pub async fn move_robot(&self, direction: MoveDirection, speed: Option<f32>) -> bool {
        let speed = self.effective_speed(speed);
        self.send_control("move", json!({ "direction": direction, "speed": speed }))
            .await
    }

    /// 命令机器人原地旋转。
    ///
    /// `speed` 的语义与 [`RobotCommander::move_robot`] 相同。
    pub async fn rotate(&self, direction: RotateDirection, speed: Option<f32>) -> bool {
        let speed = self.effective_speed(speed);
        self.send_control("rotate", json!({ "direction": direction, "speed": speed }))
            .await
    }

    /// 计算本次指令实际使用的速度百分比：优先使用覆盖值。
    fn effective_speed(&self, speed: Option<f32>) -> f32 {
        match speed {
            Some(speed) => speed.clamp(0.0, 100.0),
            None => self.store.control().speed_percent,
        }
    }

    /// 设置速度百分比（收拢到 [0, 100]），先镜像到本地再发送。
    pub async fn set_speed(&self, percent: f32) -> bool {
        let clamped = percent.clamp(0.0, 100.0);
        self.store.set_speed_percent(clamped);
        self.send_control("setSpeed", json!({ "speed": clamped }))
            .await
    }

    /// 触发紧急停止。
    ///
    /// 本地副作用（清零运动状态、告警、历史）无条件先行生效，
    /// 之后才尝试把指令发往机器人。链路不可用时本地停止依然完成，
    /// 仅返回 `false` 表示指令未能送达。
    pub async fn emergency_stop(&self) -> bool {
        self.store.emergency_stop();
        let delivered = self.send_control("emergencyStop", json!({})).await;
        if !delivered {
            warn!("[指令门面] 紧急停止指令未能送达机器人，本地停止已生效。");
        }
        delivered
    }

    /// 设置摄像头画质，先镜像到本地再发送。
    pub async fn set_camera_quality(&self, quality: CameraQuality) -> bool {
        self.store.set_camera_quality(quality);
        self.link
            .send(CAMERA_QUALITY_MESSAGE_TYPE, &CameraQualityPayload { quality })
            .await
    }

    /// 设置摄像头成像模式，先镜像到本地再发送。
    pub async fn set_camera_mode(&self, mode: CameraMode) -> bool {
        self.store.set_camera_mode(mode);
        self.link
            .send(CAMERA_MODE_MESSAGE_TYPE, &CameraModePayload { mode })
            .await
    }

    /// 开始录制，先镜像到本地再发送。
    pub async fn start_recording(&self) -> bool {
        self.store.set_recording(true);
        self.link
            .send(CAMERA_START_RECORDING_MESSAGE_TYPE, &EmptyPayload {})
            .await
    }

    /// 停止录制，先镜像到本地再发送。
    pub async fn stop_recording(&self) -> bool {
        self.store.set_recording(false);
        self.link
            .send(CAMERA_STOP_RECORDING_MESSAGE_TYPE, &EmptyPayload {})
            .await
    }

    /// 抓拍一帧图像。无本地副作用。
    pub async fn capture_image(&self) -> bool {
        self.link
            .send(CAMERA_CAPTURE_MESSAGE_TYPE, &EmptyPayload {})
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::ws_client::router::MessageRouter;
    use patrol_models::enums::AlertSeverity;

    fn offline_commander() -> (RobotCommander, Arc<RobotStore>) {
        let store = Arc::new(RobotStore::new());
        let router = Arc::new(MessageRouter::new());
        let link = Arc::new(RobotLinkService::new(
            LinkConfig::default(),
            Arc::clone(&store),
            router,
        ));
        (RobotCommander::new(link, Arc::clone(&store)), store)
    }

    #[tokio::test]
    /// 测试链路未打开时指令返回 `false` 且不排队。
    async fn test_commands_fail_cleanly_when_offline() {
        let (commander, _store) = offline_commander();
        assert!(!commander.move_robot(MoveDirection::Forward, None).await);
        assert!(!commander.rotate(RotateDirection::Clockwise, None).await);
        assert!(!commander.capture_image().await);
    }

    #[tokio::test]
    /// 测试移动/旋转指令的单次速度覆盖：覆盖值被收拢且不改变存储中的速度设置。
    async fn test_per_call_speed_override() {
        let (commander, store) = offline_commander();
        store.set_speed_percent(50.0);

        assert!(!commander.move_robot(MoveDirection::Forward, Some(130.0)).await);
        assert!(!commander.rotate(RotateDirection::Clockwise, Some(80.0)).await);

        assert_eq!(
            store.control().speed_percent,
            50.0,
            "单次覆盖不应改变存储中的速度设置"
        );
        assert_eq!(commander.effective_speed(Some(130.0)), 100.0, "覆盖值应被收拢到 100");
        assert_eq!(commander.effective_speed(None), 50.0, "无覆盖时应取存储中的速度设置");
    }

    #[tokio::test]
    /// 测试紧急停止在链路不可用时本地副作用依然生效。
    async fn test_emergency_stop_applies_locally_when_offline() {
        let (commander, store) = offline_commander();
        store.set_joystick(0.6, 0.6);

        let delivered = commander.emergency_stop().await;
        assert!(!delivered, "链路未打开时指令不应送达");

        let control = store.control();
        assert_eq!(control.joystick_x, 0.0);
        assert_eq!(control.joystick_y, 0.0);
        assert_eq!(store.alerts()[0].severity, AlertSeverity::Error);
        assert_eq!(store.alerts()[0].title, "紧急停止");
    }

    #[tokio::test]
    /// 测试速度与摄像头指令的本地镜像在离线时依然生效。
    async fn test_local_mirrors_apply_when_offline() {
        let (commander, store) = offline_commander();

        assert!(!commander.set_speed(130.0).await);
        assert_eq!(store.control().speed_percent, 100.0, "速度应被收拢到 100");

        assert!(!commander.set_camera_quality(CameraQuality::Fhd1080).await);
        assert_eq!(store.camera().quality, CameraQuality::Fhd1080);

        assert!(!commander.set_camera_mode(CameraMode::Night).await);
        assert_eq!(store.camera().mode, CameraMode::Night);

        assert!(!commander.start_recording().await);
        assert!(store.camera().is_recording);

        assert!(!commander.stop_recording().await);
        assert!(!store.camera().is_recording);
    }
}
