use log::{error, info, LevelFilter};
use robotsim::session::{handle_session, SharedRobot};
use robotsim::sim::SimRobot;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() {
    // 初始化日志记录器
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .init();
    info!("[主程序] 日志系统已成功初始化 (env_logger)，默认级别: Info。");

    // 初始化应用配置
    robotsim::config::init_config();
    let config = robotsim::config::get_config();
    info!(
        "[主程序] 配置已加载。监听地址: {}，遥测间隔: {} 毫秒。",
        config.bind_addr(),
        config.telemetry_interval_ms
    );

    // 创建所有会话共享的虚拟机器人
    let secs_per_tick = (config.telemetry_interval_ms / 1000).max(1);
    let robot: SharedRobot = Arc::new(Mutex::new(SimRobot::new(secs_per_tick)));
    info!("[主程序] 虚拟巡逻机器人 (SimRobot) 已创建。");

    // 启动 WebSocket 服务
    info!("[主程序] 正在启动机器人模拟服务端...");
    let telemetry_interval_ms = config.telemetry_interval_ms;
    let result = patrol_websocket_utils::server::transport::start_server(
        config.bind_addr(),
        move |handler, receiver| {
            let robot = Arc::clone(&robot);
            async move {
                handle_session(robot, handler, receiver, telemetry_interval_ms).await;
            }
        },
    )
    .await;

    if let Err(e) = result {
        error!("[主程序] 致命错误：启动机器人模拟服务端时发生严重问题: {}", e);
    }
}
