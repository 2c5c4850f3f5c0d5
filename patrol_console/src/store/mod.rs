//! 中央状态存储模块。
//!
//! 包含机器人状态存储 (`robot_store`，对状态实体的独占持有与动作方法)
//! 与持久化适配器 (`persistence`，设置与近期告警的 JSON 快照)。

pub mod persistence;
pub mod robot_store;
