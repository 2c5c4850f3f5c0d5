//! 状态持久化适配器模块。
//!
//! 只有两类实体会在进程重启之间保留：应用设置与近期告警（最多
//! [`MAX_PERSISTED_ALERTS`] 条）。快照以美化的 JSON 文件形式存放，
//! 读取失败（文件缺失、内容损坏）时退回默认值，绝不让持久化问题
//! 阻止应用启动。
//!
//! 机器人实时状态、操控意图与历史记录被有意排除在持久化之外：
//! 它们要么由下一次遥测重建，要么只对当前会话有意义。

use crate::store::robot_store::RobotStore;
use log::{info, warn};
use patrol_models::robot_state::{Alert, AppSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 持久化快照中保留的告警条数上限。
pub const MAX_PERSISTED_ALERTS: usize = 20;

/// 默认的快照文件名。
const SNAPSHOT_FILE_NAME: &str = "state.json";

/// 持久化快照的数据形态。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub settings: AppSettings,
    /// 最新的告警在最前面，最多 [`MAX_PERSISTED_ALERTS`] 条。
    pub alerts: Vec<Alert>,
}

impl Default for PersistedSnapshot {
    fn default() -> Self {
        Self {
            settings: AppSettings::default(),
            alerts: Vec::new(),
        }
    }
}

/// 快照文件的读写适配器。
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// 以指定的快照文件路径创建适配器。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 以默认路径创建适配器。
    ///
    /// 默认路径为 `$HOME/.config/patrol_console/state.json`；
    /// `HOME` 环境变量不可用时退回当前工作目录下的同名文件。
    pub fn with_default_path() -> Self {
        Self::new(Self::default_path())
    }

    fn default_path() -> PathBuf {
        match std::env::var("HOME") {
            Ok(home) => Path::new(&home)
                .join(".config")
                .join("patrol_console")
                .join(SNAPSHOT_FILE_NAME),
            Err(_) => PathBuf::from(SNAPSHOT_FILE_NAME),
        }
    }

    /// 返回此适配器使用的快照文件路径。
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载持久化快照。
    ///
    /// 文件不存在或内容无法解析时返回默认快照并记录日志，
    /// 不向调用方传播错误。
    pub fn load(&self) -> PersistedSnapshot {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                info!(
                    "[持久化] 快照文件 '{}' 不可读 ({})，使用默认状态。",
                    self.path.display(),
                    e
                );
                return PersistedSnapshot::default();
            }
        };
        match serde_json::from_str::<PersistedSnapshot>(&content) {
            Ok(mut snapshot) => {
                snapshot.alerts.truncate(MAX_PERSISTED_ALERTS);
                info!("[持久化] 已从 '{}' 恢复快照。", self.path.display());
                snapshot
            }
            Err(e) => {
                warn!(
                    "[持久化] 快照文件 '{}' 内容损坏 ({})，使用默认状态。",
                    self.path.display(),
                    e
                );
                PersistedSnapshot::default()
            }
        }
    }

    /// 把快照序列化为美化的 JSON 并写入文件，必要时创建父目录。
    pub fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    format!("创建快照目录 '{}' 失败: {}", parent.display(), e)
                })?;
            }
        }
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| format!("序列化状态快照失败: {}", e))?;
        fs::write(&self.path, content)
            .map_err(|e| format!("将快照写入文件 '{}' 失败: {}", self.path.display(), e))?;
        Ok(())
    }

    /// 从状态存储采集当前快照（设置 + 最近的告警）。
    pub fn capture(store: &RobotStore) -> PersistedSnapshot {
        let mut alerts = store.alerts();
        alerts.truncate(MAX_PERSISTED_ALERTS);
        PersistedSnapshot {
            settings: store.settings(),
            alerts,
        }
    }
}
