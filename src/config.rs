// config.rs — 配置管理模块
// 配置以 JSON 保存在 ~/.config/wallpaster/config.json（可用 $WALLPASTER_CONFIG 覆盖）
// 文件缺失、损坏或取值越界时写入默认值

use crate::error::{Error, Result};
use crate::source::Resolution;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 轮播间隔允许的分钟数范围
pub const MIN_INTERVAL_MINUTES: u64 = 1;
pub const MAX_INTERVAL_MINUTES: u64 = 17000;

const DEFAULT_INTERVAL_MS: u64 = 60_000;
const DEFAULT_RESOLUTION: (u32, u32) = (1920, 1080);

/// 展开路径中的 ~ 和环境变量 ($HOME 等)
/// 变量不存在时保留原样
fn expand_path(path_str: &str) -> PathBuf {
    match shellexpand::full(path_str) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            tracing::debug!("Keeping {path_str:?} unexpanded: {e}");
            PathBuf::from(path_str)
        }
    }
}

/// 映射 config.json 文件内容的结构体
/// 字段名与文件中的 key 完全一致，多余或缺失的 key 都视为文件损坏
#[derive(Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// 壁纸保存目录 (支持 ~、$HOME 等环境变量)
    dir: String,
    /// 轮播间隔，单位毫秒
    interval: u64,
    /// 目标分辨率 [宽, 高]
    #[schemars(with = "(u32, u32)")]
    resolution: Resolution,
}

/// 应用全局配置项
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 壁纸保存目录
    pub directory: PathBuf,
    /// 轮播间隔（毫秒）
    pub interval_ms: u64,
    /// 目标分辨率
    pub resolution: Resolution,
    /// 配置文件所在路径
    pub config_path: PathBuf,
}

impl AppConfig {
    /// 初始化配置
    /// 读取失败时使用默认值并重写文件，写入失败只记录警告
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// 配置文件路径：$WALLPASTER_CONFIG > $HOME/.config/wallpaster/config.json
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("WALLPASTER_CONFIG") {
            return expand_path(&path);
        }
        let home = env::var("HOME").map(PathBuf::from).unwrap_or_default();
        home.join(".config").join("wallpaster").join("config.json")
    }

    pub fn load_from(config_path: PathBuf) -> Self {
        match Self::read(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!("Seeding default config at {}: {e}", config_path.display());
                let config = Self::defaults(config_path);
                if let Err(e) = config.save() {
                    tracing::warn!("{e}");
                }
                config
            }
        }
    }

    /// 默认配置
    pub fn defaults(config_path: PathBuf) -> Self {
        Self {
            directory: default_directory(),
            interval_ms: DEFAULT_INTERVAL_MS,
            resolution: DEFAULT_RESOLUTION.into(),
            config_path,
        }
    }

    /// 辅助函数：解析并校验 JSON 配置文件
    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| Error::Persistence(format!("corrupt config: {e}")))?;

        if !file.resolution.is_in_domain() {
            return Err(Error::Persistence(format!(
                "resolution {} out of range",
                file.resolution
            )));
        }
        check_interval_minutes(file.interval / 60_000)?;
        if file.interval % 60_000 != 0 {
            return Err(Error::Persistence(format!(
                "interval {} is not a whole number of minutes",
                file.interval
            )));
        }

        Ok(Self {
            directory: expand_path(&file.dir),
            interval_ms: file.interval,
            resolution: file.resolution,
            config_path: path.to_path_buf(),
        })
    }

    fn to_file(&self) -> ConfigFile {
        ConfigFile {
            dir: self.directory.to_string_lossy().to_string(),
            interval: self.interval_ms,
            resolution: self.resolution,
        }
    }

    /// 将配置保存回文件
    pub fn save(&self) -> Result<()> {
        let persist = |e: std::io::Error| {
            Error::Persistence(format!("cannot write {}: {e}", self.config_path.display()))
        };
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(persist)?;
        }
        fs::write(&self.config_path, self.to_json()).map_err(persist)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn interval_minutes(&self) -> u64 {
        self.interval_ms / 60_000
    }

    /// 更新轮播间隔（分钟）并保存
    pub fn set_interval_minutes(&mut self, minutes: u64) -> Result<()> {
        check_interval_minutes(minutes)?;
        self.interval_ms = minutes * 60_000;
        self.save()
    }

    /// 更新目标分辨率并保存
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.resolution = Resolution::new(resolution.width, resolution.height)?;
        self.save()
    }

    /// 更新壁纸目录并保存
    pub fn set_directory(&mut self, directory: &str) -> Result<()> {
        if directory.trim().is_empty() {
            return Err(Error::InvalidInput("directory must not be empty".into()));
        }
        self.directory = expand_path(directory.trim());
        self.save()
    }

    /// 获取配置文件的 JSON Schema
    pub fn get_schema() -> String {
        let schema = schemars::schema_for!(ConfigFile);
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
    }

    /// 将当前配置转换为 JSON 字符串
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_file()).unwrap_or_else(|_| "{}".to_string())
    }
}

fn check_interval_minutes(minutes: u64) -> Result<()> {
    if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&minutes) {
        return Err(Error::InvalidInput(format!(
            "interval must be {MIN_INTERVAL_MINUTES}..={MAX_INTERVAL_MINUTES} minutes, got {minutes}"
        )));
    }
    Ok(())
}

/// 默认壁纸目录：可执行文件旁的 images/，取不到时用 $HOME/Pictures/wallpaster
fn default_directory() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("images")))
        .unwrap_or_else(|| {
            let home = env::var("HOME").map(PathBuf::from).unwrap_or_default();
            home.join("Pictures").join("wallpaster")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        (dir, path)
    }

    #[test]
    fn test_missing_file_seeds_defaults() {
        let (_dir, path) = temp_config();
        let config = AppConfig::load_from(path.clone());
        assert_eq!(config.interval_ms, 60_000);
        assert_eq!(config.resolution, Resolution::new_unchecked(1920, 1080));
        assert!(config.directory.ends_with("images") || config.directory.ends_with("wallpaster"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["interval"], 60_000);
        assert_eq!(written["resolution"], serde_json::json!([1920, 1080]));
    }

    #[test]
    fn test_round_trip_through_file() {
        let (_dir, path) = temp_config();
        let mut config = AppConfig::load_from(path.clone());
        config.set_interval_minutes(5).unwrap();
        config
            .set_resolution(Resolution::new_unchecked(2560, 1440))
            .unwrap();
        config.set_directory("/tmp/walls").unwrap();

        let reloaded = AppConfig::load_from(path);
        assert_eq!(reloaded.interval_ms, 300_000);
        assert_eq!(reloaded.interval(), Duration::from_secs(300));
        assert_eq!(reloaded.resolution, Resolution::new_unchecked(2560, 1440));
        assert_eq!(reloaded.directory, PathBuf::from("/tmp/walls"));
    }

    #[test]
    fn test_corrupt_or_foreign_file_is_reseeded() {
        let (_dir, path) = temp_config();
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        for content in [
            "not json",
            r#"{"dir": "/x", "interval": 60000}"#,
            r#"{"dir": "/x", "interval": 60000, "resolution": [1920, 1080], "extra": 1}"#,
            r#"{"dir": "/x", "interval": 0, "resolution": [1920, 1080]}"#,
            r#"{"dir": "/x", "interval": 60000, "resolution": [50, 1080]}"#,
        ] {
            fs::write(&path, content).unwrap();
            let config = AppConfig::load_from(path.clone());
            assert_eq!(config.interval_ms, 60_000, "{content}");
            assert_ne!(config.directory, PathBuf::from("/x"), "{content}");
            // 文件被重写为合法内容
            assert_eq!(
                AppConfig::read(&path).unwrap().interval_ms,
                60_000,
                "{content}"
            );
        }
    }

    #[test]
    fn test_setters_validate_domain() {
        let (_dir, path) = temp_config();
        let mut config = AppConfig::load_from(path);
        assert!(config.set_interval_minutes(0).is_err());
        assert!(config.set_interval_minutes(17001).is_err());
        assert!(config.set_interval_minutes(17000).is_ok());
        assert!(config.set_resolution(Resolution::new_unchecked(99, 100)).is_err());
        assert!(config.set_directory("  ").is_err());
        assert_eq!(config.interval_minutes(), 17000);
    }

    #[test]
    fn test_directory_expands_home_and_variables() {
        let Ok(home) = env::var("HOME") else {
            return;
        };
        let (_dir, path) = temp_config();
        let mut config = AppConfig::load_from(path.clone());

        config.set_directory("$HOME/walls").unwrap();
        assert_eq!(config.directory, PathBuf::from(&home).join("walls"));
        config.set_directory("~/walls").unwrap();
        assert_eq!(config.directory, PathBuf::from(&home).join("walls"));

        // 写入文件的是展开后的路径
        assert_eq!(AppConfig::load_from(path).directory, PathBuf::from(&home).join("walls"));

        // 未定义的变量原样保留
        config.set_directory("$WALLPASTER_NO_SUCH_VAR/walls").unwrap();
        assert_eq!(config.directory, PathBuf::from("$WALLPASTER_NO_SUCH_VAR/walls"));
    }

    #[test]
    fn test_unwritable_path_still_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        // 父路径是普通文件，无法创建目录
        let config = AppConfig::load_from(blocker.join("config.json"));
        assert_eq!(config.interval_ms, 60_000);
        assert!(matches!(config.save(), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_schema_lists_keys() {
        let schema = AppConfig::get_schema();
        for key in ["dir", "interval", "resolution"] {
            assert!(schema.contains(key), "{key} missing from schema");
        }
    }
}
