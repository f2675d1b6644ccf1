// cli.rs — 命令行接口定义模块
// 使用 clap 的 derive 模式定义所有子命令和参数

use crate::source::{Orientation, Resolution};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// 定时从壁纸站获取图片并设为桌面壁纸
///
/// 按主题与方向搜索，挑选提供目标分辨率的图片，下载后应用为系统壁纸。
#[derive(Parser)]
#[command(name = "wallpaster")]
#[command(version)]
#[command(author)]
#[command(about = "Fetch wallpapers from image sites and apply them on a schedule")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 搜索相关的公共参数
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// 主题关键词（不填则不过滤）
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// 图片方向
    #[arg(short, long, value_enum, default_value_t = Orientation::Landscape)]
    pub orientation: Orientation,

    /// 壁纸站名称（使用 `wallpaster sites` 查看）
    #[arg(short, long)]
    pub site: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 获取一张壁纸并设为桌面背景
    ///
    /// 用法示例:
    ///   wallpaster set --query forest
    ///   wallpaster set -q city -o portrait -r 1080x1920
    Set {
        #[command(flatten)]
        search: SearchArgs,

        /// 目标分辨率，覆盖配置（如 2560x1440）
        #[arg(short, long, value_parser = parse_resolution)]
        resolution: Option<Resolution>,

        /// 只下载，不设置壁纸
        #[arg(long)]
        no_apply: bool,
    },

    /// 按配置的间隔持续轮播，可从标准输入输入命令调整
    ///
    /// 可用命令: next, start, stop, theme <text>, all, orientation <o>,
    /// site <name>, interval <minutes>, resolution <WxH>, dir <path>, quit
    ///
    /// 用法示例:
    ///   wallpaster slideshow -q mountains -i 30
    Slideshow {
        #[command(flatten)]
        search: SearchArgs,

        /// 轮播间隔（分钟），会写入配置
        #[arg(short, long)]
        interval: Option<u64>,

        /// 只下载，不设置壁纸
        #[arg(long)]
        no_apply: bool,
    },

    /// 查看查询的结果总数和页数
    ///
    /// 用法示例:
    ///   wallpaster info -q forest
    Info {
        #[command(flatten)]
        search: SearchArgs,
    },

    /// 列出已支持的壁纸站
    Sites,

    /// 生成 shell 补全脚本（支持 bash, zsh, fish, elvish, powershell）
    ///
    /// 用法示例：
    ///   wallpaster completions zsh > ~/.zsh/completions/_wallpaster
    Completions {
        /// 目标 shell 类型
        shell: Shell,
    },

    /// 配置管理操作
    ///
    /// 用法示例:
    ///   wallpaster config show
    ///   wallpaster config set interval 15
    ///   wallpaster config set resolution 2560x1440
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// 配置管理操作
#[derive(Subcommand)]
pub enum ConfigAction {
    /// 查看当前配置
    Show,
    /// 生成配置文件对应的 JSON Schema
    Schema,
    /// 以 JSON 格式打印当前完整配置内容
    Dump,
    /// 设置配置项 (支持: dir, interval, resolution)
    Set {
        /// 要设置的键 (dir, interval, res/resolution)
        key: String,
        /// 要设置的值（interval 单位为分钟）
        value: String,
    },
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    s.parse().map_err(|e: crate::error::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_arguments() {
        let cli = Cli::try_parse_from([
            "wallpaster", "set", "-q", "forest", "-o", "portrait", "-r", "1080x1920", "--no-apply",
        ])
        .unwrap();
        let Commands::Set { search, resolution, no_apply } = cli.command else {
            panic!("expected set");
        };
        assert_eq!(search.query, "forest");
        assert_eq!(search.orientation, Orientation::Portrait);
        assert_eq!(resolution, Some(Resolution::new_unchecked(1080, 1920)));
        assert!(no_apply);
    }

    #[test]
    fn test_long_help_uses_about_text() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Fetch wallpapers from image sites"), "{help}");
    }

    #[test]
    fn test_rejects_out_of_range_resolution() {
        assert!(Cli::try_parse_from(["wallpaster", "set", "-r", "50x50"]).is_err());
    }
}
