// setter.rs — 系统壁纸设置模块

use rust_i18n::t;
use std::path::Path;

/// 将指定路径的图片设置为系统壁纸
///
/// # 参数
/// - `path`: 图片路径，相对路径会先转为绝对路径
pub fn set_from_path(path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    let absolute = std::path::absolute(path.as_ref())?;
    let path_str = absolute.to_str().ok_or(t!("error_utf8"))?;

    tracing::info!("Applying wallpaper {}", absolute.display());

    // 调用第三方库设置壁纸
    // 这个库会自动识别操作系统并调用相应的 API
    wallpaper::set_from_path(path_str)
        .map_err(|e| t!("error_set_failed", reason => e).into_owned().into())
}
