// error.rs — 统一错误类型
// 所有获取流程中的失败最终都归类为 FailureReason 中的一种

use crate::source::Resolution;
use rust_i18n::t;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No candidates for the current query")]
    NoCandidates,
    #[error("No candidate offers resolution {0}")]
    NoMatchingResolution(Resolution),
    #[error("Network Error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid HTML: {0}")]
    InvalidHtml(String),
    #[error("Cannot parse URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unrecognised image payload from {0}")]
    UnknownImageFormat(String),
    #[error("Config Error: {0}")]
    Persistence(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An acquisition is already running")]
    TriggerRejected,
}

/// 面向用户的失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NoCandidates,
    NoMatchingResolution,
    TransportError,
    PersistenceError,
    Rejected,
}

impl Error {
    /// 把具体错误折叠为失败分类
    /// 网络、HTML 解析、IO 等都视为 TransportError
    pub fn reason(&self) -> FailureReason {
        match self {
            Error::NoCandidates => FailureReason::NoCandidates,
            Error::NoMatchingResolution(_) => FailureReason::NoMatchingResolution,
            Error::Persistence(_) => FailureReason::PersistenceError,
            Error::TriggerRejected => FailureReason::Rejected,
            Error::Network(_)
            | Error::InvalidHtml(_)
            | Error::Url(_)
            | Error::Io(_)
            | Error::UnknownImageFormat(_)
            | Error::InvalidInput(_) => FailureReason::TransportError,
        }
    }

    /// 生成展示给用户的单条警告文本
    pub fn user_message(&self) -> String {
        match self {
            Error::NoCandidates => t!("warn_no_candidates").into_owned(),
            Error::NoMatchingResolution(res) => {
                t!("warn_no_matching_resolution", res => res).into_owned()
            }
            Error::TriggerRejected => t!("warn_busy").into_owned(),
            Error::Persistence(reason) => t!("warn_persistence", reason => reason).into_owned(),
            Error::InvalidInput(reason) => t!("warn_invalid_input", reason => reason).into_owned(),
            other => t!("warn_transport", reason => other).into_owned(),
        }
    }
}
