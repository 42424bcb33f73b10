//! 本地化：面向用户的错误提示、节点名称与时间格式。
//!
//! Localized user-facing text.
//!
//! Only text shown to the person running the workflow is localized. Log events
//! stay in English so they can be grepped.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error_code::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh-CN")]
    SimplifiedChinese,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Locale::English),
            "zh" | "zh-cn" | "zh_cn" | "chinese" => Ok(Locale::SimplifiedChinese),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

impl Locale {
    /// Headline message for a failure kind.
    pub fn failure_message(&self, kind: FailureKind) -> &'static str {
        match (self, kind) {
            (Locale::English, FailureKind::MissingCredential) => "API key is required",
            (Locale::English, FailureKind::InvalidJob) => "Invalid generation parameters",
            (Locale::English, FailureKind::Authentication) => {
                "API key is invalid or expired, please check your key configuration"
            }
            (Locale::English, FailureKind::ModelUnavailable) => {
                "The selected model is temporarily unavailable, please retry later"
            }
            (Locale::English, FailureKind::Rejected) => "The request was rejected by the API",
            (Locale::English, FailureKind::RateLimited) => {
                "Too many requests, please try again later"
            }
            (Locale::English, FailureKind::ServerOverload) => {
                "Server error, retry later or lower the resolution"
            }
            (Locale::English, FailureKind::Network) => {
                "Network connection failed, please check your network"
            }
            (Locale::English, FailureKind::Validation) => "The API returned an unusable response",
            (Locale::English, FailureKind::Cancelled) => "Skipped because the run was stopped",

            (Locale::SimplifiedChinese, FailureKind::MissingCredential) => "API密钥不能为空",
            (Locale::SimplifiedChinese, FailureKind::InvalidJob) => "生成参数无效",
            (Locale::SimplifiedChinese, FailureKind::Authentication) => {
                "API密钥无效或已过期，请检查您的密钥配置"
            }
            (Locale::SimplifiedChinese, FailureKind::ModelUnavailable) => {
                "当前所选模型暂时无法使用，请稍后重试"
            }
            (Locale::SimplifiedChinese, FailureKind::Rejected) => "请求被 API 拒绝",
            (Locale::SimplifiedChinese, FailureKind::RateLimited) => "请求过于频繁，请稍后再试",
            (Locale::SimplifiedChinese, FailureKind::ServerOverload) => {
                "服务器错误，建议稍后重试或降低图片清晰度"
            }
            (Locale::SimplifiedChinese, FailureKind::Network) => "网络连接失败，请检查网络连接后重试",
            (Locale::SimplifiedChinese, FailureKind::Validation) => "API 返回了无法解析的响应",
            (Locale::SimplifiedChinese, FailureKind::Cancelled) => "任务已停止，未执行",
        }
    }

    /// Short description of well-known gateway/server statuses.
    pub fn status_description(&self, status: u16) -> Option<&'static str> {
        let text = match (self, status) {
            (Locale::English, 500) => "Internal server error, please retry later",
            (Locale::English, 502) => "Bad gateway, server temporarily unavailable",
            (Locale::English, 503) => "Service unavailable, possibly under maintenance",
            (Locale::English, 504) => "Gateway timeout, the server took too long to respond",
            (Locale::English, 520) => "Server returned an unknown error",
            (Locale::English, 521) => "Server is down",
            (Locale::English, 522) => "Connection timed out",
            (Locale::English, 523) => "Origin is unreachable",
            (Locale::English, 524) => "A timeout occurred",
            (Locale::SimplifiedChinese, 500) => "服务器内部错误，请稍后重试",
            (Locale::SimplifiedChinese, 502) => "网关错误，服务器暂时不可用",
            (Locale::SimplifiedChinese, 503) => "服务暂时不可用，可能正在维护中",
            (Locale::SimplifiedChinese, 504) => "网关超时，服务器响应时间过长",
            (Locale::SimplifiedChinese, 520) => "服务器返回未知错误",
            (Locale::SimplifiedChinese, 521) => "服务器已下线",
            (Locale::SimplifiedChinese, 522) => "连接超时",
            (Locale::SimplifiedChinese, 523) => "源站不可达",
            (Locale::SimplifiedChinese, 524) => "发生超时",
            _ => return None,
        };
        Some(text)
    }

    /// Message for a generation stopped by the model (`finishReason`).
    pub fn finish_reason_message(&self, reason: &str) -> String {
        match (self, reason) {
            (Locale::English, "SAFETY") => {
                "Content was blocked by the safety filter, please revise the prompt".to_string()
            }
            (Locale::English, "RECITATION") => {
                "Content was blocked for copyright reasons".to_string()
            }
            (Locale::English, "MALFORMED_FUNCTION_CALL") | (Locale::English, "OTHER") => {
                "Server returned an unknown error, please retry later".to_string()
            }
            (Locale::English, other) => format!("Generation stopped abnormally: {other}"),
            (Locale::SimplifiedChinese, "SAFETY") => "内容被安全过滤器拦截，请修改提示词".to_string(),
            (Locale::SimplifiedChinese, "RECITATION") => "内容因版权问题被拦截".to_string(),
            (Locale::SimplifiedChinese, "MALFORMED_FUNCTION_CALL")
            | (Locale::SimplifiedChinese, "OTHER") => "服务器返回未知错误，请稍后重试".to_string(),
            (Locale::SimplifiedChinese, other) => format!("服务器异常终止: {other}"),
        }
    }

    /// Label used in front of a truncated upstream error body.
    pub fn detail_label(&self) -> &'static str {
        match self {
            Locale::English => "details",
            Locale::SimplifiedChinese => "详情",
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Locale::English => "status",
            Locale::SimplifiedChinese => "错误码",
        }
    }

    /// Human readable remaining time.
    ///
    /// `None` renders as "unknown". Under a minute shows seconds only, under an
    /// hour shows minutes and seconds, otherwise hours and minutes.
    pub fn format_duration(&self, duration: Option<Duration>) -> String {
        let Some(duration) = duration else {
            return match self {
                Locale::English => "unknown".to_string(),
                Locale::SimplifiedChinese => "未知".to_string(),
            };
        };
        let total = duration.as_secs();
        let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
        match (self, total) {
            (Locale::English, t) if t < 60 => format!("{s}s"),
            (Locale::English, t) if t < 3600 => format!("{m}m {s}s"),
            (Locale::English, _) => format!("{h}h {m}m"),
            (Locale::SimplifiedChinese, t) if t < 60 => format!("{s}秒"),
            (Locale::SimplifiedChinese, t) if t < 3600 => format!("{m}分{s}秒"),
            (Locale::SimplifiedChinese, _) => format!("{h}小时{m}分"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_thresholds() {
        let en = Locale::English;
        assert_eq!(en.format_duration(None), "unknown");
        assert_eq!(en.format_duration(Some(Duration::from_secs(42))), "42s");
        assert_eq!(en.format_duration(Some(Duration::from_secs(125))), "2m 5s");
        assert_eq!(en.format_duration(Some(Duration::from_secs(7260))), "2h 1m");

        let zh = Locale::SimplifiedChinese;
        assert_eq!(zh.format_duration(Some(Duration::from_secs(59))), "59秒");
        assert_eq!(zh.format_duration(Some(Duration::from_secs(61))), "1分1秒");
        assert_eq!(zh.format_duration(Some(Duration::from_secs(3600))), "1小时0分");
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("zh-CN".parse::<Locale>(), Ok(Locale::SimplifiedChinese));
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::English));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_status_descriptions_cover_cloudflare_range() {
        for status in 520u16..=524 {
            assert!(Locale::English.status_description(status).is_some());
            assert!(Locale::SimplifiedChinese.status_description(status).is_some());
        }
        assert!(Locale::English.status_description(418).is_none());
    }
}
