//! 内容来源模块
//!
//! # 设计思路
//!
//! 生成流程只依赖 `ContentSource::content()` 这一个查询，不关心当前是哪种录入方式。
//! 两种录入方式（纯文本 / Wi-Fi 网络凭据）各自实现该 trait，
//! 由 `ContentSwitcher` 持有并决定当前激活的来源。
//!
//! # 实现思路
//!
//! - 录入界面在其他线程更新内容，来源内部使用 `RwLock` 保存最新值。
//! - `None`、空串、纯空白串统一视为“无内容”，由 `is_usable_content` 一处判定。
//! - Wi-Fi 内容按通用 `WIFI:` 负载格式拼接，并转义保留字符。

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// 判断内容是否可用于生成二维码。
///
/// `None`、空串与纯空白串一律返回 `false`。
pub fn is_usable_content(content: Option<&str>) -> bool {
    content.is_some_and(|text| !text.trim().is_empty())
}

/// 内容来源：返回当前待编码的字符串。
pub trait ContentSource: Send + Sync {
    fn content(&self) -> Option<String>;
}

// ============================================================================
// 纯文本
// ============================================================================

/// 自由文本来源。
#[derive(Debug, Default)]
pub struct TextContent {
    text: RwLock<String>,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(text.into()),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        match self.text.write() {
            Ok(mut guard) => *guard = text.into(),
            Err(poisoned) => *poisoned.into_inner() = text.into(),
        }
    }
}

impl ContentSource for TextContent {
    fn content(&self) -> Option<String> {
        self.text.read().ok().map(|text| text.clone())
    }
}

// ============================================================================
// Wi-Fi 网络凭据
// ============================================================================

/// Wi-Fi 加密方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiSecurity {
    #[default]
    Wpa,
    Wep,
    /// 开放网络，不携带密码
    Nopass,
}

impl WifiSecurity {
    fn as_str(self) -> &'static str {
        match self {
            Self::Wpa => "WPA",
            Self::Wep => "WEP",
            Self::Nopass => "nopass",
        }
    }

    /// 从外部字符串解析加密方式，未知值返回 `None`。
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "wpa" | "wpa2" | "wpa3" => Some(Self::Wpa),
            "wep" => Some(Self::Wep),
            "nopass" | "none" | "open" => Some(Self::Nopass),
            _ => None,
        }
    }
}

/// 一组网络凭据。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkCredentials {
    pub ssid: String,
    pub password: String,
    pub security: WifiSecurity,
    pub hidden: bool,
}

impl NetworkCredentials {
    /// 拼接 Wi-Fi 二维码负载；SSID 为空白时返回 `None`。
    pub fn to_payload(&self) -> Option<String> {
        if self.ssid.trim().is_empty() {
            return None;
        }

        let mut payload = format!(
            "WIFI:T:{};S:{};",
            self.security.as_str(),
            escape_wifi_field(&self.ssid)
        );
        if self.security != WifiSecurity::Nopass {
            payload.push_str(&format!("P:{};", escape_wifi_field(&self.password)));
        }
        if self.hidden {
            payload.push_str("H:true;");
        }
        payload.push(';');
        Some(payload)
    }
}

fn escape_wifi_field(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | ';' | ',' | ':' | '"') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// 网络凭据来源。
#[derive(Debug, Default)]
pub struct NetworkContent {
    credentials: RwLock<NetworkCredentials>,
}

impl NetworkContent {
    pub fn new(credentials: NetworkCredentials) -> Self {
        Self {
            credentials: RwLock::new(credentials),
        }
    }

    pub fn set_credentials(&self, credentials: NetworkCredentials) {
        match self.credentials.write() {
            Ok(mut guard) => *guard = credentials,
            Err(poisoned) => *poisoned.into_inner() = credentials,
        }
    }
}

impl ContentSource for NetworkContent {
    fn content(&self) -> Option<String> {
        self.credentials.read().ok().and_then(|c| c.to_payload())
    }
}

// ============================================================================
// 来源切换
// ============================================================================

/// 当前激活的录入方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Text,
    Network,
}

/// 持有两种来源，并记录当前激活的一个。
pub struct ContentSwitcher {
    text: Arc<TextContent>,
    network: Arc<NetworkContent>,
    mode: ContentMode,
}

impl ContentSwitcher {
    /// 默认激活文本来源。
    pub fn new(text: Arc<TextContent>, network: Arc<NetworkContent>) -> Self {
        Self {
            text,
            network,
            mode: ContentMode::Text,
        }
    }

    pub fn switch_to(&mut self, mode: ContentMode) {
        if self.mode != mode {
            log::debug!("🔀 切换内容来源：{:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn active_mode(&self) -> ContentMode {
        self.mode
    }

    pub fn active(&self) -> &dyn ContentSource {
        match self.mode {
            ContentMode::Text => self.text.as_ref(),
            ContentMode::Network => self.network.as_ref(),
        }
    }

    pub fn text(&self) -> &Arc<TextContent> {
        &self.text
    }

    pub fn network(&self) -> &Arc<NetworkContent> {
        &self.network
    }
}

impl Default for ContentSwitcher {
    fn default() -> Self {
        Self::new(Arc::default(), Arc::default())
    }
}
