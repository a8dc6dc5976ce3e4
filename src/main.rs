//! # 二维码管理器：命令行宿主
//!
//! 用控制台实现各个 UI 端口，跑一次完整的生成周期：
//!
//! ```text
//! qrcode-manager <text...>
//! qrcode-manager --wifi <ssid> <password> [wpa|wep|nopass]
//! ```
//!
//! 配置文件路径取自环境变量 `QRCODE_MANAGER_CONFIG`，默认 `./qrcode-manager.json`。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use qrcode_manager::config::load_config_from_path;
use qrcode_manager::content::{ContentMode, ContentSwitcher, NetworkCredentials, WifiSecurity};
use qrcode_manager::encoder::EncodedImage;
use qrcode_manager::error::AppError;
use qrcode_manager::permission::{
    Permission, PermissionBroker, PermissionResponse, PermissionToken, RationaleChoice,
    RationalePrompter,
};
use qrcode_manager::platform::{PlatformCapabilities, build_image_store};
use qrcode_manager::workflow::{
    CycleOutcome, GenerationWorkflow, LogNotifier, PreviewAction, PreviewPresenter, WorkflowPorts,
};

const CONFIG_ENV: &str = "QRCODE_MANAGER_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "qrcode-manager.json";

/// 控制台预览：打印尺寸后直接请求保存。
struct ConsolePresenter;

#[async_trait]
impl PreviewPresenter for ConsolePresenter {
    async fn show(&self, image: &EncodedImage) -> PreviewAction {
        let geometry = image.geometry();
        println!(
            "预览: {}×{} 像素，{} 个模块，每模块 {} 像素",
            image.width(),
            image.height(),
            geometry.modules,
            geometry.module_px
        );
        PreviewAction::Save
    }
}

/// 命令行下由调用者自行负责文件权限，直接授予。
struct GrantingBroker;

#[async_trait]
impl PermissionBroker for GrantingBroker {
    async fn request(&self, permission: Permission) -> PermissionResponse {
        log::debug!("授予权限 {}", permission.as_str());
        PermissionResponse::Granted
    }

    async fn continue_request(&self, _token: PermissionToken) -> PermissionResponse {
        PermissionResponse::Granted
    }

    fn cancel_request(&self, _token: PermissionToken) {}
}

struct ConsolePrompter;

#[async_trait]
impl RationalePrompter for ConsolePrompter {
    async fn explain(&self, permission: Permission) -> RationaleChoice {
        println!("保存二维码需要权限 {}", permission.as_str());
        RationaleChoice::Grant
    }
}

fn build_switcher(args: &[String]) -> Result<ContentSwitcher, AppError> {
    let mut switcher = ContentSwitcher::default();
    match args.first().map(String::as_str) {
        Some("--wifi") => {
            let ssid = args.get(1).cloned().unwrap_or_default();
            let password = args.get(2).cloned().unwrap_or_default();
            let security = match args.get(3) {
                Some(value) => WifiSecurity::parse(value)
                    .ok_or_else(|| AppError::Config(format!("未知的加密方式: {}", value)))?,
                None => WifiSecurity::Wpa,
            };
            switcher.network().set_credentials(NetworkCredentials {
                ssid,
                password,
                security,
                hidden: false,
            });
            switcher.switch_to(ContentMode::Network);
        }
        _ => switcher.text().set_text(args.join(" ")),
    }
    Ok(switcher)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        log::error!("运行失败 [{}]: {}", err.code(), err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = load_config_from_path(&config_path);
    let capabilities = PlatformCapabilities::from_config(&config);
    let store = build_image_store(&config, &capabilities)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let switcher = build_switcher(&args)?;

    let ports = WorkflowPorts {
        presenter: Arc::new(ConsolePresenter),
        notifier: Arc::new(LogNotifier),
        broker: Arc::new(GrantingBroker),
        prompter: Arc::new(ConsolePrompter),
    };
    let mut workflow = GenerationWorkflow::new(&config, &capabilities, store, switcher, ports);

    match workflow.generate().await? {
        CycleOutcome::Saved(saved) => println!("{}", saved.location.path().display()),
        CycleOutcome::NoContent => println!("内容为空，未生成二维码"),
        other => println!("未保存: {:?}", other),
    }
    Ok(())
}
