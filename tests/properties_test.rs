// Property tests: blank content never reaches the encoder, encoding is deterministic
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use proptest::prelude::*;
use qrcode_manager::config::AppConfig;
use qrcode_manager::content::{ContentSwitcher, is_usable_content};
use qrcode_manager::encoder::{EncodedImage, QR_IMAGE_SIZE, QrEncoder};
use qrcode_manager::permission::{
    Permission, PermissionBroker, PermissionResponse, PermissionToken, RationaleChoice,
    RationalePrompter,
};
use qrcode_manager::platform::PlatformCapabilities;
use qrcode_manager::storage::{ImageStore, PersistError, SavedImage, SavedImageDescriptor};
use qrcode_manager::workflow::{
    CycleOutcome, GenerationWorkflow, LogNotifier, PreviewAction, PreviewPresenter, WorkflowPorts,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingPresenter {
        shown: AtomicUsize,
    }

    #[async_trait]
    impl PreviewPresenter for CountingPresenter {
        async fn show(&self, _image: &EncodedImage) -> PreviewAction {
            self.shown.fetch_add(1, Ordering::SeqCst);
            PreviewAction::Dismiss
        }
    }

    struct DenyingBroker;

    #[async_trait]
    impl PermissionBroker for DenyingBroker {
        async fn request(&self, _permission: Permission) -> PermissionResponse {
            PermissionResponse::Denied
        }

        async fn continue_request(&self, _token: PermissionToken) -> PermissionResponse {
            PermissionResponse::Denied
        }

        fn cancel_request(&self, _token: PermissionToken) {}
    }

    struct CancelPrompter;

    #[async_trait]
    impl RationalePrompter for CancelPrompter {
        async fn explain(&self, _permission: Permission) -> RationaleChoice {
            RationaleChoice::Cancel
        }
    }

    struct RejectingStore;

    impl ImageStore for RejectingStore {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        fn persist(&self, _: &EncodedImage, _: &SavedImageDescriptor) -> Result<SavedImage, PersistError> {
            Err(PersistError::OpenStream("never called".to_string()))
        }
    }

    fn blank_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![Just(' '), Just('\t'), Just('\n'), Just('\r'), Just('\u{3000}')],
            0..16,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn blank_content_never_shows_preview(blank in blank_strategy()) {
            prop_assert!(!is_usable_content(Some(blank.as_str())));

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            let presenter = Arc::new(CountingPresenter::default());
            let ports = WorkflowPorts {
                presenter: presenter.clone(),
                notifier: Arc::new(LogNotifier),
                broker: Arc::new(DenyingBroker),
                prompter: Arc::new(CancelPrompter),
            };
            let config = AppConfig::default();
            let capabilities = PlatformCapabilities::probe(Some(26));
            let mut workflow = GenerationWorkflow::new(
                &config,
                &capabilities,
                Arc::new(RejectingStore),
                ContentSwitcher::default(),
                ports,
            );
            workflow.switcher().text().set_text(blank);

            let outcome = runtime.block_on(workflow.generate()).expect("generate");
            prop_assert!(matches!(outcome, CycleOutcome::NoContent));
            prop_assert_eq!(presenter.shown.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn encoding_is_deterministic(content in "[ -~]{1,200}") {
            prop_assume!(is_usable_content(Some(content.as_str())));
            let encoder = QrEncoder::default();
            let first = encoder.encode(&content).expect("first encode");
            let second = encoder.encode(&content).expect("second encode");

            prop_assert_eq!(first.width(), QR_IMAGE_SIZE);
            prop_assert_eq!(first.height(), QR_IMAGE_SIZE);
            prop_assert_eq!(first.geometry(), second.geometry());
            prop_assert!(first.pixels().as_raw() == second.pixels().as_raw());
        }
    }
}
