//! # 权限协商
//!
//! ```text
//! Unrequested ──request──▶ Granted            → GateDecision::Granted
//!                       ├─▶ Denied             → GateDecision::Denied
//!                       └─▶ RationaleNeeded ──explain──▶ Grant  → continue_request（重新进入协商）
//!                                                     └─▶ Cancel → cancel_request → GateDecision::Cancelled
//! ```

use std::sync::Arc;

use super::{
    Permission, PermissionBroker, PermissionResponse, PermissionState, RationaleChoice,
    RationalePrompter,
};

/// 协商的最终结论。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    Denied,
    /// 用户在理由说明中取消
    Cancelled,
}

/// 协商过程中的单步事件，按发生顺序交给观察者。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// 代理给出一次结果
    Response(PermissionState),
    /// 用户在理由说明中做出选择
    Rationale(RationaleChoice),
}

/// 协商结论与经过的状态序列。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub decision: GateDecision,
    pub trail: Vec<PermissionState>,
}

pub struct StoragePermissionGate {
    broker: Arc<dyn PermissionBroker>,
    prompter: Arc<dyn RationalePrompter>,
    permission: Permission,
}

impl StoragePermissionGate {
    pub fn new(broker: Arc<dyn PermissionBroker>, prompter: Arc<dyn RationalePrompter>) -> Self {
        Self {
            broker,
            prompter,
            permission: Permission::WriteExternalStorage,
        }
    }

    /// 协商直到代理给出授予或拒绝，或用户取消理由说明。
    pub async fn negotiate(&self) -> GateOutcome {
        self.negotiate_observed(|_| {}).await
    }

    /// 同 `negotiate`，每一步事件都先交给 `observe`。
    pub async fn negotiate_observed<F>(&self, mut observe: F) -> GateOutcome
    where
        F: FnMut(GateEvent) + Send,
    {
        let mut trail = vec![PermissionState::Unrequested];
        let mut response = self.broker.request(self.permission).await;

        loop {
            trail.push(response.state());
            observe(GateEvent::Response(response.state()));
            log::debug!("🔐 权限 {} 状态: {:?}", self.permission.as_str(), response.state());

            match response {
                PermissionResponse::Granted => {
                    return GateOutcome {
                        decision: GateDecision::Granted,
                        trail,
                    };
                }
                PermissionResponse::Denied => {
                    return GateOutcome {
                        decision: GateDecision::Denied,
                        trail,
                    };
                }
                PermissionResponse::RationaleNeeded(token) => {
                    let choice = self.prompter.explain(self.permission).await;
                    observe(GateEvent::Rationale(choice));
                    match choice {
                        RationaleChoice::Grant => {
                            response = self.broker.continue_request(token).await;
                        }
                        RationaleChoice::Cancel => {
                            self.broker.cancel_request(token);
                            return GateOutcome {
                                decision: GateDecision::Cancelled,
                                trail,
                            };
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionToken;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按脚本依次返回结果的代理。
    struct ScriptedBroker {
        responses: Mutex<VecDeque<PermissionResponse>>,
        continued: Mutex<Vec<u64>>,
        cancelled: Mutex<Vec<u64>>,
    }

    impl ScriptedBroker {
        fn new(responses: Vec<PermissionResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                continued: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
            })
        }

        fn next(&self) -> PermissionResponse {
            self.responses
                .lock()
                .expect("lock")
                .pop_front()
                .expect("broker script exhausted")
        }
    }

    #[async_trait]
    impl PermissionBroker for ScriptedBroker {
        async fn request(&self, _permission: Permission) -> PermissionResponse {
            self.next()
        }

        async fn continue_request(&self, token: PermissionToken) -> PermissionResponse {
            self.continued.lock().expect("lock").push(token.request_id());
            self.next()
        }

        fn cancel_request(&self, token: PermissionToken) {
            self.cancelled.lock().expect("lock").push(token.request_id());
        }
    }

    struct FixedPrompter(RationaleChoice);

    #[async_trait]
    impl RationalePrompter for FixedPrompter {
        async fn explain(&self, _permission: Permission) -> RationaleChoice {
            self.0
        }
    }

    #[tokio::test]
    async fn direct_grant_resolves_granted() {
        let broker = ScriptedBroker::new(vec![PermissionResponse::Granted]);
        let gate = StoragePermissionGate::new(broker, Arc::new(FixedPrompter(RationaleChoice::Cancel)));

        let outcome = gate.negotiate().await;
        assert_eq!(outcome.decision, GateDecision::Granted);
        assert_eq!(
            outcome.trail,
            vec![PermissionState::Unrequested, PermissionState::Granted]
        );
    }

    #[tokio::test]
    async fn rationale_cancel_aborts_request() {
        let token = PermissionToken::new(9);
        let broker = ScriptedBroker::new(vec![PermissionResponse::RationaleNeeded(token)]);
        let gate = StoragePermissionGate::new(broker.clone(), Arc::new(FixedPrompter(RationaleChoice::Cancel)));

        let outcome = gate.negotiate().await;
        assert_eq!(outcome.decision, GateDecision::Cancelled);
        assert_eq!(broker.cancelled.lock().expect("lock").as_slice(), &[9]);
        assert!(broker.continued.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn rationale_grant_reenters_negotiation() {
        let broker = ScriptedBroker::new(vec![
            PermissionResponse::RationaleNeeded(PermissionToken::new(1)),
            PermissionResponse::RationaleNeeded(PermissionToken::new(2)),
            PermissionResponse::Denied,
        ]);
        let gate = StoragePermissionGate::new(broker.clone(), Arc::new(FixedPrompter(RationaleChoice::Grant)));

        let outcome = gate.negotiate().await;
        assert_eq!(outcome.decision, GateDecision::Denied);
        assert_eq!(broker.continued.lock().expect("lock").as_slice(), &[1, 2]);
        assert_eq!(
            outcome.trail,
            vec![
                PermissionState::Unrequested,
                PermissionState::RationaleNeeded,
                PermissionState::RationaleNeeded,
                PermissionState::Denied,
            ]
        );
    }

    #[tokio::test]
    async fn observer_sees_every_step_in_order() {
        let broker = ScriptedBroker::new(vec![
            PermissionResponse::RationaleNeeded(PermissionToken::new(4)),
            PermissionResponse::Granted,
        ]);
        let gate = StoragePermissionGate::new(broker, Arc::new(FixedPrompter(RationaleChoice::Grant)));

        let mut events = Vec::new();
        let outcome = gate.negotiate_observed(|event| events.push(event)).await;

        assert_eq!(outcome.decision, GateDecision::Granted);
        assert_eq!(
            events,
            vec![
                GateEvent::Response(PermissionState::RationaleNeeded),
                GateEvent::Rationale(RationaleChoice::Grant),
                GateEvent::Response(PermissionState::Granted),
            ]
        );
    }

    #[test]
    fn gate_ports_are_object_safe() {
        fn assert_broker(_: &dyn PermissionBroker) {}
        fn assert_prompter(_: &dyn RationalePrompter) {}
        assert_broker(ScriptedBroker::new(Vec::new()).as_ref());
        assert_prompter(&FixedPrompter(RationaleChoice::Cancel));
    }

    #[test]
    fn permission_name_matches_platform_constant() {
        assert_eq!(
            Permission::WriteExternalStorage.as_str(),
            "android.permission.WRITE_EXTERNAL_STORAGE"
        );
    }
}
