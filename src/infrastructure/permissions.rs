//! Desktop permission host
//!
//! Desktop platforms have no runtime permission API, so the host asks the
//! user through the UI and remembers the answer for the rest of the process.

use crate::domain::models::AppEvent;
use crate::domain::permissions::{Capability, PermissionHost, PermissionPrompt, PermissionResults};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub struct PromptPermissionHost {
    granted: Arc<Mutex<HashSet<Capability>>>,
    auto_grant: bool,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl PromptPermissionHost {
    pub fn new(auto_grant: bool, event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            granted: Arc::new(Mutex::new(HashSet::new())),
            auto_grant,
            event_sender,
        }
    }
}

fn record(
    granted: &Mutex<HashSet<Capability>>,
    capabilities: &[Capability],
    allow: bool,
) -> PermissionResults {
    if allow {
        match granted.lock() {
            Ok(mut set) => set.extend(capabilities.iter().copied()),
            Err(_) => warn!("Permission store lock poisoned"),
        }
    }
    capabilities.iter().map(|c| (*c, allow)).collect()
}

impl PermissionHost for PromptPermissionHost {
    fn check(&self, capability: Capability) -> bool {
        self.granted
            .lock()
            .map(|set| set.contains(&capability))
            .unwrap_or(false)
    }

    fn request(&mut self, capabilities: &[Capability]) -> oneshot::Receiver<PermissionResults> {
        let (reply, results) = oneshot::channel();

        if self.auto_grant {
            debug!("Auto-granting {:?}", capabilities);
            let _ = reply.send(record(&self.granted, capabilities, true));
            return results;
        }

        let (prompt, answer) = PermissionPrompt::new(capabilities.to_vec());
        if self.event_sender.send(AppEvent::PermissionPrompt(prompt)).is_err() {
            // Nobody can answer; dropping `reply` reads as a denial
            return results;
        }

        let granted = self.granted.clone();
        let capabilities = capabilities.to_vec();
        tokio::spawn(async move {
            let allow = answer.await.unwrap_or(false);
            let _ = reply.send(record(&granted, &capabilities, allow));
        });
        results
    }
}
