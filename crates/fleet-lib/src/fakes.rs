//! In-memory runtime and packet filter used by unit tests

use crate::error::ProvisioningPhase;
use crate::filter::{FilterRule, PacketFilter};
use crate::models::{CreateInstance, InstanceSummary};
use crate::runtime::WorkloadRuntime;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Create(String),
    Start(String),
    Inspect(String),
}

#[derive(Debug, Clone)]
struct Instance {
    id: String,
    request: CreateInstance,
    ip: IpAddr,
    started: bool,
}

#[derive(Default)]
struct RuntimeState {
    calls: Vec<RuntimeCall>,
    instances: Vec<Instance>,
    create_calls: usize,
    start_calls: usize,
    inspect_calls: usize,
}

/// Runtime that hands out sequential ids and 172.17.0.x addresses
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
    /// Fail the n-th call (0-based) of the given phase
    fail_at: Option<(ProvisioningPhase, usize)>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(phase: ProvisioningPhase, call: usize) -> Self {
        Self {
            fail_at: Some((phase, call)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn create_requests(&self) -> Vec<CreateInstance> {
        let state = self.state.lock().unwrap();
        state.instances.iter().map(|i| i.request.clone()).collect()
    }

    pub fn created(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.instances.iter().map(|i| i.id.clone()).collect()
    }

    pub fn started(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .instances
            .iter()
            .filter(|i| i.started)
            .map(|i| i.id.clone())
            .collect()
    }

    fn should_fail(&self, phase: ProvisioningPhase, call: usize) -> bool {
        self.fail_at == Some((phase, call))
    }
}

#[async_trait]
impl WorkloadRuntime for FakeRuntime {
    async fn create(&self, request: &CreateInstance) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RuntimeCall::Create(request.name.clone()));

        let call = state.create_calls;
        state.create_calls += 1;
        if self.should_fail(ProvisioningPhase::Create, call) {
            return Err(anyhow!("image {} not found", request.image));
        }

        let seen = state
            .instances
            .iter()
            .filter(|i| i.request.name == request.name)
            .count();
        let id = if seen == 0 {
            format!("id-{}", request.name)
        } else {
            format!("id-{}-{}", request.name, seen)
        };
        let ip = IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2 + state.instances.len() as u8));

        state.instances.push(Instance {
            id: id.clone(),
            request: request.clone(),
            ip,
            started: false,
        });
        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RuntimeCall::Start(id.to_string()));

        let call = state.start_calls;
        state.start_calls += 1;
        if self.should_fail(ProvisioningPhase::Start, call) {
            return Err(anyhow!("port is already allocated"));
        }

        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| anyhow!("no such container: {}", id))?;
        instance.started = true;
        Ok(())
    }

    async fn inspect(&self, id: &str) -> Result<IpAddr> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RuntimeCall::Inspect(id.to_string()));

        let call = state.inspect_calls;
        state.inspect_calls += 1;
        if self.should_fail(ProvisioningPhase::Inspect, call) {
            return Err(anyhow!("container {} has no IP address", id));
        }

        state
            .instances
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.ip)
            .ok_or_else(|| anyhow!("no such container: {}", id))
    }

    async fn list_by_label(&self, key: &str, value: &str) -> Result<Vec<InstanceSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .instances
            .iter()
            .filter(|i| i.started && i.request.labels.get(key).map(String::as_str) == Some(value))
            .map(|i| InstanceSummary {
                id: i.id.clone(),
                names: vec![i.request.name.clone()],
                image: i.request.image.clone(),
                state: "running".to_string(),
                labels: i.request.labels.clone(),
            })
            .collect())
    }
}

/// Packet filter that records appended rules
#[derive(Default)]
pub struct FakeFilter {
    rules: Mutex<Vec<FilterRule>>,
    attempts: Mutex<usize>,
    /// Fail the n-th append (0-based)
    fail_at: Option<usize>,
}

impl FakeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(call: usize) -> Self {
        Self {
            fail_at: Some(call),
            ..Default::default()
        }
    }

    pub fn rules(&self) -> Vec<FilterRule> {
        self.rules.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl PacketFilter for FakeFilter {
    async fn append_rule(&self, rule: &FilterRule) -> Result<()> {
        let call = {
            let mut attempts = self.attempts.lock().unwrap();
            let call = *attempts;
            *attempts += 1;
            call
        };

        if self.fail_at == Some(call) {
            return Err(anyhow!("iptables: No chain/target/match by that name."));
        }

        self.rules.lock().unwrap().push(rule.clone());
        Ok(())
    }
}
