use std::collections::HashMap;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sysinfo::{Pid, Signal, System};
use tokio::process::Command;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::JAVA_DOWNLOAD_PAGE;
use crate::errors::{LauncherError, Result};
use crate::models::LifecycleClass;
use crate::services::ui_bridge::UserPrompt;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(target_os = "windows")]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(target_os = "windows")]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

pub type ProcessId = u64;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedProcess {
    pub id: ProcessId,
    pub pid: Option<u32>,
    pub class: LifecycleClass,
    pub program: String,
    pub started_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorEvent {
    Exited {
        id: ProcessId,
        class: LifecycleClass,
        code: Option<i32>,
    },
    /// A `jcef` process ended; the account file may have new entries.
    SubLauncherExited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShutdownPolicy {
    LeaveRunning,
    TerminateThenKill,
}

fn shutdown_policy(class: LifecycleClass) -> ShutdownPolicy {
    match class {
        LifecycleClass::Client => ShutdownPolicy::LeaveRunning,
        LifecycleClass::Jcef | LifecycleClass::Other => ShutdownPolicy::TerminateThenKill,
    }
}

/// Three disjoint collections keyed by handle id. A handle lives in exactly
/// one of them from spawn until its exit is observed.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    client: HashMap<ProcessId, TrackedProcess>,
    jcef: HashMap<ProcessId, TrackedProcess>,
    other: HashMap<ProcessId, TrackedProcess>,
}

impl ProcessRegistry {
    fn collection(&self, class: LifecycleClass) -> &HashMap<ProcessId, TrackedProcess> {
        match class {
            LifecycleClass::Client => &self.client,
            LifecycleClass::Jcef => &self.jcef,
            LifecycleClass::Other => &self.other,
        }
    }

    fn collection_mut(&mut self, class: LifecycleClass) -> &mut HashMap<ProcessId, TrackedProcess> {
        match class {
            LifecycleClass::Client => &mut self.client,
            LifecycleClass::Jcef => &mut self.jcef,
            LifecycleClass::Other => &mut self.other,
        }
    }

    pub fn insert(&mut self, process: TrackedProcess) {
        self.remove(process.id);
        self.collection_mut(process.class).insert(process.id, process);
    }

    /// Drops `id` from every collection.
    pub fn remove(&mut self, id: ProcessId) -> Option<TrackedProcess> {
        let mut removed = None;
        for class in LifecycleClass::ALL {
            if let Some(process) = self.collection_mut(class).remove(&id) {
                removed = Some(process);
            }
        }
        removed
    }

    pub fn iter_class(&self, class: LifecycleClass) -> impl Iterator<Item = &TrackedProcess> {
        self.collection(class).values()
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        LifecycleClass::ALL
            .iter()
            .any(|class| self.collection(*class).contains_key(&id))
    }

    pub fn occurrences(&self, id: ProcessId) -> usize {
        LifecycleClass::ALL
            .iter()
            .filter(|class| self.collection(**class).contains_key(&id))
            .count()
    }

    pub fn len(&self) -> usize {
        self.client.len() + self.jcef.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Delivers OS signals by pid.
pub trait ProcessSignaller: Send + Sync {
    fn terminate(&self, pid: u32) -> bool;
    fn kill(&self, pid: u32) -> bool;
    /// Kills untracked helpers; returns how many were killed.
    fn sweep_strays(&self) -> usize;
}

/// Signals through `sysinfo`. Platforms without SIGTERM get a hard kill.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemSignaller;

impl ProcessSignaller for SystemSignaller {
    fn terminate(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        if !system.refresh_process(pid) {
            return false;
        }
        system
            .process(pid)
            .map(|process| process.kill_with(Signal::Term).unwrap_or_else(|| process.kill()))
            .unwrap_or(false)
    }

    fn kill(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        if !system.refresh_process(pid) {
            return false;
        }
        system.process(pid).map(|process| process.kill()).unwrap_or(false)
    }

    fn sweep_strays(&self) -> usize {
        sweep_stray_helpers()
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownReport {
    pub terminated: usize,
    pub killed: usize,
    pub left_running: usize,
    pub strays_killed: usize,
}

#[derive(Clone)]
pub struct ProcessSupervisor {
    registry: Arc<Mutex<ProcessRegistry>>,
    next_id: Arc<AtomicU64>,
    signaller: Arc<dyn ProcessSignaller>,
    prompt: Arc<dyn UserPrompt>,
    events: broadcast::Sender<SupervisorEvent>,
    shutdown_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(
        signaller: Arc<dyn ProcessSignaller>,
        prompt: Arc<dyn UserPrompt>,
        shutdown_grace: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            registry: Arc::new(Mutex::new(ProcessRegistry::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            signaller,
            prompt,
            events,
            shutdown_grace,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Vec<TrackedProcess> {
        let registry = self.lock();
        let mut items: Vec<TrackedProcess> = LifecycleClass::ALL
            .iter()
            .flat_map(|class| registry.iter_class(*class).cloned().collect::<Vec<_>>())
            .collect();
        items.sort_by_key(|process| process.id);
        items
    }

    pub fn is_tracked(&self, id: ProcessId) -> bool {
        self.lock().contains(id)
    }

    /// Checks that `java` starts and reports a version.
    pub async fn runtime_available(java: &Path) -> bool {
        let mut std_probe = std::process::Command::new(java);
        std_probe
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(target_os = "windows")]
        std_probe.creation_flags(CREATE_NO_WINDOW);
        let mut probe = Command::from(std_probe);
        probe.kill_on_drop(true);

        match probe.status().await {
            Ok(status) => status.success(),
            Err(err) => {
                warn!(java = %java.display(), error = %err, "java probe failed");
                false
            }
        }
    }

    /// Probes the Java runtime, then spawns it with `args`. A missing
    /// runtime offers the download page and aborts the launch.
    pub async fn launch(
        &self,
        java: &Path,
        args: &[String],
        class: LifecycleClass,
    ) -> Result<TrackedProcess> {
        if !Self::runtime_available(java).await {
            let open = self
                .prompt
                .offer_download_page(
                    "Java Not Found",
                    "Java is required. Download now?",
                    JAVA_DOWNLOAD_PAGE,
                )
                .await;
            if open {
                self.prompt.open_external(JAVA_DOWNLOAD_PAGE);
            }
            return Err(LauncherError::Precondition(format!(
                "Java is required to launch. Install it from {JAVA_DOWNLOAD_PAGE}"
            )));
        }
        self.spawn(java, args, class)
    }

    /// Starts `program` and tracks it under `class` until it exits.
    pub fn spawn(
        &self,
        program: &Path,
        args: &[String],
        class: LifecycleClass,
    ) -> Result<TrackedProcess> {
        let mut std_command = std::process::Command::new(program);
        std_command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match class {
            LifecycleClass::Client => {
                #[cfg(unix)]
                std_command.process_group(0);
                #[cfg(target_os = "windows")]
                std_command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
            }
            LifecycleClass::Jcef | LifecycleClass::Other => {
                #[cfg(target_os = "windows")]
                std_command.creation_flags(CREATE_NO_WINDOW);
            }
        }
        let mut command = Command::from(std_command);
        command.kill_on_drop(class != LifecycleClass::Client);

        info!(program = %program.display(), args = ?args, class = class.as_str(), "spawning process");
        let mut child = command.spawn().map_err(|err| {
            LauncherError::Process(format!("failed to start {}: {err}", program.display()))
        })?;

        let tracked = TrackedProcess {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            pid: child.id(),
            class,
            program: program.display().to_string(),
            started_at: Utc::now().timestamp(),
        };
        self.lock().insert(tracked.clone());

        let registry = self.registry.clone();
        let events = self.events.clone();
        let id = tracked.id;
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    error!(id, error = %err, "failed waiting on process");
                    None
                }
            };
            let removed = lock_registry(&registry).remove(id);
            info!(id, class = class.as_str(), ?code, tracked = removed.is_some(), "process exited");
            if class == LifecycleClass::Jcef {
                let _ = events.send(SupervisorEvent::SubLauncherExited);
            }
            let _ = events.send(SupervisorEvent::Exited { id, class, code });
        });

        Ok(tracked)
    }

    /// Signals every `jcef` and `other` process, escalates after the grace
    /// period, and sweeps helpers that escaped tracking. `client` processes
    /// are never signalled.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let targets: Vec<TrackedProcess> = {
            let registry = self.lock();
            let mut targets = Vec::new();
            for class in LifecycleClass::ALL {
                match shutdown_policy(class) {
                    ShutdownPolicy::LeaveRunning => {
                        report.left_running += registry.iter_class(class).count();
                    }
                    ShutdownPolicy::TerminateThenKill => {
                        targets.extend(registry.iter_class(class).cloned());
                    }
                }
            }
            targets
        };

        info!(
            targets = targets.len(),
            left_running = report.left_running,
            "shutting down child processes"
        );
        for process in &targets {
            if let Some(pid) = process.pid {
                if self.signaller.terminate(pid) {
                    report.terminated += 1;
                }
            }
        }

        if !targets.is_empty() {
            tokio::time::sleep(self.shutdown_grace).await;
            for process in &targets {
                if !self.is_tracked(process.id) {
                    continue;
                }
                if let Some(pid) = process.pid {
                    warn!(id = process.id, pid, "process ignored termination, killing");
                    if self.signaller.kill(pid) {
                        report.killed += 1;
                    }
                }
            }
        }

        let signaller = self.signaller.clone();
        report.strays_killed = tokio::task::spawn_blocking(move || signaller.sweep_strays())
            .await
            .unwrap_or(0);
        report
    }

    fn lock(&self) -> MutexGuard<'_, ProcessRegistry> {
        lock_registry(&self.registry)
    }
}

fn lock_registry(registry: &Mutex<ProcessRegistry>) -> MutexGuard<'_, ProcessRegistry> {
    match registry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Embedded browser helpers, or Java processes running the sub-launcher.
pub fn is_stray_helper(name: &str, cmd: &[String]) -> bool {
    let name = name.to_ascii_lowercase();
    if name.contains("jcef_helper") {
        return true;
    }
    let is_java = matches!(name.as_str(), "java" | "javaw" | "java.exe" | "javaw.exe");
    is_java
        && cmd.iter().any(|arg| {
            let arg = arg.to_ascii_lowercase();
            arg.contains("jcef") || arg.contains("microbot-launcher")
        })
}

/// Kills untracked helpers left behind by an earlier run.
pub fn sweep_stray_helpers() -> usize {
    let own_pid = std::process::id();
    let mut system = System::new();
    system.refresh_processes();
    let mut killed = 0;
    for (pid, process) in system.processes() {
        if pid.as_u32() == own_pid || !is_stray_helper(process.name(), process.cmd()) {
            continue;
        }
        if process.kill() {
            info!(pid = pid.as_u32(), name = process.name(), "killed stray helper");
            killed += 1;
        }
    }
    killed
}
