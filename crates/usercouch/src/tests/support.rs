//! Test doubles for the supervisor seams.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::command::CouchCommand;
use crate::env::Env;
use crate::probe::{LivenessProbe, ProbeError};
use crate::process::{Collaborators, Launcher, StartSchedule, SupervisorError};
use crate::reporter::LifecycleReporter;

/// Schedule short enough to keep scenarios fast.
pub fn fast_schedule() -> StartSchedule {
    StartSchedule::new(Duration::from_millis(5), 6)
}

/// What the fake server process does once spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildBehaviour {
    /// Keeps running until signalled.
    Linger,
    /// Exits immediately with a failure status.
    ExitAtOnce,
}

/// Launcher that spawns a stand-in process instead of the server.
#[derive(Clone)]
pub struct FakeLauncher {
    behaviour: Arc<Mutex<ChildBehaviour>>,
    spawns: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(behaviour: ChildBehaviour) -> Self {
        Self {
            behaviour: Arc::new(Mutex::new(behaviour)),
            spawns: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of processes spawned so far.
    pub fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn set_behaviour(&self, behaviour: ChildBehaviour) {
        *self.behaviour.lock().expect("launcher mutex poisoned") = behaviour;
    }
}

impl Launcher for FakeLauncher {
    fn spawn(&self, command: &CouchCommand) -> io::Result<Child> {
        assert_eq!(command.args()[0], "-n");
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let behaviour = *self.behaviour.lock().expect("launcher mutex poisoned");
        let mut stand_in = match behaviour {
            ChildBehaviour::Linger => {
                let mut command = Command::new("sleep");
                command.arg("30");
                command
            }
            ChildBehaviour::ExitAtOnce => Command::new("false"),
        };
        stand_in.stdin(Stdio::null()).stdout(Stdio::null()).spawn()
    }
}

/// Canned probe answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAnswer {
    /// Responds with a welcome document.
    Alive,
    /// Nothing is listening.
    Down,
    /// Responds with an HTTP error status.
    Status(u16),
}

#[derive(Debug)]
struct ProbeState {
    script: VecDeque<ProbeAnswer>,
    fallback: ProbeAnswer,
    calls: usize,
}

/// Probe that replays scripted answers, then repeats a fallback.
#[derive(Clone)]
pub struct ScriptedProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl ScriptedProbe {
    pub fn new(fallback: ProbeAnswer) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProbeState {
                script: VecDeque::new(),
                fallback,
                calls: 0,
            })),
        }
    }

    /// Queues `answer` ahead of the fallback.
    pub fn push(&self, answer: ProbeAnswer) {
        self.state
            .lock()
            .expect("probe mutex poisoned")
            .script
            .push_back(answer);
    }

    pub fn set_fallback(&self, answer: ProbeAnswer) {
        self.state.lock().expect("probe mutex poisoned").fallback = answer;
    }

    pub fn calls(&self) -> usize {
        self.state.lock().expect("probe mutex poisoned").calls
    }
}

/// Welcome document returned by [`ProbeAnswer::Alive`].
pub fn welcome_document() -> Value {
    json!({"couchdb": "Welcome", "version": "1.2.0"})
}

impl LivenessProbe for ScriptedProbe {
    fn welcome(&self, env: &Env) -> Result<Option<Value>, ProbeError> {
        let answer = {
            let mut state = self.state.lock().expect("probe mutex poisoned");
            state.calls += 1;
            let fallback = state.fallback;
            state.script.pop_front().unwrap_or(fallback)
        };
        match answer {
            ProbeAnswer::Alive => Ok(Some(welcome_document())),
            ProbeAnswer::Down => Ok(None),
            ProbeAnswer::Status(status) => Err(ProbeError::Status {
                status,
                reason: String::from("Unauthorized"),
                method: "GET",
                path: String::from("/"),
            }),
        }
    }
}

/// Lifecycle events captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    LockAcquired,
    BootstrapCompleted,
    ServerStarting(u32),
    ServerReady(u32),
    ServerStopped(u32),
    ServerRestarting,
    StartFailed(String),
}

impl LifecycleEvent {
    /// Stable event name matching the structured reporter's `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LockAcquired => "lock_acquired",
            Self::BootstrapCompleted => "bootstrap_completed",
            Self::ServerStarting(_) => "server_starting",
            Self::ServerReady(_) => "server_ready",
            Self::ServerStopped(_) => "server_stopped",
            Self::ServerRestarting => "server_restarting",
            Self::StartFailed(_) => "start_failed",
        }
    }
}

/// Records lifecycle events for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(LifecycleEvent::name).collect()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn lock_acquired(&self, _basedir: &Path) {
        self.record(LifecycleEvent::LockAcquired);
    }

    fn bootstrap_completed(&self, _env: &Env) {
        self.record(LifecycleEvent::BootstrapCompleted);
    }

    fn server_starting(&self, pid: u32) {
        self.record(LifecycleEvent::ServerStarting(pid));
    }

    fn server_ready(&self, pid: u32, _attempts: u32, _elapsed: Duration) {
        self.record(LifecycleEvent::ServerReady(pid));
    }

    fn server_stopped(&self, pid: u32) {
        self.record(LifecycleEvent::ServerStopped(pid));
    }

    fn server_restarting(&self) {
        self.record(LifecycleEvent::ServerRestarting);
    }

    fn start_failed(&self, error: &SupervisorError) {
        self.record(LifecycleEvent::StartFailed(error.to_string()));
    }
}

/// Handles kept by a test after handing collaborators to a supervisor.
pub struct Doubles {
    pub launcher: FakeLauncher,
    pub probe: ScriptedProbe,
    pub reporter: Arc<RecordingReporter>,
}

impl Doubles {
    pub fn new() -> Self {
        Self {
            launcher: FakeLauncher::new(ChildBehaviour::Linger),
            probe: ScriptedProbe::new(ProbeAnswer::Alive),
            reporter: Arc::new(RecordingReporter::default()),
        }
    }

    /// Collaborators sharing state with these doubles.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            launcher: Box::new(self.launcher.clone()),
            probe: Box::new(self.probe.clone()),
            reporter: self.reporter.clone(),
            schedule: fast_schedule(),
        }
    }
}

impl Default for Doubles {
    fn default() -> Self {
        Self::new()
    }
}
