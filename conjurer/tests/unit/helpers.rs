//! Shared test helpers: a scripted process runner and scratch spell directories.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use conjurer::errors::ConjureError;
use conjurer::process::runner::{ChunkCallback, Invocation, ProcessOutput, ProcessRunner};
use conjurer::storage::layout::SpellLayout;
use tempfile::TempDir;

// ── Scripted responses ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Scripted {
    Output(ProcessOutput),
    SpawnError(String),
}

pub fn ok(stdout: &str) -> Scripted {
    Scripted::Output(ProcessOutput {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub fn failed(code: i32, stderr: &str) -> Scripted {
    Scripted::Output(ProcessOutput {
        exit_code: code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

pub fn ready() -> Scripted {
    ok(r#"{"isComplete": true, "returnCode": 0, "message": "Applications ready"}"#)
}

pub fn pending(message: &str) -> Scripted {
    ok(&format!(
        r#"{{"isComplete": false, "returnCode": 0, "message": "{}"}}"#,
        message
    ))
}

pub fn broken(return_code: i64, message: &str) -> Scripted {
    ok(&format!(
        r#"{{"isComplete": false, "returnCode": {}, "message": "{}"}}"#,
        return_code, message
    ))
}

// ── Scripted runner ──────────────────────────────────────────────────────────

/// Answers each program from its own queue of responses. The last response
/// of a queue repeats forever.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<PathBuf, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, program: impl AsRef<Path>, responses: Vec<Scripted>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(program.as_ref().to_path_buf(), responses.into());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: impl AsRef<Path>) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program.as_ref())
            .collect()
    }

    fn next(&self, invocation: &Invocation) -> Result<ProcessOutput, ConjureError> {
        self.calls.lock().unwrap().push(invocation.clone());

        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&invocation.program).ok_or_else(|| {
            ConjureError::Process(format!("no scripted response for {}", invocation))
        })?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match response {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::SpawnError(reason)) => Err(ConjureError::Process(reason)),
            None => Err(ConjureError::Process(format!("no response left for {}", invocation))),
        }
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ConjureError> {
        self.next(invocation)
    }

    async fn run_streaming(
        &self,
        invocation: &Invocation,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<ProcessOutput, ConjureError> {
        let output = self.next(invocation)?;
        on_chunk(&output.stdout);
        Ok(output)
    }
}

// ── Scratch spells ───────────────────────────────────────────────────────────

pub struct SpellFixture {
    pub dir: TempDir,
}

impl SpellFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(SpellLayout::new(dir.path()).steps_dir().path()).unwrap();
        Self { dir }
    }

    pub fn layout(&self) -> SpellLayout {
        SpellLayout::new(self.dir.path())
    }

    pub fn steps_dir(&self) -> PathBuf {
        self.layout().steps_dir().path().to_path_buf()
    }

    pub fn deploy_done(&self) -> PathBuf {
        self.steps_dir().join("00_deploy-done")
    }

    pub fn step_script(&self, name: &str) -> PathBuf {
        self.steps_dir().join(name)
    }

    pub fn with_deploy_done(self) -> Self {
        write_executable(&self.deploy_done(), "#!/bin/sh\necho '{\"isComplete\": true}'\n");
        self
    }

    /// Write `<name>.yaml` plus an executable `<name>` script
    pub fn with_step(self, name: &str, metadata: &str) -> Self {
        std::fs::write(self.steps_dir().join(format!("{}.yaml", name)), metadata).unwrap();
        write_executable(&self.step_script(name), "#!/bin/sh\necho done\n");
        self
    }

    /// Metadata without a matching executable
    pub fn with_orphan_metadata(self, name: &str, metadata: &str) -> Self {
        std::fs::write(self.steps_dir().join(format!("{}.yaml", name)), metadata).unwrap();
        self
    }
}

pub fn step_yaml(title: &str, viewable: bool) -> String {
    format!(
        "title: {}\ndescription: {} step\nviewable: {}\n",
        title, title, viewable
    )
}

pub fn write_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
