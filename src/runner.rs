//! Run one example against the external engine.
//!
//! Each run gets a private scratch directory holding the same files a packaged
//! bundle holds, and the engine is started with that directory as its working
//! directory so arguments (and therefore diagnostics) never mention temp paths.
use crate::source::{Example, SCRIPT_FILE};
use crate::util::{format_command_line, truncate_bytes};
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const MAX_CAPTURE_BYTES: usize = 4 * 1024 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDOUT_CAPTURE: &str = ".engine-stdout";
const STDERR_CAPTURE: &str = ".engine-stderr";
const SPAWN_ATTEMPTS: u32 = 3;

/// How to call the engine: the program as configured plus the per-example limit.
#[derive(Debug, Clone)]
pub struct EngineInvocation {
    pub program: String,
    pub timeout: Duration,
}

impl EngineInvocation {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Absolute path of the engine executable.
    ///
    /// Programs with a path separator are taken relative to the current
    /// directory; bare names are looked up on `PATH`.
    pub fn resolve(&self) -> Result<PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            let absolute = if program.is_absolute() {
                program.to_path_buf()
            } else {
                std::env::current_dir()
                    .context("resolve current directory")?
                    .join(program)
            };
            if !absolute.is_file() {
                return Err(anyhow!("engine not found at {}", absolute.display()));
            }
            return Ok(absolute);
        }
        which::which(&self.program)
            .with_context(|| format!("engine {:?} not found on PATH", self.program))
    }

    /// Command line shown in reports and launchers, relative to the bundle dir.
    pub fn command_line(&self, example: &Example) -> String {
        format_command_line(&self.program, &example.engine_args())
    }
}

/// Raw outcome of one engine run. Never an error: start failures land in
/// `spawn_error`.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// `None` when killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
    pub spawn_error: Option<String>,
    pub command_line: String,
}

impl ExecutionResult {
    fn not_started(command_line: String, err: anyhow::Error) -> Self {
        Self {
            spawn_error: Some(format!("{err:#}")),
            command_line,
            ..Self::default()
        }
    }
}

/// Write `script.json` and the input documents into `dir`.
pub fn materialize_payloads(dir: &Path, example: &Example) -> Result<()> {
    write_document(&dir.join(SCRIPT_FILE), &example.script)?;
    for (name, input) in example.input_file_names().iter().zip(&example.inputs) {
        write_document(&dir.join(name), input)?;
    }
    Ok(())
}

pub(crate) fn write_document(path: &Path, value: &serde_json::Value) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context("serialize JSON document")?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("write {}", path.display()))
}

/// Execute `example` under `engine.timeout`.
pub fn run(example: &Example, engine: &EngineInvocation) -> ExecutionResult {
    let command_line = engine.command_line(example);
    let program = match engine.resolve() {
        Ok(program) => program,
        Err(err) => return ExecutionResult::not_started(command_line, err),
    };
    let scratch = match tempfile::Builder::new().prefix("exbook-run-").tempdir() {
        Ok(dir) => dir,
        Err(err) => {
            return ExecutionResult::not_started(
                command_line,
                anyhow!(err).context("create scratch directory"),
            )
        }
    };
    match run_in(scratch.path(), &program, example, engine.timeout) {
        Ok(mut result) => {
            result.command_line = command_line;
            result
        }
        Err(err) => ExecutionResult::not_started(command_line, err),
    }
}

fn run_in(
    dir: &Path,
    program: &Path,
    example: &Example,
    timeout: Duration,
) -> Result<ExecutionResult> {
    materialize_payloads(dir, example)?;
    let stdout_path = dir.join(STDOUT_CAPTURE);
    let stderr_path = dir.join(STDERR_CAPTURE);

    let start = Instant::now();
    let mut child = spawn(dir, program, example, &stdout_path, &stderr_path)?;
    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait().context("check engine status")? {
            break status;
        }
        if start.elapsed() > timeout {
            timed_out = true;
            kill_tree(&mut child);
            break child.wait().context("reap timed-out engine")?;
        }
        std::thread::sleep(POLL_INTERVAL);
    };
    let duration = start.elapsed();

    let stdout = read_capture(&stdout_path)?;
    let stderr = read_capture(&stderr_path)?;
    tracing::debug!(
        example = %example.name,
        elapsed_ms = duration.as_millis() as u64,
        exit_code = ?status.code(),
        timed_out,
        "engine finished"
    );
    Ok(ExecutionResult {
        exit_code: exit_code(&status, timed_out),
        stdout,
        stderr,
        duration,
        timed_out,
        spawn_error: None,
        command_line: String::new(),
    })
}

fn spawn(
    dir: &Path,
    program: &Path,
    example: &Example,
    stdout_path: &Path,
    stderr_path: &Path,
) -> Result<Child> {
    let mut attempt = 1;
    loop {
        let stdout = File::create(stdout_path).context("create stdout capture")?;
        let stderr = File::create(stderr_path).context("create stderr capture")?;
        let mut cmd = Command::new(program);
        cmd.args(example.engine_args())
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        match cmd.spawn() {
            Ok(child) => return Ok(child),
            // A freshly written executable can still be open in a forked
            // sibling for a moment.
            #[cfg(unix)]
            Err(err) if err.raw_os_error() == Some(libc::ETXTBSY) && attempt < SPAWN_ATTEMPTS => {
                attempt += 1;
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                return Err(anyhow!(err).context(format!("spawn {}", program.display())));
            }
        }
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) with a negative pid only signals the process group
        // created for this child by `process_group(0)`.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn exit_code(status: &ExitStatus, timed_out: bool) -> Option<i32> {
    if timed_out {
        None
    } else {
        status.code()
    }
}

fn read_capture(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(truncate_bytes(&bytes, MAX_CAPTURE_BYTES))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::source::CliFlag;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;

    fn fake_engine(dir: &Path, body: &str) -> String {
        let path = dir.join("engine.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn example(inputs: Vec<serde_json::Value>) -> Example {
        Example {
            name: "sum".to_string(),
            category: "general".to_string(),
            description: String::new(),
            tutorial: None,
            notes: None,
            script: json!(["+", 15, 27]),
            inputs,
            expected: Some(json!(42)),
            flags: vec![CliFlag::Pretty(2)],
            expect_error: None,
            line: 1,
        }
    }

    #[test]
    fn captures_stdout_and_relative_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), r#"echo "$@"; cat "$2" >&2"#);
        let invocation = EngineInvocation::new(engine.clone(), Duration::from_secs(10));
        let result = run(&example(vec![json!({"a": 1})]), &invocation);

        assert_eq!(result.spawn_error, None);
        assert_eq!(result.exit_code, Some(0));
        assert!(!result.timed_out);
        assert_eq!(result.stdout.trim(), "--pretty=2 script.json input.json");
        assert!(result.stderr.contains("\"+\""));
        assert_eq!(
            result.command_line,
            format!("{engine} --pretty=2 script.json input.json")
        );
    }

    #[test]
    fn nonzero_exit_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), "echo 'boom' >&2; exit 3");
        let invocation = EngineInvocation::new(engine, Duration::from_secs(10));
        let result = run(&example(Vec::new()), &invocation);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stderr.trim(), "boom");
    }

    #[test]
    fn timeout_kills_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_engine(dir.path(), "sleep 30");
        let invocation = EngineInvocation::new(engine, Duration::from_millis(300));
        let start = Instant::now();
        let result = run(&example(Vec::new()), &invocation);
        assert!(result.timed_out);
        assert_eq!(result.exit_code, None);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_leaves_no_engine_processes_behind() {
        fn running(pid: &str) -> bool {
            match fs::read_to_string(format!("/proc/{pid}/stat")) {
                // State follows the parenthesized command name.
                Ok(stat) => stat
                    .rsplit_once(')')
                    .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                    .unwrap_or(false),
                Err(_) => false,
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("child.pid");
        let engine = fake_engine(
            dir.path(),
            &format!("sleep 60 &\necho $! > '{}'\nwait", pidfile.display()),
        );
        let invocation = EngineInvocation::new(engine, Duration::from_secs(1));
        let result = run(&example(Vec::new()), &invocation);
        assert!(result.timed_out);

        let pid = fs::read_to_string(&pidfile).unwrap();
        let pid = pid.trim();
        assert!(!pid.is_empty());
        let deadline = Instant::now() + Duration::from_secs(5);
        while running(pid) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!running(pid), "background process {pid} survived the timeout");
    }

    #[test]
    fn missing_engine_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-engine").display().to_string();
        let invocation = EngineInvocation::new(missing, Duration::from_secs(1));
        let result = run(&example(Vec::new()), &invocation);
        assert!(result.spawn_error.is_some());
        assert_eq!(result.exit_code, None);
    }
}
