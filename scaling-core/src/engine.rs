//! Engine invocation and timing extraction
//!
//! The engine is an opaque child process: it takes the thread count as its only
//! argument, reads its input file from the working directory, and prints a
//! report to stdout. Somewhere in that report is a `label: value unit` line
//! carrying the elapsed computation time.

use crate::error::{HarnessError, HarnessResult};
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Label of the timing line in the engine report
pub const DEFAULT_TIMING_LABEL: &str = "total computation time";

/// Default engine program, relative to the work directory
pub const DEFAULT_ENGINE_PROGRAM: &str = "./cats";

/// Default per-invocation limit
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Source of one elapsed-time measurement per call
pub trait TimingSource {
    /// Run one trial with `threads` worker threads and return elapsed seconds
    fn measure(&mut self, threads: usize) -> HarnessResult<f64>;
}

/// Shared flag that aborts the in-flight engine run when raised
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Extract the elapsed time from a captured engine report
///
/// The first line containing `label` followed by a colon wins. The value is
/// the first whitespace-delimited token after the colon.
pub fn parse_elapsed(lines: &[String], label: &str) -> HarnessResult<f64> {
    let value = lines.iter().find_map(|line| {
        let (head, tail) = line.split_once(':')?;
        head.contains(label).then_some(tail)
    });

    let Some(value) = value else {
        return Err(HarnessError::OutputFormat {
            reason: format!("no line labelled '{label}'"),
            lines: lines.to_vec(),
        });
    };

    let token = value.split_whitespace().next().unwrap_or("");
    match token.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err(HarnessError::OutputFormat {
            reason: format!("'{token}' is not an elapsed time"),
            lines: lines.to_vec(),
        }),
    }
}

/// Process-backed [`TimingSource`]
#[derive(Debug, Clone)]
pub struct EngineProcess {
    program: PathBuf,
    work_dir: PathBuf,
    timing_label: String,
    timeout: Option<Duration>,
    cancel: CancelFlag,
}

impl EngineProcess {
    /// Create a runner for `program`, executed inside `work_dir`
    ///
    /// Relative program paths with a directory component are resolved against
    /// the work directory; bare names are looked up on `PATH`.
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            work_dir: work_dir.into(),
            timing_label: DEFAULT_TIMING_LABEL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_timing_label(mut self, label: impl Into<String>) -> Self {
        self.timing_label = label.into();
        self
    }

    /// Per-invocation limit; `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Program path as it will be spawned
    ///
    /// Paths resolved against the work directory are made absolute, since the
    /// child changes into that directory before the program is looked up.
    pub fn resolved_program(&self) -> PathBuf {
        if self.program.is_relative() && self.program.components().count() > 1 {
            let joined = self.work_dir.join(&self.program);
            std::path::absolute(&joined).unwrap_or(joined)
        } else {
            self.program.clone()
        }
    }

    /// Run the engine once and return every stdout line
    pub fn run(&self, threads: usize) -> HarnessResult<Vec<String>> {
        let program = self.resolved_program();
        log::debug!("spawning {} {}", program.display(), threads);

        let mut command = Command::new(&program);
        // Own process group, so a timeout also reaches anything the engine forked
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command
            .arg(threads.to_string())
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| HarnessError::ProcessLaunch {
                program: program.clone(),
                source,
            })?;

        let reader = match child.stdout.take() {
            Some(stdout) => spawn_line_reader(stdout),
            None => {
                kill_and_reap(&mut child);
                return Err(HarnessError::ProcessLaunch {
                    program,
                    source: std::io::Error::other("engine stdout was not captured"),
                });
            }
        };

        // On timeout or cancel the reader is left detached; a straggler that
        // escaped the process group may still hold the pipe open
        let status = self.wait(&mut child, threads)?;
        let lines = reader.join().unwrap_or_default();

        if !status.success() {
            log::warn!(
                "engine exited with {} for {} thread(s)",
                status,
                threads
            );
        }
        Ok(lines)
    }

    fn wait(&self, child: &mut Child, threads: usize) -> HarnessResult<ExitStatus> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(source) => {
                    kill_and_reap(child);
                    return Err(HarnessError::ProcessLaunch {
                        program: self.resolved_program(),
                        source,
                    });
                }
            }

            if self.cancel.is_cancelled() {
                log::warn!("cancelling engine run with {} thread(s)", threads);
                kill_and_reap(child);
                return Err(HarnessError::Cancelled);
            }

            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    kill_and_reap(child);
                    return Err(HarnessError::Timeout { threads, limit });
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl TimingSource for EngineProcess {
    fn measure(&mut self, threads: usize) -> HarnessResult<f64> {
        let lines = self.run(threads)?;
        parse_elapsed(&lines, &self.timing_label)
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(stream: R) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let mut lines = Vec::new();
        for chunk in BufReader::new(stream).split(b'\n') {
            let mut bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("engine output truncated after {} line(s): {}", lines.len(), e);
                    break;
                }
            };
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            lines.push(String::from_utf8_lossy(&bytes).into_owned());
        }
        lines
    })
}

fn kill_and_reap(child: &mut Child) {
    #[cfg(unix)]
    {
        // The engine leads its own group (see `run`)
        unsafe {
            libc::killpg(child.id() as libc::pid_t, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Copy a freshly built engine binary into the work directory
///
/// Returns the staged path. File permissions are preserved by the copy.
pub fn stage_engine(from: &Path, work_dir: &Path, program: &Path) -> HarnessResult<PathBuf> {
    let file_name = program.file_name().ok_or_else(|| {
        HarnessError::Config(format!(
            "engine program '{}' has no file name",
            program.display()
        ))
    })?;
    let target = work_dir.join(file_name);

    fs::copy(from, &target).map_err(|source| HarnessError::Stage {
        from: from.to_path_buf(),
        source,
    })?;
    log::info!("staged engine {} -> {}", from.display(), target.display());
    Ok(target)
}
