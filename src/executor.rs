//! Runs a parsed pipeline as one OS process per stage.
//!
//! Everything a child needs (argv, environment, pipes, redirection files)
//! is prepared before the first fork, so a child only rewires descriptors
//! and execs.

use std::env;
use std::ffi::{CString, OsStr};
use std::fs;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use colored::Colorize;
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execve, fork, pipe2, ForkResult, Pid};

use crate::command::{Command, Pipeline};
use crate::error::{Result, ShellError};
use crate::jobs::JobManager;
use crate::redirects::Redirections;
use crate::report::{ReportChannel, REPORT_FD_ENV};

/// Outcome of handling one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    RequestExit,
    CommandNotFound,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::RequestExit => 1,
            ExitStatus::CommandNotFound => 2,
        }
    }
}

/// A stage ready to fork: resolved program, argv and opened files.
struct PreparedStage {
    name: String,
    program: CString,
    argv: Vec<CString>,
    redirections: Redirections,
}

/// Children of a pipeline that has been started but not reaped.
pub struct Launched {
    pub pids: Vec<Pid>,
    pub pipes: usize,
    report: Option<ReportChannel>,
}

/// What a foreground pipeline left behind once every stage was reaped.
#[derive(Debug)]
pub struct Finished {
    pub statuses: Vec<WaitStatus>,
    pub report: Option<PathBuf>,
}

impl Launched {
    /// Block until every stage has exited, then collect the reported
    /// directory, if any. Every pid is waited for even when one wait
    /// fails; the first failure is returned after that.
    pub fn wait(self) -> Result<Finished> {
        let mut statuses = Vec::with_capacity(self.pids.len());
        let mut failure = None;
        for &pid in &self.pids {
            match wait_for(pid) {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    warn!("waiting for {} failed: {}", pid, e);
                    failure.get_or_insert(e);
                }
            }
        }
        let report = self.report.and_then(ReportChannel::receive);
        match failure {
            Some(e) => Err(e),
            None => Ok(Finished { statuses, report }),
        }
    }
}

pub struct Executor {
    shell_name: String,
    search_path: Vec<PathBuf>,
    jobs: JobManager,
}

impl Executor {
    pub fn new(shell_name: &str, search_path: Vec<PathBuf>) -> Self {
        Self {
            shell_name: shell_name.to_string(),
            search_path,
            jobs: JobManager::new(),
        }
    }

    /// Run the pipeline; foreground pipelines are waited for, background
    /// ones are handed to the job table.
    pub fn execute(&mut self, pipeline: &Pipeline) -> Result<ExitStatus> {
        let Some(launched) = self.launch(pipeline)? else {
            return Ok(ExitStatus::CommandNotFound);
        };

        debug!(
            "launched {} processes over {} pipes",
            launched.pids.len(),
            launched.pipes
        );

        if pipeline.background {
            self.jobs.add_job(launched.pids, pipeline.to_string());
            return Ok(ExitStatus::Success);
        }

        let finished = launched.wait()?;
        debug!("pipeline finished: {:?}", finished.statuses);
        if let Some(dir) = finished.report {
            info!("changing directory to reported {}", dir.display());
            env::set_current_dir(&dir)
                .map_err(|source| ShellError::ChangeDir { path: dir, source })?;
        }
        Ok(ExitStatus::Success)
    }

    /// Reap finished background pipelines without blocking.
    pub fn reap_background(&mut self) {
        self.jobs.update_jobs();
    }

    pub fn background_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Resolve, wire and fork every stage. `None` when some stage names a
    /// program that does not exist; nothing is forked then.
    pub fn launch(&self, pipeline: &Pipeline) -> Result<Option<Launched>> {
        let Some(stages) = self.prepare(pipeline)? else {
            return Ok(None);
        };

        let mut report = if pipeline.background {
            None
        } else {
            Some(ReportChannel::open()?)
        };
        let envp = environment(report.as_ref().and_then(ReportChannel::writer_fd));

        let launched = spawn(stages, &envp, &self.shell_name);
        // the shell never writes to the channel
        if let Some(channel) = report.as_mut() {
            channel.close_writer();
        }
        let (pids, pipes) = launched?;

        Ok(Some(Launched {
            pids,
            pipes,
            report,
        }))
    }

    fn prepare(&self, pipeline: &Pipeline) -> Result<Option<Vec<PreparedStage>>> {
        let mut resolved = Vec::with_capacity(pipeline.len());
        let mut missing = false;
        for cmd in pipeline {
            match resolve(&cmd.name, &self.search_path) {
                Some(path) => {
                    debug!("{} resolved to {}", cmd.name, path.display());
                    resolved.push(path);
                }
                None => {
                    report_not_found(&self.shell_name, &cmd.name);
                    missing = true;
                }
            }
        }
        if missing {
            return Ok(None);
        }

        let mut stages = Vec::with_capacity(pipeline.len());
        for (cmd, path) in pipeline.iter().zip(resolved) {
            stages.push(PreparedStage {
                name: cmd.name.clone(),
                program: c_string(path.as_os_str())?,
                argv: argv(cmd)?,
                redirections: Redirections::open(cmd)?,
            });
        }
        Ok(Some(stages))
    }
}

/// First executable regular file called `name` along `search_path`. Names
/// with a `/` are taken as paths and not searched.
pub fn resolve(name: &str, search_path: &[PathBuf]) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable_file(&path).then_some(path);
    }
    search_path
        .iter()
        .map(|dir| dir.join(name))
        .find(|path| is_executable_file(path))
}

fn is_executable_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn report_not_found(shell_name: &str, name: &str) {
    let message = format!("{}: {}: command not found", shell_name, name);
    let _ = writeln!(io::stderr(), "{}", message.red());
}

fn c_string(value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes())
        .map_err(|e| ShellError::Io(io::Error::new(io::ErrorKind::InvalidInput, e)))
}

/// `[name] + args`; the exec call supplies the terminator.
fn argv(cmd: &Command) -> Result<Vec<CString>> {
    std::iter::once(&cmd.name)
        .chain(&cmd.args)
        .map(|s| c_string(OsStr::new(s)))
        .collect()
}

/// The shell's environment plus the report descriptor, as `KEY=VALUE`.
fn environment(report_fd: Option<RawFd>) -> Vec<CString> {
    let mut envp: Vec<CString> = env::vars_os()
        .filter(|(key, _)| key != REPORT_FD_ENV)
        .filter_map(|(key, value)| {
            let mut entry = key.as_bytes().to_vec();
            entry.push(b'=');
            entry.extend_from_slice(value.as_bytes());
            CString::new(entry).ok()
        })
        .collect();
    if let Some(fd) = report_fd {
        if let Ok(entry) = CString::new(format!("{}={}", REPORT_FD_ENV, fd)) {
            envp.push(entry);
        }
    }
    envp
}

/// Fork one child per stage, left to right, joined by `stages - 1` pipes.
///
/// On a failed fork the children already started are reaped before the
/// error is returned.
fn spawn(
    stages: Vec<PreparedStage>,
    envp: &[CString],
    shell_name: &str,
) -> Result<(Vec<Pid>, usize)> {
    let count = stages.len();
    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(count.saturating_sub(1));
    for _ in 1..count {
        pipes.push(pipe2(OFlag::O_CLOEXEC)?);
    }
    let pipe_count = pipes.len();

    let mut pids = Vec::with_capacity(count);
    let mut remaining = stages.into_iter().enumerate();
    while let Some((i, stage)) = remaining.next() {
        let pipe_in = i.checked_sub(1).map(|prev| pipes[prev].0.as_raw_fd());
        let pipe_out = pipes.get(i).map(|(_, write)| write.as_raw_fd());

        // SAFETY: the child only rewires descriptors and execs (or exits)
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                drop(remaining);
                run_child(stage, pipe_in, pipe_out, pipes, envp, shell_name)
            }
            Ok(ForkResult::Parent { child }) => {
                debug!("spawned {} as pid {}", stage.name, child);
                pids.push(child);
            }
            Err(e) => {
                drop(pipes);
                for pid in pids {
                    let _ = wait_for(pid);
                }
                return Err(e.into());
            }
        }
    }

    Ok((pids, pipe_count))
}

/// Child side of a stage: a file redirection beats the pipe for the same
/// direction. Never returns.
fn run_child(
    stage: PreparedStage,
    pipe_in: Option<RawFd>,
    pipe_out: Option<RawFd>,
    pipes: Vec<(OwnedFd, OwnedFd)>,
    envp: &[CString],
    shell_name: &str,
) -> ! {
    let PreparedStage {
        name,
        program,
        argv,
        redirections,
    } = stage;

    let stdin = redirections.stdin.as_ref().map(AsRawFd::as_raw_fd).or(pipe_in);
    let stdout = redirections.stdout.as_ref().map(AsRawFd::as_raw_fd).or(pipe_out);

    let wired = stdin
        .map_or(Ok(()), |fd| redirect(fd, libc::STDIN_FILENO))
        .and_then(|_| stdout.map_or(Ok(()), |fd| redirect(fd, libc::STDOUT_FILENO)));
    if let Err(e) = wired {
        let _ = writeln!(io::stderr(), "{}: {}: {}", shell_name, name, e);
        exit_child(1);
    }

    // only the duplicates on 0 and 1 stay open
    drop(pipes);
    drop(redirections);

    // SAFETY: restoring the default disposition the shell overrode
    unsafe {
        let _ = signal(Signal::SIGINT, SigHandler::SigDfl);
    }

    if let Err(errno) = execve(&program, &argv, envp) {
        debug!("execve {:?} failed: {}", program, errno);
    }
    report_not_found(shell_name, &name);
    exit_child(ExitStatus::CommandNotFound.code())
}

fn redirect(from: RawFd, to: RawFd) -> nix::Result<()> {
    // SAFETY: both descriptors are valid in the child
    Errno::result(unsafe { libc::dup2(from, to) }).map(drop)
}

fn exit_child(code: i32) -> ! {
    // SAFETY: _exit skips atexit handlers and stdio buffers copied from the shell
    unsafe { libc::_exit(code) }
}

fn wait_for(pid: Pid) -> Result<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                debug!("reaped {}: {:?}", pid, status);
                return Ok(status);
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
