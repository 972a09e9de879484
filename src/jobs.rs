use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// A background pipeline whose stages have not all been reaped yet.
#[derive(Debug)]
pub struct Job {
    pub id: u32,
    pub pids: Vec<Pid>,
    pub command: String,
}

/// Background pipelines, reaped without blocking between prompts so no
/// zombies pile up while the shell runs.
pub struct JobManager {
    jobs: Vec<Job>,
    next_id: u32,
}

impl JobManager {
    pub fn new() -> Self {
        JobManager {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add_job(&mut self, pids: Vec<Pid>, command: String) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        if let Some(last) = pids.last() {
            println!("[{}] {}", id, last);
        }
        self.jobs.push(Job { id, pids, command });
        id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Reap finished stages; report and forget jobs with none left.
    pub fn update_jobs(&mut self) -> Vec<Job> {
        for job in &mut self.jobs {
            job.pids.retain(|pid| !reaped(*pid));
        }

        let (done, running): (Vec<Job>, Vec<Job>) =
            self.jobs.drain(..).partition(|job| job.pids.is_empty());
        self.jobs = running;

        for job in &done {
            println!("[{}] Done {}", job.id, job.command);
        }
        done
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

fn reaped(pid: Pid) -> bool {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return false,
            Ok(status) => {
                debug!("background {} finished: {:?}", pid, status);
                return true;
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return true,
            Err(e) => {
                warn!("waitpid({}) failed: {}", pid, e);
                return false;
            }
        }
    }
}
