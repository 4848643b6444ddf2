//! Isolated execution supervisor for solver workers.
//!
//! Runs a solver worker as a separate OS process under a wall-clock
//! deadline and a resident-memory ceiling. A runaway solve is killed, not
//! flagged: the process is terminated and its memory reclaimed
//! deterministically, and the caller receives a structured error carrying
//! the elapsed time and the breached ceiling.

use crate::error::{ExitCode, SolverError, SolverResult};
use crate::problem::MipProblem;
use crate::solution::MipSolution;
use crate::WORKER_BINARY;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Memory-poll cadence while the worker runs.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Resource ceilings for one supervised solve.
///
/// Per-invocation configuration, never global state: each solve derives its
/// own deadline from the model it carries.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Wall-clock ceiling. `None` derives the deadline from model size via
    /// [`deadline_for`].
    pub timeout: Option<Duration>,
    /// Resident-memory ceiling for the worker process (MB).
    pub memory_limit_mb: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            memory_limit_mb: 2048,
        }
    }
}

/// Wall-clock deadline derived from model size:
/// 60 s base + 100 ms per variable + 200 ms per constraint, clamped to
/// [120 s, 600 s].
pub fn deadline_for(problem: &MipProblem) -> Duration {
    let millis = 60_000
        + 100 * problem.num_variables() as u64
        + 200 * problem.num_constraints() as u64;
    Duration::from_millis(millis.clamp(120_000, 600_000))
}

/// A solver worker handle.
///
/// Manages the lifecycle of one worker subprocess, streaming the problem
/// as JSON over stdin and reading the solution from stdout. At most one
/// child process is live per call to [`SolverProcess::solve`], and the
/// child is killed on every early-exit path (`kill_on_drop` backstops the
/// explicit kills).
pub struct SolverProcess {
    binary_path: PathBuf,
    config: SupervisorConfig,
}

impl SolverProcess {
    /// Create a supervisor for the worker at `binary_path`.
    pub fn new(binary_path: PathBuf, config: SupervisorConfig) -> Self {
        Self {
            binary_path,
            config,
        }
    }

    /// Find the worker binary in standard locations.
    ///
    /// Search order:
    /// 1. ~/.netplan/solvers/netplan-mip
    /// 2. System PATH
    pub fn find_binary() -> SolverResult<PathBuf> {
        if let Some(home) = dirs::home_dir() {
            let installed = home.join(".netplan").join("solvers").join(WORKER_BINARY);
            if installed.exists() {
                return Ok(installed);
            }
        }

        if let Ok(path) = which::which(WORKER_BINARY) {
            return Ok(path);
        }

        Err(SolverError::WorkerNotInstalled {
            hint: WORKER_BINARY.to_string(),
        })
    }

    /// Get the binary path.
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    /// Solve a problem in an isolated worker process.
    ///
    /// This method:
    /// 1. Spawns the worker binary
    /// 2. Writes the problem to stdin as JSON
    /// 3. Reads the solution from stdout as JSON
    /// 4. Enforces the wall-clock deadline and memory ceiling throughout
    pub async fn solve(&self, problem: &MipProblem) -> SolverResult<MipSolution> {
        let problem_bytes = serde_json::to_vec(problem)?;
        let deadline = self.config.timeout.unwrap_or_else(|| deadline_for(problem));
        let start = Instant::now();

        let mut child = Command::new(&self.binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SolverError::ProcessStart)?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        let mut stdout = child.stdout.take().expect("stdout was piped");
        let mut stderr = child.stderr.take().expect("stderr was piped");

        debug!(
            binary = %self.binary_path.display(),
            deadline_secs = deadline.as_secs(),
            memory_limit_mb = self.config.memory_limit_mb,
            "spawned solver worker"
        );

        // Write-then-read as one future so the deadline also covers a
        // worker that never drains its stdin.
        let exchange = async {
            stdin
                .write_all(&problem_bytes)
                .await
                .map_err(|e| SolverError::Ipc(format!("Failed to write problem: {}", e)))?;
            drop(stdin); // Close stdin to signal end of input

            let mut solution_bytes = Vec::new();
            let mut stderr_bytes = Vec::new();
            let (out, err) = tokio::join!(
                stdout.read_to_end(&mut solution_bytes),
                stderr.read_to_end(&mut stderr_bytes)
            );
            out.map_err(|e| SolverError::Ipc(format!("Failed to read solution: {}", e)))?;
            let _ = err;
            Ok::<_, SolverError>((solution_bytes, stderr_bytes))
        };
        tokio::pin!(exchange);

        let pid = child.id();
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        let mut peak_memory_mb: Option<u64> = None;

        let (solution_bytes, stderr_bytes) = loop {
            tokio::select! {
                result = &mut exchange => break result?,
                _ = poll.tick() => {
                    let elapsed = start.elapsed();
                    if elapsed >= deadline {
                        warn!(elapsed_secs = elapsed.as_secs(), "worker deadline breached, killing");
                        let _ = child.kill().await;
                        return Err(SolverError::Timeout { limit: deadline, elapsed });
                    }
                    if let Some(rss_mb) = pid.and_then(resident_memory_mb) {
                        peak_memory_mb = Some(peak_memory_mb.unwrap_or(0).max(rss_mb));
                        if rss_mb > self.config.memory_limit_mb {
                            warn!(rss_mb, "worker memory ceiling breached, killing");
                            let _ = child.kill().await;
                            return Err(SolverError::MemoryLimit {
                                limit_mb: self.config.memory_limit_mb,
                                observed_mb: rss_mb,
                                elapsed,
                            });
                        }
                    }
                }
            }
        };

        // The exit wait stays under the same deadline: a worker that
        // closes its pipes but lingers is killed, not awaited forever.
        let remaining = deadline.saturating_sub(start.elapsed());
        let status = match tokio::time::timeout(remaining, child.wait()).await {
            Ok(waited) => waited.map_err(SolverError::ProcessStart)?,
            Err(_) => {
                let elapsed = start.elapsed();
                warn!(elapsed_secs = elapsed.as_secs(), "worker lingered past deadline, killing");
                let _ = child.kill().await;
                return Err(SolverError::Timeout {
                    limit: deadline,
                    elapsed,
                });
            }
        };
        let exit_code = ExitCode::from_raw(status.code().unwrap_or(-1));

        if !exit_code.is_success() {
            let stderr_str = String::from_utf8_lossy(&stderr_bytes);
            return Err(SolverError::ProcessFailed {
                exit_code,
                message: stderr_str.to_string(),
            });
        }

        if solution_bytes.is_empty() {
            return Err(SolverError::Ipc("Empty solution from worker".to_string()));
        }

        let mut solution: MipSolution = serde_json::from_slice(&solution_bytes)?;
        if solution.solve_time_ms == 0 {
            solution.solve_time_ms = start.elapsed().as_millis() as i64;
        }
        if solution.peak_memory_mb.is_none() {
            solution.peak_memory_mb = peak_memory_mb;
        }
        Ok(solution)
    }

    /// Solve a problem synchronously (blocking).
    ///
    /// Runs [`solve`](Self::solve) on a private current-thread runtime,
    /// suitable for integration with synchronous code.
    pub fn solve_blocking(&self, problem: &MipProblem) -> SolverResult<MipSolution> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SolverError::Io)?;
        runtime.block_on(self.solve(problem))
    }
}

/// Resident set size of a process in MB, when the platform exposes it.
#[cfg(target_os = "linux")]
fn resident_memory_mb(pid: u32) -> Option<u64> {
    let statm = std::fs::read_to_string(format!("/proc/{}/statm", pid)).ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4096 / (1024 * 1024))
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_mb(_pid: u32) -> Option<u64> {
    None
}

/// Check if the worker binary is installed and reachable.
pub fn is_worker_installed() -> bool {
    SolverProcess::find_binary().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintSense;
    use crate::solution::SolutionStatus;
    use std::io::Write;

    fn tiny_problem() -> MipProblem {
        let mut p = MipProblem::new();
        let x = p.add_continuous("x", 0.0, 10.0, 1.0);
        p.add_constraint("floor", vec![(x, 1.0)], ConstraintSense::Ge, 2.0);
        p
    }

    /// Write an executable shell script posing as a solver worker.
    fn fake_worker(body: &str) -> (tempfile::TempDir, PathBuf) {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fake-worker.sh");
        let mut f = std::fs::File::create(&path).expect("create script");
        writeln!(f, "#!/bin/sh").unwrap();
        writeln!(f, "{}", body).unwrap();
        drop(f);
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        (dir, path)
    }

    #[test]
    fn test_deadline_scales_with_model_size() {
        // Tiny model clamps to the 120 s floor.
        assert_eq!(deadline_for(&tiny_problem()), Duration::from_secs(120));

        // 1000 variables + 500 constraints: 60 + 100 + 100 = 260 s.
        let mut big = MipProblem::new();
        for i in 0..1000 {
            big.add_binary(format!("x[{}]", i), 1.0);
        }
        for i in 0..500 {
            big.add_constraint(format!("c[{}]", i), vec![(i, 1.0)], ConstraintSense::Le, 1.0);
        }
        assert_eq!(deadline_for(&big), Duration::from_secs(260));

        // Absurd model clamps to the 600 s ceiling.
        let mut huge = MipProblem::new();
        for i in 0..100_000 {
            huge.add_binary(format!("x[{}]", i), 1.0);
        }
        assert_eq!(deadline_for(&huge), Duration::from_secs(600));
    }

    #[test]
    fn test_timeout_kills_hung_worker() {
        // Worker reads nothing and sleeps forever; a 2 s ceiling must
        // produce a Timeout well before the sleep finishes.
        let (_dir, path) = fake_worker("exec sleep 600");
        let process = SolverProcess::new(
            path,
            SupervisorConfig {
                timeout: Some(Duration::from_secs(2)),
                ..SupervisorConfig::default()
            },
        );

        let start = Instant::now();
        let err = process.solve_blocking(&tiny_problem()).unwrap_err();
        let wall = start.elapsed();

        match err {
            SolverError::Timeout { elapsed, .. } => {
                assert!(elapsed >= Duration::from_secs(2));
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(wall < Duration::from_millis(2500), "kill took {:?}", wall);
    }

    #[test]
    fn test_timeout_kills_lingering_worker_with_closed_pipes() {
        // Worker drains stdin and closes stdout/stderr, then lingers.
        // The exit wait must stay under the deadline too.
        let (_dir, path) = fake_worker("cat >/dev/null\nexec 1>&- 2>&-\nexec sleep 600");
        let process = SolverProcess::new(
            path,
            SupervisorConfig {
                timeout: Some(Duration::from_secs(2)),
                ..SupervisorConfig::default()
            },
        );

        let start = Instant::now();
        let err = process.solve_blocking(&tiny_problem()).unwrap_err();
        let wall = start.elapsed();

        assert!(matches!(err, SolverError::Timeout { .. }), "got {:?}", err);
        assert!(wall < Duration::from_millis(2500), "kill took {:?}", wall);
    }

    #[test]
    fn test_successful_exchange() {
        let canned = serde_json::to_string(&MipSolution::optimal(2.0, vec![2.0], 7)).unwrap();
        let (_dir, path) = fake_worker(&format!("cat >/dev/null\nprintf '%s' '{}'", canned));
        let process = SolverProcess::new(path, SupervisorConfig::default());

        let solution = process.solve_blocking(&tiny_problem()).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective - 2.0).abs() < 1e-9);
        assert_eq!(solution.solve_time_ms, 7);
    }

    #[test]
    fn test_worker_failure_surfaces_stderr() {
        let (_dir, path) = fake_worker("cat >/dev/null\necho 'numerical meltdown' >&2\nexit 2");
        let process = SolverProcess::new(path, SupervisorConfig::default());

        let err = process.solve_blocking(&tiny_problem()).unwrap_err();
        match err {
            SolverError::ProcessFailed { exit_code, message } => {
                assert_eq!(exit_code, ExitCode::SolverError);
                assert!(message.contains("numerical meltdown"));
            }
            other => panic!("expected ProcessFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_output_is_ipc_error() {
        let (_dir, path) = fake_worker("cat >/dev/null\nexit 0");
        let process = SolverProcess::new(path, SupervisorConfig::default());

        let err = process.solve_blocking(&tiny_problem()).unwrap_err();
        assert!(matches!(err, SolverError::Ipc(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_resident_memory_of_self() {
        let rss = resident_memory_mb(std::process::id());
        assert!(rss.is_some());
    }

    #[test]
    fn test_missing_binary_is_process_start_error() {
        let process = SolverProcess::new(
            PathBuf::from("/nonexistent/netplan-worker"),
            SupervisorConfig::default(),
        );
        let err = process.solve_blocking(&tiny_problem()).unwrap_err();
        assert!(matches!(err, SolverError::ProcessStart(_)));
    }
}
