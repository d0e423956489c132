//! `vg` command-line client
//!
//! Three invocations are used:
//! - `vg chunk … | vg view -j -` extracts a region as a JSON graph dump and
//!   writes the region table (and, with an alignment index, the alignment
//!   chunk and annotation side outputs) into the working directory
//! - `vg view -j -a <gam>` converts a binary alignment chunk to one JSON
//!   record per line
//! - `vg paths -X <xg>` lists the path names of an index
//!
//! No shell is involved: arguments are passed verbatim and the chunk/view
//! pipe is plumbed by hand. Every child is spawned with `kill_on_drop`, so
//! the timeout wrapper kills whatever is still running when it fires.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Context radius (in nodes) around a coordinate range
pub const COORDINATE_CONTEXT_STEPS: u64 = 5;

/// Failure of one external invocation
#[derive(Debug, Error)]
pub enum ToolError {
    /// Binary missing or not executable
    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process ran but exited non-zero (or was killed by a signal)
    #[error("{command} exited with {status}")]
    Exited { command: String, status: ExitStatus },

    /// Output redirection or the pipe between two processes failed
    #[error("I/O failure while running {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Invocation exceeded the configured time bound and was killed
    #[error("{command} timed out after {}s", after.as_secs())]
    TimedOut { command: String, after: Duration },
}

/// Which part of the graph `vg chunk` should cut out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Everything within `distance` steps of a node
    ByNode { node_id: u64, distance: u64 },
    /// `start..start+distance` along an anchor path, plus fixed context
    ByCoordinate {
        anchor: String,
        start: u64,
        end: u64,
    },
}

/// Arguments of one region extraction
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    pub xg_file: PathBuf,
    /// Alignment index; enables the alignment chunk and annotation outputs
    pub gam_index: Option<PathBuf>,
    pub selection: Selection,
    /// Where `vg chunk` writes the region table
    pub region_table: PathBuf,
}

impl ChunkSpec {
    /// Argument vector of the `vg chunk` half of the pipe
    pub fn chunk_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["chunk".into(), "-x".into(), self.xg_file.clone().into()];

        if let Some(gam_index) = &self.gam_index {
            args.push("-a".into());
            args.push(gam_index.clone().into());
            args.push("-g".into());
            args.push("-A".into());
        }

        match &self.selection {
            Selection::ByNode { node_id, distance } => {
                args.push("-r".into());
                args.push(node_id.to_string().into());
                args.push("-c".into());
                args.push(distance.to_string().into());
            }
            Selection::ByCoordinate { anchor, start, end } => {
                args.push("-c".into());
                args.push(COORDINATE_CONTEXT_STEPS.to_string().into());
                args.push("-p".into());
                args.push(format!("{}:{}-{}", anchor, start, end).into());
            }
        }

        args.push("-T".into());
        args.push("-E".into());
        args.push(self.region_table.clone().into());
        args
    }
}

/// Handle on the `vg` binary
#[derive(Debug, Clone)]
pub struct VgTool {
    binary: PathBuf,
    timeout: Duration,
}

impl VgTool {
    /// A relative `binary` is anchored to the server's current directory,
    /// since children run inside request directories
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: anchor_binary(binary.into()),
            timeout,
        }
    }

    /// Run `vg chunk … | vg view -j -`, writing the JSON graph to `graph_out`
    ///
    /// Both processes run with `work_dir` as current directory, so the side
    /// outputs `vg chunk` drops next to itself stay inside it.
    pub async fn extract_region(
        &self,
        spec: &ChunkSpec,
        work_dir: &Path,
        graph_out: &Path,
    ) -> Result<(), ToolError> {
        let chunk_args = spec.chunk_args();
        let view_args: Vec<OsString> = vec!["view".into(), "-j".into(), "-".into()];
        let command = format!(
            "{} | {} >{}",
            self.describe(&chunk_args),
            self.describe(&view_args),
            graph_out.display()
        );
        info!("{}", command);

        let run = async {
            let out_file = create_output(graph_out, &command).await?;

            let mut chunk = self
                .command(&chunk_args, work_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .spawn()
                .map_err(|source| ToolError::Spawn {
                    command: command.clone(),
                    source,
                })?;
            let mut view = self
                .command(&view_args, work_dir)
                .stdin(Stdio::piped())
                .stdout(out_file)
                .spawn()
                .map_err(|source| ToolError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            let chunk_log = forward_stderr("vg chunk", &mut chunk);
            let view_log = forward_stderr("vg view", &mut view);

            let copied = match (chunk.stdout.take(), view.stdin.take()) {
                (Some(mut from), Some(mut to)) => {
                    // `to` is dropped at the end of this arm, closing view's stdin
                    tokio::io::copy(&mut from, &mut to).await
                }
                _ => Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "child pipes not captured",
                )),
            };

            let chunk_status = wait(&mut chunk, &command).await?;
            let view_status = wait(&mut view, &command).await?;
            finish_log(chunk_log).await;
            finish_log(view_log).await;

            check_status(chunk_status, &command)?;
            check_status(view_status, &command)?;
            let bytes = copied.map_err(|source| ToolError::Io {
                command: command.clone(),
                source,
            })?;
            debug!(bytes, "graph dump piped through vg view");
            Ok::<(), ToolError>(())
        };

        self.bounded(run, &command).await
    }

    /// Run `vg view -j -a <gam>`, writing one JSON record per line to `out`
    pub async fn convert_alignments(
        &self,
        gam_file: &Path,
        work_dir: &Path,
        out: &Path,
    ) -> Result<(), ToolError> {
        let args: Vec<OsString> = vec!["view".into(), "-j".into(), "-a".into(), gam_file.into()];
        self.run_to_file("vg view", &args, work_dir, out).await
    }

    /// Run `vg paths -X <xg>`, writing one path name per line to `out`
    pub async fn list_paths(&self, xg_file: &Path, work_dir: &Path, out: &Path) -> Result<(), ToolError> {
        let args: Vec<OsString> = vec!["paths".into(), "-X".into(), xg_file.into()];
        self.run_to_file("vg paths", &args, work_dir, out).await
    }

    async fn run_to_file(
        &self,
        label: &'static str,
        args: &[OsString],
        work_dir: &Path,
        out: &Path,
    ) -> Result<(), ToolError> {
        let command = format!("{} >{}", self.describe(args), out.display());
        info!("{}", command);

        let run = async {
            let out_file = create_output(out, &command).await?;
            let mut child = self
                .command(args, work_dir)
                .stdin(Stdio::null())
                .stdout(out_file)
                .spawn()
                .map_err(|source| ToolError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            let log = forward_stderr(label, &mut child);
            let status = wait(&mut child, &command).await?;
            finish_log(log).await;
            check_status(status, &command)
        };

        self.bounded(run, &command).await
    }

    fn command(&self, args: &[OsString], work_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(work_dir)
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn describe(&self, args: &[OsString]) -> String {
        let mut out = self.binary.display().to_string();
        for arg in args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }

    async fn bounded<F>(&self, run: F, command: &str) -> Result<(), ToolError>
    where
        F: std::future::Future<Output = Result<(), ToolError>>,
    {
        match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Killing {}", command);
                Err(ToolError::TimedOut {
                    command: command.to_string(),
                    after: self.timeout,
                })
            }
        }
    }
}

async fn create_output(path: &Path, command: &str) -> Result<std::fs::File, ToolError> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|source| ToolError::Io {
            command: command.to_string(),
            source,
        })?;
    Ok(file.into_std().await)
}

async fn wait(child: &mut Child, command: &str) -> Result<ExitStatus, ToolError> {
    child.wait().await.map_err(|source| ToolError::Io {
        command: command.to_string(),
        source,
    })
}

fn check_status(status: ExitStatus, command: &str) -> Result<(), ToolError> {
    if status.success() {
        Ok(())
    } else {
        Err(ToolError::Exited {
            command: command.to_string(),
            status,
        })
    }
}

/// Copy the child's stderr into the log, line by line
fn forward_stderr(label: &'static str, child: &mut Child) -> Option<JoinHandle<()>> {
    let stderr: ChildStderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!(tool = label, "{}", line);
        }
    }))
}

async fn finish_log(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        let _ = handle.await;
    }
}

/// Join a relative binary path onto the current directory
///
/// A bare name such as `vg` is left alone for `PATH` lookup.
fn anchor_binary(binary: PathBuf) -> PathBuf {
    if binary.is_absolute() || binary.components().count() == 1 {
        return binary;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(binary),
        Err(e) => {
            warn!(binary = %binary.display(), "Cannot resolve current directory: {}", e);
            binary
        }
    }
}
