use crate::connection::event::BridgeEvent;
use crate::error::process::ProcessError;
use crate::frame::FrameCodec;
use crate::process::ProxyProcess;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::process::Stdio;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child as TokioChild, ChildStderr, ChildStdin, ChildStdout};
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const READ_CHUNK_LEN: usize = 64 * 1024;

struct RunningProcess {
    generation: u64,
    pid: Option<u32>,
    writer: mpsc::UnboundedSender<Vec<u8>>,
    kill: Option<oneshot::Sender<()>>,
    waiter: JoinHandle<()>,
    readers: Vec<JoinHandle<()>>,
}

/// Owns at most one peer process.
///
/// Pipe readers and the exit waiter run as tasks and report back through the
/// actor channel, tagged with the generation of the process they belong to.
pub struct ProcessBridge {
    events: mpsc::Sender<BridgeEvent>,
    generation: u64,
    running: Option<RunningProcess>,
}

impl ProcessBridge {
    pub fn new(events: mpsc::Sender<BridgeEvent>) -> Self {
        Self {
            events,
            generation: 0,
            running: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().and_then(|running| running.pid)
    }
}

pub(crate) fn build_proxy_command(path: &Path, args: &[String]) -> TokioCommand {
    let mut cmd = TokioCommand::new(path);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

impl ProxyProcess for ProcessBridge {
    fn start(&mut self, path: &Path, args: &[String]) -> Result<u64, ProcessError> {
        self.stop();

        debug!("Spawning proxy process {}", path.display());

        let mut child = build_proxy_command(path, args)
            .spawn()
            .map_err(|e| ProcessError::SpawnFailed {
                message: format!("Failed to spawn proxy process: {e}"),
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(ProcessError::pipe("Proxy process is missing a piped stdio handle"));
        };

        self.generation += 1;
        let generation = self.generation;
        let pid = child.id();

        info!("Spawned proxy process (PID: {pid:?}, generation {generation})");

        let (writer, writer_rx) = mpsc::unbounded_channel();
        let (kill, kill_rx) = oneshot::channel();

        let readers = vec![
            TokioSpawn(read_frames(stdout, generation, self.events.clone())),
            TokioSpawn(log_stderr(stderr)),
            TokioSpawn(write_frames(stdin, writer_rx)),
        ];
        let waiter = TokioSpawn(wait_for_exit(child, generation, kill_rx, self.events.clone()));

        self.running = Some(RunningProcess {
            generation,
            pid,
            writer,
            kill: Some(kill),
            waiter,
            readers,
        });

        Ok(generation)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), ProcessError> {
        let running = self
            .running
            .as_ref()
            .filter(|running| !running.waiter.is_finished())
            .ok_or_else(|| ProcessError::not_running("No proxy process to send to"))?;

        let frame = FrameCodec::encode(payload)?;
        running
            .writer
            .send(frame)
            .map_err(|_| ProcessError::pipe("Proxy stdin writer has stopped"))
    }

    fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };

        debug!(
            "Stopping proxy process (PID: {:?}, generation {})",
            running.pid, running.generation
        );

        if let Some(kill) = running.kill.take() {
            let _ = kill.send(());
        }
        for reader in running.readers {
            reader.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.waiter.is_finished())
    }
}

impl Drop for ProcessBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn read_frames(mut stdout: ChildStdout, generation: u64, events: mpsc::Sender<BridgeEvent>) {
    let mut codec = FrameCodec::new();
    let mut chunk = vec![0u8; READ_CHUNK_LEN];

    loop {
        let read = match stdout.read(&mut chunk).await {
            Ok(0) => {
                trace!("Proxy stdout closed (generation {generation})");
                return;
            }
            Ok(read) => read,
            Err(e) => {
                warn!("Failed to read proxy stdout: {e}");
                return;
            }
        };

        match codec.feed(&chunk[..read]) {
            Ok(frames) => {
                for data in frames {
                    if events
                        .send(BridgeEvent::MessageReceived { generation, data })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("Proxy frame stream corrupted: {e}");
                let _ = events
                    .send(BridgeEvent::FrameStreamCorrupted { generation })
                    .await;
                return;
            }
        }
    }
}

async fn log_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("Bitwarden stderr: {line}");
    }
}

async fn write_frames(mut stdin: ChildStdin, mut frames: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = stdin.write_all(&frame).await {
            warn!("Failed to write to proxy stdin: {e}");
            return;
        }
        if let Err(e) = stdin.flush().await {
            warn!("Failed to flush proxy stdin: {e}");
            return;
        }
    }
}

async fn wait_for_exit(
    mut child: TokioChild,
    generation: u64,
    kill: oneshot::Receiver<()>,
    events: mpsc::Sender<BridgeEvent>,
) {
    tokio::select! {
        result = child.wait() => {
            match result {
                Ok(status) => info!("Proxy process exited with {status} (generation {generation})"),
                Err(e) => warn!("Failed to wait for proxy process: {e}"),
            }
            let _ = events.send(BridgeEvent::ProcessTerminated { generation }).await;
        }
        _ = kill => {
            if let Err(e) = child.kill().await {
                debug!("Proxy process was already gone: {e}");
            }
        }
    }
}
