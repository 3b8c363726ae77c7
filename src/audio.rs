use crate::config::AudioConfig;
use crate::error::{AbrSimError, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// How long a terminated player gets to exit before it is killed
const TERMINATE_GRACE: Duration = Duration::from_millis(200);

/// A running audio player
pub trait AudioProcess: Send {
    fn id(&self) -> Option<u32>;

    /// True while the player has not exited
    fn is_running(&mut self) -> bool;

    /// Ask the player to exit, forcing it if it does not
    fn terminate(&mut self) -> Result<()>;
}

/// Starts audio players for a source file
pub trait AudioLauncher: Send + Sync {
    fn launch(&self, source: &Path) -> Result<Box<dyn AudioProcess>>;

    fn name(&self) -> &str;
}

/// Launches an external player such as `ffplay -nodisp -autoexit <source>`.
///
/// Players are `tokio::process` children, so launching needs a running
/// tokio runtime.
#[derive(Debug, Clone)]
pub struct FfplayLauncher {
    program: String,
    args: Vec<String>,
}

impl FfplayLauncher {
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl AudioLauncher for FfplayLauncher {
    fn launch(&self, source: &Path) -> Result<Box<dyn AudioProcess>> {
        debug!(
            "Launching {} {:?} {}",
            self.program,
            self.args,
            source.display()
        );

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AbrSimError::ExternalProcess {
                program: self.program.clone(),
                source: e,
            })?;

        info!(
            "Audio player '{}' started (pid {:?})",
            self.program,
            child.id()
        );
        Ok(Box::new(ChildAudioProcess {
            child: Some(child),
            program: self.program.clone(),
        }))
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// OS child process wrapper
pub struct ChildAudioProcess {
    child: Option<Child>,
    program: String,
}

impl AudioProcess for ChildAudioProcess {
    fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    fn is_running(&mut self) -> bool {
        self.child
            .as_mut()
            .map(|child| matches!(child.try_wait(), Ok(None)))
            .unwrap_or(false)
    }

    /// Sends SIGTERM and returns at once; a background task reaps the player
    /// and kills it if it is still alive after the grace period.
    fn terminate(&mut self) -> Result<()> {
        if !self.is_running() {
            debug!("Audio player '{}' already exited", self.program);
            self.child = None;
            return Ok(());
        }
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                // SAFETY: the pid belongs to a child that has not been reaped yet
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
        }
        #[cfg(not(unix))]
        child.start_kill()?;

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(reap(child, self.program.clone()));
            }
            Err(_) => {
                // No runtime left to wait on; kill_on_drop takes over
                child.start_kill()?;
            }
        }
        Ok(())
    }
}

async fn reap(mut child: Child, program: String) {
    match timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(Ok(status)) => debug!("Audio player '{}' exited: {}", program, status),
        Ok(Err(e)) => warn!("Failed to wait for audio player '{}': {}", program, e),
        Err(_) => {
            warn!("Audio player '{}' ignored SIGTERM, killing it", program);
            if let Err(e) = child.kill().await {
                error!("Failed to kill audio player '{}': {}", program, e);
            }
        }
    }
}

/// Keeps at most one audio player alive alongside playback
pub struct AudioSidecar {
    launcher: Arc<dyn AudioLauncher>,
    enabled: bool,
    process: Mutex<Option<Box<dyn AudioProcess>>>,
}

impl AudioSidecar {
    pub fn new(launcher: Arc<dyn AudioLauncher>, enabled: bool) -> Self {
        Self {
            launcher,
            enabled,
            process: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(Arc::new(FfplayLauncher::from_config(config)), config.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace any running player with one for `source`
    pub fn start(&self, source: &Path) -> Result<()> {
        if !self.enabled {
            debug!("Audio disabled, not launching a player");
            return Ok(());
        }

        let mut process = self.process.lock();
        if let Some(mut previous) = process.take() {
            if let Err(e) = previous.terminate() {
                error!("Failed to terminate previous audio player: {}", e);
            }
        }

        *process = Some(self.launcher.launch(source)?);
        Ok(())
    }

    /// Terminate the player if one is running; safe to call repeatedly
    pub fn stop(&self) {
        let Some(mut process) = self.process.lock().take() else {
            return;
        };

        let pid = process.id();
        match process.terminate() {
            Ok(()) => info!("Audio stopped (pid {:?})", pid),
            Err(e) => error!("Failed to stop audio player (pid {:?}): {}", pid, e),
        }
    }

    pub fn is_running(&self) -> bool {
        self.process
            .lock()
            .as_mut()
            .map(|process| process.is_running())
            .unwrap_or(false)
    }

    pub fn launcher_name(&self) -> &str {
        self.launcher.name()
    }
}

impl Drop for AudioSidecar {
    fn drop(&mut self) {
        self.stop();
    }
}
