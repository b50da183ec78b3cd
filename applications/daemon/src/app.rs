//! Wiring of the playback service, metadata worker and console

use crate::config::DaemonConfig;
use crate::console::ConsoleCommand;
use crate::error::{DaemonError, Result};
use crate::focus::SimulatedFocus;
use crate::notify::LogNotificationRenderer;
use crate::sim_engine::SimulatedEngineFactory;
use cadence_metadata::LoftyMetadataLookup;
use cadence_playback::{spawn_metadata_worker, Collaborators, PlaybackHandle, PlaybackService};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running playback session
pub struct Daemon {
    handle: PlaybackHandle,
    service: JoinHandle<()>,
    metadata: JoinHandle<()>,
}

impl Daemon {
    /// Validate `config` and start the service on the current runtime
    pub fn start(config: &DaemonConfig) -> Result<Self> {
        config.validate()?;

        let catalog = config.catalog();
        info!(tracks = catalog.len(), "Starting playback service");

        let collaborators = Collaborators {
            engine_factory: Box::new(SimulatedEngineFactory::new(
                catalog.clone(),
                config.engine.clone(),
            )),
            focus: Box::new(SimulatedFocus::new(config.focus.deny_requests)),
            renderer: Box::new(LogNotificationRenderer::new()),
        };
        let (handle, service) = PlaybackService::spawn(config.playback.clone(), collaborators);

        let lookup = Arc::new(LoftyMetadataLookup::new(
            catalog,
            config.metadata.artwork_cache_size,
        ));
        let metadata = spawn_metadata_worker(lookup, &handle);

        Ok(Self {
            handle,
            service,
            metadata,
        })
    }

    pub fn handle(&self) -> &PlaybackHandle {
        &self.handle
    }

    /// Execute commands read from `input` until `stop` or end of input
    ///
    /// Parse and playback errors are reported on `output` and do not end
    /// the session.
    pub async fn run_console<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let command = match line.parse::<ConsoleCommand>() {
                Ok(command) => command,
                Err(e) => {
                    warn!(line = %line, error = %e, "Unparseable console line");
                    output.write_all(format!("error: {e}\n").as_bytes()).await?;
                    continue;
                }
            };
            let terminal = command.is_terminal();

            match command.execute(&self.handle).await {
                Ok(Some(text)) => output.write_all(format!("{text}\n").as_bytes()).await?,
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Command failed");
                    output.write_all(format!("error: {e}\n").as_bytes()).await?;
                }
            }
            output.flush().await?;

            if terminal {
                break;
            }
        }

        Ok(())
    }

    /// Stop playback and wait for both tasks to finish
    pub async fn shutdown(self) -> Result<()> {
        // Already stopped is fine
        let _ = self.handle.stop();
        drop(self.handle);

        self.service
            .await
            .map_err(|e| DaemonError::Task(e.to_string()))?;
        self.metadata
            .await
            .map_err(|e| DaemonError::Task(e.to_string()))?;

        info!("Playback service shut down");
        Ok(())
    }
}
