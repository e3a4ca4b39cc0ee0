// ── Command API ──
//
// Every write against the backend flows through a `Command`. The
// controller's command processor runs them one at a time, so a save and
// a delete never race each other's follow-up refresh.

use crate::error::CoreError;
use crate::model::Device;
use crate::session::DeviceDraft;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations against the panel backend.
#[derive(Debug, Clone)]
pub enum Command {
    /// Create (draft without id) or update a device, then re-fetch. The
    /// draft is validated first; an invalid draft sends nothing.
    SaveDevice { draft: DeviceDraft },
    /// Delete a stored device, then re-fetch. A device without an id fails
    /// before any request but is still followed by the re-fetch.
    DeleteDevice { device: Device },
    /// Ask the backend to reconnect to a device.
    ReconnectDevice { id: i64 },
}

impl Command {
    /// Whether the device list is re-fetched after this command, whatever
    /// its outcome.
    pub fn refetches(&self) -> bool {
        matches!(self, Self::SaveDevice { .. } | Self::DeleteDevice { .. })
    }
}

/// Result of a command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// The operator declined; nothing was sent.
    Cancelled,
}
