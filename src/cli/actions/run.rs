use super::Action;
use tracing::debug;

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> anyhow::Result<()> {
    match action {
        Action::Monitor {
            server,
            options,
            interval,
            listen,
            port,
            cache_ttl,
        } => {
            let server = server.load().await?;
            debug!(server = ?server, "loaded server descriptor");

            crate::pulse::start(server, options, interval, listen, port, cache_ttl).await
        }
    }
}
