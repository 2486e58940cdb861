//! Result stream configuration

use crate::result::CallResult;
use tokio::sync::mpsc;

/// Channel buffer configuration for the result stream
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Result channel buffer size (call executors -> consumer)
    pub results_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            results_buffer: 10_000,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with custom results buffer size
    pub fn with_results_buffer(mut self, size: usize) -> Self {
        self.results_buffer = size.max(1);
        self
    }

    /// Create the result stream
    ///
    /// The sender goes to the generator, the receiver stays with the consumer,
    /// which must drain it until it yields `None`.
    pub fn result_channel(&self) -> (mpsc::Sender<CallResult>, mpsc::Receiver<CallResult>) {
        mpsc::channel(self.results_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.results_buffer, 10_000);
    }

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::default().with_results_buffer(5000);
        assert_eq!(config.results_buffer, 5000);

        let (tx, _rx) = config.result_channel();
        assert_eq!(tx.max_capacity(), 5000);
    }

    #[test]
    fn test_channel_config_zero_buffer_clamped() {
        let config = ChannelConfig::default().with_results_buffer(0);
        assert_eq!(config.results_buffer, 1);
    }
}
