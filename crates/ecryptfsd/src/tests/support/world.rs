//! Scenario world for dispatch behaviour: a scripted loopback channel, a
//! recording resolver registrar, and the outcome of one dispatch run.

use ecryptfsd_config::Config;

use crate::dispatch::{DispatchError, DispatchSummary, serve};
use crate::resolver::KeyMessage;
use crate::transport::test_support::LoopbackChannel;
use crate::transport::{EnvelopeHeader, MessageType, Transport};

use super::doubles::RecordingRegistrar;

/// Scenario world shared across dispatch steps.
#[derive(Debug, Default)]
pub struct DispatchWorld {
    pub channel: LoopbackChannel,
    pub registrar: RecordingRegistrar,
    threshold: Option<u32>,
    outcome: Option<Result<DispatchSummary, DispatchError>>,
}

impl DispatchWorld {
    /// Overrides the configured failure threshold.
    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = Some(threshold);
    }

    /// Queues a kernel REQUEST carrying `index` and `body`.
    pub fn queue_request(&self, sequence: u32, index: u32, body: &str) {
        let payload = KeyMessage::new(index, body.as_bytes().to_vec())
            .encode()
            .expect("request payload encodes");
        self.channel
            .push_from_kernel(MessageType::Request, sequence, &payload);
    }

    /// Runs the dispatcher once over the scripted channel.
    pub fn dispatch(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let config = Config {
            error_threshold: self.threshold.unwrap_or_else(|| Config::default().error_threshold),
            ..Config::default()
        };
        let mut transport = Transport::new(self.channel.clone());
        self.outcome = Some(serve(&mut transport, &self.registrar, &config));
        transport.close();
    }

    /// Returns the dispatch outcome, panicking when dispatch never ran.
    pub fn outcome(&self) -> &Result<DispatchSummary, DispatchError> {
        self.outcome.as_ref().expect("dispatch has not run")
    }

    /// Decodes every RESPONSE the daemon sent.
    pub fn responses(&self) -> Vec<(EnvelopeHeader, KeyMessage)> {
        self.channel
            .sent_envelopes()
            .into_iter()
            .map(|(header, payload)| {
                let message = KeyMessage::decode(&payload).expect("response payload decodes");
                (header, message)
            })
            .collect()
    }
}
