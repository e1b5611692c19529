//! The request side of a decision.

use serde::{Deserialize, Serialize};

use crate::spec::model::Channel;

/// One incoming query, already classified upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryContext {
    /// Raw query text.
    pub text: String,
    /// Intent label from the upstream classifier, e.g. `"career_advice"`.
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
}

impl QueryContext {
    pub fn new(intent: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: intent.into(),
            channel: None,
        }
    }

    pub fn on_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }
}
