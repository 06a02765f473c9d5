//! The model-backend seam.
//!
//! The orchestrator only ever sees a `ModelBackend`: hand it the full message
//! history and the tool list, get back a stream of `StreamUpdate`s. The HTTP
//! client implements it for real endpoints; tests script it in memory.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::errors::InferenceError;
use super::types::{Message, StreamUpdate, ToolDefinition};

/// Which wire protocol the endpoint speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFlavor {
    /// `POST {endpoint}/chat/completions` with `choices[].delta` chunks.
    #[default]
    ChatCompletions,
    /// `POST {endpoint}/responses` with typed `response.*` events.
    Responses,
}

/// Everything needed to open one round's stream.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub api: ApiFlavor,
    /// Full ordered history, system message first.
    pub messages: Vec<Message>,
    /// Empty when computer use is off.
    pub tools: Vec<ToolDefinition>,
}

/// Stream of updates for one round.
pub type UpdateStream = BoxStream<'static, Result<StreamUpdate, InferenceError>>;

/// A chat backend that can stream a round.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Open a streaming request.
    ///
    /// `cancel` is the round's cancellation token; implementations should stop
    /// producing updates once it fires. The orchestrator also races the token
    /// against the stream, so honouring it here is best-effort.
    async fn open_stream(
        &self,
        request: StreamRequest,
        cancel: CancellationToken,
    ) -> Result<UpdateStream, InferenceError>;
}
