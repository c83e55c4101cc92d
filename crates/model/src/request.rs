/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    /// The upstream model identifier.
    pub model: String,
    /// The input messages, in conversation order.
    pub messages: Vec<ModelMessage>,
    /// Sampling parameters for this request.
    pub params: SamplingParams,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

/// Parameters that control how the model samples its response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound of generated tokens.
    pub max_tokens: u32,
}
