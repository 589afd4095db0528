//! Vendor chunk stream → uniform content + usage stream.
//!
//! Input is the per-vendor client's stream of parsed JSON chunks (transport
//! and SSE framing live outside this crate). Output is text deltas as they
//! arrive plus a single `Done` carrying the accumulated content and usage.
//! The decoder is pull-driven: the vendor stream is only polled when the
//! consumer polls, and dropping the output stream drops the vendor stream,
//! so backpressure and cancellation propagate for free.

use crate::error::{OrchestratorError, Result};
use crate::provider::{ProviderId, ToolChoiceFamily};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamChunk {
    /// Incremental text, emitted unbuffered.
    Delta { content: String },
    /// Completion signal, delivered exactly once at stream end.
    Done { content: String, usage: TokenUsage },
}

#[derive(Debug, Default)]
struct StreamAccumulator {
    content: String,
    usage: TokenUsage,
    saw_usage: bool,
    finished: bool,
}

impl StreamAccumulator {
    fn record_usage(&mut self, prompt: Option<u64>, completion: Option<u64>, total: Option<u64>) {
        if let Some(p) = prompt {
            self.usage.prompt_tokens = p;
        }
        if let Some(c) = completion {
            self.usage.completion_tokens = c;
        }
        self.usage.total_tokens = total
            .unwrap_or(self.usage.prompt_tokens + self.usage.completion_tokens);
        self.saw_usage |= prompt.is_some() || completion.is_some() || total.is_some();
    }

    fn finish(&mut self, provider: ProviderId) -> StreamChunk {
        self.finished = true;
        if !self.saw_usage {
            tracing::warn!(%provider, "stream ended without a usage report; totals are zero");
            self.usage.total_tokens =
                self.usage.prompt_tokens + self.usage.completion_tokens;
        }
        StreamChunk::Done {
            content: std::mem::take(&mut self.content),
            usage: self.usage.clone(),
        }
    }
}

/// What one vendor chunk contributed.
enum Decoded {
    Text(String),
    Nothing,
    /// Vendor signalled end of message (tool-name family `message_stop`).
    Stop,
}

/// Decode a vendor chunk stream into text deltas plus a final `Done`.
///
/// A mid-stream error terminates the output with `StreamDecode`; a stream
/// that never reports usage still completes, with zeroed counters and a
/// logged diagnostic.
pub fn decode_stream<S>(
    vendor_stream: S,
    provider: ProviderId,
) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>
where
    S: Stream<Item = Result<Value>> + Send + 'static,
{
    let state = StreamAccumulator::default();
    let stream = futures_util::stream::unfold(
        (Box::pin(vendor_stream), state),
        move |(mut vendor, mut state)| async move {
            loop {
                if state.finished {
                    return None;
                }
                match vendor.as_mut().next().await {
                    Some(Ok(chunk)) => match decode_chunk(provider, &chunk, &mut state) {
                        Ok(Decoded::Text(text)) => {
                            state.content.push_str(&text);
                            return Some((
                                Ok(StreamChunk::Delta { content: text }),
                                (vendor, state),
                            ));
                        }
                        Ok(Decoded::Stop) => {
                            let done = state.finish(provider);
                            return Some((Ok(done), (vendor, state)));
                        }
                        Ok(Decoded::Nothing) => continue,
                        Err(e) => {
                            state.finished = true;
                            return Some((Err(e), (vendor, state)));
                        }
                    },
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((Err(e), (vendor, state)));
                    }
                    None => {
                        let done = state.finish(provider);
                        return Some((Ok(done), (vendor, state)));
                    }
                }
            }
        },
    );
    Box::pin(stream)
}

fn decode_chunk(
    provider: ProviderId,
    chunk: &Value,
    state: &mut StreamAccumulator,
) -> Result<Decoded> {
    if !chunk.is_object() {
        return Err(OrchestratorError::stream_decode(
            provider,
            format!("expected a chunk object, got: {chunk}"),
        ));
    }
    match provider.tool_choice_family() {
        ToolChoiceFamily::FunctionCall => Ok(decode_function_call_chunk(chunk, state)),
        ToolChoiceFamily::ToolName => Ok(decode_tool_name_event(chunk, state)),
        ToolChoiceFamily::AllowedFunctionNames => Ok(decode_candidates_chunk(chunk, state)),
    }
}

/// OpenAI-compatible: `choices[0].delta.content` plus a trailing `usage`.
fn decode_function_call_chunk(chunk: &Value, state: &mut StreamAccumulator) -> Decoded {
    if let Some(usage) = chunk.get("usage").filter(|u| !u.is_null()) {
        state.record_usage(
            usage.get("prompt_tokens").and_then(Value::as_u64),
            usage.get("completion_tokens").and_then(Value::as_u64),
            usage.get("total_tokens").and_then(Value::as_u64),
        );
    }
    let text = chunk
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if text.is_empty() {
        Decoded::Nothing
    } else {
        Decoded::Text(text.to_string())
    }
}

/// Anthropic-style event objects tagged by `type`.
fn decode_tool_name_event(chunk: &Value, state: &mut StreamAccumulator) -> Decoded {
    match chunk.get("type").and_then(Value::as_str) {
        Some("message_start") => {
            if let Some(usage) = chunk.pointer("/message/usage") {
                state.record_usage(
                    usage.get("input_tokens").and_then(Value::as_u64),
                    usage.get("output_tokens").and_then(Value::as_u64),
                    None,
                );
            }
            Decoded::Nothing
        }
        Some("content_block_delta") => {
            let text = chunk
                .pointer("/delta/text")
                .and_then(Value::as_str)
                .filter(|_| {
                    chunk.pointer("/delta/type").and_then(Value::as_str) == Some("text_delta")
                })
                .unwrap_or_default();
            if text.is_empty() {
                Decoded::Nothing
            } else {
                Decoded::Text(text.to_string())
            }
        }
        Some("message_delta") => {
            if let Some(usage) = chunk.get("usage").filter(|u| !u.is_null()) {
                state.record_usage(
                    usage.get("input_tokens").and_then(Value::as_u64),
                    usage.get("output_tokens").and_then(Value::as_u64),
                    None,
                );
            }
            Decoded::Nothing
        }
        Some("message_stop") => Decoded::Stop,
        _ => Decoded::Nothing,
    }
}

/// Gemini-style: `candidates[0].content.parts[*].text` plus `usageMetadata`.
fn decode_candidates_chunk(chunk: &Value, state: &mut StreamAccumulator) -> Decoded {
    if let Some(usage) = chunk.get("usageMetadata").filter(|u| !u.is_null()) {
        state.record_usage(
            usage.get("promptTokenCount").and_then(Value::as_u64),
            usage.get("candidatesTokenCount").and_then(Value::as_u64),
            usage.get("totalTokenCount").and_then(Value::as_u64),
        );
    }
    let mut text = String::new();
    if let Some(parts) = chunk
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
    {
        for part in parts {
            if let Some(t) = part.get("text").and_then(Value::as_str) {
                text.push_str(t);
            }
        }
    }
    if text.is_empty() {
        Decoded::Nothing
    } else {
        Decoded::Text(text)
    }
}
