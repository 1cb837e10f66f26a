//! Partial tool-call accumulation shared by all normalizers.
//!
//! Tool calls stream in fragments: the name may precede the arguments,
//! and argument text arrives in pieces that must be concatenated before
//! decoding. The assembler is a small explicit per-stream state machine
//! (idle / accumulating) holding at most one current partial call. A
//! fragment for a different index, or a finish/stream-end signal, flushes
//! the previous partial call as a completed request.

use loomweave_core::provider::{ToolCallRequest, sentinel_arguments};
use tracing::trace;

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Accumulating(PartialCall),
}

#[derive(Debug)]
struct PartialCall {
    index: u32,
    id: String,
    name: String,
    arguments: String,
}

impl PartialCall {
    fn finalize(self) -> ToolCallRequest {
        // Empty argument text means a no-argument call, not a decode error.
        let arguments = if self.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(&self.arguments) {
                Ok(value) => value,
                Err(e) => {
                    trace!(error = %e, raw = %self.arguments, "Tool call arguments failed to decode");
                    sentinel_arguments(&self.arguments)
                }
            }
        };

        ToolCallRequest {
            id: self.id,
            name: self.name,
            arguments,
        }
    }
}

/// Accumulates streamed tool-call fragments into completed requests.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    state: State,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a partial call is currently buffered.
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, State::Accumulating(_))
    }

    /// Feed one fragment for the call at `index`.
    ///
    /// Any of id, name, and argument text may be present; name and
    /// argument fragments are concatenated. Returns the flushed previous
    /// call when `index` differs from the current one.
    pub fn fragment(
        &mut self,
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) -> Option<ToolCallRequest> {
        let flushed = match &self.state {
            State::Accumulating(current) if current.index != index => self.flush(),
            _ => None,
        };

        let current = match &mut self.state {
            State::Accumulating(current) => current,
            State::Idle => {
                self.state = State::Accumulating(PartialCall {
                    index,
                    id: String::new(),
                    name: String::new(),
                    arguments: String::new(),
                });
                match &mut self.state {
                    State::Accumulating(current) => current,
                    State::Idle => unreachable!(),
                }
            }
        };

        if let Some(id) = id {
            current.id = id.to_string();
        }
        if let Some(name) = name {
            current.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            current.arguments.push_str(arguments);
        }

        flushed
    }

    /// Flush the buffered partial call, if any. Called on a finish signal
    /// and at stream end so truncated calls are never silently dropped.
    pub fn flush(&mut self) -> Option<ToolCallRequest> {
        match std::mem::take(&mut self.state) {
            State::Idle => None,
            State::Accumulating(partial) => Some(partial.finalize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_call_across_fragments() {
        let mut asm = ToolCallAssembler::new();
        assert!(asm.fragment(0, Some("call_1"), Some("createNode"), None).is_none());
        assert!(asm.fragment(0, None, None, Some(r#"{"name""#)).is_none());
        assert!(asm.fragment(0, None, None, Some(r#":"Alpha"}"#)).is_none());

        let call = asm.flush().unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "createNode");
        assert_eq!(call.arguments, serde_json::json!({"name": "Alpha"}));
        assert!(!asm.is_accumulating());
    }

    #[test]
    fn index_change_flushes_previous() {
        let mut asm = ToolCallAssembler::new();
        asm.fragment(0, Some("call_a"), Some("createNode"), Some(r#"{"name":"A"}"#));

        let flushed = asm
            .fragment(1, Some("call_b"), Some("createEdge"), None)
            .expect("previous call should flush on index change");
        assert_eq!(flushed.id, "call_a");
        assert_eq!(flushed.arguments["name"], "A");

        asm.fragment(1, None, None, Some(r#"{"source":"A","target":"B"}"#));
        let second = asm.flush().unwrap();
        assert_eq!(second.id, "call_b");
        assert_eq!(second.name, "createEdge");
    }

    #[test]
    fn interleaved_fragments_preserve_order() {
        // Three fragments spread across two indices; completion order
        // must follow index transitions.
        let mut asm = ToolCallAssembler::new();
        let mut completed = Vec::new();

        for (index, id, name, args) in [
            (0, Some("call_a"), Some("createNode"), Some(r#"{"na"#)),
            (0, None, None, Some(r#"me":"A"}"#)),
            (1, Some("call_b"), Some("deleteNode"), Some(r#"{"name":"B"}"#)),
        ] {
            if let Some(call) = asm.fragment(index, id, name, args) {
                completed.push(call);
            }
        }
        completed.extend(asm.flush());

        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].id, "call_a");
        assert_eq!(completed[1].id, "call_b");
        assert_eq!(completed[0].arguments["name"], "A");
    }

    #[test]
    fn truncated_arguments_become_sentinel() {
        let mut asm = ToolCallAssembler::new();
        asm.fragment(0, Some("call_1"), Some("createNode"), Some(r#"{"name":"Al"#));

        let call = asm.flush().expect("truncated call still flushes");
        assert!(call.arguments_failed_to_decode());
        assert_eq!(call.arguments["raw"], r#"{"name":"Al"#);
    }

    #[test]
    fn empty_arguments_decode_to_empty_object() {
        let mut asm = ToolCallAssembler::new();
        asm.fragment(0, Some("call_1"), Some("listGraphs"), None);
        let call = asm.flush().unwrap();
        assert_eq!(call.arguments, serde_json::json!({}));
    }

    #[test]
    fn name_fragments_concatenate() {
        let mut asm = ToolCallAssembler::new();
        asm.fragment(0, Some("call_1"), Some("create"), None);
        asm.fragment(0, None, Some("Node"), None);
        let call = asm.flush().unwrap();
        assert_eq!(call.name, "createNode");
    }

    #[test]
    fn flush_when_idle_is_none() {
        let mut asm = ToolCallAssembler::new();
        assert!(asm.flush().is_none());
    }
}
