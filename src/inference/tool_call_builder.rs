//! Reassembles streamed tool-call fragments into complete `ToolCall`s.
//!
//! Backends stream a tool invocation as many `ToolCallDelta`s keyed by a call
//! index. Fragments for different calls may interleave, and some backends
//! report index 0 for every fragment of every call. Positive indices are used
//! as-is; non-positive ones are routed to a sequential slot that advances
//! whenever a fragment clearly starts a new call (a new id, or a name for a
//! slot that already has one). A fragment repeating the slot's own backend id
//! always continues that slot.
//!
//! One builder is owned by one streaming round and consumed by `build()`.

use tracing::debug;
use uuid::Uuid;

use super::byte_sequence::ByteSequenceBuilder;
use super::types::{ToolCall, ToolCallDelta};

// ─── Slots ───────────────────────────────────────────────────────────────────

/// Where a fragment's data lands. Reported and sequential indices live in
/// separate key spaces so they can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKey {
    Reported(u32),
    Sequential(u32),
}

#[derive(Debug)]
struct Slot {
    key: SlotKey,
    id: String,
    /// True once `id` came from the backend rather than being synthesized.
    id_from_backend: bool,
    name: Option<String>,
    arguments: ByteSequenceBuilder,
}

impl Slot {
    fn new(key: SlotKey) -> Self {
        Self {
            key,
            id: synthesize_call_id(),
            id_from_backend: false,
            name: None,
            arguments: ByteSequenceBuilder::new(),
        }
    }

    fn absorb(&mut self, delta: ToolCallDelta) {
        if let Some(id) = delta.id.filter(|id| !id.trim().is_empty()) {
            if !self.id_from_backend {
                self.id = id;
                self.id_from_backend = true;
            }
        }

        if self.name.is_none() {
            if let Some(name) = delta.function_name.filter(|n| !n.is_empty()) {
                self.name = Some(name);
            }
        }

        if let Some(chunk) = delta.arguments {
            self.arguments.append(chunk);
        }
    }

    /// Whether `delta` (routed to the sequential slot) starts a different call.
    fn is_new_call(&self, delta: &ToolCallDelta) -> bool {
        let delta_id = delta.id.as_deref().filter(|id| !id.trim().is_empty());
        if self.id_from_backend && delta_id == Some(self.id.as_str()) {
            return false;
        }
        let new_id = delta_id.is_some_and(|_| self.id_from_backend);
        let second_name = self.name.is_some()
            && delta
                .function_name
                .as_deref()
                .is_some_and(|n| !n.is_empty());
        new_id || second_name
    }
}

fn synthesize_call_id() -> String {
    format!("call_{}", Uuid::new_v4())
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Accumulates `ToolCallDelta`s for one round.
#[derive(Debug, Default)]
pub struct ToolCallBuilder {
    /// Slots in first-seen order.
    slots: Vec<Slot>,
    /// Current target for non-positive indices, if one has been opened.
    sequential: Option<u32>,
    next_sequential: u32,
}

impl ToolCallBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no fragment has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Route one fragment to its slot, opening the slot on first sight.
    pub fn append(&mut self, delta: ToolCallDelta) {
        let key = self.resolve_key(&delta);
        let slot = match self.slots.iter().position(|s| s.key == key) {
            Some(pos) => &mut self.slots[pos],
            None => {
                debug!(?key, "tool call slot opened");
                self.slots.push(Slot::new(key));
                let last = self.slots.len() - 1;
                &mut self.slots[last]
            }
        };
        slot.absorb(delta);
    }

    fn resolve_key(&mut self, delta: &ToolCallDelta) -> SlotKey {
        if delta.index > 0 {
            return SlotKey::Reported(delta.index as u32);
        }

        let continues_current = self.sequential.filter(|&seq| {
            self.slots
                .iter()
                .any(|s| s.key == SlotKey::Sequential(seq) && !s.is_new_call(delta))
        });
        if let Some(seq) = continues_current {
            return SlotKey::Sequential(seq);
        }

        let seq = self.next_sequential;
        self.next_sequential += 1;
        self.sequential = Some(seq);
        SlotKey::Sequential(seq)
    }

    /// Finalize every slot into a `ToolCall`, in first-seen order.
    ///
    /// A slot that never received a name still yields a call with an empty
    /// name; dispatch rejects it as an unknown tool.
    pub fn build(self) -> Vec<ToolCall> {
        self.slots
            .into_iter()
            .map(|slot| ToolCall {
                id: slot.id,
                name: slot.name.unwrap_or_default(),
                arguments: slot.arguments.build(),
            })
            .collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn delta(index: i32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ToolCallDelta {
        ToolCallDelta {
            index,
            id: id.map(String::from),
            function_name: name.map(String::from),
            arguments: args.map(|a| Bytes::copy_from_slice(a.as_bytes())),
        }
    }

    /// Feed `payload` for one call split at the given byte offsets.
    fn build_split(payload: &str, cuts: &[usize]) -> ToolCall {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(1, Some("call_a"), Some("TypeText"), None));
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&payload.len())) {
            builder.append(delta(1, None, None, Some(&payload[start..cut])));
            start = cut;
        }
        let mut calls = builder.build();
        assert_eq!(calls.len(), 1);
        calls.remove(0)
    }

    #[test]
    fn test_empty_builder_yields_nothing() {
        assert!(ToolCallBuilder::new().build().is_empty());
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_result() {
        let payload = r#"{"text":"hello, world"}"#;
        let whole = build_split(payload, &[]);
        let per_byte = build_split(payload, &(1..payload.len()).collect::<Vec<_>>());
        let ragged = build_split(payload, &[3, 4, 11, 20]);

        assert_eq!(whole.arguments.to_string_lossy(), payload);
        assert_eq!(whole.arguments, per_byte.arguments);
        assert_eq!(whole.arguments, ragged.arguments);
        assert_eq!(per_byte.name, "TypeText");
    }

    #[test]
    fn test_interleaved_positive_indices_keep_first_seen_order() {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(2, Some("call_b"), Some("ClickAt"), Some("{\"x\":")));
        builder.append(delta(1, Some("call_a"), Some("GetScreenSize"), None));
        builder.append(delta(2, None, None, Some("1,\"y\":2}")));
        builder.append(delta(1, None, None, Some("{}")));

        let calls = builder.build();
        let names: Vec<_> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ClickAt", "GetScreenSize"]);
        assert_eq!(calls[0].id, "call_b");
        assert_eq!(calls[0].arguments.to_string_lossy(), "{\"x\":1,\"y\":2}");
        assert_eq!(calls[1].arguments.to_string_lossy(), "{}");
    }

    #[test]
    fn test_index_zero_quirk_splits_calls() {
        // Backend reports index 0 for both calls and sends no ids
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(0, None, Some("MoveTo"), None));
        builder.append(delta(0, None, None, Some("{\"x\":10,")));
        builder.append(delta(0, None, None, Some("\"y\":20}")));
        builder.append(delta(0, None, Some("ClickAt"), None));
        builder.append(delta(0, None, None, Some("{\"x\":5,\"y\":6}")));

        let calls = builder.build();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "MoveTo");
        assert_eq!(calls[0].arguments.to_string_lossy(), "{\"x\":10,\"y\":20}");
        assert_eq!(calls[1].name, "ClickAt");
        assert_eq!(calls[1].arguments.to_string_lossy(), "{\"x\":5,\"y\":6}");
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn test_index_zero_quirk_splits_on_new_id() {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(0, Some("call_1"), None, Some("{")));
        builder.append(delta(0, Some("call_1"), Some("MoveTo"), Some("}")));
        builder.append(delta(0, Some("call_2"), None, Some("{}")));

        let calls = builder.build();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "MoveTo");
        assert_eq!(calls[0].arguments.to_string_lossy(), "{}");
        assert_eq!(calls[1].id, "call_2");
    }

    #[test]
    fn test_missing_ids_are_synthesized_and_distinct() {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(1, None, Some("GetScreenSize"), None));
        builder.append(delta(2, Some(""), Some("GetMousePosition"), None));
        builder.append(delta(3, Some("  "), Some("TakeScreenshot"), None));

        let calls = builder.build();
        assert_eq!(calls.len(), 3);
        for call in &calls {
            assert!(call.id.starts_with("call_"), "bad id {}", call.id);
        }
        assert_ne!(calls[0].id, calls[1].id);
        assert_ne!(calls[1].id, calls[2].id);
        assert_ne!(calls[0].id, calls[2].id);
    }

    #[test]
    fn test_late_backend_id_replaces_synthesized_one() {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(1, None, Some("ClickAt"), None));
        builder.append(delta(1, Some("call_real"), None, None));
        builder.append(delta(1, Some("call_other"), None, None));

        let calls = builder.build();
        assert_eq!(calls[0].id, "call_real");
    }

    #[test]
    fn test_name_recorded_once() {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(1, Some("c"), Some(""), None));
        builder.append(delta(1, None, Some("PressKey"), None));
        builder.append(delta(1, None, Some("ReleaseKey"), None));

        let calls = builder.build();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "PressKey");
    }

    #[test]
    fn test_index_zero_repeated_id_and_name_stay_one_call() {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(0, Some("call_1"), Some("ClickAt"), Some("{\"x\":1,")));
        builder.append(delta(0, Some("call_1"), Some("ClickAt"), Some("\"y\":2}")));
        builder.append(delta(0, Some("call_2"), Some("ClickAt"), Some("{\"x\":3,")));
        builder.append(delta(0, Some("call_2"), Some("ClickAt"), Some("\"y\":4}")));

        let calls = builder.build();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "ClickAt");
        assert_eq!(calls[0].arguments.to_string_lossy(), "{\"x\":1,\"y\":2}");
        assert_eq!(calls[1].id, "call_2");
        assert_eq!(calls[1].arguments.to_string_lossy(), "{\"x\":3,\"y\":4}");
    }

    #[test]
    fn test_call_without_arguments_has_empty_payload() {
        let mut builder = ToolCallBuilder::new();
        builder.append(delta(1, Some("c"), Some("GetScreenSize"), None));
        let calls = builder.build();
        assert!(calls[0].arguments.is_empty());
    }
}
