use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use finch_core::ids::ToolCallId;
use finch_core::stream::StreamEvent;

use crate::arguments::ArgumentBuffer;

/// A fully reassembled tool invocation with parsed arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct CompleteToolCall {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: Value,
}

/// What a reassembly pass emits: visible text the moment it arrives, and
/// tool calls only once fully assembled.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnItem {
    Text(String),
    Call(CompleteToolCall),
}

struct PendingToolCall {
    id: ToolCallId,
    name: String,
    buffer: ArgumentBuffer,
}

/// Reconstructs complete tool calls from interleaved streamed fragments.
///
/// Fragments are correlated by stream index, the only key stable across
/// fragments (the call id is only present on the start fragment, and
/// fragments of different calls interleave with each other and with text).
/// Text is never buffered. A pending call finalizes when its index is reused
/// by a new call, or on a terminal signal (`Usage`, `End`, or `finish`).
/// Tied to one model turn; not restartable.
pub struct StreamReassembler {
    pending: BTreeMap<usize, PendingToolCall>,
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }

    /// Consume one stream event, producing zero or more emissions.
    pub fn feed(&mut self, event: StreamEvent) -> Vec<TurnItem> {
        match event {
            StreamEvent::Text { delta } => vec![TurnItem::Text(delta)],

            StreamEvent::ToolCallStart { index, id, name } => {
                // A new call under an occupied slot means the previous call
                // is done streaming; finalize it before the new one begins.
                let mut items = Vec::new();
                if let Some(previous) = self.pending.remove(&index) {
                    items.extend(finalize(previous));
                }
                self.pending.insert(
                    index,
                    PendingToolCall {
                        id,
                        name,
                        buffer: ArgumentBuffer::new(),
                    },
                );
                items
            }

            StreamEvent::ToolCallDelta { index, fragment } => {
                match self.pending.get_mut(&index) {
                    Some(call) => call.buffer.push(&fragment),
                    None => {
                        warn!(index, "argument fragment for unknown tool call; dropped");
                    }
                }
                Vec::new()
            }

            // The usage chunk arrives after all content deltas, so it doubles
            // as a finalization signal for anything still pending.
            StreamEvent::Usage { total_tokens } => {
                debug!(total_tokens, "model turn token usage");
                self.finalize_all()
            }

            StreamEvent::End => self.finalize_all(),

            // Transport failures abort the turn upstream; nothing pending is
            // worth emitting from a broken stream.
            StreamEvent::Error { .. } => Vec::new(),
        }
    }

    /// Finalize every still-pending call. Call when the event stream is
    /// exhausted without an explicit End.
    pub fn finish(&mut self) -> Vec<TurnItem> {
        self.finalize_all()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn finalize_all(&mut self) -> Vec<TurnItem> {
        let pending = std::mem::take(&mut self.pending);
        pending.into_values().flat_map(finalize).collect()
    }
}

fn finalize(call: PendingToolCall) -> Option<TurnItem> {
    match call.buffer.parse() {
        Ok(arguments) => Some(TurnItem::Call(CompleteToolCall {
            id: call.id,
            name: call.name,
            arguments,
        })),
        Err(e) => {
            // Malformed argument JSON: drop the call rather than dispatch a
            // partial invocation. Not retried.
            warn!(tool = %call.name, error = %e, "dropping tool call with malformed arguments");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finch_core::errors::ProviderError;
    use serde_json::json;

    fn start(index: usize, id: &str, name: &str) -> StreamEvent {
        StreamEvent::ToolCallStart {
            index,
            id: ToolCallId::from_raw(id),
            name: name.into(),
        }
    }

    fn delta(index: usize, fragment: &str) -> StreamEvent {
        StreamEvent::ToolCallDelta {
            index,
            fragment: fragment.into(),
        }
    }

    fn text(s: &str) -> StreamEvent {
        StreamEvent::Text { delta: s.into() }
    }

    fn feed_all(events: Vec<StreamEvent>) -> Vec<TurnItem> {
        let mut reassembler = StreamReassembler::new();
        let mut items = Vec::new();
        for event in events {
            items.extend(reassembler.feed(event));
        }
        items.extend(reassembler.finish());
        items
    }

    #[test]
    fn text_is_emitted_immediately() {
        let mut reassembler = StreamReassembler::new();
        let items = reassembler.feed(text("Hello"));
        assert_eq!(items, vec![TurnItem::Text("Hello".into())]);
    }

    #[test]
    fn text_only_stream_produces_no_calls() {
        let items = feed_all(vec![text("only "), text("words"), StreamEvent::End]);
        assert_eq!(
            items,
            vec![
                TurnItem::Text("only ".into()),
                TurnItem::Text("words".into()),
            ]
        );
    }

    #[test]
    fn single_call_assembles_across_deltas() {
        let items = feed_all(vec![
            start(0, "call_1", "get_stock_price"),
            delta(0, "{\"tick"),
            delta(0, "er\":\"AAPL\"}"),
            StreamEvent::End,
        ]);
        assert_eq!(
            items,
            vec![TurnItem::Call(CompleteToolCall {
                id: ToolCallId::from_raw("call_1"),
                name: "get_stock_price".into(),
                arguments: json!({"ticker": "AAPL"}),
            })]
        );
    }

    #[test]
    fn call_not_finalized_before_terminating_signal() {
        let mut reassembler = StreamReassembler::new();
        assert!(reassembler.feed(start(0, "call_1", "get_news")).is_empty());
        assert!(reassembler.feed(delta(0, "{\"query\":\"fed\"}")).is_empty());
        assert_eq!(reassembler.pending_count(), 1);

        let items = reassembler.feed(StreamEvent::End);
        assert_eq!(items.len(), 1);
        assert_eq!(reassembler.pending_count(), 0);
    }

    #[test]
    fn text_flows_while_other_calls_accumulate() {
        let items = feed_all(vec![
            start(0, "call_1", "get_news"),
            delta(0, "{\"query\":"),
            text("Let me check. "),
            delta(0, "\"rates\"}"),
            text("One moment."),
            StreamEvent::End,
        ]);
        // Both text chunks precede the call, in original order.
        assert_eq!(items[0], TurnItem::Text("Let me check. ".into()));
        assert_eq!(items[1], TurnItem::Text("One moment.".into()));
        assert!(matches!(&items[2], TurnItem::Call(c) if c.name == "get_news"));
    }

    #[test]
    fn interleaved_calls_reassemble_by_index() {
        let items = feed_all(vec![
            start(0, "call_a", "get_stock_price"),
            start(1, "call_b", "get_news"),
            delta(0, "{\"ticker\":"),
            delta(1, "{\"query\":\"earn"),
            delta(0, "\"MSFT\"}"),
            delta(1, "ings\"}"),
            StreamEvent::End,
        ]);
        let calls: Vec<&CompleteToolCall> = items
            .iter()
            .filter_map(|i| match i {
                TurnItem::Call(c) => Some(c),
                TurnItem::Text(_) => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments, json!({"ticker": "MSFT"}));
        assert_eq!(calls[1].arguments, json!({"query": "earnings"}));
    }

    #[test]
    fn index_reuse_finalizes_previous_call() {
        let mut reassembler = StreamReassembler::new();
        reassembler.feed(start(0, "call_1", "get_stock_price"));
        reassembler.feed(delta(0, "{\"ticker\":\"AAPL\"}"));

        // Same slot, new call: the first must come out now.
        let items = reassembler.feed(start(0, "call_2", "get_stock_price"));
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            TurnItem::Call(c) if c.id == ToolCallId::from_raw("call_1")
        ));

        reassembler.feed(delta(0, "{\"ticker\":\"TSLA\"}"));
        let items = reassembler.feed(StreamEvent::End);
        assert!(matches!(
            &items[0],
            TurnItem::Call(c) if c.id == ToolCallId::from_raw("call_2")
                && c.arguments == json!({"ticker": "TSLA"})
        ));
    }

    #[test]
    fn malformed_arguments_drop_the_call() {
        let items = feed_all(vec![
            start(0, "call_1", "get_stock_price"),
            delta(0, "{\"ticker\": oops"),
            StreamEvent::End,
        ]);
        assert!(items.is_empty());
    }

    #[test]
    fn usage_event_finalizes_pending_calls() {
        let mut reassembler = StreamReassembler::new();
        reassembler.feed(start(0, "call_1", "retrieve_portfolio"));
        reassembler.feed(delta(0, "{}"));

        let items = reassembler.feed(StreamEvent::Usage { total_tokens: 321 });
        assert_eq!(items.len(), 1);
        assert_eq!(reassembler.pending_count(), 0);
    }

    #[test]
    fn finish_is_idempotent() {
        let mut reassembler = StreamReassembler::new();
        reassembler.feed(start(0, "call_1", "get_news"));
        reassembler.feed(delta(0, "{}"));
        assert_eq!(reassembler.finish().len(), 1);
        assert!(reassembler.finish().is_empty());
    }

    #[test]
    fn delta_for_unknown_index_is_dropped() {
        let mut reassembler = StreamReassembler::new();
        assert!(reassembler.feed(delta(7, "{\"x\":1}")).is_empty());
        assert!(reassembler.finish().is_empty());
    }

    #[test]
    fn error_event_emits_nothing() {
        let mut reassembler = StreamReassembler::new();
        reassembler.feed(start(0, "call_1", "get_news"));
        reassembler.feed(delta(0, "{}"));
        let items = reassembler.feed(StreamEvent::Error {
            error: ProviderError::NetworkError("reset".into()),
        });
        assert!(items.is_empty());
    }

    #[test]
    fn fragment_partition_is_associative() {
        let arguments = r#"{"ticker":"NVDA","start_date":"2024-01-01","end_date":"2024-06-30"}"#;
        let unsplit = feed_all(vec![
            start(0, "call_1", "get_historical_stock_data"),
            delta(0, arguments),
            StreamEvent::End,
        ]);

        for split in [1, 5, 12, 30, arguments.len() - 1] {
            let events = vec![
                start(0, "call_1", "get_historical_stock_data"),
                delta(0, &arguments[..split]),
                delta(0, &arguments[split..]),
                StreamEvent::End,
            ];
            assert_eq!(feed_all(events), unsplit, "split at {split}");
        }
    }

    #[test]
    fn emits_m_texts_and_at_most_n_calls() {
        // Three text events, three indices, one with malformed arguments.
        let items = feed_all(vec![
            text("a"),
            start(0, "c0", "t0"),
            text("b"),
            start(1, "c1", "t1"),
            start(2, "c2", "t2"),
            delta(0, "{}"),
            delta(1, "not json"),
            delta(2, "{\"k\":2}"),
            text("c"),
            StreamEvent::End,
        ]);
        let texts = items
            .iter()
            .filter(|i| matches!(i, TurnItem::Text(_)))
            .count();
        let calls = items
            .iter()
            .filter(|i| matches!(i, TurnItem::Call(_)))
            .count();
        assert_eq!(texts, 3);
        assert_eq!(calls, 2); // the malformed one was dropped
    }
}
