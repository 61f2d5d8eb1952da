//! The access-mode state machine.
//!
//! A channel carries two independent facets: "r" (read-gate) and "w"
//! (write-allowlist). Each facet is either absent (open) or present (gated)
//! with parameters. Facets are explicit `Option`s of typed structs rather
//! than map-key presence, so the state machine is exhaustive and testable.
//!
//! Requests carry an ordered batch of [`ModeOp`]s which are applied
//! sequentially to the in-memory channel and then persisted once. Later ops
//! in a batch can override earlier ones.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::channel::Channel;
use crate::identity::Handle;

/// The read-gate facet: its presence makes the channel secret.
///
/// The password is optional; arbitrary extra parameters are retained across
/// merges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadGate {
    /// Password required to read, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Unrecognized gate parameters, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The write-allowlist facet: its presence makes the channel moderated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAllowlist {
    /// Handles authorized to write ("ops"). Deduplicated, unordered.
    pub ops: BTreeSet<Handle>,
}

/// Both mode facets of a channel.
///
/// Serializes to the wire shape `{"r": {...}, "w": {"ops": [...]}}` with
/// absent facets omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelModes {
    /// Read-gate ("r").
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub read: Option<ReadGate>,

    /// Write-allowlist ("w").
    #[serde(rename = "w", skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteAllowlist>,
}

impl ChannelModes {
    /// A channel is secret iff the read-gate facet is present.
    pub fn is_secret(&self) -> bool {
        self.read.is_some()
    }

    /// A channel is moderated iff the write-allowlist facet is present.
    pub fn is_moderated(&self) -> bool {
        self.write.is_some()
    }
}

/// Parameters carried by a single mode operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeParams {
    /// For `+r`: the gate password. An explicitly empty string removes the
    /// gate instead of setting it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// For `+w`/`-w`: handles to add to or remove from the allowlist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops: Option<Vec<Handle>>,

    /// Any further gate parameters, merged key-wise into the read-gate.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One operation in a mode batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeOp {
    /// The operation name: `+r`, `-r`, `+w` or `-w`. Unknown names are
    /// ignored.
    pub mode: String,

    /// Operation parameters. Absent params behave as empty.
    #[serde(default)]
    pub params: ModeParams,
}

/// A request-level mode batch: a single op or an ordered list of ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeBatch {
    /// A single mode object.
    One(ModeOp),
    /// An ordered list of mode objects.
    Many(Vec<ModeOp>),
}

impl ModeBatch {
    /// Flatten into an ordered slice-compatible vector.
    pub fn into_ops(self) -> Vec<ModeOp> {
        match self {
            ModeBatch::One(op) => vec![op],
            ModeBatch::Many(ops) => ops,
        }
    }
}

/// Apply an ordered batch of mode operations to a channel's modes.
///
/// The caller persists the resulting state once, after the whole batch.
pub fn apply_mode_batch(channel: &mut Channel, ops: &[ModeOp]) {
    for op in ops {
        apply_one(&mut channel.modes, op);
    }
}

fn apply_one(modes: &mut ChannelModes, op: &ModeOp) {
    match op.mode.as_str() {
        "+r" => {
            // An explicitly empty password reopens the channel.
            if op.params.password.as_deref() == Some("") {
                modes.read = None;
                return;
            }
            let gate = modes.read.get_or_insert_with(ReadGate::default);
            if let Some(password) = &op.params.password {
                gate.password = Some(password.clone());
            }
            // Shallow key-wise merge; unspecified keys are retained. An
            // "ops" key is meaningless on the read facet but merges like
            // any other gate parameter.
            if let Some(ops) = &op.params.ops {
                let handles = ops
                    .iter()
                    .map(|h| Value::String(h.as_str().to_string()))
                    .collect();
                gate.extra.insert("ops".to_string(), Value::Array(handles));
            }
            for (k, v) in &op.params.extra {
                gate.extra.insert(k.clone(), v.clone());
            }
        }
        "-r" => {
            modes.read = None;
        }
        "+w" => {
            let list = modes.write.get_or_insert_with(WriteAllowlist::default);
            if let Some(ops) = &op.params.ops {
                list.ops.extend(ops.iter().cloned());
            }
        }
        "-w" => {
            if modes.write.is_none() {
                return;
            }
            match &op.params.ops {
                Some(ops) => {
                    if let Some(list) = modes.write.as_mut() {
                        for handle in ops {
                            list.ops.remove(handle);
                        }
                    }
                }
                // No ops given: drop the whole facet, reopening writes.
                None => modes.write = None,
            }
        }
        // Unknown op names are ignored.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;
    use serde_json::json;

    fn channel() -> Channel {
        Channel::fresh(ChannelId::new("test").unwrap())
    }

    fn op(mode: &str, params: Value) -> ModeOp {
        serde_json::from_value(json!({ "mode": mode, "params": params })).unwrap()
    }

    #[test]
    fn test_plus_r_sets_gate() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "p" }))]);
        assert!(ch.modes.is_secret());
        assert_eq!(ch.modes.read.as_ref().unwrap().password.as_deref(), Some("p"));
    }

    #[test]
    fn test_plus_r_empty_password_reopens() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "p" }))]);
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "" }))]);
        assert!(!ch.modes.is_secret());
    }

    #[test]
    fn test_plus_r_merges_extra_params() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "p", "custom": "value" }))]);
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "q" }))]);

        let gate = ch.modes.read.as_ref().unwrap();
        assert_eq!(gate.password.as_deref(), Some("q"));
        // Unspecified keys are retained across merges.
        assert_eq!(gate.extra.get("custom"), Some(&json!("value")));
    }

    #[test]
    fn test_plus_r_merges_ops_key_like_any_param() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "p", "ops": ["a"] }))]);

        // "ops" lands on the gate as a plain parameter; it does not touch
        // the write facet.
        let gate = ch.modes.read.as_ref().unwrap();
        assert_eq!(gate.extra.get("ops"), Some(&json!(["a"])));
        assert!(!ch.modes.is_moderated());
    }

    #[test]
    fn test_minus_r_removes_gate() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "p" }))]);
        apply_mode_batch(&mut ch, &[op("-r", json!({}))]);
        assert!(!ch.modes.is_secret());
    }

    #[test]
    fn test_minus_r_absent_is_noop() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("-r", json!({}))]);
        assert!(!ch.modes.is_secret());
    }

    #[test]
    fn test_plus_w_unions_dedup() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+w", json!({ "ops": ["a"] }))]);
        apply_mode_batch(&mut ch, &[op("+w", json!({ "ops": ["b", "a"] }))]);

        let list = ch.modes.write.as_ref().unwrap();
        assert_eq!(list.ops.len(), 2);
        assert!(list.ops.contains(&Handle::from_string("a")));
        assert!(list.ops.contains(&Handle::from_string("b")));
    }

    #[test]
    fn test_minus_w_with_ops_is_set_difference() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+w", json!({ "ops": ["a", "b"] }))]);
        apply_mode_batch(&mut ch, &[op("-w", json!({ "ops": ["a"] }))]);

        let list = ch.modes.write.as_ref().unwrap();
        assert!(!list.ops.contains(&Handle::from_string("a")));
        assert!(list.ops.contains(&Handle::from_string("b")));
    }

    #[test]
    fn test_minus_w_without_ops_drops_facet() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+w", json!({ "ops": ["a"] }))]);
        apply_mode_batch(&mut ch, &[ModeOp { mode: "-w".into(), params: ModeParams::default() }]);
        assert!(!ch.modes.is_moderated());
    }

    #[test]
    fn test_unknown_op_ignored() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[op("+x", json!({ "password": "p" }))]);
        assert_eq!(ch.modes, ChannelModes::default());
    }

    #[test]
    fn test_later_ops_override_earlier() {
        let mut ch = channel();
        let batch = [
            op("+r", json!({ "password": "p" })),
            op("-r", json!({})),
        ];
        apply_mode_batch(&mut ch, &batch);
        assert!(!ch.modes.is_secret());
    }

    #[test]
    fn test_mode_batch_single_or_list() {
        let one: ModeBatch = serde_json::from_value(json!({ "mode": "-r" })).unwrap();
        assert_eq!(one.into_ops().len(), 1);

        let many: ModeBatch =
            serde_json::from_value(json!([{ "mode": "-r" }, { "mode": "-w" }])).unwrap();
        assert_eq!(many.into_ops().len(), 2);
    }

    #[test]
    fn test_modes_wire_shape() {
        let mut ch = channel();
        apply_mode_batch(&mut ch, &[
            op("+r", json!({ "password": "p", "custom": "value" })),
            op("+w", json!({ "ops": ["a"] })),
        ]);

        let wire = serde_json::to_value(&ch.modes).unwrap();
        assert_eq!(
            wire,
            json!({ "r": { "password": "p", "custom": "value" }, "w": { "ops": ["a"] } })
        );

        let back: ChannelModes = serde_json::from_value(wire).unwrap();
        assert_eq!(back, ch.modes);
    }
}
