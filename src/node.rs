// src/node.rs

//! Node identity.

/// Opaque 64-bit cluster node identifier. `0` means "none/unset".
pub type NodeId = u64;

/// Sentinel for an empty replica slot or an absent `origin`/`target`.
pub const NODE_ID_NONE: NodeId = 0;

/// Renders a node id the way the info surface prints `origin`/`target`: hex,
/// with the sentinel shown as a bare `0` rather than `0x0`.
pub fn format_node_id(id: NodeId) -> String {
    if id == NODE_ID_NONE {
        "0".to_string()
    } else {
        format!("{id:x}")
    }
}
