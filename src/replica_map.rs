// src/replica_map.rs

//! Client replica maps. One bitmap per replica index, kept in sync with the
//! partition table and Base64-encoded for wire publication. Bit and
//! Base64-byte reads are lock-free by construction — both the bitmap and
//! its Base64 rendering are arrays of `AtomicU8` rather than data behind a
//! `RwLock`, so a reader never blocks on a writer. A torn read during a
//! concurrent flip can observe either the old or the new bit; that's a
//! deliberate tradeoff (clients retry on a wrong-node redirect), not a bug
//! to engineer away.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

pub const N_PARTITIONS: usize = 4096;
const BITMAP_BYTES: usize = N_PARTITIONS.div_ceil(8);
const B64_LEN: usize = BITMAP_BYTES.div_ceil(3) * 4;

/// One namespace's map of which partitions this node serves at a given
/// replica index (0 = master, 1.. = prole depth).
pub struct ClientReplicaMap {
    bitmap: Vec<AtomicU8>,
    b64: Vec<AtomicU8>,
    /// Serializes concurrent flips of *this* map; read access never takes it.
    write_lock: Mutex<()>,
}

impl ClientReplicaMap {
    pub fn new() -> Self {
        let bitmap: Vec<AtomicU8> = (0..BITMAP_BYTES).map(|_| AtomicU8::new(0)).collect();
        let b64 = encode_full(&bitmap);
        Self {
            bitmap,
            b64: b64.into_iter().map(AtomicU8::new).collect(),
            write_lock: Mutex::new(()),
        }
    }

    /// Lock-free bit test.
    pub fn bit(&self, pid: u16) -> bool {
        let pid = pid as usize;
        let byte = self.bitmap[pid >> 3].load(Ordering::Relaxed);
        (byte >> (pid & 7)) & 1 == 1
    }

    /// Lock-free snapshot of the current Base64 rendering.
    pub fn b64_string(&self) -> String {
        let bytes: Vec<u8> = self.b64.iter().map(|b| b.load(Ordering::Relaxed)).collect();
        // Every byte we ever store came from the Base64 alphabet, so this is
        // always valid UTF-8.
        String::from_utf8(bytes).expect("base64 rendering is always ASCII")
    }

    /// Sets or clears `pid`'s bit and re-encodes the 3-byte window that
    /// contains it, under `write_lock`. Returns whether the bit changed.
    fn set_bit(&self, pid: u16, owned: bool) -> bool {
        let pid = pid as usize;
        let byte_idx = pid >> 3;
        let mask = 1u8 << (pid & 7);
        let _guard = self.write_lock.lock();
        let before = self.bitmap[byte_idx].load(Ordering::Relaxed);
        let was_set = before & mask != 0;
        if was_set == owned {
            return false;
        }
        let after = if owned { before | mask } else { before & !mask };
        self.bitmap[byte_idx].store(after, Ordering::Relaxed);
        self.reencode_chunk_containing(byte_idx);
        true
    }

    /// Re-encodes only the 3-byte window that contains `byte_idx`, writing a
    /// 4-char Base64 window.
    fn reencode_chunk_containing(&self, byte_idx: usize) {
        let chunk_idx = byte_idx / 3;
        let chunk_start = chunk_idx * 3;
        let chunk_len = (BITMAP_BYTES - chunk_start).min(3);
        let chunk: Vec<u8> = (0..chunk_len)
            .map(|i| self.bitmap[chunk_start + i].load(Ordering::Relaxed))
            .collect();
        let encoded = BASE64.encode(&chunk);
        let out_start = chunk_idx * 4;
        for (i, byte) in encoded.bytes().enumerate() {
            self.b64[out_start + i].store(byte, Ordering::Relaxed);
        }
    }

    /// Zeroes the bitmap and re-encodes from scratch.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        for b in &self.bitmap {
            b.store(0, Ordering::Relaxed);
        }
        let fresh = encode_full(&self.bitmap);
        for (slot, byte) in self.b64.iter().zip(fresh) {
            slot.store(byte, Ordering::Relaxed);
        }
    }
}

impl Default for ClientReplicaMap {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_full(bitmap: &[AtomicU8]) -> Vec<u8> {
    let bytes: Vec<u8> = bitmap.iter().map(|b| b.load(Ordering::Relaxed)).collect();
    let mut out = Vec::with_capacity(B64_LEN);
    for chunk in bytes.chunks(3) {
        out.extend_from_slice(BASE64.encode(chunk).as_bytes());
    }
    out
}

/// Applies an externally-computed ownership decision (`owned_at_index`) to
/// every replica index of a namespace's maps. Kept free of any dependency
/// on `Namespace`/`PartitionRecord` so it can be
/// unit-tested against bare maps; `Namespace::update_replica_maps` is the
/// thin adapter that supplies `owned_at_index` from the partition table.
pub fn update_maps(maps: &[ClientReplicaMap], owned_at_index: Option<usize>, pid: u16) -> bool {
    let mut changed = false;
    for (i, map) in maps.iter().enumerate() {
        let owned = owned_at_index == Some(i);
        if map.set_bit(pid, owned) {
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_map_is_all_clear_and_matches_its_own_base64() {
        let map = ClientReplicaMap::new();
        assert!(!map.bit(0));
        assert!(!map.bit(4095));
        let expected = base64::engine::general_purpose::STANDARD.encode(vec![0u8; BITMAP_BYTES]);
        assert_eq!(map.b64_string(), expected);
    }

    #[test]
    fn update_sets_exactly_one_map_and_flips_b64() {
        let maps: Vec<ClientReplicaMap> = (0..3).map(|_| ClientReplicaMap::new()).collect();
        let changed = update_maps(&maps, Some(1), 10);
        assert!(changed);
        assert!(!maps[0].bit(10));
        assert!(maps[1].bit(10));
        assert!(!maps[2].bit(10));

        let mut bytes = vec![0u8; BITMAP_BYTES];
        bytes[10 >> 3] |= 1 << (10 & 7);
        let expected = base64::engine::general_purpose::STANDARD.encode(bytes);
        assert_eq!(maps[1].b64_string(), expected);
    }

    #[test]
    fn repeated_update_with_unchanged_state_is_idempotent() {
        let maps: Vec<ClientReplicaMap> = (0..2).map(|_| ClientReplicaMap::new()).collect();
        assert!(update_maps(&maps, Some(0), 5));
        assert!(!update_maps(&maps, Some(0), 5));
    }

    #[test]
    fn clear_then_replay_reproduces_the_pre_clear_snapshot() {
        let maps: Vec<ClientReplicaMap> = (0..2).map(|_| ClientReplicaMap::new()).collect();
        update_maps(&maps, Some(0), 1);
        update_maps(&maps, Some(1), 4094);
        let before: Vec<String> = maps.iter().map(|m| m.b64_string()).collect();

        for m in &maps {
            m.clear();
        }
        update_maps(&maps, Some(0), 1);
        update_maps(&maps, Some(1), 4094);
        let after: Vec<String> = maps.iter().map(|m| m.b64_string()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn last_chunk_handles_a_short_final_window() {
        // BITMAP_BYTES (512) is not a multiple of 3; the last chunk has 2
        // bytes. Flipping a bit in it must not panic or corrupt earlier bytes.
        let map = ClientReplicaMap::new();
        let last_pid = (N_PARTITIONS - 1) as u16;
        map.set_bit(last_pid, true);
        assert!(map.bit(last_pid));
        let mut bytes = vec![0u8; BITMAP_BYTES];
        bytes[BITMAP_BYTES - 1] |= 1 << ((last_pid as usize) & 7);
        let expected = base64::engine::general_purpose::STANDARD.encode(bytes);
        assert_eq!(map.b64_string(), expected);
    }
}
