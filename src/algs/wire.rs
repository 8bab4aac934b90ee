//! Fixed, little-endian wire helpers.
//!
//! Halo payloads themselves are raw `T` bytes in index-list order and carry
//! no header. The only structured record is [`WireCount`], used when
//! neighbours cross-check their list lengths.

use bytemuck::{Pod, Zeroable};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Check a received payload length against what the index lists imply.
pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// A pair of list lengths as seen by the sender: how many values it sends
/// and how many it expects back.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub send_le: u32,
    pub recv_le: u32,
}

impl WireCount {
    pub fn new(send: usize, recv: usize) -> Self {
        Self {
            send_le: (send as u32).to_le(),
            recv_le: (recv as u32).to_le(),
        }
    }

    pub fn send(&self) -> usize {
        u32::from_le(self.send_le) as usize
    }

    pub fn recv(&self) -> usize {
        u32::from_le(self.recv_le) as usize
    }
}

const _: () = {
    assert!(size_of::<WireCount>() == 8);
};
