//! Fixed-size wire codec shared by every packet type
//!
//! Each packet implements [`WirePacket`]. Multi-byte fields are big-endian and
//! floats travel as their IEEE-754 bit pattern, which is what
//! [`bytes::Buf`]/[`bytes::BufMut`] produce for `&[u8]` and `&mut [u8]`.

use bytes::{Buf, BufMut};

use super::{NetError, Result, TAG_SIZE, Tag, Vec3};

/// Encode/decode contract for one packet type.
pub trait WirePacket: Sized {
    /// Wire discriminant written ahead of the payload
    const TAG: Tag;

    /// Encoded payload size, independent of the in-memory layout
    const WIRE_SIZE: usize;

    /// Size to reserve for this packet. Always the wire size.
    fn wire_size(&self) -> usize {
        Self::WIRE_SIZE
    }

    /// Write the payload into `out`, returning the bytes written.
    ///
    /// Fails with [`NetError::NotEnoughSpace`] carrying `WIRE_SIZE` when `out`
    /// is too short, without writing anything.
    fn encode(&self, out: &mut [u8]) -> Result<usize>;

    /// Read a payload from `buf`. Trailing bytes past `WIRE_SIZE` are ignored.
    fn decode(buf: &[u8]) -> Result<Self>;
}

/// Guard a buffer against the fixed wire size.
pub(crate) fn check_len(len: usize, required: usize) -> Result<()> {
    if len < required {
        return Err(NetError::NotEnoughSpace { required });
    }
    Ok(())
}

pub(crate) fn put_vec3(out: &mut impl BufMut, v: Vec3) {
    out.put_f32(v.x);
    out.put_f32(v.y);
    out.put_f32(v.z);
}

pub(crate) fn get_vec3(buf: &mut impl Buf) -> Vec3 {
    let x = buf.get_f32();
    let y = buf.get_f32();
    let z = buf.get_f32();
    Vec3::new(x, y, z)
}

/// Encode a full datagram (`[tag][payload]`) into `out`.
///
/// Used by endpoints that send without an engine, such as simple clients.
pub fn encode_frame<P: WirePacket>(packet: &P, out: &mut [u8]) -> Result<usize> {
    let required = TAG_SIZE + packet.wire_size();
    check_len(out.len(), required)?;
    out[..TAG_SIZE].copy_from_slice(&P::TAG.to_be_bytes());
    let written = packet.encode(&mut out[TAG_SIZE..])?;
    Ok(TAG_SIZE + written)
}

/// Split a datagram into its host-order tag word and payload.
pub fn split_frame(frame: &[u8]) -> Result<(u32, &[u8])> {
    if frame.len() < TAG_SIZE {
        return Err(NetError::invalid_data("datagram shorter than a tag"));
    }
    let (tag, payload) = frame.split_at(TAG_SIZE);
    let tag = u32::from_be_bytes([tag[0], tag[1], tag[2], tag[3]]);
    Ok((tag, payload))
}
