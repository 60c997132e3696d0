//! Channel reassignment records
//!
//! Group-call parts carry a compact table telling which decoder channel slot
//! carries which speaker from a given frame onwards. The layout is a flat
//! run of 4-byte signed integers in native byte order:
//!
//! ```text
//! [channel_count][update_count]
//! update_count x [frame_index][channel_id][ssrc]
//! ```
//!
//! `channel_count` is carried along but never checked against the groups
//! that follow.

use crate::error::{PartError, PartResult};
use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use std::io::Cursor;

/// Size in bytes of one `[frame_index][channel_id][ssrc]` group
pub const CHANNEL_UPDATE_SIZE: usize = 12;

/// A single reassignment: from `frame_index` on, slot `channel_id` carries `ssrc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelUpdate {
    /// 10ms frame index at which the update takes effect
    pub frame_index: i32,
    /// Decoder channel slot
    pub channel_id: i32,
    /// Speaker stream source identifier
    pub ssrc: u32,
}

/// Decoded record table including the declared channel count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelUpdateTable {
    /// Channel count as declared by the header
    pub channel_count: i32,
    /// Updates in their original order
    pub updates: Vec<ChannelUpdate>,
}

fn read_i32(buf: &mut Cursor<&[u8]>, field: &'static str) -> PartResult<i32> {
    if buf.remaining() < 4 {
        return Err(PartError::Truncated {
            field,
            offset: buf.position() as usize,
        });
    }
    Ok(buf.get_i32_ne())
}

/// Decode a record table starting at `offset`
///
/// On success `offset` is moved past the table. On failure it is left
/// untouched and the error names the field that ran past the end.
pub fn try_parse_channel_updates(
    data: &[u8],
    offset: &mut usize,
) -> PartResult<ChannelUpdateTable> {
    let mut buf = Cursor::new(data);
    buf.set_position(*offset as u64);

    let channel_count = read_i32(&mut buf, "channel_count")?;
    let update_count = read_i32(&mut buf, "update_count")?.max(0) as usize;

    // The count is untrusted; never reserve more than the bytes could hold.
    let mut updates = Vec::with_capacity(update_count.min(buf.remaining() / CHANNEL_UPDATE_SIZE));
    for _ in 0..update_count {
        let frame_index = read_i32(&mut buf, "frame_index")?;
        let channel_id = read_i32(&mut buf, "channel_id")?;
        let ssrc = read_i32(&mut buf, "ssrc")? as u32;

        updates.push(ChannelUpdate {
            frame_index,
            channel_id,
            ssrc,
        });
    }

    *offset = buf.position() as usize;
    Ok(ChannelUpdateTable {
        channel_count,
        updates,
    })
}

/// Decode the reassignment records starting at `offset`
///
/// All-or-nothing: any truncation yields an empty sequence, which callers
/// treat the same as a part without reassignments.
pub fn parse_channel_updates(data: &[u8], offset: &mut usize) -> Vec<ChannelUpdate> {
    match try_parse_channel_updates(data, offset) {
        Ok(table) => table.updates,
        Err(e) => {
            tracing::debug!("Discarding channel update records: {}", e);
            Vec::new()
        }
    }
}

/// Encode a record table in the same layout `parse_channel_updates` reads
pub fn write_channel_updates(channel_count: i32, updates: &[ChannelUpdate], buf: &mut BytesMut) {
    buf.reserve(8 + updates.len() * CHANNEL_UPDATE_SIZE);
    buf.put_i32_ne(channel_count);
    buf.put_i32_ne(updates.len() as i32);
    for update in updates {
        buf.put_i32_ne(update.frame_index);
        buf.put_i32_ne(update.channel_id);
        buf.put_i32_ne(update.ssrc as i32);
    }
}
