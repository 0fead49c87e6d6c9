//! # Compression routines
//!
//! [`compress`] and [`compress_with_scratch`] are available when the `alloc`
//! feature is enabled.
//!
//! # Frame layout
//!
//! A frame opens with a little-endian `u16` giving the offset from the body
//! start to the terminator, followed by the body: a run of full packets, each
//! one header byte plus eight elements. Header bit `k` (low to high) selects
//! element `k`: a raw literal byte when clear, a two-byte little-endian match
//! word `offset | ((length - 3) << length_shift)` when set.
//!
//! The byte after the body is the terminator. Its low three bits count the
//! elements of a trailing partial packet (the "addendum"); zero means the
//! input ended exactly on a packet boundary and the frame ends here. A
//! non-zero count is followed by a little-endian `u16` totalling the frame
//! length minus one, the relocated partial packet (header first), and one
//! trailing tag byte. The tag in the terminator's high bits identifies which
//! of the two geometries encoded the frame.
//!
//! # Examples
//!
//! Compressing a buffer into a heap-allocated vector:
//! ```
//! use lzduo::compress::*;
//! # #[allow(non_upper_case_globals)] const input: [u8; 32] = [0u8; 32];
//!
//! # #[cfg(feature = "alloc")] {
//! let frame: Vec<u8> = compress(&input)?;
//! # assert_eq!(frame.len(), 10);
//! # }
//! # Ok::<(), lzduo::Error>(())
//! ```
//!
//! Several compression calls with shared scratch buffers, avoiding needless
//! allocation:
//! ```
//! use lzduo::compress::*;
//! # #[allow(non_upper_case_globals)] const input1: [u8; 32] = [0u8; 32];
//! # #[allow(non_upper_case_globals)] const input2: [u8; 32] = [0u8; 32];
//!
//! # #[cfg(feature = "alloc")] {
//! let mut scratch = Scratch::new();
//! let frame1 = compress_with_scratch(&input1, &mut scratch)?;
//! let frame2 = compress_with_scratch(&input2, &mut scratch)?;
//! # assert_eq!(frame1.len(), 10);
//! # assert_eq!(frame2.len(), 10);
//! # }
//! # Ok::<(), lzduo::Error>(())
//! ```
//!
//! `#![no_std]` compatible compression:
//! ```
//! use lzduo::compress::*;
//! # #[allow(non_upper_case_globals)] const input: [u8; 32] = [0u8; 32];
//!
//! // Allocate dst on stack, with worst-case frame size
//! let mut dst = [0u8; compress_worst_size()];
//! // Allocate scratch storage (real applications should use thread_local or Mutex)
//! static mut SCRATCH: Scratch = Scratch::new_const();
//! # #[allow(static_mut_refs)]
//! let size = compress_no_alloc(&input, &mut dst, unsafe { &mut SCRATCH })?;
//! # assert_eq!(size, 10);
//! # Ok::<(), lzduo::Error>(())
//! ```

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

#[cfg(all(feature = "alloc", not(feature = "std")))]
use alloc::{boxed::Box, vec::Vec};
use core::cmp;
#[cfg(all(feature = "alloc", feature = "std"))]
use std::{boxed::Box, vec::Vec};

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Error;

#[cfg(feature = "alloc")]
/// Compress `src` into a freshly allocated `Vec<u8>` using temporary scratch
/// buffers.
pub fn compress(src: &[u8]) -> Result<Vec<u8>, Error> {
    let mut scratch = Scratch::new();
    compress_with_scratch(src, &mut scratch)
}

#[cfg(feature = "alloc")]
/// Compress `src`, reusing the provided scratch buffers across calls.
pub fn compress_with_scratch(src: &[u8], scratch: &mut Scratch) -> Result<Vec<u8>, Error> {
    let frame = run_trials(src, scratch)?;
    Ok(frame.to_vec())
}

/// Worst-case frame size: the trial ceiling plus the spill of a final packet
/// started just under it.
pub const fn compress_worst_size() -> usize { TRIAL_CAP - 1 + PACKET_SPILL }

/// Compress without heap allocations, writing the selected frame into `dst`.
///
/// `dst` must be at least [`compress_worst_size`] bytes to be safe for any
/// accepted input; a smaller `dst` fails with [`Error::OutputOverrun`] when
/// the frame does not fit.
pub fn compress_no_alloc(
    src: &[u8],
    dst: &mut [u8],
    scratch: &mut Scratch,
) -> Result<usize, Error> {
    let frame = run_trials(src, scratch)?;
    let dst_chunk = dst.get_mut(..frame.len()).ok_or(Error::OutputOverrun)?;
    dst_chunk.copy_from_slice(frame);
    Ok(frame.len())
}

/// Longest input a frame can describe: the body-length field is 16 bits.
pub const MAX_INPUT_SIZE: usize = 0xFFFD;

/// A trial aborts at the first packet boundary at or past this bound.
const TRIAL_CAP: usize = 0x1000;
/// Per-trial scratch capacity. Generous next to `TRIAL_CAP`, which keeps the
/// packet loop free of per-element bounds checks.
const TRIAL_BUF_LEN: usize = 0x10000;
/// Bytes a final packet can add past its header position: seven two-byte
/// elements plus the four addendum bytes.
const PACKET_SPILL: usize = 1 + 7 * 2 + 4;
/// Minimum bytes a back-reference must cover to beat emitting literals.
const MIN_MATCH_LEN: usize = 3;

type TrialBuf = [u8; TRIAL_BUF_LEN];

/// One trial's window parameters. Offset and length split a 16-bit match word
/// without overlap: `lookback_range` masks the low bits, `length_shift`
/// positions the biased length in the remaining high bits.
struct Geometry {
    lookback_range: usize,
    length_shift: u32,
    max_copy_len: usize,
    tag_byte: u8,
}

impl Geometry {
    const fn new(trial: u16) -> Self {
        let lookback_range = 0x07FF | (trial << 11);
        let length_shift = 16 - (5 - trial as u32);
        let max_copy_len = ((0xFFFF ^ lookback_range) >> length_shift) + 3;
        Self {
            lookback_range: lookback_range as usize,
            length_shift,
            max_copy_len: max_copy_len as usize,
            tag_byte: (0xC0 * (1 - trial)) as u8,
        }
    }
}

/// Trial 0: 2 KiB reach, copies up to 34 bytes.
const NEAR: Geometry = Geometry::new(0);
/// Trial 1: 4 KiB reach, copies capped at 18 bytes.
const FAR: Geometry = Geometry::new(1);

/// Scratch storage backing one compression call: one output buffer per
/// geometry trial. Each trial writes only its own buffer; selection borrows
/// the winner.
#[derive(Clone, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Scratch {
    near: TrialBuf,
    far: TrialBuf,
}

impl Scratch {
    #[cfg(feature = "alloc")]
    pub fn new() -> Box<Self> {
        use zerocopy::FromZeros;
        Self::new_box_zeroed().unwrap()
    }

    pub const fn new_const() -> Self {
        Self { near: [0; TRIAL_BUF_LEN], far: [0; TRIAL_BUF_LEN] }
    }
}

/// Run both geometry trials over `src` and return the shorter frame, with
/// ties going to the near geometry.
fn run_trials<'a>(src: &[u8], scratch: &'a mut Scratch) -> Result<&'a [u8], Error> {
    if src.len() > MAX_INPUT_SIZE {
        return Err(Error::InputTooLarge);
    }

    let near_len = encode_trial(src, &NEAR, &mut scratch.near, TRIAL_CAP);
    // A completed near frame caps the far trial, which can then bail out at a
    // packet boundary instead of encoding to the full ceiling. The cap never
    // changes the selection: a capped abort implies the far frame had already
    // reached the near frame's size.
    let bound = match near_len {
        Some(len) => cmp::min(TRIAL_CAP, len),
        None => TRIAL_CAP,
    };
    let far_len = encode_trial(src, &FAR, &mut scratch.far, bound);

    match (near_len, far_len) {
        (None, None) => Err(Error::CapacityExceeded),
        (Some(near), Some(far)) if near > far => Ok(&scratch.far[..far]),
        (Some(near), _) => Ok(&scratch.near[..near]),
        (None, Some(far)) => Ok(&scratch.far[..far]),
    }
}

/// Encode all of `src` into `out` under one geometry. Returns the frame
/// length, or `None` if a packet would start at or past `bound`.
fn encode_trial(src: &[u8], geo: &Geometry, out: &mut TrialBuf, bound: usize) -> Option<usize> {
    let mut src_pos = 0usize;
    // The first two bytes are reserved for the body length; the byte after
    // them is the first packet's header.
    let mut out_pos = 2usize;

    loop {
        if out_pos >= bound {
            return None;
        }
        let header_pos = out_pos;
        // Header bits accumulate via OR, so the byte must start cleared.
        out[header_pos] = 0;
        out_pos += 1;

        for bit in 0..8u8 {
            if src_pos == src.len() {
                let frame_len = finish_trial(geo, out, header_pos, out_pos, bit);
                let body_len = (header_pos - 2) as u16;
                out[0..2].copy_from_slice(&body_len.to_le_bytes());
                return Some(frame_len);
            }

            let (best_start, best_len) = find_match(src, src_pos, geo);
            if best_len >= MIN_MATCH_LEN {
                out[header_pos] |= 1 << bit;
                let offset = (src_pos - best_start) as u16;
                let word = offset | (((best_len - MIN_MATCH_LEN) as u16) << geo.length_shift);
                out[out_pos..out_pos + 2].copy_from_slice(&word.to_le_bytes());
                out_pos += 2;
                src_pos += best_len;
            } else {
                out[out_pos] = src[src_pos];
                out_pos += 1;
                src_pos += 1;
            }
        }
    }
}

/// Terminate a trial whose input ran out at header bit `bit`; returns the
/// frame length. The caller still owes the body-length prefix.
fn finish_trial(
    geo: &Geometry,
    out: &mut TrialBuf,
    header_pos: usize,
    out_pos: usize,
    bit: u8,
) -> usize {
    if bit == 0 {
        // The input ended on a packet boundary: the just-started header byte
        // becomes the terminator and nothing follows it.
        out[header_pos] = geo.tag_byte;
        return header_pos + 1;
    }

    // Mid-packet: the partial packet becomes the addendum. Flag its unused
    // header bits, then relocate header and elements up three bytes to make
    // room for the addendum prefix.
    out[header_pos] |= 0xFF << bit;
    out.copy_within(header_pos..out_pos, header_pos + 3);

    out[header_pos] = geo.tag_byte | bit;
    let marker = (out_pos + 3) as u16;
    out[header_pos + 1..header_pos + 3].copy_from_slice(&marker.to_le_bytes());
    out[out_pos + 3] = geo.tag_byte;
    out_pos + 4
}

/// Scan the back-window at `pos` for the longest earlier occurrence of the
/// bytes at `pos`, bounded by the geometry's copy cap and the end of input.
/// Later (closer) starts win ties.
fn find_match(src: &[u8], pos: usize, geo: &Geometry) -> (usize, usize) {
    let window_start = pos.saturating_sub(geo.lookback_range);
    let limit = cmp::min(geo.max_copy_len, src.len() - pos);

    let mut best_start = 0usize;
    let mut best_len = 0usize;
    for start in window_start..pos {
        let mut cur_len = 0usize;
        while cur_len < limit && src[start + cur_len] == src[pos + cur_len] {
            cur_len += 1;
        }
        if cur_len >= best_len {
            best_start = start;
            best_len = cur_len;
            if cur_len == geo.max_copy_len {
                break;
            }
        }
    }
    (best_start, best_len)
}
