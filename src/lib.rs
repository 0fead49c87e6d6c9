#![cfg_attr(not(feature = "std"), no_std)]
//! # lzduo
//!
//! A minimal, MIT-licensed implementation of a dual-geometry LZSS packet
//! compression format.
//!
//! Input bytes are packed into frames of flag-driven packets: one header byte
//! whose bits select, element by element, between a raw literal and a
//! two-byte back-reference into a sliding window. The same input is encoded
//! under two window geometries (a near window with long copies, and a window
//! twice as deep with shorter copies) and the shorter frame is returned.
//! Frames are self-delimiting and carry the winning geometry in their
//! terminator byte.
//!
//! ### Features
//!
//! - MIT-licensed
//! - Simple one-call compression routine
//! - `#![no_std]` compatible
//!
//! ### Usage
//!
//! See the [`compress`] module documentation for reference.
//!
//! In `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! lzduo = "0.1.0"
//! ```
//!
//! Or, to only enable certain features:
//!
//! ```toml
//! [dependencies.lzduo]
//! version = "0.1.0"
//! default-features = false
//! features = ["alloc"]
//! ```
//!
//! - `alloc`: Enables compression functions that perform heap allocation.
//!            Without `std`, this uses `extern crate alloc`.
//! - `std`: Enables use of `std`. Implies `alloc`.
//! - `python`: Builds the Python extension module (implies `std`).
//!
//! Default features: `std`.
//!
//! ```
//! use lzduo::compress::*;
//!
//! # #[cfg(feature = "alloc")] {
//! let frame = compress(b"ABCABCABCABC")?;
//! assert_eq!(frame.len(), 12);
//! # }
//! # Ok::<(), lzduo::Error>(())
//! ```

pub mod compress;
#[cfg(feature = "python")]
mod python;

/// Error result codes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The input buffer could not be accessed as a contiguous byte view.
    InvalidInput,
    /// Input is longer than the frame's 16-bit body-length field can
    /// describe.
    InputTooLarge,
    /// Both window geometries overran the output ceiling; the input does not
    /// fit in a single frame.
    CapacityExceeded,
    /// Destination buffer was not large enough to store the selected frame.
    OutputOverrun,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::InvalidInput => write!(f, "invalid input"),
            Error::InputTooLarge => write!(f, "input too large"),
            Error::CapacityExceeded => write!(f, "capacity exceeded"),
            Error::OutputOverrun => write!(f, "output overrun"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
    #[cfg(not(feature = "std"))]
    extern crate alloc;

    #[cfg(not(feature = "std"))]
    use alloc::{vec, vec::Vec};

    use rand::{Rng, RngCore, SeedableRng};

    use crate::compress::{compress, compress_worst_size};
    use crate::Error;

    /// Expand a frame back into the original bytes, checking the frame
    /// structure along the way. Kept independent of the encoder so round
    /// trips actually validate the emitted layout.
    fn inflate(frame: &[u8]) -> Vec<u8> {
        let body_len = u16::from_le_bytes([frame[0], frame[1]]) as usize;
        let term_pos = 2 + body_len;
        let term = frame[term_pos];
        let (range, shift, tag) = if term & 0xC0 == 0xC0 {
            (0x07FFusize, 11u32, 0xC0u8)
        } else {
            (0x0FFF, 12, 0x00)
        };

        let mut out = Vec::new();
        let mut pos = 2;
        while pos < term_pos {
            let header = frame[pos];
            pos = take_elements(frame, pos + 1, header, 8, range, shift, &mut out);
        }
        assert_eq!(pos, term_pos, "body must end at the terminator");

        let trailing = term & 0x07;
        if trailing == 0 {
            assert_eq!(frame.len(), term_pos + 1);
        } else {
            let marker = u16::from_le_bytes([frame[term_pos + 1], frame[term_pos + 2]]) as usize;
            let header = frame[term_pos + 3];
            let end = take_elements(frame, term_pos + 4, header, trailing, range, shift, &mut out);
            assert_eq!(frame[end], tag, "addendum must close with the tag byte");
            assert_eq!(frame.len(), end + 1);
            assert_eq!(marker, frame.len() - 1);
        }
        out
    }

    fn take_elements(
        frame: &[u8],
        mut pos: usize,
        header: u8,
        count: u8,
        range: usize,
        shift: u32,
        out: &mut Vec<u8>,
    ) -> usize {
        for bit in 0..count {
            if header & (1 << bit) != 0 {
                let word = u16::from_le_bytes([frame[pos], frame[pos + 1]]) as usize;
                pos += 2;
                let offset = word & range;
                let len = (word >> shift) + 3;
                assert!(offset >= 1 && offset <= out.len());
                for _ in 0..len {
                    let byte = out[out.len() - offset];
                    out.push(byte);
                }
            } else {
                out.push(frame[pos]);
                pos += 1;
            }
        }
        pos
    }

    fn xorshift_stream(seed: u32, len: usize) -> Vec<u8> {
        let mut state = seed;
        let mut out = vec![0u8; len];
        for byte in out.iter_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *byte = state as u8;
        }
        out
    }

    /// Compress and decompress, asserting the frame reproduces the input.
    fn inverse(input: &[u8]) {
        let frame = compress(input).expect("Failed to compress");
        assert_eq!(inflate(&frame), input);
    }

    #[test]
    fn short_strings() {
        inverse(b"");
        inverse(b"x");
        inverse(b"ab");
        inverse(b"aaa");
        inverse(b"to live or not to live");
        inverse(b"There is nothing either good or bad, but thinking makes it so.");
        inverse(b"as6yhol.;jrew5tyuikbfewedfyjltre22459ba");
    }

    #[test]
    fn long_zero_run() {
        inverse(&[0u8; 4096]);
    }

    #[test]
    fn deterministic() {
        let input = b"the quick brown fox jumps over the lazy dog. ".repeat(3);
        assert_eq!(compress(&input).unwrap(), compress(&input).unwrap());
    }

    #[test]
    fn seeded_noise_roundtrip() {
        let input = xorshift_stream(0xC0FFEE, 1024);
        let frame = compress(&input).expect("Failed to compress");
        assert_eq!(frame.len(), 1155);
        assert_eq!(inflate(&frame), input);
    }

    #[test]
    fn far_window_wins() {
        // Noise too deep for the near window, then chunks copied from about
        // 0x900 bytes back: only the far geometry can express them as
        // matches, and its frame comes out 252 bytes shorter.
        let mut input = xorshift_stream(0x2545F491, 2304);
        for k in 0..24 {
            let start = input.len() - 0x900 - 7 * k;
            let chunk: Vec<u8> = input[start..start + 16].to_vec();
            input.extend_from_slice(&chunk);
        }

        let frame = compress(&input).expect("Failed to compress");
        assert_eq!(frame.len(), 2646);
        let body_len = u16::from_le_bytes([frame[0], frame[1]]) as usize;
        // Far-geometry tag: the terminator's high bits are clear.
        assert_eq!(frame[2 + body_len], 0x00);
        assert_eq!(inflate(&frame), input);
    }

    #[test]
    fn random_structured_roundtrips() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xC0FFEE);
        for _ in 0..64 {
            let target = rng.gen_range(0..600);
            let mut input: Vec<u8> = Vec::with_capacity(target);
            while input.len() < target {
                if !input.is_empty() && rng.gen_bool(0.5) {
                    let offset = rng.gen_range(1..=input.len().min(900));
                    let len = rng.gen_range(1..40);
                    for _ in 0..len {
                        let byte = input[input.len() - offset];
                        input.push(byte);
                    }
                } else {
                    input.push(rng.gen_range(0..4));
                }
            }
            input.truncate(target);
            inverse(&input);
        }
    }

    #[test]
    fn random_incompressible_roundtrip() {
        // 1024 noise bytes always fit: even an all-literal encoding stays
        // well under the trial ceiling.
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xC0FFEE);
        let mut input = vec![0u8; 1024];
        rng.fill_bytes(&mut input);
        inverse(&input);
    }

    #[test]
    fn near_capacity_never_overruns() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xC0FFEE);
        let mut input = vec![0u8; 4000];
        rng.fill_bytes(&mut input);
        match compress(&input) {
            Ok(frame) => assert!(frame.len() <= compress_worst_size()),
            Err(Error::CapacityExceeded) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
