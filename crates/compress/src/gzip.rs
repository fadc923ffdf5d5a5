//! Gzip member engines built on `flate2` raw deflate.
//!
//! # Framing
//!
//! Every compress call emits one complete RFC 1952 member covering at most
//! `member_size` input bytes. The header carries an `FEXTRA` subfield with
//! ID `QZ` and eight bytes of payload: the member's uncompressed length and
//! its deflate body length, both little-endian `u32`.
//!
//! ```text
//! 1f 8b 08 04 | mtime=0 | xfl=0 | os=255 | xlen=12 | 'Q' 'Z' len=8 | isize | dlen
//! deflate body (dlen bytes) | crc32 | isize
//! ```
//!
//! Standard gzip tools ignore the subfield, so the output is ordinary
//! multi-member gzip. The decompressor uses the subfield when present: it
//! refuses to start a member whose whole output does not fit the destination
//! (reporting [`EngineStatus::BufferTooSmall`]) and then inflates it in one
//! step. Members without the subfield, such as those written by `gzip`
//! itself, are inflated as a stream.

use std::mem;

use flate2::{Compress, Compression, Crc, Decompress, FlushCompress, FlushDecompress, Status};

use crate::engine::{Direction, EngineStatus, TransformEngine, TransformResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const CM_DEFLATE: u8 = 8;
const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xe0;
const OS_UNKNOWN: u8 = 0xff;
const FIXED_HEADER_LEN: usize = 10;

const QZ_SUBFIELD_ID: [u8; 2] = *b"QZ";
const QZ_SUBFIELD_DATA_LEN: usize = 8;
const QZ_EXTRA_LEN: usize = 4 + QZ_SUBFIELD_DATA_LEN;

/// Length of the header written by [`GzipMemberCompressor`].
pub const MEMBER_HEADER_LEN: usize = FIXED_HEADER_LEN + 2 + QZ_EXTRA_LEN;
/// Length of the CRC32 + ISIZE trailer.
pub const TRAILER_LEN: usize = 8;

/// Worst-case raw deflate output for `len` input bytes.
#[must_use]
pub const fn deflate_bound(len: usize) -> usize {
    len.saturating_add(len >> 3)
        .saturating_add(len >> 6)
        .saturating_add(64)
}

/// Worst-case size of one member holding `len` input bytes.
#[must_use]
pub const fn member_bound(len: usize) -> usize {
    deflate_bound(len).saturating_add(MEMBER_HEADER_LEN + TRAILER_LEN)
}

/// Compress-side session: one gzip member per call.
pub struct GzipMemberCompressor {
    deflate: Compress,
    member_size: usize,
}

impl GzipMemberCompressor {
    /// Creates a session at `level` (1-9) emitting members of at most `member_size` input bytes.
    #[must_use]
    pub fn new(level: u32, member_size: usize) -> Self {
        Self {
            deflate: Compress::new(Compression::new(level), false),
            member_size: member_size.max(1),
        }
    }

    /// Deflates `input` into `out` as one finished raw stream, returning the body length.
    fn deflate_member(&mut self, input: &[u8], out: &mut [u8]) -> Option<usize> {
        self.deflate.reset();
        loop {
            let read = self.deflate.total_in() as usize;
            let written = self.deflate.total_out() as usize;
            let status = self
                .deflate
                .compress(&input[read..], &mut out[written..], FlushCompress::Finish)
                .ok()?;
            if status == Status::StreamEnd {
                return Some(self.deflate.total_out() as usize);
            }
            let progressed = self.deflate.total_in() as usize != read
                || self.deflate.total_out() as usize != written;
            if !progressed {
                return None;
            }
        }
    }
}

fn write_member_header(out: &mut [u8], original: u32, deflated: u32) {
    out[..2].copy_from_slice(&GZIP_MAGIC);
    out[2] = CM_DEFLATE;
    out[3] = FEXTRA;
    out[4..8].fill(0);
    out[8] = 0;
    out[9] = OS_UNKNOWN;
    out[10..12].copy_from_slice(&(QZ_EXTRA_LEN as u16).to_le_bytes());
    out[12..14].copy_from_slice(&QZ_SUBFIELD_ID);
    out[14..16].copy_from_slice(&(QZ_SUBFIELD_DATA_LEN as u16).to_le_bytes());
    out[16..20].copy_from_slice(&original.to_le_bytes());
    out[20..24].copy_from_slice(&deflated.to_le_bytes());
}

impl TransformEngine for GzipMemberCompressor {
    fn direction(&self) -> Direction {
        Direction::Compress
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> TransformResult {
        let take = src.len().min(self.member_size);
        let input = &src[..take];
        if dst.len() < member_bound(take) {
            return TransformResult::too_small();
        }

        let body_end = dst.len() - TRAILER_LEN;
        let Some(deflated) = self.deflate_member(input, &mut dst[MEMBER_HEADER_LEN..body_end])
        else {
            return TransformResult::new(0, 0, EngineStatus::Fatal);
        };
        let (Ok(original32), Ok(deflated32)) = (u32::try_from(take), u32::try_from(deflated))
        else {
            return TransformResult::new(0, 0, EngineStatus::Fatal);
        };

        write_member_header(&mut dst[..MEMBER_HEADER_LEN], original32, deflated32);

        let mut crc = Crc::new();
        crc.update(input);
        let trailer = MEMBER_HEADER_LEN + deflated;
        dst[trailer..trailer + 4].copy_from_slice(&crc.sum().to_le_bytes());
        dst[trailer + 4..trailer + TRAILER_LEN].copy_from_slice(&original32.to_le_bytes());

        TransformResult::ok(take, trailer + TRAILER_LEN)
    }

    fn max_output_size(&self, src_len: usize) -> Option<usize> {
        Some(member_bound(src_len.min(self.member_size)))
    }

    fn name(&self) -> &'static str {
        "deflate"
    }
}

/// Marker for malformed input.
#[derive(Debug)]
struct Corrupt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemberHeader {
    len: usize,
    sizes: Option<(usize, usize)>,
}

/// Parses a member header from the start of `buf`.
///
/// `Ok(None)` means more bytes are needed. Fixed fields are validated as soon
/// as they are available so garbage is rejected without waiting for ten bytes.
fn parse_header(buf: &[u8]) -> Result<Option<MemberHeader>, Corrupt> {
    let expected = [GZIP_MAGIC[0], GZIP_MAGIC[1], CM_DEFLATE];
    if buf.iter().zip(expected.iter()).any(|(a, b)| a != b) {
        return Err(Corrupt);
    }
    if buf.len() < FIXED_HEADER_LEN {
        return Ok(None);
    }

    let flags = buf[3];
    if flags & FRESERVED != 0 {
        return Err(Corrupt);
    }

    let mut pos = FIXED_HEADER_LEN;
    let mut sizes = None;

    if flags & FEXTRA != 0 {
        let Some(xlen) = buf.get(pos..pos + 2) else {
            return Ok(None);
        };
        let xlen = usize::from(u16::from_le_bytes([xlen[0], xlen[1]]));
        pos += 2;
        let Some(extra) = buf.get(pos..pos + xlen) else {
            return Ok(None);
        };
        sizes = find_size_subfield(extra);
        pos += xlen;
    }

    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            match buf[pos..].iter().position(|&b| b == 0) {
                Some(nul) => pos += nul + 1,
                None => return Ok(None),
            }
        }
    }

    if flags & FHCRC != 0 {
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        pos += 2;
    }

    Ok(Some(MemberHeader { len: pos, sizes }))
}

/// Returns `(original, deflated)` from a well-formed `QZ` subfield.
fn find_size_subfield(mut extra: &[u8]) -> Option<(usize, usize)> {
    while extra.len() >= 4 {
        let id = [extra[0], extra[1]];
        let len = usize::from(u16::from_le_bytes([extra[2], extra[3]]));
        let data = extra.get(4..4 + len)?;
        if id == QZ_SUBFIELD_ID && len == QZ_SUBFIELD_DATA_LEN {
            let original = read_u32_le(&data[..4]) as usize;
            let deflated = read_u32_le(&data[4..]) as usize;
            return Some((original, deflated));
        }
        extra = &extra[4 + len..];
    }
    None
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Collecting a member header into `pending`.
    Header,
    /// Collecting a sized member's body and trailer into `pending`.
    Sized { original: usize, deflated: usize },
    /// Inflating an unsized member's body.
    Stream,
    /// Collecting an unsized member's trailer into `pending`.
    Trailer,
    /// A previous call reported corrupt data.
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
struct Step {
    consumed: usize,
    produced: usize,
}

impl Step {
    const fn consumed(n: usize) -> Self {
        Self {
            consumed: n,
            produced: 0,
        }
    }
}

/// Decompress-side session accepting any sequence of gzip members.
pub struct GzipMemberDecompressor {
    inflate: Decompress,
    state: DecodeState,
    pending: Vec<u8>,
    crc: Crc,
}

impl Default for GzipMemberDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipMemberDecompressor {
    /// Creates a session positioned before the first member header.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflate: Decompress::new(false),
            state: DecodeState::Header,
            pending: Vec::new(),
            crc: Crc::new(),
        }
    }

    fn step(&mut self, input: &[u8], out: &mut [u8]) -> Result<Step, Corrupt> {
        match self.state {
            DecodeState::Header => self.step_header(input),
            DecodeState::Sized { original, deflated } => {
                self.step_sized(original, deflated, input, out)
            }
            DecodeState::Stream => self.step_stream(input, out),
            DecodeState::Trailer => self.step_trailer(input),
            DecodeState::Failed => Err(Corrupt),
        }
    }

    fn step_header(&mut self, input: &[u8]) -> Result<Step, Corrupt> {
        if input.is_empty() {
            return Ok(Step::default());
        }

        let buffered = self.pending.len();
        let parsed = if buffered == 0 {
            parse_header(input)?
        } else {
            let mut joined = Vec::with_capacity(buffered + input.len());
            joined.extend_from_slice(&self.pending);
            joined.extend_from_slice(input);
            parse_header(&joined)?
        };

        let Some(header) = parsed else {
            self.pending.extend_from_slice(input);
            return Ok(Step::consumed(input.len()));
        };

        self.pending.clear();
        self.state = match header.sizes {
            Some((original, deflated)) => DecodeState::Sized { original, deflated },
            None => {
                self.inflate.reset(false);
                self.crc.reset();
                DecodeState::Stream
            }
        };
        Ok(Step::consumed(header.len - buffered))
    }

    fn step_sized(
        &mut self,
        original: usize,
        deflated: usize,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<Step, Corrupt> {
        if original > out.len() {
            return Ok(Step::default());
        }

        let needed = deflated + TRAILER_LEN;
        if self.pending.is_empty() && input.len() >= needed {
            self.inflate_sized(&input[..needed], original, deflated, out)?;
            self.state = DecodeState::Header;
            return Ok(Step {
                consumed: needed,
                produced: original,
            });
        }

        let take = (needed - self.pending.len()).min(input.len());
        self.pending.extend_from_slice(&input[..take]);
        if self.pending.len() < needed {
            return Ok(Step::consumed(take));
        }

        let member = mem::take(&mut self.pending);
        let decoded = self.inflate_sized(&member, original, deflated, out);
        self.pending = member;
        self.pending.clear();
        decoded?;

        self.state = DecodeState::Header;
        Ok(Step {
            consumed: take,
            produced: original,
        })
    }

    /// Inflates a complete sized member (`body || trailer`) into `out[..original]`.
    fn inflate_sized(
        &mut self,
        member: &[u8],
        original: usize,
        deflated: usize,
        out: &mut [u8],
    ) -> Result<(), Corrupt> {
        let (body, trailer) = member.split_at(deflated);
        let out = &mut out[..original];

        self.inflate.reset(false);
        loop {
            let read = self.inflate.total_in() as usize;
            let written = self.inflate.total_out() as usize;
            let status = self
                .inflate
                .decompress(&body[read..], &mut out[written..], FlushDecompress::Finish)
                .map_err(|_| Corrupt)?;
            if status == Status::StreamEnd {
                break;
            }
            if self.inflate.total_in() as usize == read
                && self.inflate.total_out() as usize == written
            {
                return Err(Corrupt);
            }
        }

        if self.inflate.total_out() as usize != original
            || self.inflate.total_in() as usize != deflated
        {
            return Err(Corrupt);
        }

        let mut crc = Crc::new();
        crc.update(out);
        verify_trailer(trailer, crc.sum(), original as u32)
    }

    fn step_stream(&mut self, input: &[u8], out: &mut [u8]) -> Result<Step, Corrupt> {
        let read = self.inflate.total_in();
        let written = self.inflate.total_out();
        let status = self
            .inflate
            .decompress(input, out, FlushDecompress::None)
            .map_err(|_| Corrupt)?;
        let consumed = (self.inflate.total_in() - read) as usize;
        let produced = (self.inflate.total_out() - written) as usize;
        self.crc.update(&out[..produced]);

        if status == Status::StreamEnd {
            self.state = DecodeState::Trailer;
        }
        Ok(Step { consumed, produced })
    }

    fn step_trailer(&mut self, input: &[u8]) -> Result<Step, Corrupt> {
        let take = (TRAILER_LEN - self.pending.len()).min(input.len());
        self.pending.extend_from_slice(&input[..take]);
        if self.pending.len() == TRAILER_LEN {
            verify_trailer(&self.pending, self.crc.sum(), self.crc.amount())?;
            self.pending.clear();
            self.state = DecodeState::Header;
        }
        Ok(Step::consumed(take))
    }
}

fn verify_trailer(trailer: &[u8], crc: u32, isize: u32) -> Result<(), Corrupt> {
    if trailer.len() != TRAILER_LEN {
        return Err(Corrupt);
    }
    if read_u32_le(&trailer[..4]) != crc || read_u32_le(&trailer[4..]) != isize {
        return Err(Corrupt);
    }
    Ok(())
}

impl TransformEngine for GzipMemberDecompressor {
    fn direction(&self) -> Direction {
        Direction::Decompress
    }

    fn transform(&mut self, src: &[u8], dst: &mut [u8]) -> TransformResult {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            let before = self.state;
            match self.step(&src[consumed..], &mut dst[produced..]) {
                Ok(step) => {
                    consumed += step.consumed;
                    produced += step.produced;
                    if step.consumed == 0 && step.produced == 0 && self.state == before {
                        break;
                    }
                }
                Err(Corrupt) => {
                    self.state = DecodeState::Failed;
                    return TransformResult::new(consumed, produced, EngineStatus::DataError);
                }
            }
        }

        if consumed == 0 && produced == 0 && !src.is_empty() {
            return TransformResult::too_small();
        }
        TransformResult::ok(consumed, produced)
    }

    fn finish(&mut self, dst: &mut [u8]) -> TransformResult {
        match self.state {
            DecodeState::Header if self.pending.is_empty() => return TransformResult::ok(0, 0),
            DecodeState::Stream => {
                if let Ok(step) = self.step_stream(&[], dst) {
                    if step.produced != 0 {
                        return TransformResult::ok(0, step.produced);
                    }
                }
            }
            _ => {}
        }
        // Input ended inside a header, body or trailer.
        self.state = DecodeState::Failed;
        TransformResult::new(0, 0, EngineStatus::DataError)
    }

    fn reset(&mut self) {
        self.inflate.reset(false);
        self.crc.reset();
        self.pending.clear();
        self.state = DecodeState::Header;
    }

    fn max_output_size(&self, _src_len: usize) -> Option<usize> {
        None
    }

    fn name(&self) -> &'static str {
        "deflate"
    }
}
