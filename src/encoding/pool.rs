// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded worker pool for encoding several independent rectangles of one
//! `FramebufferUpdate` concurrently. Each rectangle gets its own stateless
//! encoder instance, so results can be computed out of order and then
//! reassembled row-major for the wire, same as the caller would see from
//! running them one at a time.

use crate::error::{Result, VncError};
use crate::geometry::Region;
use crate::pixelformat::PixelFormat;
use bytes::BytesMut;
use std::num::NonZeroUsize;

/// One rectangle's worth of work: its bounds, its native-format pixels
/// (already extracted from the framebuffer), and the wire encoding to
/// produce.
pub struct EncodeJob {
    /// Region this rectangle covers, used only to preserve output order.
    pub region: Region,
    /// Row-major native pixel values for `region`.
    pub pixels: Vec<u32>,
    /// RFB encoding-type identifier to encode into.
    pub encoding_type: i32,
}

/// One completed rectangle's encoded bytes, paired with its region so the
/// caller can emit a `RectangleHeader` for it.
pub struct EncodedRectangle {
    /// Region this rectangle covers.
    pub region: Region,
    /// Encoded rectangle body (header not included).
    pub body: BytesMut,
}

/// Number of workers to use, based on `--threads` if set, else the
/// machine's available parallelism.
#[must_use]
pub fn worker_count(requested: Option<usize>) -> usize {
    requested
        .and_then(NonZeroUsize::new)
        .or_else(|| std::thread::available_parallelism().ok())
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Encodes every job in `jobs` across up to `workers` concurrent blocking
/// tasks, using a fresh stateless encoder per job (so only the encodings
/// with no cross-rectangle carry state — Raw, RRE, CoRRE, HexTile, TRLE —
/// are safe to submit here; Zlib and ZRLE need their persistent stream
/// reused in rectangle order and must be encoded on the session's own
/// task instead). Returns results in the same order as `jobs`.
pub async fn encode_parallel(jobs: Vec<EncodeJob>, src_format: PixelFormat, dst_format: PixelFormat, workers: usize) -> Result<Vec<EncodedRectangle>> {
    let workers = workers.max(1);
    let mut results: Vec<Option<EncodedRectangle>> = (0..jobs.len()).map(|_| None).collect();
    let mut pending = jobs.into_iter().enumerate();
    let mut in_flight = tokio::task::JoinSet::new();

    for (index, job) in pending.by_ref().take(workers) {
        spawn_job(&mut in_flight, index, job, src_format, dst_format);
    }

    while let Some(joined) = in_flight.join_next().await {
        let (index, region, body) = joined.map_err(|e| VncError::ProtocolViolation(format!("encode worker panicked: {e}")))??;
        results[index] = Some(EncodedRectangle { region, body });

        if let Some((next_index, job)) = pending.next() {
            spawn_job(&mut in_flight, next_index, job, src_format, dst_format);
        }
    }

    Ok(results.into_iter().map(|r| r.expect("every job index is filled exactly once")).collect())
}

fn spawn_job(
    set: &mut tokio::task::JoinSet<Result<(usize, Region, BytesMut)>>,
    index: usize,
    job: EncodeJob,
    src_format: PixelFormat,
    dst_format: PixelFormat,
) {
    set.spawn_blocking(move || {
        let mut encoder = super::encoder_for(job.encoding_type)
            .ok_or_else(|| VncError::UnsupportedEncoding(job.encoding_type))?;
        let mut body = BytesMut::new();
        encoder.encode(&job.pixels, job.region.width, job.region.height, &src_format, &dst_format, &mut body)?;
        Ok((index, job.region, body))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelformat::Color;

    #[tokio::test]
    async fn preserves_job_order_regardless_of_completion_order() {
        let fmt = PixelFormat::rgba32();
        let jobs = (0..8)
            .map(|i| EncodeJob {
                region: Region::new((i * 4) as i16, 0, 4, 1),
                pixels: vec![fmt.pixel(Color::rgb(i as u8, 0, 0)); 4],
                encoding_type: crate::wire::encoding::RAW,
            })
            .collect();

        let results = encode_parallel(jobs, fmt, fmt, 4).await.unwrap();
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.region.x, i as i16 * 4);
        }
    }

    #[tokio::test]
    async fn rejects_unsupported_encoding() {
        let fmt = PixelFormat::rgba32();
        let jobs = vec![EncodeJob { region: Region::new(0, 0, 1, 1), pixels: vec![0], encoding_type: 9999 }];
        assert!(encode_parallel(jobs, fmt, fmt, 1).await.is_err());
    }

    #[test]
    fn worker_count_falls_back_to_available_parallelism() {
        assert!(worker_count(None) >= 1);
        assert_eq!(worker_count(Some(3)), 3);
    }
}
