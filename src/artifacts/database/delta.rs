//! Git delta instruction streams
//!
//! A deltified pack entry stores the size of its base, the size of the result and
//! a sequence of instructions:
//!
//! - `1xxxxxxx` copy: the low 4 bits select which offset bytes follow, the next 3
//!   bits which size bytes follow (little endian); a size of 0 means `0x10000`
//! - `0xxxxxxx` insert: the low 7 bits give the number of literal bytes that follow
//!
//! Instruction byte `0` is reserved and rejected.

use anyhow::Context;

/// Largest copy a single instruction can encode (three size bytes)
const MAX_COPY_SIZE: usize = 0xff_ffff;
/// A copy with three size bytes takes at least four instruction bytes
const MIN_FULL_COPY_LEN: usize = 4;

/// Read a little-endian base-128 size from the delta header
fn read_size(delta: &[u8], pos: &mut usize) -> anyhow::Result<usize> {
    let mut size = 0usize;
    let mut shift = 0u32;

    loop {
        let byte = *delta.get(*pos).context("truncated delta header")?;
        *pos += 1;

        if shift > usize::BITS - 7 {
            anyhow::bail!("delta size overflows");
        }
        size |= ((byte & 0x7f) as usize) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok(size);
        }
    }
}

/// Apply `delta` to `base`, producing the target object content
pub fn apply_delta(base: &[u8], delta: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut pos = 0;
    let base_size = read_size(delta, &mut pos)?;
    let result_size = read_size(delta, &mut pos)?;

    if base_size != base.len() {
        anyhow::bail!(
            "delta base size mismatch: expected {base_size}, found {}",
            base.len()
        );
    }

    let instructions = delta.len() - pos;
    let max_result = (instructions / MIN_FULL_COPY_LEN + 1)
        .saturating_mul(MAX_COPY_SIZE)
        .max(instructions);
    if result_size > max_result {
        anyhow::bail!(
            "delta declares {result_size} result bytes but {instructions} instruction bytes produce at most {max_result}"
        );
    }

    let mut result = Vec::with_capacity(result_size.min(base.len() + instructions));

    while pos < delta.len() {
        let opcode = delta[pos];
        pos += 1;

        if opcode & 0x80 != 0 {
            let mut offset = 0usize;
            for i in 0..4 {
                if opcode & (1 << i) != 0 {
                    let byte = *delta.get(pos).context("truncated copy offset")?;
                    offset |= (byte as usize) << (8 * i);
                    pos += 1;
                }
            }

            let mut size = 0usize;
            for i in 0..3 {
                if opcode & (0x10 << i) != 0 {
                    let byte = *delta.get(pos).context("truncated copy size")?;
                    size |= (byte as usize) << (8 * i);
                    pos += 1;
                }
            }
            if size == 0 {
                size = 0x10000;
            }

            let chunk = offset
                .checked_add(size)
                .and_then(|end| base.get(offset..end))
                .with_context(|| {
                    format!("copy of {size} bytes at {offset} exceeds base of {base_size} bytes")
                })?;
            result.extend_from_slice(chunk);
        } else if opcode != 0 {
            let size = opcode as usize;
            let chunk = delta
                .get(pos..pos + size)
                .context("truncated insert instruction")?;
            result.extend_from_slice(chunk);
            pos += size;
        } else {
            anyhow::bail!("reserved delta opcode 0");
        }

        if result.len() > result_size {
            anyhow::bail!("delta produces more than the declared {result_size} bytes");
        }
    }

    if result.len() != result_size {
        anyhow::bail!(
            "delta result size mismatch: expected {result_size}, produced {}",
            result.len()
        );
    }

    Ok(result)
}
