//! cobs.rs
//! Consistent-overhead byte stuffing for the serial frame body.
//! - encoded output carries no zero byte; the caller appends the 0x00 delimiter
//! - worst case: one header byte per 254 data bytes plus the leading header
//! - decode is the receiver-side inverse, used by the wire monitor and tests

/// Upper bound on the encoded length of `len` input bytes (terminator excluded).
pub const fn max_encoded_len(len: usize) -> usize {
    len + len / 254 + 1
}

/// Stuff `src` into `dst`. Returns the encoded length, or `None` when `dst`
/// cannot hold the output.
pub fn encode(src: &[u8], dst: &mut [u8]) -> Option<usize> {
    if dst.is_empty() {
        return None;
    }

    let mut read = 0usize;
    let mut write = 1usize; // slot 0 is the first run header
    let mut code_at = 0usize;
    let mut code = 1u8;

    while read < src.len() {
        if write >= dst.len() {
            return None;
        }
        if src[read] == 0 {
            dst[code_at] = code;
            code = 1;
            code_at = write;
            write += 1;
            read += 1;
        } else {
            dst[write] = src[read];
            write += 1;
            read += 1;
            code += 1;
            // run saturated: close it and open a fresh header slot
            if code == 0xFF {
                if write >= dst.len() {
                    return None;
                }
                dst[code_at] = code;
                code = 1;
                code_at = write;
                write += 1;
            }
        }
    }

    if code_at >= dst.len() {
        return None;
    }
    dst[code_at] = code;
    Some(write)
}

/// Reverse [`encode`]. `src` is the stuffed body without the 0x00 delimiter.
/// Returns the decoded length, or `None` on a malformed or oversized body.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Option<usize> {
    let mut read = 0usize;
    let mut write = 0usize;

    while read < src.len() {
        let code = src[read] as usize;
        if code == 0 {
            return None;
        }
        read += 1;

        let run = code - 1;
        if read + run > src.len() || write + run > dst.len() {
            return None;
        }
        for _ in 0..run {
            let b = src[read];
            read += 1;
            if b == 0 {
                return None;
            }
            dst[write] = b;
            write += 1;
        }

        // a non-saturated header implies a zero byte unless the input ends here
        if code != 0xFF && read < src.len() {
            if write >= dst.len() {
                return None;
            }
            dst[write] = 0;
            write += 1;
        }
    }

    Some(write)
}
