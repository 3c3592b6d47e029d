//! Byte- and bit-wise shuffle preprocessing.
//!
//! Shuffling transposes typed elements so bytes (or bits) of equal
//! significance become adjacent, which usually improves the inner codec's
//! ratio on numeric data. Both transforms are exact inverses of their
//! unshuffle counterparts and never fail; callers are responsible for the
//! bit-shuffle divisibility precondition.

/// Byte-transpose elements of `typesize` bytes: all first bytes, then all
/// second bytes, and so on. Trailing bytes that do not form a whole element
/// are copied through unshuffled.
pub fn shuffle(typesize: usize, src: &[u8], dest: &mut [u8]) {
    let blocksize = src.len();
    let nelems = blocksize / typesize;
    let leftover = blocksize % typesize;

    for j in 0..typesize {
        for i in 0..nelems {
            dest[j * nelems + i] = src[i * typesize + j];
        }
    }
    if leftover > 0 {
        let start = blocksize - leftover;
        dest[start..blocksize].copy_from_slice(&src[start..blocksize]);
    }
}

/// Inverse of [`shuffle`].
pub fn unshuffle(typesize: usize, src: &[u8], dest: &mut [u8]) {
    let blocksize = src.len();
    let nelems = blocksize / typesize;
    let leftover = blocksize % typesize;

    for i in 0..nelems {
        for j in 0..typesize {
            dest[i * typesize + j] = src[j * nelems + i];
        }
    }
    if leftover > 0 {
        let start = blocksize - leftover;
        dest[start..blocksize].copy_from_slice(&src[start..blocksize]);
    }
}

/// Transpose of an 8x8 bit matrix packed into a u64. Self-inverse.
fn trans_bit_8x8(mut x: u64) -> u64 {
    let mut t;
    t = (x ^ (x >> 7)) & 0x00AA00AA00AA00AA;
    x = x ^ t ^ (t << 7);
    t = (x ^ (x >> 14)) & 0x0000CCCC0000CCCC;
    x = x ^ t ^ (t << 14);
    t = (x ^ (x >> 28)) & 0x00000000F0F0F0F0;
    x = x ^ t ^ (t << 28);
    x
}

/// Transpose `size` elements of `elem_size` bytes into byte lanes.
fn trans_byte_elem(src: &[u8], dest: &mut [u8], size: usize, elem_size: usize) {
    for i in 0..size {
        for j in 0..elem_size {
            dest[j * size + i] = src[i * elem_size + j];
        }
    }
}

/// Within each byte lane, transpose bits of consecutive groups of 8 bytes.
fn trans_bit_byte(src: &[u8], dest: &mut [u8], size: usize, elem_size: usize) {
    let nbyte = size * elem_size;
    let nrow = nbyte / 8;

    for (i, chunk) in src[..nbyte].chunks_exact(8).enumerate() {
        let mut x = trans_bit_8x8(u64::from_le_bytes(chunk.try_into().unwrap()));
        for k in 0..8 {
            dest[k * nrow + i] = x as u8;
            x >>= 8;
        }
    }
}

/// Inverse of [`trans_bit_byte`].
fn untrans_bit_byte(src: &[u8], dest: &mut [u8], size: usize, elem_size: usize) {
    let nbyte = size * elem_size;
    let nrow = nbyte / 8;

    for i in 0..nrow {
        let mut x: u64 = 0;
        for k in 0..8 {
            x |= (src[k * nrow + i] as u64) << (k * 8);
        }
        dest[i * 8..i * 8 + 8].copy_from_slice(&trans_bit_8x8(x).to_le_bytes());
    }
}

/// Regroup bit rows so each element's bit planes are contiguous.
fn trans_bitrow_eight(src: &[u8], dest: &mut [u8], size: usize, elem_size: usize) {
    let nrow = size / 8;
    for i in 0..8 {
        for j in 0..elem_size {
            let src_idx = (i * elem_size + j) * nrow;
            let dst_idx = (j * 8 + i) * nrow;
            dest[dst_idx..dst_idx + nrow].copy_from_slice(&src[src_idx..src_idx + nrow]);
        }
    }
}

/// Inverse of [`trans_bitrow_eight`].
fn untrans_bitrow_eight(src: &[u8], dest: &mut [u8], size: usize, elem_size: usize) {
    let nrow = size / 8;
    for i in 0..elem_size {
        for j in 0..8 {
            let src_idx = (i * 8 + j) * nrow;
            let dst_idx = (j * elem_size + i) * nrow;
            dest[dst_idx..dst_idx + nrow].copy_from_slice(&src[src_idx..src_idx + nrow]);
        }
    }
}

/// Bit-transpose `src` into `dest`, staging through `tmp`.
///
/// Requires `src.len() % (typesize * 8) == 0`; the compress path falls back
/// to byte shuffle when that does not hold.
pub fn bitshuffle(typesize: usize, src: &[u8], dest: &mut [u8], tmp: &mut [u8]) {
    let size = src.len() / typesize;
    trans_byte_elem(src, dest, size, typesize);
    trans_bit_byte(dest, tmp, size, typesize);
    trans_bitrow_eight(tmp, dest, size, typesize);
}

/// Inverse of [`bitshuffle`], with the same divisibility requirement.
pub fn bitunshuffle(typesize: usize, src: &[u8], dest: &mut [u8], tmp: &mut [u8]) {
    let size = src.len() / typesize;
    untrans_bitrow_eight(src, dest, size, typesize);
    untrans_bit_byte(dest, tmp, size, typesize);
    trans_byte_elem(tmp, dest, typesize, size);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn shuffle_roundtrip() {
        for typesize in [2usize, 4, 8, 16] {
            let src = pattern(typesize * 100);
            let mut shuffled = vec![0u8; src.len()];
            let mut restored = vec![0u8; src.len()];
            shuffle(typesize, &src, &mut shuffled);
            unshuffle(typesize, &shuffled, &mut restored);
            assert_eq!(src, restored, "typesize {typesize}");
        }
    }

    #[test]
    fn shuffle_copies_trailing_partial_element() {
        let src = pattern(4 * 10 + 3);
        let mut shuffled = vec![0u8; src.len()];
        let mut restored = vec![0u8; src.len()];
        shuffle(4, &src, &mut shuffled);
        assert_eq!(&shuffled[40..], &src[40..]);
        unshuffle(4, &shuffled, &mut restored);
        assert_eq!(src, restored);
    }

    #[test]
    fn bit_transpose_is_self_inverse() {
        assert_eq!(trans_bit_8x8(trans_bit_8x8(0x0123456789ABCDEF)), 0x0123456789ABCDEF);
    }

    #[test]
    fn bitshuffle_roundtrip() {
        for typesize in [1usize, 2, 4, 8] {
            let src = pattern(typesize * 128);
            let mut shuffled = vec![0u8; src.len()];
            let mut restored = vec![0u8; src.len()];
            let mut tmp = vec![0u8; src.len()];
            bitshuffle(typesize, &src, &mut shuffled, &mut tmp);
            assert_ne!(src, shuffled);
            bitunshuffle(typesize, &shuffled, &mut restored, &mut tmp);
            assert_eq!(src, restored, "typesize {typesize}");
        }
    }
}
