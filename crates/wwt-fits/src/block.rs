/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Padding byte used for header blocks (ASCII space).
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Padding byte used for data blocks (zero).
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Upper bound on header blocks scanned before giving up on finding `END`.
pub const DEFAULT_MAX_HEADER_BLOCKS: usize = 256;

/// Returns the number of FITS blocks required to hold `num_bytes` bytes.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    if num_bytes == 0 {
        return 0;
    }
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// Returns the total byte length (in whole blocks) required to hold `num_bytes`.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    blocks_needed(num_bytes) * BLOCK_SIZE
}

/// Offset of the first byte of the block following the one containing `offset`.
///
/// An offset already on a block boundary is returned unchanged.
pub const fn next_block_boundary(offset: usize) -> usize {
    padded_byte_len(offset)
}

/// Borrow the 80-byte card starting at `offset`, if the buffer holds a whole card there.
pub fn card_at(buffer: &[u8], offset: usize) -> Option<&[u8; CARD_SIZE]> {
    let end = offset.checked_add(CARD_SIZE)?;
    buffer.get(offset..end)?.try_into().ok()
}

/// Returns `true` if every byte of the card is ASCII whitespace.
pub fn is_blank_card(card: &[u8; CARD_SIZE]) -> bool {
    card.iter().all(|b| b.is_ascii_whitespace())
}

/// Append `bytes` to `dest`, then pad `dest` out to the next block boundary with `pad_byte`.
pub fn extend_padded(dest: &mut alloc::vec::Vec<u8>, bytes: &[u8], pad_byte: u8) {
    dest.extend_from_slice(bytes);
    let padded = padded_byte_len(dest.len());
    dest.resize(padded, pad_byte);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    // ---- blocks_needed / padded_byte_len ----

    #[test]
    fn blocks_needed_boundaries() {
        assert_eq!(blocks_needed(0), 0);
        assert_eq!(blocks_needed(1), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE + 1), 2);
        assert_eq!(blocks_needed(5761), 3);
    }

    #[test]
    fn padded_byte_len_unaligned() {
        assert_eq!(padded_byte_len(0), 0);
        assert_eq!(padded_byte_len(1), BLOCK_SIZE);
        assert_eq!(padded_byte_len(BLOCK_SIZE + 1), 2 * BLOCK_SIZE);
    }

    #[test]
    fn next_boundary_is_idempotent_on_boundaries() {
        assert_eq!(next_block_boundary(0), 0);
        assert_eq!(next_block_boundary(80), BLOCK_SIZE);
        assert_eq!(next_block_boundary(BLOCK_SIZE), BLOCK_SIZE);
    }

    #[test]
    fn constant_relationships() {
        assert_eq!(CARDS_PER_BLOCK, 36);
        assert_eq!(CARDS_PER_BLOCK * CARD_SIZE, BLOCK_SIZE);
    }

    // ---- card access ----

    #[test]
    fn card_at_in_bounds() {
        let mut data = vec![b' '; 160];
        data[80] = b'E';
        let card = card_at(&data, 80).unwrap();
        assert_eq!(card[0], b'E');
    }

    #[test]
    fn card_at_partial_card_is_none() {
        let data = vec![b' '; 100];
        assert!(card_at(&data, 80).is_none());
        assert!(card_at(&data, usize::MAX).is_none());
    }

    #[test]
    fn blank_card_detection() {
        let blank = [b' '; CARD_SIZE];
        assert!(is_blank_card(&blank));
        let mut data = [b' '; CARD_SIZE];
        data[5] = 0;
        assert!(!is_blank_card(&data));
    }

    // ---- padding ----

    #[test]
    fn extend_padded_header() {
        let mut out = Vec::new();
        extend_padded(&mut out, &[b'A'; 80], HEADER_PAD_BYTE);
        assert_eq!(out.len(), BLOCK_SIZE);
        assert!(out[80..].iter().all(|&b| b == HEADER_PAD_BYTE));
    }

    #[test]
    fn extend_padded_data_multi_block() {
        let mut out = vec![0xAB; BLOCK_SIZE];
        extend_padded(&mut out, &[0xFF; 10], DATA_PAD_BYTE);
        assert_eq!(out.len(), 2 * BLOCK_SIZE);
        assert_eq!(out[BLOCK_SIZE], 0xFF);
        assert_eq!(out[BLOCK_SIZE + 10], DATA_PAD_BYTE);
    }
}
