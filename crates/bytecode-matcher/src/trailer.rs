/// Splits bytecode into `(body, trailer)` at the boundary solc's metadata
/// encoding defines: the last two bytes are a big-endian length `n` of the
/// preceding CBOR metadata section, so `trailer = code[code.len() - 2 - n..]`.
///
/// Returns the whole input as `body` with an empty trailer when the length
/// suffix doesn't fit (no metadata trailer present, e.g. Yul output or a
/// compiler run with `bytecodeHash: none`).
pub fn split_metadata_trailer(code: &[u8]) -> (&[u8], &[u8]) {
    if code.len() < 2 {
        return (code, &code[code.len()..]);
    }
    let suffix_len = code.len() - 2;
    let cbor_len = u16::from_be_bytes([code[suffix_len], code[suffix_len + 1]]) as usize;
    let trailer_len = cbor_len + 2;
    if trailer_len > code.len() {
        return (code, &code[code.len()..]);
    }
    let split_at = code.len() - trailer_len;
    (&code[..split_at], &code[split_at..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_a_well_formed_trailer() {
        let cbor = vec![0xa1u8, 0x64, b'i', b'p', b'f', b's'];
        let mut code = vec![0x60, 0x80, 0x60, 0x40];
        code.extend_from_slice(&cbor);
        code.extend_from_slice(&(cbor.len() as u16).to_be_bytes());

        let (body, trailer) = split_metadata_trailer(&code);
        assert_eq!(body, &[0x60, 0x80, 0x60, 0x40]);
        assert_eq!(trailer, &code[4..]);
    }

    #[test]
    fn falls_back_to_whole_code_when_length_is_implausible() {
        let code = vec![0x60, 0x80, 0xff, 0xff];
        let (body, trailer) = split_metadata_trailer(&code);
        assert_eq!(body, code.as_slice());
        assert!(trailer.is_empty());
    }

    #[test]
    fn handles_code_shorter_than_two_bytes() {
        let code = vec![0x60];
        let (body, trailer) = split_metadata_trailer(&code);
        assert_eq!(body, code.as_slice());
        assert!(trailer.is_empty());
    }
}
