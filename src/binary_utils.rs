//! Little-endian readers over borrowed byte slices.
//!
//! Every reader returns `None` instead of panicking when the requested bytes
//! fall outside the slice, so callers can map the miss to the error kind that
//! fits their format.

pub fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a 4-byte tag exactly as stored on disk.
pub fn read_tag(data: &[u8], offset: usize) -> Option<[u8; 4]> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(bytes);
    Some(tag)
}

/// Read a NUL-padded ASCII field, e.g. the cartridge title.
pub fn read_ascii(data: &[u8], offset: usize, len: usize) -> Option<String> {
    let bytes = data.get(offset..offset.checked_add(len)?)?;
    Some(
        String::from_utf8_lossy(bytes)
            .trim_end_matches('\0')
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let data = [0x34, 0x12, 0x78, 0x56, 0xAA];
        assert_eq!(read_u16_le(&data, 0), Some(0x1234));
        assert_eq!(read_u32_le(&data, 0), Some(0x5678_1234));
        assert_eq!(read_u8(&data, 4), Some(0xAA));
    }

    #[test]
    fn reads_past_the_end_return_none() {
        let data = [0u8; 3];
        assert_eq!(read_u32_le(&data, 0), None);
        assert_eq!(read_u16_le(&data, 2), None);
        assert_eq!(read_u8(&data, 3), None);
        assert_eq!(read_tag(&data, usize::MAX), None);
    }

    #[test]
    fn ascii_fields_drop_trailing_nuls() {
        let data = b"POKEMON PL\0\0CPUE";
        assert_eq!(read_ascii(data, 0, 12).as_deref(), Some("POKEMON PL"));
        assert_eq!(read_ascii(data, 12, 4).as_deref(), Some("CPUE"));
    }
}
