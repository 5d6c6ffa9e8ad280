//! Header-only texture dimension probes. Only PNG and JPEG are decoded;
//! everything else is reported back as unchecked by the caller.

use std::io::Read;
use std::path::Path;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Png,
    Jpeg,
    /// DDS/TGA: recognised as textures but not decoded.
    Unchecked,
    Other,
}

pub fn kind_of(path: &Path) -> TextureKind {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => TextureKind::Png,
        "jpg" | "jpeg" => TextureKind::Jpeg,
        "dds" | "tga" => TextureKind::Unchecked,
        _ => TextureKind::Other,
    }
}

/// Width and height from the IHDR chunk.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE {
        return None;
    }
    let w = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let h = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    Some((w, h))
}

/// Walks JPEG segments until a baseline, extended or progressive SOF marker.
pub fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 1 < bytes.len() {
        if bytes[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = bytes[i + 1];
        i += 2;
        if matches!(marker, 0xC0..=0xC2) {
            let h = bytes.get(i + 3..i + 5)?;
            let w = bytes.get(i + 5..i + 7)?;
            return Some((
                u16::from_be_bytes([w[0], w[1]]) as u32,
                u16::from_be_bytes([h[0], h[1]]) as u32,
            ));
        }
        // Standalone markers carry no length.
        if marker == 0x01 || (0xD0..=0xD9).contains(&marker) {
            continue;
        }
        let len = bytes.get(i..i + 2)?;
        i += u16::from_be_bytes([len[0], len[1]]) as usize;
    }
    None
}

/// `None` for unsupported formats or unreadable headers.
pub fn dimensions(path: &Path) -> Option<(u32, u32)> {
    match kind_of(path) {
        TextureKind::Png => {
            let mut head = [0u8; 24];
            let mut file = std::fs::File::open(path).ok()?;
            file.read_exact(&mut head).ok()?;
            png_dimensions(&head)
        }
        TextureKind::Jpeg => jpeg_dimensions(&std::fs::read(path).ok()?),
        TextureKind::Unchecked | TextureKind::Other => None,
    }
}

/// Minimal valid-header PNG of the given size. Shared with fixtures.
pub fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    out.extend_from_slice(&13u32.to_be_bytes());
    out.extend_from_slice(b"IHDR");
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&[8, 6, 0, 0, 0]);
    out
}
