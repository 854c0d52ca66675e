//! Stereolithography (STL) mesh codec.
//!
//! The model endpoint serves either layout:
//! - binary: 80-byte header, `u32` triangle count, then 50 bytes per triangle
//!   (normal, three vertices, `u16` attribute byte count), little-endian.
//! - ASCII: `solid <name>` / `facet normal` / `outer loop` / `vertex` ...
//!   `endsolid`.
//!
//! A payload is treated as binary when its length matches the binary layout
//! for the declared triangle count; otherwise a payload starting with `solid`
//! is parsed as ASCII. Bytes past the last declared triangle are ignored
//! unless the payload starts with `solid`.

use std::fmt::Write as _;

use crate::mesh::TriangleMesh;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;
const PREAMBLE_LEN: usize = HEADER_LEN + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StlError {
    EmptyPayload,
    UnexpectedEof,
    TruncatedBinary { expected: usize, found: usize },
    InvalidUtf8,
    InvalidAscii { line: usize, reason: String },
}

impl std::fmt::Display for StlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StlError::EmptyPayload => write!(f, "empty STL payload"),
            StlError::UnexpectedEof => write!(f, "unexpected EOF"),
            StlError::TruncatedBinary { expected, found } => {
                write!(f, "truncated binary STL: expected {expected} bytes, found {found}")
            }
            StlError::InvalidUtf8 => write!(f, "invalid utf-8 in ASCII STL"),
            StlError::InvalidAscii { line, reason } => {
                write!(f, "invalid ASCII STL at line {line}: {reason}")
            }
        }
    }
}

impl std::error::Error for StlError {}

/// Which STL layout a payload uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StlLayout {
    Binary,
    Ascii,
}

pub fn detect_layout(bytes: &[u8]) -> Result<StlLayout, StlError> {
    if bytes.is_empty() {
        return Err(StlError::EmptyPayload);
    }
    if let Some(expected) = binary_len_from_header(bytes) {
        let padded = expected < bytes.len() && !starts_with_solid(bytes);
        if expected == bytes.len() || padded {
            return Ok(StlLayout::Binary);
        }
    }
    if starts_with_solid(bytes) {
        return Ok(StlLayout::Ascii);
    }
    match binary_len_from_header(bytes) {
        Some(expected) => Err(StlError::TruncatedBinary {
            expected,
            found: bytes.len(),
        }),
        None => Err(StlError::UnexpectedEof),
    }
}

pub fn decode_stl(bytes: &[u8]) -> Result<TriangleMesh, StlError> {
    match detect_layout(bytes)? {
        StlLayout::Binary => decode_binary(bytes),
        StlLayout::Ascii => {
            let text = std::str::from_utf8(bytes).map_err(|_| StlError::InvalidUtf8)?;
            decode_ascii(text)
        }
    }
}

fn binary_len_from_header(bytes: &[u8]) -> Option<usize> {
    let count = bytes.get(HEADER_LEN..PREAMBLE_LEN)?;
    let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;
    count.checked_mul(TRIANGLE_LEN)?.checked_add(PREAMBLE_LEN)
}

fn starts_with_solid(bytes: &[u8]) -> bool {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &bytes[i..])
        .unwrap_or(&[]);
    trimmed.starts_with(b"solid")
}

pub fn decode_binary(bytes: &[u8]) -> Result<TriangleMesh, StlError> {
    let mut r = SliceReader::new(bytes);
    let header = r.read_bytes(HEADER_LEN)?;
    let count = r.read_u32_le()? as usize;

    let expected = count
        .checked_mul(TRIANGLE_LEN)
        .and_then(|n| n.checked_add(PREAMBLE_LEN))
        .ok_or(StlError::UnexpectedEof)?;
    if bytes.len() < expected {
        return Err(StlError::TruncatedBinary {
            expected,
            found: bytes.len(),
        });
    }

    let mut mesh = TriangleMesh {
        name: header_name(header),
        positions: Vec::with_capacity(count * 3),
        normals: Vec::with_capacity(count),
    };
    for _ in 0..count {
        let normal = r.read_vec3()?;
        let a = r.read_vec3()?;
        let b = r.read_vec3()?;
        let c = r.read_vec3()?;
        let _attribute_bytes = r.read_u16_le()?;
        mesh.push_triangle(normal, [a, b, c]);
    }
    Ok(mesh)
}

fn header_name(header: &[u8]) -> Option<String> {
    let end = header.iter().position(|b| *b == 0).unwrap_or(header.len());
    let name = String::from_utf8_lossy(&header[..end]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

pub fn decode_ascii(text: &str) -> Result<TriangleMesh, StlError> {
    let mut mesh = TriangleMesh::new();
    let mut facet: Option<([f32; 3], Vec<[f32; 3]>)> = None;
    let mut saw_solid = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let invalid = |reason: &str| StlError::InvalidAscii {
            line,
            reason: reason.to_string(),
        };

        match keyword {
            "solid" if !saw_solid => {
                saw_solid = true;
                let name = tokens.collect::<Vec<_>>().join(" ");
                mesh.name = (!name.is_empty()).then_some(name);
            }
            "facet" => {
                if facet.is_some() {
                    return Err(invalid("nested facet"));
                }
                if tokens.next() != Some("normal") {
                    return Err(invalid("expected `facet normal`"));
                }
                let normal = parse_vec3(&mut tokens).ok_or_else(|| invalid("bad normal"))?;
                facet = Some((normal, Vec::with_capacity(3)));
            }
            "vertex" => {
                let Some((_, vertices)) = facet.as_mut() else {
                    return Err(invalid("vertex outside facet"));
                };
                let v = parse_vec3(&mut tokens).ok_or_else(|| invalid("bad vertex"))?;
                vertices.push(v);
            }
            "endfacet" => {
                let Some((normal, vertices)) = facet.take() else {
                    return Err(invalid("endfacet without facet"));
                };
                let [a, b, c] = <[[f32; 3]; 3]>::try_from(vertices)
                    .map_err(|_| invalid("facet must have exactly 3 vertices"))?;
                mesh.push_triangle(normal, [a, b, c]);
            }
            "outer" | "endloop" => {}
            "endsolid" => break,
            _ if !saw_solid => return Err(invalid("missing `solid` header")),
            other => return Err(invalid(&format!("unexpected keyword `{other}`"))),
        }
    }

    if facet.is_some() {
        return Err(StlError::UnexpectedEof);
    }
    Ok(mesh)
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<[f32; 3]> {
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    let z = tokens.next()?.parse().ok()?;
    Some([x, y, z])
}

pub fn encode_binary(mesh: &TriangleMesh) -> Vec<u8> {
    let mut out = Vec::with_capacity(PREAMBLE_LEN + mesh.triangle_count() * TRIANGLE_LEN);
    let mut header = [0u8; HEADER_LEN];
    if let Some(name) = &mesh.name {
        let n = name.len().min(HEADER_LEN);
        header[..n].copy_from_slice(&name.as_bytes()[..n]);
    }
    out.extend_from_slice(&header);
    out.extend_from_slice(&(mesh.triangle_count() as u32).to_le_bytes());
    for (normal, vertices) in mesh.triangles() {
        for v in std::iter::once(&normal).chain(vertices.iter()) {
            for c in v {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

pub fn encode_ascii(mesh: &TriangleMesh) -> String {
    let name = mesh.name.as_deref().unwrap_or("");
    let mut out = String::new();
    let _ = writeln!(out, "solid {name}");
    for (n, vertices) in mesh.triangles() {
        let _ = writeln!(out, "facet normal {} {} {}", n[0], n[1], n[2]);
        let _ = writeln!(out, "outer loop");
        for v in vertices {
            let _ = writeln!(out, "vertex {} {} {}", v[0], v[1], v[2]);
        }
        let _ = writeln!(out, "endloop");
        let _ = writeln!(out, "endfacet");
    }
    let _ = writeln!(out, "endsolid {name}");
    out
}

struct SliceReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], StlError> {
        let end = self.pos.checked_add(n).ok_or(StlError::UnexpectedEof)?;
        let out = self.bytes.get(self.pos..end).ok_or(StlError::UnexpectedEof)?;
        self.pos = end;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], StlError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    fn read_u16_le(&mut self) -> Result<u16, StlError> {
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    fn read_u32_le(&mut self) -> Result<u32, StlError> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    fn read_f32_le(&mut self) -> Result<f32, StlError> {
        Ok(f32::from_le_bytes(self.read_array::<4>()?))
    }

    fn read_vec3(&mut self) -> Result<[f32; 3], StlError> {
        Ok([self.read_f32_le()?, self.read_f32_le()?, self.read_f32_le()?])
    }
}
