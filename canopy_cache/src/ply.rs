// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal PLY point-cloud access: vertex positions in, `double` x/y/z clouds out.
//!
//! Supports the `ascii`, `binary_little_endian` and `binary_big_endian` encodings, all eight
//! scalar types under both their short (`float`) and sized (`float32`) names, list
//! properties, and elements declared before `vertex`. Only the `x`, `y`, `z` properties of
//! the `vertex` element are decoded; everything else is skipped.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use canopy_index::{Aabb3D, BBox, BoxId};

use crate::error::PlyError;

bitflags::bitflags! {
    /// Coordinate properties of the `vertex` element.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VertexFields: u8 {
        /// `x` property.
        const X = 0b001;
        /// `y` property.
        const Y = 0b010;
        /// `z` property.
        const Z = 0b100;
    }
}

/// Body encoding declared by the `format` line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Whitespace-separated text.
    Ascii,
    /// Packed little-endian values.
    BinaryLittleEndian,
    /// Packed big-endian values.
    BinaryBigEndian,
}

/// PLY scalar property type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalarType {
    /// `char` / `int8`
    I8,
    /// `uchar` / `uint8`
    U8,
    /// `short` / `int16`
    I16,
    /// `ushort` / `uint16`
    U16,
    /// `int` / `int32`
    I32,
    /// `uint` / `uint32`
    U32,
    /// `float` / `float32`
    F32,
    /// `double` / `float64`
    F64,
}

impl ScalarType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Clone, Debug)]
enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Clone, Debug)]
struct Property {
    name: String,
    kind: PropertyKind,
}

#[derive(Clone, Debug)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

/// Parsed PLY header.
#[derive(Clone, Debug)]
pub struct Header {
    /// Body encoding.
    pub encoding: Encoding,
    /// `comment` and `obj_info` lines, without the keyword.
    pub comments: Vec<String>,
    elements: Vec<Element>,
}

impl Header {
    /// Number of rows declared for `element`, if present.
    pub fn element_count(&self, element: &str) -> Option<usize> {
        self.elements
            .iter()
            .find(|e| e.name == element)
            .map(|e| e.count)
    }
}

fn header_error(path: &Path, reason: impl Into<String>) -> PlyError {
    PlyError::Header {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn scalar_type(path: &Path, name: &str) -> Result<ScalarType, PlyError> {
    ScalarType::parse(name).ok_or_else(|| PlyError::UnsupportedType {
        path: path.to_path_buf(),
        name: name.to_owned(),
    })
}

fn read_header<R: BufRead>(path: &Path, reader: &mut R) -> Result<Header, PlyError> {
    let io_err = |source| PlyError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut line = String::new();
    reader.read_line(&mut line).map_err(io_err)?;
    if line.trim_end() != "ply" {
        return Err(header_error(path, "missing `ply` magic"));
    }

    let mut encoding = None;
    let mut comments = Vec::new();
    let mut elements: Vec<Element> = Vec::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(header_error(path, "missing `end_header`"));
        }
        let text = line.trim();
        let mut words = text.split_whitespace();
        match words.next() {
            None => {}
            Some("end_header") => break,
            Some("comment" | "obj_info") => {
                let rest = text.split_once(char::is_whitespace).map_or("", |(_, r)| r);
                comments.push(rest.trim().to_owned());
            }
            Some("format") => {
                encoding = Some(match words.next() {
                    Some("ascii") => Encoding::Ascii,
                    Some("binary_little_endian") => Encoding::BinaryLittleEndian,
                    Some("binary_big_endian") => Encoding::BinaryBigEndian,
                    other => {
                        return Err(header_error(
                            path,
                            format!("unknown format {}", other.unwrap_or("<none>")),
                        ));
                    }
                });
            }
            Some("element") => {
                let (Some(name), Some(count)) = (words.next(), words.next()) else {
                    return Err(header_error(path, format!("incomplete line `{text}`")));
                };
                let count = count
                    .parse()
                    .map_err(|_| header_error(path, format!("bad element count `{count}`")))?;
                elements.push(Element {
                    name: name.to_owned(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let Some(element) = elements.last_mut() else {
                    return Err(header_error(path, "property declared before any element"));
                };
                let words: Vec<&str> = words.collect();
                let property = match words.as_slice() {
                    ["list", count, item, name] => Property {
                        name: (*name).to_owned(),
                        kind: PropertyKind::List {
                            count: scalar_type(path, count)?,
                            item: scalar_type(path, item)?,
                        },
                    },
                    [ty, name] => Property {
                        name: (*name).to_owned(),
                        kind: PropertyKind::Scalar(scalar_type(path, ty)?),
                    },
                    _ => return Err(header_error(path, format!("bad property line `{text}`"))),
                };
                element.properties.push(property);
            }
            Some(other) => {
                return Err(header_error(path, format!("unknown keyword `{other}`")));
            }
        }
    }

    let encoding = encoding.ok_or_else(|| header_error(path, "missing `format` line"))?;
    // Rows without properties occupy no body bytes, so their count is unbounded by the file.
    if let Some(e) = elements
        .iter()
        .find(|e| e.count > 0 && e.properties.is_empty())
    {
        return Err(header_error(
            path,
            format!("element `{}` declares {} rows but no properties", e.name, e.count),
        ));
    }
    Ok(Header {
        encoding,
        comments,
        elements,
    })
}

/// Decodes body values one at a time, whatever the encoding.
enum Body<'p, R> {
    Ascii {
        path: &'p Path,
        reader: R,
        tokens: VecDeque<String>,
    },
    Binary {
        path: &'p Path,
        reader: R,
        big_endian: bool,
    },
}

impl<'p, R: BufRead> Body<'p, R> {
    fn new(path: &'p Path, reader: R, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Ascii => Self::Ascii {
                path,
                reader,
                tokens: VecDeque::new(),
            },
            Encoding::BinaryLittleEndian => Self::Binary {
                path,
                reader,
                big_endian: false,
            },
            Encoding::BinaryBigEndian => Self::Binary {
                path,
                reader,
                big_endian: true,
            },
        }
    }

    fn value(&mut self, ty: ScalarType) -> Result<f64, PlyError> {
        match self {
            Self::Ascii {
                path,
                reader,
                tokens,
            } => {
                let mut line = String::new();
                while tokens.is_empty() {
                    line.clear();
                    let n = reader.read_line(&mut line).map_err(|source| PlyError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    if n == 0 {
                        return Err(PlyError::Truncated {
                            path: path.to_path_buf(),
                        });
                    }
                    tokens.extend(line.split_whitespace().map(str::to_owned));
                }
                let token = tokens.pop_front().unwrap_or_default();
                token.parse::<f64>().map_err(|_| PlyError::BadValue {
                    path: path.to_path_buf(),
                    token,
                })
            }
            Self::Binary {
                path,
                reader,
                big_endian,
            } => {
                let mut buf = [0_u8; 8];
                let bytes = &mut buf[..ty.size()];
                reader.read_exact(bytes).map_err(|source| {
                    if source.kind() == ErrorKind::UnexpectedEof {
                        PlyError::Truncated {
                            path: path.to_path_buf(),
                        }
                    } else {
                        PlyError::Io {
                            path: path.to_path_buf(),
                            source,
                        }
                    }
                })?;
                Ok(decode(ty, bytes, *big_endian))
            }
        }
    }

    fn list_len(&mut self, ty: ScalarType) -> Result<usize, PlyError> {
        let n = self.value(ty)?;
        if n < 0.0 || n.fract() != 0.0 {
            let path = match self {
                Self::Ascii { path, .. } | Self::Binary { path, .. } => path.to_path_buf(),
            };
            return Err(PlyError::BadValue {
                path,
                token: n.to_string(),
            });
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "List lengths are small non-negative integers checked above."
        )]
        let n = n as usize;
        Ok(n)
    }

    fn skip_property(&mut self, kind: &PropertyKind) -> Result<(), PlyError> {
        match *kind {
            PropertyKind::Scalar(ty) => {
                self.value(ty)?;
            }
            PropertyKind::List { count, item } => {
                for _ in 0..self.list_len(count)? {
                    self.value(item)?;
                }
            }
        }
        Ok(())
    }
}

fn decode(ty: ScalarType, b: &[u8], big_endian: bool) -> f64 {
    macro_rules! num {
        ($t:ty, $n:literal) => {{
            let mut raw = [0_u8; $n];
            raw.copy_from_slice(&b[..$n]);
            if big_endian {
                <$t>::from_be_bytes(raw)
            } else {
                <$t>::from_le_bytes(raw)
            }
        }};
    }
    match ty {
        ScalarType::I8 => f64::from(num!(i8, 1)),
        ScalarType::U8 => f64::from(num!(u8, 1)),
        ScalarType::I16 => f64::from(num!(i16, 2)),
        ScalarType::U16 => f64::from(num!(u16, 2)),
        ScalarType::I32 => f64::from(num!(i32, 4)),
        ScalarType::U32 => f64::from(num!(u32, 4)),
        ScalarType::F32 => f64::from(num!(f32, 4)),
        ScalarType::F64 => num!(f64, 8),
    }
}

/// Visit the position of every vertex in the file. Returns the vertex count.
///
/// # Errors
///
/// Fails if the file cannot be opened, the header is malformed, the `vertex` element is
/// missing or lacks `x`/`y`/`z`, there are no vertices, or the body is truncated.
pub fn for_each_vertex(
    path: &Path,
    mut visit: impl FnMut(f64, f64, f64),
) -> Result<usize, PlyError> {
    let file = File::open(path).map_err(|source| PlyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let header = read_header(path, &mut reader)?;

    let Some(vertex_at) = header.elements.iter().position(|e| e.name == "vertex") else {
        return Err(PlyError::MissingVertexFields {
            path: path.to_path_buf(),
            missing: VertexFields::all(),
        });
    };
    let vertex = &header.elements[vertex_at];

    let mut found = VertexFields::empty();
    for p in &vertex.properties {
        let field = match p.name.as_str() {
            "x" => VertexFields::X,
            "y" => VertexFields::Y,
            "z" => VertexFields::Z,
            _ => continue,
        };
        if matches!(p.kind, PropertyKind::List { .. }) {
            return Err(header_error(path, format!("vertex `{}` is a list", p.name)));
        }
        found |= field;
    }
    if found != VertexFields::all() {
        return Err(PlyError::MissingVertexFields {
            path: path.to_path_buf(),
            missing: VertexFields::all() - found,
        });
    }
    if vertex.count == 0 {
        return Err(PlyError::NoVertices {
            path: path.to_path_buf(),
        });
    }

    let mut body = Body::new(path, reader, header.encoding);
    for element in &header.elements[..vertex_at] {
        for _ in 0..element.count {
            for p in &element.properties {
                body.skip_property(&p.kind)?;
            }
        }
    }

    for _ in 0..vertex.count {
        let mut xyz = [0.0; 3];
        for p in &vertex.properties {
            let slot = match p.name.as_str() {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                _ => {
                    body.skip_property(&p.kind)?;
                    continue;
                }
            };
            if let PropertyKind::Scalar(ty) = p.kind {
                xyz[slot] = body.value(ty)?;
            }
        }
        visit(xyz[0], xyz[1], xyz[2]);
    }
    Ok(vertex.count)
}

/// Bounding box of every vertex in a PLY file, tagged with `id` and the file path.
///
/// # Errors
///
/// See [`for_each_vertex`].
pub fn read_bbox(path: &Path, id: BoxId) -> Result<BBox, PlyError> {
    let mut bounds = Aabb3D::INVERTED;
    for_each_vertex(path, |x, y, z| bounds.include_point(x, y, z))?;
    Ok(BBox::new(id, bounds, path))
}

/// Every vertex position in a PLY file.
///
/// # Errors
///
/// See [`for_each_vertex`].
pub fn read_points(path: &Path) -> Result<Vec<[f64; 3]>, PlyError> {
    let mut points = Vec::new();
    for_each_vertex(path, |x, y, z| points.push([x, y, z]))?;
    Ok(points)
}

/// Write `points` as a `binary_little_endian` PLY with `double` x/y/z.
///
/// # Errors
///
/// Fails if the file cannot be created or written.
pub fn write_points(path: &Path, points: &[[f64; 3]], comment: &str) -> Result<(), PlyError> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "ply")?;
        writeln!(out, "format binary_little_endian 1.0")?;
        if !comment.is_empty() {
            writeln!(out, "comment {comment}")?;
        }
        writeln!(out, "element vertex {}", points.len())?;
        writeln!(out, "property double x")?;
        writeln!(out, "property double y")?;
        writeln!(out, "property double z")?;
        writeln!(out, "end_header")?;
        for p in points {
            for v in p {
                out.write_all(&v.to_le_bytes())?;
            }
        }
        out.flush()
    };
    write().map_err(|source| PlyError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read just the header of a PLY file.
///
/// # Errors
///
/// Fails if the file cannot be opened or the header is malformed.
pub fn read_header_from(path: &Path) -> Result<Header, PlyError> {
    let file = File::open(path).map_err(|source| PlyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_header(path, &mut BufReader::new(file))
}

/// Source of bounding boxes for individual files.
///
/// Implemented by [`PlyReader`] and by any `Fn(&Path, BoxId) -> Result<BBox, PlyError>`.
pub trait GeometryReader: Sync {
    /// Compute the bounding box of `path`, tagged with `id`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or holds no usable vertex positions.
    fn read_bbox(&self, path: &Path, id: BoxId) -> Result<BBox, PlyError>;
}

/// [`GeometryReader`] over PLY files.
#[derive(Copy, Clone, Debug, Default)]
pub struct PlyReader;

impl GeometryReader for PlyReader {
    fn read_bbox(&self, path: &Path, id: BoxId) -> Result<BBox, PlyError> {
        read_bbox(path, id)
    }
}

impl<F> GeometryReader for F
where
    F: Fn(&Path, BoxId) -> Result<BBox, PlyError> + Sync,
{
    fn read_bbox(&self, path: &Path, id: BoxId) -> Result<BBox, PlyError> {
        self(path, id)
    }
}
