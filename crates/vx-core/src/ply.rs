use glam::Vec3;
use tracing::debug;
use crate::bounding_box::Aabb;
use crate::error::{Error, Result};

const DEFAULT_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMesh {
    pub positions: Vec<Vec3>,
    /// Linear RGB in [0, 1], one per vertex
    pub colors: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl ModelMesh {
    pub fn from_ply_bytes(data: &[u8]) -> Result<Self> {
        let (header, body) = split_header(data)?;
        let header = Header::parse(header)?;

        let mut reader: Box<dyn ValueReader + '_> = match header.format {
            Format::Ascii => {
                let text = std::str::from_utf8(body).map_err(|e| Error::Ply(e.to_string()))?;
                Box::new(AsciiReader { tokens: text.split_ascii_whitespace() })
            }
            Format::BinaryLittleEndian => Box::new(BinaryReader { data: body, pos: 0, big_endian: false }),
            Format::BinaryBigEndian => Box::new(BinaryReader { data: body, pos: 0, big_endian: true }),
        };

        let mut mesh = ModelMesh::default();
        for element in &header.elements {
            match element.name.as_str() {
                "vertex" => mesh.read_vertices(element, reader.as_mut())?,
                "face" => mesh.read_faces(element, reader.as_mut())?,
                _ => skip_element(element, reader.as_mut())?,
            }
        }

        let vertex_count = mesh.positions.len() as u32;
        if let Some(bad) = mesh.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(Error::Ply(format!("face index {} out of range ({} vertices)", bad, vertex_count)));
        }

        debug!("Decoded PLY with {} vertices and {} triangles", mesh.vertex_count(), mesh.triangle_count());
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    fn read_vertices(&mut self, element: &Element, reader: &mut dyn ValueReader) -> Result<()> {
        let slot = |names: &[&str]| {
            element
                .properties
                .iter()
                .position(|p| names.iter().any(|n| *n == p.name()))
        };
        let position_slots = [slot(&["x"]), slot(&["y"]), slot(&["z"])];
        let color_slots = [
            slot(&["red", "r", "diffuse_red"]),
            slot(&["green", "g", "diffuse_green"]),
            slot(&["blue", "b", "diffuse_blue"]),
        ];

        let [Some(x), Some(y), Some(z)] = position_slots else {
            return Err(Error::Ply("vertex element has no x/y/z properties".to_string()));
        };

        let mut values = vec![0.0; element.properties.len()];
        for _ in 0..element.count {
            for (value, property) in values.iter_mut().zip(&element.properties) {
                *value = match property {
                    Property::Scalar { ty, .. } => reader.read(*ty)?,
                    Property::List { count, item, .. } => {
                        skip_list(*count, *item, reader)?;
                        0.0
                    }
                };
            }

            self.positions.push(Vec3::new(values[x] as f32, values[y] as f32, values[z] as f32));

            let color = match color_slots {
                [Some(r), Some(g), Some(b)] => [r, g, b].map(|slot| {
                    let ty = element.properties[slot].scalar_type();
                    normalize_channel(values[slot], ty)
                }),
                _ => DEFAULT_COLOR,
            };
            self.colors.push(color);
        }

        Ok(())
    }

    fn read_faces(&mut self, element: &Element, reader: &mut dyn ValueReader) -> Result<()> {
        for _ in 0..element.count {
            for property in &element.properties {
                match property {
                    Property::List { name, count, item } if name == "vertex_indices" || name == "vertex_index" => {
                        let n = reader.read(*count)? as usize;
                        let mut polygon = Vec::new();
                        for _ in 0..n {
                            polygon.push(reader.read(*item)? as u32);
                        }
                        // Fan around the first corner
                        for i in 1..n.saturating_sub(1) {
                            self.indices.extend([polygon[0], polygon[i], polygon[i + 1]]);
                        }
                    }
                    Property::List { count, item, .. } => skip_list(*count, *item, reader)?,
                    Property::Scalar { ty, .. } => {
                        reader.read(*ty)?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Byte channels are scaled to [0, 1], float channels are taken as is
fn normalize_channel(value: f64, ty: ScalarType) -> f32 {
    match ty {
        ScalarType::Float | ScalarType::Double => value as f32,
        ScalarType::UShort | ScalarType::Short => (value / 65535.0) as f32,
        _ => (value / 255.0) as f32,
    }
}

fn skip_list(count: ScalarType, item: ScalarType, reader: &mut dyn ValueReader) -> Result<()> {
    let n = reader.read(count)? as usize;
    for _ in 0..n {
        reader.read(item)?;
    }
    Ok(())
}

fn skip_element(element: &Element, reader: &mut dyn ValueReader) -> Result<()> {
    debug!("Skipping PLY element '{}' ({} entries)", element.name, element.count);
    for _ in 0..element.count {
        for property in &element.properties {
            match property {
                Property::Scalar { ty, .. } => {
                    reader.read(*ty)?;
                }
                Property::List { count, item, .. } => skip_list(*count, *item, reader)?,
            }
        }
    }
    Ok(())
}

/// Split at the line following `end_header`
fn split_header(data: &[u8]) -> Result<(&str, &[u8])> {
    const MARKER: &[u8] = b"end_header";

    if !data.starts_with(b"ply") {
        return Err(Error::Ply("missing 'ply' magic".to_string()));
    }

    let marker = data
        .windows(MARKER.len())
        .position(|w| w == MARKER)
        .ok_or(Error::PlyTruncated("header"))?;
    let body_start = data[marker..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|offset| marker + offset + 1)
        .unwrap_or(data.len());

    let header = std::str::from_utf8(&data[..marker]).map_err(|e| Error::Ply(e.to_string()))?;
    Ok((header, &data[body_start..]))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "char" | "int8" => Self::Char,
            "uchar" | "uint8" => Self::UChar,
            "short" | "int16" => Self::Short,
            "ushort" | "uint16" => Self::UShort,
            "int" | "int32" => Self::Int,
            "uint" | "uint32" => Self::UInt,
            "float" | "float32" => Self::Float,
            "double" | "float64" => Self::Double,
            other => return Err(Error::Ply(format!("unknown property type '{}'", other))),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Property {
    Scalar { name: String, ty: ScalarType },
    List { name: String, count: ScalarType, item: ScalarType },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Self::Scalar { name, .. } | Self::List { name, .. } => name,
        }
    }

    fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Scalar { ty, .. } => *ty,
            Self::List { item, .. } => *item,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug)]
struct Header {
    format: Format,
    elements: Vec<Element>,
}

impl Header {
    fn parse(text: &str) -> Result<Self> {
        let mut format = None;
        let mut elements: Vec<Element> = Vec::new();

        for line in text.lines().skip(1) {
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                ["format", "ascii", ..] => format = Some(Format::Ascii),
                ["format", "binary_little_endian", ..] => format = Some(Format::BinaryLittleEndian),
                ["format", "binary_big_endian", ..] => format = Some(Format::BinaryBigEndian),
                ["format", other, ..] => return Err(Error::Ply(format!("unsupported format '{}'", other))),
                ["element", name, count] => {
                    let count = count
                        .parse()
                        .map_err(|_| Error::Ply(format!("bad element count '{}'", count)))?;
                    elements.push(Element { name: name.to_string(), count, properties: Vec::new() });
                }
                ["property", "list", count, item, name] => {
                    let element = elements
                        .last_mut()
                        .ok_or_else(|| Error::Ply("property before any element".to_string()))?;
                    element.properties.push(Property::List {
                        name: name.to_string(),
                        count: ScalarType::parse(count)?,
                        item: ScalarType::parse(item)?,
                    });
                }
                ["property", ty, name] => {
                    let element = elements
                        .last_mut()
                        .ok_or_else(|| Error::Ply("property before any element".to_string()))?;
                    element.properties.push(Property::Scalar {
                        name: name.to_string(),
                        ty: ScalarType::parse(ty)?,
                    });
                }
                ["comment", ..] | ["obj_info", ..] | [] => {}
                _ => return Err(Error::Ply(format!("unrecognised header line '{}'", line))),
            }
        }

        let format = format.ok_or_else(|| Error::Ply("header has no format line".to_string()))?;
        Ok(Self { format, elements })
    }
}

trait ValueReader {
    fn read(&mut self, ty: ScalarType) -> Result<f64>;
}

struct AsciiReader<'a> {
    tokens: std::str::SplitAsciiWhitespace<'a>,
}

impl ValueReader for AsciiReader<'_> {
    fn read(&mut self, _ty: ScalarType) -> Result<f64> {
        let token = self.tokens.next().ok_or(Error::PlyTruncated("ascii body"))?;
        token
            .parse()
            .map_err(|_| Error::Ply(format!("bad number '{}'", token)))
    }
}

struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl BinaryReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self.data.get(self.pos..end).ok_or(Error::PlyTruncated("binary body"))?;
        self.pos = end;

        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

macro_rules! read_number {
    ($reader:expr, $t:ty, $n:literal) => {{
        let bytes = $reader.take::<$n>()?;
        let value = if $reader.big_endian { <$t>::from_be_bytes(bytes) } else { <$t>::from_le_bytes(bytes) };
        value as f64
    }};
}

impl ValueReader for BinaryReader<'_> {
    fn read(&mut self, ty: ScalarType) -> Result<f64> {
        Ok(match ty {
            ScalarType::Char => read_number!(self, i8, 1),
            ScalarType::UChar => read_number!(self, u8, 1),
            ScalarType::Short => read_number!(self, i16, 2),
            ScalarType::UShort => read_number!(self, u16, 2),
            ScalarType::Int => read_number!(self, i32, 4),
            ScalarType::UInt => read_number!(self, u32, 4),
            ScalarType::Float => read_number!(self, f32, 4),
            ScalarType::Double => read_number!(self, f64, 8),
        })
    }
}
