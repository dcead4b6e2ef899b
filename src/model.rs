//! Mesh geometry: the vertex format, the Wavefront OBJ reader and GPU models.
//!
//! Models are loaded once by the [`AssetRegistry`](crate::AssetRegistry). The
//! OBJ reader understands the subset the bundled assets use:
//!
//! | Keyword | Meaning |
//! |---------|---------|
//! | `v x y z` | position |
//! | `vt u v` | texture coordinate, `v` flipped to `1 - v` |
//! | `vn x y z` | normal |
//! | `f a/b/c ...` | polygon, 1-based or negative indices, fan-triangulated |
//!
//! `mtllib`, `usemtl`, `o`, `g` and `s` are skipped quietly. Any other keyword
//! is logged as a warning and skipped. Bad numbers and out-of-range indices are
//! fatal.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use std::collections::HashMap;

use glam::Vec3;

use crate::device::{BufferUsage, GraphicsDevice};
use crate::error::AssetError;

/// A vertex with position, normal and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indexed triangle geometry on the CPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Result of reading an OBJ file.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedObj {
    pub mesh: MeshData,
    /// 1-based line numbers that were skipped with a warning.
    pub skipped_lines: Vec<usize>,
}

/// One corner of a face after index resolution. A missing normal falls back
/// to the flat face normal, so those corners are keyed by face as well.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct CornerKey {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
    face: Option<usize>,
}

/// Parses OBJ text. `path` is only used for diagnostics.
pub fn parse_obj(path: &str, source: &str) -> Result<ParsedObj, AssetError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut mesh = MeshData::default();
    let mut corners: HashMap<CornerKey, u32> = HashMap::new();
    let mut skipped_lines = Vec::new();
    let mut face_count = 0usize;

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.split('#').next().unwrap_or("").trim();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();
        let malformed = |reason: String| AssetError::MalformedModel {
            path: path.to_string(),
            line: line_number,
            reason,
        };

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&args).map_err(malformed)?;
                positions.push([x, y, z]);
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&args).map_err(malformed)?;
                normals.push([x, y, z]);
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&args).map_err(malformed)?;
                uvs.push([u, 1.0 - v]);
            }
            "f" => {
                if args.len() < 3 {
                    return Err(malformed(format!(
                        "face needs at least 3 corners, found {}",
                        args.len()
                    )));
                }

                let mut resolved = Vec::with_capacity(args.len());
                for corner in &args {
                    resolved.push(
                        parse_corner(corner, positions.len(), uvs.len(), normals.len())
                            .map_err(malformed)?,
                    );
                }

                let face_normal = flat_normal(
                    positions[resolved[0].0],
                    positions[resolved[1].0],
                    positions[resolved[2].0],
                );

                let mut face_indices = Vec::with_capacity(resolved.len());
                for (position, uv, normal) in resolved {
                    let key = CornerKey {
                        position,
                        uv,
                        normal,
                        face: normal.is_none().then_some(face_count),
                    };
                    let next = mesh.vertices.len() as u32;
                    let vertex_index = *corners.entry(key).or_insert_with(|| {
                        mesh.vertices.push(Vertex3d::new(
                            positions[position],
                            normal.map_or(face_normal, |n| normals[n]),
                            uv.map_or([0.0, 0.0], |t| uvs[t]),
                        ));
                        next
                    });
                    face_indices.push(vertex_index);
                }

                for i in 1..face_indices.len() - 1 {
                    mesh.indices.extend_from_slice(&[
                        face_indices[0],
                        face_indices[i],
                        face_indices[i + 1],
                    ]);
                }
                face_count += 1;
            }
            "mtllib" | "usemtl" | "o" | "g" | "s" => {}
            other => {
                log::warn!("{path}:{line_number}: unsupported OBJ keyword '{other}', line skipped");
                skipped_lines.push(line_number);
            }
        }
    }

    if face_count == 0 {
        return Err(AssetError::MalformedModel {
            path: path.to_string(),
            line: source.lines().count(),
            reason: "file contains no faces".to_string(),
        });
    }

    Ok(ParsedObj {
        mesh,
        skipped_lines,
    })
}

fn parse_floats<const N: usize>(args: &[&str]) -> Result<[f32; N], String> {
    if args.len() < N {
        return Err(format!("expected {N} numbers, found {}", args.len()));
    }
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .map_err(|_| format!("'{arg}' is not a number"))?;
    }
    Ok(out)
}

/// Resolves `v`, `v/vt`, `v//vn` or `v/vt/vn` into zero-based indices.
fn parse_corner(
    corner: &str,
    positions: usize,
    uvs: usize,
    normals: usize,
) -> Result<(usize, Option<usize>, Option<usize>), String> {
    let mut parts = corner.split('/');
    let position = match parts.next() {
        Some(raw) if !raw.is_empty() => resolve_index(raw, positions, "position")?,
        _ => return Err(format!("corner '{corner}' has no position index")),
    };
    let uv = match parts.next() {
        Some(raw) if !raw.is_empty() => Some(resolve_index(raw, uvs, "texture coordinate")?),
        _ => None,
    };
    let normal = match parts.next() {
        Some(raw) if !raw.is_empty() => Some(resolve_index(raw, normals, "normal")?),
        _ => None,
    };
    Ok((position, uv, normal))
}

fn resolve_index(raw: &str, len: usize, what: &str) -> Result<usize, String> {
    let value: i64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a valid {what} index"))?;
    let len_i = len as i64;
    let resolved = if value > 0 && value <= len_i {
        value - 1
    } else if value < 0 && -value <= len_i {
        len_i + value
    } else {
        return Err(format!("{what} index {value} out of range (have {len})"));
    };
    Ok(resolved as usize)
}

fn flat_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let (a, b, c) = (Vec3::from(a), Vec3::from(b), Vec3::from(c));
    (b - a).cross(c - a).normalize_or_zero().to_array()
}

/// GPU-resident geometry owned by the asset registry.
#[derive(Debug)]
pub struct Model<Buffer> {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub index_count: u32,
}

impl<Buffer> Model<Buffer> {
    /// Copies `mesh` into a vertex buffer and a `u32` index buffer.
    pub fn upload<D>(device: &mut D, label: &str, mesh: &MeshData) -> Self
    where
        D: GraphicsDevice<Buffer = Buffer> + ?Sized,
    {
        let vertex_buffer = device.create_buffer(
            &format!("{label} vertices"),
            bytemuck::cast_slice(&mesh.vertices),
            BufferUsage::Vertex,
        );
        let index_buffer = device.create_buffer(
            &format!("{label} indices"),
            bytemuck::cast_slice(&mesh.indices),
            BufferUsage::Index,
        );
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    /// Hands both buffers back to `device`.
    pub fn destroy<D>(self, device: &mut D)
    where
        D: GraphicsDevice<Buffer = Buffer> + ?Sized,
    {
        device.destroy_buffer(self.vertex_buffer);
        device.destroy_buffer(self.index_buffer);
    }
}
