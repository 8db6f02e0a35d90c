//! Binary STL serialization and parsing.
//!
//! ```text
//! UINT8[80]    – header, ignored by readers
//! UINT32       – number of triangles
//! foreach triangle
//!     REAL32[3] – facet normal
//!     REAL32[3] – vertex 1
//!     REAL32[3] – vertex 2
//!     REAL32[3] – vertex 3
//!     UINT16    – attribute byte count, always 0
//! end
//! ```
//!
//! Everything is little-endian. Shared vertices are flattened: every record
//! carries its own three positions.
use std::io::Write;

use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{le_f32, le_u16, le_u32},
    sequence::tuple,
    IResult,
};
use tracing::{debug, instrument, warn};

use crate::error::{LithoError, Result};
use crate::geometry::MeshGeometry;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 80;

/// Size of one triangle record: normal, three vertices, attribute.
pub const RECORD_SIZE: usize = 50;

/// Header plus the triangle count.
pub const PREAMBLE_SIZE: usize = HEADER_SIZE + 4;

/// Header text. Must not start with `solid`, which readers take for ASCII STL.
const HEADER_TEXT: &[u8] = b"binary STL lithophane relief";

/// A serialized binary STL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMeshBuffer {
    bytes: Vec<u8>,
}

impl BinaryMeshBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Triangle count as recorded in the header.
    pub fn triangle_count(&self) -> u32 {
        let mut count = [0u8; 4];
        count.copy_from_slice(&self.bytes[HEADER_SIZE..PREAMBLE_SIZE]);
        u32::from_le_bytes(count)
    }

    /// Write the whole buffer, e.g. to a `.stl` file.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.bytes)?;
        writer.flush()?;
        Ok(())
    }
}

impl AsRef<[u8]> for BinaryMeshBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Flatten `mesh` into binary STL records.
///
/// Degenerate triangles get a zero normal instead of failing.
#[instrument(skip_all, fields(triangles = mesh.triangle_count()))]
pub fn to_binary_stl(mesh: &MeshGeometry) -> Result<BinaryMeshBuffer> {
    if mesh.is_empty() {
        return Err(LithoError::EmptyMesh);
    }
    let triangle_count = u32::try_from(mesh.triangle_count()).map_err(|_| {
        LithoError::invalid_mesh(format!(
            "{} triangles exceed the format's u32 count",
            mesh.triangle_count()
        ))
    })?;
    if let Some((triangle, index)) = mesh.find_dangling_index() {
        return Err(LithoError::invalid_mesh(format!(
            "triangle {triangle} references vertex {index} of {}",
            mesh.vertex_count()
        )));
    }

    let mut bytes = Vec::with_capacity(PREAMBLE_SIZE + mesh.triangle_count() * RECORD_SIZE);
    let mut header = [0u8; HEADER_SIZE];
    header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&triangle_count.to_le_bytes());

    let mut degenerate = 0usize;
    for triangle in mesh.iter_triangles() {
        let normal = triangle.calculate_normal();
        if normal == Vector3::zeros() {
            degenerate += 1;
        }

        write_vector(&mut bytes, &normal);
        for vertex in &triangle.vertices {
            write_vector(&mut bytes, &vertex.coords);
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());
    }

    if degenerate > 0 {
        warn!(degenerate, "degenerate triangles written with zero normals");
    }
    debug!(bytes = bytes.len(), "serialized binary STL");

    Ok(BinaryMeshBuffer { bytes })
}

fn write_vector(bytes: &mut Vec<u8>, v: &Vector3<f32>) {
    bytes.extend_from_slice(&v.x.to_le_bytes());
    bytes.extend_from_slice(&v.y.to_le_bytes());
    bytes.extend_from_slice(&v.z.to_le_bytes());
}

/// One parsed triangle record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StlFacet {
    pub normal: Vector3<f32>,
    pub vertices: [Point3<f32>; 3],
    pub attribute: u16,
}

/// Contents of a binary STL file.
#[derive(Debug, Clone, PartialEq)]
pub struct StlMesh {
    pub header: Vec<u8>,
    pub facets: Vec<StlFacet>,
}

impl StlMesh {
    pub fn triangle_count(&self) -> usize {
        self.facets.len()
    }

    /// Unshared-vertex mesh: three fresh vertices per facet.
    pub fn to_geometry(&self) -> MeshGeometry {
        let mut mesh = MeshGeometry::with_capacity(self.facets.len() * 3, self.facets.len());
        for facet in &self.facets {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(&facet.vertices);
            mesh.triangles.push([base, base + 1, base + 2]);
        }
        mesh
    }
}

/// Parse a binary STL file.
///
/// The byte length must match the triangle count in the header exactly.
pub fn parse_binary_stl(data: &[u8]) -> Result<StlMesh> {
    if data.len() < PREAMBLE_SIZE {
        return Err(LithoError::malformed_stl(format!(
            "{} bytes is too small to be a binary STL",
            data.len()
        )));
    }

    let (body, (header, triangle_count)) =
        parse_preamble(data).map_err(|e| LithoError::malformed_stl(format!("header: {e:?}")))?;

    let expected = triangle_count as usize * RECORD_SIZE;
    if body.len() != expected {
        return Err(LithoError::malformed_stl(format!(
            "header declares {triangle_count} triangles ({expected} bytes) but {} bytes follow",
            body.len()
        )));
    }

    let (_, facets) = count(parse_facet, triangle_count as usize)(body)
        .map_err(|e| LithoError::malformed_stl(format!("facet: {e:?}")))?;

    Ok(StlMesh {
        header: header.to_vec(),
        facets,
    })
}

fn parse_preamble(input: &[u8]) -> IResult<&[u8], (&[u8], u32)> {
    let (input, header) = take(HEADER_SIZE)(input)?;
    let (input, triangle_count) = le_u32(input)?;
    Ok((input, (header, triangle_count)))
}

fn parse_facet(input: &[u8]) -> IResult<&[u8], StlFacet> {
    let (input, normal) = parse_vector3(input)?;
    let (input, v1) = parse_vector3(input)?;
    let (input, v2) = parse_vector3(input)?;
    let (input, v3) = parse_vector3(input)?;
    let (input, attribute) = le_u16(input)?;

    Ok((
        input,
        StlFacet {
            normal,
            vertices: [v1.into(), v2.into(), v3.into()],
            attribute,
        },
    ))
}

fn parse_vector3(input: &[u8]) -> IResult<&[u8], Vector3<f32>> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Vector3::new(x, y, z)))
}
