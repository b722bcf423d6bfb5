/// STL decoding for binary and ASCII files
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::tag_no_case,
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::opt,
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::StlError;
use crate::geometry::{Mesh, Triangle};

const HEADER_LEN: usize = 80;
const PREAMBLE_LEN: usize = HEADER_LEN + 4;
const RECORD_LEN: u64 = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < PREAMBLE_LEN {
        return Err(StlError::TooShort { len: data.len() });
    }

    let triangles = declared_triangles(data);
    let expected = PREAMBLE_LEN as u64 + RECORD_LEN * u64::from(triangles);
    if (data.len() as u64) < expected {
        return Err(StlError::Truncated {
            triangles,
            expected,
            actual: data.len(),
        });
    }

    let body = &data[PREAMBLE_LEN..];
    let (_, facets) = count(binary_facet, triangles as usize)(body).map_err(|_| {
        StlError::Truncated {
            triangles,
            expected,
            actual: data.len(),
        }
    })?;

    Ok(Mesh { triangles: facets })
}

fn declared_triangles(data: &[u8]) -> u32 {
    u32::from_le_bytes([
        data[HEADER_LEN],
        data[HEADER_LEN + 1],
        data[HEADER_LEN + 2],
        data[HEADER_LEN + 3],
    ])
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, normal) = le_vec3(input)?;
    let (input, (a, b, c)) = tuple((le_vec3, le_vec3, le_vec3))(input)?;
    // Attribute byte count, unused by every common exporter
    let (input, _) = le_u16(input)?;

    let corners = [a, b, c].map(Point3::from);
    Ok((input, Triangle::from_facet(Vector3::from(normal), corners)))
}

fn le_vec3(input: &[u8]) -> IResult<&[u8], [f32; 3]> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, [x, y, z]))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(StlError::Ascii {
            context: e.input.trim_start().chars().take(32).collect(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(StlError::Ascii {
            context: String::new(),
        }),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag_no_case("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endsolid"))(input)?;
    let (input, _) = opt(not_line_ending)(input)?;

    Ok((input, Mesh { triangles }))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag_no_case("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("loop"))(input)?;
    let (input, corners) = count(parse_vertex, 3)(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endfacet"))(input)?;

    let corners = [corners[0], corners[1], corners[2]];
    Ok((input, Triangle::from_facet(Vector3::from(normal), corners)))
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag_no_case("vertex"))(input)?;
    let (input, v) = parse_vector3(input)?;
    Ok((input, Point3::from(v)))
}

fn parse_vector3(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, [x, y, z]))
}

/// True when the byte length matches the binary triangle count exactly.
///
/// Many exporters write binary files whose header starts with `solid`, so
/// the keyword alone cannot decide the format.
fn is_exact_binary(data: &[u8]) -> bool {
    data.len() >= PREAMBLE_LEN
        && PREAMBLE_LEN as u64 + RECORD_LEN * u64::from(declared_triangles(data))
            == data.len() as u64
}

fn looks_ascii(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].len() >= 5 && data[start..start + 5].eq_ignore_ascii_case(b"solid")
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if is_exact_binary(data) {
        return parse_binary_stl(data);
    }

    if looks_ascii(data) {
        let text = std::str::from_utf8(data).map_err(|_| StlError::Utf8)?;
        return parse_ascii_stl(text);
    }

    parse_binary_stl(data)
}
