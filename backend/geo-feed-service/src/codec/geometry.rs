//! Point geometry <-> WKB/EWKB.
//!
//! Reads what PostGIS hands back (`ST_AsBinary` or `ST_AsEWKB`, either byte
//! order) and writes little-endian EWKB tagged with SRID 4326.

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::models::GeoPoint;

/// WGS84
pub const SRID_WGS84: u32 = 4326;

const WKB_POINT: u32 = 1;
const EWKB_Z_FLAG: u32 = 0x8000_0000;
const EWKB_M_FLAG: u32 = 0x4000_0000;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z_FLAG | EWKB_M_FLAG | EWKB_SRID_FLAG;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("malformed geometry: {0}")]
    Format(String),

    #[error("unsupported geometry: {0}")]
    Unsupported(String),
}

#[derive(Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

/// Decode a single point geometry.
pub fn decode(bytes: &[u8]) -> Result<GeoPoint, GeometryError> {
    let mut buf = bytes;

    let order = match take_u8(&mut buf)? {
        0 => ByteOrder::Big,
        1 => ByteOrder::Little,
        other => {
            return Err(GeometryError::Format(format!(
                "unknown byte order marker {other:#04x}"
            )))
        }
    };

    let raw_type = take_u32(&mut buf, order)?;
    let flags = raw_type & EWKB_FLAGS;
    let iso_type = raw_type & !EWKB_FLAGS;

    // ISO encodes dimensions as thousands: 1001 = Z, 2001 = M, 3001 = ZM.
    let base_type = iso_type % 1000;
    let iso_dims = iso_type / 1000;
    if iso_dims > 3 {
        return Err(GeometryError::Format(format!(
            "unknown geometry type code {raw_type:#x}"
        )));
    }

    match base_type {
        WKB_POINT => {}
        2..=7 => {
            return Err(GeometryError::Unsupported(format!(
                "expected a point, got {}",
                type_name(base_type)
            )))
        }
        _ => {
            return Err(GeometryError::Format(format!(
                "unknown geometry type code {raw_type:#x}"
            )))
        }
    }

    if flags & EWKB_SRID_FLAG != 0 {
        let srid = take_u32(&mut buf, order)?;
        if srid != SRID_WGS84 {
            return Err(GeometryError::Unsupported(format!(
                "spatial reference {srid}, expected {SRID_WGS84}"
            )));
        }
    }

    let has_z = flags & EWKB_Z_FLAG != 0 || iso_dims == 1 || iso_dims == 3;
    let has_m = flags & EWKB_M_FLAG != 0 || iso_dims == 2 || iso_dims == 3;

    let x = take_f64(&mut buf, order)?;
    let y = take_f64(&mut buf, order)?;
    if has_z {
        take_f64(&mut buf, order)?;
    }
    if has_m {
        take_f64(&mut buf, order)?;
    }

    if buf.has_remaining() {
        return Err(GeometryError::Format(format!(
            "{} trailing bytes after point",
            buf.remaining()
        )));
    }

    if x.is_nan() || y.is_nan() {
        return Err(GeometryError::Format("empty point".to_string()));
    }

    GeoPoint::new(y, x).map_err(GeometryError::Format)
}

/// Encode a point as little-endian EWKB with SRID 4326.
pub fn encode(point: &GeoPoint) -> Vec<u8> {
    let mut out = Vec::with_capacity(25);
    out.put_u8(1);
    out.put_u32_le(WKB_POINT | EWKB_SRID_FLAG);
    out.put_u32_le(SRID_WGS84);
    out.put_f64_le(point.lng());
    out.put_f64_le(point.lat());
    out
}

fn type_name(code: u32) -> &'static str {
    match code {
        2 => "linestring",
        3 => "polygon",
        4 => "multipoint",
        5 => "multilinestring",
        6 => "multipolygon",
        7 => "geometrycollection",
        _ => "unknown",
    }
}

fn ensure(buf: &[u8], needed: usize) -> Result<(), GeometryError> {
    if buf.remaining() < needed {
        return Err(GeometryError::Format(format!(
            "truncated geometry: needed {needed} more bytes, {} left",
            buf.remaining()
        )));
    }
    Ok(())
}

fn take_u8(buf: &mut &[u8]) -> Result<u8, GeometryError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

fn take_u32(buf: &mut &[u8], order: ByteOrder) -> Result<u32, GeometryError> {
    ensure(buf, 4)?;
    Ok(match order {
        ByteOrder::Big => buf.get_u32(),
        ByteOrder::Little => buf.get_u32_le(),
    })
}

fn take_f64(buf: &mut &[u8], order: ByteOrder) -> Result<f64, GeometryError> {
    ensure(buf, 8)?;
    Ok(match order {
        ByteOrder::Big => buf.get_f64(),
        ByteOrder::Little => buf.get_f64_le(),
    })
}
