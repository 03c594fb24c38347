//! ENVI header parser and raw cube reader.
//!
//! A labeled cube is a plain-text `.hdr` file next to a headerless binary
//! file. The header declares geometry (`samples`, `lines`, `bands`), the
//! sample encoding (`data type`, `byte order`), the layout (`interleave`)
//! and optional per-band metadata such as `wavelength`.
//!
//! The reader decodes every sample to `f64` and re-lays the cube out as
//! band-interleaved-by-pixel, so that pixel `p` occupies
//! `data[p * bands .. (p + 1) * bands]`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, info, trace};

use crate::error::{BandSelectError, Result};

/// On-disk sample layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interleave {
    /// band sequential: [band][line][sample]
    Bsq,
    /// band interleaved by line: [line][band][sample]
    Bil,
    /// band interleaved by pixel: [line][sample][band]
    Bip,
}

impl Interleave {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bsq" => Ok(Interleave::Bsq),
            "bil" => Ok(Interleave::Bil),
            "bip" => Ok(Interleave::Bip),
            other => Err(BandSelectError::Header(format!(
                "unknown interleave '{}'",
                other
            ))),
        }
    }
}

/// ENVI `data type` codes this reader decodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
    U32,
    I64,
    U64,
}

impl DataType {
    pub fn from_code(code: u32) -> Result<Self> {
        Ok(match code {
            1 => DataType::U8,
            2 => DataType::I16,
            3 => DataType::I32,
            4 => DataType::F32,
            5 => DataType::F64,
            12 => DataType::U16,
            13 => DataType::U32,
            14 => DataType::I64,
            15 => DataType::U64,
            other => return Err(BandSelectError::UnsupportedDataType(other)),
        })
    }

    pub fn code(&self) -> u32 {
        match self {
            DataType::U8 => 1,
            DataType::I16 => 2,
            DataType::I32 => 3,
            DataType::F32 => 4,
            DataType::F64 => 5,
            DataType::U16 => 12,
            DataType::U32 => 13,
            DataType::I64 => 14,
            DataType::U64 => 15,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
        }
    }

    fn decode<E: ByteOrder>(&self, bytes: &[u8]) -> Vec<f64> {
        let n = self.size();
        let chunks = bytes.chunks_exact(n);
        match self {
            DataType::U8 => bytes.iter().map(|&b| b as f64).collect(),
            DataType::I16 => chunks.map(|c| E::read_i16(c) as f64).collect(),
            DataType::U16 => chunks.map(|c| E::read_u16(c) as f64).collect(),
            DataType::I32 => chunks.map(|c| E::read_i32(c) as f64).collect(),
            DataType::U32 => chunks.map(|c| E::read_u32(c) as f64).collect(),
            DataType::F32 => chunks.map(|c| E::read_f32(c) as f64).collect(),
            DataType::F64 => chunks.map(E::read_f64).collect(),
            DataType::I64 => chunks.map(|c| E::read_i64(c) as f64).collect(),
            DataType::U64 => chunks.map(|c| E::read_u64(c) as f64).collect(),
        }
    }
}

/// Parsed ENVI header.
#[derive(Clone, Debug, PartialEq)]
pub struct EnviHeader {
    pub samples: usize,
    pub lines: usize,
    pub bands: usize,
    pub header_offset: usize,
    pub data_type: DataType,
    pub interleave: Interleave,
    /// `true` for big-endian (`byte order = 1`).
    pub big_endian: bool,
    pub wavelengths: Option<Vec<f64>>,
    pub band_names: Option<Vec<String>>,
    /// Every key/value pair, keys lowercased, braces stripped.
    pub fields: BTreeMap<String, String>,
}

impl EnviHeader {
    /// Parse the text of a `.hdr` file.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        match lines.next() {
            Some(first) if first.trim() == "ENVI" => {}
            _ => {
                return Err(BandSelectError::Header(
                    "file does not start with 'ENVI'".into(),
                ));
            }
        }

        let fields = Self::collect_fields(lines)?;
        trace!("ENVI header fields: {:?}", fields.keys().collect::<Vec<_>>());

        let samples = required_usize(&fields, "samples")?;
        let lines = required_usize(&fields, "lines")?;
        let bands = required_usize(&fields, "bands")?;
        let header_offset = optional_usize(&fields, "header offset")?.unwrap_or(0);

        let code = required_usize(&fields, "data type")?;
        let data_type = DataType::from_code(code as u32)?;

        let interleave = match fields.get("interleave") {
            Some(v) => Interleave::parse(v)?,
            None => Interleave::Bsq,
        };

        let big_endian = match optional_usize(&fields, "byte order")? {
            None | Some(0) => false,
            Some(1) => true,
            Some(other) => {
                return Err(BandSelectError::Header(format!(
                    "invalid byte order {}",
                    other
                )));
            }
        };

        let wavelengths = match fields.get("wavelength") {
            Some(v) => {
                let values = split_list(v)
                    .map(|s| {
                        s.parse::<f64>().map_err(|_| {
                            BandSelectError::Header(format!("invalid wavelength '{}'", s))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()?;
                if values.len() != bands {
                    return Err(BandSelectError::Header(format!(
                        "{} wavelengths for {} bands",
                        values.len(),
                        bands
                    )));
                }
                Some(values)
            }
            None => None,
        };

        let band_names = fields
            .get("band names")
            .map(|v| split_list(v).map(str::to_string).collect::<Vec<_>>());

        debug!(
            "ENVI header: {} lines × {} samples × {} bands, {:?}, {:?}, big_endian={}",
            lines, samples, bands, data_type, interleave, big_endian
        );

        let header = Self {
            samples,
            lines,
            bands,
            header_offset,
            data_type,
            interleave,
            big_endian,
            wavelengths,
            band_names,
            fields,
        };
        // geometry must be addressable before any buffer is sized from it
        header.payload_len()?;
        Ok(header)
    }

    /// Read and parse a `.hdr` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    /// Byte length of the cube payload (excluding `header offset`).
    pub fn payload_len(&self) -> Result<usize> {
        cube_len(self.lines, self.samples, self.bands)
            .and_then(|n| n.checked_mul(self.data_type.size()))
            .ok_or(BandSelectError::GeometryOverflow {
                lines: self.lines,
                samples: self.samples,
                bands: self.bands,
            })
    }

    /// `key = value` pairs; `{ ... }` values may span lines.
    fn collect_fields<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<BTreeMap<String, String>> {
        let mut fields = BTreeMap::new();
        let mut pending: Option<(String, String)> = None;

        for line in lines {
            if let Some((key, mut value)) = pending.take() {
                value.push(' ');
                value.push_str(line.trim());
                if value.contains('}') {
                    fields.insert(key, strip_braces(&value));
                } else {
                    pending = Some((key, value));
                }
                continue;
            }

            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_string();

            if value.starts_with('{') && !value.contains('}') {
                pending = Some((key, value));
            } else {
                fields.insert(key, strip_braces(&value));
            }
        }

        if let Some((key, _)) = pending {
            return Err(BandSelectError::Header(format!(
                "unterminated '{{' in field '{}'",
                key
            )));
        }
        Ok(fields)
    }
}

/// Sample count of a cube, `None` when it does not fit in `usize`.
fn cube_len(lines: usize, samples: usize, bands: usize) -> Option<usize> {
    lines.checked_mul(samples)?.checked_mul(bands)
}

fn strip_braces(value: &str) -> String {
    value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .to_string()
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn optional_usize(fields: &BTreeMap<String, String>, key: &str) -> Result<Option<usize>> {
    fields
        .get(key)
        .map(|v| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| BandSelectError::Header(format!("invalid '{}' value '{}'", key, v)))
        })
        .transpose()
}

fn required_usize(fields: &BTreeMap<String, String>, key: &str) -> Result<usize> {
    optional_usize(fields, key)?
        .ok_or_else(|| BandSelectError::Header(format!("missing required field '{}'", key)))
}

/// In-memory hyperspectral cube (height × width × bands), band-interleaved
/// by pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct HyperCube {
    /// Height.
    pub lines: usize,
    /// Width.
    pub samples: usize,
    pub bands: usize,
    pub data: Vec<f64>,
    pub wavelengths: Option<Vec<f64>>,
    pub band_names: Option<Vec<String>>,
}

impl HyperCube {
    /// Build a cube from BIP-ordered values.
    pub fn new(lines: usize, samples: usize, bands: usize, data: Vec<f64>) -> Result<Self> {
        let expected = cube_len(lines, samples, bands).ok_or(BandSelectError::GeometryOverflow {
            lines,
            samples,
            bands,
        })?;
        if data.len() != expected {
            return Err(BandSelectError::CubeSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            lines,
            samples,
            bands,
            data,
            wavelengths: None,
            band_names: None,
        })
    }

    pub fn with_wavelengths(mut self, wavelengths: Vec<f64>) -> Self {
        self.wavelengths = Some(wavelengths);
        self
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.lines, self.samples, self.bands)
    }

    pub fn n_pixels(&self) -> usize {
        self.lines * self.samples
    }

    pub fn get(&self, line: usize, sample: usize, band: usize) -> f64 {
        self.data[(line * self.samples + sample) * self.bands + band]
    }

    /// Decode a raw payload laid out per `header`.
    pub fn from_bytes(header: &EnviHeader, bytes: &[u8]) -> Result<Self> {
        let expected = header.payload_len()?;
        if bytes.len() < expected {
            return Err(BandSelectError::CubeSize {
                expected,
                actual: bytes.len(),
            });
        }
        let bytes = &bytes[..expected];

        let raw = if header.big_endian {
            header.data_type.decode::<BigEndian>(bytes)
        } else {
            header.data_type.decode::<LittleEndian>(bytes)
        };

        let data = to_bip(
            &raw,
            header.interleave,
            header.lines,
            header.samples,
            header.bands,
        );

        Ok(Self {
            lines: header.lines,
            samples: header.samples,
            bands: header.bands,
            data,
            wavelengths: header.wavelengths.clone(),
            band_names: header.band_names.clone(),
        })
    }

    /// Open a cube from its header, reading the data file at `data_path` or,
    /// when `None`, the sibling file located by [`default_data_path`].
    pub fn open(header_path: impl AsRef<Path>, data_path: Option<&Path>) -> Result<Self> {
        let header_path = header_path.as_ref();
        let header = EnviHeader::from_file(header_path)?;

        let data_path = match data_path {
            Some(p) => p.to_path_buf(),
            None => default_data_path(header_path).ok_or_else(|| {
                BandSelectError::Header(format!(
                    "no data file found next to {}",
                    header_path.display()
                ))
            })?,
        };

        info!(
            "Reading {}×{}×{} cube from {}",
            header.lines,
            header.samples,
            header.bands,
            data_path.display()
        );

        let bytes = fs::read(&data_path)?;
        let expected = header
            .payload_len()?
            .checked_add(header.header_offset)
            .ok_or_else(|| {
                BandSelectError::Header(format!(
                    "header offset {} overflows the file size",
                    header.header_offset
                ))
            })?;
        if bytes.len() != expected {
            return Err(BandSelectError::CubeSize {
                expected,
                actual: bytes.len(),
            });
        }

        Self::from_bytes(&header, &bytes[header.header_offset..])
    }
}

/// Locate the binary file for a header: the header path without its `.hdr`
/// extension, then the same stem with `.img`, `.raw` or `.dat`.
pub fn default_data_path(header_path: &Path) -> Option<PathBuf> {
    let is_hdr = header_path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("hdr"));

    let mut candidates = Vec::new();
    if is_hdr {
        candidates.push(header_path.with_extension(""));
    }
    for ext in ["img", "raw", "dat"] {
        candidates.push(header_path.with_extension(ext));
    }

    candidates.into_iter().find(|p| p.is_file())
}

fn to_bip(
    raw: &[f64],
    interleave: Interleave,
    lines: usize,
    samples: usize,
    bands: usize,
) -> Vec<f64> {
    let mut out = vec![0.0; raw.len()];
    for l in 0..lines {
        for s in 0..samples {
            let pixel = l * samples + s;
            for b in 0..bands {
                let src = match interleave {
                    Interleave::Bsq => b * lines * samples + l * samples + s,
                    Interleave::Bil => l * bands * samples + b * samples + s,
                    Interleave::Bip => pixel * bands + b,
                };
                out[pixel * bands + b] = raw[src];
            }
        }
    }
    out
}
