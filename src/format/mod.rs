//! Output container and its metadata.
//!
//! - [`tiff`]: the container writer contract and the TIFF/BigTIFF writer
//! - [`svs`]: Aperio-style description of flat pyramids
//! - [`ome`]: OME-XML description of sub-directory pyramids

pub mod ome;
pub mod svs;
pub mod tiff;

pub use ome::{ChannelInfo, OmeDescription, TiffDataBlock};
pub use svs::{SvsDescription, SvsMetadata};
pub use tiff::{ContainerWriter, TiffDirectory, TiffFileWriter};

/// Decimal text of a metadata value: at most six fractional digits, no
/// trailing zeros.
pub(crate) fn format_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
