//! XISF monolithic container: preamble, XML header, properties and the
//! attached image block.
//!
//! Layout: `XISF0100`, a little-endian `u32` header length, four reserved
//! bytes, then the UTF-8 XML header. Pixel data lives at absolute offsets
//! given by each image's `location="attachment:<offset>:<length>"`.

use crate::block::{DEFAULT_MAX_HEADER_LEN, XISF_PREAMBLE_LEN, XISF_SIGNATURE_LEN};
use crate::compose::{DecodedImage, OutputMode};
use crate::decode::{DecodeOptions, Decoder};
use crate::descriptor::{
    parse_geometry, parse_location, ChannelLayout, ImageDescriptor, SampleFormat,
};
use crate::endian::ByteOrder;
use crate::error::{Error, Result};
use crate::metadata::{flatten_key, MetadataMap};
use crate::sniff::{Format, XISF_SIGNATURE};
use crate::value::{type_fits_text, MetadataValue, TypeHint};
use crate::xml::{parse_document, Node};

/// Shortest buffer that holds the fixed preamble.
pub const MIN_XISF_LEN: usize = XISF_PREAMBLE_LEN;

/// Prefix of the metadata keys copied from the image element's attributes.
pub const IMAGE_ATTRIBUTE_PREFIX: &str = "Image_";

const IMAGE: &str = "Image";
const PROPERTY: &str = "Property";
const FITS_KEYWORD: &str = "FITSKeyword";

/// Validate the preamble and return the XML header length.
fn header_len(data: &[u8], max_header_len: usize) -> Result<usize> {
    if data.get(..XISF_SIGNATURE_LEN) != Some(&XISF_SIGNATURE[..]) {
        return Err(Error::FormatMismatch {
            expected: Format::Xisf.name(),
        });
    }
    if data.len() < XISF_PREAMBLE_LEN {
        return Err(Error::structural(format!(
            "buffer of {} bytes is shorter than the {XISF_PREAMBLE_LEN}-byte preamble",
            data.len()
        )));
    }
    let len = ByteOrder::Little.read_u32(&data[XISF_SIGNATURE_LEN..]) as usize;
    if len == 0 {
        return Err(Error::structural("XML header length is zero"));
    }
    if len > max_header_len {
        return Err(Error::structural(format!(
            "XML header length {len} exceeds the {max_header_len}-byte limit"
        )));
    }
    let end = XISF_PREAMBLE_LEN.saturating_add(len);
    if end > data.len() {
        return Err(Error::structural(format!(
            "XML header length {len} runs past end of buffer ({} bytes)",
            data.len()
        )));
    }
    Ok(len)
}

/// Extract and parse the XML header into its root element.
pub fn parse_header(data: &[u8], max_header_len: usize) -> Result<Node> {
    let len = header_len(data, max_header_len)?;
    let body = &data[XISF_PREAMBLE_LEN..XISF_PREAMBLE_LEN + len];
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::structural(format!("XML header is not UTF-8: {e}")))?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if !text.starts_with('<') {
        return Err(Error::structural("XML header does not start with '<'"));
    }
    parse_document(text)
}

/// Metadata with the default header ceiling.
pub fn read_metadata(data: &[u8]) -> Result<MetadataMap> {
    read_metadata_with(data, DEFAULT_MAX_HEADER_LEN)
}

/// Metadata from the XML header.
///
/// Buffers shorter than the preamble yield an empty map.
pub fn read_metadata_with(data: &[u8], max_header_len: usize) -> Result<MetadataMap> {
    if data.len() < MIN_XISF_LEN {
        return Ok(MetadataMap::new());
    }
    let root = parse_header(data, max_header_len)?;
    Ok(metadata_from_tree(&root))
}

/// Collect properties, FITS keywords and image attributes in document
/// order.
pub fn metadata_from_tree(root: &Node) -> MetadataMap {
    let mut map = MetadataMap::new();
    let mut seen_image = false;
    for node in root.descendants() {
        match node.name.as_str() {
            PROPERTY => insert_property(&mut map, node),
            FITS_KEYWORD => insert_fits_keyword(&mut map, node),
            IMAGE if !seen_image => {
                seen_image = true;
                for (name, value) in &node.attributes {
                    if name != "location" {
                        map.insert(
                            format!("{IMAGE_ATTRIBUTE_PREFIX}{name}"),
                            MetadataValue::String(value.clone()),
                        );
                    }
                }
            }
            _ => {}
        }
    }
    map
}

fn insert_property(map: &mut MetadataMap, node: &Node) {
    let Some(id) = node.attr("id").filter(|id| !id.trim().is_empty()) else {
        tracing::debug!("skipping Property without id");
        return;
    };
    let hint = node.attr("type").map_or(TypeHint::String, TypeHint::parse);
    let text = node.attr("value").unwrap_or(node.text.as_str());
    let comment = node.attr("comment").map(str::to_string);
    map.insert_with_comment(&flatten_key(id), hint.coerce(text), comment);
}

fn insert_fits_keyword(map: &mut MetadataMap, node: &Node) {
    let Some(name) = node.attr("name").map(str::trim).filter(|n| !n.is_empty()) else {
        tracing::debug!("skipping FITSKeyword without name");
        return;
    };
    let value = type_fits_text(node.attr("value").unwrap_or_default());
    let comment = node.attr("comment").map(|c| c.trim().to_string());
    map.insert_with_comment(name, value, comment);
}

/// Descriptor with the default header ceiling.
pub fn resolve_descriptor(data: &[u8]) -> Result<ImageDescriptor> {
    resolve_descriptor_with(data, DEFAULT_MAX_HEADER_LEN)
}

/// Describe the first image declared in the XML header.
pub fn resolve_descriptor_with(data: &[u8], max_header_len: usize) -> Result<ImageDescriptor> {
    let root = parse_header(data, max_header_len)?;
    descriptor_from_tree(&root, data.len())
}

/// Build the descriptor of the first `Image` element in `root`.
///
/// Later images are ignored.
pub fn descriptor_from_tree(root: &Node, buffer_len: usize) -> Result<ImageDescriptor> {
    let mut images = root.find_all(IMAGE);
    let image = images
        .next()
        .ok_or_else(|| Error::structural("XML header declares no Image element"))?;
    let ignored = images.count();
    if ignored > 0 {
        tracing::debug!(ignored, "using first of several Image elements");
    }

    let required = |name: &'static str| {
        image
            .attr(name)
            .ok_or_else(|| Error::structural(format!("Image element lacks '{name}'")))
    };

    if let Some(codec) = image.attr("compression").filter(|c| !c.trim().is_empty()) {
        return Err(Error::unsupported(format!("compressed image block ({codec})")));
    }

    let (width, height, channels) = parse_geometry(required("geometry")?)?;
    let sample_format = SampleFormat::from_xisf_name(required("sampleFormat")?)?;
    let (payload_offset, payload_length) = parse_location(required("location")?)?;

    let byte_order = match image.attr("byteOrder").map(str::trim) {
        None | Some("little") => ByteOrder::Little,
        Some("big") => ByteOrder::Big,
        Some(other) => return Err(Error::structural(format!("invalid byteOrder '{other}'"))),
    };
    let layout = match image.attr("pixelStorage").map(str::trim) {
        None | Some("Planar") => ChannelLayout::Planar,
        Some("Normal") => ChannelLayout::Interleaved,
        Some(other) => return Err(Error::unsupported(format!("pixel storage '{other}'"))),
    };

    let descriptor = ImageDescriptor {
        width,
        height,
        channels,
        sample_format,
        payload_offset,
        payload_length,
        byte_order,
        layout,
        calibration: None,
        blank: None,
    };
    let expected = descriptor.check_geometry(buffer_len as u64)?;
    descriptor.validate(buffer_len as u64)?;

    if payload_length < expected {
        tracing::warn!(expected, declared = payload_length, "XISF image block is short");
    }
    Ok(descriptor)
}

/// Decode the XISF image in `data` with default options.
pub fn decode_image(data: &[u8], mode: OutputMode) -> Result<DecodedImage> {
    let options = DecodeOptions {
        mode,
        ..DecodeOptions::default()
    };
    Decoder::new(options).decode_as(data, Format::Xisf)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a monolithic file: preamble, XML header, then `payload` at the
    /// offset the header's `{OFFSET}` placeholder is replaced with.
    fn build(xml_template: &str, payload: &[u8]) -> Vec<u8> {
        // Two passes so the header length accounts for the offset digits.
        let mut xml = xml_template.replace("{OFFSET}", "0");
        for _ in 0..2 {
            let offset = XISF_PREAMBLE_LEN + xml.len();
            xml = xml_template.replace("{OFFSET}", &offset.to_string());
        }
        let mut out = Vec::new();
        out.extend_from_slice(XISF_SIGNATURE);
        out.extend_from_slice(&(xml.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(xml.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn gray_u8() -> Vec<u8> {
        build(
            r#"<?xml version="1.0"?><xisf version="1.0" xmlns="http://www.pixinsight.com/xisf"><Image geometry="2:2:1" sampleFormat="UInt8" colorSpace="Gray" location="attachment:{OFFSET}:4"><Property id="PCL:Observer" type="String">Jane</Property></Image><Metadata><Property id="XISF:CreationTime" type="TimePoint" value="2024-03-01T22:15:00Z"/><Property id="Instrument:ExposureTime" type="Float32" value="120.5" comment="seconds"/></Metadata></xisf>"#,
            &[0, 85, 170, 255],
        )
    }

    #[test]
    fn metadata_keys_and_types() {
        let map = read_metadata(&gray_u8()).unwrap();
        assert_eq!(map.get("PCL_Observer"), Some(&MetadataValue::String("Jane".into())));
        assert!(matches!(
            map.get("XISF_CreationTime"),
            Some(MetadataValue::Timestamp(_))
        ));
        assert_eq!(
            map.get("Instrument_ExposureTime"),
            Some(&MetadataValue::Float64(120.5))
        );
        assert_eq!(map.comment("Instrument_ExposureTime"), Some("seconds"));
        assert_eq!(map.get("Image_geometry"), Some(&MetadataValue::String("2:2:1".into())));
        assert!(!map.contains_key("Image_location"));
    }

    #[test]
    fn fits_keywords_are_typed() {
        let buf = build(
            r#"<xisf><Image geometry="1:1:1" sampleFormat="UInt8" location="attachment:{OFFSET}:1"><FITSKeyword name="EXPTIME" value="300." comment="Exposure"/><FITSKeyword name="OBJECT" value="'NGC 7000'" comment=""/><FITSKeyword name="HISTORY" value="" comment="first"/><FITSKeyword name="HISTORY" value="" comment="second"/></Image></xisf>"#,
            &[7],
        );
        let map = read_metadata(&buf).unwrap();
        assert_eq!(map.get("EXPTIME"), Some(&MetadataValue::Float64(300.0)));
        assert_eq!(map.comment("EXPTIME"), Some("Exposure"));
        assert_eq!(map.get("OBJECT"), Some(&MetadataValue::String("NGC 7000".into())));
        assert_eq!(map.comment("HISTORY"), Some("second"));
    }

    #[test]
    fn property_falls_back_to_string() {
        let buf = build(
            r#"<xisf><Property id="A" type="Int8" value="300"/><Property id="B" type="F32Vector" value="1 2 3"/><Property id="C" type="Boolean" value="TRUE"/><Property id="D"/><Image geometry="1:1:1" sampleFormat="UInt8" location="attachment:{OFFSET}:1"/></xisf>"#,
            &[0],
        );
        let map = read_metadata(&buf).unwrap();
        assert_eq!(map.get("A"), Some(&MetadataValue::String("300".into())));
        assert_eq!(map.get("B"), Some(&MetadataValue::String("1 2 3".into())));
        assert_eq!(map.get("C"), Some(&MetadataValue::Bool(true)));
        assert_eq!(map.get("D"), Some(&MetadataValue::String(String::new())));
    }

    #[test]
    fn descriptor_from_first_image() {
        let buf = gray_u8();
        let d = resolve_descriptor(&buf).unwrap();
        assert_eq!((d.width, d.height, d.channels), (2, 2, 1));
        assert_eq!(d.sample_format, SampleFormat::UInt8);
        assert_eq!(d.payload_offset as usize, buf.len() - 4);
        assert_eq!(d.payload_length, 4);
        assert_eq!(d.byte_order, ByteOrder::Little);
        assert_eq!(d.layout, ChannelLayout::Planar);
    }

    #[test]
    fn second_image_is_ignored() {
        let buf = build(
            r#"<xisf><Image geometry="2:1:1" sampleFormat="UInt16" location="attachment:{OFFSET}:4"/><Image geometry="9:9:3" sampleFormat="Float64" location="attachment:0:1"/></xisf>"#,
            &[0; 4],
        );
        let d = resolve_descriptor(&buf).unwrap();
        assert_eq!((d.width, d.height, d.channels), (2, 1, 1));
        assert_eq!(d.sample_format, SampleFormat::UInt16);
    }

    #[test]
    fn big_endian_and_interleaved() {
        let buf = build(
            r#"<xisf><Image geometry="1:1:3" sampleFormat="UInt16" byteOrder="big" pixelStorage="Normal" location="attachment:{OFFSET}:6"/></xisf>"#,
            &[0; 6],
        );
        let d = resolve_descriptor(&buf).unwrap();
        assert_eq!(d.byte_order, ByteOrder::Big);
        assert_eq!(d.layout, ChannelLayout::Interleaved);
    }

    #[test]
    fn compression_unsupported() {
        let buf = build(
            r#"<xisf><Image geometry="1:1:1" sampleFormat="UInt8" compression="zlib:1" location="attachment:{OFFSET}:1"/></xisf>"#,
            &[0],
        );
        assert!(matches!(
            resolve_descriptor(&buf),
            Err(Error::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn inline_location_unsupported() {
        let buf = build(
            r#"<xisf><Image geometry="1:1:1" sampleFormat="UInt8" location="inline:base64"/></xisf>"#,
            &[],
        );
        assert!(matches!(
            resolve_descriptor(&buf),
            Err(Error::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn missing_sample_format_is_structural() {
        let buf = build(
            r#"<xisf><Image geometry="1:1:1" location="attachment:{OFFSET}:1"/></xisf>"#,
            &[0],
        );
        let err = resolve_descriptor(&buf).unwrap_err();
        assert!(err.to_string().contains("sampleFormat"));
    }

    #[test]
    fn no_image_is_structural() {
        let buf = build(r#"<xisf><Metadata/></xisf>"#, &[]);
        assert!(matches!(resolve_descriptor(&buf), Err(Error::Structural(_))));
        // Metadata extraction does not need an image.
        assert!(read_metadata(&buf).unwrap().is_empty());
    }

    #[test]
    fn attachment_past_end_is_structural() {
        let buf = build(
            r#"<xisf><Image geometry="4:4:1" sampleFormat="UInt8" location="attachment:{OFFSET}:16"/></xisf>"#,
            &[0; 8],
        );
        assert!(matches!(resolve_descriptor(&buf), Err(Error::Structural(_))));
    }

    #[test]
    fn header_length_past_buffer() {
        let mut buf = Vec::from(&XISF_SIGNATURE[..]);
        buf.extend_from_slice(&1000u32.to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(b"<xisf/>");
        assert!(matches!(read_metadata(&buf), Err(Error::Structural(_))));
    }

    #[test]
    fn header_length_zero_or_over_limit() {
        let mut buf = Vec::from(&XISF_SIGNATURE[..]);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(b"<xisf/>");
        assert!(matches!(read_metadata(&buf), Err(Error::Structural(_))));

        let buf = build("<xisf/>", &[]);
        assert!(read_metadata_with(&buf, 8).is_ok());
        assert!(matches!(read_metadata_with(&buf, 6), Err(Error::Structural(_))));
    }

    #[test]
    fn body_must_look_like_xml() {
        let buf = build("not xml at all", &[]);
        assert!(matches!(read_metadata(&buf), Err(Error::Structural(_))));
        let buf = build("<xisf><Image></xisf>", &[]);
        assert!(matches!(read_metadata(&buf), Err(Error::Structural(_))));
    }

    #[test]
    fn nul_padding_is_ignored() {
        let buf = build("<xisf><Property id=\"K\" type=\"UInt16\" value=\"42\"/></xisf>\0\0\0\0", &[]);
        let map = read_metadata(&buf).unwrap();
        assert_eq!(map.get("K"), Some(&MetadataValue::UInt64(42)));
    }

    #[test]
    fn short_buffer_is_empty() {
        assert!(read_metadata(b"XISF0100").unwrap().is_empty());
    }

    #[test]
    fn wrong_signature_is_mismatch() {
        let buf = [b'A'; 64];
        assert!(matches!(read_metadata(&buf), Err(Error::FormatMismatch { .. })));
    }
}
