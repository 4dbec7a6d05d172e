//! Artifact bundles: the six named payloads uploaded as one Swarm collection.
//!
//! The image arrives base64-encoded from the generation step and is decoded
//! slice by slice; everything else is stored as UTF-8 text with a fixed
//! content type.

use crate::{Error, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Name of the payload served when the collection root is requested
pub const INDEX_DOCUMENT: &str = "nft";

/// Payload names and content types, in upload order
pub const BUNDLE_LAYOUT: [(&str, &str); 6] = [
    ("nft", "image/png"),
    ("desc", "text/plain"),
    ("poem", "text/html"),
    ("colors", "text/html"),
    ("metadata", "application/json"),
    ("gen", "text/plain"),
];

/// Base64 characters decoded per slice (171 quads, 513 bytes)
pub const DECODE_SLICE_CHARS: usize = 684;

// Accepts input with or without trailing `=` padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode standard-alphabet base64, ignoring ASCII whitespace.
///
/// Decoding happens in fixed slices of `DECODE_SLICE_CHARS` characters; the
/// result is identical to a single-pass decode.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    let compact: Vec<u8> = input.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let mut out = Vec::with_capacity(compact.len() / 4 * 3 + 3);
    for (i, slice) in compact.chunks(DECODE_SLICE_CHARS).enumerate() {
        LENIENT.decode_vec(slice, &mut out).map_err(|e| {
            Error::Decode(format!("{} (slice starting at char {})", e, i * DECODE_SLICE_CHARS))
        })?;
    }
    Ok(out)
}

/// Encode bytes as padded standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Everything one generation run produced for a single item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// PNG image, base64-encoded
    #[serde(alias = "imageBase64", alias = "image")]
    pub image_base64: String,
    /// Plain-text description
    pub description: String,
    /// Poem as an HTML snippet
    pub poem: String,
    /// Color palette as an HTML snippet
    pub colors: String,
    /// JSON-encoded token metadata
    pub metadata: String,
    /// Plain-text generation log
    #[serde(alias = "gen")]
    pub generated: String,
}

/// One named file inside a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Payload {
    pub fn new(name: &str, bytes: impl Into<Vec<u8>>, content_type: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: bytes.into(),
            content_type: content_type.to_string(),
        }
    }
}

/// The fixed six-file collection handed to the persistence client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBundle {
    payloads: Vec<Payload>,
}

impl ArtifactBundle {
    /// Assemble a bundle from already decoded image bytes and the text
    /// fields of `output`. `output.image_base64` is not looked at.
    pub fn assemble(image: Vec<u8>, output: &GenerationOutput) -> Self {
        let contents: [Vec<u8>; 6] = [
            image,
            output.description.as_bytes().to_vec(),
            output.poem.as_bytes().to_vec(),
            output.colors.as_bytes().to_vec(),
            output.metadata.as_bytes().to_vec(),
            output.generated.as_bytes().to_vec(),
        ];
        let payloads = BUNDLE_LAYOUT
            .iter()
            .zip(contents)
            .map(|((name, content_type), bytes)| Payload::new(name, bytes, content_type))
            .collect();
        Self { payloads }
    }

    /// Decode the image and assemble the bundle in one step
    pub fn from_output(output: &GenerationOutput) -> Result<Self> {
        let image = decode_base64(&output.image_base64)?;
        Ok(Self::assemble(image, output))
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    pub fn get(&self, name: &str) -> Option<&Payload> {
        self.payloads.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Sum of all payload sizes in bytes
    pub fn total_bytes(&self) -> usize {
        self.payloads.iter().map(|p| p.bytes.len()).sum()
    }
}
