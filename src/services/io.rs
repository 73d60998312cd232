//! Image I/O operations service
//!
//! Resolves input URIs to decoded pixels and writes composited results as PNG
//! files, keeping all file system access out of the pipeline logic.

use crate::{
    error::{BgRemovalError, Result},
    types::PixelBuffer,
};
use base64::Engine as _;
use image::ImageFormat;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// Reads `content://` URIs, which only the host platform can resolve
pub trait ContentResolver: Send + Sync {
    /// Return the raw bytes behind a content URI
    ///
    /// # Errors
    /// - The URI is unknown or unreadable
    fn open(&self, uri: &str) -> std::io::Result<Vec<u8>>;
}

/// Where an input image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// `file://` URI or plain path
    File(PathBuf),
    /// Inline `data:` URI, already base64-decoded
    Data { mime: Option<String>, bytes: Vec<u8> },
    /// Platform content URI, kept verbatim for the resolver
    Content(String),
}

impl ImageSource {
    /// Classify an input URI
    ///
    /// # Errors
    /// - `InvalidImage` for empty input, unsupported schemes and malformed data URIs
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(BgRemovalError::invalid_image("Image URI is empty"));
        }

        if let Some(rest) = uri.strip_prefix("file://") {
            let path = percent_decode(rest)?;
            if path.is_empty() {
                return Err(BgRemovalError::invalid_image("file:// URI has no path"));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if let Some(rest) = uri.strip_prefix("data:") {
            return Self::parse_data_uri(rest);
        }
        if uri.starts_with("content://") {
            return Ok(Self::Content(uri.to_string()));
        }
        if let Some(scheme) = uri_scheme(uri) {
            return Err(BgRemovalError::invalid_image(format!(
                "Unsupported URI scheme '{}': expected file://, content:// or data:",
                scheme
            )));
        }
        Ok(Self::File(PathBuf::from(uri)))
    }

    fn parse_data_uri(rest: &str) -> Result<Self> {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| BgRemovalError::invalid_image("Malformed data URI: missing ','"))?;
        let Some(mime) = header.strip_suffix(";base64") else {
            return Err(BgRemovalError::invalid_image(
                "Only base64-encoded data URIs are supported",
            ));
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| BgRemovalError::invalid_image(format!("Invalid base64 payload: {}", e)))?;
        Ok(Self::Data {
            mime: (!mime.is_empty()).then(|| mime.to_string()),
            bytes,
        })
    }

    /// Short label for logs; never includes inline payloads
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Data { mime, bytes } => format!(
                "data:{} ({} bytes)",
                mime.as_deref().unwrap_or("application/octet-stream"),
                bytes.len()
            ),
            Self::Content(uri) => uri.clone(),
        }
    }
}

/// `Some(scheme)` if the string starts like `scheme:`. Single letters are
/// treated as Windows drive prefixes rather than schemes.
fn uri_scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn percent_decode(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| {
                    BgRemovalError::invalid_image(format!("Bad percent escape in '{}'", input))
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| BgRemovalError::invalid_image(format!("URI path is not UTF-8: '{}'", input)))
}

/// Escape every byte outside the unreserved set, keeping `/` as the separator
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'/' | b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Service for handling image input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Resolve and decode an input URI into an RGBA pixel buffer
    ///
    /// # Errors
    /// - `InvalidImage` when the URI is unsupported, unreadable or not a decodable image
    pub async fn load_image(
        uri: &str,
        resolver: Option<&dyn ContentResolver>,
    ) -> Result<PixelBuffer> {
        let source = ImageSource::parse(uri)?;
        let bytes = Self::read_source(&source, resolver).await?;
        Self::decode(&bytes, &source.describe())
    }

    /// Fetch the raw encoded bytes behind a source
    ///
    /// # Errors
    /// - `InvalidImage` when the bytes cannot be obtained
    pub async fn read_source(
        source: &ImageSource,
        resolver: Option<&dyn ContentResolver>,
    ) -> Result<Vec<u8>> {
        match source {
            ImageSource::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| BgRemovalError::image_load_error(&path.display().to_string(), &e)),
            ImageSource::Data { bytes, .. } => Ok(bytes.clone()),
            ImageSource::Content(uri) => {
                let resolver = resolver.ok_or_else(|| {
                    BgRemovalError::invalid_image(format!(
                        "No content resolver configured for '{}'",
                        uri
                    ))
                })?;
                resolver
                    .open(uri)
                    .map_err(|e| BgRemovalError::image_load_error(uri, &e))
            },
        }
    }

    /// Decode encoded image bytes, sniffing the format from content
    ///
    /// # Errors
    /// - `InvalidImage` for undecodable data or an image without pixels
    pub fn decode(bytes: &[u8], origin: &str) -> Result<PixelBuffer> {
        if bytes.is_empty() {
            return Err(BgRemovalError::invalid_image(format!(
                "Image '{}' is empty",
                origin
            )));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| BgRemovalError::image_load_error(origin, &e))?
            .to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(BgRemovalError::invalid_image(format!(
                "Image '{}' has no pixels",
                origin
            )));
        }
        tracing::debug!(
            source = origin,
            width = image.width(),
            height = image.height(),
            "Decoded input image"
        );
        Ok(image)
    }

    /// Encode a pixel buffer as PNG
    ///
    /// # Errors
    /// - `PersistFailed` if encoding fails
    pub fn encode_png(image: &PixelBuffer) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| BgRemovalError::persist_failed(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer.into_inner())
    }

    /// Write encoded PNG bytes to `<dir>/<prefix><uuid>.png`
    ///
    /// The bytes go to a temporary file in `dir` that is renamed into place,
    /// so a failed write never leaves a partial output behind.
    ///
    /// # Errors
    /// - `PersistFailed` when the directory or file cannot be written
    pub fn persist_png(png: &[u8], dir: &Path, prefix: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| BgRemovalError::file_io_error("create output directory", dir, &e))?;

        let path = dir.join(Self::output_file_name(prefix));
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| BgRemovalError::file_io_error("create temporary file in", dir, &e))?;
        if let Err(e) = temp.write_all(png).and_then(|()| temp.flush()) {
            return Err(BgRemovalError::file_io_error("write", temp.path(), &e));
        }
        temp.persist(&path)
            .map_err(|e| BgRemovalError::file_io_error("persist", &path, &e.error))?;

        let absolute = std::fs::canonicalize(&path)
            .map_err(|e| BgRemovalError::file_io_error("resolve", &path, &e))?;
        tracing::debug!(path = %absolute.display(), bytes = png.len(), "Persisted output");
        Ok(absolute)
    }

    /// Fresh output name; uniqueness comes from a v4 UUID
    #[must_use]
    pub fn output_file_name(prefix: &str) -> String {
        format!("{}{}.png", prefix, uuid::Uuid::new_v4())
    }

    /// `file://` URI for an absolute path, percent-encoded so that
    /// [`ImageSource::parse`] maps it back to the same path
    #[must_use]
    pub fn file_uri(path: &Path) -> String {
        format!("file://{}", percent_encode(&path.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use base64::Engine as _;
    use image::Rgba;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = PixelBuffer::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        ImageIOService::encode_png(&image).unwrap()
    }

    struct MapResolver(Vec<u8>);

    impl ContentResolver for MapResolver {
        fn open(&self, uri: &str) -> std::io::Result<Vec<u8>> {
            if uri == "content://media/1" {
                Ok(self.0.clone())
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such item"))
            }
        }
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(
            ImageSource::parse("file:///tmp/a%20b.png").unwrap(),
            ImageSource::File(PathBuf::from("/tmp/a b.png"))
        );
        assert_eq!(
            ImageSource::parse("/tmp/plain.png").unwrap(),
            ImageSource::File(PathBuf::from("/tmp/plain.png"))
        );
        assert_eq!(
            ImageSource::parse("C:\\images\\x.png").unwrap(),
            ImageSource::File(PathBuf::from("C:\\images\\x.png"))
        );
        assert!(matches!(
            ImageSource::parse("content://media/1").unwrap(),
            ImageSource::Content(_)
        ));

        let data = ImageSource::parse("data:text/plain;base64,aGk=").unwrap();
        assert_eq!(
            data,
            ImageSource::Data {
                mime: Some("text/plain".to_string()),
                bytes: b"hi".to_vec()
            }
        );
    }

    #[test]
    fn test_parse_rejections() {
        for uri in [
            "",
            "   ",
            "https://example.com/a.png",
            "ftp://host/a.png",
            "data:image/png,rawpixels",
            "data:image/png;base64",
            "data:;base64,@@@",
            "file://",
            "file:///bad%zzescape",
        ] {
            let err = ImageSource::parse(uri).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidImage, "uri: {uri:?}");
        }
    }

    #[tokio::test]
    async fn test_load_from_file_and_data_uri() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.png");
        std::fs::write(&path, png_bytes(4, 3)).unwrap();

        let image = ImageIOService::load_image(&format!("file://{}", path.display()), None)
            .await
            .unwrap();
        assert_eq!(image.dimensions(), (4, 3));

        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(2, 2));
        let image = ImageIOService::load_image(&format!("data:image/png;base64,{encoded}"), None)
            .await
            .unwrap();
        assert_eq!(image.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_content_uri_requires_resolver() {
        let err = ImageIOService::load_image("content://media/1", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidImage);

        let resolver = MapResolver(png_bytes(5, 5));
        let image = ImageIOService::load_image("content://media/1", Some(&resolver))
            .await
            .unwrap();
        assert_eq!(image.dimensions(), (5, 5));

        let err = ImageIOService::load_image("content://media/2", Some(&resolver))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidImage);
    }

    #[tokio::test]
    async fn test_load_failures_are_invalid_image() {
        let dir = TempDir::new().unwrap();
        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not an image at all").unwrap();
        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();

        for path in [garbage, empty, dir.path().join("missing.png")] {
            let err = ImageIOService::load_image(path.to_str().unwrap(), None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidImage);
        }
    }

    #[test]
    fn test_persist_png_names_and_contents() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("nested").join("out");
        let png = png_bytes(3, 2);

        let first = ImageIOService::persist_png(&png, &out_dir, "bg_removed_").unwrap();
        let second = ImageIOService::persist_png(&png, &out_dir, "bg_removed_").unwrap();
        assert_ne!(first, second);
        assert!(first.is_absolute());

        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("bg_removed_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "bg_removed_".len() + 36 + ".png".len());

        let reloaded = image::open(&first).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (3, 2));

        // Only the two outputs remain; no temporary files leak
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 2);
    }

    #[test]
    fn test_persist_into_unwritable_location() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = ImageIOService::persist_png(&png_bytes(1, 1), &blocker.join("sub"), "p_")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistFailed);
    }

    #[test]
    fn test_file_uri_escapes_reserved_bytes() {
        assert_eq!(
            ImageIOService::file_uri(Path::new("/tmp/x.png")),
            "file:///tmp/x.png"
        );
        assert_eq!(
            ImageIOService::file_uri(Path::new("/tmp/100%done/a b#c?.png")),
            "file:///tmp/100%25done/a%20b%23c%3F.png"
        );
        assert_eq!(
            ImageIOService::file_uri(Path::new("/tmp/café.png")),
            "file:///tmp/caf%C3%A9.png"
        );

        for path in ["/tmp/100%done/out.png", "/data/my photos/#1?.png", "/tmp/café.png"] {
            let uri = ImageIOService::file_uri(Path::new(path));
            assert_eq!(ImageSource::parse(&uri).unwrap(), ImageSource::File(path.into()));
        }
    }

    #[tokio::test]
    async fn test_persisted_output_uri_loads_back() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("100%done").join("with space");
        let path = ImageIOService::persist_png(&png_bytes(2, 3), &out_dir, "bg_removed_").unwrap();

        let uri = ImageIOService::file_uri(&path);
        let reloaded = ImageIOService::load_image(&uri, None).await.unwrap();
        assert_eq!(reloaded.dimensions(), (2, 3));
    }
}
