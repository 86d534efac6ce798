//! Init image acquisition and normalization.
//!
//! SDXL's image-to-image mode takes the starting image as a base64 PNG. This
//! module turns a path, URL, or decoded image into that string.

use crate::error::{Result, SdxlError};
use base64::Engine;
use image::{imageops::FilterType, DynamicImage};
use std::path::{Path, PathBuf};

/// Side length, in pixels, init images are resized to.
pub const DEFAULT_INIT_IMAGE_SIZE: u32 = 512;

/// Where an init image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Local file.
    Path(PathBuf),
    /// Remote image fetched over HTTP(S).
    Url(String),
    /// Already decoded image.
    Decoded(DynamicImage),
}

impl ImageSource {
    /// Interprets a user-supplied string as a URL or a local path.
    ///
    /// `http://` and `https://` become [`ImageSource::Url`], `file://` and
    /// plain strings become [`ImageSource::Path`]. Any other scheme is
    /// rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SdxlError::UnsupportedInput("empty image reference".into()));
        }

        // Only references with an explicit `scheme://` are URLs; this keeps
        // relative and drive-letter paths out of the URL parser.
        if !input.contains("://") {
            return Ok(Self::Path(PathBuf::from(input)));
        }

        let url = reqwest::Url::parse(input)
            .map_err(|e| SdxlError::UnsupportedInput(format!("invalid URL {input}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Url(url.into())),
            "file" => url.to_file_path().map(Self::Path).map_err(|()| {
                SdxlError::UnsupportedInput(format!("not a local file URL: {input}"))
            }),
            other => Err(SdxlError::UnsupportedInput(format!(
                "unsupported scheme '{other}' in {input}"
            ))),
        }
    }

    /// Encodes a local image as base64.
    ///
    /// A path is encoded byte-for-byte as stored on disk; a decoded image is
    /// encoded as PNG first. Anything else must be resolved with
    /// [`prepare_init_image`] instead.
    pub fn to_base64(&self) -> Result<String> {
        match self {
            Self::Path(path) => {
                let data = read_image_file(path)?;
                Ok(base64::engine::general_purpose::STANDARD.encode(data))
            }
            Self::Decoded(img) => encode_png_base64(img),
            Self::Url(url) => Err(SdxlError::UnsupportedInput(format!(
                "expected a local path or decoded image, got URL {url}"
            ))),
        }
    }

    /// Resolves the source to a decoded image, fetching it if remote.
    pub async fn load(self, client: &reqwest::Client) -> Result<DynamicImage> {
        match self {
            Self::Path(path) => {
                let data = read_image_file(&path)?;
                image::load_from_memory(&data).map_err(SdxlError::InvalidImage)
            }
            Self::Url(url) => fetch_image(client, &url).await,
            Self::Decoded(img) => Ok(img),
        }
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(img: DynamicImage) -> Self {
        Self::Decoded(img)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

fn read_image_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SdxlError::ImageNotFound(path.to_path_buf()),
        _ => SdxlError::Io(e),
    })
}

/// Downloads and decodes an image.
pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<DynamicImage> {
    tracing::debug!(url = %url, "fetching image");

    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SdxlError::Api {
            status: status.as_u16(),
            message: format!("failed to download image from {url}"),
        });
    }

    let data = response.bytes().await?;
    image::load_from_memory(&data).map_err(SdxlError::InvalidImage)
}

/// Resizes an image to `size × size`, ignoring aspect ratio.
pub fn normalize(img: &DynamicImage, size: u32) -> DynamicImage {
    img.resize_exact(size, size, FilterType::Lanczos3)
}

/// Encodes an image as PNG and returns the base64 string.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(SdxlError::InvalidImage)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(buf.into_inner()))
}

/// Loads, normalizes, and encodes an init image for an image-to-image request.
pub async fn prepare_init_image(
    client: &reqwest::Client,
    source: ImageSource,
    size: u32,
) -> Result<String> {
    let img = source.load(client).await?;
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        size,
        "normalizing init image"
    );
    encode_png_base64(&normalize(&img, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn decode_b64(s: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD.decode(s).unwrap()
    }

    #[test]
    fn test_parse_classifies_input() {
        assert!(matches!(
            ImageSource::parse("https://example.com/dress.png").unwrap(),
            ImageSource::Url(_)
        ));
        assert!(matches!(
            ImageSource::parse("HTTP://example.com/dress.png").unwrap(),
            ImageSource::Url(_)
        ));

        match ImageSource::parse("images/dress.png").unwrap() {
            ImageSource::Path(p) => assert_eq!(p, PathBuf::from("images/dress.png")),
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_file_urls() {
        let cases = [
            ("file:///tmp/dress.png", "/tmp/dress.png"),
            ("file://localhost/tmp/a.png", "/tmp/a.png"),
            ("FILE:///tmp/my%20dress.png", "/tmp/my dress.png"),
        ];
        for (input, expected) in cases {
            match ImageSource::parse(input).unwrap() {
                ImageSource::Path(p) => assert_eq!(p, PathBuf::from(expected), "{input}"),
                other => panic!("expected path for {input}, got {other:?}"),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_rejects_remote_file_url() {
        let err = ImageSource::parse("file://fileserver/share/a.png").unwrap_err();
        assert!(matches!(err, SdxlError::UnsupportedInput(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        let err = ImageSource::parse("ftp://example.com/dress.png").unwrap_err();
        assert!(matches!(err, SdxlError::UnsupportedInput(_)));

        let err = ImageSource::parse("http://").unwrap_err();
        assert!(matches!(err, SdxlError::UnsupportedInput(_)));

        let err = ImageSource::parse("   ").unwrap_err();
        assert!(matches!(err, SdxlError::UnsupportedInput(_)));
    }

    #[test]
    fn test_path_to_base64_preserves_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("seed.png");
        let bytes = png_bytes(3, 2);
        std::fs::write(&file, &bytes).unwrap();

        let encoded = ImageSource::from(file).to_base64().unwrap();
        assert_eq!(decode_b64(&encoded), bytes);
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");

        let err = ImageSource::from(missing.clone()).to_base64().unwrap_err();
        match err {
            SdxlError::ImageNotFound(p) => assert_eq!(p, missing),
            other => panic!("expected ImageNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_url_to_base64_is_unsupported() {
        let source = ImageSource::Url("https://example.com/a.png".into());
        assert!(matches!(
            source.to_base64(),
            Err(SdxlError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn test_decoded_to_base64_is_png() {
        let encoded = ImageSource::from(DynamicImage::new_rgb8(4, 4))
            .to_base64()
            .unwrap();
        let bytes = decode_b64(&encoded);

        assert!(bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (4, 4));
    }

    #[test]
    fn test_normalize_forces_square() {
        let img = normalize(&DynamicImage::new_rgb8(300, 120), DEFAULT_INIT_IMAGE_SIZE);
        assert_eq!((img.width(), img.height()), (512, 512));
    }

    #[tokio::test]
    async fn test_prepare_init_image_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("seed.png");
        std::fs::write(&file, png_bytes(40, 20)).unwrap();

        let client = reqwest::Client::new();
        let encoded = prepare_init_image(&client, ImageSource::from(file), 64)
            .await
            .unwrap();

        let img = image::load_from_memory(&decode_b64(&encoded)).unwrap();
        assert_eq!((img.width(), img.height()), (64, 64));
    }

    #[tokio::test]
    async fn test_prepare_init_image_missing_path() {
        let client = reqwest::Client::new();
        let err = prepare_init_image(
            &client,
            ImageSource::Path("/definitely/not/here.png".into()),
            64,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SdxlError::ImageNotFound(_)));
    }

    #[tokio::test]
    async fn test_prepare_init_image_rejects_non_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.png");
        std::fs::write(&file, "this is not an image at all").unwrap();

        let client = reqwest::Client::new();
        let err = prepare_init_image(&client, ImageSource::from(file), 64)
            .await
            .unwrap_err();

        assert!(matches!(err, SdxlError::InvalidImage(_)));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn test_fetch_image_rejects_non_image_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_image(&client, &format!("{}/dress.png", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, SdxlError::InvalidImage(_)));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn test_fetch_image_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dress.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(5, 7)))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let img = fetch_image(&client, &format!("{}/dress.png", server.uri()))
            .await
            .unwrap();
        assert_eq!((img.width(), img.height()), (5, 7));
    }

    #[tokio::test]
    async fn test_fetch_image_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch_image(&client, &format!("{}/gone.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, SdxlError::Api { status: 404, .. }));
    }
}
