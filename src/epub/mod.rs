//! EPUB encoder. Writes a post as a one-section EPUB 2 or EPUB 3 archive (mimetype, container, OPF, nav/NCX, section).

use crate::encode::{validate_post, BookEncoder, EncodeError};
use crate::formats::html_escape_attr;
use crate::model::Post;
use std::io::{Cursor, Seek, Write};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";
const SECTION_FILE: &str = "main.xhtml";

/// EPUB format version.
///
/// Default is EPUB 3 (OPF 3.0, nav.xhtml, HTML5 section). Use `Epub2` for legacy readers (OPF 2.0, NCX, XHTML 1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpubVersion {
    #[default]
    Epub3,
    Epub2,
}

impl EpubVersion {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim() {
            "3" | "epub3" => Ok(EpubVersion::Epub3),
            "2" | "epub2" => Ok(EpubVersion::Epub2),
            _ => Err(format!("Invalid epub_version: '{}'. Use 2 or 3.", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EpubEncoder {
    version: EpubVersion,
}

impl EpubEncoder {
    pub fn new(version: EpubVersion) -> Self {
        Self { version }
    }

    fn write_archive<W: Write + Seek>(&self, post: &Post, out: W) -> Result<(), zip::result::ZipError> {
        let mut zip = ZipWriter::new(out);

        let options_stored = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o644);
        let options_deflate = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        // Mimetype first, uncompressed (required by EPUB)
        zip.start_file("mimetype", options_stored)?;
        zip.write_all(MIMETYPE)?;

        zip.start_file("META-INF/container.xml", options_deflate)?;
        zip.write_all(CONTAINER_XML)?;

        let opf = match self.version {
            EpubVersion::Epub3 => opf3(post),
            EpubVersion::Epub2 => opf2(post),
        };
        zip.start_file(format!("{}content.opf", OEBPS_PREFIX), options_deflate)?;
        zip.write_all(opf.as_bytes())?;

        match self.version {
            EpubVersion::Epub3 => {
                zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options_deflate)?;
                zip.write_all(nav_xhtml(post).as_bytes())?;
            }
            EpubVersion::Epub2 => {
                zip.start_file(format!("{}toc.ncx", OEBPS_PREFIX), options_deflate)?;
                zip.write_all(ncx(post).as_bytes())?;
            }
        }

        zip.start_file(format!("{}{}", OEBPS_PREFIX, SECTION_FILE), options_deflate)?;
        zip.write_all(section(post, self.version).as_bytes())?;

        zip.finish()?;
        Ok(())
    }
}

impl BookEncoder for EpubEncoder {
    fn format(&self) -> &str {
        "epub"
    }

    fn encode(&self, post: &Post, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        validate_post(post)?;
        let start = out.len() as u64;
        let mut cursor = Cursor::new(out);
        cursor.set_position(start);
        self.write_archive(post, cursor)
            .map_err(|e| EncodeError::Zip {
                title: post.title.clone(),
                source: e,
            })
    }
}

fn identifier(post: &Post) -> String {
    let slug: String = post
        .title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("urn:reddit-exporter:{}", slug.trim_matches('-'))
}

fn modified_now() -> String {
    OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

fn opf3(post: &Post) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="main" href="{section}" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="main"/>
  </spine>
</package>
"#,
        id = xml_escape(&identifier(post)),
        title = xml_escape(&post.title),
        modified = modified_now(),
        section = SECTION_FILE,
    )
}

fn opf2(post: &Post) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="main" href="{section}" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="main"/>
  </spine>
</package>
"#,
        id = xml_escape(&identifier(post)),
        title = xml_escape(&post.title),
        section = SECTION_FILE,
    )
}

fn nav_xhtml(post: &Post) -> String {
    format!(
        r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
      <li><a href="{}">{}</a></li>
    </ol>
  </nav>
</body>
</html>
"#,
        SECTION_FILE,
        html_escape_attr(&post.title)
    )
}

fn ncx(post: &Post) -> String {
    let title = xml_escape(&post.title);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
    <navPoint id="navpoint-1" playOrder="1">
      <navLabel><text>{title}</text></navLabel>
      <content src="{section}"/>
    </navPoint>
  </navMap>
</ncx>
"#,
        uid = xml_escape(&identifier(post)),
        title = title,
        section = SECTION_FILE,
    )
}

fn section(post: &Post, version: EpubVersion) -> String {
    let doctype = match version {
        EpubVersion::Epub3 => "<!DOCTYPE html>",
        EpubVersion::Epub2 => {
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#
        }
    };
    let title = html_escape_attr(&post.title);
    format!(
        r#"{doctype}
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#,
        doctype = doctype,
        title = title,
        body = post.html
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
