/*!
 * Common test utilities for the yaetwai test suite
 */

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Routes library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Wraps body markup in a minimal XHTML page
pub fn xhtml_page(title: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
         <head><title>{}</title><link rel=\"stylesheet\" href=\"../Styles/style.css\"/></head>\n\
         <body>\n{}\n</body>\n</html>\n",
        title, body
    )
}

/// Builds an EPUB with the given pages (file name, body markup).
///
/// Pages are listed in the spine in reverse archive order so reading order
/// differs from archive order.
pub fn create_test_epub(dir: &Path, filename: &str, pages: &[(&str, &str)]) -> Result<PathBuf> {
    let path = dir.join(filename);
    let mut zip = ZipWriter::new(File::create(&path)?);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(
        br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    )?;

    let mut manifest = String::new();
    let mut spine = String::new();
    for (i, (name, _)) in pages.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"p{}\" href=\"Text/{}\" media-type=\"application/xhtml+xml\"/>\n",
            i, name
        ));
    }
    for i in (0..pages.len()).rev() {
        spine.push_str(&format!("    <itemref idref=\"p{}\"/>\n", i));
    }
    let opf = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\">\n\
         <metadata><dc:title xmlns:dc=\"http://purl.org/dc/elements/1.1/\">Test</dc:title></metadata>\n\
         <manifest>\n{}    <item id=\"css\" href=\"Styles/style.css\" media-type=\"text/css\"/>\n\
             <item id=\"img\" href=\"Images/cover.png\" media-type=\"image/png\"/>\n</manifest>\n\
         <spine>\n{}</spine>\n</package>\n",
        manifest, spine
    );
    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(opf.as_bytes())?;

    for (name, body) in pages {
        zip.start_file(format!("OEBPS/Text/{}", name), deflated)?;
        zip.write_all(xhtml_page(name, body).as_bytes())?;
    }

    zip.start_file("OEBPS/Styles/style.css", deflated)?;
    zip.write_all(b"p { text-indent: 2em; }\n")?;
    zip.start_file("OEBPS/Images/cover.png", stored)?;
    zip.write_all(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3, 4])?;

    zip.finish()?;
    Ok(path)
}

/// Reads every entry of a zip archive as (name, bytes), in archive order
pub fn read_entries(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((entry.name().to_string(), data));
    }
    Ok(entries)
}

/// Reads one entry of a zip archive as UTF-8
pub fn read_entry(path: &Path, name: &str) -> Result<String> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entry = archive.by_name(name)?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}
