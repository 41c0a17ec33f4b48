use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Leading bytes of every zip archive
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Extension of the documents this tool reads and writes
pub const EPUB_EXTENSION: &str = "epub";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: `{stem}.{lang}.epub` next to the input, or in output_dir
    pub fn generate_output_path<P: AsRef<Path>>(
        input_file: P,
        output_dir: Option<&Path>,
        target_language: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        let file_name = format!("{}.{}.{}", stem, target_language, EPUB_EXTENSION);

        match output_dir {
            Some(dir) => dir.join(file_name),
            None => input_file.with_file_name(file_name),
        }
    }

    /// Whether `path` looks like a file this tool produced for `target_language`
    pub fn is_translated_output<P: AsRef<Path>>(path: P, target_language: &str) -> bool {
        path.as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().ends_with(&format!(".{}", target_language)))
            .unwrap_or(false)
    }

    /// Find files with a specific extension under a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let extension = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let matches = path
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false);
            if path.is_file() && matches {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// EPUB files under `dir` that are not themselves translations into `target_language`
    pub fn find_epubs<P: AsRef<Path>>(dir: P, target_language: &str) -> Result<Vec<PathBuf>> {
        Ok(Self::find_files(dir, EPUB_EXTENSION)?
            .into_iter()
            .filter(|path| !Self::is_translated_output(path, target_language))
            .collect())
    }

    /// Detect whether a path is an EPUB, a directory, or something else
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }
        if path.is_dir() {
            return Ok(FileType::Directory);
        }

        let mut magic = [0u8; 4];
        let mut file = fs::File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
        let read = file.read(&mut magic).with_context(|| format!("Failed to read file: {:?}", path))?;
        if read < magic.len() || magic != ZIP_MAGIC {
            return Ok(FileType::Unknown);
        }

        let is_epub_extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(EPUB_EXTENSION))
            .unwrap_or(false);
        if is_epub_extension {
            Ok(FileType::Epub)
        } else {
            Ok(FileType::Archive)
        }
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// EPUB book
    Epub,
    /// Zip archive without the EPUB extension
    Archive,
    /// Directory to scan for books
    Directory,
    /// Unknown file type
    Unknown,
}
