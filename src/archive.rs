//! Manages the zip component part of the epub doc.
//!
//! Provides easy methods to navigate through the epub parts and to get
//! the content as string.

use std::fs::File;
use std::io::BufReader;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Zip Error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Entry is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
    #[error("File not found in the archive: {0}")]
    FileNotFound(String),
}

/// Epub archive struct. Here it's stored the file path and the list of
/// files in the zip archive.
#[derive(Clone, Debug)]
pub struct EpubArchive<R: Read + Seek> {
    zip: zip::ZipArchive<R>,
    pub path: PathBuf,
    pub files: Vec<String>,
}

impl EpubArchive<BufReader<File>> {
    /// Opens the epub file in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zip is broken or if the file doesn't
    /// exists.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut archive = Self::from_reader(BufReader::new(file))?;
        archive.path = path.to_path_buf();
        Ok(archive)
    }
}

impl<R: Read + Seek> EpubArchive<R> {
    /// Opens the epub contained in `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zip is broken.
    pub fn from_reader(reader: R) -> Result<Self, ArchiveError> {
        let zip = zip::ZipArchive::new(reader)?;
        let files: Vec<String> = zip.file_names().map(String::from).collect();

        Ok(Self {
            zip,
            path: PathBuf::new(),
            files,
        })
    }

    /// Returns the content of the entry `name` as `Vec<u8>`.
    ///
    /// If the name isn't stored in the archive as given, it's tried
    /// again percent-decoded, since some epubs reference their entries
    /// encoded while storing them plain.
    ///
    /// # Errors
    ///
    /// Returns an error if the name doesn't exists in the zip archive.
    pub fn get_entry<P: AsRef<Path>>(&mut self, name: P) -> Result<Vec<u8>, ArchiveError> {
        let path = name.as_ref();
        let name = path
            .to_str()
            .ok_or_else(|| ArchiveError::InvalidPath(path.to_path_buf()))?;

        match self.zip.by_name(name) {
            Ok(mut zipfile) => {
                let mut entry = vec![];
                zipfile.read_to_end(&mut entry)?;
                return Ok(entry);
            }
            Err(zip::result::ZipError::FileNotFound) => {}
            Err(error) => return Err(error.into()),
        }

        let decoded = percent_decode_str(name).decode_utf8_lossy();
        if decoded != name {
            if let Ok(mut zipfile) = self.zip.by_name(&decoded) {
                let mut entry = vec![];
                zipfile.read_to_end(&mut entry)?;
                return Ok(entry);
            }
        }

        Err(ArchiveError::FileNotFound(name.to_string()))
    }

    /// Returns the content of the entry `name` as `String`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name doesn't exists in the zip archive
    /// or if the content isn't valid UTF-8.
    pub fn get_entry_as_str<P: AsRef<Path>>(&mut self, name: P) -> Result<String, ArchiveError> {
        let content = self.get_entry(name)?;
        Ok(String::from_utf8(content)?)
    }

    /// Returns the content of container file "META-INF/container.xml".
    ///
    /// # Errors
    ///
    /// Returns an error if the epub doesn't have the container file.
    pub fn get_container_file(&mut self) -> Result<Vec<u8>, ArchiveError> {
        self.get_entry("META-INF/container.xml")
    }
}
