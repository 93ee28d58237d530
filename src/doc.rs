//! Manages the epub doc.
//!
//! Provides easy methods to navigate through the epub content,
//! resources, spine and table of contents.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use crate::archive::EpubArchive;
use crate::toc::{self, TableOfContents, TocDiagnostic};
use crate::xmlutils::{self, XMLElement, XMLError};

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Archive Error: {0}")]
    ArchiveError(#[from] crate::archive::ArchiveError),
    #[error("XML Error: {0}")]
    XmlError(#[from] XMLError),
    #[error("I/O Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid EPub")]
    InvalidEpub,
}

/// A content file declared in the epub manifest.
///
/// The href identifies the resource uniquely within the book and is
/// kept exactly as written in the package document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub href: String,
    pub media_type: String,
}

/// Struct to control the epub document
#[derive(Clone, Debug)]
pub struct EpubDoc<R: Read + Seek> {
    /// the zip archive
    archive: EpubArchive<R>,

    /// The current chapter, is an spine index
    current: usize,

    /// epub spine, as resource hrefs in reading order
    pub spine: Vec<String>,

    /// resource href -> `Resource`, exactly as declared in the manifest
    pub resources: HashMap<String, Resource>,

    /// manifest id -> resource href
    ids: HashMap<String, String>,

    /// table of contents from the XHTML navigation document, populated
    /// when the doc is opened. [`None`] when the book has no usable
    /// navigation document
    pub toc: Option<TableOfContents>,

    /// diagnostics raised by the toc extraction run performed while
    /// opening the doc
    pub toc_diagnostics: Vec<TocDiagnostic>,

    /// The epub metadata stored as key -> value
    pub metadata: HashMap<String, Vec<String>>,

    /// root file base path
    pub root_base: PathBuf,

    /// root file full path
    pub root_file: PathBuf,

    /// unique identifier
    pub unique_identifier: Option<String>,

    /// The id of the cover, if any
    pub cover_id: Option<String>,

    /// The global direction in which the content flows
    pub page_progression_direction: Option<String>,

    /// href of the manifest item carrying the `nav` property
    nav_href: Option<String>,

    /// id named by the spine `toc` attribute
    spine_toc: Option<String>,
}

impl EpubDoc<BufReader<File>> {
    /// Opens the epub file in `path`.
    ///
    /// Initialize some internal variables to be able to access to the
    /// epub resources, spine and toc.
    ///
    /// # Errors
    ///
    /// Returns an error if the epub is broken or if the file doesn't
    /// exists.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DocError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut doc = Self::from_reader(BufReader::new(file))?;
        doc.archive.path = path.to_path_buf();
        Ok(doc)
    }
}

impl<R: Read + Seek> EpubDoc<R> {
    /// Opens the epub contained in `reader`.
    ///
    /// Parses the container and the package document, then tries to
    /// extract the table of contents from the XHTML navigation
    /// document. A broken or missing navigation document never makes
    /// the open fail; it only shows up in
    /// [`toc_diagnostics`](Self::toc_diagnostics).
    ///
    /// # Errors
    ///
    /// Returns an error if the epub is broken.
    pub fn from_reader(reader: R) -> Result<Self, DocError> {
        let mut archive = EpubArchive::from_reader(reader)?;

        let container = archive.get_container_file()?;
        let root_file = get_root_file(&container)?;
        let root_base = root_file
            .parent()
            .map_or_else(PathBuf::new, Path::to_path_buf);
        let mut doc = Self {
            archive,
            spine: vec![],
            resources: HashMap::new(),
            ids: HashMap::new(),
            toc: None,
            toc_diagnostics: vec![],
            metadata: HashMap::new(),
            root_file,
            root_base,
            current: 0,
            unique_identifier: None,
            cover_id: None,
            page_progression_direction: None,
            nav_href: None,
            spine_toc: None,
        };
        doc.fill_resources()?;
        doc.toc_diagnostics = doc.extract_xhtml_toc();
        Ok(doc)
    }

    /// Returns the first metadata found with this name.
    pub fn mdata(&self, name: &str) -> Option<String> {
        self.metadata.get(name).and_then(|v| v.first().cloned())
    }

    /// Returns the id of the epub cover.
    ///
    /// The cover is searched in the doc metadata, by the tag
    /// `<meta name="cover" value="..">` and in the manifest by the
    /// `cover-image` property
    ///
    /// The id is not guaranteed to be valid.
    pub fn get_cover_id(&self) -> Option<String> {
        self.cover_id.clone()
    }

    /// Returns the cover's content and mime-type
    ///
    /// Returns [`None`] if the cover can't be found.
    pub fn get_cover(&mut self) -> Option<(Vec<u8>, String)> {
        let cover_id = self.get_cover_id()?;
        let href = self.ids.get(&cover_id)?.clone();
        self.get_resource(&href)
    }

    /// Returns Release Identifier defined at
    /// <https://www.w3.org/publishing/epub3/epub-packages.html#sec-metadata-elem-identifiers-pid>
    pub fn get_release_identifier(&self) -> Option<String> {
        match (
            self.unique_identifier.as_ref(),
            self.mdata("dcterms:modified"),
        ) {
            (Some(unique_identifier), Some(modified)) => {
                Some(format!("{}@{}", unique_identifier, modified))
            }
            _ => None,
        }
    }

    /// Returns the resource content by full path in the epub archive
    ///
    /// Returns [`None`] if the path doesn't exist in the epub
    pub fn get_resource_by_path<P: AsRef<Path>>(&mut self, path: P) -> Option<Vec<u8>> {
        self.archive.get_entry(path).ok()
    }

    /// Returns the resource content and mime-type by the href defined
    /// in the manifest
    ///
    /// Returns [`None`] if the href doesn't exists in the epub
    pub fn get_resource(&mut self, href: &str) -> Option<(Vec<u8>, String)> {
        let media_type = self.resources.get(href)?.media_type.clone();
        let path = self.convert_path_seps(href);
        let content = self.get_resource_by_path(path)?;
        Some((content, media_type))
    }

    /// Returns the resource content by full path in the epub archive,
    /// as String
    ///
    /// Returns [`None`] if the path doesn't exists in the epub
    pub fn get_resource_str_by_path<P: AsRef<Path>>(&mut self, path: P) -> Option<String> {
        self.archive.get_entry_as_str(path).ok()
    }

    /// Returns the resource content and mime-type by the href defined
    /// in the manifest, as String
    ///
    /// Returns [`None`] if the href doesn't exists in the epub
    pub fn get_resource_str(&mut self, href: &str) -> Option<(String, String)> {
        let media_type = self.resources.get(href)?.media_type.clone();
        let path = self.convert_path_seps(href);
        let content = self.get_resource_str_by_path(path)?;
        Some((content, media_type))
    }

    /// Returns the resource mime-type, by manifest href
    ///
    /// Returns [`None`] if the resource can't be found.
    pub fn get_resource_mime(&self, href: &str) -> Option<String> {
        self.resources.get(href).map(|r| r.media_type.clone())
    }

    /// Returns the resource mime searching by source full path
    ///
    /// Returns [`None`] if the resource can't be found.
    pub fn get_resource_mime_by_path<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        let path = path.as_ref();

        self.resources.iter().find_map(|(href, resource)| {
            if self.convert_path_seps(href) == path {
                Some(resource.media_type.clone())
            } else {
                None
            }
        })
    }

    /// Returns the resource designated as the toc by the package
    /// document: the manifest item carrying the `nav` property or, if
    /// there's none, the item named by the spine `toc` attribute.
    pub fn get_designated_toc_resource(&self) -> Option<&Resource> {
        let href = self
            .nav_href
            .as_ref()
            .or_else(|| self.spine_toc.as_ref().and_then(|id| self.ids.get(id)))?;
        self.resources.get(href)
    }

    /// Extracts the table of contents from the XHTML navigation
    /// document and commits it into [`toc`](Self::toc).
    ///
    /// Nothing is done when the book has no designated toc resource or
    /// when its media type isn't xhtml; the NCX format is not handled
    /// here. Every failure along the way is recovered: the run always
    /// completes, with an empty or absent toc at worst, and reports
    /// what happened through the returned diagnostics.
    ///
    /// This runs once when the doc is opened; calling it again over the
    /// same doc produces the same toc.
    pub fn extract_xhtml_toc(&mut self) -> Vec<TocDiagnostic> {
        let Some(toc_resource) = self.get_designated_toc_resource() else {
            return vec![];
        };
        if toc_resource.media_type != XHTML_MEDIA_TYPE {
            return vec![];
        }

        let path = self.convert_path_seps(&toc_resource.href);
        let content = match self.archive.get_entry(path) {
            Ok(content) => content,
            Err(error) => return vec![TocDiagnostic::MarkupParseError(error.to_string())],
        };
        let root = match xmlutils::XMLReader::parse(content.as_slice()) {
            Ok(root) => root,
            Err(error) => return vec![TocDiagnostic::MarkupParseError(error.to_string())],
        };

        let top_ol = match toc::find_nav_list(&root) {
            Ok(top_ol) => top_ol,
            Err(diagnostic) => return vec![diagnostic],
        };
        let parse = toc::parse_toc_list(top_ol, &self.resources);
        self.toc = Some(TableOfContents::new(parse.references));
        parse.diagnostics
    }

    /// Returns the current chapter content and mime-type
    ///
    /// The current follows the epub spine order. You can modify the
    /// current calling to `go_next`, `go_prev` or `set_current_page`
    /// methods.
    ///
    /// Can return [`None`] if the epub is broken.
    pub fn get_current(&mut self) -> Option<(Vec<u8>, String)> {
        let current_href = self.get_current_href()?;
        self.get_resource(&current_href)
    }

    /// See [`Self::get_current`]
    pub fn get_current_str(&mut self) -> Option<(String, String)> {
        let current_href = self.get_current_href()?;
        self.get_resource_str(&current_href)
    }

    /// Returns the current chapter mimetype
    ///
    /// Can return [`None`] if the epub is broken.
    pub fn get_current_mime(&self) -> Option<String> {
        let current_href = self.get_current_href()?;
        self.get_resource_mime(&current_href)
    }

    /// Returns the current chapter full path in the archive
    ///
    /// Can return [`None`] if the epub is broken.
    pub fn get_current_path(&self) -> Option<PathBuf> {
        let current_href = self.get_current_href()?;
        Some(self.convert_path_seps(&current_href))
    }

    /// Returns the current chapter href
    ///
    /// Can return [`None`] if the epub is broken.
    pub fn get_current_href(&self) -> Option<String> {
        self.spine.get(self.current).cloned()
    }

    /// Changes current to the next chapter
    ///
    /// Returns [`false`] if the current chapter is the last one
    pub fn go_next(&mut self) -> bool {
        if self.current + 1 >= self.spine.len() {
            false
        } else {
            self.current += 1;
            true
        }
    }

    /// Changes current to the prev chapter
    ///
    /// Returns [`false`] if the current chapter is the first one
    pub fn go_prev(&mut self) -> bool {
        if self.current < 1 {
            false
        } else {
            self.current -= 1;
            true
        }
    }

    /// Returns the number of chapters
    pub fn get_num_pages(&self) -> usize {
        self.spine.len()
    }

    /// Returns the current chapter number, starting from 0
    pub fn get_current_page(&self) -> usize {
        self.current
    }

    /// Changes the current page
    ///
    /// Returns [`false`] if the page is out of bounds
    pub fn set_current_page(&mut self, n: usize) -> bool {
        if n >= self.spine.len() {
            false
        } else {
            self.current = n;
            true
        }
    }

    /// Function to convert a resource full path to a chapter number in
    /// the spine. If the resource isn't in the spine list, [`None`]
    /// will be returned
    ///
    /// This method is useful to convert a toc
    /// [`TocReference`](crate::toc::TocReference) resource to a chapter
    /// number to be able to navigate easily
    pub fn resource_uri_to_chapter(&self, uri: &PathBuf) -> Option<usize> {
        self.resources
            .keys()
            .find(|href| &self.convert_path_seps(href) == uri)
            .and_then(|href| self.resource_href_to_chapter(href))
    }

    /// Function to convert a resource href to a chapter number in the
    /// spine. If the resource isn't in the spine list, [`None`] will be
    /// returned
    pub fn resource_href_to_chapter(&self, href: &str) -> Option<usize> {
        self.spine.iter().position(|item| item == href)
    }

    fn fill_resources(&mut self) -> Result<(), DocError> {
        let container = self.archive.get_entry(&self.root_file)?;
        let root = xmlutils::XMLReader::parse(container.as_slice())?;
        let unique_identifier_id = root.get_attr("unique-identifier");

        // resources from manifest
        // This should be run before the spine, which resolves idrefs
        // through self.ids
        let manifest = root.find("manifest").ok_or(DocError::InvalidEpub)?;
        for item in manifest.child_elements() {
            self.insert_resource(item);
        }

        // items from spine
        let spine = root.find("spine").ok_or(DocError::InvalidEpub)?;
        self.spine_toc = spine.get_attr("toc");
        self.page_progression_direction = spine.get_attr("page-progression-direction");
        for item in spine.child_elements() {
            self.insert_spine(item);
        }

        // metadata
        let metadata = root.find("metadata").ok_or(DocError::InvalidEpub)?;
        self.fill_metadata(metadata, unique_identifier_id.as_deref());

        Ok(())
    }

    // Forcibly converts separators in a filepath to unix separators to
    // to ensure that ZipArchive's by_name method will retrieve the
    // proper file. Failing to convert to unix-style on Windows causes
    // the ZipArchive not to find the file.
    fn convert_path_seps<P: AsRef<Path>>(&self, href: P) -> PathBuf {
        let mut path = self.root_base.join(href);
        if cfg!(windows) {
            path = PathBuf::from(path.to_string_lossy().replace('\\', "/"));
        }
        path
    }

    fn insert_resource(&mut self, item: &XMLElement) {
        let (Some(id), Some(href), Some(media_type)) = (
            item.get_attr("id"),
            item.get_attr("href"),
            item.get_attr("media-type"),
        ) else {
            return;
        };

        if let Some(properties) = item.get_attr("properties") {
            for property in properties.split_whitespace() {
                if property == "nav" {
                    self.nav_href = Some(href.clone());
                } else if property == "cover-image" && self.cover_id.is_none() {
                    self.cover_id = Some(id.clone());
                }
            }
        }

        self.ids.insert(id, href.clone());
        self.resources
            .insert(href.clone(), Resource { href, media_type });
    }

    fn insert_spine(&mut self, item: &XMLElement) {
        let Some(idref) = item.get_attr("idref") else {
            return;
        };
        if let Some(href) = self.ids.get(&idref) {
            self.spine.push(href.clone());
        }
    }

    fn fill_metadata(&mut self, metadata: &XMLElement, unique_identifier_id: Option<&str>) {
        for item in metadata.child_elements() {
            if item.name.local_name == "meta" {
                if let (Some(name), Some(content)) =
                    (item.get_attr("name"), item.get_attr("content"))
                {
                    if name == "cover" {
                        self.cover_id = Some(content.clone());
                    }
                    self.metadata.entry(name).or_default().push(content);
                } else if let Some(property) = item.get_attr("property") {
                    let value = item.text_children_content();
                    self.metadata.entry(property).or_default().push(value);
                }
            } else {
                let name = item.name.local_name.clone();
                let value = item.text_children_content();
                if name == "identifier"
                    && self.unique_identifier.is_none()
                    && item.get_attr("id").as_deref() == unique_identifier_id
                    && unique_identifier_id.is_some()
                {
                    self.unique_identifier = Some(value.clone());
                }
                self.metadata.entry(name).or_default().push(value);
            }
        }
    }
}

fn get_root_file(container: &[u8]) -> Result<PathBuf, DocError> {
    let root = xmlutils::XMLReader::parse(container)?;
    let rootfile = root.find("rootfile").ok_or(DocError::InvalidEpub)?;
    let full_path = rootfile.get_attr("full-path").ok_or(DocError::InvalidEpub)?;

    Ok(PathBuf::from(full_path))
}
