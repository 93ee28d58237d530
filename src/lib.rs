#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::let_underscore_drop,

    // for MSRV
    clippy::unnested_or_patterns,
    clippy::uninlined_format_args,
    clippy::missing_const_for_fn,
)]

//! EPUB library
//! lib to read epub files and extract the table of contents from the
//! XHTML navigation document
//!
//! # Examples
//!
//! ## Opening
//!
//! ```no_run
//! use epub_toc::doc::EpubDoc;
//! let doc = EpubDoc::new("book.epub");
//! assert!(doc.is_ok());
//! let doc = doc.unwrap();
//! ```
//!
//! ## Getting doc metatada
//!
//! Metadata is a [`HashMap`](std::collections::HashMap) storing all metadata defined in the epub
//!
//! ```no_run
//! # use epub_toc::doc::EpubDoc;
//! # let doc = EpubDoc::new("book.epub");
//! # let doc = doc.unwrap();
//! let title = doc.mdata("title");
//! ```
//!
//! ## Accessing resources
//!
//! In the resources var is stored each resource defined in the epub
//! manifest, indexed by its href exactly as written in the package
//! document
//!
//! ```no_run
//! # use epub_toc::doc::EpubDoc;
//! # let doc = EpubDoc::new("book.epub");
//! # let doc = doc.unwrap();
//! let chapter = doc.resources.get("c1.html");
//! ```
//!
//! ## Reading the table of contents
//!
//! If the epub carries an XHTML navigation document, the toc is
//! extracted when the doc is opened. Entries keep the document order
//! of the navigation list
//!
//! ```no_run
//! # use epub_toc::doc::EpubDoc;
//! # let doc = EpubDoc::new("book.epub");
//! # let doc = doc.unwrap();
//! if let Some(toc) = &doc.toc {
//!     for entry in &toc.references {
//!         println!("{}", entry.title);
//!     }
//! }
//! ```

pub mod archive;
pub mod doc;
pub mod toc;
pub mod xmlutils;
