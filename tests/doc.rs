use std::io::{Cursor, Write};
use std::path::PathBuf;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use epub_toc::doc::EpubDoc;
use epub_toc::toc::TocDiagnostic;

const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>
    <dc:title>The Example Book</dc:title>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">2024-01-01T00:00:00Z</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="cover" href="cover.png" media-type="image/png" properties="cover-image"/>
    <item id="c1" href="c1.html" media-type="application/xhtml+xml"/>
    <item id="c2" href="c2.html" media-type="application/xhtml+xml"/>
    <item id="c3" href="c3.html" media-type="application/xhtml+xml"/>
  </manifest>
  <spine page-progression-direction="ltr">
    <itemref idref="c1"/>
    <itemref idref="c2"/>
    <itemref idref="c3"/>
  </spine>
</package>"#;

const NAV: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
  <body>
    <nav epub:type="toc">
      <ol>
        <li><a href="c1.html">Chapter 1</a></li>
        <li><a href="c2.html#sec1"><span class="toc-label">Chapter 2</span></a></li>
        <li><a href="c3.html"><em>Chapter 3</em></a>
          <ol><li><a href="c3.html#sub">Sub section</a></li></ol>
        </li>
      </ol>
    </nav>
  </body>
</html>"#;

const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body><p>text</p></body></html>"#;

fn build_epub(files: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("mimetype", stored).unwrap();
    writer.write_all(b"application/epub+zip").unwrap();

    for (name, content) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }

    let mut cursor = writer.finish().unwrap();
    cursor.set_position(0);
    cursor
}

fn sample_epub() -> Cursor<Vec<u8>> {
    build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", OPF.as_bytes()),
        ("OEBPS/nav.xhtml", NAV.as_bytes()),
        ("OEBPS/cover.png", b"not really a png"),
        ("OEBPS/c1.html", CHAPTER.as_bytes()),
        ("OEBPS/c2.html", CHAPTER.as_bytes()),
        ("OEBPS/c3.html", CHAPTER.as_bytes()),
    ])
}

/// Same book with the nav document replaced.
fn epub_with_nav(nav: &str) -> Cursor<Vec<u8>> {
    build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", OPF.as_bytes()),
        ("OEBPS/nav.xhtml", nav.as_bytes()),
        ("OEBPS/c1.html", CHAPTER.as_bytes()),
        ("OEBPS/c2.html", CHAPTER.as_bytes()),
        ("OEBPS/c3.html", CHAPTER.as_bytes()),
    ])
}

#[test]
fn doc_open() {
    let doc = EpubDoc::from_reader(sample_epub());
    assert!(doc.is_ok());
    let doc = doc.unwrap();

    assert_eq!(PathBuf::from("OEBPS"), doc.root_base);
    assert_eq!(PathBuf::from("OEBPS/content.opf"), doc.root_file);
    assert_eq!(5, doc.resources.len());
    assert_eq!(vec!["c1.html", "c2.html", "c3.html"], doc.spine);
    assert_eq!(Some("ltr".to_string()), doc.page_progression_direction);
}

#[test]
fn doc_metadata() {
    let doc = EpubDoc::from_reader(sample_epub()).unwrap();

    assert_eq!(Some("The Example Book".to_string()), doc.mdata("title"));
    assert_eq!(Some("en".to_string()), doc.mdata("language"));
    assert_eq!(Some("urn:uuid:1234".to_string()), doc.unique_identifier);
    assert_eq!(
        Some("urn:uuid:1234@2024-01-01T00:00:00Z".to_string()),
        doc.get_release_identifier()
    );
}

#[test]
fn doc_cover() {
    let mut doc = EpubDoc::from_reader(sample_epub()).unwrap();

    assert_eq!(Some("cover".to_string()), doc.get_cover_id());
    let (content, mime) = doc.get_cover().unwrap();
    assert_eq!(b"not really a png".to_vec(), content);
    assert_eq!("image/png", mime);
}

#[test]
fn doc_resources() {
    let mut doc = EpubDoc::from_reader(sample_epub()).unwrap();

    assert_eq!(
        Some("application/xhtml+xml".to_string()),
        doc.get_resource_mime("c1.html")
    );
    assert_eq!(
        Some("application/xhtml+xml".to_string()),
        doc.get_resource_mime_by_path("OEBPS/c1.html")
    );
    let (content, mime) = doc.get_resource_str("c1.html").unwrap();
    assert_eq!(CHAPTER, content);
    assert_eq!("application/xhtml+xml", mime);
    assert!(doc.get_resource("nope.html").is_none());
}

#[test]
fn doc_spine_navigation() {
    let mut doc = EpubDoc::from_reader(sample_epub()).unwrap();

    assert_eq!(3, doc.get_num_pages());
    assert_eq!(Some("c1.html".to_string()), doc.get_current_href());
    assert!(!doc.go_prev());
    assert!(doc.go_next());
    assert_eq!(Some("c2.html".to_string()), doc.get_current_href());
    assert_eq!(Some(PathBuf::from("OEBPS/c2.html")), doc.get_current_path());
    assert!(doc.set_current_page(2));
    assert!(!doc.go_next());
    assert!(!doc.set_current_page(3));

    assert_eq!(Some(1), doc.resource_href_to_chapter("c2.html"));
    assert_eq!(
        Some(2),
        doc.resource_uri_to_chapter(&PathBuf::from("OEBPS/c3.html"))
    );
    assert_eq!(None, doc.resource_href_to_chapter("nav.xhtml"));
}

#[test]
fn toc_extracted_on_open() {
    let doc = EpubDoc::from_reader(sample_epub()).unwrap();

    assert!(doc.toc_diagnostics.is_empty());
    let toc = doc.toc.as_ref().unwrap();
    // the nested list entry is not part of the flat toc
    assert_eq!(3, toc.len());

    let titles: Vec<&str> = toc.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(vec!["Chapter 1", "Chapter 2", "Chapter 3"], titles);

    assert_eq!(
        "c1.html",
        toc.references[0].resource.as_ref().unwrap().href
    );
    assert_eq!(None, toc.references[0].fragment);
    assert_eq!(Some("sec1".to_string()), toc.references[1].fragment);
    assert_eq!(
        "c2.html",
        toc.references[1].resource.as_ref().unwrap().href
    );

    let unique: Vec<&str> = toc
        .unique_resources()
        .iter()
        .map(|r| r.href.as_str())
        .collect();
    assert_eq!(vec!["c1.html", "c2.html", "c3.html"], unique);
}

#[test]
fn toc_unresolved_reference_is_kept() {
    let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <body>
    <nav>
      <ol>
        <li><a href="missing.html">Lost chapter</a></li>
        <li><a href="c1.html">Chapter 1</a></li>
      </ol>
    </nav>
  </body>
</html>"#;
    let doc = EpubDoc::from_reader(epub_with_nav(nav)).unwrap();

    assert_eq!(
        vec![TocDiagnostic::UnresolvedReference {
            href: "missing.html".to_string()
        }],
        doc.toc_diagnostics
    );
    let toc = doc.toc.as_ref().unwrap();
    assert_eq!(2, toc.len());
    assert_eq!("Lost chapter", toc.references[0].title);
    assert!(toc.references[0].resource.is_none());
    assert!(toc.references[1].resource.is_some());
}

#[test]
fn toc_missing_nav_element_is_recovered() {
    let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body><p>no nav here</p></body></html>"#;
    let doc = EpubDoc::from_reader(epub_with_nav(nav)).unwrap();

    assert_eq!(vec![TocDiagnostic::NavigationNotFound], doc.toc_diagnostics);
    assert!(doc.toc.is_none());
}

#[test]
fn toc_missing_list_is_recovered() {
    let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body><nav><p>empty</p></nav></body></html>"#;
    let doc = EpubDoc::from_reader(epub_with_nav(nav)).unwrap();

    assert_eq!(vec![TocDiagnostic::ListNotFound], doc.toc_diagnostics);
    assert!(doc.toc.is_none());
}

#[test]
fn toc_malformed_nav_is_recovered() {
    let doc = EpubDoc::from_reader(epub_with_nav("<html><nav><ol>")).unwrap();

    assert_eq!(1, doc.toc_diagnostics.len());
    assert!(matches!(
        doc.toc_diagnostics[0],
        TocDiagnostic::MarkupParseError(_)
    ));
    assert!(doc.toc.is_none());
}

#[test]
fn toc_ncx_resource_is_ignored() {
    // EPUB 2 style: the designated toc resource comes from the spine
    // toc attribute and isn't xhtml, so this extraction doesn't touch it
    let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:5678</dc:identifier>
    <dc:title>Old Style</dc:title>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="c1" href="c1.html" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="c1"/>
  </spine>
</package>"#;
    let ncx = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1"><navMap/></ncx>"#;
    let epub = build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/toc.ncx", ncx.as_bytes()),
        ("OEBPS/c1.html", CHAPTER.as_bytes()),
    ]);
    let doc = EpubDoc::from_reader(epub).unwrap();

    assert_eq!("toc.ncx", doc.get_designated_toc_resource().unwrap().href);
    assert!(doc.toc.is_none());
    assert!(doc.toc_diagnostics.is_empty());
}

#[test]
fn toc_extraction_is_idempotent() {
    let mut doc = EpubDoc::from_reader(sample_epub()).unwrap();

    let first = doc.toc.clone();
    let diagnostics = doc.extract_xhtml_toc();
    assert_eq!(first, doc.toc);
    assert_eq!(doc.toc_diagnostics, diagnostics);
}
