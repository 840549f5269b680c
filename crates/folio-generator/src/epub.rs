//! EPUB packaging for books.
//!
//! Produces an EPUB 2 container from a book's metadata and its declared
//! chapter list. Chapters appear in the spine and the NCX table of contents
//! in declared order.

use std::{
    fs,
    io::{self, Seek, Write},
    path::{Path, PathBuf},
};

use folio_core::Book;
use folio_parser::html_escape;
use thiserror::Error;
use tracing::info;
use zip::{CompressionMethod, ZipWriter, result::ZipError, write::SimpleFileOptions};

use crate::{
    EPUB_CONTENT_TYPE,
    repository::{Repository, RepositoryError},
};

/// EPUB packaging errors.
#[derive(Debug, Error)]
pub enum EpubError {
    /// The book or one of its chapters could not be loaded.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The book declares no `epub_file` to write to.
    #[error("book `{book}` does not declare an epub_file")]
    NoEpubFile { book: String },

    /// The output file could not be created.
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing an archive entry failed.
    #[error("failed to write epub entry: {0}")]
    Write(#[from] io::Error),

    /// The zip container could not be finalized.
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),
}

/// Result type for EPUB packaging.
pub type Result<T> = std::result::Result<T, EpubError>;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// A chapter ready to be placed in the container.
struct Entry {
    id: String,
    href: String,
    title: String,
    document: String,
}

/// Package the book `slug` into the EPUB file its metadata declares.
///
/// Returns the path written.
pub fn package_book(repository: &Repository, slug: &str) -> Result<PathBuf> {
    let book = repository.load_book(slug)?;
    let path = repository
        .epub_path(&book)
        .ok_or_else(|| EpubError::NoEpubFile {
            book: slug.to_string(),
        })?;

    write_epub_file(repository, &book, &path)?;
    Ok(path)
}

/// Package `book` into a file at `path`, replacing any existing file.
pub fn write_epub_file(repository: &Repository, book: &Book, path: &Path) -> Result<()> {
    // Load every chapter before touching the destination.
    let entries = load_entries(repository, book)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| EpubError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = fs::File::create(path).map_err(|source| EpubError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    write_entries(book, &entries, file)?;
    info!(
        book = %book.slug,
        path = %path.display(),
        chapters = entries.len(),
        "packaged epub"
    );
    Ok(())
}

/// Package `book` into any seekable writer.
pub fn write_epub<W: Write + Seek>(repository: &Repository, book: &Book, writer: W) -> Result<()> {
    let entries = load_entries(repository, book)?;
    write_entries(book, &entries, writer)
}

fn load_entries(repository: &Repository, book: &Book) -> Result<Vec<Entry>> {
    book.chapters
        .iter()
        .enumerate()
        .map(|(index, info)| {
            let chapter = repository.load_chapter(book, &info.slug)?;
            Ok(Entry {
                id: format!("chapter-{}", index + 1),
                href: format!("text/{}.xhtml", info.slug),
                document: xhtml_document(&chapter.title, &chapter.content),
                title: chapter.title,
            })
        })
        .collect()
}

fn write_entries<W: Write + Seek>(book: &Book, entries: &[Entry], writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let identifier = format!("urn:folio:book:{}", book.slug);

    // The mimetype entry must come first and stay uncompressed.
    zip.start_file("mimetype", stored)?;
    zip.write_all(EPUB_CONTENT_TYPE.as_bytes())?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(package_document(book, entries, &identifier).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(ncx_document(book, entries, &identifier).as_bytes())?;

    for entry in entries {
        zip.start_file(format!("OEBPS/{}", entry.href), deflated)?;
        zip.write_all(entry.document.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

fn book_title(book: &Book) -> &str {
    if book.metadata.title.is_empty() {
        &book.slug
    } else {
        &book.metadata.title
    }
}

fn package_document(book: &Book, entries: &[Entry], identifier: &str) -> String {
    let meta = &book.metadata;
    let mut opf = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        html_escape(book_title(book))
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        html_escape(identifier)
    ));
    opf.push_str("    <dc:language>en</dc:language>\n");

    let creators = [
        (&meta.author, "aut", "dc:creator"),
        (&meta.translator, "trl", "dc:contributor"),
        (&meta.editor, "edt", "dc:contributor"),
        (&meta.illustrator, "ill", "dc:contributor"),
    ];
    for (name, role, element) in creators {
        if !name.is_empty() {
            opf.push_str(&format!(
                "    <{element} opf:role=\"{role}\" opf:file-as=\"{name}\">{name}</{element}>\n",
                name = html_escape(name)
            ));
        }
    }

    if !meta.description.is_empty() {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            html_escape(&meta.description)
        ));
    }
    if let Some(year) = meta.year {
        opf.push_str(&format!("    <dc:date>{year}</dc:date>\n"));
    }

    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    for entry in entries {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            entry.id,
            html_escape(&entry.href)
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    for entry in entries {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", entry.id));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn ncx_document(book: &Book, entries: &[Entry], identifier: &str) -> String {
    let mut ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
"#,
        html_escape(identifier),
        html_escape(book_title(book))
    );

    for (index, entry) in entries.iter().enumerate() {
        let order = index + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navpoint-{order}\" playOrder=\"{order}\">\n      \
             <navLabel>\n        <text>{}</text>\n      </navLabel>\n      \
             <content src=\"{}\"/>\n    </navPoint>\n",
            html_escape(&entry.title),
            html_escape(&entry.href)
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

/// Chapter files that are already complete XHTML documents pass through;
/// bare fragments get a minimal document around them.
fn xhtml_document(title: &str, content: &str) -> String {
    let head = content.trim_start();
    if head.starts_with("<?xml") || head.starts_with("<!DOCTYPE") || head.starts_with("<html") {
        return content.to_string();
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"en\">\n\
         <head>\n<title>{}</title>\n</head>\n\
         <body>\n{content}\n</body>\n\
         </html>\n",
        html_escape(title)
    )
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Cursor, Read},
        sync::Arc,
    };

    use folio_parser::MarkdownRenderer;
    use tempfile::TempDir;
    use zip::ZipArchive;

    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn repository(dir: &TempDir) -> Repository {
        let root = dir.path();
        fs::create_dir_all(root.join("posts")).unwrap();
        Repository::new(
            root.join("posts"),
            root.join("books"),
            root.join("title-page/index.md"),
            Arc::new(MarkdownRenderer::new()),
        )
    }

    fn add_book(dir: &TempDir, metadata: &str) {
        let book = dir.path().join("books/sepoy");
        write(&book.join("metadata.yaml"), metadata);
        write(
            &book.join("chapters.yaml"),
            "chapters:\n  - slug: title_page\n    title: Title Page\n  \
             - slug: beginning\n    title: The Beginning\n  \
             - slug: war\n    title: \"The Gurkha War: 1814 & 1816\"\n",
        );
        write(&book.join("chapters/title_page.xhtml"), "<h1>From Sepoy</h1>");
        write(&book.join("chapters/beginning.xhtml"), "<p>It began.</p>");
        write(
            &book.join("chapters/war.xhtml"),
            "<?xml version=\"1.0\"?>\n<html><body><p>War.</p></body></html>",
        );
    }

    fn entry(archive: &mut ZipArchive<fs::File>, name: &str) -> String {
        let mut text = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    #[test]
    fn test_package_book_writes_declared_file() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        add_book(
            &dir,
            "title: From Sepoy to Subedar\nauthor: Sita Ram\ntranslator: Norgate\n\
             year: 1873\nepub_file: sepoy.epub\n",
        );

        let path = package_book(&repo, "sepoy").unwrap();
        assert_eq!(path, dir.path().join("books/sepoy/sepoy.epub"));

        let mut archive = ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
        {
            let first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
        }
        assert_eq!(entry(&mut archive, "mimetype"), "application/epub+zip");
        assert!(entry(&mut archive, "META-INF/container.xml").contains("OEBPS/content.opf"));

        let opf = entry(&mut archive, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>From Sepoy to Subedar</dc:title>"));
        assert!(opf.contains("opf:role=\"aut\" opf:file-as=\"Sita Ram\">Sita Ram</dc:creator>"));
        assert!(opf.contains("opf:role=\"trl\""));
        assert!(!opf.contains("opf:role=\"edt\""));
        assert!(opf.contains("<dc:date>1873</dc:date>"));

        let spine: Vec<_> = opf
            .lines()
            .filter(|line| line.contains("<itemref"))
            .collect();
        assert_eq!(spine.len(), 3);
        assert!(spine[0].contains("chapter-1"));
        assert!(spine[2].contains("chapter-3"));
        assert!(opf.contains("id=\"chapter-1\" href=\"text/title_page.xhtml\""));

        let ncx = entry(&mut archive, "OEBPS/toc.ncx");
        let title_page = ncx.find("Title Page").unwrap();
        let beginning = ncx.find("The Beginning").unwrap();
        assert!(title_page < beginning);
        assert!(ncx.contains("The Gurkha War: 1814 &amp; 1816"));
    }

    #[test]
    fn test_fragments_wrapped_documents_kept() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        add_book(&dir, "title: Sepoy\nepub_file: sepoy.epub\n");

        let path = package_book(&repo, "sepoy").unwrap();
        let mut archive = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();

        let beginning = entry(&mut archive, "OEBPS/text/beginning.xhtml");
        assert!(beginning.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(beginning.contains("<title>The Beginning</title>"));
        assert!(beginning.contains("<body>\n<p>It began.</p>\n</body>"));

        assert_eq!(
            entry(&mut archive, "OEBPS/text/war.xhtml"),
            "<?xml version=\"1.0\"?>\n<html><body><p>War.</p></body></html>"
        );
    }

    #[test]
    fn test_packaged_epub_is_served_by_repository() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        add_book(&dir, "title: Sepoy\nepub_file: sepoy.epub\n");

        package_book(&repo, "sepoy").unwrap();
        let book = repo.load_book("sepoy").unwrap();
        let bytes = repo.load_epub(&book).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_write_epub_to_memory() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        add_book(&dir, "title: Sepoy\n");
        let book = repo.load_book("sepoy").unwrap();

        let mut buffer = Cursor::new(Vec::new());
        write_epub(&repo, &book, &mut buffer).unwrap();

        let archive = ZipArchive::new(Cursor::new(buffer.into_inner())).unwrap();
        // mimetype, container, opf, ncx, three chapters
        assert_eq!(archive.len(), 7);
    }

    #[test]
    fn test_package_book_without_epub_file() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        add_book(&dir, "title: Sepoy\n");

        let err = package_book(&repo, "sepoy").unwrap_err();
        assert!(matches!(err, EpubError::NoEpubFile { .. }));
    }

    #[test]
    fn test_missing_chapter_file_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        add_book(&dir, "title: Sepoy\nepub_file: sepoy.epub\n");
        fs::remove_file(dir.path().join("books/sepoy/chapters/beginning.xhtml")).unwrap();

        let err = package_book(&repo, "sepoy").unwrap_err();
        assert!(matches!(err, EpubError::Repository(ref e) if e.is_not_found()));
        assert!(!dir.path().join("books/sepoy/sepoy.epub").exists());
    }

    #[test]
    fn test_unknown_book() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir);
        fs::create_dir_all(dir.path().join("books")).unwrap();

        let err = package_book(&repo, "nope").unwrap_err();
        assert!(matches!(err, EpubError::Repository(ref e) if e.is_not_found()));
    }
}
