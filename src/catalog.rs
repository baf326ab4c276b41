//! Extension catalog and file classification
//!
//! Maps a file name to a `(main, sub)` category pair using a static table of
//! extensions. Declaration order matters: several extensions appear under
//! more than one subcategory and the first declaration wins.

use serde::Serialize;
use std::fmt;

/// Main category returned when nothing in the table matches
pub const OTHERS: &str = "others";

/// Subcategory returned when nothing in the table matches
pub const OTHER: &str = "other";

/// Subcategory name paired with its extensions (each starting with `.`, lower-case)
pub type SubcategoryTable = &'static [(&'static str, &'static [&'static str])];

/// Ordered extension table: main category -> subcategory -> extensions
#[derive(Debug, Clone, Copy)]
pub struct ExtensionTable {
    categories: &'static [(&'static str, SubcategoryTable)],
}

/// Built-in extension table
pub static EXTENSION_TABLE: ExtensionTable = ExtensionTable {
    categories: &[
        (
            "code",
            &[
                ("javascript", &[".js", ".jsx", ".ts", ".tsx"]),
                ("python", &[".py", ".pyw", ".pyc", ".pyo", ".pyd"]),
                ("java", &[".java", ".class", ".jar"]),
                ("cpp", &[".cpp", ".h", ".hpp", ".cxx", ".hxx"]),
                ("c", &[".c", ".h"]),
                ("php", &[".php", ".phtml", ".php3", ".php4", ".php5", ".phps"]),
                ("ruby", &[".rb", ".rbw"]),
                ("go", &[".go"]),
                ("rust", &[".rs"]),
                ("swift", &[".swift"]),
                ("kotlin", &[".kt", ".kts"]),
                ("html", &[".html", ".htm", ".xhtml"]),
                ("css", &[".css", ".scss", ".sass", ".less"]),
                ("json", &[".json"]),
                ("xml", &[".xml", ".xsd", ".xsl", ".xslt"]),
                ("yaml", &[".yaml", ".yml"]),
                ("sql", &[".sql", ".psql", ".pgsql"]),
                ("shell", &[".sh", ".bash", ".zsh", ".fish"]),
                ("batch", &[".bat", ".cmd"]),
                ("powershell", &[".ps1", ".psm1", ".psd1"]),
                ("other", &[".lua", ".r", ".matlab", ".scala", ".groovy"]),
            ],
        ),
        (
            "images",
            &[
                ("jpeg", &[".jpg", ".jpeg", ".jpe", ".jif", ".jfif", ".jfi"]),
                ("png", &[".png"]),
                ("gif", &[".gif"]),
                ("svg", &[".svg", ".svgz"]),
                ("webp", &[".webp"]),
                ("bmp", &[".bmp", ".dib"]),
                ("tiff", &[".tiff", ".tif"]),
                ("ico", &[".ico"]),
                ("heic", &[".heic", ".heif"]),
                ("raw", &[".raw", ".cr2", ".nef", ".dng", ".arw", ".sr2", ".rw2"]),
                ("psd", &[".psd", ".psb"]),
                ("ai", &[".ai"]),
                ("other", &[".eps", ".indd", ".cdr"]),
            ],
        ),
        (
            "videos",
            &[
                ("mp4", &[".mp4", ".m4v", ".m4p"]),
                ("mov", &[".mov", ".qt"]),
                ("avi", &[".avi"]),
                ("mkv", &[".mkv"]),
                ("wmv", &[".wmv"]),
                ("flv", &[".flv", ".f4v", ".f4p", ".f4a", ".f4b"]),
                ("webm", &[".webm"]),
                ("mpeg", &[".mpeg", ".mpg", ".mpe", ".m1v", ".m2v"]),
                ("other", &[".3gp", ".3g2", ".mxf", ".roq", ".nsv", ".flv", ".f4v"]),
            ],
        ),
        (
            "audio",
            &[
                ("mp3", &[".mp3"]),
                ("wav", &[".wav"]),
                ("aac", &[".aac", ".m4a"]),
                ("flac", &[".flac"]),
                ("ogg", &[".ogg", ".oga"]),
                ("wma", &[".wma"]),
                ("aiff", &[".aiff", ".aif"]),
                ("alac", &[".alac"]),
                ("opus", &[".opus"]),
                ("other", &[".mid", ".midi", ".kar"]),
            ],
        ),
        (
            "documents",
            &[
                ("pdf", &[".pdf"]),
                ("word", &[".doc", ".docx", ".docm", ".dot", ".dotx", ".dotm"]),
                ("excel", &[".xls", ".xlsx", ".xlsm", ".xlt", ".xltx", ".xltm"]),
                ("powerpoint", &[".ppt", ".pptx", ".pptm", ".pot", ".potx", ".potm"]),
                ("text", &[".txt", ".rtf", ".md", ".markdown", ".mdown"]),
                ("ebook", &[".epub", ".mobi", ".azw", ".azw3", ".fb2"]),
                ("other", &[".odt", ".ods", ".odp", ".odg", ".odf"]),
            ],
        ),
        (
            "archives",
            &[
                ("zip", &[".zip"]),
                ("rar", &[".rar"]),
                ("7z", &[".7z"]),
                ("tar", &[".tar"]),
                ("gz", &[".gz", ".gzip"]),
                ("bz2", &[".bz2", ".bzip2"]),
                ("xz", &[".xz"]),
                ("iso", &[".iso"]),
                ("dmg", &[".dmg"]),
                ("other", &[".cab", ".arj", ".lzh", ".lha", ".z", ".zipx"]),
            ],
        ),
        (
            "executables",
            &[
                ("windows", &[".exe", ".msi", ".bat", ".cmd", ".ps1"]),
                ("mac", &[".dmg", ".app", ".pkg"]),
                ("linux", &[".deb", ".rpm", ".appimage"]),
                ("android", &[".apk"]),
                ("java", &[".jar"]),
                ("other", &[".bin", ".run", ".sh"]),
            ],
        ),
        (
            "fonts",
            &[
                ("ttf", &[".ttf", ".ttc"]),
                ("otf", &[".otf"]),
                ("woff", &[".woff"]),
                ("woff2", &[".woff2"]),
                ("other", &[".eot", ".svg"]),
            ],
        ),
        (
            "data",
            &[
                ("csv", &[".csv"]),
                ("tsv", &[".tsv"]),
                ("dat", &[".dat"]),
                ("db", &[".db", ".sqlite", ".sqlite3"]),
                ("access", &[".mdb", ".accdb"]),
                ("other", &[".dbf", ".mdf", ".ndf"]),
            ],
        ),
    ],
};

/// Two-level classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Category {
    pub main: &'static str,
    pub sub: &'static str,
}

impl Category {
    /// The catch-all `others/other` pair
    pub const UNKNOWN: Category = Category {
        main: OTHERS,
        sub: OTHER,
    };

    /// Whether this is the catch-all pair
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main, self.sub)
    }
}

impl ExtensionTable {
    /// Iterate `(main, sub, extensions)` in declaration order
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str, &'static [&'static str])> {
        self.categories.iter().flat_map(|(main, subs)| {
            subs.iter().map(move |(sub, extensions)| (*main, *sub, *extensions))
        })
    }

    /// Main category names in declaration order
    pub fn main_categories(&self) -> impl Iterator<Item = &'static str> {
        self.categories.iter().map(|(main, _)| *main)
    }

    /// Look up a dotted, lower-case extension such as `.mkv`
    pub fn lookup(&self, dotted_ext: &str) -> Option<Category> {
        self.entries()
            .find(|(_, _, extensions)| extensions.iter().any(|ext| *ext == dotted_ext))
            .map(|(main, sub, _)| Category { main, sub })
    }

    /// Classify a file name against this table
    pub fn classify(&self, file_name: &str) -> Category {
        let ext = extension_of(file_name);
        if ext.is_empty() {
            return Category::UNKNOWN;
        }

        self.lookup(&format!(".{}", ext))
            .unwrap_or(Category::UNKNOWN)
    }
}

/// Lower-cased text after the last `.`, or empty when the name has no `.`
pub fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) => file_name[idx + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Classify a file name against the built-in table
pub fn classify(file_name: &str) -> Category {
    EXTENSION_TABLE.classify(file_name)
}

/// A file name together with its classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedFile {
    pub name: String,
    pub category: Category,
}

impl ClassifiedFile {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let category = classify(&name);
        Self { name, category }
    }
}
