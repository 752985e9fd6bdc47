//! Font resolution.
//!
//! A font name from configuration is turned into a font file path by an
//! ordered chain of [`FontStrategy`] values. Each strategy either finds a
//! file, declines, or fails; failures are logged and the chain moves on.
//!
//! Default chain:
//! 1. explicit path
//! 2. local cache (`./fonts`, user cache dir)
//! 3. system font directories
//! 4. free substitutes for common proprietary families
//! 5. Google Fonts download into the cache
//! 6. bundled / well-known fallbacks

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use ab_glyph::FontVec;

use captioneer_common::config::{font_cache_dir, local_fonts_dir};
use captioneer_common::error::{CaptioneerError, CaptioneerResult};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Proprietary family → metric-compatible or look-alike free family.
const SUBSTITUTES: &[(&str, &str)] = &[
    ("arial", "Arimo"),
    ("helvetica", "Arimo"),
    ("helvetica neue", "Inter"),
    ("times new roman", "Tinos"),
    ("times", "Tinos"),
    ("courier new", "Cousine"),
    ("impact", "Anton"),
    ("calibri", "Carlito"),
    ("cambria", "Caladea"),
    ("comic sans ms", "Comic Neue"),
    ("georgia", "Gelasio"),
    ("verdana", "DejaVu Sans"),
    ("segoe ui", "Open Sans"),
    ("proxima nova", "Montserrat"),
    ("gotham", "Montserrat"),
    ("futura", "Jost"),
];

/// Weight suffixes understood in names like `Roboto-Black`.
const WEIGHTS: &[(&str, u16)] = &[
    ("thin", 100),
    ("extralight", 200),
    ("light", 300),
    ("regular", 400),
    ("medium", 500),
    ("semibold", 600),
    ("bold", 700),
    ("extrabold", 800),
    ("black", 900),
];

/// Hardcoded last-resort font locations.
const SYSTEM_FALLBACKS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// A font lookup request.
#[derive(Debug, Clone, PartialEq)]
pub struct FontRequest {
    /// Name or path as configured, e.g. `Roboto-Black` or `fonts/My.ttf`.
    pub name: String,
}

impl FontRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
        }
    }

    /// Whether the name should be treated as a filesystem path.
    pub fn is_path_like(&self) -> bool {
        let lower = self.name.to_ascii_lowercase();
        self.name.contains('/')
            || self.name.contains('\\')
            || FONT_EXTENSIONS
                .iter()
                .any(|ext| lower.ends_with(&format!(".{ext}")))
    }

    /// Family without a weight suffix, and the weight (400 when absent).
    ///
    /// `Roboto-Black` → (`Roboto`, 900); `Open Sans` → (`Open Sans`, 400).
    pub fn family_and_weight(&self) -> (String, u16) {
        let stem = Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());

        if let Some((family, suffix)) = stem.rsplit_once(['-', ' ', '_']) {
            let key = normalize(suffix);
            if let Some((_, weight)) = WEIGHTS.iter().find(|(name, _)| *name == key) {
                return (family.trim().to_string(), *weight);
            }
        }
        (stem.trim().to_string(), 400)
    }

    /// Free substitute for the requested family, keeping the weight suffix.
    pub fn substitute(&self) -> Option<String> {
        let (family, weight) = self.family_and_weight();
        let lower = family.to_ascii_lowercase();
        let (_, replacement) = SUBSTITUTES.iter().find(|(from, _)| *from == lower)?;
        Some(match weight_suffix(weight) {
            Some(suffix) => format!("{replacement}-{suffix}"),
            None => (*replacement).to_string(),
        })
    }
}

fn weight_suffix(weight: u16) -> Option<&'static str> {
    match weight {
        100 => Some("Thin"),
        200 => Some("ExtraLight"),
        300 => Some("Light"),
        500 => Some("Medium"),
        600 => Some("SemiBold"),
        700 => Some("Bold"),
        800 => Some("ExtraBold"),
        900 => Some("Black"),
        _ => None,
    }
}

/// Lowercase with spaces, dashes and underscores removed.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether `bytes` parse as an outline font.
pub fn is_valid_font(bytes: &[u8]) -> bool {
    FontVec::try_from_vec(bytes.to_vec()).is_ok()
}

/// Whether `path` is a readable file holding a parseable font.
pub fn is_loadable_font(path: &Path) -> bool {
    match std::fs::read(path) {
        Ok(bytes) if is_valid_font(&bytes) => true,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Skipping unreadable font data");
            false
        }
        Err(_) => false,
    }
}

/// Find a loadable font file named `name` (normalized stem match) under `dirs`.
fn search_dirs(dirs: &[PathBuf], name: &str, max_depth: usize) -> Option<PathBuf> {
    let wanted = normalize(name);
    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        let found = walkdir::WalkDir::new(dir)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_font_file(e.path()))
            .find(|e| {
                e.path()
                    .file_stem()
                    .map(|s| normalize(&s.to_string_lossy()) == wanted)
                    .unwrap_or(false)
                    && is_loadable_font(e.path())
            });
        if let Some(entry) = found {
            return Some(entry.into_path());
        }
    }
    None
}

/// One step of the font resolution chain.
pub trait FontStrategy {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// `Ok(Some)` on success, `Ok(None)` to defer to the next strategy.
    fn find(&self, request: &FontRequest) -> CaptioneerResult<Option<PathBuf>>;
}

/// Use the configured name directly when it is a path to an existing file.
pub struct ExplicitPath;

impl FontStrategy for ExplicitPath {
    fn name(&self) -> &'static str {
        "explicit-path"
    }

    fn find(&self, request: &FontRequest) -> CaptioneerResult<Option<PathBuf>> {
        if !request.is_path_like() {
            return Ok(None);
        }
        let path = PathBuf::from(&request.name);
        if path.is_file() {
            Ok(is_loadable_font(&path).then_some(path))
        } else {
            tracing::warn!(path = %path.display(), "Configured font file does not exist");
            Ok(None)
        }
    }
}

/// Search a set of directories for a font with a matching file stem.
pub struct DirectorySearch {
    label: &'static str,
    dirs: Vec<PathBuf>,
    max_depth: usize,
}

impl DirectorySearch {
    pub fn new(label: &'static str, dirs: Vec<PathBuf>, max_depth: usize) -> Self {
        Self {
            label,
            dirs,
            max_depth,
        }
    }

    /// `./fonts` and the user font cache, flat.
    pub fn local_cache() -> Self {
        Self::new("local-cache", vec![local_fonts_dir(), font_cache_dir()], 1)
    }

    /// Platform font directories, recursive.
    pub fn system() -> Self {
        Self::new("system", system_font_dirs(), 6)
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl FontStrategy for DirectorySearch {
    fn name(&self) -> &'static str {
        self.label
    }

    fn find(&self, request: &FontRequest) -> CaptioneerResult<Option<PathBuf>> {
        if request.is_path_like() {
            return Ok(None);
        }
        Ok(search_dirs(&self.dirs, &request.name, self.max_depth))
    }
}

/// Platform font directories.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut font_dirs = Vec::new();
    if cfg!(target_os = "macos") {
        font_dirs.push(PathBuf::from("/System/Library/Fonts"));
        font_dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = dirs::home_dir() {
            font_dirs.push(home.join("Library/Fonts"));
        }
    } else if cfg!(target_os = "windows") {
        let windir = std::env::var_os("WINDIR").unwrap_or_else(|| "C:\\Windows".into());
        font_dirs.push(PathBuf::from(windir).join("Fonts"));
    } else {
        font_dirs.push(PathBuf::from("/usr/share/fonts"));
        font_dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(data) = dirs::data_dir() {
            font_dirs.push(data.join("fonts"));
        }
        if let Some(home) = dirs::home_dir() {
            font_dirs.push(home.join(".fonts"));
        }
    }
    font_dirs
}

/// Re-run directory searches under a free substitute name.
pub struct Substitution {
    searches: Vec<DirectorySearch>,
}

impl Substitution {
    pub fn new(searches: Vec<DirectorySearch>) -> Self {
        Self { searches }
    }
}

impl FontStrategy for Substitution {
    fn name(&self) -> &'static str {
        "substitution"
    }

    fn find(&self, request: &FontRequest) -> CaptioneerResult<Option<PathBuf>> {
        let Some(substitute) = request.substitute() else {
            return Ok(None);
        };
        tracing::debug!(requested = %request.name, substitute = %substitute, "Trying font substitute");
        let sub_request = FontRequest::new(substitute);
        for search in &self.searches {
            if let Some(path) = search.find(&sub_request)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

/// Download from the Google Fonts CSS API into a cache directory.
pub struct RemoteDownload {
    cache_dir: PathBuf,
}

impl RemoteDownload {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

impl FontStrategy for RemoteDownload {
    fn name(&self) -> &'static str {
        "remote-download"
    }

    fn find(&self, request: &FontRequest) -> CaptioneerResult<Option<PathBuf>> {
        if request.is_path_like() {
            return Ok(None);
        }
        let (family, weight) = request.family_and_weight();
        let family = FontRequest::new(&family)
            .substitute()
            .map(|s| FontRequest::new(s).family_and_weight().0)
            .unwrap_or(family);
        let path = download_google_font(&family, Some(weight), &request.name, &self.cache_dir)?;
        Ok(Some(path))
    }
}

/// Last resort: bundled font, then well-known system fonts.
pub struct Fallback {
    candidates: Vec<PathBuf>,
}

impl Fallback {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }
}

impl Default for Fallback {
    fn default() -> Self {
        let mut candidates = vec![default_font_path()];
        candidates.extend(SYSTEM_FALLBACKS.iter().map(PathBuf::from));
        Self::new(candidates)
    }
}

impl FontStrategy for Fallback {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn find(&self, _request: &FontRequest) -> CaptioneerResult<Option<PathBuf>> {
        Ok(self
            .candidates
            .iter()
            .find(|p| p.is_file() && is_loadable_font(p))
            .cloned())
    }
}

/// Bundled default font location.
pub fn default_font_path() -> PathBuf {
    local_fonts_dir().join("Roboto-Black.ttf")
}

/// Ordered chain of font strategies.
pub struct FontResolver {
    strategies: Vec<Box<dyn FontStrategy>>,
}

impl FontResolver {
    pub fn new(strategies: Vec<Box<dyn FontStrategy>>) -> Self {
        Self { strategies }
    }

    /// Standard chain; `allow_download` controls the network step.
    pub fn with_defaults(allow_download: bool) -> Self {
        let mut strategies: Vec<Box<dyn FontStrategy>> = vec![
            Box::new(ExplicitPath),
            Box::new(DirectorySearch::local_cache()),
            Box::new(DirectorySearch::system()),
            Box::new(Substitution::new(vec![
                DirectorySearch::local_cache(),
                DirectorySearch::system(),
            ])),
        ];
        if allow_download {
            strategies.push(Box::new(RemoteDownload::new(font_cache_dir())));
        }
        strategies.push(Box::new(Fallback::default()));
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve `name` to the path of a font that loads. Strategy errors and
    /// unloadable results move on to the next strategy; an error is returned
    /// only when the whole chain comes up empty.
    pub fn resolve(&self, name: &str) -> CaptioneerResult<PathBuf> {
        let request = FontRequest::new(name);
        for strategy in &self.strategies {
            match strategy.find(&request) {
                Ok(Some(path)) if !is_loadable_font(&path) => {
                    tracing::warn!(
                        font = %request.name,
                        strategy = strategy.name(),
                        path = %path.display(),
                        "Font candidate does not load"
                    );
                }
                Ok(Some(path)) => {
                    tracing::info!(
                        font = %request.name,
                        strategy = strategy.name(),
                        path = %path.display(),
                        "Resolved font"
                    );
                    return Ok(path);
                }
                Ok(None) => {
                    tracing::debug!(font = %request.name, strategy = strategy.name(), "Font not found")
                }
                Err(e) => tracing::warn!(
                    font = %request.name,
                    strategy = strategy.name(),
                    error = %e,
                    "Font strategy failed"
                ),
            }
        }
        Err(CaptioneerError::font(format!(
            "no usable font found for '{}'; place a .ttf in {} or install a system font",
            request.name,
            default_font_path()
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )))
    }
}

/// Google Fonts CSS2 URL for a family and optional weight.
pub fn google_fonts_css_url(family: &str, weight: Option<u16>) -> String {
    let encoded = urlencoding::encode(family).replace("%20", "+");
    match weight {
        Some(w) if w != 400 => {
            format!("https://fonts.googleapis.com/css2?family={encoded}:wght@{w}")
        }
        _ => format!("https://fonts.googleapis.com/css2?family={encoded}"),
    }
}

fn font_url_regex() -> Option<&'static regex::Regex> {
    static RE: OnceLock<Option<regex::Regex>> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r#"url\(['"]?(https?://[^)'"\s]+)['"]?\)"#).ok())
        .as_ref()
}

/// First `url(...)` in a stylesheet, quoted or not.
pub fn first_font_url(css: &str) -> Option<String> {
    font_url_regex()?
        .captures(css)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Replace every non-alphanumeric character with `_`.
pub fn sanitize_font_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Download a Google Font and save it as `<sanitized save_as><ext>` in
/// `dest_dir`. Only `.ttf` and `.otf` files are accepted.
pub fn download_google_font(
    family: &str,
    weight: Option<u16>,
    save_as: &str,
    dest_dir: &Path,
) -> CaptioneerResult<PathBuf> {
    let client = reqwest::blocking::Client::builder()
        .user_agent("Mozilla/5.0")
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| CaptioneerError::font(format!("failed to build HTTP client: {e}")))?;

    let css_url = google_fonts_css_url(family, weight);
    tracing::info!(family, url = %css_url, "Querying Google Fonts");

    let response = client
        .get(&css_url)
        .send()
        .map_err(|e| CaptioneerError::font(format!("request to {css_url} failed: {e}")))?;
    if !response.status().is_success() {
        return Err(CaptioneerError::font(format!(
            "font '{family}' not found (HTTP {})",
            response.status()
        )));
    }
    let css = response
        .text()
        .map_err(|e| CaptioneerError::font(format!("failed to read stylesheet: {e}")))?;

    let font_url = first_font_url(&css).ok_or_else(|| {
        CaptioneerError::font(format!("no downloadable font URL in stylesheet for '{family}'"))
    })?;
    let ext = font_url
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !FONT_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CaptioneerError::font(format!(
            "unsupported font format '.{ext}' at {font_url}"
        )));
    }

    let bytes = client
        .get(&font_url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(|e| CaptioneerError::font(format!("failed to download {font_url}: {e}")))?;

    let file_name = format!("{}.{ext}", sanitize_font_name(save_as));
    let out_path = store_font(&bytes, dest_dir, &file_name)?;
    tracing::info!(family, path = %out_path.display(), bytes = bytes.len(), "Downloaded font");
    Ok(out_path)
}

/// Validate font bytes and move them into `dest_dir/file_name` through a
/// temporary file, so a failed or partial write never lands in the cache.
pub fn store_font(bytes: &[u8], dest_dir: &Path, file_name: &str) -> CaptioneerResult<PathBuf> {
    if !is_valid_font(bytes) {
        return Err(CaptioneerError::font(format!(
            "downloaded data for '{file_name}' is not a valid font"
        )));
    }
    std::fs::create_dir_all(dest_dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dest_dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    let out_path = dest_dir.join(file_name);
    tmp.persist(&out_path)
        .map_err(|e| CaptioneerError::font(format!("cannot save {}: {}", out_path.display(), e.error)))?;
    Ok(out_path)
}
