//! Named asset sources: bytes compiled into the binary, or files under a root
//! directory. Both hand out an [`AssetStream`] that knows its length up front.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
};

use crate::AssetError;

/// Readable view of one named asset. Dropping it releases the underlying handle.
pub struct AssetStream<'a> {
    name: String,
    len: u64,
    reader: Box<dyn Read + 'a>,
}

impl<'a> AssetStream<'a> {
    pub fn new(name: impl Into<String>, len: u64, reader: impl Read + 'a) -> Self {
        Self {
            name: name.into(),
            len,
            reader: Box::new(reader),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length reported by the source when the stream was opened.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Read for AssetStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Anything that can resolve an asset name to bytes.
pub trait AssetSource: Send + Sync {
    fn open(&self, name: &str) -> Result<AssetStream<'_>, AssetError>;

    fn contains(&self, name: &str) -> bool {
        self.open(name).is_ok()
    }
}

/// Read a named asset in full.
///
/// The buffer is sized from the stream's reported length and filled in one pass.
pub fn read_embedded_asset_bytes(source: &dyn AssetSource, name: &str) -> Result<Vec<u8>, AssetError> {
    let mut stream = source.open(name)?;
    let len = usize::try_from(stream.len()).map_err(|_| AssetError::TooLarge {
        name: name.to_string(),
        len: stream.len(),
    })?;

    let mut bytes = vec![0u8; len];
    stream.read_exact(&mut bytes).map_err(|source| AssetError::Io {
        name: name.to_string(),
        source,
    })?;

    log::debug!("Read asset '{}' ({} bytes)", name, bytes.len());
    Ok(bytes)
}

/// Assets baked into the binary with `include_bytes!`.
#[derive(Clone, Debug, Default)]
pub struct EmbeddedAssets {
    entries: HashMap<&'static str, &'static [u8]>,
}

impl EmbeddedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, bytes: &'static [u8]) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: &'static str, bytes: &'static [u8]) {
        if self.entries.insert(name, bytes).is_some() {
            log::warn!("Embedded asset '{}' registered twice; keeping the latest", name);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AssetSource for EmbeddedAssets {
    fn open(&self, name: &str) -> Result<AssetStream<'_>, AssetError> {
        let bytes = self
            .entries
            .get(name)
            .copied()
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        Ok(AssetStream::new(name, bytes.len() as u64, Cursor::new(bytes)))
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Build an [`EmbeddedAssets`] from `name => path` pairs; paths are relative to
/// the invoking source file, as with `include_bytes!`.
#[macro_export]
macro_rules! embedded_assets {
    ($($name:literal => $path:literal),* $(,)?) => {{
        let assets = $crate::embedded::EmbeddedAssets::new();
        $(let assets = assets.with($name, include_bytes!($path));)*
        assets
    }};
}

/// Assets looked up as plain files directly under `root`.
#[derive(Clone, Debug)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        // Names are flat; anything that could walk out of the root is refused.
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(AssetError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

impl AssetSource for DirectoryAssets {
    fn open(&self, name: &str) -> Result<AssetStream<'_>, AssetError> {
        let path = self.resolve(name)?;
        let file = File::open(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => AssetError::NotFound(name.to_string()),
            _ => AssetError::Io {
                name: name.to_string(),
                source,
            },
        })?;
        let len = file
            .metadata()
            .map_err(|source| AssetError::Io {
                name: name.to_string(),
                source,
            })?
            .len();
        Ok(AssetStream::new(name, len, file))
    }

    fn contains(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }
}
