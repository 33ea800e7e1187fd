use std::any::{self, Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use twilight_model::id::marker::GuildMarker;
use twilight_model::id::Id;

use crate::utils::prelude::*;

/// JSON file access.
struct JsonFile;

impl JsonFile {
    /// Replace the file with `value`.
    ///
    /// The data goes to a temporary file first, which is then renamed over the target,
    /// so the target holds either the old or the new contents.
    fn write<T>(value: &T, path: impl AsRef<Path>) -> AnyResult<()>
    where
        T: Serialize,
    {
        let path = path.as_ref();

        let dir = path.parent().with_context(|| {
            format!(
                "Storage path does not have a valid parent dir: '{}'",
                path.display()
            )
        })?;

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create dir: '{}'", dir.display()))?;

        let temp = path.with_extension(format!("{}.tmp", Self::extension()));

        let written = Self::write_new(value, &temp).and_then(|()| {
            fs::rename(&temp, path)
                .with_context(|| format!("Failed to replace file: '{}'", path.display()))
        });

        if written.is_err() {
            // Nothing to do if it was never created.
            let _ = fs::remove_file(&temp);
        }

        written
    }

    fn write_new<T>(value: &T, path: &Path) -> AnyResult<()>
    where
        T: Serialize,
    {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file: '{}'", path.display()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .with_context(|| format!("Failed to serialize data: '{}'", path.display()))?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        Ok(())
    }

    fn read<T>(path: impl AsRef<Path>) -> AnyResult<T>
    where
        T: DeserializeOwned,
    {
        let path = path.as_ref();
        let mut value = String::new();
        {
            let mut file = OpenOptions::new()
                .read(true)
                .open(path)
                .with_context(|| format!("Failed to open path '{}'", path.display()))?;
            file.read_to_string(&mut value)?;
        }
        let value = serde_json::from_str::<T>(&value)
            .with_context(|| format!("Failed to deserialize data: '{}'", path.display()))?;
        Ok(value)
    }

    /// Read the file, or write and return a default value if the file does not exist yet.
    /// An existing file that fails to load is an error and is left untouched.
    fn read_or_create<T>(path: impl AsRef<Path>) -> AnyResult<T>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let path = path.as_ref();

        if path.exists() {
            return Self::read::<T>(path);
        }

        info!("Creating a default storage file: '{}'", path.display());
        Self::write(&T::default(), path).context("Failed to create storage file")?;
        Ok(T::default())
    }

    const fn extension() -> &'static str {
        "json"
    }
}

/// Types that can be kept in the storage.
pub trait Storable: Serialize + DeserializeOwned + Any + Send + 'static {}

impl<T> Storable for T where T: Serialize + DeserializeOwned + Any + Send + 'static {}

type NameMap = HashMap<TypeId, &'static str>;
type DataMap = HashMap<TypeId, Box<dyn Any + Send>>;
type PathMap = HashMap<PathBuf, DataMap>;

/// File backed data storage with an in-memory cache.
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    names: NameMap,
    data: Mutex<PathMap>,
}

impl Storage {
    const GLOBAL: &'static str = "global";
    const GUILDS: &'static str = "guilds";

    /// Create a new storage with `root` as the data directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            names: NameMap::new(),
            data: Mutex::new(PathMap::new()),
        }
    }

    /// Get global storage.
    ///
    /// # Notes
    /// Returned `Directory` holds a mutex lock to `self`.
    pub fn global(&self) -> AnyResult<Directory<'_>> {
        self.directory(self.root.join(Self::GLOBAL))
    }

    /// Get guild storage by id.
    ///
    /// # Notes
    /// Returned `Directory` holds a mutex lock to `self`.
    pub fn by_guild_id(&self, guild_id: Id<GuildMarker>) -> AnyResult<Directory<'_>> {
        self.directory(self.root.join(Self::GUILDS).join(guild_id.to_string()))
    }

    fn directory(&self, dir: PathBuf) -> AnyResult<Directory<'_>> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("Storage lock is poisoned"))?;

        Ok(Directory {
            dir,
            names: &self.names,
            data,
        })
    }

    /// Bind a type to a storage name.
    ///
    /// # Errors
    /// If type is already bound to a name.
    pub fn bind<T: 'static>(&mut self, name: &'static str) -> AnyResult<()> {
        let id = TypeId::of::<T>();
        let ty_name = any::type_name::<T>();
        match self.names.entry(id) {
            Entry::Occupied(o) => Err(anyhow::anyhow!(
                "Cannot map storage name '{name}' to type '{ty_name}', because the type is \
                 already mapped with a different name '{other}'",
                other = o.get()
            )),
            Entry::Vacant(v) => {
                v.insert(name);
                Ok(())
            },
        }
    }

    /// Returns self as a result of storage bindings validation.
    pub fn validated(self) -> AnyResult<Self> {
        let mut seen = HashSet::new();
        self.names
            .values()
            .find(|&n| !seen.insert(n.to_lowercase()))
            .map(|n| Err(anyhow::anyhow!("Duplicate storage name found '{n}'")))
            .unwrap_or(Ok(self))
    }
}

#[derive(Debug, Error)]
#[error("Value not found for type '{0}'")]
struct ValueNotFoundError(&'static str);

impl ValueNotFoundError {
    fn new<T>() -> Self {
        Self(any::type_name::<T>())
    }
}

/// Represents a directory of storage files on disk.
///
/// # Notes
/// This holds a mutex lock to the original storage.
#[derive(Debug)]
pub struct Directory<'a> {
    dir: PathBuf,
    names: &'a NameMap,
    data: MutexGuard<'a, PathMap>,
}

impl Directory<'_> {
    /// Returns a reference to a type from memory, if it exists.
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Storable,
    {
        let id = TypeId::of::<T>();
        self.data
            .get(&self.dir)
            .and_then(|d| d.get(&id))
            .and_then(|d| d.downcast_ref())
    }

    /// Get file path of the type, if it is bound to a name.
    pub fn path<T>(&self) -> AnyResult<PathBuf>
    where
        T: Storable,
    {
        let id = TypeId::of::<T>();
        let ty_name = any::type_name::<T>();
        let mut path = self
            .names
            .get(&id)
            .with_context(|| format!("Missing storage file name for '{ty_name}'"))
            .map(|name| self.dir.join(name))?;
        path.set_extension(JsonFile::extension());
        Ok(path)
    }

    /// Write a type value to disk, then replace the value in memory.
    ///
    /// Memory is left untouched if writing fails.
    pub fn save<T>(&mut self, value: T) -> AnyResult<()>
    where
        T: Storable,
    {
        self.path::<T>()
            .and_then(|path| JsonFile::write(&value, path))?;
        self.insert(value);
        Ok(())
    }

    /// Get a type from memory, otherwise try load from storage file.
    /// If the file does not exist, create default.
    pub fn load_or_default<T>(&mut self) -> AnyResult<&T>
    where
        T: Default + Storable,
    {
        if self.get::<T>().is_none() {
            let path = self.path::<T>()?;
            let value = JsonFile::read_or_create::<T>(path).context("Failed to read storage file")?;
            self.insert(value);
        }

        self.get::<T>().with_context(|| ValueNotFoundError::new::<T>())
    }

    fn insert<T>(&mut self, value: T)
    where
        T: Storable,
    {
        let id = TypeId::of::<T>();
        self.data
            .entry(self.dir.to_owned())
            .or_default()
            .insert(id, Box::new(value));
    }
}
