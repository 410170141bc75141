// File-based durable store
//
// One file per stored page version, grouped in a folder per session:
//
//   <root>/<app>-filestore/<low>/<high>/<session>/<app>-pm-<pagemap>-p-<id>-v-<version>-a-<ajax>.data
//
// `low` and `high` spread sessions over two levels of folders derived from
// a hash of the session id. File contents are the raw serialized page.
//
// The store keeps an index of the files written per session, oldest first,
// to enforce the per-session size budget. The index is saved to the store
// folder on destroy and read back (then removed) when a store is created.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use pagekeep_core::PageId;
use pagekeep_error::{result_to_option, StoreError, StoreResult};

use crate::config::StoreSettings;
use crate::page::{PageContext, SerializedPage, StoredPage};
use crate::store::PageStore;

/// Page map segment used in file names
pub const DEFAULT_PAGE_MAP: &str = "null";

/// Name of the index file inside the store folder
pub const INDEX_FILE_NAME: &str = "filestore-index.json";

const FILE_EXTENSION: &str = ".data";
const HASH_MODULUS: u32 = 9973;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FileEntry {
    page_id: PageId,
    version: u32,
    size: u64,
}

/// Files written for one session, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionIndex {
    files: VecDeque<FileEntry>,
    total_size: u64,
}

impl SessionIndex {
    fn record(&mut self, entry: FileEntry) {
        self.forget(entry.page_id, Some(entry.version));
        self.total_size += entry.size;
        self.files.push_back(entry);
    }

    /// Version of the most recent write of a page
    fn last_written(&self, page_id: PageId) -> Option<u32> {
        self.files.iter().rev().find(|file| file.page_id == page_id).map(|file| file.version)
    }

    /// Forget one version of a page, or all of them when `version` is `None`
    fn forget(&mut self, page_id: PageId, version: Option<u32>) {
        let mut removed = 0;
        self.files.retain(|file| {
            let matches = file.page_id == page_id && version.map_or(true, |v| v == file.version);
            if matches {
                removed += file.size;
            }
            !matches
        });
        self.total_size -= removed;
    }
}

pub struct FilePageStore {
    application_name: String,
    store_folder: PathBuf,
    max_size_per_session: u64,
    sessions: Mutex<HashMap<String, SessionIndex>>,
}

impl FilePageStore {
    /// Create a store under `<folder>/<app>-filestore`, restoring a saved index if present
    pub fn new(settings: &StoreSettings) -> StoreResult<Self> {
        let store_folder = settings
            .file_store_folder
            .join(format!("{}-filestore", settings.application_name));
        fs::create_dir_all(&store_folder).map_err(|e| StoreError::io("", None, e))?;

        let store = Self {
            application_name: settings.application_name.clone(),
            store_folder,
            max_size_per_session: settings.max_size_per_session,
            sessions: Mutex::new(HashMap::new()),
        };
        store.load_index();
        Ok(store)
    }

    /// Folder holding every session folder
    pub fn store_folder(&self) -> &Path {
        &self.store_folder
    }

    /// Folder of a session's page files.
    ///
    /// Ids that are empty or only dots once sanitised would point at a hash
    /// folder or above it, and are rejected.
    pub fn session_folder(&self, session_id: &str) -> StoreResult<PathBuf> {
        let sanitized = sanitize_session_id(session_id);
        if sanitized.chars().all(|c| c == '.') {
            return Err(StoreError::InvalidSessionId(session_id.to_string()));
        }
        let hash = session_hash(&sanitized);
        Ok(self
            .store_folder
            .join((hash % HASH_MODULUS).to_string())
            .join(((hash / HASH_MODULUS) % HASH_MODULUS).to_string())
            .join(sanitized))
    }

    fn file_prefix(&self, page_id: PageId) -> String {
        format!("{}-pm-{}-p-{}-v-", self.application_name, DEFAULT_PAGE_MAP, page_id)
    }

    /// File name of a page version
    pub fn page_file_name(&self, page_id: PageId, version: u32) -> String {
        format!("{}{}-a-0{}", self.file_prefix(page_id), version, FILE_EXTENSION)
    }

    /// Total bytes recorded for a session
    pub fn session_size(&self, context: &PageContext) -> u64 {
        self.sessions
            .lock()
            .get(context.session_id())
            .map_or(0, |index| index.total_size)
    }

    /// Versions of a page present on disk, ascending
    pub fn stored_versions(&self, context: &PageContext, page_id: PageId) -> Vec<u32> {
        let Ok(folder) = self.session_folder(context.session_id()) else {
            return Vec::new();
        };
        let prefix = self.file_prefix(page_id);
        let mut versions: Vec<u32> = match fs::read_dir(&folder) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter_map(|name| parse_version(&name, &prefix))
                .collect(),
            Err(_) => Vec::new(),
        };
        versions.sort_unstable();
        versions
    }

    /// Read an exact page version. A failed read is logged and treated as a miss.
    pub fn get_page_version(&self, context: &PageContext, page_id: PageId, version: u32) -> Option<SerializedPage> {
        let path = self
            .session_folder(context.session_id())
            .ok()?
            .join(self.page_file_name(page_id, version));
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!(session_id = context.session_id(), page_id, version, error = %e, "could not read page file");
                return None;
            }
        };
        Some(SerializedPage::new(page_id, version, String::new(), data))
    }

    fn write_page(&self, context: &PageContext, page: &SerializedPage) -> StoreResult<u64> {
        let folder = self.session_folder(context.session_id())?;
        fs::create_dir_all(&folder).map_err(|e| StoreError::io(context.session_id(), Some(page.page_id), e))?;
        let path = folder.join(self.page_file_name(page.page_id, page.version));
        fs::write(&path, &page.data).map_err(|e| StoreError::io(context.session_id(), Some(page.page_id), e))?;
        Ok(page.data.len() as u64)
    }

    /// Drop the oldest files of the session until it fits its budget.
    /// `keep` is the file just written, it is never dropped.
    fn enforce_size_limit(&self, context: &PageContext, index: &mut SessionIndex, keep: &FileEntry) {
        let Ok(folder) = self.session_folder(context.session_id()) else {
            return;
        };
        let mut position = 0;
        while index.total_size > self.max_size_per_session && position < index.files.len() {
            if index.files[position] == *keep {
                position += 1;
                continue;
            }
            let Some(oldest) = index.files.remove(position) else {
                break;
            };
            index.total_size -= oldest.size;
            let path = folder.join(self.page_file_name(oldest.page_id, oldest.version));
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(session_id = context.session_id(), page_id = oldest.page_id, version = oldest.version, error = %e, "could not evict page file");
                }
            }
            debug!(session_id = context.session_id(), page_id = oldest.page_id, version = oldest.version, "evicted page file");
        }
    }

    /// Remove the hash folders above a deleted session folder once they are empty
    fn remove_empty_parents(&self, session_folder: &Path) {
        let mut current = session_folder.parent();
        while let Some(folder) = current {
            if folder == self.store_folder {
                break;
            }
            // fails on non-empty folders, which is the stop condition
            if fs::remove_dir(folder).is_err() {
                break;
            }
            current = folder.parent();
        }
    }

    fn load_index(&self) {
        let path = self.store_folder.join(INDEX_FILE_NAME);
        if !path.exists() {
            return;
        }
        let loaded = fs::File::open(&path)
            .map_err(|e| e.to_string())
            .and_then(|file| {
                serde_json::from_reader::<_, HashMap<String, SessionIndex>>(BufReader::new(file))
                    .map_err(|e| e.to_string())
            });
        match loaded {
            Ok(sessions) => {
                debug!(sessions = sessions.len(), "loaded file store index");
                *self.sessions.lock() = sessions;
            }
            Err(e) => error!(path = %path.display(), error = %e, "could not load file store index"),
        }
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "could not remove file store index");
        }
    }

    fn save_index(&self) -> io::Result<()> {
        if !self.store_folder.exists() {
            return Ok(());
        }
        let path = self.store_folder.join(INDEX_FILE_NAME);
        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &*self.sessions.lock())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl PageStore for FilePageStore {
    fn can_be_asynchronous(&self, _context: &PageContext) -> bool {
        true
    }

    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        let page = match page {
            StoredPage::Serialized(page) => page,
            StoredPage::Live(handle) => {
                return Err(StoreError::LivePageRejected { page_id: handle.page_id() })
            }
        };

        let mut sessions = self.sessions.lock();
        let size = self.write_page(context, &page)?;
        debug!(session_id = context.session_id(), page_id = page.page_id, version = page.version, size, "wrote page file");

        let entry = FileEntry { page_id: page.page_id, version: page.version, size };
        let index = sessions.entry(context.session_id().to_string()).or_default();
        index.record(entry.clone());
        self.enforce_size_limit(context, index, &entry);
        Ok(())
    }

    /// The most recently written version of the page. Without an index
    /// entry, as for files left by a store that was not shut down, the
    /// highest version on disk is used.
    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>> {
        let indexed = self
            .sessions
            .lock()
            .get(context.session_id())
            .and_then(|index| index.last_written(page_id));
        let Some(version) = indexed.or_else(|| self.stored_versions(context, page_id).pop()) else {
            return Ok(None);
        };
        Ok(self
            .get_page_version(context, page_id, version)
            .map(StoredPage::Serialized))
    }

    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()> {
        let mut sessions = self.sessions.lock();
        let folder = self.session_folder(context.session_id())?;
        for version in self.stored_versions(context, page_id) {
            let path = folder.join(self.page_file_name(page_id, version));
            fs::remove_file(&path).map_err(|e| StoreError::io(context.session_id(), Some(page_id), e))?;
        }
        if let Some(index) = sessions.get_mut(context.session_id()) {
            index.forget(page_id, None);
        }
        Ok(())
    }

    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()> {
        let folder = self.session_folder(context.session_id())?;
        let mut sessions = self.sessions.lock();
        sessions.remove(context.session_id());
        match fs::remove_dir_all(&folder) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(context.session_id(), None, e)),
        }
        self.remove_empty_parents(&folder);
        debug!(session_id = context.session_id(), "removed session folder");
        Ok(())
    }

    fn destroy(&self) {
        let saved = self.save_index().map_err(|e| StoreError::io("", None, e));
        result_to_option!(saved, "could not save file store index");
    }
}

/// Replace characters that are not safe in folder names
pub fn sanitize_session_id(session_id: &str) -> String {
    session_id.replace(['*', '/', ':'], "_")
}

/// 31-based polynomial string hash over UTF-16 code units, made non-negative
fn session_hash(session_id: &str) -> u32 {
    let hash = session_id
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)));
    hash.unsigned_abs()
}

fn parse_version(file_name: &str, prefix: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(prefix)?.strip_suffix(FILE_EXTENSION)?;
    let (version, _ajax) = rest.split_once("-a-")?;
    version.parse().ok()
}
