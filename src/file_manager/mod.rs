// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Persistence of projects, sequences and settings on a storage volume.
//!
//! The volume is a directory. Slot files live in one directory per file
//! type and are named after their slot number (`PROJECTS/003.PRO`).
//!
//! Every file is a [`FileHeader`] followed by a versioned body and the body
//! hash:
//!
//! ```text
//! u8 file type | u8 header version | name[NAME_LENGTH] | u32 data version | body | u32 hash
//! ```

pub mod settings;

pub use settings::Settings;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::project::Project;
use crate::sequence::{ArpSequence, CurveSequence, LogicSequence, NoteSequence, Sequence};
use crate::serialize::{DataVersion, Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::{name_from_bytes, name_to_bytes};
use crate::types::ModelEnum;
use crate::NAME_LENGTH;

/// Slots per file type
pub const SLOT_COUNT: usize = 128;

const HEADER_VERSION: u8 = 0;
const SLOT_CACHE_SIZE: usize = 4;
const SETTINGS_FILE: &str = "SETTINGS.DAT";
const LAST_PROJECT_FILE: &str = "LAST.DAT";

crate::model_enum! {
    /// Content type recorded in the file header
    pub enum FileType {
        Project => "Project",
        UserScale => "User Scale",
        NoteSequence => "Note Sequence",
        CurveSequence => "Curve Sequence",
        LogicSequence => "Logic Sequence",
        ArpSequence => "Arp Sequence",
        Settings => "Settings",
    }
}

impl FileType {
    fn directory(self) -> &'static str {
        match self {
            FileType::Project => "PROJECTS",
            FileType::UserScale => "SCALES",
            FileType::NoteSequence
            | FileType::CurveSequence
            | FileType::LogicSequence
            | FileType::ArpSequence => "SEQS",
            FileType::Settings => "",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            FileType::Project => "PRO",
            FileType::UserScale => "SCA",
            FileType::NoteSequence => "NSQ",
            FileType::CurveSequence => "CSQ",
            FileType::LogicSequence => "LSQ",
            FileType::ArpSequence => "ASQ",
            FileType::Settings => "DAT",
        }
    }
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no volume at {0:?}")]
    NoVolume(PathBuf),

    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("expected a {expected} file, found type id {found}")]
    InvalidFileType { expected: FileType, found: u8 },

    #[error("data version {version} is newer than supported version {supported}")]
    VersionTooNew {
        version: DataVersion,
        supported: DataVersion,
    },

    #[error("checksum mismatch in {0:?}")]
    ChecksumMismatch(PathBuf),

    #[error("slot {0} out of range")]
    InvalidSlot(usize),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Leading record of every file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub file_type: FileType,
    pub version: u8,
    pub name: [u8; NAME_LENGTH],
}

impl FileHeader {
    pub const SIZE: usize = 2 + NAME_LENGTH;

    pub fn new(file_type: FileType, name: &str) -> Self {
        Self {
            file_type,
            version: HEADER_VERSION,
            name: name_to_bytes(name),
        }
    }

    pub fn name(&self) -> &str {
        name_from_bytes(&self.name)
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&[self.file_type.index() as u8, self.version])?;
        out.write_all(&self.name)
    }

    /// Read a header, rejecting unknown type ids
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self, FsError> {
        let mut buf = [0u8; Self::SIZE];
        input.read_exact(&mut buf)?;
        let type_id = buf[0];
        if type_id as usize >= FileType::COUNT {
            return Err(FsError::InvalidFileType {
                expected: FileType::Project,
                found: type_id,
            });
        }
        let mut name = [0u8; NAME_LENGTH];
        name.copy_from_slice(&buf[2..]);
        Ok(Self {
            file_type: FileType::from_index(type_id as usize),
            version: buf[1],
            name,
        })
    }
}

/// Header summary of a slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotInfo {
    pub used: bool,
    pub name: String,
}

#[derive(Debug, Clone)]
struct CachedSlot {
    ticket: u32,
    file_type: FileType,
    slot: usize,
    info: SlotInfo,
}

/// Sequences that can be stored in their own slot files
pub trait SequenceFile: Sequence {
    const FILE_TYPE: FileType;
}

impl SequenceFile for NoteSequence {
    const FILE_TYPE: FileType = FileType::NoteSequence;
}

impl SequenceFile for CurveSequence {
    const FILE_TYPE: FileType = FileType::CurveSequence;
}

impl SequenceFile for LogicSequence {
    const FILE_TYPE: FileType = FileType::LogicSequence;
}

impl SequenceFile for ArpSequence {
    const FILE_TYPE: FileType = FileType::ArpSequence;
}

type TaskExecute = Box<dyn FnOnce(&mut FileManager) -> Result<(), FsError> + Send>;
type TaskResult = Box<dyn FnOnce(Result<(), FsError>) + Send>;

struct Task {
    execute: TaskExecute,
    result: TaskResult,
}

/// File access rooted at the storage volume
pub struct FileManager {
    root: PathBuf,
    cache: [Option<CachedSlot>; SLOT_CACHE_SIZE],
    next_ticket: u32,
    pending: Option<Task>,
}

impl FileManager {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            cache: Default::default(),
            next_ticket: 0,
            pending: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The volume exists or can be created
    pub fn volume_available(&self) -> bool {
        self.root.is_dir() || self.root.parent().map_or(false, Path::is_dir)
    }

    /// The volume is ready for reading and writing
    pub fn volume_mounted(&self) -> bool {
        self.root.is_dir()
    }

    /// Erase the volume and recreate it empty
    pub fn format(&mut self) -> Result<(), FsError> {
        if !self.volume_available() {
            return Err(FsError::NoVolume(self.root.clone()));
        }
        warn!(root = ?self.root, "formatting volume");
        if self.root.is_dir() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)?;
        self.invalidate_all_slots();
        Ok(())
    }

    /// Path of a slot file
    pub fn slot_path(&self, file_type: FileType, slot: usize) -> PathBuf {
        self.root
            .join(file_type.directory())
            .join(format!("{:03}.{}", slot, file_type.extension()))
    }

    // projects

    pub fn write_project(&mut self, project: &Project, slot: usize) -> Result<(), FsError> {
        let path = self.checked_slot_path(FileType::Project, slot)?;
        self.write_project_path(project, &path)?;
        self.invalidate_slot(FileType::Project, slot);
        self.write_last_project(slot)?;
        info!(slot, name = project.name(), "project saved");
        Ok(())
    }

    pub fn read_project(&mut self, project: &mut Project, slot: usize) -> Result<(), FsError> {
        let path = self.checked_slot_path(FileType::Project, slot)?;
        self.read_project_path(project, &path)?;
        self.write_last_project(slot)?;
        info!(slot, name = project.name(), "project loaded");
        Ok(())
    }

    pub fn write_project_path(&self, project: &Project, path: &Path) -> Result<(), FsError> {
        self.write_file(path, FileHeader::new(FileType::Project, project.name()), project)
    }

    /// Load a project file; on failure the project is left cleared
    pub fn read_project_path(&self, project: &mut Project, path: &Path) -> Result<(), FsError> {
        project.clear();
        let result = self.read_file(path, FileType::Project, project);
        if result.is_err() {
            project.clear();
        }
        result
    }

    /// Load the project saved or loaded most recently, returning its slot
    pub fn read_last_project(&mut self, project: &mut Project) -> Result<usize, FsError> {
        let path = self.root.join(LAST_PROJECT_FILE);
        let bytes = fs::read(&path).map_err(|e| map_open_error(e, &path))?;
        let slot = bytes
            .first()
            .copied()
            .ok_or_else(|| FsError::NotFound(path.clone()))? as usize;
        self.read_project(project, slot)?;
        Ok(slot)
    }

    fn write_last_project(&self, slot: usize) -> Result<(), FsError> {
        fs::write(self.root.join(LAST_PROJECT_FILE), [slot as u8])?;
        Ok(())
    }

    // sequences

    pub fn write_sequence<S: SequenceFile>(
        &mut self,
        sequence: &S,
        name: &str,
        slot: usize,
    ) -> Result<(), FsError> {
        let path = self.checked_slot_path(S::FILE_TYPE, slot)?;
        self.write_sequence_path(sequence, name, &path)?;
        self.invalidate_slot(S::FILE_TYPE, slot);
        debug!(slot, file_type = %S::FILE_TYPE, "sequence saved");
        Ok(())
    }

    pub fn read_sequence<S: SequenceFile>(&self, sequence: &mut S, slot: usize) -> Result<(), FsError> {
        let path = self.checked_slot_path(S::FILE_TYPE, slot)?;
        self.read_sequence_path(sequence, &path)
    }

    pub fn write_sequence_path<S: SequenceFile>(
        &self,
        sequence: &S,
        name: &str,
        path: &Path,
    ) -> Result<(), FsError> {
        self.write_file(path, FileHeader::new(S::FILE_TYPE, name), sequence)
    }

    /// Load a sequence file; on failure the sequence is left cleared
    pub fn read_sequence_path<S: SequenceFile>(&self, sequence: &mut S, path: &Path) -> Result<(), FsError> {
        sequence.clear();
        let result = self.read_file(path, S::FILE_TYPE, sequence);
        if result.is_err() {
            sequence.clear();
        }
        result
    }

    // settings

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn write_settings(&self, settings: &Settings) -> Result<(), FsError> {
        self.write_file(&self.settings_path(), FileHeader::new(FileType::Settings, "SETTINGS"), settings)
    }

    pub fn read_settings(&self, settings: &mut Settings) -> Result<(), FsError> {
        self.read_file(&self.settings_path(), FileType::Settings, settings)
    }

    // slot information

    /// Whether a slot holds a file, and its name
    pub fn slot_info(&mut self, file_type: FileType, slot: usize) -> SlotInfo {
        if let Some(info) = self.cached_slot(file_type, slot) {
            return info;
        }
        let path = self.slot_path(file_type, slot);
        let info = File::open(&path)
            .ok()
            .and_then(|file| FileHeader::read_from(&mut BufReader::new(file)).ok())
            .filter(|header| header.file_type == file_type)
            .map(|header| SlotInfo {
                used: true,
                name: header.name().to_string(),
            })
            .unwrap_or_default();
        self.cache_slot(file_type, slot, info.clone());
        info
    }

    pub fn slot_used(&mut self, file_type: FileType, slot: usize) -> bool {
        self.slot_info(file_type, slot).used
    }

    fn cached_slot(&mut self, file_type: FileType, slot: usize) -> Option<SlotInfo> {
        let ticket = self.next_cached_slot_ticket();
        let entry = self
            .cache
            .iter_mut()
            .flatten()
            .find(|entry| entry.file_type == file_type && entry.slot == slot)?;
        entry.ticket = ticket;
        Some(entry.info.clone())
    }

    fn cache_slot(&mut self, file_type: FileType, slot: usize, info: SlotInfo) {
        let ticket = self.next_cached_slot_ticket();
        let entry = CachedSlot {
            ticket,
            file_type,
            slot,
            info,
        };
        if let Some(free) = self.cache.iter_mut().find(|e| e.is_none()) {
            *free = Some(entry);
        } else if let Some(oldest) = self
            .cache
            .iter_mut()
            .min_by_key(|e| e.as_ref().map_or(0, |e| e.ticket))
        {
            *oldest = Some(entry);
        }
    }

    fn invalidate_slot(&mut self, file_type: FileType, slot: usize) {
        for entry in self.cache.iter_mut() {
            if matches!(entry, Some(e) if e.file_type == file_type && e.slot == slot) {
                *entry = None;
            }
        }
    }

    fn invalidate_all_slots(&mut self) {
        self.cache = Default::default();
    }

    fn next_cached_slot_ticket(&mut self) -> u32 {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.next_ticket
    }

    /// Number of slot lookups currently cached
    pub fn cached_slot_count(&self) -> usize {
        self.cache.iter().flatten().count()
    }

    // tasks

    /// Queue a file operation; rejected while another one is pending
    pub fn task<E, F>(&mut self, execute: E, result: F) -> bool
    where
        E: FnOnce(&mut FileManager) -> Result<(), FsError> + Send + 'static,
        F: FnOnce(Result<(), FsError>) + Send + 'static,
    {
        if self.pending.is_some() {
            warn!("file task rejected, another task is pending");
            return false;
        }
        self.pending = Some(Task {
            execute: Box::new(execute),
            result: Box::new(result),
        });
        true
    }

    pub fn task_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run the pending task, if any, and deliver its result
    pub fn process_task(&mut self) {
        if let Some(task) = self.pending.take() {
            let outcome = (task.execute)(self);
            if let Err(err) = &outcome {
                warn!(error = %err, "file task failed");
            }
            (task.result)(outcome);
        }
    }

    // file access

    fn checked_slot_path(&self, file_type: FileType, slot: usize) -> Result<PathBuf, FsError> {
        if slot >= SLOT_COUNT {
            return Err(FsError::InvalidSlot(slot));
        }
        if !self.volume_mounted() {
            return Err(FsError::NoVolume(self.root.clone()));
        }
        Ok(self.slot_path(file_type, slot))
    }

    fn write_file<T: Persist>(&self, path: &Path, header: FileHeader, body: &T) -> Result<(), FsError> {
        if !self.volume_mounted() {
            return Err(FsError::NoVolume(self.root.clone()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        header.write_to(&mut out)?;
        let mut writer = VersionedWriter::new(out)?;
        body.write(&mut writer)?;
        writer.write_hash()?;
        writer.into_inner()?.flush()?;
        debug!(path = ?path, file_type = %header.file_type, "file written");
        Ok(())
    }

    fn read_file<T: Persist>(&self, path: &Path, file_type: FileType, body: &mut T) -> Result<(), FsError> {
        if !self.volume_mounted() {
            return Err(FsError::NoVolume(self.root.clone()));
        }
        let file = File::open(path).map_err(|e| map_open_error(e, path))?;
        let mut input = BufReader::new(file);

        let header = FileHeader::read_from(&mut input).map_err(|err| match err {
            FsError::InvalidFileType { found, .. } => FsError::InvalidFileType {
                expected: file_type,
                found,
            },
            other => other,
        })?;
        if header.file_type != file_type {
            return Err(FsError::InvalidFileType {
                expected: file_type,
                found: header.file_type.index() as u8,
            });
        }

        let mut reader = VersionedReader::new(input)?;
        let version = reader.data_version();
        if version > ProjectVersion::LATEST {
            warn!(path = ?path, version, "file written by newer firmware");
            return Err(FsError::VersionTooNew {
                version,
                supported: ProjectVersion::LATEST,
            });
        }
        body.read(&mut reader)?;
        if !reader.check_hash()? {
            warn!(path = ?path, "checksum mismatch");
            return Err(FsError::ChecksumMismatch(path.to_path_buf()));
        }
        debug!(path = ?path, file_type = %file_type, version, "file read");
        Ok(())
    }
}

fn map_open_error(err: io::Error, path: &Path) -> FsError {
    if err.kind() == io::ErrorKind::NotFound {
        FsError::NotFound(path.to_path_buf())
    } else {
        FsError::Io(err)
    }
}
