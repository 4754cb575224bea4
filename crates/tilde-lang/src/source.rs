use smol_str::SmolStr;

use crate::arena::{Arena, ArenaId};

pub type FileId = ArenaId<SourceFile>;

/// A unit of template source handed to `Engine::compile`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    pub name: SmolStr,
    pub code: String,
}

/// Every source compiled by one engine, kept so diagnostics can point into it.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Arena<SourceFile>,
}

impl SourceMap {
    pub const UNKNOWN_FILE: &str = "<unknown>";

    pub fn add(&mut self, name: &str, code: &str) -> FileId {
        self.files.alloc(SourceFile {
            name: SmolStr::new(name),
            code: code.to_string(),
        })
    }

    pub fn get(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(file_id)
    }

    pub fn name(&self, file_id: FileId) -> SmolStr {
        self.get(file_id)
            .map(|file| file.name.clone())
            .unwrap_or_else(|| SmolStr::new(Self::UNKNOWN_FILE))
    }

    pub fn code(&self, file_id: FileId) -> &str {
        self.get(file_id).map(|file| file.code.as_str()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
