//! A single table's on-disk storage: one file per container, laid out as a
//! sequence of fixed-size `PAGE_SIZE` pages (see `common::page`).

use common::ids::{ContainerId, PageNum};
use common::page::Page;
use common::{CrustyError, TableSchema, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::RwLock;

/// The on-disk heap file backing one table (container).
pub(crate) struct HeapFile {
    file: RwLock<File>,
    pub container_id: ContainerId,
    pub schema: TableSchema,
    pub read_count: AtomicU16,
    pub write_count: AtomicU16,
}

impl HeapFile {
    /// Open (creating if needed) the heap file at `file_path` for `container_id`.
    pub(crate) fn new(
        file_path: PathBuf,
        container_id: ContainerId,
        schema: TableSchema,
    ) -> Result<Self, CrustyError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&file_path)?;
        Ok(HeapFile {
            file: RwLock::new(file),
            container_id,
            schema,
            read_count: AtomicU16::new(0),
            write_count: AtomicU16::new(0),
        })
    }

    /// Number of pages currently stored in the file.
    pub fn num_pages(&self) -> PageNum {
        let file = self.file.read().unwrap();
        let file_len = file.metadata().unwrap().len();
        (file_len as usize / PAGE_SIZE) as PageNum
    }

    /// Build a brand-new, empty page positioned after the last page
    /// currently on disk. The caller is responsible for writing it back via
    /// `write_page_to_file` once it holds data.
    pub(crate) fn allocate_page(&self) -> Page {
        Page::new(self.num_pages(), &self.schema)
    }

    /// Write `page` to its slot in the file, growing the file if `page`'s id
    /// is one past the current end.
    pub(crate) fn write_page_to_file(&self, page: &Page) -> Result<(), CrustyError> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut file = self.file.write().unwrap();
        let offset = page.page_id as u64 * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.to_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Read the page at `page_num` back from the file.
    pub(crate) fn read_page_from_file(&self, page_num: PageNum) -> Result<Page, CrustyError> {
        if page_num >= self.num_pages() {
            return Err(CrustyError::CrustyError(format!(
                "page {} out of range for container {}",
                page_num, self.container_id
            )));
        }
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let mut file = self.file.write().unwrap();
        let offset = page_num as u64 * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = [0u8; PAGE_SIZE];
        file.read_exact(&mut buffer)?;
        Ok(Page::from_bytes(&buffer, page_num, &self.schema))
    }
}
