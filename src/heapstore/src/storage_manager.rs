//! The concrete buffer-pool-free storage manager: one `HeapFile` per
//! container, read and written page-at-a-time directly against disk. There
//! is no page cache here — every `get_page`/`insert_tuple` round-trips to
//! the filesystem; caching is left to the OS page cache, matching the
//! teaching-engine scope (§6, §9 Non-goals: eviction policy is out of scope).

use crate::heapfile::HeapFile;
use crate::heapfileiter::HeapFileIterator;
use common::ids::{ContainerId, PageId, PageNum, Permissions, TransactionId, ValueId};
use common::page::Page;
use common::storage_trait::StorageTrait;
use common::testutil::gen_random_dir;
use common::{CrustyError, TableSchema};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// A disk-backed storage manager, one `HeapFile` per registered container.
pub struct StorageManager {
    containers: RwLock<HashMap<ContainerId, Arc<HeapFile>>>,
    pub storage_path: String,
    is_temp: bool,
}

impl StorageManager {
    fn container_path(&self, container_id: ContainerId) -> PathBuf {
        let mut path = PathBuf::from(&self.storage_path);
        fs::create_dir_all(&path).ok();
        path.push(format!("{}.hf", container_id));
        path
    }

    fn get_heapfile(&self, container_id: ContainerId) -> Result<Arc<HeapFile>, CrustyError> {
        let containers = self.containers.read().unwrap();
        containers.get(&container_id).cloned().ok_or_else(|| {
            CrustyError::CrustyError(format!("container {} is not registered", container_id))
        })
    }
}

impl StorageTrait for StorageManager {
    type ValIterator = HeapFileIterator;

    fn new(storage_path: String) -> Self {
        StorageManager {
            containers: RwLock::new(HashMap::new()),
            storage_path,
            is_temp: false,
        }
    }

    fn new_test_sm() -> Self {
        let storage_path = gen_random_dir().to_string_lossy().to_string();
        debug!("heapstore: new temp storage manager at {}", storage_path);
        StorageManager {
            containers: RwLock::new(HashMap::new()),
            storage_path,
            is_temp: true,
        }
    }

    fn register_container(&self, table_id: ContainerId, schema: TableSchema) -> Result<(), CrustyError> {
        let mut containers = self.containers.write().unwrap();
        if containers.contains_key(&table_id) {
            return Ok(());
        }
        let path = self.container_path(table_id);
        let hf = HeapFile::new(path, table_id, schema)?;
        containers.insert(table_id, Arc::new(hf));
        Ok(())
    }

    fn remove_container(&self, table_id: ContainerId) -> Result<(), CrustyError> {
        let mut containers = self.containers.write().unwrap();
        if let Some(hf) = containers.remove(&table_id) {
            drop(hf);
            let path = self.container_path(table_id);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn get_page(&self, _tid: TransactionId, page_id: PageId, _perm: Permissions) -> Result<Page, CrustyError> {
        let hf = self.get_heapfile(page_id.container_id)?;
        debug!("heapstore: fetching page {:?}", page_id);
        hf.read_page_from_file(page_id.page_num)
    }

    fn write_page(&self, table_id: ContainerId, page: Page, _tid: TransactionId) -> Result<(), CrustyError> {
        let hf = self.get_heapfile(table_id)?;
        debug!("heapstore: writing page {} of container {}", page.page_id, table_id);
        hf.write_page_to_file(&page)
    }

    fn insert_tuple(&self, tid: TransactionId, table_id: ContainerId, tuple: common::Tuple) -> Result<ValueId, CrustyError> {
        let hf = self.get_heapfile(table_id)?;
        let schema = hf.schema.clone();
        let num_pages = hf.num_pages();

        for page_num in 0..num_pages {
            let mut page = hf.read_page_from_file(page_num)?;
            if let Some(slot_id) = page.add_value(&schema, &tuple, tid) {
                hf.write_page_to_file(&page)?;
                return Ok(ValueId::new_slot(table_id, page_num, slot_id));
            }
        }

        let mut page = hf.allocate_page();
        let slot_id = page
            .add_value(&schema, &tuple, tid)
            .ok_or_else(|| CrustyError::CrustyError("tuple does not fit on an empty page".to_string()))?;
        let page_num = page.page_id;
        hf.write_page_to_file(&page)?;
        debug!("heapstore: grew container {} to {} pages", table_id, page_num + 1);
        Ok(ValueId::new_slot(table_id, page_num, slot_id))
    }

    fn delete_tuple(&self, tid: TransactionId, rid: ValueId) -> Result<PageId, CrustyError> {
        let page_num = rid
            .page_id
            .ok_or_else(|| CrustyError::CrustyError("record id has no page".to_string()))?;
        let slot_id = rid
            .slot_id
            .ok_or_else(|| CrustyError::CrustyError("record id has no slot".to_string()))?;
        let hf = self.get_heapfile(rid.container_id)?;
        let mut page = hf.read_page_from_file(page_num)?;
        page.delete_value(slot_id, tid);
        hf.write_page_to_file(&page)?;
        Ok(PageId::new(rid.container_id, page_num))
    }

    fn get_num_pages(&self, table_id: ContainerId) -> PageNum {
        match self.get_heapfile(table_id) {
            Ok(hf) => hf.num_pages(),
            Err(_) => 0,
        }
    }

    fn get_iterator(&self, tid: TransactionId, table_id: ContainerId, _perm: Permissions) -> Self::ValIterator {
        let hf = self
            .get_heapfile(table_id)
            .expect("get_iterator called on unregistered container");
        HeapFileIterator::new(table_id, tid, hf)
    }

    fn transaction_complete(&self, _tid: TransactionId) -> Result<(), CrustyError> {
        Ok(())
    }

    fn reset(&self) -> Result<(), CrustyError> {
        let mut containers = self.containers.write().unwrap();
        containers.clear();
        if self.is_temp {
            fs::remove_dir_all(&self.storage_path).ok();
        }
        Ok(())
    }

    fn shutdown(&self) {
        if self.is_temp {
            fs::remove_dir_all(&self.storage_path).ok();
        }
    }
}

impl Drop for StorageManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::*;
    use common::DataType;

    fn int_schema() -> TableSchema {
        TableSchema::from_vecs(vec!["a", "b"], vec![DataType::Int, DataType::Int])
    }

    #[test]
    fn hs_sm_insert_and_get() {
        init();
        let sm = StorageManager::new_test_sm();
        let cid = 1;
        sm.register_container(cid, int_schema()).unwrap();
        let tid = TransactionId::new();

        let rid1 = sm.insert_tuple(tid, cid, int_vec_to_tuple(vec![1, 2])).unwrap();
        assert_eq!(1, sm.get_num_pages(cid));
        assert_eq!(Some(0), rid1.page_id);
        assert_eq!(Some(0), rid1.slot_id);

        let rid2 = sm.insert_tuple(tid, cid, int_vec_to_tuple(vec![3, 4])).unwrap();
        assert_eq!(1, sm.get_num_pages(cid));
        assert_eq!(Some(1), rid2.slot_id);

        let page_id = PageId::new(cid, 0);
        let page = sm.get_page(tid, page_id, Permissions::ReadOnly).unwrap();
        assert_eq!(page.num_values(), 2);
    }

    #[test]
    fn hs_sm_delete_frees_slot() {
        init();
        let sm = StorageManager::new_test_sm();
        let cid = 1;
        sm.register_container(cid, int_schema()).unwrap();
        let tid = TransactionId::new();

        let rid = sm.insert_tuple(tid, cid, int_vec_to_tuple(vec![1, 2])).unwrap();
        sm.delete_tuple(tid, rid).unwrap();
        let rid2 = sm.insert_tuple(tid, cid, int_vec_to_tuple(vec![5, 6])).unwrap();
        assert_eq!(rid.slot_id, rid2.slot_id);
    }

    #[test]
    fn hs_sm_iterator_sees_all_inserted() {
        init();
        let sm = StorageManager::new_test_sm();
        let cid = 1;
        sm.register_container(cid, int_schema()).unwrap();
        let tid = TransactionId::new();

        for i in 0..20 {
            sm.insert_tuple(tid, cid, int_vec_to_tuple(vec![i, i * 2])).unwrap();
        }
        let count = sm.get_iterator(tid, cid, Permissions::ReadOnly).count();
        assert_eq!(count, 20);
    }
}
