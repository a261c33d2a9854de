//! The on-disk / in-memory representation of a heap page: a fixed-size byte
//! array split into a bitmap header (one bit per slot, marking occupancy)
//! and a body of fixed-size tuple slots. The page never sees I/O directly —
//! that is `heapstore::heapfile`'s job; this module only knows how to pack
//! and unpack `Tuple`s against a `TableSchema`.

use crate::ids::{PageNum, SlotId, TransactionId};
use crate::{DataType, Field, TableSchema, Tuple, PAGE_SIZE, STRING_LEN};

/// Number of fixed-size slots that fit on a page for a tuple of `tuple_size` bytes.
pub fn slots_per_page(tuple_size: usize) -> usize {
    (PAGE_SIZE * 8) / (tuple_size * 8 + 1)
}

fn header_len_bytes(slot_count: usize) -> usize {
    (slot_count + 7) / 8
}

/// A fixed-size heap page. Body layout is `slot_count` consecutive
/// `tuple_size`-byte slots; occupancy of slot `i` is bit `i` of the header
/// bitmap (bit 0 of byte 0 is slot 0).
#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: PageNum,
    tuple_size: usize,
    slot_count: usize,
    header: Vec<u8>,
    body: Vec<u8>,
    /// Transaction that last mutated this page, if any.
    pub dirtied_by: Option<TransactionId>,
}

impl Page {
    /// Create a new, empty page for the given schema.
    pub fn new(page_id: PageNum, schema: &TableSchema) -> Self {
        let tuple_size = schema.byte_size();
        let slot_count = slots_per_page(tuple_size);
        Self {
            page_id,
            tuple_size,
            slot_count,
            header: vec![0u8; header_len_bytes(slot_count)],
            body: vec![0u8; slot_count * tuple_size],
            dirtied_by: None,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn is_occupied(&self, slot: SlotId) -> bool {
        let slot = slot as usize;
        let byte = self.header[slot / 8];
        (byte >> (slot % 8)) & 1 == 1
    }

    fn set_occupied(&mut self, slot: SlotId, occupied: bool) {
        let slot = slot as usize;
        let mask = 1u8 << (slot % 8);
        if occupied {
            self.header[slot / 8] |= mask;
        } else {
            self.header[slot / 8] &= !mask;
        }
    }

    fn first_free_slot(&self) -> Option<SlotId> {
        (0..self.slot_count).find(|&s| !self.is_occupied(s as SlotId)).map(|s| s as SlotId)
    }

    /// Number of occupied slots.
    pub fn num_values(&self) -> usize {
        (0..self.slot_count).filter(|&s| self.is_occupied(s as SlotId)).count()
    }

    /// Insert a tuple into the first free slot. Returns the slot id, or
    /// `None` if the page is full.
    pub fn add_value(
        &mut self,
        schema: &TableSchema,
        tuple: &Tuple,
        tid: TransactionId,
    ) -> Option<SlotId> {
        let slot = self.first_free_slot()?;
        self.write_slot(schema, slot, tuple);
        self.set_occupied(slot, true);
        self.dirtied_by = Some(tid);
        Some(slot)
    }

    fn write_slot(&mut self, schema: &TableSchema, slot: SlotId, tuple: &Tuple) {
        let start = slot as usize * self.tuple_size;
        let mut off = start;
        for (attr, field) in schema.attributes().zip(tuple.field_vals()) {
            match (attr.dtype(), field) {
                (DataType::Int, Field::IntField(v)) => {
                    self.body[off..off + 4].copy_from_slice(&v.to_be_bytes());
                    off += 4;
                }
                (DataType::String, Field::StringField(s)) => {
                    let bytes = s.as_bytes();
                    let len = bytes.len().min(STRING_LEN);
                    self.body[off..off + 4].copy_from_slice(&(len as u32).to_be_bytes());
                    off += 4;
                    self.body[off..off + len].copy_from_slice(&bytes[..len]);
                    for b in self.body[off + len..off + STRING_LEN].iter_mut() {
                        *b = 0;
                    }
                    off += STRING_LEN;
                }
                _ => panic!("tuple field type does not match schema"),
            }
        }
    }

    fn read_slot(&self, schema: &TableSchema, slot: SlotId) -> Tuple {
        let start = slot as usize * self.tuple_size;
        let mut off = start;
        let mut fields = Vec::with_capacity(schema.size());
        for attr in schema.attributes() {
            match attr.dtype() {
                DataType::Int => {
                    let mut buf = [0u8; 4];
                    buf.copy_from_slice(&self.body[off..off + 4]);
                    fields.push(Field::IntField(i32::from_be_bytes(buf)));
                    off += 4;
                }
                DataType::String => {
                    let mut lenbuf = [0u8; 4];
                    lenbuf.copy_from_slice(&self.body[off..off + 4]);
                    let len = u32::from_be_bytes(lenbuf) as usize;
                    off += 4;
                    let s = String::from_utf8_lossy(&self.body[off..off + len]).to_string();
                    fields.push(Field::StringField(s));
                    off += STRING_LEN;
                }
            }
        }
        Tuple::new(fields)
    }

    /// Get the tuple at `slot`, if occupied.
    pub fn get_value(&self, schema: &TableSchema, slot: SlotId) -> Option<Tuple> {
        if self.is_occupied(slot) {
            Some(self.read_slot(schema, slot))
        } else {
            None
        }
    }

    /// Remove the tuple at `slot`. No-op (not an error) if already empty.
    pub fn delete_value(&mut self, slot: SlotId, tid: TransactionId) {
        if self.is_occupied(slot) {
            self.set_occupied(slot, false);
            self.dirtied_by = Some(tid);
        }
    }

    /// Iterate the occupied slots in ascending slot order, decoding each
    /// against `schema`.
    pub fn iter<'a>(&'a self, schema: &'a TableSchema) -> PageIter<'a> {
        PageIter {
            page: self,
            schema,
            next_slot: 0,
        }
    }

    /// Serialize the page to exactly `PAGE_SIZE` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PAGE_SIZE);
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
        out.resize(PAGE_SIZE, 0);
        out
    }

    /// Rebuild a page from a raw `PAGE_SIZE`-byte buffer. `page_id` is
    /// supplied by the caller (heap files don't store it in the page body).
    pub fn from_bytes(bytes: &[u8], page_id: PageNum, schema: &TableSchema) -> Self {
        let tuple_size = schema.byte_size();
        let slot_count = slots_per_page(tuple_size);
        let hlen = header_len_bytes(slot_count);
        let mut header = vec![0u8; hlen];
        header.copy_from_slice(&bytes[0..hlen]);
        let mut body = vec![0u8; slot_count * tuple_size];
        body.copy_from_slice(&bytes[hlen..hlen + slot_count * tuple_size]);
        Self {
            page_id,
            tuple_size,
            slot_count,
            header,
            body,
            dirtied_by: None,
        }
    }
}

/// Iterator over the occupied slots of a page, yielding `(SlotId, Tuple)`.
pub struct PageIter<'a> {
    page: &'a Page,
    schema: &'a TableSchema,
    next_slot: usize,
}

impl<'a> Iterator for PageIter<'a> {
    type Item = (SlotId, Tuple);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_slot < self.page.slot_count {
            let slot = self.next_slot as SlotId;
            self.next_slot += 1;
            if let Some(t) = self.page.get_value(self.schema, slot) {
                return Some((slot, t));
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;
    use crate::DataType;

    fn schema() -> TableSchema {
        TableSchema::from_vecs(vec!["a", "b"], vec![DataType::Int, DataType::Int])
    }

    #[test]
    fn page_create() {
        let s = schema();
        let p = Page::new(0, &s);
        assert_eq!(p.num_values(), 0);
        assert!(p.slot_count() > 0);
    }

    #[test]
    fn page_insert_get() {
        let s = schema();
        let mut p = Page::new(0, &s);
        let tid = TransactionId::new();
        let t = int_vec_to_tuple(vec![1, 2]);
        let slot = p.add_value(&s, &t, tid).unwrap();
        assert_eq!(slot, 0);
        let got = p.get_value(&s, slot).unwrap();
        assert_eq!(got.field_vals, t.field_vals);
    }

    #[test]
    fn page_fill_and_reject() {
        let s = schema();
        let mut p = Page::new(0, &s);
        let tid = TransactionId::new();
        let cap = p.slot_count();
        for i in 0..cap {
            let t = int_vec_to_tuple(vec![i as i32, i as i32]);
            assert!(p.add_value(&s, &t, tid).is_some());
        }
        let overflow = int_vec_to_tuple(vec![0, 0]);
        assert!(p.add_value(&s, &overflow, tid).is_none());
    }

    #[test]
    fn page_delete_then_reuse_slot() {
        let s = schema();
        let mut p = Page::new(0, &s);
        let tid = TransactionId::new();
        let t = int_vec_to_tuple(vec![1, 2]);
        let slot = p.add_value(&s, &t, tid).unwrap();
        p.delete_value(slot, tid);
        assert!(p.get_value(&s, slot).is_none());
        let t2 = int_vec_to_tuple(vec![3, 4]);
        let slot2 = p.add_value(&s, &t2, tid).unwrap();
        assert_eq!(slot2, slot);
    }

    #[test]
    fn page_iter_order() {
        let s = schema();
        let mut p = Page::new(0, &s);
        let tid = TransactionId::new();
        for i in 0..5 {
            p.add_value(&s, &int_vec_to_tuple(vec![i, i]), tid);
        }
        let collected: Vec<i32> = p
            .iter(&s)
            .map(|(_, t)| t.get_field(0).unwrap().unwrap_int_field())
            .collect();
        assert_eq!(collected, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn page_byte_roundtrip() {
        let s = schema();
        let mut p = Page::new(3, &s);
        let tid = TransactionId::new();
        p.add_value(&s, &int_vec_to_tuple(vec![10, 20]), tid);
        p.add_value(&s, &int_vec_to_tuple(vec![30, 40]), tid);
        let bytes = p.to_bytes();
        assert_eq!(bytes.len(), PAGE_SIZE);
        let p2 = Page::from_bytes(&bytes, 3, &s);
        let v1: Vec<Tuple> = p.iter(&s).map(|(_, t)| t).collect();
        let v2: Vec<Tuple> = p2.iter(&s).map(|(_, t)| t).collect();
        assert_eq!(v1, v2);
    }

    #[test]
    fn slots_per_page_matches_formula() {
        // tuple_size = 8 (two ints): floor((4096*8)/(8*8+1)) = floor(32768/65) = 504
        assert_eq!(slots_per_page(8), 504);
    }
}
