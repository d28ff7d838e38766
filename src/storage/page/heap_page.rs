use std::sync::Arc;

use crate::common::{DbError, PageId, RecordId, Result, SlotId, PAGE_SIZE};
use crate::tuple::{Record, Schema};

/// Heap page layout:
///
/// +------------------+
/// | Header bitmap    |  ceil(slots / 8) bytes, bit i set = slot i in use
/// +------------------+
/// | [slot 0]         |  record_size bytes each
/// | [slot 1]         |
/// | ...              |
/// | [slot n-1]       |
/// +------------------+
/// | unused tail      |
/// +------------------+
///
/// slots = floor(PAGE_SIZE * 8 / (record_size * 8 + 1)); every slot costs its
/// record bytes plus one header bit. Bits are numbered from the least
/// significant bit of each header byte.
///
/// Deleting a record only clears its bit. The slot bytes stay behind but are
/// never returned again.
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    data: Box<[u8]>,
    num_slots: usize,
    header_size: usize,
}

impl HeapPage {
    /// Interprets `data` as a heap page holding records of `schema`.
    /// The buffer must be exactly PAGE_SIZE bytes.
    pub fn new(page_id: PageId, schema: Arc<Schema>, data: &[u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE, "Page data must be PAGE_SIZE bytes");
        let num_slots = Self::slots_per_page(&schema);
        Self {
            page_id,
            schema,
            data: data.into(),
            num_slots,
            header_size: Self::header_size_for(num_slots),
        }
    }

    /// Creates a page with every slot free.
    pub fn empty(page_id: PageId, schema: Arc<Schema>) -> Self {
        Self::new(page_id, schema, &Self::empty_page_data())
    }

    /// Returns the bytes of a page with every slot free.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    /// Returns the number of records of `schema` that fit on one page.
    pub fn slots_per_page(schema: &Schema) -> usize {
        (PAGE_SIZE * 8) / (schema.record_size() * 8 + 1)
    }

    /// Returns the size of the header bitmap for `num_slots` slots.
    pub fn header_size_for(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Returns whether the slot holds a live record.
    /// Slots outside the page are reported as unused.
    pub fn is_slot_used(&self, slot: SlotId) -> bool {
        let i = slot.as_usize();
        i < self.num_slots && self.data[i / 8] & (1 << (i % 8)) != 0
    }

    /// Sets or clears the header bit of a slot.
    pub fn set_slot_used(&mut self, slot: SlotId, used: bool) -> Result<()> {
        let i = self.check_slot(slot)?;
        if used {
            self.data[i / 8] |= 1 << (i % 8);
        } else {
            self.data[i / 8] &= !(1 << (i % 8));
        }
        Ok(())
    }

    /// Returns the number of free slots.
    pub fn num_empty_slots(&self) -> usize {
        self.num_slots - self.num_records()
    }

    /// Returns the number of live records.
    pub fn num_records(&self) -> usize {
        let full_bytes = self.num_slots / 8;
        let mut count: usize = self.data[..full_bytes]
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum();
        for i in full_bytes * 8..self.num_slots {
            if self.data[i / 8] & (1 << (i % 8)) != 0 {
                count += 1;
            }
        }
        count
    }

    /// Returns the record stored in `slot`, or None if the slot is free.
    pub fn record(&self, slot: SlotId) -> Result<Option<Record>> {
        self.check_slot(slot)?;
        if !self.is_slot_used(slot) {
            return Ok(None);
        }
        Ok(Some(self.read_slot(slot)))
    }

    /// Stores `record` in the first free slot and returns its new id.
    pub fn insert_record(&mut self, record: &Record) -> Result<RecordId> {
        if **record.schema() != *self.schema {
            return Err(DbError::SchemaMismatch(format!(
                "record schema ({}) does not match page schema ({})",
                record.schema(),
                self.schema
            )));
        }

        let slot = (0..self.num_slots)
            .map(|i| SlotId::new(i as u16))
            .find(|&s| !self.is_slot_used(s))
            .ok_or(DbError::PageFull(self.page_id))?;

        let offset = self.slot_offset(slot);
        let size = self.schema.record_size();
        let mut dst = &mut self.data[offset..offset + size];
        record.pack(&mut dst);
        self.set_slot_used(slot, true)?;

        Ok(RecordId::new(self.page_id, slot))
    }

    /// Frees the slot identified by `record_id`.
    pub fn delete_record(&mut self, record_id: RecordId) -> Result<()> {
        if record_id.page_id != self.page_id {
            return Err(DbError::UnknownPage(record_id.page_id));
        }
        self.check_slot(record_id.slot_id)?;
        if !self.is_slot_used(record_id.slot_id) {
            return Err(DbError::EmptySlot(record_id));
        }
        self.set_slot_used(record_id.slot_id, false)
    }

    /// Returns an iterator over the live records in increasing slot order.
    pub fn iter(&self) -> HeapPageIter<'_> {
        HeapPageIter {
            page: self,
            next_slot: 0,
        }
    }

    /// Returns the raw page bytes, exactly PAGE_SIZE long.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn check_slot(&self, slot: SlotId) -> Result<usize> {
        let i = slot.as_usize();
        if i >= self.num_slots {
            return Err(DbError::InvalidSlot {
                page: self.page_id,
                slot,
            });
        }
        Ok(i)
    }

    fn slot_offset(&self, slot: SlotId) -> usize {
        self.header_size + slot.as_usize() * self.schema.record_size()
    }

    fn read_slot(&self, slot: SlotId) -> Record {
        let offset = self.slot_offset(slot);
        let mut src = &self.data[offset..offset + self.schema.record_size()];
        let mut record = Record::unpack(Arc::clone(&self.schema), &mut src);
        record.set_record_id(Some(RecordId::new(self.page_id, slot)));
        record
    }
}

/// Iterator over the occupied slots of a [`HeapPage`].
pub struct HeapPageIter<'a> {
    page: &'a HeapPage,
    next_slot: usize,
}

impl Iterator for HeapPageIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_slot < self.page.num_slots {
            let slot = SlotId::new(self.next_slot as u16);
            self.next_slot += 1;
            if self.page.is_slot_used(slot) {
                return Some(self.page.read_slot(slot));
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a HeapPage {
    type Item = Record;
    type IntoIter = HeapPageIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
