use std::cmp::Ordering;

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::iterator::{KeyRange, StorageIterator};
use crate::memtable::MemTable;
use crate::memtable::skiplist::{NodeId, SkipList};

/// Bidirectional, optionally range-bounded iterator over a [`MemTable`].
///
/// The read lock is taken inside each positioning call and dropped before
/// it returns, so the current key and value are copied out. A position left
/// behind by a `reset` of the table is detected and treated as exhausted.
pub struct MemTableIterator<'a, C> {
    table: Option<&'a MemTable<C>>,
    range: Option<KeyRange>,
    node: Option<NodeId>,
    generation: u64,
    forward: bool,
    key: Vec<u8>,
    value: Vec<u8>,
    err: Option<Error>,
}

impl<'a, C: Comparator> MemTableIterator<'a, C> {
    pub(crate) fn new(table: &'a MemTable<C>, range: Option<KeyRange>) -> Self {
        MemTableIterator {
            table: Some(table),
            range,
            node: None,
            generation: 0,
            forward: false,
            key: Vec::new(),
            value: Vec::new(),
            err: None,
        }
    }

    fn table(&mut self) -> Result<&'a MemTable<C>> {
        match self.table {
            Some(table) => Ok(table),
            None => {
                self.err = Some(Error::IteratorReleased);
                Err(Error::IteratorReleased)
            }
        }
    }

    /// Copy out the entry at `self.node`, dropping it if it falls outside
    /// the range on the checked side.
    fn fill(&mut self, list: &SkipList<C>, check_start: bool, check_limit: bool) -> bool {
        self.key.clear();
        self.value.clear();
        let Some(node) = self.node else {
            return false;
        };
        let key = list.node_key(node);
        if let Some(range) = &self.range {
            let cmp = list.comparator();
            let past_limit = check_limit
                && range
                    .limit
                    .as_deref()
                    .is_some_and(|limit| cmp.compare(key, limit) != Ordering::Less);
            let before_start = check_start
                && range
                    .start
                    .as_deref()
                    .is_some_and(|start| cmp.compare(key, start) == Ordering::Less);
            if past_limit || before_start {
                self.node = None;
                return false;
            }
        }
        self.key.extend_from_slice(key);
        self.value.extend_from_slice(list.node_value(node));
        self.generation = list.generation();
        true
    }
}

impl<C: Comparator> StorageIterator for MemTableIterator<'_, C> {
    fn first(&mut self) -> Result<bool> {
        let table = self.table()?;
        self.forward = true;
        let list = table.list().read();
        self.node = match self.range.as_ref().and_then(|r| r.start.as_deref()) {
            Some(start) => list.find_ge(start).0,
            None => list.first_node(),
        };
        Ok(self.fill(&list, false, true))
    }

    fn last(&mut self) -> Result<bool> {
        let table = self.table()?;
        self.forward = false;
        let list = table.list().read();
        self.node = match self.range.as_ref().and_then(|r| r.limit.as_deref()) {
            Some(limit) => list.find_lt(limit),
            None => list.find_last(),
        };
        Ok(self.fill(&list, true, false))
    }

    fn seek(&mut self, key: &[u8]) -> Result<bool> {
        let table = self.table()?;
        self.forward = true;
        let list = table.list().read();
        let target = match self.range.as_ref().and_then(|r| r.start.as_deref()) {
            Some(start) if list.comparator().compare(key, start) == Ordering::Less => start,
            _ => key,
        };
        self.node = list.find_ge(target).0;
        Ok(self.fill(&list, false, true))
    }

    fn next(&mut self) -> Result<bool> {
        let table = self.table()?;
        let Some(node) = self.node else {
            if !self.forward {
                return self.first();
            }
            return Ok(false);
        };
        self.forward = true;
        let list = table.list().read();
        self.node = if self.generation != list.generation() {
            None
        } else if list.is_linked(node) {
            list.next_node(node)
        } else {
            list.find_gt(&self.key)
        };
        Ok(self.fill(&list, false, true))
    }

    fn prev(&mut self) -> Result<bool> {
        let table = self.table()?;
        if self.node.is_none() {
            if self.forward {
                return self.last();
            }
            return Ok(false);
        }
        self.forward = false;
        let list = table.list().read();
        self.node = if self.generation == list.generation() {
            list.find_lt(&self.key)
        } else {
            None
        };
        Ok(self.fill(&list, true, false))
    }

    fn key(&self) -> &[u8] {
        &self.key
    }

    fn value(&self) -> &[u8] {
        &self.value
    }

    fn is_valid(&self) -> bool {
        self.node.is_some()
    }

    fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn release(&mut self) {
        if self.table.take().is_some() {
            self.node = None;
            self.key.clear();
            self.value.clear();
        }
    }
}
