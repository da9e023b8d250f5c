use super::{PostingBytes, PostingList, PostingReadTable, PostingTable};
use crate::error::Result;
use redb::ReadableTable;
use roaring::RoaringTreemap;

// Text keys
impl PostingReadTable<&str> for redb::ReadOnlyTable<&'static str, PostingList> {
    fn get_rows(&self, key: &str) -> Result<RoaringTreemap> {
        if let Some(guard) = self.get(key)? {
            Ok(guard.value().decode()?.into_rows())
        } else {
            Ok(RoaringTreemap::new())
        }
    }
}

impl<'txn> PostingReadTable<&str> for redb::Table<'txn, &'static str, PostingList> {
    fn get_rows(&self, key: &str) -> Result<RoaringTreemap> {
        if let Some(guard) = self.get(key)? {
            Ok(guard.value().decode()?.into_rows())
        } else {
            Ok(RoaringTreemap::new())
        }
    }
}

impl<'txn> PostingTable<&str> for redb::Table<'txn, &'static str, PostingList> {
    fn merge_rows(&mut self, key: &str, rows: &RoaringTreemap) -> Result<()> {
        let mut merged = self.get_rows(key)?;
        merged.extend(rows.iter());

        let encoded = PostingList::from(merged).encode()?;
        Self::insert(self, key, PostingBytes::new(&encoded))?;
        Ok(())
    }
}

// Integer keys
impl PostingReadTable<u64> for redb::ReadOnlyTable<u64, PostingList> {
    fn get_rows(&self, key: u64) -> Result<RoaringTreemap> {
        if let Some(guard) = self.get(key)? {
            Ok(guard.value().decode()?.into_rows())
        } else {
            Ok(RoaringTreemap::new())
        }
    }
}

impl<'txn> PostingReadTable<u64> for redb::Table<'txn, u64, PostingList> {
    fn get_rows(&self, key: u64) -> Result<RoaringTreemap> {
        if let Some(guard) = self.get(key)? {
            Ok(guard.value().decode()?.into_rows())
        } else {
            Ok(RoaringTreemap::new())
        }
    }
}

impl<'txn> PostingTable<u64> for redb::Table<'txn, u64, PostingList> {
    fn merge_rows(&mut self, key: u64, rows: &RoaringTreemap) -> Result<()> {
        let mut merged = self.get_rows(key)?;
        merged.extend(rows.iter());

        let encoded = PostingList::from(merged).encode()?;
        Self::insert(self, key, PostingBytes::new(&encoded))?;
        Ok(())
    }
}
