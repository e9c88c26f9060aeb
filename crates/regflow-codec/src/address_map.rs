/*!
 * Sparse register maps for 16 bit device address spaces.
 *
 * An [`AddressMap`] holds whatever subset of the address space has been read
 * from or staged for a device. Addresses are sparse, so bulk reads return
 * `Option` per address rather than failing on the first gap. The
 * [`AddressMapU16`] variant additionally rejects any value outside the range
 * of one 16 bit register, which keeps a staged write image valid for the
 * wire.
 */
use std::collections::BTreeMap;
use std::ops::Range;

use regflow_core::types::Address;

use crate::error::{Error, Result};

/// Read and write access to a sparse run of 16 bit device registers
///
/// Parameter codecs are generic over this trait so the same codec can decode
/// from a raw read image and encode into a validated write image.
pub trait Registers {
    /// Get the value at an address, failing if it is not populated
    fn get(&self, address: Address) -> Result<i64>;

    /// Get the values over an address range, `None` where unpopulated
    fn get_range(&self, range: Range<Address>) -> Vec<Option<i64>>;

    /// Set the value at an address
    ///
    /// Passing `None` is a no-op, so callers can thread optional values
    /// through without branching.
    fn set<V: Into<Option<i64>>>(&mut self, address: Address, value: V) -> Result<()>;

    /// Set the values over an address range
    ///
    /// Addresses are zipped against `values`; the shorter side wins, so
    /// excess values are silently ignored and excess addresses keep their
    /// current contents. `None` entries are no-ops as in [`Registers::set`].
    fn set_range(&mut self, range: Range<Address>, values: &[Option<i64>]) -> Result<()>;

    /// Check whether an address is populated
    fn contains(&self, address: Address) -> bool;
}

/// A sparse mapping from register address to scalar value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMap {
    registers: BTreeMap<Address, i64>,
}

impl AddressMap {
    /// Create a new empty address map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an address map from existing register contents
    pub fn from_registers(registers: BTreeMap<Address, i64>) -> Self {
        Self { registers }
    }

    /// The number of populated addresses
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Check whether no address is populated
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Iterate over the populated addresses in ascending order
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.registers.keys().copied()
    }

    /// Iterate over populated address and value pairs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (Address, i64)> + '_ {
        self.registers.iter().map(|(&address, &value)| (address, value))
    }

    /// Remove an address, returning its value if it was populated
    pub fn remove(&mut self, address: Address) -> Option<i64> {
        self.registers.remove(&address)
    }

    /// Remove every address in a range, skipping unpopulated ones
    pub fn remove_range(&mut self, range: Range<Address>) {
        for address in range {
            self.registers.remove(&address);
        }
    }

    /// Union another map into this one
    ///
    /// Fails if any address is populated in both maps, in which case neither
    /// map is modified. The conflicting addresses are reported in ascending
    /// order.
    pub fn merge(&mut self, other: &AddressMap) -> Result<()> {
        let overlapping: Vec<Address> = other
            .registers
            .keys()
            .filter(|address| self.registers.contains_key(address))
            .copied()
            .collect();
        if !overlapping.is_empty() {
            return Err(Error::MergeConflict {
                addresses: overlapping,
            });
        }
        for (&address, &value) in &other.registers {
            self.registers.insert(address, value);
        }
        Ok(())
    }

    /// Overwrite this map's entries with another map's
    ///
    /// Unless `force` is set, every address in `other` must already be
    /// populated here; otherwise the update fails before any entry is
    /// written and the missing addresses are reported in ascending order.
    pub fn update(&mut self, other: &AddressMap, force: bool) -> Result<()> {
        if !force {
            let unknown: Vec<Address> = other
                .registers
                .keys()
                .filter(|address| !self.registers.contains_key(address))
                .copied()
                .collect();
            if !unknown.is_empty() {
                return Err(Error::UnknownAddresses { addresses: unknown });
            }
        }
        for (&address, &value) in &other.registers {
            self.registers.insert(address, value);
        }
        Ok(())
    }

    /// Write a contiguous block of values starting at an address
    pub fn save_block(&mut self, start: Address, values: &[i64]) -> Result<()> {
        for (offset, &value) in values.iter().enumerate() {
            self.registers.insert(start + offset as Address, value);
        }
        Ok(())
    }
}

impl Registers for AddressMap {
    fn get(&self, address: Address) -> Result<i64> {
        self.registers
            .get(&address)
            .copied()
            .ok_or(Error::MissingAddress(address))
    }

    fn get_range(&self, range: Range<Address>) -> Vec<Option<i64>> {
        range
            .map(|address| self.registers.get(&address).copied())
            .collect()
    }

    fn set<V: Into<Option<i64>>>(&mut self, address: Address, value: V) -> Result<()> {
        if let Some(value) = value.into() {
            self.registers.insert(address, value);
        }
        Ok(())
    }

    fn set_range(&mut self, range: Range<Address>, values: &[Option<i64>]) -> Result<()> {
        for (address, value) in range.zip(values.iter()) {
            if let Some(value) = value {
                self.registers.insert(address, *value);
            }
        }
        Ok(())
    }

    fn contains(&self, address: Address) -> bool {
        self.registers.contains_key(&address)
    }
}

/// A sparse register map that only accepts values of one 16 bit register
///
/// Every write is validated against `0..=0xFFFF`. Bulk writes validate the
/// whole slice before touching the map, so a failed write leaves the map
/// exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMapU16 {
    map: AddressMap,
}

fn check_register(address: Address, value: i64) -> Result<()> {
    if !(0..=0xFFFF).contains(&value) {
        return Err(Error::RegisterOverflow { address, value });
    }
    Ok(())
}

impl AddressMapU16 {
    /// Create a new empty address map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an address map from existing register contents
    ///
    /// Fails on the first value outside `0..=0xFFFF`.
    pub fn from_registers(registers: BTreeMap<Address, i64>) -> Result<Self> {
        for (&address, &value) in &registers {
            check_register(address, value)?;
        }
        Ok(Self {
            map: AddressMap::from_registers(registers),
        })
    }

    /// Borrow the underlying unvalidated map
    pub fn as_map(&self) -> &AddressMap {
        &self.map
    }

    /// Unwrap into the underlying unvalidated map
    pub fn into_inner(self) -> AddressMap {
        self.map
    }

    /// The number of populated addresses
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check whether no address is populated
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over the populated addresses in ascending order
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.map.addresses()
    }

    /// Iterate over populated address and value pairs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (Address, i64)> + '_ {
        self.map.iter()
    }

    /// Remove an address, returning its value if it was populated
    pub fn remove(&mut self, address: Address) -> Option<i64> {
        self.map.remove(address)
    }

    /// Remove every address in a range, skipping unpopulated ones
    pub fn remove_range(&mut self, range: Range<Address>) {
        self.map.remove_range(range)
    }

    /// Union another validated map into this one
    ///
    /// Same overlap rules as [`AddressMap::merge`]. Taking a validated map
    /// as input means no value check is needed here.
    pub fn merge(&mut self, other: &AddressMapU16) -> Result<()> {
        self.map.merge(&other.map)
    }

    /// Overwrite this map's entries with another validated map's
    ///
    /// Same force rules as [`AddressMap::update`].
    pub fn update(&mut self, other: &AddressMapU16, force: bool) -> Result<()> {
        self.map.update(&other.map, force)
    }

    /// Write a contiguous block of values starting at an address
    ///
    /// The whole block is validated before any value is written.
    pub fn save_block(&mut self, start: Address, values: &[i64]) -> Result<()> {
        for (offset, &value) in values.iter().enumerate() {
            check_register(start + offset as Address, value)?;
        }
        self.map.save_block(start, values)
    }
}

impl TryFrom<AddressMap> for AddressMapU16 {
    type Error = Error;

    fn try_from(map: AddressMap) -> Result<Self> {
        for (address, value) in map.iter() {
            check_register(address, value)?;
        }
        Ok(Self { map })
    }
}

impl Registers for AddressMapU16 {
    fn get(&self, address: Address) -> Result<i64> {
        self.map.get(address)
    }

    fn get_range(&self, range: Range<Address>) -> Vec<Option<i64>> {
        self.map.get_range(range)
    }

    fn set<V: Into<Option<i64>>>(&mut self, address: Address, value: V) -> Result<()> {
        match value.into() {
            Some(value) => {
                check_register(address, value)?;
                self.map.set(address, value)
            }
            None => Ok(()),
        }
    }

    fn set_range(&mut self, range: Range<Address>, values: &[Option<i64>]) -> Result<()> {
        for (address, value) in range.clone().zip(values.iter()) {
            if let Some(value) = value {
                check_register(address, *value)?;
            }
        }
        self.map.set_range(range, values)
    }

    fn contains(&self, address: Address) -> bool {
        self.map.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let mut map = AddressMap::new();
        map.set(40001, 0x1234).unwrap();
        assert_eq!(map.get(40001).unwrap(), 0x1234);
        assert!(map.contains(40001));
        assert!(!map.contains(40002));
        assert!(matches!(map.get(40002), Err(Error::MissingAddress(40002))));
    }

    #[test]
    fn test_set_none_is_noop() {
        let mut map = AddressMap::new();
        map.set(5, 7).unwrap();
        map.set(5, None).unwrap();
        assert_eq!(map.get(5).unwrap(), 7);
        map.set(6, None).unwrap();
        assert!(!map.contains(6));
    }

    #[test]
    fn test_get_range_sparse() {
        let mut map = AddressMap::new();
        map.set(10, 1).unwrap();
        map.set(12, 3).unwrap();
        assert_eq!(map.get_range(10..13), vec![Some(1), None, Some(3)]);
        assert_eq!(map.get_range(20..20), Vec::<Option<i64>>::new());
    }

    #[test]
    fn test_set_range_zips_shorter_side() {
        // Excess values beyond the range are dropped and excess addresses
        // beyond the values keep their contents.
        let mut map = AddressMap::new();
        map.set(102, 99).unwrap();
        map.set_range(100..102, &[Some(1), Some(2), Some(3)]).unwrap();
        assert_eq!(map.get(100).unwrap(), 1);
        assert_eq!(map.get(101).unwrap(), 2);
        assert_eq!(map.get(102).unwrap(), 99);

        map.set_range(200..203, &[Some(5)]).unwrap();
        assert_eq!(map.get(200).unwrap(), 5);
        assert!(!map.contains(201));
        assert!(!map.contains(202));
    }

    #[test]
    fn test_set_range_skips_none() {
        let mut map = AddressMap::new();
        map.set(11, 42).unwrap();
        map.set_range(10..12, &[Some(1), None]).unwrap();
        assert_eq!(map.get(10).unwrap(), 1);
        assert_eq!(map.get(11).unwrap(), 42);
    }

    #[test]
    fn test_remove_is_lenient() {
        let mut map = AddressMap::new();
        map.set(1, 10).unwrap();
        assert_eq!(map.remove(1), Some(10));
        assert_eq!(map.remove(1), None);
        map.remove_range(0..100);
        assert!(map.is_empty());
    }

    #[test]
    fn test_merge_disjoint() {
        let mut a = AddressMap::new();
        a.set(1, 10).unwrap();
        let mut b = AddressMap::new();
        b.set(2, 20).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.get(1).unwrap(), 10);
        assert_eq!(a.get(2).unwrap(), 20);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_merge_overlap_fails_without_mutation() {
        let mut a = AddressMap::new();
        a.set(1, 10).unwrap();
        a.set(2, 20).unwrap();
        let mut b = AddressMap::new();
        b.set(2, 99).unwrap();
        b.set(3, 30).unwrap();

        let err = a.merge(&b).unwrap_err();
        match err {
            Error::MergeConflict { addresses } => assert_eq!(addresses, vec![2]),
            other => panic!("unexpected error: {}", other),
        }
        // Neither side changed.
        assert_eq!(a.len(), 2);
        assert_eq!(a.get(2).unwrap(), 20);
        assert!(!a.contains(3));
        assert_eq!(b.get(2).unwrap(), 99);
    }

    #[test]
    fn test_merge_overlap_fails_on_equal_values() {
        let mut a = AddressMap::new();
        a.set(7, 7).unwrap();
        let mut b = AddressMap::new();
        b.set(7, 7).unwrap();
        assert!(matches!(a.merge(&b), Err(Error::MergeConflict { .. })));
    }

    #[test]
    fn test_update_requires_known_addresses() {
        let mut a = AddressMap::new();
        a.set(1, 10).unwrap();
        let mut b = AddressMap::new();
        b.set(1, 11).unwrap();
        b.set(2, 22).unwrap();

        let err = a.update(&b, false).unwrap_err();
        match err {
            Error::UnknownAddresses { addresses } => assert_eq!(addresses, vec![2]),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(a.get(1).unwrap(), 10);

        a.update(&b, true).unwrap();
        assert_eq!(a.get(1).unwrap(), 11);
        assert_eq!(a.get(2).unwrap(), 22);
    }

    #[test]
    fn test_save_block() {
        let mut map = AddressMap::new();
        map.save_block(100, &[1, 2, 3]).unwrap();
        assert_eq!(map.get(100).unwrap(), 1);
        assert_eq!(map.get(101).unwrap(), 2);
        assert_eq!(map.get(102).unwrap(), 3);
    }

    #[test]
    fn test_clone_and_equality() {
        let mut a = AddressMap::new();
        a.set(1, 10).unwrap();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.set(1, 11).unwrap();
        assert_ne!(a, b);
        // The clone is independent of the original.
        assert_eq!(a.get(1).unwrap(), 10);
    }

    #[test]
    fn test_addresses_sorted() {
        let mut map = AddressMap::new();
        map.set(30, 3).unwrap();
        map.set(10, 1).unwrap();
        map.set(20, 2).unwrap();
        let addresses: Vec<Address> = map.addresses().collect();
        assert_eq!(addresses, vec![10, 20, 30]);
    }

    #[test]
    fn test_u16_rejects_out_of_range() {
        let mut map = AddressMapU16::new();
        map.set(1, 0xFFFF).unwrap();
        map.set(2, 0).unwrap();

        let err = map.set(3, 0x10000).unwrap_err();
        assert!(matches!(
            err,
            Error::RegisterOverflow { address: 3, value: 0x10000 }
        ));
        assert!(matches!(map.set(3, -1), Err(Error::RegisterOverflow { .. })));
        assert!(!map.contains(3));
    }

    #[test]
    fn test_u16_set_range_validates_before_writing() {
        let mut map = AddressMapU16::new();
        let err = map
            .set_range(10..13, &[Some(1), Some(0x10000), Some(3)])
            .unwrap_err();
        assert!(matches!(err, Error::RegisterOverflow { address: 11, .. }));
        // The valid leading value was not applied either.
        assert!(map.is_empty());
    }

    #[test]
    fn test_u16_save_block_validates_before_writing() {
        let mut map = AddressMapU16::new();
        assert!(map.save_block(5, &[1, 2, -7]).is_err());
        assert!(map.is_empty());
        map.save_block(5, &[1, 2, 7]).unwrap();
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_u16_from_registers() {
        let good = BTreeMap::from([(1, 100i64), (2, 0xFFFF)]);
        let map = AddressMapU16::from_registers(good).unwrap();
        assert_eq!(map.len(), 2);

        let bad = BTreeMap::from([(1, 100i64), (2, -5)]);
        assert!(AddressMapU16::from_registers(bad).is_err());
    }

    #[test]
    fn test_u16_try_from_address_map() {
        let mut raw = AddressMap::new();
        raw.set(1, 500).unwrap();
        let validated = AddressMapU16::try_from(raw.clone()).unwrap();
        assert_eq!(validated.get(1).unwrap(), 500);

        raw.set(2, 0x12345).unwrap();
        assert!(AddressMapU16::try_from(raw).is_err());
    }

    #[test]
    fn test_u16_merge_and_update() {
        let mut a = AddressMapU16::new();
        a.set(1, 1).unwrap();
        let mut b = AddressMapU16::new();
        b.set(2, 2).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.merge(&b).is_err());
        a.update(&b, false).unwrap();
        assert_eq!(a.get(2).unwrap(), 2);
    }
}
