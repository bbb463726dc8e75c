use crate::{HashError, ObjectId};

/// Size in bytes of the serialized fan-out table: 256 big-endian u32 counts.
pub const FANOUT_SIZE: usize = 256 * 4;

/// Fan-out table mapping a first digest byte to a cumulative count.
///
/// Each of the 256 entries holds the number of ids whose first byte is ≤ the
/// entry index, which narrows a binary search over a sorted id array to a
/// single bucket before any comparison happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutTable {
    table: [u32; 256],
}

impl FanoutTable {
    /// Build a fan-out table from a sorted slice of OIDs.
    ///
    /// The OIDs **must** be sorted; this function does not verify order.
    pub fn build(oids: &[ObjectId]) -> Self {
        let mut table = [0u32; 256];
        for oid in oids {
            table[oid.first_byte() as usize] += 1;
        }
        // Convert counts to cumulative counts.
        for i in 1..256 {
            table[i] += table[i - 1];
        }
        Self { table }
    }

    /// Index range of ids whose first byte equals `first_byte`.
    pub fn range(&self, first_byte: u8) -> std::ops::Range<usize> {
        let end = self.table[first_byte as usize] as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.table[(first_byte - 1) as usize] as usize
        };
        start..end
    }

    /// Total number of ids tracked by this table.
    pub fn total(&self) -> u32 {
        self.table[255]
    }

    /// Raw cumulative count at the given bucket.
    pub fn get(&self, index: u8) -> u32 {
        self.table[index as usize]
    }

    /// Parse from the on-disk format: exactly 256 big-endian u32 values.
    pub fn from_bytes(data: &[u8]) -> Result<Self, HashError> {
        if data.len() != FANOUT_SIZE {
            return Err(HashError::InvalidFanout(format!(
                "expected {FANOUT_SIZE} bytes, got {}",
                data.len()
            )));
        }
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let offset = i * 4;
            *entry = u32::from_be_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]);
        }
        for i in 1..256 {
            if table[i] < table[i - 1] {
                return Err(HashError::InvalidFanout(format!(
                    "cumulative count decreases at bucket {i:#04x}"
                )));
            }
        }
        Ok(Self { table })
    }

    /// Serialize to the on-disk format (1024 bytes).
    pub fn to_bytes(&self) -> [u8; FANOUT_SIZE] {
        let mut buf = [0u8; FANOUT_SIZE];
        for i in 0..256 {
            buf[i * 4..i * 4 + 4].copy_from_slice(&self.table[i].to_be_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashAlgorithm;

    fn make_oid(first_byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[0] = first_byte;
        ObjectId::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap()
    }

    #[test]
    fn build_and_lookup() {
        let mut oids: Vec<ObjectId> = vec![
            make_oid(0x00),
            make_oid(0x00),
            make_oid(0x01),
            make_oid(0x05),
            make_oid(0xff),
        ];
        oids.sort();

        let ft = FanoutTable::build(&oids);
        assert_eq!(ft.total(), 5);
        assert_eq!(ft.range(0x00), 0..2);
        assert_eq!(ft.range(0x01), 2..3);
        assert_eq!(ft.range(0x02), 3..3); // empty
        assert_eq!(ft.range(0x05), 3..4);
        assert_eq!(ft.range(0xff), 4..5);
    }

    #[test]
    fn bytes_roundtrip() {
        let oids: Vec<ObjectId> = (0..=255u8).map(make_oid).collect();
        let ft = FanoutTable::build(&oids);

        let bytes = ft.to_bytes();
        assert_eq!(bytes.len(), FANOUT_SIZE);

        let ft2 = FanoutTable::from_bytes(&bytes).unwrap();
        assert_eq!(ft, ft2);
    }

    #[test]
    fn empty_table() {
        let ft = FanoutTable::build(&[]);
        assert_eq!(ft.total(), 0);
        for b in 0..=255u8 {
            assert!(ft.range(b).is_empty());
        }
    }

    #[test]
    fn from_bytes_wrong_size() {
        let err = FanoutTable::from_bytes(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, HashError::InvalidFanout(_)));
    }

    #[test]
    fn from_bytes_rejects_decreasing_counts() {
        let mut buf = [0u8; FANOUT_SIZE];
        buf[0..4].copy_from_slice(&5u32.to_be_bytes());
        buf[4..8].copy_from_slice(&3u32.to_be_bytes());
        let err = FanoutTable::from_bytes(&buf).unwrap_err();
        assert!(matches!(err, HashError::InvalidFanout(_)));
    }
}
