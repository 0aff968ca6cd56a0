//! Sparse byte-addressable storage.
//!
//! A `VirtualMemory` covers `2^bits` bytes but only allocates the regions that are
//! touched. Storage is a radix tree kept in an arena: small spaces are a single
//! leaf, larger ones are tables of 512 lazily created children, each covering
//! `2^(bits - 9)` bytes. Untouched bytes read as the configured initial value.

/// Largest address width stored directly in one leaf.
const LEAF_BITS: u32 = 16;

/// Address bits consumed by one table level.
const TABLE_BITS: u32 = 9;

/// Number of children of a table node.
const TABLE_SIZE: usize = 1 << TABLE_BITS;

/// Transfer direction of a raw access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Copy from storage into the buffer.
    Read,
    /// Copy from the buffer into storage.
    Write,
}

#[derive(Debug)]
enum Node {
    Leaf(Box<[u8]>),
    Table {
        shift: u32,
        children: Box<[Option<usize>; TABLE_SIZE]>,
    },
}

/// Sparse memory of `2^bits` bytes.
#[derive(Debug)]
pub struct VirtualMemory {
    bits: u32,
    initial: u8,
    nodes: Vec<Node>,
}

impl VirtualMemory {
    /// Creates an empty memory.
    ///
    /// # Arguments
    ///
    /// * `bits` - Log2 of the size in bytes, at most 32.
    /// * `initial` - Value of every byte before it is first written.
    ///
    /// # Panics
    ///
    /// Panics if `bits` exceeds 32.
    pub fn new(bits: u32, initial: u8) -> Self {
        assert!(bits <= 32, "virtual memory wider than the 32-bit address space");
        let mut memory = Self {
            bits,
            initial,
            nodes: Vec::new(),
        };
        let _root = memory.alloc(bits);
        memory
    }

    /// Log2 of the size in bytes.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of bytes in the address space.
    pub const fn size(&self) -> u64 {
        1u64 << self.bits
    }

    /// Bytes of leaf storage allocated so far.
    pub fn allocated_bytes(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Leaf(bytes) => bytes.len(),
                Node::Table { .. } => 0,
            })
            .sum()
    }

    /// Copies bytes starting at `address` into `buffer`.
    pub fn read(&mut self, address: u32, buffer: &mut [u8]) {
        self.walk(address, buffer.len(), |leaf, offset, range| {
            buffer[range.clone()].copy_from_slice(&leaf[offset..offset + range.len()]);
        });
    }

    /// Copies `data` into storage starting at `address`.
    pub fn write(&mut self, address: u32, data: &[u8]) {
        self.walk(address, data.len(), |leaf, offset, range| {
            leaf[offset..offset + range.len()].copy_from_slice(&data[range]);
        });
    }

    /// Performs a raw access in the given direction.
    ///
    /// Addresses wrap at `2^bits`: an access running off the end continues at
    /// address zero.
    pub fn access(&mut self, address: u32, buffer: &mut [u8], direction: Direction) {
        match direction {
            Direction::Read => self.read(address, buffer),
            Direction::Write => self.write(address, buffer),
        }
    }

    /// Visits the leaf chunks covering `count` bytes from `address`.
    ///
    /// The callback receives the leaf, the offset inside it and the matching
    /// range of the caller's buffer.
    fn walk(
        &mut self,
        address: u32,
        count: usize,
        mut visit: impl FnMut(&mut [u8], usize, std::ops::Range<usize>),
    ) {
        let mask = (self.size() - 1) as u32;
        let mut address = address;
        let mut done = 0;
        while done < count {
            address &= mask;
            let (leaf, offset) = self.leaf_for(address);
            let Node::Leaf(bytes) = &mut self.nodes[leaf] else {
                unreachable!("leaf_for returned a table node");
            };
            let len = (count - done).min(bytes.len() - offset);
            visit(bytes, offset, done..done + len);
            done += len;
            address = address.wrapping_add(len as u32);
        }
    }

    /// Finds (allocating on the way) the leaf holding `address` and the offset in it.
    fn leaf_for(&mut self, address: u32) -> (usize, usize) {
        let mut index = 0;
        let mut address = u64::from(address);
        loop {
            let (shift, slot) = match &self.nodes[index] {
                Node::Leaf(_) => return (index, address as usize),
                Node::Table { shift, children } => {
                    let slot = (address >> shift) as usize;
                    (*shift, children[slot])
                }
            };
            let child = match slot {
                Some(child) => child,
                None => {
                    let child = self.alloc(shift);
                    if let Node::Table { children, .. } = &mut self.nodes[index] {
                        children[(address >> shift) as usize] = Some(child);
                    }
                    child
                }
            };
            address &= (1u64 << shift) - 1;
            index = child;
        }
    }

    fn alloc(&mut self, bits: u32) -> usize {
        let node = if bits > LEAF_BITS {
            Node::Table {
                shift: bits - TABLE_BITS,
                children: Box::new([None; TABLE_SIZE]),
            }
        } else {
            Node::Leaf(vec![self.initial; 1 << bits].into_boxed_slice())
        };
        self.nodes.push(node);
        self.nodes.len() - 1
    }
}
