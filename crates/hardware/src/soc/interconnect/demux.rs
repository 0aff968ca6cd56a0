//! Address demultiplexing functions.
//!
//! A demux function maps a bus address to an offset within one slave, or `None`
//! if the slave does not claim the address. Slaves are tried in registration
//! order and the first claim wins.

/// Boxed demux function as stored by the bus.
pub type DemuxFn = Box<dyn Fn(u32) -> Option<u32> + Send>;

/// Claims `size` bytes starting at `base`, returning the offset from `base`.
pub fn range(base: u32, size: u64) -> impl Fn(u32) -> Option<u32> + Send + Clone {
    move |address| {
        let offset = address.wrapping_sub(base);
        (u64::from(offset) < size).then_some(offset)
    }
}

/// Claims every address unchanged.
pub fn everything() -> impl Fn(u32) -> Option<u32> + Send + Clone {
    Some
}
