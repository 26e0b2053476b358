//! An ordered multimap backed by a skip list.
//!
//! Every chain (the base chain and each express lane) is circular through a
//! single sentinel, and nodes are addressed by copyable [`NodeRef`] handles
//! that are invalidated when their node is deleted.
//!
//! ```
//! use ordskip::{Options, SkipList};
//!
//! let mut list: SkipList<u32, &str, 4> =
//!     SkipList::with_options(Options::default().with_probability(0.5).with_seed(1)).unwrap();
//! list.insert(5, "five");
//! list.insert(3, "three");
//!
//! let node = list.find_first(&5).unwrap();
//! assert_eq!(list.value(node), Some(&"five"));
//! assert_eq!(list.key(list.find_last_less_than(&5)), Some(&3));
//! assert_eq!(list.delete(node).unwrap(), (5, "five"));
//! ```

mod error;
mod options;
mod skiplist;

pub use crate::error::{Result, SkipListError};
pub use crate::options::{Options, DEFAULT_PROBABILITY};
pub use crate::skiplist::{Iter, LaneKeys, NodeRef, SkipList, DEFAULT_MAX_LEVELS};
